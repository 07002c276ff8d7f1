use crate::errors::{MessageError, MessageResult};
use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use uuid::Uuid;

/// Sender/recipient value used when nobody in particular is addressed
pub const NOT_APPLICABLE: &str = "N/A";

const RESERVED_PARTIES: [&str; 4] = ["system", "user", "assistant", NOT_APPLICABLE];

lazy_static! {
    static ref ID_PATTERN: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9]*_[0-9a-f]{32}$").unwrap();
}

pub fn create_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

pub fn create_message_id() -> String {
    create_id("msg")
}

pub fn create_log_id() -> String {
    create_id("log")
}

pub fn is_valid_id(value: &str) -> bool {
    ID_PATTERN.is_match(value)
}

/// Seconds since the unix epoch, with sub-second precision
pub fn now_timestamp() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}

/// Accepts the reserved party names or a generated id. An absent or empty
/// value means "not applicable".
pub fn validate_sender_recipient(value: Option<&str>) -> MessageResult<String> {
    match value {
        None | Some("") => Ok(NOT_APPLICABLE.to_string()),
        Some(v) if RESERVED_PARTIES.contains(&v) || is_valid_id(v) => Ok(v.to_string()),
        Some(v) => Err(MessageError::InvalidSenderRecipient(v.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_id_format() {
        let id = create_id("test");
        assert!(id.starts_with("test_"), "ID should start with 'test_'");
        let expected_length = "test_".len() + 32;
        assert_eq!(
            id.len(),
            expected_length,
            "ID length should be {} (prefix + '_' + 32 char UUID)",
            expected_length
        );
        assert!(is_valid_id(&id));
    }

    #[test]
    fn test_create_id_uniqueness() {
        let id1 = create_message_id();
        let id2 = create_message_id();
        assert_ne!(id1, id2, "Generated IDs should be unique");
    }

    #[test]
    fn test_is_valid_id_rejects_malformed() {
        assert!(!is_valid_id("msg_"));
        assert!(!is_valid_id("msg_XYZ"));
        assert!(!is_valid_id("not an id"));
        assert!(!is_valid_id(&format!("_{}", "a".repeat(32))));
    }

    #[test]
    fn test_validate_sender_recipient() {
        assert_eq!(validate_sender_recipient(None).unwrap(), "N/A");
        assert_eq!(validate_sender_recipient(Some("")).unwrap(), "N/A");
        assert_eq!(validate_sender_recipient(Some("user")).unwrap(), "user");
        assert_eq!(validate_sender_recipient(Some("system")).unwrap(), "system");

        let id = create_id("branch");
        assert_eq!(validate_sender_recipient(Some(&id)).unwrap(), id);

        assert!(matches!(
            validate_sender_recipient(Some("somebody")),
            Err(MessageError::InvalidSenderRecipient(_))
        ));
    }

    #[test]
    fn test_now_timestamp_is_recent() {
        let ts = now_timestamp();
        assert!(ts > 1_600_000_000.0);
    }
}
