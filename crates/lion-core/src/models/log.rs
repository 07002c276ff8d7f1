use super::id::{create_log_id, now_timestamp};
use super::note::Note;
use crate::errors::{MessageError, MessageResult};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};

pub const LOG_CLASS: &str = "Log";

/// A flat, immutable record of a message: its content plus everything else
/// about it.
#[derive(Debug, Clone, PartialEq)]
pub struct Log {
    log_id: String,
    log_timestamp: f64,
    content: Note,
    loginfo: Note,
}

impl Log {
    pub fn new(content: Note, loginfo: Note) -> Self {
        Log {
            log_id: create_log_id(),
            log_timestamp: now_timestamp(),
            content,
            loginfo,
        }
    }

    pub fn log_id(&self) -> &str {
        &self.log_id
    }

    pub fn log_timestamp(&self) -> f64 {
        self.log_timestamp
    }

    pub fn content(&self) -> &Note {
        &self.content
    }

    pub fn loginfo(&self) -> &Note {
        &self.loginfo
    }

    pub fn to_dict(&self) -> Map<String, Value> {
        let value = json!({
            "log_id": self.log_id,
            "log_timestamp": self.log_timestamp,
            "log_class": LOG_CLASS,
            "content": self.content.as_map(),
            "loginfo": self.loginfo.as_map(),
        });
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    /// Load a log previously produced by [`Log::to_dict`]. Both the `log_*`
    /// names and the bare `ln_id`/`timestamp` names are accepted.
    pub fn from_dict(mut data: Map<String, Value>) -> MessageResult<Self> {
        let content = take_note(&mut data, "content")?;
        let loginfo = take_note(&mut data, "loginfo")?;

        let log_id = data
            .remove("log_id")
            .or_else(|| data.remove("ln_id"))
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(create_log_id);
        let log_timestamp = data
            .remove("log_timestamp")
            .or_else(|| data.remove("timestamp"))
            .and_then(|v| v.as_f64())
            .unwrap_or_else(now_timestamp);

        Ok(Log {
            log_id,
            log_timestamp,
            content,
            loginfo,
        })
    }
}

fn take_note(data: &mut Map<String, Value>, key: &str) -> MessageResult<Note> {
    match data.remove(key) {
        Some(Value::Object(map)) => Ok(Note::from_dict(map)),
        Some(_) => Err(MessageError::InvalidLog(format!("invalid '{}' field", key))),
        None => Err(MessageError::InvalidLog(format!("missing '{}' field", key))),
    }
}

impl Serialize for Log {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_dict().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Log {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let data = Map::deserialize(deserializer)?;
        Log::from_dict(data).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(value: Value) -> Note {
        Note::from_dict(value.as_object().cloned().unwrap())
    }

    #[test]
    fn test_log_to_dict_renames_identity() {
        let log = Log::new(note(json!({"text": "hi"})), note(json!({"role": "user"})));
        let dict = log.to_dict();
        assert_eq!(dict["log_id"], json!(log.log_id()));
        assert_eq!(dict["log_class"], json!("Log"));
        assert_eq!(dict["content"], json!({"text": "hi"}));
        assert_eq!(dict["loginfo"], json!({"role": "user"}));
        assert!(!dict.contains_key("ln_id"));
    }

    #[test]
    fn test_log_round_trip() {
        let log = Log::new(note(json!({"a": 1})), note(json!({"b": 2})));
        let loaded = Log::from_dict(log.to_dict()).unwrap();
        assert_eq!(loaded, log);

        let text = serde_json::to_string(&log).unwrap();
        let parsed: Log = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, log);
    }

    #[test]
    fn test_log_accepts_bare_identity_names() {
        let data = json!({
            "ln_id": "log_0123456789abcdef0123456789abcdef",
            "timestamp": 12.5,
            "content": {},
            "loginfo": {},
        });
        let log = Log::from_dict(data.as_object().cloned().unwrap()).unwrap();
        assert_eq!(log.log_id(), "log_0123456789abcdef0123456789abcdef");
        assert_eq!(log.log_timestamp(), 12.5);
    }

    #[test]
    fn test_log_requires_content_and_loginfo() {
        let missing = json!({"content": {}});
        assert!(matches!(
            Log::from_dict(missing.as_object().cloned().unwrap()),
            Err(MessageError::InvalidLog(_))
        ));

        let invalid = json!({"content": "text", "loginfo": {}});
        assert!(matches!(
            Log::from_dict(invalid.as_object().cloned().unwrap()),
            Err(MessageError::InvalidLog(_))
        ));
    }
}
