use crate::errors::{MessageError, MessageResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// The role a message plays in a conversation
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Parse a role from its wire value, rejecting anything unrecognized
    pub fn parse(value: &str) -> MessageResult<Self> {
        Role::from_str(value).map_err(|_| MessageError::InvalidRole(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        self.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_roles_round_trip() {
        for role in Role::iter() {
            let parsed = Role::parse(role.as_str()).unwrap();
            assert_eq!(parsed, role);
            assert_eq!(
                serde_json::to_value(role).unwrap(),
                serde_json::json!(role.to_string())
            );
        }
        assert_eq!(Role::parse("assistant").unwrap(), Role::Assistant);
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        for value in ["tool", "USER", "", "narrator"] {
            assert!(matches!(
                Role::parse(value),
                Err(MessageError::InvalidRole(v)) if v == value
            ));
        }
    }
}
