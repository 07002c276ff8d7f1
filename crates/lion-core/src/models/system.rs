use super::content::{ChatContent, ChatMessage, MessageContent};
use super::id::NOT_APPLICABLE;
use super::message::RoledMessage;
use super::note::Note;
use super::role::Role;
use crate::errors::MessageResult;
use crate::formatting::{format_system_content, value_to_text};
use crate::settings::settings;
use chrono::Utc;
use serde_json::{json, Map, Value};

/// The system prompt of a conversation
pub type System = RoledMessage<SystemContent>;

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Whether, and which, datetime is stamped onto a system message
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SystemDatetime {
    #[default]
    None,
    Now,
    Fixed(String),
}

impl SystemDatetime {
    fn resolve(self) -> Option<String> {
        match self {
            SystemDatetime::None => None,
            SystemDatetime::Now => Some(Utc::now().format(DATETIME_FORMAT).to_string()),
            SystemDatetime::Fixed(datetime) => Some(datetime),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemContent {
    system: String,
    system_datetime: Option<String>,
    extra: Note,
}

impl SystemContent {
    pub fn new<S: Into<String>>(message: S, system_datetime: SystemDatetime) -> Self {
        let message = message.into();
        SystemContent {
            system: if message.is_empty() {
                settings().default_system_message.clone()
            } else {
                message
            },
            system_datetime: system_datetime.resolve(),
            extra: Note::new(),
        }
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn system_datetime(&self) -> Option<&str> {
        self.system_datetime.as_deref()
    }

    pub fn system_info(&self) -> String {
        format_system_content(self.system_datetime.as_deref(), &self.system)
    }
}

impl MessageContent for SystemContent {
    const CLASS_NAME: &'static str = "System";

    fn default_role() -> Option<Role> {
        Some(Role::System)
    }

    fn to_dict(&self) -> Map<String, Value> {
        let mut dict = Map::new();
        dict.insert("system".to_string(), json!(self.system));
        if let Some(datetime) = &self.system_datetime {
            dict.insert("system_datetime".to_string(), json!(datetime));
        }
        for (key, value) in self.extra.as_map() {
            dict.insert(key.clone(), value.clone());
        }
        dict
    }

    fn from_dict(data: Map<String, Value>) -> MessageResult<Self> {
        let mut content = SystemContent::default();
        for (key, value) in data {
            if value.is_null() {
                continue;
            }
            match key.as_str() {
                "system" => content.system = value_to_text(&value),
                "system_datetime" => content.system_datetime = Some(value_to_text(&value)),
                _ => {
                    content.extra.insert(key, value);
                }
            }
        }
        Ok(content)
    }

    fn format(&self, role: Role) -> MessageResult<ChatMessage> {
        Ok(ChatMessage::new(role, ChatContent::Text(self.system_info())))
    }
}

impl RoledMessage<SystemContent> {
    /// Build a system message. An empty message falls back to the
    /// configured default system message.
    pub fn from_message<S: Into<String>>(message: S, system_datetime: SystemDatetime) -> Self {
        Self::with_role(Role::System, SystemContent::new(message, system_datetime))
            .with_parties(Role::System.to_string(), NOT_APPLICABLE.to_string())
    }

    pub fn system_info(&self) -> String {
        self.content().system_info()
    }

    /// Replace the message text and, when given, the parties and datetime
    pub fn update<S: Into<String>>(
        &mut self,
        message: S,
        sender: Option<&str>,
        recipient: Option<&str>,
        system_datetime: Option<SystemDatetime>,
    ) -> MessageResult<()> {
        let datetime = match system_datetime {
            Some(datetime) => datetime,
            None => match self.content().system_datetime() {
                Some(existing) => SystemDatetime::Fixed(existing.to_string()),
                None => SystemDatetime::None,
            },
        };
        let extra = self.content().extra.clone();
        let mut content = SystemContent::new(message, datetime);
        content.extra = extra;

        if sender.is_some() {
            self.set_sender(sender)?;
        }
        if recipient.is_some() {
            self.set_recipient(recipient)?;
        }
        self.set_content(content);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MessageError;
    use regex::Regex;

    #[test]
    fn test_default_message() {
        let msg = System::from_message("", SystemDatetime::None);
        assert_eq!(msg.role(), Role::System);
        assert_eq!(msg.sender(), "system");
        assert_eq!(msg.recipient(), "N/A");
        assert_eq!(msg.content().system(), settings().default_system_message);
        assert_eq!(msg.system_info(), settings().default_system_message);
    }

    #[test]
    fn test_datetime_prefix() {
        let msg = System::from_message(
            "Be brief.",
            SystemDatetime::Fixed("2024-05-01T09:30".to_string()),
        );
        let chat = msg.chat_msg().unwrap();
        assert_eq!(chat.role, Role::System);
        assert_eq!(
            chat.content,
            ChatContent::Text("System datetime: 2024-05-01T09:30\n\nBe brief.".to_string())
        );
    }

    #[test]
    fn test_current_datetime_shape() {
        let msg = System::from_message("hi", SystemDatetime::Now);
        let pattern = Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}$").unwrap();
        assert!(pattern.is_match(msg.content().system_datetime().unwrap()));
    }

    #[test]
    fn test_update_keeps_datetime_and_validates_parties() {
        let mut msg = System::from_message("one", SystemDatetime::Fixed("then".to_string()));
        msg.update("two", None, Some("user"), None).unwrap();
        assert_eq!(msg.content().system(), "two");
        assert_eq!(msg.content().system_datetime(), Some("then"));
        assert_eq!(msg.recipient(), "user");

        let result = msg.update("three", Some("not an id"), None, None);
        assert!(matches!(result, Err(MessageError::InvalidSenderRecipient(_))));
    }

    #[test]
    fn test_round_trip() {
        let msg = System::from_message("rules", SystemDatetime::Fixed("now".to_string()));
        let loaded = System::from_dict(msg.to_dict()).unwrap();
        assert_eq!(loaded, msg);
        assert_eq!(loaded.to_dict()["lion_class"], json!("System"));
    }
}
