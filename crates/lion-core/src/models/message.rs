use super::content::{ChatContent, ChatMessage, ContentPart, MessageContent};
use super::id::{create_message_id, now_timestamp, validate_sender_recipient, NOT_APPLICABLE};
use super::log::Log;
use super::note::Note;
use super::role::Role;
use crate::errors::{MessageError, MessageResult};
use crate::settings::settings;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};
use std::fmt;

/// Top-level keys that map onto declared message fields
pub const MESSAGE_FIELDS: [&str; 8] = [
    "ln_id",
    "timestamp",
    "lion_class",
    "role",
    "content",
    "sender",
    "recipient",
    "metadata",
];

/// Identity of the message a clone was made from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloneInfo {
    pub original_ln_id: String,
    pub original_timestamp: f64,
    pub original_sender: String,
    pub original_recipient: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Provenance {
    #[default]
    None,
    ClonedFrom(CloneInfo),
}

impl Provenance {
    pub fn clone_info(&self) -> Option<&CloneInfo> {
        match self {
            Provenance::ClonedFrom(info) => Some(info),
            Provenance::None => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// A message with a conversational role and typed content
pub struct RoledMessage<C: MessageContent> {
    ln_id: String,
    timestamp: f64,
    role: Role,
    content: C,
    sender: String,
    recipient: String,
    metadata: Note,
    extra_fields: Note,
    provenance: Provenance,
}

impl<C: MessageContent> RoledMessage<C> {
    /// Create a message from a role's wire value, rejecting unknown roles
    pub fn new(role: &str, content: C) -> MessageResult<Self> {
        Ok(Self::with_role(Role::parse(role)?, content))
    }

    pub fn with_role(role: Role, content: C) -> Self {
        RoledMessage {
            ln_id: create_message_id(),
            timestamp: now_timestamp(),
            role,
            content,
            sender: NOT_APPLICABLE.to_string(),
            recipient: NOT_APPLICABLE.to_string(),
            metadata: Note::new(),
            extra_fields: Note::new(),
            provenance: Provenance::None,
        }
    }

    pub(crate) fn with_parties(mut self, sender: String, recipient: String) -> Self {
        self.sender = sender;
        self.recipient = recipient;
        self
    }

    pub fn ln_id(&self) -> &str {
        &self.ln_id
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn set_role(&mut self, role: Role) {
        self.role = role;
    }

    pub fn content(&self) -> &C {
        &self.content
    }

    pub fn content_mut(&mut self) -> &mut C {
        &mut self.content
    }

    pub fn set_content(&mut self, content: C) {
        self.content = content;
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn set_sender(&mut self, sender: Option<&str>) -> MessageResult<()> {
        self.sender = validate_sender_recipient(sender)?;
        Ok(())
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn set_recipient(&mut self, recipient: Option<&str>) -> MessageResult<()> {
        self.recipient = validate_sender_recipient(recipient)?;
        Ok(())
    }

    pub fn metadata(&self) -> &Note {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Note {
        &mut self.metadata
    }

    pub fn extra_fields(&self) -> &Note {
        &self.extra_fields
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn class_name(&self) -> &'static str {
        C::CLASS_NAME
    }

    /// Attach a field that is not part of the declared message shape
    pub fn add_field<S: Into<String>>(&mut self, name: S, value: Value) -> MessageResult<()> {
        let name = name.into();
        if MESSAGE_FIELDS.contains(&name.as_str()) || self.extra_fields.contains(&[&name]) {
            return Err(MessageError::FieldExists(name));
        }
        self.metadata
            .set(&["last_updated", name.as_str()], json!(now_timestamp()))?;
        self.extra_fields.insert(name, value);
        Ok(())
    }

    /// Copy this message under a new identity.
    ///
    /// Role and content are copied; the clone records where it came from
    /// both as provenance and as `metadata.clone_from`.
    pub fn clone_message(&self) -> Self {
        let mut obj = Self::with_role(self.role, self.content.clone());
        obj.provenance = Provenance::ClonedFrom(CloneInfo {
            original_ln_id: self.ln_id.clone(),
            original_timestamp: self.timestamp,
            original_sender: self.sender.clone(),
            original_recipient: self.recipient.clone(),
        });
        obj.metadata.insert("clone_from", json!(self.ln_id));
        obj
    }

    /// Serialized content, with clone provenance folded in as `clone_from_info`
    pub fn content_dict(&self) -> Map<String, Value> {
        let mut dict = self.content.to_dict();
        if let Some(info) = self.provenance.clone_info() {
            dict.insert(
                "clone_from_info".to_string(),
                json!({
                    "original_ln_id": info.original_ln_id,
                    "original_timestamp": info.original_timestamp,
                    "original_sender": info.original_sender,
                    "original_recipient": info.original_recipient,
                }),
            );
        }
        dict
    }

    pub fn to_dict(&self) -> Map<String, Value> {
        let mut dict = Map::new();
        dict.insert("ln_id".to_string(), json!(self.ln_id));
        dict.insert("timestamp".to_string(), json!(self.timestamp));
        dict.insert("lion_class".to_string(), json!(C::CLASS_NAME));
        dict.insert("role".to_string(), json!(self.role.as_str()));
        dict.insert("content".to_string(), Value::Object(self.content_dict()));
        dict.insert("sender".to_string(), json!(self.sender));
        dict.insert("recipient".to_string(), json!(self.recipient));
        dict.insert("metadata".to_string(), Value::Object(self.metadata.to_dict()));
        for (key, value) in self.extra_fields.as_map() {
            dict.insert(key.clone(), value.clone());
        }
        dict
    }

    /// Rebuild a message from a dictionary produced by [`RoledMessage::to_dict`].
    ///
    /// Unknown top-level keys are reattached as extra fields and a recorded
    /// `metadata.last_updated` wins over the one generated while loading.
    pub fn from_dict(mut data: Map<String, Value>) -> MessageResult<Self> {
        if let Some(class) = data.shift_remove("lion_class") {
            let found = class.as_str().unwrap_or_default();
            if found != C::CLASS_NAME {
                return Err(MessageError::ClassMismatch {
                    expected: C::CLASS_NAME.to_string(),
                    found: found.to_string(),
                });
            }
        }

        let extra_keys: Vec<String> = data
            .keys()
            .filter(|key| !MESSAGE_FIELDS.contains(&key.as_str()))
            .cloned()
            .collect();
        let extra_fields: Vec<(String, Value)> = extra_keys
            .into_iter()
            .filter_map(|key| data.shift_remove(&key).map(|value| (key, value)))
            .collect();

        let last_updated = data
            .get("metadata")
            .and_then(|metadata| metadata.get("last_updated"))
            .cloned();

        let mut obj = Self::from_load(data)?;
        for (key, value) in extra_fields {
            tracing::debug!("Reattaching extra field '{}' to {}", key, C::CLASS_NAME);
            obj.add_field(key, value)?;
        }
        if let Some(last_updated) = last_updated {
            obj.metadata.insert("last_updated", last_updated);
        }
        Ok(obj)
    }

    /// Build a message directly from its declared fields.
    pub fn from_load(mut fields: Map<String, Value>) -> MessageResult<Self> {
        let role = match fields.get("role") {
            Some(Value::String(role)) => Role::parse(role)?,
            Some(other) => return Err(MessageError::InvalidRole(other.to_string())),
            None => C::default_role().ok_or_else(|| MessageError::InvalidField {
                field: "role".to_string(),
                reason: "missing".to_string(),
            })?,
        };

        let (content, provenance) = match fields.shift_remove("content") {
            Some(Value::Object(mut content)) => {
                let provenance = match content.shift_remove("clone_from_info") {
                    Some(info) => Provenance::ClonedFrom(serde_json::from_value(info)?),
                    None => Provenance::None,
                };
                (C::from_dict(content)?, provenance)
            }
            None | Some(Value::Null) => (C::default(), Provenance::None),
            Some(_) => {
                return Err(MessageError::InvalidField {
                    field: "content".to_string(),
                    reason: "expected an object".to_string(),
                })
            }
        };

        let metadata = match fields.shift_remove("metadata") {
            Some(Value::Object(map)) => Note::from_dict(map),
            None | Some(Value::Null) => Note::new(),
            Some(_) => {
                return Err(MessageError::InvalidField {
                    field: "metadata".to_string(),
                    reason: "expected an object".to_string(),
                })
            }
        };

        let ln_id = fields
            .get("ln_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(create_message_id);
        let timestamp = fields
            .get("timestamp")
            .and_then(parse_timestamp)
            .unwrap_or_else(now_timestamp);
        let sender = validate_sender_recipient(fields.get("sender").and_then(Value::as_str))?;
        let recipient =
            validate_sender_recipient(fields.get("recipient").and_then(Value::as_str))?;

        Ok(RoledMessage {
            ln_id,
            timestamp,
            role,
            content,
            sender,
            recipient,
            metadata,
            extra_fields: Note::new(),
            provenance,
        })
    }

    /// The chat payload, or the reason it cannot be produced
    pub fn try_chat_msg(&self) -> MessageResult<ChatMessage> {
        self.content.format(self.role)
    }

    /// The chat payload; `None` while the message cannot be rendered
    pub fn chat_msg(&self) -> Option<ChatMessage> {
        match self.try_chat_msg() {
            Ok(msg) => Some(msg),
            Err(e) => {
                tracing::debug!("Message {} is not renderable: {}", self.ln_id, e);
                None
            }
        }
    }

    /// Image parts of the chat payload, if it is multi-part
    pub fn image_content(&self) -> Option<Vec<ContentPart>> {
        match self.chat_msg()?.content {
            ChatContent::Parts(parts) => Some(parts.into_iter().filter(ContentPart::is_image).collect()),
            _ => None,
        }
    }

    pub fn to_log(&self) -> Log {
        let mut dict = self.to_dict();
        let content = match dict.shift_remove("content") {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        Log::new(Note::from_dict(content), Note::from_dict(dict))
    }
}

fn parse_timestamp(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok().or_else(|| {
            chrono::DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_micros()) / 1e6)
        }),
        _ => None,
    }
}

impl<C: MessageContent> fmt::Display for RoledMessage<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let content = Value::Object(self.content.to_dict()).to_string();
        let limit = settings().content_preview_len;
        let preview = if content.chars().count() > limit {
            format!("{}...", content.chars().take(limit).collect::<String>())
        } else {
            content
        };
        write!(
            f,
            "Message(role={}, sender={}, content='{}')",
            self.role, self.sender, preview
        )
    }
}

impl<C: MessageContent> Serialize for RoledMessage<C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_dict().serialize(serializer)
    }
}

impl<'de, C: MessageContent> Deserialize<'de> for RoledMessage<C> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let data = Map::deserialize(deserializer)?;
        Self::from_dict(data).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn note(value: Value) -> Note {
        Note::from_dict(value.as_object().cloned().unwrap())
    }

    #[test]
    fn test_every_valid_role_constructs() {
        for role in Role::iter() {
            let msg = RoledMessage::new(role.as_str(), Note::new()).unwrap();
            assert_eq!(msg.role(), role);
            assert_eq!(msg.to_dict()["role"], json!(role.as_str()));
        }
    }

    #[test]
    fn test_invalid_role_fails() {
        let result = RoledMessage::new("moderator", Note::new());
        assert!(matches!(result, Err(MessageError::InvalidRole(_))));
    }

    #[test]
    fn test_clone_records_provenance() {
        let mut original = RoledMessage::new("assistant", note(json!({"text": "hi"}))).unwrap();
        original.set_sender(Some("assistant")).unwrap();

        let copy = original.clone_message();
        assert_ne!(copy.ln_id(), original.ln_id());
        assert_eq!(copy.role(), original.role());
        assert_eq!(copy.content(), original.content());
        assert_eq!(copy.metadata().get(&["clone_from"]), Some(&json!(original.ln_id())));

        let content = copy.content_dict();
        assert_eq!(
            content["clone_from_info"],
            json!({
                "original_ln_id": original.ln_id(),
                "original_timestamp": original.timestamp(),
                "original_sender": "assistant",
                "original_recipient": "N/A",
            })
        );
        assert!(original.content_dict().get("clone_from_info").is_none());
    }

    #[test]
    fn test_round_trip_preserves_fields() {
        let mut msg = RoledMessage::new("system", note(json!({"rule": "be kind"}))).unwrap();
        msg.set_recipient(Some("user")).unwrap();

        let loaded = RoledMessage::<Note>::from_dict(msg.to_dict()).unwrap();
        assert_eq!(loaded, msg);
    }

    #[test]
    fn test_round_trip_restores_provenance() {
        let msg = RoledMessage::new("user", note(json!({"q": 1}))).unwrap();
        let copy = msg.clone_message();
        let loaded = RoledMessage::<Note>::from_dict(copy.to_dict()).unwrap();
        assert_eq!(loaded.provenance(), copy.provenance());
        assert_eq!(loaded.content(), copy.content());
    }

    #[test]
    fn test_from_dict_reattaches_unknown_fields() {
        let msg = RoledMessage::new("user", Note::new()).unwrap();
        let mut dict = msg.to_dict();
        dict.insert("priority".to_string(), json!(3));
        dict.insert(
            "metadata".to_string(),
            json!({"last_updated": {"content": 42.0}}),
        );

        let loaded = RoledMessage::<Note>::from_dict(dict).unwrap();
        assert_eq!(loaded.extra_fields().get(&["priority"]), Some(&json!(3)));
        assert_eq!(
            loaded.metadata().get(&["last_updated"]),
            Some(&json!({"content": 42.0}))
        );
        assert_eq!(loaded.to_dict()["priority"], json!(3));
    }

    #[test]
    fn test_from_dict_rejects_other_class() {
        let msg = RoledMessage::new("user", Note::new()).unwrap();
        let mut dict = msg.to_dict();
        dict.insert("lion_class".to_string(), json!("System"));
        assert!(matches!(
            RoledMessage::<Note>::from_dict(dict),
            Err(MessageError::ClassMismatch { .. })
        ));
    }

    #[test]
    fn test_from_dict_rejects_invalid_role() {
        let msg = RoledMessage::new("user", Note::new()).unwrap();
        let mut dict = msg.to_dict();
        dict.insert("role".to_string(), json!("wizard"));
        assert!(matches!(
            RoledMessage::<Note>::from_dict(dict),
            Err(MessageError::InvalidRole(_))
        ));
    }

    #[test]
    fn test_add_field_rejects_duplicates() {
        let mut msg = RoledMessage::new("user", Note::new()).unwrap();
        msg.add_field("score", json!(1)).unwrap();
        assert!(msg.metadata().contains(&["last_updated", "score"]));
        assert!(matches!(
            msg.add_field("score", json!(2)),
            Err(MessageError::FieldExists(_))
        ));
        assert!(matches!(
            msg.add_field("role", json!("user")),
            Err(MessageError::FieldExists(_))
        ));
    }

    #[test]
    fn test_default_chat_msg() {
        let msg = RoledMessage::new("user", note(json!({"text": "hi"}))).unwrap();
        let chat = msg.chat_msg().unwrap();
        assert_eq!(chat.role, Role::User);
        assert_eq!(chat.content, ChatContent::Text(r#"{"text":"hi"}"#.to_string()));
        assert!(msg.image_content().is_none());
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Unrenderable;

    impl MessageContent for Unrenderable {
        const CLASS_NAME: &'static str = "Unrenderable";

        fn to_dict(&self) -> Map<String, Value> {
            Map::new()
        }

        fn from_dict(_data: Map<String, Value>) -> MessageResult<Self> {
            Ok(Unrenderable)
        }

        fn format(&self, _role: Role) -> MessageResult<ChatMessage> {
            Err(MessageError::InvalidField {
                field: "content".to_string(),
                reason: "cannot be rendered".to_string(),
            })
        }
    }

    #[test]
    fn test_render_failure_hides_chat_msg() {
        let msg = RoledMessage::new("user", Unrenderable).unwrap();
        assert!(matches!(
            msg.try_chat_msg(),
            Err(MessageError::InvalidField { .. })
        ));
        assert!(msg.chat_msg().is_none());
        assert!(msg.image_content().is_none());
    }

    #[test]
    fn test_to_log_splits_content() {
        let msg = RoledMessage::new("user", note(json!({"text": "hi"}))).unwrap();
        let log = msg.to_log();
        assert_eq!(log.content().get(&["text"]), Some(&json!("hi")));
        assert_eq!(log.loginfo().get(&["ln_id"]), Some(&json!(msg.ln_id())));
        assert_eq!(log.loginfo().get(&["lion_class"]), Some(&json!("RoledMessage")));
        assert!(!log.loginfo().contains(&["content"]));
    }

    #[test]
    fn test_display_truncates_content() {
        let long = "x".repeat(500);
        let msg = RoledMessage::new("user", note(json!({"text": long}))).unwrap();
        let shown = msg.to_string();
        assert!(shown.starts_with("Message(role=user, sender=N/A, content='"));
        assert!(shown.ends_with("...')"));
        assert!(shown.len() < 500);
    }

    #[test]
    fn test_serde_round_trip() {
        let msg = RoledMessage::new("assistant", note(json!({"answer": 42}))).unwrap();
        let text = serde_json::to_string(&msg).unwrap();
        let parsed: RoledMessage<Note> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, msg);
    }
}
