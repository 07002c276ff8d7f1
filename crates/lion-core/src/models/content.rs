use super::note::Note;
use super::role::Role;
use crate::errors::MessageResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Debug;
use strum_macros::{AsRefStr, Display, EnumString};

/// How much detail a model should spend on an image
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ImageDetail {
    #[default]
    Low,
    High,
    Auto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
    pub detail: ImageDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
/// A typed part of a multi-part chat payload
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    pub fn text<S: Into<String>>(text: S) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn image_url<S: Into<String>>(url: S, detail: ImageDetail) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: url.into(),
                detail,
            },
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, ContentPart::ImageUrl { .. })
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentPart::Text { text } => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatContent {
    Text(String),
    Parts(Vec<ContentPart>),
    Document(Map<String, Value>),
}

impl ChatContent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ChatContent::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_parts(&self) -> Option<&[ContentPart]> {
        match self {
            ChatContent::Parts(parts) => Some(parts),
            _ => None,
        }
    }
}

/// The `{role, content}` payload sent to a model provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: ChatContent,
}

impl ChatMessage {
    pub fn new(role: Role, content: ChatContent) -> Self {
        ChatMessage { role, content }
    }

    pub fn to_value(&self) -> MessageResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Content owned by a message. Each implementation is one message kind.
pub trait MessageContent: Clone + Debug + Default + PartialEq {
    /// Name recorded as `lion_class` when the message is serialized
    const CLASS_NAME: &'static str;

    /// Role assumed when a persisted message carries none
    fn default_role() -> Option<Role> {
        None
    }

    fn to_dict(&self) -> Map<String, Value>;

    fn from_dict(data: Map<String, Value>) -> MessageResult<Self>;

    /// Project the content into a chat payload.
    ///
    /// Documents carrying images are sent as-is; anything else is sent as
    /// the document's JSON text.
    fn format(&self, role: Role) -> MessageResult<ChatMessage> {
        let dict = self.to_dict();
        let content = if dict.contains_key("images") {
            ChatContent::Document(dict)
        } else {
            ChatContent::Text(serde_json::to_string(&dict)?)
        };
        Ok(ChatMessage::new(role, content))
    }
}

impl MessageContent for Note {
    const CLASS_NAME: &'static str = "RoledMessage";

    fn to_dict(&self) -> Map<String, Value> {
        Note::to_dict(self)
    }

    fn from_dict(data: Map<String, Value>) -> MessageResult<Self> {
        Ok(Note::from_dict(data))
    }
}
