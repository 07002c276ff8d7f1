use super::content::{ChatContent, ChatMessage, MessageContent};
use super::id::validate_sender_recipient;
use super::message::RoledMessage;
use super::note::Note;
use super::role::Role;
use crate::errors::{MessageError, MessageResult};
use crate::formatting::value_to_text;
use serde_json::{json, Map, Value};

/// A model's reply
pub type AssistantResponse = RoledMessage<AssistantContent>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantContent {
    assistant_response: String,
    extra: Note,
}

impl AssistantContent {
    pub fn new<S: Into<String>>(response: S) -> Self {
        AssistantContent {
            assistant_response: response.into(),
            extra: Note::new(),
        }
    }

    pub fn response(&self) -> &str {
        &self.assistant_response
    }
}

impl MessageContent for AssistantContent {
    const CLASS_NAME: &'static str = "AssistantResponse";

    fn default_role() -> Option<Role> {
        Some(Role::Assistant)
    }

    fn to_dict(&self) -> Map<String, Value> {
        let mut dict = Map::new();
        dict.insert(
            "assistant_response".to_string(),
            json!(self.assistant_response),
        );
        for (key, value) in self.extra.as_map() {
            dict.insert(key.clone(), value.clone());
        }
        dict
    }

    fn from_dict(data: Map<String, Value>) -> MessageResult<Self> {
        let mut content = AssistantContent::default();
        for (key, value) in data {
            match key.as_str() {
                "assistant_response" => {
                    if !value.is_null() {
                        content.assistant_response = value_to_text(&value);
                    }
                }
                _ => {
                    content.extra.insert(key, value);
                }
            }
        }
        Ok(content)
    }

    fn format(&self, role: Role) -> MessageResult<ChatMessage> {
        Ok(ChatMessage::new(
            role,
            ChatContent::Text(self.assistant_response.clone()),
        ))
    }
}

/// What a provider sent back, before it is reduced to text
enum ProviderReply {
    Text(String),
    Raw { text: String, payload: Value },
}

impl RoledMessage<AssistantContent> {
    /// Build a reply from a provider response.
    ///
    /// Accepts plain text, an object with a `content` key, a chat completion
    /// (`choices[0].message.content`) or a list of streamed chunks whose
    /// `choices[0].delta.content` are joined. Provider payloads are kept
    /// under `metadata.model_response`.
    pub fn from_response(
        response: Value,
        sender: Option<&str>,
        recipient: Option<&str>,
    ) -> MessageResult<Self> {
        let sender = validate_sender_recipient(sender)?;
        let recipient = validate_sender_recipient(recipient)?;

        let reply = parse_reply(response)?;
        let (text, payload) = match reply {
            ProviderReply::Text(text) => (text, None),
            ProviderReply::Raw { text, payload } => (text, Some(payload)),
        };

        let mut msg = Self::with_role(Role::Assistant, AssistantContent::new(text))
            .with_parties(sender, recipient);
        if let Some(payload) = payload {
            msg.metadata_mut().insert("model_response", payload);
        }
        Ok(msg)
    }

    pub fn response(&self) -> &str {
        self.content().response()
    }

    /// The raw provider payload this reply was built from, if any
    pub fn model_response(&self) -> Option<&Value> {
        self.metadata().get(&["model_response"])
    }
}

fn parse_reply(response: Value) -> MessageResult<ProviderReply> {
    match response {
        Value::String(text) => Ok(ProviderReply::Text(text)),
        Value::Object(map) if map.contains_key("choices") => {
            let text = choice_text(&map, "message");
            Ok(ProviderReply::Raw {
                text,
                payload: Value::Object(map),
            })
        }
        Value::Object(map) => match map.get("content") {
            Some(content) => Ok(ProviderReply::Raw {
                text: value_to_text(content),
                payload: Value::Object(map),
            }),
            None => Err(invalid_response("object has neither 'choices' nor 'content'")),
        },
        Value::Array(chunks) => {
            let text = chunks
                .iter()
                .filter_map(Value::as_object)
                .map(|chunk| choice_text(chunk, "delta"))
                .collect::<String>();
            Ok(ProviderReply::Raw {
                text,
                payload: Value::Array(chunks),
            })
        }
        other => Err(invalid_response(&format!("unsupported response {}", other))),
    }
}

// `choices[0].<key>.content`, or empty when the provider sent none.
fn choice_text(payload: &Map<String, Value>, key: &str) -> String {
    payload
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get(key))
        .and_then(|message| message.get("content"))
        .filter(|content| !content.is_null())
        .map(value_to_text)
        .unwrap_or_default()
}

fn invalid_response(reason: &str) -> MessageError {
    MessageError::InvalidField {
        field: "assistant_response".to_string(),
        reason: reason.to_string(),
    }
}
