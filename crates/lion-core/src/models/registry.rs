use super::action_request::{ActionRequest, ActionRequestContent};
use super::action_response::{ActionResponse, ActionResponseContent};
use super::assistant::{AssistantContent, AssistantResponse};
use super::content::{ChatMessage, MessageContent};
use super::instruction::{Instruction, InstructionContent};
use super::log::Log;
use super::message::RoledMessage;
use super::note::Note;
use super::role::Role;
use super::system::{System, SystemContent};
use crate::errors::{MessageError, MessageResult};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Any message kind this crate can persist and load
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Instruction(Instruction),
    System(System),
    AssistantResponse(AssistantResponse),
    ActionRequest(ActionRequest),
    ActionResponse(ActionResponse),
    Generic(RoledMessage<Note>),
}

macro_rules! each_message {
    ($message:expr, $inner:ident => $body:expr) => {
        match $message {
            Message::Instruction($inner) => $body,
            Message::System($inner) => $body,
            Message::AssistantResponse($inner) => $body,
            Message::ActionRequest($inner) => $body,
            Message::ActionResponse($inner) => $body,
            Message::Generic($inner) => $body,
        }
    };
}

impl Message {
    /// Load a message, choosing its kind from `lion_class`.
    ///
    /// A dictionary without `lion_class` loads as a generic message.
    pub fn from_dict(data: Map<String, Value>) -> MessageResult<Self> {
        let class = match data.get("lion_class") {
            None | Some(Value::Null) => Note::CLASS_NAME.to_string(),
            Some(Value::String(name)) => name.clone(),
            Some(other) => return Err(MessageError::UnknownClass(other.to_string())),
        };

        let message: Message = if class == InstructionContent::CLASS_NAME {
            Instruction::from_dict(data)?.into()
        } else if class == SystemContent::CLASS_NAME {
            System::from_dict(data)?.into()
        } else if class == AssistantContent::CLASS_NAME {
            AssistantResponse::from_dict(data)?.into()
        } else if class == ActionRequestContent::CLASS_NAME {
            ActionRequest::from_dict(data)?.into()
        } else if class == ActionResponseContent::CLASS_NAME {
            ActionResponse::from_dict(data)?.into()
        } else if class == Note::CLASS_NAME {
            RoledMessage::<Note>::from_dict(data)?.into()
        } else {
            return Err(MessageError::UnknownClass(class));
        };
        tracing::debug!("Loaded {} message {}", class, message.ln_id());
        Ok(message)
    }

    pub fn class_name(&self) -> &'static str {
        each_message!(self, msg => msg.class_name())
    }

    pub fn ln_id(&self) -> &str {
        each_message!(self, msg => msg.ln_id())
    }

    pub fn role(&self) -> Role {
        each_message!(self, msg => msg.role())
    }

    pub fn sender(&self) -> &str {
        each_message!(self, msg => msg.sender())
    }

    pub fn try_chat_msg(&self) -> MessageResult<ChatMessage> {
        each_message!(self, msg => msg.try_chat_msg())
    }

    pub fn chat_msg(&self) -> Option<ChatMessage> {
        each_message!(self, msg => msg.chat_msg())
    }

    pub fn clone_message(&self) -> Self {
        each_message!(self, msg => msg.clone_message().into())
    }

    pub fn to_dict(&self) -> Map<String, Value> {
        each_message!(self, msg => msg.to_dict())
    }

    pub fn to_log(&self) -> Log {
        each_message!(self, msg => msg.to_log())
    }
}

impl From<Instruction> for Message {
    fn from(msg: Instruction) -> Self {
        Message::Instruction(msg)
    }
}

impl From<System> for Message {
    fn from(msg: System) -> Self {
        Message::System(msg)
    }
}

impl From<AssistantResponse> for Message {
    fn from(msg: AssistantResponse) -> Self {
        Message::AssistantResponse(msg)
    }
}

impl From<ActionRequest> for Message {
    fn from(msg: ActionRequest) -> Self {
        Message::ActionRequest(msg)
    }
}

impl From<ActionResponse> for Message {
    fn from(msg: ActionResponse) -> Self {
        Message::ActionResponse(msg)
    }
}

impl From<RoledMessage<Note>> for Message {
    fn from(msg: RoledMessage<Note>) -> Self {
        Message::Generic(msg)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        each_message!(self, msg => fmt::Display::fmt(msg, f))
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_dict().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let data = Map::deserialize(deserializer)?;
        Message::from_dict(data).map_err(de::Error::custom)
    }
}
