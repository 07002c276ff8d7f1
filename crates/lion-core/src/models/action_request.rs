use super::content::{ChatContent, ChatMessage, MessageContent};
use super::id::validate_sender_recipient;
use super::message::RoledMessage;
use super::note::Note;
use super::role::Role;
use crate::errors::{MessageError, MessageResult};
use crate::formatting::value_to_text;
use serde_json::{json, Map, Value};

/// A model asking for a function to be called
pub type ActionRequest = RoledMessage<ActionRequestContent>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionRequestContent {
    function: String,
    arguments: Map<String, Value>,
    // Keys of `action_request` other than function and arguments
    request_extra: Note,
    action_response_id: Option<String>,
    extra: Note,
}

impl ActionRequestContent {
    pub fn new<S: Into<String>>(function: S, arguments: Map<String, Value>) -> Self {
        ActionRequestContent {
            function: function.into(),
            arguments,
            ..Default::default()
        }
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn arguments(&self) -> &Map<String, Value> {
        &self.arguments
    }

    pub fn action_response_id(&self) -> Option<&str> {
        self.action_response_id.as_deref()
    }

    pub(crate) fn set_action_response_id<S: Into<String>>(&mut self, id: S) {
        self.action_response_id = Some(id.into());
    }

    /// The `{function, arguments}` call, without any recorded output
    pub fn request(&self) -> Map<String, Value> {
        let mut request = Map::new();
        request.insert("function".to_string(), json!(self.function));
        request.insert("arguments".to_string(), Value::Object(self.arguments.clone()));
        for (key, value) in self.request_extra.as_map() {
            request.insert(key.clone(), value.clone());
        }
        request
    }
}

impl MessageContent for ActionRequestContent {
    const CLASS_NAME: &'static str = "ActionRequest";

    fn default_role() -> Option<Role> {
        Some(Role::Assistant)
    }

    fn to_dict(&self) -> Map<String, Value> {
        let mut dict = Note::new();
        dict.insert("action_request", Value::Object(self.request()));
        if let Some(id) = &self.action_response_id {
            dict.insert("action_response_id", json!(id));
        }
        for (key, value) in self.extra.as_map() {
            dict.insert(key.clone(), value.clone());
        }
        dict.into_dict()
    }

    fn from_dict(data: Map<String, Value>) -> MessageResult<Self> {
        let mut data = Note::from_dict(data);
        let mut content = ActionRequestContent::default();

        match data.pop(&["action_request"]) {
            None | Some(Value::Null) => {}
            Some(Value::Object(request)) => {
                let mut request = Note::from_dict(request);
                if let Some(function) = request.pop(&["function"]).filter(|f| !f.is_null()) {
                    content.function = value_to_text(&function);
                }
                content.arguments =
                    parse_arguments(request.pop(&["arguments"]).unwrap_or_default())?;
                request.pop(&["output"]);
                content.request_extra = request;
            }
            Some(_) => {
                return Err(MessageError::InvalidField {
                    field: "action_request".to_string(),
                    reason: "expected an object".to_string(),
                })
            }
        }

        content.action_response_id = data
            .pop(&["action_response_id"])
            .filter(|id| !id.is_null())
            .map(|id| value_to_text(&id));
        content.extra = data;
        Ok(content)
    }

    fn format(&self, role: Role) -> MessageResult<ChatMessage> {
        Ok(ChatMessage::new(role, ChatContent::Document(self.request())))
    }
}

/// Accept an argument map, or JSON text holding one. Null means no arguments.
pub(crate) fn parse_arguments(arguments: Value) -> MessageResult<Map<String, Value>> {
    let parsed = match arguments {
        Value::Null => return Ok(Map::new()),
        Value::String(text) => serde_json::from_str::<Value>(&text).ok(),
        other => Some(other),
    };
    match parsed {
        Some(Value::Object(map)) => Ok(map),
        _ => Err(MessageError::InvalidField {
            field: "arguments".to_string(),
            reason: "arguments must be a dictionary".to_string(),
        }),
    }
}

impl RoledMessage<ActionRequestContent> {
    /// Build a request to call `function` with `arguments`
    pub fn from_call<S: Into<String>>(
        function: S,
        arguments: Value,
        sender: Option<&str>,
        recipient: Option<&str>,
    ) -> MessageResult<Self> {
        let sender = validate_sender_recipient(sender)?;
        let recipient = validate_sender_recipient(recipient)?;
        let content = ActionRequestContent::new(function, parse_arguments(arguments)?);
        Ok(Self::with_role(Role::Assistant, content).with_parties(sender, recipient))
    }

    pub fn function(&self) -> &str {
        self.content().function()
    }

    pub fn arguments(&self) -> &Map<String, Value> {
        self.content().arguments()
    }

    pub fn request(&self) -> Map<String, Value> {
        self.content().request()
    }

    /// Id of the response answering this request, once there is one
    pub fn action_response_id(&self) -> Option<&str> {
        self.content().action_response_id()
    }

    pub fn is_responded(&self) -> bool {
        self.action_response_id().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ActionRequest {
        ActionRequest::from_call(
            "multiply",
            json!({"a": 6, "b": 7}),
            Some("assistant"),
            Some("user"),
        )
        .unwrap()
    }

    #[test]
    fn test_from_call() {
        let msg = request();
        assert_eq!(msg.role(), Role::Assistant);
        assert_eq!(msg.function(), "multiply");
        assert_eq!(msg.arguments().get("b"), Some(&json!(7)));
        assert_eq!(msg.sender(), "assistant");
        assert_eq!(msg.recipient(), "user");
        assert!(!msg.is_responded());
        assert_eq!(
            msg.to_dict()["content"],
            json!({"action_request": {"function": "multiply", "arguments": {"a": 6, "b": 7}}})
        );
    }

    #[test]
    fn test_arguments_from_json_text() {
        let msg = ActionRequest::from_call("search", json!(r#"{"q": "rust"}"#), None, None).unwrap();
        assert_eq!(msg.arguments().get("q"), Some(&json!("rust")));

        for bad in [json!("not json"), json!("[1, 2]"), json!(3)] {
            assert!(matches!(
                ActionRequest::from_call("search", bad, None, None),
                Err(MessageError::InvalidField { .. })
            ));
        }
    }

    #[test]
    fn test_request_drops_output() {
        let data = json!({
            "action_request": {"function": "f", "arguments": {}, "output": 1, "note": "x"},
            "action_response_id": "msg_1",
        });
        let content =
            ActionRequestContent::from_dict(data.as_object().cloned().unwrap()).unwrap();
        assert_eq!(
            Value::Object(content.request()),
            json!({"function": "f", "arguments": {}, "note": "x"})
        );
        assert_eq!(content.action_response_id(), Some("msg_1"));
    }

    #[test]
    fn test_chat_msg_sends_request() {
        let chat = request().chat_msg().unwrap();
        assert_eq!(chat.role, Role::Assistant);
        assert_eq!(
            chat.to_value().unwrap()["content"],
            json!({"function": "multiply", "arguments": {"a": 6, "b": 7}})
        );
    }

    #[test]
    fn test_round_trip() {
        let mut msg = request();
        msg.content_mut().set_action_response_id("msg_0");
        let loaded = ActionRequest::from_dict(msg.to_dict()).unwrap();
        assert_eq!(loaded, msg);
        assert!(loaded.is_responded());
        assert_eq!(loaded.to_dict()["lion_class"], json!("ActionRequest"));
    }
}
