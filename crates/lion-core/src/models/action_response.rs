use super::action_request::{parse_arguments, ActionRequest};
use super::content::{ChatContent, ChatMessage, MessageContent};
use super::message::RoledMessage;
use super::note::Note;
use super::role::Role;
use crate::errors::{MessageError, MessageResult};
use crate::formatting::value_to_text;
use serde_json::{json, Map, Value};

/// The result of a function call, answering an [`ActionRequest`]
pub type ActionResponse = RoledMessage<ActionResponseContent>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionResponseContent {
    action_request_id: Option<String>,
    function: String,
    arguments: Map<String, Value>,
    output: Value,
    response_extra: Note,
    extra: Note,
}

impl ActionResponseContent {
    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn arguments(&self) -> &Map<String, Value> {
        &self.arguments
    }

    pub fn output(&self) -> &Value {
        &self.output
    }

    pub fn action_request_id(&self) -> Option<&str> {
        self.action_request_id.as_deref()
    }

    /// The `{function, arguments, output}` record of the call
    pub fn response(&self) -> Map<String, Value> {
        let mut response = Map::new();
        response.insert("function".to_string(), json!(self.function));
        response.insert("arguments".to_string(), Value::Object(self.arguments.clone()));
        response.insert("output".to_string(), self.output.clone());
        for (key, value) in self.response_extra.as_map() {
            response.insert(key.clone(), value.clone());
        }
        response
    }
}

impl MessageContent for ActionResponseContent {
    const CLASS_NAME: &'static str = "ActionResponse";

    fn default_role() -> Option<Role> {
        Some(Role::Assistant)
    }

    fn to_dict(&self) -> Map<String, Value> {
        let mut dict = Note::new();
        if let Some(id) = &self.action_request_id {
            dict.insert("action_request_id", json!(id));
        }
        dict.insert("action_response", Value::Object(self.response()));
        for (key, value) in self.extra.as_map() {
            dict.insert(key.clone(), value.clone());
        }
        dict.into_dict()
    }

    fn from_dict(data: Map<String, Value>) -> MessageResult<Self> {
        let mut data = Note::from_dict(data);
        let mut content = ActionResponseContent {
            action_request_id: data
                .pop(&["action_request_id"])
                .filter(|id| !id.is_null())
                .map(|id| value_to_text(&id)),
            ..Default::default()
        };

        match data.pop(&["action_response"]) {
            None | Some(Value::Null) => {}
            Some(Value::Object(response)) => {
                let mut response = Note::from_dict(response);
                if let Some(function) = response.pop(&["function"]).filter(|f| !f.is_null()) {
                    content.function = value_to_text(&function);
                }
                content.arguments =
                    parse_arguments(response.pop(&["arguments"]).unwrap_or_default())?;
                content.output = response.pop(&["output"]).unwrap_or_default();
                content.response_extra = response;
            }
            Some(_) => {
                return Err(MessageError::InvalidField {
                    field: "action_response".to_string(),
                    reason: "expected an object".to_string(),
                })
            }
        }

        content.extra = data;
        Ok(content)
    }

    fn format(&self, role: Role) -> MessageResult<ChatMessage> {
        Ok(ChatMessage::new(role, ChatContent::Document(self.response())))
    }
}

impl RoledMessage<ActionResponseContent> {
    /// Answer `request` with `output`.
    ///
    /// The response goes back the way the request came, and the request
    /// records the response's id.
    pub fn from_request(request: &mut ActionRequest, output: Value) -> Self {
        let content = ActionResponseContent {
            action_request_id: Some(request.ln_id().to_string()),
            function: request.function().to_string(),
            arguments: request.arguments().clone(),
            output,
            ..Default::default()
        };
        let response = Self::with_role(Role::Assistant, content)
            .with_parties(request.recipient().to_string(), request.sender().to_string());

        request.content_mut().set_action_response_id(response.ln_id());
        tracing::debug!("Action request {} answered by {}", request.ln_id(), response.ln_id());
        response
    }

    pub fn function(&self) -> &str {
        self.content().function()
    }

    pub fn arguments(&self) -> &Map<String, Value> {
        self.content().arguments()
    }

    pub fn output(&self) -> &Value {
        self.content().output()
    }

    pub fn response(&self) -> Map<String, Value> {
        self.content().response()
    }

    pub fn action_request_id(&self) -> Option<&str> {
        self.content().action_request_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ActionRequest {
        ActionRequest::from_call("add", json!({"a": 1, "b": 2}), Some("assistant"), Some("user"))
            .unwrap()
    }

    #[test]
    fn test_from_request_links_both_messages() {
        let mut request = request();
        let response = ActionResponse::from_request(&mut request, json!(3));

        assert_eq!(response.role(), Role::Assistant);
        assert_eq!(response.action_request_id(), Some(request.ln_id()));
        assert_eq!(request.action_response_id(), Some(response.ln_id()));
        assert!(request.is_responded());

        assert_eq!(response.sender(), "user");
        assert_eq!(response.recipient(), "assistant");
        assert_eq!(response.function(), "add");
        assert_eq!(response.arguments(), request.arguments());
        assert_eq!(response.output(), &json!(3));
    }

    #[test]
    fn test_content_shape() {
        let mut request = request();
        let response = ActionResponse::from_request(&mut request, json!({"sum": 3}));
        assert_eq!(
            response.to_dict()["content"],
            json!({
                "action_request_id": request.ln_id(),
                "action_response": {
                    "function": "add",
                    "arguments": {"a": 1, "b": 2},
                    "output": {"sum": 3},
                },
            })
        );
        assert_eq!(
            response.chat_msg().unwrap().content,
            ChatContent::Document(response.response())
        );
    }

    #[test]
    fn test_null_output_round_trip() {
        let mut request = request();
        let response = ActionResponse::from_request(&mut request, Value::Null);
        let loaded = ActionResponse::from_dict(response.to_dict()).unwrap();
        assert_eq!(loaded, response);
        assert!(loaded.output().is_null());
        assert_eq!(loaded.to_dict()["lion_class"], json!("ActionResponse"));
    }

    #[test]
    fn test_malformed_response_fails() {
        let data = json!({"action_response": "ok"});
        assert!(matches!(
            ActionResponseContent::from_dict(data.as_object().cloned().unwrap()),
            Err(MessageError::InvalidField { .. })
        ));
    }
}
