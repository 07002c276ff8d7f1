//! Helpers that prepare parameters for running an instruction.
use crate::errors::{MessageError, MessageResult};
use crate::formatting::value_to_text;
use crate::models::instruction::InstructionParts;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parameters of a single instruct step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Instruct {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    /// Ask the model to explain its reasoning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<bool>,
    /// Allow the model to request actions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<bool>,
}

impl Instruct {
    /// The parameters that are set, in declaration order
    pub fn clean_dump(&self) -> MessageResult<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Err(MessageError::InvalidInstruct),
        }
    }

    /// Instruction parts carrying this step's instruction, guidance and context
    pub fn to_parts(&self) -> InstructionParts {
        let mut parts = InstructionParts::new(self.instruction.clone().unwrap_or_default());
        if let Some(guidance) = &self.guidance {
            parts = parts.with_guidance(guidance.clone());
        }
        if let Some(context) = &self.context {
            parts = parts.with_context(context.clone());
        }
        parts
    }
}

/// An instruct step, either typed or as raw parameters
#[derive(Debug, Clone, PartialEq)]
pub enum InstructInput {
    Instruct(Instruct),
    Params(Value),
}

impl From<Instruct> for InstructInput {
    fn from(instruct: Instruct) -> Self {
        InstructInput::Instruct(instruct)
    }
}

impl From<Value> for InstructInput {
    fn from(params: Value) -> Self {
        InstructInput::Params(params)
    }
}

impl From<Map<String, Value>> for InstructInput {
    fn from(params: Map<String, Value>) -> Self {
        InstructInput::Params(Value::Object(params))
    }
}

/// Put `prompt` on its own line ahead of any existing guidance
pub fn prepare_instruct<I: Into<InstructInput>>(
    instruct: I,
    prompt: &str,
) -> MessageResult<Map<String, Value>> {
    let mut params = match instruct.into() {
        InstructInput::Instruct(instruct) => instruct.clean_dump()?,
        InstructInput::Params(Value::Object(params)) => params,
        InstructInput::Params(_) => return Err(MessageError::InvalidInstruct),
    };

    let guidance = match params.get("guidance") {
        None | Some(Value::Null) => String::new(),
        Some(guidance) => value_to_text(guidance),
    };
    params.insert(
        "guidance".to_string(),
        Value::String(format!("\n{}\n{}", prompt, guidance)),
    );
    Ok(params)
}
