use super::content::{ChatContent, ChatMessage, ImageDetail, MessageContent};
use super::id::validate_sender_recipient;
use super::message::RoledMessage;
use super::note::Note;
use super::request_model::RequestModel;
use super::role::Role;
use crate::errors::{MessageError, MessageResult};
use crate::formatting::{
    format_image_content, format_text_content, prepare_request_response_format, value_to_text,
};
use crate::settings::settings;
use serde_json::{json, Map, Value};

/// A user message asking a model to do something
pub type Instruction = RoledMessage<InstructionContent>;

/// Placeholder spec for a requested field given only by name
pub const UNSPECIFIED_FIELD: &str = "...";

/// Either a single item or a sequence of them.
///
/// Setters that accept this wrap a single item into a one-element sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

impl From<&str> for OneOrMany<String> {
    fn from(value: &str) -> Self {
        OneOrMany::One(value.to_string())
    }
}

impl From<String> for OneOrMany<String> {
    fn from(value: String) -> Self {
        OneOrMany::One(value)
    }
}

impl From<Vec<String>> for OneOrMany<String> {
    fn from(values: Vec<String>) -> Self {
        OneOrMany::Many(values)
    }
}

impl From<Vec<&str>> for OneOrMany<String> {
    fn from(values: Vec<&str>) -> Self {
        OneOrMany::Many(values.into_iter().map(str::to_string).collect())
    }
}

impl From<Value> for OneOrMany<Value> {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => OneOrMany::Many(items),
            Value::Null => OneOrMany::Many(Vec::new()),
            other => OneOrMany::One(other),
        }
    }
}

impl From<Vec<Value>> for OneOrMany<Value> {
    fn from(values: Vec<Value>) -> Self {
        OneOrMany::Many(values)
    }
}

impl From<&str> for OneOrMany<Value> {
    fn from(value: &str) -> Self {
        OneOrMany::One(Value::String(value.to_string()))
    }
}

/// Requested output fields, either fully specified or by name only
#[derive(Debug, Clone, PartialEq)]
pub enum RequestFields {
    Specs(Map<String, Value>),
    Names(Vec<String>),
}

impl RequestFields {
    pub fn is_empty(&self) -> bool {
        match self {
            RequestFields::Specs(map) => map.is_empty(),
            RequestFields::Names(names) => names.is_empty(),
        }
    }

    pub fn into_map(self) -> Map<String, Value> {
        match self {
            RequestFields::Specs(map) => map,
            RequestFields::Names(names) => names
                .into_iter()
                .map(|name| (name, json!(UNSPECIFIED_FIELD)))
                .collect(),
        }
    }
}

impl From<Map<String, Value>> for RequestFields {
    fn from(map: Map<String, Value>) -> Self {
        RequestFields::Specs(map)
    }
}

impl From<Vec<String>> for RequestFields {
    fn from(names: Vec<String>) -> Self {
        RequestFields::Names(names)
    }
}

impl From<Vec<&str>> for RequestFields {
    fn from(names: Vec<&str>) -> Self {
        RequestFields::Names(names.into_iter().map(str::to_string).collect())
    }
}

/// Structured content of an [`Instruction`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstructionContent {
    guidance: Option<String>,
    instruction: Option<Value>,
    context: Option<Vec<Value>>,
    plain_content: Option<String>,
    images: Option<Vec<String>>,
    image_detail: Option<ImageDetail>,
    request_fields: Option<Map<String, Value>>,
    request_response_format: Option<String>,
    request_model: Option<RequestModel>,
    tool_schemas: Option<Value>,
    extra: Note,
}

impl InstructionContent {
    pub fn guidance(&self) -> Option<&str> {
        self.guidance.as_deref()
    }

    /// Non-string guidance is stored as its JSON text
    pub fn set_guidance<V: Into<Value>>(&mut self, guidance: V) {
        self.guidance = Some(value_to_text(&guidance.into()));
    }

    /// The instruction, shadowed by `plain_content` when one is set
    pub fn instruction(&self) -> Option<Value> {
        match &self.plain_content {
            Some(plain) => Some(Value::String(plain.clone())),
            None => self.instruction.clone(),
        }
    }

    pub fn set_instruction<V: Into<Value>>(&mut self, instruction: V) {
        self.instruction = Some(instruction.into());
    }

    pub fn context(&self) -> Option<&[Value]> {
        self.context.as_deref()
    }

    pub fn set_context<V: Into<OneOrMany<Value>>>(&mut self, context: V) {
        self.context = Some(context.into().into_vec());
    }

    pub fn plain_content(&self) -> Option<&str> {
        self.plain_content.as_deref()
    }

    pub fn set_plain_content<S: Into<String>>(&mut self, plain_content: S) {
        self.plain_content = Some(plain_content.into());
    }

    pub fn images(&self) -> &[String] {
        self.images.as_deref().unwrap_or_default()
    }

    pub fn has_images(&self) -> bool {
        self.images.is_some()
    }

    pub fn set_images<V: Into<OneOrMany<String>>>(&mut self, images: V) {
        self.images = Some(images.into().into_vec());
    }

    pub fn image_detail(&self) -> Option<ImageDetail> {
        self.image_detail
    }

    pub fn set_image_detail(&mut self, image_detail: ImageDetail) {
        self.image_detail = Some(image_detail);
    }

    pub fn request_fields(&self) -> Option<&Map<String, Value>> {
        self.request_fields.as_ref()
    }

    /// Store the requested fields along with the response format derived
    /// from them; the two always change together.
    pub fn set_request_fields<F: Into<RequestFields>>(&mut self, request_fields: F) {
        let fields = request_fields.into().into_map();
        self.request_response_format = Some(prepare_request_response_format(&fields));
        self.request_fields = Some(fields);
    }

    pub fn request_response_format(&self) -> Option<&str> {
        self.request_response_format.as_deref()
    }

    pub fn request_model(&self) -> Option<&RequestModel> {
        self.request_model.as_ref()
    }

    /// Ask for output shaped like `model`.
    ///
    /// The schema is appended to the context as `respond_schema_info` and
    /// the requested fields are replaced by the model's field breakdown.
    pub fn set_request_model(&mut self, model: RequestModel) {
        self.set_request_fields(Map::new());
        let mut kwargs = Map::new();
        kwargs.insert("respond_schema_info".to_string(), model.json_schema().clone());
        self.extend_context(Vec::new(), kwargs);
        let fields = model.break_down();
        self.request_model = Some(model);
        self.set_request_fields(fields);
    }

    pub fn tool_schemas(&self) -> Option<&Value> {
        self.tool_schemas.as_ref()
    }

    pub fn set_tool_schemas(&mut self, tool_schemas: Value) {
        self.tool_schemas = Some(tool_schemas);
    }

    /// Keys loaded from a document that have no dedicated field
    pub fn extra(&self) -> &Note {
        &self.extra
    }

    pub fn extend_images<V: Into<OneOrMany<String>>>(
        &mut self,
        images: V,
        image_detail: Option<ImageDetail>,
    ) {
        let mut all = self.images.take().unwrap_or_default();
        all.extend(images.into().into_vec());
        self.set_images(all);
        if let Some(detail) = image_detail {
            self.image_detail = Some(detail);
        }
    }

    /// Append positional items verbatim, then each keyword item as a
    /// one-key object.
    pub fn extend_context(&mut self, args: Vec<Value>, kwargs: Map<String, Value>) {
        let mut context = self.context.take().unwrap_or_default();
        context.extend(args);
        context.extend(kwargs.into_iter().map(|(k, v)| {
            let mut entry = Map::new();
            entry.insert(k, v);
            Value::Object(entry)
        }));
        self.set_context(context);
    }
}

impl MessageContent for InstructionContent {
    const CLASS_NAME: &'static str = "Instruction";

    fn default_role() -> Option<Role> {
        Some(Role::User)
    }

    fn to_dict(&self) -> Map<String, Value> {
        let mut dict = Map::new();
        if let Some(guidance) = &self.guidance {
            dict.insert("guidance".to_string(), json!(guidance));
        }
        if let Some(instruction) = &self.instruction {
            dict.insert("instruction".to_string(), instruction.clone());
        }
        if let Some(context) = &self.context {
            dict.insert("context".to_string(), json!(context));
        }
        if let Some(plain_content) = &self.plain_content {
            dict.insert("plain_content".to_string(), json!(plain_content));
        }
        if let Some(images) = &self.images {
            dict.insert("images".to_string(), json!(images));
        }
        if let Some(detail) = self.image_detail {
            dict.insert("image_detail".to_string(), json!(detail.as_ref()));
        }
        if let Some(fields) = &self.request_fields {
            dict.insert("request_fields".to_string(), Value::Object(fields.clone()));
        }
        if let Some(format) = &self.request_response_format {
            dict.insert("request_response_format".to_string(), json!(format));
        }
        if let Some(model) = &self.request_model {
            dict.insert(
                "request_model".to_string(),
                json!({"name": model.name(), "schema": model.json_schema()}),
            );
        }
        if let Some(tool_schemas) = &self.tool_schemas {
            dict.insert("tool_schemas".to_string(), tool_schemas.clone());
        }
        for (key, value) in self.extra.as_map() {
            dict.insert(key.clone(), value.clone());
        }
        dict
    }

    fn from_dict(data: Map<String, Value>) -> MessageResult<Self> {
        let mut content = InstructionContent::default();
        for (key, value) in data {
            if value.is_null() {
                continue;
            }
            match key.as_str() {
                "guidance" => content.set_guidance(value),
                "instruction" => content.instruction = Some(value),
                "context" => content.set_context(value),
                "plain_content" => content.plain_content = Some(value_to_text(&value)),
                "images" => content.images = Some(parse_images(value)?),
                "image_detail" => {
                    let detail = value_to_text(&value);
                    let parsed = detail.parse().map_err(|_| MessageError::InvalidField {
                        field: key.clone(),
                        reason: format!("unknown image detail '{}'", detail),
                    })?;
                    content.image_detail = Some(parsed);
                }
                "request_fields" => match value {
                    Value::Object(fields) => content.request_fields = Some(fields),
                    _ => {
                        return Err(MessageError::InvalidField {
                            field: key,
                            reason: "expected an object".to_string(),
                        })
                    }
                },
                "request_response_format" => {
                    content.request_response_format = Some(value_to_text(&value))
                }
                "request_model" => content.request_model = Some(serde_json::from_value(value)?),
                "tool_schemas" => content.tool_schemas = Some(value),
                _ => {
                    content.extra.insert(key, value);
                }
            }
        }
        Ok(content)
    }

    /// Render as task text, or as text plus image parts when images are set
    fn format(&self, role: Role) -> MessageResult<ChatMessage> {
        let text = format_text_content(&self.to_dict())?;
        let content = match &self.images {
            None => ChatContent::Text(text),
            Some(images) => {
                let detail = self
                    .image_detail
                    .unwrap_or(settings().default_image_detail);
                ChatContent::Parts(format_image_content(&text, images, detail))
            }
        };
        Ok(ChatMessage::new(role, content))
    }
}

fn parse_images(value: Value) -> MessageResult<Vec<String>> {
    match value {
        Value::String(image) => Ok(vec![image]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(image) => Ok(image),
                other => Err(MessageError::InvalidField {
                    field: "images".to_string(),
                    reason: format!("expected an image reference, found {}", other),
                }),
            })
            .collect(),
        other => Err(MessageError::InvalidField {
            field: "images".to_string(),
            reason: format!("expected a list of image references, found {}", other),
        }),
    }
}

/// Inputs for building a fresh [`Instruction`]
#[derive(Debug, Clone, Default)]
pub struct InstructionParts {
    instruction: Option<Value>,
    guidance: Option<Value>,
    context: Vec<Value>,
    images: Vec<String>,
    sender: Option<String>,
    recipient: Option<String>,
    request_fields: Option<RequestFields>,
    plain_content: Option<String>,
    image_detail: Option<ImageDetail>,
    request_model: Option<RequestModel>,
    tool_schemas: Option<Value>,
}

impl InstructionParts {
    pub fn new<V: Into<Value>>(instruction: V) -> Self {
        InstructionParts {
            instruction: Some(instruction.into()),
            ..Default::default()
        }
    }

    pub fn with_guidance<V: Into<Value>>(mut self, guidance: V) -> Self {
        self.guidance = Some(guidance.into());
        self
    }

    pub fn with_context<V: Into<OneOrMany<Value>>>(mut self, context: V) -> Self {
        self.context.extend(context.into().into_vec());
        self
    }

    pub fn with_images<V: Into<OneOrMany<String>>>(mut self, images: V) -> Self {
        self.images.extend(images.into().into_vec());
        self
    }

    pub fn with_sender<S: Into<String>>(mut self, sender: S) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn with_recipient<S: Into<String>>(mut self, recipient: S) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    pub fn with_request_fields<F: Into<RequestFields>>(mut self, request_fields: F) -> Self {
        self.request_fields = Some(request_fields.into());
        self
    }

    pub fn with_plain_content<S: Into<String>>(mut self, plain_content: S) -> Self {
        self.plain_content = Some(plain_content.into());
        self
    }

    pub fn with_image_detail(mut self, image_detail: ImageDetail) -> Self {
        self.image_detail = Some(image_detail);
        self
    }

    pub fn with_request_model(mut self, request_model: RequestModel) -> Self {
        self.request_model = Some(request_model);
        self
    }

    pub fn with_tool_schemas(mut self, tool_schemas: Value) -> Self {
        self.tool_schemas = Some(tool_schemas);
        self
    }
}

/// Assemble instruction content from its parts.
///
/// `context` is always present. Images bring an image detail with them,
/// and requested fields bring their response format.
pub fn prepare_instruction_content(parts: InstructionParts) -> MessageResult<InstructionContent> {
    if parts.request_model.is_some() && parts.request_fields.is_some() {
        return Err(MessageError::ConflictingRequest);
    }

    let mut content = InstructionContent::default();
    if let Some(guidance) = parts.guidance.filter(is_truthy) {
        content.set_guidance(guidance);
    }
    if let Some(instruction) = parts.instruction.filter(is_truthy) {
        content.set_instruction(instruction);
    }
    content.set_context(parts.context);

    if !parts.images.is_empty() {
        content.set_images(parts.images);
        content.set_image_detail(
            parts
                .image_detail
                .unwrap_or(settings().default_image_detail),
        );
    }
    if let Some(fields) = parts.request_fields.filter(|f| !f.is_empty()) {
        content.set_request_fields(fields);
    }
    if let Some(model) = parts.request_model {
        content.set_request_model(model);
    }
    if let Some(plain) = parts.plain_content.filter(|p| !p.is_empty()) {
        content.set_plain_content(plain);
    }
    if let Some(tool_schemas) = parts.tool_schemas.filter(is_truthy) {
        content.set_tool_schemas(tool_schemas);
    }
    Ok(content)
}

/// Changes applied by [`Instruction::update`]. Empty values are skipped.
#[derive(Debug, Clone, Default)]
pub struct InstructionUpdate {
    pub guidance: Option<Value>,
    pub instruction: Option<Value>,
    pub request_fields: Option<RequestFields>,
    pub plain_content: Option<String>,
    pub request_model: Option<RequestModel>,
    pub images: Option<OneOrMany<String>>,
    pub image_detail: Option<ImageDetail>,
    pub tool_schemas: Option<Value>,
    /// Appended to the context as-is
    pub context_args: Vec<Value>,
    /// Appended to the context as one-key objects
    pub context_kwargs: Map<String, Value>,
}

impl RoledMessage<InstructionContent> {
    /// Build a user instruction. The sender defaults to `user`.
    pub fn from_parts(mut parts: InstructionParts) -> MessageResult<Self> {
        let sender = parts
            .sender
            .take()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| Role::User.to_string());
        let sender = validate_sender_recipient(Some(&sender))?;
        let recipient = validate_sender_recipient(parts.recipient.take().as_deref())?;
        let content = prepare_instruction_content(parts)?;
        Ok(Self::with_role(Role::User, content).with_parties(sender, recipient))
    }

    pub fn extend_images<V: Into<OneOrMany<String>>>(
        &mut self,
        images: V,
        image_detail: Option<ImageDetail>,
    ) {
        self.content_mut().extend_images(images, image_detail);
    }

    pub fn extend_context(&mut self, args: Vec<Value>, kwargs: Map<String, Value>) {
        self.content_mut().extend_context(args, kwargs);
    }

    /// Apply every non-empty change, then extend the context.
    ///
    /// Giving both a request model and request fields is an error.
    pub fn update(&mut self, update: InstructionUpdate) -> MessageResult<()> {
        if update.request_model.is_some()
            && update.request_fields.as_ref().is_some_and(|f| !f.is_empty())
        {
            return Err(MessageError::ConflictingRequest);
        }

        let content = self.content_mut();
        if let Some(guidance) = update.guidance.filter(is_truthy) {
            content.set_guidance(guidance);
        }
        if let Some(instruction) = update.instruction.filter(is_truthy) {
            content.set_instruction(instruction);
        }
        if let Some(plain) = update.plain_content.filter(|p| !p.is_empty()) {
            content.set_plain_content(plain);
        }
        if let Some(fields) = update.request_fields.filter(|f| !f.is_empty()) {
            content.set_request_fields(fields);
        }
        if let Some(model) = update.request_model {
            content.set_request_model(model);
        }
        if let Some(images) = update.images {
            let images = images.into_vec();
            if !images.is_empty() {
                content.set_images(images);
            }
        }
        if let Some(detail) = update.image_detail {
            content.set_image_detail(detail);
        }
        if let Some(tool_schemas) = update.tool_schemas.filter(is_truthy) {
            content.set_tool_schemas(tool_schemas);
        }
        content.extend_context(update.context_args, update.context_kwargs);
        Ok(())
    }
}

// Empty strings, containers, zero, false and null count as "not provided".
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
