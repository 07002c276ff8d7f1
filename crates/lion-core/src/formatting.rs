//! Rendering of message content into provider-facing text and parts.
use crate::errors::MessageResult;
use crate::models::content::{ContentPart, ImageDetail};
use crate::prompt_template::load_prompt;
use crate::settings::settings;
use serde::Serialize;
use serde_json::{json, Map, Value};
use url::Url;

const TASK_TEMPLATE: &str = "\n---\n # Task\n{% for section in sections %}## **Task {{ section.title }}**\n{{ section.body }}\n\n{% endfor %}\n\n---\n";

/// Content keys rendered as task sections, in the order they may appear
const TASK_KEYS: [&str; 5] = [
    "guidance",
    "instruction",
    "context",
    "request_response_format",
    "tool_schemas",
];

#[derive(Serialize)]
struct Section {
    title: String,
    body: String,
}

pub fn prepare_request_response_format(request_fields: &Map<String, Value>) -> String {
    format!(
        "**MUST RETURN JSON-PARSEABLE RESPONSE ENCLOSED BY JSON CODE BLOCKS.** \n```json\n{:#}\n```",
        Value::Object(request_fields.clone())
    )
    .trim()
    .to_string()
}

/// Render a value as plain text: strings verbatim, everything else as JSON
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn format_text_item(item: &Value) -> String {
    let items = match item {
        Value::Array(items) => items.as_slice(),
        other => std::slice::from_ref(other),
    };

    let mut msg = String::new();
    for entry in items {
        match entry {
            Value::Object(map) => {
                for (k, v) in map {
                    msg.push_str(&format!("- {}: {} \n\n", k, value_to_text(v)));
                }
            }
            other => {
                msg.push_str(&value_to_text(other));
                msg.push('\n');
            }
        }
    }
    msg
}

/// Render instruction content as a task description.
///
/// A string `plain_content` replaces the whole rendering.
pub fn format_text_content(content: &Map<String, Value>) -> MessageResult<String> {
    if let Some(Value::String(plain)) = content.get("plain_content") {
        return Ok(plain.clone());
    }

    let sections: Vec<Section> = content
        .iter()
        .filter(|(k, _)| TASK_KEYS.contains(&k.as_str()))
        .map(|(k, v)| Section {
            title: match k.as_str() {
                "request_response_format" => "response format".to_string(),
                other => other.to_string(),
            },
            body: format_text_item(v),
        })
        .collect();

    Ok(load_prompt(TASK_TEMPLATE, &json!({ "sections": sections }))?)
}

pub fn format_image_item(image: &str, detail: ImageDetail) -> ContentPart {
    ContentPart::image_url(image_url(image), detail)
}

/// Text part first, then one part per image
pub fn format_image_content(
    text_content: &str,
    images: &[String],
    image_detail: ImageDetail,
) -> Vec<ContentPart> {
    let mut parts = Vec::with_capacity(images.len() + 1);
    parts.push(ContentPart::text(text_content));
    parts.extend(images.iter().map(|image| format_image_item(image, image_detail)));
    parts
}

/// Prefix the system message with its datetime, when there is one
pub fn format_system_content(system_datetime: Option<&str>, system_message: &str) -> String {
    match system_datetime {
        Some(datetime) => format!("System datetime: {}\n\n{}", datetime, system_message),
        None => system_message.to_string(),
    }
}

// Absolute http(s)/data urls are sent as given; anything else is base64 data.
fn image_url(image: &str) -> String {
    match Url::parse(image) {
        Ok(url) if matches!(url.scheme(), "http" | "https" | "data") => image.to_string(),
        _ => format!("data:{};base64,{}", settings().image_mime_type, image),
    }
}
