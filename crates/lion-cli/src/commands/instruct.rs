use anyhow::{Context, Result};
use console::style;
use lion_core::models::content::ImageDetail;
use lion_core::models::instruction::{Instruction, InstructionParts};
use lion_core::models::registry::Message;
use lion_core::persist::append_messages;
use serde_json::Value;
use std::path::PathBuf;

pub struct InstructArgs {
    pub instruction: String,
    pub guidance: Option<String>,
    pub context: Vec<String>,
    pub images: Vec<String>,
    pub detail: Option<ImageDetail>,
    pub fields: Vec<String>,
    pub out: Option<PathBuf>,
}

pub fn execute(args: InstructArgs) -> Result<()> {
    let instruction = build_instruction(&args)?;

    let chat = instruction
        .try_chat_msg()
        .context("Failed to render the instruction")?;
    println!("{}", serde_json::to_string_pretty(&chat)?);

    if let Some(out) = &args.out {
        append_messages(out, &[Message::from(instruction)])
            .with_context(|| format!("Failed to write {}", out.display()))?;
        eprintln!("{} {}", style("Saved to").green(), out.display());
    }
    Ok(())
}

fn build_instruction(args: &InstructArgs) -> Result<Instruction> {
    let mut parts = InstructionParts::new(args.instruction.as_str())
        .with_context(args.context.iter().map(|c| parse_context(c)).collect::<Vec<_>>())
        .with_images(args.images.clone());
    if let Some(guidance) = &args.guidance {
        parts = parts.with_guidance(guidance.as_str());
    }
    if let Some(detail) = args.detail {
        parts = parts.with_image_detail(detail);
    }
    if !args.fields.is_empty() {
        parts = parts.with_request_fields(args.fields.clone());
    }
    Ok(Instruction::from_parts(parts)?)
}

// Context given on the command line is JSON when it parses as such.
fn parse_context(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
