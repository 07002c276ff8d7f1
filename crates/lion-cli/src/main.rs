use anyhow::Result;
use clap::{Parser, Subcommand};
use lion_core::models::content::ImageDetail;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the chat payload of every message in a JSONL file
    Render {
        /// Path to the JSONL file of messages
        file: PathBuf,
    },

    /// Build an instruction and print its chat payload
    Instruct {
        /// The instruction text
        instruction: String,

        /// Guidance for the model
        #[arg(short, long)]
        guidance: Option<String>,

        /// Context item, repeatable; JSON values are parsed, anything else is text
        #[arg(short, long = "context")]
        context: Vec<String>,

        /// Image url or base64 data, repeatable
        #[arg(short, long = "image")]
        images: Vec<String>,

        /// Image detail level
        #[arg(short, long)]
        detail: Option<ImageDetail>,

        /// Name of a field the response must contain, repeatable
        #[arg(short, long = "field")]
        fields: Vec<String>,

        /// Append the instruction to this JSONL file
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print the log record of every message in a JSONL file
    Log {
        /// Path to the JSONL file of messages
        file: PathBuf,

        /// Also write the log records to this JSONL file
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Render { file } => commands::render::execute(&file),
        Command::Instruct {
            instruction,
            guidance,
            context,
            images,
            detail,
            fields,
            out,
        } => commands::instruct::execute(commands::instruct::InstructArgs {
            instruction,
            guidance,
            context,
            images,
            detail,
            fields,
            out,
        }),
        Command::Log { file, out } => commands::log::execute(&file, out.as_deref()),
    }
}
