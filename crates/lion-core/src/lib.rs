pub mod errors;
pub mod formatting;
pub mod models;
pub mod operations;
pub mod persist;
pub mod prompt_template;
pub mod settings;
