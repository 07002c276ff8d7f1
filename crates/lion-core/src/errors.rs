use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum MessageError {
    #[error("Invalid message role: {0}")]
    InvalidRole(String),

    #[error("Only one of request_model or request_fields can be provided")]
    ConflictingRequest,

    #[error("Expected lion_class {expected}, found {found}")]
    ClassMismatch { expected: String, found: String },

    #[error("Unable to find class {0}")]
    UnknownClass(String),

    #[error("Field '{0}' already exists")]
    FieldExists(String),

    #[error("Invalid value for field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Invalid sender or recipient: {0}")]
    InvalidSenderRecipient(String),

    #[error("instruct needs to be an Instruct object or a dictionary of valid parameters")]
    InvalidInstruct,

    #[error("Log can only be loaded from a previously saved log entry: {0}")]
    InvalidLog(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type MessageResult<T> = Result<T, MessageError>;
