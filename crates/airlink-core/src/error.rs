use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Envelope errors
    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Unexpected message type: expected {expected}, got {actual}")]
    UnexpectedMessageType { expected: String, actual: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Pack encryption errors
    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(String),

    #[error("Ciphertext length {0} is not a multiple of the block size")]
    MisalignedCiphertext(usize),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    // Status and parameter errors
    #[error("Malformed status reply: {0}")]
    MalformedStatus(String),

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Parameter {0} is read-only")]
    ReadOnlyParameter(String),

    #[error("Invalid value {value} for parameter {name}: {reason}")]
    InvalidParameterValue {
        name: String,
        value: i64,
        reason: String,
    },

    #[error("Command rejected by device: status {0}")]
    CommandRejected(i64),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
