use thiserror::Error;

/// Failures the pipeline has to tell apart. Everything else travels as `anyhow::Error`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("original message has no {0} header")]
    MissingHeader(&'static str),

    #[error("content part tree is nested deeper than {limit} levels")]
    PartTreeTooDeep { limit: usize },

    #[error("attachment {filename} has neither inline data nor an attachment id")]
    MissingAttachmentBody { filename: String },

    #[error("cannot decode base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("{operation} failed: {message}")]
    Transport { operation: String, message: String },

    #[error("label {0:?} not found")]
    LabelNotFound(String),

    #[error("cannot serialize reply: {0}")]
    Compose(std::io::Error),

    #[error("settings store error: {0}")]
    Store(String),
}

impl PipelineError {
    pub fn transport(operation: impl Into<String>, message: impl ToString) -> Self {
        PipelineError::Transport {
            operation: operation.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
