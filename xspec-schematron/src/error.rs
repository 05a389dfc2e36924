use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot load schema: {0}")]
    Load(String),
    #[error("invalid expression '{expression}' in {location}: {message}")]
    Compile {
        location: String,
        expression: String,
        message: String,
    },
    #[error("validation failed in rule '{context}': {message}")]
    Validate { context: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
