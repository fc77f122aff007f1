//! Error types for cfdrive-core

use aws_sdk_s3::error::ProvideErrorMetadata;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for cfdrive-core
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for cfdrive-core
#[derive(Error, Debug)]
pub enum Error {
    /// Source file does not exist (carries the resolved absolute path)
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// A required configuration value is absent
    #[error("Missing configuration: {0} is not set")]
    MissingConfiguration(String),

    /// Invalid configuration format or value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Object store / transport failure
    #[error("Transfer failed: {0}")]
    Transfer(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::InvalidConfig(err.to_string())
    }
}

// Generic SdkError conversion for all S3 operations
impl<E, R> From<aws_sdk_s3::error::SdkError<E, R>> for Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + 'static,
{
    fn from(err: aws_sdk_s3::error::SdkError<E, R>) -> Self {
        // The full context includes the raw response; keep it out of the message.
        tracing::debug!("{}", aws_sdk_s3::error::DisplayErrorContext(&err));

        let message = match (err.code(), err.message()) {
            (Some(code), Some(message)) => format!("{}: {}", code, message),
            (Some(code), None) => code.to_string(),
            _ => source_chain(&err),
        };
        Error::Transfer(message)
    }
}

/// `Display` of an error and each of its sources, joined by `": "`
fn source_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

// ByteStreamError conversion
impl From<aws_sdk_s3::primitives::ByteStreamError> for Error {
    fn from(err: aws_sdk_s3::primitives::ByteStreamError) -> Self {
        Error::Transfer(err.to_string())
    }
}
