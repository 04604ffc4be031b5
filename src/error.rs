//! Error types for hilite

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for hilite operations
pub type Result<T> = std::result::Result<T, HiliteError>;

/// Grammar loading and configuration errors
///
/// Highlighting itself never fails; everything here is raised while
/// grammars or settings are being loaded.
#[derive(Error, Debug)]
pub enum HiliteError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("grammar `{language}`: malformed document: {message}")]
    Xml { language: String, message: String },

    #[error("grammar `{language}`: rule `{rule}` references undefined rule `{target}`")]
    UndefinedRule {
        language: String,
        rule: String,
        target: String,
    },

    #[error("grammar `{language}`: rule `{rule}` starts undefined rule `{target}`")]
    UndefinedContinuation {
        language: String,
        rule: String,
        target: String,
    },

    #[error("grammar `{language}`: rule `{rule}` has invalid pattern `{pattern}`: {message}")]
    InvalidPattern {
        language: String,
        rule: String,
        pattern: String,
        message: String,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl HiliteError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HiliteError::Io {
            path: path.into(),
            source,
        }
    }
}
