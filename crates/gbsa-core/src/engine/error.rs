use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PrepError>;

#[derive(Debug, Error)]
pub enum PrepError {
    #[error("Missing required configuration field: '{0}'")]
    MissingField(String),

    #[error("Invalid value for configuration field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Required input file not found: {path}", path = .0.display())]
    MissingInput(PathBuf),

    #[error("Workspace path exists but is not a directory: {path}", path = .0.display())]
    WorkspaceConflict(PathBuf),

    #[error("Required executable '{0}' not found in PATH")]
    MissingExecutable(String),

    #[error("Command `{command}` failed ({status}): {output}")]
    ExternalCommandFailed {
        command: String,
        status: String,
        output: String,
    },

    #[error("Failed to parse configuration '{path}': {message}", path = path.display())]
    Parse { path: PathBuf, message: String },

    #[error("I/O error on '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PrepError {
    pub fn invalid(field: impl Into<String>, reason: impl ToString) -> Self {
        PrepError::InvalidField {
            field: field.into(),
            reason: reason.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PrepError::Io {
            path: path.into(),
            source,
        }
    }
}
