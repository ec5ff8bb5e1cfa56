use std::path::PathBuf;

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for a documentation request
#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),
    ProjectNotFound(PathBuf),
    UpstreamTool { message: String, detail: String },
    ParseError { file: PathBuf, message: String },
    OutputError { path: PathBuf, message: String },
    SerializationError(String),
    InvalidConfig(String),
}

impl Error {
    /// Build an upstream-tool failure, keeping the underlying cause for diagnostics
    pub fn upstream(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Error::UpstreamTool {
            message: message.into(),
            detail: detail.into(),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "IO error: {}", e),
            Error::ProjectNotFound(path) => {
                write!(f, "Project path not found: {}", path.display())
            }
            Error::UpstreamTool { message, detail } => {
                if detail.is_empty() {
                    write!(f, "{}", message)
                } else {
                    write!(f, "{}: {}", message, detail)
                }
            }
            Error::ParseError { file, message } => {
                write!(f, "Parse error in {}: {}", file.display(), message)
            }
            Error::OutputError { path, message } => {
                write!(f, "Failed to write {}: {}", path.display(), message)
            }
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Error::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}
