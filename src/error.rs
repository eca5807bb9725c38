use thiserror::Error;

/// Main error type for entgraph
#[derive(Error, Debug)]
pub enum GraphError {
    /// Transport-level failure (DNS, connect, timeout, body read)
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status while retrieving an entity document.
    /// "Not found" and server errors are reported the same way.
    #[error("Fetch error for '{entity}': HTTP {status}")]
    Fetch { entity: String, status: u16 },

    /// Document body could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// Document decoded but lacks a field the graph needs
    #[error("Missing field '{field}' in document for '{entity}'")]
    MissingField { entity: String, field: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GraphError {
    /// True for failures that come from the upstream data host rather than
    /// from the caller's input.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            GraphError::Network(_)
                | GraphError::Fetch { .. }
                | GraphError::Parse(_)
                | GraphError::MissingField { .. }
        )
    }
}

impl From<reqwest::Error> for GraphError {
    fn from(err: reqwest::Error) -> Self {
        GraphError::Network(err.to_string())
    }
}

/// Convenient Result type using GraphError
pub type Result<T> = std::result::Result<T, GraphError>;
