//! Pandoc AST error types.

/// Error decoding or encoding a pandoc JSON document.
#[derive(Debug, thiserror::Error)]
pub enum PandocError {
    /// Input is not valid JSON.
    #[error("invalid pandoc JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// JSON is valid but does not have the shape of a pandoc document.
    #[error("malformed pandoc document: {0}")]
    Malformed(String),
    /// I/O error while reading or writing the document.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
