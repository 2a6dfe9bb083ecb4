use thiserror::Error;

/// Top-level error type for the glyphmatch pipeline.
///
/// Scoring is total: comparing grids of different sizes, finding no
/// qualifying template or receiving an empty image are not errors and never
/// surface here.
#[derive(Debug, Error)]
pub enum OcrError {
    /// Recognition was set up without a usable template library.
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Malformed template library: {0}")]
    MalformedTemplateLibrary(String),

    #[error("Image decode error: {0}")]
    ImageDecode(String),

    #[error("Dictionary error: {0}")]
    Dictionary(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OcrError>;
