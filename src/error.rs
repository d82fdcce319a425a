use thiserror::Error;

/// Main error type for the subtitle filter
#[derive(Error, Debug)]
pub enum FilterError {
    /// A catalog selection outside `[0, count)`
    #[error("Invalid external subtitle index: {index} (count={count})")]
    InvalidIndex { index: usize, count: usize },

    /// A frame was requested while no consumer is connected
    #[error("No subtitle consumer connected")]
    NotConnected,

    /// The negotiated subtitle subtype carries no text the filter can ingest
    #[error("Unsupported subtitle subtype: {0}")]
    UnsupportedSubtype(String),

    /// The host could not report the path of the playing media file
    #[error("Source media path not available")]
    NoSourcePath,

    /// No companion subtitle file matched the playing media file
    #[error("No external subtitle files found for: {0}")]
    NoExternalSubtitles(String),

    /// Construction could not allocate the filter's resources
    #[error("Out of memory")]
    OutOfMemory,

    /// The markup engine rejected an operation
    #[error("Rendering engine error: {0}")]
    Engine(String),

    /// An operation arrived in a lifecycle state that cannot accept it
    #[error("Invalid filter state: {0}")]
    InvalidState(String),

    /// Settings could not be read or written
    #[error("Configuration error: {0}")]
    Config(String),

    /// A standard I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for FilterError {
    fn from(e: toml::de::Error) -> Self {
        FilterError::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for FilterError {
    fn from(e: toml::ser::Error) -> Self {
        FilterError::Config(e.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, FilterError>;
