use thiserror::Error;

/// Errors raised while turning a stored or foreign shape into a `FlowSpec`.
///
/// The normalizer never surfaces these; it falls back to the default spec.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("Input does not match any known flow shape")]
    UnrecognizedShape,

    #[error("Malformed {shape} input: {message}")]
    Malformed { shape: String, message: String },
}

/// Errors that can occur when compiling with validation enabled.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("Flow has {} validation issue(s): {}", .0.len(), .0.join("; "))]
    InvalidSpec(Vec<String>),

    #[error("Failed to serialize compiled flow: {0}")]
    Serialization(String),
}

/// Errors that can occur while previewing a route.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    #[error("Screen '{0}' not found in the flow")]
    UnknownScreen(String),
}

/// Errors reported by a `FlowStore` implementation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Could not access '{path}': {message}")]
    Io { path: String, message: String },

    #[error("Stored flow record is unreadable: {0}")]
    Corrupt(String),

    #[error("Store rejected the save: {0}")]
    Rejected(String),
}

/// Errors returned by editor mutations and explicit saves.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error("Screen '{0}' not found")]
    ScreenNotFound(String),

    #[error("No screen at position {index}; the flow has {len} screen(s)")]
    ScreenIndexOutOfRange { index: usize, len: usize },

    #[error("Screen '{screen_id}' has no block at index {index}")]
    BlockIndexOutOfRange { screen_id: String, index: usize },

    #[error("Screen '{0}' has no form container")]
    MissingForm(String),

    #[error("Cannot remove '{0}': a flow needs at least one screen")]
    LastScreen(String),

    #[error("Removal of screen '{0}' was cancelled")]
    Cancelled(String),

    #[error("Flow cannot be saved while it has issues: {}", .0.join("; "))]
    InvalidSpec(Vec<String>),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors that can occur while loading editor configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
