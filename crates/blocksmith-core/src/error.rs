//! Error types for blocksmith-core

use thiserror::Error;

/// Result type alias for blocksmith-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in blocksmith-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be found
    #[error("configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was searched
        path: String,
    },

    /// Failed to parse YAML configuration
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Invalid configuration value
    #[error("invalid configuration: {message}")]
    ConfigInvalid {
        /// Description of what's invalid
        message: String,
    },

    /// Registry lookup on a block type that was never registered
    #[error("unknown block type '{block_type}'")]
    UnknownType {
        /// The block type id that was looked up
        block_type: String,
    },

    /// A persisted document is structurally invalid
    #[error("malformed document: {reason}")]
    MalformedDocument {
        /// What made the document invalid
        reason: String,
    },

    /// A block type is not allowed by the current component selection
    #[error("block type '{block_type}' is not available for the selected components")]
    CapabilityViolation {
        /// The rejected block type
        block_type: String,
    },

    /// A second instance of a component kind that allows only one
    #[error("only one '{kind}' component may be selected")]
    ExclusiveComponent {
        /// The exclusive component kind
        kind: String,
    },

    /// No block with this id exists in the workspace
    #[error("block '{id}' not found")]
    BlockNotFound {
        /// The missing block id
        id: String,
    },

    /// A block id is already used in the workspace
    #[error("block id '{id}' is already in use")]
    DuplicateBlock {
        /// The duplicated block id
        id: String,
    },

    /// Attempt to delete a protected root anchor
    #[error("block '{id}' cannot be deleted")]
    ProtectedBlock {
        /// The protected block id
        id: String,
    },

    /// A block cannot be connected where it was placed
    #[error("invalid placement: {message}")]
    InvalidPlacement {
        /// Why the placement was rejected
        message: String,
    },

    /// A field value is missing or outside its declared domain
    #[error("invalid field '{field}' on block '{block_id}': {message}")]
    InvalidField {
        /// Block carrying the field
        block_id: String,
        /// Field name
        field: String,
        /// Description of the problem
        message: String,
    },

    /// Variable name is empty or otherwise unusable
    #[error("invalid variable name '{name}'")]
    InvalidVariable {
        /// The rejected name
        name: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Error::MalformedDocument {
            reason: reason.into(),
        }
    }

    pub(crate) fn placement(message: impl Into<String>) -> Self {
        Error::InvalidPlacement {
            message: message.into(),
        }
    }
}
