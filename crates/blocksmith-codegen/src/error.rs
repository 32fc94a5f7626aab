//! Error types for code generation

use thiserror::Error;

use crate::generator::Diagnostic;

/// Result type for codegen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during code generation
#[derive(Error, Debug)]
pub enum Error {
    /// A block's type has no registry entry or no handler
    #[error("unknown block type '{block_type}' (block '{block_id}')")]
    UnknownType {
        /// The unresolved type id
        block_type: String,
        /// Block carrying the type
        block_id: String,
    },

    /// A handler could not generate code for its block
    #[error("'{block_type}' block '{block_id}': {message}")]
    HandlerFailure {
        /// Failing block
        block_id: String,
        /// Its type id
        block_type: String,
        /// Error description
        message: String,
    },

    /// A generation run ended with a diagnostic
    #[error("code generation failed: {}", diagnostic.message)]
    GenerationFailed {
        /// The run's diagnostic
        diagnostic: Diagnostic,
    },

    /// Error from the core model (documents, registry)
    #[error(transparent)]
    Core(#[from] blocksmith_core::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Cache error
    #[error("cache error: {0}")]
    CacheError(String),
}

impl Error {
    /// Handler failure for a block
    pub fn handler(block: &blocksmith_core::Block, message: impl Into<String>) -> Self {
        Error::HandlerFailure {
            block_id: block.id.clone(),
            block_type: block.block_type.clone(),
            message: message.into(),
        }
    }
}
