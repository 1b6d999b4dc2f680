//! Error types for archdispatch.

use std::path::PathBuf;
use thiserror::Error;

/// Dispatch error types.
#[derive(Error, Debug)]
pub enum Error {
    /// No candidate file exists for any qualifying tier.
    #[error("no candidate library found for base name '{base_name}'")]
    Resolution {
        /// Base name that was searched for.
        base_name: String,
    },

    /// A candidate exists but the platform loader rejected it.
    #[error("failed to load {}: {message}", path.display())]
    Load {
        /// Path handed to the loader.
        path: PathBuf,
        /// Loader error text.
        message: String,
    },

    /// Lookup on a dispatcher that owns no module.
    #[error("library '{base_name}' is not loaded")]
    NotLoaded {
        /// Base name of the dispatcher.
        base_name: String,
    },

    /// The loaded module does not export the requested symbol.
    #[error("symbol '{symbol}' not found in {}", library.display())]
    SymbolNotFound {
        /// Requested export.
        symbol: String,
        /// Library that was searched.
        library: PathBuf,
    },

    /// A symbol name or argument contains an interior NUL byte.
    #[error("invalid C string: {0}")]
    InvalidName(#[from] std::ffi::NulError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Result type alias for dispatch operations.
pub type Result<T> = std::result::Result<T, Error>;
