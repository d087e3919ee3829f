//! Loader error types.

use std::path::PathBuf;

/// Errors that can occur while loading, caching, or registering modules.
#[derive(Debug, thiserror::Error)]
pub enum StowageError {
    /// The named payload does not exist in the bundle.
    #[error("resource '{resource}' was not found in bundle '{bundle}'")]
    ResourceNotFound { resource: String, bundle: String },

    /// Disk fallback failed while writing or instantiating the cached file.
    #[error("I/O failure at {path}: {detail}")]
    IoFailure { path: PathBuf, detail: String },

    /// A module with this identity is already registered.
    #[error("module '{identity}' is already registered")]
    DuplicateIdentity { identity: String },

    /// Cache file name is not a single path component.
    #[error("invalid cache file name: '{name}'")]
    InvalidFileName { name: String },

    /// Invalid loader configuration.
    #[error("invalid configuration: {detail}")]
    InvalidConfig { detail: String },

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for loader operations.
pub type Result<T> = std::result::Result<T, StowageError>;
