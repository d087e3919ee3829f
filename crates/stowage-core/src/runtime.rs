//! Module runtime abstraction.
//!
//! A `ModuleRuntime` turns bytes or a file into a loaded module. The loader
//! tries bytes first and treats any `InstantiateError` from that path as a
//! signal to fall back to disk.

use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Self-reported identity of a loaded module.
///
/// Distinct from the file name the module was requested under; usually
/// carries name plus version metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleIdentity(String);

impl ModuleIdentity {
    /// Wrap an identity string.
    pub fn new(identity: impl Into<String>) -> Self {
        ModuleIdentity(identity.into())
    }

    /// Get the identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleIdentity {
    fn from(s: &str) -> Self {
        ModuleIdentity::new(s)
    }
}

impl std::borrow::Borrow<str> for ModuleIdentity {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Where a module was instantiated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleOrigin {
    /// Directly from in-memory bytes.
    Memory,
    /// From a file on disk.
    Disk(PathBuf),
}

/// A module instantiated by a runtime.
///
/// The runtime owns whatever keeps the module alive; the registry only holds
/// a shared handle to it.
pub trait LoadedModule: Send + Sync + fmt::Debug {
    /// The module's self-reported identity.
    fn identity(&self) -> &ModuleIdentity;

    /// Where the module was loaded from.
    fn origin(&self) -> &ModuleOrigin;

    /// Downcast support for runtime-specific access.
    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to a loaded module.
pub type ModuleHandle = Arc<dyn LoadedModule>;

/// Why a runtime could not instantiate a module.
#[derive(Debug, thiserror::Error)]
pub enum InstantiateError {
    /// The runtime cannot load from this source at all.
    #[error("unsupported: {reason}")]
    Unsupported { reason: String },

    /// The payload is not a module this runtime understands.
    #[error("malformed module: {detail}")]
    Malformed { detail: String },

    /// The module loaded but does not report an identity.
    #[error("module does not report an identity")]
    MissingIdentity,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Instantiates executable modules.
pub trait ModuleRuntime: Send + Sync {
    /// Instantiate a module directly from bytes.
    fn instantiate_bytes(&self, bytes: &[u8]) -> Result<ModuleHandle, InstantiateError>;

    /// Instantiate a module from a file.
    fn instantiate_path(&self, path: &Path) -> Result<ModuleHandle, InstantiateError>;
}
