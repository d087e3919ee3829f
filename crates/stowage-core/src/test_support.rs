//! In-process runtime for tests.
//!
//! Payloads are text. The first line decides how the module loads:
//!
//! - `MODULE <identity>` instantiates from memory and from disk.
//! - `NATIVE <identity>` refuses memory and only instantiates from a file.
//!
//! Anything else is malformed.

use std::any::Any;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::runtime::{
    InstantiateError, LoadedModule, ModuleHandle, ModuleIdentity, ModuleOrigin, ModuleRuntime,
};

/// A module with nothing behind it but an identity.
#[derive(Debug)]
pub struct StubModule {
    identity: ModuleIdentity,
    origin: ModuleOrigin,
}

impl StubModule {
    /// A handle that claims to have been loaded from memory.
    pub fn memory(identity: &str) -> ModuleHandle {
        Arc::new(StubModule {
            identity: ModuleIdentity::new(identity),
            origin: ModuleOrigin::Memory,
        })
    }

    /// A handle that claims to have been loaded from `path`.
    pub fn disk(identity: &str, path: &Path) -> ModuleHandle {
        Arc::new(StubModule {
            identity: ModuleIdentity::new(identity),
            origin: ModuleOrigin::Disk(path.to_path_buf()),
        })
    }
}

impl LoadedModule for StubModule {
    fn identity(&self) -> &ModuleIdentity {
        &self.identity
    }

    fn origin(&self) -> &ModuleOrigin {
        &self.origin
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Text-header runtime that counts how often each path is taken.
#[derive(Debug, Default)]
pub struct ScriptRuntime {
    memory_attempts: AtomicUsize,
    disk_loads: AtomicUsize,
}

enum Header<'a> {
    Module(&'a str),
    Native(&'a str),
}

fn parse_header(bytes: &[u8]) -> Result<Header<'_>, InstantiateError> {
    let text = std::str::from_utf8(bytes).map_err(|e| InstantiateError::Malformed {
        detail: format!("not utf-8: {e}"),
    })?;
    let line = text.lines().next().unwrap_or("");
    if let Some(id) = line.strip_prefix("MODULE ") {
        Ok(Header::Module(id.trim()))
    } else if let Some(id) = line.strip_prefix("NATIVE ") {
        Ok(Header::Native(id.trim()))
    } else {
        Err(InstantiateError::Malformed {
            detail: format!("unknown header {line:?}"),
        })
    }
}

impl ScriptRuntime {
    /// Create a runtime with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `instantiate_bytes` calls so far.
    pub fn memory_attempts(&self) -> usize {
        self.memory_attempts.load(Ordering::SeqCst)
    }

    /// Number of successful `instantiate_path` calls so far.
    pub fn disk_loads(&self) -> usize {
        self.disk_loads.load(Ordering::SeqCst)
    }
}

impl ModuleRuntime for ScriptRuntime {
    fn instantiate_bytes(&self, bytes: &[u8]) -> Result<ModuleHandle, InstantiateError> {
        self.memory_attempts.fetch_add(1, Ordering::SeqCst);
        match parse_header(bytes)? {
            Header::Module(id) => Ok(StubModule::memory(id)),
            Header::Native(_) => Err(InstantiateError::Unsupported {
                reason: "native payloads need a file".to_string(),
            }),
        }
    }

    fn instantiate_path(&self, path: &Path) -> Result<ModuleHandle, InstantiateError> {
        let bytes = std::fs::read(path)?;
        let id = match parse_header(&bytes)? {
            Header::Module(id) | Header::Native(id) => id,
        };
        self.disk_loads.fetch_add(1, Ordering::SeqCst);
        Ok(StubModule::disk(id, path))
    }
}
