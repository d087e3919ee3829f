//! `ModuleRuntime` for platform shared libraries.

use std::path::Path;
use std::sync::Arc;

use libloading::Library;
use stowage_core::{InstantiateError, ModuleHandle, ModuleOrigin, ModuleRuntime};
use tracing::debug;

use crate::module::{exported_identity, identity_from_path, NativeModule};

/// Loads shared libraries with the platform dynamic linker.
///
/// In-memory loads require the library to export its identity through
/// [`IDENTITY_SYMBOL`](crate::IDENTITY_SYMBOL). Loads from a path fall back
/// to the file name when no identity is exported.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRuntime;

impl NativeRuntime {
    /// Create a runtime.
    pub fn new() -> Self {
        NativeRuntime
    }
}

fn open(path: &Path) -> Result<Library, InstantiateError> {
    // SAFETY: loading runs the library's initializers; callers only hand us
    // payloads they bundled themselves.
    unsafe { Library::new(path) }.map_err(|e| InstantiateError::Malformed {
        detail: e.to_string(),
    })
}

impl ModuleRuntime for NativeRuntime {
    #[cfg(any(target_os = "linux", target_os = "android"))]
    fn instantiate_bytes(&self, bytes: &[u8]) -> Result<ModuleHandle, InstantiateError> {
        if !bytes.starts_with(b"\x7fELF") {
            return Err(InstantiateError::Malformed {
                detail: "payload is not an ELF object".to_string(),
            });
        }

        let file = crate::memfd::anonymous_file(bytes)?;
        let library = open(&crate::memfd::proc_path(&file))?;
        let identity = exported_identity(&library).ok_or(InstantiateError::MissingIdentity)?;
        debug!(%identity, bytes = bytes.len(), "opened library from memfd");
        Ok(Arc::new(NativeModule::new(
            identity,
            ModuleOrigin::Memory,
            library,
        )))
    }

    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    fn instantiate_bytes(&self, _bytes: &[u8]) -> Result<ModuleHandle, InstantiateError> {
        Err(InstantiateError::Unsupported {
            reason: "in-memory library loading needs memfd".to_string(),
        })
    }

    fn instantiate_path(&self, path: &Path) -> Result<ModuleHandle, InstantiateError> {
        let library = open(path)?;
        let identity = exported_identity(&library)
            .or_else(|| identity_from_path(path))
            .ok_or(InstantiateError::MissingIdentity)?;
        debug!(%identity, path = %path.display(), "opened library from disk");
        Ok(Arc::new(NativeModule::new(
            identity,
            ModuleOrigin::Disk(path.to_path_buf()),
            library,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_library_bytes_fail_in_memory() {
        let err = NativeRuntime::new()
            .instantiate_bytes(b"MZ not an ELF or anything")
            .unwrap_err();
        assert!(matches!(
            err,
            InstantiateError::Malformed { .. } | InstantiateError::Unsupported { .. }
        ));
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn truncated_elf_is_rejected_by_linker() {
        let err = NativeRuntime::new()
            .instantiate_bytes(b"\x7fELF\x02\x01\x01")
            .unwrap_err();
        assert!(matches!(err, InstantiateError::Malformed { .. }));
    }

    #[test]
    fn garbage_file_fails_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("libgarbage.so");
        std::fs::write(&path, b"definitely not a library").unwrap();

        assert!(NativeRuntime::new().instantiate_path(&path).is_err());
    }

    #[test]
    fn missing_file_fails_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        assert!(NativeRuntime::new()
            .instantiate_path(&dir.path().join("libabsent.so"))
            .is_err());
    }
}
