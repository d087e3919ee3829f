//! Loaded shared libraries.

use std::any::Any;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::path::Path;

use libloading::{Library, Symbol};
use stowage_core::{LoadedModule, ModuleIdentity, ModuleOrigin};

/// Symbol a library exports to report its identity.
///
/// Signature: `extern "C" fn() -> *const c_char`, returning a NUL-terminated
/// string with static lifetime. See [`export_identity!`](crate::export_identity).
pub const IDENTITY_SYMBOL: &[u8] = b"stowage_module_identity\0";

type IdentityFn = unsafe extern "C" fn() -> *const c_char;

/// A shared library kept open for as long as any handle to it exists.
#[derive(Debug)]
pub struct NativeModule {
    identity: ModuleIdentity,
    origin: ModuleOrigin,
    library: Library,
}

impl NativeModule {
    pub(crate) fn new(identity: ModuleIdentity, origin: ModuleOrigin, library: Library) -> Self {
        NativeModule {
            identity,
            origin,
            library,
        }
    }

    /// The underlying library.
    pub fn library(&self) -> &Library {
        &self.library
    }

    /// Look up a symbol in the library.
    ///
    /// # Safety
    ///
    /// `T` must match the actual type of the exported symbol.
    pub unsafe fn symbol<T>(&self, name: &[u8]) -> Result<Symbol<'_, T>, libloading::Error> {
        self.library.get(name)
    }
}

impl LoadedModule for NativeModule {
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

/// Identity reported through [`IDENTITY_SYMBOL`], if the library exports it.
pub(crate) fn exported_identity(library: &Library) -> Option<ModuleIdentity> {
    // SAFETY: the symbol's contract is `extern "C" fn() -> *const c_char`
    // returning a static NUL-terminated string or null.
    unsafe {
        let report = library.get::<IdentityFn>(IDENTITY_SYMBOL).ok()?;
        let ptr = report();
        if ptr.is_null() {
            return None;
        }
        let identity = CStr::from_ptr(ptr).to_string_lossy();
        (!identity.is_empty()).then(|| ModuleIdentity::new(identity.into_owned()))
    }
}

/// Identity for libraries without an exported one: their file name.
pub(crate) fn identity_from_path(path: &Path) -> Option<ModuleIdentity> {
    path.file_name()
        .map(|name| ModuleIdentity::new(name.to_string_lossy().into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_identity() {
        assert_eq!(
            identity_from_path(Path::new("/tmp/libsqlite3.so")),
            Some(ModuleIdentity::new("libsqlite3.so"))
        );
        assert_eq!(identity_from_path(Path::new("/")), None);
    }

    #[test]
    fn identity_symbol_is_nul_terminated() {
        assert_eq!(IDENTITY_SYMBOL.last(), Some(&0));
        assert!(!IDENTITY_SYMBOL[..IDENTITY_SYMBOL.len() - 1].contains(&0));
    }
}
