//! Shared-library runtime for stowage.
//!
//! [`NativeRuntime`] instantiates platform shared libraries (`.so`, `.dylib`,
//! `.dll`) through `libloading`. On Linux and Android it can load a payload
//! straight from memory via an anonymous `memfd`; everywhere else, and for
//! libraries that do not export an identity, the loader's disk fallback
//! takes over.
//!
//! ## Modules
//!
//! - [`module`]: The loaded library and its identity
//! - [`runtime`]: `ModuleRuntime` implementation

#[cfg(any(target_os = "linux", target_os = "android"))]
mod memfd;
pub mod module;
pub mod runtime;

pub use module::{NativeModule, IDENTITY_SYMBOL};
pub use runtime::NativeRuntime;

/// Export a module identity from a `cdylib`.
///
/// ```ignore
/// stowage_native::export_identity!("Zero.Core, Version=1.2.0");
/// ```
#[macro_export]
macro_rules! export_identity {
    ($identity:expr) => {
        #[no_mangle]
        pub extern "C" fn stowage_module_identity() -> *const ::std::os::raw::c_char {
            concat!($identity, "\0").as_ptr() as *const ::std::os::raw::c_char
        }
    };
}
