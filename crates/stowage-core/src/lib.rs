//! Embedded module loading for Rust hosts.
//!
//! Modules travel inside the application as bundled byte payloads. An
//! explicit [`EmbeddedLoader::load`] materializes one, first straight from
//! memory and otherwise through a content-verified file in the temp
//! directory, and records it in a [`Registry`]. When the host later fails to
//! resolve that module by identity, the [`RegistryHook`] installed on the
//! [`ResolutionHost`] answers from the registry.
//!
//! ## Modules
//!
//! - [`registry`]: Identity-keyed index of loaded modules
//! - [`hook`]: Unresolved-reference dispatch and the registry resolver
//! - [`loader`]: Memory-first, disk-fallback module loader
//! - [`cache`]: Flat, digest-checked disk cache
//! - [`digest`]: SHA-1 content digests
//! - [`bundle`]: Static and directory payload bundles
//! - [`runtime`]: Module runtime traits
//! - [`config`]: `stowage.toml` parsing

pub mod bundle;
pub mod cache;
pub mod config;
pub mod digest;
pub mod error;
pub mod hook;
pub mod loader;
pub mod registry;
pub mod runtime;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

// Re-exports for convenience.
pub use bundle::{Bundle, DirBundle, EmptyBundle, StaticBundle};
pub use cache::{CacheEntry, CacheOutcome, DiskCache};
pub use config::{ModuleSpec, StowageConfig};
pub use digest::ContentDigest;
pub use error::{Result, StowageError};
pub use hook::{install_resolution_hook, RegistryHook, ResolutionHost, Resolver};
pub use loader::{EmbeddedLoader, LoadReport, LoadRoute, LoaderBuilder};
pub use registry::Registry;
pub use runtime::{
    InstantiateError, LoadedModule, ModuleHandle, ModuleIdentity, ModuleOrigin, ModuleRuntime,
};
