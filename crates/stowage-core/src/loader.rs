//! Materializes bundled payloads as loaded modules.
//!
//! A load reads the whole payload, tries to instantiate it from memory, and
//! on failure stores it in the disk cache and instantiates it from there.
//! The resulting module is registered under its own identity, where the
//! resolution hook can find it.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::bundle::{Bundle, DirBundle, EmptyBundle};
use crate::cache::{CacheEntry, DiskCache};
use crate::config::{ModuleSpec, StowageConfig};
use crate::error::{Result, StowageError};
use crate::hook::{install_resolution_hook, ResolutionHost};
use crate::registry::Registry;
use crate::runtime::{ModuleHandle, ModuleIdentity, ModuleRuntime};

/// How a module ended up loaded.
#[derive(Debug, Clone)]
pub enum LoadRoute {
    /// Instantiated directly from the payload bytes.
    Memory,
    /// Instantiated from the cached file.
    Disk(CacheEntry),
}

impl LoadRoute {
    /// `"memory"` or `"disk"`.
    pub fn label(&self) -> &'static str {
        match self {
            LoadRoute::Memory => "memory",
            LoadRoute::Disk(_) => "disk",
        }
    }
}

/// Result of a successful load.
#[derive(Debug, Clone)]
pub struct LoadReport {
    /// Identity the module registered under.
    pub identity: ModuleIdentity,
    /// Shared handle to the module.
    pub handle: ModuleHandle,
    /// Memory or disk.
    pub route: LoadRoute,
}

/// Loads bundled modules into a registry.
pub struct EmbeddedLoader {
    registry: Arc<Registry>,
    runtime: Arc<dyn ModuleRuntime>,
    cache: DiskCache,
    bundle: Arc<dyn Bundle>,
    memory_load: bool,
}

/// Builder for [`EmbeddedLoader`].
pub struct LoaderBuilder {
    runtime: Arc<dyn ModuleRuntime>,
    registry: Option<Arc<Registry>>,
    host: Option<&'static ResolutionHost>,
    cache_dir: Option<PathBuf>,
    bundle: Option<Arc<dyn Bundle>>,
    memory_load: bool,
}

impl LoaderBuilder {
    /// Use `registry` instead of the process-wide one.
    pub fn registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Install the resolution hook on `host` instead of the process-wide one.
    pub fn host(mut self, host: &'static ResolutionHost) -> Self {
        self.host = Some(host);
        self
    }

    /// Cache directory for the disk fallback.
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Bundle used when `load` is given no context.
    pub fn bundle(mut self, bundle: Arc<dyn Bundle>) -> Self {
        self.bundle = Some(bundle);
        self
    }

    /// Whether to attempt in-memory instantiation first.
    pub fn memory_load(mut self, enabled: bool) -> Self {
        self.memory_load = enabled;
        self
    }

    /// Apply the cache and loader sections of a configuration.
    pub fn config(self, config: &StowageConfig) -> Self {
        self.cache_dir(config.cache_dir())
            .memory_load(config.loader.memory_load)
    }

    /// Build the loader and install its resolution hook.
    pub fn build(self) -> EmbeddedLoader {
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::clone(Registry::global()));
        let host = self.host.unwrap_or_else(ResolutionHost::global);
        install_resolution_hook(host, &registry);

        EmbeddedLoader {
            registry,
            runtime: self.runtime,
            cache: self.cache_dir.map(DiskCache::new).unwrap_or_else(DiskCache::temp),
            bundle: self.bundle.unwrap_or_else(|| Arc::new(EmptyBundle)),
            memory_load: self.memory_load,
        }
    }
}

impl EmbeddedLoader {
    /// Start building a loader around `runtime`.
    pub fn builder(runtime: Arc<dyn ModuleRuntime>) -> LoaderBuilder {
        LoaderBuilder {
            runtime,
            registry: None,
            host: None,
            cache_dir: None,
            bundle: None,
            memory_load: true,
        }
    }

    /// The registry modules are registered in.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The disk cache used for the fallback path.
    pub fn cache(&self) -> &DiskCache {
        &self.cache
    }

    /// Load `resource` from `context` (or the default bundle) and register it.
    ///
    /// `file_name` names the cache file used if the module cannot load from
    /// memory.
    pub fn load(
        &self,
        resource: &str,
        file_name: &str,
        context: Option<&dyn Bundle>,
    ) -> Result<LoadReport> {
        let bundle = context.unwrap_or(self.bundle.as_ref());
        let payload = read_payload(bundle, resource)?;
        debug!(resource, bundle = bundle.name(), bytes = payload.len(), "fetched payload");

        let (handle, route) = match self.instantiate_in_memory(&payload) {
            Some(handle) => (handle, LoadRoute::Memory),
            None => {
                let entry = self.cache.store(file_name, &payload)?;
                let handle = self.runtime.instantiate_path(&entry.path).map_err(|e| {
                    StowageError::IoFailure {
                        path: entry.path.clone(),
                        detail: format!("loading cached module: {e}"),
                    }
                })?;
                (handle, LoadRoute::Disk(entry))
            }
        };

        let identity = self.registry.register(Arc::clone(&handle))?;
        info!(
            resource,
            %identity,
            route = route.label(),
            "loaded module"
        );
        Ok(LoadReport {
            identity,
            handle,
            route,
        })
    }

    /// Load each module in order from `context` (or the default bundle).
    ///
    /// A module that names its own bundle directory is read from there
    /// instead. Stops at the first failure; modules loaded before it stay
    /// registered.
    pub fn load_all(
        &self,
        modules: &[ModuleSpec],
        context: Option<&dyn Bundle>,
    ) -> Result<Vec<LoadReport>> {
        modules
            .iter()
            .map(|m| match &m.bundle {
                Some(dir) => {
                    let own = DirBundle::new(dir);
                    self.load(&m.resource, &m.file, Some(&own))
                }
                None => self.load(&m.resource, &m.file, context),
            })
            .collect()
    }

    fn instantiate_in_memory(&self, payload: &[u8]) -> Option<ModuleHandle> {
        if !self.memory_load {
            return None;
        }
        match self.runtime.instantiate_bytes(payload) {
            Ok(handle) => Some(handle),
            Err(e) => {
                debug!(error = %e, "in-memory load failed; falling back to disk");
                None
            }
        }
    }
}

impl std::fmt::Debug for EmbeddedLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedLoader")
            .field("registry", &self.registry.id())
            .field("cache", &self.cache.root())
            .field("bundle", &self.bundle.name())
            .field("memory_load", &self.memory_load)
            .finish()
    }
}

fn read_payload(bundle: &dyn Bundle, resource: &str) -> Result<Vec<u8>> {
    let mut reader = bundle
        .open(resource)?
        .ok_or_else(|| StowageError::ResourceNotFound {
            resource: resource.to_string(),
            bundle: bundle.name().to_string(),
        })?;
    let mut payload = Vec::new();
    reader.read_to_end(&mut payload)?;
    Ok(payload)
}
