//! `stowage.toml` loader configuration.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StowageError};

/// File name searched for by [`StowageConfig::find_and_load`].
pub const CONFIG_FILE: &str = "stowage.toml";

/// Environment variable overriding the cache directory.
pub const CACHE_DIR_ENV: &str = "STOWAGE_CACHE_DIR";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StowageConfig {
    /// Disk cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Loader behavior.
    #[serde(default)]
    pub loader: LoaderConfig,
    /// Modules to load, in order.
    #[serde(default, rename = "module")]
    pub modules: Vec<ModuleSpec>,
    /// Directory the file was read from; relative paths resolve against it.
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

/// `[cache]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache directory. Defaults to the platform temp directory.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// `[loader]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Try instantiating from memory before falling back to disk.
    #[serde(default = "default_memory_load")]
    pub memory_load: bool,
    /// Directory bundle that modules are read from.
    #[serde(default)]
    pub bundle: Option<PathBuf>,
}

fn default_memory_load() -> bool {
    true
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            memory_load: default_memory_load(),
            bundle: None,
        }
    }
}

/// One `[[module]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSpec {
    /// Resource id inside the bundle.
    pub resource: String,
    /// Cache file name used if the module must load from disk.
    pub file: String,
    /// Bundle directory for this module, overriding `[loader] bundle`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle: Option<PathBuf>,
}

impl ModuleSpec {
    /// Create a module entry.
    pub fn new(resource: impl Into<String>, file: impl Into<String>) -> Self {
        ModuleSpec {
            resource: resource.into(),
            file: file.into(),
            bundle: None,
        }
    }

    /// Read this module from `dir` instead of the default bundle.
    pub fn with_bundle(mut self, dir: impl Into<PathBuf>) -> Self {
        self.bundle = Some(dir.into());
        self
    }
}

impl StowageConfig {
    /// Parse and validate a configuration from a TOML string.
    pub fn from_str(s: &str) -> Result<Self> {
        let config: StowageConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| StowageError::IoFailure {
            path: path.to_path_buf(),
            detail: format!("reading config: {e}"),
        })?;
        let mut config = Self::from_str(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Search upward from `start_dir` for `stowage.toml`.
    ///
    /// Returns the parsed configuration and the path it was read from.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                return Ok(Some((Self::load(&candidate)?, candidate)));
            }
            if !dir.pop() {
                return Ok(None);
            }
        }
    }

    /// Effective cache directory: config, then `STOWAGE_CACHE_DIR`, then the
    /// platform temp directory.
    pub fn cache_dir(&self) -> PathBuf {
        self.resolve_cache_dir(std::env::var_os(CACHE_DIR_ENV))
    }

    /// Bundle directory, resolved against the config file location.
    pub fn bundle_dir(&self) -> Option<PathBuf> {
        self.loader.bundle.as_deref().map(|p| self.resolve(p))
    }

    /// Bundle directory for `module`, if it names its own, resolved against
    /// the config file location.
    pub fn module_bundle_dir(&self, module: &ModuleSpec) -> Option<PathBuf> {
        module.bundle.as_deref().map(|p| self.resolve(p))
    }

    /// The `[[module]]` entries with their bundle directories resolved.
    pub fn resolved_modules(&self) -> Vec<ModuleSpec> {
        self.modules
            .iter()
            .map(|m| ModuleSpec {
                bundle: self.module_bundle_dir(m),
                ..m.clone()
            })
            .collect()
    }

    fn resolve_cache_dir(&self, env: Option<OsString>) -> PathBuf {
        if let Some(dir) = &self.cache.dir {
            return self.resolve(dir);
        }
        match env {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => std::env::temp_dir(),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn validate(&self) -> Result<()> {
        let mut files = HashSet::new();
        for module in &self.modules {
            if module.resource.is_empty() || module.file.is_empty() {
                return Err(StowageError::InvalidConfig {
                    detail: "module entries need both `resource` and `file`".to_string(),
                });
            }
            if !files.insert(module.file.as_str()) {
                return Err(StowageError::InvalidConfig {
                    detail: format!("cache file '{}' is used by more than one module", module.file),
                });
            }
        }
        Ok(())
    }
}
