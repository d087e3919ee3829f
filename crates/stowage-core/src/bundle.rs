//! Bundled payload sources.
//!
//! A bundle is a named set of byte payloads addressed by resource id, e.g.
//! `MyApp.Plugins.libzero.so`. Payloads are usually compiled into the binary
//! with [`bundle!`](crate::bundle!); a directory-backed bundle serves the
//! same role for tools and tests.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::error::{Result, StowageError};

/// A named collection of byte payloads.
pub trait Bundle: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Open `resource` for reading, or `None` if the bundle lacks it.
    fn open(&self, resource: &str) -> Result<Option<Box<dyn Read + '_>>>;

    /// All resource ids in the bundle, sorted.
    fn resource_names(&self) -> Vec<String>;
}

/// Payloads compiled into the binary.
#[derive(Debug, Clone, Copy)]
pub struct StaticBundle {
    name: &'static str,
    entries: &'static [(&'static str, &'static [u8])],
}

impl StaticBundle {
    /// Create a bundle over static `(resource, bytes)` pairs.
    pub const fn new(name: &'static str, entries: &'static [(&'static str, &'static [u8])]) -> Self {
        StaticBundle { name, entries }
    }

    /// Raw bytes of `resource`.
    pub fn get(&self, resource: &str) -> Option<&'static [u8]> {
        self.entries
            .iter()
            .find(|(id, _)| *id == resource)
            .map(|(_, bytes)| *bytes)
    }
}

impl Bundle for StaticBundle {
    fn name(&self) -> &str {
        self.name
    }

    fn open(&self, resource: &str) -> Result<Option<Box<dyn Read + '_>>> {
        Ok(self.get(resource).map(|bytes| Box::new(bytes) as Box<dyn Read + '_>))
    }

    fn resource_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.entries.iter().map(|(id, _)| id.to_string()).collect();
        names.sort();
        names
    }
}

/// Build a [`StaticBundle`] from files embedded at compile time.
///
/// ```ignore
/// static PAYLOADS: StaticBundle = stowage_core::bundle!("MyApp";
///     "MyApp.libzero.so" => "../payloads/libzero.so",
/// );
/// ```
#[macro_export]
macro_rules! bundle {
    ($name:expr; $($resource:expr => $path:expr),* $(,)?) => {
        $crate::bundle::StaticBundle::new(
            $name,
            &[$(($resource, include_bytes!($path) as &[u8])),*],
        )
    };
}

/// Payloads stored as files in a directory, one file per resource id.
#[derive(Debug, Clone)]
pub struct DirBundle {
    name: String,
    root: PathBuf,
}

impl DirBundle {
    /// Create a bundle over `root`, named after the directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let name = root
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("bundle")
            .to_string();
        DirBundle { name, root }
    }

    /// Get the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resource_path(&self, resource: &str) -> Option<PathBuf> {
        let mut components = Path::new(resource).components();
        match (components.next(), components.next()) {
            (Some(std::path::Component::Normal(_)), None) => Some(self.root.join(resource)),
            _ => None,
        }
    }
}

impl Bundle for DirBundle {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self, resource: &str) -> Result<Option<Box<dyn Read + '_>>> {
        let Some(path) = self.resource_path(resource) else {
            return Ok(None);
        };
        if !path.is_file() {
            return Ok(None);
        }
        match File::open(&path) {
            Ok(file) => Ok(Some(Box::new(file))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StowageError::IoFailure {
                path,
                detail: format!("opening resource: {e}"),
            }),
        }
    }

    fn resource_names(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut names: Vec<_> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect();
        names.sort();
        names
    }
}

/// A bundle with no resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyBundle;

impl Bundle for EmptyBundle {
    fn name(&self) -> &str {
        "<empty>"
    }

    fn open(&self, _resource: &str) -> Result<Option<Box<dyn Read + '_>>> {
        Ok(None)
    }

    fn resource_names(&self) -> Vec<String> {
        Vec::new()
    }
}
