//! Process-wide index of loaded modules.
//!
//! Entries are keyed by the module's own identity, inserted once, and never
//! replaced or removed. Lookups may run concurrently with each other and with
//! a registration; registrations serialize on a single write lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use tracing::info;

use crate::error::{Result, StowageError};
use crate::runtime::{ModuleHandle, ModuleIdentity};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);
static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();

/// Identity-keyed registry of loaded modules.
#[derive(Debug)]
pub struct Registry {
    id: u64,
    index: RwLock<HashMap<ModuleIdentity, ModuleHandle>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Registry {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            index: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide registry, created on first use.
    pub fn global() -> &'static Arc<Registry> {
        GLOBAL.get_or_init(|| Arc::new(Registry::new()))
    }

    /// Unique key of this registry within the process.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Register a loaded module under its own identity.
    ///
    /// Fails with `DuplicateIdentity` if the identity is already present; the
    /// existing entry is left in place.
    pub fn register(&self, handle: ModuleHandle) -> Result<ModuleIdentity> {
        let identity = handle.identity().clone();
        let mut index = self.index.write().unwrap_or_else(PoisonError::into_inner);
        if index.contains_key(&identity) {
            return Err(StowageError::DuplicateIdentity {
                identity: identity.to_string(),
            });
        }
        index.insert(identity.clone(), handle);
        info!(%identity, "registered module");
        Ok(identity)
    }

    /// Look up a module by identity.
    pub fn lookup(&self, identity: &str) -> Option<ModuleHandle> {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(identity)
            .cloned()
    }

    /// Whether nothing has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of registered modules.
    pub fn len(&self) -> usize {
        self.index.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// All registered identities, sorted.
    pub fn identities(&self) -> Vec<ModuleIdentity> {
        let mut ids: Vec<_> = self
            .index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
