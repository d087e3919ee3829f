//! Unresolved-reference resolution.
//!
//! `ResolutionHost` stands in for the host's module-resolution mechanism:
//! when a module reference cannot be satisfied, the host raises the event by
//! calling [`ResolutionHost::resolve`], which asks each subscribed resolver in
//! turn. Resolvers are additive. A resolver that answers `None` or panics
//! leaves the reference unresolved, so whatever default handling the host has
//! still applies.

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use tracing::{debug, warn};

use crate::registry::Registry;
use crate::runtime::ModuleHandle;

static GLOBAL: OnceLock<ResolutionHost> = OnceLock::new();

/// Answers unresolved module references.
pub trait Resolver: Send + Sync {
    /// Return the module for `identity`, or `None` if unknown.
    fn resolve(&self, identity: &str) -> Option<ModuleHandle>;
}

#[derive(Default)]
struct Subscriptions {
    keys: HashSet<u64>,
    resolvers: Vec<Arc<dyn Resolver>>,
}

/// Dispatches unresolved-reference events to subscribed resolvers.
#[derive(Default)]
pub struct ResolutionHost {
    subscriptions: RwLock<Subscriptions>,
}

impl ResolutionHost {
    /// Create a host with no resolvers.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide host.
    pub fn global() -> &'static ResolutionHost {
        GLOBAL.get_or_init(ResolutionHost::new)
    }

    /// Subscribe `resolver` under `key`.
    ///
    /// Returns `false` without subscribing if `key` is already present.
    pub fn subscribe(&self, key: u64, resolver: Arc<dyn Resolver>) -> bool {
        let mut subs = self
            .subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if !subs.keys.insert(key) {
            return false;
        }
        subs.resolvers.push(resolver);
        true
    }

    /// Number of subscribed resolvers.
    pub fn resolver_count(&self) -> usize {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .resolvers
            .len()
    }

    /// Raise an unresolved-reference event for `identity`.
    ///
    /// The first resolver to answer wins. Never panics.
    pub fn resolve(&self, identity: &str) -> Option<ModuleHandle> {
        // Snapshot so resolvers run without holding the lock.
        let resolvers = self
            .subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .resolvers
            .clone();

        for resolver in resolvers {
            match panic::catch_unwind(AssertUnwindSafe(|| resolver.resolve(identity))) {
                Ok(Some(handle)) => return Some(handle),
                Ok(None) => {}
                Err(_) => warn!(identity, "resolver panicked; treating as unknown"),
            }
        }
        None
    }
}

impl std::fmt::Debug for ResolutionHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionHost")
            .field("resolvers", &self.resolver_count())
            .finish()
    }
}

/// Resolver backed by a [`Registry`].
#[derive(Debug, Clone)]
pub struct RegistryHook {
    registry: Arc<Registry>,
}

impl RegistryHook {
    /// Create a hook answering from `registry`.
    pub fn new(registry: Arc<Registry>) -> Self {
        RegistryHook { registry }
    }
}

impl Resolver for RegistryHook {
    fn resolve(&self, identity: &str) -> Option<ModuleHandle> {
        if self.registry.is_empty() {
            return None;
        }
        let found = self.registry.lookup(identity);
        debug!(identity, hit = found.is_some(), "registry hook consulted");
        found
    }
}

/// Subscribe a [`RegistryHook`] for `registry` on `host`.
///
/// Idempotent per registry: returns `true` only for the call that installed
/// the hook.
pub fn install_resolution_hook(host: &ResolutionHost, registry: &Arc<Registry>) -> bool {
    let installed = host.subscribe(
        registry.id(),
        Arc::new(RegistryHook::new(Arc::clone(registry))),
    );
    if installed {
        debug!(registry = registry.id(), "installed resolution hook");
    }
    installed
}
