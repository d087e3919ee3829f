//! `stowage load`: load one module and resolve it through the host.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use stowage_core::{DirBundle, EmbeddedLoader, ModuleRuntime, ResolutionHost};
use stowage_native::NativeRuntime;

/// Load `resource` from the bundle directory with the native runtime.
pub fn run(
    resource: &str,
    file_name: &str,
    bundle_dir: &Path,
    cache_dir: Option<PathBuf>,
    memory_load: bool,
) -> Result<()> {
    let line = load_and_resolve(
        Arc::new(NativeRuntime::new()),
        ResolutionHost::global(),
        resource,
        file_name,
        bundle_dir,
        cache_dir,
        memory_load,
    )?;
    println!("{line}");
    Ok(())
}

fn load_and_resolve(
    runtime: Arc<dyn ModuleRuntime>,
    host: &'static ResolutionHost,
    resource: &str,
    file_name: &str,
    bundle_dir: &Path,
    cache_dir: Option<PathBuf>,
    memory_load: bool,
) -> Result<String> {
    if !bundle_dir.is_dir() {
        anyhow::bail!("bundle directory {} does not exist", bundle_dir.display());
    }

    let mut builder = EmbeddedLoader::builder(runtime)
        .host(host)
        .bundle(Arc::new(DirBundle::new(bundle_dir)))
        .memory_load(memory_load);
    if let Some(dir) = cache_dir {
        builder = builder.cache_dir(dir);
    }
    let loader = builder.build();

    let report = loader
        .load(resource, file_name, None)
        .with_context(|| format!("loading {resource}"))?;

    // Go through the host the way an unresolved reference would.
    host.resolve(report.identity.as_str())
        .with_context(|| format!("{} did not resolve after loading", report.identity))?;

    Ok(super::describe(&report))
}
