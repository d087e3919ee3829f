//! `stowage resources`: list the resource ids in a bundle directory.

use std::path::Path;

use anyhow::Result;
use stowage_core::{Bundle, DirBundle};

/// Print one resource id per line.
pub fn run(bundle_dir: &Path) -> Result<()> {
    if !bundle_dir.is_dir() {
        anyhow::bail!("bundle directory {} does not exist", bundle_dir.display());
    }
    let names = DirBundle::new(bundle_dir).resource_names();
    if names.is_empty() {
        println!("(no resources in {})", bundle_dir.display());
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}
