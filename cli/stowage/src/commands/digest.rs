//! `stowage digest`: print the content digest of a file.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use stowage_core::ContentDigest;

/// Print the uppercase SHA-1 digest of `path`.
pub fn run(path: &Path) -> Result<()> {
    println!("{}  {}", digest_file(path)?, path.display());
    Ok(())
}

fn digest_file(path: &Path) -> Result<ContentDigest> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    ContentDigest::of_reader(file).with_context(|| format!("reading {}", path.display()))
}
