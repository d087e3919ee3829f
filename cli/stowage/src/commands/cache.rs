//! `stowage cache`: show what the disk cache holds for a file name.

use std::path::PathBuf;

use anyhow::Result;
use stowage_core::DiskCache;

/// Print the cache path for `file_name` and the digest of any cached file.
pub fn run(file_name: &str, cache_dir: Option<PathBuf>) -> Result<()> {
    let cache = cache_dir.map(DiskCache::new).unwrap_or_else(DiskCache::temp);
    println!("{}", describe(&cache, file_name)?);
    Ok(())
}

fn describe(cache: &DiskCache, file_name: &str) -> Result<String> {
    let path = cache.path_for(file_name)?;
    let status = match cache.inspect(file_name)? {
        Some(digest) => digest.to_string(),
        None => "absent".to_string(),
    };
    Ok(format!("{}  {status}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_absent_and_present() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path());

        let line = describe(&cache, "lib.so").unwrap();
        assert!(line.ends_with("absent"));

        cache.store("lib.so", b"").unwrap();
        let line = describe(&cache, "lib.so").unwrap();
        assert!(line.ends_with("DA39A3EE5E6B4B0D3255BFEF95601890AFD80709"));
    }

    #[test]
    fn rejects_nested_names() {
        let cache = DiskCache::new("/tmp");
        assert!(describe(&cache, "a/b.so").is_err());
    }
}
