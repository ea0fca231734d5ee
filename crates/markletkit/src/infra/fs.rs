//! Filesystem helpers for build artifacts.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

/// Write `contents` to `path` via a sibling temp file and rename, so readers
/// never observe a half-written artifact.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create directory {}", parent.display()))?;

    let mut staged = NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to stage a file in {}", parent.display()))?;
    staged
        .write_all(contents)
        .with_context(|| format!("failed to write {}", path.display()))?;
    staged
        .persist(path)
        .with_context(|| format!("failed to move artifact into {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_parents_and_replaces_existing_files() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("nested/out.js");
        write_atomic(&path, b"first")?;
        write_atomic(&path, b"second")?;
        assert_eq!(fs::read_to_string(&path)?, "second");

        let leftovers: Vec<_> = fs::read_dir(temp.path().join("nested"))?.collect();
        assert_eq!(leftovers.len(), 1);
        Ok(())
    }
}
