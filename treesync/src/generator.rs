//! Server-side manifest generation.
//!
//! Walks a directory tree, digests every regular file, and writes the
//! resulting manifest. The manifest is written to a temporary sibling and
//! renamed into place, since the codec itself does not write atomically.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::manifest::{HashCache, ManifestError};

/// Result of a manifest generation run.
#[derive(Debug, Clone)]
pub struct GenerateSummary {
    /// Number of files digested and recorded.
    pub files_hashed: usize,
    /// Where the manifest was written.
    pub manifest_path: PathBuf,
}

/// Digest every regular file under `root` and write a manifest to `out`.
pub fn generate_manifest(root: &Path, out: &Path) -> Result<GenerateSummary, ManifestError> {
    info!(root = %root.display(), out = %out.display(), "generating manifest");

    let cache = HashCache::from_directory(root)?;

    let staging = staging_path(out);
    cache.write(&staging)?;
    fs::rename(&staging, out)?;

    info!(files = cache.len(), "manifest written");
    Ok(GenerateSummary {
        files_hashed: cache.len(),
        manifest_path: out.to_path_buf(),
    })
}

fn staging_path(out: &Path) -> PathBuf {
    let file_name = out
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    out.with_file_name(format!("{}.tmp", file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::Digest;
    use tempfile::TempDir;

    #[test]
    fn test_generate_manifest_covers_tree() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("tree");
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("a.txt"), b"alpha").unwrap();
        fs::write(root.join("sub/b.txt"), b"beta").unwrap();

        let out = temp.path().join("manifest.hash");
        let summary = generate_manifest(&root, &out).unwrap();

        assert_eq!(summary.files_hashed, 2);
        assert_eq!(summary.manifest_path, out);

        let loaded = HashCache::load(&out, None).unwrap();
        assert_eq!(loaded.get("a.txt"), Some(&Digest::compute(b"alpha")));
        assert_eq!(loaded.get("sub/b.txt"), Some(&Digest::compute(b"beta")));
    }

    #[test]
    fn test_generate_manifest_leaves_no_staging_file() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("tree");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("a.txt"), b"alpha").unwrap();

        let out = temp.path().join("manifest.hash");
        generate_manifest(&root, &out).unwrap();

        assert!(out.is_file());
        assert!(!temp.path().join("manifest.hash.tmp").exists());
    }

    #[test]
    fn test_generate_manifest_empty_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("empty");
        fs::create_dir_all(&root).unwrap();

        let out = temp.path().join("manifest.hash");
        let summary = generate_manifest(&root, &out).unwrap();
        assert_eq!(summary.files_hashed, 0);

        let loaded = HashCache::load(&out, None).unwrap();
        assert!(loaded.is_empty());
    }
}
