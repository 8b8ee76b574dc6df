//! In-memory cache of file digests keyed by relative path.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::digest::{digest_file, Digest};

use super::codec;
use super::error::ManifestError;

/// A cache of file digests for a directory tree.
///
/// A cache is either loaded from a manifest file or built by digesting a
/// directory. When bound to a root directory it may lazily admit new
/// entries: querying a path that is absent from the map but exists as a
/// regular file under the root digests the file and records the result.
/// A cache without a root binding never grows on query.
///
/// The API does not distinguish entries that came from a manifest from
/// entries digested off disk; callers compare a cache of one origin against
/// a peer cache of the other.
#[derive(Debug)]
pub struct HashCache {
    entries: HashMap<String, Digest>,
    root: Option<PathBuf>,
}

impl HashCache {
    /// Create an empty cache with no root binding.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            root: None,
        }
    }

    /// Build a cache by recursively digesting every regular file under
    /// `root`. Keys are `/`-separated paths relative to the root. Symbolic
    /// links and other non-regular files are skipped.
    pub fn from_directory(root: &Path) -> io::Result<Self> {
        let mut cache = Self {
            entries: HashMap::new(),
            root: Some(root.to_path_buf()),
        };

        for entry in WalkDir::new(root) {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(key) = relative_key(root, entry.path()) {
                debug!(path = %key, "hashing");
                let digest = digest_file(entry.path())?;
                cache.entries.insert(key, digest);
            }
        }

        Ok(cache)
    }

    /// Load a cache from a stored manifest file.
    ///
    /// A missing `file` yields an empty cache, which still carries the
    /// `root` binding for lazy digestion. Passing `root = None` makes the
    /// cache read-only with respect to new keys.
    pub fn load(file: &Path, root: Option<&Path>) -> Result<Self, ManifestError> {
        Self::load_with(file, root, None)
    }

    /// Load a cache, applying `transform` to each key before insertion.
    pub fn load_with(
        file: &Path,
        root: Option<&Path>,
        transform: Option<&dyn Fn(&str) -> String>,
    ) -> Result<Self, ManifestError> {
        let mut cache = Self {
            entries: HashMap::new(),
            root: root.map(Path::to_path_buf),
        };

        if file.is_file() {
            for (path, digest) in codec::read_manifest(file)? {
                let path = match transform {
                    Some(transform) => transform(&path),
                    None => path,
                };
                cache.entries.insert(path, digest);
            }
        }

        Ok(cache)
    }

    /// Serialize the cache to a manifest file, replacing any existing file.
    pub fn write(&self, path: &Path) -> Result<(), ManifestError> {
        codec::write_manifest(path, self.entries.iter(), self.entries.len())
    }

    /// Return the paths present in `peer` that this cache disagrees with:
    /// either this cache has no entry for the path (after attempting lazy
    /// digestion when bound to a root) or the digests differ.
    ///
    /// Only keys of `peer` are enumerated; keys present only in `self` are
    /// not reported. Call with operands swapped to get the other side. A
    /// file missing under the bound root counts as "no entry", not an
    /// error. The result is sorted for deterministic event ordering.
    pub fn difference(&mut self, peer: &HashCache) -> io::Result<Vec<String>> {
        let mut differing = Vec::new();

        for (path, peer_digest) in &peer.entries {
            if !self.ensure_digest(path)? {
                differing.push(path.clone());
            } else if self.entries.get(path) != Some(peer_digest) {
                differing.push(path.clone());
            }
        }

        differing.sort();
        Ok(differing)
    }

    /// Look up the digest recorded for a path, without lazy digestion.
    pub fn get(&self, path: &str) -> Option<&Digest> {
        self.entries.get(path)
    }

    /// Insert or replace an entry.
    pub fn insert(&mut self, path: impl Into<String>, digest: Digest) {
        self.entries.insert(path.into(), digest);
    }

    /// Number of entries currently in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The bound root directory, if any.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Iterate over `(path, digest)` entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Digest)> {
        self.entries.iter()
    }

    /// Ensure an entry exists for `path`, digesting the file under the
    /// bound root if necessary. Returns whether an entry is now present.
    fn ensure_digest(&mut self, path: &str) -> io::Result<bool> {
        if self.entries.contains_key(path) {
            return Ok(true);
        }

        let root = match &self.root {
            Some(root) => root,
            None => return Ok(false),
        };

        let file = root.join(path);
        if !file.is_file() {
            return Ok(false);
        }

        let digest = digest_file(&file)?;
        self.entries.insert(path.to_string(), digest);
        Ok(true)
    }
}

impl Default for HashCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert an absolute path under `root` into a `/`-separated relative key.
fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut key = String::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            if !key.is_empty() {
                key.push('/');
            }
            key.push_str(&part.to_string_lossy());
        }
    }
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}
