//! Binary codec for the hash manifest format.
//!
//! Layout, integers big-endian (network byte order, matching manifests
//! produced by deployed generators):
//!
//! ```text
//! manifest := count:i32, entry{count}
//! entry    := digest:byte[32], path_len:i32, path:byte[path_len]   // UTF-8
//! ```
//!
//! There is no framing, checksum, or version tag; the end of the last entry
//! must coincide with the end of the file. Writing is not atomic; callers
//! that need atomicity write to a temporary path and rename.

use std::fs;
use std::path::Path;

use crate::digest::Digest;

use super::error::ManifestError;

/// Maximum manifest file size. Files beyond this are rejected outright.
const MAX_MANIFEST_LEN: u64 = i32::MAX as u64;

/// Parse a manifest from its raw bytes.
///
/// Every entry path is validated: absolute paths, empty paths, and paths
/// containing a `..` segment are rejected, since a hostile manifest could
/// otherwise write or delete outside the root.
pub fn decode_manifest(bytes: &[u8]) -> Result<Vec<(String, Digest)>, ManifestError> {
    let mut reader = Reader::new(bytes);

    let count = reader.read_i32("entry count")?;
    if count < 0 {
        return Err(ManifestError::InvalidCount(count));
    }

    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let digest_bytes = reader.read_array::<32>("entry digest")?;
        let path_len = reader.read_i32("entry path length")?;
        if path_len < 0 {
            return Err(ManifestError::InvalidPathLength(path_len));
        }
        let path_bytes = reader.read_slice(path_len as usize, "entry path")?;
        let path = String::from_utf8(path_bytes.to_vec())?;
        validate_path(&path)?;
        entries.push((path, Digest::from_bytes(digest_bytes)));
    }

    let trailing = reader.remaining();
    if trailing > 0 {
        return Err(ManifestError::TrailingData(trailing));
    }

    Ok(entries)
}

/// Serialize entries into manifest bytes.
///
/// Entries are written in the order the iterator yields them; the format
/// imposes no ordering.
pub fn encode_manifest<'a, I>(entries: I, count: usize) -> Result<Vec<u8>, ManifestError>
where
    I: IntoIterator<Item = (&'a String, &'a Digest)>,
{
    if count > i32::MAX as usize {
        return Err(ManifestError::TooManyEntries(count));
    }

    let mut out = Vec::with_capacity(4 + count * 48);
    out.extend_from_slice(&(count as i32).to_be_bytes());
    for (path, digest) in entries {
        out.extend_from_slice(digest.as_bytes());
        let path_bytes = path.as_bytes();
        if path_bytes.len() > i32::MAX as usize {
            return Err(ManifestError::TooManyEntries(path_bytes.len()));
        }
        out.extend_from_slice(&(path_bytes.len() as i32).to_be_bytes());
        out.extend_from_slice(path_bytes);
    }

    Ok(out)
}

/// Read and parse a manifest file.
///
/// The whole file is read into memory before parsing; files larger than
/// `i32::MAX` bytes are rejected.
pub fn read_manifest(path: &Path) -> Result<Vec<(String, Digest)>, ManifestError> {
    let len = fs::metadata(path)?.len();
    if len > MAX_MANIFEST_LEN {
        return Err(ManifestError::TooLarge {
            len,
            max: MAX_MANIFEST_LEN,
        });
    }
    let bytes = fs::read(path)?;
    decode_manifest(&bytes)
}

/// Serialize entries and write them to a file, replacing any existing file.
pub fn write_manifest<'a, I>(path: &Path, entries: I, count: usize) -> Result<(), ManifestError>
where
    I: IntoIterator<Item = (&'a String, &'a Digest)>,
{
    let bytes = encode_manifest(entries, count)?;
    fs::write(path, bytes)?;
    Ok(())
}

/// Reject paths that could escape the synchronized root.
fn validate_path(path: &str) -> Result<(), ManifestError> {
    let unsafe_path = path.is_empty()
        || path.starts_with('/')
        || path.starts_with('\\')
        || path
            .split(['/', '\\'])
            .any(|segment| segment == "..");

    if unsafe_path {
        return Err(ManifestError::UnsafePath(path.to_string()));
    }
    Ok(())
}

/// Cursor over the raw manifest bytes.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn read_slice(&mut self, len: usize, context: &'static str) -> Result<&'a [u8], ManifestError> {
        if self.remaining() < len {
            return Err(ManifestError::Truncated { context });
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_array<const N: usize>(
        &mut self,
        context: &'static str,
    ) -> Result<[u8; N], ManifestError> {
        let slice = self.read_slice(N, context)?;
        let mut array = [0u8; N];
        array.copy_from_slice(slice);
        Ok(array)
    }

    fn read_i32(&mut self, context: &'static str) -> Result<i32, ManifestError> {
        let bytes = self.read_array::<4>(context)?;
        Ok(i32::from_be_bytes(bytes))
    }
}
