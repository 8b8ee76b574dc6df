//! Hash manifests: the binary wire format and the in-memory cache.
//!
//! A manifest records a `(digest, relative path)` pair for every tracked
//! file. The server publishes one over HTTP; the client keeps the last
//! applied copy next to the files it governs. `HashCache` holds a loaded
//! manifest in memory and, when bound to a root directory, can lazily
//! digest files on disk that the manifest never mentioned.

mod cache;
mod codec;
mod error;

pub use cache::HashCache;
pub use codec::{decode_manifest, encode_manifest, read_manifest, write_manifest};
pub use error::ManifestError;
