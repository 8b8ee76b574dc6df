//! URL construction for archive downloads.
//!
//! Relative file paths are appended to a fixed archive URL prefix. The
//! encoder percent-encodes everything outside the RFC 3986 unreserved set,
//! including reserved URL characters like `?` and `#`, so any path is safe
//! to append. Path separators (`/` and `\`) both emit `/`.

/// Percent-encode a relative file path into a URL path suffix.
///
/// Code points in `[A-Za-z0-9._~-]` pass through unchanged; `/` and `\`
/// both emit `/`; anything else is encoded as its UTF-8 bytes, each as
/// `%xx` with lowercase hex.
pub fn encode_path(path: &str) -> String {
    let mut encoded = String::with_capacity(path.len());
    let mut utf8 = [0u8; 4];

    for ch in path.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '~') {
            encoded.push(ch);
        } else if ch == '/' || ch == '\\' {
            encoded.push('/');
        } else {
            for byte in ch.encode_utf8(&mut utf8).bytes() {
                encoded.push('%');
                encoded.push_str(&format!("{:02x}", byte));
            }
        }
    }

    encoded
}

/// Build the download URL for a relative path under an archive prefix.
///
/// Ensures exactly one `/` separates the prefix from the encoded suffix.
pub fn archive_url(prefix: &str, path: &str) -> String {
    let encoded = encode_path(path);
    if prefix.ends_with('/') {
        format!("{}{}", prefix, encoded)
    } else {
        format!("{}/{}", prefix, encoded)
    }
}
