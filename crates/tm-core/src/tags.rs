//! Local To-tags and MD5 helpers.
//!
//! A local tag is a fixed prefix derived from the configured seed followed by
//! a short suffix hashed from the request, so retransmissions of a request get
//! the same tag.

use std::fmt::Write;

use md5::{Digest, Md5};

/// Lowercase hex of `bytes`
pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{:02x}", b);
    }
    out
}

/// MD5 over the concatenation of `parts`, as 32 hex characters
pub fn md5_hex(parts: &[&[u8]]) -> String {
    let mut hasher = Md5::new();
    for part in parts {
        hasher.update(part);
    }
    to_hex(&hasher.finalize())
}

#[derive(Debug, Clone)]
pub struct TagGenerator {
    prefix: String,
}

impl TagGenerator {
    pub fn new(seed: &str) -> Self {
        TagGenerator { prefix: md5_hex(&[seed.as_bytes()]) }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Tag for the dialog or reply identified by `parts`
    pub fn local_tag(&self, parts: &[&[u8]]) -> String {
        let suffix = md5_hex(parts);
        format!("{}-{}", self.prefix, &suffix[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_md5_known_value() {
        assert_eq!(md5_hex(&[&b"abc"[..]]), "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(md5_hex(&[&b"a"[..], &b"bc"[..]]), md5_hex(&[&b"abc"[..]]));
    }

    #[test]
    fn test_local_tag_stable() {
        let tags = TagGenerator::new("edge-1");
        let a = tags.local_tag(&[&b"call-1"[..], &b"from-tag"[..]]);
        let b = tags.local_tag(&[&b"call-1"[..], &b"from-tag"[..]]);
        let c = tags.local_tag(&[&b"call-2"[..], &b"from-tag"[..]]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with(tags.prefix()));
        assert_eq!(a.len(), 32 + 1 + 8);
    }
}
