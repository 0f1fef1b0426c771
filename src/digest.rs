use sha2::{Digest as _, Sha256};
use std::fmt;

use crate::Error;

/// length of the package id embedded in the sealed document.
/// the id is the leading bytes of the SHA-256 over the document.
pub const PACKAGE_ID_LEN: usize = 20;

/// SHA-256 digest used for file content and package identity
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; 32]);

impl Digest {
    /// zero digest (useful as sentinel)
    pub const ZERO: Digest = Digest([0u8; 32]);

    /// create from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// parse from hex string
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        let bytes = hex::decode(s).map_err(|_| Error::InvalidDigestHex(s.to_string()))?;
        if bytes.len() != 32 {
            return Err(Error::InvalidDigestHex(s.to_string()));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// digest a byte slice in one shot
    pub fn of(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// leading bytes used as the package id
    pub fn package_id(&self) -> &[u8] {
        &self.0[..PACKAGE_ID_LEN]
    }

    /// convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", &self.to_hex()[..12])
    }
}

/// streaming hasher for file content
pub struct ContentHasher {
    hasher: Sha256,
    len: u64,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
            len: 0,
        }
    }

    /// feed content bytes
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
        self.len += data.len() as u64;
    }

    /// total bytes fed so far
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// finalize and return digest
    pub fn finalize(self) -> Digest {
        Digest(self.hasher.finalize().into())
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_hex_roundtrip() {
        let original =
            Digest::from_hex("abcdef0123456789abcdef0123456789abcdef0123456789abcdef0123456789")
                .unwrap();
        let hex = original.to_hex();
        let parsed = Digest::from_hex(&hex).unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_digest_invalid_hex() {
        assert!(Digest::from_hex("not valid hex").is_err());
        assert!(Digest::from_hex("abcd").is_err()); // too short
    }

    #[test]
    fn test_digest_of_determinism() {
        assert_eq!(Digest::of(b"hello"), Digest::of(b"hello"));
        assert_ne!(Digest::of(b"hello"), Digest::of(b"world"));
    }

    #[test]
    fn test_package_id_is_prefix() {
        let d = Digest::of(b"content");
        assert_eq!(d.package_id(), &d.as_bytes()[..PACKAGE_ID_LEN]);
        assert_eq!(d.package_id().len(), 20);
    }

    #[test]
    fn test_streaming_matches_oneshot() {
        let direct = Digest::of(b"helloworld");

        let mut streaming = ContentHasher::new();
        streaming.update(b"hello");
        streaming.update(b"world");
        assert_eq!(streaming.len(), 10);
        assert_eq!(streaming.finalize(), direct);
    }
}
