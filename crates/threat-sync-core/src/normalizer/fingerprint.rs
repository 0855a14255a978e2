//! Content fingerprint of a normalized entry set
//!
//! SHA-256 over the sorted canonical strings, each terminated by `\n`.

use super::NormalizedSet;
use sha2::{Digest, Sha256};
use std::fmt;

/// Fixed-length digest used to detect "no change since last sync"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Compute the fingerprint of a normalized set
    pub fn of(set: &NormalizedSet) -> Self {
        Self::of_strings(set.to_strings())
    }

    /// Compute the fingerprint of arbitrary canonical strings
    ///
    /// The strings are sorted first, so input order does not matter.
    pub fn of_strings(mut strings: Vec<String>) -> Self {
        strings.sort_unstable();

        let mut hasher = Sha256::new();
        for s in &strings {
            hasher.update(s.as_bytes());
            hasher.update(b"\n");
        }
        Self(hasher.finalize().into())
    }

    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
