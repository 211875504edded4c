//! Entry fingerprints.
//!
//! A fingerprint is the SHA-512 digest of the canonical encoding of
//! `(computation_id, version, serialized_params)`. The encoding length-prefixes
//! each field, so no two distinct triples share an encoding:
//!
//! ```text
//! canonical = len(id) as u64 BE || id
//!          || len(version) as u64 BE || version
//!          || len(params) as u64 BE || params
//! ```
//!
//! Without the prefixes, `("ab", "c", ..)` and `("a", "bc", ..)` would hash
//! the same bytes. Collisions remain only a cryptographic-strength concern.

use std::fmt;

use sha2::{Digest, Sha512};

/// Length in bytes of a fingerprint (SHA-512 output).
pub const FINGERPRINT_LEN: usize = 64;

/// Fixed-length byte fingerprint identifying one cache entry.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    /// Hashes the canonical encoding of the identity triple.
    pub fn compute(computation_id: &str, version: &str, params: &[u8]) -> Self {
        let mut hasher = Sha512::new();
        for field in [computation_id.as_bytes(), version.as_bytes(), params] {
            hasher.update((field.len() as u64).to_be_bytes());
            hasher.update(field);
        }
        Self(hasher.finalize().into())
    }

    /// Reconstructs a fingerprint from raw bytes, e.g. a stored key column.
    /// Returns `None` if `bytes` is not exactly [`FINGERPRINT_LEN`] long.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; FINGERPRINT_LEN]>::try_from(bytes).ok().map(Self)
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    /// Lowercase hex rendering of the full digest.
    pub fn to_hex(&self) -> String {
        use fmt::Write;
        let mut out = String::with_capacity(FINGERPRINT_LEN * 2);
        for byte in self.0 {
            // write! to a String is infallible
            let _ = write!(out, "{byte:02x}");
        }
        out
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // first 8 bytes are plenty for diagnostics
        write!(f, "Fingerprint(")?;
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "..)")
    }
}
