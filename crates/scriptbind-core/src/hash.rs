//! Deterministic name hashing.
//!
//! [`NameHash`] keys name-based lookups of script-visible class names.
//! Hashes are computed with XXHash64 seeded with a domain constant.

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants for hash computation.
pub mod hash_constants {
    /// Domain marker for class names
    pub const CLASS: u64 = 0x2fac10b63a6cc57c;
}

/// 64-bit hash of a script-visible name.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NameHash(pub u64);

impl NameHash {
    /// Hash a class name.
    pub fn from_name(name: &str) -> Self {
        NameHash(xxh64(name.as_bytes(), hash_constants::CLASS))
    }
}

impl fmt::Debug for NameHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NameHash({:#018x})", self.0)
    }
}
