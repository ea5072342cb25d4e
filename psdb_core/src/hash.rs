//! 64-bit content hashes.
//!
//! A [`Hash`] identifies a record within its [`ResourceKind`](crate::ResourceKind).
//! Hashes are computed by whatever recorded the database; this crate only
//! carries them around. During decode the same value doubles as the object
//! handle, so one type serves as hash, handle and map key.

use crate::error::{Error, Result};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Hash size in bytes.
pub const HASH_SIZE: usize = 8;

/// A 64-bit content hash.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash(u64);

impl Hash {
    /// The null handle. Never refers to a record.
    pub const NULL: Hash = Hash(0);

    /// Create a Hash from its integer value.
    pub const fn new(value: u64) -> Self {
        Hash(value)
    }

    /// Get the integer value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Whether this is the null handle.
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Create a Hash from its canonical hex form (16 hex characters).
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        if hex_str.len() != HASH_SIZE * 2 {
            return Err(Error::invalid_hash(format!(
                "Expected {} hex characters, got {}",
                HASH_SIZE * 2,
                hex_str.len()
            )));
        }

        let mut bytes = [0u8; HASH_SIZE];
        hex::decode_to_slice(hex_str, &mut bytes)
            .map_err(|e| Error::invalid_hash(format!("Invalid hex: {}", e)))?;

        Ok(Hash(u64::from_be_bytes(bytes)))
    }

    /// Convert to canonical hex form (16 lowercase characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.to_be_bytes())
    }

    /// Get the first 2 hex characters (for directory sharding).
    pub fn prefix(&self) -> String {
        hex::encode(&self.0.to_be_bytes()[..1])
    }

    /// Get the remaining 14 hex characters (for filename).
    pub fn suffix(&self) -> String {
        hex::encode(&self.0.to_be_bytes()[1..])
    }

    /// Fold a BLAKE3 digest of `data` down to 64 bits.
    pub fn digest(data: &[u8]) -> Self {
        let digest = blake3::hash(data);
        let mut bytes = [0u8; HASH_SIZE];
        bytes.copy_from_slice(&digest.as_bytes()[..HASH_SIZE]);
        Hash(u64::from_le_bytes(bytes))
    }
}

impl From<u64> for Hash {
    fn from(value: u64) -> Self {
        Hash(value)
    }
}

/// Lenient parse: 1 to 16 hex digits, optional `0x` prefix.
impl FromStr for Hash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);

        if digits.is_empty() || digits.len() > HASH_SIZE * 2 {
            return Err(Error::invalid_hash(format!(
                "Expected 1 to {} hex digits, got {:?}",
                HASH_SIZE * 2,
                s
            )));
        }

        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::invalid_hash(format!("Invalid hex {:?}", s)));
        }

        u64::from_str_radix(digits, 16)
            .map(Hash)
            .map_err(|e| Error::invalid_hash(format!("Invalid hex {:?}: {}", s, e)))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({:016x})", self.0)
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct HashVisitor;

        impl Visitor<'_> for HashVisitor {
            type Value = Hash;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a 16 character hex hash")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Hash, E> {
                Hash::from_hex(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(HashVisitor)
    }
}
