//! Binary record format.
//!
//! Every record file is a 16-byte header followed by the stored payload:
//!
//! ```text
//! 0x00  4   "PSDB" magic
//! 0x04  1   version (u8) = 1
//! 0x05  1   resource kind tag
//! 0x06  1   compression: 0=none, 1=zstd
//! 0x07  1   reserved (must be 0)
//! 0x08  8   payload_len (u64 LE) - stored size
//! 0x10  ... payload
//! ```
//!
//! Raw reads and writes move the whole file, header included.

use crate::error::{Error, Result};
use crate::kind::ResourceKind;

/// Magic bytes at the start of every record file.
pub const MAGIC: &[u8; 4] = b"PSDB";

/// Current record format version.
pub const VERSION: u8 = 1;

/// Size of the record header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Compression types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    /// No compression.
    None = 0,
    /// Zstandard compression.
    Zstd = 1,
}

impl CompressionType {
    /// Convert to byte representation.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse from byte representation.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(CompressionType::None),
            1 => Ok(CompressionType::Zstd),
            _ => Err(Error::compression_error(format!(
                "Invalid compression type: {}",
                value
            ))),
        }
    }

    /// Get the string name of this compression type.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionType::None => "none",
            CompressionType::Zstd => "zstd",
        }
    }
}

/// A 16-byte record header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    /// Record format version.
    pub version: u8,
    /// Kind of the record.
    pub kind: ResourceKind,
    /// Compression of the stored payload.
    pub compression: CompressionType,
    /// Length of the stored payload in bytes.
    pub payload_len: u64,
}

impl RecordHeader {
    /// Create a new record header.
    pub fn new(kind: ResourceKind, compression: CompressionType, payload_len: u64) -> Self {
        Self {
            version: VERSION,
            kind,
            compression,
            payload_len,
        }
    }

    /// Encode the header to a 16-byte array.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];

        buf[0..4].copy_from_slice(MAGIC);
        buf[4] = self.version;
        buf[5] = self.kind.tag();
        buf[6] = self.compression.to_u8();
        // buf[7] reserved
        buf[8..16].copy_from_slice(&self.payload_len.to_le_bytes());

        buf
    }

    /// Decode a header from the start of `buf`.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::decode(format!(
                "Header too short: {} bytes (expected {})",
                buf.len(),
                HEADER_SIZE
            )));
        }

        if &buf[0..4] != MAGIC {
            return Err(Error::decode(format!(
                "Invalid magic: expected {:?}, got {:?}",
                MAGIC,
                &buf[0..4]
            )));
        }

        let version = buf[4];
        if version != VERSION {
            return Err(Error::UnsupportedVersion {
                what: "record",
                version: version as u64,
            });
        }

        let kind = ResourceKind::from_tag(buf[5])?;
        let compression = CompressionType::from_u8(buf[6])?;

        if buf[7] != 0 {
            return Err(Error::decode(format!(
                "Reserved byte must be 0, got {}",
                buf[7]
            )));
        }

        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&buf[8..16]);
        let payload_len = u64::from_le_bytes(len_bytes);

        Ok(Self {
            version,
            kind,
            compression,
            payload_len,
        })
    }

    /// Decode and check a complete raw record of the expected kind.
    ///
    /// Returns the header; the stored payload is `&raw[HEADER_SIZE..]`.
    pub fn validate_raw(raw: &[u8], expected: ResourceKind) -> Result<Self> {
        let header = Self::decode(raw)?;

        if header.kind != expected {
            return Err(Error::decode(format!(
                "Record kind mismatch: expected {}, got {}",
                expected, header.kind
            )));
        }

        let stored = (raw.len() - HEADER_SIZE) as u64;
        if stored != header.payload_len {
            return Err(Error::decode(format!(
                "Payload length mismatch: expected {}, got {}",
                header.payload_len, stored
            )));
        }

        Ok(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_encode_decode() {
        let header = RecordHeader::new(ResourceKind::RenderPass, CompressionType::Zstd, 1234);
        let encoded = header.encode();

        assert_eq!(&encoded[0..4], MAGIC);
        assert_eq!(encoded[4], VERSION);
        assert_eq!(encoded[5], ResourceKind::RenderPass.tag());
        assert_eq!(encoded[6], 1);
        assert_eq!(encoded[7], 0);

        let decoded = RecordHeader::decode(&encoded).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_header_rejects_garbage() {
        assert!(RecordHeader::decode(b"PSDB").is_err());

        let mut bad_magic = RecordHeader::new(ResourceKind::Sampler, CompressionType::None, 0).encode();
        bad_magic[0] = b'X';
        assert!(RecordHeader::decode(&bad_magic).is_err());

        let mut bad_version =
            RecordHeader::new(ResourceKind::Sampler, CompressionType::None, 0).encode();
        bad_version[4] = 9;
        assert!(matches!(
            RecordHeader::decode(&bad_version),
            Err(Error::UnsupportedVersion { version: 9, .. })
        ));

        let mut bad_kind = RecordHeader::new(ResourceKind::Sampler, CompressionType::None, 0).encode();
        bad_kind[5] = 42;
        assert!(RecordHeader::decode(&bad_kind).is_err());

        let mut bad_compression =
            RecordHeader::new(ResourceKind::Sampler, CompressionType::None, 0).encode();
        bad_compression[6] = 7;
        assert!(RecordHeader::decode(&bad_compression).is_err());

        let mut reserved = RecordHeader::new(ResourceKind::Sampler, CompressionType::None, 0).encode();
        reserved[7] = 1;
        assert!(RecordHeader::decode(&reserved).is_err());
    }

    #[test]
    fn test_validate_raw() {
        let payload = b"{}";
        let mut raw = RecordHeader::new(ResourceKind::Sampler, CompressionType::None, 2)
            .encode()
            .to_vec();
        raw.extend_from_slice(payload);

        assert!(RecordHeader::validate_raw(&raw, ResourceKind::Sampler).is_ok());
        assert!(RecordHeader::validate_raw(&raw, ResourceKind::RenderPass).is_err());

        raw.push(b'\n');
        assert!(RecordHeader::validate_raw(&raw, ResourceKind::Sampler).is_err());
    }
}
