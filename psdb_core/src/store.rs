//! Store management and record I/O.

use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::kind::ResourceKind;
use crate::record::{CompressionType, HEADER_SIZE, RecordHeader};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Compression threshold: payloads >= 4KB are compressed.
const COMPRESSION_THRESHOLD: usize = 4096;

/// Store format version written to `config`.
const CONFIG_VERSION: &str = "1";

/// How a store was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Reads only; writes fail.
    ReadOnly,
    /// Fresh store; previous records were discarded on open.
    OverWrite,
}

/// Payload access mode for reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadMode {
    /// The complete record file, header included, moved verbatim.
    Raw,
    /// The uncompressed payload, ready for the decoder.
    Decoded,
}

/// A directory-backed pipeline state database.
#[derive(Debug)]
pub struct Store {
    root: PathBuf,
    mode: OpenMode,
}

impl Store {
    /// Create a store at the given path in overwrite mode.
    ///
    /// Creates the directory structure:
    /// - `records/<kind>/` for every resource kind
    /// - `config` file with the store version
    ///
    /// Any records already present under `root` are discarded.
    pub fn create<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(&root)?;

        let records_dir = root.join("records");
        if records_dir.exists() {
            fs::remove_dir_all(&records_dir)?;
        }
        for kind in ResourceKind::ALL {
            fs::create_dir_all(records_dir.join(kind.as_str()))?;
        }

        let config_path = root.join("config");
        fs::write(&config_path, format!("version={}\n", CONFIG_VERSION))?;

        Ok(Self {
            root,
            mode: OpenMode::OverWrite,
        })
    }

    /// Open an existing store read-only.
    ///
    /// Validates the store structure and reads the configuration.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        if !root.exists() {
            return Err(Error::invalid_store(&root, "directory does not exist"));
        }

        let config_path = root.join("config");
        if !config_path.exists() {
            return Err(Error::invalid_store(&root, "config file not found"));
        }

        let config_content = fs::read_to_string(&config_path)?;
        Self::parse_config(&config_content)
            .map_err(|reason| Error::invalid_store(&root, reason))?;

        if !root.join("records").is_dir() {
            return Err(Error::invalid_store(&root, "records directory missing"));
        }

        Ok(Self {
            root,
            mode: OpenMode::ReadOnly,
        })
    }

    /// Parse and validate the config file.
    fn parse_config(content: &str) -> std::result::Result<(), String> {
        let mut version = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=')
                && key.trim() == "version"
            {
                version = Some(value.trim());
            }
        }

        match version {
            Some(CONFIG_VERSION) => Ok(()),
            Some(other) => Err(format!("unsupported config version: {}", other)),
            None => Err("missing version in config".to_string()),
        }
    }

    /// Get the root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the mode the store was opened in.
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    fn kind_dir(&self, kind: ResourceKind) -> PathBuf {
        self.root.join("records").join(kind.as_str())
    }

    /// Get the path to a record file.
    ///
    /// Returns: `records/{kind}/{prefix}/{suffix}`
    pub fn record_path(&self, kind: ResourceKind, hash: &Hash) -> PathBuf {
        self.kind_dir(kind).join(hash.prefix()).join(hash.suffix())
    }

    /// List every hash stored for `kind`, in ascending order.
    ///
    /// Files whose names do not form a hash (temp files, strays) are skipped.
    pub fn list_hashes(&self, kind: ResourceKind) -> Result<Vec<Hash>> {
        let kind_dir = self.kind_dir(kind);
        let mut hashes = Vec::new();

        if !kind_dir.exists() {
            return Ok(hashes);
        }

        for shard_entry in fs::read_dir(&kind_dir)? {
            let shard_path = shard_entry?.path();
            if !shard_path.is_dir() {
                continue;
            }

            let prefix = shard_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("")
                .to_string();

            for record_entry in fs::read_dir(&shard_path)? {
                let record_path = record_entry?.path();
                if !record_path.is_file() {
                    continue;
                }

                let suffix = record_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("");

                // Only names that round-trip to this record path count.
                if let Ok(hash) = Hash::from_hex(&format!("{}{}", prefix, suffix))
                    && hash.prefix() == prefix
                    && hash.suffix() == suffix
                {
                    hashes.push(hash);
                }
            }
        }

        hashes.sort();
        Ok(hashes)
    }

    /// Check whether a record exists.
    pub fn has_entry(&self, kind: ResourceKind, hash: &Hash) -> bool {
        self.record_path(kind, hash).is_file()
    }

    /// Read a record.
    ///
    /// In [`PayloadMode::Raw`] the record file is returned byte for byte.
    /// In [`PayloadMode::Decoded`] the payload is decompressed.
    pub fn read_entry(&self, kind: ResourceKind, hash: &Hash, mode: PayloadMode) -> Result<Vec<u8>> {
        let path = self.record_path(kind, hash);
        if !path.is_file() {
            return Err(Error::record_not_found(kind, *hash));
        }

        let raw = fs::read(&path)?;
        let header = RecordHeader::validate_raw(&raw, kind)
            .map_err(|e| Error::corrupted_record(&path, e.to_string()))?;

        match mode {
            PayloadMode::Raw => Ok(raw),
            PayloadMode::Decoded => {
                let stored = &raw[HEADER_SIZE..];
                match header.compression {
                    CompressionType::None => Ok(stored.to_vec()),
                    CompressionType::Zstd => decompress_zstd(stored),
                }
            }
        }
    }

    /// Write a record.
    ///
    /// In [`PayloadMode::Raw`] `bytes` must be a complete record of `kind`
    /// and are written unchanged. In [`PayloadMode::Decoded`] `bytes` is the
    /// plain payload and gets wrapped (and compressed if large).
    ///
    /// A record that already exists is left as is.
    pub fn write_entry(
        &self,
        kind: ResourceKind,
        hash: &Hash,
        bytes: &[u8],
        mode: PayloadMode,
    ) -> Result<()> {
        if self.mode == OpenMode::ReadOnly {
            return Err(Error::read_only(&self.root));
        }

        let path = self.record_path(kind, hash);
        if path.exists() {
            return Ok(());
        }

        match mode {
            PayloadMode::Raw => {
                RecordHeader::validate_raw(bytes, kind)?;
                self.write_record_atomic(&path, &[bytes])
            }
            PayloadMode::Decoded => {
                let (stored, compression) = if bytes.len() >= COMPRESSION_THRESHOLD {
                    (compress_zstd(bytes)?, CompressionType::Zstd)
                } else {
                    (bytes.to_vec(), CompressionType::None)
                };

                let header = RecordHeader::new(kind, compression, stored.len() as u64).encode();
                self.write_record_atomic(&path, &[&header[..], &stored[..]])
            }
        }
    }

    /// Copy one record verbatim from `source` into this store.
    pub fn copy_entry_from(&self, source: &Store, kind: ResourceKind, hash: &Hash) -> Result<()> {
        let raw = source.read_entry(kind, hash, PayloadMode::Raw)?;
        self.write_entry(kind, hash, &raw, PayloadMode::Raw)
    }

    /// Write a record file atomically using tempfile.
    fn write_record_atomic(&self, path: &Path, parts: &[&[u8]]) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::invalid_store(&self.root, "record path has no parent"))?;
        fs::create_dir_all(parent)?;

        let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
        for part in parts {
            temp_file.write_all(part)?;
        }
        temp_file.flush()?;

        temp_file.persist(path)?;

        Ok(())
    }
}

/// Compress data using zstd.
fn compress_zstd(data: &[u8]) -> Result<Vec<u8>> {
    zstd::encode_all(data, 3) // Level 3 = fast compression
        .map_err(|e| Error::compression_error(format!("zstd compression failed: {}", e)))
}

/// Decompress data using zstd.
fn decompress_zstd(data: &[u8]) -> Result<Vec<u8>> {
    zstd::decode_all(data)
        .map_err(|e| Error::compression_error(format!("zstd decompression failed: {}", e)))
}
