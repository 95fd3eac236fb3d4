//! Store header: the first block of every data file
//!
//! Format:
//! - 4 bytes: magic `EXDB`
//! - 1 byte: format version tag
//! - 4 bytes: payload length
//! - N bytes: static configuration, serialized for the tag above
//! - 4 bytes: CRC32 of everything after the magic
//!
//! The rest of the block is zero padding.

use crate::config::StaticStorageConfig;
use crate::limits::DEVICE_BLOCK_SIZE;
use crate::version::{deserialize_for_version, serialize_for_version, FormatVersion};
use crate::{ExtentError, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

/// File magic
pub const HEADER_MAGIC: &[u8; 4] = b"EXDB";

/// Bytes reserved for the header at the start of a data file
pub const HEADER_BLOCK_SIZE: usize = DEVICE_BLOCK_SIZE as usize;

const PREFIX_LEN: usize = 4 + 1 + 4;
const CHECKSUM_LEN: usize = 4;

/// Identity of an on-disk database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreHeader {
    /// Format every record in the file was written with
    pub version: FormatVersion,
    pub static_config: StaticStorageConfig,
}

impl StoreHeader {
    /// Header for a database created by this build
    pub fn new(static_config: StaticStorageConfig) -> Self {
        Self {
            version: FormatVersion::LATEST,
            static_config,
        }
    }

    /// Serialize with magic, tag, length prefix and checksum
    pub fn encode(&self) -> Result<Bytes> {
        let payload = serialize_for_version(self.version, &self.static_config)?;

        let mut buf = BytesMut::with_capacity(PREFIX_LEN + payload.len() + CHECKSUM_LEN);
        buf.put_slice(HEADER_MAGIC);
        buf.put_u8(self.version.as_u8());
        buf.put_u32_le(payload.len() as u32);
        buf.put_slice(&payload);

        let checksum = crc32fast::hash(&buf[HEADER_MAGIC.len()..]);
        buf.put_u32_le(checksum);

        Ok(buf.freeze())
    }

    /// Parse a header from the start of `data`, returning it and its length
    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        if data.len() < PREFIX_LEN {
            return Err(ExtentError::InvalidFormat("Store header too short".into()));
        }
        if &data[..4] != HEADER_MAGIC {
            return Err(ExtentError::InvalidFormat(
                "Not an ExtentDB data file (bad magic)".into(),
            ));
        }

        // The tag is checked before anything that depends on it
        let version = FormatVersion::try_from(data[4])?;

        let mut cursor = &data[5..PREFIX_LEN];
        let payload_len = cursor.get_u32_le() as usize;
        let total = PREFIX_LEN + payload_len + CHECKSUM_LEN;
        if total > HEADER_BLOCK_SIZE {
            return Err(ExtentError::Corruption(format!(
                "Store header claims {} bytes, more than its {} byte block",
                total, HEADER_BLOCK_SIZE
            )));
        }
        if data.len() < total {
            return Err(ExtentError::Corruption("Store header truncated".into()));
        }

        let body_end = PREFIX_LEN + payload_len;
        let expected = (&data[body_end..total]).get_u32_le();
        let actual = crc32fast::hash(&data[HEADER_MAGIC.len()..body_end]);
        if expected != actual {
            return Err(ExtentError::ChecksumMismatch { expected, actual });
        }

        let static_config = deserialize_for_version(version, &data[PREFIX_LEN..body_end])?;

        Ok((
            Self {
                version,
                static_config,
            },
            total,
        ))
    }

    /// Write the header block at the start of `path`.
    ///
    /// Refuses to touch an existing file unless `force` is set.
    pub fn write_to(&self, path: &Path, force: bool) -> Result<()> {
        let encoded = self.encode()?;

        let mut options = OpenOptions::new();
        options.write(true);
        if force {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        let mut file = options.open(path)?;

        let mut block = vec![0u8; HEADER_BLOCK_SIZE];
        block[..encoded.len()].copy_from_slice(&encoded);
        file.write_all(&block)?;
        file.sync_all()?;
        Ok(())
    }

    /// Read the header block at the start of `path`
    pub fn read_from(path: &Path) -> Result<Self> {
        let mut data = Vec::with_capacity(HEADER_BLOCK_SIZE);
        File::open(path)?
            .take(HEADER_BLOCK_SIZE as u64)
            .read_to_end(&mut data)?;
        let (header, _) = Self::decode(&data)?;
        Ok(header)
    }
}
