//! Versioned layouts of the configuration types
//!
//! Fields are written in declaration order. Both directions run the same
//! checks the builder applies: nothing is written that could not be read
//! back, and a stored configuration is never laxer than a command-line one.

use super::{
    CachePolicy, DynamicStorageConfig, FileEntry, FlushTimer, SerializerPolicy,
    StaticStorageConfig,
};
use crate::version::{FormatVersion, Versioned};
use crate::{CodecError, ConfigError};
use bytes::BytesMut;
use std::path::PathBuf;

fn invalid(err: ConfigError) -> CodecError {
    CodecError::InvalidValue(err.to_string())
}

impl Versioned for StaticStorageConfig {
    fn encode_for(&self, version: FormatVersion, buf: &mut BytesMut) -> Result<(), CodecError> {
        match version {
            FormatVersion::V1_13 => {
                self.validate().map_err(invalid)?;
                self.block_size.encode_for(version, buf)?;
                self.extent_size.encode_for(version, buf)?;
                self.shard_count.encode_for(version, buf)
            }
        }
    }

    fn decode_for(version: FormatVersion, input: &mut &[u8]) -> Result<Self, CodecError> {
        match version {
            FormatVersion::V1_13 => {
                let config = StaticStorageConfig {
                    block_size: u64::decode_for(version, input)?,
                    extent_size: u64::decode_for(version, input)?,
                    shard_count: u32::decode_for(version, input)?,
                };
                config.validate().map_err(invalid)?;
                Ok(config)
            }
        }
    }
}

impl Versioned for SerializerPolicy {
    fn encode_for(&self, version: FormatVersion, buf: &mut BytesMut) -> Result<(), CodecError> {
        match version {
            FormatVersion::V1_13 => {
                self.validate().map_err(invalid)?;
                self.gc_low_ratio.encode_for(version, buf)?;
                self.gc_high_ratio.encode_for(version, buf)?;
                self.num_active_data_extents.encode_for(version, buf)?;
                self.file_size_limit.encode_for(version, buf)?;
                self.file_zone_size.encode_for(version, buf)
            }
        }
    }

    fn decode_for(version: FormatVersion, input: &mut &[u8]) -> Result<Self, CodecError> {
        match version {
            FormatVersion::V1_13 => {
                let policy = SerializerPolicy {
                    gc_low_ratio: f32::decode_for(version, input)?,
                    gc_high_ratio: f32::decode_for(version, input)?,
                    num_active_data_extents: u32::decode_for(version, input)?,
                    file_size_limit: Option::<u64>::decode_for(version, input)?,
                    file_zone_size: u64::decode_for(version, input)?,
                };
                policy.validate().map_err(invalid)?;
                Ok(policy)
            }
        }
    }
}

impl Versioned for FlushTimer {
    fn encode_for(&self, version: FormatVersion, buf: &mut BytesMut) -> Result<(), CodecError> {
        match version {
            // Never is stored as an absent value
            FormatVersion::V1_13 => {
                let ms = match self {
                    FlushTimer::Never => None,
                    FlushTimer::Millis(ms) => Some(*ms),
                };
                ms.encode_for(version, buf)
            }
        }
    }

    fn decode_for(version: FormatVersion, input: &mut &[u8]) -> Result<Self, CodecError> {
        match version {
            FormatVersion::V1_13 => Ok(match Option::<u32>::decode_for(version, input)? {
                None => FlushTimer::Never,
                Some(ms) => FlushTimer::Millis(ms),
            }),
        }
    }
}

impl Versioned for CachePolicy {
    fn encode_for(&self, version: FormatVersion, buf: &mut BytesMut) -> Result<(), CodecError> {
        match version {
            FormatVersion::V1_13 => {
                self.validate().map_err(invalid)?;
                self.max_size.encode_for(version, buf)?;
                self.wait_for_flush.encode_for(version, buf)?;
                self.flush_timer.encode_for(version, buf)?;
                self.flush_threshold_percent.encode_for(version, buf)
            }
        }
    }

    fn decode_for(version: FormatVersion, input: &mut &[u8]) -> Result<Self, CodecError> {
        match version {
            FormatVersion::V1_13 => {
                let policy = CachePolicy {
                    max_size: u64::decode_for(version, input)?,
                    wait_for_flush: bool::decode_for(version, input)?,
                    flush_timer: FlushTimer::decode_for(version, input)?,
                    flush_threshold_percent: u32::decode_for(version, input)?,
                };
                policy.validate().map_err(invalid)?;
                Ok(policy)
            }
        }
    }
}

impl Versioned for FileEntry {
    fn encode_for(&self, version: FormatVersion, buf: &mut BytesMut) -> Result<(), CodecError> {
        match version {
            FormatVersion::V1_13 => {
                self.data_path.encode_for(version, buf)?;
                self.integrity_path.encode_for(version, buf)
            }
        }
    }

    fn decode_for(version: FormatVersion, input: &mut &[u8]) -> Result<Self, CodecError> {
        match version {
            FormatVersion::V1_13 => Ok(FileEntry {
                data_path: PathBuf::decode_for(version, input)?,
                integrity_path: Option::<PathBuf>::decode_for(version, input)?,
            }),
        }
    }
}

impl Versioned for DynamicStorageConfig {
    fn encode_for(&self, version: FormatVersion, buf: &mut BytesMut) -> Result<(), CodecError> {
        match version {
            FormatVersion::V1_13 => {
                self.validate().map_err(invalid)?;
                self.serializer.encode_for(version, buf)?;
                self.cache.encode_for(version, buf)?;
                self.files.encode_for(version, buf)
            }
        }
    }

    fn decode_for(version: FormatVersion, input: &mut &[u8]) -> Result<Self, CodecError> {
        match version {
            FormatVersion::V1_13 => {
                let config = DynamicStorageConfig {
                    serializer: SerializerPolicy::decode_for(version, input)?,
                    cache: CachePolicy::decode_for(version, input)?,
                    files: Vec::<FileEntry>::decode_for(version, input)?,
                };
                config.validate().map_err(invalid)?;
                Ok(config)
            }
        }
    }
}
