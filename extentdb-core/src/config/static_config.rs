//! Creation-time storage parameters

use crate::limits::{
    DEFAULT_BLOCK_SIZE, DEFAULT_EXTENT_SIZE, DEFAULT_SHARDS, DEVICE_BLOCK_SIZE, MAX_BLOCK_SIZE,
    MAX_EXTENT_SIZE, MAX_SHARDS,
};
use crate::ConfigError;

/// Layout parameters fixed when the database is created.
///
/// Once a database exists these come from its store header, never from the
/// command line of a later run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticStorageConfig {
    /// Block size in bytes
    pub block_size: u64,
    /// Extent size in bytes
    pub extent_size: u64,
    /// Number of B-tree slices
    pub shard_count: u32,
}

impl Default for StaticStorageConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            extent_size: DEFAULT_EXTENT_SIZE,
            shard_count: DEFAULT_SHARDS,
        }
    }
}

impl StaticStorageConfig {
    /// Check a block size on its own: aligned to the device, positive, sane
    pub fn check_block_size(value: i128) -> Result<u64, ConfigError> {
        if value % DEVICE_BLOCK_SIZE as i128 != 0 {
            return Err(ConfigError::BlockSizeNotAligned {
                value,
                unit: DEVICE_BLOCK_SIZE,
            });
        }
        if value <= 0 || value > MAX_BLOCK_SIZE as i128 {
            return Err(ConfigError::BlockSizeUnreasonable { value });
        }
        Ok(value as u64)
    }

    /// Check an extent size on its own
    pub fn check_extent_size(value: i128) -> Result<u64, ConfigError> {
        if value <= 0 || value > MAX_EXTENT_SIZE as i128 {
            return Err(ConfigError::ExtentSizeUnreasonable { value });
        }
        Ok(value as u64)
    }

    /// Check a slice count on its own
    pub fn check_shard_count(value: i128) -> Result<u32, ConfigError> {
        if value > MAX_SHARDS as i128 {
            return Err(ConfigError::TooManySlices { max: MAX_SHARDS });
        }
        if value < 1 {
            return Err(ConfigError::OutOfRange {
                option: "slices",
                value: value.to_string(),
                min: 1,
                max: MAX_SHARDS as i128,
            });
        }
        Ok(value as u32)
    }

    /// Extents must hold a whole number of blocks
    pub fn check_layout(&self) -> Result<(), ConfigError> {
        if self.block_size == 0 || self.extent_size % self.block_size != 0 {
            return Err(ConfigError::ExtentNotMultipleOfBlock {
                extent_size: self.extent_size,
                block_size: self.block_size,
            });
        }
        Ok(())
    }

    /// Validate every field and their relationship
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::check_block_size(self.block_size as i128)?;
        Self::check_extent_size(self.extent_size as i128)?;
        Self::check_shard_count(self.shard_count as i128)?;
        self.check_layout()
    }

    /// Blocks in one extent
    pub fn blocks_per_extent(&self) -> u64 {
        self.extent_size / self.block_size
    }
}
