//! ExtentDB Core - bootstrap contract for the log-structured storage engine
//!
//! Everything the engine needs before it touches a block of user data:
//!
//! - **Format versions**: a closed set of on-disk format revisions and a
//!   codec that serializes values *for* a revision without writing the tag
//! - **Configuration**: the static (creation-time) and dynamic (per-run)
//!   storage parameters, plus the builder that validates them
//! - **Option table**: the declarative command-line surface feeding the builder
//! - **Store header**: the per-file superblock that carries the format tag
//!   out of band and pins the static configuration of a database

pub mod cli;
pub mod config;
pub mod store;
pub mod version;

mod error;

pub use error::{CodecError, ConfigError, ExtentError, Result};

/// ExtentDB version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Hard limits and defaults
pub mod limits {
    pub const KILOBYTE: u64 = 1024;
    pub const MEGABYTE: u64 = 1024 * KILOBYTE;
    pub const GIGABYTE: u64 = 1024 * MEGABYTE;
    pub const TERABYTE: u64 = 1024 * GIGABYTE;

    /// Upper bound on CPUs; one is always kept for the utility thread
    pub const MAX_CPUS: u32 = 64;

    /// Maximum number of B-tree slices
    pub const MAX_SHARDS: u32 = 256;

    /// Maximum number of data files (one serializer each)
    pub const MAX_FILES: usize = 32;

    /// Maximum number of extents open for writing at once
    pub const MAX_ACTIVE_DATA_EXTENTS: u32 = 64;

    /// Smallest unit the device can address
    pub const DEVICE_BLOCK_SIZE: u64 = 4 * KILOBYTE;

    /// Largest block size accepted
    pub const MAX_BLOCK_SIZE: u64 = DEVICE_BLOCK_SIZE * 1000;

    /// Largest extent size accepted
    pub const MAX_EXTENT_SIZE: u64 = TERABYTE;

    pub const MIN_GC_LOW_RATIO: f32 = 0.01;
    pub const MAX_GC_HIGH_RATIO: f32 = 0.99;

    pub const DEFAULT_GC_LOW_RATIO: f32 = 0.5;
    pub const DEFAULT_GC_HIGH_RATIO: f32 = 0.65;
    pub const DEFAULT_ACTIVE_DATA_EXTENTS: u32 = 1;
    pub const DEFAULT_FILE_ZONE_SIZE: u64 = GIGABYTE;

    pub const DEFAULT_BLOCK_SIZE: u64 = 4 * KILOBYTE;
    pub const DEFAULT_EXTENT_SIZE: u64 = 8 * MEGABYTE;
    pub const DEFAULT_SHARDS: u32 = 8;

    /// Fraction of available RAM given to the block cache by default
    pub const DEFAULT_MAX_CACHE_RATIO: f64 = 0.5;
    pub const DEFAULT_FLUSH_TIMER_MS: u32 = 5000;
    pub const DEFAULT_FLUSH_THRESHOLD_PERCENT: u32 = 30;

    pub const DEFAULT_LISTEN_PORT: u16 = 11211;

    /// Database file used when no `-f` is given
    pub const DEFAULT_DB_FILE_NAME: &str = "extentdb_data";

    /// Suffix of the integrity sidecar when none is named explicitly
    pub const DEFAULT_INTEGRITY_EXTENSION: &str = ".integrity";

    /// Cap on bytes a single decode may consume
    pub const MAX_DECODE_BYTES: u64 = 64 * MEGABYTE;
}
