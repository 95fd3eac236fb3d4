//! Error types for ExtentDB

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ExtentDB operations
pub type Result<T> = std::result::Result<T, ExtentError>;

/// Top-level error type
#[derive(Error, Debug)]
pub enum ExtentError {
    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration rejected
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Versioned payload could not be decoded
    #[error("Decode error: {0}")]
    Codec(#[from] CodecError),

    /// Data corruption detected
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// Checksum mismatch
    #[error("Checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// Invalid data format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

impl ExtentError {
    /// Check if error is a fatal configuration error
    pub fn is_fatal_config(&self) -> bool {
        matches!(self, ExtentError::Config(_))
    }

    /// Check if error indicates corruption
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            ExtentError::Corruption(_) | ExtentError::ChecksumMismatch { .. }
        )
    }
}

/// Fatal configuration errors.
///
/// Messages name the offending value and the bound it violated; they are what
/// the operator sees before the process exits.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("--{option} expects a number, got \"{value}\"")]
    NotANumber { option: &'static str, value: String },

    #[error("--{option} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        option: &'static str,
        value: String,
        min: i128,
        max: i128,
    },

    #[error("Maximum number of CPUs is {max}")]
    TooManyCpus { max: u32 },

    #[error("Maximum number of slices is {max}")]
    TooManySlices { max: u32 },

    #[error("Cannot use more than {max} files.")]
    TooManyFiles { max: usize },

    #[error("--active-data-extents must be less than or equal to {max}")]
    ActiveExtentsOutOfRange { max: u32 },

    #[error("You can specify the integrity file name only after specifying a database file name.")]
    IntegrityFileWithoutFile,

    #[error("wait-for-flush expects 'y' or 'n'")]
    InvalidWaitForFlush { value: String },

    #[error("flush timer should not be negative; use 'disable' to allow changes to sit in memory indefinitely")]
    NegativeFlushTimer { value: i64 },

    #[error("gc-range expects \"low-high\", got \"{value}\"")]
    MalformedGcRange { value: String },

    #[error("gc-range expects \"low-high\", with {min} <= low < high <= {max}")]
    GcRangeOutOfBounds { low: f32, high: f32, min: f32, max: f32 },

    #[error("--block-size must be a multiple of {unit}")]
    BlockSizeNotAligned { value: i128, unit: u64 },

    #[error("--block-size value is not reasonable.")]
    BlockSizeUnreasonable { value: i128 },

    #[error("--extent-size value is not reasonable.")]
    ExtentSizeUnreasonable { value: i128 },

    #[error("Extent size ({extent_size}) is not a multiple of block size ({block_size}).")]
    ExtentNotMultipleOfBlock { extent_size: u64, block_size: u64 },

    #[error("Unexpected extra argument: \"{0}\"")]
    UnexpectedArgument(String),

    #[error("You must explicitly specify one or more paths with -f.")]
    NoDataFiles,

    #[error("Could not access() path \"{}\": {reason}", .path.display())]
    ProbeFailed { path: PathBuf, reason: String },
}

/// Errors from the versioned codec.
///
/// An unsupported tag is reported as such; it is never mapped onto the
/// nearest revision the reader knows.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("unsupported format version {found} (supported {first}..={latest})")]
    UnsupportedVersion { found: u8, first: u8, latest: u8 },

    #[error("payload truncated while decoding {0}")]
    Truncated(&'static str),

    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("payload exceeds the {limit} byte decode limit")]
    TooLarge { limit: u64 },
}
