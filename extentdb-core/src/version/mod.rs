//! On-disk format versions and the versioned codec
//!
//! Values are serialized *for* a [`FormatVersion`]; the tag itself is never
//! part of the payload. Whoever stores the bytes (a file header, a record
//! envelope) stores the tag next to them and hands it back on read.
//!
//! Every [`Versioned`] implementation matches on the version exhaustively.
//! Adding a variant to [`FormatVersion`] therefore breaks the build at each
//! type that has not yet been given a layout for it.

mod codec;

use crate::CodecError;
use bytes::{Bytes, BytesMut};
use std::fmt;

pub use codec::{decode_leaf, encode_leaf};

/// A format revision the engine can both write and read
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum FormatVersion {
    /// Format introduced with the 1.13 series
    V1_13 = 1,
}

impl FormatVersion {
    /// Oldest revision this build can decode
    pub const FIRST_SUPPORTED: FormatVersion = FormatVersion::V1_13;

    /// Revision written by this build
    pub const LATEST: FormatVersion = FormatVersion::V1_13;

    /// Every supported revision, oldest first
    pub const ALL: &'static [FormatVersion] = &[FormatVersion::V1_13];

    /// Wire representation of the tag
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    fn unsupported(found: u8) -> CodecError {
        CodecError::UnsupportedVersion {
            found,
            first: Self::FIRST_SUPPORTED.as_u8(),
            latest: Self::LATEST.as_u8(),
        }
    }
}

impl TryFrom<u8> for FormatVersion {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, CodecError> {
        match value {
            1 => Ok(FormatVersion::V1_13),
            _ => Err(FormatVersion::unsupported(value)),
        }
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatVersion::V1_13 => write!(f, "v1.13"),
        }
    }
}

/// A value with a defined layout for every supported format revision
pub trait Versioned: Sized {
    /// Append the layout of `self` for `version` to `buf`
    fn encode_for(&self, version: FormatVersion, buf: &mut BytesMut) -> Result<(), CodecError>;

    /// Decode a value laid out for `version`, advancing `input` past it
    fn decode_for(version: FormatVersion, input: &mut &[u8]) -> Result<Self, CodecError>;
}

/// Serialize `value` for `version`. The tag is NOT written.
pub fn serialize_for_version<T: Versioned>(
    version: FormatVersion,
    value: &T,
) -> Result<Bytes, CodecError> {
    let mut buf = BytesMut::new();
    value.encode_for(version, &mut buf)?;
    Ok(buf.freeze())
}

/// Deserialize a value written for `version`.
///
/// The whole of `data` must be consumed.
pub fn deserialize_for_version<T: Versioned>(
    version: FormatVersion,
    data: &[u8],
) -> Result<T, CodecError> {
    if data.len() as u64 > crate::limits::MAX_DECODE_BYTES {
        return Err(CodecError::TooLarge {
            limit: crate::limits::MAX_DECODE_BYTES,
        });
    }

    let mut input = data;
    let value = T::decode_for(version, &mut input)?;
    if !input.is_empty() {
        return Err(CodecError::TrailingBytes(input.len()));
    }
    Ok(value)
}

/// Deserialize using a tag read from storage.
///
/// The tag is range-checked before any payload byte is looked at.
pub fn deserialize_for_raw_version<T: Versioned>(raw: u8, data: &[u8]) -> Result<T, CodecError> {
    let version = FormatVersion::try_from(raw)?;
    deserialize_for_version(version, data)
}
