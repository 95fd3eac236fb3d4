//! Layouts of the built-in types
//!
//! V1_13 scalars and strings go through bincode with fixed-width little-endian
//! integers. Sequences and options are framed by hand so their element types
//! can dispatch on the version themselves.

use super::{FormatVersion, Versioned};
use crate::limits::MAX_DECODE_BYTES;
use crate::CodecError;
use bincode::Options;
use bytes::{BufMut, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;

fn bincode_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .with_limit(MAX_DECODE_BYTES)
        .allow_trailing_bytes()
}

fn map_bincode_error(err: bincode::Error, type_name: &'static str) -> CodecError {
    match *err {
        bincode::ErrorKind::Io(ref io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
            CodecError::Truncated(type_name)
        }
        bincode::ErrorKind::SizeLimit => CodecError::TooLarge {
            limit: MAX_DECODE_BYTES,
        },
        other => CodecError::InvalidValue(format!("{}: {}", type_name, other)),
    }
}

/// Encode a serde value with the V1_13 scalar layout
pub fn encode_leaf<T: Serialize>(value: &T, buf: &mut BytesMut) -> Result<(), CodecError> {
    bincode_options()
        .serialize_into(buf.writer(), value)
        .map_err(|e| map_bincode_error(e, std::any::type_name::<T>()))
}

/// Decode a serde value with the V1_13 scalar layout
pub fn decode_leaf<T: DeserializeOwned>(input: &mut &[u8]) -> Result<T, CodecError> {
    bincode_options()
        .deserialize_from(input)
        .map_err(|e| map_bincode_error(e, std::any::type_name::<T>()))
}

macro_rules! versioned_leaf {
    ($($ty:ty),* $(,)?) => {$(
        impl Versioned for $ty {
            fn encode_for(&self, version: FormatVersion, buf: &mut BytesMut) -> Result<(), CodecError> {
                match version {
                    FormatVersion::V1_13 => encode_leaf(self, buf),
                }
            }

            fn decode_for(version: FormatVersion, input: &mut &[u8]) -> Result<Self, CodecError> {
                match version {
                    FormatVersion::V1_13 => decode_leaf(input),
                }
            }
        }
    )*};
}

versioned_leaf!(u8, u16, u32, u64, i64, bool, f32, f64, String, PathBuf);

impl Versioned for FormatVersion {
    fn encode_for(&self, version: FormatVersion, buf: &mut BytesMut) -> Result<(), CodecError> {
        match version {
            FormatVersion::V1_13 => {
                buf.put_u8(self.as_u8());
                Ok(())
            }
        }
    }

    fn decode_for(version: FormatVersion, input: &mut &[u8]) -> Result<Self, CodecError> {
        match version {
            FormatVersion::V1_13 => FormatVersion::try_from(u8::decode_for(version, input)?),
        }
    }
}

impl<T: Versioned> Versioned for Option<T> {
    fn encode_for(&self, version: FormatVersion, buf: &mut BytesMut) -> Result<(), CodecError> {
        match version {
            FormatVersion::V1_13 => match self {
                None => {
                    buf.put_u8(0);
                    Ok(())
                }
                Some(value) => {
                    buf.put_u8(1);
                    value.encode_for(version, buf)
                }
            },
        }
    }

    fn decode_for(version: FormatVersion, input: &mut &[u8]) -> Result<Self, CodecError> {
        match version {
            FormatVersion::V1_13 => match u8::decode_for(version, input)? {
                0 => Ok(None),
                1 => Ok(Some(T::decode_for(version, input)?)),
                other => Err(CodecError::InvalidValue(format!(
                    "option marker must be 0 or 1, got {}",
                    other
                ))),
            },
        }
    }
}

impl<T: Versioned> Versioned for Vec<T> {
    fn encode_for(&self, version: FormatVersion, buf: &mut BytesMut) -> Result<(), CodecError> {
        match version {
            FormatVersion::V1_13 => {
                let len = u32::try_from(self.len()).map_err(|_| CodecError::TooLarge {
                    limit: u32::MAX as u64,
                })?;
                buf.put_u32_le(len);
                for item in self {
                    item.encode_for(version, buf)?;
                }
                Ok(())
            }
        }
    }

    fn decode_for(version: FormatVersion, input: &mut &[u8]) -> Result<Self, CodecError> {
        match version {
            FormatVersion::V1_13 => {
                let len = u32::decode_for(version, input)? as usize;
                // Every element takes at least one byte, so a longer count is a lie
                if len > input.len() {
                    return Err(CodecError::Truncated(std::any::type_name::<Self>()));
                }
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(T::decode_for(version, input)?);
                }
                Ok(items)
            }
        }
    }
}
