//! Wire format primitives.
//!
//! Canonical message layout (message-only framing):
//! ```text
//! ┌──────────┬──────────┬─────────┬──────────┬──────────┐
//! │ START    │ ID       │ Version │ Body     │ END      │
//! │ 2 bytes  │ 2 bytes  │ 1 byte  │ Field*   │ 2 bytes  │
//! │ 0xAAAA   │ uint16   │ uint8   │          │ 0xFFFF   │
//! └──────────┴──────────┴─────────┴──────────┴──────────┘
//! ```
//!
//! Body fields:
//! ```text
//! Field := FixedScalar
//!        | Count(4B) FixedScalar*    variable-length sequence
//!        | Len(2B) Byte*             text
//! ```
//!
//! All multi-byte integers use one [`ByteOrder`], little-endian unless
//! configured otherwise.

use std::io::Read;

use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};

/// Message start sentinel.
pub const MESSAGE_START: u16 = 0xAAAA;

/// Message end sentinel.
pub const MESSAGE_END: u16 = 0xFFFF;

/// Header start marker (header-delimited framing).
pub const HEADER_START: u8 = 0xBB;

/// Header end marker (header-delimited framing).
pub const HEADER_END: u8 = 0xCC;

/// Size of the message start/end sentinels in bytes.
pub const SENTINEL_SIZE: usize = 2;

/// Size of the undelimited header fields (id + version).
pub const HEADER_SIZE: usize = 3;

/// Width of a sequence element-count prefix.
pub const SEQUENCE_PREFIX_SIZE: usize = 4;

/// Width of a text length prefix.
pub const TEXT_PREFIX_SIZE: usize = 2;

/// Longest text the 2-byte prefix can describe.
pub const MAX_TEXT_LEN: usize = u16::MAX as usize;

/// Default maximum number of elements in one sequence (1 Gi).
pub const DEFAULT_MAX_SEQUENCE_LEN: u32 = 1 << 30;

/// Byte order for every multi-byte integer on the wire.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

macro_rules! put_read {
    ($($ty:ty => $put:ident, $put_le:ident, $put_be:ident, $read:ident;)*) => {
        impl ByteOrder {
            $(
                #[inline]
                pub fn $put(self, buf: &mut BytesMut, v: $ty) {
                    match self {
                        ByteOrder::Little => buf.$put_le(v),
                        ByteOrder::Big => buf.$put_be(v),
                    }
                }

                #[inline]
                pub fn $read<R: Read + ?Sized>(self, r: &mut R) -> std::io::Result<$ty> {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    r.read_exact(&mut raw)?;
                    Ok(match self {
                        ByteOrder::Little => <$ty>::from_le_bytes(raw),
                        ByteOrder::Big => <$ty>::from_be_bytes(raw),
                    })
                }
            )*
        }
    };
}

put_read! {
    u16 => put_u16, put_u16_le, put_u16, read_u16;
    u32 => put_u32, put_u32_le, put_u32, read_u32;
    u64 => put_u64, put_u64_le, put_u64, read_u64;
    u128 => put_u128, put_u128_le, put_u128, read_u128;
    i16 => put_i16, put_i16_le, put_i16, read_i16;
    i32 => put_i32, put_i32_le, put_i32, read_i32;
    i64 => put_i64, put_i64_le, put_i64, read_i64;
    i128 => put_i128, put_i128_le, put_i128, read_i128;
    f32 => put_f32, put_f32_le, put_f32, read_f32;
    f64 => put_f64, put_f64_le, put_f64, read_f64;
}

impl ByteOrder {
    /// Encode a `u16` into its two wire bytes.
    #[inline]
    pub fn u16_bytes(self, v: u16) -> [u8; 2] {
        match self {
            ByteOrder::Little => v.to_le_bytes(),
            ByteOrder::Big => v.to_be_bytes(),
        }
    }

    /// Overwrite four bytes at `at` with `v`; used to backpatch counts.
    #[inline]
    pub fn patch_u32(self, buf: &mut BytesMut, at: usize, v: u32) {
        let raw = match self {
            ByteOrder::Little => v.to_le_bytes(),
            ByteOrder::Big => v.to_be_bytes(),
        };
        buf[at..at + SEQUENCE_PREFIX_SIZE].copy_from_slice(&raw);
    }
}

/// Read a single byte.
#[inline]
pub fn read_u8<R: Read + ?Sized>(r: &mut R) -> std::io::Result<u8> {
    let mut raw = [0u8; 1];
    r.read_exact(&mut raw)?;
    Ok(raw[0])
}

/// Read a 2-byte sentinel as raw bytes.
#[inline]
pub fn read_sentinel<R: Read + ?Sized>(r: &mut R) -> std::io::Result<[u8; SENTINEL_SIZE]> {
    let mut raw = [0u8; SENTINEL_SIZE];
    r.read_exact(&mut raw)?;
    Ok(raw)
}
