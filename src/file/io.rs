//! Little-endian primitive reads for PE structures.
//!
//! Every structure in a PE image is little-endian. This module provides the [`PeIO`] trait,
//! implemented for the unsigned integer widths found in those structures, and two bounds-checked
//! helpers built on top of it: [`read_le`] reads from the start of a buffer, [`read_le_at`]
//! reads at an offset and advances it.
//!
//! ```rust,ignore
//! use pescope::file::io::read_le_at;
//!
//! let data = [0x4D, 0x5A, 0x90, 0x00];
//! let mut offset = 0;
//! assert_eq!(read_le_at::<u16>(&data, &mut offset)?, 0x5A4D);
//! assert_eq!(offset, 2);
//! # Ok::<(), pescope::Error>(())
//! ```

use crate::{Error::OutOfBounds, Result};

/// A primitive that can be decoded from its little-endian byte representation.
pub trait PeIO: Sized {
    /// Fixed-size byte array holding one encoded value.
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    /// Decode a value from little-endian bytes
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
}

macro_rules! impl_pe_io {
    ($($ty:ty),* $(,)?) => {
        $(
            impl PeIO for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }
            }
        )*
    };
}

impl_pe_io!(u8, u16, u32, u64, i32);

/// Reads a `T` from the beginning of `data`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than `T`.
pub fn read_le<T: PeIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Reads a `T` at `offset` and advances `offset` past it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if fewer than `size_of::<T>()` bytes remain, including
/// when `offset` itself would overflow.
pub fn read_le_at<T: PeIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(OutOfBounds);
    };
    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(OutOfBounds);
    };

    *offset = end;

    Ok(T::from_le_bytes(read))
}
