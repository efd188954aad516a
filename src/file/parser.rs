//! Cursor-based reader for PE structures.
//!
//! [`Parser`] wraps a byte slice and a position. Every read is bounds-checked and advances the
//! cursor, which lets each structure decoder in this crate read its fields in declaration order
//! without tracking offsets by hand. Besides the primitive reads it knows the handful of string
//! and identifier encodings found in PE images: NUL-terminated ANSI names, length-prefixed UTF-16
//! resource names, and 16-byte GUIDs.
//!
//! # Examples
//!
//! ```rust
//! use pescope::Parser;
//!
//! let data = [0x4C, 0x01, 0x02, 0x00, b'P', b'E', 0x00];
//! let mut parser = Parser::new(&data);
//!
//! assert_eq!(parser.read_le::<u16>()?, 0x014C);
//! assert_eq!(parser.read_le::<u16>()?, 2);
//! assert_eq!(parser.read_cstring()?, "PE");
//! # Ok::<(), pescope::Error>(())
//! ```

use uguid::Guid;
use widestring::U16String;

use crate::{
    file::io::{read_le_at, PeIO},
    pe::Bitness,
    Result,
};

/// A bounds-checked cursor over a byte slice.
///
/// `Parser` is cheap to construct and never allocates except when producing owned strings.
/// All reads return [`crate::Error::OutOfBounds`] instead of panicking when the data is too
/// short, which is what makes it usable on untrusted images.
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`Parser`] positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Move the current position to `pos`.
    ///
    /// Seeking to exactly the end of the data is allowed; the next read will fail.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `pos` lies beyond the data.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position = pos;
        Ok(())
    }

    /// Move the position forward by `step` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if advancing would exceed the data length.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        match self.position.checked_add(step) {
            Some(end) if end <= self.data.len() => {
                self.position = end;
                Ok(())
            }
            _ => Err(out_of_bounds_error!()),
        }
    }

    /// Get the current position of the parser within the data buffer.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Number of bytes left after the current position.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Peek at a little-endian value without advancing the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading `T` would exceed the data length.
    pub fn peek_le<T: PeIO>(&self) -> Result<T> {
        let mut temp_position = self.position;
        read_le_at::<T>(self.data, &mut temp_position)
    }

    /// Read a little-endian value and advance past it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading `T` would exceed the data length.
    pub fn read_le<T: PeIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Read a pointer-sized value: 4 bytes for PE32, 8 bytes for PE32+.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the value does not fit in the remaining data.
    pub fn read_pointer(&mut self, bitness: Bitness) -> Result<u64> {
        match bitness {
            Bitness::Pe32 => Ok(u64::from(self.read_le::<u32>()?)),
            Bitness::Pe32Plus => self.read_le::<u64>(),
        }
    }

    /// Borrow the next `length` bytes and advance past them.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `length` bytes remain.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let start = self.position;
        self.advance_by(length)?;
        Ok(&self.data[start..self.position])
    }

    /// Read a fixed-size byte array, e.g. a section name or a signature.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `N` bytes remain.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut array = [0_u8; N];
        array.copy_from_slice(bytes);
        Ok(array)
    }

    /// Read a NUL-terminated single-byte string.
    ///
    /// PE names are ANSI, not UTF-8, so bytes that do not decode are replaced rather than
    /// rejected. A string running to the end of the data without a terminator is accepted.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the cursor is already at the end of the data.
    pub fn read_cstring(&mut self) -> Result<String> {
        if self.position >= self.data.len() {
            return Err(out_of_bounds_error!());
        }

        let start = self.position;
        let end = self.data[start..]
            .iter()
            .position(|&byte| byte == 0)
            .map_or(self.data.len(), |len| start + len);

        self.position = if end < self.data.len() { end + 1 } else { end };

        Ok(String::from_utf8_lossy(&self.data[start..end]).into_owned())
    }

    /// Read a UTF-16 string prefixed by its length in code units (`u16`).
    ///
    /// This is the encoding of named resource directory entries.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the declared length exceeds the data.
    pub fn read_prefixed_string_utf16(&mut self) -> Result<String> {
        let length = usize::from(self.read_le::<u16>()?);
        let bytes = self.read_bytes(length * 2)?;

        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        Ok(U16String::from_vec(units).to_string_lossy())
    }

    /// Read a 16-byte GUID in its mixed-endian on-disk layout.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than 16 bytes remain.
    pub fn read_guid(&mut self) -> Result<Guid> {
        Ok(Guid::from_bytes(self.read_array::<16>()?))
    }
}
