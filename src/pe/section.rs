//! Section table entries and their derived access intent.

use bitflags::bitflags;

use crate::{file::parser::Parser, Result};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Raw `Characteristics` bits of a section header.
    ///
    /// Only the bits this crate interprets are named; others are retained as unnamed bits.
    pub struct SectionCharacteristics: u32 {
        /// `IMAGE_SCN_CNT_CODE`
        const CNT_CODE = 0x0000_0020;
        /// `IMAGE_SCN_CNT_INITIALIZED_DATA`
        const CNT_INITIALIZED_DATA = 0x0000_0040;
        /// `IMAGE_SCN_CNT_UNINITIALIZED_DATA`
        const CNT_UNINITIALIZED_DATA = 0x0000_0080;
        /// `IMAGE_SCN_MEM_DISCARDABLE`
        const MEM_DISCARDABLE = 0x0200_0000;
        /// `IMAGE_SCN_MEM_SHARED`
        const MEM_SHARED = 0x1000_0000;
        /// `IMAGE_SCN_MEM_EXECUTE`
        const MEM_EXECUTE = 0x2000_0000;
        /// `IMAGE_SCN_MEM_READ`
        const MEM_READ = 0x4000_0000;
        /// `IMAGE_SCN_MEM_WRITE`
        const MEM_WRITE = 0x8000_0000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// How a section is meant to be used once mapped.
    pub struct SectionAccess: u8 {
        /// Holds code, declared or inferred from the entry point
        const EXECUTE = 0x01;
        /// Readable
        const READ = 0x02;
        /// Writable
        const WRITE = 0x04;
        /// Declares initialized or uninitialized data
        const DATA = 0x08;
    }
}

/// Round `value` up to the next multiple of `alignment`.
///
/// The result is never less than one alignment unit, so an empty section still occupies one
/// page. A zero alignment leaves `value` unchanged.
#[must_use]
pub fn aligned(value: u32, alignment: u32) -> u32 {
    if alignment == 0 {
        return value;
    }

    let units = value.div_ceil(alignment).max(1);
    units.saturating_mul(alignment)
}

/// A decoded section header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Name with trailing NULs removed
    pub name: String,
    /// Declared `VirtualSize`
    pub virtual_size: u32,
    /// RVA of the first byte
    pub virtual_address: u32,
    /// Declared `SizeOfRawData`
    pub size_of_raw_data: u32,
    /// File offset of the raw data, zero for uninitialized sections
    pub pointer_to_raw_data: u32,
    /// Raw characteristics
    pub characteristics: SectionCharacteristics,
    /// Virtual size rounded to the section alignment
    pub mapped_size: u32,
    /// Raw size rounded to the file alignment, zero when there is no raw data
    pub mapped_raw_size: u32,
    /// Access intent derived from the characteristics and the entry point
    pub access: SectionAccess,
}

impl Section {
    /// Size of a section header on disk.
    pub const SIZE: usize = 40;

    /// Decode one section header at the current position.
    ///
    /// # Arguments
    /// * `parser` - Positioned at the start of the header
    /// * `section_alignment` - From the optional header
    /// * `file_alignment` - From the optional header
    /// * `entry_point` - Entry point RVA, used to infer code in sections that do not declare it
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the header is truncated.
    pub fn read(
        parser: &mut Parser,
        section_alignment: u32,
        file_alignment: u32,
        entry_point: u32,
    ) -> Result<Self> {
        let raw_name = parser.read_array::<8>()?;
        let name_len = raw_name.iter().position(|&b| b == 0).unwrap_or(8);
        let name = String::from_utf8_lossy(&raw_name[..name_len]).into_owned();

        let virtual_size = parser.read_le::<u32>()?;
        let virtual_address = parser.read_le::<u32>()?;
        let size_of_raw_data = parser.read_le::<u32>()?;
        let pointer_to_raw_data = parser.read_le::<u32>()?;
        // relocations, line numbers and their counts
        parser.advance_by(12)?;
        let characteristics = SectionCharacteristics::from_bits_retain(parser.read_le::<u32>()?);

        let mapped_size = aligned(virtual_size, section_alignment);
        let mapped_raw_size = if pointer_to_raw_data == 0 {
            0
        } else {
            aligned(size_of_raw_data, file_alignment)
        };

        let mut section = Section {
            name,
            virtual_size,
            virtual_address,
            size_of_raw_data,
            pointer_to_raw_data,
            characteristics,
            mapped_size,
            mapped_raw_size,
            access: SectionAccess::empty(),
        };
        section.access = section.derive_access(entry_point);

        Ok(section)
    }

    fn derive_access(&self, entry_point: u32) -> SectionAccess {
        let mut access = SectionAccess::empty();

        if self
            .characteristics
            .intersects(SectionCharacteristics::CNT_CODE | SectionCharacteristics::MEM_EXECUTE)
            || (entry_point != 0 && self.contains_mapped(entry_point))
        {
            access |= SectionAccess::EXECUTE;
        }
        if self.characteristics.contains(SectionCharacteristics::MEM_READ) {
            access |= SectionAccess::READ;
        }
        if self.characteristics.contains(SectionCharacteristics::MEM_WRITE) {
            access |= SectionAccess::WRITE;
        }
        if self.characteristics.intersects(
            SectionCharacteristics::CNT_INITIALIZED_DATA
                | SectionCharacteristics::CNT_UNINITIALIZED_DATA,
        ) {
            access |= SectionAccess::DATA;
        }

        access
    }

    /// Whether `rva` lies in the declared virtual range `[va, va + VirtualSize)`.
    ///
    /// Address translation uses this declared range.
    #[must_use]
    pub fn contains(&self, rva: u32) -> bool {
        rva >= self.virtual_address && u64::from(rva) < self.end()
    }

    /// Whether `rva` lies in the alignment-rounded virtual range.
    #[must_use]
    pub fn contains_mapped(&self, rva: u32) -> bool {
        rva >= self.virtual_address
            && u64::from(rva) < u64::from(self.virtual_address) + u64::from(self.mapped_size)
    }

    /// Exclusive end of the declared virtual range.
    #[must_use]
    pub fn end(&self) -> u64 {
        u64::from(self.virtual_address) + u64::from(self.virtual_size)
    }

    /// Whether the section is executable.
    #[must_use]
    pub fn is_executable(&self) -> bool {
        self.access.contains(SectionAccess::EXECUTE)
    }
}
