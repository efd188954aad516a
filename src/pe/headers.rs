//! DOS, NT file and optional header records.
//!
//! The three headers are decoded in a strict linear order by [`crate::File`]: the DOS header
//! yields `e_lfanew`, the NT signature and [`FileHeader`] follow at that offset, and the
//! [`OptionalHeader`] magic selects between the PE32 and PE32+ layouts. The chosen layout is
//! captured as a [`Bitness`] and fixes the width of every pointer-sized field decoded afterwards.

use strum::{EnumCount, EnumIter, FromRepr};

use crate::{file::parser::Parser, Result};

/// `MZ`
pub const DOS_MAGIC: u16 = 0x5A4D;
/// `PE\0\0`
pub const NT_SIGNATURE: u32 = 0x0000_4550;
/// Optional header magic of a PE32 image.
pub const OPTIONAL_MAGIC_PE32: u16 = 0x10B;
/// Optional header magic of a PE32+ image.
pub const OPTIONAL_MAGIC_PE32_PLUS: u16 = 0x20B;
/// Number of data directory slots the optional header reserves.
pub const DATA_DIRECTORY_COUNT: usize = 16;

/// Intel 386 and later
pub const MACHINE_I386: u16 = 0x014C;
/// ARM little endian
pub const MACHINE_ARM: u16 = 0x01C0;
/// ARM Thumb-2 little endian
pub const MACHINE_ARMNT: u16 = 0x01C4;
/// x64
pub const MACHINE_AMD64: u16 = 0x8664;
/// ARM64 little endian
pub const MACHINE_ARM64: u16 = 0xAA64;

/// Width of the optional header's pointer-sized fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bitness {
    /// `0x10B` optional header, 4-byte pointers
    Pe32,
    /// `0x20B` optional header, 8-byte pointers
    Pe32Plus,
}

impl Bitness {
    /// Size of a pointer-sized field in bytes.
    #[must_use]
    pub fn pointer_size(self) -> usize {
        match self {
            Bitness::Pe32 => 4,
            Bitness::Pe32Plus => 8,
        }
    }

    /// Bit that tags an import thunk as an ordinal import.
    #[must_use]
    pub fn ordinal_flag(self) -> u64 {
        match self {
            Bitness::Pe32 => 0x8000_0000,
            Bitness::Pe32Plus => 0x8000_0000_0000_0000,
        }
    }
}

/// The legacy MS-DOS header at offset 0.
///
/// Only the two fields a PE loader consults are kept: the magic and the offset of the NT
/// headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DosHeader {
    /// `e_magic`, must equal [`DOS_MAGIC`]
    pub magic: u16,
    /// `e_lfanew`, file offset of the NT signature
    pub e_lfanew: u32,
}

impl DosHeader {
    /// Size of the on-disk record.
    pub const SIZE: usize = 64;

    /// Decode the DOS header from the start of `parser`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidFormat`] if the magic is not `MZ`, or
    /// [`crate::Error::OutOfBounds`] if the header is truncated.
    pub fn read(parser: &mut Parser) -> Result<Self> {
        if parser.len() < Self::SIZE {
            return Err(out_of_bounds_error!());
        }

        parser.seek(0)?;
        let magic = parser.read_le::<u16>()?;
        if magic != DOS_MAGIC {
            return Err(invalid_format_error!("DOS magic 0x{:04X}", magic));
        }

        parser.seek(0x3C)?;
        let e_lfanew = parser.read_le::<u32>()?;

        Ok(DosHeader { magic, e_lfanew })
    }
}

/// The COFF file header following the NT signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Target machine, e.g. [`MACHINE_I386`]
    pub machine: u16,
    /// Number of entries in the section table
    pub number_of_sections: u16,
    /// Link time as a Unix timestamp
    pub time_date_stamp: u32,
    /// File offset of the COFF symbol table, usually zero for images
    pub pointer_to_symbol_table: u32,
    /// Number of COFF symbols
    pub number_of_symbols: u32,
    /// Size of the optional header; the section table follows it
    pub size_of_optional_header: u16,
    /// Image characteristics flags
    pub characteristics: u16,
}

impl FileHeader {
    /// Size of the on-disk record.
    pub const SIZE: usize = 20;

    /// `IMAGE_FILE_DLL`
    pub const CHARACTERISTIC_DLL: u16 = 0x2000;

    /// Decode a file header at the current position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the header is truncated.
    pub fn read(parser: &mut Parser) -> Result<Self> {
        Ok(FileHeader {
            machine: parser.read_le::<u16>()?,
            number_of_sections: parser.read_le::<u16>()?,
            time_date_stamp: parser.read_le::<u32>()?,
            pointer_to_symbol_table: parser.read_le::<u32>()?,
            number_of_symbols: parser.read_le::<u32>()?,
            size_of_optional_header: parser.read_le::<u16>()?,
            characteristics: parser.read_le::<u16>()?,
        })
    }

    /// Whether the image is a DLL.
    #[must_use]
    pub fn is_dll(&self) -> bool {
        self.characteristics & Self::CHARACTERISTIC_DLL != 0
    }
}

/// Index of a slot in the optional header's data directory array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount, FromRepr)]
#[repr(usize)]
pub enum DataDirectoryType {
    /// Export directory
    Export = 0,
    /// Import directory
    Import = 1,
    /// Resource directory
    Resource = 2,
    /// Exception (`.pdata`) directory
    Exception = 3,
    /// Attribute certificate table; holds a file offset, not an RVA
    Security = 4,
    /// Base relocation table
    BaseReloc = 5,
    /// Debug directory
    Debug = 6,
    /// Architecture specific data, reserved
    Architecture = 7,
    /// Global pointer register value
    GlobalPtr = 8,
    /// Thread local storage directory
    Tls = 9,
    /// Load configuration directory
    LoadConfig = 10,
    /// Bound import directory
    BoundImport = 11,
    /// Import address table
    Iat = 12,
    /// Delay-load import descriptors
    DelayImport = 13,
    /// CLR runtime (Cor20) header
    ClrRuntimeHeader = 14,
    /// Reserved, must be zero
    Reserved = 15,
}

/// An `(RVA, size)` pair from the data directory array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataDirectory {
    /// RVA of the directory, zero when absent
    pub virtual_address: u32,
    /// Size of the directory in bytes
    pub size: u32,
}

impl DataDirectory {
    /// Decode an `(RVA, size)` pair at the current position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the pair is truncated.
    pub fn read(parser: &mut Parser) -> Result<Self> {
        Ok(DataDirectory {
            virtual_address: parser.read_le::<u32>()?,
            size: parser.read_le::<u32>()?,
        })
    }

    /// A directory is present when its RVA is non-zero.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.virtual_address != 0
    }
}

/// The optional header, unified over the PE32 and PE32+ layouts.
///
/// Pointer-sized fields are widened to `u64`; `base_of_data` only exists in PE32 images and is
/// `None` otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionalHeader {
    /// `0x10B` or `0x20B`
    pub magic: u16,
    /// Layout selected by [`OptionalHeader::magic`]
    pub bitness: Bitness,
    /// Linker major version
    pub major_linker_version: u8,
    /// Linker minor version
    pub minor_linker_version: u8,
    /// Total size of all code sections
    pub size_of_code: u32,
    /// Total size of all initialized data sections
    pub size_of_initialized_data: u32,
    /// Total size of all uninitialized data sections
    pub size_of_uninitialized_data: u32,
    /// RVA of the entry point, zero if the image has none
    pub address_of_entry_point: u32,
    /// RVA of the first code section
    pub base_of_code: u32,
    /// RVA of the first data section (PE32 only)
    pub base_of_data: Option<u32>,
    /// Preferred load address
    pub image_base: u64,
    /// Alignment of sections in memory
    pub section_alignment: u32,
    /// Alignment of section data in the file
    pub file_alignment: u32,
    /// Required OS major version
    pub major_operating_system_version: u16,
    /// Required OS minor version
    pub minor_operating_system_version: u16,
    /// Image major version
    pub major_image_version: u16,
    /// Image minor version
    pub minor_image_version: u16,
    /// Subsystem major version
    pub major_subsystem_version: u16,
    /// Subsystem minor version
    pub minor_subsystem_version: u16,
    /// Reserved, must be zero
    pub win32_version_value: u32,
    /// Size of the mapped image including headers
    pub size_of_image: u32,
    /// Combined size of all headers, rounded to the file alignment
    pub size_of_headers: u32,
    /// Image checksum
    pub check_sum: u32,
    /// Required subsystem
    pub subsystem: u16,
    /// DLL characteristics flags
    pub dll_characteristics: u16,
    /// Stack reserve size
    pub size_of_stack_reserve: u64,
    /// Stack commit size
    pub size_of_stack_commit: u64,
    /// Heap reserve size
    pub size_of_heap_reserve: u64,
    /// Heap commit size
    pub size_of_heap_commit: u64,
    /// Reserved, must be zero
    pub loader_flags: u32,
    /// Number of populated data directory slots
    pub number_of_rva_and_sizes: u32,
    /// All 16 directory slots; slots past `number_of_rva_and_sizes` are empty
    pub data_directories: [DataDirectory; DATA_DIRECTORY_COUNT],
}

impl OptionalHeader {
    /// Decode an optional header at the current position.
    ///
    /// The magic is peeked first to choose the layout.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidFormat`] for an unknown magic, or
    /// [`crate::Error::OutOfBounds`] if the header is truncated.
    pub fn read(parser: &mut Parser) -> Result<Self> {
        let magic = parser.peek_le::<u16>()?;
        let bitness = match magic {
            OPTIONAL_MAGIC_PE32 => Bitness::Pe32,
            OPTIONAL_MAGIC_PE32_PLUS => Bitness::Pe32Plus,
            _ => return Err(invalid_format_error!("optional header magic 0x{:04X}", magic)),
        };
        parser.advance_by(2)?;

        let major_linker_version = parser.read_le::<u8>()?;
        let minor_linker_version = parser.read_le::<u8>()?;
        let size_of_code = parser.read_le::<u32>()?;
        let size_of_initialized_data = parser.read_le::<u32>()?;
        let size_of_uninitialized_data = parser.read_le::<u32>()?;
        let address_of_entry_point = parser.read_le::<u32>()?;
        let base_of_code = parser.read_le::<u32>()?;
        let base_of_data = match bitness {
            Bitness::Pe32 => Some(parser.read_le::<u32>()?),
            Bitness::Pe32Plus => None,
        };
        let image_base = parser.read_pointer(bitness)?;
        let section_alignment = parser.read_le::<u32>()?;
        let file_alignment = parser.read_le::<u32>()?;
        let major_operating_system_version = parser.read_le::<u16>()?;
        let minor_operating_system_version = parser.read_le::<u16>()?;
        let major_image_version = parser.read_le::<u16>()?;
        let minor_image_version = parser.read_le::<u16>()?;
        let major_subsystem_version = parser.read_le::<u16>()?;
        let minor_subsystem_version = parser.read_le::<u16>()?;
        let win32_version_value = parser.read_le::<u32>()?;
        let size_of_image = parser.read_le::<u32>()?;
        let size_of_headers = parser.read_le::<u32>()?;
        let check_sum = parser.read_le::<u32>()?;
        let subsystem = parser.read_le::<u16>()?;
        let dll_characteristics = parser.read_le::<u16>()?;
        let size_of_stack_reserve = parser.read_pointer(bitness)?;
        let size_of_stack_commit = parser.read_pointer(bitness)?;
        let size_of_heap_reserve = parser.read_pointer(bitness)?;
        let size_of_heap_commit = parser.read_pointer(bitness)?;
        let loader_flags = parser.read_le::<u32>()?;
        let number_of_rva_and_sizes = parser.read_le::<u32>()?;

        let mut data_directories = [DataDirectory::default(); DATA_DIRECTORY_COUNT];
        let populated = (number_of_rva_and_sizes as usize).min(DATA_DIRECTORY_COUNT);
        for directory in data_directories.iter_mut().take(populated) {
            *directory = DataDirectory::read(parser)?;
        }

        Ok(OptionalHeader {
            magic,
            bitness,
            major_linker_version,
            minor_linker_version,
            size_of_code,
            size_of_initialized_data,
            size_of_uninitialized_data,
            address_of_entry_point,
            base_of_code,
            base_of_data,
            image_base,
            section_alignment,
            file_alignment,
            major_operating_system_version,
            minor_operating_system_version,
            major_image_version,
            minor_image_version,
            major_subsystem_version,
            minor_subsystem_version,
            win32_version_value,
            size_of_image,
            size_of_headers,
            check_sum,
            subsystem,
            dll_characteristics,
            size_of_stack_reserve,
            size_of_stack_commit,
            size_of_heap_reserve,
            size_of_heap_commit,
            loader_flags,
            number_of_rva_and_sizes,
            data_directories,
        })
    }

    /// Look up one data directory slot.
    #[must_use]
    pub fn directory(&self, kind: DataDirectoryType) -> DataDirectory {
        self.data_directories[kind as usize]
    }
}
