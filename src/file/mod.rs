//! PE image abstraction over a byte backend.
//!
//! This module owns the bytes of an image and everything decoded from its headers. It is the
//! HeaderDecoder of this crate: [`File::from_file`] and [`File::from_mem`] validate the DOS
//! header, the NT signature and the optional header magic, then decode the section table and
//! build the [`AddressTranslator`]. Any failure at this stage rejects the image with
//! [`crate::Error::InvalidFormat`]; nothing past the headers is touched.
//!
//! # Architecture
//!
//! - [`Backend`] - Source of bytes, either an owned buffer or a memory-mapped file
//! - [`File`] - Decoded headers plus byte access by file offset, RVA or VA
//! - [`parser::Parser`] - Cursor used by every structure decoder
//! - [`io`] - Little-endian primitive reads
//!
//! # Examples
//!
//! ```rust,no_run
//! use pescope::File;
//! use std::path::Path;
//!
//! let file = File::from_file(Path::new("notepad.exe"))?;
//! println!("Image base: 0x{:x}", file.image_base());
//! for section in file.sections() {
//!     println!("{:8} RVA 0x{:08x} access {:?}", section.name, section.virtual_address, section.access);
//! }
//! # Ok::<(), pescope::Error>(())
//! ```

pub mod io;
pub mod parser;

mod memory;
mod physical;

use std::path::Path;

use crate::{
    pe::{
        headers::NT_SIGNATURE, AddressTranslator, Bitness, DataDirectory, DataDirectoryType,
        DosHeader, FileHeader, OptionalHeader, Section,
    },
    Error::{self, Empty, InvalidFormat},
    Result,
};
use parser::Parser;

pub use memory::Memory;
pub use physical::Physical;

/// Backend trait for file data sources.
///
/// Abstracts over where the image bytes live so that decoding works the same for a buffer
/// already in memory and for a file mapped from disk.
pub trait Backend: Send + Sync {
    /// Returns a slice of the data at the given offset and length.
    ///
    /// # Arguments
    ///
    /// * `offset` - The starting offset within the data.
    /// * `len` - The length of the slice in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the requested range is out of bounds.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize;
}

/// A loaded PE image with validated headers.
///
/// `File` is immutable once loaded. Directory decoders borrow it to read structures at RVAs;
/// the analysis driver borrows it to answer "is this address mapped" and byte-read queries.
pub struct File {
    /// The underlying data source (memory or file).
    data: Box<dyn Backend>,
    dos_header: DosHeader,
    file_header: FileHeader,
    optional_header: OptionalHeader,
    translator: AddressTranslator,
}

impl File {
    /// Loads a PE image from the given path.
    ///
    /// The file is memory-mapped.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read or opened
    /// - The file is empty
    /// - The headers are not a valid PE layout ([`crate::Error::InvalidFormat`])
    pub fn from_file(file: &Path) -> Result<File> {
        let input = Physical::new(file)?;

        Self::load(input)
    }

    /// Loads a PE image from a memory buffer.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Empty`] for an empty buffer, or
    /// [`crate::Error::InvalidFormat`] if the headers are not a valid PE layout.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use pescope::File;
    ///
    /// let data = std::fs::read("notepad.exe")?;
    /// let file = File::from_mem(data)?;
    /// println!("{} sections", file.sections().len());
    /// # Ok::<(), pescope::Error>(())
    /// ```
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        let input = Memory::new(data);

        Self::load(input)
    }

    /// Internal loader for any backend.
    fn load<T: Backend + 'static>(data: T) -> Result<File> {
        if data.len() == 0 {
            return Err(Empty);
        }

        let (dos_header, file_header, optional_header, sections) =
            Self::decode_headers(data.data()).map_err(|error| match error {
                InvalidFormat(_) => error,
                Error::OutOfBounds => InvalidFormat("headers are truncated".to_string()),
                other => InvalidFormat(other.to_string()),
            })?;

        let translator = AddressTranslator::new(
            optional_header.image_base,
            optional_header.size_of_image,
            optional_header.section_alignment,
            sections,
        );

        Ok(File {
            data: Box::new(data),
            dos_header,
            file_header,
            optional_header,
            translator,
        })
    }

    fn decode_headers(
        data: &[u8],
    ) -> Result<(DosHeader, FileHeader, OptionalHeader, Vec<Section>)> {
        let mut parser = Parser::new(data);

        let dos_header = DosHeader::read(&mut parser)?;

        parser.seek(dos_header.e_lfanew as usize)?;
        let signature = parser.read_le::<u32>()?;
        if signature != NT_SIGNATURE {
            return Err(invalid_format_error!("NT signature 0x{:08X}", signature));
        }

        let file_header = FileHeader::read(&mut parser)?;
        let optional_start = parser.pos();
        let optional_header = OptionalHeader::read(&mut parser)?;

        let section_table = optional_start + usize::from(file_header.size_of_optional_header);
        parser.seek(section_table)?;

        let mut sections = Vec::with_capacity(usize::from(file_header.number_of_sections));
        for _ in 0..file_header.number_of_sections {
            sections.push(Section::read(
                &mut parser,
                optional_header.section_alignment,
                optional_header.file_alignment,
                optional_header.address_of_entry_point,
            )?);
        }

        Ok((dos_header, file_header, optional_header, sections))
    }

    /// Returns the total size of the loaded file in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the file has a length of zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the raw bytes of the image.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data.data()
    }

    /// Returns `len` bytes at file offset `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the file.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.data.data_slice(offset, len)
    }

    /// The DOS header.
    #[must_use]
    pub fn dos_header(&self) -> &DosHeader {
        &self.dos_header
    }

    /// The COFF file header.
    #[must_use]
    pub fn file_header(&self) -> &FileHeader {
        &self.file_header
    }

    /// The optional header.
    #[must_use]
    pub fn optional_header(&self) -> &OptionalHeader {
        &self.optional_header
    }

    /// PE32 or PE32+.
    #[must_use]
    pub fn bitness(&self) -> Bitness {
        self.optional_header.bitness
    }

    /// The preferred load address.
    #[must_use]
    pub fn image_base(&self) -> u64 {
        self.optional_header.image_base
    }

    /// The `Machine` field of the file header.
    #[must_use]
    pub fn machine(&self) -> u16 {
        self.file_header.machine
    }

    /// VA of the entry point, or `None` when `AddressOfEntryPoint` is zero.
    #[must_use]
    pub fn entry_point(&self) -> Option<u64> {
        match self.optional_header.address_of_entry_point {
            0 => None,
            rva => Some(self.image_base().wrapping_add(u64::from(rva))),
        }
    }

    /// The section table in header order.
    #[must_use]
    pub fn sections(&self) -> &[Section] {
        self.translator.sections()
    }

    /// The address translator built from the headers.
    #[must_use]
    pub fn translator(&self) -> &AddressTranslator {
        &self.translator
    }

    /// A data directory slot, or `None` when its RVA is zero.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use pescope::{DataDirectoryType, File};
    ///
    /// let file = File::from_mem(std::fs::read("notepad.exe")?)?;
    /// if let Some(imports) = file.directory(DataDirectoryType::Import) {
    ///     println!("Import directory at RVA 0x{:x}", imports.virtual_address);
    /// }
    /// # Ok::<(), pescope::Error>(())
    /// ```
    #[must_use]
    pub fn directory(&self, kind: DataDirectoryType) -> Option<DataDirectory> {
        let directory = self.optional_header.directory(kind);
        directory.is_present().then_some(directory)
    }

    /// See [`AddressTranslator::rva_to_va`].
    ///
    /// # Errors
    /// Returns [`crate::Error::UnmappedAddress`] outside the mapped image range.
    pub fn rva_to_va(&self, rva: u32) -> Result<u64> {
        self.translator.rva_to_va(rva)
    }

    /// See [`AddressTranslator::va_to_rva`].
    ///
    /// # Errors
    /// Returns [`crate::Error::UnmappedAddress`] outside the mapped image range.
    pub fn va_to_rva(&self, va: u64) -> Result<u32> {
        self.translator.va_to_rva(va)
    }

    /// See [`AddressTranslator::rva_to_offset`].
    ///
    /// # Errors
    /// Returns [`crate::Error::UnmappedAddress`] if no section maps `rva` to file data.
    pub fn rva_to_offset(&self, rva: u32) -> Result<usize> {
        self.translator.rva_to_offset(rva)
    }

    /// See [`AddressTranslator::offset_to_rva`].
    ///
    /// # Errors
    /// Returns [`crate::Error::UnmappedAddress`] if no section's raw data covers `offset`.
    pub fn offset_to_rva(&self, offset: usize) -> Result<u32> {
        self.translator.offset_to_rva(offset)
    }

    /// Whether `va` translates to bytes backed by the file.
    #[must_use]
    pub fn is_mapped(&self, va: u64) -> bool {
        self.translator
            .va_to_offset(va)
            .is_ok_and(|offset| offset < self.len())
    }

    /// Read `len` bytes at `rva`.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnmappedAddress`] if `rva` does not translate, or
    /// [`crate::Error::OutOfBounds`] if the range runs past the file.
    pub fn read_at_rva(&self, rva: u32, len: usize) -> Result<&[u8]> {
        let offset = self.rva_to_offset(rva)?;
        self.data_slice(offset, len)
    }

    /// Read `len` bytes at `va`.
    ///
    /// # Errors
    /// See [`File::read_at_rva`].
    pub fn read_at_va(&self, va: u64, len: usize) -> Result<&[u8]> {
        self.read_at_rva(self.va_to_rva(va)?, len)
    }

    /// A parser positioned at `rva` that runs to the end of the file.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnmappedAddress`] if `rva` does not translate.
    pub fn parser_at_rva(&self, rva: u32) -> Result<Parser<'_>> {
        let offset = self.rva_to_offset(rva)?;
        let mut parser = Parser::new(self.data());
        parser.seek(offset)?;
        Ok(parser)
    }

    /// A parser positioned at `va` that runs to the end of the file.
    ///
    /// # Errors
    /// See [`File::parser_at_rva`].
    pub fn parser_at_va(&self, va: u64) -> Result<Parser<'_>> {
        self.parser_at_rva(self.va_to_rva(va)?)
    }

    /// Read a NUL-terminated string at `rva`.
    ///
    /// # Errors
    /// See [`File::parser_at_rva`].
    pub fn cstring_at_rva(&self, rva: u32) -> Result<String> {
        self.parser_at_rva(rva)?.read_cstring()
    }

    /// Read a NUL-terminated string at `va`.
    ///
    /// # Errors
    /// See [`File::parser_at_va`].
    pub fn cstring_at_va(&self, va: u64) -> Result<String> {
        self.parser_at_va(va)?.read_cstring()
    }
}
