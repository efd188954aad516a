//! Debug directory decoding.
//!
//! The debug directory is an array of 28-byte `IMAGE_DEBUG_DIRECTORY` records. Each names a type
//! and locates its raw data, by RVA when the data is mapped and by file offset otherwise.
//! CodeView records are decoded further into the PDB reference they carry.

use strum::{Display, FromRepr};
use uguid::Guid;

use crate::{file::parser::Parser, file::File, pe::DataDirectoryType, Error, Result};

/// `IMAGE_DEBUG_TYPE_*` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromRepr)]
#[repr(u32)]
#[allow(missing_docs)]
pub enum DebugType {
    Unknown = 0,
    Coff = 1,
    CodeView = 2,
    Fpo = 3,
    Misc = 4,
    Exception = 5,
    Fixup = 6,
    OmapToSrc = 7,
    OmapFromSrc = 8,
    Borland = 9,
    Reserved10 = 10,
    Clsid = 11,
    VcFeature = 12,
    Pogo = 13,
    Iltcg = 14,
    Mpx = 15,
    Repro = 16,
    ExDllCharacteristics = 20,
}

/// `RSDS`, PDB 7.0
pub const CV_SIGNATURE_RSDS: [u8; 4] = *b"RSDS";
/// `NB10`, PDB 2.0
pub const CV_SIGNATURE_NB10: [u8; 4] = *b"NB10";
/// `NB11`, CodeView 5.0
pub const CV_SIGNATURE_NB11: [u8; 4] = *b"NB11";
/// `NB09`, CodeView 4.1
pub const CV_SIGNATURE_NB09: [u8; 4] = *b"NB09";

/// A decoded CodeView record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeView {
    /// `NB10`, a PDB 2.0 reference
    Pdb20 {
        /// Offset field of the CodeView header
        offset: u32,
        /// Timestamp signature matched against the PDB
        signature: u32,
        /// Incremented on each incremental link
        age: u32,
        /// Path of the PDB file
        path: String,
    },
    /// `RSDS`, a PDB 7.0 reference
    Pdb70 {
        /// Identity GUID matched against the PDB
        guid: Guid,
        /// Incremented on each incremental link
        age: u32,
        /// Path of the PDB file
        path: String,
    },
}

impl CodeView {
    /// Decode a CodeView record from its raw data.
    ///
    /// Returns `Ok(None)` for the recognised but undecoded `NB09`/`NB11` layouts.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnknownSubformat`] for any other signature, or
    /// [`crate::Error::OutOfBounds`] if the record is truncated.
    pub fn read(parser: &mut Parser) -> Result<Option<Self>> {
        let signature = parser.read_array::<4>()?;
        match signature {
            CV_SIGNATURE_NB10 => Ok(Some(CodeView::Pdb20 {
                offset: parser.read_le::<u32>()?,
                signature: parser.read_le::<u32>()?,
                age: parser.read_le::<u32>()?,
                path: parser.read_cstring()?,
            })),
            CV_SIGNATURE_RSDS => Ok(Some(CodeView::Pdb70 {
                guid: parser.read_guid()?,
                age: parser.read_le::<u32>()?,
                path: parser.read_cstring()?,
            })),
            CV_SIGNATURE_NB09 | CV_SIGNATURE_NB11 => {
                log::debug!(
                    "CodeView {} record is not decoded",
                    String::from_utf8_lossy(&signature)
                );
                Ok(None)
            }
            other => Err(Error::UnknownSubformat(format!(
                "CodeView signature {:02X?}",
                other
            ))),
        }
    }

    /// Path of the referenced PDB.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            CodeView::Pdb20 { path, .. } | CodeView::Pdb70 { path, .. } => path,
        }
    }
}

/// One `IMAGE_DEBUG_DIRECTORY` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugEntry {
    /// Reserved, zero
    pub characteristics: u32,
    /// Creation time
    pub time_date_stamp: u32,
    /// Format major version
    pub major_version: u16,
    /// Format minor version
    pub minor_version: u16,
    /// Raw `Type`; see [`DebugEntry::debug_type`]
    pub raw_type: u32,
    /// Size of the raw data
    pub size_of_data: u32,
    /// RVA of the raw data, zero when not mapped
    pub address_of_raw_data: u32,
    /// File offset of the raw data
    pub pointer_to_raw_data: u32,
    /// Decoded CodeView record, for CodeView entries with a known signature
    pub codeview: Option<CodeView>,
}

impl DebugEntry {
    /// Size of the on-disk record.
    pub const SIZE: usize = 28;

    /// The type tag, `None` if it is not a known `IMAGE_DEBUG_TYPE_*` value.
    #[must_use]
    pub fn debug_type(&self) -> Option<DebugType> {
        DebugType::from_repr(self.raw_type)
    }
}

/// The decoded debug directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugDirectory {
    /// Entries in directory order
    pub entries: Vec<DebugEntry>,
}

impl DebugDirectory {
    /// Decode the debug directory of `file`.
    ///
    /// Returns `Ok(None)` if the image has no debug directory. Unknown types and CodeView
    /// records with an unknown signature are logged and kept without a decoded record.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnmappedAddress`] if the directory does not translate, or
    /// [`crate::Error::OutOfBounds`] if the record array runs past the file.
    pub fn read(file: &File) -> Result<Option<Self>> {
        let Some(directory) = file.directory(DataDirectoryType::Debug) else {
            return Ok(None);
        };

        let count = directory.size as usize / DebugEntry::SIZE;
        let mut parser = file.parser_at_rva(directory.virtual_address)?;

        let mut entries = Vec::with_capacity(count.min(parser.remaining() / DebugEntry::SIZE));
        for _ in 0..count {
            let mut entry = DebugEntry {
                characteristics: parser.read_le::<u32>()?,
                time_date_stamp: parser.read_le::<u32>()?,
                major_version: parser.read_le::<u16>()?,
                minor_version: parser.read_le::<u16>()?,
                raw_type: parser.read_le::<u32>()?,
                size_of_data: parser.read_le::<u32>()?,
                address_of_raw_data: parser.read_le::<u32>()?,
                pointer_to_raw_data: parser.read_le::<u32>()?,
                codeview: None,
            };

            match entry.debug_type() {
                Some(DebugType::CodeView) => match Self::raw_data(file, &entry)
                    .and_then(|mut data| CodeView::read(&mut data))
                {
                    Ok(codeview) => entry.codeview = codeview,
                    Err(error) => log::debug!("CodeView record not decoded: {error}"),
                },
                Some(_) => {}
                None => log::debug!("unknown debug type {}", entry.raw_type),
            }

            entries.push(entry);
        }

        Ok(Some(DebugDirectory { entries }))
    }

    /// A parser over an entry's raw data, preferring the mapped address.
    fn raw_data<'a>(file: &'a File, entry: &DebugEntry) -> Result<Parser<'a>> {
        let offset = if entry.address_of_raw_data != 0 {
            file.rva_to_offset(entry.address_of_raw_data)?
        } else {
            entry.pointer_to_raw_data as usize
        };

        let data = file.data_slice(offset, entry.size_of_data as usize)?;
        Ok(Parser::new(data))
    }

    /// The first decoded CodeView record.
    #[must_use]
    pub fn codeview(&self) -> Option<&CodeView> {
        self.entries.iter().find_map(|entry| entry.codeview.as_ref())
    }
}
