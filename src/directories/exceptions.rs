//! Exception (`.pdata`) directory decoding.
//!
//! The directory is a packed array of 12-byte `RUNTIME_FUNCTION` entries. An entry whose unwind
//! info address is odd is an indirect/chained record; otherwise the first byte of its
//! `UNWIND_INFO` carries the unwind flags in its top five bits. Entries without
//! `UNW_FLAG_CHAININFO` start a function.

use crate::{file::File, pe::DataDirectoryType, Result};

/// `UNW_FLAG_EHANDLER`
pub const UNW_FLAG_EHANDLER: u8 = 0x1;
/// `UNW_FLAG_UHANDLER`
pub const UNW_FLAG_UHANDLER: u8 = 0x2;
/// `UNW_FLAG_CHAININFO`
pub const UNW_FLAG_CHAININFO: u8 = 0x4;

/// Role of a runtime function entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnwindKind {
    /// Unwind address has its low bit set; the entry refers to another entry
    Indirect,
    /// Unwind info carries `UNW_FLAG_CHAININFO`; the entry continues another function
    Chained,
    /// Function root
    Root,
    /// The unwind info address does not translate
    Unresolved,
}

/// One `RUNTIME_FUNCTION` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeFunction {
    /// RVA of the first instruction
    pub begin_address: u32,
    /// RVA past the last instruction
    pub end_address: u32,
    /// RVA of the `UNWIND_INFO`, low bit tags indirect entries
    pub unwind_info_address: u32,
    /// Unwind flags, when the unwind info was decoded
    pub unwind_flags: Option<u8>,
    /// Role derived from the address tag and flags
    pub kind: UnwindKind,
}

impl RuntimeFunction {
    /// Size of `IMAGE_RUNTIME_FUNCTION_ENTRY`.
    pub const SIZE: usize = 12;
}

/// The decoded exception directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExceptionTable {
    /// Entries in directory order
    pub functions: Vec<RuntimeFunction>,
}

impl ExceptionTable {
    /// Decode the exception directory of `file`.
    ///
    /// Returns `Ok(None)` if the image has no exception directory.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnmappedAddress`] if the directory does not translate, or
    /// [`crate::Error::OutOfBounds`] if the entry array runs past the file.
    pub fn read(file: &File) -> Result<Option<Self>> {
        let Some(directory) = file.directory(DataDirectoryType::Exception) else {
            return Ok(None);
        };

        let count = directory.size as usize / RuntimeFunction::SIZE;
        let mut parser = file.parser_at_rva(directory.virtual_address)?;

        let mut functions = Vec::with_capacity(count.min(parser.remaining() / RuntimeFunction::SIZE));
        for _ in 0..count {
            let begin_address = parser.read_le::<u32>()?;
            let end_address = parser.read_le::<u32>()?;
            let unwind_info_address = parser.read_le::<u32>()?;

            let (unwind_flags, kind) = if unwind_info_address & 1 != 0 {
                (None, UnwindKind::Indirect)
            } else {
                match file.read_at_rva(unwind_info_address, 1) {
                    Ok(header) => {
                        let flags = header[0] >> 3;
                        if flags & UNW_FLAG_CHAININFO != 0 {
                            (Some(flags), UnwindKind::Chained)
                        } else {
                            (Some(flags), UnwindKind::Root)
                        }
                    }
                    Err(_) => (None, UnwindKind::Unresolved),
                }
            };

            functions.push(RuntimeFunction {
                begin_address,
                end_address,
                unwind_info_address,
                unwind_flags,
                kind,
            });
        }

        Ok(Some(ExceptionTable { functions }))
    }

    /// Begin RVAs of every function root, in directory order.
    pub fn roots(&self) -> impl Iterator<Item = u32> + '_ {
        self.functions
            .iter()
            .filter(|function| function.kind == UnwindKind::Root)
            .map(|function| function.begin_address)
    }
}
