//! CLR runtime (Cor20) header decoding.
//!
//! Only the fixed 72-byte header is decoded. Its presence marks a managed image, which selects
//! the CIL processor profile and a .NET toolchain classification; the metadata it points at is
//! not parsed.
//!
//! # Reference
//! - [ECMA-335 II.25.3.3](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{
    file::File,
    pe::{DataDirectory, DataDirectoryType},
    Result,
};

/// The `IMAGE_COR20_HEADER` stored in the CLR runtime header data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClrHeader {
    /// Size of header in bytes
    pub cb: u32,
    /// The minimum version of runtime required to run this program
    pub major_runtime_version: u16,
    /// The minor portion of the version
    pub minor_runtime_version: u16,
    /// Location of the metadata root
    pub metadata: DataDirectory,
    /// `COMIMAGE_FLAGS_*`
    pub flags: u32,
    /// Token for the `MethodDef` or File of the entry point for the image
    pub entry_point_token: u32,
    /// Implementation specific resources
    pub resources: DataDirectory,
    /// Hash data used for binding and versioning
    pub strong_name_signature: DataDirectory,
    /// Always 0
    pub code_manager_table: DataDirectory,
    /// Array of locations holding arrays of function pointers
    pub vtable_fixups: DataDirectory,
    /// Always 0
    pub export_address_table_jumps: DataDirectory,
    /// Always 0 outside precompiled images
    pub managed_native_header: DataDirectory,
}

impl ClrHeader {
    /// Size of the on-disk header.
    pub const SIZE: usize = 72;

    /// `COMIMAGE_FLAGS_ILONLY`
    pub const FLAG_IL_ONLY: u32 = 0x0000_0001;

    /// Decode the CLR header of `file`.
    ///
    /// Returns `Ok(None)` if the image has no CLR runtime header directory.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnmappedAddress`] if the directory does not translate, or
    /// [`crate::Error::Malformed`] if the header is shorter than 72 bytes.
    pub fn read(file: &File) -> Result<Option<Self>> {
        let Some(directory) = file.directory(DataDirectoryType::ClrRuntimeHeader) else {
            return Ok(None);
        };

        let mut parser = file.parser_at_rva(directory.virtual_address)?;
        if parser.remaining() < Self::SIZE {
            return Err(malformed_error!("CLR header is truncated"));
        }

        let cb = parser.read_le::<u32>()?;
        if (cb as usize) < Self::SIZE {
            return Err(malformed_error!(
                "Invalid CLR header size: expected 72, got {}",
                cb
            ));
        }

        let major_runtime_version = parser.read_le::<u16>()?;
        let minor_runtime_version = parser.read_le::<u16>()?;

        let metadata = DataDirectory::read(&mut parser)?;
        let flags = parser.read_le::<u32>()?;
        let entry_point_token = parser.read_le::<u32>()?;

        Ok(Some(ClrHeader {
            cb,
            major_runtime_version,
            minor_runtime_version,
            metadata,
            flags,
            entry_point_token,
            resources: DataDirectory::read(&mut parser)?,
            strong_name_signature: DataDirectory::read(&mut parser)?,
            code_manager_table: DataDirectory::read(&mut parser)?,
            vtable_fixups: DataDirectory::read(&mut parser)?,
            export_address_table_jumps: DataDirectory::read(&mut parser)?,
            managed_native_header: DataDirectory::read(&mut parser)?,
        }))
    }

    /// Runtime header version as `(major, minor)`.
    #[must_use]
    pub fn runtime_version(&self) -> (u16, u16) {
        (self.major_runtime_version, self.minor_runtime_version)
    }
}
