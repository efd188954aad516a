//! Import directory decoding.
//!
//! The import directory is an array of 20-byte descriptors terminated by one whose thunk fields
//! are both zero. Each descriptor names a module and points at two parallel thunk arrays: the
//! lookup table (`OriginalFirstThunk`) and the import address table (`FirstThunk`). Names are
//! read from the lookup table when present; the resolved slot is always the matching cell of
//! the IAT.

use crate::{
    file::File,
    pe::{Bitness, DataDirectoryType},
    Result,
};

/// How an import is identified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportKind {
    /// Import by ordinal, flag bit cleared
    Ordinal(u64),
    /// Import by name through a hint/name record
    Name {
        /// Index hint into the exporter's name table
        hint: u16,
        /// Imported symbol name
        name: String,
    },
}

/// A single imported symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Lowercased name of the owning module
    pub module: String,
    /// Ordinal or name
    pub kind: ImportKind,
    /// RVA of the IAT cell
    pub iat_rva: u32,
    /// VA of the IAT cell
    pub iat_address: u64,
}

impl Import {
    /// `module.name` or `module.ordinal_<n>`.
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.kind {
            ImportKind::Ordinal(ordinal) => format!("{}.ordinal_{}", self.module, ordinal),
            ImportKind::Name { name, .. } => format!("{}.{}", self.module, name),
        }
    }

    /// The imported symbol name without the module prefix, if imported by name.
    #[must_use]
    pub fn symbol(&self) -> Option<&str> {
        match &self.kind {
            ImportKind::Name { name, .. } => Some(name),
            ImportKind::Ordinal(_) => None,
        }
    }
}

/// One import descriptor and the symbols it resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportModule {
    /// Lowercased module name
    pub name: String,
    /// `OriginalFirstThunk`
    pub original_first_thunk: u32,
    /// `FirstThunk`
    pub first_thunk: u32,
    /// Imports in thunk order
    pub imports: Vec<Import>,
}

/// The decoded import directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportTable {
    /// Modules in descriptor order
    pub modules: Vec<ImportModule>,
}

impl ImportTable {
    /// Size of `IMAGE_IMPORT_DESCRIPTOR`.
    pub const DESCRIPTOR_SIZE: u32 = 20;

    /// Decode the import directory of `file`.
    ///
    /// Returns `Ok(None)` if the image has no import directory. Descriptors whose module name
    /// does not translate are skipped; a thunk array that runs off the image ends that module.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnmappedAddress`] if the directory itself does not translate.
    pub fn read(file: &File) -> Result<Option<Self>> {
        let Some(directory) = file.directory(DataDirectoryType::Import) else {
            return Ok(None);
        };

        // fail early so a bogus directory RVA is reported rather than read as empty
        file.rva_to_offset(directory.virtual_address)?;

        let mut modules = Vec::new();
        let mut descriptor_rva = directory.virtual_address;
        loop {
            let Ok((original_first_thunk, name_rva, first_thunk)) =
                Self::read_descriptor(file, descriptor_rva)
            else {
                break;
            };

            if original_first_thunk == 0 && first_thunk == 0 {
                break;
            }

            match file.cstring_at_rva(name_rva) {
                Ok(name) => {
                    let name = name.to_lowercase();
                    let imports =
                        Self::read_thunks(file, &name, original_first_thunk, first_thunk);
                    modules.push(ImportModule {
                        name,
                        original_first_thunk,
                        first_thunk,
                        imports,
                    });
                }
                Err(error) => {
                    log::debug!("skipping import descriptor at RVA 0x{descriptor_rva:X}: {error}");
                }
            }

            descriptor_rva = match descriptor_rva.checked_add(Self::DESCRIPTOR_SIZE) {
                Some(next) => next,
                None => break,
            };
        }

        Ok(Some(ImportTable { modules }))
    }

    /// Read `(OriginalFirstThunk, Name, FirstThunk)` of the descriptor at `rva`.
    fn read_descriptor(file: &File, rva: u32) -> Result<(u32, u32, u32)> {
        let mut parser = file.parser_at_rva(rva)?;
        let original_first_thunk = parser.read_le::<u32>()?;
        let _time_date_stamp = parser.read_le::<u32>()?;
        let _forwarder_chain = parser.read_le::<u32>()?;
        let name_rva = parser.read_le::<u32>()?;
        let first_thunk = parser.read_le::<u32>()?;

        Ok((original_first_thunk, name_rva, first_thunk))
    }

    fn read_thunks(
        file: &File,
        module: &str,
        original_first_thunk: u32,
        first_thunk: u32,
    ) -> Vec<Import> {
        let bitness = file.bitness();
        let pointer_size = bitness.pointer_size() as u32;
        let lookup_rva = if original_first_thunk != 0 {
            original_first_thunk
        } else {
            first_thunk
        };
        let iat_base = if first_thunk != 0 {
            first_thunk
        } else {
            original_first_thunk
        };

        let mut parser = match file.parser_at_rva(lookup_rva) {
            Ok(parser) => parser,
            Err(error) => {
                log::debug!("import thunks of {module} do not translate: {error}");
                return Vec::new();
            }
        };

        let mut imports = Vec::new();
        for index in 0_u32.. {
            let thunk = match parser.read_pointer(bitness) {
                Ok(0) => break,
                Ok(thunk) => thunk,
                Err(error) => {
                    log::debug!("import thunks of {module} run past the image: {error}");
                    break;
                }
            };

            let Some(iat_rva) = index
                .checked_mul(pointer_size)
                .and_then(|delta| iat_base.checked_add(delta))
            else {
                break;
            };

            let kind = if thunk & bitness.ordinal_flag() != 0 {
                ImportKind::Ordinal(thunk & !bitness.ordinal_flag())
            } else {
                match Self::read_hint_name(file, thunk, bitness) {
                    Ok(kind) => kind,
                    Err(error) => {
                        log::debug!("unresolved import {index} of {module}: {error}");
                        continue;
                    }
                }
            };

            let import = Import {
                module: module.to_string(),
                kind,
                iat_rva,
                iat_address: file.image_base().wrapping_add(u64::from(iat_rva)),
            };
            log::trace!("import {} at 0x{:X}", import.full_name(), import.iat_address);
            imports.push(import);
        }

        imports
    }

    fn read_hint_name(file: &File, thunk: u64, bitness: Bitness) -> Result<ImportKind> {
        let rva = match bitness {
            // PE32+ name thunks hold a 31-bit RVA
            Bitness::Pe32Plus => u32::try_from(thunk & 0x7FFF_FFFF),
            Bitness::Pe32 => u32::try_from(thunk),
        }
        .map_err(|_| crate::Error::UnmappedAddress(thunk))?;

        let mut parser = file.parser_at_rva(rva)?;
        let hint = parser.read_le::<u16>()?;
        let name = parser.read_cstring()?;

        Ok(ImportKind::Name { hint, name })
    }

    /// All imports across every module, in descriptor then thunk order.
    pub fn imports(&self) -> impl Iterator<Item = &Import> {
        self.modules.iter().flat_map(|module| module.imports.iter())
    }

    /// Find an import by module (case-insensitive) and symbol name.
    #[must_use]
    pub fn find(&self, module: &str, symbol: &str) -> Option<&Import> {
        let module = module.to_lowercase();
        self.modules
            .iter()
            .filter(|candidate| candidate.name == module)
            .flat_map(|candidate| candidate.imports.iter())
            .find(|import| import.symbol() == Some(symbol))
    }
}
