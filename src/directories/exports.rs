//! Export directory decoding.
//!
//! The export directory holds three parallel arrays: function RVAs indexed by
//! `ordinal - Base`, name RVAs, and a name-to-function index map. Every non-zero function slot
//! yields one [`Export`]; slots without a matching name get a synthesized `Ordinal__XXXX` name.

use crate::{file::File, pe::DataDirectoryType, Result};

/// A single exported function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    /// Biased ordinal, `Base + index`
    pub ordinal: u32,
    /// Exported name, `None` for ordinal-only exports or when the name does not translate
    pub name: Option<String>,
    /// RVA of the exported function
    pub rva: u32,
    /// VA of the exported function
    pub address: u64,
}

impl Export {
    /// The name a symbol database should use: the exported name, or `Ordinal__XXXX`.
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("Ordinal__{:04X}", self.ordinal),
        }
    }
}

/// The decoded export directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTable {
    /// Name of the module as recorded by the linker
    pub dll_name: Option<String>,
    /// Ordinal base
    pub base: u32,
    /// `TimeDateStamp`
    pub time_date_stamp: u32,
    /// Exports in function-slot order
    pub exports: Vec<Export>,
}

impl ExportTable {
    /// Size of `IMAGE_EXPORT_DIRECTORY`.
    pub const SIZE: usize = 40;

    /// Decode the export directory of `file`.
    ///
    /// Returns `Ok(None)` if the image has no export directory.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnmappedAddress`] if the directory does not translate, or
    /// [`crate::Error::Malformed`] if the function, name or ordinal arrays do not translate.
    pub fn read(file: &File) -> Result<Option<Self>> {
        let Some(directory) = file.directory(DataDirectoryType::Export) else {
            return Ok(None);
        };

        let mut parser = file.parser_at_rva(directory.virtual_address)?;
        let _characteristics = parser.read_le::<u32>()?;
        let time_date_stamp = parser.read_le::<u32>()?;
        let _major_version = parser.read_le::<u16>()?;
        let _minor_version = parser.read_le::<u16>()?;
        let name_rva = parser.read_le::<u32>()?;
        let base = parser.read_le::<u32>()?;
        let number_of_functions = parser.read_le::<u32>()?;
        let number_of_names = parser.read_le::<u32>()?;
        let address_of_functions = parser.read_le::<u32>()?;
        let address_of_names = parser.read_le::<u32>()?;
        let address_of_name_ordinals = parser.read_le::<u32>()?;

        let functions = Self::read_array(file, address_of_functions, number_of_functions, 4)
            .map_err(|_| malformed_error!("Corrupted export table - functions array"))?;
        let (names, ordinals) = if number_of_names == 0 {
            (Vec::new(), Vec::new())
        } else {
            let names = Self::read_array(file, address_of_names, number_of_names, 4)
                .map_err(|_| malformed_error!("Corrupted export table - names array"))?;
            let ordinals = Self::read_array(file, address_of_name_ordinals, number_of_names, 2)
                .map_err(|_| malformed_error!("Corrupted export table - ordinals array"))?;
            (names, ordinals)
        };

        let dll_name = if name_rva == 0 {
            None
        } else {
            file.cstring_at_rva(name_rva).ok()
        };

        let mut exports = Vec::new();
        for (index, &function) in functions.iter().enumerate() {
            if function == 0 {
                continue;
            }

            // ordinals are not guaranteed to be sorted
            let name = ordinals
                .iter()
                .position(|&ordinal| ordinal as usize == index)
                .and_then(|slot| names.get(slot))
                .and_then(|&name_rva| file.cstring_at_rva(name_rva as u32).ok());

            #[allow(clippy::cast_possible_truncation)]
            let rva = function as u32;
            exports.push(Export {
                ordinal: base.wrapping_add(index as u32),
                name,
                rva,
                address: file.image_base().wrapping_add(u64::from(rva)),
            });
        }

        Ok(Some(ExportTable {
            dll_name,
            base,
            time_date_stamp,
            exports,
        }))
    }

    /// Read `count` little-endian values of `width` bytes at `rva`.
    fn read_array(file: &File, rva: u32, count: u32, width: usize) -> Result<Vec<u64>> {
        let len = (count as usize)
            .checked_mul(width)
            .ok_or(out_of_bounds_error!())?;
        let mut parser = file.parser_at_rva(rva)?;
        if parser.remaining() < len {
            return Err(out_of_bounds_error!());
        }

        let mut values = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let value = match width {
                2 => u64::from(parser.read_le::<u16>()?),
                _ => u64::from(parser.read_le::<u32>()?),
            };
            values.push(value);
        }

        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test::{ImageBuilder, SCN_RDATA},
        Error,
    };

    /// Export directory at `rdata`, arrays at +0x40/+0x60/+0x80, strings from +0x100.
    fn export_image(functions: &[u32], names: &[(&str, u16)], base: u32) -> Vec<u8> {
        let mut builder = ImageBuilder::pe32();
        builder.add_section(".text", 0x1000, crate::test::SCN_CODE);
        let rdata = builder.add_section(".rdata", 0x400, SCN_RDATA);

        builder
            .directory(DataDirectoryType::Export, rdata, ExportTable::SIZE as u32)
            .write_u32(rdata + 12, rdata + 0x100)
            .write_u32(rdata + 16, base)
            .write_u32(rdata + 20, functions.len() as u32)
            .write_u32(rdata + 24, names.len() as u32)
            .write_u32(rdata + 28, rdata + 0x40)
            .write_u32(rdata + 32, rdata + 0x60)
            .write_u32(rdata + 36, rdata + 0x80)
            .write_cstring(rdata + 0x100, "sample.dll");

        for (index, &function) in functions.iter().enumerate() {
            builder.write_u32(rdata + 0x40 + 4 * index as u32, function);
        }

        let mut string_rva = rdata + 0x120;
        for (index, &(name, ordinal)) in names.iter().enumerate() {
            builder
                .write_u32(rdata + 0x60 + 4 * index as u32, string_rva)
                .write_u16(rdata + 0x80 + 2 * index as u32, ordinal)
                .write_cstring(string_rva, name);
            string_rva += name.len() as u32 + 1;
        }

        builder.build()
    }

    #[test]
    fn named_and_ordinal_only() {
        let data = export_image(&[0x1010, 0, 0x1020], &[("Foo", 2)], 1);
        let file = File::from_mem(data).unwrap();
        let table = ExportTable::read(&file).unwrap().unwrap();

        assert_eq!(table.dll_name.as_deref(), Some("sample.dll"));
        assert_eq!(table.base, 1);
        assert_eq!(table.exports.len(), 2);

        assert_eq!(table.exports[0].ordinal, 1);
        assert_eq!(table.exports[0].name, None);
        assert_eq!(table.exports[0].display_name(), "Ordinal__0001");
        assert_eq!(table.exports[0].address, 0x0040_1010);

        assert_eq!(table.exports[1].ordinal, 3);
        assert_eq!(table.exports[1].display_name(), "Foo");
        assert_eq!(table.exports[1].rva, 0x1020);
    }

    #[test]
    fn unsorted_ordinals() {
        let data = export_image(&[0x1010, 0x1020], &[("Second", 1), ("First", 0)], 0x10);
        let file = File::from_mem(data).unwrap();
        let table = ExportTable::read(&file).unwrap().unwrap();

        let names: Vec<String> = table.exports.iter().map(Export::display_name).collect();
        assert_eq!(names, ["First", "Second"]);
        assert_eq!(table.exports[1].ordinal, 0x11);
    }

    #[test]
    fn corrupted_arrays() {
        let mut builder = ImageBuilder::pe32();
        let rdata = builder.add_section(".rdata", 0x200, SCN_RDATA);
        builder
            .directory(DataDirectoryType::Export, rdata, ExportTable::SIZE as u32)
            .write_u32(rdata + 20, 1)
            .write_u32(rdata + 28, 0x00F0_0000);
        let file = File::from_mem(builder.build()).unwrap();

        assert!(matches!(
            ExportTable::read(&file),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn absent() {
        let mut builder = ImageBuilder::pe32();
        builder.add_section(".text", 0x10, crate::test::SCN_CODE);
        let file = File::from_mem(builder.build()).unwrap();
        assert!(ExportTable::read(&file).unwrap().is_none());
    }
}
