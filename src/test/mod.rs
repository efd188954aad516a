//! Synthetic image construction for unit tests.
//!
//! [`ImageBuilder`] lays out a minimal but well-formed PE32 or PE32+ image: a 0x400 byte header
//! block (DOS header, NT headers, section table), followed by each section's raw data at a file
//! alignment of 0x200. Sections are mapped at a section alignment of 0x1000 starting at RVA
//! 0x1000, in the order they are added. Tests write their structures at RVAs and point data
//! directories at them.

use crate::pe::{
    aligned,
    headers::{MACHINE_AMD64, MACHINE_I386, OPTIONAL_MAGIC_PE32, OPTIONAL_MAGIC_PE32_PLUS},
    Bitness, DataDirectory, DataDirectoryType,
};

pub(crate) const FILE_ALIGNMENT: u32 = 0x200;
pub(crate) const SECTION_ALIGNMENT: u32 = 0x1000;
pub(crate) const HEADERS_SIZE: u32 = 0x400;
pub(crate) const E_LFANEW: u32 = 0x40;

/// `IMAGE_SCN_CNT_CODE | IMAGE_SCN_MEM_EXECUTE | IMAGE_SCN_MEM_READ`
pub(crate) const SCN_CODE: u32 = 0x6000_0020;
/// `IMAGE_SCN_CNT_INITIALIZED_DATA | IMAGE_SCN_MEM_READ`
pub(crate) const SCN_RDATA: u32 = 0x4000_0040;
/// `IMAGE_SCN_CNT_INITIALIZED_DATA | IMAGE_SCN_MEM_READ | IMAGE_SCN_MEM_WRITE`
pub(crate) const SCN_DATA: u32 = 0xC000_0040;

struct SectionSpec {
    name: String,
    virtual_address: u32,
    virtual_size: u32,
    characteristics: u32,
    data: Vec<u8>,
}

pub(crate) struct ImageBuilder {
    bitness: Bitness,
    machine: u16,
    image_base: u64,
    entry_point: u32,
    dll: bool,
    sections: Vec<SectionSpec>,
    directories: [DataDirectory; 16],
}

impl ImageBuilder {
    pub(crate) fn new(bitness: Bitness) -> Self {
        let (machine, image_base) = match bitness {
            Bitness::Pe32 => (MACHINE_I386, 0x0040_0000),
            Bitness::Pe32Plus => (MACHINE_AMD64, 0x1_4000_0000),
        };

        ImageBuilder {
            bitness,
            machine,
            image_base,
            entry_point: 0,
            dll: false,
            sections: Vec::new(),
            directories: [DataDirectory::default(); 16],
        }
    }

    pub(crate) fn pe32() -> Self {
        Self::new(Bitness::Pe32)
    }

    pub(crate) fn pe32_plus() -> Self {
        Self::new(Bitness::Pe32Plus)
    }

    pub(crate) fn machine(&mut self, machine: u16) -> &mut Self {
        self.machine = machine;
        self
    }

    pub(crate) fn entry_point(&mut self, rva: u32) -> &mut Self {
        self.entry_point = rva;
        self
    }

    pub(crate) fn dll(&mut self) -> &mut Self {
        self.dll = true;
        self
    }

    pub(crate) fn image_base(&self) -> u64 {
        self.image_base
    }

    pub(crate) fn va(&self, rva: u32) -> u64 {
        self.image_base + u64::from(rva)
    }

    /// Append a section and return its RVA. Its raw data is zero-filled and covers the whole
    /// virtual size rounded to the file alignment.
    pub(crate) fn add_section(&mut self, name: &str, virtual_size: u32, characteristics: u32) -> u32 {
        let virtual_address = self.sections.last().map_or(SECTION_ALIGNMENT, |last| {
            last.virtual_address + aligned(last.virtual_size, SECTION_ALIGNMENT)
        });

        self.sections.push(SectionSpec {
            name: name.to_string(),
            virtual_address,
            virtual_size,
            characteristics,
            data: vec![0_u8; aligned(virtual_size, FILE_ALIGNMENT) as usize],
        });

        virtual_address
    }

    pub(crate) fn directory(&mut self, kind: DataDirectoryType, rva: u32, size: u32) -> &mut Self {
        self.directories[kind as usize] = DataDirectory {
            virtual_address: rva,
            size,
        };
        self
    }

    /// Copy `bytes` into the section holding `rva`.
    pub(crate) fn write(&mut self, rva: u32, bytes: &[u8]) -> &mut Self {
        let section = self
            .sections
            .iter_mut()
            .find(|s| rva >= s.virtual_address && rva < s.virtual_address + s.virtual_size)
            .expect("rva is not inside any section");
        let start = (rva - section.virtual_address) as usize;
        section.data[start..start + bytes.len()].copy_from_slice(bytes);
        self
    }

    pub(crate) fn write_u16(&mut self, rva: u32, value: u16) -> &mut Self {
        self.write(rva, &value.to_le_bytes())
    }

    pub(crate) fn write_u32(&mut self, rva: u32, value: u32) -> &mut Self {
        self.write(rva, &value.to_le_bytes())
    }

    pub(crate) fn write_u64(&mut self, rva: u32, value: u64) -> &mut Self {
        self.write(rva, &value.to_le_bytes())
    }

    /// Write a pointer-sized value for the image's bitness.
    pub(crate) fn write_pointer(&mut self, rva: u32, value: u64) -> &mut Self {
        match self.bitness {
            Bitness::Pe32 => self.write_u32(rva, value as u32),
            Bitness::Pe32Plus => self.write_u64(rva, value),
        }
    }

    /// Write a NUL-terminated string.
    pub(crate) fn write_cstring(&mut self, rva: u32, text: &str) -> &mut Self {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        self.write(rva, &bytes)
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        let optional_size: u16 = match self.bitness {
            Bitness::Pe32 => 96 + 16 * 8,
            Bitness::Pe32Plus => 112 + 16 * 8,
        };
        let size_of_image = self.sections.last().map_or(SECTION_ALIGNMENT, |last| {
            last.virtual_address + aligned(last.virtual_size, SECTION_ALIGNMENT)
        });

        let mut out = vec![0_u8; HEADERS_SIZE as usize];
        let put = |out: &mut Vec<u8>, offset: usize, bytes: &[u8]| {
            out[offset..offset + bytes.len()].copy_from_slice(bytes);
        };

        put(&mut out, 0, b"MZ");
        put(&mut out, 0x3C, &E_LFANEW.to_le_bytes());

        let mut nt = Vec::new();
        nt.extend_from_slice(b"PE\0\0");
        nt.extend_from_slice(&self.machine.to_le_bytes());
        nt.extend_from_slice(&(self.sections.len() as u16).to_le_bytes());
        nt.extend_from_slice(&0x5E00_0000_u32.to_le_bytes());
        nt.extend_from_slice(&[0_u8; 8]);
        nt.extend_from_slice(&optional_size.to_le_bytes());
        let characteristics: u16 = if self.dll { 0x2102 } else { 0x0102 };
        nt.extend_from_slice(&characteristics.to_le_bytes());

        let pointer = |nt: &mut Vec<u8>, value: u64| match self.bitness {
            Bitness::Pe32 => nt.extend_from_slice(&(value as u32).to_le_bytes()),
            Bitness::Pe32Plus => nt.extend_from_slice(&value.to_le_bytes()),
        };

        let magic = match self.bitness {
            Bitness::Pe32 => OPTIONAL_MAGIC_PE32,
            Bitness::Pe32Plus => OPTIONAL_MAGIC_PE32_PLUS,
        };
        nt.extend_from_slice(&magic.to_le_bytes());
        nt.extend_from_slice(&[14, 0]);
        nt.extend_from_slice(&[0_u8; 12]);
        nt.extend_from_slice(&self.entry_point.to_le_bytes());
        nt.extend_from_slice(&SECTION_ALIGNMENT.to_le_bytes());
        if self.bitness == Bitness::Pe32 {
            nt.extend_from_slice(&0_u32.to_le_bytes());
        }
        pointer(&mut nt, self.image_base);
        nt.extend_from_slice(&SECTION_ALIGNMENT.to_le_bytes());
        nt.extend_from_slice(&FILE_ALIGNMENT.to_le_bytes());
        nt.extend_from_slice(&[6, 0, 0, 0, 0, 0, 0, 0, 6, 0, 0, 0]);
        nt.extend_from_slice(&0_u32.to_le_bytes());
        nt.extend_from_slice(&size_of_image.to_le_bytes());
        nt.extend_from_slice(&HEADERS_SIZE.to_le_bytes());
        nt.extend_from_slice(&0_u32.to_le_bytes());
        nt.extend_from_slice(&2_u16.to_le_bytes());
        nt.extend_from_slice(&0_u16.to_le_bytes());
        for _ in 0..4 {
            pointer(&mut nt, 0x10_0000);
        }
        nt.extend_from_slice(&0_u32.to_le_bytes());
        nt.extend_from_slice(&16_u32.to_le_bytes());
        for directory in &self.directories {
            nt.extend_from_slice(&directory.virtual_address.to_le_bytes());
            nt.extend_from_slice(&directory.size.to_le_bytes());
        }

        let mut raw_offset = HEADERS_SIZE;
        for section in &self.sections {
            let mut name = [0_u8; 8];
            let len = section.name.len().min(8);
            name[..len].copy_from_slice(&section.name.as_bytes()[..len]);
            nt.extend_from_slice(&name);
            nt.extend_from_slice(&section.virtual_size.to_le_bytes());
            nt.extend_from_slice(&section.virtual_address.to_le_bytes());
            nt.extend_from_slice(&(section.data.len() as u32).to_le_bytes());
            nt.extend_from_slice(&raw_offset.to_le_bytes());
            nt.extend_from_slice(&[0_u8; 12]);
            nt.extend_from_slice(&section.characteristics.to_le_bytes());
            raw_offset += section.data.len() as u32;
        }

        put(&mut out, E_LFANEW as usize, &nt);

        for section in &self.sections {
            out.extend_from_slice(&section.data);
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_are_laid_out_consecutively() {
        let mut builder = ImageBuilder::pe32();
        let text = builder.add_section(".text", 0x10, SCN_CODE);
        let data = builder.add_section(".data", 0x1800, SCN_DATA);
        let rsrc = builder.add_section(".rsrc", 0x10, SCN_RDATA);

        assert_eq!(text, 0x1000);
        assert_eq!(data, 0x2000);
        assert_eq!(rsrc, 0x4000);

        builder.write_u32(data + 0x1700, 0xDEAD_BEEF);
        let image = builder.build();
        assert_eq!(image.len(), 0x400 + 0x200 + 0x1800 + 0x200);
        assert_eq!(&image[0x600 + 0x1700..0x600 + 0x1704], &0xDEAD_BEEF_u32.to_le_bytes());
    }
}
