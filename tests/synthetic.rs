//! End-to-end loading of synthetic images.
//!
//! The images are assembled in memory: a 0x400 byte header block followed by one 0x1000 byte
//! section per entry of `sections`, mapped at RVA `0x1000 * (index + 1)`.

use pescope::{
    prelude::*,
    Error,
};

const HEADERS: usize = 0x400;
const PAGE: usize = 0x1000;

struct Image {
    pe32_plus: bool,
    machine: u16,
    entry_point: u32,
    directories: [(u32, u32); 16],
    sections: Vec<(&'static str, u32, Vec<u8>)>,
}

impl Image {
    fn new(pe32_plus: bool) -> Self {
        Image {
            pe32_plus,
            machine: if pe32_plus { 0x8664 } else { 0x014C },
            entry_point: 0,
            directories: [(0, 0); 16],
            sections: Vec::new(),
        }
    }

    fn image_base(&self) -> u64 {
        if self.pe32_plus {
            0x1_4000_0000
        } else {
            0x0040_0000
        }
    }

    /// Append a section and return its RVA.
    fn section(&mut self, name: &'static str, characteristics: u32) -> u32 {
        self.sections.push((name, characteristics, vec![0; PAGE]));
        (PAGE * self.sections.len()) as u32
    }

    fn put(&mut self, rva: u32, bytes: &[u8]) -> &mut Self {
        let index = rva as usize / PAGE - 1;
        let start = rva as usize % PAGE;
        self.sections[index].2[start..start + bytes.len()].copy_from_slice(bytes);
        self
    }

    fn put_u16(&mut self, rva: u32, value: u16) -> &mut Self {
        self.put(rva, &value.to_le_bytes())
    }

    fn put_u32(&mut self, rva: u32, value: u32) -> &mut Self {
        self.put(rva, &value.to_le_bytes())
    }

    fn put_str(&mut self, rva: u32, text: &str) -> &mut Self {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        self.put(rva, &bytes)
    }

    fn build(&self) -> Vec<u8> {
        let mut nt = Vec::new();
        nt.extend_from_slice(b"PE\0\0");
        nt.extend_from_slice(&self.machine.to_le_bytes());
        nt.extend_from_slice(&(self.sections.len() as u16).to_le_bytes());
        nt.extend_from_slice(&[0; 12]);
        let optional_size: u16 = if self.pe32_plus { 240 } else { 224 };
        nt.extend_from_slice(&optional_size.to_le_bytes());
        nt.extend_from_slice(&0x0102_u16.to_le_bytes());

        let pointer = |nt: &mut Vec<u8>, value: u64| {
            if self.pe32_plus {
                nt.extend_from_slice(&value.to_le_bytes());
            } else {
                nt.extend_from_slice(&(value as u32).to_le_bytes());
            }
        };

        let magic: u16 = if self.pe32_plus { 0x20B } else { 0x10B };
        nt.extend_from_slice(&magic.to_le_bytes());
        nt.extend_from_slice(&[14, 0]);
        nt.extend_from_slice(&[0; 12]);
        nt.extend_from_slice(&self.entry_point.to_le_bytes());
        nt.extend_from_slice(&(PAGE as u32).to_le_bytes());
        if !self.pe32_plus {
            nt.extend_from_slice(&0_u32.to_le_bytes());
        }
        pointer(&mut nt, self.image_base());
        nt.extend_from_slice(&(PAGE as u32).to_le_bytes());
        nt.extend_from_slice(&0x200_u32.to_le_bytes());
        nt.extend_from_slice(&[6, 0, 0, 0, 0, 0, 0, 0, 6, 0, 0, 0, 0, 0, 0, 0]);
        let size_of_image = (PAGE * (self.sections.len() + 1)) as u32;
        nt.extend_from_slice(&size_of_image.to_le_bytes());
        nt.extend_from_slice(&(HEADERS as u32).to_le_bytes());
        nt.extend_from_slice(&[0, 0, 0, 0, 2, 0, 0, 0]);
        for _ in 0..4 {
            pointer(&mut nt, 0x10_0000);
        }
        nt.extend_from_slice(&0_u32.to_le_bytes());
        nt.extend_from_slice(&16_u32.to_le_bytes());
        for (rva, size) in self.directories {
            nt.extend_from_slice(&rva.to_le_bytes());
            nt.extend_from_slice(&size.to_le_bytes());
        }

        for (index, (name, characteristics, data)) in self.sections.iter().enumerate() {
            let mut raw_name = [0_u8; 8];
            raw_name[..name.len()].copy_from_slice(name.as_bytes());
            nt.extend_from_slice(&raw_name);
            nt.extend_from_slice(&(PAGE as u32).to_le_bytes());
            nt.extend_from_slice(&((PAGE * (index + 1)) as u32).to_le_bytes());
            nt.extend_from_slice(&(data.len() as u32).to_le_bytes());
            nt.extend_from_slice(&((HEADERS + PAGE * index) as u32).to_le_bytes());
            nt.extend_from_slice(&[0; 12]);
            nt.extend_from_slice(&characteristics.to_le_bytes());
        }

        let mut out = vec![0_u8; HEADERS];
        out[..2].copy_from_slice(b"MZ");
        out[0x3C..0x40].copy_from_slice(&0x40_u32.to_le_bytes());
        out[0x40..0x40 + nt.len()].copy_from_slice(&nt);
        for (_, _, data) in &self.sections {
            out.extend_from_slice(data);
        }
        out
    }
}

/// `IMAGE_SCN_MEM_READ` only: no code or execute bit
const READ_ONLY: u32 = 0x4000_0000;
const RDATA: u32 = 0x4000_0040;

#[test]
fn pe32_plus_export_round_trip() {
    let mut image = Image::new(true);
    let text = image.section(".text", READ_ONLY);
    let rdata = image.section(".rdata", RDATA);
    image.entry_point = text + 0x20;
    image.directories[DataDirectoryType::Export as usize] = (rdata, 40);
    image
        .put_u32(rdata + 12, rdata + 0x100)
        .put_u32(rdata + 16, 1)
        .put_u32(rdata + 20, 1)
        .put_u32(rdata + 24, 1)
        .put_u32(rdata + 28, rdata + 0x40)
        .put_u32(rdata + 32, rdata + 0x60)
        .put_u32(rdata + 36, rdata + 0x80)
        .put_u32(rdata + 0x40, text + 0x10)
        .put_u32(rdata + 0x60, rdata + 0x110)
        .put_u16(rdata + 0x80, 0)
        .put_str(rdata + 0x100, "round.dll")
        .put_str(rdata + 0x110, "Foo");

    let object = PeObject::from_mem(image.build()).unwrap();
    let file = object.file();

    assert_eq!(file.bitness(), Bitness::Pe32Plus);
    assert_eq!(file.image_base(), 0x1_4000_0000);
    assert_eq!(file.rva_to_va(0x1234).unwrap(), 0x1_4000_1234);

    let text_section = &file.sections()[0];
    assert!(text_section.access.contains(SectionAccess::EXECUTE));
    assert!(!file.sections()[1].access.contains(SectionAccess::EXECUTE));

    let exports = object.exports().unwrap();
    assert_eq!(exports.dll_name.as_deref(), Some("round.dll"));
    assert_eq!(exports.exports.len(), 1);
    assert_eq!(exports.exports[0].name.as_deref(), Some("Foo"));
    assert_eq!(exports.exports[0].ordinal, 1);

    let recorder = object.recorder().unwrap();
    let foo = 0x1_4000_0000 + u64::from(text + 0x10);
    assert_eq!(recorder.name(foo), Some("Foo"));
    assert_eq!(recorder.symbol(foo).unwrap().kind, SymbolKind::Export);
    assert!(recorder.is_function(0x1_4000_0000 + u64::from(text + 0x20)));
    assert_eq!(object.processor(), Some(Processor::X86_64));
}

#[test]
fn pe32_imports_classify_and_name() {
    let mut image = Image::new(false);
    let text = image.section(".text", 0x6000_0020);
    let idata = image.section(".idata", RDATA);
    image.entry_point = text;
    image.directories[DataDirectoryType::Import as usize] = (idata, 60);
    image
        // msvcr100.dll: one import by ordinal, one by name
        .put_u32(idata, idata + 0x100)
        .put_u32(idata + 12, idata + 0x300)
        .put_u32(idata + 16, idata + 0x180)
        .put_u32(idata + 0x100, 0x8000_0005)
        .put_u32(idata + 0x104, idata + 0x400)
        .put_u32(idata + 0x180, 0x8000_0005)
        .put_u32(idata + 0x184, idata + 0x400)
        .put_str(idata + 0x300, "MSVCR100.dll")
        .put_u16(idata + 0x400, 0)
        .put_str(idata + 0x402, "Bar")
        // msvcp110.dll, FirstThunk only
        .put_u32(idata + 20 + 12, idata + 0x320)
        .put_u32(idata + 20 + 16, idata + 0x200)
        .put_u32(idata + 0x200, idata + 0x410)
        .put_str(idata + 0x320, "msvcp110.dll")
        .put_u16(idata + 0x410, 7)
        .put_str(idata + 0x412, "Baz");

    let object = PeObject::from_mem(image.build()).unwrap();

    assert_eq!(
        object.classification(),
        ToolchainClassification::VisualStudio2012
    );
    assert_eq!(object.classification().to_string(), "Visual Studio 2012");

    let imports = object.imports().unwrap();
    let names: Vec<String> = imports.imports().map(Import::full_name).collect();
    assert_eq!(
        names,
        ["msvcr100.dll.ordinal_5", "msvcr100.dll.Bar", "msvcp110.dll.Baz"]
    );

    let recorder = object.recorder().unwrap();
    let slot = 0x0040_0000 + u64::from(idata + 0x184);
    assert_eq!(recorder.name(slot), Some("msvcr100.dll.Bar"));
    assert_eq!(recorder.symbol(slot).unwrap().kind, SymbolKind::Import);
    assert_eq!(object.processor(), Some(Processor::X86_32));
}

#[test]
fn visual_basic_is_sticky() {
    let mut image = Image::new(false);
    image.section(".text", 0x6000_0020);
    let idata = image.section(".idata", RDATA);
    image.directories[DataDirectoryType::Import as usize] = (idata, 60);
    image
        .put_u32(idata + 12, idata + 0x300)
        .put_u32(idata + 16, idata + 0x100)
        .put_str(idata + 0x300, "MSVBVM60.DLL")
        .put_u32(idata + 20 + 12, idata + 0x320)
        .put_u32(idata + 20 + 16, idata + 0x100)
        .put_str(idata + 0x320, "msvcr120.dll");

    let object = PeObject::from_mem(image.build()).unwrap();
    assert_eq!(object.classification(), ToolchainClassification::VisualBasic6);
}

#[test]
fn corrupt_directories_are_dropped() {
    let mut image = Image::new(false);
    let text = image.section(".text", 0x6000_0020);
    let rsrc = image.section(".rsrc", RDATA);
    image.entry_point = text;
    image.directories[DataDirectoryType::Export as usize] = (0x00F0_0000, 40);
    image.directories[DataDirectoryType::Debug as usize] = (0x00F0_1000, 28);
    image.directories[DataDirectoryType::Resource as usize] = (rsrc, 0x100);
    // root directory with one id entry pointing back at itself
    image
        .put_u16(rsrc + 14, 1)
        .put_u32(rsrc + 16, 3)
        .put_u32(rsrc + 20, 0x8000_0000);

    let object = PeObject::from_mem(image.build()).unwrap();

    assert!(object.exports().is_none());
    assert!(object.debug().is_none());
    let resources = object.resources().unwrap();
    assert_eq!(resources.leaf_count(), 0);
    assert!(object
        .recorder()
        .unwrap()
        .is_function(0x0040_0000 + u64::from(text)));
}

#[test]
fn bad_headers_are_rejected() {
    assert!(matches!(PeObject::from_mem(Vec::new()), Err(Error::Empty)));

    let mut data = Image::new(false).build();
    data[0] = b'X';
    assert!(matches!(
        PeObject::from_mem(data),
        Err(Error::InvalidFormat(_))
    ));

    let mut data = Image::new(true).build();
    data[0x40] = b'X';
    assert!(matches!(
        PeObject::from_mem(data),
        Err(Error::InvalidFormat(_))
    ));
}

#[test]
fn minimal_config_only_classifies() {
    let mut image = Image::new(false);
    let text = image.section(".text", 0x6000_0020);
    let idata = image.section(".idata", RDATA);
    image.entry_point = text;
    image.directories[DataDirectoryType::Import as usize] = (idata, 40);
    image.directories[DataDirectoryType::Export as usize] = (idata + 0x800, 40);
    image
        .put_u32(idata + 12, idata + 0x300)
        .put_u32(idata + 16, idata + 0x100)
        .put_str(idata + 0x300, "libstdc++-6.dll");

    let object =
        PeObject::from_mem_with_config(image.build(), LoaderConfig::minimal()).unwrap();
    assert_eq!(object.classification(), ToolchainClassification::MinGw);
    assert!(object.exports().is_none());
}
