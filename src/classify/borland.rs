//! Borland package descriptor inspection.
//!
//! Delphi and C++Builder images embed a `PACKAGEINFO` resource under `RCDATA`. It starts with a
//! flags word followed by the count of required packages and the list of contained units; the
//! producer of the package is encoded in bits 26..27 of the flags:
//!
//! | bits 26..27 | producer |
//! |-------------|----------|
//! | 0 | pre-v4 compiler |
//! | 1 | undefined |
//! | 2 | C++ |
//! | 3 | Pascal |
//!
//! Bits 30..31 encode the module kind (EXE, package DLL, library DLL, undefined). Delphi
//! versions are told apart by which runtime units the descriptor names; the strings are searched
//! for in the raw resource bytes, newest first.

use strum::{Display, FromRepr};

use crate::{
    classify::ToolchainClassification,
    file::{parser::Parser, File},
    resources::{ResourceNode, ResourceTree, ResourceType},
    Result,
};

/// Name of the package descriptor resource under `RCDATA`.
pub const PACKAGE_INFO_NAME: &str = "PACKAGEINFO";

/// Unit names that identify a Delphi release, in priority order.
pub const FINGERPRINTS: [(&[u8], ToolchainClassification); 5] = [
    (b"System.SysUtils", ToolchainClassification::BorlandDelphiXe2_6),
    (b"ExcUtils", ToolchainClassification::BorlandDelphiXe),
    (b"StrUtils", ToolchainClassification::BorlandDelphi9_10),
    (b"ImageHlp", ToolchainClassification::BorlandDelphi6),
    (b"SysInit", ToolchainClassification::BorlandDelphi7),
];

/// Compiler that produced the package, flags bits 26..27.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromRepr)]
#[repr(u32)]
pub enum Producer {
    /// Compilers older than Delphi 4
    PreV4 = 0,
    /// Not recorded
    Undefined = 1,
    /// C++Builder
    Cpp = 2,
    /// Delphi
    Pascal = 3,
}

/// Kind of module the package describes, flags bits 30..31.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromRepr)]
#[repr(u32)]
pub enum ModuleKind {
    /// Executable
    Exe = 0,
    /// Package DLL (`.bpl`)
    PackageDll = 1,
    /// Plain library DLL
    LibraryDll = 2,
    /// Not recorded
    Undefined = 3,
}

/// The fixed prefix of a `PACKAGEINFO` resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageInfo {
    /// Package flags
    pub flags: u32,
    /// Number of required packages that follow
    pub requires_count: u32,
}

impl PackageInfo {
    /// Never build
    pub const FLAG_NEVER_BUILD: u32 = 0x1;
    /// Design-time only
    pub const FLAG_DESIGN_ONLY: u32 = 0x2;
    /// Run-time only
    pub const FLAG_RUN_ONLY: u32 = 0x4;

    /// Decode the fixed prefix of a package descriptor.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than 8 bytes.
    pub fn read(data: &[u8]) -> Result<Self> {
        let mut parser = Parser::new(data);
        Ok(PackageInfo {
            flags: parser.read_le::<u32>()?,
            requires_count: parser.read_le::<u32>()?,
        })
    }

    /// The producing compiler.
    #[must_use]
    pub fn producer(&self) -> Producer {
        match Producer::from_repr((self.flags >> 26) & 0b11) {
            Some(producer) => producer,
            None => Producer::Undefined,
        }
    }

    /// The module kind.
    #[must_use]
    pub fn module_kind(&self) -> ModuleKind {
        match ModuleKind::from_repr(self.flags >> 30) {
            Some(kind) => kind,
            None => ModuleKind::Undefined,
        }
    }

    /// Whether the producer belongs to the Delphi family.
    #[must_use]
    pub fn is_delphi(&self) -> bool {
        matches!(self.producer(), Producer::Pascal | Producer::PreV4)
    }
}

/// The first Delphi release whose fingerprint occurs in `data`.
#[must_use]
pub fn fingerprint(data: &[u8]) -> Option<ToolchainClassification> {
    FINGERPRINTS
        .iter()
        .find(|(needle, _)| data.windows(needle.len()).any(|window| window == *needle))
        .map(|(_, verdict)| *verdict)
}

/// The package descriptor leaf of `tree`, if present.
#[must_use]
pub fn find_package_info(tree: &ResourceTree) -> Option<&crate::resources::ResourceData> {
    tree.root
        .find_id(ResourceType::RcData as u32)
        .and_then(ResourceNode::as_directory)
        .and_then(|rcdata| rcdata.find_name(PACKAGE_INFO_NAME))
        .and_then(ResourceNode::first_leaf)
}

/// Refine `current` with the image's Borland package descriptor.
///
/// Leaves `current` untouched when there is no descriptor, when it cannot be read, when the
/// producer is undefined, or when `current` is already a sticky non-Borland verdict (Visual
/// Basic, MinGW, .NET).
#[must_use]
pub fn classify_borland(
    current: ToolchainClassification,
    file: &File,
    tree: &ResourceTree,
) -> ToolchainClassification {
    if current.is_classified() && !current.is_visual_studio() && !current.is_borland() {
        return current;
    }

    let Some(leaf) = find_package_info(tree) else {
        return current;
    };

    let data = match leaf.bytes(file) {
        Ok(data) => data,
        Err(error) => {
            log::debug!("PACKAGEINFO not readable: {error}");
            return current;
        }
    };

    let info = match PackageInfo::read(data) {
        Ok(info) => info,
        Err(error) => {
            log::debug!("PACKAGEINFO truncated: {error}");
            return current;
        }
    };

    log::trace!(
        "PACKAGEINFO producer {}, module {}, {} required packages",
        info.producer(),
        info.module_kind(),
        info.requires_count
    );

    match info.producer() {
        Producer::Cpp => ToolchainClassification::BorlandCpp,
        Producer::PreV4 => ToolchainClassification::BorlandDelphi3,
        Producer::Pascal => fingerprint(data).unwrap_or(ToolchainClassification::BorlandDelphi),
        Producer::Undefined => current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        pe::DataDirectoryType,
        test::{ImageBuilder, SCN_RDATA},
    };

    const PASCAL: u32 = 3 << 26;
    const CPP: u32 = 2 << 26;

    /// An image whose only resource is `RCDATA / PACKAGEINFO / 0` holding `payload`.
    fn image(payload: &[u8]) -> Vec<u8> {
        let mut builder = ImageBuilder::pe32();
        let rsrc = builder.add_section(".rsrc", 0x400, SCN_RDATA);

        builder
            .write_u16(rsrc + 14, 1)
            .write_u32(rsrc + 0x10, 10)
            .write_u32(rsrc + 0x14, 0x8000_0000 | 0x18)
            .write_u16(rsrc + 0x18 + 12, 1)
            .write_u32(rsrc + 0x28, 0x8000_0000 | 0x40)
            .write_u32(rsrc + 0x2C, 0x60)
            .write_u16(rsrc + 0x40, PACKAGE_INFO_NAME.len() as u16);
        for (index, unit) in PACKAGE_INFO_NAME.encode_utf16().enumerate() {
            builder.write_u16(rsrc + 0x42 + 2 * index as u32, unit);
        }
        builder
            .write_u32(rsrc + 0x60, rsrc + 0x100)
            .write_u32(rsrc + 0x64, payload.len() as u32)
            .write(rsrc + 0x100, payload)
            .directory(DataDirectoryType::Resource, rsrc, 0x400);

        builder.build()
    }

    fn payload(flags: u32, units: &[&str]) -> Vec<u8> {
        let mut data = flags.to_le_bytes().to_vec();
        data.extend_from_slice(&1_u32.to_le_bytes());
        for unit in units {
            data.push(0);
            data.extend_from_slice(unit.as_bytes());
            data.push(0);
        }
        data
    }

    fn classify(data: &[u8], current: ToolchainClassification) -> ToolchainClassification {
        let file = File::from_mem(image(data)).unwrap();
        let tree = ResourceTree::read(&file, 32).unwrap().unwrap();
        classify_borland(current, &file, &tree)
    }

    #[test]
    fn flag_fields() {
        let info = PackageInfo::read(&payload(PASCAL | (1 << 30), &[])).unwrap();
        assert_eq!(info.producer(), Producer::Pascal);
        assert_eq!(info.module_kind(), ModuleKind::PackageDll);
        assert_eq!(info.requires_count, 1);
        assert!(info.is_delphi());
        assert!(PackageInfo::read(&[0, 0, 0]).is_err());
    }

    #[test]
    fn fingerprint_priority() {
        assert_eq!(
            classify(
                &payload(PASCAL, &["SysInit", "System.SysUtils"]),
                ToolchainClassification::Unclassified
            ),
            ToolchainClassification::BorlandDelphiXe2_6
        );
        assert_eq!(
            classify(
                &payload(PASCAL, &["SysInit", "ImageHlp"]),
                ToolchainClassification::Unclassified
            ),
            ToolchainClassification::BorlandDelphi6
        );
        assert_eq!(
            classify(&payload(PASCAL, &["SysInit"]), ToolchainClassification::Unclassified),
            ToolchainClassification::BorlandDelphi7
        );
        assert_eq!(
            classify(&payload(PASCAL, &["Forms"]), ToolchainClassification::Unclassified),
            ToolchainClassification::BorlandDelphi
        );
    }

    #[test]
    fn producers() {
        assert_eq!(
            classify(&payload(CPP, &["SysInit"]), ToolchainClassification::Unclassified),
            ToolchainClassification::BorlandCpp
        );
        assert_eq!(
            classify(&payload(0, &["SysInit"]), ToolchainClassification::Unclassified),
            ToolchainClassification::BorlandDelphi3
        );
        assert_eq!(
            classify(&payload(1 << 26, &["SysInit"]), ToolchainClassification::VisualStudio),
            ToolchainClassification::VisualStudio
        );
    }

    #[test]
    fn sticky_verdicts_are_kept() {
        assert_eq!(
            classify(&payload(PASCAL, &["SysInit"]), ToolchainClassification::VisualBasic6),
            ToolchainClassification::VisualBasic6
        );
        assert_eq!(
            classify(&payload(PASCAL, &["SysInit"]), ToolchainClassification::VisualStudio),
            ToolchainClassification::BorlandDelphi7
        );
    }
}
