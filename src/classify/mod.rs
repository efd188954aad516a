//! Toolchain classification.
//!
//! A [`ToolchainClassification`] starts out [`ToolchainClassification::Unclassified`] and is
//! threaded through the loader by value: each feed takes the current verdict and returns the
//! updated one.
//!
//! - [`classify_import`] is called once per import module, in descriptor order.
//! - [`borland::classify_borland`] runs once after the imports, when resources are present.
//! - [`classify_clr`] runs last, when a CLR header was decoded.
//!
//! Visual Basic runtimes, MinGW and Borland verdicts are sticky: once set, no C runtime import
//! changes them. Within the Visual Studio family a later, more specific runtime import may still
//! refine the verdict, and a generic match never replaces a versioned one.

pub mod borland;

use strum::{Display, EnumIter};

use crate::directories::ClrHeader;

pub use borland::{classify_borland, ModuleKind, PackageInfo, Producer};

/// The toolchain that most likely produced an image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum ToolchainClassification {
    /// No signal seen yet
    #[default]
    Unclassified,
    /// GCC for Windows, detected through `libstdc++`
    #[strum(serialize = "MinGW")]
    MinGw,
    /// `msvbvm50.dll`
    #[strum(serialize = "Visual Basic 5")]
    VisualBasic5,
    /// `msvbvm60.dll`
    #[strum(serialize = "Visual Basic 6")]
    VisualBasic6,
    /// A Microsoft C runtime without a version tag of its own
    #[strum(serialize = "Visual Studio")]
    VisualStudio,
    /// VC 7.0
    #[strum(serialize = "Visual Studio 2002")]
    VisualStudio2002,
    /// VC 7.1
    #[strum(serialize = "Visual Studio 2003")]
    VisualStudio2003,
    /// VC 8.0
    #[strum(serialize = "Visual Studio 2005")]
    VisualStudio2005,
    /// VC 9.0
    #[strum(serialize = "Visual Studio 2008")]
    VisualStudio2008,
    /// VC 10.0
    #[strum(serialize = "Visual Studio 2010")]
    VisualStudio2010,
    /// VC 11.0
    #[strum(serialize = "Visual Studio 2012")]
    VisualStudio2012,
    /// VC 12.0
    #[strum(serialize = "Visual Studio 2013")]
    VisualStudio2013,
    /// VC 14.0, the universal CRT
    #[strum(serialize = "Visual Studio 2015")]
    VisualStudio2015,
    /// VC 14.1
    #[strum(serialize = "Visual Studio 2017")]
    VisualStudio2017,
    /// Runtime header 2.0
    #[strum(serialize = ".NET 1.x")]
    DotNet1,
    /// Runtime header 2.5 and later
    #[strum(serialize = ".NET")]
    DotNet,
    /// Delphi without a recognised version fingerprint
    #[strum(serialize = "Borland Delphi")]
    BorlandDelphi,
    /// Package info from a pre-v4 producer
    #[strum(serialize = "Borland Delphi 3")]
    BorlandDelphi3,
    /// Requires `ImageHlp`
    #[strum(serialize = "Borland Delphi 6")]
    BorlandDelphi6,
    /// Requires `SysInit`
    #[strum(serialize = "Borland Delphi 7")]
    BorlandDelphi7,
    /// Requires `StrUtils`
    #[strum(serialize = "Borland Delphi 2005/2006")]
    BorlandDelphi9_10,
    /// Requires `ExcUtils`
    #[strum(serialize = "Embarcadero Delphi XE")]
    BorlandDelphiXe,
    /// Requires the namespaced `System.SysUtils`
    #[strum(serialize = "Embarcadero Delphi XE2-XE6")]
    BorlandDelphiXe2_6,
    /// Package info from a C++ producer
    #[strum(serialize = "Borland C++")]
    BorlandCpp,
}

impl ToolchainClassification {
    /// Whether any verdict has been reached.
    #[must_use]
    pub fn is_classified(self) -> bool {
        self != ToolchainClassification::Unclassified
    }

    /// Visual Basic 5 or 6.
    #[must_use]
    pub fn is_visual_basic(self) -> bool {
        matches!(
            self,
            ToolchainClassification::VisualBasic5 | ToolchainClassification::VisualBasic6
        )
    }

    /// Generic or versioned Visual Studio.
    #[must_use]
    pub fn is_visual_studio(self) -> bool {
        use ToolchainClassification as T;
        matches!(
            self,
            T::VisualStudio
                | T::VisualStudio2002
                | T::VisualStudio2003
                | T::VisualStudio2005
                | T::VisualStudio2008
                | T::VisualStudio2010
                | T::VisualStudio2012
                | T::VisualStudio2013
                | T::VisualStudio2015
                | T::VisualStudio2017
        )
    }

    /// Any Delphi variant.
    #[must_use]
    pub fn is_delphi(self) -> bool {
        use ToolchainClassification as T;
        matches!(
            self,
            T::BorlandDelphi
                | T::BorlandDelphi3
                | T::BorlandDelphi6
                | T::BorlandDelphi7
                | T::BorlandDelphi9_10
                | T::BorlandDelphiXe
                | T::BorlandDelphiXe2_6
        )
    }

    /// Any Delphi variant or Borland C++.
    #[must_use]
    pub fn is_borland(self) -> bool {
        self.is_delphi() || self == ToolchainClassification::BorlandCpp
    }

    /// Either .NET variant.
    #[must_use]
    pub fn is_dotnet(self) -> bool {
        matches!(
            self,
            ToolchainClassification::DotNet1 | ToolchainClassification::DotNet
        )
    }
}

/// Module prefixes that classify unconditionally.
const RUNTIME_PREFIXES: [(&str, ToolchainClassification); 3] = [
    ("msvbvm50", ToolchainClassification::VisualBasic5),
    ("msvbvm60", ToolchainClassification::VisualBasic6),
    ("libstdc++", ToolchainClassification::MinGw),
];

/// Microsoft C/C++ runtime prefixes, first match wins.
const MSVC_PREFIXES: [(&str, ToolchainClassification); 21] = [
    ("msvcp50", ToolchainClassification::VisualStudio),
    ("msvcp60", ToolchainClassification::VisualStudio),
    ("msvcrt.", ToolchainClassification::VisualStudio),
    ("msvcp70", ToolchainClassification::VisualStudio2002),
    ("msvcr70", ToolchainClassification::VisualStudio2002),
    ("msvcp71", ToolchainClassification::VisualStudio2003),
    ("msvcr71", ToolchainClassification::VisualStudio2003),
    ("msvcp80", ToolchainClassification::VisualStudio2005),
    ("msvcr80", ToolchainClassification::VisualStudio2005),
    ("msvcp90", ToolchainClassification::VisualStudio2008),
    ("msvcr90", ToolchainClassification::VisualStudio2008),
    ("msvcp100", ToolchainClassification::VisualStudio2010),
    ("msvcr100", ToolchainClassification::VisualStudio2010),
    ("msvcp110", ToolchainClassification::VisualStudio2012),
    ("msvcr110", ToolchainClassification::VisualStudio2012),
    ("msvcp120", ToolchainClassification::VisualStudio2013),
    ("msvcr120", ToolchainClassification::VisualStudio2013),
    ("msvcp140_1", ToolchainClassification::VisualStudio2017),
    ("msvcp140_2", ToolchainClassification::VisualStudio2017),
    ("msvcp140", ToolchainClassification::VisualStudio2015),
    ("vcruntime140", ToolchainClassification::VisualStudio2015),
];

/// Update `current` with the evidence of one imported module name.
///
/// The name is matched case-insensitively by prefix.
///
/// # Example
///
/// ```rust
/// use pescope::classify::{classify_import, ToolchainClassification};
///
/// let mut verdict = ToolchainClassification::default();
/// for module in ["KERNEL32.dll", "MSVCR100.dll", "msvcp110.dll"] {
///     verdict = classify_import(verdict, module);
/// }
/// assert_eq!(verdict, ToolchainClassification::VisualStudio2012);
/// ```
#[must_use]
pub fn classify_import(current: ToolchainClassification, module: &str) -> ToolchainClassification {
    let module = module.to_ascii_lowercase();

    let current = RUNTIME_PREFIXES
        .iter()
        .find(|(prefix, _)| module.starts_with(prefix))
        .map_or(current, |(_, verdict)| *verdict);

    if current.is_classified() && !current.is_visual_studio() {
        return current;
    }

    match MSVC_PREFIXES
        .iter()
        .find(|(prefix, _)| module.starts_with(prefix))
    {
        Some((_, ToolchainClassification::VisualStudio)) if current.is_visual_studio() => current,
        Some((_, verdict)) => *verdict,
        None => current,
    }
}

/// Update `current` with the runtime version of a decoded CLR header.
///
/// A CLR header marks a managed image regardless of what its imports suggested.
#[must_use]
pub fn classify_clr(current: ToolchainClassification, header: &ClrHeader) -> ToolchainClassification {
    let verdict = if header.runtime_version() == (2, 0) {
        ToolchainClassification::DotNet1
    } else {
        ToolchainClassification::DotNet
    };

    if current != verdict {
        log::debug!("CLR runtime {:?} classifies image as {}", header.runtime_version(), verdict);
    }
    verdict
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pe::DataDirectory;

    fn feed(modules: &[&str]) -> ToolchainClassification {
        modules
            .iter()
            .fold(ToolchainClassification::default(), |current, module| {
                classify_import(current, module)
            })
    }

    #[test]
    fn runtime_prefixes() {
        assert_eq!(feed(&["MSVBVM50.DLL"]), ToolchainClassification::VisualBasic5);
        assert_eq!(feed(&["msvbvm60.dll"]), ToolchainClassification::VisualBasic6);
        assert_eq!(feed(&["libstdc++-6.dll"]), ToolchainClassification::MinGw);
        assert_eq!(
            feed(&["kernel32.dll", "user32.dll"]),
            ToolchainClassification::Unclassified
        );
    }

    #[test]
    fn msvc_table() {
        assert_eq!(feed(&["msvcrt.dll"]), ToolchainClassification::VisualStudio);
        assert_eq!(feed(&["MSVCR71.dll"]), ToolchainClassification::VisualStudio2003);
        assert_eq!(feed(&["msvcp90.dll"]), ToolchainClassification::VisualStudio2008);
        assert_eq!(
            feed(&["VCRUNTIME140.dll"]),
            ToolchainClassification::VisualStudio2015
        );
        assert_eq!(
            feed(&["msvcp140_1.dll"]),
            ToolchainClassification::VisualStudio2017
        );
        assert_eq!(feed(&["msvcp140.dll"]), ToolchainClassification::VisualStudio2015);
    }

    #[test]
    fn refinement_within_visual_studio() {
        assert_eq!(
            feed(&["MSVCR100.dll", "msvcp110.dll"]),
            ToolchainClassification::VisualStudio2012
        );
        assert_eq!(
            feed(&["msvcrt.dll", "msvcr80.dll"]),
            ToolchainClassification::VisualStudio2005
        );
        assert_eq!(
            feed(&["msvcr80.dll", "msvcrt.dll"]),
            ToolchainClassification::VisualStudio2005
        );
    }

    #[test]
    fn sticky_families() {
        assert_eq!(
            feed(&["msvbvm60.dll", "msvcr100.dll", "msvcrt.dll"]),
            ToolchainClassification::VisualBasic6
        );
        assert_eq!(
            feed(&["libstdc++-6.dll", "msvcrt.dll"]),
            ToolchainClassification::MinGw
        );
        assert_eq!(
            classify_import(ToolchainClassification::BorlandDelphi7, "msvcrt.dll"),
            ToolchainClassification::BorlandDelphi7
        );
    }

    #[test]
    fn runtime_prefix_overrides_visual_studio() {
        assert_eq!(
            feed(&["msvcr100.dll", "msvbvm60.dll"]),
            ToolchainClassification::VisualBasic6
        );
    }

    #[test]
    fn families() {
        assert!(ToolchainClassification::VisualBasic5.is_visual_basic());
        assert!(ToolchainClassification::BorlandCpp.is_borland());
        assert!(!ToolchainClassification::BorlandCpp.is_delphi());
        assert!(ToolchainClassification::BorlandDelphiXe2_6.is_delphi());
        assert!(ToolchainClassification::DotNet1.is_dotnet());
        assert!(ToolchainClassification::VisualStudio2017.is_visual_studio());
        assert!(!ToolchainClassification::Unclassified.is_classified());
        assert_eq!(
            ToolchainClassification::VisualStudio2012.to_string(),
            "Visual Studio 2012"
        );
    }

    #[test]
    fn clr_runtime_version() {
        let mut header = ClrHeader {
            cb: 72,
            major_runtime_version: 2,
            minor_runtime_version: 0,
            metadata: DataDirectory::default(),
            flags: ClrHeader::FLAG_IL_ONLY,
            entry_point_token: 0,
            resources: DataDirectory::default(),
            strong_name_signature: DataDirectory::default(),
            code_manager_table: DataDirectory::default(),
            vtable_fixups: DataDirectory::default(),
            export_address_table_jumps: DataDirectory::default(),
            managed_native_header: DataDirectory::default(),
        };
        assert_eq!(
            classify_clr(ToolchainClassification::VisualStudio, &header),
            ToolchainClassification::DotNet1
        );

        header.minor_runtime_version = 5;
        assert_eq!(
            classify_clr(ToolchainClassification::Unclassified, &header),
            ToolchainClassification::DotNet
        );
    }
}
