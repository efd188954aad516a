//! Loader configuration
//!
//! This module selects which analyzers [`crate::PeObject`] runs. Header decoding and address
//! translation always happen; everything built on top of them can be switched off.

/// Configuration for the analyzers run while loading an image
///
/// Loading always decodes:
/// - DOS, NT and optional headers
/// - Section table and address translation
/// - The data directory table
///
/// Each flag below enables one analyzer on top of that. Analyzers whose inputs are disabled
/// are skipped as not applicable: Visual Basic recovery needs the import classification, and
/// dialog procedure discovery needs the import table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct LoaderConfig {
    /// Decode the export directory, and mark and name every export
    pub enable_exports: bool,

    /// Decode the import directory, classify the toolchain from it and name every IAT cell
    pub enable_imports: bool,

    /// Decode the exception directory and mark every function root
    pub enable_exceptions: bool,

    /// Decode the debug directory and its CodeView records
    pub enable_debug: bool,

    /// Walk the resource tree; also enables Borland package detection
    pub enable_resources: bool,

    /// Decode the CLR header and classify managed images
    pub enable_clr: bool,

    /// Recover Visual Basic 5/6 runtime structures
    pub enable_visual_basic: bool,

    /// Discover dialog procedures through the `user32.dll` dialog APIs
    pub enable_wndproc: bool,

    /// Maximum nesting depth of the resource tree (default: 32)
    pub max_resource_depth: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            enable_exports: true,
            enable_imports: true,
            enable_exceptions: true,
            enable_debug: true,
            enable_resources: true,
            enable_clr: true,
            enable_visual_basic: true,
            enable_wndproc: true,
            max_resource_depth: 32,
        }
    }
}

impl LoaderConfig {
    /// Creates a configuration running every analyzer
    #[must_use]
    pub fn comprehensive() -> Self {
        Self::default()
    }

    /// Creates a configuration decoding every directory, without the code-level enrichment
    ///
    /// Visual Basic recovery and dialog procedure discovery both need a host able to lift
    /// code; this preset is meant for hosts that cannot.
    #[must_use]
    pub fn structural() -> Self {
        Self {
            enable_visual_basic: false,
            enable_wndproc: false,
            ..Self::default()
        }
    }

    /// Creates a configuration decoding only what toolchain classification needs
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            enable_exports: false,
            enable_imports: true,
            enable_exceptions: false,
            enable_debug: false,
            enable_resources: false,
            enable_clr: false,
            enable_visual_basic: false,
            enable_wndproc: false,
            max_resource_depth: 32,
        }
    }
}
