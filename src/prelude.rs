//! # pescope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the pescope library. Import this module to get quick access to the essential
//! types for PE image analysis.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all pescope operations
pub use crate::Error;

/// The result type used throughout pescope
pub use crate::Result;

/// Selection of the analyzers run while loading
pub use crate::LoaderConfig;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Main entry point for image analysis
pub use crate::PeObject;

/// Low-level file parsing utilities
pub use crate::{File, Parser};

// ================================================================================================
// Headers and Sections
// ================================================================================================

/// Header structures and address translation
pub use crate::pe::{
    AddressTranslator, Bitness, DataDirectory, DataDirectoryType, DosHeader, FileHeader,
    OptionalHeader, Section, SectionAccess,
};

// ================================================================================================
// Data Directories
// ================================================================================================

/// Decoded directories
pub use crate::directories::{
    ClrHeader, CodeView, DebugDirectory, DebugType, ExceptionTable, Export, ExportTable, Import,
    ImportKind, ImportTable,
};

/// Resource tree
pub use crate::resources::{ResourceKey, ResourceNode, ResourceTree, ResourceType};

// ================================================================================================
// Classification and Recovery
// ================================================================================================

/// Toolchain verdict
pub use crate::ToolchainClassification;

/// Visual Basic project model
pub use crate::vb::{VbControl, VbEventHandler, VbObject, VbProject};

// ================================================================================================
// Host Boundary
// ================================================================================================

/// The host trait, its in-memory implementation and the lifted instruction form
pub use crate::analysis::{
    Host, IlInstruction, IlOp, Operand, Processor, Recorder, Reference, SymbolKind,
};
