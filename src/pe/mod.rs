//! PE/COFF structural records.
//!
//! This module holds the fixed-layout records decoded from the start of an image and the
//! translator built from them:
//!
//! - [`headers`] - DOS header, file header and the unified PE32/PE32+ optional header
//! - [`section`] - Section headers, their alignment-rounded extents and derived access intent
//! - [`translator`] - RVA, VA and file offset conversion
//!
//! The records are decoded by [`crate::File`] and are immutable afterwards.

pub mod headers;
pub mod section;
pub mod translator;

pub use headers::{
    Bitness, DataDirectory, DataDirectoryType, DosHeader, FileHeader, OptionalHeader,
};
pub use section::{aligned, Section, SectionAccess, SectionCharacteristics};
pub use translator::AddressTranslator;
