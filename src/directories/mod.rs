//! Data directory decoders.
//!
//! One decoder per supported directory. Each follows the same contract: `Ok(None)` when the
//! directory slot is empty, `Err` when the slot is present but its contents do not translate or
//! are truncated, and `Ok(Some(_))` otherwise. Per-entry problems that do not invalidate the rest
//! of a table (an unknown debug type, an unresolvable hint/name thunk) are logged and skipped
//! inside the decoder.

pub mod clr;
pub mod debug;
pub mod exceptions;
pub mod exports;
pub mod imports;

pub use clr::ClrHeader;
pub use debug::{CodeView, DebugDirectory, DebugEntry, DebugType};
pub use exceptions::{ExceptionTable, RuntimeFunction, UnwindKind};
pub use exports::{Export, ExportTable};
pub use imports::{Import, ImportKind, ImportModule, ImportTable};
