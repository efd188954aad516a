// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a file into memory
#![allow(clippy::module_name_repetitions)]

//! # pescope
//!
//! A structural decoder for Windows PE images, with toolchain identification and Visual Basic
//! 5/6 runtime recovery. Built in pure Rust, `pescope` decodes the headers, sections and data
//! directories of 32- and 64-bit images and reports what it learns to an analysis environment
//! through a small [`Host`] trait.
//!
//! ## Features
//!
//! - **📦 Efficient memory access** - Memory-mapped file access and cursor-based decoding
//! - **🔍 Directory decoding** - Exports, imports, exception tables, debug/CodeView records,
//!   resource trees and the CLR header
//! - **🏷️ Toolchain identification** - Visual Studio 2002-2017, Visual Basic 5/6, MinGW,
//!   Borland Delphi / C++ Builder and .NET
//! - **🧩 VB5/6 recovery** - Project, objects, controls and named event handlers
//! - **🛡️ Robust on hostile input** - Bounded walks, no panics, corrupt directories are skipped
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pescope::prelude::*;
//! use std::path::Path;
//!
//! let object = PeObject::from_file(Path::new("setup.exe"))?;
//! println!("Built with {}", object.classification());
//!
//! if let Some(exports) = object.exports() {
//!     for export in &exports.exports {
//!         println!("0x{:x} {}", export.address, export.display_name());
//!     }
//! }
//! # Ok::<(), pescope::Error>(())
//! ```
//!
//! ### Headers only
//!
//! ```rust,no_run
//! use pescope::{DataDirectoryType, File};
//! use std::path::Path;
//!
//! let file = File::from_file(Path::new("setup.exe"))?;
//! println!("Machine 0x{:04x}, {} sections", file.machine(), file.sections().len());
//! let va = file.rva_to_va(0x1000)?;
//! println!("RVA 0x1000 is VA 0x{va:x}");
//! # Ok::<(), pescope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`file`] - Byte backends, header decoding and address translation entry points
//! - [`pe`] - Header and section structures, [`pe::AddressTranslator`]
//! - [`directories`] - One decoder per data directory
//! - [`resources`] - The resource tree
//! - [`classify`] - Toolchain classification
//! - [`vb`] - Visual Basic runtime structures
//! - [`analysis`] - Analyzer passes and the [`Host`] boundary
//! - [`PeObject`] - The loading driver
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`](Result). Only header errors reject an image;
//! directory errors are logged through the [`log`](https://docs.rs/log) facade and the
//! directory is left out of the result.

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,no_run
/// use pescope::prelude::*;
///
/// let object = PeObject::from_mem(std::fs::read("setup.exe")?)?;
/// println!("{}", object.classification());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub mod prelude;

/// Image access: byte backends, header decoding, address translation and cursors.
pub mod file;

/// PE header and section structures, and the address translator built from them.
pub mod pe;

/// Data directory decoders.
pub mod directories;

/// Resource tree decoding.
pub mod resources;

/// Toolchain classification from imports, Borland package info and the CLR header.
pub mod classify;

/// Visual Basic 5/6 runtime structure recovery.
pub mod vb;

/// Analyzer passes and the host environment they report to.
pub mod analysis;

mod config;
mod loader;

/// `pescope` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always
/// [`Error`]. This is used consistently throughout the crate for all fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `pescope` Error type
///
/// The main error type for all operations in this crate. See [`Error`] for the full set of
/// variants and how the loader treats each of them.
pub use error::Error;

/// Image access entry point
///
/// [`File`] validates the headers of an image and serves byte reads by offset, RVA or VA.
pub use file::{parser::Parser, File};

/// Data directory slots
pub use pe::DataDirectoryType;

/// The loading driver
pub use loader::PeObject;

/// Analyzer selection
pub use config::LoaderConfig;

/// Toolchain verdict
pub use classify::ToolchainClassification;

/// The host boundary
pub use analysis::{Host, Processor, Recorder};
