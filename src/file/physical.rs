//! Memory-mapped file backend.
//!
//! [`Physical`] maps an image from disk read-only so that large binaries can be decoded without
//! copying them into the heap first. Directory decoders touch the image in a scattered pattern
//! (headers, then each directory wherever its RVA points), which demand paging handles well.

use super::Backend;
use crate::{
    Error::{Error, FileError},
    Result,
};

use memmap2::Mmap;
use std::{fs, path::Path};

/// A file backend that uses memory-mapped I/O.
///
/// # Examples
///
/// ```rust,ignore
/// use pescope::file::{Backend, Physical};
/// use std::path::Path;
///
/// let physical = Physical::new(Path::new("notepad.exe"))?;
/// assert_eq!(physical.data_slice(0, 2)?, b"MZ");
/// # Ok::<(), pescope::Error>(())
/// ```
#[derive(Debug)]
pub struct Physical {
    /// Memory-mapped file data
    data: Mmap,
}

impl Physical {
    /// Map the image at `path` read-only.
    ///
    /// # Arguments
    /// * `path` - Path to the PE image on disk
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or
    /// [`crate::Error::Error`] if memory mapping fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(error) => return Err(FileError(error)),
        };

        // The mapping is read-only and lives no longer than `Physical`.
        let mmap = match unsafe { Mmap::map(&file) } {
            Ok(mmap) => mmap,
            Err(error) => return Err(Error(error.to_string())),
        };

        Ok(Physical { data: mmap })
    }
}

impl Backend for Physical {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let Some(offset_end) = offset.checked_add(len) else {
            return Err(out_of_bounds_error!());
        };

        if offset_end > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        Ok(&self.data[offset..offset_end])
    }

    fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}
