use super::Backend;
use crate::{Error::OutOfBounds, Result};

/// Image held in an owned buffer.
///
/// Used by [`crate::File::from_mem`] and by every test that assembles a synthetic image.
#[derive(Debug)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Create a new memory backend
    ///
    /// ## Arguments
    /// * 'data' - The image bytes to take ownership of
    #[must_use]
    pub fn new(data: Vec<u8>) -> Memory {
        Memory { data }
    }
}

impl Backend for Memory {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let Some(offset_end) = offset.checked_add(len) else {
            return Err(OutOfBounds);
        };

        if offset_end > self.data.len() {
            return Err(OutOfBounds);
        }

        Ok(&self.data[offset..offset_end])
    }

    fn data(&self) -> &[u8] {
        self.data.as_slice()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_within_bounds() {
        let mut data = vec![0x00_u8; 0x400];
        data[0] = b'M';
        data[1] = b'Z';
        data[0x3C] = 0x80;

        let memory = Memory::new(data);

        assert_eq!(memory.len(), 0x400);
        assert_eq!(memory.data_slice(0, 2).unwrap(), b"MZ");
        assert_eq!(memory.data_slice(0x3C, 4).unwrap(), &[0x80, 0, 0, 0]);
        assert!(memory.data_slice(0x3FF, 2).is_err());
        assert!(memory.data_slice(usize::MAX, 1).is_err());
    }

    #[test]
    fn empty_buffer() {
        let memory = Memory::new(vec![]);

        assert_eq!(memory.len(), 0);
        assert!(memory.data_slice(0, 1).is_err());
        let empty_slice: &[u8] = &[];
        assert_eq!(memory.data_slice(0, 0).unwrap(), empty_slice);
    }
}
