//! Conversion between RVAs, VAs and file offsets.
//!
//! [`AddressTranslator`] is built once from the decoded headers and is a pure function of them
//! afterwards. Every directory decoder goes through it to turn the RVAs stored in the image into
//! positions in the backing data.

use crate::{
    pe::section::{aligned, Section},
    Error::UnmappedAddress,
    Result,
};

/// Translates addresses using the image base and the section table.
#[derive(Debug, Clone)]
pub struct AddressTranslator {
    image_base: u64,
    image_size: u64,
    sections: Vec<Section>,
}

impl AddressTranslator {
    /// Build a translator.
    ///
    /// `size_of_image` is rounded up to `section_alignment` to form the mapped image range.
    #[must_use]
    pub fn new(
        image_base: u64,
        size_of_image: u32,
        section_alignment: u32,
        sections: Vec<Section>,
    ) -> Self {
        AddressTranslator {
            image_base,
            image_size: u64::from(aligned(size_of_image, section_alignment)),
            sections,
        }
    }

    /// Preferred load address.
    #[must_use]
    pub fn image_base(&self) -> u64 {
        self.image_base
    }

    /// Size of the mapped image range starting at the image base.
    #[must_use]
    pub fn image_size(&self) -> u64 {
        self.image_size
    }

    /// The section table in header order.
    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// First section whose declared virtual range contains `rva`.
    #[must_use]
    pub fn section_for_rva(&self, rva: u32) -> Option<&Section> {
        self.sections.iter().find(|section| section.contains(rva))
    }

    /// Convert an RVA into a VA.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnmappedAddress`] if the resulting address falls outside the
    /// mapped image range.
    pub fn rva_to_va(&self, rva: u32) -> Result<u64> {
        if u64::from(rva) >= self.image_size {
            return Err(UnmappedAddress(u64::from(rva)));
        }

        self.image_base
            .checked_add(u64::from(rva))
            .ok_or(UnmappedAddress(u64::from(rva)))
    }

    /// Convert a VA back into an RVA.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnmappedAddress`] if `va` is outside the mapped image range.
    pub fn va_to_rva(&self, va: u64) -> Result<u32> {
        match va.checked_sub(self.image_base) {
            Some(rva) if rva < self.image_size => {
                u32::try_from(rva).map_err(|_| UnmappedAddress(va))
            }
            _ => Err(UnmappedAddress(va)),
        }
    }

    /// Convert an RVA into a file offset.
    ///
    /// The owning section is the first whose declared `[va, va + VirtualSize)` range contains the
    /// RVA. There is no mapping for addresses outside every section, including the headers.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnmappedAddress`] if no section contains `rva`, the owning section
    /// has a zero virtual size, or the offset lands past the section's raw data.
    pub fn rva_to_offset(&self, rva: u32) -> Result<usize> {
        let Some(section) = self.section_for_rva(rva) else {
            return Err(UnmappedAddress(u64::from(rva)));
        };

        if section.virtual_size == 0 {
            return Err(UnmappedAddress(u64::from(rva)));
        }

        let delta = u64::from(rva - section.virtual_address);
        let offset = u64::from(section.pointer_to_raw_data) + delta;
        let raw_end =
            u64::from(section.pointer_to_raw_data) + u64::from(section.size_of_raw_data);
        if offset > raw_end {
            return Err(UnmappedAddress(u64::from(rva)));
        }

        usize::try_from(offset).map_err(|_| UnmappedAddress(u64::from(rva)))
    }

    /// Convert a VA into a file offset.
    ///
    /// # Errors
    /// See [`AddressTranslator::va_to_rva`] and [`AddressTranslator::rva_to_offset`].
    pub fn va_to_offset(&self, va: u64) -> Result<usize> {
        self.rva_to_offset(self.va_to_rva(va)?)
    }

    /// Convert a file offset into an RVA, using the first section whose raw data contains it.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnmappedAddress`] if no section's raw data covers `offset`.
    pub fn offset_to_rva(&self, offset: usize) -> Result<u32> {
        let offset = offset as u64;
        self.sections
            .iter()
            .filter(|section| section.pointer_to_raw_data != 0)
            .find(|section| {
                let start = u64::from(section.pointer_to_raw_data);
                offset >= start && offset < start + u64::from(section.size_of_raw_data)
            })
            .and_then(|section| {
                let delta = offset - u64::from(section.pointer_to_raw_data);
                u32::try_from(u64::from(section.virtual_address) + delta).ok()
            })
            .ok_or(UnmappedAddress(offset))
    }
}
