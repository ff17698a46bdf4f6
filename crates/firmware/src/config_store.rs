//! Feature flag page on NOR flash.
//!
//! The device configuration table is one erase page. Byte writes go through
//! [`RmwNorFlashStorage`], which reads the page into a merge buffer, erases
//! it and programs it back, so a flag can move from 0 to 1 as well as from
//! 1 to 0. Writing the value already stored touches nothing.

use core::cell::RefCell;

use device_hal::{ConfigStore, HalError};
use embedded_storage::nor_flash::{NorFlash, NorFlashError, NorFlashErrorKind, RmwNorFlashStorage};
use embedded_storage::{ReadStorage, Storage};

/// [`ConfigStore`] over a NOR flash region.
pub struct FlashConfigStore<'b, F> {
    storage: RefCell<RmwNorFlashStorage<'b, F>>,
}

impl<'b, F: NorFlash> FlashConfigStore<'b, F> {
    /// Wrap `flash`. `merge_buffer` must hold at least one erase page.
    pub fn new(flash: F, merge_buffer: &'b mut [u8]) -> Result<Self, HalError> {
        if merge_buffer.len() < F::ERASE_SIZE {
            return Err(HalError::InvalidArgument);
        }
        Ok(Self {
            storage: RefCell::new(RmwNorFlashStorage::new(flash, merge_buffer)),
        })
    }

    fn check_offset(&self, offset: u16) -> Result<u32, HalError> {
        let capacity = self
            .storage
            .try_borrow()
            .map_err(|_| HalError::Storage)?
            .capacity();
        if usize::from(offset) >= capacity {
            return Err(HalError::InvalidArgument);
        }
        Ok(u32::from(offset))
    }
}

fn storage_error<E: NorFlashError>(error: E) -> HalError {
    match error.kind() {
        NorFlashErrorKind::OutOfBounds | NorFlashErrorKind::NotAligned => {
            HalError::InvalidArgument
        }
        _ => HalError::Storage,
    }
}

impl<F: NorFlash> ConfigStore for FlashConfigStore<'_, F> {
    fn read_byte(&self, offset: u16) -> Result<u8, HalError> {
        let offset = self.check_offset(offset)?;
        let mut byte = [0u8; 1];
        self.storage
            .try_borrow_mut()
            .map_err(|_| HalError::Storage)?
            .read(offset, &mut byte)
            .map_err(storage_error)?;
        let [value] = byte;
        Ok(value)
    }

    fn write_byte(&mut self, offset: u16, value: u8) -> Result<(), HalError> {
        if self.read_byte(offset)? == value {
            return Ok(());
        }
        let offset = self.check_offset(offset)?;
        self.storage
            .get_mut()
            .write(offset, &[value])
            .map_err(storage_error)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use device_hal::features::DCT_FEATURE_RESET_INFO_OFFSET;
    use device_hal::{Feature, FeatureFlags};
    use embedded_storage::nor_flash::{check_erase, check_read, check_write, ErrorType, ReadNorFlash};
    use std::cell::Cell;
    use std::rc::Rc;

    const PAGE: usize = 2048;

    /// RAM model of NOR flash: programming can only clear bits.
    struct RamFlash {
        bytes: std::vec::Vec<u8>,
        erases: Rc<Cell<usize>>,
    }

    impl RamFlash {
        fn erased(pages: usize) -> Self {
            Self {
                bytes: std::vec![0xFF; PAGE * pages],
                erases: Rc::default(),
            }
        }
    }

    impl ErrorType for RamFlash {
        type Error = NorFlashErrorKind;
    }

    impl ReadNorFlash for RamFlash {
        const READ_SIZE: usize = 1;

        fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
            check_read(self, offset, bytes.len())?;
            let start = offset as usize;
            bytes.copy_from_slice(&self.bytes[start..start + bytes.len()]);
            Ok(())
        }

        fn capacity(&self) -> usize {
            self.bytes.len()
        }
    }

    impl NorFlash for RamFlash {
        const WRITE_SIZE: usize = 4;
        const ERASE_SIZE: usize = PAGE;

        fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
            check_erase(self, from, to)?;
            self.bytes[from as usize..to as usize].fill(0xFF);
            self.erases.set(self.erases.get() + 1);
            Ok(())
        }

        fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
            check_write(self, offset, bytes.len())?;
            let start = offset as usize;
            for (cell, byte) in self.bytes[start..start + bytes.len()].iter_mut().zip(bytes) {
                *cell &= *byte;
            }
            Ok(())
        }
    }

    #[test]
    fn erased_page_reads_ff() {
        let mut buffer = [0u8; PAGE];
        let store = FlashConfigStore::new(RamFlash::erased(1), &mut buffer).unwrap();
        assert_eq!(store.read_byte(0).unwrap(), 0xFF);
        assert_eq!(store.read_byte(DCT_FEATURE_RESET_INFO_OFFSET).unwrap(), 0xFF);
    }

    #[test]
    fn bytes_can_be_raised_as_well_as_cleared() {
        let mut buffer = [0u8; PAGE];
        let mut store = FlashConfigStore::new(RamFlash::erased(1), &mut buffer).unwrap();
        store.write_byte(10, 0x00).unwrap();
        store.write_byte(11, 0x5A).unwrap();
        assert_eq!(store.read_byte(10).unwrap(), 0x00);

        store.write_byte(10, 0x01).unwrap();
        assert_eq!(store.read_byte(10).unwrap(), 0x01);
        assert_eq!(store.read_byte(11).unwrap(), 0x5A);
        assert_eq!(store.read_byte(12).unwrap(), 0xFF);
    }

    #[test]
    fn unchanged_value_skips_erase() {
        let flash = RamFlash::erased(1);
        let erases = Rc::clone(&flash.erases);
        let mut buffer = [0u8; PAGE];
        let mut store = FlashConfigStore::new(flash, &mut buffer).unwrap();
        store.write_byte(5, 0xFF).unwrap();
        assert_eq!(erases.get(), 0);
        store.write_byte(5, 0x7F).unwrap();
        assert_eq!(erases.get(), 1);
        store.write_byte(5, 0x7F).unwrap();
        assert_eq!(erases.get(), 1);
    }

    #[test]
    fn out_of_range_offset_is_invalid() {
        let mut buffer = [0u8; PAGE];
        let mut store = FlashConfigStore::new(RamFlash::erased(1), &mut buffer).unwrap();
        assert_eq!(store.read_byte(PAGE as u16), Err(HalError::InvalidArgument));
        assert_eq!(store.write_byte(PAGE as u16, 0), Err(HalError::InvalidArgument));
    }

    #[test]
    fn short_merge_buffer_is_rejected() {
        let mut buffer = [0u8; PAGE - 1];
        assert!(FlashConfigStore::new(RamFlash::erased(1), &mut buffer).is_err());
    }

    #[test]
    fn feature_flags_round_trip_through_flash() {
        let mut buffer = [0u8; PAGE];
        let store = FlashConfigStore::new(RamFlash::erased(1), &mut buffer).unwrap();
        let mut flags = FeatureFlags::new(store, true);
        assert!(!flags.get(Feature::ResetInfo));
        flags.set(Feature::ResetInfo, true).unwrap();
        assert!(flags.get(Feature::ResetInfo));
        flags.set(Feature::ResetInfo, false).unwrap();
        assert!(!flags.get(Feature::ResetInfo));
    }
}
