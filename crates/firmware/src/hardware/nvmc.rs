//! Device configuration page in internal flash.
//!
//! [`DctFlash`] exposes the one 4 KiB NVMC page reserved by the `DCT` region
//! in `memory.x` as [`NorFlash`]. Offsets are relative to the start of the
//! page. Reads are byte-granular from the memory-mapped flash; writes are
//! whole words and erases whole pages.

use embedded_storage::nor_flash::{
    check_erase, check_read, check_write, ErrorType, NorFlash, NorFlashErrorKind, ReadNorFlash,
};
use nrf52840_pac as pac;

/// Start of the configuration page. Matches the `DCT` region in `memory.x`.
pub const DCT_PAGE_ADDRESS: usize = 0x000F_4000;
/// NVMC page size.
pub const PAGE_SIZE: usize = 4096;
const WORD_SIZE: usize = 4;
const ERASED_WORD: u32 = 0xFFFF_FFFF;

const CONFIG_REN: u32 = 0;
const CONFIG_WEN: u32 = 1;
const CONFIG_EEN: u32 = 2;
const READY: u32 = 1;

/// Polls of READY before an operation counts as failed. A page erase takes
/// up to 85 ms.
const READY_POLLS: u32 = 10_000_000;

/// [`NorFlash`] over the configuration page, driven through the owned NVMC.
pub struct DctFlash {
    nvmc: pac::NVMC,
}

impl DctFlash {
    /// Take the NVMC.
    pub fn new(nvmc: pac::NVMC) -> Self {
        Self { nvmc }
    }

    fn address(offset: u32) -> Result<usize, NorFlashErrorKind> {
        usize::try_from(offset)
            .ok()
            .and_then(|offset| DCT_PAGE_ADDRESS.checked_add(offset))
            .ok_or(NorFlashErrorKind::OutOfBounds)
    }

    fn wait_ready(&self) -> Result<(), NorFlashErrorKind> {
        for _ in 0..READY_POLLS {
            if self.nvmc.ready.read().bits() & READY != 0 {
                return Ok(());
            }
        }
        defmt::error!("nvmc: not ready after {} polls", READY_POLLS);
        Err(NorFlashErrorKind::Other)
    }

    /// Run `op` with the NVMC in `mode`, then return it to read-only.
    fn with_mode(
        &self,
        mode: u32,
        op: impl FnOnce(&Self) -> Result<(), NorFlashErrorKind>,
    ) -> Result<(), NorFlashErrorKind> {
        self.wait_ready()?;
        // SAFETY: CONFIG accepts REN/WEN/EEN.
        self.nvmc.config.write(|w| unsafe { w.bits(mode) });
        let result = op(self);
        // SAFETY: as above.
        self.nvmc.config.write(|w| unsafe { w.bits(CONFIG_REN) });
        result
    }
}

impl ErrorType for DctFlash {
    type Error = NorFlashErrorKind;
}

impl ReadNorFlash for DctFlash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        check_read(self, offset, bytes.len())?;
        let start = Self::address(offset)?;
        for (address, byte) in (start..).zip(bytes.iter_mut()) {
            // SAFETY: bounds checked above; the page is memory-mapped flash.
            *byte = unsafe { (address as *const u8).read_volatile() };
        }
        Ok(())
    }

    fn capacity(&self) -> usize {
        PAGE_SIZE
    }
}

impl NorFlash for DctFlash {
    const WRITE_SIZE: usize = WORD_SIZE;
    const ERASE_SIZE: usize = PAGE_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        check_erase(self, from, to)?;
        let start = Self::address(from)?;
        let end = Self::address(to)?;
        for page in (start..end).step_by(PAGE_SIZE) {
            let page = u32::try_from(page).map_err(|_| NorFlashErrorKind::OutOfBounds)?;
            self.with_mode(CONFIG_EEN, |flash| {
                // SAFETY: page-aligned address inside the DCT region; erase
                // mode is enabled.
                flash.nvmc.erasepage().write(|w| unsafe { w.bits(page) });
                flash.wait_ready()
            })?;
        }
        defmt::debug!("nvmc: erased 0x{:08X}..0x{:08X}", start, end);
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        check_write(self, offset, bytes.len())?;
        let start = Self::address(offset)?;
        self.with_mode(CONFIG_WEN, |flash| {
            for (address, chunk) in (start..)
                .step_by(WORD_SIZE)
                .zip(bytes.chunks_exact(WORD_SIZE))
            {
                let word = <[u8; WORD_SIZE]>::try_from(chunk)
                    .map(u32::from_le_bytes)
                    .map_err(|_| NorFlashErrorKind::NotAligned)?;
                if word == ERASED_WORD {
                    continue;
                }
                // SAFETY: word-aligned address inside the DCT region (checked
                // above); write mode is enabled.
                unsafe { (address as *mut u32).write_volatile(word) };
                flash.wait_ready()?;
            }
            Ok(())
        })
    }
}
