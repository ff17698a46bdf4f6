//! Backup register store.
//!
//! A fixed array of 32-bit slots living in RAM the reset sequence does not
//! clear. Contents survive warm (soft, watchdog, pin) resets and are
//! undefined after a cold power-up.
//!
//! Callers address slots with a 1-based handle. Handle `0` and handles past
//! [`BACKUP_REGISTER_COUNT`] are invalid: reads return
//! [`BACKUP_REGISTER_SENTINEL`], writes are ignored.
//!
//! Only task context touches the store, so no locking is needed.

use crate::config::{BACKUP_REGISTER_COUNT, BACKUP_REGISTER_SENTINEL};

/// Raw retained storage backing the registers.
pub type BackupSlots = [u32; BACKUP_REGISTER_COUNT];

/// Zero-based slot offset for a 1-based handle, or `None` if out of range.
pub const fn backup_register_offset(index: u32) -> Option<usize> {
    if index == 0 || index as usize > BACKUP_REGISTER_COUNT {
        None
    } else {
        #[allow(clippy::arithmetic_side_effects)] // index >= 1 checked above
        Some(index as usize - 1)
    }
}

/// Handle-addressed view over the retained slots.
pub struct BackupRegisters<'a> {
    slots: &'a mut BackupSlots,
}

impl<'a> BackupRegisters<'a> {
    /// Wrap retained storage. The contents are taken as-is.
    pub fn new(slots: &'a mut BackupSlots) -> Self {
        Self { slots }
    }

    /// Read the register with 1-based handle `index`.
    pub fn read(&self, index: u32) -> u32 {
        backup_register_offset(index)
            .and_then(|offset| self.slots.get(offset))
            .copied()
            .unwrap_or(BACKUP_REGISTER_SENTINEL)
    }

    /// Write the register with 1-based handle `index`. No-op when out of range.
    pub fn write(&mut self, index: u32, value: u32) {
        if let Some(slot) = backup_register_offset(index).and_then(|o| self.slots.get_mut(o)) {
            *slot = value;
        }
    }

    /// Read then zero a register. Used for single-use handoff slots.
    pub fn take(&mut self, index: u32) -> u32 {
        let value = self.read(index);
        self.write(index, 0);
        value
    }

    /// Number of valid handles.
    pub const fn len(&self) -> usize {
        BACKUP_REGISTER_COUNT
    }

    /// Always `false`; present for API symmetry with `len`.
    pub const fn is_empty(&self) -> bool {
        false
    }
}
