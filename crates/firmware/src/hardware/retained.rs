//! Retained RAM backing the backup registers.
//!
//! The slots live in `.uninit`, which cortex-m-rt neither zeroes nor
//! initialises, so they keep their contents across warm resets. Cold starts
//! are zeroed by `boot::init_core`.

use core::mem::MaybeUninit;
use core::ptr::addr_of_mut;
use core::sync::atomic::{AtomicBool, Ordering};

use device_hal::BackupSlots;

#[link_section = ".uninit.backup_registers"]
static mut BACKUP_SLOTS: MaybeUninit<BackupSlots> = MaybeUninit::uninit();

static TAKEN: AtomicBool = AtomicBool::new(false);

/// Hand out the retained slots. Returns `None` after the first call.
pub fn take() -> Option<&'static mut BackupSlots> {
    if TAKEN.swap(true, Ordering::AcqRel) {
        return None;
    }
    // SAFETY: the flag above makes this the only reference ever created.
    // Every bit pattern is a valid `[u32; N]`; garbage after a cold start is
    // cleared before use.
    Some(unsafe { (*addr_of_mut!(BACKUP_SLOTS)).assume_init_mut() })
}
