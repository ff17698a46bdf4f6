//! Global allocator: a linked-list heap behind the reentrant heap guard.
//!
//! Each allocator call runs with interrupts masked, so a handler can never
//! observe the free list mid-update. Context ids come from IPSR, so thread
//! mode and each exception handler are distinct owners for the recursion
//! count.

use core::mem::MaybeUninit;
use core::num::NonZeroUsize;
use core::ptr::addr_of_mut;
use core::sync::atomic::{AtomicBool, Ordering};

use device_hal::GuardedAlloc;
use linked_list_allocator::LockedHeap;

/// Heap size in bytes.
pub const HEAP_SIZE: usize = 16 * 1024;

static mut HEAP: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];

static INITIALISED: AtomicBool = AtomicBool::new(false);

#[global_allocator]
static ALLOCATOR: GuardedAlloc<LockedHeap> = GuardedAlloc::new(LockedHeap::empty(), current_context);

/// Active exception number plus one; thread mode is 1.
fn current_context() -> NonZeroUsize {
    let ipsr: u32;
    // SAFETY: reading IPSR has no side effects.
    unsafe {
        core::arch::asm!("mrs {}, IPSR", out(reg) ipsr, options(nomem, nostack, preserves_flags));
    }
    let exception = (ipsr & 0x1FF) as usize;
    NonZeroUsize::new(exception.saturating_add(1)).unwrap_or(NonZeroUsize::MIN)
}

/// Boot step 3: hand the heap region to the allocator and arm the guard.
/// Later calls do nothing.
pub fn init() {
    if INITIALISED.swap(true, Ordering::AcqRel) {
        return;
    }
    // SAFETY: `HEAP` is used only here, once, and lives for the program.
    unsafe {
        ALLOCATOR
            .inner()
            .lock()
            .init(addr_of_mut!(HEAP).cast::<u8>(), HEAP_SIZE);
    }
    ALLOCATOR.lock().activate();
    defmt::debug!("heap: {} bytes, guard active", HEAP_SIZE);
}
