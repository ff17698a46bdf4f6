//! Boot sequence for the nRF52840 firmware.
//!
//! Initialization order (MUST be respected):
//!   1. Relocate the vector table to the application image
//!   2. Configure system control (divide-by-zero trap, fault handlers)
//!   3. Initialise the reentrant heap guard
//!   4. Load feature flags from the configuration page
//!   5. Classify the reset reason (if the reset-info feature is enabled)
//!   6. Spawn the application task
//!
//! Steps 4 and 5 are [`init_core`], which only needs the HAL traits and runs
//! on the host against `device_hal::mocks`. Steps 1–3 are register writes in
//! [`hardware`].
//!
//! # Safety
//! Steps 1–3 must run from privileged thread mode before the executor starts.

use device_hal::{
    BackupRegisters, BackupSlots, ConfigStore, FeatureFlags, HalCore, LowPowerPlatform,
    ResetFlags, WakeupInfo,
};

/// Ordered boot steps. Kept in sync with the module docs.
pub const BOOT_SEQUENCE_STEPS: &[&str] = &[
    "relocate vector table",
    "configure system control",
    "init reentrant heap guard",
    "load feature flags",
    "classify reset reason",
    "spawn application task",
];

/// `true` when RAM (and so the backup registers) survived the reset.
///
/// Power-on and brown-out resets start with undefined RAM. Everything else,
/// including wake from system OFF with retention enabled, keeps it.
pub fn is_warm_start(flags: ResetFlags) -> bool {
    !flags.contains(ResetFlags::POWER_DOWN) && !flags.contains(ResetFlags::BROWNOUT)
}

/// Boot steps 4 and 5: build the HAL core and classify the reset.
///
/// On a cold start the retained slots hold garbage and are zeroed before
/// anything reads them.
pub fn init_core<'r, P, S>(
    platform: P,
    slots: &'r mut BackupSlots,
    wakeup: &'static WakeupInfo,
    store: S,
) -> HalCore<'r, P, S>
where
    P: LowPowerPlatform,
    S: ConfigStore,
{
    let flags = platform.reset_flags();
    let warm = is_warm_start(flags);
    if !warm {
        slots.fill(0);
    }

    let features = FeatureFlags::new(store, warm);
    let mut core = HalCore::new(platform, BackupRegisters::new(slots), wakeup, features);

    let info = core.init_reset_info();
    #[cfg(not(feature = "hardware"))]
    let _ = info;
    #[cfg(feature = "hardware")]
    match info {
        Some(info) => defmt::info!(
            "boot: warm={} reset reason {:?} data {}",
            warm,
            info.reason,
            info.data
        ),
        None => defmt::info!("boot: warm={} reset info disabled", warm),
    }
    core
}

/// Register-level boot steps. Hardware target only.
#[cfg(feature = "hardware")]
pub mod hardware {
    use cortex_m::peripheral::SCB;

    /// CCR: trap integer divide by zero.
    const CCR_DIV_0_TRP: u32 = 1 << 4;
    /// SHCSR: enable MemManage, BusFault and UsageFault handlers.
    const SHCSR_FAULT_ENABLES: u32 = (1 << 16) | (1 << 17) | (1 << 18);

    extern "C" {
        static __vector_table: u32;
    }

    /// Step 1: point VTOR at this image's vector table.
    pub fn relocate_vector_table(scb: &mut SCB) {
        let table = core::ptr::addr_of!(__vector_table) as u32;
        // SAFETY: the table is the one cortex-m-rt linked into this image and
        // no exception is taken between boot and this write.
        unsafe { scb.vtor.write(table) };
        cortex_m::asm::dsb();
        cortex_m::asm::isb();
    }

    /// Step 2: enable the divide-by-zero trap and the configurable fault
    /// handlers so they report instead of escalating to HardFault.
    pub fn configure_system(scb: &mut SCB) {
        // SAFETY: read-modify-write of architectural control bits from
        // privileged thread mode.
        unsafe {
            scb.ccr.modify(|ccr| ccr | CCR_DIV_0_TRP);
            scb.shcsr.modify(|shcsr| shcsr | SHCSR_FAULT_ENABLES);
        }
        cortex_m::asm::dsb();
        cortex_m::asm::isb();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boot_sequence_order_is_documented() {
        assert_eq!(BOOT_SEQUENCE_STEPS.len(), 6);
        let position = |step: &str| BOOT_SEQUENCE_STEPS.iter().position(|s| *s == step);
        assert!(position("init reentrant heap guard") < position("load feature flags"));
        assert!(position("load feature flags") < position("classify reset reason"));
        assert_eq!(BOOT_SEQUENCE_STEPS.last(), Some(&"spawn application task"));
    }

    #[test]
    fn power_on_and_brownout_are_cold() {
        assert!(!is_warm_start(ResetFlags::POWER_DOWN));
        assert!(!is_warm_start(ResetFlags::BROWNOUT));
        assert!(!is_warm_start(ResetFlags::POWER_DOWN.union(ResetFlags::PIN)));
    }

    #[test]
    fn other_resets_are_warm() {
        for flags in [
            ResetFlags::PIN,
            ResetFlags::WATCHDOG,
            ResetFlags::SOFTWARE,
            ResetFlags::POWER_MANAGEMENT,
            ResetFlags::empty(),
        ] {
            assert!(is_warm_start(flags), "{flags:?}");
        }
    }
}
