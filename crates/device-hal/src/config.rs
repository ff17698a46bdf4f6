//! Board configuration and constants
//!
//! Central compile-time values for the nRF52840 device. Every module
//! references these constants rather than hardcoding pin counts, register
//! layouts or clock rates.

use crate::gpio::PinId;

/// Platform name reported in logs.
pub const PLATFORM_NAME: &str = "nRF52840";

/// Platform identifier stamped into module descriptors.
pub const PLATFORM_ID: u16 = 12;

/// HAL version (synchronized with Cargo.toml)
pub const HAL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of addressable GPIO pins (P0.00–P0.31, P1.00–P1.15).
pub const TOTAL_PINS: u16 = 48;

/// The dedicated wakeup pin (WKP, P1.03). The only pin able to bring the
/// device out of standby.
pub const WKP_PIN: PinId = PinId::new_unchecked(35);

/// Number of 32-bit backup registers retained across warm resets.
pub const BACKUP_REGISTER_COUNT: usize = 10;

/// Value returned when reading a backup register handle that does not exist.
pub const BACKUP_REGISTER_SENTINEL: u32 = 0xFFFF_FFFF;

/// Backup register layout (1-based handles).
///
/// This layout is persisted across resets and shared with the bootloader;
/// it must not change between firmware versions.
pub mod backup_layout {
    /// Boot request for the bootloader: safe mode or DFU.
    pub const BOOT_REQUEST: u32 = 1;
    /// Reset reason written by `system_reset_ex`.
    pub const RESET_REASON: u32 = 2;
    /// Reset data written by `system_reset_ex`.
    pub const RESET_DATA: u32 = 3;
    /// Persistent bootloader (OTA) request flag.
    pub const OTA_PERSIST: u32 = 10;

    /// `BOOT_REQUEST` value: enter safe mode after reset.
    pub const ENTER_SAFE_MODE_REQUEST: u32 = 0x5AFE;
    /// `BOOT_REQUEST` value: stay in DFU mode after reset.
    pub const ENTER_DFU_REQUEST: u32 = 0xEDFA;
    /// `OTA_PERSIST` value: keep entering the bootloader until cleared.
    pub const OTA_PERSIST_REQUEST: u32 = 0xFFFF;
}

/// LFCLK frequency feeding the wakeup RTC.
pub const RTC_LFCLK_HZ: u32 = 32_768;

/// RTC prescaler for the wakeup timer (12-bit). 32768 / (4095 + 1) = 8 Hz.
pub const RTC_WAKEUP_PRESCALER: u32 = 4095;

/// Wakeup timer tick rate.
#[allow(clippy::arithmetic_side_effects)]
pub const RTC_WAKEUP_TICK_HZ: u32 = RTC_LFCLK_HZ / (RTC_WAKEUP_PRESCALER + 1);

/// Largest compare value the 24-bit RTC counter can reach.
pub const RTC_MAX_TICKS: u32 = 0x00FF_FFFF;

/// RTC compare channel used for the stop-mode wakeup timer.
pub const RTC_WAKEUP_CHANNEL: u8 = 0;

/// Longest stop-mode timeout the wakeup timer can represent, in seconds.
#[allow(clippy::arithmetic_side_effects)]
pub const MAX_STOP_MODE_SECONDS: u32 = RTC_MAX_TICKS / RTC_WAKEUP_TICK_HZ;

/// Core clock (HCLK) frequency.
pub const SYSTEM_CLOCK_HZ: u32 = 64_000_000;

/// System clocks that can be queried with [`system_clock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SystemClock {
    /// CPU core clock.
    Sysclk,
    /// Peripheral bus clock (16 MHz on nRF52).
    Pclk,
    /// Low-frequency clock.
    Lfclk,
}

/// Frequency of the given system clock in Hz.
pub const fn system_clock(clock: SystemClock) -> u32 {
    match clock {
        SystemClock::Sysclk => SYSTEM_CLOCK_HZ,
        SystemClock::Pclk => 16_000_000,
        SystemClock::Lfclk => RTC_LFCLK_HZ,
    }
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn wakeup_tick_rate_is_eight_hz() {
        assert_eq!(RTC_WAKEUP_TICK_HZ, 8);
    }

    #[test]
    fn max_stop_mode_timeout_fits_24_bit_counter() {
        assert_eq!(MAX_STOP_MODE_SECONDS, 2_097_151);
        assert!(MAX_STOP_MODE_SECONDS * RTC_WAKEUP_TICK_HZ <= RTC_MAX_TICKS);
    }

    #[test]
    fn wkp_pin_is_addressable() {
        assert!(WKP_PIN.get() < TOTAL_PINS);
    }

    #[test]
    fn ota_persist_is_last_backup_register() {
        assert_eq!(backup_layout::OTA_PERSIST as usize, BACKUP_REGISTER_COUNT);
    }
}
