//! Reset-reason classification.
//!
//! Runs once per boot, before the scheduler starts. The hardware reset-cause
//! register is mapped to a canonical [`ResetReason`]; a software reset
//! bypasses the priority list and restores the `{reason, data}` pair that
//! `system_reset_ex` parked in the backup registers before resetting. The
//! parked pair is cleared on every boot, whatever the cause, and so are the
//! hardware flags.

use crate::backup::BackupRegisters;
use crate::config::backup_layout;

/// Canonical reset reasons. Discriminants are persisted in backup
/// registers and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum ResetReason {
    /// No reason recorded.
    None = 0,
    /// Cause could not be determined.
    Unknown = 10,
    /// External reset pin.
    PinReset = 20,
    /// Wake from a low-power state (standby / system off).
    PowerManagement = 30,
    /// Power-on after power was removed.
    PowerDown = 40,
    /// Supply brownout.
    PowerBrownout = 50,
    /// Hardware watchdog.
    Watchdog = 60,
    /// Successful firmware update.
    Update = 70,
    /// Firmware update failed.
    UpdateError = 80,
    /// Firmware update timed out.
    UpdateTimeout = 90,
    /// Factory reset requested.
    FactoryReset = 100,
    /// Safe mode requested.
    SafeMode = 110,
    /// DFU mode requested.
    DfuMode = 120,
    /// System panic.
    Panic = 130,
    /// Application-requested reset.
    User = 140,
}

impl ResetReason {
    /// Decode a persisted value. Unrecognised values decode as `Unknown`.
    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::None,
            20 => Self::PinReset,
            30 => Self::PowerManagement,
            40 => Self::PowerDown,
            50 => Self::PowerBrownout,
            60 => Self::Watchdog,
            70 => Self::Update,
            80 => Self::UpdateError,
            90 => Self::UpdateTimeout,
            100 => Self::FactoryReset,
            110 => Self::SafeMode,
            120 => Self::DfuMode,
            130 => Self::Panic,
            140 => Self::User,
            _ => Self::Unknown,
        }
    }

    /// Persisted representation.
    pub const fn as_raw(self) -> u32 {
        self as u32
    }
}

/// Reset reason plus software-supplied detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResetInfo {
    /// Why the device reset.
    pub reason: ResetReason,
    /// Detail supplied with a software reset; `0` for hardware causes.
    pub data: u32,
}

/// Hardware reset-cause flags, normalised across chips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResetFlags(u32);

impl ResetFlags {
    /// Reset pin asserted.
    pub const PIN: Self = Self(1 << 0);
    /// Watchdog expired.
    pub const WATCHDOG: Self = Self(1 << 1);
    /// Software-requested reset (SYSRESETREQ).
    pub const SOFTWARE: Self = Self(1 << 2);
    /// Woke from a low-power state.
    pub const POWER_MANAGEMENT: Self = Self(1 << 3);
    /// Power-on / power-down reset.
    pub const POWER_DOWN: Self = Self(1 << 4);
    /// Brownout detector.
    pub const BROWNOUT: Self = Self(1 << 5);

    /// No flags.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// `true` if all bits in `other` are set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    /// Union of two flag sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// Read-only reset-cause register collaborator, plus its clear operation.
pub trait ResetCause {
    /// Current reset-cause flags.
    fn reset_flags(&self) -> ResetFlags;

    /// Clear all reset-cause flags.
    fn clear_reset_flags(&mut self);
}

/// Hardware causes in priority order, consulted when the reset was not
/// software-requested.
const HARDWARE_PRIORITY: [(ResetFlags, ResetReason); 5] = [
    (ResetFlags::WATCHDOG, ResetReason::Watchdog),
    (ResetFlags::POWER_MANAGEMENT, ResetReason::PowerManagement),
    (ResetFlags::POWER_DOWN, ResetReason::PowerDown),
    (ResetFlags::BROWNOUT, ResetReason::PowerBrownout),
    (ResetFlags::PIN, ResetReason::PinReset),
];

/// Classify a reset. A software reset restores the parked pair; any other
/// cause reports `data == 0`. The parked pair is single-use and cleared on
/// every classification.
///
/// Does not clear the hardware flags; see [`classify_and_clear`].
pub fn classify(flags: ResetFlags, backup: &mut BackupRegisters<'_>) -> ResetInfo {
    let parked_reason = backup.take(backup_layout::RESET_REASON);
    let parked_data = backup.take(backup_layout::RESET_DATA);

    if flags.contains(ResetFlags::SOFTWARE) {
        return ResetInfo {
            reason: ResetReason::from_raw(parked_reason),
            data: parked_data,
        };
    }

    let reason = HARDWARE_PRIORITY
        .iter()
        .find(|(flag, _)| flags.contains(*flag))
        .map_or(ResetReason::Unknown, |(_, reason)| *reason);

    ResetInfo { reason, data: 0 }
}

/// Classify using `cause`, then clear its flags.
pub fn classify_and_clear<C: ResetCause + ?Sized>(
    cause: &mut C,
    backup: &mut BackupRegisters<'_>,
) -> ResetInfo {
    let flags = cause.reset_flags();
    let info = classify(flags, backup);
    cause.clear_reset_flags();
    debug!("reset flags {} classified as {:?}", flags.bits(), info.reason);
    info
}
