//! Process-wide HAL state.
//!
//! [`HalCore`] owns the board, the backup registers, the last reset info and
//! the feature flags, and borrows the `'static` [`WakeupInfo`] that wakeup
//! interrupts write into. There is exactly one per firmware image, created
//! during boot.

use crate::backup::BackupRegisters;
use crate::config::backup_layout;
use crate::error::{HalError, SleepError};
use crate::features::{ConfigStore, Feature, FeatureFlags};
use crate::gpio::InterruptMode;
use crate::power::{LowPowerPlatform, StandbyFlags};
use crate::reset::{classify_and_clear, ResetInfo, ResetReason};
use crate::sleep::{self, StopModeRequest};
use crate::wakeup::{WakeupInfo, WakeupReason};

/// Core runtime.
pub struct HalCore<'r, P, S> {
    platform: P,
    backup: BackupRegisters<'r>,
    wakeup: &'static WakeupInfo,
    features: FeatureFlags<S>,
    last_reset: Option<ResetInfo>,
}

impl<'r, P, S> HalCore<'r, P, S>
where
    P: LowPowerPlatform,
    S: ConfigStore,
{
    /// Assemble the runtime. Call [`init_reset_info`](Self::init_reset_info)
    /// once before the scheduler starts.
    pub fn new(
        platform: P,
        backup: BackupRegisters<'r>,
        wakeup: &'static WakeupInfo,
        features: FeatureFlags<S>,
    ) -> Self {
        Self {
            platform,
            backup,
            wakeup,
            features,
            last_reset: None,
        }
    }

    /// Classify the reset that started this boot, if reset info is enabled.
    pub fn init_reset_info(&mut self) -> Option<ResetInfo> {
        if !self.features.get(Feature::ResetInfo) {
            debug!("reset info disabled, classifier skipped");
            return None;
        }
        let info = classify_and_clear(&mut self.platform, &mut self.backup);
        info!("reset reason {} data {}", info.reason.as_raw(), info.data);
        self.last_reset = Some(info);
        Some(info)
    }

    /// Reset info captured at boot.
    pub fn reset_info(&self) -> Result<ResetInfo, HalError> {
        self.last_reset.ok_or(HalError::Unsupported)
    }

    /// Read backup register `index` (1-based).
    pub fn read_backup_register(&self, index: u32) -> u32 {
        self.backup.read(index)
    }

    /// Write backup register `index` (1-based).
    pub fn write_backup_register(&mut self, index: u32, value: u32) {
        self.backup.write(index, value);
    }

    /// Request a plain software reset, reported next boot as
    /// [`ResetReason::User`] with no data.
    pub fn system_reset(&mut self) {
        self.system_reset_ex(ResetReason::User, 0);
    }

    /// Park `{reason, data}` for the next boot, then reset.
    pub fn system_reset_ex(&mut self, reason: ResetReason, data: u32) {
        if self.features.get(Feature::ResetInfo) {
            self.backup.write(backup_layout::RESET_REASON, reason.as_raw());
            self.backup.write(backup_layout::RESET_DATA, data);
        }
        info!("system reset: reason {} data {}", reason.as_raw(), data);
        self.platform.system_reset();
    }

    /// Reset into safe mode.
    pub fn enter_safe_mode(&mut self) {
        self.backup
            .write(backup_layout::BOOT_REQUEST, backup_layout::ENTER_SAFE_MODE_REQUEST);
        self.system_reset_ex(ResetReason::SafeMode, 0);
    }

    /// Reset into the bootloader. With `persist` the bootloader stays in
    /// OTA mode across its own resets.
    pub fn enter_bootloader(&mut self, persist: bool) {
        if persist {
            self.backup
                .write(backup_layout::OTA_PERSIST, backup_layout::OTA_PERSIST_REQUEST);
        } else {
            self.backup
                .write(backup_layout::BOOT_REQUEST, backup_layout::ENTER_DFU_REQUEST);
        }
        self.system_reset_ex(ResetReason::DfuMode, 0);
    }

    /// Reset with a factory-reset request.
    pub fn factory_reset(&mut self) {
        self.system_reset_ex(ResetReason::FactoryReset, 0);
    }

    /// See [`sleep::enter_stop_mode`].
    pub fn enter_stop_mode(
        &mut self,
        request: &StopModeRequest<'_>,
    ) -> Result<WakeupReason, SleepError> {
        sleep::enter_stop_mode(&mut self.platform, self.wakeup, request)
    }

    /// Single-pin form of [`enter_stop_mode`](Self::enter_stop_mode).
    /// `pin == None` sleeps on the timer alone and ignores `mode`.
    pub fn enter_stop_mode_pin(
        &mut self,
        pin: Option<u16>,
        mode: InterruptMode,
        seconds: u32,
    ) -> Result<WakeupReason, SleepError> {
        let (pins, edge_modes): (&[u16], &[InterruptMode]) = match &pin {
            Some(pin) => (core::slice::from_ref(pin), core::slice::from_ref(&mode)),
            None => (&[], &[]),
        };
        let request = StopModeRequest {
            pins,
            edge_modes,
            timeout_seconds: seconds,
        };
        self.enter_stop_mode(&request)
    }

    /// See [`sleep::enter_standby_mode`].
    pub fn enter_standby_mode(
        &mut self,
        seconds: u32,
        flags: StandbyFlags,
    ) -> Result<(), SleepError> {
        sleep::enter_standby_mode(&mut self.platform, seconds, flags)
    }

    /// Shared wakeup state.
    pub fn wakeup_info(&self) -> &'static WakeupInfo {
        self.wakeup
    }

    /// Feature flags.
    pub fn features(&self) -> &FeatureFlags<S> {
        &self.features
    }

    /// Feature flags, mutable.
    pub fn features_mut(&mut self) -> &mut FeatureFlags<S> {
        &mut self.features
    }

    /// The board.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// The board, mutable.
    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }
}
