//! Stop/standby mode sequencer.
//!
//! Stop mode, in order:
//!
//! 1. Validate the request (no side effects on rejection)
//! 2. Stop the system tick
//! 3. Quiesce USB, the alarm RTC and external flash; drain UARTs
//! 4. Inside a critical region: clear the wakeup state, release HFCLK,
//!    suspend GPIO dispatch, arm wakeup pins and timer
//! 5. Leave the critical region, clear FPU exceptions
//! 6. Wait for events until a wakeup source has fired
//! 7. Resolve the reason, disarm every source
//! 8. Restore HFCLK, GPIO dispatch, flash, alarm RTC, USB, system tick
//!
//! Once step 4 starts, a collaborator failure is a [`SleepError::Fatal`]:
//! the half-configured state is never unwound.
//!
//! The wait in step 6 halts the whole CPU, not just the calling task.

use heapless::Vec;

use crate::config::{RTC_WAKEUP_CHANNEL, TOTAL_PINS, WKP_PIN};
use crate::error::{HalError, HardwareFault, SleepError};
use crate::gpio::{InterruptMode, PinId};
use crate::power::{LowPowerPlatform, StandbyFlags};
use crate::timer::seconds_to_ticks;
use crate::wakeup::{WakeupInfo, WakeupReason};

const MAX_WAKEUP_PINS: usize = TOTAL_PINS as usize;

/// Stop-mode request: wakeup pins with their trigger modes and an optional
/// timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopModeRequest<'a> {
    /// Raw pin numbers to wake on.
    pub pins: &'a [u16],
    /// Trigger mode per pin. When shorter than `pins`, the last mode applies
    /// to the remaining pins.
    pub edge_modes: &'a [InterruptMode],
    /// Wake after this many seconds; `0` disables the timer.
    pub timeout_seconds: u32,
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WakeupPlan {
    pins: Vec<(PinId, InterruptMode), MAX_WAKEUP_PINS>,
    timer_ticks: Option<u32>,
}

impl WakeupPlan {
    /// Pins to arm with their modes.
    pub fn pins(&self) -> &[(PinId, InterruptMode)] {
        &self.pins
    }

    /// Timer compare value, if a timeout was requested.
    pub fn timer_ticks(&self) -> Option<u32> {
        self.timer_ticks
    }
}

impl StopModeRequest<'_> {
    /// Check every pin, mode and the timeout before any hardware is touched.
    pub fn validate(&self) -> Result<WakeupPlan, HalError> {
        if self.pins.is_empty() && self.timeout_seconds == 0 {
            return Err(HalError::InvalidArgument);
        }
        if !self.pins.is_empty() && self.edge_modes.is_empty() {
            return Err(HalError::InvalidArgument);
        }
        if self.edge_modes.iter().any(|mode| !mode.is_edge()) {
            return Err(HalError::InvalidArgument);
        }

        let mut pins = Vec::new();
        for (i, &raw) in self.pins.iter().enumerate() {
            let pin = PinId::new(raw)?;
            let mode = self
                .edge_modes
                .get(i)
                .or_else(|| self.edge_modes.last())
                .copied()
                .ok_or(HalError::InvalidArgument)?;
            if pins.iter().any(|(armed, _)| *armed == pin) {
                return Err(HalError::InvalidArgument);
            }
            pins.push((pin, mode))
                .map_err(|_| HalError::InvalidArgument)?;
        }

        let timer_ticks = match self.timeout_seconds {
            0 => None,
            seconds => Some(seconds_to_ticks(seconds)?),
        };

        Ok(WakeupPlan { pins, timer_ticks })
    }
}

/// What was actually armed, for teardown and restore.
struct Armed {
    pins: Vec<PinId, MAX_WAKEUP_PINS>,
    timer: bool,
    hfclk_was_running: bool,
}

/// Enter stop mode and block until a configured source wakes the CPU.
///
/// Returns the winning source; a pin beats the timer when both fired.
pub fn enter_stop_mode<P>(
    platform: &mut P,
    wakeup: &'static WakeupInfo,
    request: &StopModeRequest<'_>,
) -> Result<WakeupReason, SleepError>
where
    P: LowPowerPlatform + ?Sized,
{
    let plan = request.validate()?;
    debug!(
        "stop mode: {} pins, timeout {} s",
        plan.pins.len(),
        request.timeout_seconds
    );

    platform.systick_disable();
    platform.usb_detach();
    platform.alarm_rtc_suspend();
    platform.external_flash_sleep();
    platform.uart_flush_all();

    let armed = critical_section::with(|_| arm(platform, wakeup, &plan))?;

    let fpu = platform.fpu_prepare_sleep();
    if fpu.has_critical() {
        error!("critical FPU exception latched before sleep: {}", fpu.bits());
        return Err(HardwareFault::FpuException(fpu).into());
    }

    while !wakeup.has_fired() {
        platform.wait_for_event();
    }

    let reason = wakeup.resolve(!armed.pins.is_empty(), armed.timer);
    disarm(platform, &armed)?;
    restore(platform, &armed)?;

    match reason {
        Ok(reason) => {
            info!("woke from stop mode: {:?}", reason);
            Ok(reason)
        }
        Err(err) => {
            warn!("stop mode exited by an unarmed source: {}", wakeup.sources().bits());
            Err(err.into())
        }
    }
}

fn arm<P>(
    platform: &mut P,
    wakeup: &'static WakeupInfo,
    plan: &WakeupPlan,
) -> Result<Armed, HardwareFault>
where
    P: LowPowerPlatform + ?Sized,
{
    wakeup.reset();

    let hfclk_was_running = platform.hfclk_running();
    if hfclk_was_running {
        platform.hfclk_release()?;
    }

    platform.suspend();

    let mut armed = Armed {
        pins: Vec::new(),
        timer: false,
        hfclk_was_running,
    };

    for &(pin, mode) in plan.pins() {
        platform.attach(pin, mode, wakeup)?;
        // Capacity equals the plan's, so this cannot fail.
        let _ = armed.pins.push(pin);
    }

    if let Some(ticks) = plan.timer_ticks() {
        platform.init(wakeup)?;
        platform.set_compare(RTC_WAKEUP_CHANNEL, ticks)?;
        platform.enable();
        armed.timer = true;
    }

    Ok(armed)
}

fn disarm<P>(platform: &mut P, armed: &Armed) -> Result<(), HardwareFault>
where
    P: LowPowerPlatform + ?Sized,
{
    for &pin in &armed.pins {
        platform.detach(pin)?;
    }
    if armed.timer {
        platform.uninit();
    }
    Ok(())
}

fn restore<P>(platform: &mut P, armed: &Armed) -> Result<(), HardwareFault>
where
    P: LowPowerPlatform + ?Sized,
{
    if armed.hfclk_was_running {
        platform.hfclk_request()?;
    }
    platform.restore();
    platform.external_flash_wake();
    platform.alarm_rtc_resume();
    platform.usb_attach();
    platform.systick_enable();
    Ok(())
}

/// Enter standby (power-off) mode.
///
/// Only the WKP pin can wake the device, by level sense; the RTC does not
/// survive power-off, so any timeout is rejected. On hardware this never
/// returns: the wakeup shows up after reset as
/// [`ResetReason::PowerManagement`](crate::reset::ResetReason::PowerManagement).
pub fn enter_standby_mode<P>(
    platform: &mut P,
    seconds: u32,
    flags: StandbyFlags,
) -> Result<(), SleepError>
where
    P: LowPowerPlatform + ?Sized,
{
    if seconds > 0 || flags.disable_wkp_pin {
        return Err(HalError::Unsupported.into());
    }

    info!("entering standby, wake on WKP");

    platform.systick_disable();
    platform.usb_detach();
    platform.alarm_rtc_suspend();
    platform.external_flash_sleep();
    platform.uart_flush_all();

    critical_section::with(|_| {
        platform.suspend();
        platform.configure_sense(WKP_PIN, InterruptMode::HighLevel)
    })?;

    platform.power_off();
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request<'a>(pins: &'a [u16], modes: &'a [InterruptMode], secs: u32) -> StopModeRequest<'a> {
        StopModeRequest {
            pins,
            edge_modes: modes,
            timeout_seconds: secs,
        }
    }

    #[test]
    fn no_source_is_invalid() {
        assert_eq!(request(&[], &[], 0).validate(), Err(HalError::InvalidArgument));
    }

    #[test]
    fn timer_only_is_valid() {
        let plan = request(&[], &[], 10).validate().unwrap();
        assert!(plan.pins().is_empty());
        assert_eq!(plan.timer_ticks(), Some(80));
    }

    #[test]
    fn pins_without_modes_are_invalid() {
        assert_eq!(request(&[3], &[], 0).validate(), Err(HalError::InvalidArgument));
    }

    #[test]
    fn last_mode_is_reused_for_remaining_pins() {
        let plan = request(&[1, 2, 3], &[InterruptMode::RisingEdge, InterruptMode::FallingEdge], 0)
            .validate()
            .unwrap();
        let modes: std::vec::Vec<_> = plan.pins().iter().map(|(_, m)| *m).collect();
        assert_eq!(
            modes,
            [
                InterruptMode::RisingEdge,
                InterruptMode::FallingEdge,
                InterruptMode::FallingEdge
            ]
        );
    }

    #[test]
    fn out_of_range_pin_is_invalid() {
        assert_eq!(
            request(&[TOTAL_PINS], &[InterruptMode::RisingEdge], 0).validate(),
            Err(HalError::InvalidArgument)
        );
    }

    #[test]
    fn level_mode_is_invalid_for_stop() {
        assert_eq!(
            request(&[4], &[InterruptMode::LowLevel], 0).validate(),
            Err(HalError::InvalidArgument)
        );
    }

    #[test]
    fn unused_trailing_mode_is_still_checked() {
        assert_eq!(
            request(&[1], &[InterruptMode::RisingEdge, InterruptMode::LowLevel], 0).validate(),
            Err(HalError::InvalidArgument)
        );
        assert_eq!(
            request(&[], &[InterruptMode::HighLevel], 5).validate(),
            Err(HalError::InvalidArgument)
        );
    }

    #[test]
    fn duplicate_pin_is_invalid() {
        assert_eq!(
            request(&[4, 4], &[InterruptMode::BothEdges], 0).validate(),
            Err(HalError::InvalidArgument)
        );
    }
}
