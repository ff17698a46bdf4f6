//! Wakeup timer collaborator and timeout conversion.

use crate::config::{MAX_STOP_MODE_SECONDS, RTC_WAKEUP_TICK_HZ};
use crate::error::{HalError, HardwareFault};
use crate::wakeup::WakeupSink;

/// Countdown timer able to wake the CPU from stop mode.
///
/// Compare matches are reported to the sink registered in
/// [`init`](Self::init) as [`WakeupEvent::Timer`](crate::wakeup::WakeupEvent::Timer).
pub trait WakeupTimer {
    /// Power up the timer, reset its counter and bind its compare interrupt.
    fn init(&mut self, sink: &'static dyn WakeupSink) -> Result<(), HardwareFault>;

    /// Program compare `channel` to fire after `ticks`.
    fn set_compare(&mut self, channel: u8, ticks: u32) -> Result<(), HardwareFault>;

    /// Start counting.
    fn enable(&mut self);

    /// Stop counting, unbind the interrupt and power the timer down.
    fn uninit(&mut self);
}

/// Convert a stop-mode timeout into wakeup timer ticks.
///
/// Rejects timeouts the 24-bit counter cannot represent.
pub fn seconds_to_ticks(seconds: u32) -> Result<u32, HalError> {
    if seconds > MAX_STOP_MODE_SECONDS {
        return Err(HalError::InvalidArgument);
    }
    seconds
        .checked_mul(RTC_WAKEUP_TICK_HZ)
        .ok_or(HalError::InvalidArgument)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RTC_MAX_TICKS;

    #[test]
    fn one_second_is_eight_ticks() {
        assert_eq!(seconds_to_ticks(1), Ok(8));
    }

    #[test]
    fn longest_timeout_fits() {
        let ticks = seconds_to_ticks(MAX_STOP_MODE_SECONDS);
        assert!(matches!(ticks, Ok(t) if t <= RTC_MAX_TICKS));
    }

    #[test]
    fn too_long_timeout_is_rejected() {
        assert_eq!(
            seconds_to_ticks(MAX_STOP_MODE_SECONDS.saturating_add(1)),
            Err(HalError::InvalidArgument)
        );
        assert_eq!(seconds_to_ticks(u32::MAX), Err(HalError::InvalidArgument));
    }
}
