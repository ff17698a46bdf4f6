//! Status LED fault signalling.
//!
//! A fatal condition flashes the red LED `PanicCode::flash_count()` times,
//! pauses, and repeats forever. The pattern is generated separately from the
//! pin so it can be checked on the host.

use device_hal::{Fatal, FaultHandler, PanicCode};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

/// LED on time per flash.
pub const FLASH_ON_MS: u32 = 150;
/// LED off time between flashes.
pub const FLASH_OFF_MS: u32 = 250;
/// Dark pause after the last flash of a round.
pub const ROUND_PAUSE_MS: u32 = 1200;

/// One step of the blink pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedStep {
    /// Drive the LED on for this many milliseconds.
    On(u32),
    /// Hold the LED off for this many milliseconds.
    Off(u32),
}

/// One round of the pattern for `code`: `n` on/off pairs, the last off
/// stretched to the round pause.
pub fn blink_pattern(code: PanicCode) -> impl Iterator<Item = LedStep> {
    let flashes = code.flash_count();
    (1..=flashes).flat_map(move |flash| {
        let off = if flash == flashes {
            ROUND_PAUSE_MS
        } else {
            FLASH_OFF_MS
        };
        [LedStep::On(FLASH_ON_MS), LedStep::Off(off)]
    })
}

/// [`FaultHandler`] that blinks a status LED.
pub struct LedFaultHandler<L, D> {
    led: L,
    delay: D,
}

impl<L, D> LedFaultHandler<L, D>
where
    L: OutputPin,
    D: DelayNs,
{
    /// Take ownership of the LED and a blocking delay.
    pub fn new(led: L, delay: D) -> Self {
        Self { led, delay }
    }

    /// Play one round of the pattern for `code`.
    ///
    /// Pin errors are ignored: there is nothing left to report them to.
    pub fn signal(&mut self, code: PanicCode) {
        for step in blink_pattern(code) {
            match step {
                LedStep::On(ms) => {
                    let _ = self.led.set_high();
                    self.delay.delay_ms(ms);
                }
                LedStep::Off(ms) => {
                    let _ = self.led.set_low();
                    self.delay.delay_ms(ms);
                }
            }
        }
    }

    /// Release the LED and delay.
    pub fn into_parts(self) -> (L, D) {
        (self.led, self.delay)
    }
}

impl<L, D> FaultHandler for LedFaultHandler<L, D>
where
    L: OutputPin,
    D: DelayNs,
{
    fn halt(&mut self, fatal: Fatal) -> ! {
        #[cfg(feature = "hardware")]
        {
            cortex_m::interrupt::disable();
            defmt::error!("halting: {:?} (code {})", fatal, fatal.panic_code().flash_count());
        }
        let code = fatal.panic_code();
        loop {
            self.signal(code);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingLed {
        levels: std::vec::Vec<bool>,
    }

    impl embedded_hal::digital::ErrorType for RecordingLed {
        type Error = core::convert::Infallible;
    }

    impl OutputPin for RecordingLed {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.levels.push(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.levels.push(true);
            Ok(())
        }
    }

    #[derive(Default)]
    struct TotalDelay {
        ns: u64,
    }

    impl DelayNs for TotalDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.ns = self.ns.saturating_add(u64::from(ns));
        }
    }

    #[test]
    fn pattern_flashes_code_times() {
        let steps: std::vec::Vec<_> = blink_pattern(PanicCode::UsageFault).collect();
        assert_eq!(steps.len(), 10);
        let flashes = steps.iter().filter(|s| matches!(s, LedStep::On(_))).count();
        assert_eq!(flashes, 5);
    }

    #[test]
    fn pattern_ends_with_round_pause() {
        let last = blink_pattern(PanicCode::HardFault).last().unwrap();
        assert_eq!(last, LedStep::Off(ROUND_PAUSE_MS));
        let steps: std::vec::Vec<_> = blink_pattern(PanicCode::HardFault).collect();
        assert_eq!(steps, [LedStep::On(FLASH_ON_MS), LedStep::Off(ROUND_PAUSE_MS)]);
    }

    #[test]
    fn signal_drives_led_and_waits() {
        let mut handler = LedFaultHandler::new(RecordingLed::default(), TotalDelay::default());
        handler.signal(PanicCode::BusFault);
        let (led, delay) = handler.into_parts();
        assert_eq!(led.levels, [true, false, true, false, true, false, true, false]);
        let expected_ms = 4 * FLASH_ON_MS + 3 * FLASH_OFF_MS + ROUND_PAUSE_MS;
        assert_eq!(delay.ns, u64::from(expected_ms) * 1_000_000);
    }
}
