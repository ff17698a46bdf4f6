//! Status LED and busy-wait delay for fault signalling.

use core::convert::Infallible;

use device_hal::config::SYSTEM_CLOCK_HZ;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};
use nrf52840_pac as pac;

/// Red status LED, P0.13.
pub const STATUS_LED_PIN: usize = 13;

/// PIN_CNF: DIR = output, INPUT = disconnect.
const PIN_CNF_OUTPUT: u32 = 0b11;

/// The red status LED. Logical high lights it; the line is active-low.
pub struct StatusLed {
    mask: u32,
}

impl StatusLed {
    /// Configure P0.13 as an output with the LED off.
    ///
    /// Steals P0: also used from fault handlers after the board owns the port.
    pub fn new() -> Self {
        // SAFETY: OUTSET/OUTCLR/PIN_CNF writes for this one pin don't race
        // with other users of the port, which never drive P0.13.
        let p0 = unsafe { &*pac::P0::ptr() };
        let mask = 1 << STATUS_LED_PIN;
        // SAFETY: OUTSET accepts any mask.
        p0.outset.write(|w| unsafe { w.bits(mask) });
        if let Some(cnf) = p0.pin_cnf.get(STATUS_LED_PIN) {
            // SAFETY: output, input buffer disconnected.
            cnf.write(|w| unsafe { w.bits(PIN_CNF_OUTPUT) });
        }
        Self { mask }
    }

    fn port() -> &'static pac::p0::RegisterBlock {
        // SAFETY: see `new`.
        unsafe { &*pac::P0::ptr() }
    }
}

impl Default for StatusLed {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorType for StatusLed {
    type Error = Infallible;
}

impl OutputPin for StatusLed {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        // SAFETY: OUTSET accepts any mask.
        Self::port().outset.write(|w| unsafe { w.bits(self.mask) });
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        // SAFETY: OUTCLR accepts any mask.
        Self::port().outclr.write(|w| unsafe { w.bits(self.mask) });
        Ok(())
    }
}

/// Cycle-counting delay at the CPU clock. Works with interrupts disabled.
#[derive(Default)]
pub struct CycleDelay;

impl DelayNs for CycleDelay {
    fn delay_ns(&mut self, ns: u32) {
        let cycles = u64::from(ns)
            .saturating_mul(u64::from(SYSTEM_CLOCK_HZ))
            .checked_div(1_000_000_000)
            .unwrap_or(0);
        cortex_m::asm::delay(u32::try_from(cycles).unwrap_or(u32::MAX));
    }
}
