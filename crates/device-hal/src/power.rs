//! Power management abstraction
//!
//! The collaborators the stop/standby sequencer drives: peripherals that
//! must be quiesced around sleep and the CPU-level controls (system tick,
//! high-frequency clock, FPU, wait-for-event, power-off).

use crate::error::HardwareFault;
use crate::fpu::FpuFlags;
use crate::gpio::PinInterrupts;
use crate::reset::ResetCause;
use crate::timer::WakeupTimer;

/// Standby options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StandbyFlags {
    /// Do not arm the WKP pin.
    pub disable_wkp_pin: bool,
}

impl StandbyFlags {
    /// Flag bit for `disable_wkp_pin` in the raw representation.
    pub const DISABLE_WKP_PIN: u32 = 0x01;

    /// Decode raw flag bits. Unknown bits are ignored.
    pub const fn from_bits(bits: u32) -> Self {
        Self {
            disable_wkp_pin: bits & Self::DISABLE_WKP_PIN != 0,
        }
    }
}

/// Peripherals quiesced around sleep. Every call is idempotent.
pub trait PeripheralControl {
    /// Detach from the USB bus.
    fn usb_detach(&mut self);

    /// Re-attach to the USB bus.
    fn usb_attach(&mut self);

    /// Suspend the always-on alarm RTC's interrupts.
    fn alarm_rtc_suspend(&mut self);

    /// Resume the alarm RTC.
    fn alarm_rtc_resume(&mut self);

    /// Put the external flash into deep power-down.
    fn external_flash_sleep(&mut self);

    /// Wake the external flash.
    fn external_flash_wake(&mut self);

    /// Block until every UART has drained its transmit buffer.
    fn uart_flush_all(&mut self);
}

/// CPU and clock controls.
pub trait CoreControl {
    /// Stop the periodic system tick.
    fn systick_disable(&mut self);

    /// Restart the periodic system tick.
    fn systick_enable(&mut self);

    /// `true` if the high-frequency crystal clock is running.
    fn hfclk_running(&self) -> bool;

    /// Release the high-frequency clock.
    fn hfclk_release(&mut self) -> Result<(), HardwareFault>;

    /// Request the high-frequency clock and wait until it is running.
    fn hfclk_request(&mut self) -> Result<(), HardwareFault>;

    /// Clear cumulative FPU exceptions and the pending FPU interrupt so they
    /// cannot block sleep entry. Returns the flags latched before clearing.
    fn fpu_prepare_sleep(&mut self) -> FpuFlags;

    /// Execute the CPU's wait-for-event instruction once.
    fn wait_for_event(&mut self);

    /// Request a software reset. Does not return on hardware.
    fn system_reset(&mut self);

    /// Power the chip off. Only a reset resumes execution. Does not return
    /// on hardware.
    fn power_off(&mut self);
}

/// Everything the sequencer needs from the board.
pub trait LowPowerPlatform:
    PinInterrupts + WakeupTimer + PeripheralControl + CoreControl + ResetCause
{
}

impl<T> LowPowerPlatform for T where
    T: PinInterrupts + WakeupTimer + PeripheralControl + CoreControl + ResetCause
{
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standby_flag_bits() {
        assert!(StandbyFlags::from_bits(0x01).disable_wkp_pin);
        assert!(!StandbyFlags::from_bits(0x00).disable_wkp_pin);
        assert!(!StandbyFlags::from_bits(0x02).disable_wkp_pin);
    }
}
