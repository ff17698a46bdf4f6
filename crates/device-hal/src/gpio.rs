//! GPIO wakeup abstraction
//!
//! Pin identifiers, interrupt trigger modes and the interrupt-binding
//! collaborator the stop-mode sequencer arms wakeup pins through.

use crate::config::TOTAL_PINS;
use crate::error::{HalError, HardwareFault};
use crate::wakeup::WakeupSink;

/// A validated GPIO pin number (`0..TOTAL_PINS`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinId(u16);

impl PinId {
    /// Validate a raw pin number.
    pub const fn new(pin: u16) -> Result<Self, HalError> {
        if pin < TOTAL_PINS {
            Ok(Self(pin))
        } else {
            Err(HalError::InvalidArgument)
        }
    }

    /// Construct without range checking. For board constants only.
    pub(crate) const fn new_unchecked(pin: u16) -> Self {
        Self(pin)
    }

    /// Raw pin number.
    pub const fn get(self) -> u16 {
        self.0
    }

    /// Port (0 or 1) and pin-within-port for the nRF52840 GPIO blocks.
    pub const fn port_and_pin(self) -> (u8, u8) {
        // Truncation is impossible: TOTAL_PINS < 64.
        #[allow(clippy::cast_possible_truncation)]
        let raw = self.0 as u8;
        (raw >> 5, raw & 0x1F)
    }
}

impl TryFrom<u16> for PinId {
    type Error = HalError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// External interrupt configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptMode {
    /// Trigger on rising edge
    RisingEdge,
    /// Trigger on falling edge
    FallingEdge,
    /// Trigger on both edges
    BothEdges,
    /// Sense a high level (standby wakeup only)
    HighLevel,
    /// Sense a low level (standby wakeup only)
    LowLevel,
}

impl InterruptMode {
    /// `true` for modes the GPIO edge interrupt can arm.
    pub const fn is_edge(self) -> bool {
        matches!(self, Self::RisingEdge | Self::FallingEdge | Self::BothEdges)
    }
}

/// Raw mode codes as used across the firmware ABI:
/// 0 = change, 1 = rising, 2 = falling.
impl TryFrom<u8> for InterruptMode {
    type Error = HalError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::BothEdges),
            1 => Ok(Self::RisingEdge),
            2 => Ok(Self::FallingEdge),
            _ => Err(HalError::InvalidArgument),
        }
    }
}

/// GPIO interrupt binding collaborator.
///
/// Implementations route the pin's interrupt to `sink` as
/// [`WakeupEvent::Pin`](crate::wakeup::WakeupEvent::Pin). All methods are
/// called from task context with interrupts masked where the sequencer
/// requires it.
pub trait PinInterrupts {
    /// Bind an edge interrupt on `pin` that reports to `sink`.
    fn attach(
        &mut self,
        pin: PinId,
        mode: InterruptMode,
        sink: &'static dyn WakeupSink,
    ) -> Result<(), HardwareFault>;

    /// Remove the binding created by [`attach`](Self::attach).
    fn detach(&mut self, pin: PinId) -> Result<(), HardwareFault>;

    /// Mask dispatch of all general-purpose GPIO interrupts.
    fn suspend(&mut self);

    /// Undo [`suspend`](Self::suspend).
    fn restore(&mut self);

    /// Configure level sensing on `pin` so it wakes the chip from power-off.
    fn configure_sense(&mut self, pin: PinId, mode: InterruptMode) -> Result<(), HardwareFault>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_id_rejects_out_of_range() {
        assert!(PinId::new(TOTAL_PINS).is_err());
        assert!(PinId::new(u16::MAX).is_err());
        assert_eq!(PinId::new(5).map(PinId::get), Ok(5));
    }

    #[test]
    fn port_and_pin_split() {
        assert_eq!(PinId::new(3).map(PinId::port_and_pin), Ok((0, 3)));
        assert_eq!(PinId::new(35).map(PinId::port_and_pin), Ok((1, 3)));
    }

    #[test]
    fn raw_mode_codes() {
        assert_eq!(InterruptMode::try_from(0), Ok(InterruptMode::BothEdges));
        assert_eq!(InterruptMode::try_from(1), Ok(InterruptMode::RisingEdge));
        assert_eq!(InterruptMode::try_from(2), Ok(InterruptMode::FallingEdge));
        assert_eq!(InterruptMode::try_from(3), Err(HalError::InvalidArgument));
    }

    #[test]
    fn level_modes_are_not_edges() {
        assert!(!InterruptMode::HighLevel.is_edge());
        assert!(!InterruptMode::LowLevel.is_edge());
        assert!(InterruptMode::BothEdges.is_edge());
    }
}
