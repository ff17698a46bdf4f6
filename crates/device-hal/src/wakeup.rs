//! Wakeup source arbitration.
//!
//! [`WakeupInfo`] is the one piece of state shared between interrupt
//! context (writer) and the sequencer's wait loop (reader). The first pin
//! event of a sleep attempt claims the pin slot; later pin events are
//! dropped. The claimed pin index is stored before the source bit is
//! published with `Release`; the wait loop observes the bit with `Acquire`,
//! so a non-empty mask always comes with the pin that set it.
//!
//! ```text
//! Idle --arm--> Armed --interrupt--> Fired --teardown--> Idle
//! ```

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use crate::error::HalError;
use crate::gpio::PinId;

/// Set of wakeup sources that fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WakeupSources(u8);

impl WakeupSources {
    /// Nothing fired.
    pub const NONE: Self = Self(0);
    /// A GPIO pin fired.
    pub const PIN: Self = Self(1 << 0);
    /// The wakeup timer fired.
    pub const RTC: Self = Self(1 << 1);

    /// Raw bits.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// `true` if nothing fired.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// `true` if all bits of `other` are set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    /// Union of two sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// Typed event delivered by a wakeup interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeupEvent {
    /// A configured GPIO pin saw its edge.
    Pin(PinId),
    /// The wakeup timer compare matched.
    Timer,
}

/// Receiver for wakeup events. Called from interrupt context.
pub trait WakeupSink: Sync {
    /// Record that `event` happened.
    fn notify(&self, event: WakeupEvent);
}

/// Shared wakeup state for one sleep attempt.
pub struct WakeupInfo {
    sources: AtomicU8,
    pin_claimed: AtomicBool,
    pin: AtomicU32,
}

impl WakeupInfo {
    /// Empty state, usable in a `static`.
    pub const fn new() -> Self {
        Self {
            sources: AtomicU8::new(0),
            pin_claimed: AtomicBool::new(false),
            pin: AtomicU32::new(0),
        }
    }

    /// Clear to `NONE` before arming.
    pub fn reset(&self) {
        self.pin.store(0, Ordering::Relaxed);
        self.pin_claimed.store(false, Ordering::Relaxed);
        self.sources.store(0, Ordering::Release);
    }

    /// Sources that have fired since the last [`reset`](Self::reset).
    pub fn sources(&self) -> WakeupSources {
        WakeupSources(self.sources.load(Ordering::Acquire))
    }

    /// `true` once any source has fired.
    pub fn has_fired(&self) -> bool {
        !self.sources().is_empty()
    }

    /// Pin number recorded by the first pin event.
    pub fn pin(&self) -> u32 {
        self.pin.load(Ordering::Relaxed)
    }

    /// Resolve the reason for the wakeup against what was armed.
    ///
    /// A pin event wins over the timer when both fired.
    pub fn resolve(&self, pins_armed: bool, timer_armed: bool) -> Result<WakeupReason, HalError> {
        let sources = self.sources();
        if pins_armed && sources.contains(WakeupSources::PIN) {
            let pin = u16::try_from(self.pin())
                .ok()
                .and_then(|raw| PinId::new(raw).ok())
                .ok_or(HalError::Unsupported)?;
            Ok(WakeupReason::Pin(pin))
        } else if timer_armed && sources.contains(WakeupSources::RTC) {
            Ok(WakeupReason::Timer)
        } else {
            Err(HalError::Unsupported)
        }
    }
}

impl Default for WakeupInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl WakeupSink for WakeupInfo {
    fn notify(&self, event: WakeupEvent) {
        match event {
            WakeupEvent::Pin(pin) => {
                if self
                    .pin_claimed
                    .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
                    .is_err()
                {
                    return;
                }
                self.pin.store(u32::from(pin.get()), Ordering::Relaxed);
                self.sources.fetch_or(WakeupSources::PIN.0, Ordering::Release);
            }
            WakeupEvent::Timer => {
                self.sources.fetch_or(WakeupSources::RTC.0, Ordering::Release);
            }
        }
    }
}

/// Why a stop-mode call returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeupReason {
    /// A configured pin triggered.
    Pin(PinId),
    /// The timeout elapsed.
    Timer,
}

impl WakeupReason {
    /// Numeric reason: `pin + 1` for a pin wakeup, `0` for the timer.
    pub fn code(self) -> i32 {
        match self {
            Self::Pin(pin) => i32::from(pin.get()).saturating_add(1),
            Self::Timer => 0,
        }
    }
}
