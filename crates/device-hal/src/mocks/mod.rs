//! Mock implementations for testing
//!
//! [`MockPlatform`] implements every collaborator trait the sequencer and
//! reset classifier use. It records each call in order and delivers
//! scripted wakeup events from [`CoreControl::wait_for_event`] through
//! whichever sink was last bound.

#![cfg(any(test, feature = "std"))]

extern crate std;

use std::collections::{BTreeMap, VecDeque};
use std::vec::Vec;

use crate::error::{HalError, HardwareFault};
use crate::features::ConfigStore;
use crate::fpu::FpuFlags;
use crate::gpio::{InterruptMode, PinId, PinInterrupts};
use crate::power::{CoreControl, PeripheralControl};
use crate::reset::{ResetCause, ResetFlags};
use crate::timer::WakeupTimer;
use crate::wakeup::{WakeupEvent, WakeupSink};

/// One observed collaborator call.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    SystickDisable,
    SystickEnable,
    UsbDetach,
    UsbAttach,
    AlarmRtcSuspend,
    AlarmRtcResume,
    FlashSleep,
    FlashWake,
    UartFlush,
    HfclkRelease,
    HfclkRequest,
    GpioSuspend,
    GpioRestore,
    Attach(PinId, InterruptMode),
    Detach(PinId),
    ConfigureSense(PinId, InterruptMode),
    TimerInit,
    SetCompare(u8, u32),
    TimerEnable,
    TimerUninit,
    FpuPrepare,
    WaitForEvent,
    SystemReset,
    PowerOff,
    ClearResetFlags,
}

/// Spy platform.
pub struct MockPlatform {
    calls: Vec<Call>,
    events: VecDeque<Vec<WakeupEvent>>,
    auto_fire_first_pin: bool,
    pin_sink: Option<&'static dyn WakeupSink>,
    timer_sink: Option<&'static dyn WakeupSink>,
    bound: Vec<PinId>,
    timer_running: bool,
    hfclk_running: bool,
    fpu_flags: FpuFlags,
    reset_flags: ResetFlags,
    fail_attach: Option<PinId>,
}

impl MockPlatform {
    /// Idle platform with the HFCLK running and no reset flags.
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            events: VecDeque::new(),
            auto_fire_first_pin: false,
            pin_sink: None,
            timer_sink: None,
            bound: Vec::new(),
            timer_running: false,
            hfclk_running: true,
            fpu_flags: FpuFlags::empty(),
            reset_flags: ResetFlags::empty(),
            fail_attach: None,
        }
    }

    /// Platform that reports `flags` as the reset cause.
    pub fn with_reset_flags(flags: ResetFlags) -> Self {
        let mut platform = Self::new();
        platform.reset_flags = flags;
        platform
    }

    /// Queue a wakeup event, delivered on a later `wait_for_event`.
    pub fn script_event(&mut self, event: WakeupEvent) -> &mut Self {
        self.events.push_back(std::vec![event]);
        self
    }

    /// Queue several events that all fire during the same `wait_for_event`.
    pub fn script_simultaneous(&mut self, events: &[WakeupEvent]) -> &mut Self {
        self.events.push_back(events.to_vec());
        self
    }

    /// Queue a `wait_for_event` that returns without any source firing.
    pub fn script_spurious_wake(&mut self) -> &mut Self {
        self.events.push_back(Vec::new());
        self
    }

    /// Once the script is exhausted, fire the first bound pin on every
    /// `wait_for_event`.
    pub fn auto_fire_first_pin(&mut self) -> &mut Self {
        self.auto_fire_first_pin = true;
        self
    }

    /// Latch FPU exception flags for the next sleep.
    pub fn set_fpu_flags(&mut self, flags: FpuFlags) {
        self.fpu_flags = flags;
    }

    /// Start or stop the HFCLK.
    pub fn set_hfclk_running(&mut self, running: bool) {
        self.hfclk_running = running;
    }

    /// Make `attach` fail for `pin`.
    pub fn fail_attach_on(&mut self, pin: PinId) {
        self.fail_attach = Some(pin);
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Number of times `call` was made.
    pub fn count(&self, call: Call) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }

    /// Number of `attach` calls, any pin.
    pub fn attach_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::Attach(..)))
            .count()
    }

    /// Number of `detach` calls, any pin.
    pub fn detach_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::Detach(..)))
            .count()
    }

    /// Index of the first occurrence of `call`.
    pub fn position(&self, call: Call) -> Option<usize> {
        self.calls.iter().position(|c| *c == call)
    }

    /// Pins currently bound.
    pub fn bound_pins(&self) -> &[PinId] {
        &self.bound
    }

    /// `true` while the wakeup timer is initialised.
    pub fn timer_running(&self) -> bool {
        self.timer_running
    }

    /// Current HFCLK state.
    pub fn hfclk_is_running(&self) -> bool {
        self.hfclk_running
    }

    /// Forget recorded calls.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn record(&mut self, call: Call) {
        self.calls.push(call);
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl PinInterrupts for MockPlatform {
    fn attach(
        &mut self,
        pin: PinId,
        mode: InterruptMode,
        sink: &'static dyn WakeupSink,
    ) -> Result<(), HardwareFault> {
        self.record(Call::Attach(pin, mode));
        if self.fail_attach == Some(pin) {
            return Err(HardwareFault::PinAttach(pin));
        }
        self.pin_sink = Some(sink);
        self.bound.push(pin);
        Ok(())
    }

    fn detach(&mut self, pin: PinId) -> Result<(), HardwareFault> {
        self.record(Call::Detach(pin));
        let idx = self
            .bound
            .iter()
            .position(|p| *p == pin)
            .ok_or(HardwareFault::PinDetach(pin))?;
        self.bound.remove(idx);
        if self.bound.is_empty() {
            self.pin_sink = None;
        }
        Ok(())
    }

    fn suspend(&mut self) {
        self.record(Call::GpioSuspend);
    }

    fn restore(&mut self) {
        self.record(Call::GpioRestore);
    }

    fn configure_sense(&mut self, pin: PinId, mode: InterruptMode) -> Result<(), HardwareFault> {
        self.record(Call::ConfigureSense(pin, mode));
        Ok(())
    }
}

impl WakeupTimer for MockPlatform {
    fn init(&mut self, sink: &'static dyn WakeupSink) -> Result<(), HardwareFault> {
        self.record(Call::TimerInit);
        self.timer_sink = Some(sink);
        Ok(())
    }

    fn set_compare(&mut self, channel: u8, ticks: u32) -> Result<(), HardwareFault> {
        self.record(Call::SetCompare(channel, ticks));
        Ok(())
    }

    fn enable(&mut self) {
        self.record(Call::TimerEnable);
        self.timer_running = true;
    }

    fn uninit(&mut self) {
        self.record(Call::TimerUninit);
        self.timer_running = false;
        self.timer_sink = None;
    }
}

impl PeripheralControl for MockPlatform {
    fn usb_detach(&mut self) {
        self.record(Call::UsbDetach);
    }

    fn usb_attach(&mut self) {
        self.record(Call::UsbAttach);
    }

    fn alarm_rtc_suspend(&mut self) {
        self.record(Call::AlarmRtcSuspend);
    }

    fn alarm_rtc_resume(&mut self) {
        self.record(Call::AlarmRtcResume);
    }

    fn external_flash_sleep(&mut self) {
        self.record(Call::FlashSleep);
    }

    fn external_flash_wake(&mut self) {
        self.record(Call::FlashWake);
    }

    fn uart_flush_all(&mut self) {
        self.record(Call::UartFlush);
    }
}

impl CoreControl for MockPlatform {
    fn systick_disable(&mut self) {
        self.record(Call::SystickDisable);
    }

    fn systick_enable(&mut self) {
        self.record(Call::SystickEnable);
    }

    fn hfclk_running(&self) -> bool {
        self.hfclk_running
    }

    fn hfclk_release(&mut self) -> Result<(), HardwareFault> {
        self.record(Call::HfclkRelease);
        self.hfclk_running = false;
        Ok(())
    }

    fn hfclk_request(&mut self) -> Result<(), HardwareFault> {
        self.record(Call::HfclkRequest);
        self.hfclk_running = true;
        Ok(())
    }

    fn fpu_prepare_sleep(&mut self) -> FpuFlags {
        self.record(Call::FpuPrepare);
        core::mem::replace(&mut self.fpu_flags, FpuFlags::empty())
    }

    #[allow(clippy::panic)]
    fn wait_for_event(&mut self) {
        self.record(Call::WaitForEvent);
        let batch = match self.events.pop_front() {
            Some(batch) => batch,
            None => match self.bound.first() {
                Some(&pin) if self.auto_fire_first_pin => std::vec![WakeupEvent::Pin(pin)],
                _ => panic!("wait_for_event with no scripted wakeup: the sequencer would sleep forever"),
            },
        };
        for event in batch {
            let sink = match event {
                WakeupEvent::Pin(_) => self.pin_sink,
                WakeupEvent::Timer => self.timer_sink.or(self.pin_sink),
            };
            if let Some(sink) = sink {
                sink.notify(event);
            }
        }
    }

    fn system_reset(&mut self) {
        self.record(Call::SystemReset);
    }

    fn power_off(&mut self) {
        self.record(Call::PowerOff);
    }
}

impl ResetCause for MockPlatform {
    fn reset_flags(&self) -> ResetFlags {
        self.reset_flags
    }

    fn clear_reset_flags(&mut self) {
        self.record(Call::ClearResetFlags);
        self.reset_flags = ResetFlags::empty();
    }
}

/// In-memory configuration store that starts out erased (`0xFF`).
pub struct MockConfigStore {
    bytes: BTreeMap<u16, u8>,
    writes: usize,
    failing: bool,
}

impl MockConfigStore {
    /// Fresh, erased store.
    pub fn erased() -> Self {
        Self {
            bytes: BTreeMap::new(),
            writes: 0,
            failing: false,
        }
    }

    /// Store whose every access fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::erased()
        }
    }

    /// Byte at `offset`.
    pub fn byte(&self, offset: u16) -> u8 {
        self.bytes.get(&offset).copied().unwrap_or(0xFF)
    }

    /// Successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl ConfigStore for MockConfigStore {
    fn read_byte(&self, offset: u16) -> Result<u8, HalError> {
        if self.failing {
            return Err(HalError::Storage);
        }
        Ok(self.byte(offset))
    }

    fn write_byte(&mut self, offset: u16, value: u8) -> Result<(), HalError> {
        if self.failing {
            return Err(HalError::Storage);
        }
        self.bytes.insert(offset, value);
        self.writes = self.writes.saturating_add(1);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::wakeup::WakeupInfo;

    static INFO: WakeupInfo = WakeupInfo::new();

    #[test]
    fn scripted_pin_event_reaches_bound_sink() {
        let pin = PinId::new(9).unwrap();
        let mut platform = MockPlatform::new();
        platform.script_event(WakeupEvent::Pin(pin));
        platform.attach(pin, InterruptMode::RisingEdge, &INFO).unwrap();
        platform.wait_for_event();
        assert_eq!(INFO.pin(), 9);
        platform.detach(pin).unwrap();
        assert!(platform.bound_pins().is_empty());
        assert_eq!(platform.attach_count(), platform.detach_count());
    }

    #[test]
    fn detach_of_unbound_pin_faults() {
        let pin = PinId::new(1).unwrap();
        let mut platform = MockPlatform::new();
        assert_eq!(platform.detach(pin), Err(HardwareFault::PinDetach(pin)));
    }

    #[test]
    fn config_store_counts_writes() {
        let mut store = MockConfigStore::erased();
        assert_eq!(store.read_byte(10), Ok(0xFF));
        store.write_byte(10, 0x12).unwrap();
        assert_eq!(store.byte(10), 0x12);
        assert_eq!(store.write_count(), 1);
    }
}
