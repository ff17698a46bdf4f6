//! Stop-mode wakeup timer on RTC2.
//!
//! RTC0 belongs to the alarm subsystem and is only masked during sleep.
//! RTC2 runs from LFCLK with the prescaler from `device_hal::config`, so one
//! tick is 1/8 s and the 24-bit counter covers the longest allowed timeout.

// Register field packing; shift amounts are bounded by the channel count.
#![allow(clippy::arithmetic_side_effects)]

use core::cell::Cell;

use critical_section::Mutex;
use device_hal::config::{RTC_MAX_TICKS, RTC_WAKEUP_PRESCALER};
use device_hal::{HardwareFault, WakeupEvent, WakeupSink, WakeupTimer};
use nrf52840_pac::{self as pac, interrupt, Interrupt, NVIC};

/// RTC2 has four compare channels.
const COMPARE_CHANNELS: u8 = 4;
/// EVTEN/INTEN bit of COMPARE[0].
const COMPARE0_BIT: u32 = 16;
const ALL_COMPARE_BITS: u32 = 0xF << COMPARE0_BIT;

static TIMER_SINK: Mutex<Cell<Option<&'static dyn WakeupSink>>> = Mutex::new(Cell::new(None));

/// RTC2-backed [`WakeupTimer`].
pub struct RtcWakeup {
    rtc: pac::RTC2,
}

impl RtcWakeup {
    /// Take RTC2. LFCLK must already be running.
    pub fn new(rtc: pac::RTC2) -> Self {
        Self { rtc }
    }

    fn stop_and_clear(&self) {
        // SAFETY: task triggers accept 1.
        self.rtc.tasks_stop.write(|w| unsafe { w.bits(1) });
        // SAFETY: task triggers accept 1.
        self.rtc.tasks_clear.write(|w| unsafe { w.bits(1) });
    }
}

impl WakeupTimer for RtcWakeup {
    fn init(&mut self, sink: &'static dyn WakeupSink) -> Result<(), HardwareFault> {
        self.stop_and_clear();
        // SAFETY: PRESCALER is 12 bits wide; the configured value fits.
        self.rtc
            .prescaler
            .write(|w| unsafe { w.bits(RTC_WAKEUP_PRESCALER) });
        if self.rtc.prescaler.read().bits() != RTC_WAKEUP_PRESCALER {
            return Err(HardwareFault::Timer);
        }
        critical_section::with(|cs| TIMER_SINK.borrow(cs).set(Some(sink)));
        NVIC::unpend(Interrupt::RTC2);
        // SAFETY: the handler only clears compare events and notifies the sink.
        unsafe { NVIC::unmask(Interrupt::RTC2) };
        Ok(())
    }

    fn set_compare(&mut self, channel: u8, ticks: u32) -> Result<(), HardwareFault> {
        if channel >= COMPARE_CHANNELS || ticks == 0 || ticks > RTC_MAX_TICKS {
            return Err(HardwareFault::Timer);
        }
        let index = usize::from(channel);
        let cc = self.rtc.cc.get(index).ok_or(HardwareFault::Timer)?;
        // SAFETY: COMPARE is 24 bits wide; range checked above.
        cc.write(|w| unsafe { w.bits(ticks) });
        if let Some(event) = self.rtc.events_compare.get(index) {
            // SAFETY: writing 0 clears a pending event.
            event.write(|w| unsafe { w.bits(0) });
        }
        let bit = 1 << (COMPARE0_BIT + u32::from(channel));
        // SAFETY: COMPARE[n] enable bits.
        self.rtc.evtenset.write(|w| unsafe { w.bits(bit) });
        // SAFETY: COMPARE[n] enable bits.
        self.rtc.intenset.write(|w| unsafe { w.bits(bit) });
        Ok(())
    }

    fn enable(&mut self) {
        // SAFETY: task triggers accept 1.
        self.rtc.tasks_start.write(|w| unsafe { w.bits(1) });
    }

    fn uninit(&mut self) {
        NVIC::mask(Interrupt::RTC2);
        self.stop_and_clear();
        // SAFETY: COMPARE enable bits only.
        self.rtc.intenclr.write(|w| unsafe { w.bits(ALL_COMPARE_BITS) });
        // SAFETY: COMPARE enable bits only.
        self.rtc.evtenclr.write(|w| unsafe { w.bits(ALL_COMPARE_BITS) });
        for event in self.rtc.events_compare.iter() {
            // SAFETY: writing 0 clears a pending event.
            event.write(|w| unsafe { w.bits(0) });
        }
        critical_section::with(|cs| TIMER_SINK.borrow(cs).set(None));
        NVIC::unpend(Interrupt::RTC2);
    }
}

#[interrupt]
fn RTC2() {
    // SAFETY: the handler only reads and clears compare events.
    let rtc = unsafe { &*pac::RTC2::ptr() };
    let mut fired = false;
    for event in rtc.events_compare.iter() {
        if event.read().bits() != 0 {
            // SAFETY: writing 0 clears the event.
            event.write(|w| unsafe { w.bits(0) });
            fired = true;
        }
    }
    if fired {
        if let Some(sink) = critical_section::with(|cs| TIMER_SINK.borrow(cs).get()) {
            sink.notify(WakeupEvent::Timer);
        }
    }
}
