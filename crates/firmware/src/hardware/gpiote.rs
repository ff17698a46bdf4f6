//! GPIO wakeup interrupts on GPIOTE.
//!
//! The first eight pins get a dedicated GPIOTE IN channel with a true edge
//! polarity. Further pins fall back to the shared PORT event: the pin's SENSE
//! level is set to the level the requested edge moves to (for `BothEdges`,
//! the opposite of the current level) and the latch register identifies which
//! pin fired.
//!
//! Both routes report through the sink table to the `GPIOTE` interrupt.

// Register field packing; shift amounts are bounded by the field layout.
#![allow(clippy::arithmetic_side_effects)]

use core::cell::RefCell;

use critical_section::Mutex;
use device_hal::{HardwareFault, InterruptMode, PinId, PinInterrupts, WakeupEvent, WakeupSink};
use nrf52840_pac::{self as pac, interrupt, Interrupt, NVIC};

const CHANNELS: usize = 8;
const PINS: usize = device_hal::config::TOTAL_PINS as usize;
/// INTEN bit of the PORT event.
const INTEN_PORT: u32 = 1 << 31;
/// INTEN bits owned by channel events.
const INTEN_CHANNELS: u32 = (1 << CHANNELS) - 1;

/// CONFIG.MODE = Event.
const CONFIG_MODE_EVENT: u32 = 1;
const CONFIG_PSEL_SHIFT: u32 = 8;
const CONFIG_PORT_SHIFT: u32 = 13;
const CONFIG_POLARITY_SHIFT: u32 = 16;
const POLARITY_LO_TO_HI: u32 = 1;
const POLARITY_HI_TO_LO: u32 = 2;
const POLARITY_TOGGLE: u32 = 3;

/// PIN_CNF fields: input, buffer connected.
const PULL_SHIFT: u32 = 2;
const PULL_DOWN: u32 = 1;
const PULL_UP: u32 = 3;
const SENSE_SHIFT: u32 = 16;
const SENSE_MASK: u32 = 0b11 << SENSE_SHIFT;
const SENSE_HIGH: u32 = 2;
const SENSE_LOW: u32 = 3;

type Binding = Option<(PinId, &'static dyn WakeupSink)>;

static CHANNEL_BINDINGS: Mutex<RefCell<[Binding; CHANNELS]>> =
    Mutex::new(RefCell::new([None; CHANNELS]));

static PORT_BINDINGS: Mutex<RefCell<[Option<&'static dyn WakeupSink>; PINS]>> =
    Mutex::new(RefCell::new([None; PINS]));

/// GPIOTE-backed [`PinInterrupts`].
pub struct GpioteWakeup {
    gpiote: pac::GPIOTE,
    p0: pac::P0,
    p1: pac::P1,
    saved_inten: Option<u32>,
}

impl GpioteWakeup {
    /// Take the GPIOTE block and both GPIO ports.
    pub fn new(gpiote: pac::GPIOTE, p0: pac::P0, p1: pac::P1) -> Self {
        Self {
            gpiote,
            p0,
            p1,
            saved_inten: None,
        }
    }

    fn port(&self, port: u8) -> &pac::p0::RegisterBlock {
        if port == 0 {
            &self.p0
        } else {
            &self.p1
        }
    }

    fn pin_cnf(&self, pin: PinId) -> Option<&pac::p0::PIN_CNF> {
        let (port, index) = pin.port_and_pin();
        self.port(port).pin_cnf.get(usize::from(index))
    }

    fn input_is_high(&self, pin: PinId) -> bool {
        let (port, index) = pin.port_and_pin();
        self.port(port).in_.read().bits() & (1 << index) != 0
    }

    fn write_pin_cnf(&self, pin: PinId, value: u32) -> Result<(), HardwareFault> {
        let cnf = self.pin_cnf(pin).ok_or(HardwareFault::PinAttach(pin))?;
        // SAFETY: every PIN_CNF bit pattern is valid.
        cnf.write(|w| unsafe { w.bits(value) });
        Ok(())
    }

    fn attach_channel(
        &self,
        channel: usize,
        pin: PinId,
        mode: InterruptMode,
    ) -> Result<(), HardwareFault> {
        let polarity = match mode {
            InterruptMode::RisingEdge => POLARITY_LO_TO_HI,
            InterruptMode::FallingEdge => POLARITY_HI_TO_LO,
            InterruptMode::BothEdges => POLARITY_TOGGLE,
            InterruptMode::HighLevel | InterruptMode::LowLevel => {
                return Err(HardwareFault::PinAttach(pin))
            }
        };
        let (port, index) = pin.port_and_pin();
        let config = CONFIG_MODE_EVENT
            | (u32::from(index) << CONFIG_PSEL_SHIFT)
            | (u32::from(port) << CONFIG_PORT_SHIFT)
            | (polarity << CONFIG_POLARITY_SHIFT);

        let reg = self
            .gpiote
            .config
            .get(channel)
            .ok_or(HardwareFault::PinAttach(pin))?;
        // SAFETY: MODE/PSEL/PORT/POLARITY values built from the field layout.
        reg.write(|w| unsafe { w.bits(config) });
        if let Some(event) = self.gpiote.events_in.get(channel) {
            // SAFETY: writing 0 clears a pending event.
            event.write(|w| unsafe { w.bits(0) });
        }
        // SAFETY: channel < CHANNELS, a valid INTENSET bit.
        self.gpiote.intenset.write(|w| unsafe { w.bits(1 << channel) });
        Ok(())
    }

    fn attach_port(&self, pin: PinId, mode: InterruptMode) -> Result<(), HardwareFault> {
        let sense = match mode {
            InterruptMode::RisingEdge => SENSE_HIGH,
            InterruptMode::FallingEdge => SENSE_LOW,
            InterruptMode::BothEdges if self.input_is_high(pin) => SENSE_LOW,
            InterruptMode::BothEdges => SENSE_HIGH,
            InterruptMode::HighLevel | InterruptMode::LowLevel => {
                return Err(HardwareFault::PinAttach(pin))
            }
        };
        self.write_pin_cnf(pin, sense << SENSE_SHIFT)?;
        // SAFETY: writing 0 clears a pending PORT event.
        self.gpiote.events_port.write(|w| unsafe { w.bits(0) });
        // SAFETY: PORT is a valid INTENSET bit.
        self.gpiote.intenset.write(|w| unsafe { w.bits(INTEN_PORT) });
        Ok(())
    }
}

impl PinInterrupts for GpioteWakeup {
    fn attach(
        &mut self,
        pin: PinId,
        mode: InterruptMode,
        sink: &'static dyn WakeupSink,
    ) -> Result<(), HardwareFault> {
        let channel = critical_section::with(|cs| {
            let mut bindings = CHANNEL_BINDINGS.borrow_ref_mut(cs);
            let free = bindings.iter().position(Option::is_none);
            if let Some(slot) = free.and_then(|index| bindings.get_mut(index)) {
                *slot = Some((pin, sink));
            }
            free
        });

        match channel {
            Some(channel) => self.attach_channel(channel, pin, mode)?,
            None => {
                critical_section::with(|cs| {
                    if let Some(slot) = PORT_BINDINGS
                        .borrow_ref_mut(cs)
                        .get_mut(usize::from(pin.get()))
                    {
                        *slot = Some(sink);
                    }
                });
                self.attach_port(pin, mode)?;
            }
        }
        // SAFETY: the handler only touches the sink tables and GPIOTE events.
        unsafe { NVIC::unmask(Interrupt::GPIOTE) };
        Ok(())
    }

    fn detach(&mut self, pin: PinId) -> Result<(), HardwareFault> {
        let channel = critical_section::with(|cs| {
            let mut bindings = CHANNEL_BINDINGS.borrow_ref_mut(cs);
            let found = bindings
                .iter()
                .position(|binding| matches!(binding, Some((bound, _)) if *bound == pin));
            if let Some(slot) = found.and_then(|index| bindings.get_mut(index)) {
                *slot = None;
            }
            found
        });

        if let Some(channel) = channel {
            // SAFETY: channel < CHANNELS, a valid INTENCLR bit.
            self.gpiote.intenclr.write(|w| unsafe { w.bits(1 << channel) });
            let reg = self
                .gpiote
                .config
                .get(channel)
                .ok_or(HardwareFault::PinDetach(pin))?;
            // SAFETY: MODE = Disabled.
            reg.write(|w| unsafe { w.bits(0) });
            return Ok(());
        }

        let was_bound = critical_section::with(|cs| {
            PORT_BINDINGS
                .borrow_ref_mut(cs)
                .get_mut(usize::from(pin.get()))
                .and_then(Option::take)
                .is_some()
        });
        if !was_bound {
            return Err(HardwareFault::PinDetach(pin));
        }
        let cnf = self.pin_cnf(pin).ok_or(HardwareFault::PinDetach(pin))?;
        // SAFETY: clearing SENSE leaves the pin a plain input.
        cnf.modify(|r, w| unsafe { w.bits(r.bits() & !SENSE_MASK) });
        let port_in_use =
            critical_section::with(|cs| PORT_BINDINGS.borrow_ref(cs).iter().any(Option::is_some));
        if !port_in_use {
            // SAFETY: PORT is a valid INTENCLR bit.
            self.gpiote.intenclr.write(|w| unsafe { w.bits(INTEN_PORT) });
        }
        Ok(())
    }

    fn suspend(&mut self) {
        let enabled = self.gpiote.intenset.read().bits();
        self.saved_inten = Some(enabled);
        // SAFETY: clears only GPIOTE interrupt enables.
        self.gpiote
            .intenclr
            .write(|w| unsafe { w.bits(INTEN_CHANNELS | INTEN_PORT) });
    }

    fn restore(&mut self) {
        if let Some(enabled) = self.saved_inten.take() {
            // SAFETY: re-enables exactly the bits read in `suspend`.
            self.gpiote.intenset.write(|w| unsafe { w.bits(enabled) });
        }
    }

    fn configure_sense(&mut self, pin: PinId, mode: InterruptMode) -> Result<(), HardwareFault> {
        let (pull, sense) = match mode {
            InterruptMode::HighLevel => (PULL_DOWN, SENSE_HIGH),
            InterruptMode::LowLevel => (PULL_UP, SENSE_LOW),
            _ => return Err(HardwareFault::PinAttach(pin)),
        };
        self.write_pin_cnf(pin, (pull << PULL_SHIFT) | (sense << SENSE_SHIFT))
    }
}

fn notify_channels(gpiote: &pac::gpiote::RegisterBlock) {
    for (channel, event) in gpiote.events_in.iter().enumerate().take(CHANNELS) {
        if event.read().bits() == 0 {
            continue;
        }
        // SAFETY: writing 0 clears the event.
        event.write(|w| unsafe { w.bits(0) });
        let binding =
            critical_section::with(|cs| CHANNEL_BINDINGS.borrow_ref(cs).get(channel).copied());
        if let Some(Some((pin, sink))) = binding {
            sink.notify(WakeupEvent::Pin(pin));
        }
    }
}

fn notify_port(gpiote: &pac::gpiote::RegisterBlock) {
    if gpiote.events_port.read().bits() == 0 {
        return;
    }
    // SAFETY: writing 0 clears the event.
    gpiote.events_port.write(|w| unsafe { w.bits(0) });

    // SAFETY: shared read/clear of the LATCH and PIN_CNF registers; task
    // context only writes PIN_CNF with this interrupt masked.
    let ports = unsafe { [&*pac::P0::ptr(), &*pac::P1::ptr()] };
    for (port, regs) in (0u16..).zip(ports) {
        let latched = regs.latch.read().bits();
        if latched == 0 {
            continue;
        }
        // SAFETY: writing 1s clears exactly the latched bits.
        regs.latch.write(|w| unsafe { w.bits(latched) });
        for index in (0u16..32).filter(|index| latched & (1 << index) != 0) {
            let raw = port.saturating_mul(32).saturating_add(index);
            let Ok(pin) = PinId::new(raw) else { continue };
            let sink = critical_section::with(|cs| {
                PORT_BINDINGS
                    .borrow_ref(cs)
                    .get(usize::from(raw))
                    .copied()
                    .flatten()
            });
            if let Some(sink) = sink {
                // A level sense stays asserted; disarm so DETECT can drop.
                if let Some(cnf) = regs.pin_cnf.get(usize::from(index)) {
                    // SAFETY: clearing SENSE leaves the pin a plain input.
                    cnf.modify(|r, w| unsafe { w.bits(r.bits() & !SENSE_MASK) });
                }
                sink.notify(WakeupEvent::Pin(pin));
            }
        }
    }
}

#[interrupt]
fn GPIOTE() {
    // SAFETY: the handler only reads and clears events; configuration
    // writes happen in task context inside critical sections.
    let gpiote = unsafe { &*pac::GPIOTE::ptr() };
    notify_channels(gpiote);
    notify_port(gpiote);
}
