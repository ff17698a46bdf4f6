//! The nRF52840 board: every collaborator trait the HAL sequencer needs.

use cortex_m::peripheral::{SCB, SYST};
use device_hal::{
    CoreControl, FpuFlags, HardwareFault, InterruptMode, PeripheralControl, PinId, PinInterrupts,
    ResetCause, ResetFlags, WakeupSink, WakeupTimer,
};
use nrf52840_pac::{self as pac, Interrupt, NVIC};

use super::nvmc::DctFlash;
use super::gpiote::GpioteWakeup;
use super::led::{CycleDelay, StatusLed};
use super::rtc::RtcWakeup;
use crate::fault_led::LedFaultHandler;

/// RESETREAS bits.
mod resetreas {
    pub const RESETPIN: u32 = 1 << 0;
    pub const DOG: u32 = 1 << 1;
    pub const SREQ: u32 = 1 << 2;
    /// OFF, LPCOMP, DIF, NFC and VBUS: wake from system OFF.
    pub const WAKE_FROM_OFF: u32 = 0b1_1111 << 16;
}

/// HFCLKSTAT: STATE running, SRC = crystal.
const HFCLKSTAT_RUNNING_XTAL: u32 = (1 << 16) | 1;
/// LFCLKSTAT STATE bit.
const LFCLKSTAT_RUNNING: u32 = 1 << 16;
/// LFCLKSRC = crystal.
const LFCLKSRC_XTAL: u32 = 1;
/// Polls before a clock transition counts as failed.
const CLOCK_POLLS: u32 = 1_000_000;

/// UARTE ENABLE value when the peripheral is on.
const UARTE_ENABLED: u32 = 8;
/// QSPI custom instructions for the external flash.
const QSPI_DEEP_POWER_DOWN: u32 = 0xB9;
const QSPI_RELEASE_POWER_DOWN: u32 = 0xAB;
/// CINSTRCONF: LENGTH = 1 (opcode only), IO2/IO3 held high.
const CINSTR_OPCODE_ONLY: u32 = (1 << 8) | (1 << 12) | (1 << 13);

/// RAM[n].POWERSET: retain all sixteen sections in system OFF.
const RAM_RETAIN_ALL_SECTIONS: u32 = 0xFFFF_0000;

/// The board's peripherals behind the HAL collaborator traits.
pub struct Nrf52Board {
    gpio: GpioteWakeup,
    rtc: RtcWakeup,
    clock: pac::CLOCK,
    power: pac::POWER,
    usbd: pac::USBD,
    uarte0: pac::UARTE0,
    uarte1: pac::UARTE1,
    qspi: pac::QSPI,
    syst: SYST,
    /// SysTick counter and interrupt enables saved across sleep.
    systick_state: (bool, bool),
    usb_was_attached: bool,
    alarm_rtc_was_enabled: bool,
    flash_asleep: bool,
}

impl Nrf52Board {
    /// Split the device peripherals into the board and the configuration
    /// page, and start LFCLK for the wakeup timer.
    pub fn new(p: pac::Peripherals, syst: SYST) -> Result<(Self, DctFlash), HardwareFault> {
        let board = Self {
            gpio: GpioteWakeup::new(p.GPIOTE, p.P0, p.P1),
            rtc: RtcWakeup::new(p.RTC2),
            clock: p.CLOCK,
            power: p.POWER,
            usbd: p.USBD,
            uarte0: p.UARTE0,
            uarte1: p.UARTE1,
            qspi: p.QSPI,
            syst,
            systick_state: (false, false),
            usb_was_attached: false,
            alarm_rtc_was_enabled: false,
            flash_asleep: false,
        };
        board.start_lfclk()?;
        Ok((board, DctFlash::new(p.NVMC)))
    }

    fn start_lfclk(&self) -> Result<(), HardwareFault> {
        if self.clock.lfclkstat.read().bits() & LFCLKSTAT_RUNNING != 0 {
            return Ok(());
        }
        // SAFETY: LFCLKSRC accepts the crystal source value.
        self.clock.lfclksrc.write(|w| unsafe { w.bits(LFCLKSRC_XTAL) });
        // SAFETY: event clear and task trigger.
        self.clock.events_lfclkstarted.write(|w| unsafe { w.bits(0) });
        // SAFETY: task trigger.
        self.clock.tasks_lfclkstart.write(|w| unsafe { w.bits(1) });
        wait_until(|| self.clock.events_lfclkstarted.read().bits() != 0)
    }

    fn qspi_command(&self, opcode: u32) {
        // SAFETY: event clear.
        self.qspi.events_ready.write(|w| unsafe { w.bits(0) });
        // SAFETY: opcode plus CINSTRCONF fields from the register layout.
        self.qspi
            .cinstrconf
            .write(|w| unsafe { w.bits(opcode | CINSTR_OPCODE_ONLY) });
        if wait_until(|| self.qspi.events_ready.read().bits() != 0).is_err() {
            defmt::warn!("qspi: instruction 0x{:02X} timed out", opcode);
        }
    }

    fn qspi_enabled(&self) -> bool {
        self.qspi.enable.read().bits() != 0
    }
}

/// Poll `done` up to [`CLOCK_POLLS`] times.
fn wait_until(mut done: impl FnMut() -> bool) -> Result<(), HardwareFault> {
    for _ in 0..CLOCK_POLLS {
        if done() {
            return Ok(());
        }
    }
    Err(HardwareFault::Clock)
}

fn flush_uarte(uarte: &pac::uarte0::RegisterBlock) {
    if uarte.enable.read().bits() != UARTE_ENABLED {
        return;
    }
    let transmitting = uarte.events_txstarted.read().bits() != 0;
    if transmitting && wait_until(|| uarte.events_endtx.read().bits() != 0).is_err() {
        defmt::warn!("uarte: tx did not drain before sleep");
    }
}

impl PeripheralControl for Nrf52Board {
    fn usb_detach(&mut self) {
        self.usb_was_attached = self.usbd.usbpullup.read().bits() != 0;
        if self.usb_was_attached {
            // SAFETY: USBPULLUP = Disabled.
            self.usbd.usbpullup.write(|w| unsafe { w.bits(0) });
        }
    }

    fn usb_attach(&mut self) {
        if self.usb_was_attached {
            // SAFETY: USBPULLUP = Enabled.
            self.usbd.usbpullup.write(|w| unsafe { w.bits(1) });
        }
    }

    fn alarm_rtc_suspend(&mut self) {
        self.alarm_rtc_was_enabled = NVIC::is_enabled(Interrupt::RTC0);
        NVIC::mask(Interrupt::RTC0);
    }

    fn alarm_rtc_resume(&mut self) {
        if self.alarm_rtc_was_enabled {
            // SAFETY: restores the mask state saved in `alarm_rtc_suspend`.
            unsafe { NVIC::unmask(Interrupt::RTC0) };
        }
    }

    fn external_flash_sleep(&mut self) {
        if self.qspi_enabled() {
            self.qspi_command(QSPI_DEEP_POWER_DOWN);
            self.flash_asleep = true;
        }
    }

    fn external_flash_wake(&mut self) {
        if self.flash_asleep {
            self.qspi_command(QSPI_RELEASE_POWER_DOWN);
            self.flash_asleep = false;
        }
    }

    fn uart_flush_all(&mut self) {
        flush_uarte(&self.uarte0);
        flush_uarte(&self.uarte1);
    }
}

impl CoreControl for Nrf52Board {
    fn systick_disable(&mut self) {
        self.systick_state = (
            self.syst.is_counter_enabled(),
            self.syst.is_interrupt_enabled(),
        );
        self.syst.disable_interrupt();
        self.syst.disable_counter();
    }

    fn systick_enable(&mut self) {
        let (counter, interrupt) = self.systick_state;
        if counter {
            self.syst.enable_counter();
        }
        if interrupt {
            self.syst.enable_interrupt();
        }
    }

    fn hfclk_running(&self) -> bool {
        self.clock.hfclkstat.read().bits() & HFCLKSTAT_RUNNING_XTAL == HFCLKSTAT_RUNNING_XTAL
    }

    fn hfclk_release(&mut self) -> Result<(), HardwareFault> {
        // SAFETY: task trigger.
        self.clock.tasks_hfclkstop.write(|w| unsafe { w.bits(1) });
        wait_until(|| !self.hfclk_running())
    }

    fn hfclk_request(&mut self) -> Result<(), HardwareFault> {
        // SAFETY: event clear.
        self.clock.events_hfclkstarted.write(|w| unsafe { w.bits(0) });
        // SAFETY: task trigger.
        self.clock.tasks_hfclkstart.write(|w| unsafe { w.bits(1) });
        wait_until(|| self.clock.events_hfclkstarted.read().bits() != 0)
    }

    fn fpu_prepare_sleep(&mut self) -> FpuFlags {
        let fpscr = cortex_m::register::fpscr::read().bits();
        let flags = FpuFlags::from_fpscr(fpscr);
        let cleared = cortex_m::register::fpscr::Fpscr::from_bits(fpscr & !FpuFlags::ALL_MASK);
        // SAFETY: clears only the cumulative exception bits.
        unsafe { cortex_m::register::fpscr::write(cleared) };
        NVIC::unpend(Interrupt::FPU);
        flags
    }

    fn wait_for_event(&mut self) {
        cortex_m::asm::wfe();
    }

    fn system_reset(&mut self) {
        SCB::sys_reset();
    }

    fn power_off(&mut self) {
        for ram in self.power.ram.iter() {
            // SAFETY: retention bits for every section of this RAM block.
            ram.powerset.write(|w| unsafe { w.bits(RAM_RETAIN_ALL_SECTIONS) });
        }
        defmt::info!("system off");
        // SAFETY: SYSTEMOFF = Enter.
        self.power.systemoff.write(|w| unsafe { w.bits(1) });
        // Emulated system OFF under a debugger falls through; park here.
        loop {
            cortex_m::asm::wfe();
        }
    }
}

impl ResetCause for Nrf52Board {
    fn reset_flags(&self) -> ResetFlags {
        let raw = self.power.resetreas.read().bits();
        if raw == 0 {
            return ResetFlags::POWER_DOWN;
        }
        [
            (resetreas::RESETPIN, ResetFlags::PIN),
            (resetreas::DOG, ResetFlags::WATCHDOG),
            (resetreas::SREQ, ResetFlags::SOFTWARE),
            (resetreas::WAKE_FROM_OFF, ResetFlags::POWER_MANAGEMENT),
        ]
        .iter()
        .filter(|(mask, _)| raw & mask != 0)
        .fold(ResetFlags::empty(), |flags, (_, flag)| flags.union(*flag))
    }

    fn clear_reset_flags(&mut self) {
        let raw = self.power.resetreas.read().bits();
        // SAFETY: RESETREAS bits are cleared by writing 1.
        self.power.resetreas.write(|w| unsafe { w.bits(raw) });
    }
}

impl PinInterrupts for Nrf52Board {
    fn attach(
        &mut self,
        pin: PinId,
        mode: InterruptMode,
        sink: &'static dyn WakeupSink,
    ) -> Result<(), HardwareFault> {
        self.gpio.attach(pin, mode, sink)
    }

    fn detach(&mut self, pin: PinId) -> Result<(), HardwareFault> {
        self.gpio.detach(pin)
    }

    fn suspend(&mut self) {
        self.gpio.suspend();
    }

    fn restore(&mut self) {
        self.gpio.restore();
    }

    fn configure_sense(&mut self, pin: PinId, mode: InterruptMode) -> Result<(), HardwareFault> {
        self.gpio.configure_sense(pin, mode)
    }
}

impl WakeupTimer for Nrf52Board {
    fn init(&mut self, sink: &'static dyn WakeupSink) -> Result<(), HardwareFault> {
        self.rtc.init(sink)
    }

    fn set_compare(&mut self, channel: u8, ticks: u32) -> Result<(), HardwareFault> {
        self.rtc.set_compare(channel, ticks)
    }

    fn enable(&mut self) {
        self.rtc.enable();
    }

    fn uninit(&mut self) {
        self.rtc.uninit();
    }
}

/// Board fault handler: blinks the panic code on the red status LED.
///
/// Built on demand so exception handlers can reach it without shared state.
pub fn fault_handler() -> LedFaultHandler<StatusLed, CycleDelay> {
    LedFaultHandler::new(StatusLed::new(), CycleDelay)
}
