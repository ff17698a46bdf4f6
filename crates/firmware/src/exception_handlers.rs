//! Cortex-M fault exception handlers.
//!
//! Each handler captures a [`FaultRecord`] and hands it to the board's
//! [`FaultHandler`](device_hal::FaultHandler), which blinks the panic code on
//! the status LED and never returns.
//!
//! - **HardFault**: has the stacked exception frame, so the record carries
//!   the faulting PC/LR/PSR. A divide by zero trapped through CCR.DIV_0_TRP
//!   reports as a usage fault.
//! - **MemoryManagement / BusFault / UsageFault**: enabled in SHCSR at boot;
//!   cortex-m-rt gives these no frame, so registers are recorded as zero.
//!
//! The `#[cortex_m_rt::exception]` handlers are gated behind the `hardware`
//! feature. [`record_from_frame`] is plain data and compiles everywhere.

#![allow(clippy::doc_markdown)]

use device_hal::{FaultKind, FaultRecord};

/// Build a record from the eight stacked words
/// `[r0, r1, r2, r3, r12, lr, pc, xpsr]` and the CFSR value.
pub fn record_from_frame(kind: FaultKind, frame: [u32; 8], cfsr: u32) -> FaultRecord {
    FaultRecord::from_frame(kind, frame, cfsr)
}

#[cfg(feature = "hardware")]
mod handlers {
    use super::record_from_frame;
    use crate::hardware::board;
    use cortex_m::peripheral::SCB;
    use cortex_m_rt::{exception, ExceptionFrame};
    use device_hal::{Fatal, FaultHandler, FaultKind};

    fn cfsr() -> u32 {
        // SAFETY: read-only access to CFSR; the core is halting.
        unsafe { (*SCB::PTR).cfsr.read() }
    }

    fn halt_with(kind: FaultKind, frame: [u32; 8]) -> ! {
        let record = record_from_frame(kind, frame, cfsr());
        defmt::error!(
            "{:?}: pc=0x{:08X} lr=0x{:08X} cfsr=0x{:08X}",
            kind,
            record.pc,
            record.lr,
            record.cfsr
        );
        board::fault_handler().halt(Fatal::Exception(record))
    }

    /// HardFault handler. Must never return.
    #[exception]
    unsafe fn HardFault(ef: &ExceptionFrame) -> ! {
        halt_with(
            FaultKind::HardFault,
            [
                ef.r0(),
                ef.r1(),
                ef.r2(),
                ef.r3(),
                ef.r12(),
                ef.lr(),
                ef.pc(),
                ef.xpsr(),
            ],
        )
    }

    #[exception]
    fn MemoryManagement() -> ! {
        halt_with(FaultKind::MemManage, [0; 8])
    }

    #[exception]
    fn BusFault() -> ! {
        halt_with(FaultKind::BusFault, [0; 8])
    }

    #[exception]
    fn UsageFault() -> ! {
        halt_with(FaultKind::UsageFault, [0; 8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use device_hal::fault::CFSR_DIVBYZERO;
    use device_hal::PanicCode;

    const FRAME: [u32; 8] = [1, 2, 3, 4, 12, 0x0800_0101, 0x0800_1234, 0x0100_0000];

    #[test]
    fn frame_words_land_in_named_registers() {
        let record = record_from_frame(FaultKind::HardFault, FRAME, 0);
        assert_eq!(record.r, [1, 2, 3, 4]);
        assert_eq!(record.r12, 12);
        assert_eq!(record.lr, 0x0800_0101);
        assert_eq!(record.pc, 0x0800_1234);
        assert_eq!(record.psr, 0x0100_0000);
        assert_eq!(record.panic_code(), PanicCode::HardFault);
    }

    #[test]
    fn trapped_divide_by_zero_reports_usage_fault() {
        let record = record_from_frame(FaultKind::HardFault, FRAME, CFSR_DIVBYZERO);
        assert_eq!(record.panic_code(), PanicCode::UsageFault);
    }

    #[test]
    fn configurable_faults_keep_their_codes() {
        for (kind, code) in [
            (FaultKind::MemManage, PanicCode::MemManage),
            (FaultKind::BusFault, PanicCode::BusFault),
            (FaultKind::UsageFault, PanicCode::UsageFault),
        ] {
            assert_eq!(record_from_frame(kind, [0; 8], 0).panic_code(), code);
        }
    }
}
