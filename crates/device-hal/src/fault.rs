//! Fatal fault capture and escalation.
//!
//! Exception handlers capture a [`FaultRecord`] from the stacked exception
//! frame; sequencer failures arrive as [`HardwareFault`]. Either way the
//! single [`FaultHandler`] signals the panic code and halts.

use crate::error::{HardwareFault, SleepError};

/// Panic codes. The status LED flashes this many times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PanicCode {
    /// Hard fault.
    HardFault = 1,
    /// Non-maskable interrupt fault.
    NmiFault = 2,
    /// Memory management fault.
    MemManage = 3,
    /// Bus fault.
    BusFault = 4,
    /// Usage fault (including divide by zero).
    UsageFault = 5,
    /// Invalid length.
    InvalidLength = 6,
    /// Exit called.
    Exit = 7,
    /// Heap exhausted.
    OutOfHeap = 8,
    /// SPI overrun.
    SpiOverrun = 9,
    /// Assertion failed.
    AssertionFailure = 10,
    /// Invalid case.
    InvalidCase = 11,
    /// Pure virtual call.
    PureVirtualCall = 12,
    /// Stack overflow.
    StackOverflow = 13,
    /// Heap corruption.
    HeapError = 14,
}

impl PanicCode {
    /// Number of LED flashes that signal this code.
    pub const fn flash_count(self) -> u8 {
        self as u8
    }
}

/// Which exception vector captured the fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultKind {
    /// HardFault vector.
    HardFault,
    /// MemManage vector.
    MemManage,
    /// BusFault vector.
    BusFault,
    /// UsageFault vector.
    UsageFault,
}

/// Configurable Fault Status Register: divide-by-zero usage fault bit.
pub const CFSR_DIVBYZERO: u32 = 1 << 25;

/// Registers stacked by the CPU on exception entry, plus fault status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FaultRecord {
    /// Exception vector that fired.
    pub kind: FaultKind,
    /// R0..R3.
    pub r: [u32; 4],
    /// R12.
    pub r12: u32,
    /// Link register.
    pub lr: u32,
    /// Faulting program counter.
    pub pc: u32,
    /// Program status register.
    pub psr: u32,
    /// CFSR at capture time.
    pub cfsr: u32,
}

impl FaultRecord {
    /// Build from the 8-word exception frame
    /// `[r0, r1, r2, r3, r12, lr, pc, psr]`.
    pub const fn from_frame(kind: FaultKind, frame: [u32; 8], cfsr: u32) -> Self {
        let [r0, r1, r2, r3, r12, lr, pc, psr] = frame;
        Self {
            kind,
            r: [r0, r1, r2, r3],
            r12,
            lr,
            pc,
            psr,
            cfsr,
        }
    }

    /// Panic code to signal. A hard fault escalated from a divide by zero
    /// reports as a usage fault.
    pub const fn panic_code(&self) -> PanicCode {
        match self.kind {
            FaultKind::HardFault if self.cfsr & CFSR_DIVBYZERO != 0 => PanicCode::UsageFault,
            FaultKind::HardFault => PanicCode::HardFault,
            FaultKind::MemManage => PanicCode::MemManage,
            FaultKind::BusFault => PanicCode::BusFault,
            FaultKind::UsageFault => PanicCode::UsageFault,
        }
    }
}

/// Fatal condition handed to the [`FaultHandler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fatal {
    /// CPU exception.
    Exception(FaultRecord),
    /// Platform call failed during a sequence assumed infallible.
    Hardware(HardwareFault),
}

impl Fatal {
    /// Panic code to signal.
    pub const fn panic_code(&self) -> PanicCode {
        match self {
            Self::Exception(record) => record.panic_code(),
            Self::Hardware(_) => PanicCode::AssertionFailure,
        }
    }
}

/// The one place a fatal condition turns into a halt.
pub trait FaultHandler {
    /// Signal `fatal` (LED pattern, log) and stop. Never returns.
    fn halt(&mut self, fatal: Fatal) -> !;
}

/// Escalate a fatal sleep error; pass recoverable results through.
pub fn escalate<T, H>(result: Result<T, SleepError>, handler: &mut H) -> Result<T, crate::HalError>
where
    H: FaultHandler + ?Sized,
{
    match result {
        Ok(value) => Ok(value),
        Err(SleepError::Rejected(err)) => Err(err),
        Err(SleepError::Fatal(fault)) => {
            error!("fatal hardware fault: {:?}", fault);
            handler.halt(Fatal::Hardware(fault))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HalError;

    struct PanickingHandler;

    impl FaultHandler for PanickingHandler {
        #[allow(clippy::panic)]
        fn halt(&mut self, fatal: Fatal) -> ! {
            std::panic!("halted with {:?}", fatal.panic_code());
        }
    }

    #[test]
    fn divide_by_zero_hard_fault_reports_usage_fault() {
        let record = FaultRecord::from_frame(FaultKind::HardFault, [0; 8], CFSR_DIVBYZERO);
        assert_eq!(record.panic_code(), PanicCode::UsageFault);
        assert_eq!(record.panic_code().flash_count(), 5);
    }

    #[test]
    fn plain_hard_fault_reports_hard_fault() {
        let record = FaultRecord::from_frame(FaultKind::HardFault, [1, 2, 3, 4, 12, 0xE, 0x1000, 0x0100_0000], 0);
        assert_eq!(record.panic_code(), PanicCode::HardFault);
        assert_eq!(record.pc, 0x1000);
        assert_eq!(record.r, [1, 2, 3, 4]);
    }

    #[test]
    fn recoverable_errors_pass_through() {
        let result: Result<(), SleepError> = Err(HalError::InvalidArgument.into());
        assert_eq!(escalate(result, &mut PanickingHandler), Err(HalError::InvalidArgument));
    }

    #[test]
    #[should_panic(expected = "AssertionFailure")]
    fn fatal_errors_halt() {
        let result: Result<(), SleepError> = Err(HardwareFault::Clock.into());
        let _ = escalate(result, &mut PanickingHandler);
    }
}
