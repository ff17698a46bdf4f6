//! Error taxonomy for the core HAL.
//!
//! Two classes of failure exist and they never mix:
//!
//! - [`HalError`]: recoverable. Returned to the caller before any hardware
//!   state has been touched (bad request, unsupported combination).
//! - [`HardwareFault`]: an underlying platform call failed after hardware
//!   mutation began. These are never unwound; they are escalated to the
//!   single [`FaultHandler`](crate::fault::FaultHandler), which halts.
//!
//! [`SleepError`] carries either class so the sequencer stays testable
//! without halting the test process.

use thiserror_no_std::Error;

use crate::fpu::FpuFlags;
use crate::gpio::PinId;

/// Recoverable HAL errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalError {
    /// Malformed request (bad pin, bad edge mode, no wakeup source).
    #[error("invalid argument")]
    InvalidArgument,
    /// Valid request the platform cannot honour.
    #[error("operation not supported")]
    Unsupported,
    /// Requested item does not exist.
    #[error("not found")]
    NotFound,
    /// The persistent configuration store failed.
    #[error("configuration store error")]
    Storage,
}

impl HalError {
    /// Platform-wide numeric error code for this error.
    pub const fn code(self) -> SystemErrorCode {
        match self {
            // Rejected wakeup requests have always surfaced as NOT_ALLOWED.
            Self::InvalidArgument => SystemErrorCode::NotAllowed,
            Self::Unsupported => SystemErrorCode::NotSupported,
            Self::NotFound => SystemErrorCode::NotFound,
            Self::Storage => SystemErrorCode::FlashIo,
        }
    }
}

/// Numeric system error codes shared with the rest of the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(i32)]
pub enum SystemErrorCode {
    /// Success.
    None = 0,
    /// Unknown error.
    Unknown = -100,
    /// Operation not supported.
    NotSupported = -120,
    /// Operation not allowed.
    NotAllowed = -130,
    /// Not found.
    NotFound = -170,
    /// End of stream.
    EndOfStream = -210,
    /// Flash I/O error.
    FlashIo = -250,
    /// Out of memory.
    NoMemory = -260,
    /// Invalid argument.
    InvalidArgument = -270,
}

impl SystemErrorCode {
    /// Raw code value.
    pub const fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Unrecoverable platform failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HardwareFault {
    /// Attaching a GPIO wakeup interrupt failed.
    #[error("failed to attach wakeup interrupt on pin {0:?}")]
    PinAttach(PinId),
    /// Detaching a GPIO wakeup interrupt failed.
    #[error("failed to detach wakeup interrupt on pin {0:?}")]
    PinDetach(PinId),
    /// Wakeup timer initialisation or configuration failed.
    #[error("wakeup timer configuration failed")]
    Timer,
    /// The high-frequency clock could not be released or restarted.
    #[error("high-frequency clock control failed")]
    Clock,
    /// A critical floating-point exception was latched when entering sleep.
    #[error("critical FPU exception pending: {0:?}")]
    FpuException(FpuFlags),
    /// A SoC/radio-stack call returned a non-success code.
    #[error("SoC call failed with code {0}")]
    SocCall(u32),
}

/// Result of a sleep request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SleepError {
    /// Rejected or unsatisfiable request. Recoverable.
    #[error("sleep request rejected: {0}")]
    Rejected(#[from] HalError),
    /// Hardware failed mid-sequence. Must be escalated, never retried.
    #[error("fatal hardware fault: {0}")]
    Fatal(#[from] HardwareFault),
}

impl SleepError {
    /// `true` when this error must be escalated to the fault handler.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_argument_maps_to_not_allowed() {
        assert_eq!(HalError::InvalidArgument.code().as_i32(), -130);
    }

    #[test]
    fn unsupported_maps_to_not_supported() {
        assert_eq!(HalError::Unsupported.code(), SystemErrorCode::NotSupported);
        assert_eq!(SystemErrorCode::NotSupported.as_i32(), -120);
    }

    #[test]
    fn hardware_fault_converts_to_fatal_sleep_error() {
        let err: SleepError = HardwareFault::Clock.into();
        assert!(err.is_fatal());
        let err: SleepError = HalError::Unsupported.into();
        assert!(!err.is_fatal());
    }
}
