//! Error types for the NCP update path.

use device_hal::SystemErrorCode;
use thiserror_no_std::Error;

/// NCP update errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NcpError {
    /// The image stream has no bytes left.
    #[error("end of stream")]
    EndOfStream,
    /// Bad argument, e.g. waiting on an event the stream never raises.
    #[error("invalid argument")]
    InvalidArgument,
    /// The module descriptor is truncated or its bounds are inconsistent.
    #[error("invalid module")]
    InvalidModule,
    /// The NCP client reported this system error code.
    #[error("NCP client error {0}")]
    Client(i32),
    /// The system cache failed.
    #[error("system cache error")]
    Cache,
}

impl NcpError {
    /// Platform-wide numeric error code.
    pub const fn code(self) -> i32 {
        match self {
            Self::EndOfStream => SystemErrorCode::EndOfStream.as_i32(),
            Self::InvalidArgument => SystemErrorCode::InvalidArgument.as_i32(),
            Self::InvalidModule => SystemErrorCode::NotFound.as_i32(),
            Self::Client(code) => code,
            Self::Cache => SystemErrorCode::FlashIo.as_i32(),
        }
    }
}

impl embedded_io::Error for NcpError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            Self::InvalidArgument => embedded_io::ErrorKind::InvalidInput,
            Self::InvalidModule => embedded_io::ErrorKind::InvalidData,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}
