//! nRF52840 register-level implementations of the HAL collaborator traits.
//!
//! | Module          | Provides                                        |
//! |-----------------|-------------------------------------------------|
//! | [`board`]       | `Nrf52Board`: clocks, power, USB, UART, QSPI    |
//! | [`gpiote`]      | GPIO wakeup interrupts and standby sense        |
//! | [`rtc`]         | RTC2 wakeup timer                               |
//! | [`retained`]    | Backup register slots in `.uninit` RAM          |
//! | [`nvmc`]        | Configuration page in internal flash (NorFlash) |
//! | [`heap`]        | Guarded global allocator                        |
//! | [`led`]         | Status LED and cycle delay for fault signalling |

pub mod board;
pub mod gpiote;
pub mod heap;
pub mod led;
pub mod nvmc;
pub mod retained;
pub mod rtc;

pub use board::{fault_handler, Nrf52Board};
pub use nvmc::DctFlash;
