//! nRF52840 firmware glue for the device HAL.
//!
//! # Architecture
//!
//! ```text
//! Application task (main.rs)
//!         ↓
//! device_hal::HalCore (sequencer, reset info, feature flags)
//!         ↓
//! hardware::Nrf52Board (register-level collaborator traits)
//!         ↓
//! nrf52840-pac
//! ```
//!
//! Everything that touches registers lives in [`hardware`] and is gated
//! behind the `hardware` feature. [`boot`], [`config_store`] and
//! [`fault_led`] are plain logic over the HAL and `embedded-storage` traits and run on the host against `device_hal::mocks`.
//!
//! # Features
//!
//! - `hardware` - Build for the nRF52840 target (embassy executor, PAC, defmt)
//! - `std` - Host builds and tests
//!
//! # Building
//!
//! ```bash
//! cargo build --release --target thumbv7em-none-eabihf --features hardware
//! ```

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::print_stdout)] // prefer defmt over println! in lib code
#![warn(clippy::dbg_macro)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod boot;
pub mod config_store;
pub mod exception_handlers;
pub mod fault_led;

#[cfg(feature = "hardware")]
pub mod hardware;

pub use boot::{init_core, is_warm_start, BOOT_SEQUENCE_STEPS};
pub use config_store::FlashConfigStore;
pub use fault_led::{blink_pattern, LedFaultHandler, LedStep};
