//! Core hardware abstraction layer for the nRF52840 device
//!
//! This crate holds the parts of the HAL that are pure logic over a small
//! set of collaborator traits, so they run unchanged on hardware and under
//! `cargo test`.
//!
//! # Architecture Layers
//!
//! ```text
//! Application (firmware crate tasks)
//!         ↓
//! HalCore (this crate: reset info, backup registers, stop/standby)
//!         ↓
//! Collaborator traits (PinInterrupts, WakeupTimer, PeripheralControl, ...)
//!         ↓
//! Board implementation (firmware crate, nrf52840-pac)
//! ```
//!
//! # Subsystems
//!
//! - [`backup`] - 1-based retained registers that survive warm resets
//! - [`reset`] - boot-time reset-reason classifier
//! - [`wakeup`] - interrupt-written wakeup state and tie-break
//! - [`sleep`] - stop/standby mode sequencer
//! - [`features`] - persisted feature flags with inverted on-flash logic
//! - [`fault`] - fault records and the single fatal escalation path
//! - [`heap_lock`] - reentrant allocator guard
//!
//! # Features
//!
//! - `std`: expose [`mocks`] to other crates' tests
//! - `defmt`: `defmt::Format` derives and defmt logging (hardware builds)
//! - `tracing`: route log macros to `tracing` (host builds)
//!
//! # Example
//!
//! ```no_run
//! use device_hal::{sleep::StopModeRequest, InterruptMode};
//!
//! let request = StopModeRequest {
//!     pins: &[5],
//!     edge_modes: &[InterruptMode::RisingEdge],
//!     timeout_seconds: 0,
//! };
//! assert!(request.validate().is_ok());
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

// Must come first so the log macros are visible to every module below.
#[macro_use]
mod fmt;

pub mod backup;
pub mod config;
pub mod crc;
pub mod error;
pub mod fault;
pub mod features;
pub mod fpu;
pub mod gpio;
pub mod heap_lock;
pub mod power;
pub mod reset;
pub mod runtime;
pub mod sleep;
pub mod timer;
pub mod wakeup;

#[cfg(any(test, feature = "std"))]
pub mod mocks;

pub use backup::{backup_register_offset, BackupRegisters, BackupSlots};
pub use config::{system_clock, SystemClock};
pub use crc::compute_crc32;
pub use error::{HalError, HardwareFault, SleepError, SystemErrorCode};
pub use fault::{escalate, Fatal, FaultHandler, FaultKind, FaultRecord, PanicCode};
pub use features::{ConfigStore, Feature, FeatureFlags};
pub use fpu::FpuFlags;
pub use gpio::{InterruptMode, PinId, PinInterrupts};
pub use heap_lock::{GuardedAlloc, ReentrantLock};
pub use power::{CoreControl, LowPowerPlatform, PeripheralControl, StandbyFlags};
pub use reset::{ResetCause, ResetFlags, ResetInfo, ResetReason};
pub use runtime::HalCore;
pub use sleep::{enter_standby_mode, enter_stop_mode, StopModeRequest, WakeupPlan};
pub use timer::WakeupTimer;
pub use wakeup::{WakeupEvent, WakeupInfo, WakeupReason, WakeupSink, WakeupSources};
