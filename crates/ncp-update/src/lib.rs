//! Firmware update path for the network co-processor (NCP)
//!
//! The NCP runs its own firmware, delivered as a regular module image. The
//! MCU streams the payload to the NCP client ([`update::update_module`]) and
//! reports a synthetic module descriptor for it in system describe
//! information ([`update::fetch_module_info`]), backed by a cached version.
//!
//! # Features
//!
//! - `std`: expose [`mocks`] for tests
//! - `defmt`: `defmt::Format` derives and defmt logging
//! - `tracing`: route log macros to `tracing`

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

#[macro_use]
mod fmt;

pub mod cache;
pub mod client;
pub mod error;
pub mod module;
pub mod stream;
pub mod update;

#[cfg(any(test, feature = "std"))]
pub mod mocks;

pub use cache::{CacheKey, SystemCache};
pub use client::{NcpClient, NcpClientLock};
pub use error::NcpError;
pub use module::{ModuleDescriptor, ModuleFunction, ModuleInfo, ModuleValidation};
pub use stream::{ImageStream, InputStream, StreamEvents};
pub use update::{fetch_module_info, update_module, UpdateStatus};
