//! Mock collaborators for testing the update path.

#![cfg(any(test, feature = "std"))]

extern crate std;

use core::convert::Infallible;
use std::collections::BTreeMap;
use std::vec::Vec;

use embedded_hal::digital::{ErrorType, OutputPin, StatefulOutputPin};

use crate::cache::{CacheKey, SystemCache};
use crate::client::NcpClient;
use crate::error::NcpError;
use crate::stream::InputStream;

/// Chunk size the mock client reads the image in.
pub const MOCK_CHUNK_SIZE: usize = 64;

/// Scriptable NCP client that records what it was sent.
pub struct MockNcpClient {
    version: u16,
    version_after_update: Option<u16>,
    version_error: Option<NcpError>,
    update_error: Option<NcpError>,
    received: Vec<u8>,
    announced_length: Option<usize>,
    lock_depth: u32,
    max_lock_depth: u32,
    lock_depth_during_update: u32,
    on_count: usize,
}

impl MockNcpClient {
    /// Client running firmware `version`.
    pub fn new(version: u16) -> Self {
        Self {
            version,
            version_after_update: None,
            version_error: None,
            update_error: None,
            received: Vec::new(),
            announced_length: None,
            lock_depth: 0,
            max_lock_depth: 0,
            lock_depth_during_update: 0,
            on_count: 0,
        }
    }

    /// Report `version` once an update succeeds.
    pub fn with_version_after_update(mut self, version: u16) -> Self {
        self.version_after_update = Some(version);
        self
    }

    /// Fail every version query with `err`.
    pub fn with_version_error(mut self, err: NcpError) -> Self {
        self.version_error = Some(err);
        self
    }

    /// Fail the update with `err` after consuming the image.
    pub fn with_update_error(mut self, err: NcpError) -> Self {
        self.update_error = Some(err);
        self
    }

    /// Bytes received through the stream.
    pub fn received(&self) -> &[u8] {
        &self.received
    }

    /// Length passed to `update_firmware`.
    pub fn announced_length(&self) -> Option<usize> {
        self.announced_length
    }

    /// Current lock depth.
    pub fn lock_depth(&self) -> u32 {
        self.lock_depth
    }

    /// Deepest lock nesting observed.
    pub fn max_lock_depth(&self) -> u32 {
        self.max_lock_depth
    }

    /// Lock depth while `update_firmware` ran.
    pub fn lock_depth_during_update(&self) -> u32 {
        self.lock_depth_during_update
    }

    /// Number of `on` calls.
    pub fn on_count(&self) -> usize {
        self.on_count
    }
}

impl NcpClient for MockNcpClient {
    fn lock(&mut self) {
        self.lock_depth = self.lock_depth.saturating_add(1);
        self.max_lock_depth = self.max_lock_depth.max(self.lock_depth);
    }

    fn unlock(&mut self) {
        self.lock_depth = self.lock_depth.saturating_sub(1);
    }

    fn on(&mut self) -> Result<(), NcpError> {
        self.on_count = self.on_count.saturating_add(1);
        Ok(())
    }

    fn firmware_module_version(&mut self) -> Result<u16, NcpError> {
        match self.version_error {
            Some(err) => Err(err),
            None => Ok(self.version),
        }
    }

    fn update_firmware<S: InputStream>(
        &mut self,
        image: &mut S,
        length: usize,
    ) -> Result<(), NcpError> {
        self.announced_length = Some(length);
        self.lock_depth_during_update = self.lock_depth;
        let mut chunk = [0; MOCK_CHUNK_SIZE];
        loop {
            match image.read(&mut chunk) {
                Ok(n) => self.received.extend_from_slice(chunk.get(..n).unwrap_or_default()),
                Err(NcpError::EndOfStream) => break,
                Err(err) => return Err(err),
            }
        }
        if let Some(err) = self.update_error {
            return Err(err);
        }
        if let Some(version) = self.version_after_update {
            self.version = version;
        }
        Ok(())
    }
}

/// Status LED that counts toggles.
#[derive(Debug, Default)]
pub struct MockLed {
    on: bool,
    toggles: usize,
}

impl MockLed {
    /// LED, off.
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if lit.
    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Number of toggles.
    pub fn toggle_count(&self) -> usize {
        self.toggles
    }
}

impl ErrorType for MockLed {
    type Error = Infallible;
}

impl OutputPin for MockLed {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.on = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.on = true;
        Ok(())
    }
}

impl StatefulOutputPin for MockLed {
    fn is_set_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.on)
    }

    fn is_set_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.on)
    }

    fn toggle(&mut self) -> Result<(), Infallible> {
        self.on = !self.on;
        self.toggles = self.toggles.saturating_add(1);
        Ok(())
    }
}

/// In-memory system cache.
#[derive(Debug, Default)]
pub struct MockCache {
    entries: BTreeMap<CacheKey, Vec<u8>>,
    deletes: usize,
    failing: bool,
}

impl MockCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache whose every operation fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// `true` if `key` is stored.
    pub fn contains(&self, key: CacheKey) -> bool {
        self.entries.contains_key(&key)
    }

    /// Number of `del` calls.
    pub fn delete_count(&self) -> usize {
        self.deletes
    }
}

impl SystemCache for MockCache {
    fn get(&mut self, key: CacheKey, buf: &mut [u8]) -> Result<usize, NcpError> {
        if self.failing {
            return Err(NcpError::Cache);
        }
        let entry = self.entries.get(&key).ok_or(NcpError::Cache)?;
        let n = entry.len().min(buf.len());
        if let (Some(dst), Some(src)) = (buf.get_mut(..n), entry.get(..n)) {
            dst.copy_from_slice(src);
        }
        Ok(entry.len())
    }

    fn set(&mut self, key: CacheKey, value: &[u8]) -> Result<(), NcpError> {
        if self.failing {
            return Err(NcpError::Cache);
        }
        self.entries.insert(key, value.to_vec());
        Ok(())
    }

    fn del(&mut self, key: CacheKey) -> Result<(), NcpError> {
        self.deletes = self.deletes.saturating_add(1);
        if self.failing {
            return Err(NcpError::Cache);
        }
        self.entries.remove(&key);
        Ok(())
    }
}
