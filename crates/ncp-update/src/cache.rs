//! System cache access for the NCP firmware version.
//!
//! Reading the version from the NCP means powering it up, so the last
//! known version is cached. The NCP client refreshes the entry itself;
//! this side only reads it and invalidates it around updates.

use crate::client::{NcpClient, NcpClientLock};
use crate::error::NcpError;

/// Keys in the system cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CacheKey {
    /// Wi-Fi NCP firmware version, 2 bytes little-endian.
    WifiNcpFirmwareVersion,
}

/// Small persistent key/value cache.
pub trait SystemCache {
    /// Copy the entry for `key` into `buf`. Returns the stored entry size,
    /// which may differ from `buf.len()`.
    fn get(&mut self, key: CacheKey, buf: &mut [u8]) -> Result<usize, NcpError>;

    /// Store `value` under `key`.
    fn set(&mut self, key: CacheKey, value: &[u8]) -> Result<(), NcpError>;

    /// Remove `key`. Removing a missing key succeeds.
    fn del(&mut self, key: CacheKey) -> Result<(), NcpError>;
}

/// Drop the cached NCP version.
pub fn invalidate_version_cache<K: SystemCache + ?Sized>(cache: &mut K) -> Result<(), NcpError> {
    trace!("invalidating cached NCP firmware version");
    cache.del(CacheKey::WifiNcpFirmwareVersion)
}

/// NCP firmware version, from the cache when possible.
///
/// A malformed cache entry is deleted. On a miss the NCP itself is asked,
/// under its lock.
pub fn firmware_version<C, K>(client: &mut C, cache: &mut K) -> Result<u16, NcpError>
where
    C: NcpClient,
    K: SystemCache + ?Sized,
{
    let mut buf = [0; 2];
    match cache.get(CacheKey::WifiNcpFirmwareVersion, &mut buf) {
        Ok(2) => {
            let version = u16::from_le_bytes(buf);
            trace!("cached NCP firmware version: {}", version);
            return Ok(version);
        }
        Ok(len) => {
            debug!("malformed NCP version cache entry ({} bytes)", len);
            if invalidate_version_cache(cache).is_err() {
                warn!("failed to drop malformed NCP version cache entry");
            }
        }
        Err(_) => {}
    }

    let mut client = NcpClientLock::new(client);
    client.on()?;
    client.firmware_module_version()
}
