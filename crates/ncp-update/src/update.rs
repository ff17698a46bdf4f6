//! NCP firmware update orchestration.

use embedded_hal::digital::StatefulOutputPin;

use crate::cache::{firmware_version, invalidate_version_cache, SystemCache};
use crate::client::{NcpClient, NcpClientLock};
use crate::error::NcpError;
use crate::module::{ModuleDescriptor, ModuleInfo, MODULE_INFO_SIZE};
use crate::stream::ImageStream;

/// Outcome of a successful update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateStatus {
    /// The NCP is running the new image; no MCU reset needed.
    Applied,
}

/// Flash `module` (header followed by payload) to the NCP.
///
/// The client lock is held for the whole operation so the network layer
/// cannot power the NCP off mid-update. The version cache is invalidated
/// before streaming, whatever the outcome. The status LED toggles as the
/// image streams and is left on afterwards.
pub fn update_module<C, K, L>(
    client: &mut C,
    cache: &mut K,
    led: &mut L,
    module: &[u8],
) -> Result<UpdateStatus, NcpError>
where
    C: NcpClient,
    K: SystemCache + ?Sized,
    L: StatefulOutputPin,
{
    let mut client = NcpClientLock::new(client);
    client.on()?;

    let info = ModuleInfo::parse(module)?;
    let length = info
        .span()?
        .checked_sub(MODULE_INFO_SIZE)
        .ok_or(NcpError::InvalidModule)?;
    let payload = module
        .get(MODULE_INFO_SIZE..)
        .and_then(|rest| rest.get(..length))
        .ok_or(NcpError::InvalidModule)?;

    if let Ok(current) = client.firmware_module_version() {
        info!(
            "updating NCP firmware from version {} to version {}",
            current, info.version
        );
    }

    if invalidate_version_cache(cache).is_err() {
        warn!("failed to invalidate NCP version cache");
    }

    let result = {
        let mut stream = ImageStream::new(payload, led);
        client.update_firmware(&mut stream, length)
    };
    if led.set_high().is_err() {
        trace!("status LED set failed");
    }
    if let Err(err) = result {
        error!("NCP firmware update failed: {}", err.code());
        return Err(err);
    }

    if let Ok(updated) = client.firmware_module_version() {
        info!("NCP firmware version updated to version {}", updated);
    }
    Ok(UpdateStatus::Applied)
}

/// Describe the NCP firmware module. The version falls back to `0` when
/// neither the cache nor the NCP can supply it.
pub fn fetch_module_info<C, K>(client: &mut C, cache: &mut K) -> ModuleDescriptor
where
    C: NcpClient,
    K: SystemCache + ?Sized,
{
    let version = firmware_version(client, cache).unwrap_or_else(|err| {
        warn!("NCP firmware version unavailable: {}", err.code());
        0
    });
    ModuleDescriptor::synthetic_ncp(version)
}
