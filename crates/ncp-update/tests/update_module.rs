//! End-to-end NCP update against mock client, cache and LED.
#![allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation
)]

use ncp_update::mocks::{MockCache, MockLed, MockNcpClient, MOCK_CHUNK_SIZE};
use ncp_update::module::{ModuleFunction, MODULE_INFO_SIZE};
use ncp_update::{fetch_module_info, update_module, CacheKey, NcpError, SystemCache, UpdateStatus};

/// Header + payload + trailing suffix bytes that must not be streamed.
fn image(payload: &[u8], version: u16) -> Vec<u8> {
    let start = 0x000D_4000_u32;
    let end = start + (MODULE_INFO_SIZE + payload.len()) as u32;
    let mut out = vec![0; MODULE_INFO_SIZE];
    out[..4].copy_from_slice(&start.to_le_bytes());
    out[4..8].copy_from_slice(&end.to_le_bytes());
    out[10..12].copy_from_slice(&version.to_le_bytes());
    out[14] = ModuleFunction::NcpFirmware as u8;
    out.extend_from_slice(payload);
    out.extend_from_slice(&[0xEE; 38]);
    out
}

#[test]
fn streams_exactly_the_payload() {
    let payload: Vec<u8> = (0..200u8).collect();
    let mut client = MockNcpClient::new(3).with_version_after_update(4);
    let mut cache = MockCache::new();
    let mut led = MockLed::new();

    let status = update_module(&mut client, &mut cache, &mut led, &image(&payload, 4)).unwrap();

    assert_eq!(status, UpdateStatus::Applied);
    assert_eq!(client.received(), payload.as_slice());
    assert_eq!(client.announced_length(), Some(200));
    assert_eq!(client.lock_depth_during_update(), 1);
    assert_eq!(client.lock_depth(), 0);
    assert!(client.on_count() >= 1);
    assert!(led.is_on());
    assert_eq!(led.toggle_count(), 200usize.div_ceil(MOCK_CHUNK_SIZE));
}

#[test]
fn cache_is_invalidated_even_when_update_fails() {
    let mut client = MockNcpClient::new(3).with_update_error(NcpError::Client(-1000));
    let mut cache = MockCache::new();
    cache.set(CacheKey::WifiNcpFirmwareVersion, &3u16.to_le_bytes()).unwrap();
    let mut led = MockLed::new();

    let result = update_module(&mut client, &mut cache, &mut led, &image(&[1, 2, 3], 4));

    assert_eq!(result, Err(NcpError::Client(-1000)));
    assert!(!cache.contains(CacheKey::WifiNcpFirmwareVersion));
    assert!(led.is_on(), "LED is left on after any attempt");
    assert_eq!(client.lock_depth(), 0);
}

#[test]
fn truncated_image_is_rejected_before_streaming() {
    let mut full = image(&[0; 64], 2);
    full.truncate(MODULE_INFO_SIZE + 10);
    let mut client = MockNcpClient::new(1);
    let mut cache = MockCache::new();
    let mut led = MockLed::new();

    let result = update_module(&mut client, &mut cache, &mut led, &full);

    assert_eq!(result, Err(NcpError::InvalidModule));
    assert_eq!(client.announced_length(), None);
    assert_eq!(cache.delete_count(), 0);
    assert_eq!(client.lock_depth(), 0);
}

#[test]
fn version_query_failure_does_not_block_update() {
    let mut client = MockNcpClient::new(1).with_version_error(NcpError::Client(-160));
    let mut cache = MockCache::new();
    let mut led = MockLed::new();
    let result = update_module(&mut client, &mut cache, &mut led, &image(&[9; 10], 2));
    assert_eq!(result, Ok(UpdateStatus::Applied));
    assert_eq!(client.received(), &[9; 10]);
}

#[test]
fn module_info_reports_cached_version() {
    let mut client = MockNcpClient::new(99);
    let mut cache = MockCache::new();
    cache.set(CacheKey::WifiNcpFirmwareVersion, &7u16.to_le_bytes()).unwrap();

    let module = fetch_module_info(&mut client, &mut cache);

    assert_eq!(module.info.version, 7);
    assert_eq!(module.info.module_function(), Some(ModuleFunction::NcpFirmware));
    assert_eq!(module.validity_checked, module.validity_result);
}

#[test]
fn module_info_version_defaults_to_zero() {
    let mut client = MockNcpClient::new(5).with_version_error(NcpError::Client(-160));
    let mut cache = MockCache::failing();
    let module = fetch_module_info(&mut client, &mut cache);
    assert_eq!(module.info.version, 0);
    assert!(module.suffix.sha.iter().all(|b| *b == 0));
}
