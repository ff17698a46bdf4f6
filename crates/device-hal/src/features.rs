//! Runtime feature flags.
//!
//! Persistent flags live in the device configuration table (DCT), one byte
//! each. On flash a *set* bit 0 means the feature is **disabled**, so an
//! erased byte (`0xFF`) reads as disabled. Callers only ever see
//! `enabled: bool`.

use crate::error::HalError;

/// Feature flags understood by the HAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Feature {
    /// Persist and classify reset reasons.
    ResetInfo,
    /// Keep the retained-memory section across resets.
    RetainedMemory,
    /// Current boot is a warm start (read-only, decided at boot).
    WarmStart,
    /// Cloud transport is UDP (fixed on this platform).
    CloudUdp,
}

/// Where a feature's value comes from.
enum Backing {
    /// DCT byte at this offset, inverted logic.
    Persisted(u16),
    /// Runtime state, not settable.
    Runtime,
    /// Constant for the platform.
    Fixed(bool),
}

impl Feature {
    fn backing(self) -> Backing {
        match self {
            Self::ResetInfo => Backing::Persisted(DCT_FEATURE_RESET_INFO_OFFSET),
            Self::RetainedMemory => Backing::Persisted(DCT_FEATURE_RETAINED_MEMORY_OFFSET),
            Self::WarmStart => Backing::Runtime,
            Self::CloudUdp => Backing::Fixed(true),
        }
    }
}

/// DCT offset of the reset-info flag byte.
pub const DCT_FEATURE_RESET_INFO_OFFSET: u16 = 1753;
/// DCT offset of the retained-memory flag byte.
pub const DCT_FEATURE_RETAINED_MEMORY_OFFSET: u16 = 1754;

const DISABLED_BIT: u8 = 0x01;

/// Persistent byte-addressed configuration store (the DCT).
pub trait ConfigStore {
    /// Read the byte at `offset`.
    fn read_byte(&self, offset: u16) -> Result<u8, HalError>;

    /// Write the byte at `offset`.
    fn write_byte(&mut self, offset: u16, value: u8) -> Result<(), HalError>;
}

/// Feature flag accessor over a [`ConfigStore`].
pub struct FeatureFlags<S> {
    store: S,
    warm_start: bool,
}

impl<S: ConfigStore> FeatureFlags<S> {
    /// Wrap a store. `warm_start` records whether this boot kept RAM.
    pub fn new(store: S, warm_start: bool) -> Self {
        Self { store, warm_start }
    }

    /// `true` if `feature` is enabled. A store read failure reads as disabled.
    pub fn get(&self, feature: Feature) -> bool {
        match feature.backing() {
            Backing::Persisted(offset) => self
                .store
                .read_byte(offset)
                .map(|byte| byte & DISABLED_BIT == 0)
                .unwrap_or(false),
            Backing::Runtime => self.warm_start,
            Backing::Fixed(value) => value,
        }
    }

    /// Enable or disable a persisted feature.
    pub fn set(&mut self, feature: Feature, enabled: bool) -> Result<(), HalError> {
        let Backing::Persisted(offset) = feature.backing() else {
            return Err(HalError::Unsupported);
        };
        let current = self.store.read_byte(offset)?;
        let updated = if enabled {
            current & !DISABLED_BIT
        } else {
            current | DISABLED_BIT
        };
        if updated != current {
            self.store.write_byte(offset, updated)?;
            info!("feature {:?} -> {}", feature, enabled);
        }
        Ok(())
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::MockConfigStore;

    #[test]
    fn erased_flash_reads_disabled() {
        let flags = FeatureFlags::new(MockConfigStore::erased(), false);
        assert!(!flags.get(Feature::ResetInfo));
        assert!(!flags.get(Feature::RetainedMemory));
    }

    #[test]
    fn enable_clears_the_disabled_bit() {
        let mut flags = FeatureFlags::new(MockConfigStore::erased(), false);
        flags.set(Feature::ResetInfo, true).unwrap();
        assert!(flags.get(Feature::ResetInfo));
        assert_eq!(
            flags.store().byte(DCT_FEATURE_RESET_INFO_OFFSET),
            0xFE,
            "only bit 0 changes; the rest of the byte is preserved"
        );
        flags.set(Feature::ResetInfo, false).unwrap();
        assert!(!flags.get(Feature::ResetInfo));
    }

    #[test]
    fn redundant_set_does_not_write() {
        let mut flags = FeatureFlags::new(MockConfigStore::erased(), false);
        flags.set(Feature::RetainedMemory, false).unwrap();
        assert_eq!(flags.store().write_count(), 0);
    }

    #[test]
    fn runtime_and_fixed_features() {
        let mut flags = FeatureFlags::new(MockConfigStore::erased(), true);
        assert!(flags.get(Feature::WarmStart));
        assert!(flags.get(Feature::CloudUdp));
        assert_eq!(flags.set(Feature::WarmStart, false), Err(HalError::Unsupported));
        assert_eq!(flags.set(Feature::CloudUdp, false), Err(HalError::Unsupported));
    }

    #[test]
    fn store_failure_reads_disabled() {
        let flags = FeatureFlags::new(MockConfigStore::failing(), false);
        assert!(!flags.get(Feature::ResetInfo));
    }
}
