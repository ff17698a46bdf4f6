//! Module descriptors.
//!
//! Every firmware module starts with a 24-byte little-endian header:
//!
//! ```text
//! offset  size  field
//!      0     4  start address
//!      4     4  end address (exclusive; covers header + payload)
//!      8     1  reserved
//!      9     1  flags
//!     10     2  module version
//!     12     2  platform id
//!     14     1  module function
//!     15     1  module index
//!     16     4  dependency     (function, index, version)
//!     20     4  dependency 2   (function, index, version)
//! ```

use device_hal::config::PLATFORM_ID;

use crate::error::NcpError;

/// Size of the serialised module header.
pub const MODULE_INFO_SIZE: usize = 24;

/// Length of the SHA-256 field in the module suffix.
pub const MODULE_SHA_SIZE: usize = 32;

/// What a module is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ModuleFunction {
    /// Unused slot.
    None = 0,
    /// Resource blob.
    Resource = 1,
    /// Bootloader.
    Bootloader = 2,
    /// Monolithic firmware.
    MonoFirmware = 3,
    /// System part.
    SystemPart = 4,
    /// User application.
    UserPart = 5,
    /// Settings.
    Settings = 6,
    /// Network co-processor firmware.
    NcpFirmware = 7,
    /// Radio stack.
    RadioStack = 8,
}

impl ModuleFunction {
    /// Decode a raw function byte.
    pub const fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::None,
            1 => Self::Resource,
            2 => Self::Bootloader,
            3 => Self::MonoFirmware,
            4 => Self::SystemPart,
            5 => Self::UserPart,
            6 => Self::Settings,
            7 => Self::NcpFirmware,
            8 => Self::RadioStack,
            _ => return None,
        })
    }
}

/// Module dependency reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModuleDependency {
    /// Raw module function.
    pub function: u8,
    /// Module index.
    pub index: u8,
    /// Minimum version.
    pub version: u16,
}

impl ModuleDependency {
    fn parse(bytes: [u8; 4]) -> Self {
        let [function, index, lo, hi] = bytes;
        Self {
            function,
            index,
            version: u16::from_le_bytes([lo, hi]),
        }
    }
}

/// Parsed module header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModuleInfo {
    /// Start address.
    pub start_address: u32,
    /// End address, exclusive.
    pub end_address: u32,
    /// Flags.
    pub flags: u8,
    /// Module version.
    pub version: u16,
    /// Platform the module targets.
    pub platform_id: u16,
    /// Raw module function.
    pub function: u8,
    /// Module index.
    pub index: u8,
    /// First dependency.
    pub dependency: ModuleDependency,
    /// Second dependency.
    pub dependency2: ModuleDependency,
}

impl ModuleInfo {
    /// Parse the header at the start of `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<Self, NcpError> {
        let header: &[u8; MODULE_INFO_SIZE] = bytes
            .get(..MODULE_INFO_SIZE)
            .and_then(|h| h.try_into().ok())
            .ok_or(NcpError::InvalidModule)?;
        let [s0, s1, s2, s3, e0, e1, e2, e3, _reserved, flags, v0, v1, p0, p1, function, index, d0, d1, d2, d3, f0, f1, f2, f3] =
            *header;
        Ok(Self {
            start_address: u32::from_le_bytes([s0, s1, s2, s3]),
            end_address: u32::from_le_bytes([e0, e1, e2, e3]),
            flags,
            version: u16::from_le_bytes([v0, v1]),
            platform_id: u16::from_le_bytes([p0, p1]),
            function,
            index,
            dependency: ModuleDependency::parse([d0, d1, d2, d3]),
            dependency2: ModuleDependency::parse([f0, f1, f2, f3]),
        })
    }

    /// Decoded module function, if known.
    pub fn module_function(&self) -> Option<ModuleFunction> {
        ModuleFunction::from_raw(self.function)
    }

    /// Bytes covered by `[start_address, end_address)`.
    pub fn span(&self) -> Result<usize, NcpError> {
        let span = self
            .end_address
            .checked_sub(self.start_address)
            .ok_or(NcpError::InvalidModule)?;
        usize::try_from(span).map_err(|_| NcpError::InvalidModule)
    }
}

/// Validation checks recorded against a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModuleValidation(u16);

impl ModuleValidation {
    /// CRC / SHA integrity.
    pub const INTEGRITY: Self = Self(1 << 1);
    /// Dependencies satisfied.
    pub const DEPENDENCIES: Self = Self(1 << 2);
    /// Address range.
    pub const RANGE: Self = Self(1 << 3);
    /// Platform id.
    pub const PLATFORM: Self = Self(1 << 4);

    /// Raw bits.
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Union of two sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// `true` if all bits of `other` are set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Module suffix. Only the SHA field matters to the update path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModuleSuffix {
    /// SHA-256 of the module.
    pub sha: [u8; MODULE_SHA_SIZE],
}

/// A module as reported in system describe information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModuleDescriptor {
    /// Header.
    pub info: ModuleInfo,
    /// Suffix.
    pub suffix: ModuleSuffix,
    /// Checks performed.
    pub validity_checked: ModuleValidation,
    /// Checks passed.
    pub validity_result: ModuleValidation,
}

impl ModuleDescriptor {
    /// Descriptor for NCP firmware at `version`.
    ///
    /// The NCP image is not resident in MCU flash. Every check is reported
    /// as passed (the image was validated when flashed to the NCP). The NCP
    /// reports no hash, so the SHA field repeats the version; the suffix
    /// must still change whenever the version does.
    pub fn synthetic_ncp(version: u16) -> Self {
        let checks = ModuleValidation::RANGE
            .union(ModuleValidation::DEPENDENCIES)
            .union(ModuleValidation::PLATFORM)
            .union(ModuleValidation::INTEGRITY);
        let mut sha = [0; MODULE_SHA_SIZE];
        for chunk in sha.chunks_exact_mut(2) {
            chunk.copy_from_slice(&version.to_le_bytes());
        }
        Self {
            info: ModuleInfo {
                version,
                platform_id: PLATFORM_ID,
                function: ModuleFunction::NcpFirmware as u8,
                ..ModuleInfo::default()
            },
            suffix: ModuleSuffix { sha },
            validity_checked: checks,
            validity_result: checks,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn header(start: u32, end: u32, version: u16) -> [u8; MODULE_INFO_SIZE] {
        let mut h = [0; MODULE_INFO_SIZE];
        h[..4].copy_from_slice(&start.to_le_bytes());
        h[4..8].copy_from_slice(&end.to_le_bytes());
        h[10..12].copy_from_slice(&version.to_le_bytes());
        h[12..14].copy_from_slice(&PLATFORM_ID.to_le_bytes());
        h[14] = ModuleFunction::NcpFirmware as u8;
        h
    }

    #[test]
    fn parses_header_fields() {
        let info = ModuleInfo::parse(&header(0x1000, 0x1100, 7)).unwrap();
        assert_eq!(info.start_address, 0x1000);
        assert_eq!(info.end_address, 0x1100);
        assert_eq!(info.version, 7);
        assert_eq!(info.platform_id, PLATFORM_ID);
        assert_eq!(info.module_function(), Some(ModuleFunction::NcpFirmware));
        assert_eq!(info.span(), Ok(0x100));
    }

    #[test]
    fn truncated_header_is_invalid() {
        assert_eq!(ModuleInfo::parse(&[0; 23]), Err(NcpError::InvalidModule));
    }

    #[test]
    fn inverted_bounds_are_invalid() {
        let info = ModuleInfo::parse(&header(0x2000, 0x1000, 1)).unwrap();
        assert_eq!(info.span(), Err(NcpError::InvalidModule));
    }

    #[test]
    fn synthetic_descriptor_passes_every_check() {
        let module = ModuleDescriptor::synthetic_ncp(0x0102);
        assert_eq!(module.info.version, 0x0102);
        assert_eq!(module.validity_checked, module.validity_result);
        assert!(module.validity_result.contains(ModuleValidation::INTEGRITY));
        assert!(module
            .suffix
            .sha
            .chunks_exact(2)
            .all(|c| c == [0x02, 0x01]));
    }
}
