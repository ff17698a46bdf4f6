//! Floating-point exception flags (FPSCR cumulative exception bits).

/// Cumulative FPU exception flags as latched in FPSCR bits 0..=7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FpuFlags(u32);

impl FpuFlags {
    /// Invalid operation.
    pub const INVALID_OPERATION: Self = Self(1 << 0);
    /// Division by zero.
    pub const DIVIDE_BY_ZERO: Self = Self(1 << 1);
    /// Overflow.
    pub const OVERFLOW: Self = Self(1 << 2);
    /// Underflow.
    pub const UNDERFLOW: Self = Self(1 << 3);
    /// Inexact result.
    pub const INEXACT: Self = Self(1 << 4);
    /// Input denormal.
    pub const INPUT_DENORMAL: Self = Self(1 << 7);

    /// All cumulative exception bits.
    pub const ALL_MASK: u32 = 0x9F;

    /// Exceptions that indicate a real numeric bug.
    pub const CRITICAL: Self =
        Self(Self::INVALID_OPERATION.0 | Self::DIVIDE_BY_ZERO.0 | Self::OVERFLOW.0);

    /// Extract exception flags from a raw FPSCR value.
    pub const fn from_fpscr(fpscr: u32) -> Self {
        Self(fpscr & Self::ALL_MASK)
    }

    /// No flags set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Union of two flag sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// `true` if any flag in `other` is also set here.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// `true` if an invalid-operation, divide-by-zero or overflow is latched.
    pub const fn has_critical(self) -> bool {
        self.intersects(Self::CRITICAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inexact_and_underflow_are_not_critical() {
        assert!(!FpuFlags::INEXACT.union(FpuFlags::UNDERFLOW).has_critical());
        assert!(!FpuFlags::INPUT_DENORMAL.has_critical());
    }

    #[test]
    fn divide_by_zero_is_critical() {
        assert!(FpuFlags::DIVIDE_BY_ZERO.has_critical());
        assert!(FpuFlags::from_fpscr(0x0300_0002).has_critical());
    }

    #[test]
    fn from_fpscr_masks_control_bits() {
        assert_eq!(FpuFlags::from_fpscr(0xFFFF_FF00), FpuFlags::empty());
    }
}
