//! Fixed-point arithmetic (scale 1000) matching the server's integer simulation.
//!
//! All movement and clamping math stays on integers. Floats only appear when
//! converting at the wire and render boundaries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of fixed-point units per world unit.
pub const FIXED_SCALE: i32 = 1000;

/// A world-space quantity stored as `value * 1000`, truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fixed(pub i32);

impl Fixed {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// 1.0 (also the neutral slow-multiplier).
    pub const ONE: Self = Self(FIXED_SCALE);

    /// Wrap a raw fixed-point value.
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Raw fixed-point value.
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Convert a world-unit float, rounding to the nearest unit.
    ///
    /// Non-finite input maps to zero; out-of-range values saturate.
    pub fn from_world(value: f32) -> Self {
        let scaled = (value as f64 * FIXED_SCALE as f64).round();
        if scaled.is_nan() {
            return Self::ZERO;
        }
        Self(scaled.clamp(i32::MIN as f64, i32::MAX as f64) as i32)
    }

    /// Convert back to world units for rendering or the wire.
    pub fn to_world(self) -> f32 {
        (self.0 as f64 / FIXED_SCALE as f64) as f32
    }

    /// Two's-complement addition, matching the server's overflow behavior.
    pub fn wrapping_add(self, rhs: Self) -> Self {
        Self(self.0.wrapping_add(rhs.0))
    }

    /// `self * mul / div` with a 64-bit intermediate, truncated toward zero.
    pub fn mul_div(self, mul: i64, div: i64) -> Self {
        if div == 0 {
            return Self::ZERO;
        }
        Self(((self.0 as i64 * mul) / div) as i32)
    }

    /// Absolute value as an unsigned magnitude (no overflow at `i32::MIN`).
    pub fn unsigned_abs(self) -> u32 {
        self.0.unsigned_abs()
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.to_world())
    }
}

/// Integer square root (floor) by Newton's method on unsigned 64-bit values.
///
/// Must stay bit-identical with the server's implementation; do not replace
/// with a float `sqrt`.
pub fn isqrt_u64(n: u64) -> u64 {
    if n == 0 {
        return 0;
    }
    let mut x = n;
    // (n + 1) / 2 without overflowing at u64::MAX
    let mut y = (x >> 1) + (x & 1);
    while y < x {
        x = y;
        y = (x + n / x) >> 1;
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn world_conversion_rounds() {
        assert_eq!(Fixed::from_world(1.0), Fixed(1000));
        assert_eq!(Fixed::from_world(-2.5), Fixed(-2500));
        assert_eq!(Fixed::from_world(0.0004), Fixed(0));
        assert_eq!(Fixed::from_world(0.0006), Fixed(1));
        assert_eq!(Fixed::from_world(f32::NAN), Fixed::ZERO);
        assert_eq!(Fixed::from_world(f32::INFINITY), Fixed(i32::MAX));
    }

    #[test]
    fn mul_div_truncates_toward_zero() {
        assert_eq!(Fixed(2431).mul_div(999, 1000), Fixed(2428));
        assert_eq!(Fixed(-7).mul_div(1, 4), Fixed(-1));
        assert_eq!(Fixed(7).mul_div(1, 0), Fixed::ZERO);
    }

    #[test]
    fn wrapping_add_wraps() {
        assert_eq!(Fixed(i32::MAX).wrapping_add(Fixed(1)), Fixed(i32::MIN));
    }

    #[test]
    fn isqrt_small_values() {
        let expected = [0, 1, 1, 1, 2, 2, 2, 2, 2, 3];
        for (n, want) in expected.iter().enumerate() {
            assert_eq!(isqrt_u64(n as u64), *want, "isqrt({n})");
        }
        assert_eq!(isqrt_u64(150_000 * 150_000), 150_000);
        assert_eq!(isqrt_u64(u64::MAX), u32::MAX as u64);
    }

    proptest! {
        #[test]
        fn isqrt_is_floor_sqrt(n in any::<u64>()) {
            let r = isqrt_u64(n) as u128;
            prop_assert!(r * r <= n as u128);
            prop_assert!((r + 1) * (r + 1) > n as u128);
        }
    }
}
