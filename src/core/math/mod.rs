// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Fixed-point math helpers
//!
//! The ray intersection path needs `1 / determinant`. The hardware has no divider,
//! so it normalizes the magnitude into `(0.5, 1]` by repeated halving and evaluates
//! a two-term polynomial approximation:
//!
//! ```text
//! s      = |value| / 2^amount        (0.5 < s <= 1)
//! b      = 1.466  - s
//! c      = s * b
//! d      = 1.0012 - c
//! e      = d * b
//! r      = e * 4                     (~ 1/s)
//! result = sign * r / 2^amount
//! ```
//!
//! The result is carried as an unsigned 46-bit word with 23 fractional bits plus a
//! separate sign flag. The approximation stays well inside 1% of the true value;
//! for large determinants the truncation to 23 fractional bits dominates the
//! error.
//!
//! # References
//!
//! - <https://observablehq.com/@drom/reciprocal-approximation>

/// Fractional bits of the fixed-point reciprocal
pub const RECIPROCAL_FRAC_BITS: u32 = 23;

/// Total width of the fixed-point reciprocal magnitude
pub const RECIPROCAL_WORD_BITS: u32 = 46;

const POLY_B: f64 = 1.466;
const POLY_D: f64 = 1.0012;

/// Intermediate values of the reciprocal approximation
///
/// Useful for checking each stage against a hardware trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReciprocalStages {
    /// Normalized magnitude `s`
    pub shifted: f64,
    /// Number of halvings applied
    pub amount: u32,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    /// Signed, de-normalized result
    pub reciprocal: f64,
}

/// Evaluate the reciprocal approximation, keeping every stage
///
/// # Arguments
///
/// * `value` - Integer to invert (typically a triangle determinant)
///
/// # Examples
///
/// ```
/// use trigpu::core::math::reciprocal_stages;
///
/// let stages = reciprocal_stages(3072);
/// assert_eq!(stages.amount, 12);
/// assert_eq!(stages.shifted, 0.75);
/// ```
pub fn reciprocal_stages(value: i64) -> ReciprocalStages {
    let negative = value < 0;
    let mut shifted = value.unsigned_abs() as f64;
    let mut amount = 0u32;

    while shifted > 1.0 {
        shifted /= 2.0;
        amount += 1;
    }

    let b = POLY_B - shifted;
    let c = shifted * b;
    let d = POLY_D - c;
    let e = d * b;
    let mut reciprocal = e * 4.0;

    if negative {
        reciprocal = -reciprocal;
    }

    ReciprocalStages {
        shifted,
        amount,
        b,
        c,
        d,
        e,
        reciprocal: reciprocal / 2f64.powi(amount as i32),
    }
}

/// Approximate `1 / value`
///
/// Zero is not special-cased: it evaluates the polynomial at `s = 0` and
/// returns a finite value. Callers exclude degenerate triangles through their
/// coverage test instead.
///
/// # Examples
///
/// ```
/// use trigpu::core::math::approx_reciprocal;
///
/// let r = approx_reciprocal(-10);
/// assert!(r < 0.0);
/// assert!(((r - (-0.1)) / 0.1).abs() < 0.2);
/// ```
pub fn approx_reciprocal(value: i64) -> f64 {
    reciprocal_stages(value).reciprocal
}

/// Fixed-point reciprocal as produced by the hardware
///
/// The magnitude is an unsigned 46-bit word with 23 fractional bits; the sign
/// travels separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedReciprocal {
    pub magnitude: u64,
    pub negative: bool,
}

impl FixedReciprocal {
    /// Approximate `1 / value` and encode it in fixed point
    ///
    /// The magnitude is truncated toward zero and saturated to 46 bits.
    pub fn from_value(value: i64) -> Self {
        let approx = approx_reciprocal(value);
        let raw = to_fixed(approx.abs(), RECIPROCAL_FRAC_BITS);

        Self {
            magnitude: saturate_unsigned(raw, RECIPROCAL_WORD_BITS),
            negative: value < 0,
        }
    }

    /// Signed raw value (magnitude with the sign applied)
    pub fn signed_raw(&self) -> i128 {
        if self.negative {
            -(self.magnitude as i128)
        } else {
            self.magnitude as i128
        }
    }

    /// Decode to floating point
    pub fn to_f64(&self) -> f64 {
        let value = fixed_to_f64(self.magnitude as i64, RECIPROCAL_FRAC_BITS);
        if self.negative {
            -value
        } else {
            value
        }
    }
}

/// Encode a floating value as fixed point, truncating toward zero
///
/// Values beyond the `i64` range saturate.
pub fn to_fixed(value: f64, frac_bits: u32) -> i64 {
    (value * 2f64.powi(frac_bits as i32)).trunc() as i64
}

/// Decode a fixed-point value
pub fn fixed_to_f64(raw: i64, frac_bits: u32) -> f64 {
    raw as f64 / 2f64.powi(frac_bits as i32)
}

/// Round a fixed-point value to the nearest integer, halves away from zero
///
/// # Examples
///
/// ```
/// use trigpu::core::math::round_fixed;
///
/// // 2.5 and -2.5 with 1 fractional bit
/// assert_eq!(round_fixed(5, 1), 3);
/// assert_eq!(round_fixed(-5, 1), -3);
/// assert_eq!(round_fixed(-4, 1), -2);
/// ```
pub fn round_fixed(raw: i128, frac_bits: u32) -> i64 {
    if frac_bits == 0 {
        return raw.clamp(i64::MIN as i128, i64::MAX as i128) as i64;
    }

    let half = 1i128 << (frac_bits - 1);
    let magnitude = (raw.unsigned_abs() as i128 + half) >> frac_bits;
    let rounded = if raw < 0 { -magnitude } else { magnitude };

    rounded.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/// Keep the low `bits` bits of a value, like a fixed-width register
#[inline(always)]
pub fn mask(value: u64, bits: u32) -> u64 {
    if bits >= 64 {
        value
    } else {
        value & ((1u64 << bits) - 1)
    }
}

/// Clamp a signed value into the range of a `bits`-wide unsigned word
pub fn saturate_unsigned(value: i64, bits: u32) -> u64 {
    if value <= 0 {
        return 0;
    }
    let max = if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 };
    (value as u64).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn relative_error(approx: f64, exact: f64) -> f64 {
        ((approx - exact) / exact).abs()
    }

    // ========== Reciprocal Approximation ==========

    #[test]
    fn test_reciprocal_realistic_values() {
        for value in [10i64, -10, 3072, -3072, 64 * 48, -64 * 48] {
            let approx = approx_reciprocal(value);
            let exact = 1.0 / value as f64;
            assert!(
                relative_error(approx, exact) < 0.2,
                "1/{} approximated as {}",
                value,
                approx
            );
            assert_eq!(approx < 0.0, value < 0, "sign of 1/{}", value);
        }
    }

    #[test]
    fn test_reciprocal_stages_normalization() {
        let stages = reciprocal_stages(10);
        assert_eq!(stages.amount, 4);
        assert_eq!(stages.shifted, 0.625);
        assert!((stages.b - 0.841).abs() < 1e-12);

        // Exactly one is not halved
        let stages = reciprocal_stages(1);
        assert_eq!(stages.amount, 0);
        assert_eq!(stages.shifted, 1.0);
    }

    #[test]
    fn test_reciprocal_of_zero_is_finite() {
        let approx = approx_reciprocal(0);
        assert!(approx.is_finite());
        assert!(approx > 0.0);
    }

    #[test]
    fn test_fixed_reciprocal_encoding() {
        // 1/158000 * 2^23 ~= 53.09; the approximation lands on 53
        let fixed = FixedReciprocal::from_value(158_000);
        assert_eq!(fixed.magnitude, 53);
        assert!(!fixed.negative);

        let fixed = FixedReciprocal::from_value(-3072);
        assert!(fixed.negative);
        assert!(fixed.signed_raw() < 0);
        assert!(relative_error(fixed.to_f64(), -1.0 / 3072.0) < 0.2);
    }

    #[test]
    fn test_fixed_reciprocal_fits_word() {
        let fixed = FixedReciprocal::from_value(0);
        assert!(fixed.magnitude < (1u64 << RECIPROCAL_WORD_BITS));

        let fixed = FixedReciprocal::from_value(1);
        assert_eq!(fixed.magnitude >> RECIPROCAL_FRAC_BITS, 0);
    }

    // ========== Fixed Point Helpers ==========

    #[test]
    fn test_to_fixed_truncates() {
        assert_eq!(to_fixed(1.75, 2), 7);
        assert_eq!(to_fixed(1.99, 0), 1);
        assert_eq!(to_fixed(-1.99, 0), -1);
        assert_eq!(fixed_to_f64(7, 2), 1.75);
        assert_eq!(fixed_to_f64(-6, 2), -1.5);
    }

    #[test]
    fn test_round_fixed() {
        assert_eq!(round_fixed(0, 23), 0);
        assert_eq!(round_fixed(3, 2), 1); // 0.75
        assert_eq!(round_fixed(-3, 2), -1);
        assert_eq!(round_fixed(1, 2), 0); // 0.25
        assert_eq!(round_fixed(-2, 2), -1); // -0.5
        assert_eq!(round_fixed(42, 0), 42);
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask(0xFF, 6), 0x3F);
        assert_eq!(mask(128, 7), 0);
        assert_eq!(mask(u64::MAX, 64), u64::MAX);
    }

    #[test]
    fn test_saturate_unsigned() {
        assert_eq!(saturate_unsigned(-3, 3), 0);
        assert_eq!(saturate_unsigned(9, 3), 7);
        assert_eq!(saturate_unsigned(4, 3), 4);
    }

    // ========== Properties ==========

    proptest! {
        #[test]
        fn prop_reciprocal_within_twenty_percent(value in 10i64..=3072, negative: bool) {
            let value = if negative { -value } else { value };
            let approx = approx_reciprocal(value);
            prop_assert!(relative_error(approx, 1.0 / value as f64) < 0.2);
            prop_assert_eq!(approx < 0.0, negative);
        }

        #[test]
        fn prop_normalized_into_upper_half(value in 2i64..i64::MAX) {
            let stages = reciprocal_stages(value);
            prop_assert!(stages.shifted > 0.5 && stages.shifted <= 1.0);
        }
    }
}
