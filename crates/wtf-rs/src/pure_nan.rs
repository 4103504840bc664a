//! NaN-boxed values keep every non-double in a NaN whose top 15 bits are all set. Such
//! a pattern is still a NaN as far as IEEE 754 is concerned, so any NaN the runtime
//! stores as a plain double must stay out of that range or it would be mistaken for a
//! tagged value.
//!
//! A NaN is "pure" if tagging it is safe, and "impure" if it falls in the reserved
//! range. Math on the platforms we care about never produces an impure NaN, though
//! `sin(-inf)` comes close with `0xfff8000000000000`. Where a NaN of unknown origin
//! reaches the value representation, run it through [`purify_nan`]. Nothing observable
//! distinguishes one NaN from another, so collapsing them is always sound.

use crate::bitwise_cast::{bits_to_double, double_to_bits};

/// The one quiet NaN the runtime constructs directly.
pub const PURE_NAN_BITS: u64 = 0x7ff8_0000_0000_0000;

/// Patterns at or above this are reserved for tagged values.
pub const IMPURE_NAN_THRESHOLD: u64 = 0xfffe_0000_0000_0000;

/// Returns the canonical pure NaN.
#[inline(always)]
pub fn pure_nan() -> f64 {
    bits_to_double(PURE_NAN_BITS)
}

/// Tests if the double would break the 64-bit value encoding. This is a range test on
/// the bits only; every pattern in the range happens to be a NaN.
#[inline]
pub fn is_impure_nan(value: f64) -> bool {
    double_to_bits(value) >= IMPURE_NAN_THRESHOLD
}

/// If the given value is NaN then return a NaN that is known to be pure.
#[inline]
#[allow(clippy::eq_op)]
pub fn purify_nan(value: f64) -> f64 {
    if value != value {
        return pure_nan();
    }
    value
}
