//! Conversions between `Mbf` and integers / `f64`.
//!
//! Kept separate from `arith.rs` because these never fail on anything but
//! genuinely out-of-range input, where `arith.rs`'s operations can overflow
//! from perfectly ordinary operands.

use super::Mbf;
use crate::error::MbfError;

impl Mbf {
  /// Builds a normalized value from a sign and a nonzero magnitude.
  pub(crate) fn from_magnitude(negative: bool, magnitude: u32) -> Mbf {
    if magnitude == 0 {
      return Mbf::ZERO;
    }
    let shift = 31 - magnitude.leading_zeros();
    let exp = 129 + shift as i32;
    let mantissa = (magnitude as u64) << (23 - shift);
    // An integer magnitude never needs more than 32 significant bits, well
    // inside `make`'s normalization range, so this can never fail.
    Mbf::make(negative, exp, mantissa).expect("integer magnitude cannot overflow Mbf range")
  }

  pub fn from_int16(value: i16) -> Mbf {
    Mbf::from_magnitude(value < 0, (value as i32).unsigned_abs())
  }

  pub fn from_int32(value: i32) -> Result<Mbf, MbfError> {
    Ok(Mbf::from_magnitude(value < 0, value.unsigned_abs()))
  }

  /// Truncates toward zero, per BASIC's `CINT`-style integer conversion.
  /// Errors with `Domain` (mapped to `FC`, illegal function call) if the
  /// value doesn't fit in 16 bits.
  pub fn to_int16(&self) -> Result<i16, MbfError> {
    let value = self.to_double();
    let truncated = value.trunc();
    if truncated < i16::MIN as f64 || truncated > i16::MAX as f64 {
      return Err(MbfError::Domain);
    }
    Ok(truncated as i16)
  }

  pub fn to_int32(&self) -> Result<i32, MbfError> {
    let value = self.to_double();
    let truncated = value.trunc();
    if truncated < i32::MIN as f64 || truncated > i32::MAX as f64 {
      return Err(MbfError::Domain);
    }
    Ok(truncated as i32)
  }

  /// Converts an `f64` to the nearest `Mbf`, rounding the 52-bit mantissa
  /// down to 24 bits. Used only at the edges (string parsing, elementary
  /// functions), never for the core arithmetic path.
  pub fn from_double(value: f64) -> Result<Mbf, MbfError> {
    if value == 0.0 {
      return Ok(Mbf::ZERO);
    }
    let negative = value.is_sign_negative();
    let (mantissa_f, exp2) = frexp(value.abs());
    // frexp gives a mantissa in [0.5, 1.0); Mbf wants the leading bit set
    // at 1<<23 out of a 24-bit field, i.e. a mantissa in [0.5, 1.0) * 2^24.
    let mantissa = (mantissa_f * (1u64 << 24) as f64).round() as u64;
    let exp = 128 + exp2;
    Mbf::make(negative, exp, mantissa)
  }

  pub fn to_double(&self) -> f64 {
    if self.is_zero() {
      return 0.0;
    }
    let mantissa = self.mantissa24() as f64 / (1u64 << 23) as f64;
    let exp = self.exp() as i32 - 129;
    let magnitude = mantissa * 2f64.powi(exp);
    if self.sign() {
      -magnitude
    } else {
      magnitude
    }
  }
}

/// Hand-rolled `frexp`: splits `value` (assumed finite, positive, nonzero)
/// into a mantissa in `[0.5, 1.0)` and a power-of-two exponent, via direct
/// manipulation of the IEEE-754 bit pattern rather than libm.
fn frexp(value: f64) -> (f64, i32) {
  let bits = value.to_bits();
  let raw_exp = ((bits >> 52) & 0x7ff) as i32;
  if raw_exp == 0 {
    // Subnormal: renormalize by hand.
    let normalized = value * (1u64 << 54) as f64;
    let (mantissa, exp) = frexp(normalized);
    return (mantissa, exp - 54);
  }
  let exp = raw_exp - 1022;
  let mantissa_bits = (bits & 0x000f_ffff_ffff_ffff) | (1022u64 << 52);
  (f64::from_bits(mantissa_bits), exp)
}
