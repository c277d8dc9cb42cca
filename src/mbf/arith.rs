//! Add/sub/mul/div.
//!
//! Free-standing arithmetic on aligned mantissas: plain functions that
//! take operand values and hand back a result, with all of the
//! bit-level work spelled out rather than hidden behind a generic numeric
//! trait.

use super::Mbf;
use crate::error::MbfError;

impl Mbf {
  pub fn add(self, other: Mbf) -> Result<Mbf, MbfError> {
    if self.is_zero() {
      return Ok(other);
    }
    if other.is_zero() {
      return Ok(self);
    }
    add_aligned(self, other)
  }

  pub fn sub(self, other: Mbf) -> Result<Mbf, MbfError> {
    self.add(other.neg())
  }

  pub fn mul(self, other: Mbf) -> Result<Mbf, MbfError> {
    if self.is_zero() || other.is_zero() {
      return Ok(Mbf::ZERO);
    }
    let exp = self.exp() as i32 + other.exp() as i32 - 129;
    let product = (self.mantissa24() as u64) * (other.mantissa24() as u64);
    // Upper bits of a 24x24 product, truncated rather than rounded.
    let mantissa = product >> 23;
    let negative = self.sign() ^ other.sign();
    Mbf::make(negative, exp, mantissa)
  }

  pub fn div(self, other: Mbf) -> Result<Mbf, MbfError> {
    if other.is_zero() {
      return Err(MbfError::DivideByZero);
    }
    if self.is_zero() {
      return Ok(Mbf::ZERO);
    }
    let exp = self.exp() as i32 - other.exp() as i32 + 129;
    let scaled = (self.mantissa24() as u64) << 23;
    let mantissa = scaled / (other.mantissa24() as u64);
    let negative = self.sign() ^ other.sign();
    Mbf::make(negative, exp, mantissa)
  }
}

/// Aligns `a` and `b` to the larger exponent, then adds or subtracts their
/// mantissas depending on whether their signs agree.
fn add_aligned(a: Mbf, b: Mbf) -> Result<Mbf, MbfError> {
  let (hi, lo) = if a.exp() >= b.exp() { (a, b) } else { (b, a) };
  let diff = hi.exp() - lo.exp();
  if diff >= 24 {
    return Ok(hi);
  }

  let hi_mantissa = hi.mantissa24();
  let lo_mantissa = lo.mantissa24() >> diff;
  let exp = hi.exp() as i32;

  if hi.sign() == lo.sign() {
    let sum = hi_mantissa as u64 + lo_mantissa as u64;
    Mbf::make(hi.sign(), exp, sum)
  } else if hi_mantissa >= lo_mantissa {
    Mbf::make(hi.sign(), exp, (hi_mantissa - lo_mantissa) as u64)
  } else {
    Mbf::make(!hi.sign(), exp, (lo_mantissa - hi_mantissa) as u64)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn mbf(n: i32) -> Mbf {
    Mbf::from_int32(n).unwrap()
  }

  #[test]
  fn add_and_sub_simple_integers() {
    assert_eq!(mbf(2).add(mbf(3)).unwrap(), mbf(5));
    assert_eq!(mbf(5).sub(mbf(3)).unwrap(), mbf(2));
    assert_eq!(mbf(2).sub(mbf(3)).unwrap(), mbf(-1));
  }

  #[test]
  fn add_with_zero_returns_other_operand_unchanged() {
    assert_eq!(Mbf::ZERO.add(mbf(7)).unwrap(), mbf(7));
    assert_eq!(mbf(7).add(Mbf::ZERO).unwrap(), mbf(7));
  }

  #[test]
  fn cancellation_renormalizes_to_zero() {
    assert_eq!(mbf(5).sub(mbf(5)).unwrap(), Mbf::ZERO);
  }

  #[test]
  fn mul_and_div_simple_integers() {
    assert_eq!(mbf(6).mul(mbf(7)).unwrap(), mbf(42));
    assert_eq!(mbf(42).div(mbf(6)).unwrap(), mbf(7));
  }

  #[test]
  fn div_by_zero_is_an_error() {
    assert_eq!(mbf(1).div(Mbf::ZERO).unwrap_err(), MbfError::DivideByZero);
  }

  #[test]
  fn div_of_zero_is_zero() {
    assert_eq!(Mbf::ZERO.div(mbf(5)).unwrap(), Mbf::ZERO);
  }

  #[test]
  fn mul_overflow_signals_error() {
    let huge = Mbf::make(false, 254, 0x00ff_ffff).unwrap();
    assert_eq!(huge.mul(huge).unwrap_err(), MbfError::Overflow);
  }

  proptest::proptest! {
    #[test]
    fn add_then_sub_is_inverse_within_small_range(a in -100000i32..100000, b in -1000i32..1000) {
      let ma = Mbf::from_int32(a).unwrap();
      let mb = Mbf::from_int32(b).unwrap();
      if let Ok(sum) = ma.add(mb) {
        let back = sum.sub(mb).unwrap();
        proptest::prop_assert_eq!(back, ma);
      }
    }

    #[test]
    fn mul_then_div_is_inverse_for_nonzero_divisor(a in -10000i32..10000, b in 1i32..1000) {
      let ma = Mbf::from_int32(a).unwrap();
      let mb = Mbf::from_int32(b).unwrap();
      if let Ok(product) = ma.mul(mb) {
        let back = product.div(mb).unwrap();
        // Mul truncates its 48-bit product to 24 bits, so the inverse is
        // only guaranteed within a handful of integer ULPs, not bit-exact.
        let diff = back.to_double() - ma.to_double();
        proptest::prop_assert!(diff.abs() <= 1.0);
      }
    }
  }
}
