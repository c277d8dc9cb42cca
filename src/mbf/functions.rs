//! Elementary functions: INT, SGN, ABS, SQR, LOG, EXP, SIN, COS, TAN, ATN.
//!
//! These route through `f64` rather than reimplementing CORDIC-style
//! series expansions directly on the mantissa; the precision loss is
//! invisible at MBF's own precision.

use super::Mbf;
use crate::error::MbfError;
use std::cmp::Ordering;

impl Mbf {
  /// Greatest integer `<=` the value (floor), not truncation.
  pub fn int(&self) -> Result<Mbf, MbfError> {
    Mbf::from_double(self.to_double().floor())
  }

  /// -1, 0, or 1 according to the value's sign.
  pub fn sgn(&self) -> Mbf {
    if self.is_zero() {
      return Mbf::ZERO;
    }
    if self.sign() {
      Mbf::ONE.neg()
    } else {
      Mbf::ONE
    }
  }

  pub fn sqr(&self) -> Result<Mbf, MbfError> {
    if self.sign() && !self.is_zero() {
      return Err(MbfError::Domain);
    }
    Mbf::from_double(self.to_double().sqrt())
  }

  pub fn log(&self) -> Result<Mbf, MbfError> {
    if self.compare(&Mbf::ZERO) != Ordering::Greater {
      return Err(MbfError::Domain);
    }
    Mbf::from_double(self.to_double().ln())
  }

  /// Named `exp_fn` rather than `exp` to keep clear of the biased-exponent
  /// accessor `Mbf::exp`.
  pub fn exp_fn(&self) -> Result<Mbf, MbfError> {
    Mbf::from_double(self.to_double().exp())
  }

  pub fn sin(&self) -> Result<Mbf, MbfError> {
    Mbf::from_double(self.to_double().sin())
  }

  pub fn cos(&self) -> Result<Mbf, MbfError> {
    Mbf::from_double(self.to_double().cos())
  }

  pub fn tan(&self) -> Result<Mbf, MbfError> {
    Mbf::from_double(self.to_double().tan())
  }

  pub fn atn(&self) -> Result<Mbf, MbfError> {
    Mbf::from_double(self.to_double().atan())
  }

  /// `self ^ exponent`, routed through `f64` like the other elementary
  /// functions above.
  pub fn pow(&self, exponent: Mbf) -> Result<Mbf, MbfError> {
    Mbf::from_double(self.to_double().powf(exponent.to_double()))
  }
}
