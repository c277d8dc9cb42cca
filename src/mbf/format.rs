//! String <-> `Mbf` conversion.
//!
//! Non-negative values print with a leading space where the sign would
//! go (`0.1` -> `" .1"`); very large or very small magnitudes switch to
//! scientific notation (`"1E-07"`). Built on top of Rust's own
//! `{:.N}`/`{:.Ne}` formatters rather than hand-rolled `log10`
//! arithmetic, which misrounds at exact powers of ten.

use super::Mbf;

const SIGNIFICANT_DIGITS: usize = 7;

impl Mbf {
  /// Parses the longest numeric prefix of `s` it can: optional sign,
  /// digits, optional decimal point and digits, optional exponent marker
  /// (`E`/`D`) with an optional-signed exponent. Returns the parsed value
  /// and the number of bytes consumed, or `None` if `s` doesn't start
  /// with a valid numeral.
  pub fn from_string(s: &str) -> Option<(Mbf, usize)> {
    let bytes = s.as_bytes();
    let mut i = 0;
    let negative = match bytes.first() {
      Some(b'+') => {
        i += 1;
        false
      }
      Some(b'-') => {
        i += 1;
        true
      }
      _ => false,
    };

    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
      i += 1;
    }
    let mut saw_digits = i > digits_start;

    if i < bytes.len() && bytes[i] == b'.' {
      i += 1;
      let frac_start = i;
      while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
      }
      saw_digits |= i > frac_start;
    }

    if !saw_digits {
      return None;
    }

    let mantissa_end = i;
    let mut exponent_end = mantissa_end;

    if i < bytes.len() && (bytes[i] == b'E' || bytes[i] == b'e' || bytes[i] == b'D' || bytes[i] == b'd') {
      let mut j = i + 1;
      if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
        j += 1;
      }
      let exp_digits_start = j;
      while j < bytes.len() && bytes[j].is_ascii_digit() {
        j += 1;
      }
      if j > exp_digits_start {
        exponent_end = j;
      }
    }

    let numeral = &s[digits_start.min(mantissa_end)..mantissa_end];
    let normalized: String = numeral.chars().filter(|c| *c != '+').collect();
    let magnitude: f64 = normalized.parse().ok()?;

    let value = if exponent_end > mantissa_end {
      let exp_str = &s[mantissa_end..exponent_end];
      let exp_str = exp_str.replacen('D', "E", 1).replacen('d', "e", 1);
      let full = format!("{normalized}{exp_str}");
      full.parse::<f64>().ok()?
    } else {
      magnitude
    };

    let mbf = Mbf::from_double(if negative { -value } else { value }).ok()?;
    Some((mbf, exponent_end))
  }

  /// Renders this value the way the interpreter prints it: a leading space
  /// reserved for the sign (only occupied for negative values), no
  /// redundant leading zero before the decimal point, and scientific
  /// notation outside `[1e-2, 1e9)`.
  pub fn to_display_string(&self) -> String {
    if self.is_zero() {
      return " 0".to_string();
    }
    let value = self.to_double();
    let magnitude = value.abs();
    let sign = if value < 0.0 { "-" } else { " " };

    if (1e-2..1e9).contains(&magnitude) {
      format!("{sign}{}", format_fixed(magnitude))
    } else {
      format!("{sign}{}", format_scientific(magnitude))
    }
  }
}

/// Fixed-point rendering with up to `SIGNIFICANT_DIGITS` significant
/// digits, trailing zeros trimmed, and the leading `0` before a decimal
/// point dropped (`0.1` -> `.1`).
fn format_fixed(magnitude: f64) -> String {
  let integer_digits = if magnitude < 1.0 { 0 } else { format!("{:.0}", magnitude.trunc()).len() };
  let decimals = SIGNIFICANT_DIGITS.saturating_sub(integer_digits.max(1));
  let mut text = format!("{magnitude:.decimals$}");
  if text.contains('.') {
    while text.ends_with('0') {
      text.pop();
    }
    if text.ends_with('.') {
      text.pop();
    }
  }
  if let Some(stripped) = text.strip_prefix("0.") {
    text = format!(".{stripped}");
  }
  text
}

/// Scientific rendering: `D.DDDDDDE[+-]NN`, trailing zeros trimmed from the
/// mantissa. Uses Rust's own exponential formatter rather than manual
/// `log10`/power-of-ten arithmetic, which can misround at exact powers of
/// ten (`1e-7` computing as `9.999999e-8`).
fn format_scientific(magnitude: f64) -> String {
  let rendered = format!("{:.*e}", SIGNIFICANT_DIGITS - 1, magnitude);
  let (mantissa, exponent) = rendered.split_once('e').expect("{:e} always contains 'e'");
  let mut mantissa = mantissa.to_string();
  if mantissa.contains('.') {
    while mantissa.ends_with('0') {
      mantissa.pop();
    }
    if mantissa.ends_with('.') {
      mantissa.pop();
    }
  }
  let exp_value: i32 = exponent.parse().expect("{:e} exponent is always a valid integer");
  let exp_sign = if exp_value < 0 { "-" } else { "+" };
  format!("{mantissa}E{exp_sign}{:02}", exp_value.abs())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tenth_formats_with_no_leading_zero() {
    let value = Mbf::from_double(0.1).unwrap();
    assert_eq!(value.to_display_string(), " .1");
  }

  #[test]
  fn negative_tenth_keeps_sign_where_the_space_was() {
    let value = Mbf::from_double(-0.1).unwrap();
    assert_eq!(value.to_display_string(), "-.1");
  }

  #[test]
  fn zero_formats_as_space_zero() {
    assert_eq!(Mbf::ZERO.to_display_string(), " 0");
  }

  #[test]
  fn small_magnitude_uses_scientific_notation() {
    let value = Mbf::from_double(1e-7).unwrap();
    assert_eq!(value.to_display_string(), " 1E-07");
  }

  #[test]
  fn large_magnitude_uses_scientific_notation() {
    let value = Mbf::from_double(1e10).unwrap();
    assert!(value.to_display_string().contains('E'));
  }

  #[test]
  fn integers_format_without_decimal_point() {
    let value = Mbf::from_int32(42).unwrap();
    assert_eq!(value.to_display_string(), " 42");
  }

  #[test]
  fn from_string_parses_plain_integer() {
    let (value, consumed) = Mbf::from_string("123").unwrap();
    assert_eq!(consumed, 3);
    assert_eq!(value, Mbf::from_int32(123).unwrap());
  }

  #[test]
  fn from_string_parses_decimal_and_stops_at_trailing_garbage() {
    let (value, consumed) = Mbf::from_string("3.5+2").unwrap();
    assert_eq!(consumed, 3);
    assert!((value.to_double() - 3.5).abs() < 1e-9);
  }

  #[test]
  fn from_string_parses_scientific_notation() {
    let (value, consumed) = Mbf::from_string("1.5E2 REM").unwrap();
    assert_eq!(consumed, 5);
    assert!((value.to_double() - 150.0).abs() < 1e-6);
  }

  #[test]
  fn from_string_rejects_non_numeric_input() {
    assert!(Mbf::from_string("ABC").is_none());
  }

  #[test]
  fn from_string_accepts_leading_sign() {
    let (value, _) = Mbf::from_string("-42").unwrap();
    assert_eq!(value, Mbf::from_int32(-42).unwrap());
  }
}
