//! Byte stream to readable source, used by `LIST`.

use super::{keyword_for_byte, keyword_spacing, keyword_text, Spacing};

/// Renders a tokenized body (as produced by `tokenize_line`, trailing
/// `0x00` included or not — both are accepted) back into displayable
/// source text. Keyword tokens expand to their canonical spelling, padded
/// with spaces per `Spacing`; every other byte, including string contents
/// and `REM`/`DATA` tails, passes through unchanged.
pub fn detokenize(body: &[u8]) -> String {
  let bytes: &[u8] = match body.last() {
    Some(0) => &body[..body.len() - 1],
    _ => body,
  };

  let mut out = String::new();
  for (i, &byte) in bytes.iter().enumerate() {
    match keyword_for_byte(byte) {
      Some(keyword) => {
        let spacing = keyword_spacing(keyword);
        // `Both` keywords (statement verbs, `AND`/`OR`/`TO`/...) always
        // get a leading space unless one's already there. `Leading`
        // keywords (functions, `TAB(`/`SPC(`, `REM`/`DATA`) only need one
        // when the preceding character is alphanumeric — otherwise (an
        // operator, punctuation, or the very start of the line) the
        // keyword already reads unambiguously with no separator (e.g.
        // `ABS(-10)+SGN(5)*5`, no space before either function).
        let needs_leading_space = match spacing {
          Spacing::Both => !out.is_empty() && !out.ends_with(' '),
          Spacing::Leading => out.chars().last().is_some_and(|c| c.is_ascii_alphanumeric()),
          Spacing::None => false,
        };
        if needs_leading_space {
          out.push(' ');
        }
        out.push_str(keyword_text(keyword));
        if matches!(spacing, Spacing::Both) && i + 1 < bytes.len() {
          out.push(' ');
        }
      }
      None => out.push(byte as char),
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::token::{token_byte, Keyword};

  #[test]
  fn expands_a_statement_keyword_with_trailing_space() {
    let mut body = vec![token_byte(Keyword::Print)];
    body.extend_from_slice(b"1+2");
    body.push(0);
    assert_eq!(detokenize(&body), "PRINT 1+2");
  }

  #[test]
  fn function_keywords_get_only_a_leading_space() {
    let mut body = b"A=".to_vec();
    body.push(token_byte(Keyword::Abs));
    body.extend_from_slice(b"(-10)");
    body.push(0);
    assert_eq!(detokenize(&body), "A=ABS(-10)");
  }

  #[test]
  fn functions_never_gain_a_space_after_an_operator_or_at_line_start() {
    let mut body = vec![token_byte(Keyword::Abs)];
    body.extend_from_slice(b"(-10)+");
    body.push(token_byte(Keyword::Sgn));
    body.extend_from_slice(b"(5)*5");
    body.push(0);
    assert_eq!(detokenize(&body), "ABS(-10)+SGN(5)*5");
  }

  #[test]
  fn a_function_keyword_gains_a_leading_space_after_an_alphanumeric_byte() {
    let mut body = b"X".to_vec();
    body.push(token_byte(Keyword::Abs));
    body.extend_from_slice(b"(1)");
    body.push(0);
    assert_eq!(detokenize(&body), "X ABS(1)");
  }

  #[test]
  fn operator_tokens_get_no_padding() {
    let mut body = b"1".to_vec();
    body.push(token_byte(Keyword::Plus));
    body.extend_from_slice(b"2");
    assert_eq!(detokenize(&body), "1+2");
  }

  #[test]
  fn tolerates_missing_trailing_terminator() {
    let body = vec![token_byte(Keyword::New)];
    assert_eq!(detokenize(&body), "NEW");
  }
}
