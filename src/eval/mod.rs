//! Expression evaluator: a directly-interpreting recursive descent parser
//! over the same tokenized byte stream the program store keeps a line's
//! text in — one routine per grammar production, each consuming bytes
//! from a shared cursor, but there is no opcode table here: the "opcode"
//! is already a `Keyword` the token module decoded.

mod functions;

use crate::env::Environment;
use crate::error::EvalError;
use crate::image::Image;
use crate::mbf::{Mbf, Rnd};
use crate::token::{is_function, keyword_for_byte, Keyword};
use crate::vars::{StringDescriptor, VarName, VariableArea};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Either kind of value an expression can produce: a number or a string
/// descriptor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
  Number(Mbf),
  Str(StringDescriptor),
}

#[derive(Clone)]
struct UserFunction {
  param: VarName,
  body: Vec<u8>,
}

/// Evaluator state that outlives any one expression: the `RND` generator
/// (its sequence must persist call to call) and `DEF FN` definitions.
/// Everything else an expression touches — variables, arrays, strings —
/// lives in the `Image` passed to each call instead.
pub struct Evaluator {
  rnd: Rnd,
  user_functions: HashMap<VarName, UserFunction>,
  warned: HashSet<Keyword>,
}

impl Evaluator {
  pub fn new() -> Evaluator {
    Evaluator { rnd: Rnd::new(), user_functions: HashMap::new(), warned: HashSet::new() }
  }

  /// Records a `DEF FN` definition: `name` is the function's own name
  /// (string bit set when it returns a string), `param` is its single
  /// bound parameter, `body` the tokenized bytes of its expression.
  pub fn define_function(&mut self, name: VarName, param: VarName, body: Vec<u8>) {
    self.user_functions.insert(name, UserFunction { param, body });
  }

  /// Advances (or replays, or reseeds) the `RND` sequence directly,
  /// bypassing expression parsing — the `basic_rnd` half of the external
  /// contract statement dispatch drives this through.
  pub fn rnd(&mut self, x: Mbf) -> Mbf {
    self.rnd.rnd(x)
  }

  /// Emits the one-time `USR`/`INP` unsupported-function warning (spec
  /// §4.5), tracked per keyword so repeated calls warn only once.
  fn warn_unsupported(&mut self, keyword: Keyword) {
    let first = self.warned.insert(keyword);
    #[cfg(feature = "logging")]
    if first {
      log::warn!("{keyword:?} is not supported by this interpreter; returning 0");
    }
    #[cfg(not(feature = "logging"))]
    let _ = first;
  }
}

impl Default for Evaluator {
  fn default() -> Evaluator {
    Evaluator::new()
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RelOp {
  Eq,
  Ne,
  Lt,
  Le,
  Gt,
  Ge,
}

/// A single parse over one tokenized byte slice. Three separate mutable
/// references rather than one bundled context struct, so a nested call
/// (`DEF FN` invocation) can reborrow each independently and build a
/// shorter-lived `Parser` for the function body without fighting the
/// borrow checker over a single combined field.
pub struct Parser<'a> {
  pub(crate) eval: &'a mut Evaluator,
  pub(crate) image: &'a mut Image,
  pub(crate) env: &'a mut dyn Environment,
  bytes: &'a [u8],
  pos: usize,
}

/// Evaluates a numeric expression starting at the front of `bytes`.
/// Returns the result (or the first error encountered) and the number of
/// bytes consumed.
pub fn eval_expression(eval: &mut Evaluator, image: &mut Image, env: &mut dyn Environment, bytes: &[u8]) -> (Result<Mbf, EvalError>, usize) {
  let mut parser = Parser { eval, image, env, bytes, pos: 0 };
  let result = parser.expression().and_then(number_value);
  (result, parser.pos)
}

/// Evaluates a string expression. See `eval_expression`.
pub fn eval_string_expression(
  eval: &mut Evaluator,
  image: &mut Image,
  env: &mut dyn Environment,
  bytes: &[u8],
) -> (Result<StringDescriptor, EvalError>, usize) {
  let mut parser = Parser { eval, image, env, bytes, pos: 0 };
  let result = parser.expression().and_then(string_value);
  (result, parser.pos)
}

fn number_value(value: Value) -> Result<Mbf, EvalError> {
  match value {
    Value::Number(n) => Ok(n),
    Value::Str(_) => Err(EvalError::TypeMismatch),
  }
}

fn string_value(value: Value) -> Result<StringDescriptor, EvalError> {
  match value {
    Value::Str(s) => Ok(s),
    Value::Number(_) => Err(EvalError::TypeMismatch),
  }
}

fn to_logical_i16(value: Value) -> Result<i16, EvalError> {
  match value {
    // Sign-preserving truncation to 16 bits: truncate to an integer, then
    // keep the low 16 bits of its two's-complement form.
    Value::Number(n) => Ok(n.to_double().trunc() as i64 as i16),
    Value::Str(_) => Err(EvalError::TypeMismatch),
  }
}

impl<'a> Parser<'a> {
  /// Entry point for the full precedence chain, lowest to highest:
  /// `or-expr`.
  pub fn expression(&mut self) -> Result<Value, EvalError> {
    self.or_expr()
  }

  fn or_expr(&mut self) -> Result<Value, EvalError> {
    let mut left = self.and_expr()?;
    while self.match_keyword(Keyword::Or) {
      let right = self.and_expr()?;
      let combined = to_logical_i16(left)? | to_logical_i16(right)?;
      left = Value::Number(Mbf::from_int16(combined));
    }
    Ok(left)
  }

  fn and_expr(&mut self) -> Result<Value, EvalError> {
    let mut left = self.not_expr()?;
    while self.match_keyword(Keyword::And) {
      let right = self.not_expr()?;
      let combined = to_logical_i16(left)? & to_logical_i16(right)?;
      left = Value::Number(Mbf::from_int16(combined));
    }
    Ok(left)
  }

  fn not_expr(&mut self) -> Result<Value, EvalError> {
    if self.match_keyword(Keyword::Not) {
      let operand = self.not_expr()?;
      return Ok(Value::Number(Mbf::from_int16(!to_logical_i16(operand)?)));
    }
    self.relational()
  }

  fn relational(&mut self) -> Result<Value, EvalError> {
    let left = self.additive()?;
    match self.match_relop() {
      Some(op) => {
        let right = self.additive()?;
        let truth = self.compare_values(left, right, op)?;
        Ok(Value::Number(if truth { Mbf::from_int16(-1) } else { Mbf::ZERO }))
      }
      None => Ok(left),
    }
  }

  fn match_relop(&mut self) -> Option<RelOp> {
    if self.match_keyword(Keyword::Lt) {
      if self.match_keyword(Keyword::Eq) {
        return Some(RelOp::Le);
      }
      if self.match_keyword(Keyword::Gt) {
        return Some(RelOp::Ne);
      }
      return Some(RelOp::Lt);
    }
    if self.match_keyword(Keyword::Gt) {
      if self.match_keyword(Keyword::Eq) {
        return Some(RelOp::Ge);
      }
      return Some(RelOp::Gt);
    }
    if self.match_keyword(Keyword::Eq) {
      return Some(RelOp::Eq);
    }
    None
  }

  fn compare_values(&self, left: Value, right: Value, op: RelOp) -> Result<bool, EvalError> {
    let ordering = match (left, right) {
      (Value::Number(a), Value::Number(b)) => a.compare(&b),
      (Value::Str(a), Value::Str(b)) => a.body(self.image).cmp(b.body(self.image)),
      _ => return Err(EvalError::TypeMismatch),
    };
    Ok(match op {
      RelOp::Eq => ordering == Ordering::Equal,
      RelOp::Ne => ordering != Ordering::Equal,
      RelOp::Lt => ordering == Ordering::Less,
      RelOp::Le => ordering != Ordering::Greater,
      RelOp::Gt => ordering == Ordering::Greater,
      RelOp::Ge => ordering != Ordering::Less,
    })
  }

  fn additive(&mut self) -> Result<Value, EvalError> {
    let mut acc = number_value(self.mul_expr()?)?;
    loop {
      if self.match_keyword(Keyword::Plus) {
        let rhs = number_value(self.mul_expr()?)?;
        acc = acc.add(rhs).map_err(EvalError::from)?;
      } else if self.match_keyword(Keyword::Minus) {
        let rhs = number_value(self.mul_expr()?)?;
        acc = acc.sub(rhs).map_err(EvalError::from)?;
      } else {
        break;
      }
    }
    Ok(Value::Number(acc))
  }

  fn mul_expr(&mut self) -> Result<Value, EvalError> {
    let mut acc = number_value(self.pow_expr()?)?;
    loop {
      if self.match_keyword(Keyword::Star) {
        let rhs = number_value(self.pow_expr()?)?;
        acc = acc.mul(rhs).map_err(EvalError::from)?;
      } else if self.match_keyword(Keyword::Slash) {
        let rhs = number_value(self.pow_expr()?)?;
        acc = acc.div(rhs).map_err(EvalError::from)?;
      } else {
        break;
      }
    }
    Ok(Value::Number(acc))
  }

  /// Right-associative: `^` binds tighter to its right, so `2^3^2` is
  /// `2^(3^2) = 512`, not `(2^3)^2`.
  fn pow_expr(&mut self) -> Result<Value, EvalError> {
    let base = number_value(self.unary()?)?;
    if self.match_keyword(Keyword::Caret) {
      let exponent = number_value(self.pow_expr()?)?;
      Ok(Value::Number(base.pow(exponent).map_err(EvalError::from)?))
    } else {
      Ok(Value::Number(base))
    }
  }

  fn unary(&mut self) -> Result<Value, EvalError> {
    if self.match_keyword(Keyword::Minus) {
      return Ok(Value::Number(number_value(self.unary()?)?.neg()));
    }
    if self.match_keyword(Keyword::Plus) {
      return self.unary();
    }
    self.primary()
  }

  fn primary(&mut self) -> Result<Value, EvalError> {
    self.skip_spaces();
    match self.peek() {
      Some(b'(') => {
        self.pos += 1;
        let value = self.expression()?;
        self.skip_spaces();
        self.expect_byte(b')')?;
        Ok(value)
      }
      Some(b'"') => self.string_literal(),
      Some(b) if b.is_ascii_digit() || b == b'.' => self.number_literal(),
      Some(b) if keyword_for_byte(b) == Some(Keyword::Fn) => {
        self.pos += 1;
        self.call_user_function()
      }
      Some(b) if keyword_for_byte(b).is_some_and(is_function) => {
        let keyword = keyword_for_byte(b).expect("just matched");
        self.pos += 1;
        self.call_builtin(keyword)
      }
      Some(b) if (b as char).is_ascii_alphabetic() => self.variable_reference(),
      _ => Err(EvalError::Syntax),
    }
  }

  fn number_literal(&mut self) -> Result<Value, EvalError> {
    // `Mbf::from_string` wants valid UTF-8; bound the slice at the first
    // byte `>= 0x80`, which can only be a following keyword token, never
    // part of a numeral.
    let mut end = self.pos;
    while end < self.bytes.len() && self.bytes[end] < 0x80 {
      end += 1;
    }
    let text = std::str::from_utf8(&self.bytes[self.pos..end]).map_err(|_| EvalError::Syntax)?;
    let (value, consumed) = Mbf::from_string(text).ok_or(EvalError::Syntax)?;
    self.pos += consumed;
    Ok(Value::Number(value))
  }

  fn string_literal(&mut self) -> Result<Value, EvalError> {
    self.pos += 1; // opening quote
    let start = self.pos;
    while self.peek().is_some_and(|b| b != b'"' && b != 0) {
      self.pos += 1;
    }
    let bytes = self.bytes[start..self.pos].to_vec();
    if self.peek() == Some(b'"') {
      self.pos += 1;
    }
    functions::alloc_string(self, bytes)
  }

  /// Parses a letter-led identifier, consuming up to two alphanumerics
  /// for identity (extras are ignored for identity but still consumed),
  /// a trailing `$`, and reports whether it's immediately followed by
  /// `(` (an array subscript list).
  fn parse_identifier(&mut self) -> Result<(VarName, bool), EvalError> {
    self.skip_spaces();
    if !self.peek().is_some_and(|b| (b as char).is_ascii_alphabetic()) {
      return Err(EvalError::Syntax);
    }
    let start = self.pos;
    while self.peek().is_some_and(|b| (b as char).is_ascii_alphanumeric()) {
      self.pos += 1;
    }
    let text = std::str::from_utf8(&self.bytes[start..self.pos]).map_err(|_| EvalError::Syntax)?;
    let is_string = self.peek() == Some(b'$');
    if is_string {
      self.pos += 1;
    }
    let name = VarName::encode(text, is_string);
    self.skip_spaces();
    let has_paren = self.peek() == Some(b'(');
    Ok((name, has_paren))
  }

  fn variable_reference(&mut self) -> Result<Value, EvalError> {
    let (name, has_paren) = self.parse_identifier()?;
    if has_paren {
      let indices = self.parse_index_list()?;
      if name.is_string() {
        Ok(Value::Str(self.read_array_string(name, &indices)?))
      } else {
        Ok(Value::Number(self.read_array_numeric(name, &indices)?))
      }
    } else if name.is_string() {
      Ok(Value::Str(VariableArea::get_string(self.image, name)))
    } else {
      Ok(Value::Number(VariableArea::get_numeric(self.image, name)))
    }
  }

  /// Ensures `name` has been (auto-)`DIM`'d to at least the default bound
  /// in each of `indices.len()` dimensions before reading it: an array can
  /// come into being via `DIM` or implicitly via subscript, and a bare
  /// read counts as that implicit reference just as much as a write.
  fn read_array_numeric(&mut self, name: VarName, indices: &[u16]) -> Result<Mbf, EvalError> {
    VariableArea::find_or_auto_dim(self.image, name, indices.len()).map_err(EvalError::from)?;
    VariableArea::get_array_numeric(self.image, name, indices).ok_or(EvalError::IllegalFunctionCall)
  }

  fn read_array_string(&mut self, name: VarName, indices: &[u16]) -> Result<StringDescriptor, EvalError> {
    VariableArea::find_or_auto_dim(self.image, name, indices.len()).map_err(EvalError::from)?;
    VariableArea::get_array_string(self.image, name, indices).ok_or(EvalError::IllegalFunctionCall)
  }

  fn parse_index_list(&mut self) -> Result<Vec<u16>, EvalError> {
    self.skip_spaces();
    self.expect_byte(b'(')?;
    let mut indices = Vec::new();
    loop {
      let value = number_value(self.expression()?)?;
      let index = value.to_int32().map_err(EvalError::from)?;
      if index < 0 {
        return Err(EvalError::IllegalFunctionCall);
      }
      indices.push(index as u16);
      self.skip_spaces();
      match self.peek() {
        Some(b',') => {
          self.pos += 1;
          self.skip_spaces();
        }
        Some(b')') => {
          self.pos += 1;
          break;
        }
        _ => return Err(EvalError::Syntax),
      }
    }
    Ok(indices)
  }

  fn call_builtin(&mut self, keyword: Keyword) -> Result<Value, EvalError> {
    let args = self.parse_arg_list()?;
    functions::dispatch(self, keyword, args)
  }

  fn parse_arg_list(&mut self) -> Result<Vec<Value>, EvalError> {
    self.skip_spaces();
    self.expect_byte(b'(')?;
    self.skip_spaces();
    let mut args = Vec::new();
    if self.peek() == Some(b')') {
      self.pos += 1;
      return Ok(args);
    }
    loop {
      args.push(self.expression()?);
      self.skip_spaces();
      match self.peek() {
        Some(b',') => {
          self.pos += 1;
          self.skip_spaces();
        }
        Some(b')') => {
          self.pos += 1;
          break;
        }
        _ => return Err(EvalError::Syntax),
      }
    }
    Ok(args)
  }

  /// `FN<name>(arg)`: binds `arg` to the function's single parameter and
  /// evaluates its body via a nested `Parser` built from reborrows of
  /// this one's three fields.
  ///
  /// `DEF FN` binds its parameter into the same variable namespace every
  /// other statement shares — calling a user function permanently
  /// overwrites whatever simple variable happens to share its parameter's
  /// name. That is a faithfully reproduced quirk of the historical
  /// interpreter, not an oversight: no save/restore of the prior value is
  /// attempted here.
  fn call_user_function(&mut self) -> Result<Value, EvalError> {
    let (name, _) = self.parse_identifier()?;
    self.skip_spaces();
    self.expect_byte(b'(')?;
    let arg = self.expression()?;
    self.skip_spaces();
    self.expect_byte(b')')?;

    let func = self.eval.user_functions.get(&name).cloned().ok_or(EvalError::Undefined)?;

    match (func.param.is_string(), arg) {
      (true, Value::Str(desc)) => VariableArea::set_string(self.image, func.param, desc).map_err(EvalError::from)?,
      (false, Value::Number(n)) => VariableArea::set_numeric(self.image, func.param, n).map_err(EvalError::from)?,
      _ => return Err(EvalError::TypeMismatch),
    }

    let mut nested = Parser { eval: &mut *self.eval, image: &mut *self.image, env: &mut *self.env, bytes: &func.body, pos: 0 };
    nested.expression()
  }

  fn peek(&self) -> Option<u8> {
    self.bytes.get(self.pos).copied()
  }

  fn skip_spaces(&mut self) {
    while self.peek() == Some(b' ') {
      self.pos += 1;
    }
  }

  fn match_keyword(&mut self, keyword: Keyword) -> bool {
    self.skip_spaces();
    if self.peek().and_then(keyword_for_byte) == Some(keyword) {
      self.pos += 1;
      true
    } else {
      false
    }
  }

  fn expect_byte(&mut self, byte: u8) -> Result<(), EvalError> {
    if self.peek() == Some(byte) {
      self.pos += 1;
      Ok(())
    } else {
      Err(EvalError::Syntax)
    }
  }
}
