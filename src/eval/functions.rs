//! Function dispatch table: arity, operand types, and result type per
//! keyword. `mod.rs` decodes a function call into a keyword and an
//! already-evaluated argument list; this file is the "execute" half.

use super::{Parser, Value};
use crate::error::EvalError;
use crate::mbf::Mbf;
use crate::memory::Addressable;
use crate::token::Keyword;
use crate::vars::{StringPool, VariableArea};

fn number_at(args: &[Value], i: usize) -> Result<Mbf, EvalError> {
  match args.get(i) {
    Some(Value::Number(n)) => Ok(*n),
    Some(Value::Str(_)) => Err(EvalError::TypeMismatch),
    None => Err(EvalError::Syntax),
  }
}

fn string_bytes(parser: &Parser<'_>, args: &[Value], i: usize) -> Result<Vec<u8>, EvalError> {
  match args.get(i) {
    Some(Value::Str(desc)) => Ok(desc.body(parser.image).to_vec()),
    Some(Value::Number(_)) => Err(EvalError::TypeMismatch),
    None => Err(EvalError::Syntax),
  }
}

/// Copies `bytes` into the string pool and wraps the resulting
/// descriptor as a `Value`. Every caller below has already extracted any
/// source strings' bytes into owned `Vec<u8>`s before reaching here, so
/// there is no live evaluator temporary that compaction could strand:
/// nothing needs registering with the compactor because nothing is left
/// to track by the time this runs.
pub(super) fn alloc_string(parser: &mut Parser<'_>, bytes: Vec<u8>) -> Result<Value, EvalError> {
  if bytes.len() > 255 {
    return Err(EvalError::IllegalFunctionCall);
  }
  let sites = VariableArea::live_string_sites(parser.image);
  let desc = StringPool::allocate(parser.image, &bytes, &sites, &mut []).map_err(EvalError::from)?;
  Ok(Value::Str(desc))
}

/// Dispatches a function call already parsed into `keyword` and its
/// evaluated `args`. Unsupported functions (`USR`, `INP`) warn once and
/// return zero.
pub(super) fn dispatch(parser: &mut Parser<'_>, keyword: Keyword, args: Vec<Value>) -> Result<Value, EvalError> {
  use Keyword::*;
  match keyword {
    Sgn => Ok(Value::Number(number_at(&args, 0)?.sgn())),
    Int => Ok(Value::Number(number_at(&args, 0)?.int().map_err(EvalError::from)?)),
    Abs => Ok(Value::Number(number_at(&args, 0)?.abs())),

    Usr => {
      parser.eval.warn_unsupported(Usr);
      Ok(Value::Number(Mbf::ZERO))
    }
    Inp => {
      parser.eval.warn_unsupported(Inp);
      Ok(Value::Number(Mbf::ZERO))
    }

    Fre => {
      let _ = number_at(&args, 0)?; // evaluated and discarded, per historical convention
      Ok(Value::Number(Mbf::from_int32(parser.image.free_space() as i32).map_err(EvalError::from)?))
    }
    Pos => {
      let _ = number_at(&args, 0)?;
      Ok(Value::Number(Mbf::from_int16(parser.env.column() as i16)))
    }

    Sqr => Ok(Value::Number(number_at(&args, 0)?.sqr().map_err(EvalError::from)?)),
    Rnd => Ok(Value::Number(parser.eval.rnd.rnd(number_at(&args, 0)?))),
    Log => Ok(Value::Number(number_at(&args, 0)?.log().map_err(EvalError::from)?)),
    Exp => Ok(Value::Number(number_at(&args, 0)?.exp_fn().map_err(EvalError::from)?)),
    Cos => Ok(Value::Number(number_at(&args, 0)?.cos().map_err(EvalError::from)?)),
    Sin => Ok(Value::Number(number_at(&args, 0)?.sin().map_err(EvalError::from)?)),
    Tan => Ok(Value::Number(number_at(&args, 0)?.tan().map_err(EvalError::from)?)),
    Atn => Ok(Value::Number(number_at(&args, 0)?.atn().map_err(EvalError::from)?)),

    Peek => {
      let addr = number_at(&args, 0)?.to_int32().map_err(EvalError::from)?;
      Ok(Value::Number(Mbf::from_int16(parser.image.read(addr as u16) as i16)))
    }

    Len => {
      let bytes = string_bytes(parser, &args, 0)?;
      Ok(Value::Number(Mbf::from_int16(bytes.len() as i16)))
    }
    StrDollar => {
      let n = number_at(&args, 0)?;
      alloc_string(parser, n.to_display_string().into_bytes())
    }
    Val => {
      let bytes = string_bytes(parser, &args, 0)?;
      let text: String = bytes.iter().map(|&b| b as char).collect();
      match Mbf::from_string(text.trim_start()) {
        Some((value, _)) => Ok(Value::Number(value)),
        None => Ok(Value::Number(Mbf::ZERO)),
      }
    }
    Asc => {
      let bytes = string_bytes(parser, &args, 0)?;
      let first = *bytes.first().ok_or(EvalError::IllegalFunctionCall)?;
      Ok(Value::Number(Mbf::from_int16(first as i16)))
    }
    ChrDollar => {
      let code = number_at(&args, 0)?.to_int32().map_err(EvalError::from)?;
      if !(0..=255).contains(&code) {
        return Err(EvalError::IllegalFunctionCall);
      }
      alloc_string(parser, vec![code as u8])
    }

    LeftDollar => {
      let bytes = string_bytes(parser, &args, 0)?;
      let n = number_at(&args, 1)?.to_int32().map_err(EvalError::from)?;
      if n < 0 {
        return Err(EvalError::IllegalFunctionCall);
      }
      let take = (n as usize).min(bytes.len());
      alloc_string(parser, bytes[..take].to_vec())
    }
    RightDollar => {
      let bytes = string_bytes(parser, &args, 0)?;
      let n = number_at(&args, 1)?.to_int32().map_err(EvalError::from)?;
      if n < 0 {
        return Err(EvalError::IllegalFunctionCall);
      }
      let take = (n as usize).min(bytes.len());
      alloc_string(parser, bytes[bytes.len() - take..].to_vec())
    }
    MidDollar => {
      let bytes = string_bytes(parser, &args, 0)?;
      let start = number_at(&args, 1)?.to_int32().map_err(EvalError::from)?;
      if start < 1 {
        return Err(EvalError::IllegalFunctionCall);
      }
      let start = (start as usize - 1).min(bytes.len());
      let len = if args.len() > 2 { number_at(&args, 2)?.to_int32().map_err(EvalError::from)? } else { bytes.len() as i32 };
      if len < 0 {
        return Err(EvalError::IllegalFunctionCall);
      }
      let end = (start + len as usize).min(bytes.len());
      alloc_string(parser, bytes[start..end].to_vec())
    }

    _ => Err(EvalError::Syntax),
  }
}
