use thiserror::Error;

/// Error state produced by a single MBF arithmetic operation.
///
/// Mirrors the module-local error cell of the historical interpreter, but
/// threaded as a return value rather than hidden process-wide state.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbfError {
  #[error("overflow")]
  Overflow,
  #[error("underflow")]
  Underflow,
  #[error("division by zero")]
  DivideByZero,
  #[error("illegal quantity")]
  Domain,
}

/// Error surfaced by the expression evaluator.
///
/// Each variant carries the two-letter mnemonic used by the (external)
/// statement dispatcher to format `?XX ERROR IN line_no`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalError {
  #[error("syntax error")]
  Syntax,
  #[error("overflow")]
  Overflow,
  #[error("division by zero")]
  DivideByZero,
  #[error("type mismatch")]
  TypeMismatch,
  #[error("illegal function call")]
  IllegalFunctionCall,
  #[error("out of memory")]
  OutOfMemory,
  #[error("undefined function")]
  Undefined,
  #[error("return without gosub")]
  ReturnWithoutGosub,
}

impl EvalError {
  /// The two-letter error mnemonic (`SN`, `OV`, `DZ`, ...) the external
  /// statement dispatcher prints alongside the offending line number.
  pub fn mnemonic(&self) -> &'static str {
    match self {
      EvalError::Syntax => "SN",
      EvalError::Overflow => "OV",
      EvalError::DivideByZero => "DZ",
      EvalError::TypeMismatch => "TM",
      EvalError::IllegalFunctionCall => "FC",
      EvalError::OutOfMemory => "OM",
      EvalError::Undefined => "UF",
      EvalError::ReturnWithoutGosub => "RG",
    }
  }
}

impl From<MbfError> for EvalError {
  fn from(err: MbfError) -> Self {
    match err {
      MbfError::Overflow | MbfError::Underflow => EvalError::Overflow,
      MbfError::DivideByZero => EvalError::DivideByZero,
      MbfError::Domain => EvalError::IllegalFunctionCall,
    }
  }
}

/// Error returned by program-store edits.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
  #[error("out of memory")]
  OutOfMemory,
}

impl From<StoreError> for EvalError {
  fn from(_: StoreError) -> Self {
    EvalError::OutOfMemory
  }
}
