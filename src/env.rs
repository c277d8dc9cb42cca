//! The evaluator's only window onto the outside world: cursor column and
//! break polling leak in from whatever drives the interpreter (a REPL, a
//! file runner, a test harness), so they're reached through this one
//! narrow trait rather than the evaluator touching the driver directly.

/// Narrow, read-only view the expression evaluator has of whatever drives
/// it (a REPL, a file runner, a test harness).
pub trait Environment {
  /// The terminal's current cursor column, for `POS(x)`.
  fn column(&self) -> u16;

  /// Whether a user break (e.g. Ctrl-C) has been requested. Statement-level
  /// code polls this between statements and between `FOR` iterations; the
  /// evaluator itself never polls mid-expression.
  fn is_break_requested(&self) -> bool;
}

/// A stand-in `Environment` for tests and headless evaluation: column 0,
/// never interrupted.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullEnvironment;

impl Environment for NullEnvironment {
  fn column(&self) -> u16 {
    0
  }

  fn is_break_requested(&self) -> bool {
    false
  }
}
