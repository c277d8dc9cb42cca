//! `Interpreter`: the top-level owned value wiring together the image,
//! the evaluator, and the outside world, exposing a small set of
//! driver-facing methods rather than letting callers poke its internals
//! directly.
//!
//! Every public method here is part of the contract a statement dispatcher
//! (PRINT, IF, GOTO, FOR, ...) needs from the core; statement dispatch
//! itself is an external collaborator this crate does not implement.

use std::ops::RangeInclusive;

use crate::env::Environment;
use crate::error::{EvalError, StoreError};
use crate::eval::{self, Evaluator};
use crate::image::Image;
use crate::mbf::Mbf;
use crate::store::ProgramStore;
use crate::token::{self, TokenizedLine};
use crate::vars::{ArrayError, StringDescriptor, VarName, VariableArea};

pub struct Interpreter {
  image: Image,
  eval: Evaluator,
  env: Box<dyn Environment>,
}

impl Interpreter {
  pub fn new(image: Image, env: Box<dyn Environment>) -> Interpreter {
    Interpreter { image, eval: Evaluator::new(), env }
  }

  pub fn image(&self) -> &Image {
    &self.image
  }

  pub fn image_mut(&mut self) -> &mut Image {
    &mut self.image
  }

  // --- Tokenizer / program store contract ---------------------------

  pub fn tokenize_line(&self, src: &str) -> Option<TokenizedLine> {
    token::tokenize_line(src, self.image.len())
  }

  pub fn program_insert_line(&mut self, line_no: u16, tokenized: &[u8]) -> Result<(), StoreError> {
    ProgramStore::insert_or_replace(&mut self.image, line_no, tokenized)
  }

  pub fn program_get_line(&self, line_no: u16) -> Option<&[u8]> {
    let offset = ProgramStore::find(&self.image, line_no)?;
    Some(ProgramStore::text(&self.image, offset))
  }

  pub fn list_program(&self, range: RangeInclusive<u16>) -> String {
    ProgramStore::list(&self.image, range)
  }

  pub fn program_clear(&mut self) {
    ProgramStore::clear(&mut self.image);
  }

  // --- Variable / array / string area contract -----------------------

  pub fn var_get_numeric(&self, name: VarName) -> Mbf {
    VariableArea::get_numeric(&self.image, name)
  }

  pub fn var_set_numeric(&mut self, name: VarName, value: Mbf) -> Result<(), StoreError> {
    VariableArea::set_numeric(&mut self.image, name, value)
  }

  pub fn var_get_string(&self, name: VarName) -> StringDescriptor {
    VariableArea::get_string(&self.image, name)
  }

  pub fn var_set_string(&mut self, name: VarName, value: StringDescriptor) -> Result<(), StoreError> {
    VariableArea::set_string(&mut self.image, name, value)
  }

  pub fn var_dim(&mut self, name: VarName, dims: &[u16]) -> Result<(), StoreError> {
    VariableArea::dim(&mut self.image, name, dims).map(|_| ())
  }

  pub fn var_get_array_numeric(&self, name: VarName, indices: &[u16]) -> Option<Mbf> {
    VariableArea::get_array_numeric(&self.image, name, indices)
  }

  pub fn var_set_array_numeric(&mut self, name: VarName, indices: &[u16], value: Mbf) -> Result<(), ArrayError> {
    VariableArea::set_array_numeric(&mut self.image, name, indices, value)
  }

  pub fn var_get_array_string(&self, name: VarName, indices: &[u16]) -> Option<StringDescriptor> {
    VariableArea::get_array_string(&self.image, name, indices)
  }

  pub fn var_set_array_string(&mut self, name: VarName, indices: &[u16], value: StringDescriptor) -> Result<(), ArrayError> {
    VariableArea::set_array_string(&mut self.image, name, indices, value)
  }

  pub fn define_function(&mut self, name: VarName, param: VarName, body: Vec<u8>) {
    self.eval.define_function(name, param, body);
  }

  // --- Evaluator contract ---------------------------------------------

  pub fn eval_expression(&mut self, bytes: &[u8]) -> (Result<Mbf, EvalError>, usize) {
    eval::eval_expression(&mut self.eval, &mut self.image, &mut *self.env, bytes)
  }

  pub fn eval_string_expression(&mut self, bytes: &[u8]) -> (Result<StringDescriptor, EvalError>, usize) {
    eval::eval_string_expression(&mut self.eval, &mut self.image, &mut *self.env, bytes)
  }

  // --- Misc. contract functions ----------------------------------------

  pub fn basic_rnd(&mut self, x: Mbf) -> Mbf {
    self.eval.rnd(x)
  }

  pub fn basic_free_memory(&self) -> Mbf {
    Mbf::from_int32(self.image.free_space() as i32).expect("free space always fits in i32")
  }

  pub fn terminal_x(&self) -> u16 {
    self.env.column()
  }

  pub fn is_break_requested(&self) -> bool {
    self.env.is_break_requested()
  }
}
