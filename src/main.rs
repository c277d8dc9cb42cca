// Copyright (c) 2021 Thomas J. Otterson
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

fn main() {
  println!("altair-basic is a library crate: the tokenizer, program store,");
  println!("variable/array/string area, and expression evaluator live in");
  println!("the `altair_basic` crate. There is no REPL here — wire up");
  println!("`altair_basic::Interpreter` behind your own statement dispatch.");
}
