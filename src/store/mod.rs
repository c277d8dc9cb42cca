//! Program line store: a linked list threaded through the program area,
//! each record a 2-byte link to the next record, a 2-byte line number,
//! then tokenized line text terminated by `0x00`.

use crate::error::StoreError;
use crate::image::Image;
use crate::memory::Addressable;
use crate::token::detokenize;
use std::ops::RangeInclusive;

const RECORD_HEADER: u16 = 4;

/// A value-semantics offset into the program area, so callers hold a
/// position rather than a raw pointer into the image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Offset(pub u16);

impl Offset {
  pub fn resolve(self) -> u16 {
    self.0
  }
}

/// Stateless namespace over program-store operations; all state lives in
/// the `Image` passed to each call.
pub struct ProgramStore;

impl ProgramStore {
  /// The first record in line-number order, if the program is non-empty.
  pub fn first_line(image: &Image) -> Option<Offset> {
    (image.program_start < image.program_end).then_some(Offset(image.program_start))
  }

  /// The record following `offset`, if any.
  pub fn next_line(image: &Image, offset: Offset) -> Option<Offset> {
    let link = image.read16(offset.0);
    (link != 0).then_some(Offset(link))
  }

  /// The record for `line_no`, if one exists.
  pub fn find(image: &Image, line_no: u16) -> Option<Offset> {
    find_with_predecessor(image, line_no).1.map(Offset)
  }

  pub fn line_no(image: &Image, offset: Offset) -> u16 {
    image.read16(offset.0 + 2)
  }

  /// The tokenized text of the record at `offset`, including its
  /// trailing `0x00` terminator.
  pub fn text<'a>(image: &'a Image, offset: Offset) -> &'a [u8] {
    let size = record_size(image, offset.0);
    image.read_range(offset.0 + RECORD_HEADER, size - RECORD_HEADER)
  }

  /// Inserts, replaces, or deletes (when `text` is empty) the line
  /// numbered `line_no`. Preserves ascending order and link integrity on
  /// success; on `OutOfMemory`, the image is left byte-identical to its
  /// pre-call contents.
  pub fn insert_or_replace(image: &mut Image, line_no: u16, text: &[u8]) -> Result<(), StoreError> {
    let (predecessor, existing) = find_with_predecessor(image, line_no);
    let old_size = existing.map(|off| record_size(image, off));
    let new_size: u16 = if text.is_empty() { 0 } else { RECORD_HEADER + text.len() as u16 };

    let delta = new_size as i32 - old_size.unwrap_or(0) as i32;
    if delta > 0 && delta as u16 > image.free_space() {
      return Err(StoreError::OutOfMemory);
    }

    if let (Some(off), Some(size)) = (existing, old_size) {
      delete_record(image, off, size, predecessor);
    }

    if new_size > 0 {
      let (predecessor, _) = find_with_predecessor(image, line_no);
      let insertion_offset = find_insertion_point(image, line_no);
      insert_record(image, insertion_offset, line_no, text, predecessor);
    }

    image.clear_variables();
    Ok(())
  }

  /// Deletes the whole program, per `NEW`.
  pub fn clear(image: &mut Image) {
    image.program_end = image.program_start;
    image.clear_variables();
  }

  /// Renders every line in `range` as `LIST` would: a decimal line
  /// number, the detokenized text, and a trailing newline per line.
  pub fn list(image: &Image, range: RangeInclusive<u16>) -> String {
    let mut out = String::new();
    let mut cursor = ProgramStore::first_line(image);
    while let Some(offset) = cursor {
      let line_no = ProgramStore::line_no(image, offset);
      if range.contains(&line_no) {
        out.push_str(&line_no.to_string());
        out.push(' ');
        out.push_str(&detokenize(ProgramStore::text(image, offset)));
        out.push('\n');
      }
      cursor = ProgramStore::next_line(image, offset);
    }
    out
  }
}

fn record_size(image: &Image, offset: u16) -> u16 {
  let link = image.read16(offset);
  if link != 0 {
    link - offset
  } else {
    image.program_end - offset
  }
}

/// Returns `(predecessor offset, this line's offset)`. `predecessor` is
/// the last record with a smaller line number, if any.
fn find_with_predecessor(image: &Image, line_no: u16) -> (Option<u16>, Option<u16>) {
  let mut predecessor = None;
  let mut cursor = (image.program_start < image.program_end).then_some(image.program_start);
  while let Some(offset) = cursor {
    let current_no = image.read16(offset + 2);
    if current_no == line_no {
      return (predecessor, Some(offset));
    }
    if current_no > line_no {
      return (predecessor, None);
    }
    predecessor = Some(offset);
    let link = image.read16(offset);
    cursor = (link != 0).then_some(link);
  }
  (predecessor, None)
}

/// The offset a new record for `line_no` should be written at: the first
/// existing record with a greater line number, or `program_end`.
fn find_insertion_point(image: &Image, line_no: u16) -> u16 {
  let mut cursor = (image.program_start < image.program_end).then_some(image.program_start);
  while let Some(offset) = cursor {
    if image.read16(offset + 2) > line_no {
      return offset;
    }
    let link = image.read16(offset);
    cursor = (link != 0).then_some(link);
  }
  image.program_end
}

/// Deletes the record at `offset` (known size `size`), fixing up every
/// other record's `link` field and, if the deleted record was the last
/// one, the predecessor's `link`.
fn delete_record(image: &mut Image, offset: u16, size: u16, predecessor: Option<u16>) {
  let deleted_forward = image.read16(offset);

  let mut records = Vec::new();
  let mut cursor = image.program_start;
  while cursor < image.program_end {
    let link = image.read16(cursor);
    let size_here = if link != 0 { link - cursor } else { image.program_end - cursor };
    records.push((cursor, link));
    cursor += size_here;
  }

  let tail_start = offset + size;
  let tail_len = image.program_end - tail_start;
  image.move_block(tail_start, tail_len, offset);
  image.program_end -= size;

  for (old_offset, link) in records {
    if old_offset == offset {
      continue;
    }
    if link > offset {
      let new_offset = if old_offset > offset { old_offset - size } else { old_offset };
      image.write16(new_offset, link - size);
    }
  }

  if deleted_forward == 0 {
    if let Some(pred) = predecessor {
      image.write16(pred, 0);
    }
  }
}

/// Inserts a new record of `text` for `line_no` at `insertion_offset`,
/// shifting the tail up and fixing every `link` that pointed at or past
/// the insertion point, then pointing `predecessor` (if any) at the new
/// record.
fn insert_record(image: &mut Image, insertion_offset: u16, line_no: u16, text: &[u8], predecessor: Option<u16>) {
  let new_size = RECORD_HEADER + text.len() as u16;

  let mut records = Vec::new();
  let mut cursor = image.program_start;
  while cursor < image.program_end {
    let link = image.read16(cursor);
    let size_here = if link != 0 { link - cursor } else { image.program_end - cursor };
    records.push((cursor, link));
    cursor += size_here;
  }

  let tail_len = image.program_end - insertion_offset;
  image.move_block(insertion_offset, tail_len, insertion_offset + new_size);
  image.program_end += new_size;

  for (old_offset, link) in records {
    let new_offset = if old_offset >= insertion_offset { old_offset + new_size } else { old_offset };
    if link != 0 && link >= insertion_offset {
      image.write16(new_offset, link + new_size);
    }
  }

  let successor = if tail_len > 0 { insertion_offset + new_size } else { 0 };
  image.write16(insertion_offset, successor);
  image.write16(insertion_offset + 2, line_no);
  image.write_range(insertion_offset + RECORD_HEADER, text);

  if let Some(pred) = predecessor {
    image.write16(pred, insertion_offset);
  }
}
