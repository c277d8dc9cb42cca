//! Variable / array / string area.
//!
//! Simple variables are fixed 6-byte records occupying a contiguous run
//! at `[var_start, var_start + 6*var_count)`; arrays follow in
//! `[var_start + 6*var_count, array_start)`; the string pool lives in
//! `[string_start, image_end)` (see `strings`).

mod strings;

pub use strings::{StringDescriptor, StringPool};

use crate::error::StoreError;
use crate::image::Image;
use crate::mbf::Mbf;
use crate::memory::Addressable;

const RECORD_SIZE: u16 = 6;
const ARRAY_HEADER_BASE: u16 = 5;
const ELEMENT_SIZE: u16 = 4;

/// The default bound (inclusive) Altair BASIC auto-dimensions an array to
/// when a subscripted reference is seen before any explicit `DIM`.
pub const DEFAULT_ARRAY_BOUND: u16 = 10;

/// An encoded variable name: first byte the uppercased leading letter,
/// second byte the next alphanumeric character (or 0), with bit 7 set
/// when the variable is a string. Identifiers longer than two alphanumeric
/// characters are truncated to two for identity purposes, so `ABC` and
/// `AB` collide silently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VarName {
  pub byte0: u8,
  pub byte1: u8,
}

/// Failure reason for an array element write: either the array area
/// couldn't grow to fit a newly-`DIM`'d array, or the indices supplied
/// don't match the array's rank or fall outside its declared bounds.
/// Kept distinct from `StoreError` because the two call for different
/// evaluator error mnemonics (`OM` vs. `FC`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArrayError {
  OutOfMemory,
  BadSubscript,
}

impl From<StoreError> for ArrayError {
  fn from(_: StoreError) -> Self {
    ArrayError::OutOfMemory
  }
}

impl VarName {
  /// Encodes `name` (an already-uppercased ASCII identifier, `$` suffix
  /// stripped by the caller) truncated to its first two characters.
  pub fn encode(name: &str, is_string: bool) -> VarName {
    let mut chars = name.chars().filter(|c| c.is_ascii_alphanumeric());
    let byte0 = chars.next().unwrap_or('\0').to_ascii_uppercase() as u8;
    let second = chars.next().map(|c| c.to_ascii_uppercase() as u8).unwrap_or(0);
    VarName { byte0, byte1: crate::common::set_bit(second, 7, is_string) }
  }

  pub fn is_string(&self) -> bool {
    crate::common::get_bit(self.byte1, 7)
  }
}

/// Stateless namespace over variable/array operations; all state lives in
/// the `Image` passed to each call, mirroring `ProgramStore`.
pub struct VariableArea;

impl VariableArea {
  fn simple_vars_end(image: &Image) -> u16 {
    image.var_start + RECORD_SIZE * image.var_count
  }

  fn find_simple(image: &Image, name: VarName) -> Option<u16> {
    let end = Self::simple_vars_end(image);
    let mut offset = image.var_start;
    while offset < end {
      if image.read(offset) == name.byte0 && image.read(offset + 1) == name.byte1 {
        return Some(offset);
      }
      offset += RECORD_SIZE;
    }
    None
  }

  /// Finds `name`'s simple-variable slot, creating a zero-valued one if
  /// it doesn't exist yet. Creating a slot slides any existing array data
  /// up by one record's width first.
  pub fn find_or_create(image: &mut Image, name: VarName) -> Result<u16, StoreError> {
    if let Some(offset) = Self::find_simple(image, name) {
      return Ok(offset);
    }
    if image.array_start + RECORD_SIZE > image.string_start {
      return Err(StoreError::OutOfMemory);
    }
    let new_slot = Self::simple_vars_end(image);
    let array_len = image.array_start - new_slot;
    if array_len > 0 {
      image.move_block(new_slot, array_len, new_slot + RECORD_SIZE);
    }
    image.write(new_slot, name.byte0);
    image.write(new_slot + 1, name.byte1);
    image.write_range(new_slot + 2, &[0, 0, 0, 0]);
    image.var_count += 1;
    image.array_start += RECORD_SIZE;
    Ok(new_slot)
  }

  /// Reads a numeric simple variable, or `Mbf::ZERO` if it's undefined or
  /// named as a string. Reading a variable under the wrong type always
  /// returns that type's zero value rather than erroring.
  pub fn get_numeric(image: &Image, name: VarName) -> Mbf {
    if name.is_string() {
      return Mbf::ZERO;
    }
    match Self::find_simple(image, name) {
      Some(offset) => Mbf::from_bytes(image.read_range(offset + 2, 4).try_into().unwrap()),
      None => Mbf::ZERO,
    }
  }

  pub fn set_numeric(image: &mut Image, name: VarName, value: Mbf) -> Result<(), StoreError> {
    debug_assert!(!name.is_string());
    let offset = Self::find_or_create(image, name)?;
    image.write_range(offset + 2, &value.to_bytes());
    Ok(())
  }

  /// Reads a string simple variable's descriptor, or the empty string if
  /// it's undefined or named as numeric.
  pub fn get_string(image: &Image, name: VarName) -> StringDescriptor {
    if !name.is_string() {
      return StringDescriptor::EMPTY;
    }
    match Self::find_simple(image, name) {
      Some(offset) => StringDescriptor::read(image, offset + 2),
      None => StringDescriptor::EMPTY,
    }
  }

  pub fn set_string(image: &mut Image, name: VarName, value: StringDescriptor) -> Result<(), StoreError> {
    debug_assert!(name.is_string());
    let offset = Self::find_or_create(image, name)?;
    value.write(image, offset + 2);
    Ok(())
  }

  // --- arrays ---

  fn find_array(image: &Image, name: VarName) -> Option<u16> {
    let mut offset = Self::simple_vars_end(image);
    while offset < image.array_start {
      if image.read(offset) == name.byte0 && image.read(offset + 1) == name.byte1 {
        return Some(offset);
      }
      offset += image.read16(offset + 2);
    }
    None
  }

  fn array_dims(image: &Image, array_offset: u16) -> Vec<u16> {
    let num_dims = image.read(array_offset + 4) as u16;
    (0..num_dims).map(|i| image.read16(array_offset + ARRAY_HEADER_BASE + 2 * i)).collect()
  }

  fn element_offset(image: &Image, array_offset: u16, indices: &[u16]) -> Option<u16> {
    let dims = Self::array_dims(image, array_offset);
    if indices.len() != dims.len() {
      return None;
    }
    let mut flat = 0usize;
    for (ix, bound) in indices.iter().zip(dims.iter()) {
      if *ix > *bound {
        return None;
      }
      flat = flat * (*bound as usize + 1) + *ix as usize;
    }
    let header_size = ARRAY_HEADER_BASE + 2 * dims.len() as u16;
    Some(array_offset + header_size + flat as u16 * ELEMENT_SIZE)
  }

  /// Allocates a new array record for `name` with the given (inclusive)
  /// per-dimension bounds, zero-initialized. Fails (without mutating the
  /// image) if the array area would grow past the string pool.
  pub fn dim(image: &mut Image, name: VarName, dims: &[u16]) -> Result<u16, StoreError> {
    let header_size = ARRAY_HEADER_BASE + 2 * dims.len() as u16;
    let element_count: u32 = dims.iter().map(|&d| d as u32 + 1).product();
    let total = header_size + element_count as u16 * ELEMENT_SIZE;
    if image.array_start + total > image.string_start {
      return Err(StoreError::OutOfMemory);
    }
    let offset = image.array_start;
    image.write(offset, name.byte0);
    image.write(offset + 1, name.byte1);
    image.write16(offset + 2, total);
    image.write(offset + 4, dims.len() as u8);
    for (i, &bound) in dims.iter().enumerate() {
      image.write16(offset + ARRAY_HEADER_BASE + 2 * i as u16, bound);
    }
    let data_start = offset + header_size;
    for i in 0..element_count {
      image.write_range(data_start + i as u16 * ELEMENT_SIZE, &[0, 0, 0, 0]);
    }
    image.array_start += total;
    Ok(offset)
  }

  /// Finds `name`'s array, auto-dimensioning it to `DEFAULT_ARRAY_BOUND`
  /// in each of `indices.len()` dimensions if it hasn't been `DIM`'d yet.
  pub fn find_or_auto_dim(image: &mut Image, name: VarName, dims: usize) -> Result<u16, StoreError> {
    if let Some(offset) = Self::find_array(image, name) {
      return Ok(offset);
    }
    Self::dim(image, name, &vec![DEFAULT_ARRAY_BOUND; dims])
  }

  pub fn get_array_numeric(image: &Image, name: VarName, indices: &[u16]) -> Option<Mbf> {
    let array_offset = Self::find_array(image, name)?;
    let offset = Self::element_offset(image, array_offset, indices)?;
    Some(Mbf::from_bytes(image.read_range(offset, 4).try_into().unwrap()))
  }

  pub fn set_array_numeric(image: &mut Image, name: VarName, indices: &[u16], value: Mbf) -> Result<(), ArrayError> {
    let array_offset = Self::find_or_auto_dim(image, name, indices.len())?;
    let offset = Self::element_offset(image, array_offset, indices).ok_or(ArrayError::BadSubscript)?;
    image.write_range(offset, &value.to_bytes());
    Ok(())
  }

  pub fn get_array_string(image: &Image, name: VarName, indices: &[u16]) -> Option<StringDescriptor> {
    let array_offset = Self::find_array(image, name)?;
    let offset = Self::element_offset(image, array_offset, indices)?;
    Some(StringDescriptor::read(image, offset))
  }

  pub fn set_array_string(image: &mut Image, name: VarName, indices: &[u16], value: StringDescriptor) -> Result<(), ArrayError> {
    let array_offset = Self::find_or_auto_dim(image, name, indices.len())?;
    let offset = Self::element_offset(image, array_offset, indices).ok_or(ArrayError::BadSubscript)?;
    value.write(image, offset);
    Ok(())
  }

  /// Every image offset holding a live `StringDescriptor` — simple string
  /// variables and string-array elements — for the compactor to scan.
  /// Descriptors live only inside the variable area and a small,
  /// explicitly-tracked set of evaluator temporaries, so this is a
  /// complete root set.
  pub fn live_string_sites(image: &Image) -> Vec<u16> {
    let mut sites = Vec::new();

    let simple_end = Self::simple_vars_end(image);
    let mut offset = image.var_start;
    while offset < simple_end {
      if crate::common::get_bit(image.read(offset + 1), 7) {
        sites.push(offset + 2);
      }
      offset += RECORD_SIZE;
    }

    let mut offset = simple_end;
    while offset < image.array_start {
      let total = image.read16(offset + 2);
      if crate::common::get_bit(image.read(offset + 1), 7) {
        let dims = Self::array_dims(image, offset);
        let header_size = ARRAY_HEADER_BASE + 2 * dims.len() as u16;
        let element_count: u32 = dims.iter().map(|&d| d as u32 + 1).product();
        for i in 0..element_count {
          sites.push(offset + header_size + i as u16 * ELEMENT_SIZE);
        }
      }
      offset += total;
    }

    sites
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn image() -> Image {
    let mut image = Image::new(256);
    image.array_start = 0;
    image.string_start = 256;
    image
  }

  #[test]
  fn name_encoding_sets_the_string_bit_without_colliding_with_alnum_chars() {
    let numeric = VarName::encode("X", false);
    let string = VarName::encode("X", true);
    assert_eq!(numeric.byte0, b'X');
    assert!(!numeric.is_string());
    assert!(string.is_string());
    assert_ne!(numeric.byte1, string.byte1);
  }

  #[test]
  fn long_names_truncate_to_two_characters_for_identity() {
    let ab = VarName::encode("AB", false);
    let abc = VarName::encode("ABC", false);
    assert_eq!(ab, abc);
  }

  #[test]
  fn numeric_round_trips_through_a_simple_variable() {
    let mut image = image();
    let x = VarName::encode("X", false);
    assert_eq!(VariableArea::get_numeric(&image, x), Mbf::ZERO);
    VariableArea::set_numeric(&mut image, x, Mbf::from_int16(42)).unwrap();
    assert_eq!(VariableArea::get_numeric(&image, x), Mbf::from_int16(42));
  }

  #[test]
  fn string_round_trips_through_a_simple_variable() {
    let mut image = image();
    let a = VarName::encode("A", true);
    let desc = StringPool::allocate(&mut image, b"HI", &[], &mut []).unwrap();
    VariableArea::set_string(&mut image, a, desc).unwrap();
    let got = VariableArea::get_string(&image, a);
    assert_eq!(got.body(&image), b"HI");
  }

  #[test]
  fn reading_wrong_type_returns_zero_value() {
    let mut image = image();
    let x = VarName::encode("X", false);
    VariableArea::set_numeric(&mut image, x, Mbf::from_int16(7)).unwrap();
    let as_string = VarName::encode("X", true);
    assert_eq!(VariableArea::get_string(&image, as_string), StringDescriptor::EMPTY);
  }

  #[test]
  fn creating_a_variable_after_an_array_exists_slides_the_array_up() {
    let mut image = image();
    let arr = VarName::encode("A", false);
    VariableArea::dim(&mut image, arr, &[3]).unwrap();
    assert_eq!(VariableArea::get_array_numeric(&image, arr, &[2]), Some(Mbf::ZERO));

    let x = VarName::encode("X", false);
    VariableArea::set_numeric(&mut image, x, Mbf::from_int16(9)).unwrap();

    // The array record moved up by one simple-variable record's width;
    // it must still be reachable and its data intact.
    assert_eq!(VariableArea::get_array_numeric(&image, arr, &[2]), Some(Mbf::ZERO));
    VariableArea::set_array_numeric(&mut image, arr, &[2], Mbf::from_int16(5)).unwrap();
    assert_eq!(VariableArea::get_array_numeric(&image, arr, &[2]), Some(Mbf::from_int16(5)));
  }

  #[test]
  fn subscript_out_of_range_is_none() {
    let mut image = image();
    let arr = VarName::encode("A", false);
    VariableArea::dim(&mut image, arr, &[3]).unwrap();
    assert_eq!(VariableArea::get_array_numeric(&image, arr, &[4]), None);
  }

  #[test]
  fn implicit_subscript_reference_auto_dims_to_the_default_bound() {
    let mut image = image();
    let arr = VarName::encode("A", false);
    assert!(VariableArea::get_array_numeric(&image, arr, &[DEFAULT_ARRAY_BOUND]).is_none());
    VariableArea::set_array_numeric(&mut image, arr, &[DEFAULT_ARRAY_BOUND], Mbf::from_int16(1)).unwrap();
    assert_eq!(VariableArea::get_array_numeric(&image, arr, &[DEFAULT_ARRAY_BOUND]), Some(Mbf::from_int16(1)));
    assert_eq!(VariableArea::get_array_numeric(&image, arr, &[DEFAULT_ARRAY_BOUND + 1]), None);
  }

  #[test]
  fn multi_dimensional_arrays_index_in_row_major_order() {
    let mut image = image();
    let arr = VarName::encode("M", false);
    VariableArea::dim(&mut image, arr, &[1, 2]).unwrap();
    VariableArea::set_array_numeric(&mut image, arr, &[1, 0], Mbf::from_int16(11)).unwrap();
    VariableArea::set_array_numeric(&mut image, arr, &[0, 2], Mbf::from_int16(2)).unwrap();
    assert_eq!(VariableArea::get_array_numeric(&image, arr, &[1, 0]), Some(Mbf::from_int16(11)));
    assert_eq!(VariableArea::get_array_numeric(&image, arr, &[0, 2]), Some(Mbf::from_int16(2)));
    assert_eq!(VariableArea::get_array_numeric(&image, arr, &[0, 0]), Some(Mbf::ZERO));
  }

  #[test]
  fn live_string_sites_covers_simple_and_array_string_slots() {
    let mut image = image();
    let a = VarName::encode("A", true);
    let arr = VarName::encode("B", true);
    let desc = StringPool::allocate(&mut image, b"X", &[], &mut []).unwrap();
    VariableArea::set_string(&mut image, a, desc).unwrap();
    VariableArea::dim(&mut image, arr, &[2]).unwrap();
    let sites = VariableArea::live_string_sites(&image);
    // one simple-variable site plus three array-element sites (bound 2 -> 3 elements)
    assert_eq!(sites.len(), 4);
  }

  #[test]
  fn out_of_memory_on_variable_creation_is_reported() {
    let mut image = Image::new(8);
    image.array_start = 8;
    image.string_start = 8;
    let x = VarName::encode("X", false);
    let err = VariableArea::set_numeric(&mut image, x, Mbf::ONE).unwrap_err();
    assert_eq!(err, StoreError::OutOfMemory);
  }
}
