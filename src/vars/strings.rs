//! String pool: append-on-allocate from the top of the image, compacted
//! (garbage collected) on exhaustion.

use crate::error::StoreError;
use crate::image::Image;
use crate::memory::Addressable;

/// A 4-byte descriptor referring to bytes in the string pool: `length`,
/// a reserved byte (kept zero, never interpreted), and `ptr`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StringDescriptor {
  pub length: u8,
  pub ptr: u16,
}

impl StringDescriptor {
  pub const EMPTY: StringDescriptor = StringDescriptor { length: 0, ptr: 0 };

  pub fn to_bytes(self) -> [u8; 4] {
    [self.length, 0, crate::common::lo(self.ptr), crate::common::hi(self.ptr)]
  }

  pub fn from_bytes(bytes: [u8; 4]) -> StringDescriptor {
    StringDescriptor { length: bytes[0], ptr: crate::common::word(bytes[2], bytes[3]) }
  }

  pub fn read(image: &Image, offset: u16) -> StringDescriptor {
    let bytes = image.read_range(offset, 4);
    StringDescriptor::from_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
  }

  pub fn write(self, image: &mut Image, offset: u16) {
    image.write_range(offset, &self.to_bytes());
  }

  pub fn body<'a>(&self, image: &'a Image) -> &'a [u8] {
    image.read_range(self.ptr, self.length as u16)
  }
}

/// Stateless namespace over string-pool operations, mirroring
/// `ProgramStore`'s shape: all state lives in the `Image`.
pub struct StringPool;

impl StringPool {
  /// Copies `bytes` into the pool, growing it downward, compacting first
  /// if the free region is too small. `descriptor_sites` names every
  /// other live descriptor in the image (simple string variables and
  /// string array elements, per `VariableArea::live_string_sites`);
  /// `extra_roots` additionally covers evaluator temporaries not yet
  /// written anywhere in the image: anything still sitting on the
  /// evaluator's value stack when compaction runs must register here or
  /// it silently goes stale.
  pub fn allocate(
    image: &mut Image,
    bytes: &[u8],
    descriptor_sites: &[u16],
    extra_roots: &mut [StringDescriptor],
  ) -> Result<StringDescriptor, StoreError> {
    let len = bytes.len() as u16;
    if image.array_start + len > image.string_start {
      StringPool::compact(image, descriptor_sites, extra_roots);
    }
    if image.array_start + len > image.string_start {
      return Err(StoreError::OutOfMemory);
    }
    let ptr = image.string_start - len;
    image.write_range(ptr, bytes);
    image.string_start = ptr;
    Ok(StringDescriptor { length: bytes.len() as u8, ptr })
  }

  /// Relocates every live string body to a freshly packed, gap-free
  /// region at the top of the image and rewrites every descriptor that
  /// named it; no caller can observe a half-moved pool, since the new
  /// bodies are written before any descriptor is repointed. Descriptors
  /// with `length == 0` (the empty string) are left untouched — an empty
  /// string never occupies pool bytes.
  pub fn compact(image: &mut Image, descriptor_sites: &[u16], extra_roots: &mut [StringDescriptor]) {
    enum Target {
      Site(u16),
      Root(usize),
    }

    let mut bodies: Vec<Vec<u8>> = Vec::new();
    let mut write_backs: Vec<(Target, usize)> = Vec::new();

    for &site in descriptor_sites {
      let desc = StringDescriptor::read(image, site);
      if desc.length == 0 {
        continue;
      }
      bodies.push(desc.body(image).to_vec());
      write_backs.push((Target::Site(site), bodies.len() - 1));
    }
    for (i, desc) in extra_roots.iter().enumerate() {
      if desc.length == 0 {
        continue;
      }
      bodies.push(desc.body(image).to_vec());
      write_backs.push((Target::Root(i), bodies.len() - 1));
    }

    let before = image.string_start;
    let mut cursor = image.image_end;
    for (target, body_index) in write_backs {
      let body = &bodies[body_index];
      cursor -= body.len() as u16;
      image.write_range(cursor, body);
      let new_desc = StringDescriptor { length: body.len() as u8, ptr: cursor };
      match target {
        Target::Site(site) => new_desc.write(image, site),
        Target::Root(i) => extra_roots[i] = new_desc,
      }
    }
    image.string_start = cursor;
    #[cfg(feature = "logging")]
    log::trace!("string pool compacted: reclaimed {} bytes", (cursor as i32 - before as i32).max(0));
    #[cfg(not(feature = "logging"))]
    let _ = before;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn allocate_grows_the_pool_downward() {
    let mut image = Image::new(64);
    image.array_start = 0;
    image.string_start = 64;
    let a = StringPool::allocate(&mut image, b"HI", &[], &mut []).unwrap();
    assert_eq!(a.ptr, 62);
    assert_eq!(image.string_start, 62);
    let b = StringPool::allocate(&mut image, b"THERE", &[], &mut []).unwrap();
    assert_eq!(b.ptr, 57);
    assert_eq!(a.body(&image), b"HI");
    assert_eq!(b.body(&image), b"THERE");
  }

  #[test]
  fn allocate_fails_when_region_is_exhausted() {
    let mut image = Image::new(16);
    image.array_start = 14;
    image.string_start = 16;
    let err = StringPool::allocate(&mut image, b"TOO LONG", &[], &mut []).unwrap_err();
    assert_eq!(err, StoreError::OutOfMemory);
  }

  #[test]
  fn compact_reclaims_space_from_a_dead_string_and_repacks_survivors() {
    let mut image = Image::new(32);
    image.array_start = 0;
    image.string_start = 32;

    // Two live strings, written in the order a Vec<u16> of descriptor
    // sites would reflect them, plus one "dead" allocation (simulating a
    // string that was overwritten and is no longer referenced by any
    // site or root) fragmenting the pool between them.
    let mut site_a = [0u8; 4];
    let mut site_b = [0u8; 4];
    let a = StringPool::allocate(&mut image, b"ALPHA", &[], &mut []).unwrap();
    let _dead = StringPool::allocate(&mut image, b"GARBAGE", &[], &mut []).unwrap();
    let b = StringPool::allocate(&mut image, b"BETA", &[], &mut []).unwrap();
    a.write(&mut image, 0);
    site_a.copy_from_slice(&image.read_range(0, 4).to_vec());
    b.write(&mut image, 4);
    site_b.copy_from_slice(&image.read_range(4, 4).to_vec());

    let before_free = image.string_start;
    StringPool::compact(&mut image, &[0, 4], &mut []);
    assert!(image.string_start > before_free, "compaction should reclaim the dead allocation's bytes");

    let new_a = StringDescriptor::read(&image, 0);
    let new_b = StringDescriptor::read(&image, 4);
    assert_eq!(new_a.body(&image), b"ALPHA");
    assert_eq!(new_b.body(&image), b"BETA");
  }

  #[test]
  fn compact_rewrites_extra_root_temporaries_too() {
    let mut image = Image::new(32);
    image.array_start = 0;
    image.string_start = 32;
    let temp = StringPool::allocate(&mut image, b"TEMP", &[], &mut []).unwrap();
    let mut roots = [temp];
    StringPool::compact(&mut image, &[], &mut roots);
    assert_eq!(roots[0].body(&image), b"TEMP");
  }

  #[test]
  fn allocate_compacts_automatically_when_the_region_is_tight() {
    let mut image = Image::new(20);
    image.array_start = 0;
    image.string_start = 20;
    let first = StringPool::allocate(&mut image, b"AAAAAAAA", &[], &mut []).unwrap();
    let mut site = [0u8; 4];
    first.write(&mut image, 0);
    site.copy_from_slice(&image.read_range(0, 4).to_vec());
    // Free space is now 12 bytes but fragmentation never actually blocks a
    // smaller request on its own; exercise the auto-compact path directly
    // by shrinking `array_start` to simulate pressure instead.
    image.array_start = 10;
    let second = StringPool::allocate(&mut image, b"BB", &[0], &mut []).unwrap();
    assert_eq!(second.body(&image), b"BB");
    assert_eq!(StringDescriptor::read(&image, 0).body(&image), b"AAAAAAAA");
  }
}
