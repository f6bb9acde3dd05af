use std::{cmp, marker::PhantomData, ptr, ptr::NonNull};

use tracing::{trace, warn};

#[cfg(unix)]
use crate::heap::ProgramBreak;
use crate::{
  align::ALIGNMENT,
  align_past,
  block::{BlockInfo, BlockMeta, META_SIZE},
  config::ArenaConfig,
  error::{AllocError, ConfigError, HeapError, InvariantViolation},
  heap::{HeapGrower, HeapRegion},
};

/// Room for the two forward alignment adjustments of a new block: one for its
/// record, one for its payload.
pub const ALIGN_SLACK: usize = 2 * ALIGNMENT;

/// Largest payload a single request may ask for.
pub const MAX_REQUEST: usize = isize::MAX as usize;

/// Snapshot of an arena's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaStats {
  pub live_blocks: usize,
  /// Sum of the requested lengths of every live block.
  pub live_bytes: usize,
  pub region_base: usize,
  pub high_water: usize,
  pub growth_count: usize,
}

/// First-fit block allocator over a single growable region.
///
/// Every live block is a [`BlockMeta`] record written into the region, linked
/// in address order behind a head sentinel:
///
/// ```text
///   head ──▶ ┌──────┬────────────┐ ──▶ ┌──────┬───────┐ ──▶ null
///            │ meta │  payload   │     │ meta │ pay.. │
///   null ◀── └──────┴────────────┘ ◀── └──────┴───────┘
/// ```
///
/// Freed blocks are unlinked and their space is left behind as a gap. A later
/// request lands in the first gap that is large enough, otherwise after the
/// last block, growing the region when the high-water mark is too close.
pub struct Arena<G: HeapGrower> {
  region: HeapRegion<G>,
  head: NonNull<BlockMeta>,
  live_blocks: usize,
  live_bytes: usize,
}

// The arena exclusively owns its head and every record in its region.
unsafe impl<G: HeapGrower + Send> Send for Arena<G> {}

#[cfg(unix)]
impl Arena<ProgramBreak> {
  /// Arena growing the process data segment.
  pub fn program_break() -> Self {
    Self::new(ProgramBreak)
  }
}

impl<G: HeapGrower> Arena<G> {
  pub fn new(grower: G) -> Self {
    Self::from_parts(grower, ArenaConfig::default())
  }

  pub fn with_config(
    grower: G,
    config: ArenaConfig,
  ) -> Result<Self, ConfigError> {
    config.validate()?;
    Ok(Self::from_parts(grower, config))
  }

  fn from_parts(
    grower: G,
    config: ArenaConfig,
  ) -> Self {
    Self {
      region: HeapRegion::new(grower, config.min_growth),
      head: NonNull::from(Box::leak(Box::new(BlockMeta::sentinel()))),
      live_blocks: 0,
      live_bytes: 0,
    }
  }

  pub fn region(&self) -> &HeapRegion<G> {
    &self.region
  }

  pub fn stats(&self) -> ArenaStats {
    ArenaStats {
      live_blocks: self.live_blocks,
      live_bytes: self.live_bytes,
      region_base: self.region.base(),
      high_water: self.region.high_water(),
      growth_count: self.region.growth_count(),
    }
  }

  /// Live blocks in address order.
  pub fn blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
    self.records().map(|record| {
      let meta = unsafe { record.as_ref() };
      BlockInfo {
        address: meta.data_address,
        length: meta.data_length,
      }
    })
  }

  /// Allocates `size` bytes, returning null on failure or for `size == 0`.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> *mut u8 {
    self.try_allocate(size).map_or(ptr::null_mut(), NonNull::as_ptr)
  }

  /// Releases a block. Null and unknown pointers are ignored.
  pub fn free(
    &mut self,
    address: *mut u8,
  ) {
    let _ = self.try_free(address);
  }

  /// Allocates `count * element_size` zeroed bytes, returning null on
  /// overflow, failure, or an empty request.
  pub fn zero_allocate(
    &mut self,
    count: usize,
    element_size: usize,
  ) -> *mut u8 {
    self
      .try_zero_allocate(count, element_size)
      .map_or(ptr::null_mut(), NonNull::as_ptr)
  }

  /// Moves a block to a fresh one of `new_size` bytes, keeping the common
  /// prefix. Returns null when the block was freed (`new_size == 0`) or on
  /// failure, in which case the original block is left untouched.
  pub fn resize(
    &mut self,
    address: *mut u8,
    new_size: usize,
  ) -> *mut u8 {
    match self.try_resize(address, new_size) {
      Ok(Some(data)) => data.as_ptr(),
      Ok(None) | Err(_) => ptr::null_mut(),
    }
  }

  /// Requested length of a live block, `0` for anything else.
  pub fn usable_size(
    &self,
    address: *const u8,
  ) -> usize {
    self
      .find_record(address)
      .map_or(0, |record| unsafe { record.as_ref() }.data_length)
  }

  pub fn try_allocate(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    if size == 0 {
      return Err(AllocError::ZeroSize);
    }
    if size > MAX_REQUEST {
      warn!(size, "allocation request too large");
      return Err(AllocError::SizeOverflow { size });
    }
    let needed = size + META_SIZE + ALIGN_SLACK;

    if !self.region.is_established() {
      if let Err(error) = self.region.ensure_capacity(size) {
        warn!(size, %error, "cannot establish heap region");
        return Err(error.into());
      }
      unsafe { (*self.head.as_ptr()).data_address = self.region.pointer_at(self.region.base()) };
    }

    let insertion = self.find_insertion_point(needed);
    let data_end = unsafe { (*insertion).data_end() };

    if self.region.high_water() <= data_end.saturating_add(needed) {
      if let Err(error) = self.region.ensure_capacity(needed) {
        warn!(size, %error, "allocation failed");
        return Err(error.into());
      }
    }

    let meta_address = align_past!(data_end);
    let data_address = align_past!(meta_address + META_SIZE);

    let record = self.region.pointer_at(meta_address).cast::<BlockMeta>();
    let data = NonNull::new(self.region.pointer_at(data_address))
      .ok_or(HeapError::Exhausted { requested: needed })?;

    unsafe {
      let next = (*insertion).next;

      (*insertion).next = record;
      if !next.is_null() {
        (*next).previous = record;
      }

      record.write(BlockMeta::new(data.as_ptr(), size, insertion, next));
    }

    self.live_blocks += 1;
    self.live_bytes += size;

    trace!(size, address = data_address, "allocated");

    Ok(data)
  }

  pub fn try_free(
    &mut self,
    address: *mut u8,
  ) -> Result<(), AllocError> {
    if address.is_null() {
      return Ok(());
    }

    let Some(record) = self.find_record(address) else {
      warn!(address = address as usize, "free of a pointer not owned by the arena");
      return Err(AllocError::InvalidPointer {
        address: address as usize,
      });
    };

    let length = unsafe { self.unlink(record) };
    trace!(address = address as usize, length, "freed");

    Ok(())
  }

  pub fn try_zero_allocate(
    &mut self,
    count: usize,
    element_size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    if count == 0 || element_size == 0 {
      return Err(AllocError::ZeroSize);
    }

    let Some(size) = count
      .checked_mul(element_size)
      .filter(|size| *size <= MAX_REQUEST)
    else {
      warn!(count, element_size, "zeroed allocation overflows");
      return Err(AllocError::Overflow {
        count,
        element_size,
      });
    };

    let data = self.try_allocate(size)?;
    unsafe { ptr::write_bytes(data.as_ptr(), 0, size) };

    Ok(data)
  }

  /// `Ok(None)` means the block was released because `new_size` was zero.
  ///
  /// A pointer the arena does not own is treated as a fresh allocation of
  /// `new_size` bytes, or rejected when `new_size` is zero.
  pub fn try_resize(
    &mut self,
    address: *mut u8,
    new_size: usize,
  ) -> Result<Option<NonNull<u8>>, AllocError> {
    if address.is_null() {
      return self.try_allocate(new_size).map(Some);
    }

    let Some(record) = self.find_record(address) else {
      if new_size == 0 {
        return Err(AllocError::InvalidPointer {
          address: address as usize,
        });
      }
      warn!(
        address = address as usize,
        new_size, "resize of a pointer not owned by the arena, allocating fresh"
      );
      return self.try_allocate(new_size).map(Some);
    };

    if new_size == 0 {
      unsafe { self.unlink(record) };
      return Ok(None);
    }

    let (old_data, old_length) = {
      let meta = unsafe { record.as_ref() };
      (meta.data_address, meta.data_length)
    };

    let data = self.try_allocate(new_size)?;

    // Blocks never overlap, so the old payload is intact and disjoint.
    unsafe {
      ptr::copy_nonoverlapping(old_data, data.as_ptr(), cmp::min(old_length, new_size));
      self.unlink(record);
    }

    trace!(
      from = old_data as usize,
      to = data.as_ptr() as usize,
      old_length,
      new_size,
      "resized"
    );

    Ok(Some(data))
  }

  /// Walks the whole chain and reports the first structural inconsistency.
  pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
    let high_water = self.region.high_water();
    let mut previous = self.head.as_ptr();

    for record in self.records() {
      let record = record.as_ptr();
      let address = record as usize;
      let meta = unsafe { &*record };

      if meta.previous != previous || unsafe { (*previous).next } != record {
        return Err(InvariantViolation::BrokenBackLink { record: address });
      }
      if !meta.next.is_null() && unsafe { (*meta.next).previous } != record {
        return Err(InvariantViolation::BrokenForwardLink { record: address });
      }
      if address < unsafe { (*previous).data_end() } {
        return Err(InvariantViolation::Overlap { record: address });
      }

      let data = meta.data_address as usize;
      if address % ALIGNMENT != 0 || data % ALIGNMENT != 0 || data < address + META_SIZE {
        return Err(InvariantViolation::Misplaced {
          record: address,
          data,
        });
      }
      if meta.data_end() > high_water {
        return Err(InvariantViolation::OutOfBounds {
          record: address,
          high_water,
        });
      }

      previous = record;
    }

    Ok(())
  }

  /// First record followed by a gap of at least `needed` bytes, or the last
  /// record.
  fn find_insertion_point(
    &self,
    needed: usize,
  ) -> *mut BlockMeta {
    let mut current = self.head.as_ptr();

    unsafe {
      while !(*current).next.is_null() && (*current).gap_before((*current).next) < needed {
        current = (*current).next;
      }
    }

    current
  }

  fn find_record(
    &self,
    address: *const u8,
  ) -> Option<NonNull<BlockMeta>> {
    if address.is_null() {
      return None;
    }

    self
      .records()
      .find(|record| unsafe { (*record.as_ptr()).data_address }.cast_const() == address)
  }

  /// Removes a live record from the chain and returns its payload length.
  ///
  /// # Safety
  ///
  /// `record` must be reachable from the head.
  unsafe fn unlink(
    &mut self,
    record: NonNull<BlockMeta>,
  ) -> usize {
    unsafe {
      let BlockMeta {
        previous,
        next,
        data_length,
        ..
      } = *record.as_ptr();

      if !next.is_null() {
        (*next).previous = previous;
      }
      (*previous).next = next;

      self.live_blocks -= 1;
      self.live_bytes -= data_length;

      data_length
    }
  }

  fn records(&self) -> Records<'_> {
    Records {
      next: unsafe { (*self.head.as_ptr()).next },
      marker: PhantomData,
    }
  }
}

impl<G: HeapGrower> Drop for Arena<G> {
  fn drop(&mut self) {
    drop(unsafe { Box::from_raw(self.head.as_ptr()) });
  }
}

impl<G: HeapGrower> std::fmt::Debug for Arena<G> {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    f.debug_struct("Arena").field("stats", &self.stats()).finish()
  }
}

/// Records after the head, in address order.
struct Records<'a> {
  next: *mut BlockMeta,
  marker: PhantomData<&'a BlockMeta>,
}

impl Iterator for Records<'_> {
  type Item = NonNull<BlockMeta>;

  fn next(&mut self) -> Option<Self::Item> {
    let current = NonNull::new(self.next)?;
    self.next = unsafe { current.as_ref() }.next;
    Some(current)
  }
}
