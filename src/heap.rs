//! Heap region manager.
//!
//! Owns the single contiguous region an [`Arena`](crate::Arena) carves blocks
//! out of. The region only ever grows: the OS primitive is "extend my data
//! segment by N bytes", modeled by [`HeapGrower`].
//!
//! ```text
//!   region_base                                     region_high_water
//!   │                                                               │
//!   ▼                                                               ▼
//!   ┌──────────────┬───────────────┬──────────────┬─────────────────┐
//!   │  first grow  │  second grow  │  third grow  │       ...       │
//!   └──────────────┴───────────────┴──────────────┴─────────────────┘
//! ```

use std::{
  alloc,
  ptr::{self, NonNull},
};

use tracing::{debug, warn};

use crate::{align, align::ALIGNMENT, block::META_SIZE, error::HeapError};

/// Source of fresh memory at the end of a growable segment.
///
/// # Safety
///
/// On success `grow(n)` returns the previous end of the segment, and the `n`
/// bytes starting there must be writable, unused by anything else, and stay
/// valid for as long as the grower lives. Two consecutive successful calls are
/// contiguous exactly when the second returns the end of the first.
pub unsafe trait HeapGrower {
  fn grow(
    &mut self,
    increment: usize,
  ) -> Result<NonNull<u8>, HeapError>;
}

/// The process data segment, grown with `sbrk(2)`.
#[cfg(unix)]
#[derive(Debug, Default, Clone, Copy)]
pub struct ProgramBreak;

#[cfg(unix)]
impl ProgramBreak {
  /// Current program break (`sbrk(0)`).
  pub fn current() -> *mut u8 {
    unsafe { libc::sbrk(0) }.cast()
  }
}

#[cfg(unix)]
unsafe impl HeapGrower for ProgramBreak {
  fn grow(
    &mut self,
    increment: usize,
  ) -> Result<NonNull<u8>, HeapError> {
    let exhausted = HeapError::Exhausted { requested: increment };
    let increment = libc::intptr_t::try_from(increment).map_err(|_| exhausted)?;

    let previous = unsafe { libc::sbrk(increment) };

    if previous == usize::MAX as *mut libc::c_void {
      return Err(exhausted);
    }

    NonNull::new(previous.cast()).ok_or(exhausted)
  }
}

/// A fixed-capacity buffer handed out front to back, standing in for a data
/// segment that can run out.
///
/// Every pointer obtained from an arena on top of it dangles once the region is
/// dropped.
#[derive(Debug)]
pub struct FixedRegion {
  start: NonNull<u8>,
  layout: alloc::Layout,
  used: usize,
}

// The buffer is exclusively owned.
unsafe impl Send for FixedRegion {}

impl FixedRegion {
  /// Reserves `capacity` bytes, rounded up to the alignment boundary.
  pub fn new(capacity: usize) -> Result<Self, HeapError> {
    let exhausted = HeapError::Exhausted { requested: capacity };
    let size = capacity.max(ALIGNMENT);
    if size > isize::MAX as usize - ALIGNMENT {
      return Err(exhausted);
    }

    let layout = alloc::Layout::from_size_align(align!(size), ALIGNMENT).map_err(|_| exhausted)?;
    let start = NonNull::new(unsafe { alloc::alloc_zeroed(layout) }).ok_or(exhausted)?;

    Ok(Self {
      start,
      layout,
      used: 0,
    })
  }

  pub fn capacity(&self) -> usize {
    self.layout.size()
  }

  /// Bytes already handed out.
  pub fn used(&self) -> usize {
    self.used
  }
}

unsafe impl HeapGrower for FixedRegion {
  fn grow(
    &mut self,
    increment: usize,
  ) -> Result<NonNull<u8>, HeapError> {
    let end = self
      .used
      .checked_add(increment)
      .filter(|end| *end <= self.capacity())
      .ok_or(HeapError::Exhausted { requested: increment })?;

    let previous = unsafe { self.start.add(self.used) };
    self.used = end;

    Ok(previous)
  }
}

impl Drop for FixedRegion {
  fn drop(&mut self) {
    unsafe { alloc::dealloc(self.start.as_ptr(), self.layout) };
  }
}

/// Base and high-water mark of the region, plus the grower extending it.
#[derive(Debug)]
pub struct HeapRegion<G: HeapGrower> {
  grower: G,
  min_growth: usize,
  base: *mut u8,
  high_water: usize,
  growths: usize,
  /// Set once a growth lands away from the high-water mark.
  broken: Option<HeapError>,
}

impl<G: HeapGrower> HeapRegion<G> {
  pub fn new(
    grower: G,
    min_growth: usize,
  ) -> Self {
    Self {
      grower,
      min_growth,
      base: ptr::null_mut(),
      high_water: 0,
      growths: 0,
      broken: None,
    }
  }

  /// Whether the first growth has fixed the region base.
  pub fn is_established(&self) -> bool {
    self.growths > 0
  }

  pub fn base(&self) -> usize {
    self.base as usize
  }

  /// Pointer to `address`, derived from the region base.
  pub fn pointer_at(
    &self,
    address: usize,
  ) -> *mut u8 {
    self.base.wrapping_add(address.wrapping_sub(self.base()))
  }

  /// End of the memory currently backed by the grower.
  pub fn high_water(&self) -> usize {
    self.high_water
  }

  pub fn len(&self) -> usize {
    self.high_water - self.base()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Number of successful growths.
  pub fn growth_count(&self) -> usize {
    self.growths
  }

  pub fn grower(&self) -> &G {
    &self.grower
  }

  /// Grows the region by at least `minimum_additional` bytes.
  ///
  /// The first call fixes the base and reserves two extra records' worth of
  /// slack for the head and the first block. The high-water mark only moves
  /// on success. After a discontiguous growth the region stays frozen and
  /// every later call fails without touching the grower.
  pub fn ensure_capacity(
    &mut self,
    minimum_additional: usize,
  ) -> Result<(), HeapError> {
    if let Some(error) = self.broken {
      return Err(error);
    }

    let mut increment = self.min_growth.max(minimum_additional);
    if !self.is_established() {
      increment = increment
        .checked_add(2 * META_SIZE)
        .ok_or(HeapError::Exhausted { requested: increment })?;
    }

    let previous = match self.grower.grow(increment) {
      Ok(previous) => previous.as_ptr(),
      Err(error) => {
        warn!(increment, high_water = self.high_water, %error, "heap growth failed");
        return Err(error);
      }
    };

    if self.is_established() && previous as usize != self.high_water {
      let error = HeapError::Discontiguous {
        expected: self.high_water,
        actual: previous as usize,
      };
      warn!(increment, %error, "heap growth failed, region frozen");
      self.broken = Some(error);
      return Err(error);
    }

    let end = (previous as usize)
      .checked_add(increment)
      .ok_or(HeapError::Exhausted { requested: increment })?;

    if !self.is_established() {
      self.base = previous;
    }
    self.high_water = end;
    self.growths += 1;

    debug!(
      increment,
      base = self.base(),
      high_water = self.high_water,
      "heap region grown"
    );

    Ok(())
  }
}
