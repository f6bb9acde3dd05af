//! Coarse-grained locking around a whole arena.
//!
//! A single insertion or removal rewrites several records, so every entry
//! point takes the same lock for its full duration.

use std::ptr::NonNull;

use parking_lot::{Mutex, MutexGuard};

use crate::{arena::Arena, error::AllocError, heap::HeapGrower};

/// An [`Arena`] shared between threads behind one `parking_lot::Mutex`.
#[derive(Debug)]
pub struct LockedArena<G: HeapGrower> {
  inner: Mutex<Arena<G>>,
}

impl<G: HeapGrower> LockedArena<G> {
  pub fn new(arena: Arena<G>) -> Self {
    Self {
      inner: Mutex::new(arena),
    }
  }

  /// Holds the lock across several operations.
  pub fn lock(&self) -> MutexGuard<'_, Arena<G>> {
    self.inner.lock()
  }

  pub fn into_inner(self) -> Arena<G> {
    self.inner.into_inner()
  }

  pub fn allocate(
    &self,
    size: usize,
  ) -> *mut u8 {
    self.inner.lock().allocate(size)
  }

  pub fn free(
    &self,
    address: *mut u8,
  ) {
    self.inner.lock().free(address);
  }

  pub fn zero_allocate(
    &self,
    count: usize,
    element_size: usize,
  ) -> *mut u8 {
    self.inner.lock().zero_allocate(count, element_size)
  }

  pub fn resize(
    &self,
    address: *mut u8,
    new_size: usize,
  ) -> *mut u8 {
    self.inner.lock().resize(address, new_size)
  }

  pub fn usable_size(
    &self,
    address: *const u8,
  ) -> usize {
    self.inner.lock().usable_size(address)
  }

  pub fn try_allocate(
    &self,
    size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    self.inner.lock().try_allocate(size)
  }

  pub fn try_free(
    &self,
    address: *mut u8,
  ) -> Result<(), AllocError> {
    self.inner.lock().try_free(address)
  }

  pub fn try_zero_allocate(
    &self,
    count: usize,
    element_size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    self.inner.lock().try_zero_allocate(count, element_size)
  }

  pub fn try_resize(
    &self,
    address: *mut u8,
    new_size: usize,
  ) -> Result<Option<NonNull<u8>>, AllocError> {
    self.inner.lock().try_resize(address, new_size)
  }
}
