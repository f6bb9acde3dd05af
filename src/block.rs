use std::{mem, ptr};

/// In-region metadata record preceding every live payload.
///
/// Records form a doubly-linked chain ordered by ascending address. The chain
/// makes no distinction between free and used memory: a block is live exactly
/// as long as its record is reachable from the head sentinel.
#[repr(C)]
#[derive(Debug)]
pub struct BlockMeta {
  /// First byte of the payload, 16-byte aligned and strictly after the record.
  pub data_address: *mut u8,
  /// Payload length exactly as requested by the caller.
  pub data_length: usize,
  pub previous: *mut BlockMeta,
  pub next: *mut BlockMeta,
}

/// Size of a [`BlockMeta`] record inside the region.
pub const META_SIZE: usize = mem::size_of::<BlockMeta>();

impl BlockMeta {
  pub fn new(
    data_address: *mut u8,
    data_length: usize,
    previous: *mut BlockMeta,
    next: *mut BlockMeta,
  ) -> Self {
    Self {
      data_address,
      data_length,
      previous,
      next,
    }
  }

  /// Unlinked record with an empty payload, used for the head sentinel.
  pub fn sentinel() -> Self {
    Self::new(ptr::null_mut(), 0, ptr::null_mut(), ptr::null_mut())
  }

  /// Address one past the last payload byte.
  pub fn data_end(&self) -> usize {
    self.data_address as usize + self.data_length
  }

  /// Bytes between the end of this payload and the start of `next`'s record.
  /// Zero when the records are packed or out of order.
  pub fn gap_before(
    &self,
    next: *const BlockMeta,
  ) -> usize {
    (next as usize).saturating_sub(self.data_end())
  }
}

/// Public view of a live block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  pub address: *mut u8,
  pub length: usize,
}

impl BlockInfo {
  /// Half-open payload range `[address, address + length)`.
  pub fn range(&self) -> std::ops::Range<usize> {
    let start = self.address as usize;
    start..start + self.length
  }
}
