use thiserror::Error;

/// Failures of the heap-growth primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeapError {
  #[error("address space exhausted while growing the region by {requested} bytes")]
  Exhausted { requested: usize },
  #[error("region is no longer contiguous: expected growth at {expected:#x}, got {actual:#x}")]
  Discontiguous { expected: usize, actual: usize },
}

/// Failures reported by the `try_*` entry points of an arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
  #[error("out of memory: {0}")]
  OutOfMemory(#[from] HeapError),
  #[error("zero-sized allocation")]
  ZeroSize,
  #[error("request of {size} bytes does not fit the address space")]
  SizeOverflow { size: usize },
  #[error("{count} elements of {element_size} bytes overflow the allocation size")]
  Overflow { count: usize, element_size: usize },
  #[error("pointer {address:#x} is not owned by this arena")]
  InvalidPointer { address: usize },
}

/// Rejected [`ArenaConfig`](crate::ArenaConfig) values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
  #[error("minimum growth must be between 1 and {max} bytes, got {value}")]
  InvalidMinGrowth { value: usize, max: usize },
  #[error("{key}: cannot parse {value:?} as a byte count")]
  Parse { key: &'static str, value: String },
}

/// Structural damage found by [`Arena::check_invariants`](crate::Arena::check_invariants).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvariantViolation {
  #[error("record {record:#x}: previous.next does not point back")]
  BrokenBackLink { record: usize },
  #[error("record {record:#x}: next.previous does not point back")]
  BrokenForwardLink { record: usize },
  #[error("record {record:#x} starts before the previous payload ends")]
  Overlap { record: usize },
  #[error("record {record:#x}: payload {data:#x} is misaligned or not after the record")]
  Misplaced { record: usize, data: usize },
  #[error("record {record:#x}: payload ends past the high-water mark {high_water:#x}")]
  OutOfBounds { record: usize, high_water: usize },
}
