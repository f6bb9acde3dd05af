//! # brkalloc - A First-Fit Block Allocator on the Program Break
//!
//! This crate provides a small general-purpose allocator that carves
//! individually-freeable blocks out of one contiguous, ever-growing region,
//! typically the process data segment extended with `sbrk(2)`.
//!
//! ## Overview
//!
//! Every live block is described by a metadata record written in-line just
//! before its payload. Records are chained in address order behind a head
//! sentinel, so free space is simply the gap between two neighbours:
//!
//! ```text
//!   Region Layout:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                            REGION                                    │
//!   │                                                                      │
//!   │   ┌────┬─────────┬────────────────┬────┬──────┬────────────────────┐ │
//!   │   │ M1 │   P1    │  gap (freed)   │ M3 │  P3  │      untouched     │ │
//!   │   └────┴─────────┴────────────────┴────┴──────┴────────────────────┘ │
//!   │   ▲                                                              ▲   │
//!   │   │                                                              │   │
//!   │ Region                                                   High-water  │
//!   │  Base                                                       Mark     │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   M = metadata record, P = payload.
//!   A request takes the first gap that fits, otherwise the space after the
//!   last block. The region grows only when the high-water mark is reached.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   brkalloc
//!   ├── align      - Alignment macros (align!, align_past!)
//!   ├── block      - In-region block metadata record
//!   ├── heap       - Region manager and growth sources (sbrk, fixed buffer)
//!   ├── arena      - Arena: placement, linking, the allocation entry points
//!   ├── locked     - LockedArena: one lock around a whole arena
//!   ├── config     - ArenaConfig tunables
//!   └── error      - Error types
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use brkalloc::{Arena, FixedRegion};
//!
//! let mut arena = Arena::new(FixedRegion::new(64 * 1024).unwrap());
//!
//! let data = arena.allocate(100);
//! assert!(!data.is_null());
//! assert_eq!(100, arena.usable_size(data));
//!
//! unsafe { data.write_bytes(0xAB, 100) };
//!
//! let data = arena.resize(data, 200);
//! assert_eq!(0xAB, unsafe { *data.add(99) });
//!
//! arena.free(data);
//! assert_eq!(0, arena.usable_size(data));
//! ```
//!
//! ## Single Block
//!
//! ```text
//!   ┌──────────┬───────────────────────┬──────────┬──────────────────────┐
//!   │ padding  │    Block Record       │ padding  │      Payload         │
//!   │ 1..=16 B │  ┌─────────────────┐  │ 1..=16 B │                      │
//!   │          │  │ data_address    │  │          │  data_length bytes   │
//!   │          │  │ data_length     │  │          │                      │
//!   │          │  │ previous        │  │          │                      │
//!   │          │  │ next            │  │          │                      │
//!   │          │  └─────────────────┘  │          │                      │
//!   └──────────┴───────────────────────┴──────────┴──────────────────────┘
//!   ▲                                             ▲
//!   └── end of the previous payload               └── pointer returned
//! ```
//!
//! Both the record and the payload are pushed to the *next* 16-byte
//! boundary, even when already aligned.
//!
//! ## Limitations
//!
//! - **Single-threaded arenas**: wrap them in [`LockedArena`] to share them
//! - **No coalescing or splitting**: freed gaps are reused only when a later
//!   request happens to fit
//! - **No shrinking**: memory is never returned to the operating system
//! - **Linear lookups**: free, resize and size queries walk the block list
//!
//! ## Safety
//!
//! The entry points never dereference a caller's pointer before matching it
//! against a live record, so they are safe to call. Reading or writing the
//! returned memory is up to the caller and requires `unsafe`.

pub mod align;
mod arena;
mod block;
mod config;
mod error;
mod heap;
mod locked;

pub use arena::{ALIGN_SLACK, Arena, ArenaStats, MAX_REQUEST};
pub use block::{BlockInfo, META_SIZE};
pub use config::{ArenaConfig, DEFAULT_MIN_GROWTH, MIN_GROWTH_ENV};
pub use error::{AllocError, ConfigError, HeapError, InvariantViolation};
#[cfg(unix)]
pub use heap::ProgramBreak;
pub use heap::{FixedRegion, HeapGrower, HeapRegion};
pub use locked::LockedArena;
