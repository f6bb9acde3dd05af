//! Property tests for the arena's observable contract.
//!
//! Every arena here sits on a private `FixedRegion`, so cases are independent
//! of each other and of the process data segment.

use std::collections::HashMap;
use std::slice;

use brkalloc::{Arena, ArenaConfig, FixedRegion};
use proptest::prelude::*;

const CAPACITY: usize = 1 << 20;

fn arena(min_growth: usize) -> Arena<FixedRegion> {
  let config = ArenaConfig::default().with_min_growth(min_growth);
  Arena::with_config(FixedRegion::new(CAPACITY).unwrap(), config).unwrap()
}

fn payload<'a>(
  address: *const u8,
  length: usize,
) -> &'a [u8] {
  unsafe { slice::from_raw_parts(address, length) }
}

fn assert_disjoint(ranges: &mut [(usize, usize)]) {
  ranges.sort_unstable();
  for pair in ranges.windows(2) {
    assert!(
      pair[0].0 + pair[0].1 <= pair[1].0,
      "payload {:#x}+{} overlaps {:#x}",
      pair[0].0,
      pair[0].1,
      pair[1].0
    );
  }
}

#[derive(Debug, Clone)]
enum Op {
  Allocate(usize),
  ZeroAllocate(usize, usize),
  Free(usize),
  Resize(usize, usize),
}

fn op() -> impl Strategy<Value = Op> {
  prop_oneof![
    3 => (1usize..600).prop_map(Op::Allocate),
    1 => (1usize..24, 1usize..24).prop_map(|(count, size)| Op::ZeroAllocate(count, size)),
    2 => any::<usize>().prop_map(Op::Free),
    2 => (any::<usize>(), 0usize..900).prop_map(|(pick, size)| Op::Resize(pick, size)),
  ]
}

// ---------------------------------------------------------------------------
// Allocation distinctness
// ---------------------------------------------------------------------------

proptest! {
  #![proptest_config(ProptestConfig::with_cases(64))]

  #[test]
  fn allocations_are_distinct_and_disjoint(
    sizes in proptest::collection::vec(1usize..2048, 1..48),
    min_growth in prop_oneof![Just(64usize), Just(1000), Just(10_000)],
  ) {
    let mut arena = arena(min_growth);

    let mut ranges = Vec::new();
    for &size in &sizes {
      let data = arena.allocate(size);
      prop_assert!(!data.is_null());
      prop_assert_eq!(0, data as usize % 16);
      ranges.push((data as usize, size));
    }

    for &(address, size) in &ranges {
      prop_assert_eq!(size, arena.usable_size(address as *const u8));
    }

    assert_disjoint(&mut ranges);
    prop_assert!(arena.check_invariants().is_ok());
  }

  // -------------------------------------------------------------------------
  // Zero-fill
  // -------------------------------------------------------------------------

  #[test]
  fn zero_allocate_returns_zeroed_memory(
    count in 1usize..64,
    element_size in 1usize..64,
  ) {
    let mut arena = arena(1000);
    let size = count * element_size;

    // Leave a dirty gap exactly where the zeroed block will land.
    let keep = arena.allocate(8);
    let dirty = arena.allocate(size);
    unsafe { dirty.write_bytes(0xFF, size) };
    arena.free(dirty);

    let zeroed = arena.zero_allocate(count, element_size);

    prop_assert!(!zeroed.is_null());
    prop_assert_eq!(dirty, zeroed);
    prop_assert!(payload(zeroed, size).iter().all(|&byte| byte == 0));
    prop_assert_eq!(8, arena.usable_size(keep));
  }

  // -------------------------------------------------------------------------
  // Resize prefix preservation
  // -------------------------------------------------------------------------

  #[test]
  fn resize_preserves_common_prefix(
    old_size in 1usize..1024,
    new_size in 1usize..2048,
    seed in any::<u8>(),
  ) {
    let mut arena = arena(1000);

    let data = arena.allocate(old_size);
    for i in 0..old_size {
      unsafe { data.add(i).write(seed.wrapping_add(i as u8)) };
    }

    let moved = arena.resize(data, new_size);

    prop_assert!(!moved.is_null());
    prop_assert_eq!(new_size, arena.usable_size(moved));
    prop_assert_eq!(0, arena.usable_size(data));

    let kept = old_size.min(new_size);
    let expected: Vec<u8> = (0..kept).map(|i| seed.wrapping_add(i as u8)).collect();
    prop_assert_eq!(&expected[..], payload(moved, kept));
  }

  // -------------------------------------------------------------------------
  // Free-then-unknown
  // -------------------------------------------------------------------------

  #[test]
  fn freed_pointer_becomes_unknown(
    sizes in proptest::collection::vec(1usize..512, 2..24),
    victim in any::<prop::sample::Index>(),
    more in proptest::collection::vec(1usize..512, 1..24),
  ) {
    let mut arena = arena(1000);

    let mut live: Vec<(usize, usize)> = sizes
      .iter()
      .map(|&size| (arena.allocate(size) as usize, size))
      .collect();

    let (freed, _) = live.remove(victim.index(live.len()));
    arena.free(freed as *mut u8);

    prop_assert_eq!(0, arena.usable_size(freed as *const u8));
    prop_assert!(arena.try_free(freed as *mut u8).is_err());
    arena.free(freed as *mut u8);
    prop_assert!(arena.check_invariants().is_ok());

    for &size in &more {
      let data = arena.allocate(size);
      prop_assert!(!data.is_null());
      live.push((data as usize, size));
    }

    for &(address, size) in &live {
      prop_assert_eq!(size, arena.usable_size(address as *const u8));
    }
    prop_assert_eq!(live.len(), arena.stats().live_blocks);
    assert_disjoint(&mut live);
  }

  // -------------------------------------------------------------------------
  // Overflow rejection
  // -------------------------------------------------------------------------

  #[test]
  fn overflowing_zero_allocate_is_rejected(
    count in (usize::MAX / 2 + 1)..=usize::MAX,
    element_size in 2usize..=64,
    warm in any::<bool>(),
  ) {
    let mut arena = arena(1000);
    if warm {
      arena.allocate(32);
    }
    let before = arena.stats();

    prop_assert!(arena.zero_allocate(count, element_size).is_null());
    prop_assert!(arena.zero_allocate(element_size, count).is_null());
    prop_assert_eq!(before, arena.stats());
  }

  // -------------------------------------------------------------------------
  // Random traces keep the block list consistent
  // -------------------------------------------------------------------------

  #[test]
  fn random_traces_keep_blocks_intact(
    ops in proptest::collection::vec(op(), 1..120),
  ) {
    let mut arena = arena(512);
    // address -> (length, fill byte)
    let mut live: HashMap<usize, (usize, u8)> = HashMap::new();
    let mut tag = 0u8;

    for op in ops {
      tag = tag.wrapping_add(1);

      match op {
        Op::Allocate(size) => {
          let data = arena.allocate(size);
          prop_assert!(!data.is_null());
          unsafe { data.write_bytes(tag, size) };
          prop_assert!(live.insert(data as usize, (size, tag)).is_none());
        }
        Op::ZeroAllocate(count, element_size) => {
          let size = count * element_size;
          let data = arena.zero_allocate(count, element_size);
          prop_assert!(!data.is_null());
          prop_assert!(payload(data, size).iter().all(|&byte| byte == 0));
          unsafe { data.write_bytes(tag, size) };
          prop_assert!(live.insert(data as usize, (size, tag)).is_none());
        }
        Op::Free(pick) if !live.is_empty() => {
          let mut addresses: Vec<_> = live.keys().copied().collect();
          addresses.sort_unstable();
          let address = addresses[pick % addresses.len()];
          arena.free(address as *mut u8);
          live.remove(&address);
        }
        Op::Resize(pick, new_size) if !live.is_empty() => {
          let mut addresses: Vec<_> = live.keys().copied().collect();
          addresses.sort_unstable();
          let address = addresses[pick % addresses.len()];
          let (old_size, old_tag) = live.remove(&address).unwrap();

          let moved = arena.resize(address as *mut u8, new_size);
          if new_size == 0 {
            prop_assert!(moved.is_null());
          } else {
            prop_assert!(!moved.is_null());
            let kept = old_size.min(new_size);
            prop_assert!(payload(moved, kept).iter().all(|&byte| byte == old_tag));
            unsafe { moved.write_bytes(tag, new_size) };
            live.insert(moved as usize, (new_size, tag));
          }
        }
        Op::Free(_) | Op::Resize(..) => {}
      }

      prop_assert!(arena.check_invariants().is_ok());
      prop_assert_eq!(live.len(), arena.stats().live_blocks);
      for (&address, &(size, fill)) in &live {
        prop_assert_eq!(size, arena.usable_size(address as *const u8));
        prop_assert!(payload(address as *const u8, size).iter().all(|&byte| byte == fill));
      }
    }
  }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn middle_free_then_small_allocation() {
  let mut arena = arena(1000);

  let first = arena.allocate(100);
  let middle = arena.allocate(1000);
  let last = arena.allocate(1);

  arena.free(middle);
  let fresh = arena.allocate(50);

  assert!(!fresh.is_null());
  assert_disjoint(&mut [
    (first as usize, 100),
    (last as usize, 1),
    (fresh as usize, 50),
  ]);
  assert_eq!(100, arena.usable_size(first));
  assert_eq!(1, arena.usable_size(last));
}

#[test]
fn zero_size_allocation_is_null_and_inert() {
  let mut arena = arena(1000);
  arena.allocate(16);
  let before = arena.stats();
  let blocks: Vec<_> = arena.blocks().collect();

  assert!(arena.allocate(0).is_null());

  assert_eq!(before, arena.stats());
  assert_eq!(blocks, arena.blocks().collect::<Vec<_>>());
}

#[test]
fn resize_null_matches_allocate() {
  let mut resized = arena(1000);
  let mut allocated = arena(1000);

  let from_resize = resized.resize(std::ptr::null_mut(), 64);
  let from_allocate = allocated.allocate(64);

  assert!(!from_resize.is_null());
  assert!(!from_allocate.is_null());
  assert_eq!(
    from_allocate as usize - allocated.stats().region_base,
    from_resize as usize - resized.stats().region_base
  );
  assert_eq!(64, resized.usable_size(from_resize));
  assert_eq!(resized.stats().live_blocks, allocated.stats().live_blocks);
}
