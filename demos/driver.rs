use std::io::Read;

use brkalloc::{Arena, ArenaConfig, ProgramBreak};
use tracing_subscriber::EnvFilter;

const ALLOCATIONS: usize = 200;

/// Waits for ENTER when `BRKALLOC_STEP` is set, so the program break can be
/// inspected with `pmap`, `gdb` and friends between steps.
fn block_until_enter_pressed() {
  if std::env::var_os("BRKALLOC_STEP").is_none() {
    return;
  }
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    ProgramBreak::current(),
  );
}

fn print_stats(arena: &Arena<ProgramBreak>) {
  let stats = arena.stats();
  println!(
    "    live blocks = {}, live bytes = {}, region = {:#x}..{:#x}, growths = {}",
    stats.live_blocks, stats.live_bytes, stats.region_base, stats.high_water, stats.growth_count,
  );
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let config = match ArenaConfig::from_env() {
    Ok(config) => config,
    Err(error) => {
      eprintln!("invalid configuration: {error}");
      std::process::exit(2);
    }
  };

  let mut arena = match Arena::with_config(ProgramBreak, config) {
    Ok(arena) => arena,
    Err(error) => {
      eprintln!("invalid configuration: {error}");
      std::process::exit(2);
    }
  };

  print_program_break("start");
  block_until_enter_pressed();

  // 1) The original driver loop: many small blocks, growth amortized by the
  //    minimum growth size.
  let mut blocks = Vec::with_capacity(ALLOCATIONS);
  for _ in 0..ALLOCATIONS {
    let data = arena.allocate(100);
    if data.is_null() {
      eprintln!("allocation failed after {} blocks", blocks.len());
      std::process::exit(1);
    }
    blocks.push(data);
  }
  println!("\n[1] Allocated {ALLOCATIONS} x 100 bytes");
  print_stats(&arena);
  print_program_break("after loop");
  block_until_enter_pressed();

  // 2) Free every other block and refill the gaps with smaller requests.
  for data in blocks.iter().step_by(2) {
    arena.free(*data);
  }
  println!("\n[2] Freed every other block");
  print_stats(&arena);

  let refill = arena.allocate(40);
  println!(
    "[2] 40-byte request landed at {:?} (first freed block was {:?})",
    refill, blocks[0]
  );
  block_until_enter_pressed();

  // 3) Zeroed allocation and resize.
  let zeroed = arena.zero_allocate(16, 8);
  if zeroed.is_null() {
    eprintln!("zeroed allocation failed");
    std::process::exit(1);
  }
  let all_zero = (0..128).all(|i| unsafe { *zeroed.add(i) } == 0);
  println!("\n[3] zero_allocate(16, 8) at {:?}, all zero = {}", zeroed, all_zero);

  unsafe { zeroed.write_bytes(0x5A, 128) };
  let grown = arena.resize(zeroed, 4096);
  if grown.is_null() {
    eprintln!("resize failed");
    std::process::exit(1);
  }
  println!(
    "[3] resized to {} bytes at {:?}, first byte = {:#x}",
    arena.usable_size(grown),
    grown,
    unsafe { *grown }
  );
  print_program_break("after resize");
  print_stats(&arena);

  match arena.check_invariants() {
    Ok(()) => println!("\n[4] Block list is consistent."),
    Err(violation) => println!("\n[4] Block list is damaged: {violation}"),
  }

  println!("[4] End of example. Process will exit and the OS will reclaim all memory.");
}
