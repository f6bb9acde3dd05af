/// Boundary every block record and every payload is placed on.
pub const ALIGNMENT: usize = 16;

/// Rounds the given size or address up to the next multiple of [`ALIGNMENT`].
/// Values already on a boundary are returned unchanged.
///
/// # Examples
///
/// ```rust
/// use brkalloc::align;
///
/// assert_eq!(align!(13), 16);
/// assert_eq!(align!(32), 32);
/// assert_eq!(align!(33), 48);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    (($value) + $crate::align::ALIGNMENT - 1) & !($crate::align::ALIGNMENT - 1)
  };
}

/// Advances the given address to the next [`ALIGNMENT`] boundary that lies
/// strictly after it. An address already on a boundary still moves forward by
/// a full [`ALIGNMENT`], so the result is always in `(value, value + 16]`.
///
/// # Examples
///
/// ```rust
/// use brkalloc::align_past;
///
/// assert_eq!(align_past!(0x1001), 0x1010);
/// assert_eq!(align_past!(0x1010), 0x1020);
/// ```
#[macro_export]
macro_rules! align_past {
  ($value:expr) => {
    (($value) & !($crate::align::ALIGNMENT - 1)) + $crate::align::ALIGNMENT
  };
}
