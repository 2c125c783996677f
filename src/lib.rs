#![deny(clippy::all, clippy::cargo, clippy::expect_used, clippy::unwrap_used)]
#![deny(clippy::pedantic, clippy::nursery, unsafe_code)]
#![warn(clippy::unimplemented, clippy::redundant_type_annotations)]

pub mod algo;
pub mod core;
pub mod data;
pub mod logging;

#[cfg(not(target_pointer_width = "64"))]
compile_error!("Must be 64-bit system!");

/// Casts the given value to `usize`.
/// It should never fail on 64-bit systems.
///
/// # Panics
/// - If the value cannot be cast to `usize`.
#[must_use]
pub fn cast_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or_else(|_| unreachable!("Must be 64-bit system!"))
}

/// Casts the given value to `u64`.
/// It should never fail on 64-bit systems.
///
/// # Panics
/// - If the value cannot be cast to `usize`.
#[must_use]
pub fn cast_u64(value: usize) -> u64 {
    u64::try_from(value).unwrap_or_else(|_| unreachable!("Must be 64-bit system!"))
}

/// Converts a time value to a model coefficient.
/// Times in generated instances are far below `2^53`, so the conversion is exact.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn coefficient(value: u64) -> f64 {
    value as f64
}
