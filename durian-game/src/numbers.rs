//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Floor a non-negative f64 into a u32, saturating at the u32 range and returning 0 for NaN.
#[must_use]
pub fn floor_f64_to_u32(value: f64) -> u32 {
    if value.is_nan() {
        return 0;
    }
    let max = cast::<u32, f64>(u32::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(0.0, max).floor();
    cast::<f64, u32>(clamped).unwrap_or(0)
}

/// Percentage of a capacity, floored to whole points.
#[must_use]
pub fn percent_of(capacity: u32, percent: f64) -> u32 {
    floor_f64_to_u32(f64::from(capacity) * percent / 100.0)
}

/// Convert i64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn i64_to_f64(value: i64) -> f64 {
    cast::<i64, f64>(value).unwrap_or(0.0)
}

/// Convert a u64 duration in milliseconds into i64 for timestamp math.
#[must_use]
pub fn u64_to_i64(value: u64) -> i64 {
    cast::<u64, i64>(value).unwrap_or(i64::MAX)
}
