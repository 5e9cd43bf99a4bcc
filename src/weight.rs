//! Load-cell reading post-processing.

/// Readings in (-NOISE_FLOOR, 0) are zero-drift noise on an empty deck.
pub const NOISE_FLOOR: f32 = 10.0;

/// Clamp small negative noise to exactly 0.  Anything at or below
/// `-NOISE_FLOOR`, and every non-negative value, passes through.
pub fn suppress_negative_noise(raw: f32) -> f32 {
    if raw < 0.0 && raw > -NOISE_FLOOR { 0.0 } else { raw }
}

/// Whole-unit weight reported in the event payload (truncated toward zero).
pub fn truncate(weight: f32) -> i32 {
    weight as i32
}
