//! Downsampling factor computation.

use log::debug;

/// Compute the downsampling divisor for decoding into a target size.
///
/// The divisor is the largest power of two that does not exceed the exact
/// size ratio `min(native_height / target_height, native_width /
/// target_width)` (integer floor division), and never less than 1. Frames
/// decoded at the divisor are therefore never smaller than the requested
/// target, and the power-of-two shape matches the frame decoder's binary
/// subsampling of its reconstruction buffer.
///
/// # Arguments
///
/// * `native_width`, `native_height` - Canvas dimensions from the container
///   header
/// * `target_width`, `target_height` - Requested output dimensions, must be
///   >= 1 (caller contract; debug-asserted, division by zero otherwise)
pub fn sample_size(
    native_width: u32,
    native_height: u32,
    target_width: u32,
    target_height: u32,
) -> u32 {
    debug_assert!(
        target_width >= 1 && target_height >= 1,
        "target dimensions must be >= 1"
    );

    let exact = (native_height / target_height).min(native_width / target_width);
    let power_of_two = if exact == 0 {
        1
    } else {
        // Highest set bit of `exact`.
        1 << (31 - exact.leading_zeros())
    };

    if power_of_two > 1 {
        debug!(
            "downsampling animation, sample_size: {power_of_two}, \
             target dimens: [{target_width}x{target_height}], \
             actual dimens: [{native_width}x{native_height}]"
        );
    }
    power_of_two
}
