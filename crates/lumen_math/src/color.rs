//! Color helpers.
//!
//! Colors are linear RGB triplets stored in a `Vec3`. Along a light path the
//! same type carries importance weights, so division has to stay well defined
//! when a channel has been attenuated to zero.

use crate::Vec3;

/// Color type alias (linear RGB).
pub type Color = Vec3;

/// Channel-wise division that never produces NaN or infinity.
///
/// A channel whose divisor is exactly zero yields zero. A quotient that
/// overflows is also flushed to zero.
#[inline]
pub fn safe_divide(numerator: Color, divisor: Color) -> Color {
    Color::new(
        divide_channel(numerator.x, divisor.x),
        divide_channel(numerator.y, divisor.y),
        divide_channel(numerator.z, divisor.z),
    )
}

#[inline]
fn divide_channel(a: f32, b: f32) -> f32 {
    if b == 0.0 {
        return 0.0;
    }
    let q = a / b;
    if q.is_finite() {
        q
    } else {
        0.0
    }
}

/// True when every channel is below `epsilon`.
#[inline]
pub fn is_negligible(color: Color, epsilon: f32) -> bool {
    color.x < epsilon && color.y < epsilon && color.z < epsilon
}
