use std::fmt::{Debug, Display};

use num_traits::{Float as NumFloat, FloatConst, FromPrimitive};

/// Marker trait for base floating-point types (`f32`, `f64`).
///
/// Bundles the numeric and utility traits needed throughout numbat.
/// Only primitive float types implement this; [`Tracked`](crate::Tracked) does not.
pub trait Float:
    NumFloat + FloatConst + FromPrimitive + Copy + Send + Sync + Default + Debug + Display + 'static
{
}

impl Float for f32 {}
impl Float for f64 {}

/// Absolute-zero multiplication: `0 * y == 0` even when `y` is infinite or NaN.
///
/// Reverse kernels use this so that a zero adjoint flowing through a
/// degenerate branch (e.g. the untaken side of a conditional expression)
/// stays exactly zero.
#[inline]
pub fn azmul<F: Float>(x: F, y: F) -> F {
    if x == F::zero() {
        F::zero()
    } else {
        x * y
    }
}

/// Convert a small count (order index, multiplicity) into `F`.
#[inline]
pub(crate) fn from_usize<F: Float>(n: usize) -> F {
    F::from_usize(n).unwrap_or_else(F::nan)
}
