//! The [`Scalar`] trait for writing tape-generic numeric code.
//!
//! Functions written as `fn f<T: Scalar>(x: T) -> T` run unchanged on plain
//! `f64` (no recording) and on `Tracked<f64>` (recorded onto the active tape).

use std::fmt::{Debug, Display};

use num_traits::FromPrimitive;

use crate::float::Float;
use crate::recorder::TapeLocal;
use crate::tracked::Tracked;

/// The central trait for tape-generic numeric code.
pub trait Scalar:
    num_traits::Float
    + num_traits::FloatConst
    + FromPrimitive
    + Copy
    + Default
    + Debug
    + Display
    + Send
    + 'static
{
    /// The underlying primitive float type.
    type Float: Float;

    /// Lift a plain float to this scalar as a parameter.
    fn from_f(val: Self::Float) -> Self;

    /// Extract the current value.
    fn value(&self) -> Self::Float;
}

impl Scalar for f32 {
    type Float = f32;

    #[inline]
    fn from_f(val: f32) -> Self {
        val
    }

    #[inline]
    fn value(&self) -> f32 {
        *self
    }
}

impl Scalar for f64 {
    type Float = f64;

    #[inline]
    fn from_f(val: f64) -> Self {
        val
    }

    #[inline]
    fn value(&self) -> f64 {
        *self
    }
}

impl<F: TapeLocal> Scalar for Tracked<F> {
    type Float = F;

    #[inline]
    fn from_f(val: F) -> Self {
        Tracked::constant(val)
    }

    #[inline]
    fn value(&self) -> F {
        self.value
    }
}
