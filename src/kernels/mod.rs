//! Per-opcode Taylor kernels.
//!
//! A forward kernel computes order `j` of its results from orders `0..=j` of
//! its arguments and orders `0..j` of its own results; `j == 0` is the plain
//! value. A reverse kernel reads the partials of its results for orders
//! `0..=d` and accumulates (`+=`) into the partials of its arguments, walking
//! the orders from `d` down to 0. Reverse kernels multiply through
//! [`azmul`](crate::float::azmul) so that a zero partial never picks up a
//! non-finite coefficient.
//!
//! The sweeps own operator dispatch; this module only holds the numerics and
//! the small amount of per-sweep state some operators need.

pub(crate) mod arith;
pub(crate) mod array;
pub(crate) mod call;
pub(crate) mod cond;
pub(crate) mod exp_log;
pub(crate) mod trig;

use crate::buffer::CoeffBuffer;
use crate::float::Float;

/// Order-`k` coefficient of an argument slot that holds either a variable
/// address or a constant index.
#[inline]
pub(crate) fn operand<F: Float>(t: &CoeffBuffer<F>, constants: &[F], is_var: bool, raw: u32, k: usize) -> F {
    if is_var {
        t.get(raw as usize, k)
    } else if k == 0 {
        constants[raw as usize]
    } else {
        F::zero()
    }
}
