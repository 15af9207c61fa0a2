//! Discrete (piecewise-constant) functions.
//!
//! A [`Discrete<F>`] wraps a plain `fn(F) -> F`. When applied to a variable it
//! records a `Dis` operator: replays re-evaluate the function at order 0, and
//! every higher-order coefficient and every adjoint it contributes is zero.

use std::fmt;

use crate::float::Float;
use crate::opcode::OpCode;
use crate::recorder::TapeLocal;
use crate::tracked::{record, Operand, Tracked};

#[derive(Clone, Copy)]
pub struct Discrete<F: Float> {
    name: &'static str,
    f: fn(F) -> F,
}

impl<F: Float> Discrete<F> {
    /// `name` identifies the function within a tape; use distinct names for
    /// distinct functions.
    pub const fn new(name: &'static str, f: fn(F) -> F) -> Self {
        Discrete { name, f }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn eval(&self, x: F) -> F {
        (self.f)(x)
    }
}

impl<F: TapeLocal> Discrete<F> {
    pub fn call(&self, x: Tracked<F>) -> Tracked<F> {
        let d = *self;
        record(d.eval(x.value), &[&x], |rec| match x.operand(rec) {
            Operand::Var(a) => {
                let slot = rec.put_discrete(d);
                Some(rec.put_op(OpCode::Dis, &[slot, a.raw()]))
            }
            Operand::Par(_) => None,
        })
    }
}

impl<F: Float> fmt::Debug for Discrete<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Discrete").field("name", &self.name).finish()
    }
}

// ── Built-ins backing the rounding methods of `num_traits::Float` ──

fn floor_fn<F: Float>(x: F) -> F {
    x.floor()
}

fn ceil_fn<F: Float>(x: F) -> F {
    x.ceil()
}

fn round_fn<F: Float>(x: F) -> F {
    x.round()
}

fn trunc_fn<F: Float>(x: F) -> F {
    x.trunc()
}

pub fn floor<F: Float>() -> Discrete<F> {
    Discrete::new("floor", floor_fn::<F>)
}

pub fn ceil<F: Float>() -> Discrete<F> {
    Discrete::new("ceil", ceil_fn::<F>)
}

pub fn round<F: Float>() -> Discrete<F> {
    Discrete::new("round", round_fn::<F>)
}

pub fn trunc<F: Float>() -> Discrete<F> {
    Discrete::new("trunc", trunc_fn::<F>)
}
