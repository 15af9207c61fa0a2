//! User-defined atomic functions.
//!
//! An atomic function is an opaque operator with `n` arguments and `m`
//! results whose Taylor coefficients and adjoints come from user callbacks.
//! Recording a call appends a single variable-length `Call` operator; the
//! sweeps gather the argument coefficients, invoke the callbacks and scatter
//! the results.
//!
//! Coefficient blocks use the layout `v[i * (order_up + 1) + k]` for the
//! order-`k` coefficient of component `i`.

use std::sync::Arc;

use crate::error::{fatal, AdError};
use crate::float::Float;
use crate::index::{to_u32, VarAddr};
use crate::opcode::{OpCode, CALL_PAR, CALL_VAR};
use crate::recorder::registry::with_active;
use crate::recorder::TapeLocal;
use crate::tracked::{Operand, Tracked};

/// Whether an argument or result of an atomic call depends on the independents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgType {
    Constant,
    Variable,
}

pub trait Atomic<F: Float>: Send + Sync {
    fn name(&self) -> &str;

    /// Decide which results are variables given the argument kinds.
    ///
    /// The default marks every result as a variable as soon as any argument is.
    fn for_type(
        &self,
        _call_id: usize,
        arg_types: &[ArgType],
        result_types: &mut [ArgType],
    ) -> Result<(), String> {
        let any_var = arg_types.contains(&ArgType::Variable);
        let kind = if any_var {
            ArgType::Variable
        } else {
            ArgType::Constant
        };
        result_types.fill(kind);
        Ok(())
    }

    /// Compute `taylor_y` orders `order_low..=order_up` from `taylor_x`.
    /// Orders below `order_low` of `taylor_y` are already filled in.
    fn forward(
        &self,
        call_id: usize,
        order_low: usize,
        order_up: usize,
        taylor_x: &[F],
        taylor_y: &mut [F],
    ) -> Result<(), String>;

    /// Accumulate `partial_x` from `partial_y` for orders `0..=order_up`.
    /// `partial_x` arrives zeroed.
    fn reverse(
        &self,
        call_id: usize,
        order_up: usize,
        taylor_x: &[F],
        taylor_y: &[F],
        partial_x: &mut [F],
        partial_y: &[F],
    ) -> Result<(), String>;
}

/// Handle used to call an [`Atomic`] implementation on tracked values.
pub struct AtomicFunction<F: Float> {
    inner: Arc<dyn Atomic<F>>,
}

impl<F: Float> Clone for AtomicFunction<F> {
    fn clone(&self) -> Self {
        AtomicFunction {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: Float> AtomicFunction<F> {
    pub fn new(atom: impl Atomic<F> + 'static) -> Self {
        AtomicFunction {
            inner: Arc::new(atom),
        }
    }

    pub fn from_arc(inner: Arc<dyn Atomic<F>>) -> Self {
        AtomicFunction { inner }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }
}

impl<F: TapeLocal> AtomicFunction<F> {
    /// Evaluate the function at `x` and, when recording, append the call.
    pub fn call(&self, call_id: usize, x: &[Tracked<F>], m: usize) -> Result<Vec<Tracked<F>>, AdError> {
        let taylor_x: Vec<F> = x.iter().map(Tracked::value).collect();
        let mut taylor_y = vec![F::zero(); m];
        self.inner
            .forward(call_id, 0, 0, &taylor_x, &mut taylor_y)
            .map_err(|message| self.failed("forward", message))?;

        with_active::<F, _>(|rec| {
            let Some(rec) = rec else {
                x.iter().for_each(Tracked::reject_foreign);
                return Ok(taylor_y.iter().map(|&v| Tracked::constant(v)).collect());
            };
            let operands: Vec<Operand<F>> = x.iter().map(|t| t.operand(rec)).collect();
            let arg_types: Vec<ArgType> = operands
                .iter()
                .map(|o| match o {
                    Operand::Var(_) => ArgType::Variable,
                    Operand::Par(_) => ArgType::Constant,
                })
                .collect();
            if !arg_types.contains(&ArgType::Variable) {
                return Ok(taylor_y.iter().map(|&v| Tracked::constant(v)).collect());
            }
            let mut result_types = vec![ArgType::Constant; m];
            self.inner
                .for_type(call_id, &arg_types, &mut result_types)
                .map_err(|message| self.failed("for_type", message))?;

            let slot = rec.put_atomic(&self.inner);
            let mut args = vec![slot, to_u32(call_id)?, to_u32(x.len())?, to_u32(m)?];
            for op in operands {
                let (is_var, raw) = op.encode(rec);
                args.push(if is_var { CALL_VAR } else { CALL_PAR });
                args.push(raw);
            }
            let mut next = rec.num_var;
            let mut addrs = Vec::with_capacity(m);
            for (ty, &y) in result_types.iter().zip(&taylor_y) {
                match ty {
                    ArgType::Variable => {
                        args.extend([CALL_VAR, next]);
                        addrs.push(Some(VarAddr(next)));
                        next += 1;
                    }
                    ArgType::Constant => {
                        let c = rec.put_constant(y);
                        args.extend([CALL_PAR, c.raw()]);
                        addrs.push(None);
                    }
                }
            }
            rec.put_op(OpCode::Call, &args)?;
            let id = rec.id();
            Ok(addrs
                .into_iter()
                .zip(taylor_y)
                .map(|(addr, v)| match addr {
                    Some(a) => Tracked::variable(v, id, a),
                    None => Tracked::constant(v),
                })
                .collect())
        })
    }

    fn failed(&self, stage: &'static str, message: String) -> AdError {
        AdError::AtomicFailed {
            name: self.inner.name().to_owned(),
            stage,
            message,
        }
    }
}

impl<F: TapeLocal> AtomicFunction<F> {
    /// One-result call for use inside operator-style code; errors are fatal.
    pub fn call_scalar(&self, call_id: usize, x: &[Tracked<F>]) -> Tracked<F> {
        match self.call(call_id, x, 1) {
            Ok(y) => y[0],
            Err(e) => fatal(e),
        }
    }
}
