//! The user-facing tracked value.
//!
//! [`Tracked<F>`] carries a plain value plus a weak reference to the tape it was
//! recorded on. Arithmetic on tracked values computes the value eagerly and,
//! while the owning recording is active on this thread, appends the operator
//! to it. Operations whose operands are all parameters are folded and never
//! reach the tape.

use std::fmt::{self, Display};

use crate::error::{fatal, AdError};
use crate::float::Float;
use crate::index::{to_u32, TapeId, VarAddr};
use crate::opcode::{
    CompareOp, OpCode, CEXP_FALSE_VAR, CEXP_LEFT_VAR, CEXP_RIGHT_VAR, CEXP_TRUE_VAR, PRI_POS_VAR,
    PRI_VALUE_VAR,
};
use crate::recorder::registry::with_active;
use crate::recorder::{Recorder, TapeLocal, TapeRegistry};

/// A value whose arithmetic is recorded onto the active tape.
///
/// `Copy`, 16 bytes for `f64`. An address of 0 marks a parameter.
#[derive(Clone, Copy, Debug)]
pub struct Tracked<F: Float> {
    pub(crate) value: F,
    pub(crate) tape_id: TapeId,
    pub(crate) address: VarAddr,
}

impl<F: Float> Tracked<F> {
    /// A parameter: never on a tape, zero derivative.
    #[inline]
    pub fn constant(value: F) -> Self {
        Tracked {
            value,
            tape_id: TapeId::NONE,
            address: VarAddr::PHANTOM,
        }
    }

    #[inline]
    pub(crate) fn variable(value: F, tape_id: TapeId, address: VarAddr) -> Self {
        Tracked {
            value,
            tape_id,
            address,
        }
    }

    #[inline]
    pub fn value(&self) -> F {
        self.value
    }

    #[inline]
    pub fn tape_id(&self) -> TapeId {
        self.tape_id
    }

    #[inline]
    pub fn address(&self) -> VarAddr {
        self.address
    }
}

impl<F: TapeLocal> Tracked<F> {
    /// True when this value is a variable of the recording active on this thread.
    pub fn is_variable(&self) -> bool {
        !self.address.is_phantom() && TapeRegistry::global().active_tape() == Some(self.tape_id)
    }

    #[inline]
    pub fn is_parameter(&self) -> bool {
        !self.is_variable()
    }

    /// Classify against the active recorder, rejecting variables that belong
    /// to a recording live on another thread.
    #[inline]
    pub(crate) fn operand(&self, rec: &Recorder<F>) -> Operand<F> {
        if self.address.is_phantom() || self.tape_id.is_none() {
            Operand::Par(self.value)
        } else if self.tape_id == rec.id() {
            Operand::Var(self.address)
        } else {
            self.reject_foreign();
            Operand::Par(self.value)
        }
    }

    #[inline]
    pub(crate) fn reject_foreign(&self) {
        if !self.tape_id.is_none() && TapeRegistry::global().is_live_elsewhere(self.tape_id) {
            fatal(AdError::ForeignVariable { tape: self.tape_id });
        }
    }

    /// Sum `adds` and subtract `subs` as a single cumulative-sum operator.
    pub fn sum_of(adds: &[Self], subs: &[Self]) -> Self {
        with_active::<F, _>(|rec| {
            let mut init = F::zero();
            let mut add_vars: Vec<(u32, F)> = Vec::new();
            let mut sub_vars: Vec<(u32, F)> = Vec::new();
            for (list, plus, vars) in [(adds, true, &mut add_vars), (subs, false, &mut sub_vars)] {
                for x in list {
                    match rec.as_deref().map(|r| x.operand(r)) {
                        Some(Operand::Var(a)) => vars.push((a.raw(), x.value)),
                        _ => {
                            x.reject_foreign();
                            init = if plus { init + x.value } else { init - x.value };
                        }
                    }
                }
            }
            // Same accumulation order as the CSum kernel.
            let mut value = init;
            for &(_, v) in &add_vars {
                value = value + v;
            }
            for &(_, v) in &sub_vars {
                value = value - v;
            }
            match rec {
                Some(rec) if !(add_vars.is_empty() && sub_vars.is_empty()) => {
                    let c = rec.put_constant(init);
                    let count = |n: usize| to_u32(n).unwrap_or_else(|e| fatal(e));
                    let mut args = vec![c.raw(), count(add_vars.len()), count(sub_vars.len())];
                    args.extend(add_vars.iter().chain(&sub_vars).map(|&(a, _)| a));
                    let addr = rec.put_op(OpCode::CSum, &args).unwrap_or_else(|e| fatal(e));
                    Tracked::variable(value, rec.id(), addr)
                }
                _ => Tracked::constant(value),
            }
        })
    }
}

/// How an operand appears on the active tape.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Operand<F> {
    Var(VarAddr),
    Par(F),
}

impl<F: Float> Operand<F> {
    /// Encode as a raw argument: the variable address, or a constant index.
    #[inline]
    pub(crate) fn encode(self, rec: &mut Recorder<F>) -> (bool, u32) {
        match self {
            Operand::Var(a) => (true, a.raw()),
            Operand::Par(v) => (false, rec.put_constant(v).raw()),
        }
    }
}

/// Record an operator when a recording is active, otherwise fold to a constant.
///
/// `put` sees the active recorder and returns `None` when every operand turned
/// out to be a parameter.
#[inline]
pub(crate) fn record<F: TapeLocal>(
    value: F,
    operands: &[&Tracked<F>],
    put: impl FnOnce(&mut Recorder<F>) -> Option<Result<VarAddr, AdError>>,
) -> Tracked<F> {
    with_active::<F, _>(|rec| match rec {
        None => {
            for x in operands {
                x.reject_foreign();
            }
            Tracked::constant(value)
        }
        Some(rec) => match put(rec) {
            None => Tracked::constant(value),
            Some(Ok(address)) => Tracked::variable(value, rec.id(), address),
            Some(Err(e)) => fatal(e),
        },
    })
}

/// Record a one-argument operator.
#[inline]
pub(crate) fn unary<F: TapeLocal>(x: Tracked<F>, op: OpCode, value: F) -> Tracked<F> {
    record(value, &[&x], |rec| match x.operand(rec) {
        Operand::Var(a) => Some(rec.put_op(op, &[a.raw()])),
        Operand::Par(_) => None,
    })
}

/// Record a two-argument operator in whichever variable/parameter form applies.
/// A missing form means the operation is commutative and the operands swap.
#[inline]
pub(crate) fn binary<F: TapeLocal>(
    x: Tracked<F>,
    y: Tracked<F>,
    value: F,
    vv: OpCode,
    pv: OpCode,
    vp: Option<OpCode>,
) -> Tracked<F> {
    record(value, &[&x, &y], |rec| {
        match (x.operand(rec), y.operand(rec)) {
            (Operand::Par(_), Operand::Par(_)) => None,
            (Operand::Var(a), Operand::Var(b)) => Some(rec.put_op(vv, &[a.raw(), b.raw()])),
            (Operand::Par(p), Operand::Var(b)) => {
                let c = rec.put_constant(p);
                Some(rec.put_op(pv, &[c.raw(), b.raw()]))
            }
            (Operand::Var(a), Operand::Par(p)) => {
                let c = rec.put_constant(p);
                Some(match vp {
                    Some(op) => rec.put_op(op, &[a.raw(), c.raw()]),
                    None => rec.put_op(pv, &[c.raw(), a.raw()]),
                })
            }
        }
    })
}

/// `if left <cop> right { if_true } else { if_false }`, recorded so that the
/// branch is re-decided every time the tape is evaluated.
pub fn cond_exp<F: TapeLocal>(
    cop: CompareOp,
    left: Tracked<F>,
    right: Tracked<F>,
    if_true: Tracked<F>,
    if_false: Tracked<F>,
) -> Tracked<F> {
    let take_true = cop.eval(left.value, right.value);
    let chosen = if take_true { if_true } else { if_false };
    let mut passthrough = None;
    let result = record(chosen.value, &[&left, &right, &if_true, &if_false], |rec| {
        let ops = [
            left.operand(rec),
            right.operand(rec),
            if_true.operand(rec),
            if_false.operand(rec),
        ];
        match ops {
            // The comparison can never change: the result is the chosen operand.
            [Operand::Par(_), Operand::Par(_), ..] => {
                passthrough = Some(chosen);
                None
            }
            _ => {
                let mut flags = 0;
                let mut args = [cop.encode(), 0, 0, 0, 0, 0];
                let bits = [CEXP_LEFT_VAR, CEXP_RIGHT_VAR, CEXP_TRUE_VAR, CEXP_FALSE_VAR];
                for (i, op) in ops.into_iter().enumerate() {
                    let (is_var, raw) = op.encode(rec);
                    if is_var {
                        flags |= bits[i];
                    }
                    args[2 + i] = raw;
                }
                args[1] = flags;
                Some(rec.put_op(OpCode::CExp, &args))
            }
        }
    });
    passthrough.unwrap_or(result)
}

pub fn cond_exp_lt<F: TapeLocal>(l: Tracked<F>, r: Tracked<F>, t: Tracked<F>, f: Tracked<F>) -> Tracked<F> {
    cond_exp(CompareOp::Lt, l, r, t, f)
}

pub fn cond_exp_le<F: TapeLocal>(l: Tracked<F>, r: Tracked<F>, t: Tracked<F>, f: Tracked<F>) -> Tracked<F> {
    cond_exp(CompareOp::Le, l, r, t, f)
}

pub fn cond_exp_eq<F: TapeLocal>(l: Tracked<F>, r: Tracked<F>, t: Tracked<F>, f: Tracked<F>) -> Tracked<F> {
    cond_exp(CompareOp::Eq, l, r, t, f)
}

pub fn cond_exp_ge<F: TapeLocal>(l: Tracked<F>, r: Tracked<F>, t: Tracked<F>, f: Tracked<F>) -> Tracked<F> {
    cond_exp(CompareOp::Ge, l, r, t, f)
}

pub fn cond_exp_gt<F: TapeLocal>(l: Tracked<F>, r: Tracked<F>, t: Tracked<F>, f: Tracked<F>) -> Tracked<F> {
    cond_exp(CompareOp::Gt, l, r, t, f)
}

/// Print `before`, `value`, `after` during every zero-order forward pass in
/// which `pos <= 0`. Does nothing outside a recording.
pub fn print_for<F: TapeLocal>(pos: Tracked<F>, before: &str, value: Tracked<F>, after: &str) {
    with_active::<F, _>(|rec| {
        let Some(rec) = rec else {
            return;
        };
        let (pos_var, pos_raw) = pos.operand(rec).encode(rec);
        let (val_var, val_raw) = value.operand(rec).encode(rec);
        let mut flags = 0;
        if pos_var {
            flags |= PRI_POS_VAR;
        }
        if val_var {
            flags |= PRI_VALUE_VAR;
        }
        let b = rec.put_text(before);
        let a = rec.put_text(after);
        if let Err(e) = rec.put_op(OpCode::Pri, &[flags, pos_raw, b, val_raw, a]) {
            fatal(e);
        }
    });
}

impl<F: Float> Display for Tracked<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<F: Float> Default for Tracked<F> {
    fn default() -> Self {
        Tracked::constant(F::zero())
    }
}

impl<F: Float> From<F> for Tracked<F> {
    #[inline]
    fn from(val: F) -> Self {
        Tracked::constant(val)
    }
}
