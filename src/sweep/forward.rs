use std::io::Write;

use tracing::{debug, trace};

use crate::buffer::CoeffBuffer;
use crate::error::AdError;
use crate::float::Float;
use crate::kernels::{arith, array, call, cond, exp_log, trig};
use crate::opcode::OpCode;
use crate::player::Player;

use super::SweepState;

/// Compute Taylor orders `low..=high` of every variable.
///
/// The independent rows of `t` must already hold the requested orders, and
/// every row must hold orders `0..low`. A pass that includes order 0 resets
/// `state` first and refills it.
pub(crate) fn forward<F: Float>(
    tape: &Player<F>,
    t: &mut CoeffBuffer<F>,
    state: &mut SweepState,
    low: usize,
    high: usize,
    out: &mut dyn Write,
    trace_ops: bool,
) -> Result<(), AdError> {
    debug!(
        low,
        high,
        num_op = tape.num_op(),
        num_var = tape.num_var(),
        "forward sweep"
    );
    for j in low..=high {
        if j == 0 {
            state.reset(tape);
        }
        for i in 0..tape.num_op() {
            if state.skip[i] {
                continue;
            }
            let op = tape.op(i);
            let z = tape.op_result(i).index();
            step(tape, t, state, out, i, op, tape.op_args(i), z, j)?;
            if trace_ops && !tape.op_result(i).is_phantom() {
                trace!(op = i, name = op.name(), order = j, z, value = ?t.get(z, j));
            }
        }
    }
    if low == 0 && state.compare_change_count > 0 {
        debug!(
            count = state.compare_change_count,
            first_op = state.compare_change_op_index,
            "comparisons changed since recording"
        );
    }
    Ok(())
}

/// Order `j` of one operator.
#[allow(clippy::too_many_arguments)]
fn step<F: Float>(
    tape: &Player<F>,
    t: &mut CoeffBuffer<F>,
    state: &mut SweepState,
    out: &mut dyn Write,
    i: usize,
    op: OpCode,
    args: &[u32],
    z: usize,
    j: usize,
) -> Result<(), AdError> {
    use OpCode::*;

    let a = |k: usize| args[k] as usize;
    let c = |k: usize| tape.constants[args[k] as usize];

    match op {
        // Independent rows are filled by the caller; the phantom stays zero.
        Begin | Inv | End => {}
        Par => arith::par(t, j, c(0), z),

        AddVv => arith::add_vv(t, j, a(0), a(1), z),
        AddPv => arith::add_pv(t, j, c(0), a(1), z),
        SubVv => arith::sub_vv(t, j, a(0), a(1), z),
        SubVp => arith::sub_vp(t, j, a(0), c(1), z),
        SubPv => arith::sub_pv(t, j, c(0), a(1), z),
        MulVv => arith::mul_vv(t, j, a(0), a(1), z),
        MulPv => arith::mul_pv(t, j, c(0), a(1), z),
        DivVv => arith::div_v(t, j, Some(a(0)), F::zero(), a(1), z),
        DivPv => arith::div_v(t, j, None, c(0), a(1), z),
        DivVp => arith::div_vp(t, j, a(0), c(1), z),
        PowVv => arith::pow_vv(t, j, a(0), a(1), [z - 2, z - 1, z]),
        PowPv => arith::pow_pv(t, j, c(0), a(1), [z - 1, z]),
        PowVp => arith::pow_vp(t, j, a(0), c(1), z),

        Neg => arith::neg(t, j, a(0), z),
        Abs => arith::abs(t, j, a(0), z),
        Sign => arith::sign_op(t, j, a(0), z),
        Sqrt => exp_log::sqrt(t, j, a(0), z),

        Exp => exp_log::exp(t, j, a(0), z, false),
        Expm1 => exp_log::exp(t, j, a(0), z, true),
        Log => exp_log::log(t, j, a(0), z, false),
        Log1p => exp_log::log(t, j, a(0), z, true),

        Sin => trig::sin_cos(t, j, a(0), z, z - 1, false),
        Cos => trig::sin_cos(t, j, a(0), z - 1, z, false),
        Sinh => trig::sin_cos(t, j, a(0), z, z - 1, true),
        Cosh => trig::sin_cos(t, j, a(0), z - 1, z, true),
        Tan => trig::tan(t, j, a(0), z - 1, z, false),
        Tanh => trig::tan(t, j, a(0), z - 1, z, true),
        Asin => trig::asin(t, j, a(0), z - 1, z, false),
        Acos => trig::asin(t, j, a(0), z - 1, z, true),
        Atan => trig::atan(t, j, a(0), z - 1, z),

        CSum => {
            let (n_add, n_sub) = (a(1), a(2));
            let adds = &args[3..3 + n_add];
            let subs = &args[3 + n_add..3 + n_add + n_sub];
            arith::csum(t, j, c(0), adds, subs, z);
        }
        CSkip => {
            if j == 0 {
                cond::cskip(t, &tape.constants, args, &mut state.skip)?;
            }
        }
        CExp => cond::cexp(t, &tape.constants, j, args, z)?,
        LtPv | LtVp | LtVv | LePv | LeVp | LeVv | EqPv | EqVv | NePv | NeVv => {
            if j == 0 && !cond::compare_holds(op, t, &tape.constants, args) {
                if state.compare_change_count == 0 {
                    state.compare_change_op_index = i;
                }
                state.compare_change_count += 1;
            }
        }

        Dis => call::discrete(tape, t, j, args, z),
        Call => call::atomic(tape, t, j, args)?,
        LdP | LdV => array::load(tape, t, &mut state.vec_ad, j, op, args, z)?,
        StPP | StPV | StVP | StVV => {
            if j == 0 {
                array::store(tape, t, &mut state.vec_ad, op, args)?;
            }
        }
        Pri => {
            if j == 0 {
                call::print(tape, t, args, out);
            }
        }
    }
    Ok(())
}
