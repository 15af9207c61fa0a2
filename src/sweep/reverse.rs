use tracing::{debug, trace};

use crate::buffer::CoeffBuffer;
use crate::error::AdError;
use crate::float::Float;
use crate::kernels::{arith, array, call, cond, exp_log, trig};
use crate::opcode::OpCode;
use crate::player::Player;

use super::SweepState;

/// Propagate the partials in `p` (orders `0..=d`) from the results back to
/// the arguments of every operator, last operator first.
///
/// `t` must hold orders `0..=d`, and `state` must come from the zero-order
/// pass that produced them.
pub(crate) fn reverse<F: Float>(
    tape: &Player<F>,
    t: &CoeffBuffer<F>,
    p: &mut CoeffBuffer<F>,
    state: &SweepState,
    d: usize,
    trace_ops: bool,
) -> Result<(), AdError> {
    debug!(
        order = d,
        num_op = tape.num_op(),
        num_var = tape.num_var(),
        "reverse sweep"
    );
    for i in (0..tape.num_op()).rev() {
        if state.skip[i] {
            continue;
        }
        let op = tape.op(i);
        let z = tape.op_result(i).index();
        if trace_ops && !tape.op_result(i).is_phantom() {
            trace!(op = i, name = op.name(), z, partial = ?p.get(z, 0));
        }
        step(tape, t, p, state, op, tape.op_args(i), z, d)?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn step<F: Float>(
    tape: &Player<F>,
    t: &CoeffBuffer<F>,
    p: &mut CoeffBuffer<F>,
    state: &SweepState,
    op: OpCode,
    args: &[u32],
    z: usize,
    d: usize,
) -> Result<(), AdError> {
    use OpCode::*;

    let a = |k: usize| args[k] as usize;
    let c = |k: usize| tape.constants[args[k] as usize];

    match op {
        // No variable arguments, or no contribution to any derivative.
        Begin | Inv | End | Par | Sign | Dis | Pri | CSkip => {}
        LtPv | LtVp | LtVv | LePv | LeVp | LeVv | EqPv | EqVv | NePv | NeVv => {}
        StPP | StPV | StVP | StVV => {}

        AddVv => {
            arith::pass_rev(p, d, a(0), z, false);
            arith::pass_rev(p, d, a(1), z, false);
        }
        AddPv => arith::pass_rev(p, d, a(1), z, false),
        SubVv => {
            arith::pass_rev(p, d, a(0), z, false);
            arith::pass_rev(p, d, a(1), z, true);
        }
        SubVp => arith::pass_rev(p, d, a(0), z, false),
        SubPv => arith::pass_rev(p, d, a(1), z, true),
        MulVv => arith::mul_vv_rev(t, p, d, a(0), a(1), z),
        MulPv => arith::mul_pv_rev(p, d, c(0), a(1), z),
        DivVv => arith::div_v_rev(t, p, d, Some(a(0)), a(1), z),
        DivPv => arith::div_v_rev(t, p, d, None, a(1), z),
        DivVp => arith::div_vp_rev(p, d, a(0), c(1), z),
        PowVv => arith::pow_vv_rev(t, p, d, a(0), a(1), [z - 2, z - 1, z]),
        PowPv => arith::pow_pv_rev(t, p, d, c(0), a(1), [z - 1, z]),
        PowVp => arith::pow_vp_rev(t, p, d, a(0), c(1), z),

        Neg => arith::pass_rev(p, d, a(0), z, true),
        Abs => arith::abs_rev(t, p, d, a(0), z),
        Sqrt => exp_log::sqrt_rev(t, p, d, a(0), z),

        Exp => exp_log::exp_rev(t, p, d, a(0), z, false),
        Expm1 => exp_log::exp_rev(t, p, d, a(0), z, true),
        Log => exp_log::log_rev(t, p, d, a(0), z, false),
        Log1p => exp_log::log_rev(t, p, d, a(0), z, true),

        Sin => trig::sin_cos_rev(t, p, d, a(0), z, z - 1, false),
        Cos => trig::sin_cos_rev(t, p, d, a(0), z - 1, z, false),
        Sinh => trig::sin_cos_rev(t, p, d, a(0), z, z - 1, true),
        Cosh => trig::sin_cos_rev(t, p, d, a(0), z - 1, z, true),
        Tan => trig::tan_rev(t, p, d, a(0), z - 1, z, false),
        Tanh => trig::tan_rev(t, p, d, a(0), z - 1, z, true),
        Asin => trig::asin_rev(t, p, d, a(0), z - 1, z, false),
        Acos => trig::asin_rev(t, p, d, a(0), z - 1, z, true),
        Atan => trig::atan_rev(t, p, d, a(0), z - 1, z),

        CSum => {
            let (n_add, n_sub) = (a(1), a(2));
            let adds = &args[3..3 + n_add];
            let subs = &args[3 + n_add..3 + n_add + n_sub];
            arith::csum_rev(p, d, adds, subs, z);
        }
        CExp => cond::cexp_rev(t, p, &tape.constants, d, args, z)?,
        Call => call::atomic_rev(tape, t, p, d, args)?,
        LdP | LdV => array::load_rev(p, &state.vec_ad, d, args, z),
    }
    Ok(())
}
