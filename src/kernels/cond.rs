//! Comparison, conditional-expression and conditional-skip kernels.
//!
//! All three decide on order-0 values only. The decision taken at order 0
//! then holds for every higher order and for the reverse sweep.

use crate::buffer::CoeffBuffer;
use crate::error::AdError;
use crate::float::Float;
use crate::opcode::{CompareOp, OpCode, CEXP_FALSE_VAR, CEXP_LEFT_VAR, CEXP_RIGHT_VAR, CEXP_TRUE_VAR};

use super::operand;

/// Evaluate `left <cop> right` for the `[cop, flags, left, right, ..]` header
/// shared by `CExp` and `CSkip`.
fn decide<F: Float>(t: &CoeffBuffer<F>, constants: &[F], args: &[u32]) -> Result<bool, AdError> {
    let cop = CompareOp::decode(args[0])?;
    let flags = args[1];
    let left = operand(t, constants, flags & CEXP_LEFT_VAR != 0, args[2], 0);
    let right = operand(t, constants, flags & CEXP_RIGHT_VAR != 0, args[3], 0);
    Ok(cop.eval(left, right))
}

/// The chosen branch as `(is_var, raw)`.
fn branch<F: Float>(t: &CoeffBuffer<F>, constants: &[F], args: &[u32]) -> Result<(bool, u32), AdError> {
    Ok(if decide(t, constants, args)? {
        (args[1] & CEXP_TRUE_VAR != 0, args[4])
    } else {
        (args[1] & CEXP_FALSE_VAR != 0, args[5])
    })
}

pub(crate) fn cexp<F: Float>(
    t: &mut CoeffBuffer<F>,
    constants: &[F],
    j: usize,
    args: &[u32],
    z: usize,
) -> Result<(), AdError> {
    let (is_var, raw) = branch(t, constants, args)?;
    let value = operand(t, constants, is_var, raw, j);
    t.set(z, j, value);
    Ok(())
}

pub(crate) fn cexp_rev<F: Float>(
    t: &CoeffBuffer<F>,
    p: &mut CoeffBuffer<F>,
    constants: &[F],
    d: usize,
    args: &[u32],
    z: usize,
) -> Result<(), AdError> {
    let (is_var, raw) = branch(t, constants, args)?;
    if is_var {
        for j in 0..=d {
            p.add(raw as usize, j, p.get(z, j));
        }
    }
    Ok(())
}

/// Does the relation recorded by a compare operator still hold?
pub(crate) fn compare_holds<F: Float>(op: OpCode, t: &CoeffBuffer<F>, constants: &[F], args: &[u32]) -> bool {
    use OpCode::*;
    let var = |i: usize| t.get(args[i] as usize, 0);
    let par = |i: usize| constants[args[i] as usize];
    match op {
        LtPv => par(0) < var(1),
        LtVp => var(0) < par(1),
        LtVv => var(0) < var(1),
        LePv => par(0) <= var(1),
        LeVp => var(0) <= par(1),
        LeVv => var(0) <= var(1),
        EqPv => par(0) == var(1),
        EqVv => var(0) == var(1),
        NePv => par(0) != var(1),
        NeVv => var(0) != var(1),
        _ => true,
    }
}

/// Mark the operators a `CSkip` disables for this evaluation point.
///
/// The first list is skipped when the comparison holds, the second when it
/// does not.
pub(crate) fn cskip<F: Float>(
    t: &CoeffBuffer<F>,
    constants: &[F],
    args: &[u32],
    skip: &mut [bool],
) -> Result<(), AdError> {
    let n_true = args[4] as usize;
    let targets = if decide(t, constants, args)? {
        &args[6..6 + n_true]
    } else {
        &args[6 + n_true..]
    };
    for &op in targets {
        let flag = skip
            .get_mut(op as usize)
            .ok_or_else(|| AdError::internal(format!("CSkip target {op} past end of tape")))?;
        *flag = true;
    }
    Ok(())
}
