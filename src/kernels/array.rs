//! VecAD load and store kernels.
//!
//! Every element of every VecAD array has a runtime slot that says whether
//! the element currently holds a variable (by address) or a parameter (by
//! constant index). Stores rewrite the slot at order 0; loads resolve the
//! slot at order 0 and remember the variable they read in `load_op2var`, so
//! that higher orders and the reverse sweep follow the same element.

use num_traits::ToPrimitive;

use crate::buffer::CoeffBuffer;
use crate::error::AdError;
use crate::float::Float;
use crate::opcode::OpCode;
use crate::player::Player;

#[derive(Clone, Debug, Default)]
pub(crate) struct VecAdState {
    /// Parallel to the tape's VecAD table; length entries are unused.
    isvar: Vec<bool>,
    index: Vec<u32>,
    /// Variable read by each load, or 0 when it read a parameter.
    load_op2var: Vec<u32>,
}

impl VecAdState {
    /// Restore every array to its recorded initial contents.
    pub(crate) fn reset<F: Float>(&mut self, tape: &Player<F>) {
        self.isvar.clear();
        self.isvar.resize(tape.vec_ad.len(), false);
        self.index.clear();
        self.index.extend_from_slice(&tape.vec_ad);
        self.load_op2var.clear();
        self.load_op2var.resize(tape.num_load(), 0);
    }

    pub(crate) fn loaded(&self, load_id: u32) -> usize {
        self.load_op2var[load_id as usize] as usize
    }
}

/// Element slot addressed by `offset` and the index value, truncated toward zero.
fn slot<F: Float>(tape: &Player<F>, offset: u32, index: F) -> Result<usize, AdError> {
    let len = tape.vec_ad_len(offset);
    match index.to_usize() {
        Some(i) if i < len => Ok(offset as usize + i),
        other => Err(AdError::IndexOutOfRange {
            index: other.unwrap_or(usize::MAX),
            len,
        }),
    }
}

pub(crate) fn load<F: Float>(
    tape: &Player<F>,
    t: &mut CoeffBuffer<F>,
    state: &mut VecAdState,
    j: usize,
    op: OpCode,
    args: &[u32],
    z: usize,
) -> Result<(), AdError> {
    let load_id = args[2] as usize;
    if j > 0 {
        let src = state.load_op2var[load_id] as usize;
        t.set(z, j, if src == 0 { F::zero() } else { t.get(src, j) });
        return Ok(());
    }
    let index = match op {
        OpCode::LdV => t.get(args[1] as usize, 0),
        _ => tape.constants[args[1] as usize],
    };
    let s = slot(tape, args[0], index)?;
    let value = if state.isvar[s] {
        let src = state.index[s];
        state.load_op2var[load_id] = src;
        t.get(src as usize, 0)
    } else {
        state.load_op2var[load_id] = 0;
        tape.constants[state.index[s] as usize]
    };
    t.set(z, 0, value);
    Ok(())
}

pub(crate) fn load_rev<F: Float>(p: &mut CoeffBuffer<F>, state: &VecAdState, d: usize, args: &[u32], z: usize) {
    let src = state.loaded(args[2]);
    if src != 0 {
        for j in 0..=d {
            p.add(src, j, p.get(z, j));
        }
    }
}

/// Order 0 only: stores have no result and nothing to do at higher orders.
pub(crate) fn store<F: Float>(
    tape: &Player<F>,
    t: &CoeffBuffer<F>,
    state: &mut VecAdState,
    op: OpCode,
    args: &[u32],
) -> Result<(), AdError> {
    let (index_var, value_var) = match op {
        OpCode::StPP => (false, false),
        OpCode::StPV => (false, true),
        OpCode::StVP => (true, false),
        _ => (true, true),
    };
    let index = if index_var {
        t.get(args[1] as usize, 0)
    } else {
        tape.constants[args[1] as usize]
    };
    let s = slot(tape, args[0], index)?;
    state.isvar[s] = value_var;
    state.index[s] = args[2];
    Ok(())
}
