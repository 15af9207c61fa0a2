//! Operators that hand control to user code or to an output stream:
//! discrete functions, atomic calls and print-forward.

use std::io::Write;

use crate::buffer::CoeffBuffer;
use crate::error::AdError;
use crate::float::Float;
use crate::opcode::{CALL_VAR, PRI_POS_VAR, PRI_VALUE_VAR};
use crate::player::Player;

use super::operand;

pub(crate) fn discrete<F: Float>(tape: &Player<F>, t: &mut CoeffBuffer<F>, j: usize, args: &[u32], z: usize) {
    let value = if j == 0 {
        tape.discretes[args[0] as usize].eval(t.get(args[1] as usize, 0))
    } else {
        F::zero()
    };
    t.set(z, j, value);
}

/// Split a `Call` argument list into `(slot, call_id, args, results)`.
fn split(args: &[u32]) -> (usize, usize, &[u32], &[u32]) {
    let n = args[2] as usize;
    (args[0] as usize, args[1] as usize, &args[4..4 + 2 * n], &args[4 + 2 * n..])
}

/// Gather orders `0..orders` of each `(kind, index)` pair into the
/// `v[i * stride + k]` layout.
fn gather<F: Float>(t: &CoeffBuffer<F>, constants: &[F], pairs: &[u32], stride: usize, orders: usize) -> Vec<F> {
    let mut out = vec![F::zero(); pairs.len() / 2 * stride];
    for (i, pair) in pairs.chunks_exact(2).enumerate() {
        for k in 0..orders {
            out[i * stride + k] = operand(t, constants, pair[0] == CALL_VAR, pair[1], k);
        }
    }
    out
}

fn failed(name: &str, stage: &'static str, message: String) -> AdError {
    AdError::AtomicFailed {
        name: name.to_owned(),
        stage,
        message,
    }
}

pub(crate) fn atomic<F: Float>(tape: &Player<F>, t: &mut CoeffBuffer<F>, j: usize, args: &[u32]) -> Result<(), AdError> {
    let (slot, call_id, xs, ys) = split(args);
    let atom = &tape.atomics[slot];
    let q = j + 1;
    let taylor_x = gather(t, &tape.constants, xs, q, q);
    let mut taylor_y = gather(t, &tape.constants, ys, q, j);
    atom.forward(call_id, j, j, &taylor_x, &mut taylor_y)
        .map_err(|message| failed(atom.name(), "forward", message))?;
    for (i, pair) in ys.chunks_exact(2).enumerate() {
        if pair[0] == CALL_VAR {
            t.set(pair[1] as usize, j, taylor_y[i * q + j]);
        }
    }
    Ok(())
}

pub(crate) fn atomic_rev<F: Float>(
    tape: &Player<F>,
    t: &CoeffBuffer<F>,
    p: &mut CoeffBuffer<F>,
    d: usize,
    args: &[u32],
) -> Result<(), AdError> {
    let (slot, call_id, xs, ys) = split(args);
    let atom = &tape.atomics[slot];
    let q = d + 1;
    let taylor_x = gather(t, &tape.constants, xs, q, q);
    let taylor_y = gather(t, &tape.constants, ys, q, q);
    let mut partial_y = vec![F::zero(); ys.len() / 2 * q];
    for (i, pair) in ys.chunks_exact(2).enumerate() {
        if pair[0] == CALL_VAR {
            partial_y[i * q..(i + 1) * q].copy_from_slice(p.row(pair[1] as usize, q));
        }
    }
    let mut partial_x = vec![F::zero(); xs.len() / 2 * q];
    atom.reverse(call_id, d, &taylor_x, &taylor_y, &mut partial_x, &partial_y)
        .map_err(|message| failed(atom.name(), "reverse", message))?;
    for (i, pair) in xs.chunks_exact(2).enumerate() {
        if pair[0] == CALL_VAR {
            for k in 0..q {
                p.add(pair[1] as usize, k, partial_x[i * q + k]);
            }
        }
    }
    Ok(())
}

/// Write `before value after` when the position operand is `<= 0`.
/// Output errors are not sweep errors and are dropped.
pub(crate) fn print<F: Float>(tape: &Player<F>, t: &CoeffBuffer<F>, args: &[u32], out: &mut dyn Write) {
    let flags = args[0];
    let pos = operand(t, &tape.constants, flags & PRI_POS_VAR != 0, args[1], 0);
    if pos <= F::zero() {
        let value = operand(t, &tape.constants, flags & PRI_VALUE_VAR != 0, args[3], 0);
        let before = &tape.texts[args[2] as usize];
        let after = &tape.texts[args[4] as usize];
        let _ = write!(out, "{before}{value}{after}");
    }
}
