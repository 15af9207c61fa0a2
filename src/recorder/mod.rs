//! The mutable tape that exists while a computation is being traced.
//!
//! A [`Recorder`] is append-only: operators, their flat argument lists and the
//! constants they reference are pushed in execution order, so every argument
//! that names a variable is already below the new operator's result address.
//! [`Recorder::freeze`] turns it into an immutable [`Player`].
//!
//! Most code never touches a `Recorder` directly; [`TapeRegistry::begin`]
//! installs one as the thread's active recording and the operator overloads
//! on [`Tracked`](crate::Tracked) append to it. The raw `put_*` API stays public
//! so that tape transformers can build operation sequences by hand.

use std::collections::HashMap;
use std::sync::Arc;

use crate::atomic::Atomic;
use crate::discrete::Discrete;
use crate::error::{fatal, AdError};
use crate::float::Float;
use crate::index::{to_u32, ConstIndex, TapeId, VarAddr};
use crate::opcode::{check_args, ArgBounds, OpCode};
use crate::player::{Player, PlayerParts};

pub mod registry;
pub use self::registry::{independent, Recording, TapeLocal, TapeRegistry};

pub struct Recorder<F: Float> {
    pub(crate) id: TapeId,
    pub(crate) ops: Vec<OpCode>,
    pub(crate) args: Vec<u32>,
    pub(crate) constants: Vec<F>,
    /// Bit pattern (widened to f64) → slot, so repeated constants share one entry.
    const_lookup: HashMap<u64, ConstIndex>,
    pub(crate) texts: Vec<String>,
    /// Next free variable address.
    pub(crate) num_var: u32,
    pub(crate) n_independent: usize,
    /// VecAD layout: `[len, const.., len, const.., ..]`; an array's offset
    /// points at its first element.
    pub(crate) vec_ad: Vec<u32>,
    pub(crate) num_load: u32,
    pub(crate) discretes: Vec<Discrete<F>>,
    pub(crate) atomics: Vec<Arc<dyn Atomic<F>>>,
}

impl<F: Float> Default for Recorder<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> Recorder<F> {
    /// A detached recorder that is not registered with any thread.
    pub fn new() -> Self {
        Self::with_id(TapeId::NONE)
    }

    /// Pre-allocate for roughly `est_ops` operators.
    pub fn with_capacity(est_ops: usize) -> Self {
        let mut rec = Self::new();
        rec.ops.reserve(est_ops);
        rec.args.reserve(est_ops * 2);
        rec.constants.reserve(est_ops / 4);
        rec
    }

    pub(crate) fn with_id(id: TapeId) -> Self {
        Recorder {
            id,
            ops: Vec::new(),
            args: Vec::new(),
            constants: Vec::new(),
            const_lookup: HashMap::new(),
            texts: Vec::new(),
            num_var: 0,
            n_independent: 0,
            vec_ad: Vec::new(),
            num_load: 0,
            discretes: Vec::new(),
            atomics: Vec::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> TapeId {
        self.id
    }

    #[inline]
    pub fn num_op(&self) -> usize {
        self.ops.len()
    }

    #[inline]
    pub fn num_var(&self) -> usize {
        self.num_var as usize
    }

    #[inline]
    pub fn n_independent(&self) -> usize {
        self.n_independent
    }

    /// Start the operation sequence: the phantom variable at address 0
    /// followed by `n` independent variables at addresses `1..=n`.
    pub fn begin(&mut self, n: usize) -> Result<Vec<VarAddr>, AdError> {
        if !self.ops.is_empty() {
            return Err(AdError::AlreadyRecording { active: self.id });
        }
        self.push(OpCode::Begin, &[], 1)?;
        let mut addrs = Vec::with_capacity(n);
        for _ in 0..n {
            addrs.push(self.push(OpCode::Inv, &[], 1)?);
        }
        self.n_independent = n;
        Ok(addrs)
    }

    /// Append a constant and return its index.
    ///
    /// Panics if the constant table outgrows `u32` indices.
    pub fn put_constant(&mut self, value: F) -> ConstIndex {
        let key = value.to_f64().map(f64::to_bits);
        if let Some(idx) = key.and_then(|k| self.const_lookup.get(&k)) {
            return *idx;
        }
        let idx = ConstIndex(slot(self.constants.len()));
        self.constants.push(value);
        if let Some(k) = key {
            self.const_lookup.insert(k, idx);
        }
        idx
    }

    /// Intern a text operand for a print operator. Panics past `u32` slots.
    pub fn put_text(&mut self, text: &str) -> u32 {
        if let Some(pos) = self.texts.iter().position(|t| t == text) {
            return slot(pos);
        }
        self.texts.push(text.to_owned());
        slot(self.texts.len() - 1)
    }

    /// Append an operator.
    ///
    /// Returns the primary (last) result address, or [`VarAddr::PHANTOM`] for
    /// operators that produce no variable.
    pub fn put_op(&mut self, op: OpCode, args: &[u32]) -> Result<VarAddr, AdError> {
        if self.ops.is_empty() {
            return Err(AdError::NotRecording);
        }
        if matches!(op, OpCode::Begin | OpCode::Inv | OpCode::End) {
            return Err(AdError::internal(format!(
                "{} is placed by begin/freeze only",
                op.name()
            )));
        }
        let n_arg = op.arg_len(args)?;
        if n_arg != args.len() {
            return Err(AdError::internal(format!(
                "{} takes {n_arg} arguments, got {}",
                op.name(),
                args.len()
            )));
        }
        let bounds = ArgBounds {
            first_result: self.num_var,
            num_const: self.constants.len(),
            num_text: self.texts.len(),
            op_index: self.ops.len(),
        };
        check_args(op, args, &bounds)?;
        let n_res = op.res_len(args)?;
        self.push(op, args, n_res)
    }

    fn push(&mut self, op: OpCode, args: &[u32], n_res: usize) -> Result<VarAddr, AdError> {
        self.ops.push(op);
        self.args.extend_from_slice(args);
        let next = to_u32(self.num_var as usize + n_res)?;
        self.num_var = next;
        Ok(if n_res == 0 {
            VarAddr::PHANTOM
        } else {
            VarAddr(next - 1)
        })
    }

    /// Register a discrete function with this tape and return its slot.
    pub fn put_discrete(&mut self, d: Discrete<F>) -> u32 {
        if let Some(pos) = self.discretes.iter().position(|e| e.name() == d.name()) {
            return slot(pos);
        }
        self.discretes.push(d);
        slot(self.discretes.len() - 1)
    }

    /// Register an atomic function with this tape and return its slot.
    pub fn put_atomic(&mut self, atom: &Arc<dyn Atomic<F>>) -> u32 {
        if let Some(pos) = self.atomics.iter().position(|a| Arc::ptr_eq(a, atom)) {
            return slot(pos);
        }
        self.atomics.push(Arc::clone(atom));
        slot(self.atomics.len() - 1)
    }

    /// Lay out a VecAD array whose initial elements are the given constants.
    /// Returns the offset that load and store operators refer to.
    pub fn put_vec_ad(&mut self, init: &[F]) -> Result<u32, AdError> {
        self.vec_ad.push(to_u32(init.len())?);
        let offset = to_u32(self.vec_ad.len())?;
        for &v in init {
            let c = self.put_constant(v);
            self.vec_ad.push(c.0);
        }
        Ok(offset)
    }

    /// Allocate the per-tape slot a load operator records its source into.
    pub fn put_load(&mut self) -> u32 {
        let id = self.num_load;
        self.num_load += 1;
        id
    }

    /// Close the operation sequence and hand it to a [`Player`].
    ///
    /// Every dependent must already be a variable on this tape; promote
    /// parameters with an [`OpCode::Par`] operator first.
    pub fn freeze(mut self, dependents: &[VarAddr]) -> Result<Player<F>, AdError> {
        if self.n_independent == 0 {
            return Err(AdError::EmptyDomain);
        }
        for &d in dependents {
            if d.is_phantom() || d.0 >= self.num_var {
                return Err(AdError::internal(format!(
                    "dependent {d} is not a variable of this tape"
                )));
            }
        }
        self.push(OpCode::End, &[], 0)?;

        let independents = (1..=self.n_independent as u32).map(VarAddr).collect();
        Player::new(PlayerParts {
            ops: self.ops,
            args: self.args,
            constants: self.constants,
            texts: self.texts,
            vec_ad: self.vec_ad,
            num_load: self.num_load as usize,
            independents,
            dependents: dependents.to_vec(),
            discretes: self.discretes,
            atomics: self.atomics,
        })
    }
}

/// Side-table index for an infallible `put_*` call.
fn slot(len: usize) -> u32 {
    to_u32(len).unwrap_or_else(|e| fatal(e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_reserves_phantom() {
        let mut rec = Recorder::<f64>::new();
        let x = rec.begin(2).unwrap();
        assert_eq!(x, vec![VarAddr(1), VarAddr(2)]);
        assert_eq!(rec.num_var(), 3);
        assert!(rec.begin(1).is_err());
    }

    #[test]
    fn multi_result_returns_primary() {
        let mut rec = Recorder::<f64>::new();
        let x = rec.begin(1).unwrap();
        let z = rec.put_op(OpCode::Tanh, &[x[0].raw()]).unwrap();
        // aux at 2, primary at 3
        assert_eq!(z, VarAddr(3));
        assert_eq!(rec.num_var(), 4);
    }

    #[test]
    fn constants_are_shared() {
        let mut rec = Recorder::<f64>::new();
        let a = rec.put_constant(2.5);
        let b = rec.put_constant(2.5);
        let c = rec.put_constant(-0.0);
        let d = rec.put_constant(0.0);
        assert_eq!(a, b);
        assert_ne!(c, d);
    }

    #[test]
    fn texts_are_interned() {
        let mut rec = Recorder::<f64>::new();
        assert_eq!(rec.put_text("x = "), 0);
        assert_eq!(rec.put_text("\n"), 1);
        assert_eq!(rec.put_text("x = "), 0);
        assert_eq!(rec.texts.len(), 2);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    #[should_panic(expected = "exceeds u32")]
    fn slot_refuses_to_truncate() {
        slot(u32::MAX as usize + 1);
    }

    #[test]
    fn freeze_without_independents() {
        let rec = Recorder::<f64>::new();
        assert_eq!(rec.freeze(&[]).err(), Some(AdError::EmptyDomain));
    }

    #[test]
    fn put_op_rejects_bad_arguments() {
        let mut rec = Recorder::<f64>::new();
        rec.begin(1).unwrap();
        let err = rec.put_op(OpCode::Exp, &[5]).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Internal);
        assert!(rec.put_op(OpCode::Exp, &[1, 1]).is_err());
    }
}
