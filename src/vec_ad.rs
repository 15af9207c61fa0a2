//! Arrays indexed by tracked values.
//!
//! A [`VecAd<F>`] behaves like a `Vec<F>` whose index may itself be a variable.
//! While only parameters touch it nothing is recorded. The first load or store
//! that involves a variable lays the array out on the tape, after which every
//! access is recorded as a load/store operator. A variable index is resolved
//! again each time the tape is evaluated.

use crate::error::{fatal, AdError};
use crate::float::Float;
use crate::index::TapeId;
use crate::opcode::OpCode;
use crate::recorder::registry::with_active;
use crate::recorder::{Recorder, TapeLocal};
use crate::tracked::{Operand, Tracked};

#[derive(Clone, Debug)]
pub struct VecAd<F: Float> {
    values: Vec<F>,
    tape: TapeId,
    offset: u32,
}

impl<F: Float> VecAd<F> {
    pub fn new(values: Vec<F>) -> Self {
        VecAd {
            values,
            tape: TapeId::NONE,
            offset: 0,
        }
    }

    pub fn zeros(len: usize) -> Self {
        Self::new(vec![F::zero(); len])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Current element values.
    pub fn values(&self) -> &[F] {
        &self.values
    }

    fn slot(&self, index: F) -> usize {
        match index.to_usize() {
            Some(i) if i < self.values.len() => i,
            _ => fatal(AdError::IndexOutOfRange {
                index: index.to_usize().unwrap_or(usize::MAX),
                len: self.values.len(),
            }),
        }
    }

    fn ensure_on_tape(&mut self, rec: &mut Recorder<F>) -> Result<u32, AdError> {
        if self.tape != rec.id() {
            self.offset = rec.put_vec_ad(&self.values)?;
            self.tape = rec.id();
        }
        Ok(self.offset)
    }
}

impl<F: TapeLocal> VecAd<F> {
    /// Read the element at `index` (truncated toward zero).
    pub fn get(&mut self, index: Tracked<F>) -> Tracked<F> {
        let value = self.values[self.slot(index.value)];
        with_active::<F, _>(|rec| {
            let Some(rec) = rec else {
                index.reject_foreign();
                return Tracked::constant(value);
            };
            let idx = index.operand(rec);
            if self.tape != rec.id() && matches!(idx, Operand::Par(_)) {
                return Tracked::constant(value);
            }
            let put = self.ensure_on_tape(rec).and_then(|offset| {
                let load = rec.put_load();
                match idx {
                    Operand::Var(a) => rec.put_op(OpCode::LdV, &[offset, a.raw(), load]),
                    Operand::Par(p) => {
                        let c = rec.put_constant(p);
                        rec.put_op(OpCode::LdP, &[offset, c.raw(), load])
                    }
                }
            });
            match put {
                Ok(addr) => Tracked::variable(value, rec.id(), addr),
                Err(e) => fatal(e),
            }
        })
    }

    /// Write `value` at `index` (truncated toward zero).
    pub fn set(&mut self, index: Tracked<F>, value: Tracked<F>) {
        let slot = self.slot(index.value);
        self.values[slot] = value.value;
        with_active::<F, _>(|rec| {
            let Some(rec) = rec else {
                index.reject_foreign();
                value.reject_foreign();
                return;
            };
            let (idx, val) = (index.operand(rec), value.operand(rec));
            let all_par = matches!((idx, val), (Operand::Par(_), Operand::Par(_)));
            if self.tape != rec.id() && all_par {
                return;
            }
            let put = self.ensure_on_tape(rec).and_then(|offset| {
                let op = match (idx, val) {
                    (Operand::Par(_), Operand::Par(_)) => OpCode::StPP,
                    (Operand::Par(_), Operand::Var(_)) => OpCode::StPV,
                    (Operand::Var(_), Operand::Par(_)) => OpCode::StVP,
                    (Operand::Var(_), Operand::Var(_)) => OpCode::StVV,
                };
                let (_, i) = idx.encode(rec);
                let (_, v) = val.encode(rec);
                rec.put_op(op, &[offset, i, v])
            });
            if let Err(e) = put {
                fatal(e);
            }
        })
    }
}
