//! The frozen, replayable tape.
//!
//! A [`Player`] holds the same arenas as the [`Recorder`](crate::Recorder) that
//! produced it, plus per-operator indices so any operator's arguments and
//! results are found in O(1). It is immutable: sweeps read it through `&self`
//! and keep their working state in separate buffers, so one `Player` can be
//! evaluated from many threads at once.

use std::fmt;
use std::sync::Arc;

use crate::atomic::Atomic;
use crate::discrete::Discrete;
use crate::error::AdError;
use crate::float::Float;
use crate::index::{to_u32, ArgIndex, ConstIndex, VarAddr};
use crate::opcode::{check_args, ArgBounds, OpCode};

#[cfg(feature = "serde")]
mod serde_support;

/// The raw arenas of a tape, as produced by a recorder or a tape transformer.
pub struct PlayerParts<F: Float> {
    pub ops: Vec<OpCode>,
    pub args: Vec<u32>,
    pub constants: Vec<F>,
    pub texts: Vec<String>,
    pub vec_ad: Vec<u32>,
    pub num_load: usize,
    pub independents: Vec<VarAddr>,
    pub dependents: Vec<VarAddr>,
    pub discretes: Vec<Discrete<F>>,
    pub atomics: Vec<Arc<dyn Atomic<F>>>,
}

pub struct Player<F: Float> {
    pub(crate) ops: Vec<OpCode>,
    pub(crate) args: Vec<u32>,
    /// First argument of each operator, plus a trailing `args.len()` sentinel.
    pub(crate) op_arg: Vec<ArgIndex>,
    /// Primary (last) result of each operator; the phantom address when it has none.
    pub(crate) op_var: Vec<VarAddr>,
    pub(crate) constants: Vec<F>,
    pub(crate) texts: Vec<String>,
    pub(crate) vec_ad: Vec<u32>,
    pub(crate) num_var: usize,
    pub(crate) num_load: usize,
    pub(crate) independents: Vec<VarAddr>,
    pub(crate) dependents: Vec<VarAddr>,
    pub(crate) discretes: Vec<Discrete<F>>,
    pub(crate) atomics: Vec<Arc<dyn Atomic<F>>>,
}

impl<F: Float> Clone for Player<F> {
    fn clone(&self) -> Self {
        Player {
            ops: self.ops.clone(),
            args: self.args.clone(),
            op_arg: self.op_arg.clone(),
            op_var: self.op_var.clone(),
            constants: self.constants.clone(),
            texts: self.texts.clone(),
            vec_ad: self.vec_ad.clone(),
            num_var: self.num_var,
            num_load: self.num_load,
            independents: self.independents.clone(),
            dependents: self.dependents.clone(),
            discretes: self.discretes.clone(),
            atomics: self.atomics.clone(),
        }
    }
}

impl<F: Float> Player<F> {
    /// Validate the arenas and build the per-operator indices.
    pub fn new(parts: PlayerParts<F>) -> Result<Self, AdError> {
        let PlayerParts {
            ops,
            args,
            constants,
            texts,
            vec_ad,
            num_load,
            independents,
            dependents,
            discretes,
            atomics,
        } = parts;

        if ops.first() != Some(&OpCode::Begin) || ops.last() != Some(&OpCode::End) {
            return Err(AdError::internal("tape must start with Begin and end with End"));
        }
        if independents.is_empty() {
            return Err(AdError::EmptyDomain);
        }
        for (j, &x) in independents.iter().enumerate() {
            if x.index() != j + 1 || ops.get(j + 1) != Some(&OpCode::Inv) {
                return Err(AdError::internal(format!(
                    "independent {j} is not the Inv result at v{}",
                    j + 1
                )));
            }
        }

        let mut op_arg = Vec::with_capacity(ops.len() + 1);
        let mut op_var = Vec::with_capacity(ops.len());
        let mut cursor = 0usize;
        let mut num_var = 0u32;
        for (i, &op) in ops.iter().enumerate() {
            let rest = args.get(cursor..).unwrap_or(&[]);
            let n_arg = op.arg_len(rest)?;
            let op_args = rest.get(..n_arg).ok_or_else(|| {
                AdError::internal(format!("op {i} ({}) runs past the argument array", op.name()))
            })?;
            let bounds = ArgBounds {
                first_result: num_var,
                num_const: constants.len(),
                num_text: texts.len(),
                op_index: i,
            };
            check_args(op, op_args, &bounds)?;
            check_tables(op, op_args, &vec_ad, num_load, discretes.len(), atomics.len())?;
            if matches!(op, OpCode::Inv) && i > independents.len() {
                return Err(AdError::internal(format!("stray Inv at op {i}")));
            }

            let n_res = to_u32(op.res_len(op_args)?)?;
            op_arg.push(ArgIndex(to_u32(cursor)?));
            op_var.push(if n_res == 0 {
                VarAddr::PHANTOM
            } else {
                VarAddr(num_var + n_res - 1)
            });
            num_var += n_res;
            cursor += n_arg;
        }
        if cursor != args.len() {
            return Err(AdError::internal("trailing arguments after End"));
        }
        op_arg.push(ArgIndex(to_u32(cursor)?));

        for &d in &dependents {
            if d.is_phantom() || d.0 >= num_var {
                return Err(AdError::internal(format!("dependent {d} is not a variable")));
            }
        }

        Ok(Player {
            ops,
            args,
            op_arg,
            op_var,
            constants,
            texts,
            vec_ad,
            num_var: num_var as usize,
            num_load,
            independents,
            dependents,
            discretes,
            atomics,
        })
    }

    /// Give the arenas back, e.g. to a tape transformer.
    pub fn into_parts(self) -> PlayerParts<F> {
        PlayerParts {
            ops: self.ops,
            args: self.args,
            constants: self.constants,
            texts: self.texts,
            vec_ad: self.vec_ad,
            num_load: self.num_load,
            independents: self.independents,
            dependents: self.dependents,
            discretes: self.discretes,
            atomics: self.atomics,
        }
    }

    #[inline]
    pub fn num_op(&self) -> usize {
        self.ops.len()
    }

    #[inline]
    pub fn num_var(&self) -> usize {
        self.num_var
    }

    #[inline]
    pub fn num_independent(&self) -> usize {
        self.independents.len()
    }

    #[inline]
    pub fn num_dependent(&self) -> usize {
        self.dependents.len()
    }

    #[inline]
    pub fn num_load(&self) -> usize {
        self.num_load
    }

    #[inline]
    pub fn op(&self, i: usize) -> OpCode {
        self.ops[i]
    }

    /// Arguments of operator `i`.
    #[inline]
    pub fn op_args(&self, i: usize) -> &[u32] {
        &self.args[self.op_arg[i].index()..self.op_arg[i + 1].index()]
    }

    /// Primary result address of operator `i`.
    #[inline]
    pub fn op_result(&self, i: usize) -> VarAddr {
        self.op_var[i]
    }

    #[inline]
    pub fn constant(&self, c: ConstIndex) -> F {
        self.constants[c.index()]
    }

    pub fn constants(&self) -> &[F] {
        &self.constants
    }

    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    pub fn independents(&self) -> &[VarAddr] {
        &self.independents
    }

    pub fn dependents(&self) -> &[VarAddr] {
        &self.dependents
    }

    /// True when the tape calls user code that cannot be serialized.
    pub fn has_callbacks(&self) -> bool {
        !self.discretes.is_empty() || !self.atomics.is_empty()
    }

    /// Length of the VecAD array starting at `offset`.
    #[inline]
    pub(crate) fn vec_ad_len(&self, offset: u32) -> usize {
        self.vec_ad[offset as usize - 1] as usize
    }
}

/// Side-table references that `check_args` cannot see.
fn check_tables(
    op: OpCode,
    args: &[u32],
    vec_ad: &[u32],
    num_load: usize,
    num_discrete: usize,
    num_atomic: usize,
) -> Result<(), AdError> {
    let bad = |what: &str| Err(AdError::internal(format!("{}: bad {what}", op.name())));
    match op {
        OpCode::Dis if args[0] as usize >= num_discrete => bad("discrete index"),
        OpCode::Call if args[0] as usize >= num_atomic => bad("atomic index"),
        OpCode::LdP | OpCode::LdV | OpCode::StPP | OpCode::StPV | OpCode::StVP | OpCode::StVV => {
            let offset = args[0] as usize;
            let fits = offset >= 1
                && offset <= vec_ad.len()
                && offset + vec_ad[offset - 1] as usize <= vec_ad.len();
            if !fits {
                return bad("VecAD offset");
            }
            if matches!(op, OpCode::LdP | OpCode::LdV) && args[2] as usize >= num_load {
                return bad("load slot");
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

impl<F: Float> fmt::Debug for Player<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("num_op", &self.ops.len())
            .field("num_var", &self.num_var)
            .field("num_const", &self.constants.len())
            .field("n", &self.independents.len())
            .field("m", &self.dependents.len())
            .finish()
    }
}

/// One line per operator: index, primary result, opcode and arguments.
impl<F: Float> fmt::Display for Player<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.ops.len() {
            let z = self.op_var[i];
            write!(f, "{i:>5} ")?;
            if z.is_phantom() && i != 0 {
                write!(f, "{:>6} ", "")?;
            } else {
                write!(f, "{:>6} ", z.to_string())?;
            }
            writeln!(f, "{:<6} {:?}", self.ops[i].name(), self.op_args(i))?;
        }
        Ok(())
    }
}
