//! The differentiable function object.
//!
//! A [`Function`] owns a frozen [`Player`] together with the Taylor buffer of
//! its most recent forward evaluation. `forward` fills the buffer one order
//! at a time; `reverse` reads it and returns adjoints without modifying it.

use std::fmt;
use std::io::{self, Write};

use crate::buffer::CoeffBuffer;
use crate::error::AdError;
use crate::float::Float;
use crate::player::Player;
use crate::sweep::{self, SweepState};

#[cfg(feature = "parallel")]
mod parallel;

pub struct Function<F: Float> {
    player: Player<F>,
    taylor: CoeffBuffer<F>,
    state: SweepState,
    /// Orders `0..size_order` of `taylor` are valid.
    size_order: usize,
    trace: bool,
}

impl<F: Float> Function<F> {
    pub fn new(player: Player<F>) -> Self {
        let taylor = CoeffBuffer::zeros(player.num_var(), 1);
        let state = SweepState::new(&player);
        Function {
            player,
            taylor,
            state,
            size_order: 0,
            trace: false,
        }
    }

    /// Number of independent variables.
    #[inline]
    pub fn domain(&self) -> usize {
        self.player.num_independent()
    }

    /// Number of dependent variables.
    #[inline]
    pub fn range(&self) -> usize {
        self.player.num_dependent()
    }

    #[inline]
    pub fn size_var(&self) -> usize {
        self.player.num_var()
    }

    #[inline]
    pub fn size_op(&self) -> usize {
        self.player.num_op()
    }

    /// Number of Taylor orders currently held for every variable.
    #[inline]
    pub fn size_order(&self) -> usize {
        self.size_order
    }

    /// Resize the Taylor buffer to hold `c` orders. Orders at or above `c`
    /// are discarded.
    pub fn capacity_order(&mut self, c: usize) {
        self.taylor.reshape(self.player.num_var(), c.max(1));
        self.size_order = self.size_order.min(c);
    }

    /// Emit a `tracing::trace!` event per operator during sweeps.
    pub fn set_trace(&mut self, on: bool) {
        self.trace = on;
    }

    /// Number of recorded comparisons whose outcome differs at the latest
    /// zero-order forward pass.
    pub fn compare_change_count(&self) -> usize {
        self.state.compare_change_count
    }

    /// Operator index of the first such comparison, or 0.
    pub fn compare_change_op_index(&self) -> usize {
        self.state.compare_change_op_index
    }

    pub fn player(&self) -> &Player<F> {
        &self.player
    }

    /// Install an equivalent tape, e.g. one produced by an optimizer.
    /// All Taylor coefficients are discarded.
    pub fn replace_player(&mut self, player: Player<F>) {
        *self = Function {
            trace: self.trace,
            ..Function::new(player)
        };
    }

    pub fn into_player(self) -> Player<F> {
        self.player
    }

    /// Forward mode at order `q`. Print operators write to standard output.
    ///
    /// `xq` either holds order `q` of every independent (length `n`; orders
    /// below `q` must already be computed) or orders `0..=q` laid out as
    /// `xq[j * (q + 1) + k]` (length `n * (q + 1)`). The result uses the
    /// matching layout for the dependents.
    pub fn forward(&mut self, q: usize, xq: &[F]) -> Result<Vec<F>, AdError> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.forward_with_writer(q, xq, &mut out)
    }

    /// [`forward`](Self::forward) with print operators writing to `out`.
    pub fn forward_with_writer(&mut self, q: usize, xq: &[F], out: &mut dyn Write) -> Result<Vec<F>, AdError> {
        let n = self.domain();
        let all_orders = xq.len() == n * (q + 1);
        if !all_orders && xq.len() != n {
            return Err(AdError::DomainMismatch {
                what: "forward argument",
                expected: n * (q + 1),
                actual: xq.len(),
            });
        }
        if !all_orders && self.size_order < q {
            return Err(AdError::StaleOrder {
                requested: q,
                available: self.size_order,
            });
        }
        if self.taylor.stride() < q + 1 {
            self.taylor.reshape(self.player.num_var(), q + 1);
        }

        let low = if all_orders { 0 } else { q };
        for (j, x) in self.player.independents.iter().enumerate() {
            for k in low..=q {
                let v = if all_orders { xq[j * (q + 1) + k] } else { xq[j] };
                self.taylor.set(x.index(), k, v);
            }
        }

        // Orders from `low` up are stale until the sweep completes.
        self.size_order = low;
        sweep::forward(
            &self.player,
            &mut self.taylor,
            &mut self.state,
            low,
            q,
            out,
            self.trace,
        )?;
        self.size_order = q + 1;

        let deps = &self.player.dependents;
        Ok(if all_orders {
            deps.iter()
                .flat_map(|y| self.taylor.row(y.index(), q + 1).iter().copied())
                .collect()
        } else {
            deps.iter().map(|y| self.taylor.get(y.index(), q)).collect()
        })
    }

    /// Reverse mode at order `d`.
    ///
    /// `w` either weights order `d` of every dependent (length `m`) or every
    /// order `0..=d` as `w[i * (d + 1) + k]` (length `m * (d + 1)`). Returns
    /// the partials of the weighted sum with respect to each independent
    /// coefficient, laid out as `dw[j * (d + 1) + k]`.
    pub fn reverse(&self, d: usize, w: &[F]) -> Result<Vec<F>, AdError> {
        let m = self.range();
        let all_orders = w.len() == m * (d + 1);
        if !all_orders && w.len() != m {
            return Err(AdError::DomainMismatch {
                what: "reverse weight",
                expected: m * (d + 1),
                actual: w.len(),
            });
        }
        if self.size_order <= d {
            return Err(AdError::StaleOrder {
                requested: d,
                available: self.size_order,
            });
        }

        let mut partial = CoeffBuffer::zeros(self.player.num_var(), d + 1);
        for (i, y) in self.player.dependents.iter().enumerate() {
            if all_orders {
                for k in 0..=d {
                    partial.add(y.index(), k, w[i * (d + 1) + k]);
                }
            } else {
                partial.add(y.index(), d, w[i]);
            }
        }
        sweep::reverse(&self.player, &self.taylor, &mut partial, &self.state, d, self.trace)?;

        Ok(self
            .player
            .independents
            .iter()
            .flat_map(|x| partial.row(x.index(), d + 1).to_vec())
            .collect())
    }
}

/// Zero-order evaluation and, when `w` is given, first-order adjoints at one
/// point, using private buffers. Print operators are silenced.
#[cfg_attr(not(feature = "parallel"), allow(dead_code))]
pub(crate) fn eval_point<F: Float>(
    player: &Player<F>,
    x: &[F],
    w: Option<&[F]>,
) -> Result<(Vec<F>, Option<Vec<F>>), AdError> {
    let n = player.num_independent();
    if x.len() != n {
        return Err(AdError::DomainMismatch {
            what: "forward argument",
            expected: n,
            actual: x.len(),
        });
    }
    let mut taylor = CoeffBuffer::zeros(player.num_var(), 1);
    for (addr, &v) in player.independents.iter().zip(x) {
        taylor.set(addr.index(), 0, v);
    }
    let mut state = SweepState::new(player);
    sweep::forward(player, &mut taylor, &mut state, 0, 0, &mut io::sink(), false)?;
    let y = player.dependents.iter().map(|d| taylor.get(d.index(), 0)).collect();

    let Some(w) = w else {
        return Ok((y, None));
    };
    if w.len() != player.num_dependent() {
        return Err(AdError::DomainMismatch {
            what: "reverse weight",
            expected: player.num_dependent(),
            actual: w.len(),
        });
    }
    let mut partial = CoeffBuffer::zeros(player.num_var(), 1);
    for (d, &wi) in player.dependents.iter().zip(w) {
        partial.add(d.index(), 0, wi);
    }
    sweep::reverse(player, &taylor, &mut partial, &state, 0, false)?;
    let dw = player.independents.iter().map(|a| partial.get(a.index(), 0)).collect();
    Ok((y, Some(dw)))
}

impl<F: Float> fmt::Debug for Function<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("domain", &self.domain())
            .field("range", &self.range())
            .field("size_var", &self.size_var())
            .field("size_order", &self.size_order)
            .finish()
    }
}
