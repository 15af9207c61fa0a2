//! Forward and reverse interpretation of a [`Player`].
//!
//! Sweeps take the tape by shared reference and keep everything they mutate
//! in caller-owned buffers: the Taylor coefficients, the partials, and a
//! [`SweepState`] holding what a zero-order pass decided.

mod forward;
mod reverse;

pub(crate) use forward::forward;
pub(crate) use reverse::reverse;

use crate::float::Float;
use crate::kernels::array::VecAdState;
use crate::player::Player;

/// Decisions made by the latest zero-order forward pass.
///
/// Higher orders and reverse sweeps must see the same decisions, so this
/// lives alongside the Taylor buffer it describes.
#[derive(Clone, Debug, Default)]
pub(crate) struct SweepState {
    /// Operators disabled by a conditional skip.
    pub(crate) skip: Vec<bool>,
    pub(crate) vec_ad: VecAdState,
    pub(crate) compare_change_count: usize,
    pub(crate) compare_change_op_index: usize,
}

impl SweepState {
    pub(crate) fn new<F: Float>(tape: &Player<F>) -> Self {
        let mut state = SweepState::default();
        state.reset(tape);
        state
    }

    /// Forget every decision; called at the start of each zero-order pass.
    pub(crate) fn reset<F: Float>(&mut self, tape: &Player<F>) {
        self.skip.clear();
        self.skip.resize(tape.num_op(), false);
        self.vec_ad.reset(tape);
        self.compare_change_count = 0;
        self.compare_change_op_index = 0;
    }
}
