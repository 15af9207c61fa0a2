use rayon::prelude::*;

use crate::error::AdError;
use crate::float::Float;

use super::eval_point;

impl<F: Float> super::Function<F> {
    /// Zero-order values at many points, one rayon task per point.
    ///
    /// Takes `&self`: the tape is shared read-only and every worker evaluates
    /// into its own buffers, so the Taylor coefficients held by `self` are
    /// left untouched. Print operators produce no output here.
    pub fn forward_zero_batch_par(&self, points: &[Vec<F>]) -> Result<Vec<Vec<F>>, AdError> {
        points
            .par_iter()
            .map(|x| eval_point(&self.player, x, None).map(|(y, _)| y))
            .collect()
    }

    /// `reverse(0, w)` at many points: the gradient of `w · f` at each one.
    pub fn gradient_batch_par(&self, points: &[Vec<F>], w: &[F]) -> Result<Vec<Vec<F>>, AdError> {
        points
            .par_iter()
            .map(|x| {
                let (_, dw) = eval_point(&self.player, x, Some(w))?;
                dw.ok_or_else(|| AdError::internal("reverse pass produced no adjoints"))
            })
            .collect()
    }
}
