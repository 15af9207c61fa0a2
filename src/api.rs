//! One-call recording helpers.
//!
//! [`record`] and [`record_multi`] start a recording at `x`, run the closure
//! on the independent variables and freeze the result into a [`Function`].
//! For finer control (atomic functions, `VecAd`, aborting) use
//! [`independent`](crate::independent) and [`Recording`](crate::Recording)
//! directly.

use crate::error::AdError;
use crate::function::Function;
use crate::recorder::{independent, TapeLocal};
use crate::tracked::Tracked;

/// Record a scalar-valued function.
///
/// # Limitations
///
/// The tape records one execution path. Plain Rust `if` on tracked values
/// is decided once, while recording; use [`cond_exp`](crate::cond_exp) for
/// branches that must be re-decided when the tape is evaluated elsewhere.
/// [`Function::compare_change_count`] reports when a recorded comparison
/// would now go the other way.
///
/// # Example
///
/// ```
/// let mut f = numbat::record(|x| x[0] * x[0] + x[1] * x[1], &[3.0_f64, 4.0]).unwrap();
/// let y = f.forward(0, &[3.0, 4.0]).unwrap();
/// assert!((y[0] - 25.0).abs() < 1e-10);
///
/// let g = f.reverse(0, &[1.0]).unwrap();
/// assert!((g[0] - 6.0).abs() < 1e-10);
/// assert!((g[1] - 8.0).abs() < 1e-10);
/// ```
pub fn record<F: TapeLocal>(
    f: impl FnOnce(&[Tracked<F>]) -> Tracked<F>,
    x: &[F],
) -> Result<Function<F>, AdError> {
    let (recording, vars) = independent(x)?;
    let y = f(&vars);
    recording.freeze(&[y])
}

/// Record a vector-valued function `f : R^n -> R^m`.
///
/// ```
/// let mut f = numbat::record_multi(|x| vec![x[0] * x[1], x[0] - x[1]], &[2.0, 5.0]).unwrap();
/// assert_eq!(f.range(), 2);
/// let y = f.forward(0, &[1.0, 3.0]).unwrap();
/// assert_eq!(y, vec![3.0, -2.0]);
/// ```
pub fn record_multi<F: TapeLocal>(
    f: impl FnOnce(&[Tracked<F>]) -> Vec<Tracked<F>>,
    x: &[F],
) -> Result<Function<F>, AdError> {
    let (recording, vars) = independent(x)?;
    let y = f(&vars);
    recording.freeze(&y)
}
