//! Dense per-variable coefficient storage.
//!
//! Row `v` holds the Taylor coefficients (or partials) of variable `v` for
//! orders `0..stride`. The forward buffer of a [`Function`](crate::Function)
//! keeps its rows between calls; reverse sweeps use a fresh one per call.

use crate::float::Float;

#[derive(Clone, Debug, Default)]
pub(crate) struct CoeffBuffer<F> {
    data: Vec<F>,
    num_var: usize,
    stride: usize,
}

impl<F: Float> CoeffBuffer<F> {
    /// All-zero buffer with `num_var` rows of `stride` orders.
    pub(crate) fn zeros(num_var: usize, stride: usize) -> Self {
        CoeffBuffer {
            data: vec![F::zero(); num_var * stride],
            num_var,
            stride,
        }
    }

    #[inline]
    pub(crate) fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub(crate) fn num_var(&self) -> usize {
        self.num_var
    }

    #[inline]
    pub(crate) fn get(&self, var: usize, k: usize) -> F {
        debug_assert!(k < self.stride);
        self.data[var * self.stride + k]
    }

    #[inline]
    pub(crate) fn set(&mut self, var: usize, k: usize, value: F) {
        debug_assert!(k < self.stride);
        self.data[var * self.stride + k] = value;
    }

    #[inline]
    pub(crate) fn add(&mut self, var: usize, k: usize, value: F) {
        debug_assert!(k < self.stride);
        let slot = &mut self.data[var * self.stride + k];
        *slot = *slot + value;
    }

    /// Orders `0..len` of row `var`.
    #[inline]
    pub(crate) fn row(&self, var: usize, len: usize) -> &[F] {
        let start = var * self.stride;
        &self.data[start..start + len]
    }

    /// Change the shape, keeping every coefficient that still fits.
    pub(crate) fn reshape(&mut self, num_var: usize, stride: usize) {
        if num_var == self.num_var && stride == self.stride {
            return;
        }
        let keep_rows = num_var.min(self.num_var);
        let keep_orders = stride.min(self.stride);
        let mut data = vec![F::zero(); num_var * stride];
        for v in 0..keep_rows {
            let from = v * self.stride;
            data[v * stride..v * stride + keep_orders]
                .copy_from_slice(&self.data[from..from + keep_orders]);
        }
        self.data = data;
        self.num_var = num_var;
        self.stride = stride;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reshape_keeps_low_orders() {
        let mut b = CoeffBuffer::<f64>::zeros(2, 2);
        b.set(0, 1, 3.0);
        b.set(1, 0, 4.0);
        b.reshape(3, 4);
        assert_eq!(b.get(0, 1), 3.0);
        assert_eq!(b.get(1, 0), 4.0);
        assert_eq!(b.get(2, 3), 0.0);
        b.reshape(3, 1);
        assert_eq!(b.row(1, 1), &[4.0]);
    }
}
