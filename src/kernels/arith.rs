//! Arithmetic kernels: add/sub/mul/div in every operand form, `pow`, `neg`,
//! `abs`, `sign` and the cumulative sum.
//!
//! A parameter operand only has an order-0 coefficient; its higher orders
//! are zero, which is why the `P` forms ignore `p` above order 0.

use crate::buffer::CoeffBuffer;
use crate::float::{azmul, from_usize, Float};

use super::exp_log::{exp, exp_rev, log, log_rev};

/// `sign(x)` with `sign(0) == 0`.
#[inline]
pub(crate) fn sign<F: Float>(x: F) -> F {
    if x > F::zero() {
        F::one()
    } else if x < F::zero() {
        -F::one()
    } else {
        F::zero()
    }
}

#[inline]
fn at_zero<F: Float>(j: usize, p: F) -> F {
    if j == 0 {
        p
    } else {
        F::zero()
    }
}

// ── add / sub ──

pub(crate) fn add_vv<F: Float>(t: &mut CoeffBuffer<F>, j: usize, x: usize, y: usize, z: usize) {
    t.set(z, j, t.get(x, j) + t.get(y, j));
}

pub(crate) fn add_pv<F: Float>(t: &mut CoeffBuffer<F>, j: usize, p: F, y: usize, z: usize) {
    t.set(z, j, at_zero(j, p) + t.get(y, j));
}

pub(crate) fn sub_vv<F: Float>(t: &mut CoeffBuffer<F>, j: usize, x: usize, y: usize, z: usize) {
    t.set(z, j, t.get(x, j) - t.get(y, j));
}

pub(crate) fn sub_vp<F: Float>(t: &mut CoeffBuffer<F>, j: usize, x: usize, p: F, z: usize) {
    t.set(z, j, t.get(x, j) - at_zero(j, p));
}

pub(crate) fn sub_pv<F: Float>(t: &mut CoeffBuffer<F>, j: usize, p: F, y: usize, z: usize) {
    t.set(z, j, at_zero(j, p) - t.get(y, j));
}

/// `p[x] += sgn * p[z]` at every order; the reverse of add, sub and neg.
pub(crate) fn pass_rev<F: Float>(p: &mut CoeffBuffer<F>, d: usize, x: usize, z: usize, negate: bool) {
    for j in 0..=d {
        let pz = p.get(z, j);
        p.add(x, j, if negate { -pz } else { pz });
    }
}

// ── mul ──

pub(crate) fn mul_vv<F: Float>(t: &mut CoeffBuffer<F>, j: usize, x: usize, y: usize, z: usize) {
    let mut sum = F::zero();
    for k in 0..=j {
        sum = sum + t.get(x, j - k) * t.get(y, k);
    }
    t.set(z, j, sum);
}

pub(crate) fn mul_vv_rev<F: Float>(
    t: &CoeffBuffer<F>,
    p: &mut CoeffBuffer<F>,
    d: usize,
    x: usize,
    y: usize,
    z: usize,
) {
    for j in (0..=d).rev() {
        let pz = p.get(z, j);
        for k in 0..=j {
            p.add(x, j - k, azmul(pz, t.get(y, k)));
            p.add(y, k, azmul(pz, t.get(x, j - k)));
        }
    }
}

pub(crate) fn mul_pv<F: Float>(t: &mut CoeffBuffer<F>, j: usize, c: F, y: usize, z: usize) {
    t.set(z, j, c * t.get(y, j));
}

pub(crate) fn mul_pv_rev<F: Float>(p: &mut CoeffBuffer<F>, d: usize, c: F, y: usize, z: usize) {
    for j in 0..=d {
        p.add(y, j, azmul(p.get(z, j), c));
    }
}

// ── div ──

/// `z = x / y`; `x` is a variable row or, when `None`, the parameter `c`.
pub(crate) fn div_v<F: Float>(t: &mut CoeffBuffer<F>, j: usize, x: Option<usize>, c: F, y: usize, z: usize) {
    let xj = match x {
        Some(x) => t.get(x, j),
        None => at_zero(j, c),
    };
    let mut sum = xj;
    for k in 1..=j {
        sum = sum - t.get(z, j - k) * t.get(y, k);
    }
    t.set(z, j, sum / t.get(y, 0));
}

pub(crate) fn div_v_rev<F: Float>(
    t: &CoeffBuffer<F>,
    p: &mut CoeffBuffer<F>,
    d: usize,
    x: Option<usize>,
    y: usize,
    z: usize,
) {
    let inv = F::one() / t.get(y, 0);
    for j in (0..=d).rev() {
        let pzj = azmul(p.get(z, j), inv);
        if let Some(x) = x {
            p.add(x, j, pzj);
        }
        for k in 1..=j {
            p.add(z, j - k, -azmul(pzj, t.get(y, k)));
            p.add(y, k, -azmul(pzj, t.get(z, j - k)));
        }
        p.add(y, 0, -azmul(pzj, t.get(z, j)));
    }
}

pub(crate) fn div_vp<F: Float>(t: &mut CoeffBuffer<F>, j: usize, x: usize, c: F, z: usize) {
    t.set(z, j, t.get(x, j) / c);
}

pub(crate) fn div_vp_rev<F: Float>(p: &mut CoeffBuffer<F>, d: usize, x: usize, c: F, z: usize) {
    let inv = F::one() / c;
    for j in 0..=d {
        p.add(x, j, azmul(p.get(z, j), inv));
    }
}

// ── pow ──

/// `z = x^y` for a variable base and exponent, through `u = log x`,
/// `w = u * y`, `z = exp w`. Order 0 uses `powf` directly.
pub(crate) fn pow_vv<F: Float>(
    t: &mut CoeffBuffer<F>,
    j: usize,
    x: usize,
    y: usize,
    [u, w, z]: [usize; 3],
) {
    log(t, j, x, u, false);
    mul_vv(t, j, u, y, w);
    if j == 0 {
        t.set(z, 0, t.get(x, 0).powf(t.get(y, 0)));
    } else {
        exp(t, j, w, z, false);
    }
}

pub(crate) fn pow_vv_rev<F: Float>(
    t: &CoeffBuffer<F>,
    p: &mut CoeffBuffer<F>,
    d: usize,
    x: usize,
    y: usize,
    [u, w, z]: [usize; 3],
) {
    exp_rev(t, p, d, w, z, false);
    mul_vv_rev(t, p, d, u, y, w);
    log_rev(t, p, d, x, u, false);
}

/// `z = c^y` for a parameter base, through `w = log(c) * y`, `z = exp w`.
pub(crate) fn pow_pv<F: Float>(t: &mut CoeffBuffer<F>, j: usize, c: F, y: usize, [w, z]: [usize; 2]) {
    mul_pv(t, j, c.ln(), y, w);
    if j == 0 {
        t.set(z, 0, c.powf(t.get(y, 0)));
    } else {
        exp(t, j, w, z, false);
    }
}

pub(crate) fn pow_pv_rev<F: Float>(
    t: &CoeffBuffer<F>,
    p: &mut CoeffBuffer<F>,
    d: usize,
    c: F,
    y: usize,
    [w, z]: [usize; 2],
) {
    exp_rev(t, p, d, w, z, false);
    mul_pv_rev(p, d, c.ln(), y, w);
}

/// `z = x^c` for a parameter exponent, from `x z' = c z x'`.
pub(crate) fn pow_vp<F: Float>(t: &mut CoeffBuffer<F>, j: usize, x: usize, c: F, z: usize) {
    let x0 = t.get(x, 0);
    if j == 0 {
        t.set(z, 0, x0.powf(c));
        return;
    }
    let jf = from_usize::<F>(j);
    let mut sum = F::zero();
    for k in 1..=j {
        let kf = from_usize::<F>(k);
        let coef = c * kf - (jf - kf);
        sum = sum + coef * t.get(x, k) * t.get(z, j - k);
    }
    t.set(z, j, sum / (jf * x0));
}

pub(crate) fn pow_vp_rev<F: Float>(
    t: &CoeffBuffer<F>,
    p: &mut CoeffBuffer<F>,
    d: usize,
    x: usize,
    c: F,
    z: usize,
) {
    let x0 = t.get(x, 0);
    let inv = F::one() / x0;
    for j in (1..=d).rev() {
        let jf = from_usize::<F>(j);
        // zero adjoint stays zero even when x0 is
        let pzj = azmul(p.get(z, j), inv);
        let scaled = pzj / jf;
        p.add(x, 0, -azmul(pzj, t.get(z, j)));
        for k in 1..=j {
            let kf = from_usize::<F>(k);
            let coef = c * kf - (jf - kf);
            p.add(x, k, coef * azmul(scaled, t.get(z, j - k)));
            p.add(z, j - k, coef * azmul(scaled, t.get(x, k)));
        }
    }
    p.add(x, 0, azmul(p.get(z, 0), c * x0.powf(c - F::one())));
}

// ── unary ──

pub(crate) fn neg<F: Float>(t: &mut CoeffBuffer<F>, j: usize, x: usize, z: usize) {
    t.set(z, j, -t.get(x, j));
}

pub(crate) fn abs<F: Float>(t: &mut CoeffBuffer<F>, j: usize, x: usize, z: usize) {
    let value = if j == 0 {
        t.get(x, 0).abs()
    } else {
        sign(t.get(x, 0)) * t.get(x, j)
    };
    t.set(z, j, value);
}

pub(crate) fn abs_rev<F: Float>(t: &CoeffBuffer<F>, p: &mut CoeffBuffer<F>, d: usize, x: usize, z: usize) {
    let s = sign(t.get(x, 0));
    for j in 0..=d {
        p.add(x, j, azmul(p.get(z, j), s));
    }
}

pub(crate) fn sign_op<F: Float>(t: &mut CoeffBuffer<F>, j: usize, x: usize, z: usize) {
    t.set(z, j, at_zero(j, sign(t.get(x, 0))));
}

/// Constant promoted to a variable.
pub(crate) fn par<F: Float>(t: &mut CoeffBuffer<F>, j: usize, c: F, z: usize) {
    t.set(z, j, at_zero(j, c));
}

// ── cumulative sum ──

/// `z = c + sum(adds) - sum(subs)`, accumulated in that order.
pub(crate) fn csum<F: Float>(t: &mut CoeffBuffer<F>, j: usize, c: F, adds: &[u32], subs: &[u32], z: usize) {
    let mut sum = at_zero(j, c);
    for &a in adds {
        sum = sum + t.get(a as usize, j);
    }
    for &s in subs {
        sum = sum - t.get(s as usize, j);
    }
    t.set(z, j, sum);
}

pub(crate) fn csum_rev<F: Float>(p: &mut CoeffBuffer<F>, d: usize, adds: &[u32], subs: &[u32], z: usize) {
    for &a in adds {
        pass_rev(p, d, a as usize, z, false);
    }
    for &s in subs {
        pass_rev(p, d, s as usize, z, true);
    }
}
