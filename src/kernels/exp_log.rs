//! `exp`, `expm1`, `log`, `log1p` and `sqrt`.

use crate::buffer::CoeffBuffer;
use crate::float::{azmul, from_usize, Float};

// ── exp / expm1 ──

/// `z = exp(x)`, or `z = exp(x) - 1` when `minus_one`.
pub(crate) fn exp<F: Float>(t: &mut CoeffBuffer<F>, j: usize, x: usize, z: usize, minus_one: bool) {
    if j == 0 {
        let x0 = t.get(x, 0);
        t.set(z, 0, if minus_one { x0.exp_m1() } else { x0.exp() });
        return;
    }
    let mut sum = F::zero();
    for k in 1..=j {
        sum = sum + from_usize::<F>(k) * t.get(x, k) * t.get(z, j - k);
    }
    let mut zj = sum / from_usize(j);
    if minus_one {
        zj = zj + t.get(x, j);
    }
    t.set(z, j, zj);
}

pub(crate) fn exp_rev<F: Float>(
    t: &CoeffBuffer<F>,
    p: &mut CoeffBuffer<F>,
    d: usize,
    x: usize,
    z: usize,
    minus_one: bool,
) {
    for j in (1..=d).rev() {
        if minus_one {
            p.add(x, j, p.get(z, j));
        }
        let pzj = p.get(z, j) / from_usize(j);
        p.set(z, j, pzj);
        for k in 1..=j {
            let kf: F = from_usize(k);
            p.add(x, k, kf * azmul(pzj, t.get(z, j - k)));
            p.add(z, j - k, kf * azmul(pzj, t.get(x, k)));
        }
    }
    let z0 = t.get(z, 0);
    let dz = if minus_one { z0 + F::one() } else { z0 };
    p.add(x, 0, azmul(p.get(z, 0), dz));
}

// ── log / log1p ──

/// `z = log(x)`, or `z = log(1 + x)` when `plus_one`.
pub(crate) fn log<F: Float>(t: &mut CoeffBuffer<F>, j: usize, x: usize, z: usize, plus_one: bool) {
    let x0 = t.get(x, 0);
    if j == 0 {
        t.set(z, 0, if plus_one { x0.ln_1p() } else { x0.ln() });
        return;
    }
    let base = if plus_one { F::one() + x0 } else { x0 };
    let mut sum = F::zero();
    for k in 1..j {
        sum = sum + from_usize::<F>(k) * t.get(z, k) * t.get(x, j - k);
    }
    t.set(z, j, (t.get(x, j) - sum / from_usize(j)) / base);
}

pub(crate) fn log_rev<F: Float>(
    t: &CoeffBuffer<F>,
    p: &mut CoeffBuffer<F>,
    d: usize,
    x: usize,
    z: usize,
    plus_one: bool,
) {
    let x0 = t.get(x, 0);
    let inv = F::one() / if plus_one { F::one() + x0 } else { x0 };
    for j in (1..=d).rev() {
        let pzj = azmul(p.get(z, j), inv);
        p.add(x, 0, -azmul(pzj, t.get(z, j)));
        p.add(x, j, pzj);
        let pzj = pzj / from_usize(j);
        for k in 1..j {
            let kf: F = from_usize(k);
            p.add(z, k, -kf * azmul(pzj, t.get(x, j - k)));
            p.add(x, j - k, -kf * azmul(pzj, t.get(z, k)));
        }
    }
    p.add(x, 0, azmul(p.get(z, 0), inv));
}

// ── sqrt ──

pub(crate) fn sqrt<F: Float>(t: &mut CoeffBuffer<F>, j: usize, x: usize, z: usize) {
    if j == 0 {
        t.set(z, 0, t.get(x, 0).sqrt());
        return;
    }
    let mut sum = F::zero();
    for k in 1..j {
        sum = sum + t.get(z, k) * t.get(z, j - k);
    }
    let two = F::one() + F::one();
    t.set(z, j, (t.get(x, j) - sum) / (two * t.get(z, 0)));
}

pub(crate) fn sqrt_rev<F: Float>(t: &CoeffBuffer<F>, p: &mut CoeffBuffer<F>, d: usize, x: usize, z: usize) {
    let inv = F::one() / t.get(z, 0);
    let two = F::one() + F::one();
    for j in (1..=d).rev() {
        let pzj = azmul(p.get(z, j), inv);
        p.add(z, 0, -azmul(pzj, t.get(z, j)));
        p.add(x, j, pzj / two);
        for k in 1..j {
            p.add(z, k, -azmul(pzj, t.get(z, j - k)));
        }
    }
    p.add(x, 0, azmul(p.get(z, 0), inv) / two);
}
