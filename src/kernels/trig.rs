//! Trigonometric and hyperbolic kernels.
//!
//! Each of these operators carries an auxiliary result: the companion
//! function (`cos` for `sin`, ...), `tan²`, `sqrt(1 - x²)` or `1 + x²`.
//! Callers pass the auxiliary and primary addresses explicitly.

use crate::buffer::CoeffBuffer;
use crate::float::{azmul, from_usize, Float};

// ── sin/cos and sinh/cosh ──

/// Order `j` of the pair `s = sin(x)`, `c = cos(x)` (or `sinh`, `cosh` when
/// `hyperbolic`). Both rows are written whichever is primary.
pub(crate) fn sin_cos<F: Float>(
    t: &mut CoeffBuffer<F>,
    j: usize,
    x: usize,
    s: usize,
    c: usize,
    hyperbolic: bool,
) {
    if j == 0 {
        let x0 = t.get(x, 0);
        if hyperbolic {
            t.set(s, 0, x0.sinh());
            t.set(c, 0, x0.cosh());
        } else {
            let (sv, cv) = x0.sin_cos();
            t.set(s, 0, sv);
            t.set(c, 0, cv);
        }
        return;
    }
    let mut ss = F::zero();
    let mut cs = F::zero();
    for k in 1..=j {
        let kx = from_usize::<F>(k) * t.get(x, k);
        ss = ss + kx * t.get(c, j - k);
        cs = cs + kx * t.get(s, j - k);
    }
    let jf: F = from_usize(j);
    t.set(s, j, ss / jf);
    t.set(c, j, if hyperbolic { cs / jf } else { -cs / jf });
}

pub(crate) fn sin_cos_rev<F: Float>(
    t: &CoeffBuffer<F>,
    p: &mut CoeffBuffer<F>,
    d: usize,
    x: usize,
    s: usize,
    c: usize,
    hyperbolic: bool,
) {
    // d/dx cos = -sin, d/dx cosh = sinh
    let sgn = if hyperbolic { F::one() } else { -F::one() };
    for j in (1..=d).rev() {
        let jf: F = from_usize(j);
        let psj = p.get(s, j) / jf;
        let pcj = p.get(c, j) / jf;
        for k in 1..=j {
            let kf: F = from_usize(k);
            let xk = t.get(x, k);
            p.add(
                x,
                k,
                kf * azmul(psj, t.get(c, j - k)) + sgn * kf * azmul(pcj, t.get(s, j - k)),
            );
            p.add(s, j - k, sgn * kf * azmul(pcj, xk));
            p.add(c, j - k, kf * azmul(psj, xk));
        }
    }
    let d0 = azmul(p.get(s, 0), t.get(c, 0)) + sgn * azmul(p.get(c, 0), t.get(s, 0));
    p.add(x, 0, d0);
}

// ── tan / tanh ──

/// `z = tan(x)` with auxiliary `y = z²` (or `tanh` when `hyperbolic`).
pub(crate) fn tan<F: Float>(
    t: &mut CoeffBuffer<F>,
    j: usize,
    x: usize,
    y: usize,
    z: usize,
    hyperbolic: bool,
) {
    if j == 0 {
        let x0 = t.get(x, 0);
        let z0 = if hyperbolic { x0.tanh() } else { x0.tan() };
        t.set(z, 0, z0);
        t.set(y, 0, z0 * z0);
        return;
    }
    let mut sum = F::zero();
    for k in 1..=j {
        sum = sum + from_usize::<F>(k) * t.get(x, k) * t.get(y, j - k);
    }
    let sum = sum / from_usize(j);
    let zj = if hyperbolic {
        t.get(x, j) - sum
    } else {
        t.get(x, j) + sum
    };
    t.set(z, j, zj);
    let mut yj = F::zero();
    for k in 0..=j {
        yj = yj + t.get(z, k) * t.get(z, j - k);
    }
    t.set(y, j, yj);
}

pub(crate) fn tan_rev<F: Float>(
    t: &CoeffBuffer<F>,
    p: &mut CoeffBuffer<F>,
    d: usize,
    x: usize,
    y: usize,
    z: usize,
    hyperbolic: bool,
) {
    let sgn = if hyperbolic { -F::one() } else { F::one() };
    let two = F::one() + F::one();
    for j in (1..=d).rev() {
        p.add(x, j, p.get(z, j));
        let pzj = p.get(z, j) / from_usize(j);
        for k in 1..=j {
            let kf: F = from_usize(k);
            p.add(x, k, sgn * kf * azmul(pzj, t.get(y, j - k)));
            p.add(y, j - k, sgn * kf * azmul(pzj, t.get(x, k)));
        }
        // y[j-1] = sum z[k] z[j-1-k]
        let pyj = p.get(y, j - 1);
        for k in 0..j {
            p.add(z, k, two * azmul(pyj, t.get(z, j - 1 - k)));
        }
    }
    p.add(x, 0, azmul(p.get(z, 0), F::one() + sgn * t.get(y, 0)));
}

// ── asin / acos ──

/// `z = asin(x)` (or `acos` when `negate`) with auxiliary `b = sqrt(1 - x²)`.
pub(crate) fn asin<F: Float>(
    t: &mut CoeffBuffer<F>,
    j: usize,
    x: usize,
    b: usize,
    z: usize,
    negate: bool,
) {
    if j == 0 {
        let x0 = t.get(x, 0);
        t.set(b, 0, (F::one() - x0 * x0).sqrt());
        t.set(z, 0, if negate { x0.acos() } else { x0.asin() });
        return;
    }
    let jf: F = from_usize(j);
    let two = F::one() + F::one();
    let b0 = t.get(b, 0);
    let mut u = F::zero();
    for k in 0..=j {
        u = u - t.get(x, k) * t.get(x, j - k);
    }
    let mut bs = F::zero();
    let mut zs = F::zero();
    for k in 1..j {
        let kf: F = from_usize(k);
        bs = bs + kf * t.get(b, k) * t.get(b, j - k);
        zs = zs + kf * t.get(z, k) * t.get(b, j - k);
    }
    t.set(b, j, (u / two - bs / jf) / b0);
    let xj = if negate { -t.get(x, j) } else { t.get(x, j) };
    t.set(z, j, (xj - zs / jf) / b0);
}

pub(crate) fn asin_rev<F: Float>(
    t: &CoeffBuffer<F>,
    p: &mut CoeffBuffer<F>,
    d: usize,
    x: usize,
    b: usize,
    z: usize,
    negate: bool,
) {
    let sgn = if negate { -F::one() } else { F::one() };
    let x0 = t.get(x, 0);
    let inv = F::one() / t.get(b, 0);
    for j in (1..=d).rev() {
        let pbj = azmul(p.get(b, j), inv);
        let pzj = azmul(p.get(z, j), inv);
        p.add(b, 0, -(azmul(pzj, t.get(z, j)) + azmul(pbj, t.get(b, j))));
        p.add(x, 0, -azmul(pbj, t.get(x, j)));
        p.add(x, j, sgn * pzj - azmul(pbj, x0));
        let pzj = pzj / from_usize(j);
        for k in 1..j {
            let kf: F = from_usize(k);
            p.add(
                b,
                j - k,
                -(kf * azmul(pzj, t.get(z, k)) + azmul(pbj, t.get(b, k))),
            );
            p.add(x, k, -azmul(pbj, t.get(x, j - k)));
            p.add(z, k, -kf * azmul(pzj, t.get(b, j - k)));
        }
    }
    let d0 = sgn * p.get(z, 0) - azmul(p.get(b, 0), x0);
    p.add(x, 0, azmul(d0, inv));
}

// ── atan ──

/// `z = atan(x)` with auxiliary `b = 1 + x²`.
pub(crate) fn atan<F: Float>(t: &mut CoeffBuffer<F>, j: usize, x: usize, b: usize, z: usize) {
    if j == 0 {
        let x0 = t.get(x, 0);
        t.set(b, 0, F::one() + x0 * x0);
        t.set(z, 0, x0.atan());
        return;
    }
    let mut bj = F::zero();
    for k in 0..=j {
        bj = bj + t.get(x, k) * t.get(x, j - k);
    }
    t.set(b, j, bj);
    let mut zs = F::zero();
    for k in 1..j {
        zs = zs + from_usize::<F>(k) * t.get(z, k) * t.get(b, j - k);
    }
    t.set(z, j, (t.get(x, j) - zs / from_usize(j)) / t.get(b, 0));
}

pub(crate) fn atan_rev<F: Float>(
    t: &CoeffBuffer<F>,
    p: &mut CoeffBuffer<F>,
    d: usize,
    x: usize,
    b: usize,
    z: usize,
) {
    let two = F::one() + F::one();
    let x0 = t.get(x, 0);
    let inv = F::one() / t.get(b, 0);
    for j in (1..=d).rev() {
        let pbj = p.get(b, j);
        let pzj = azmul(p.get(z, j), inv);
        p.add(b, 0, -azmul(pzj, t.get(z, j)));
        p.add(x, j, pzj + two * azmul(pbj, x0));
        p.add(x, 0, two * azmul(pbj, t.get(x, j)));
        let pzj = pzj / from_usize(j);
        for k in 1..j {
            let kf: F = from_usize(k);
            p.add(b, j - k, -kf * azmul(pzj, t.get(z, k)));
            p.add(z, k, -kf * azmul(pzj, t.get(b, j - k)));
            p.add(x, k, two * azmul(pbj, t.get(x, j - k)));
        }
    }
    p.add(x, 0, azmul(p.get(z, 0), inv) + two * azmul(p.get(b, 0), x0));
}
