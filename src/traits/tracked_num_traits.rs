//! `num_traits` implementations for [`Tracked<F>`].
//!
//! Functions with a dedicated opcode record that opcode. Everything else is
//! composed from recorded primitives, so the value computed while recording
//! is exactly the value a zero-order replay produces. Rounding goes through
//! the built-in discrete functions; `max`, `min`, `cbrt` and `atan2` go through
//! conditional expressions so the branch is re-decided on every replay.

use std::num::FpCategory;

use num_traits::{
    Float as NumFloat, FloatConst, FromPrimitive, Num, NumCast, One, Signed, ToPrimitive, Zero,
};

use crate::discrete;
use crate::float::Float;
use crate::kernels::arith::sign;
use crate::opcode::OpCode;
use crate::recorder::TapeLocal;
use crate::tracked::{binary, cond_exp_eq, cond_exp_gt, cond_exp_lt, unary, Tracked};

// ── Helpers ──

#[inline]
fn konst<F: Float>(v: F) -> Tracked<F> {
    Tracked::constant(v)
}

/// Build `F` from an `f64` literal.
#[inline]
fn lit<F: Float>(v: f64) -> F {
    F::from_f64(v).unwrap_or_else(F::nan)
}

// ══════════════════════════════════════════════
//  Basic numeric traits
// ══════════════════════════════════════════════

impl<F: TapeLocal> Zero for Tracked<F> {
    #[inline]
    fn zero() -> Self {
        konst(F::zero())
    }
    #[inline]
    fn is_zero(&self) -> bool {
        self.value.is_zero()
    }
}

impl<F: TapeLocal> One for Tracked<F> {
    #[inline]
    fn one() -> Self {
        konst(F::one())
    }
}

impl<F: TapeLocal> Num for Tracked<F> {
    type FromStrRadixErr = F::FromStrRadixErr;
    fn from_str_radix(str: &str, radix: u32) -> Result<Self, Self::FromStrRadixErr> {
        F::from_str_radix(str, radix).map(Tracked::constant)
    }
}

impl<F: Float> FromPrimitive for Tracked<F> {
    #[inline]
    fn from_i64(n: i64) -> Option<Self> {
        F::from_i64(n).map(Tracked::constant)
    }
    #[inline]
    fn from_u64(n: u64) -> Option<Self> {
        F::from_u64(n).map(Tracked::constant)
    }
    #[inline]
    fn from_f32(n: f32) -> Option<Self> {
        F::from_f32(n).map(Tracked::constant)
    }
    #[inline]
    fn from_f64(n: f64) -> Option<Self> {
        F::from_f64(n).map(Tracked::constant)
    }
}

impl<F: Float> ToPrimitive for Tracked<F> {
    #[inline]
    fn to_i64(&self) -> Option<i64> {
        self.value.to_i64()
    }
    #[inline]
    fn to_u64(&self) -> Option<u64> {
        self.value.to_u64()
    }
    #[inline]
    fn to_f32(&self) -> Option<f32> {
        self.value.to_f32()
    }
    #[inline]
    fn to_f64(&self) -> Option<f64> {
        self.value.to_f64()
    }
}

impl<F: TapeLocal> NumCast for Tracked<F> {
    #[inline]
    fn from<T: ToPrimitive>(n: T) -> Option<Self> {
        <F as NumCast>::from(n).map(Tracked::constant)
    }
}

// ══════════════════════════════════════════════
//  Signed
// ══════════════════════════════════════════════

impl<F: TapeLocal> Signed for Tracked<F> {
    #[inline]
    fn abs(&self) -> Self {
        NumFloat::abs(*self)
    }
    #[inline]
    fn abs_sub(&self, other: &Self) -> Self {
        NumFloat::abs_sub(*self, *other)
    }
    #[inline]
    fn signum(&self) -> Self {
        NumFloat::signum(*self)
    }
    #[inline]
    fn is_positive(&self) -> bool {
        self.value.is_sign_positive()
    }
    #[inline]
    fn is_negative(&self) -> bool {
        self.value.is_sign_negative()
    }
}

// ══════════════════════════════════════════════
//  FloatConst
// ══════════════════════════════════════════════

impl<F: TapeLocal> FloatConst for Tracked<F> {
    fn E() -> Self {
        konst(F::E())
    }
    fn FRAC_1_PI() -> Self {
        konst(F::FRAC_1_PI())
    }
    fn FRAC_1_SQRT_2() -> Self {
        konst(F::FRAC_1_SQRT_2())
    }
    fn FRAC_2_PI() -> Self {
        konst(F::FRAC_2_PI())
    }
    fn FRAC_2_SQRT_PI() -> Self {
        konst(F::FRAC_2_SQRT_PI())
    }
    fn FRAC_PI_2() -> Self {
        konst(F::FRAC_PI_2())
    }
    fn FRAC_PI_3() -> Self {
        konst(F::FRAC_PI_3())
    }
    fn FRAC_PI_4() -> Self {
        konst(F::FRAC_PI_4())
    }
    fn FRAC_PI_6() -> Self {
        konst(F::FRAC_PI_6())
    }
    fn FRAC_PI_8() -> Self {
        konst(F::FRAC_PI_8())
    }
    fn LN_10() -> Self {
        konst(F::LN_10())
    }
    fn LN_2() -> Self {
        konst(F::LN_2())
    }
    fn LOG10_E() -> Self {
        konst(F::LOG10_E())
    }
    fn LOG2_E() -> Self {
        konst(F::LOG2_E())
    }
    fn PI() -> Self {
        konst(F::PI())
    }
    fn SQRT_2() -> Self {
        konst(F::SQRT_2())
    }
    fn TAU() -> Self {
        konst(F::TAU())
    }
    fn LOG10_2() -> Self {
        konst(F::LOG10_2())
    }
    fn LOG2_10() -> Self {
        konst(F::LOG2_10())
    }
}

// ══════════════════════════════════════════════
//  Float (num_traits::Float)
// ══════════════════════════════════════════════

impl<F: TapeLocal> NumFloat for Tracked<F> {
    fn nan() -> Self {
        konst(F::nan())
    }
    fn infinity() -> Self {
        konst(F::infinity())
    }
    fn neg_infinity() -> Self {
        konst(F::neg_infinity())
    }
    fn neg_zero() -> Self {
        konst(F::neg_zero())
    }

    fn min_value() -> Self {
        konst(F::min_value())
    }
    fn min_positive_value() -> Self {
        konst(F::min_positive_value())
    }
    fn max_value() -> Self {
        konst(F::max_value())
    }
    fn epsilon() -> Self {
        konst(F::epsilon())
    }

    fn is_nan(self) -> bool {
        self.value.is_nan()
    }
    fn is_infinite(self) -> bool {
        self.value.is_infinite()
    }
    fn is_finite(self) -> bool {
        self.value.is_finite()
    }
    fn is_normal(self) -> bool {
        self.value.is_normal()
    }
    fn is_sign_positive(self) -> bool {
        self.value.is_sign_positive()
    }
    fn is_sign_negative(self) -> bool {
        self.value.is_sign_negative()
    }
    fn classify(self) -> FpCategory {
        self.value.classify()
    }

    // ── Rounding: piecewise constant, re-evaluated on replay ──

    fn floor(self) -> Self {
        discrete::floor().call(self)
    }
    fn ceil(self) -> Self {
        discrete::ceil().call(self)
    }
    fn round(self) -> Self {
        discrete::round().call(self)
    }
    fn trunc(self) -> Self {
        discrete::trunc().call(self)
    }
    fn fract(self) -> Self {
        self - self.trunc()
    }
    fn abs(self) -> Self {
        unary(self, OpCode::Abs, self.value.abs())
    }
    /// Zero at zero, unlike `f64::signum`.
    fn signum(self) -> Self {
        unary(self, OpCode::Sign, sign(self.value))
    }

    fn mul_add(self, a: Self, b: Self) -> Self {
        self * a + b
    }

    fn recip(self) -> Self {
        konst(F::one()) / self
    }

    /// Square-and-multiply, so the derivative stays finite at zero.
    fn powi(self, n: i32) -> Self {
        let mut base = self;
        let mut e = n.unsigned_abs();
        let mut acc: Option<Self> = None;
        while e > 0 {
            if e & 1 == 1 {
                acc = Some(match acc {
                    Some(a) => a * base,
                    None => base,
                });
            }
            e >>= 1;
            if e > 0 {
                base = base * base;
            }
        }
        let pos = acc.unwrap_or_else(Self::one);
        if n < 0 {
            pos.recip()
        } else {
            pos
        }
    }

    fn powf(self, n: Self) -> Self {
        binary(
            self,
            n,
            self.value.powf(n.value),
            OpCode::PowVv,
            OpCode::PowPv,
            Some(OpCode::PowVp),
        )
    }

    fn sqrt(self) -> Self {
        unary(self, OpCode::Sqrt, self.value.sqrt())
    }
    /// Sign and magnitude are both recorded, so the branch on the sign of
    /// the argument is redecided on replay.
    fn cbrt(self) -> Self {
        let third = konst(F::one() / lit(3.0));
        NumFloat::signum(self) * NumFloat::abs(self).powf(third)
    }

    fn exp(self) -> Self {
        unary(self, OpCode::Exp, self.value.exp())
    }
    fn exp2(self) -> Self {
        (self * konst(F::LN_2())).exp()
    }
    fn exp_m1(self) -> Self {
        unary(self, OpCode::Expm1, self.value.exp_m1())
    }
    fn ln(self) -> Self {
        unary(self, OpCode::Log, self.value.ln())
    }
    fn log2(self) -> Self {
        self.ln() * konst(F::LOG2_E())
    }
    fn log10(self) -> Self {
        self.ln() * konst(F::LOG10_E())
    }
    fn ln_1p(self) -> Self {
        unary(self, OpCode::Log1p, self.value.ln_1p())
    }
    fn log(self, base: Self) -> Self {
        self.ln() / base.ln()
    }

    fn sin(self) -> Self {
        unary(self, OpCode::Sin, self.value.sin())
    }
    fn cos(self) -> Self {
        unary(self, OpCode::Cos, self.value.cos())
    }
    fn tan(self) -> Self {
        unary(self, OpCode::Tan, self.value.tan())
    }
    fn sin_cos(self) -> (Self, Self) {
        (self.sin(), self.cos())
    }
    fn asin(self) -> Self {
        unary(self, OpCode::Asin, self.value.asin())
    }
    fn acos(self) -> Self {
        unary(self, OpCode::Acos, self.value.acos())
    }
    fn atan(self) -> Self {
        unary(self, OpCode::Atan, self.value.atan())
    }

    /// Four-quadrant arctangent of `self / other`, assembled from `atan` of
    /// the smaller ratio and three conditional reflections.
    fn atan2(self, other: Self) -> Self {
        let (y, x) = (self, other);
        let zero = Self::zero();
        let (ax, ay) = (NumFloat::abs(x), NumFloat::abs(y));
        let half_pi = konst(F::FRAC_PI_2());
        let pi = konst(F::PI());

        // atan2(0, 0) is zero, as for plain floats
        let ax_safe = cond_exp_eq(ax, zero, Self::one(), ax);
        let alpha = (ay / ax_safe).atan();
        let beta = half_pi - (ax / ay).atan();
        let first = cond_exp_gt(ay, ax, beta, alpha);
        let second = cond_exp_lt(x, zero, pi - first, first);
        cond_exp_lt(y, zero, -second, second)
    }

    fn sinh(self) -> Self {
        unary(self, OpCode::Sinh, self.value.sinh())
    }
    fn cosh(self) -> Self {
        unary(self, OpCode::Cosh, self.value.cosh())
    }
    fn tanh(self) -> Self {
        unary(self, OpCode::Tanh, self.value.tanh())
    }
    fn asinh(self) -> Self {
        (self + (self * self + Self::one()).sqrt()).ln()
    }
    fn acosh(self) -> Self {
        (self + (self * self - Self::one()).sqrt()).ln()
    }
    fn atanh(self) -> Self {
        (self.ln_1p() - (-self).ln_1p()) * konst(lit(0.5))
    }

    fn hypot(self, other: Self) -> Self {
        (self * self + other * other).sqrt()
    }

    fn max(self, other: Self) -> Self {
        cond_exp_lt(self, other, other, self)
    }

    fn min(self, other: Self) -> Self {
        cond_exp_lt(self, other, self, other)
    }

    fn abs_sub(self, other: Self) -> Self {
        cond_exp_gt(self, other, self - other, Self::zero())
    }

    fn integer_decode(self) -> (u64, i16, i8) {
        self.value.integer_decode()
    }

    fn to_degrees(self) -> Self {
        self * konst(lit::<F>(180.0) / F::PI())
    }

    fn to_radians(self) -> Self {
        self * konst(F::PI() / lit(180.0))
    }
}
