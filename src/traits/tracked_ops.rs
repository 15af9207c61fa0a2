//! `std::ops` and comparison implementations for [`Tracked<F>`].
//!
//! Each operator records an opcode to the active recording. Comparisons
//! through `<`, `<=`, `>`, `>=` and `==` also record the outcome so that a
//! later zero-order sweep can report when it changes.

use std::cmp::Ordering;
use std::ops::{
    Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Rem, RemAssign, Sub, SubAssign,
};

use num_traits::Float as _;

use crate::opcode::OpCode;
use crate::recorder::TapeLocal;
use crate::tracked::{binary, record, unary, Operand, Tracked};

// ──────────────────────────────────────────────
//  Tracked<F> ↔ Tracked<F> operators
// ──────────────────────────────────────────────

impl<F: TapeLocal> Add for Tracked<F> {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        binary(self, rhs, self.value + rhs.value, OpCode::AddVv, OpCode::AddPv, None)
    }
}

impl<F: TapeLocal> Sub for Tracked<F> {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        binary(
            self,
            rhs,
            self.value - rhs.value,
            OpCode::SubVv,
            OpCode::SubPv,
            Some(OpCode::SubVp),
        )
    }
}

impl<F: TapeLocal> Mul for Tracked<F> {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        binary(self, rhs, self.value * rhs.value, OpCode::MulVv, OpCode::MulPv, None)
    }
}

impl<F: TapeLocal> Div for Tracked<F> {
    type Output = Self;
    #[inline]
    fn div(self, rhs: Self) -> Self {
        binary(
            self,
            rhs,
            self.value / rhs.value,
            OpCode::DivVv,
            OpCode::DivPv,
            Some(OpCode::DivVp),
        )
    }
}

impl<F: TapeLocal> Neg for Tracked<F> {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        unary(self, OpCode::Neg, -self.value)
    }
}

/// `x % y == x - y * trunc(x / y)`; the truncation is a discrete call, so the
/// derivative is that of `x - c * y` for the recorded quotient `c`.
impl<F: TapeLocal> Rem for Tracked<F> {
    type Output = Self;
    #[inline]
    fn rem(self, rhs: Self) -> Self {
        let q = (self / rhs).trunc();
        self - rhs * q
    }
}

impl<F: TapeLocal> AddAssign for Tracked<F> {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl<F: TapeLocal> SubAssign for Tracked<F> {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl<F: TapeLocal> MulAssign for Tracked<F> {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl<F: TapeLocal> DivAssign for Tracked<F> {
    #[inline]
    fn div_assign(&mut self, rhs: Self) {
        *self = *self / rhs;
    }
}

impl<F: TapeLocal> RemAssign for Tracked<F> {
    #[inline]
    fn rem_assign(&mut self, rhs: Self) {
        *self = *self % rhs;
    }
}

// ──────────────────────────────────────────────
//  Mixed ops: Tracked<F> with primitive floats
// ──────────────────────────────────────────────

// The primitive is a parameter; the std op above picks the pv/vp form.
macro_rules! impl_tracked_scalar_ops {
    ($f:ty) => {
        impl Add<$f> for Tracked<$f> {
            type Output = Tracked<$f>;
            #[inline]
            fn add(self, rhs: $f) -> Tracked<$f> {
                self + Tracked::constant(rhs)
            }
        }

        impl Add<Tracked<$f>> for $f {
            type Output = Tracked<$f>;
            #[inline]
            fn add(self, rhs: Tracked<$f>) -> Tracked<$f> {
                Tracked::constant(self) + rhs
            }
        }

        impl Sub<$f> for Tracked<$f> {
            type Output = Tracked<$f>;
            #[inline]
            fn sub(self, rhs: $f) -> Tracked<$f> {
                self - Tracked::constant(rhs)
            }
        }

        impl Sub<Tracked<$f>> for $f {
            type Output = Tracked<$f>;
            #[inline]
            fn sub(self, rhs: Tracked<$f>) -> Tracked<$f> {
                Tracked::constant(self) - rhs
            }
        }

        impl Mul<$f> for Tracked<$f> {
            type Output = Tracked<$f>;
            #[inline]
            fn mul(self, rhs: $f) -> Tracked<$f> {
                self * Tracked::constant(rhs)
            }
        }

        impl Mul<Tracked<$f>> for $f {
            type Output = Tracked<$f>;
            #[inline]
            fn mul(self, rhs: Tracked<$f>) -> Tracked<$f> {
                Tracked::constant(self) * rhs
            }
        }

        impl Div<$f> for Tracked<$f> {
            type Output = Tracked<$f>;
            #[inline]
            fn div(self, rhs: $f) -> Tracked<$f> {
                self / Tracked::constant(rhs)
            }
        }

        impl Div<Tracked<$f>> for $f {
            type Output = Tracked<$f>;
            #[inline]
            fn div(self, rhs: Tracked<$f>) -> Tracked<$f> {
                Tracked::constant(self) / rhs
            }
        }

        impl Rem<$f> for Tracked<$f> {
            type Output = Tracked<$f>;
            #[inline]
            fn rem(self, rhs: $f) -> Tracked<$f> {
                self % Tracked::constant(rhs)
            }
        }

        impl Rem<Tracked<$f>> for $f {
            type Output = Tracked<$f>;
            #[inline]
            fn rem(self, rhs: Tracked<$f>) -> Tracked<$f> {
                Tracked::constant(self) % rhs
            }
        }

        impl AddAssign<$f> for Tracked<$f> {
            #[inline]
            fn add_assign(&mut self, rhs: $f) {
                *self = *self + rhs;
            }
        }

        impl SubAssign<$f> for Tracked<$f> {
            #[inline]
            fn sub_assign(&mut self, rhs: $f) {
                *self = *self - rhs;
            }
        }

        impl MulAssign<$f> for Tracked<$f> {
            #[inline]
            fn mul_assign(&mut self, rhs: $f) {
                *self = *self * rhs;
            }
        }

        impl DivAssign<$f> for Tracked<$f> {
            #[inline]
            fn div_assign(&mut self, rhs: $f) {
                *self = *self / rhs;
            }
        }

        impl PartialEq<$f> for Tracked<$f> {
            fn eq(&self, other: &$f) -> bool {
                *self == Tracked::constant(*other)
            }
        }

        impl PartialOrd<$f> for Tracked<$f> {
            fn partial_cmp(&self, other: &$f) -> Option<Ordering> {
                self.value.partial_cmp(other)
            }

            fn lt(&self, other: &$f) -> bool {
                *self < Tracked::constant(*other)
            }

            fn le(&self, other: &$f) -> bool {
                *self <= Tracked::constant(*other)
            }

            fn gt(&self, other: &$f) -> bool {
                *self > Tracked::constant(*other)
            }

            fn ge(&self, other: &$f) -> bool {
                *self >= Tracked::constant(*other)
            }
        }
    };
}

impl_tracked_scalar_ops!(f32);
impl_tracked_scalar_ops!(f64);

// ──────────────────────────────────────────────
//  Comparisons
// ──────────────────────────────────────────────

/// The comparison opcodes that can hold between two operands. Greater-than
/// forms are expressed by swapping operands.
#[derive(Clone, Copy)]
enum Rel {
    Lt,
    Le,
    Eq,
    Ne,
}

impl Rel {
    /// (pv, vp, vv) opcodes; `Eq`/`Ne` are symmetric and have no vp form.
    fn opcodes(self) -> (OpCode, Option<OpCode>, OpCode) {
        match self {
            Rel::Lt => (OpCode::LtPv, Some(OpCode::LtVp), OpCode::LtVv),
            Rel::Le => (OpCode::LePv, Some(OpCode::LeVp), OpCode::LeVv),
            Rel::Eq => (OpCode::EqPv, None, OpCode::EqVv),
            Rel::Ne => (OpCode::NePv, None, OpCode::NeVv),
        }
    }
}

/// Record that `left rel right` held during recording. Pure parameter
/// comparisons are not recorded.
fn record_compare<F: TapeLocal>(rel: Rel, left: &Tracked<F>, right: &Tracked<F>) {
    let (pv, vp, vv) = rel.opcodes();
    record(F::zero(), &[left, right], |rec| {
        let put = match (left.operand(rec), right.operand(rec)) {
            (Operand::Par(_), Operand::Par(_)) => return None,
            (Operand::Var(a), Operand::Var(b)) => rec.put_op(vv, &[a.raw(), b.raw()]),
            (Operand::Par(p), Operand::Var(b)) => {
                let c = rec.put_constant(p);
                rec.put_op(pv, &[c.raw(), b.raw()])
            }
            (Operand::Var(a), Operand::Par(p)) => {
                let c = rec.put_constant(p);
                match vp {
                    Some(op) => rec.put_op(op, &[a.raw(), c.raw()]),
                    None => rec.put_op(pv, &[c.raw(), a.raw()]),
                }
            }
        };
        Some(put)
    });
}

/// Evaluate `a < b` (strict) or `a <= b` and record whichever relation held.
fn less<F: TapeLocal>(a: &Tracked<F>, b: &Tracked<F>, strict: bool) -> bool {
    let outcome = if strict {
        a.value < b.value
    } else {
        a.value <= b.value
    };
    match (strict, outcome) {
        (true, true) => record_compare(Rel::Lt, a, b),
        (true, false) => record_compare(Rel::Le, b, a),
        (false, true) => record_compare(Rel::Le, a, b),
        (false, false) => record_compare(Rel::Lt, b, a),
    }
    outcome
}

impl<F: TapeLocal> PartialEq for Tracked<F> {
    fn eq(&self, other: &Self) -> bool {
        let outcome = self.value == other.value;
        let rel = if outcome { Rel::Eq } else { Rel::Ne };
        record_compare(rel, self, other);
        outcome
    }
}

/// `partial_cmp` only inspects values; the operator forms record.
impl<F: TapeLocal> PartialOrd for Tracked<F> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.value.partial_cmp(&other.value)
    }

    fn lt(&self, other: &Self) -> bool {
        less(self, other, true)
    }

    fn le(&self, other: &Self) -> bool {
        less(self, other, false)
    }

    fn gt(&self, other: &Self) -> bool {
        less(other, self, true)
    }

    fn ge(&self, other: &Self) -> bool {
        less(other, self, false)
    }
}
