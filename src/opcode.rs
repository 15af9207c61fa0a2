//! The closed opcode table.
//!
//! Each opcode has a fixed number of argument slots and result slots, except
//! [`OpCode::CSum`], [`OpCode::CSkip`] and [`OpCode::Call`], whose lengths are
//! stored in their own leading arguments. Multi-result opcodes name their
//! results in address order; the primary result is always the last one.

use crate::error::AdError;

/// Comparison kinds used by compare, conditional-expression and
/// conditional-skip operators.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CompareOp {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
    Ne,
}

impl CompareOp {
    #[inline]
    pub fn eval<F: PartialOrd>(self, left: F, right: F) -> bool {
        match self {
            CompareOp::Lt => left < right,
            CompareOp::Le => left <= right,
            CompareOp::Eq => left == right,
            CompareOp::Ge => left >= right,
            CompareOp::Gt => left > right,
            CompareOp::Ne => left != right,
        }
    }

    #[inline]
    pub(crate) fn encode(self) -> u32 {
        self as u32
    }

    pub(crate) fn decode(raw: u32) -> Result<Self, AdError> {
        Ok(match raw {
            0 => CompareOp::Lt,
            1 => CompareOp::Le,
            2 => CompareOp::Eq,
            3 => CompareOp::Ge,
            4 => CompareOp::Gt,
            5 => CompareOp::Ne,
            _ => return Err(AdError::internal(format!("bad comparison code {raw}"))),
        })
    }
}

/// Flag bits of a conditional expression's second argument: bit `i` set means
/// operand `i` (left, right, if_true, if_false) is a variable address.
pub(crate) const CEXP_LEFT_VAR: u32 = 1;
pub(crate) const CEXP_RIGHT_VAR: u32 = 2;
pub(crate) const CEXP_TRUE_VAR: u32 = 4;
pub(crate) const CEXP_FALSE_VAR: u32 = 8;

/// Flag bits of a print operator's first argument.
pub(crate) const PRI_POS_VAR: u32 = 1;
pub(crate) const PRI_VALUE_VAR: u32 = 2;

/// Operand kind tag used inside an atomic call's argument block.
pub(crate) const CALL_PAR: u32 = 0;
pub(crate) const CALL_VAR: u32 = 1;

/// Elementary operation codes.
///
/// Suffixes name the operand kinds in order: `V` is a variable address,
/// `P` is a constant-table index.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OpCode {
    // ── Structural ──
    /// Phantom variable at address 0.
    Begin,
    /// Independent variable.
    Inv,
    /// Constant promoted to a variable (used for parameter dependents).
    Par,
    End,

    // ── Binary arithmetic ──
    AddVv,
    AddPv,
    SubVv,
    SubVp,
    SubPv,
    MulVv,
    MulPv,
    DivVv,
    DivVp,
    DivPv,
    PowVv,
    PowPv,
    PowVp,

    // ── Unary ──
    Neg,
    Abs,
    Sign,
    Sqrt,

    // ── Exp / Log ──
    Exp,
    Expm1,
    Log,
    Log1p,

    // ── Trig ──
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,

    // ── Hyperbolic ──
    Sinh,
    Cosh,
    Tanh,

    // ── Variable length ──
    /// `[const, n_add, n_sub, add.., sub..]`
    CSum,
    /// `[cop, flags, left, right, n_true, n_false, op..]`
    CSkip,
    /// `[atomic, call_id, n, m, (kind, index) * n, (kind, index) * m]`
    Call,

    // ── Conditionals and comparisons ──
    /// `[cop, flags, left, right, if_true, if_false]`
    CExp,
    LtPv,
    LtVp,
    LtVv,
    LePv,
    LeVp,
    LeVv,
    EqPv,
    EqVv,
    NePv,
    NeVv,

    // ── Discrete and VecAD ──
    /// `[discrete, x]`
    Dis,
    /// `[vec_offset, index_const, load_id]`
    LdP,
    /// `[vec_offset, index_var, load_id]`
    LdV,
    /// `[vec_offset, index, value]`
    StPP,
    StPV,
    StVP,
    StVV,

    // ── Output ──
    /// `[flags, pos, before_text, value, after_text]`
    Pri,
}

impl OpCode {
    /// Number of argument slots, or `None` for variable-length opcodes.
    pub fn num_arg(self) -> Option<usize> {
        use OpCode::*;
        Some(match self {
            Begin | Inv | End => 0,
            Par => 1,
            Neg | Abs | Sign | Sqrt | Exp | Expm1 | Log | Log1p | Sin | Cos | Tan | Asin
            | Acos | Atan | Sinh | Cosh | Tanh => 1,
            AddVv | AddPv | SubVv | SubVp | SubPv | MulVv | MulPv | DivVv | DivVp | DivPv
            | PowVv | PowPv | PowVp => 2,
            LtPv | LtVp | LtVv | LePv | LeVp | LeVv | EqPv | EqVv | NePv | NeVv => 2,
            Dis => 2,
            LdP | LdV | StPP | StPV | StVP | StVV => 3,
            Pri => 5,
            CExp => 6,
            CSum | CSkip | Call => return None,
        })
    }

    /// Number of result slots, or `None` when it depends on the arguments.
    pub fn num_res(self) -> Option<usize> {
        if self == OpCode::Call {
            None
        } else {
            Some(self.result_names().len())
        }
    }

    /// Names of the result slots in address order. The last one is primary.
    pub fn result_names(self) -> &'static [&'static str] {
        use OpCode::*;
        match self {
            End | CSkip | Call | Pri => &[],
            LtPv | LtVp | LtVv | LePv | LeVp | LeVv | EqPv | EqVv | NePv | NeVv => &[],
            StPP | StPV | StVP | StVV => &[],
            Begin => &["phantom"],
            Inv => &["x"],
            Sin => &["cos", "sin"],
            Cos => &["sin", "cos"],
            Sinh => &["cosh", "sinh"],
            Cosh => &["sinh", "cosh"],
            Tan => &["tan_sq", "tan"],
            Tanh => &["tanh_sq", "tanh"],
            Asin => &["sqrt_1_minus_sq", "asin"],
            Acos => &["sqrt_1_minus_sq", "acos"],
            Atan => &["one_plus_sq", "atan"],
            PowVv => &["log_x", "y_log_x", "pow"],
            PowPv => &["y_log_p", "pow"],
            _ => &["z"],
        }
    }

    pub fn name(self) -> &'static str {
        use OpCode::*;
        match self {
            Begin => "Begin",
            Inv => "Inv",
            Par => "Par",
            End => "End",
            AddVv => "Addvv",
            AddPv => "Addpv",
            SubVv => "Subvv",
            SubVp => "Subvp",
            SubPv => "Subpv",
            MulVv => "Mulvv",
            MulPv => "Mulpv",
            DivVv => "Divvv",
            DivVp => "Divvp",
            DivPv => "Divpv",
            PowVv => "Powvv",
            PowPv => "Powpv",
            PowVp => "Powvp",
            Neg => "Neg",
            Abs => "Abs",
            Sign => "Sign",
            Sqrt => "Sqrt",
            Exp => "Exp",
            Expm1 => "Expm1",
            Log => "Log",
            Log1p => "Log1p",
            Sin => "Sin",
            Cos => "Cos",
            Tan => "Tan",
            Asin => "Asin",
            Acos => "Acos",
            Atan => "Atan",
            Sinh => "Sinh",
            Cosh => "Cosh",
            Tanh => "Tanh",
            CSum => "CSum",
            CSkip => "CSkip",
            Call => "Call",
            CExp => "CExp",
            LtPv => "Ltpv",
            LtVp => "Ltvp",
            LtVv => "Ltvv",
            LePv => "Lepv",
            LeVp => "Levp",
            LeVv => "Levv",
            EqPv => "Eqpv",
            EqVv => "Eqvv",
            NePv => "Nepv",
            NeVv => "Nevv",
            Dis => "Dis",
            LdP => "Ldp",
            LdV => "Ldv",
            StPP => "Stpp",
            StPV => "Stpv",
            StVP => "Stvp",
            StVV => "Stvv",
            Pri => "Pri",
        }
    }

    /// Comparison opcodes: they have no result and only feed compare-change counting.
    pub fn is_compare(self) -> bool {
        use OpCode::*;
        matches!(
            self,
            LtPv | LtVp | LtVv | LePv | LeVp | LeVv | EqPv | EqVv | NePv | NeVv
        )
    }

    /// Argument count of the operator whose arguments start at `args[0]`.
    pub(crate) fn arg_len(self, args: &[u32]) -> Result<usize, AdError> {
        if let Some(n) = self.num_arg() {
            return Ok(n);
        }
        let header = |i: usize| -> Result<usize, AdError> {
            args.get(i)
                .map(|&a| a as usize)
                .ok_or_else(|| AdError::internal(format!("{} header truncated", self.name())))
        };
        Ok(match self {
            OpCode::CSum => 3 + header(1)? + header(2)?,
            OpCode::CSkip => 6 + header(4)? + header(5)?,
            OpCode::Call => 4 + 2 * header(2)? + 2 * header(3)?,
            _ => unreachable!("fixed-length opcode"),
        })
    }

    /// Result count of the operator whose arguments are `args`.
    pub(crate) fn res_len(self, args: &[u32]) -> Result<usize, AdError> {
        if let Some(n) = self.num_res() {
            return Ok(n);
        }
        // Call: one variable slot per variable result.
        let n = args.get(2).copied().unwrap_or(0) as usize;
        let m = args.get(3).copied().unwrap_or(0) as usize;
        let results = args
            .get(4 + 2 * n..4 + 2 * n + 2 * m)
            .ok_or_else(|| AdError::internal("Call result block truncated"))?;
        Ok(results
            .chunks_exact(2)
            .filter(|pair| pair[0] == CALL_VAR)
            .count())
    }
}

/// Sizes of the tables an operator's arguments may point into.
pub(crate) struct ArgBounds {
    /// First result address of the operator being checked.
    pub first_result: u32,
    pub num_const: usize,
    pub num_text: usize,
    /// Index of the operator being checked.
    pub op_index: usize,
}

/// Check that every argument refers to something that already exists.
///
/// `args` must hold exactly the operator's arguments.
pub(crate) fn check_args(op: OpCode, args: &[u32], bounds: &ArgBounds) -> Result<(), AdError> {
    use OpCode::*;

    let var = |a: u32| -> Result<(), AdError> {
        if a == 0 || a >= bounds.first_result {
            Err(AdError::internal(format!(
                "{}: argument v{a} is not below result address v{}",
                op.name(),
                bounds.first_result
            )))
        } else {
            Ok(())
        }
    };
    let par = |a: u32| -> Result<(), AdError> {
        if (a as usize) < bounds.num_const {
            Ok(())
        } else {
            Err(AdError::internal(format!(
                "{}: constant index {a} out of range",
                op.name()
            )))
        }
    };
    let text = |a: u32| -> Result<(), AdError> {
        if (a as usize) < bounds.num_text {
            Ok(())
        } else {
            Err(AdError::internal(format!("{}: text index {a} out of range", op.name())))
        }
    };
    let either = |is_var: bool, a: u32| if is_var { var(a) } else { par(a) };

    match op {
        Begin | Inv | End => Ok(()),
        Par => par(args[0]),
        Neg | Abs | Sign | Sqrt | Exp | Expm1 | Log | Log1p | Sin | Cos | Tan | Asin | Acos
        | Atan | Sinh | Cosh | Tanh => var(args[0]),
        AddVv | SubVv | MulVv | DivVv | PowVv | LtVv | LeVv | EqVv | NeVv => {
            var(args[0])?;
            var(args[1])
        }
        AddPv | SubPv | MulPv | DivPv | PowPv | LtPv | LePv | EqPv | NePv => {
            par(args[0])?;
            var(args[1])
        }
        SubVp | DivVp | PowVp | LtVp | LeVp => {
            var(args[0])?;
            par(args[1])
        }
        Dis => var(args[1]),
        LdP => par(args[1]),
        LdV => var(args[1]),
        StPP => {
            par(args[1])?;
            par(args[2])
        }
        StPV => {
            par(args[1])?;
            var(args[2])
        }
        StVP => {
            var(args[1])?;
            par(args[2])
        }
        StVV => {
            var(args[1])?;
            var(args[2])
        }
        Pri => {
            either(args[0] & PRI_POS_VAR != 0, args[1])?;
            text(args[2])?;
            either(args[0] & PRI_VALUE_VAR != 0, args[3])?;
            text(args[4])
        }
        CExp => {
            CompareOp::decode(args[0])?;
            let flags = args[1];
            either(flags & CEXP_LEFT_VAR != 0, args[2])?;
            either(flags & CEXP_RIGHT_VAR != 0, args[3])?;
            either(flags & CEXP_TRUE_VAR != 0, args[4])?;
            either(flags & CEXP_FALSE_VAR != 0, args[5])
        }
        CSkip => {
            CompareOp::decode(args[0])?;
            either(args[1] & CEXP_LEFT_VAR != 0, args[2])?;
            either(args[1] & CEXP_RIGHT_VAR != 0, args[3])?;
            for &target in &args[6..] {
                if (target as usize) <= bounds.op_index {
                    return Err(AdError::internal(format!(
                        "CSkip at op {} targets earlier op {target}",
                        bounds.op_index
                    )));
                }
            }
            Ok(())
        }
        CSum => {
            par(args[0])?;
            args[3..].iter().try_for_each(|&a| var(a))
        }
        Call => {
            let n = args[2] as usize;
            for pair in args[4..4 + 2 * n].chunks_exact(2) {
                either(pair[0] == CALL_VAR, pair[1])?;
            }
            let mut next = bounds.first_result;
            for pair in args[4 + 2 * n..].chunks_exact(2) {
                match pair[0] {
                    CALL_VAR => {
                        if pair[1] != next {
                            return Err(AdError::internal(
                                "Call variable results are not consecutive",
                            ));
                        }
                        next += 1;
                    }
                    CALL_PAR => par(pair[1])?,
                    other => {
                        return Err(AdError::internal(format!("Call operand kind {other}")));
                    }
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_result_is_last() {
        assert_eq!(OpCode::Tanh.result_names(), &["tanh_sq", "tanh"]);
        assert_eq!(OpCode::PowVv.num_res(), Some(3));
        assert_eq!(OpCode::LtVv.num_res(), Some(0));
        assert_eq!(OpCode::Exp.num_res(), Some(1));
    }

    #[test]
    fn variable_length_headers() {
        // 1 add, 2 sub
        let csum = [0, 1, 2, 5, 6, 7];
        assert_eq!(OpCode::CSum.arg_len(&csum).unwrap(), 6);
        // n = 1, m = 2, one variable result
        let call = [0, 0, 1, 2, CALL_VAR, 3, CALL_VAR, 9, CALL_PAR, 0];
        assert_eq!(OpCode::Call.arg_len(&call).unwrap(), 10);
        assert_eq!(OpCode::Call.res_len(&call).unwrap(), 1);
    }

    #[test]
    fn rejects_forward_reference() {
        let bounds = ArgBounds {
            first_result: 4,
            num_const: 1,
            num_text: 0,
            op_index: 3,
        };
        assert!(check_args(OpCode::MulVv, &[1, 3], &bounds).is_ok());
        assert!(check_args(OpCode::MulVv, &[1, 4], &bounds).is_err());
        assert!(check_args(OpCode::AddPv, &[1, 2], &bounds).is_err());
    }
}
