//! Typed indices into the tape arenas.
//!
//! Every slot a tape hands out is addressed through one of these newtypes so
//! that a variable address can never be confused with a constant index or an
//! argument position.

use std::fmt;

/// Identity of one recording. Zero is reserved for "not on any tape".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TapeId(pub(crate) u64);

impl TapeId {
    /// The id carried by values that were never recorded.
    pub const NONE: TapeId = TapeId(0);

    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for TapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Address of a variable slot in the Taylor buffer.
///
/// Address 0 is the phantom result of the `Begin` operator and doubles as the
/// "parameter, not a variable" marker on [`Tracked`](crate::Tracked).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VarAddr(pub(crate) u32);

impl VarAddr {
    pub const PHANTOM: VarAddr = VarAddr(0);

    #[inline]
    pub fn new(addr: u32) -> Self {
        VarAddr(addr)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn is_phantom(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for VarAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Index into a tape's constant (parameter) table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConstIndex(pub(crate) u32);

impl ConstIndex {
    #[inline]
    pub fn new(index: u32) -> Self {
        ConstIndex(index)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Position of an operator's first argument in the flat argument array.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArgIndex(pub(crate) u32);

impl ArgIndex {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Narrow a `usize` count to the `u32` index width used on the tape.
#[inline]
pub(crate) fn to_u32(n: usize) -> Result<u32, crate::AdError> {
    u32::try_from(n).map_err(|_| crate::AdError::Internal(format!("tape index {n} exceeds u32")))
}
