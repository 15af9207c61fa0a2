pub mod api;
pub mod atomic;
mod buffer;
pub mod discrete;
pub mod error;
pub mod float;
pub mod function;
pub mod index;
mod kernels;
pub mod opcode;
pub mod player;
pub mod recorder;
pub mod scalar;
mod sweep;
pub mod tracked;
mod traits;
pub mod vec_ad;

pub use api::{record, record_multi};
pub use atomic::{ArgType, Atomic, AtomicFunction};
pub use discrete::Discrete;
pub use error::{AdError, ErrorKind};
pub use float::{azmul, Float};
pub use function::Function;
pub use index::{ArgIndex, ConstIndex, TapeId, VarAddr};
pub use opcode::{CompareOp, OpCode};
pub use player::{Player, PlayerParts};
pub use recorder::{independent, Recorder, Recording, TapeLocal, TapeRegistry};
pub use scalar::Scalar;
pub use tracked::{cond_exp, cond_exp_eq, cond_exp_ge, cond_exp_gt, cond_exp_le, cond_exp_lt, print_for, Tracked};
pub use vec_ad::VecAd;

/// Tracked value over `f64`.
pub type Tracked64 = Tracked<f64>;
/// Tracked value over `f32`.
pub type Tracked32 = Tracked<f32>;
