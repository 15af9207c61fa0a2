//! Thread-affine ownership of the active recording.
//!
//! [`TapeRegistry`] hands out tape ids, remembers which thread owns each live
//! recording, and installs the thread's [`Recorder`] in a per-float-type
//! thread-local slot. [`TapeRegistry::begin`] returns a [`Recording`] token;
//! only consuming that token (by [`Recording::freeze`] or
//! [`Recording::abort`], or by dropping it) ends the recording.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};
use std::thread::{LocalKey, ThreadId};

use tracing::debug;

use crate::error::AdError;
use crate::float::Float;
use crate::function::Function;
use crate::index::{TapeId, VarAddr};
use crate::opcode::OpCode;
use crate::player::Player;
use crate::tracked::Tracked;

use super::Recorder;

thread_local! {
    static ACTIVE_ID: Cell<TapeId> = const { Cell::new(TapeId::NONE) };
    static RECORDER_F32: RefCell<Option<Recorder<f32>>> = const { RefCell::new(None) };
    static RECORDER_F64: RefCell<Option<Recorder<f64>>> = const { RefCell::new(None) };
}

/// Selects the thread-local recorder slot for a base float type.
pub trait TapeLocal: Float {
    fn recorder_cell() -> &'static LocalKey<RefCell<Option<Recorder<Self>>>>;
}

impl TapeLocal for f32 {
    fn recorder_cell() -> &'static LocalKey<RefCell<Option<Recorder<Self>>>> {
        &RECORDER_F32
    }
}

impl TapeLocal for f64 {
    fn recorder_cell() -> &'static LocalKey<RefCell<Option<Recorder<Self>>>> {
        &RECORDER_F64
    }
}

/// Run `f` against this thread's active recorder for `F`, if any.
#[inline]
pub(crate) fn with_active<F: TapeLocal, R>(f: impl FnOnce(Option<&mut Recorder<F>>) -> R) -> R {
    F::recorder_cell().with(|cell| {
        let mut slot = cell.borrow_mut();
        f(slot.as_mut())
    })
}

/// Process-wide bookkeeping of live recordings.
#[derive(Debug)]
pub struct TapeRegistry {
    next_id: AtomicU64,
    live: Mutex<HashMap<TapeId, ThreadId>>,
}

static REGISTRY: OnceLock<TapeRegistry> = OnceLock::new();

impl TapeRegistry {
    pub fn global() -> &'static TapeRegistry {
        REGISTRY.get_or_init(|| TapeRegistry {
            next_id: AtomicU64::new(1),
            live: Mutex::new(HashMap::new()),
        })
    }

    /// Start recording on the current thread with independent variables
    /// initialised to `x`.
    ///
    /// Fails with [`AdError::AlreadyRecording`] if this thread already owns a
    /// live recording, whatever its float type.
    pub fn begin<F: TapeLocal>(
        &'static self,
        x: &[F],
    ) -> Result<(Recording<F>, Vec<Tracked<F>>), AdError> {
        if let Some(active) = self.active_tape() {
            return Err(AdError::AlreadyRecording { active });
        }
        let id = TapeId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut rec = Recorder::with_id(id);
        let addrs = rec.begin(x.len())?;
        let vars = x
            .iter()
            .zip(&addrs)
            .map(|(&value, &address)| Tracked::variable(value, id, address))
            .collect();

        self.live_map().insert(id, std::thread::current().id());
        ACTIVE_ID.with(|a| a.set(id));
        F::recorder_cell().with(|cell| *cell.borrow_mut() = Some(rec));
        debug!(tape = %id, n = x.len(), "recording started");

        Ok((
            Recording {
                id,
                registry: self,
                open: true,
                _marker: PhantomData,
            },
            vars,
        ))
    }

    /// Id of the recording active on the calling thread.
    pub fn active_tape(&self) -> Option<TapeId> {
        let id = ACTIVE_ID.with(Cell::get);
        (!id.is_none()).then_some(id)
    }

    /// Thread that owns a live recording.
    pub fn owner(&self, id: TapeId) -> Option<ThreadId> {
        self.live_map().get(&id).copied()
    }

    /// True when `id` is being recorded by a thread other than the caller.
    pub(crate) fn is_live_elsewhere(&self, id: TapeId) -> bool {
        matches!(self.owner(id), Some(t) if t != std::thread::current().id())
    }

    fn live_map(&self) -> std::sync::MutexGuard<'_, HashMap<TapeId, ThreadId>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, id: TapeId) {
        self.live_map().remove(&id);
        ACTIVE_ID.with(|a| {
            if a.get() == id {
                a.set(TapeId::NONE);
            }
        });
    }
}

/// Start recording on the global registry. See [`TapeRegistry::begin`].
pub fn independent<F: TapeLocal>(x: &[F]) -> Result<(Recording<F>, Vec<Tracked<F>>), AdError> {
    TapeRegistry::global().begin(x)
}

/// Capability for the recording active on the current thread.
///
/// Not `Send`: a recording belongs to the thread that began it.
#[derive(Debug)]
pub struct Recording<F: TapeLocal> {
    id: TapeId,
    registry: &'static TapeRegistry,
    open: bool,
    _marker: PhantomData<(F, *const ())>,
}

impl<F: TapeLocal> Recording<F> {
    #[inline]
    pub fn id(&self) -> TapeId {
        self.id
    }

    /// Stop recording and build a [`Function`] whose range is `dependents`.
    pub fn freeze(self, dependents: &[Tracked<F>]) -> Result<Function<F>, AdError> {
        self.freeze_player(dependents).map(Function::new)
    }

    /// Stop recording and return the frozen tape itself.
    pub fn freeze_player(mut self, dependents: &[Tracked<F>]) -> Result<Player<F>, AdError> {
        // Detach first: whatever happens below, the thread is no longer recording.
        let rec = self.take();
        let mut rec = rec.ok_or(AdError::NotRecording)?;

        let mut addrs: Vec<VarAddr> = Vec::with_capacity(dependents.len());
        for d in dependents {
            let addr = if d.tape_id() == self.id && !d.address().is_phantom() {
                d.address()
            } else {
                if !d.tape_id().is_none() && self.registry.is_live_elsewhere(d.tape_id()) {
                    return Err(AdError::ForeignVariable { tape: d.tape_id() });
                }
                let c = rec.put_constant(d.value());
                rec.put_op(OpCode::Par, &[c.raw()])?
            };
            addrs.push(addr);
        }
        let (num_op, num_var) = (rec.num_op(), rec.num_var());
        let player = rec.freeze(&addrs)?;
        debug!(tape = %self.id, num_op, num_var, m = addrs.len(), "recording frozen");
        Ok(player)
    }

    /// Discard the recording.
    pub fn abort(mut self) {
        if self.take().is_some() {
            debug!(tape = %self.id, "recording aborted");
        }
    }

    fn take(&mut self) -> Option<Recorder<F>> {
        if !self.open {
            return None;
        }
        self.open = false;
        let rec = F::recorder_cell().with(|cell| {
            let mut slot = cell.borrow_mut();
            match slot.as_ref() {
                Some(r) if r.id() == self.id => slot.take(),
                _ => None,
            }
        });
        self.registry.release(self.id);
        rec
    }
}

impl<F: TapeLocal> Drop for Recording<F> {
    fn drop(&mut self) {
        if self.take().is_some() {
            debug!(tape = %self.id, "recording dropped without freeze");
        }
    }
}
