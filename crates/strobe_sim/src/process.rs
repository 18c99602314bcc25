//! Cooperative simulation processes.
//!
//! A [`Process`] is a state machine that the kernel resumes whenever the
//! condition it last waited on fires. Each resumption returns the next
//! [`Wait`], which is the process's single suspension point. Between
//! resumptions a process owns its state exclusively; test scenarios reach it
//! through a typed [`Handle`].

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use crate::error::SimError;
use crate::signal::{SignalId, SignalState};
use crate::time::SimTime;

/// Opaque ID for a spawned process.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ProcessId(u32);

impl ProcessId {
    /// Creates a `ProcessId` from a raw index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    pub fn as_raw(self) -> u32 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A typed reference to a process owned by the simulator.
pub struct Handle<P> {
    id: ProcessId,
    marker: PhantomData<fn() -> P>,
}

impl<P> Handle<P> {
    pub(crate) fn new(id: ProcessId) -> Self {
        Self {
            id,
            marker: PhantomData,
        }
    }

    /// The untyped process ID.
    pub fn id(self) -> ProcessId {
        self.id
    }
}

impl<P> Clone for Handle<P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for Handle<P> {}

impl<P> PartialEq for Handle<P> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<P> Eq for Handle<P> {}

impl<P> fmt::Debug for Handle<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.id.0)
    }
}

/// A single condition a process can suspend on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// Bit 0 of the signal rises.
    Rising(SignalId),
    /// Bit 0 of the signal falls.
    Falling(SignalId),
    /// The signal changes value.
    Change(SignalId),
    /// A fixed delay in femtoseconds. A zero delay resumes once the current
    /// time step has settled.
    Delay(u64),
}

/// What a process waits for after a resumption.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Wait {
    /// Resume when the trigger fires.
    Until(Trigger),
    /// Resume when the first of several triggers fires.
    First(Vec<Trigger>),
    /// Resume only when explicitly woken by the scenario.
    Parked,
    /// Never resume again.
    Finished,
}

/// Object-safe access to `Any` for downcasting processes.
pub trait AsAny {
    /// Returns `self` as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
    /// Returns `self` as `&mut dyn Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A cooperative simulation task.
pub trait Process: AsAny + 'static {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Runs the process until its next suspension point.
    ///
    /// Called once when the process is spawned and then each time the
    /// condition returned by the previous call fires.
    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError>;
}

/// The view of the simulation a process gets while it runs.
///
/// Reads return settled values from before the current delta's updates.
/// Writes are scheduled for the next delta cycle.
pub struct ProcessContext<'a> {
    pub(crate) now: SimTime,
    pub(crate) signals: &'a [SignalState],
    pub(crate) changed: &'a [SignalId],
    pub(crate) pending: &'a mut Vec<(SignalId, u64)>,
}

impl ProcessContext<'_> {
    /// Current simulation time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Current value of a signal.
    pub fn get(&self, signal: SignalId) -> u64 {
        self.signals
            .get(signal.index())
            .map_or(0, |state| state.value)
    }

    /// True if bit 0 of the signal is high.
    pub fn is_high(&self, signal: SignalId) -> bool {
        self.get(signal) & 1 == 1
    }

    /// Schedules a new value for the signal at the next delta cycle.
    pub fn set(&mut self, signal: SignalId, value: u64) {
        self.pending.push((signal, value));
    }

    /// Schedules a single-bit level.
    pub fn set_bit(&mut self, signal: SignalId, high: bool) {
        self.set(signal, u64::from(high));
    }

    /// True if the signal rose in the delta that resumed this process.
    pub fn rose(&self, signal: SignalId) -> bool {
        self.in_changed(signal) && self.signals[signal.index()].rose()
    }

    /// True if the signal fell in the delta that resumed this process.
    pub fn fell(&self, signal: SignalId) -> bool {
        self.in_changed(signal) && self.signals[signal.index()].fell()
    }

    /// True if the signal changed in the delta that resumed this process.
    pub fn changed(&self, signal: SignalId) -> bool {
        self.in_changed(signal)
    }

    fn in_changed(&self, signal: SignalId) -> bool {
        self.changed.contains(&signal)
    }
}
