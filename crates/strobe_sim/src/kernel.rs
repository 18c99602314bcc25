//! Simulation kernel with timer queue, delta cycles, and edge-sensitive wakeup.
//!
//! [`Simulator`] owns every signal and process. It alternates between two
//! kinds of steps:
//!
//! - a **delta step** applies all signal writes scheduled during the previous
//!   step, classifies edges, and resumes the processes waiting on them;
//! - a **time step** advances to the earliest timer, applies scheduled
//!   external drives, and resumes the processes whose delays expired.
//!
//! Delta steps always run to exhaustion before time advances, so every
//! combinational reaction to a change settles before the next clock edge.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::clock::EdgeCounter;
use crate::error::SimError;
use crate::process::{Handle, Process, ProcessContext, ProcessId, Trigger, Wait};
use crate::signal::{width_mask, Edge, SignalId, SignalState};
use crate::time::SimTime;
use crate::waveform::WaveformRecorder;

/// Default limit of delta cycles at a single time step.
pub const DEFAULT_MAX_DELTAS: u32 = 10_000;

/// A timer entry. Ordered by time, then by insertion sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TimerEvent {
    time_fs: u64,
    seq: u64,
    action: TimerAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerAction {
    Resume { process: ProcessId, generation: u64 },
    Drive { signal: SignalId, value: u64 },
}

impl Ord for TimerEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.time_fs
            .cmp(&other.time_fs)
            .then(self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for TimerEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// A process registered on a signal edge.
#[derive(Debug, Clone, Copy)]
struct EdgeWaiter {
    process: ProcessId,
    edge: Edge,
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Waiting,
    Parked,
    Finished,
}

/// A spawned process plus its scheduling bookkeeping.
struct ProcessSlot {
    name: String,
    /// `None` only while the process is being resumed.
    process: Option<Box<dyn Process>>,
    /// Bumped on every resumption; registrations from older generations are stale.
    generation: u64,
    state: SlotState,
}

/// The result of a single kernel step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// Simulation can continue.
    Continued,
    /// No more events, or the time limit was reached.
    Done,
}

/// Summary of a finished simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimResult {
    /// The final simulation time.
    pub final_time: SimTime,
    /// Total delta cycles executed.
    pub total_deltas: u64,
    /// Total process resumptions.
    pub total_resumes: u64,
}

/// The simulation kernel: signals, processes, and the event loop.
pub struct Simulator {
    time: SimTime,
    signals: Vec<SignalState>,
    names: HashMap<String, SignalId>,
    slots: Vec<ProcessSlot>,
    timers: BinaryHeap<Reverse<TimerEvent>>,
    next_seq: u64,
    /// Writes scheduled for the next delta cycle.
    pending: Vec<(SignalId, u64)>,
    /// Edge registrations, indexed by signal.
    edge_waiters: Vec<Vec<EdgeWaiter>>,
    /// Signals that changed in the most recent delta.
    changed: Vec<SignalId>,
    recorder: Option<Box<dyn WaveformRecorder>>,
    time_limit: Option<u64>,
    max_deltas: u32,
    deltas_this_step: u32,
    total_deltas: u64,
    total_resumes: u64,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulator {
    /// Creates an empty simulator at time zero.
    pub fn new() -> Self {
        Self {
            time: SimTime::ZERO,
            signals: Vec::new(),
            names: HashMap::new(),
            slots: Vec::new(),
            timers: BinaryHeap::new(),
            next_seq: 0,
            pending: Vec::new(),
            edge_waiters: Vec::new(),
            changed: Vec::new(),
            recorder: None,
            time_limit: None,
            max_deltas: DEFAULT_MAX_DELTAS,
            deltas_this_step: 0,
            total_deltas: 0,
            total_resumes: 0,
        }
    }

    /// Sets an absolute time limit in femtoseconds.
    pub fn set_time_limit(&mut self, limit_fs: u64) {
        self.time_limit = Some(limit_fs);
    }

    /// Sets the maximum number of delta cycles per time step.
    pub fn set_max_deltas(&mut self, max: u32) {
        self.max_deltas = max;
    }

    /// Attaches a waveform recorder and registers every existing signal.
    ///
    /// Signals added after this call are not recorded.
    pub fn attach_recorder(
        &mut self,
        mut recorder: Box<dyn WaveformRecorder>,
    ) -> Result<(), SimError> {
        recorder.begin_scope("top")?;
        for (index, state) in self.signals.iter().enumerate() {
            recorder.register_signal(SignalId::from_raw(index as u32), &state.name, state.width)?;
        }
        recorder.end_scope()?;
        for (index, state) in self.signals.iter().enumerate() {
            recorder.record_change(
                self.time.fs,
                SignalId::from_raw(index as u32),
                state.value,
            )?;
        }
        self.recorder = Some(recorder);
        Ok(())
    }

    /// Current simulation time.
    pub fn now(&self) -> SimTime {
        self.time
    }

    // ---- Signals ----

    /// Declares a signal initialised to zero.
    pub fn add_signal(&mut self, name: &str, width: u32) -> Result<SignalId, SimError> {
        self.add_signal_with_init(name, width, 0)
    }

    /// Declares a signal with an initial value.
    pub fn add_signal_with_init(
        &mut self,
        name: &str,
        width: u32,
        init: u64,
    ) -> Result<SignalId, SimError> {
        if width == 0 || width > 64 {
            return Err(SimError::InvalidWidth {
                name: name.to_string(),
                width,
            });
        }
        if self.names.contains_key(name) {
            return Err(SimError::DuplicateSignal(name.to_string()));
        }
        let id = SignalId::from_raw(self.signals.len() as u32);
        self.signals.push(SignalState::new(name, width, init));
        self.edge_waiters.push(Vec::new());
        self.names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Looks up a signal by name.
    pub fn find_signal(&self, name: &str) -> Option<SignalId> {
        self.names.get(name).copied()
    }

    /// Looks up a signal by name, failing if it does not exist.
    pub fn signal(&self, name: &str) -> Result<SignalId, SimError> {
        self.find_signal(name)
            .ok_or_else(|| SimError::UnknownSignal(name.to_string()))
    }

    /// Current value of a signal.
    pub fn value(&self, signal: SignalId) -> u64 {
        self.signals
            .get(signal.index())
            .map_or(0, |state| state.value)
    }

    /// Full state of a signal.
    pub fn signal_state(&self, signal: SignalId) -> Option<&SignalState> {
        self.signals.get(signal.index())
    }

    /// Bit width of a signal.
    pub fn width(&self, signal: SignalId) -> u32 {
        self.signals.get(signal.index()).map_or(0, |state| state.width)
    }

    /// Number of declared signals.
    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    /// Drives a signal from outside any process; applied at the next delta.
    pub fn drive(&mut self, signal: SignalId, value: u64) {
        self.pending.push((signal, value));
    }

    /// Drives a signal after a delay.
    pub fn drive_after(&mut self, signal: SignalId, value: u64, delay_fs: u64) {
        let time_fs = self.time.after(delay_fs);
        self.push_timer(time_fs, TimerAction::Drive { signal, value });
    }

    // ---- Processes ----

    /// Spawns a process. It is first resumed at the current time, after any
    /// pending delta cycles have settled.
    pub fn spawn<P: Process>(&mut self, process: P) -> Handle<P> {
        let id = ProcessId::from_raw(self.slots.len() as u32);
        self.slots.push(ProcessSlot {
            name: process.name().to_string(),
            process: Some(Box::new(process)),
            generation: 0,
            state: SlotState::Waiting,
        });
        self.push_timer(
            self.time.fs,
            TimerAction::Resume {
                process: id,
                generation: 0,
            },
        );
        Handle::new(id)
    }

    /// Borrows a process through its typed handle.
    pub fn get<P: Process>(&self, handle: Handle<P>) -> Result<&P, SimError> {
        let id = handle.id();
        let slot = self
            .slots
            .get(id.index())
            .ok_or(SimError::UnknownProcess(id.as_raw()))?;
        let process: &dyn Process = slot
            .process
            .as_deref()
            .ok_or(SimError::UnknownProcess(id.as_raw()))?;
        process
            .as_any()
            .downcast_ref::<P>()
            .ok_or_else(|| SimError::ProcessTypeMismatch {
                id: id.as_raw(),
                name: slot.name.clone(),
            })
    }

    /// Mutably borrows a process through its typed handle.
    ///
    /// Changes made here are seen by the process at its next resumption; use
    /// [`wake`](Self::wake) if the process is parked.
    pub fn get_mut<P: Process>(&mut self, handle: Handle<P>) -> Result<&mut P, SimError> {
        let id = handle.id();
        let slot = self
            .slots
            .get_mut(id.index())
            .ok_or(SimError::UnknownProcess(id.as_raw()))?;
        let name = &slot.name;
        let process: &mut dyn Process = slot
            .process
            .as_deref_mut()
            .ok_or(SimError::UnknownProcess(id.as_raw()))?;
        process
            .as_any_mut()
            .downcast_mut::<P>()
            .ok_or_else(|| SimError::ProcessTypeMismatch {
                id: id.as_raw(),
                name: name.clone(),
            })
    }

    /// Resumes a parked process at the current time. No effect on processes
    /// that are waiting on a trigger or have finished.
    pub fn wake(&mut self, id: ProcessId) -> Result<(), SimError> {
        let slot = self
            .slots
            .get(id.index())
            .ok_or(SimError::UnknownProcess(id.as_raw()))?;
        if slot.state == SlotState::Parked {
            let generation = slot.generation;
            self.push_timer(
                self.time.fs,
                TimerAction::Resume {
                    process: id,
                    generation,
                },
            );
        }
        Ok(())
    }

    /// True once the process has returned [`Wait::Finished`].
    pub fn is_finished(&self, id: ProcessId) -> bool {
        self.slots
            .get(id.index())
            .is_some_and(|slot| slot.state == SlotState::Finished)
    }

    /// Number of spawned processes.
    pub fn process_count(&self) -> usize {
        self.slots.len()
    }

    // ---- Execution ----

    /// Executes one delta step or one time step.
    pub fn step(&mut self) -> Result<StepResult, SimError> {
        if !self.pending.is_empty() {
            self.run_delta()?;
            return Ok(StepResult::Continued);
        }

        let Some(next_fs) = self.next_timer_fs() else {
            return Ok(StepResult::Done);
        };
        if self.time_limit.is_some_and(|limit| next_fs > limit) {
            return Ok(StepResult::Done);
        }

        if next_fs > self.time.fs {
            self.time = self.time.advance_to(next_fs);
            self.deltas_this_step = 0;
        }
        self.changed.clear();

        let mut woken = Vec::new();
        while self
            .timers
            .peek()
            .is_some_and(|Reverse(event)| event.time_fs == next_fs)
        {
            let Some(Reverse(event)) = self.timers.pop() else {
                break;
            };
            match event.action {
                TimerAction::Resume {
                    process,
                    generation,
                } => {
                    let live = self
                        .slots
                        .get(process.index())
                        .is_some_and(|slot| slot.generation == generation);
                    if live && !woken.contains(&process) {
                        woken.push(process);
                    }
                }
                TimerAction::Drive { signal, value } => self.pending.push((signal, value)),
            }
        }

        for id in woken {
            self.resume(id)?;
        }
        Ok(StepResult::Continued)
    }

    /// Runs until no events remain or the time limit is reached.
    pub fn run(&mut self) -> Result<(), SimError> {
        while self.step()? == StepResult::Continued {}
        Ok(())
    }

    /// Runs for `duration_fs`, leaving the clock exactly at the end time.
    pub fn run_for(&mut self, duration_fs: u64) -> Result<(), SimError> {
        let end_fs = self.time.after(duration_fs);
        loop {
            if self.pending.is_empty() && !self.next_timer_fs().is_some_and(|t| t <= end_fs) {
                break;
            }
            if self.step()? == StepResult::Done {
                break;
            }
        }
        if self.time.fs < end_fs {
            self.time = self.time.advance_to(end_fs);
        }
        Ok(())
    }

    /// Runs until `condition` holds at a settled point in time.
    ///
    /// The condition is evaluated whenever no delta cycles are pending. Fails
    /// with [`SimError::Timeout`] once `timeout_fs` passes, or with
    /// [`SimError::Stalled`] if the event queue drains first.
    pub fn run_until<F>(
        &mut self,
        awaiting: &str,
        timeout_fs: u64,
        mut condition: F,
    ) -> Result<(), SimError>
    where
        F: FnMut(&Simulator) -> bool,
    {
        let deadline = self.time.after(timeout_fs);
        loop {
            if self.pending.is_empty() {
                if condition(self) {
                    return Ok(());
                }
                match self.next_timer_fs() {
                    None => {
                        return Err(SimError::Stalled {
                            awaiting: awaiting.to_string(),
                            at: self.time,
                        })
                    }
                    Some(next) if next > deadline => {
                        self.time = self.time.advance_to(deadline.max(self.time.fs));
                        return Err(SimError::Timeout {
                            awaiting: awaiting.to_string(),
                            waited: SimTime::from_fs(timeout_fs),
                        });
                    }
                    Some(_) => {}
                }
            }
            if self.step()? == StepResult::Done {
                return Err(SimError::TimeLimitExceeded {
                    limit_fs: self.time_limit.unwrap_or(self.time.fs),
                });
            }
        }
    }

    /// Runs until `signal` has shown `count` edges of the given kind.
    pub fn wait_edges(
        &mut self,
        signal: SignalId,
        edge: Edge,
        count: u64,
        timeout_fs: u64,
    ) -> Result<(), SimError> {
        if count == 0 {
            return Ok(());
        }
        let counter = self.spawn(EdgeCounter::new(signal, edge, count));
        let name = self
            .signal_state(signal)
            .map_or_else(|| signal.to_string(), |state| state.name.clone());
        let awaiting = format!("{count} {edge:?} edges of {name}");
        let id = counter.id();
        self.run_until(&awaiting, timeout_fs, |sim| sim.is_finished(id))
    }

    /// Finalizes waveform output and returns a run summary.
    pub fn finish(&mut self) -> Result<SimResult, SimError> {
        if let Some(recorder) = &mut self.recorder {
            recorder.finalize()?;
        }
        tracing::debug!(
            time = %self.time,
            deltas = self.total_deltas,
            resumes = self.total_resumes,
            signals = self.signal_count(),
            processes = self.process_count(),
            "simulation finished"
        );
        Ok(self.summary())
    }

    /// Summary of the run so far.
    pub fn summary(&self) -> SimResult {
        SimResult {
            final_time: self.time,
            total_deltas: self.total_deltas,
            total_resumes: self.total_resumes,
        }
    }

    // ---- Internals ----

    fn next_timer_fs(&self) -> Option<u64> {
        self.timers.peek().map(|Reverse(event)| event.time_fs)
    }

    fn push_timer(&mut self, time_fs: u64, action: TimerAction) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.timers.push(Reverse(TimerEvent {
            time_fs,
            seq,
            action,
        }));
    }

    /// Applies pending writes and resumes processes sensitive to the resulting edges.
    fn run_delta(&mut self) -> Result<(), SimError> {
        self.deltas_this_step += 1;
        if self.deltas_this_step > self.max_deltas {
            return Err(SimError::DeltaCycleLimit {
                fs: self.time.fs,
                max_deltas: self.max_deltas,
            });
        }
        self.time = self.time.next_delta();
        self.total_deltas += 1;

        self.changed.clear();
        for (signal, value) in std::mem::take(&mut self.pending) {
            let Some(state) = self.signals.get_mut(signal.index()) else {
                continue;
            };
            if !self.changed.contains(&signal) {
                state.previous_value = state.value;
                self.changed.push(signal);
            }
            state.value = value & width_mask(state.width);
        }
        let signals = &self.signals;
        self.changed
            .retain(|signal| signals[signal.index()].value != signals[signal.index()].previous_value);

        if let Some(recorder) = &mut self.recorder {
            for signal in &self.changed {
                recorder.record_change(self.time.fs, *signal, self.signals[signal.index()].value)?;
            }
        }

        let mut woken: Vec<ProcessId> = Vec::new();
        for signal in &self.changed {
            let state = &self.signals[signal.index()];
            let slots = &self.slots;
            self.edge_waiters[signal.index()].retain(|waiter| {
                let live = slots
                    .get(waiter.process.index())
                    .is_some_and(|slot| slot.generation == waiter.generation);
                if live && waiter.edge.matches(state) {
                    if !woken.contains(&waiter.process) {
                        woken.push(waiter.process);
                    }
                    return false;
                }
                live
            });
        }

        for id in woken {
            self.resume(id)?;
        }
        Ok(())
    }

    fn resume(&mut self, id: ProcessId) -> Result<(), SimError> {
        let Some(slot) = self.slots.get_mut(id.index()) else {
            return Err(SimError::UnknownProcess(id.as_raw()));
        };
        if slot.state == SlotState::Finished {
            return Ok(());
        }
        let Some(mut process) = slot.process.take() else {
            return Ok(());
        };
        slot.generation += 1;
        slot.state = SlotState::Waiting;

        let outcome = {
            let mut ctx = ProcessContext {
                now: self.time,
                signals: &self.signals,
                changed: &self.changed,
                pending: &mut self.pending,
            };
            process.resume(&mut ctx)
        };
        self.total_resumes += 1;
        self.slots[id.index()].process = Some(process);

        let wait = outcome?;
        self.suspend(id, wait);
        Ok(())
    }

    fn suspend(&mut self, id: ProcessId, wait: Wait) {
        match wait {
            Wait::Until(trigger) => self.register(id, trigger),
            Wait::First(triggers) => {
                for trigger in triggers {
                    self.register(id, trigger);
                }
            }
            Wait::Parked => self.slots[id.index()].state = SlotState::Parked,
            Wait::Finished => {
                let slot = &mut self.slots[id.index()];
                slot.state = SlotState::Finished;
                tracing::trace!(process = %slot.name, time = %self.time, "process finished");
            }
        }
    }

    fn register(&mut self, id: ProcessId, trigger: Trigger) {
        let generation = self.slots[id.index()].generation;
        let (signal, edge) = match trigger {
            Trigger::Delay(delay_fs) => {
                let time_fs = self.time.after(delay_fs);
                self.push_timer(
                    time_fs,
                    TimerAction::Resume {
                        process: id,
                        generation,
                    },
                );
                return;
            }
            Trigger::Rising(signal) => (signal, Edge::Rising),
            Trigger::Falling(signal) => (signal, Edge::Falling),
            Trigger::Change(signal) => (signal, Edge::Any),
        };
        let slots = &self.slots;
        let Some(waiters) = self.edge_waiters.get_mut(signal.index()) else {
            tracing::warn!(%signal, "process waits on an undeclared signal");
            return;
        };
        waiters.retain(|waiter| {
            slots
                .get(waiter.process.index())
                .is_some_and(|slot| slot.generation == waiter.generation)
        });
        waiters.push(EdgeWaiter {
            process: id,
            edge,
            generation,
        });
    }
}
