//! `MtFirFilter`, the multi-threaded decimating FIR engine.
//!
//! One call to `process` is one round:
//!
//! 1. adopt any taps published since the last round (resizing the history if
//!    the tap count changed),
//! 2. join the history tail and the new input into a scratch buffer,
//! 3. partition the round's outputs across the worker pool and wait for
//!    every slice,
//! 4. commit the history and advance the decimation phase,
//! 5. hand back the finished output buffer.
//!
//! Rounds are strictly sequential since `process` takes `&mut self`.  Tap
//! updates and stop requests can also come from other threads through a
//! `TapHandle`; both take effect at the next round boundary.
//!
//! # Examples
//!
//! ```
//! use mtfir_rs::prelude::*;
//!
//! let mut filter = MtFirFilter::<f32>::new();
//! filter.configure(vec![0.5, 0.5].into(), 2, 4).unwrap();
//! filter.start().unwrap();
//!
//! let input: Vec<Complex<f32>> =
//!     [2.0, 4.0, 6.0, 8.0].iter().map(|x| Complex::new(*x, 0.0)).collect();
//! let output = filter.process(&input).unwrap();
//! assert_eq!(output, vec![Complex::new(1.0, 0.0), Complex::new(5.0, 0.0)]);
//!
//! filter.stop().unwrap();
//! ```

use crate::filter::fir::{hold_open_block, is_finite_sample, next_phase, output_len, Sample};
use crate::filter::history::HistoryRing;
use crate::filter::partition::partition;
use crate::filter::pool::{RoundJob, WorkerPool};
use crate::filter::taps::{Snapshot, TapSet, TapStore};
use crate::filter::FilterError;
use log::{debug, error, trace, warn};
use num::complex::Complex;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Lifecycle of an `MtFirFilter`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    /// No taps configured.  Rounds are rejected.
    Idle,
    /// Configured with zeroed history, workers not yet started.
    Ready,
    /// Processing rounds.
    Running,
    /// A tap update is waiting for the next round.
    Draining,
    /// Stopped by the caller.  Terminal.
    Stopped,
    /// A worker died mid-round.  Terminal.
    Faulted,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            EngineState::Idle => "idle",
            EngineState::Ready => "ready",
            EngineState::Running => "running",
            EngineState::Draining => "draining",
            EngineState::Stopped => "stopped",
            EngineState::Faulted => "faulted",
        };
        write!(f, "{}", name)
    }
}

struct Shared<T> {
    state: Mutex<EngineState>,
    taps: TapStore<T>,
}

impl<T> Shared<T>
where
    T: Sample,
{
    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update_taps(&self, taps: TapSet<T>) -> Result<u64, FilterError> {
        let mut state = self.lock_state();
        match *state {
            EngineState::Ready | EngineState::Draining => self.taps.publish(taps),
            EngineState::Running => {
                let version = self.taps.publish(taps)?;
                *state = EngineState::Draining;
                debug!("taps version {} queued, draining", version);
                Ok(version)
            }
            other => Err(FilterError::State {
                state: other,
                op: "update taps",
            }),
        }
    }

    fn request_stop(&self) {
        let mut state = self.lock_state();
        match *state {
            EngineState::Stopped | EngineState::Faulted => {}
            _ => {
                debug!("stop requested while {}", *state);
                *state = EngineState::Stopped;
            }
        }
    }
}

/// A cloneable handle for controlling an `MtFirFilter` from other threads.
pub struct TapHandle<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for TapHandle<T> {
    fn clone(&self) -> Self {
        TapHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> TapHandle<T>
where
    T: Sample,
{
    /// Publishes new taps, effective from the next round dispatched.
    pub fn update_taps(&self, taps: TapSet<T>) -> Result<u64, FilterError> {
        self.shared.update_taps(taps)
    }

    /// Asks the engine to stop.  A round in flight still completes; the
    /// workers are released at the next round boundary or when the filter
    /// is dropped.
    pub fn request_stop(&self) {
        self.shared.request_stop()
    }

    pub fn state(&self) -> EngineState {
        *self.shared.lock_state()
    }
}

/// Decimating FIR filter that spreads each buffer across a fixed pool of
/// worker threads.
pub struct MtFirFilter<T>
where
    T: Sample,
{
    shared: Arc<Shared<T>>,
    current: Option<Snapshot<T>>,
    history: HistoryRing<T>,
    decimation: usize,
    workers: usize,
    phase: usize,
    held: Option<Complex<T>>,
    pool: Option<WorkerPool<T>>,
    output_hint: usize,
    rounds: u64,
}

impl<T> Default for MtFirFilter<T>
where
    T: Sample,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MtFirFilter<T>
where
    T: Sample,
{
    /// Creates an idle filter.  Call `configure` before processing.
    pub fn new() -> Self {
        MtFirFilter {
            shared: Arc::new(Shared {
                state: Mutex::new(EngineState::Idle),
                taps: TapStore::new(),
            }),
            current: None,
            history: HistoryRing::new(0),
            decimation: 1,
            workers: 0,
            phase: 0,
            held: None,
            pool: None,
            output_hint: 0,
            rounds: 0,
        }
    }

    /// Sets the taps, decimation factor and worker count.
    ///
    /// Moves an idle or ready filter to `Ready` with zeroed history.  On a
    /// configuration error the filter keeps its previous state.
    ///
    /// # Arguments
    ///
    /// * `taps` - Filter taps, at least one.
    /// * `decimation` - Keep one output for every `decimation` inputs.
    /// * `workers` - Number of worker threads, at least one.
    pub fn configure(
        &mut self,
        taps: TapSet<T>,
        decimation: usize,
        workers: usize,
    ) -> Result<(), FilterError> {
        let mut state = self.shared.lock_state();
        match *state {
            EngineState::Idle | EngineState::Ready => {}
            other => {
                return Err(FilterError::State {
                    state: other,
                    op: "configure",
                })
            }
        }
        if decimation == 0 {
            return Err(FilterError::Configuration(
                "decimation factor must be at least 1".to_string(),
            ));
        }
        if workers == 0 {
            return Err(FilterError::Configuration(
                "worker count must be at least 1".to_string(),
            ));
        }
        let snapshot = self.shared.taps.install(taps)?;

        debug!(
            "configured {} taps, decimation {}, {} workers",
            snapshot.taps.len(),
            decimation,
            workers
        );
        self.history = HistoryRing::new(snapshot.taps.len() - 1);
        self.current = Some(snapshot);
        self.decimation = decimation;
        self.workers = workers;
        self.phase = 0;
        self.held = None;
        self.rounds = 0;
        *state = EngineState::Ready;
        Ok(())
    }

    /// Spawns the worker pool.  Starting a running filter does nothing.
    pub fn start(&mut self) -> Result<(), FilterError> {
        let mut state = self.shared.lock_state();
        match *state {
            EngineState::Ready => {}
            EngineState::Running | EngineState::Draining => return Ok(()),
            other => {
                return Err(FilterError::State {
                    state: other,
                    op: "start",
                })
            }
        }
        self.pool = Some(WorkerPool::new(self.workers)?);
        // Taps published while ready are still waiting for the first round.
        *state = if self.shared.taps.has_pending() {
            EngineState::Draining
        } else {
            EngineState::Running
        };
        debug!("filter started");
        Ok(())
    }

    /// Stops the filter and joins the workers.  Stopping twice is a no-op.
    pub fn stop(&mut self) -> Result<(), FilterError> {
        self.shared.request_stop();
        if let Some(mut pool) = self.pool.take() {
            pool.shutdown();
            debug!("filter stopped after {} rounds", self.rounds);
        }
        Ok(())
    }

    /// Publishes new taps, effective from the next round.  A running filter
    /// moves to `Draining` until that round adopts them.
    pub fn update_taps(&self, taps: TapSet<T>) -> Result<u64, FilterError> {
        self.shared.update_taps(taps)
    }

    /// Returns a handle for updating taps or stopping from another thread.
    pub fn tap_handle(&self) -> TapHandle<T> {
        TapHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Advisory output capacity.  Only affects allocation, never results.
    pub fn min_output_buffer_hint(&mut self, size: usize) {
        self.output_hint = size;
    }

    pub fn state(&self) -> EngineState {
        *self.shared.lock_state()
    }

    pub fn decimation(&self) -> usize {
        self.decimation
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Number of rounds completed since `configure`.
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Version of the taps the last (or next, if none ran yet) round used.
    pub fn tap_version(&self) -> u64 {
        self.current.as_ref().map_or(0, |s| s.version)
    }

    /// The taps currently in effect.
    pub fn taps(&self) -> Option<TapSet<T>> {
        self.current.as_ref().map(|s| (*s.taps).clone())
    }

    /// Filters and decimates one buffer.
    ///
    /// Returns the round's complete output: one sample for every
    /// `decimation` inputs, counting inputs left over from earlier rounds.
    /// Output `n` of the stream is taken at input `n * decimation` and
    /// released once its decimation block is complete, so the concatenated
    /// outputs do not depend on how the stream was split into buffers.
    ///
    /// Non-finite input is rejected before anything changes.  A worker fault
    /// leaves the filter `Faulted` and no output is returned for the round.
    pub fn process(&mut self, input: &[Complex<T>]) -> Result<Vec<Complex<T>>, FilterError> {
        let state = self.state();
        match state {
            EngineState::Ready | EngineState::Running | EngineState::Draining => {}
            other => return Err(self.reject_round(other)),
        }
        if let Some(index) = input.iter().position(|x| !is_finite_sample(x)) {
            return Err(FilterError::NonFiniteSample { index });
        }
        if state == EngineState::Ready {
            self.start()?;
        }
        let snapshot = self.begin_round()?;
        if input.is_empty() {
            return Ok(Vec::new());
        }

        let n_out = output_len(self.phase, input.len(), self.decimation);
        let job = Arc::new(RoundJob {
            round: self.rounds,
            scratch: self.history.append(input),
            taps: snapshot.taps,
            decimation: self.decimation,
            offset: self.phase + self.history.len(),
        });
        let slices = partition(n_out, self.workers);
        trace!(
            "round {}: {} in, {} computed, slices {:?}",
            self.rounds,
            input.len(),
            n_out,
            slices
        );

        let mut output = Vec::with_capacity((n_out + 1).max(self.output_hint));
        output.extend(self.held);
        let res = match self.pool {
            Some(ref pool) => pool.run(&job, &slices, &mut output),
            None => Err(FilterError::State {
                state: self.state(),
                op: "process a round",
            }),
        };
        if let Err(e) = res {
            self.fault(&e);
            return Err(e);
        }

        self.history.commit(&job.scratch);
        self.phase = next_phase(self.phase, input.len(), self.decimation);
        self.held = hold_open_block(&mut output, self.phase);
        self.rounds += 1;
        Ok(output)
    }

    /// Checks the round may run and adopts any pending taps.
    fn begin_round(&mut self) -> Result<Snapshot<T>, FilterError> {
        let mut state = self.shared.lock_state();
        let current = *state;
        match current {
            EngineState::Running | EngineState::Draining => {}
            other => {
                drop(state);
                return Err(self.reject_round(other));
            }
        }

        if let Some(next) = self.shared.taps.take_pending() {
            let new_len = next.taps.len() - 1;
            if new_len != self.history.len() {
                warn!(
                    "tap count changed, resizing history from {} to {}",
                    self.history.len(),
                    new_len
                );
                self.history.resize(new_len);
            }
            debug!("round {} adopts taps version {}", self.rounds, next.version);
            self.current = Some(next);
        }
        *state = EngineState::Running;

        self.current.clone().ok_or(FilterError::State {
            state: EngineState::Idle,
            op: "process a round",
        })
    }

    fn reject_round(&mut self, state: EngineState) -> FilterError {
        if state == EngineState::Stopped {
            // Stop may have been requested through a handle.
            if let Some(mut pool) = self.pool.take() {
                pool.shutdown();
            }
        }
        FilterError::State {
            state,
            op: "process a round",
        }
    }

    fn fault(&mut self, e: &FilterError) {
        error!("round {} failed: {}", self.rounds, e);
        *self.shared.lock_state() = EngineState::Faulted;
        if let Some(mut pool) = self.pool.take() {
            pool.shutdown();
        }
    }

    #[cfg(test)]
    fn pool(&self) -> &WorkerPool<T> {
        match self.pool {
            Some(ref pool) => pool,
            None => panic!("filter not started"),
        }
    }
}

impl<T> Drop for MtFirFilter<T>
where
    T: Sample,
{
    fn drop(&mut self) {
        if let Some(mut pool) = self.pool.take() {
            pool.shutdown();
        }
    }
}
