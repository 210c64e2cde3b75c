//! The persistent worker threads behind `MtFirFilter`.
//!
//! Each worker owns a command channel and a result channel, both bounded to
//! one message.  A round hands every worker the shared `RoundJob` and its own
//! `WorkSlice`; the worker convolves its slice into a private buffer and
//! sends it back.  The driver collects the results in slice order, which is
//! the completion barrier: the output buffer is assembled only once every
//! busy worker has reported.
//!
//! A worker that dies drops its end of both channels, so the driver sees a
//! disconnected channel instead of waiting forever.

use crate::filter::fir::{convolve_range, Sample};
use crate::filter::partition::WorkSlice;
use crate::filter::taps::TapSet;
use crate::filter::FilterError;
use crossbeam::channel::{self, Receiver, Sender};
use log::{debug, error, trace};
use num::complex::Complex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Everything the workers read during one round.  Shared read-only.
#[derive(Debug)]
pub struct RoundJob<T> {
    pub round: u64,
    pub scratch: Vec<Complex<T>>,
    pub taps: Arc<TapSet<T>>,
    pub decimation: usize,
    pub offset: usize,
}

enum Command<T> {
    Run {
        job: Arc<RoundJob<T>>,
        slice: WorkSlice,
    },
    #[cfg(test)]
    Fail,
}

struct Worker<T> {
    commands: Option<Sender<Command<T>>>,
    results: Receiver<Vec<Complex<T>>>,
    handle: Option<JoinHandle<()>>,
}

/// A fixed set of worker threads reused for every round.
pub struct WorkerPool<T>
where
    T: Sample,
{
    workers: Vec<Worker<T>>,
}

impl<T> WorkerPool<T>
where
    T: Sample,
{
    /// Spawns `count` worker threads.
    pub fn new(count: usize) -> Result<Self, FilterError> {
        let mut workers = Vec::with_capacity(count);
        for id in 0..count {
            let (cmd_send, cmd_recv) = channel::bounded(1);
            let (res_send, res_recv) = channel::bounded(1);
            let handle = thread::Builder::new()
                .name(format!("mtfir-worker-{}", id))
                .spawn(move || work(id, cmd_recv, res_send))
                .map_err(|e| {
                    error!("unable to spawn worker {}: {}", id, e);
                    FilterError::WorkerFault { worker: id }
                })?;
            workers.push(Worker {
                commands: Some(cmd_send),
                results: res_recv,
                handle: Some(handle),
            });
        }
        debug!("started {} filter workers", count);
        Ok(WorkerPool { workers })
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Runs one round and appends the finished outputs to `out` in slice
    /// order.
    ///
    /// `slices[i]` goes to worker `i`; empty slices are not dispatched.  On
    /// a fault nothing is appended to `out`.  Every busy worker is still
    /// waited on, so no worker is left mid-round when this returns.
    pub fn run(
        &self,
        job: &Arc<RoundJob<T>>,
        slices: &[WorkSlice],
        out: &mut Vec<Complex<T>>,
    ) -> Result<(), FilterError> {
        let mut fault = None;
        let mut busy = Vec::with_capacity(slices.len());

        for (id, (worker, slice)) in self.workers.iter().zip(slices).enumerate() {
            if slice.is_empty() {
                continue;
            }
            let cmd = Command::Run {
                job: Arc::clone(job),
                slice: slice.clone(),
            };
            let sent = match worker.commands {
                Some(ref commands) => commands.send(cmd).is_ok(),
                None => false,
            };
            if sent {
                busy.push(id);
            } else {
                error!("worker {} is gone, round {} cannot dispatch", id, job.round);
                fault.get_or_insert(FilterError::WorkerFault { worker: id });
            }
        }

        let mut parts = Vec::with_capacity(busy.len());
        for id in busy {
            match self.workers[id].results.recv() {
                Ok(part) => parts.push(part),
                Err(_) => {
                    error!("worker {} died during round {}", id, job.round);
                    fault.get_or_insert(FilterError::WorkerFault { worker: id });
                }
            }
        }

        match fault {
            Some(e) => Err(e),
            None => {
                parts.iter().for_each(|part| out.extend_from_slice(part));
                Ok(())
            }
        }
    }

    /// Closes every command channel and joins the threads.  Safe to call
    /// more than once.
    pub fn shutdown(&mut self) {
        for worker in self.workers.iter_mut() {
            worker.commands.take();
        }
        for (id, worker) in self.workers.iter_mut().enumerate() {
            if let Some(handle) = worker.handle.take() {
                if handle.join().is_err() {
                    debug!("worker {} exited by panicking", id);
                }
            }
        }
    }

    /// Makes `worker` panic on its next command.
    #[cfg(test)]
    pub(crate) fn inject_fault(&self, worker: usize) {
        if let Some(ref commands) = self.workers[worker].commands {
            let _ = commands.send(Command::Fail);
        }
    }
}

impl<T> Drop for WorkerPool<T>
where
    T: Sample,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn work<T>(id: usize, commands: Receiver<Command<T>>, results: Sender<Vec<Complex<T>>>)
where
    T: Sample,
{
    for cmd in commands.iter() {
        match cmd {
            Command::Run { job, slice } => {
                trace!("worker {} round {} slice {:?}", id, job.round, slice);
                let mut part = Vec::with_capacity(slice.len());
                convolve_range(
                    &job.scratch,
                    &job.taps,
                    job.decimation,
                    job.offset,
                    slice,
                    &mut part,
                );
                drop(job);
                if results.send(part).is_err() {
                    break;
                }
            }
            #[cfg(test)]
            Command::Fail => panic!("injected fault in worker {}", id),
        }
    }
    trace!("worker {} exiting", id);
}
