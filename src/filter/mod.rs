//! Filtering of complex sample streams.
//!
//! FIR filters are feedforward based systems, meaning they can't become
//! unstable regardless of the input data.  They are easy to implement, have a
//! linear phase response, and a constant and predictable group delay over
//! frequency.  The primary disadvantage is computational cost: every output
//! sample is a dot product over the full tap vector.
//!
//! This module splits that cost across threads.  The `engine` module drives
//! rounds: each input buffer is joined to the retained history, the output
//! index range is partitioned across a persistent pool of workers, and the
//! finished buffer is only handed back once every worker has reported in.
//!
//! * `taps` - versioned tap storage with next-round publication
//! * `history` - the trailing samples carried across buffer boundaries
//! * `partition` - balanced splitting of an output range into work slices
//! * `pool` - the persistent worker threads
//! * `fir` - the convolution kernel and the single-threaded reference filter
//! * `engine` - `MtFirFilter`, the round driver and lifecycle state machine
pub mod engine;
pub mod fir;
pub mod history;
pub mod partition;
pub mod pool;
pub mod taps;

use self::engine::EngineState;
use thiserror::Error;

/// Errors reported by the filter engine.
///
/// `WorkerFault` is terminal: the engine moves to `EngineState::Faulted` and
/// every later call is rejected with a `State` error.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum FilterError {
    #[error("invalid filter configuration: {0}")]
    Configuration(String),

    #[error("cannot {op} while the engine is {state}")]
    State { state: EngineState, op: &'static str },

    #[error("worker {worker} terminated before completing its slice")]
    WorkerFault { worker: usize },

    #[error("non-finite input sample at index {index}")]
    NonFiniteSample { index: usize },

    #[error("non-finite filter tap at index {index}")]
    NonFiniteTap { index: usize },
}
