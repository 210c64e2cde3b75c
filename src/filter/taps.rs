//! Filter taps and their publication.
//!
//! A `TapSet` is immutable once built.  Replacing the taps of a running
//! filter goes through a `TapStore`: any thread may `publish` a new set, but
//! only the round driver calls `take_pending`, and only between rounds.  The
//! set a round convolves against is a `Snapshot` holding an `Arc`, so workers
//! never touch the store and no lock is held while convolving.

use crate::filter::fir::{is_finite_sample, Sample};
use crate::filter::FilterError;
use num::complex::Complex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// An FIR tap vector.
///
/// Real taps scale each complex sample component-wise, complex taps perform
/// a full complex multiply.
#[derive(Clone, Debug, PartialEq)]
pub enum TapSet<T> {
    Real(Vec<T>),
    Complex(Vec<Complex<T>>),
}

impl<T> TapSet<T>
where
    T: Sample,
{
    pub fn len(&self) -> usize {
        match self {
            TapSet::Real(h) => h.len(),
            TapSet::Complex(h) => h.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks the set is non-empty and every tap is finite.
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.is_empty() {
            return Err(FilterError::Configuration(
                "tap vector must contain at least one tap".to_string(),
            ));
        }
        let bad = match self {
            TapSet::Real(h) => h.iter().position(|t| !t.is_finite()),
            TapSet::Complex(h) => h.iter().position(|t| !is_finite_sample(t)),
        };
        match bad {
            Some(index) => Err(FilterError::NonFiniteTap { index }),
            None => Ok(()),
        }
    }
}

macro_rules! impl_from_real {
    ($($t:ty),*) => {
        $(
            impl From<Vec<$t>> for TapSet<$t> {
                fn from(taps: Vec<$t>) -> Self {
                    TapSet::Real(taps)
                }
            }
        )*
    };
}

impl_from_real!(f32, f64);

impl<T> From<Vec<Complex<T>>> for TapSet<T> {
    fn from(taps: Vec<Complex<T>>) -> Self {
        TapSet::Complex(taps)
    }
}

/// The taps a round convolves against, tagged with their publication
/// version.
#[derive(Debug)]
pub struct Snapshot<T> {
    pub taps: Arc<TapSet<T>>,
    pub version: u64,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Snapshot {
            taps: Arc::clone(&self.taps),
            version: self.version,
        }
    }
}

/// Single-writer handoff slot for tap updates.
///
/// Publishing overwrites any set still waiting, so the latest publication
/// before a round boundary is the one adopted.
#[derive(Debug)]
pub struct TapStore<T> {
    pending: Mutex<Option<Snapshot<T>>>,
    versions: AtomicU64,
}

impl<T> Default for TapStore<T> {
    fn default() -> Self {
        TapStore {
            pending: Mutex::new(None),
            versions: AtomicU64::new(0),
        }
    }
}

impl<T> TapStore<T>
where
    T: Sample,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `taps` and queues them for the next round.  Returns the
    /// version the set was published under.
    pub fn publish(&self, taps: TapSet<T>) -> Result<u64, FilterError> {
        let snapshot = self.versioned(taps)?;
        let version = snapshot.version;
        *self.lock_pending() = Some(snapshot);
        Ok(version)
    }

    /// Validates `taps` and returns them as an immediately usable snapshot,
    /// discarding anything pending.
    pub fn install(&self, taps: TapSet<T>) -> Result<Snapshot<T>, FilterError> {
        let snapshot = self.versioned(taps)?;
        self.lock_pending().take();
        Ok(snapshot)
    }

    /// Removes and returns the pending set, if any.
    pub fn take_pending(&self) -> Option<Snapshot<T>> {
        self.lock_pending().take()
    }

    pub fn has_pending(&self) -> bool {
        self.lock_pending().is_some()
    }

    fn versioned(&self, taps: TapSet<T>) -> Result<Snapshot<T>, FilterError> {
        taps.validate()?;
        let version = self.versions.fetch_add(1, Ordering::AcqRel) + 1;
        Ok(Snapshot {
            taps: Arc::new(taps),
            version,
        })
    }

    // Nothing panics while holding the slot, but a poisoned slot still holds
    // a whole snapshot so it is safe to keep using.
    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Option<Snapshot<T>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
