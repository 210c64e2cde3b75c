//! This module provides an easy single import for those using this crate.

pub use crate::filter::engine::{EngineState, MtFirFilter, TapHandle};
pub use crate::filter::fir::{DecimFir, Sample};
pub use crate::filter::taps::TapSet;
pub use crate::filter::FilterError;
pub use num::Complex;
