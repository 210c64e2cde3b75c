//! A multi-threaded decimating FIR filter for high-rate complex sample
//! streams.
//!
//! The heart of the crate is `filter::engine::MtFirFilter`, which keeps a
//! persistent pool of worker threads and splits each input buffer's outputs
//! across them.  Taps can be swapped while the filter runs; a new tap set
//! takes effect at the next buffer boundary and never mid-buffer.
//!
//! Around it sit a single-threaded reference filter (`filter::fir`), low pass
//! tap design (`util::math`), raw IQ file input and output (`io::raw_iq`) and
//! serializable settings (`config`).

pub mod config;
pub mod filter;
pub mod io;
pub mod prelude;
pub mod util;
