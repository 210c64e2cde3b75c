//! File input/output for complex sample streams.

pub mod raw_iq;
