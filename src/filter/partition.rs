//! Splitting a round's output range across workers.

use std::ops::Range;

/// A contiguous, half-open range of output indices computed by one worker.
pub type WorkSlice = Range<usize>;

/// Splits `[0, total)` into `workers` contiguous slices whose lengths differ
/// by at most one.  The first `total % workers` slices get the extra sample.
///
/// Slices are returned in output order, one per worker.  When `total` is
/// smaller than `workers` the trailing slices are empty and those workers
/// sit the round out.
///
/// # Examples
///
/// ```
/// use mtfir_rs::filter::partition::partition;
///
/// assert_eq!(partition(10, 4), vec![0..3, 3..6, 6..8, 8..10]);
/// assert_eq!(partition(2, 4), vec![0..1, 1..2, 2..2, 2..2]);
/// ```
pub fn partition(total: usize, workers: usize) -> Vec<WorkSlice> {
    if workers == 0 {
        return Vec::new();
    }
    let base = total / workers;
    let extra = total % workers;
    let mut start = 0;
    (0..workers)
        .map(|i| {
            let len = if i < extra { base + 1 } else { base };
            let slice = start..start + len;
            start += len;
            slice
        })
        .collect()
}
