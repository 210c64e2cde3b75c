//! Retained input history across buffer boundaries.
//!
//! A filter with `L` taps needs the `L - 1` samples preceding each buffer to
//! compute that buffer's first outputs.  Rather than a wrapping ring, each
//! round builds one contiguous scratch buffer (tail followed by the new
//! input) so the convolution kernel can index straight through the boundary.
//! The tail is only replaced by `commit`, after every reader of the scratch
//! buffer is done with it.

use crate::filter::fir::Sample;
use num::complex::Complex;
use num::Zero;

/// The trailing `L - 1` input samples of the stream so far.
#[derive(Clone, Debug)]
pub struct HistoryRing<T> {
    tail: Vec<Complex<T>>,
}

impl<T> HistoryRing<T>
where
    T: Sample,
{
    /// Creates a zeroed history of `len` samples.
    pub fn new(len: usize) -> Self {
        HistoryRing {
            tail: vec![Complex::zero(); len],
        }
    }

    pub fn len(&self) -> usize {
        self.tail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tail.is_empty()
    }

    pub fn tail(&self) -> &[Complex<T>] {
        &self.tail
    }

    /// Builds the scratch buffer for a round: the retained tail followed by
    /// `input`.
    ///
    /// # Examples
    ///
    /// ```
    /// use mtfir_rs::filter::history::HistoryRing;
    /// use num::Complex;
    ///
    /// let mut history = HistoryRing::<f32>::new(2);
    /// let input = vec![Complex::new(1.0, 0.0), Complex::new(2.0, 0.0)];
    /// let scratch = history.append(&input);
    /// assert_eq!(scratch.len(), 4);
    /// history.commit(&scratch);
    /// assert_eq!(history.tail(), &input[..]);
    /// ```
    pub fn append(&self, input: &[Complex<T>]) -> Vec<Complex<T>> {
        let mut scratch = Vec::with_capacity(self.tail.len() + input.len());
        scratch.extend_from_slice(&self.tail);
        scratch.extend_from_slice(input);
        scratch
    }

    /// Keeps the last `len()` samples of a scratch buffer built by `append`
    /// as the new tail.
    pub fn commit(&mut self, scratch: &[Complex<T>]) {
        let len = self.tail.len();
        debug_assert!(scratch.len() >= len);
        self.tail.copy_from_slice(&scratch[scratch.len() - len..]);
    }

    /// Changes the retained length.  The most recent samples are kept and a
    /// grown history is zero padded at the old end.
    pub fn resize(&mut self, len: usize) {
        let old = self.tail.len();
        if len < old {
            self.tail.drain(..old - len);
        } else if len > old {
            let mut tail = vec![Complex::zero(); len - old];
            tail.extend_from_slice(&self.tail);
            self.tail = tail;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn real(xs: &[f64]) -> Vec<Complex<f64>> {
        xs.iter().map(|x| Complex::new(*x, 0.0)).collect()
    }

    #[test]
    fn test_commit_keeps_last_samples() {
        let mut history = HistoryRing::new(3);
        let scratch = history.append(&real(&[1.0, 2.0, 3.0, 4.0, 5.0]));
        assert_eq!(scratch, real(&[0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 4.0, 5.0]));
        history.commit(&scratch);
        assert_eq!(history.tail(), &real(&[3.0, 4.0, 5.0])[..]);
    }

    #[test]
    fn test_short_input_shifts_tail() {
        let mut history = HistoryRing::new(3);
        history.commit(&history.append(&real(&[1.0, 2.0, 3.0])));
        history.commit(&history.append(&real(&[4.0])));
        assert_eq!(history.tail(), &real(&[2.0, 3.0, 4.0])[..]);
    }

    #[test]
    fn test_zero_length_history() {
        let mut history = HistoryRing::<f64>::new(0);
        assert!(history.is_empty());
        let scratch = history.append(&real(&[7.0]));
        history.commit(&scratch);
        assert_eq!(scratch, real(&[7.0]));
        assert!(history.tail().is_empty());
    }

    #[test]
    fn test_resize() {
        let mut history = HistoryRing::new(3);
        history.commit(&history.append(&real(&[1.0, 2.0, 3.0])));

        history.resize(1);
        assert_eq!(history.tail(), &real(&[3.0])[..]);

        history.resize(4);
        assert_eq!(history.tail(), &real(&[0.0, 0.0, 0.0, 3.0])[..]);
    }
}
