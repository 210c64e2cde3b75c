//! The decimating FIR convolution kernel.
//!
//! Output `n` of a round is taken at input position `phase + n * decimation`
//! and computed as
//!
//! ```text
//! y[n] = sum_{k=0}^{L-1} taps[k] * scratch[phase + n * decimation + (L - 1) - k]
//! ```
//!
//! where `scratch` is the retained history (`L - 1` samples) followed by the
//! round's input.  The `L - 1` offset keeps every index non-negative, so the
//! kernel never needs a bounds special case at buffer starts.
//!
//! An output is computed in the round its input position arrives, but only
//! released once its whole decimation block of `decimation` inputs is in, so
//! a stream of `m` samples yields `m / decimation` outputs however it was
//! split.  The one output still waiting on its block is carried over.
//!
//! `DecimFir` runs the same kernel on the calling thread and is the reference
//! the threaded engine is checked against.

use crate::filter::history::HistoryRing;
use crate::filter::taps::TapSet;
use crate::filter::FilterError;
use num::complex::Complex;
use num::Zero;
use num_traits::Float;
use std::fmt::Debug;
use std::ops::Range;

/// Scalar type of the complex samples and taps the filters operate on.
pub trait Sample: Float + Debug + Send + Sync + 'static {}

impl<T> Sample for T where T: Float + Debug + Send + Sync + 'static {}

/// Number of outputs a round computes.
///
/// # Arguments
///
/// * `phase` - Offset into this round's input of the first output position.
/// * `input_len` - Number of new input samples in the round.
/// * `decimation` - Decimation factor, at least 1.
///
/// # Examples
///
/// ```
/// use mtfir_rs::filter::fir::output_len;
///
/// assert_eq!(output_len(0, 8, 4), 2);
/// assert_eq!(output_len(1, 3, 2), 1);
/// assert_eq!(output_len(5, 3, 8), 0);
/// ```
pub fn output_len(phase: usize, input_len: usize, decimation: usize) -> usize {
    if input_len > phase {
        (input_len - phase - 1) / decimation + 1
    } else {
        0
    }
}

/// Phase carried into the next round after consuming `input_len` samples.
/// Zero exactly when the stream so far fills whole decimation blocks.
pub fn next_phase(phase: usize, input_len: usize, decimation: usize) -> usize {
    if input_len > phase {
        (decimation - (input_len - phase) % decimation) % decimation
    } else {
        phase - input_len
    }
}

/// Takes the newest computed output back out of `output` while its
/// decimation block is still open, i.e. while `next_phase` is non-zero.
pub fn hold_open_block<T>(
    output: &mut Vec<Complex<T>>,
    next_phase: usize,
) -> Option<Complex<T>> {
    if next_phase == 0 {
        None
    } else {
        output.pop()
    }
}

pub(crate) fn is_finite_sample<T: Sample>(x: &Complex<T>) -> bool {
    x.re.is_finite() && x.im.is_finite()
}

/// Convolves the outputs in `range` and appends them to `out`.
///
/// # Arguments
///
/// * `scratch` - History tail followed by the round's input.
/// * `taps` - Tap snapshot for the round.
/// * `decimation` - Decimation factor.
/// * `offset` - Scratch index of output 0, `phase + taps.len() - 1`.
/// * `range` - Output indices to compute.
/// * `out` - Destination for the computed outputs.
pub fn convolve_range<T>(
    scratch: &[Complex<T>],
    taps: &TapSet<T>,
    decimation: usize,
    offset: usize,
    range: Range<usize>,
    out: &mut Vec<Complex<T>>,
) where
    T: Sample,
{
    let len = taps.len();
    match taps {
        TapSet::Real(h) => {
            for n in range {
                let last = offset + n * decimation;
                let window = &scratch[last + 1 - len..=last];
                out.push(
                    h.iter()
                        .zip(window.iter().rev())
                        .map(|(tap, x)| x.scale(*tap))
                        .fold(Complex::zero(), |acc, y| acc + y),
                );
            }
        }
        TapSet::Complex(h) => {
            for n in range {
                let last = offset + n * decimation;
                let window = &scratch[last + 1 - len..=last];
                out.push(
                    h.iter()
                        .zip(window.iter().rev())
                        .map(|(tap, x)| *tap * *x)
                        .fold(Complex::zero(), |acc, y| acc + y),
                );
            }
        }
    }
}

/// Single-threaded decimating FIR filter with the same stream semantics as
/// `MtFirFilter`: zero initial history, decimation phase carried across
/// calls, taps replaced between calls.
pub struct DecimFir<T>
where
    T: Sample,
{
    taps: TapSet<T>,
    decimation: usize,
    history: HistoryRing<T>,
    phase: usize,
    held: Option<Complex<T>>,
}

impl<T> DecimFir<T>
where
    T: Sample,
{
    /// Creates a new `DecimFir` with zeroed history.
    ///
    /// # Examples
    ///
    /// ```
    /// use mtfir_rs::filter::fir::DecimFir;
    /// use num::Complex;
    ///
    /// let mut fir = DecimFir::new(vec![0.5_f64, 0.5].into(), 2).unwrap();
    /// let input: Vec<Complex<f64>> =
    ///     [2.0, 4.0, 6.0, 8.0].iter().map(|x| Complex::new(*x, 0.0)).collect();
    /// let output = fir.process(&input);
    /// assert_eq!(output, vec![Complex::new(1.0, 0.0), Complex::new(5.0, 0.0)]);
    /// ```
    pub fn new(taps: TapSet<T>, decimation: usize) -> Result<Self, FilterError> {
        taps.validate()?;
        if decimation == 0 {
            return Err(FilterError::Configuration(
                "decimation factor must be at least 1".to_string(),
            ));
        }
        let history = HistoryRing::new(taps.len() - 1);
        Ok(DecimFir {
            taps,
            decimation,
            history,
            phase: 0,
            held: None,
        })
    }

    /// Replaces the taps, resizing the history if the length changed.
    pub fn set_taps(&mut self, taps: TapSet<T>) -> Result<(), FilterError> {
        taps.validate()?;
        self.history.resize(taps.len() - 1);
        self.taps = taps;
        Ok(())
    }

    pub fn taps(&self) -> &TapSet<T> {
        &self.taps
    }

    /// Filters and decimates one buffer of input.
    pub fn process(&mut self, input: &[Complex<T>]) -> Vec<Complex<T>> {
        let n_out = output_len(self.phase, input.len(), self.decimation);
        let scratch = self.history.append(input);
        let mut output = Vec::with_capacity(n_out + 1);
        output.extend(self.held.take());
        convolve_range(
            &scratch,
            &self.taps,
            self.decimation,
            self.phase + self.history.len(),
            0..n_out,
            &mut output,
        );
        self.history.commit(&scratch);
        self.phase = next_phase(self.phase, input.len(), self.decimation);
        self.held = hold_open_block(&mut output, self.phase);
        output
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn real(xs: &[f64]) -> Vec<Complex<f64>> {
        xs.iter().map(|x| Complex::new(*x, 0.0)).collect()
    }

    #[test]
    fn test_output_len_and_phase() {
        assert_eq!(output_len(0, 5, 1), 5);
        assert_eq!(output_len(0, 4, 2), 2);
        assert_eq!(output_len(0, 3, 2), 2);
        assert_eq!(next_phase(0, 3, 2), 1);
        assert_eq!(output_len(1, 3, 2), 1);
        assert_eq!(next_phase(1, 3, 2), 0);
        assert_eq!(output_len(3, 3, 4), 0);
        assert_eq!(next_phase(3, 3, 4), 0);
        assert_eq!(output_len(5, 3, 8), 0);
        assert_eq!(next_phase(5, 3, 8), 2);
    }

    #[test]
    fn test_huge_decimation() {
        let max = usize::MAX;
        assert_eq!(output_len(0, 2, max), 1);
        assert_eq!(next_phase(0, 2, max), max - 2);
        assert_eq!(output_len(max - 2, 5, max), 0);
        assert_eq!(next_phase(max - 2, 5, max), max - 7);
        assert_eq!(output_len(0, max, max), 1);
        assert_eq!(next_phase(0, max, max), 0);

        let mut fir = DecimFir::new(TapSet::Real(vec![1.0]), max).unwrap();
        assert!(fir.process(&real(&[1.0, 2.0])).is_empty());
        assert!(fir.process(&real(&[3.0])).is_empty());
    }

    #[test]
    fn test_releases_whole_blocks_only() {
        let mut fir = DecimFir::new(TapSet::Real(vec![1.0]), 2).unwrap();
        // Output 1 sits at input 2 but its block is not complete yet.
        assert_eq!(fir.process(&real(&[1.0, 2.0, 3.0])), real(&[1.0]));
        assert_eq!(fir.process(&real(&[4.0])), real(&[3.0]));
        assert_eq!(fir.process(&real(&[5.0, 6.0, 7.0])), real(&[5.0]));
        assert_eq!(fir.process(&real(&[8.0, 9.0])), real(&[7.0]));

        let mut fir = DecimFir::new(TapSet::Real(vec![1.0]), 4).unwrap();
        for x in 1..4 {
            assert!(fir.process(&real(&[x as f64])).is_empty());
        }
        assert_eq!(fir.process(&real(&[4.0])), real(&[1.0]));
    }

    #[test]
    fn test_identity() {
        let mut fir = DecimFir::new(TapSet::Real(vec![1.0]), 1).unwrap();
        let input = real(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(fir.process(&input), input);
    }

    #[test]
    fn test_two_tap_decimate_by_two() {
        let mut fir = DecimFir::new(TapSet::Real(vec![0.5, 0.5]), 2).unwrap();
        let output = fir.process(&real(&[2.0, 4.0, 6.0, 8.0]));
        assert_eq!(output, real(&[1.0, 5.0]));

        // The next buffer starts with 8 in the history.
        let output = fir.process(&real(&[10.0, 12.0]));
        assert_eq!(output, real(&[9.0]));
    }

    #[test]
    fn test_complex_taps() {
        // Same vectors as the classic sample-by-sample FIR check.
        let taps = TapSet::Complex(vec![
            Complex::new(9.0, 0.0),
            Complex::new(8.0, 7.0),
            Complex::new(6.0, 5.0),
            Complex::new(4.0, 3.0),
            Complex::new(2.0, 1.0),
        ]);
        let mut fir = DecimFir::new(taps, 1).unwrap();
        let mut input = vec![
            Complex::new(1.0, 2.0),
            Complex::new(3.0, 4.0),
            Complex::new(5.0, 6.0),
            Complex::new(7.0, 8.0),
            Complex::new(9.0, 0.0),
        ];
        input.extend(vec![Complex::zero(); 4]);
        let expected = vec![
            Complex::new(9.0, 18.0),
            Complex::new(21.0, 59.0),
            Complex::new(37.0, 124.0),
            Complex::new(57.0, 205.0),
            Complex::new(81.0, 204.0),
            Complex::new(78.0, 196.0),
            Complex::new(62.0, 115.0),
            Complex::new(42.0, 50.0),
            Complex::new(18.0, 9.0),
        ];
        assert_eq!(fir.process(&input), expected);
    }

    #[test]
    fn test_real_taps_scale_components() {
        let mut fir = DecimFir::new(TapSet::Real(vec![0.25_f32, 0.75]), 1).unwrap();
        let output = fir.process(&[Complex::new(4.0, -8.0), Complex::new(1.0, 2.0)]);
        assert_approx_eq!(output[0].re, 1.0);
        assert_approx_eq!(output[0].im, -2.0);
        assert_approx_eq!(output[1].re, 3.25);
        assert_approx_eq!(output[1].im, -5.5);
    }

    #[test]
    fn test_convolve_range_subrange() {
        let taps = TapSet::Real(vec![1.0, -1.0]);
        // One history sample followed by the input.
        let scratch = real(&[0.0, 1.0, 4.0, 9.0, 16.0, 25.0]);
        let mut out = Vec::new();
        convolve_range(&scratch, &taps, 1, 1, 2..4, &mut out);
        assert_eq!(out, real(&[5.0, 7.0]));
    }

    #[test]
    fn test_set_taps_resizes_history() {
        let mut fir = DecimFir::new(TapSet::Real(vec![1.0]), 1).unwrap();
        fir.process(&real(&[1.0, 2.0, 3.0]));
        fir.set_taps(TapSet::Real(vec![1.0, 1.0, 1.0])).unwrap();
        // The old taps kept no history, so the grown history is zero padded.
        assert_eq!(fir.process(&real(&[1.0])), real(&[1.0]));
        assert_eq!(fir.process(&real(&[1.0])), real(&[2.0]));
        assert_eq!(fir.process(&real(&[1.0])), real(&[3.0]));
    }

    #[test]
    fn test_rejects_bad_config() {
        assert!(DecimFir::<f64>::new(TapSet::Real(vec![]), 1).is_err());
        assert!(DecimFir::new(TapSet::Real(vec![1.0_f64]), 0).is_err());
    }
}
