use crate::util::MathError;
use num_traits::{Float, NumCast};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Window applied to the ideal low pass impulse response.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Window {
    #[default]
    Hamming,
    Hann,
    Blackman,
    Rectangular,
}

impl Window {
    /// Stopband attenuation in dB the window reaches, used to size the
    /// filter from its transition width.
    pub fn max_attenuation(self) -> f64 {
        match self {
            Window::Hamming => 53.0,
            Window::Hann => 44.0,
            Window::Blackman => 74.0,
            Window::Rectangular => 21.0,
        }
    }

    /// Window coefficients for `ntaps` taps.
    pub fn coefficients(self, ntaps: usize) -> Vec<f64> {
        if ntaps == 1 {
            return vec![1.0];
        }
        let m = (ntaps - 1) as f64;
        (0..ntaps)
            .map(|n| {
                let x = 2.0 * PI * n as f64 / m;
                match self {
                    Window::Hamming => 0.54 - 0.46 * x.cos(),
                    Window::Hann => 0.5 - 0.5 * x.cos(),
                    Window::Blackman => 0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos(),
                    Window::Rectangular => 1.0,
                }
            })
            .collect()
    }
}

/// Number of taps a windowed low pass needs for the given transition width.
/// Always odd so the filter has a center tap.
pub fn low_pass_len(sample_rate: f64, transition_width: f64, window: Window) -> usize {
    let ntaps = (window.max_attenuation() * sample_rate / (22.0 * transition_width)) as usize;
    ntaps | 1
}

/// Windowed-sinc low pass filter tap calculator.
///
/// The passband gain at DC is normalized to `gain`.
///
/// # Arguments
///
/// * `gain` - DC gain of the filter.
/// * `sample_rate` - Sample rate in Hz.
/// * `cutoff` - Cutoff frequency in Hz, at most `sample_rate / 2`.
/// * `transition_width` - Width of the transition band in Hz.
/// * `window` - Window applied to the ideal response.
///
/// # Examples
///
/// ```
/// use mtfir_rs::util::math::{low_pass, Window};
///
/// let taps: Vec<f32> = low_pass(1.0, 10.7622e6, 3e6, 0.6e6, Window::Hamming).unwrap();
/// assert_eq!(taps.len() % 2, 1);
/// ```
pub fn low_pass<T>(
    gain: f64,
    sample_rate: f64,
    cutoff: f64,
    transition_width: f64,
    window: Window,
) -> Result<Vec<T>, MathError>
where
    T: Float + NumCast,
{
    if !(sample_rate > 0.0) {
        return Err(MathError::InvalidSampleRate);
    }
    if !(cutoff > 0.0 && cutoff <= sample_rate / 2.0) {
        return Err(MathError::InvalidCutoff);
    }
    if !(transition_width > 0.0) {
        return Err(MathError::InvalidTransitionWidth);
    }

    let ntaps = low_pass_len(sample_rate, transition_width, window);
    let w = window.coefficients(ntaps);
    let m = (ntaps / 2) as isize;
    let fwt0 = 2.0 * PI * cutoff / sample_rate;

    let mut taps: Vec<f64> = (-m..=m)
        .zip(w.iter())
        .map(|(n, w)| {
            if n == 0 {
                fwt0 / PI * w
            } else {
                let n = n as f64;
                (n * fwt0).sin() / (n * PI) * w
            }
        })
        .collect();

    let dc: f64 = taps.iter().sum();
    taps.iter_mut().for_each(|t| *t *= gain / dc);

    taps.into_iter()
        .map(|t| T::from(t).ok_or(MathError::ConvertError))
        .collect()
}
