//! Filter settings as a hosting application stores them.
//!
//! ```yaml
//! decimation: 4
//! workers: 4
//! min_output_buffer: 8192
//! taps:
//!   kind: low_pass
//!   gain: 1.0
//!   sample_rate: 10.7622e6
//!   cutoff: 3.0e6
//!   transition_width: 0.6e6
//!   window: hamming
//! ```

use crate::filter::engine::MtFirFilter;
use crate::filter::fir::Sample;
use crate::filter::taps::TapSet;
use crate::filter::FilterError;
use crate::util::math::{low_pass, Window};
use crate::util::MathError;
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to parse filter config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error(transparent)]
    Math(#[from] MathError),

    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Where the filter taps come from.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TapSpec {
    /// Real taps listed verbatim.
    Explicit { taps: Vec<f64> },
    /// A windowed-sinc low pass design.
    LowPass {
        gain: f64,
        sample_rate: f64,
        cutoff: f64,
        transition_width: f64,
        #[serde(default)]
        window: Window,
    },
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FilterConfig {
    pub decimation: usize,
    pub workers: usize,
    #[serde(default)]
    pub min_output_buffer: usize,
    pub taps: TapSpec,
}

impl FilterConfig {
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Computes the real taps the config describes.
    pub fn design_taps<T>(&self) -> Result<TapSet<T>, ConfigError>
    where
        T: Sample,
    {
        let taps = match self.taps {
            TapSpec::Explicit { ref taps } => taps
                .iter()
                .map(|t| T::from(*t).ok_or(MathError::ConvertError))
                .collect::<Result<Vec<T>, _>>()?,
            TapSpec::LowPass {
                gain,
                sample_rate,
                cutoff,
                transition_width,
                window,
            } => low_pass(gain, sample_rate, cutoff, transition_width, window)?,
        };
        Ok(TapSet::Real(taps))
    }

    /// Builds a configured, not yet started, filter.
    pub fn build<T>(&self) -> Result<MtFirFilter<T>, ConfigError>
    where
        T: Sample,
    {
        let taps = self.design_taps()?;
        debug!("building filter with {} designed taps", taps.len());
        let mut filter = MtFirFilter::new();
        filter.configure(taps, self.decimation, self.workers)?;
        filter.min_output_buffer_hint(self.min_output_buffer);
        Ok(filter)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::filter::engine::EngineState;

    const HARNESS: &str = "
decimation: 4
workers: 4
min_output_buffer: 8192
taps:
  kind: low_pass
  gain: 1.0
  sample_rate: 10.7622e6
  cutoff: 3.0e6
  transition_width: 0.6e6
";

    #[test]
    fn test_parse_low_pass() {
        let config = FilterConfig::from_yaml(HARNESS).unwrap();
        assert_eq!(config.decimation, 4);
        assert_eq!(config.min_output_buffer, 8192);
        match config.taps {
            TapSpec::LowPass { window, .. } => assert_eq!(window, Window::Hamming),
            ref other => panic!("unexpected taps {:?}", other),
        }

        let filter = config.build::<f32>().unwrap();
        assert_eq!(filter.state(), EngineState::Ready);
        assert_eq!(filter.decimation(), 4);
        assert_eq!(filter.workers(), 4);
    }

    #[test]
    fn test_explicit_taps() {
        let config = FilterConfig::from_yaml(
            "decimation: 2\nworkers: 1\ntaps:\n  kind: explicit\n  taps: [0.5, 0.5]\n",
        )
        .unwrap();
        assert_eq!(config.min_output_buffer, 0);
        assert_eq!(
            config.design_taps::<f64>().unwrap(),
            TapSet::Real(vec![0.5, 0.5])
        );
        let text = config.to_yaml().unwrap();
        assert_eq!(FilterConfig::from_yaml(&text).unwrap(), config);
    }

    #[test]
    fn test_invalid_config() {
        let config = FilterConfig::from_yaml(
            "decimation: 0\nworkers: 1\ntaps:\n  kind: explicit\n  taps: [1.0]\n",
        )
        .unwrap();
        assert!(matches!(
            config.build::<f64>(),
            Err(ConfigError::Filter(FilterError::Configuration(_)))
        ));
        assert!(FilterConfig::from_yaml("decimation: two").is_err());
    }
}
