//! Decimates a raw IQ recording.
//!
//! ```text
//! cargo run --example file_decim -- in.cfile out.cfile [filter.yaml]
//! ```
//!
//! Without a config file the recording is low passed to 3 MHz and
//! decimated by four, assuming a 10.7622 MHz sample rate.

use log::{error, info};
use mtfir_rs::config::{FilterConfig, TapSpec};
use mtfir_rs::io::raw_iq::{IqReader, IqWriter};
use mtfir_rs::util::math::Window;
use std::error::Error;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::process;

const BATCH: usize = 8192;

fn default_config() -> FilterConfig {
    FilterConfig {
        decimation: 4,
        workers: 4,
        min_output_buffer: BATCH,
        taps: TapSpec::LowPass {
            gain: 1.0,
            sample_rate: 10.7622e6,
            cutoff: 3e6,
            transition_width: 0.6e6,
            window: Window::Hamming,
        },
    }
}

fn run(input: &str, output: &str, config: Option<&str>) -> Result<(), Box<dyn Error>> {
    let config = match config {
        Some(path) => FilterConfig::from_yaml(&fs::read_to_string(path)?)?,
        None => default_config(),
    };
    let mut filter = config.build::<f32>()?;
    filter.start()?;

    let reader = IqReader::new(BufReader::new(File::open(input)?), BATCH);
    let mut writer = IqWriter::new(BufWriter::new(File::create(output)?));
    let (mut read, mut written) = (0, 0);
    for batch in reader {
        let batch = batch?;
        let out = filter.process(&batch)?;
        writer.write_batch(&out)?;
        read += batch.len();
        written += out.len();
    }
    writer.flush()?;
    filter.stop()?;

    info!(
        "{} samples in, {} out over {} rounds with {} taps",
        read,
        written,
        filter.rounds(),
        filter.taps().map(|t| t.len()).unwrap_or(0)
    );
    Ok(())
}

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("usage: {} IN.cfile OUT.cfile [FILTER.yaml]", args[0]);
        process::exit(2);
    }
    if let Err(e) = run(&args[1], &args[2], args.get(3).map(String::as_str)) {
        error!("{}", e);
        process::exit(1);
    }
}
