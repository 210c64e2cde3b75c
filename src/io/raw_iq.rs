//! Reading and writing raw IQ recordings.
//!
//! Samples are stored as interleaved 32-bit floats in host byte-order, first
//! the real then the imaginary part: the layout of a `.cfile` recording.
//! The reader hands out batches of a caller-chosen size, which map directly
//! onto filter rounds.

use byteorder::{ByteOrder, NativeEndian, WriteBytesExt};
use log::trace;
use num::Complex;
use std::io::{self, Read, Write};
use thiserror::Error;

type IQSample = Complex<f32>;

const SAMPLE_BYTES: usize = 8;

#[derive(Debug, Error)]
pub enum IqError {
    #[error("raw IQ i/o failed: {0}")]
    Io(#[from] io::Error),

    #[error("recording ends {0} bytes into a sample")]
    TruncatedSample(usize),
}

/// Reads batches of samples from a raw IQ recording.
///
/// Every batch holds `batch_size` samples except possibly the last one.  A
/// recording whose length is not a whole number of samples is reported as
/// `IqError::TruncatedSample` rather than padded.
pub struct IqReader<R>
where
    R: Read,
{
    reader: R,
    buf: Vec<u8>,
}

impl<R: Read> IqReader<R> {
    /// Make an IqReader pulling `batch_size` samples per batch.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::fs::File;
    /// use std::io::BufReader;
    /// use mtfir_rs::io::raw_iq::IqReader;
    ///
    /// let reader = BufReader::new(File::open("/tmp/atsctest.cfile").unwrap());
    /// let mut source = IqReader::new(reader, 8192);
    /// while let Some(batch) = source.read_batch().unwrap() {
    ///     println!("{} samples", batch.len());
    /// }
    /// ```
    pub fn new(reader: R, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        IqReader {
            reader,
            buf: vec![0; batch_size * SAMPLE_BYTES],
        }
    }

    /// Reads the next batch.  Returns `Ok(None)` at a clean end of stream.
    pub fn read_batch(&mut self) -> Result<Option<Vec<IQSample>>, IqError> {
        let mut filled = 0;
        while filled < self.buf.len() {
            match self.reader.read(&mut self.buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        if filled % SAMPLE_BYTES != 0 {
            return Err(IqError::TruncatedSample(filled % SAMPLE_BYTES));
        }
        if filled == 0 {
            return Ok(None);
        }

        let batch = self.buf[..filled]
            .chunks_exact(SAMPLE_BYTES)
            .map(|b| {
                Complex::new(
                    NativeEndian::read_f32(&b[..4]),
                    NativeEndian::read_f32(&b[4..]),
                )
            })
            .collect::<Vec<_>>();
        trace!("read {} samples", batch.len());
        Ok(Some(batch))
    }
}

impl<R: Read> Iterator for IqReader<R> {
    type Item = Result<Vec<IQSample>, IqError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_batch().transpose()
    }
}

/// Writes samples to a raw IQ recording.
pub struct IqWriter<W>
where
    W: Write,
{
    writer: W,
}

impl<W: Write> IqWriter<W> {
    pub fn new(writer: W) -> Self {
        IqWriter { writer }
    }

    pub fn write_batch(&mut self, samples: &[IQSample]) -> Result<(), IqError> {
        for samp in samples {
            self.writer.write_f32::<NativeEndian>(samp.re)?;
            self.writer.write_f32::<NativeEndian>(samp.im)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), IqError> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    fn ramp(n: usize) -> Vec<IQSample> {
        (0..n).map(|i| Complex::new(i as f32, -(i as f32) * 0.5)).collect()
    }

    fn encode(samples: &[IQSample]) -> Vec<u8> {
        let mut writer = IqWriter::new(Vec::new());
        writer.write_batch(samples).unwrap();
        writer.into_inner()
    }

    #[test]
    fn test_batches_with_short_tail() {
        let samples = ramp(10);
        let bytes = encode(&samples);
        assert_eq!(bytes.len(), 10 * SAMPLE_BYTES);

        let batches = IqReader::new(Cursor::new(bytes), 4)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(
            batches.iter().map(|b| b.len()).collect::<Vec<_>>(),
            vec![4, 4, 2]
        );
        assert_eq!(batches.concat(), samples);
    }

    #[test]
    fn test_native_layout() {
        let bytes = encode(&[Complex::new(1.5, -2.0)]);
        assert_eq!(NativeEndian::read_f32(&bytes[..4]), 1.5);
        assert_eq!(NativeEndian::read_f32(&bytes[4..]), -2.0);
    }

    #[test]
    fn test_truncated_sample() {
        let mut bytes = encode(&ramp(3));
        bytes.truncate(bytes.len() - 3);
        let mut reader = IqReader::new(Cursor::new(bytes), 8);
        match reader.read_batch() {
            Err(IqError::TruncatedSample(5)) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_empty_recording() {
        let mut reader = IqReader::new(Cursor::new(Vec::new()), 8);
        assert!(reader.read_batch().unwrap().is_none());
    }
}
