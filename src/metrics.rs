//! Metric reporting for training runs.
//!
//! A sink receives one scalar (the group's mean return) per update.
//! Sink failures are non-fatal: the trainer logs and continues.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Destination for per-update training metrics.
pub trait MetricsSink {
    /// Records the mean group return for one update.
    fn record(&mut self, update: u32, mean_return: f64) -> io::Result<()>;
}

/// Discards all metrics.
pub struct NullSink;

impl MetricsSink for NullSink {
    fn record(&mut self, _update: u32, _mean_return: f64) -> io::Result<()> {
        Ok(())
    }
}

/// Writes one line per update to stderr.
pub struct ConsoleSink;

impl MetricsSink for ConsoleSink {
    fn record(&mut self, update: u32, mean_return: f64) -> io::Result<()> {
        eprintln!("update={} mean_return={:.4}", update, mean_return);
        Ok(())
    }
}

/// Appends `update,mean_return` rows to a CSV file.
pub struct CsvSink {
    writer: BufWriter<File>,
}

impl CsvSink {
    /// Creates (or truncates) the CSV file and writes the header row.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "update,mean_return")?;
        Ok(Self { writer })
    }
}

impl MetricsSink for CsvSink {
    fn record(&mut self, update: u32, mean_return: f64) -> io::Result<()> {
        writeln!(self.writer, "{},{}", update, mean_return)?;
        self.writer.flush()
    }
}
