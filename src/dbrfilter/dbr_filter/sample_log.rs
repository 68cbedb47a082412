use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Local};

/// Name of the shared log in the output directory.
pub const LOG_NAME: &str = "DBR_filtered_sequences_logfile.csv";

/// One row of the shared log: the outcome of filtering one sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSummary {
    sample: String,
    removed: usize,
    primary: usize,
    finished: DateTime<Local>,
}

impl SampleSummary {
    pub fn new(sample: &str, removed: usize, primary: usize) -> Self {
        Self::at(sample, removed, primary, Local::now())
    }

    pub fn at(sample: &str, removed: usize, primary: usize, finished: DateTime<Local>) -> Self {
        SampleSummary {
            sample: sample.to_string(),
            removed,
            primary,
            finished,
        }
    }

    pub fn sample(&self) -> &str {
        &self.sample
    }

    pub fn removed(&self) -> usize {
        self.removed
    }

    pub fn primary(&self) -> usize {
        self.primary
    }

    /// The row as comma-delimited text, with its line terminator.
    pub fn row(&self) -> Result<Vec<u8>> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        wtr.write_record([
            self.sample.clone(),
            self.removed.to_string(),
            self.primary.to_string(),
            self.finished.format("%d/%m/%Y").to_string(),
            self.finished.format("%H:%M:%S").to_string(),
        ])?;
        wtr.into_inner().map_err(|e| anyhow!("{}", e.error()))
    }
}

/// Append-only log shared by all sample tasks. Each row goes out in a
/// single write while holding the lock, so rows from concurrent tasks
/// never interleave.
#[derive(Debug)]
pub struct SampleLog {
    path: PathBuf,
    dest: Mutex<fs::File>,
}

impl SampleLog {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let dest = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening log {}", path.display()))?;
        Ok(SampleLog {
            path,
            dest: Mutex::new(dest),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, summary: &SampleSummary) -> Result<()> {
        let row = summary.row()?;
        let mut dest = self
            .dest
            .lock()
            .map_err(|_| anyhow!("log {} lock poisoned", self.path.display()))?;
        dest.write_all(&row)
            .with_context(|| format!("appending to log {}", self.path.display()))?;
        dest.flush()?;
        Ok(())
    }
}
