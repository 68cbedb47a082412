use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use bio::io::fastq;

use crate::error::DbrError;
use crate::tag_map::TagRange;

/// Output format for tag counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountFormat {
    Json,
    Text,
}

impl CountFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            CountFormat::Json => "json",
            CountFormat::Text => "txt",
        }
    }
}

impl FromStr for CountFormat {
    type Err = DbrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(CountFormat::Json),
            "text" | "txt" => Ok(CountFormat::Text),
            _ => Err(DbrError::BadOption {
                option: "format".to_string(),
                reason: format!("\"{}\" is not json or text", s),
            }),
        }
    }
}

/// Number of reads carrying each tag in one raw sequence file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagCounts {
    counts: BTreeMap<String, u64>,
    total: u64,
}

impl TagCounts {
    pub fn new() -> Self {
        TagCounts::default()
    }

    pub fn tally(&mut self, tag: &[u8]) {
        *self
            .counts
            .entry(String::from_utf8_lossy(tag).into_owned())
            .or_insert(0) += 1;
        self.total += 1;
    }

    pub fn get(&self, tag: &str) -> u64 {
        self.counts.get(tag).copied().unwrap_or(0)
    }

    /// Number of distinct tags.
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// Number of reads tallied.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Counts tags over every record of a fastq file. Read names are
    /// not inspected.
    pub fn from_fastq<R: BufRead>(reader: fastq::Reader<R>, range: &TagRange) -> Result<Self> {
        let mut counts = TagCounts::new();
        for fqres in reader.records() {
            let fq = fqres?;
            counts.tally(range.extract(fq.seq()));
        }
        Ok(counts)
    }

    pub fn write<W: Write>(&self, dest: W, format: CountFormat) -> Result<()> {
        match format {
            CountFormat::Json => serde_json::to_writer_pretty(dest, &self.counts)?,
            CountFormat::Text => {
                let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(dest);
                for (tag, count) in self.counts.iter() {
                    wtr.write_record([tag.as_str(), count.to_string().as_str()])?;
                }
                wtr.flush()?;
            }
        }
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P, format: CountFormat) -> Result<()> {
        let path = path.as_ref();
        let file =
            fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut dest = BufWriter::new(file);
        self.write(&mut dest, format)?;
        dest.flush()?;
        Ok(())
    }
}
