use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bio::io::fastq;
use log::warn;

use super::locus_group::Member;
use super::resolve::RetainedSink;

/// Fastq output for the reads kept from one sample. Records go to a
/// `.partial` file that is renamed into place by `commit`, so an
/// output file under its final name is always complete.
pub struct FastqOutput {
    dest: fastq::Writer<fs::File>,
    path: PathBuf,
    partial: PathBuf,
    nwritten: usize,
}

impl FastqOutput {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut partial = path.clone().into_os_string();
        partial.push(".partial");
        let partial = PathBuf::from(partial);

        let file = fs::File::create(&partial)
            .with_context(|| format!("creating {}", partial.display()))?;

        Ok(FastqOutput {
            dest: fastq::Writer::new(file),
            path,
            partial,
            nwritten: 0,
        })
    }

    /// Flushes all records and moves the output to its final name,
    /// replacing any earlier output there. Returns the number of
    /// records written.
    pub fn commit(mut self) -> Result<usize> {
        self.dest
            .flush()
            .with_context(|| format!("writing {}", self.partial.display()))?;
        let FastqOutput {
            dest,
            path,
            partial,
            nwritten,
        } = self;
        drop(dest);

        fs::rename(&partial, &path)
            .with_context(|| format!("renaming {} to {}", partial.display(), path.display()))?;
        Ok(nwritten)
    }

    /// Discards everything written so far.
    pub fn abandon(self) {
        let partial = self.partial.clone();
        drop(self);
        if let Err(e) = fs::remove_file(&partial) {
            warn!("could not remove {}: {}", partial.display(), e);
        }
    }
}

impl RetainedSink for FastqOutput {
    fn retain(&mut self, member: &Member) -> Result<()> {
        self.dest
            .write(
                member.id().as_str(),
                None,
                member.sequence().as_bytes(),
                member.quality().as_bytes(),
            )
            .with_context(|| format!("writing {}", self.partial.display()))?;
        self.nwritten += 1;
        Ok(())
    }
}
