use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::info;

use crate::fastx_utils::{fastq_reader, file_stem, input_files};
use crate::tag_map::{InvertedTagMap, TagMap, TagRange};
use crate::tasks::run_tasks;

/// Number of entries shown by the diagnostic print.
pub const SAMPLE_ENTRIES: usize = 4;

pub struct CLI {
    pub inputs: Vec<String>,
    pub start: isize,
    pub stop: isize,
    pub inverted: bool,
    pub output_dir: Option<String>,
    pub test_dict: bool,
    pub threads: usize,
}

pub struct Config {
    inputs: Vec<PathBuf>,
    range: TagRange,
    inverted: bool,
    output_dir: Option<PathBuf>,
    test_dict: bool,
    threads: usize,
}

impl Config {
    pub fn new(cli: &CLI) -> Result<Self> {
        let range = TagRange::checked(cli.start, cli.stop)?;

        let mut inputs = Vec::new();
        for input in cli.inputs.iter() {
            inputs.extend(input_files(input)?);
        }

        let output_dir = cli.output_dir.as_ref().map(PathBuf::from);
        if let Some(dir) = &output_dir {
            fs::DirBuilder::new()
                .recursive(true)
                .create(dir)
                .with_context(|| format!("creating output directory {}", dir.display()))?;
        }

        Ok(Config {
            inputs,
            range,
            inverted: cli.inverted,
            output_dir,
            test_dict: cli.test_dict,
            threads: cli.threads,
        })
    }

    /// Serialized tag map location for one input file.
    pub fn output_path(&self, input: &Path) -> Option<PathBuf> {
        self.output_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", file_stem(input))))
    }
}

/// Builds the tag map for one raw sequence file and saves it when an
/// output directory is configured. Returns the number of reads mapped.
pub fn dict_file(config: &Config, input: &Path) -> Result<usize> {
    info!("creating tag map from {}", input.display());
    let reader = fastq_reader(input)?;

    let nreads = if config.inverted {
        let inverted = InvertedTagMap::from_fastq(reader, &config.range)
            .with_context(|| format!("reading {}", input.display()))?;
        if config.test_dict {
            info!("{}: first tag map entries", input.display());
            inverted.log_sample(SAMPLE_ENTRIES);
        }
        if let Some(path) = config.output_path(input) {
            info!("writing tag map to {}", path.display());
            inverted.save(&path)?;
        }
        inverted.total_ids()
    } else {
        let tag_map = TagMap::from_fastq(reader, &config.range)
            .with_context(|| format!("reading {}", input.display()))?;
        if config.test_dict {
            info!("{}: first tag map entries", input.display());
            tag_map.log_sample(SAMPLE_ENTRIES);
        }
        if let Some(path) = config.output_path(input) {
            info!("writing tag map to {}", path.display());
            tag_map.save(&path)?;
        }
        tag_map.len()
    };

    Ok(nreads)
}

pub fn dbr_dict(config: Config) -> Result<usize> {
    let outcome = run_tasks(
        config.threads,
        &config.inputs,
        |input| input.display().to_string(),
        |input| dict_file(&config, input),
    )?;

    if outcome.failed > 0 {
        bail!("{} of {} files failed", outcome.failed, config.inputs.len());
    }

    Ok(outcome.succeeded.iter().sum())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(input: &Path, output_dir: &Path, inverted: bool) -> CLI {
        CLI {
            inputs: vec![input.display().to_string()],
            start: 2,
            stop: 9,
            inverted,
            output_dir: Some(output_dir.display().to_string()),
            test_dict: true,
            threads: 2,
        }
    }

    const READS: &str = "@M00001:1:000000000-A1B2C:1:1101:15808:1492 1:N:0:1\nNNACGTACGTNN\n+\nIIIIIIIIIIII\n\
                         @M00001:1:000000000-A1B2C:1:1101:15900:1500 1:N:0:1\nNNACGTACGTNN\n+\nIIIIIIIIIIII\n";

    #[test]
    fn forward_dict() {
        let dir = tempfile::tempdir().unwrap();
        let fq_dir = dir.path().join("reads");
        fs::create_dir(&fq_dir).unwrap();
        fs::write(fq_dir.join("Library12_L8.fastq"), READS).unwrap();
        fs::write(fq_dir.join("Library13_L8.fastq"), READS).unwrap();
        let out_dir = dir.path().join("dicts");

        let config = Config::new(&cli(&fq_dir, &out_dir, false)).unwrap();
        assert_eq!(dbr_dict(config).unwrap(), 4);

        let tag_map = TagMap::load(out_dir.join("Library12_L8.json")).unwrap();
        assert_eq!(tag_map.get("1:1101:15808:1492"), Some("ACGTACG"));
        assert!(out_dir.join("Library13_L8.json").exists());
    }

    #[test]
    fn inverted_dict() {
        let dir = tempfile::tempdir().unwrap();
        let fq = dir.path().join("Library12_L8.fastq");
        fs::write(&fq, READS).unwrap();
        let out_dir = dir.path().join("dicts");

        let config = Config::new(&cli(&fq, &out_dir, true)).unwrap();
        assert_eq!(dbr_dict(config).unwrap(), 2);

        let text = fs::read_to_string(out_dir.join("Library12_L8.json")).unwrap();
        let parsed: std::collections::BTreeMap<String, Vec<String>> =
            serde_json::from_str(&text).unwrap();
        assert_eq!(
            parsed.get("ACGTACG"),
            Some(&vec![
                "1:1101:15808:1492".to_string(),
                "1:1101:15900:1500".to_string()
            ])
        );
    }

    #[test]
    fn inverted_duplicate_fails() {
        let dir = tempfile::tempdir().unwrap();
        let fq = dir.path().join("dup.fastq");
        fs::write(&fq, format!("{}{}", READS, READS)).unwrap();
        let out_dir = dir.path().join("dicts");

        let config = Config::new(&cli(&fq, &out_dir, true)).unwrap();
        assert!(dbr_dict(config).is_err());
        assert!(!out_dir.join("dup.json").exists());

        let config = Config::new(&cli(&fq, &out_dir, false)).unwrap();
        assert_eq!(dbr_dict(config).unwrap(), 2);
    }

    #[test]
    fn bad_range() {
        let dir = tempfile::tempdir().unwrap();
        let mut bad = cli(dir.path(), dir.path(), false);
        bad.start = 9;
        bad.stop = 2;
        assert!(Config::new(&bad).is_err());
    }
}
