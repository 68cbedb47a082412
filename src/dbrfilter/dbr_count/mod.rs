use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::info;

use crate::fastx_utils::{fastq_reader, file_stem, input_files};
use crate::tag_map::TagRange;
use crate::tasks::run_tasks;

pub mod tag_count;

use self::tag_count::{CountFormat, TagCounts};

pub struct CLI {
    pub inputs: Vec<String>,
    pub start: isize,
    pub stop: isize,
    pub format: String,
    pub output_dir: String,
    pub threads: usize,
}

pub struct Config {
    inputs: Vec<PathBuf>,
    range: TagRange,
    format: CountFormat,
    output_dir: PathBuf,
    threads: usize,
}

impl Config {
    pub fn new(cli: &CLI) -> Result<Self> {
        let range = TagRange::checked(cli.start, cli.stop)?;
        let format: CountFormat = cli.format.parse()?;

        let mut inputs = Vec::new();
        for input in cli.inputs.iter() {
            inputs.extend(input_files(input)?);
        }

        let output_dir = PathBuf::from(&cli.output_dir);
        fs::DirBuilder::new()
            .recursive(true)
            .create(&output_dir)
            .with_context(|| format!("creating output directory {}", output_dir.display()))?;

        Ok(Config {
            inputs,
            range,
            format,
            output_dir,
            threads: cli.threads,
        })
    }

    pub fn output_path(&self, input: &Path) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", file_stem(input), self.format.extension()))
    }
}

pub fn count_file(config: &Config, input: &Path) -> Result<TagCounts> {
    let reader = fastq_reader(input)?;
    let counts = TagCounts::from_fastq(reader, &config.range)
        .with_context(|| format!("reading {}", input.display()))?;

    let path = config.output_path(input);
    counts.save(&path, config.format)?;
    info!(
        "{}: {} distinct tags in {} reads, written to {}",
        input.display(),
        counts.distinct(),
        counts.total(),
        path.display()
    );

    Ok(counts)
}

pub fn dbr_count(config: Config) -> Result<Vec<TagCounts>> {
    let outcome = run_tasks(
        config.threads,
        &config.inputs,
        |input| input.display().to_string(),
        |input| count_file(&config, input),
    )?;

    if outcome.failed > 0 {
        bail!("{} of {} files failed", outcome.failed, config.inputs.len());
    }

    Ok(outcome.succeeded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_dir() {
        let dir = tempfile::tempdir().unwrap();
        let fq = dir.path().join("Library12_L8.fastq");
        fs::write(&fq, "@a\nNNAAGG\n+\nIIIIII\n@b\nNNAAGT\n+\nIIIIII\n@c\nNNCCGG\n+\nIIIIII\n")
            .unwrap();
        let out_dir = dir.path().join("counts");

        let cli = CLI {
            inputs: vec![fq.display().to_string()],
            start: 2,
            stop: 4,
            format: "text".to_string(),
            output_dir: out_dir.display().to_string(),
            threads: 1,
        };
        let counts = dbr_count(Config::new(&cli).unwrap()).unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].get("AA"), 2);

        assert_eq!(
            fs::read_to_string(out_dir.join("Library12_L8.txt")).unwrap(),
            "AA,2\nCC,1\n"
        );
    }

    #[test]
    fn bad_format() {
        let dir = tempfile::tempdir().unwrap();
        let cli = CLI {
            inputs: vec![dir.path().display().to_string()],
            start: 0,
            stop: 4,
            format: "xml".to_string(),
            output_dir: dir.path().display().to_string(),
            threads: 1,
        };
        assert!(Config::new(&cli).is_err());
    }
}
