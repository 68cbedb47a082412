use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::{debug, info, warn};
use regex::Regex;

use crate::error::DbrError;
use crate::fastx_utils::{input_files, open_maybe_gzip};
use crate::tag_map::TagMap;
use crate::tasks::run_tasks;

pub mod alignment;
pub mod locus_group;
pub mod output;
pub mod resolve;
pub mod sample;
pub mod sample_log;
pub mod stats;

use self::locus_group::SampleGroups;
use self::output::FastqOutput;
use self::resolve::resolve_sample;
use self::sample::{SampleFiles, SampleResolver, Skip, readable_file};
use self::sample_log::{LOG_NAME, SampleLog, SampleSummary};
use self::stats::Stats;

/// Number of entries shown by the diagnostic print.
pub const SAMPLE_ENTRIES: usize = 4;

pub struct CLI {
    pub alignments: String,
    pub tag_maps: String,
    pub output_dir: String,
    pub n_expected: usize,
    pub seq_length: Option<usize>,
    pub sample_regex: String,
    pub barcodes: Option<String>,
    pub threads: usize,
    pub test_dict: bool,
    pub stats: bool,
}

pub struct Config {
    alignment_files: Vec<PathBuf>,
    output_dir: PathBuf,
    n_expected: usize,
    seq_length: Option<usize>,
    resolver: SampleResolver,
    threads: usize,
    test_dict: bool,
    stats: bool,
}

impl Config {
    pub fn new(cli: &CLI) -> Result<Self> {
        let sample_re = Regex::new(&cli.sample_regex)
            .with_context(|| format!("sample regex \"{}\"", cli.sample_regex))?;
        if sample_re.captures_len() < 2 {
            return Err(DbrError::BadOption {
                option: "sample-regex".to_string(),
                reason: format!("\"{}\" has no capture group", cli.sample_regex),
            }
            .into());
        }

        if cli.seq_length == Some(0) {
            return Err(DbrError::BadOption {
                option: "seq-length".to_string(),
                reason: "must be positive".to_string(),
            }
            .into());
        }

        let tag_maps = PathBuf::from(&cli.tag_maps);
        if !tag_maps.exists() {
            bail!("tag map path {} does not exist", tag_maps.display());
        }

        let output_dir = PathBuf::from(&cli.output_dir);
        fs::DirBuilder::new()
            .recursive(true)
            .create(&output_dir)
            .with_context(|| format!("creating output directory {}", output_dir.display()))?;

        Ok(Config {
            alignment_files: input_files(&cli.alignments)?,
            output_dir,
            n_expected: cli.n_expected,
            seq_length: cli.seq_length,
            resolver: SampleResolver::new(
                sample_re,
                tag_maps,
                cli.barcodes.as_ref().map(PathBuf::from),
            ),
            threads: cli.threads,
            test_dict: cli.test_dict,
            stats: cli.stats,
        })
    }

    pub fn log_path(&self) -> PathBuf {
        self.output_dir.join(LOG_NAME)
    }
}

/// Options controlling how one sample is filtered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterParams {
    pub n_expected: usize,
    pub seq_length: Option<usize>,
    pub test_dict: bool,
    pub stats: bool,
}

impl From<&Config> for FilterParams {
    fn from(config: &Config) -> Self {
        FilterParams {
            n_expected: config.n_expected,
            seq_length: config.seq_length,
            test_dict: config.test_dict,
            stats: config.stats,
        }
    }
}

/// Removes likely PCR duplicates from one sample. The kept reads are
/// written to `output`, committed only once the whole sample has been
/// resolved, and a summary row is then added to `log`.
///
/// # Errors
///
/// An error variant is returned when an input cannot be read or is
/// malformed, or when output or logging fails. Nothing is written to
/// `output` or `log` in that case.
pub fn filter_sample(
    params: &FilterParams,
    alignment: &Path,
    sample: &str,
    tag_map: &TagMap,
    output: &Path,
    log: &SampleLog,
) -> Result<Stats> {
    let src = open_maybe_gzip(alignment)?;
    let groups = SampleGroups::from_alignments(src, tag_map, params.seq_length)
        .with_context(|| format!("grouping {}", alignment.display()))?;

    if params.test_dict {
        info!("{}: first groups", sample);
        groups.log_sample(SAMPLE_ENTRIES);
    }

    let mut out = FastqOutput::create(output)?;
    let stats = match resolve_sample(groups, params.n_expected, &mut out) {
        Ok(stats) => stats,
        Err(e) => {
            out.abandon();
            return Err(e);
        }
    };
    let nwritten = out.commit()?;
    debug!("{}: wrote {} reads to {}", sample, nwritten, output.display());

    if params.stats {
        let mut stats_path = output.to_path_buf().into_os_string();
        stats_path.push("_stats.txt");
        fs::write(&stats_path, stats.summary_table() + &stats.dedup_table())
            .with_context(|| format!("writing {}", Path::new(&stats_path).display()))?;
    }

    log.append(&SampleSummary::new(sample, stats.n_removed(), stats.n_primary()))?;

    info!(
        "{}: removed {} PCR duplicates out of {} primary mapped reads",
        sample,
        stats.n_removed(),
        stats.n_primary()
    );

    Ok(stats)
}

fn filter_files(
    params: &FilterParams,
    files: &SampleFiles,
    output_dir: &Path,
    log: &SampleLog,
) -> Result<Stats> {
    if !readable_file(files.alignment()) {
        bail!("cannot read {}", files.alignment().display());
    }

    info!(
        "sample {} library {} tag map {}{}",
        files.sample(),
        files.library(),
        files.tag_map().display(),
        files
            .barcodes()
            .map(|b| format!(" barcodes {}", b.display()))
            .unwrap_or_default()
    );

    let tag_map = TagMap::load(files.tag_map())?;
    if params.test_dict {
        info!("{}: first tag map entries", files.sample());
        tag_map.log_sample(SAMPLE_ENTRIES);
    }

    filter_sample(
        params,
        files.alignment(),
        files.sample(),
        &tag_map,
        &output_dir.join(files.output_name()),
        log,
    )
}

/// Matches each alignment file to its sample. Files that cannot be
/// resolved are skipped with a warning, as is any file whose output
/// name was already claimed by an earlier file in `alignments`.
pub fn plan_samples(resolver: &SampleResolver, alignments: &[PathBuf]) -> Vec<SampleFiles> {
    let mut claimed: HashMap<String, PathBuf> = HashMap::new();
    let mut samples = Vec::new();

    for alignment in alignments.iter() {
        let res = resolver.resolve(alignment).and_then(|files| {
            match claimed.entry(files.output_name()) {
                Entry::Occupied(prev) => Err(Skip::DuplicateSample {
                    output: prev.key().clone(),
                    first: prev.get().display().to_string(),
                }),
                Entry::Vacant(slot) => {
                    slot.insert(alignment.clone());
                    Ok(files)
                }
            }
        });

        match res {
            Ok(files) => samples.push(files),
            Err(skip) => warn!("skipping {}: {}", alignment.display(), skip),
        }
    }

    samples
}

pub fn dbr_filter(config: Config) -> Result<Vec<Stats>> {
    let samples = plan_samples(&config.resolver, &config.alignment_files);

    info!(
        "filtering {} of {} alignment files with n = {}",
        samples.len(),
        config.alignment_files.len(),
        config.n_expected
    );

    let log = SampleLog::open(config.log_path())?;
    let params = FilterParams::from(&config);

    let outcome = run_tasks(
        config.threads,
        &samples,
        |files| files.alignment().display().to_string(),
        |files| filter_files(&params, files, &config.output_dir, &log),
    )?;

    if outcome.failed > 0 {
        bail!("{} of {} samples failed", outcome.failed, samples.len());
    }

    Ok(outcome.succeeded)
}
