use std::process;

use anyhow::{Result, anyhow};
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};

use dbrfilter::dbr_filter::*;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = wrapper() {
        eprintln!("{:#}", e);
        process::exit(1);
    }
}

fn wrapper() -> Result<()> {
    let cli = get_cli()?;
    let config = Config::new(&cli)?;
    dbr_filter(config)?;
    Ok(())
}

fn value<T: Clone + Send + Sync + 'static>(matches: &ArgMatches, id: &str) -> Result<T> {
    matches
        .get_one::<T>(id)
        .cloned()
        .ok_or_else(|| anyhow!("missing --{}", id))
}

fn get_cli() -> Result<CLI> {
    let matches = Command::new("dbr-filter")
        .version("0.1.0")
        .author("Nicholas Ingolia <ingolia@berkeley.edu>")
        .about("Remove PCR duplicates using degenerate base region tags")
        .arg(
            Arg::new("alignments")
                .short('a')
                .long("alignments")
                .value_name("SAM-DIR")
                .help("Directory of per-sample alignment files, or a single file")
                .required(true),
        )
        .arg(
            Arg::new("tag_maps")
                .short('d')
                .long("tag-maps")
                .value_name("DICT")
                .help("Tag map file, or directory of per-library tag map files")
                .required(true),
        )
        .arg(
            Arg::new("output_dir")
                .short('o')
                .long("output-dir")
                .value_name("OUTPUT-DIR")
                .help("Output directory name")
                .required(true),
        )
        .arg(
            Arg::new("n_expected")
                .short('n')
                .value_name("N")
                .help("Expected number of copies of each locus")
                .value_parser(value_parser!(usize))
                .required(true),
        )
        .arg(
            Arg::new("seq_length")
                .short('l')
                .long("seq-length")
                .value_name("LENGTH")
                .help("Only use reads of exactly this length")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("sample_regex")
                .short('r')
                .long("sample-regex")
                .value_name("REGEX")
                .help("Pattern whose first capture group is the sample id in a file name")
                .required(true),
        )
        .arg(
            Arg::new("barcodes")
                .short('b')
                .long("barcodes")
                .value_name("BARCODE-DIR")
                .help("Directory of per-library barcode files"),
        )
        .arg(
            Arg::new("threads")
                .short('t')
                .long("threads")
                .value_name("THREADS")
                .help("Number of worker threads, 0 for one per CPU")
                .value_parser(value_parser!(usize))
                .default_value("0"),
        )
        .arg(
            Arg::new("test_dict")
                .long("test-dict")
                .help("Show the first tag map entries and groups of each sample")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("stats")
                .long("stats")
                .help("Write a table of group sizes for each sample")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    Ok(CLI {
        alignments: value(&matches, "alignments")?,
        tag_maps: value(&matches, "tag_maps")?,
        output_dir: value(&matches, "output_dir")?,
        n_expected: value(&matches, "n_expected")?,
        seq_length: matches.get_one::<usize>("seq_length").copied(),
        sample_regex: value(&matches, "sample_regex")?,
        barcodes: matches.get_one::<String>("barcodes").cloned(),
        threads: value(&matches, "threads")?,
        test_dict: matches.get_flag("test_dict"),
        stats: matches.get_flag("stats"),
    })
}
