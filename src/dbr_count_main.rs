use std::process;

use anyhow::{Result, anyhow};
use clap::{Arg, ArgMatches, Command, value_parser};

use dbrfilter::dbr_count::*;

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
    dbr_count(config)?;
    Ok(())
}

fn value<T: Clone + Send + Sync + 'static>(matches: &ArgMatches, id: &str) -> Result<T> {
    matches
        .get_one::<T>(id)
        .cloned()
        .ok_or_else(|| anyhow!("missing --{}", id))
}

fn get_cli() -> Result<CLI> {
    let matches = Command::new("dbr-count")
        .version("0.1.0")
        .author("Nicholas Ingolia <ingolia@berkeley.edu>")
        .about("Count reads carrying each degenerate base region tag")
        .arg(
            Arg::new("start")
                .short('s')
                .long("start")
                .value_name("START")
                .help("First base of the tag, negative to count from the end of the read")
                .value_parser(value_parser!(isize))
                .allow_negative_numbers(true)
                .required(true),
        )
        .arg(
            Arg::new("stop")
                .short('e')
                .long("stop")
                .value_name("STOP")
                .help("Base after the end of the tag, negative to count from the end of the read")
                .value_parser(value_parser!(isize))
                .allow_negative_numbers(true)
                .required(true),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .help("Output format, json or text")
                .default_value("json"),
        )
        .arg(
            Arg::new("output_dir")
                .short('o')
                .long("output-dir")
                .value_name("OUTPUT-DIR")
                .help("Directory for count files")
                .required(true),
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
            Arg::new("input")
                .value_name("FASTQ")
                .help("Raw sequence files, or directories of them")
                .num_args(1..)
                .required(true),
        )
        .get_matches();

    Ok(CLI {
        inputs: matches
            .get_many::<String>("input")
            .ok_or_else(|| anyhow!("no inputs"))?
            .cloned()
            .collect(),
        start: value(&matches, "start")?,
        stop: value(&matches, "stop")?,
        format: value(&matches, "format")?,
        output_dir: value(&matches, "output_dir")?,
        threads: value(&matches, "threads")?,
    })
}
