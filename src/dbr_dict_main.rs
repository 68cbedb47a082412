use std::process;

use anyhow::{Result, anyhow};
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};

use dbrfilter::dbr_dict::*;

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
    dbr_dict(config)?;
    Ok(())
}

fn value<T: Clone + Send + Sync + 'static>(matches: &ArgMatches, id: &str) -> Result<T> {
    matches
        .get_one::<T>(id)
        .cloned()
        .ok_or_else(|| anyhow!("missing --{}", id))
}

fn get_cli() -> Result<CLI> {
    let matches = Command::new("dbr-dict")
        .version("0.1.0")
        .author("Nicholas Ingolia <ingolia@berkeley.edu>")
        .about("Map read identifiers to degenerate base region tags")
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
            Arg::new("inverted")
                .long("inverted")
                .help("Map each tag to its read identifiers, rejecting repeated identifiers")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("output_dir")
                .short('o')
                .long("output-dir")
                .value_name("OUTPUT-DIR")
                .help("Directory for tag map files, omit to check inputs only"),
        )
        .arg(
            Arg::new("test_dict")
                .long("test-dict")
                .help("Show the first entries of each tag map")
                .action(ArgAction::SetTrue),
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
        inverted: matches.get_flag("inverted"),
        output_dir: matches.get_one::<String>("output_dir").cloned(),
        test_dict: matches.get_flag("test_dict"),
        threads: value(&matches, "threads")?,
    })
}
