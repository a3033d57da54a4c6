//! Command-line interface handling for the index host.
//!
//! Uses the `clap` builder API; every option overrides the matching value
//! from the configuration file.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Arg, ArgMatches, Command};
use spatial_index::AxisRange;
use std::path::PathBuf;

/// Command line arguments parsed from user input.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for the log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Optional override for the seed file
    pub seed_path: Option<PathBuf>,
    /// Box to query after seeding, one pair per axis
    pub query: Option<Vec<AxisRange>>,
}

fn command() -> Command {
    Command::new("Subspace Index Host")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Loads a spatial index into memory and runs box queries against it")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("index.toml"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("seed")
                .short('s')
                .long("seed")
                .value_name("FILE")
                .help("JSON file of entries to insert before querying"),
        )
        .arg(
            Arg::new("query")
                .short('q')
                .long("query")
                .value_name("BOX")
                .help("Box to query, one lo:hi pair per axis (e.g. 0:8,0:8)"),
        )
}

impl CliArgs {
    /// Parses the process arguments
    pub fn parse() -> Result<Self> {
        Self::from_matches(&command().get_matches())
    }

    /// Parses an explicit argument list, first item being the binary name
    pub fn parse_from<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = command().try_get_matches_from(args)?;
        Self::from_matches(&matches)
    }

    fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let config_path = matches
            .get_one::<String>("config")
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("missing configuration path"))?;

        let query = matches
            .get_one::<String>("query")
            .map(|text| parse_box(text))
            .transpose()?;

        Ok(Self {
            config_path,
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            seed_path: matches.get_one::<String>("seed").map(PathBuf::from),
            query,
        })
    }
}

/// Parses a box written as `lo:hi,lo:hi,...`
pub fn parse_box(text: &str) -> Result<Vec<AxisRange>> {
    let mut range = Vec::new();
    for (axis, pair) in text.split(',').enumerate() {
        let Some((lo, hi)) = pair.trim().split_once(':') else {
            bail!("axis {axis}: expected lo:hi, got {pair:?}");
        };
        let lo = lo
            .trim()
            .parse::<u64>()
            .with_context(|| format!("axis {axis}: invalid lower bound {lo:?}"))?;
        let hi = hi
            .trim()
            .parse::<u64>()
            .with_context(|| format!("axis {axis}: invalid upper bound {hi:?}"))?;
        range.push(AxisRange::new(lo, hi));
    }
    Ok(range)
}
