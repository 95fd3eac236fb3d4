//! Command-line surface
//!
//! The options live in one declarative table. clap does the tokenizing; the
//! builder does all value validation, so every failure message comes from
//! [`crate::ConfigError`] rather than from the parser.

use crate::config::ConfigOption;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::ffi::OsString;
use std::path::PathBuf;

/// Whether an option takes a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Flag,
    Value(&'static str),
}

/// One row of the option table
#[derive(Debug, Clone, Copy)]
pub struct OptionSpec {
    pub id: &'static str,
    pub short: Option<char>,
    pub long: &'static str,
    pub arity: Arity,
    pub heading: Option<&'static str>,
    pub help: &'static str,
    /// Assignment produced for one occurrence
    pub target: fn(String) -> ConfigOption,
}

const NEW_DATABASE: Option<&str> = Some("Options for new databases");

const EXTRA_ID: &str = "extra";

fn verbose(_: String) -> ConfigOption {
    ConfigOption::Verbose
}

fn create(_: String) -> ConfigOption {
    ConfigOption::Create
}

fn force(_: String) -> ConfigOption {
    ConfigOption::Force
}

fn file(value: String) -> ConfigOption {
    ConfigOption::File(PathBuf::from(value))
}

fn integrity_file(value: String) -> ConfigOption {
    ConfigOption::IntegrityFile(PathBuf::from(value))
}

fn log_file(value: String) -> ConfigOption {
    ConfigOption::LogFile(PathBuf::from(value))
}

/// Every recognized option
pub const OPTION_TABLE: &[OptionSpec] = &[
    OptionSpec {
        id: "verbose",
        short: Some('v'),
        long: "verbose",
        arity: Arity::Flag,
        heading: None,
        help: "Print extra information to standard output",
        target: verbose,
    },
    OptionSpec {
        id: "create",
        short: None,
        long: "create",
        arity: Arity::Flag,
        heading: None,
        help: "Create a new database and exit",
        target: create,
    },
    OptionSpec {
        id: "force",
        short: None,
        long: "force",
        arity: Arity::Flag,
        heading: None,
        help: "With --create, create the database even if one already exists",
        target: force,
    },
    OptionSpec {
        id: "file",
        short: Some('f'),
        long: "file",
        arity: Arity::Value("PATH"),
        heading: None,
        help: "Path to a file or block device holding the database; repeat for several files",
        target: file,
    },
    OptionSpec {
        id: "integrity-file",
        short: Some('S'),
        long: "integrity-file",
        arity: Arity::Value("PATH"),
        heading: None,
        help: "Integrity file for the previously given --file (default: that path plus '.integrity')",
        target: integrity_file,
    },
    OptionSpec {
        id: "cores",
        short: Some('c'),
        long: "cores",
        arity: Arity::Value("N"),
        heading: None,
        help: "Number of cores to use for handling requests",
        target: ConfigOption::Cores,
    },
    OptionSpec {
        id: "max-cache-size",
        short: Some('m'),
        long: "max-cache-size",
        arity: Arity::Value("MB"),
        heading: None,
        help: "Maximum amount of RAM to use for caching disk blocks, in megabytes",
        target: ConfigOption::MaxCacheSize,
    },
    OptionSpec {
        id: "log-file",
        short: Some('l'),
        long: "log-file",
        arity: Arity::Value("PATH"),
        heading: None,
        help: "File to log to; messages go to stderr when not given",
        target: log_file,
    },
    OptionSpec {
        id: "port",
        short: Some('p'),
        long: "port",
        arity: Arity::Value("PORT"),
        heading: None,
        help: "Socket port to listen on",
        target: ConfigOption::Port,
    },
    OptionSpec {
        id: "wait-for-flush",
        short: None,
        long: "wait-for-flush",
        arity: Arity::Value("y|n"),
        heading: None,
        help: "Do not respond to commands until changes are durable",
        target: ConfigOption::WaitForFlush,
    },
    OptionSpec {
        id: "flush-timer",
        short: None,
        long: "flush-timer",
        arity: Arity::Value("MS|disable"),
        heading: None,
        help: "Milliseconds changes may sit in memory before being flushed; 'disable' lets them sit indefinitely",
        target: ConfigOption::FlushTimer,
    },
    OptionSpec {
        id: "flush-threshold",
        short: None,
        long: "flush-threshold",
        arity: Arity::Value("PERCENT"),
        heading: None,
        help: "Flush everything once this share of the cache is dirty; 0 flushes on every change",
        target: ConfigOption::FlushThreshold,
    },
    OptionSpec {
        id: "gc-range",
        short: None,
        long: "gc-range",
        arity: Arity::Value("LOW-HIGH"),
        heading: None,
        help: "Proportion of garbage maintained by garbage collection, e.g. 0.5-0.75",
        target: ConfigOption::GcRange,
    },
    OptionSpec {
        id: "active-data-extents",
        short: None,
        long: "active-data-extents",
        arity: Arity::Value("N"),
        heading: None,
        help: "How many places in the file to write to at once",
        target: ConfigOption::ActiveDataExtents,
    },
    OptionSpec {
        id: "slices",
        short: Some('s'),
        long: "slices",
        arity: Arity::Value("N"),
        heading: NEW_DATABASE,
        help: "Shards total",
        target: ConfigOption::Slices,
    },
    OptionSpec {
        id: "block-size",
        short: None,
        long: "block-size",
        arity: Arity::Value("BYTES"),
        heading: NEW_DATABASE,
        help: "Size of a block, in bytes",
        target: ConfigOption::BlockSize,
    },
    OptionSpec {
        id: "extent-size",
        short: None,
        long: "extent-size",
        arity: Arity::Value("BYTES"),
        heading: NEW_DATABASE,
        help: "Size of an extent, in bytes",
        target: ConfigOption::ExtentSize,
    },
];

fn to_arg(spec: &OptionSpec) -> Arg {
    let mut arg = Arg::new(spec.id).long(spec.long).help(spec.help);
    if let Some(short) = spec.short {
        arg = arg.short(short);
    }
    if let Some(heading) = spec.heading {
        arg = arg.help_heading(heading);
    }
    match spec.arity {
        Arity::Flag => arg.action(ArgAction::Count),
        // Values may start with '-' so "--flush-timer -5" reaches the validator
        Arity::Value(name) => arg
            .value_name(name)
            .value_parser(clap::value_parser!(String))
            .action(ArgAction::Append)
            .allow_hyphen_values(true),
    }
}

/// Build the clap command from the option table
pub fn command() -> Command {
    let extra = Arg::new(EXTRA_ID)
        .value_parser(clap::value_parser!(String))
        .action(ArgAction::Append)
        .hide(true);

    Command::new("extentdb")
        .about("ExtentDB storage server")
        .disable_version_flag(true)
        .args(OPTION_TABLE.iter().map(to_arg))
        .arg(extra)
}

/// Turn argv into option assignments in command-line order
pub fn parse_options<I, T>(args: I) -> Result<Vec<ConfigOption>, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = command().try_get_matches_from(args)?;
    Ok(collect_options(&matches))
}

fn collect_options(matches: &ArgMatches) -> Vec<ConfigOption> {
    let mut ordered: Vec<(usize, ConfigOption)> = Vec::new();

    for spec in OPTION_TABLE {
        match spec.arity {
            // Flags never fail validation, so their position is irrelevant
            Arity::Flag => {
                if matches.get_count(spec.id) > 0 {
                    ordered.push((0, (spec.target)(String::new())));
                }
            }
            Arity::Value(_) => {
                if let (Some(values), Some(indices)) = (
                    matches.get_many::<String>(spec.id),
                    matches.indices_of(spec.id),
                ) {
                    ordered.extend(indices.zip(values).map(|(i, v)| (i, (spec.target)(v.clone()))));
                }
            }
        }
    }

    if let (Some(values), Some(indices)) = (
        matches.get_many::<String>(EXTRA_ID),
        matches.indices_of(EXTRA_ID),
    ) {
        ordered.extend(indices.zip(values).map(|(i, v)| (i, ConfigOption::Extra(v.clone()))));
    }

    // Stable sort keeps flags in table order
    ordered.sort_by_key(|(i, _)| *i);
    ordered.into_iter().map(|(_, option)| option).collect()
}
