//! Command-line arguments.
//!
//! `hotwire [options] <entry> [args...]`. Options the supervisor does not
//! know that appear before the entry are forwarded to the runtime, so
//! `hotwire --inspect app.js` runs `node --inspect app.js` with a `node`
//! runtime. Everything after the entry belongs to the child.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::{ConfigError, ConfigLoader, FileConfig, SupervisorConfig};

/// Options that consume the following token as their value.
const VALUE_OPTIONS: &[&str] = &["--debounce", "--runtime", "--kill-timeout", "--config"];

/// Options without a value.
const FLAG_OPTIONS: &[&str] = &[
    "--dependency-trees",
    "--node-modules",
    "--verbose",
    "--help",
    "--version",
    "-h",
    "-V",
];

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    name = "hotwire",
    about = "Restart a program whenever a file it loaded changes",
    version
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet period in milliseconds before restarting [default: 1000]
    #[arg(long, value_name = "MS")]
    pub debounce: Option<String>,

    /// Also watch files inside dependency directories such as node_modules
    #[arg(long, visible_alias = "node-modules")]
    pub dependency_trees: bool,

    /// Interpreter used to run the entry, e.g. node or python3
    #[arg(long, value_name = "PROGRAM")]
    pub runtime: Option<String>,

    /// Force-kill the program this many milliseconds after SIGTERM
    #[arg(long, value_name = "MS")]
    pub kill_timeout: Option<String>,

    /// Configuration file to use instead of the default search paths
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Program to supervise
    pub entry: PathBuf,

    /// Arguments passed to the program
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Unknown options found before the entry.
    #[arg(skip)]
    pub forwarded: Vec<String>,
}

/// Errors turning parsed arguments into a configuration.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Error casting option \"{option}\": {reason}")]
    Cast {
        option: &'static str,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Arguments after separating forwarded runtime flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitArgs {
    /// Arguments for clap, program name included.
    pub known: Vec<String>,
    /// Unknown options that appeared before the entry.
    pub forwarded: Vec<String>,
}

/// Separate unknown leading options from the supervisor's own.
///
/// A `--` is inserted after the entry so that the child's arguments are
/// never interpreted as supervisor options.
#[must_use]
pub fn split_forwarded_flags<I, S>(argv: I) -> SplitArgs
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut iter = argv.into_iter().map(Into::into);
    let mut known: Vec<String> = iter.next().into_iter().collect();
    let mut forwarded = Vec::new();

    while let Some(arg) = iter.next() {
        if arg == "--" {
            known.push(arg);
            break;
        }
        if !arg.starts_with('-') || arg == "-" {
            known.push(arg);
            known.push("--".to_string());
            break;
        }

        let name = arg.split_once('=').map_or(arg.as_str(), |(name, _)| name);
        if VALUE_OPTIONS.contains(&name) {
            let takes_next = !arg.contains('=');
            known.push(arg);
            if takes_next {
                if let Some(value) = iter.next() {
                    known.push(value);
                }
            }
        } else if FLAG_OPTIONS.contains(&name) || is_verbose_cluster(&arg) {
            known.push(arg);
        } else {
            forwarded.push(arg);
        }
    }

    known.extend(iter);
    SplitArgs { known, forwarded }
}

/// `-v`, `-vv`, `-vvv`...
fn is_verbose_cluster(arg: &str) -> bool {
    arg.strip_prefix('-')
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c == 'v'))
}

impl Cli {
    /// Parse a full command line, program name included.
    ///
    /// # Errors
    ///
    /// Returns the clap error for invalid usage, `--help` and `--version`.
    pub fn parse_args<I, S>(argv: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let split = split_forwarded_flags(argv);
        let mut cli = Self::try_parse_from(split.known)?;
        cli.forwarded = split.forwarded;
        Ok(cli)
    }

    /// Loader for the configuration file selected by `--config`.
    #[must_use]
    pub fn config_loader(&self) -> ConfigLoader {
        match &self.config {
            Some(path) => ConfigLoader::with_path(path.clone()),
            None => ConfigLoader::new(),
        }
    }

    /// Resolve the supervisor configuration: defaults, then the file, then
    /// the command line.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric option does not parse or the file holds
    /// invalid values.
    pub fn resolve(
        &self,
        file: &FileConfig,
        working_dir: PathBuf,
    ) -> Result<SupervisorConfig, CliError> {
        let mut config = SupervisorConfig::new(&self.entry, working_dir).apply_file(file)?;

        if let Some(value) = &self.debounce {
            config.debounce = parse_millis("debounce", value)?;
        }
        if let Some(value) = &self.kill_timeout {
            config.kill_timeout = Some(parse_millis("kill-timeout", value)?);
        }
        if self.dependency_trees {
            config.dependency_trees = true;
        }
        if self.runtime.is_some() {
            config.runtime.clone_from(&self.runtime);
        }
        config.runtime_flags.extend(self.forwarded.iter().cloned());
        config.args.clone_from(&self.args);

        Ok(config)
    }
}

fn parse_millis(option: &'static str, value: &str) -> Result<Duration, CliError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|e| CliError::Cast {
            option,
            value: value.to_string(),
            reason: format!("{value:?} is not a number of milliseconds ({e})"),
        })
}
