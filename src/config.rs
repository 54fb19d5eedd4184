//! Command-line configuration.
//!
//! Sources, lowest precedence first: built-in defaults, the
//! `RIKA_OPTIONS` environment variable (shell-tokenised and placed before
//! the real arguments), then the command line itself. For repeated flags
//! the later occurrence wins.
//!
//! Boolean flags take an optional value: `--text`, `--text=no`, `-t`,
//! `-t-`, `-t false`. Short forms are rewritten to the long `--flag=VALUE`
//! form before clap sees them, since clap cannot express "consume the next
//! word only if it is a boolean".

use clap::{ArgAction, Parser};
use std::time::Duration;

use crate::error::ConfigError;
use crate::formatters::FormatPair;
use crate::models::ContentLimit;
use crate::run::RunOptions;

/// Environment variable holding default options.
pub const OPTIONS_ENV: &str = "RIKA_OPTIONS";

const TRUE_WORDS: &[&str] = &["true", "yes", "+"];
const FALSE_WORDS: &[&str] = &["false", "no", "-"];

/// Short boolean flags and their long names.
const BOOL_SHORTS: &[(char, &str)] = &[
    ('m', "metadata"),
    ('t', "text"),
    ('k', "key-sort"),
    ('s', "source"),
    ('a', "as-array"),
];

/// Options whose value may be a separate word.
const VALUE_OPTIONS: &[&str] = &["-f", "--format", "--max-content-length", "--timeout"];

const AFTER_HELP: &str = "\
Output formats are: [a]wesome print, [t]o_s, [i]nspect, [j]son, [J] for pretty json, and [y]aml.
If a format contains two letters, the first is used for metadata, the second for text.
Values for the boolean options may be given as follows:
  Enable:  +, true,  yes, [empty]
  Disable: -, false, no, [long form with no- prefix, e.g. --no-metadata]

Default options can be set in the RIKA_OPTIONS environment variable.";

/// Rika: extract text, metadata and language from documents and URLs.
#[derive(Parser, Debug)]
#[command(
    name = "rika",
    about = "Rika: extract text, metadata and language from documents and URLs",
    disable_version_flag = true,
    args_override_self = true,
    after_help = AFTER_HELP
)]
pub struct Cli {
    /// Files, glob patterns, or http(s) URLs.
    #[arg(value_name = "FILE_OR_URL")]
    pub targets: Vec<String>,

    /// Output format: one or two letters, metadata then text.
    #[arg(short = 'f', long, default_value = "at", value_name = "FORMAT")]
    pub format: String,

    /// Output metadata.
    #[arg(
        short = 'm',
        long,
        value_name = "BOOL",
        action = ArgAction::Set,
        value_parser = parse_bool,
        num_args = 0..=1,
        require_equals = true,
        default_value = "true",
        default_missing_value = "true",
        overrides_with = "no_metadata"
    )]
    pub metadata: bool,

    #[arg(long = "no-metadata", overrides_with = "metadata", hide = true)]
    pub no_metadata: bool,

    /// Output text.
    #[arg(
        short = 't',
        long,
        value_name = "BOOL",
        action = ArgAction::Set,
        value_parser = parse_bool,
        num_args = 0..=1,
        require_equals = true,
        default_value = "true",
        default_missing_value = "true",
        overrides_with = "no_text"
    )]
    pub text: bool,

    #[arg(long = "no-text", overrides_with = "text", hide = true)]
    pub no_text: bool,

    /// Sort metadata keys case-insensitively.
    #[arg(
        short = 'k',
        long,
        value_name = "BOOL",
        action = ArgAction::Set,
        value_parser = parse_bool,
        num_args = 0..=1,
        require_equals = true,
        default_value = "true",
        default_missing_value = "true",
        overrides_with = "no_key_sort"
    )]
    pub key_sort: bool,

    #[arg(long = "no-key-sort", overrides_with = "key_sort", hide = true)]
    pub no_key_sort: bool,

    /// Output the document source (file or URL).
    #[arg(
        short = 's',
        long,
        value_name = "BOOL",
        action = ArgAction::Set,
        value_parser = parse_bool,
        num_args = 0..=1,
        require_equals = true,
        default_value = "true",
        default_missing_value = "true",
        overrides_with = "no_source"
    )]
    pub source: bool,

    #[arg(long = "no-source", overrides_with = "source", hide = true)]
    pub no_source: bool,

    /// Output all parsed results as one array.
    #[arg(
        short = 'a',
        long,
        value_name = "BOOL",
        action = ArgAction::Set,
        value_parser = parse_bool,
        num_args = 0..=1,
        require_equals = true,
        default_value = "false",
        default_missing_value = "true",
        overrides_with = "no_as_array"
    )]
    pub as_array: bool,

    #[arg(long = "no-as-array", overrides_with = "as_array", hide = true)]
    pub no_as_array: bool,

    /// Maximum characters of text per document: -1 unbounded, 0 none.
    /// Defaults to -1, or 0 when text output is off.
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub max_content_length: Option<i64>,

    /// HTTP connect and read timeout, in seconds.
    #[arg(
        long,
        value_name = "SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: u64,

    /// Output version.
    #[arg(short = 'v', long)]
    pub version: bool,
}

/// Validated configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Config {
    pub targets: Vec<String>,
    pub run: RunOptions,
    pub http_timeout: Duration,
}

/// Parse a boolean option value.
pub fn parse_bool(value: &str) -> Result<bool, String> {
    let lowered = value.to_ascii_lowercase();
    if TRUE_WORDS.contains(&lowered.as_str()) {
        Ok(true)
    } else if FALSE_WORDS.contains(&lowered.as_str()) {
        Ok(false)
    } else {
        Err(format!(
            "expected one of {} or {}, got '{}'",
            TRUE_WORDS.join(", "),
            FALSE_WORDS.join(", "),
            value
        ))
    }
}

fn is_bool_word(word: &str) -> bool {
    parse_bool(word).is_ok()
}

/// Insert the shell-tokenised contents of `env_value` after the program
/// name, so command-line flags given later override them.
pub fn prepend_environment_args(
    mut argv: Vec<String>,
    env_value: Option<&str>,
) -> Result<Vec<String>, ConfigError> {
    let Some(raw) = env_value.filter(|v| !v.trim().is_empty()) else {
        return Ok(argv);
    };
    let words = shlex::split(raw).ok_or_else(|| ConfigError::BadEnvironment {
        variable: OPTIONS_ENV.to_string(),
        value: raw.to_string(),
    })?;
    let at = argv.len().min(1);
    argv.splice(at..at, words);
    Ok(argv)
}

/// Rewrite short boolean flags into long `--flag=VALUE` form.
///
/// `-m` → `--metadata`, `-m+` / `-myes` → `--metadata=+` / `--metadata=yes`,
/// and `-m no` / `--metadata no` → `--metadata=no`. The word after a
/// boolean flag is consumed only when it is a boolean word. Everything
/// after `--` is left alone.
pub fn normalize_short_flags(argv: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(argv.len());
    let mut words = argv.into_iter().peekable();
    if let Some(program) = words.next() {
        out.push(program);
    }
    while let Some(word) = words.next() {
        if word == "--" {
            out.push(word);
            out.extend(words);
            break;
        }
        if VALUE_OPTIONS.contains(&word.as_str()) {
            out.push(word);
            if let Some(value) = words.next() {
                out.push(value);
            }
            continue;
        }
        if let Some(long) = bare_long_bool(&word) {
            if words.peek().is_some_and(|next| is_bool_word(next)) {
                let value = words.next().unwrap_or_default();
                out.push(format!("--{}={}", long, value));
            } else {
                out.push(word);
            }
            continue;
        }
        let Some((long, attached)) = split_short_bool(&word) else {
            out.push(word);
            continue;
        };
        if !attached.is_empty() {
            out.push(format!("--{}={}", long, attached));
        } else if words.peek().is_some_and(|next| is_bool_word(next)) {
            let value = words.next().unwrap_or_default();
            out.push(format!("--{}={}", long, value));
        } else {
            out.push(format!("--{}", long));
        }
    }
    out
}

/// `--metadata` with no attached value.
fn bare_long_bool(word: &str) -> Option<&'static str> {
    let name = word.strip_prefix("--")?;
    BOOL_SHORTS
        .iter()
        .find(|(_, long)| *long == name)
        .map(|(_, long)| *long)
}

/// `-m`, `-m+`, `-mno` → `Some(("metadata", ""|"+"|"no"))`. Attached text
/// that is not a boolean word is left for clap to report.
fn split_short_bool(word: &str) -> Option<(&'static str, &str)> {
    let rest = word.strip_prefix('-')?;
    if rest.starts_with('-') {
        return None;
    }
    let mut chars = rest.chars();
    let flag = chars.next()?;
    let attached = chars.as_str();
    let &(_, long) = BOOL_SHORTS.iter().find(|(short, _)| *short == flag)?;
    if attached.is_empty() || is_bool_word(attached) {
        Some((long, attached))
    } else {
        None
    }
}

/// Full argv pipeline: environment defaults, short-flag rewriting, clap.
pub fn parse_args(argv: Vec<String>, env_value: Option<&str>) -> Result<Cli, CliError> {
    let argv = prepend_environment_args(argv, env_value).map_err(CliError::Config)?;
    Cli::try_parse_from(normalize_short_flags(argv)).map_err(CliError::Usage)
}

/// Failure to turn argv into a [`Cli`].
#[derive(Debug)]
pub enum CliError {
    /// Includes `--help`, which clap reports through its error type.
    Usage(clap::Error),
    Config(ConfigError),
}

/// Validate parsed flags into a [`Config`]. The format specifier is
/// checked here so a bad letter stops the run before any target is read.
pub fn load_config(cli: Cli, colour: bool) -> Result<Config, ConfigError> {
    let formats = FormatPair::parse(&cli.format)?;
    let text = cli.text && !cli.no_text;
    let limit = match cli.max_content_length {
        Some(n) => ContentLimit::from_i64(n),
        None if text => ContentLimit::Unbounded,
        None => ContentLimit::MetadataOnly,
    };

    Ok(Config {
        targets: cli.targets,
        run: RunOptions {
            formats,
            metadata: cli.metadata && !cli.no_metadata,
            text,
            key_sort: cli.key_sort && !cli.no_key_sort,
            source: cli.source && !cli.no_source,
            as_array: cli.as_array && !cli.no_as_array,
            limit,
            colour,
        },
        http_timeout: Duration::from_secs(cli.timeout),
    })
}
