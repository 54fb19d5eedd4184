//! Output formatters.
//!
//! Each format letter maps to one [`OutputFormat`] variant. A format
//! specifier names two of them: the first renders metadata, the second
//! renders text.
//!
//! | Letter | Format |
//! |--------|--------|
//! | `a` | pretty-print: aligned, indented, coloured on a terminal |
//! | `i` | inspect: one-line debug representation |
//! | `j` | JSON |
//! | `J` | pretty JSON |
//! | `t` | plain text (`to_s`) |
//! | `y` | YAML |

use serde_json::Value;
use std::fmt::Write as _;

use crate::error::{ConfigError, RenderError};

const INDENT: usize = 4;

const ANSI_RESET: &str = "\x1b[0m";
const ANSI_KEY: &str = "\x1b[1;36m";
const ANSI_STRING: &str = "\x1b[0;33m";
const ANSI_NUMBER: &str = "\x1b[1;34m";
const ANSI_LITERAL: &str = "\x1b[1;31m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    PrettyPrint,
    Inspect,
    Json,
    PrettyJson,
    ToS,
    Yaml,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 6] = [
        OutputFormat::PrettyPrint,
        OutputFormat::Inspect,
        OutputFormat::Json,
        OutputFormat::PrettyJson,
        OutputFormat::ToS,
        OutputFormat::Yaml,
    ];

    pub fn code(self) -> char {
        match self {
            OutputFormat::PrettyPrint => 'a',
            OutputFormat::Inspect => 'i',
            OutputFormat::Json => 'j',
            OutputFormat::PrettyJson => 'J',
            OutputFormat::ToS => 't',
            OutputFormat::Yaml => 'y',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.code() == code)
    }

    /// Valid letters, as shown in error messages.
    pub fn valid_codes() -> String {
        Self::ALL.iter().map(|f| f.code()).collect()
    }

    /// Render `value`. `colour` only affects [`OutputFormat::PrettyPrint`].
    pub fn render(self, value: &Value, colour: bool) -> Result<String, RenderError> {
        let rendered = match self {
            OutputFormat::PrettyPrint => {
                let mut out = String::new();
                pretty(&mut out, value, 0, colour);
                out
            }
            OutputFormat::Inspect => inspect(value),
            OutputFormat::Json => serde_json::to_string(value)?,
            OutputFormat::PrettyJson => serde_json::to_string_pretty(value)?,
            OutputFormat::ToS => to_s(value),
            OutputFormat::Yaml => serde_yaml_ng::to_string(value)?
                .trim_end_matches('\n')
                .to_string(),
        };
        Ok(rendered)
    }
}

/// Metadata and text formats selected by one specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatPair {
    pub metadata: OutputFormat,
    pub text: OutputFormat,
}

impl Default for FormatPair {
    fn default() -> Self {
        Self {
            metadata: OutputFormat::PrettyPrint,
            text: OutputFormat::ToS,
        }
    }
}

impl FormatPair {
    /// Parse a specifier: one letter is used for both slots, letters after
    /// the second are ignored.
    pub fn parse(spec: &str) -> Result<Self, ConfigError> {
        let mut letters = spec.chars();
        let first = letters.next().ok_or(ConfigError::EmptyFormat)?;
        let second = letters.next().unwrap_or(first);
        let lookup = |code: char| {
            OutputFormat::from_code(code).ok_or_else(|| ConfigError::InvalidFormat {
                format: spec.to_string(),
                code,
                valid: OutputFormat::valid_codes(),
            })
        };
        Ok(Self {
            metadata: lookup(first)?,
            text: lookup(second)?,
        })
    }

    /// The two letters, after doubling and truncation.
    pub fn codes(&self) -> String {
        [self.metadata.code(), self.text.code()].iter().collect()
    }

    /// `jj`, `JJ` and `yy` serialize a whole document as one record.
    pub fn is_whole_record(&self) -> bool {
        self.metadata == self.text
            && matches!(
                self.metadata,
                OutputFormat::Json | OutputFormat::PrettyJson | OutputFormat::Yaml
            )
    }
}

fn paint(out: &mut String, text: &str, colour: Option<&str>) {
    match colour {
        Some(code) => {
            out.push_str(code);
            out.push_str(text);
            out.push_str(ANSI_RESET);
        }
        None => out.push_str(text),
    }
}

fn scalar_colour(value: &Value) -> &'static str {
    match value {
        Value::String(_) => ANSI_STRING,
        Value::Number(_) => ANSI_NUMBER,
        _ => ANSI_LITERAL,
    }
}

fn pretty(out: &mut String, value: &Value, depth: usize, colour: bool) {
    let pad = " ".repeat((depth + 1) * INDENT);
    let close_pad = " ".repeat(depth * INDENT);
    match value {
        Value::Object(map) if map.is_empty() => out.push_str("{}"),
        Value::Object(map) => {
            let quoted: Vec<String> = map.keys().map(|k| quote(k)).collect();
            let width = quoted.iter().map(|k| k.chars().count()).max().unwrap_or(0);
            out.push_str("{\n");
            for (key, child) in quoted.iter().zip(map.values()) {
                out.push_str(&pad);
                let fill = width - key.chars().count();
                out.push_str(&" ".repeat(fill));
                paint(out, key, colour.then_some(ANSI_KEY));
                out.push_str(" => ");
                pretty(out, child, depth + 1, colour);
                out.push_str(",\n");
            }
            out.push_str(&close_pad);
            out.push('}');
        }
        Value::Array(items) if items.is_empty() => out.push_str("[]"),
        Value::Array(items) => {
            let width = (items.len() - 1).to_string().len();
            out.push_str("[\n");
            for (i, child) in items.iter().enumerate() {
                out.push_str(&pad);
                let _ = write!(out, "[{:>width$}] ", i, width = width);
                pretty(out, child, depth + 1, colour);
                out.push_str(",\n");
            }
            out.push_str(&close_pad);
            out.push(']');
        }
        scalar => paint(out, &inspect(scalar), colour.then(|| scalar_colour(scalar))),
    }
}

fn inspect(value: &Value) -> String {
    match value {
        Value::Null => "nil".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(inspect).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{} => {}", quote(k), inspect(v)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
    }
}

fn to_s(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        composite => inspect(composite),
    }
}

/// Double-quoted with JSON escaping.
fn quote(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}
