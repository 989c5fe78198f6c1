//! Engine configuration.
//!
//! ```toml
//! placeholder_policy = "keep"      # strict | keep | blank
//! list_align = "key:id"            # structural | key:<field>
//! strict_duplicate_keys = true
//! output = "pretty"                # json | pretty
//! ```
//!
//! The config is a plain value handed to each component; nothing here is
//! process-wide.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OpsError;
use crate::json_patch_diff::{DiffOptions, ListAlign};
use crate::json_template::PlaceholderPolicy;
use crate::json_value::ParseOptions;

// ── Output format ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Pretty,
}

impl OutputFormat {
    pub fn is_pretty(self) -> bool {
        self == OutputFormat::Pretty
    }
}

impl FromStr for OutputFormat {
    type Err = OpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(OutputFormat::Json),
            "pretty" => Ok(OutputFormat::Pretty),
            other => Err(OpsError::argument(
                "output",
                format!("expected json or pretty, got {other:?}"),
            )),
        }
    }
}

// ── List alignment ────────────────────────────────────────────────────────

/// Serializable form of [`ListAlign`]: `"structural"` or `"key:<field>"`.
/// Custom predicates are code-only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ListAlignConfig {
    #[default]
    Structural,
    ByKey(String),
}

impl TryFrom<String> for ListAlignConfig {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.strip_prefix("key:") {
            Some(key) if !key.is_empty() => Ok(ListAlignConfig::ByKey(key.to_string())),
            _ if s == "structural" => Ok(ListAlignConfig::Structural),
            _ => Err(format!("list_align must be \"structural\" or \"key:<field>\", got {s:?}")),
        }
    }
}

impl From<ListAlignConfig> for String {
    fn from(c: ListAlignConfig) -> String {
        c.to_string()
    }
}

impl fmt::Display for ListAlignConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListAlignConfig::Structural => f.write_str("structural"),
            ListAlignConfig::ByKey(key) => write!(f, "key:{key}"),
        }
    }
}

impl From<&ListAlignConfig> for ListAlign {
    fn from(c: &ListAlignConfig) -> ListAlign {
        match c {
            ListAlignConfig::Structural => ListAlign::Structural,
            ListAlignConfig::ByKey(key) => ListAlign::ByKey(key.clone()),
        }
    }
}

// ── EngineConfig ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub placeholder_policy: PlaceholderPolicy,
    pub list_align: ListAlignConfig,
    pub strict_duplicate_keys: bool,
    /// Accept `#` comment lines in input documents.
    pub allow_comments: bool,
    pub output: OutputFormat,
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, OpsError> {
        toml::from_str(text).map_err(|e| {
            let (line, column) = e.span().map_or((0, 0), |span| line_col(text, span.start));
            OpsError::Parse { message: e.message().to_string(), line, column }
        })
    }

    pub fn from_json_str(text: &str) -> Result<Self, OpsError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a config file: JSON when the extension is `.json`, TOML otherwise.
    pub fn load(path: &Path) -> Result<Self, OpsError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            OpsError::argument("config", format!("cannot read {}: {e}", path.display()))
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_toml_str(&text),
        }
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            strict_duplicate_keys: self.strict_duplicate_keys,
            allow_comments: self.allow_comments,
        }
    }

    pub fn diff_options(&self) -> DiffOptions {
        DiffOptions { list_align: ListAlign::from(&self.list_align), ..Default::default() }
    }
}

/// 1-based line and column of a byte offset.
fn line_col(text: &str, offset: usize) -> (usize, usize) {
    let before = &text[..offset.min(text.len())];
    let line = before.matches('\n').count() + 1;
    let column = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
    (line, column)
}
