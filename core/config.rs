//! Rule configuration.
//!
//! Rules are read from a TOML file:
//!
//! ```toml
//! [folders]
//! media = "images/media"
//!
//! [[rule]]
//! command = "/usr/bin/convert|IMAGE_FILE|-rotate|90|IMAGE_FILE"
//! imagefolder = ["media"]
//! exclude = ["odd"]
//! excludeFirst = [1]
//! excludeLast = ["1"]
//! ```

use crate::CoreError;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Folder alias to directory. Relative directories are resolved against
    /// the base directory of the run.
    pub folders: BTreeMap<String, PathBuf>,

    pub listing: ListingConfig,

    #[serde(rename = "rule")]
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListingConfig {
    /// Glob patterns a file name must match to be listed. Empty lists everything.
    pub include: Vec<String>,
}

/// One `[[rule]]` block exactly as configured. Compiled into a
/// [`Rule`](crate::Rule) before the run starts.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct RuleConfig {
    pub command: String,

    #[serde(deserialize_with = "one_or_many")]
    pub imagefolder: Vec<String>,

    #[serde(deserialize_with = "one_or_many")]
    pub exclude: Vec<String>,

    #[serde(deserialize_with = "one_or_many")]
    pub exclude_first: Vec<FilterValue>,

    #[serde(deserialize_with = "one_or_many")]
    pub exclude_last: Vec<FilterValue>,
}

/// A first/last position as written in the configuration. Strings are kept
/// verbatim so that malformed values can be reported when the rule is compiled.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Number(i64),
    Text(String),
}

impl FilterValue {
    pub fn as_position(&self) -> Option<i64> {
        match self {
            FilterValue::Number(n) => Some(*n),
            FilterValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Number(n) => write!(f, "{}", n),
            FilterValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Text(s.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let text = fs::read_to_string(path).map_err(|e| CoreError::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&text, path)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, CoreError> {
        Self::parse(text, Path::new("<inline>"))
    }

    fn parse(text: &str, origin: &Path) -> Result<Self, CoreError> {
        toml::from_str(text).map_err(|e| CoreError::Config {
            path: origin.display().to_string(),
            message: e.to_string().trim_end().to_string(),
        })
    }
}
