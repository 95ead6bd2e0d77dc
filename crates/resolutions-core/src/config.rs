use crate::ids::PackageName;
use crate::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::str::FromStr;

/// Which packages are eligible for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum Selector {
    /// Only packages with one of these names.
    Packages(BTreeSet<PackageName>),
    /// Every package with a name.
    All,
}

impl Default for Selector {
    fn default() -> Self {
        Self::Packages(BTreeSet::new())
    }
}

impl Selector {
    /// Build a selector from a loosely typed option value.
    ///
    /// `"*"` selects everything, any other string selects that one package,
    /// an array selects its string members. Anything else selects nothing,
    /// which leaves the host's own dedupe untouched.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) if s == "*" => Self::All,
            Value::String(s) => Self::packages([s.as_str()]),
            Value::Array(items) => Self::packages(items.iter().filter_map(Value::as_str)),
            _ => Self::default(),
        }
    }

    /// Select an explicit set of package names.
    pub fn packages<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self::Packages(names.into_iter().map(PackageName::from).collect())
    }

    #[must_use]
    pub fn matches(&self, name: &PackageName) -> bool {
        match self {
            Self::All => true,
            Self::Packages(names) => names.contains(name),
        }
    }

    /// True when no package can ever match.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Packages(names) if names.is_empty())
    }
}

impl From<Value> for Selector {
    fn from(value: Value) -> Self {
        Self::from_value(&value)
    }
}

impl From<Selector> for Value {
    fn from(selector: Selector) -> Self {
        match selector {
            Selector::All => Value::String("*".to_string()),
            Selector::Packages(names) => Value::Array(
                names
                    .into_iter()
                    .map(|n| Value::String(n.as_str().to_string()))
                    .collect(),
            ),
        }
    }
}

impl FromStr for Selector {
    type Err = Error;

    /// Parse `*` or a comma-separated list of package names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "*" {
            return Ok(Self::All);
        }

        let names: Vec<&str> = s
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .collect();
        if names.contains(&"*") {
            return Err(Error::InvalidSelector(s.to_string()));
        }
        Ok(Self::packages(names))
    }
}

/// Runtime configuration for a resolutions run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Packages to dedupe.
    #[serde(default)]
    pub selector: Selector,

    /// Whether to emit JSON logs.
    #[serde(default)]
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    #[serde(default)]
    pub verbosity: u8,
}

impl Config {
    /// Create a new config with the given selector.
    #[must_use]
    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            ..Default::default()
        }
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }

    /// Replace the selector.
    #[must_use]
    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selector = selector;
        self
    }
}
