//! SourceCategory — the stock list an instrument was drawn from.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Label of the stock list supplying an instrument.
///
/// The category is handed in by the caller; it changes the trade cap, the
/// reinvestment rule, and whether the moving-average entry filter applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceCategory {
    V40,
    V40Next,
    V200,
    Custom(String),
}

impl SourceCategory {
    pub fn is_v200(&self) -> bool {
        matches!(self, SourceCategory::V200)
    }

    /// Maximum trades per instrument: one for V200, two for everything else.
    pub fn trade_cap(&self) -> usize {
        if self.is_v200() {
            1
        } else {
            2
        }
    }

    pub fn label(&self) -> &str {
        match self {
            SourceCategory::V40 => "V40",
            SourceCategory::V40Next => "V40Next",
            SourceCategory::V200 => "V200",
            SourceCategory::Custom(name) => name,
        }
    }
}

impl fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<String> for SourceCategory {
    fn from(value: String) -> Self {
        match value.as_str() {
            "V40" => SourceCategory::V40,
            "V40Next" => SourceCategory::V40Next,
            "V200" => SourceCategory::V200,
            _ => SourceCategory::Custom(value),
        }
    }
}

impl From<&str> for SourceCategory {
    fn from(value: &str) -> Self {
        SourceCategory::from(value.to_string())
    }
}

impl From<SourceCategory> for String {
    fn from(value: SourceCategory) -> Self {
        match value {
            SourceCategory::Custom(name) => name,
            other => other.label().to_string(),
        }
    }
}

impl FromStr for SourceCategory {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(SourceCategory::from(s))
    }
}
