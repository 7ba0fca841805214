use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

// Optionally signed run of ASCII digits, surrounding whitespace allowed
static INTEGER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[+-]?[0-9]+\s*$").unwrap());

/// SQL type inferred for a column
///
/// Variants are declared in lattice order so that the derived `Ord`
/// gives `Integer < DoublePrecision < Text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlType {
    Integer,
    DoublePrecision,
    Text,
}

impl SqlType {
    /// Guess the type of a single sample value
    pub fn guess(sample: &str) -> Self {
        if INTEGER_REGEX.is_match(sample) {
            return SqlType::Integer;
        }

        if sample.trim().parse::<f64>().is_ok() {
            SqlType::DoublePrecision
        } else {
            SqlType::Text
        }
    }

    /// Widen `current` so that it also admits `sample`
    ///
    /// Types only move up the lattice, so once a column is `Text` it
    /// stays `Text` whatever numeric-looking samples follow.
    pub fn widen(current: Option<SqlType>, sample: &str) -> SqlType {
        Self::join(current, Self::guess(sample))
    }

    /// Least upper bound of an optional current type and a new type
    pub fn join(current: Option<SqlType>, other: SqlType) -> SqlType {
        match current {
            Some(current) => current.max(other),
            None => other,
        }
    }

    /// SQL spelling used in DDL
    pub fn as_sql(self) -> &'static str {
        match self {
            SqlType::Integer => "integer",
            SqlType::DoublePrecision => "double precision",
            SqlType::Text => "text",
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}
