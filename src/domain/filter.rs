//! Coverage include/exclude filters.
//!
//! Rules are kept as a tagged variant internally and only turned into the
//! engine's sign-prefixed strings at the adapter boundary. An absent filter
//! (no restriction) is distinct from an empty one.

use serde::{Deserialize, Serialize};

/// A single class-name filter rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterRule {
    Include(String),
    Exclude(String),
}

impl FilterRule {
    /// Engine representation: exclusions carry a leading `-`
    pub fn to_engine_string(&self) -> String {
        match self {
            FilterRule::Include(pattern) => pattern.clone(),
            FilterRule::Exclude(pattern) => format!("-{}", pattern),
        }
    }
}

/// Ordered coverage filter, or no filter at all
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageFilter {
    rules: Option<Vec<FilterRule>>,
}

impl CoverageFilter {
    /// No restriction
    pub fn none() -> Self {
        Self { rules: None }
    }

    /// Compose includes and excludes into one filter.
    ///
    /// Includes come first in input order, then excludes in input order.
    /// Repeated rules keep their first position. Returns [`CoverageFilter::none`]
    /// when both inputs are empty.
    pub fn compose<I, E>(includes: I, excludes: E) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let mut rules: Vec<FilterRule> = Vec::new();
        let candidates = includes
            .into_iter()
            .map(|p| FilterRule::Include(p.as_ref().to_string()))
            .chain(
                excludes
                    .into_iter()
                    .map(|p| FilterRule::Exclude(p.as_ref().to_string())),
            );

        for rule in candidates {
            if !rules.contains(&rule) {
                rules.push(rule);
            }
        }

        if rules.is_empty() {
            Self::none()
        } else {
            Self { rules: Some(rules) }
        }
    }

    /// Whether this is the "no filter" sentinel
    pub fn is_none(&self) -> bool {
        self.rules.is_none()
    }

    /// The rules, if any
    pub fn rules(&self) -> Option<&[FilterRule]> {
        self.rules.as_deref()
    }

    /// Serialize for the engine; `None` means "do not pass a filter"
    pub fn to_engine_args(&self) -> Option<Vec<String>> {
        self.rules
            .as_ref()
            .map(|rules| rules.iter().map(FilterRule::to_engine_string).collect())
    }
}
