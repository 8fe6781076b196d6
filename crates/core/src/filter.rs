// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event type filters
//!
//! Supports:
//!   - Everything: "all" or "*"
//!   - Nothing: "none"
//!   - Named type: "neb:host_status"
//!   - Category: "neb:*" or "1:*"
//!   - Numeric pair: "1:14"
//!   - Raw value: "65550"
//!
//! Entries are comma separated.

use crate::event::EventType;
use crate::registry::EventRegistry;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("empty filter string")]
    Empty,
    #[error("empty entry in filter {0:?}")]
    EmptyEntry(String),
    #[error("unknown event type: {0}")]
    UnknownType(String),
    #[error("unknown category: {0}")]
    UnknownCategory(String),
    #[error("malformed filter entry: {0}")]
    Malformed(String),
}

/// Set of event types accepted by a queue
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FilterSet {
    #[default]
    All,
    Only {
        types: BTreeSet<EventType>,
        categories: BTreeSet<u16>,
    },
}

impl FilterSet {
    pub fn all() -> Self {
        FilterSet::All
    }

    pub fn none() -> Self {
        FilterSet::Only {
            types: BTreeSet::new(),
            categories: BTreeSet::new(),
        }
    }

    pub fn only(types: impl IntoIterator<Item = EventType>) -> Self {
        FilterSet::Only {
            types: types.into_iter().collect(),
            categories: BTreeSet::new(),
        }
    }

    pub fn categories(categories: impl IntoIterator<Item = u16>) -> Self {
        FilterSet::Only {
            types: BTreeSet::new(),
            categories: categories.into_iter().collect(),
        }
    }

    /// Add one type; no-op on `All`
    pub fn with_type(mut self, event_type: EventType) -> Self {
        if let FilterSet::Only { types, .. } = &mut self {
            types.insert(event_type);
        }
        self
    }

    /// Add a whole category; no-op on `All`
    pub fn with_category(mut self, category: u16) -> Self {
        if let FilterSet::Only { categories, .. } = &mut self {
            categories.insert(category);
        }
        self
    }

    pub fn accepts(&self, event_type: EventType) -> bool {
        match self {
            FilterSet::All => true,
            FilterSet::Only { types, categories } => {
                types.contains(&event_type) || categories.contains(&event_type.category())
            }
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, FilterSet::All)
    }

    /// True when nothing can pass
    pub fn is_empty(&self) -> bool {
        match self {
            FilterSet::All => false,
            FilterSet::Only { types, categories } => types.is_empty() && categories.is_empty(),
        }
    }

    /// Parse a filter string, resolving names through `registry`
    pub fn parse(text: &str, registry: &EventRegistry) -> Result<Self, FilterError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(FilterError::Empty);
        }
        if text == "none" {
            return Ok(FilterSet::none());
        }

        let mut filter = FilterSet::none();
        for entry in text.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                return Err(FilterError::EmptyEntry(text.to_string()));
            }
            if entry == "all" || entry == "*" {
                return Ok(FilterSet::All);
            }
            filter = match parse_entry(entry, registry)? {
                Entry::Type(t) => filter.with_type(t),
                Entry::Category(c) => filter.with_category(c),
            };
        }
        Ok(filter)
    }
}

impl FromIterator<EventType> for FilterSet {
    fn from_iter<I: IntoIterator<Item = EventType>>(iter: I) -> Self {
        FilterSet::only(iter)
    }
}

impl fmt::Display for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterSet::All => write!(f, "all"),
            FilterSet::Only { types, categories } => {
                if types.is_empty() && categories.is_empty() {
                    return write!(f, "none");
                }
                let entries: Vec<String> = categories
                    .iter()
                    .map(|c| format!("{}:*", c))
                    .chain(types.iter().map(|t| t.to_string()))
                    .collect();
                write!(f, "{}", entries.join(","))
            }
        }
    }
}

enum Entry {
    Type(EventType),
    Category(u16),
}

fn parse_entry(entry: &str, registry: &EventRegistry) -> Result<Entry, FilterError> {
    let Some((category, element)) = entry.split_once(':') else {
        return entry
            .parse::<u32>()
            .map(|v| Entry::Type(EventType::from_raw(v)))
            .map_err(|_| FilterError::Malformed(entry.to_string()));
    };

    if category.is_empty() || element.is_empty() || element.contains(':') {
        return Err(FilterError::Malformed(entry.to_string()));
    }

    let numeric_category = category.parse::<u16>().ok();

    if element == "*" {
        return numeric_category
            .or_else(|| registry.category_id(category))
            .map(Entry::Category)
            .ok_or_else(|| FilterError::UnknownCategory(category.to_string()));
    }

    match (numeric_category, element.parse::<u16>().ok()) {
        (Some(c), Some(e)) => Ok(Entry::Type(EventType::new(c, e))),
        (None, Some(e)) => registry
            .category_id(category)
            .map(|c| Entry::Type(EventType::new(c, e)))
            .ok_or_else(|| FilterError::UnknownCategory(category.to_string())),
        (Some(_), None) => Err(FilterError::Malformed(entry.to_string())),
        (None, None) => registry
            .resolve(entry)
            .map(Entry::Type)
            .ok_or_else(|| FilterError::UnknownType(entry.to_string())),
    }
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
