// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event type registry
//!
//! Maps human-readable `category:element` names to the numeric types used in
//! filters. Registration is validated: a name or a numeric value can only be
//! claimed once.

use crate::event::EventType;
use crate::kinds::{BUILTIN_CATEGORIES, BUILTIN_KINDS};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("invalid name: {0:?}")]
    InvalidName(String),
    #[error("category already registered: {0}")]
    DuplicateCategory(String),
    #[error("category id {id} already used by {existing}")]
    DuplicateCategoryId { id: u16, existing: String },
    #[error("unknown category: {0}")]
    UnknownCategory(String),
    #[error("event type already registered: {0}")]
    DuplicateName(String),
    #[error("event type {event_type} already registered as {existing}")]
    DuplicateType {
        event_type: EventType,
        existing: String,
    },
}

/// Registered categories and event types
#[derive(Debug, Clone, Default)]
pub struct EventRegistry {
    categories: BTreeMap<String, u16>,
    by_name: BTreeMap<String, EventType>,
    by_type: BTreeMap<EventType, String>,
}

impl EventRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in category and event kind
    pub fn builtin() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for (name, id) in BUILTIN_CATEGORIES {
            registry.register_category(name, *id)?;
        }
        for (category, element, event_type) in BUILTIN_KINDS {
            registry.register(category, element, event_type.element())?;
        }
        Ok(registry)
    }

    pub fn register_category(&mut self, name: &str, id: u16) -> Result<(), RegistryError> {
        validate_name(name)?;
        if self.categories.contains_key(name) {
            return Err(RegistryError::DuplicateCategory(name.to_string()));
        }
        if let Some(existing) = self.category_name(id) {
            return Err(RegistryError::DuplicateCategoryId {
                id,
                existing: existing.to_string(),
            });
        }
        self.categories.insert(name.to_string(), id);
        Ok(())
    }

    /// Register `category:element` and return its numeric type
    pub fn register(
        &mut self,
        category: &str,
        element: &str,
        element_id: u16,
    ) -> Result<EventType, RegistryError> {
        validate_name(element)?;
        let category_id = self
            .category_id(category)
            .ok_or_else(|| RegistryError::UnknownCategory(category.to_string()))?;

        let name = format!("{}:{}", category, element);
        if self.by_name.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }

        let event_type = EventType::new(category_id, element_id);
        if let Some(existing) = self.by_type.get(&event_type) {
            return Err(RegistryError::DuplicateType {
                event_type,
                existing: existing.clone(),
            });
        }

        tracing::trace!(name = %name, event_type = %event_type, "event type registered");
        self.by_name.insert(name.clone(), event_type);
        self.by_type.insert(event_type, name);
        Ok(event_type)
    }

    /// Look up a `category:element` name
    pub fn resolve(&self, name: &str) -> Option<EventType> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, event_type: EventType) -> Option<&str> {
        self.by_type.get(&event_type).map(String::as_str)
    }

    pub fn category_id(&self, name: &str) -> Option<u16> {
        self.categories.get(name).copied()
    }

    pub fn category_name(&self, id: u16) -> Option<&str> {
        self.categories
            .iter()
            .find(|(_, v)| **v == id)
            .map(|(k, _)| k.as_str())
    }

    /// Registered types in numeric order
    pub fn iter(&self) -> impl Iterator<Item = (EventType, &str)> {
        self.by_type.iter().map(|(t, n)| (*t, n.as_str()))
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

fn validate_name(name: &str) -> Result<(), RegistryError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(RegistryError::InvalidName(name.to_string()))
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
