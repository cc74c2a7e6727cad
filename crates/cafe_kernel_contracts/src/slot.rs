#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One slot as reported by the NLU layer. Either side may be missing when the
/// recognizer heard something it could not map to the slot type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreted_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_value: Option<String>,
}

impl SlotValue {
    pub fn interpreted(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            interpreted_value: Some(value.clone()),
            original_value: Some(value),
        }
    }

    pub fn with_original(interpreted: impl Into<String>, original: impl Into<String>) -> Self {
        Self {
            interpreted_value: Some(interpreted.into()),
            original_value: Some(original.into()),
        }
    }

    pub fn unrecognized(original: impl Into<String>) -> Self {
        Self {
            interpreted_value: None,
            original_value: Some(original.into()),
        }
    }
}

/// Slot name -> value. `None` is an explicitly cleared (or never filled) slot.
pub type SlotMap = BTreeMap<String, Option<SlotValue>>;

/// A slot resolved once at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState<'a> {
    Absent,
    Unrecognized { original: Option<&'a str> },
    Present(&'a str),
}

impl<'a> SlotState<'a> {
    pub fn of(slots: &'a SlotMap, name: &str) -> Self {
        let Some(Some(value)) = slots.get(name) else {
            return SlotState::Absent;
        };
        let original = value
            .original_value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty());
        match value
            .interpreted_value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            Some(v) => SlotState::Present(v),
            None if original.is_none() => SlotState::Absent,
            None => SlotState::Unrecognized { original },
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, SlotState::Absent)
    }
}

/// Canonical values of every slot of a fully validated intent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResolvedSlots(BTreeMap<String, String>);

impl ResolvedSlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
