#![forbid(unsafe_code)]

use std::collections::BTreeMap;

/// Opaque attributes the calling channel round-trips between turns.
pub type SessionAttributes = BTreeMap<String, String>;

pub const ATTR_DETECTED_LANGUAGE: &str = "detectedLanguage";
pub const ATTR_LAST_SENTIMENT: &str = "lastSentiment";
/// Intent currently in slot filling, if any.
pub const ATTR_ACTIVE_INTENT: &str = "activeIntent";
/// Prefix of slot values carried between turns while an intent is open.
pub const ATTR_SLOT_PREFIX: &str = "slot.";

pub fn slot_attr_key(slot_name: &str) -> String {
    format!("{ATTR_SLOT_PREFIX}{slot_name}")
}

pub fn clear_slot_attrs(attrs: &mut SessionAttributes) {
    attrs.retain(|k, _| !k.starts_with(ATTR_SLOT_PREFIX));
}
