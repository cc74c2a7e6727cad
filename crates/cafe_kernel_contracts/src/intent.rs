#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::common::validate_unit_interval;
use crate::slot::SlotMap;
use crate::{ContractViolation, Validate};

/// Multi-turn "place an order" intent.
pub const ORDER_INTENT: &str = "RealizarPedido";
/// Knowledge-base question intent.
pub const FAQ_INTENT: &str = "AskFAQ";
pub const FAQ_TOPIC_SLOT: &str = "Topic";
/// Intent name recorded when the generative service answered.
pub const FALLBACK_INTENT: &str = "Fallback";

const MAX_INTENT_NAME_LEN: usize = 128;
const MAX_MESSAGE_LEN: usize = 4096;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredIntent {
    pub name: String,
    pub confidence: f64,
    #[serde(default)]
    pub slots: SlotMap,
    #[serde(default)]
    pub messages: Vec<String>,
}

impl StructuredIntent {
    pub fn v1(
        name: impl Into<String>,
        confidence: f64,
        slots: SlotMap,
        messages: Vec<String>,
    ) -> Result<Self, ContractViolation> {
        let v = Self {
            name: name.into(),
            confidence,
            slots,
            messages,
        };
        v.validate()?;
        Ok(v)
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.trim() == name
    }

    pub fn first_message(&self) -> Option<&str> {
        self.messages
            .first()
            .map(String::as_str)
            .filter(|m| !m.trim().is_empty())
    }
}

impl Validate for StructuredIntent {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.name.len() > MAX_INTENT_NAME_LEN {
            return Err(ContractViolation::InvalidValue {
                field: "structured_intent.name",
                reason: "must be <= 128 chars",
            });
        }
        validate_unit_interval("structured_intent.confidence", self.confidence)?;
        if self.messages.iter().any(|m| m.len() > MAX_MESSAGE_LEN) {
            return Err(ContractViolation::InvalidValue {
                field: "structured_intent.messages",
                reason: "message exceeds max length",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerativeAnswer {
    pub answer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceService {
    Structured,
    Generative,
}

impl SourceService {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceService::Structured => "structured",
            SourceService::Generative => "generative",
        }
    }
}

/// What resolved the turn. Exactly one per turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum IntentResult {
    Structured(StructuredIntent),
    Generative(GenerativeAnswer),
}

impl IntentResult {
    pub fn source(&self) -> SourceService {
        match self {
            IntentResult::Structured(_) => SourceService::Structured,
            IntentResult::Generative(_) => SourceService::Generative,
        }
    }

    pub fn intent_name(&self) -> &str {
        match self {
            IntentResult::Structured(v) => v.name.as_str(),
            IntentResult::Generative(_) => FALLBACK_INTENT,
        }
    }

    pub fn slots(&self) -> Option<&SlotMap> {
        match self {
            IntentResult::Structured(v) => Some(&v.slots),
            IntentResult::Generative(_) => None,
        }
    }
}
