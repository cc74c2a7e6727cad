#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::common::validate_text;
use crate::intent::{SourceService, StructuredIntent};
use crate::language::LanguageCode;
use crate::session::SessionAttributes;
use crate::slot::{ResolvedSlots, SlotMap};
use crate::{ContractViolation, Validate};

pub const DEFAULT_SESSION_ID: &str = "default-session";

const MAX_SESSION_ID_LEN: usize = 256;
const MAX_TURN_TEXT_LEN: usize = 8192;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid(ResolvedSlots),
    Invalid {
        violated_slot: String,
        prompt: String,
    },
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentState {
    Fulfilled,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DialogActionKind {
    ElicitSlot,
    Close,
}

/// What the calling channel should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogAction {
    ElicitSlot {
        slot_to_elicit: String,
        prompt: String,
        slots: SlotMap,
    },
    Close {
        intent_state: IntentState,
        message: String,
    },
}

impl DialogAction {
    pub fn close(intent_state: IntentState, message: impl Into<String>) -> Self {
        DialogAction::Close {
            intent_state,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> DialogActionKind {
        match self {
            DialogAction::ElicitSlot { .. } => DialogActionKind::ElicitSlot,
            DialogAction::Close { .. } => DialogActionKind::Close,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            DialogAction::ElicitSlot { prompt, .. } => prompt,
            DialogAction::Close { message, .. } => message,
        }
    }
}

/// One inbound message after language normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub raw_text: String,
    pub session_id: String,
    pub operational_text: String,
    pub detected_language: LanguageCode,
}

impl Turn {
    pub fn v1(
        raw_text: String,
        session_id: String,
        operational_text: String,
        detected_language: LanguageCode,
    ) -> Result<Self, ContractViolation> {
        let t = Self {
            raw_text,
            session_id,
            operational_text,
            detected_language,
        };
        t.validate()?;
        Ok(t)
    }
}

impl Validate for Turn {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_text("turn.session_id", &self.session_id, MAX_SESSION_ID_LEN)?;
        if self.raw_text.len() > MAX_TURN_TEXT_LEN {
            return Err(ContractViolation::InvalidValue {
                field: "turn.raw_text",
                reason: "exceeds max length",
            });
        }
        if self.operational_text.len() > MAX_TURN_TEXT_LEN * 2 {
            return Err(ContractViolation::InvalidValue {
                field: "turn.operational_text",
                reason: "exceeds max length",
            });
        }
        Ok(())
    }
}

fn default_session_id() -> String {
    DEFAULT_SESSION_ID.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnInput {
    #[serde(default)]
    pub raw_text: String,
    #[serde(default = "default_session_id")]
    pub session_id: String,
    #[serde(default)]
    pub session_attributes: SessionAttributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_intent_candidate: Option<StructuredIntent>,
}

impl TurnInput {
    pub fn text(raw_text: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            session_id: session_id.into(),
            session_attributes: SessionAttributes::new(),
            structured_intent_candidate: None,
        }
    }
}

/// Code-hook invocation: the channel already resolved the intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentRequest {
    pub intent_name: String,
    #[serde(default)]
    pub slots: SlotMap,
    #[serde(default)]
    pub session_attributes: SessionAttributes,
    #[serde(default)]
    pub input_transcript: String,
    #[serde(default = "default_session_id")]
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutput {
    pub dialog_action: DialogActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_to_elicit: Option<String>,
    pub slots: SlotMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_state: Option<IntentState>,
    pub reply_text: String,
    pub session_attributes: SessionAttributes,
    pub source_service: SourceService,
    pub detected_language: LanguageCode,
}

impl TurnOutput {
    /// `slots` is used for `Close`; an `ElicitSlot` carries its own partial slots.
    pub fn from_action(
        action: DialogAction,
        slots: SlotMap,
        reply_text: String,
        session_attributes: SessionAttributes,
        source_service: SourceService,
        detected_language: LanguageCode,
    ) -> Self {
        let (dialog_action, slot_to_elicit, slots, intent_state) = match action {
            DialogAction::ElicitSlot {
                slot_to_elicit,
                slots,
                ..
            } => (DialogActionKind::ElicitSlot, Some(slot_to_elicit), slots, None),
            DialogAction::Close { intent_state, .. } => {
                (DialogActionKind::Close, None, slots, Some(intent_state))
            }
        };
        Self {
            dialog_action,
            slot_to_elicit,
            slots,
            intent_state,
            reply_text,
            session_attributes,
            source_service,
            detected_language,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::SupportedLanguage;
    use crate::slot::SlotValue;

    #[test]
    fn at_dialog_01_turn_requires_session_id() {
        let lang = LanguageCode::from(SupportedLanguage::Es);
        assert!(Turn::v1("hola".into(), "s1".into(), "hola".into(), lang.clone()).is_ok());
        assert!(Turn::v1("hola".into(), " ".into(), "hola".into(), lang).is_err());
    }

    #[test]
    fn at_dialog_02_turn_input_defaults_session_and_candidate() {
        let input: TurnInput = serde_json::from_str(r#"{"rawText":"hola"}"#).unwrap();
        assert_eq!(input.session_id, DEFAULT_SESSION_ID);
        assert!(input.structured_intent_candidate.is_none());
        assert!(input.session_attributes.is_empty());
    }

    #[test]
    fn at_dialog_03_elicit_output_carries_slot_and_no_state() {
        let mut slots = SlotMap::new();
        slots.insert("Cantidad".to_string(), None);
        slots.insert(
            "TiposDeBebida".to_string(),
            Some(SlotValue::interpreted("Latte")),
        );
        let out = TurnOutput::from_action(
            DialogAction::ElicitSlot {
                slot_to_elicit: "Cantidad".to_string(),
                prompt: "¿Cuántos?".to_string(),
                slots,
            },
            SlotMap::new(),
            "¿Cuántos?".to_string(),
            SessionAttributes::new(),
            SourceService::Structured,
            LanguageCode::from(SupportedLanguage::Es),
        );
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["dialogAction"], "ElicitSlot");
        assert_eq!(json["slotToElicit"], "Cantidad");
        assert!(json.get("intentState").is_none());
        assert!(json["slots"]["Cantidad"].is_null());
        assert_eq!(json["sourceService"], "structured");
    }
}
