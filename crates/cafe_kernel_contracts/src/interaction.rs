#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::common::validate_text;
use crate::intent::SourceService;
use crate::language::LanguageCode;
use crate::sentiment::SentimentLabel;
use crate::slot::SlotMap;
use crate::{ContractViolation, Validate};

/// One fully resolved turn, as handed to the interaction logger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRecord {
    pub interaction_id: String,
    pub session_id: String,
    /// RFC 3339, UTC.
    pub timestamp: String,
    pub user_input: String,
    pub detected_language: LanguageCode,
    pub translated_input: String,
    pub intent: String,
    pub slots: SlotMap,
    pub response_text: String,
    pub source_service: SourceService,
    pub sentiment: SentimentLabel,
    /// Marks utterances the structured recognizer could not resolve.
    pub is_fallback: bool,
}

impl InteractionRecord {
    /// Date prefix (`YYYY-MM-DD`) of the timestamp, used for partitioned layouts.
    pub fn date_partition(&self) -> &str {
        self.timestamp
            .split('T')
            .next()
            .unwrap_or(self.timestamp.as_str())
    }
}

impl Validate for InteractionRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_text("interaction_record.interaction_id", &self.interaction_id, 64)?;
        if !self
            .interaction_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ContractViolation::InvalidValue {
                field: "interaction_record.interaction_id",
                reason: "must contain only ASCII alphanumeric, hyphen or underscore",
            });
        }
        validate_text("interaction_record.session_id", &self.session_id, 256)?;
        validate_text("interaction_record.timestamp", &self.timestamp, 64)?;
        validate_text("interaction_record.intent", &self.intent, 128)?;
        if self.is_fallback != (self.source_service == SourceService::Generative) {
            return Err(ContractViolation::InvalidValue {
                field: "interaction_record.is_fallback",
                reason: "must be true exactly when source_service=generative",
            });
        }
        Ok(())
    }
}
