#![forbid(unsafe_code)]

//! Seams to the services the dialog core consumes but does not implement.
//! Every call returns an explicit result; what happens on failure is decided
//! by the orchestrator's fallback policy, never here.

use cafe_engines::language::{GlossaryTranslator, LexiconLanguageDetector};
use cafe_engines::nlu::KeywordIntentRecognizer;
use cafe_engines::providers::{HttpTranslateProvider, OpenAiGenerativeProvider, ProviderError};
use cafe_kernel_contracts::intent::StructuredIntent;
use cafe_kernel_contracts::interaction::InteractionRecord;
use cafe_kernel_contracts::language::LanguageCode;
use cafe_storage::interaction_log::{FsInteractionLog, InMemoryInteractionLog, StorageError};
use cafe_storage::repo::InteractionLogRepo;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    #[error("{service} is not configured")]
    NotConfigured { service: &'static str },
    #[error("{service} upstream failure: {detail}")]
    Upstream {
        service: &'static str,
        detail: String,
    },
    #[error("{service} returned an invalid response: {detail}")]
    InvalidResponse {
        service: &'static str,
        detail: String,
    },
    #[error("{service} does not support this request: {detail}")]
    Unsupported {
        service: &'static str,
        detail: String,
    },
}

impl CollaboratorError {
    pub fn service(&self) -> &'static str {
        match self {
            CollaboratorError::NotConfigured { service }
            | CollaboratorError::Upstream { service, .. }
            | CollaboratorError::InvalidResponse { service, .. }
            | CollaboratorError::Unsupported { service, .. } => *service,
        }
    }

    fn from_provider(service: &'static str, err: ProviderError) -> Self {
        let detail = err.to_string();
        match err {
            ProviderError::HttpStatus { .. } | ProviderError::Transport { .. } => {
                CollaboratorError::Upstream { service, detail }
            }
            ProviderError::InvalidResponse { .. } => {
                CollaboratorError::InvalidResponse { service, detail }
            }
            ProviderError::Unsupported { .. } => CollaboratorError::Unsupported { service, detail },
            ProviderError::Config(_) => CollaboratorError::NotConfigured { service },
        }
    }

    fn from_storage(err: StorageError) -> Self {
        CollaboratorError::Upstream {
            service: INTERACTION_LOG_SERVICE,
            detail: err.to_string(),
        }
    }
}

pub const LANGUAGE_SERVICE: &str = "language";
pub const INTENT_SERVICE: &str = "intent";
pub const GENERATIVE_SERVICE: &str = "generative";
pub const INTERACTION_LOG_SERVICE: &str = "interaction_log";

pub trait LanguageService: Send + Sync {
    fn detect_language(&self, text: &str) -> Result<LanguageCode, CollaboratorError>;

    fn translate(
        &self,
        text: &str,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> Result<String, CollaboratorError>;
}

pub trait IntentRecognizer: Send + Sync {
    fn resolve_intent(
        &self,
        text: &str,
        session_id: &str,
        locale: &str,
    ) -> Result<Option<StructuredIntent>, CollaboratorError>;
}

pub trait GenerativeService: Send + Sync {
    fn generate(&self, text: &str) -> Result<String, CollaboratorError>;
}

pub trait InteractionLogger: Send + Sync {
    fn log_interaction(&self, record: &InteractionRecord) -> Result<(), CollaboratorError>;
}

/// Keyword detection plus the en/pt -> es glossary.
#[derive(Debug, Clone, Default)]
pub struct LocalLanguageService {
    detector: LexiconLanguageDetector,
    translator: GlossaryTranslator,
}

impl LocalLanguageService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LanguageService for LocalLanguageService {
    fn detect_language(&self, text: &str) -> Result<LanguageCode, CollaboratorError> {
        Ok(self.detector.detect_code(text))
    }

    fn translate(
        &self,
        text: &str,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> Result<String, CollaboratorError> {
        self.translator
            .translate(text, source, target)
            .map_err(|e| CollaboratorError::from_provider(LANGUAGE_SERVICE, e))
    }
}

impl LanguageService for HttpTranslateProvider {
    fn detect_language(&self, text: &str) -> Result<LanguageCode, CollaboratorError> {
        self.detect(text)
            .map_err(|e| CollaboratorError::from_provider(LANGUAGE_SERVICE, e))
    }

    fn translate(
        &self,
        text: &str,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> Result<String, CollaboratorError> {
        HttpTranslateProvider::translate(self, text, source, target)
            .map_err(|e| CollaboratorError::from_provider(LANGUAGE_SERVICE, e))
    }
}

impl IntentRecognizer for KeywordIntentRecognizer {
    fn resolve_intent(
        &self,
        text: &str,
        session_id: &str,
        locale: &str,
    ) -> Result<Option<StructuredIntent>, CollaboratorError> {
        Ok(self.recognize(text, session_id, locale))
    }
}

impl GenerativeService for OpenAiGenerativeProvider {
    fn generate(&self, text: &str) -> Result<String, CollaboratorError> {
        OpenAiGenerativeProvider::generate(self, text)
            .map_err(|e| CollaboratorError::from_provider(GENERATIVE_SERVICE, e))
    }
}

/// Stands in when no generative provider is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableGenerativeService;

impl GenerativeService for UnavailableGenerativeService {
    fn generate(&self, _text: &str) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::NotConfigured {
            service: GENERATIVE_SERVICE,
        })
    }
}

impl InteractionLogger for InMemoryInteractionLog {
    fn log_interaction(&self, record: &InteractionRecord) -> Result<(), CollaboratorError> {
        self.append_interaction_row(record)
            .map_err(CollaboratorError::from_storage)
    }
}

impl InteractionLogger for FsInteractionLog {
    fn log_interaction(&self, record: &InteractionRecord) -> Result<(), CollaboratorError> {
        self.append_interaction_row(record)
            .map_err(CollaboratorError::from_storage)
    }
}
