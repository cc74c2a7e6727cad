#![forbid(unsafe_code)]

//! Environment-driven assembly of the dialog core for the HTTP binary.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use cafe_engines::nlu::KeywordIntentRecognizer;
use cafe_engines::providers::{
    HttpTranslateProvider, OpenAiGenerativeProvider, ProviderError, DEFAULT_TIMEOUT_MS,
};
use cafe_engines::router::RouterConfig;
use cafe_kernel_contracts::dialog::{FulfillmentRequest, TurnInput, TurnOutput};
use cafe_kernel_contracts::language::LanguageCode;
use cafe_kernel_contracts::session::SessionAttributes;
use cafe_kernel_contracts::ContractViolation;
use cafe_os::collaborators::{
    GenerativeService, InteractionLogger, LanguageService, LocalLanguageService,
    UnavailableGenerativeService,
};
use cafe_os::orchestrator::{Collaborators, DialogOrchestrator, OrchestratorConfig};
use cafe_storage::interaction_log::{
    FsInteractionLog, InMemoryInteractionLog, DEFAULT_MEMORY_LOG_MAX_ROWS,
};

pub const DEFAULT_HTTP_BIND: &str = "127.0.0.1:8080";
const MIN_PROVIDER_TIMEOUT_MS: u32 = 100;
const MAX_PROVIDER_TIMEOUT_MS: u32 = 60_000;
const MAX_MEMORY_LOG_ROWS: usize = 1_000_000;

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("invalid {key}: {reason}")]
    InvalidEnv { key: &'static str, reason: String },
    #[error(transparent)]
    Contract(#[from] ContractViolation),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslateSettings {
    pub base_url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdapterConfig {
    pub http_bind: SocketAddr,
    pub orchestrator: OrchestratorConfig,
    /// `None` keeps interaction records in memory.
    pub log_dir: Option<PathBuf>,
    /// Row cap of the in-memory log; oldest rows are evicted past it.
    pub memory_log_max_rows: usize,
    /// `None` selects the local keyword detector and glossary.
    pub translate: Option<TranslateSettings>,
    /// `None` leaves the generative fallback unavailable.
    pub openai: Option<OpenAiSettings>,
    pub provider_timeout_ms: u32,
}

impl AdapterConfig {
    pub fn mvp_v1() -> Self {
        Self {
            http_bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            orchestrator: OrchestratorConfig::mvp_v1(),
            log_dir: None,
            memory_log_max_rows: DEFAULT_MEMORY_LOG_MAX_ROWS,
            translate: None,
            openai: None,
            provider_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn from_env() -> Result<Self, AdapterError> {
        Self::from_env_var_map(|key| env::var(key).ok())
    }

    pub fn from_env_var_map<F>(lookup: F) -> Result<Self, AdapterError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::mvp_v1();

        if let Some(bind) = var("CAFE_HTTP_BIND") {
            config.http_bind = bind.parse().map_err(|_| AdapterError::InvalidEnv {
                key: "CAFE_HTTP_BIND",
                reason: format!("'{bind}' is not a socket address"),
            })?;
        }

        if let Some(raw) = var("CAFE_CONFIDENCE_THRESHOLD") {
            let threshold = raw
                .parse::<f64>()
                .ok()
                .filter(|t| (0.0..=1.0).contains(t))
                .ok_or_else(|| AdapterError::InvalidEnv {
                    key: "CAFE_CONFIDENCE_THRESHOLD",
                    reason: format!("'{raw}' must be a number within [0, 1]"),
                })?;
            config.orchestrator.router = RouterConfig {
                acceptance_threshold: threshold,
            };
        }

        if let Some(raw) = var("CAFE_OPERATIONAL_LANGUAGE") {
            let code = LanguageCode::new(raw.as_str())?;
            if code.supported().is_none() {
                return Err(AdapterError::InvalidEnv {
                    key: "CAFE_OPERATIONAL_LANGUAGE",
                    reason: format!("'{raw}' must be one of es, en, pt"),
                });
            }
            config.orchestrator.operational_language = code;
        }

        if let Some(locale) = var("CAFE_OPERATIONAL_LOCALE") {
            config.orchestrator.operational_locale = locale;
        }

        config.log_dir = var("CAFE_LOG_DIR").map(PathBuf::from);
        config.memory_log_max_rows = var("CAFE_MEMORY_LOG_MAX_ROWS")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|v| (1..=MAX_MEMORY_LOG_ROWS).contains(v))
            .unwrap_or(DEFAULT_MEMORY_LOG_MAX_ROWS);

        config.translate = var("CAFE_TRANSLATE_URL").map(|base_url| TranslateSettings {
            base_url,
            api_key: var("CAFE_TRANSLATE_API_KEY"),
        });

        config.openai = var("CAFE_OPENAI_API_KEY").map(|api_key| OpenAiSettings {
            api_key,
            base_url: var("CAFE_OPENAI_BASE_URL"),
            model: var("CAFE_OPENAI_MODEL"),
        });

        config.provider_timeout_ms = var("CAFE_PROVIDER_TIMEOUT_MS")
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|v| (MIN_PROVIDER_TIMEOUT_MS..=MAX_PROVIDER_TIMEOUT_MS).contains(v))
            .unwrap_or(DEFAULT_TIMEOUT_MS);

        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AdapterHealthResponse {
    pub status: String,
    pub outcome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub struct AdapterRuntime {
    config: AdapterConfig,
    orchestrator: DialogOrchestrator,
}

impl AdapterRuntime {
    pub fn new(config: AdapterConfig) -> Result<Self, AdapterError> {
        let timeout_ms = config.provider_timeout_ms;

        let language: Box<dyn LanguageService> = match &config.translate {
            Some(t) => Box::new(HttpTranslateProvider::new(
                t.base_url.clone(),
                t.api_key.clone(),
                timeout_ms,
            )?),
            None => Box::new(LocalLanguageService::new()),
        };

        let generative: Box<dyn GenerativeService> = match &config.openai {
            Some(o) => Box::new(OpenAiGenerativeProvider::new(
                o.api_key.clone(),
                o.base_url.clone(),
                o.model.clone(),
                timeout_ms,
            )?),
            None => Box::new(UnavailableGenerativeService),
        };

        let logger: Box<dyn InteractionLogger> = match &config.log_dir {
            Some(dir) => Box::new(FsInteractionLog::new(dir.clone())),
            None => Box::new(InMemoryInteractionLog::with_max_rows(
                config.memory_log_max_rows,
            )),
        };

        let orchestrator = DialogOrchestrator::new(
            config.orchestrator.clone(),
            Collaborators {
                language,
                intents: Box::new(KeywordIntentRecognizer::default()),
                generative,
                logger,
            },
        )?;

        tracing::info!(
            bind = %config.http_bind,
            operational_language = config.orchestrator.operational_language.as_str(),
            threshold = config.orchestrator.router.acceptance_threshold,
            remote_translation = config.translate.is_some(),
            generative = config.openai.is_some(),
            log_dir = ?config.log_dir,
            "adapter runtime assembled"
        );
        Ok(Self {
            config,
            orchestrator,
        })
    }

    pub fn default_from_env() -> Result<Self, AdapterError> {
        Self::new(AdapterConfig::from_env()?)
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn health_report(&self) -> AdapterHealthResponse {
        let reason = self
            .config
            .openai
            .is_none()
            .then(|| "generative fallback not configured".to_string());
        AdapterHealthResponse {
            status: "ok".to_string(),
            outcome: "HEALTHY".to_string(),
            reason,
        }
    }

    pub fn run_turn(&self, input: TurnInput) -> TurnOutput {
        self.orchestrator.handle_turn(&input)
    }

    pub fn run_fulfillment(&self, request: FulfillmentRequest) -> TurnOutput {
        self.orchestrator.fulfill(&request)
    }

    /// What the channel receives when a turn could not run to completion.
    pub fn apology(&self, session_attributes: SessionAttributes) -> TurnOutput {
        self.orchestrator.apology(session_attributes)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use cafe_engines::slot_filling::QUANTITY_SLOT;
    use cafe_kernel_contracts::dialog::{DialogActionKind, IntentState};
    use cafe_kernel_contracts::intent::SourceService;
    use cafe_kernel_contracts::session::ATTR_DETECTED_LANGUAGE;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AdapterConfig, AdapterError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AdapterConfig::from_env_var_map(|key| map.get(key).cloned())
    }

    #[test]
    fn at_adapter_01_empty_env_gives_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, AdapterConfig::mvp_v1());
        assert_eq!(config.http_bind.to_string(), DEFAULT_HTTP_BIND);
        assert_eq!(config.orchestrator.router.acceptance_threshold, 0.6);
        assert_eq!(config.orchestrator.operational_locale, "es_ES");
        assert_eq!(config.provider_timeout_ms, 8000);
        assert_eq!(config.memory_log_max_rows, DEFAULT_MEMORY_LOG_MAX_ROWS);
    }

    #[test]
    fn at_adapter_02_threshold_outside_unit_interval_is_rejected() {
        for bad in ["1.5", "-0.1", "NaN", "high"] {
            let err = config_from(&[("CAFE_CONFIDENCE_THRESHOLD", bad)]).unwrap_err();
            assert!(matches!(
                err,
                AdapterError::InvalidEnv {
                    key: "CAFE_CONFIDENCE_THRESHOLD",
                    ..
                }
            ));
        }
        let ok = config_from(&[("CAFE_CONFIDENCE_THRESHOLD", "0.75")]).unwrap();
        assert_eq!(ok.orchestrator.router.acceptance_threshold, 0.75);
    }

    #[test]
    fn at_adapter_03_timeout_out_of_range_falls_back_to_default() {
        let low = config_from(&[("CAFE_PROVIDER_TIMEOUT_MS", "5")]).unwrap();
        assert_eq!(low.provider_timeout_ms, 8000);
        let junk = config_from(&[("CAFE_PROVIDER_TIMEOUT_MS", "soon")]).unwrap();
        assert_eq!(junk.provider_timeout_ms, 8000);
        let ok = config_from(&[("CAFE_PROVIDER_TIMEOUT_MS", "2500")]).unwrap();
        assert_eq!(ok.provider_timeout_ms, 2500);
        let rows = config_from(&[("CAFE_MEMORY_LOG_MAX_ROWS", "0")]).unwrap();
        assert_eq!(rows.memory_log_max_rows, DEFAULT_MEMORY_LOG_MAX_ROWS);
        let rows = config_from(&[("CAFE_MEMORY_LOG_MAX_ROWS", "500")]).unwrap();
        assert_eq!(rows.memory_log_max_rows, 500);
    }

    #[test]
    fn at_adapter_04_operational_language_must_be_supported() {
        let err = config_from(&[("CAFE_OPERATIONAL_LANGUAGE", "fr")]).unwrap_err();
        assert!(matches!(
            err,
            AdapterError::InvalidEnv {
                key: "CAFE_OPERATIONAL_LANGUAGE",
                ..
            }
        ));
        let ok = config_from(&[("CAFE_OPERATIONAL_LANGUAGE", " PT ")]).unwrap();
        assert_eq!(ok.orchestrator.operational_language.as_str(), "pt");
    }

    #[test]
    fn at_adapter_05_optional_providers_follow_their_keys() {
        let config = config_from(&[
            ("CAFE_TRANSLATE_URL", "http://localhost:5000"),
            ("CAFE_OPENAI_API_KEY", "sk-test"),
            ("CAFE_OPENAI_MODEL", "gpt-4o"),
            ("CAFE_TRANSLATE_API_KEY", "   "),
            ("CAFE_LOG_DIR", "/var/lib/cafe"),
        ])
        .unwrap();
        assert_eq!(
            config.translate,
            Some(TranslateSettings {
                base_url: "http://localhost:5000".to_string(),
                api_key: None,
            })
        );
        let openai = config.openai.unwrap();
        assert_eq!(openai.model.as_deref(), Some("gpt-4o"));
        assert_eq!(openai.base_url, None);
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/lib/cafe")));
    }

    #[test]
    fn at_adapter_06_bad_bind_address_is_rejected() {
        assert!(matches!(
            config_from(&[("CAFE_HTTP_BIND", "localhost")]),
            Err(AdapterError::InvalidEnv {
                key: "CAFE_HTTP_BIND",
                ..
            })
        ));
    }

    #[test]
    fn at_adapter_07_local_runtime_elicits_missing_quantity() {
        let runtime = AdapterRuntime::new(AdapterConfig::mvp_v1()).unwrap();
        let out = runtime.run_turn(TurnInput::text("Quiero un latte grande", "s1"));
        assert_eq!(out.dialog_action, DialogActionKind::ElicitSlot);
        assert_eq!(out.slot_to_elicit.as_deref(), Some(QUANTITY_SLOT));
        assert_eq!(out.source_service, SourceService::Structured);
    }

    #[test]
    fn at_adapter_08_unconfigured_generative_closes_with_default() {
        let runtime = AdapterRuntime::new(AdapterConfig::mvp_v1()).unwrap();
        let out = runtime.run_turn(TurnInput::text("xyzzy plugh", "s2"));
        assert_eq!(out.dialog_action, DialogActionKind::Close);
        assert_eq!(out.intent_state, Some(IntentState::Fulfilled));
        assert_eq!(out.source_service, SourceService::Generative);
        let health = runtime.health_report();
        assert_eq!(health.outcome, "HEALTHY");
        assert!(health.reason.is_some());
    }

    #[test]
    fn at_adapter_09_file_log_dir_receives_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AdapterConfig::mvp_v1();
        config.log_dir = Some(dir.path().to_path_buf());
        let runtime = AdapterRuntime::new(config).unwrap();
        runtime.run_turn(TurnInput::text("¿Cuál es el horario?", "s3"));
        let partitions: Vec<_> = std::fs::read_dir(dir.path().join("logs"))
            .unwrap()
            .collect();
        assert_eq!(partitions.len(), 1);
    }

    #[test]
    fn at_adapter_10_health_response_omits_absent_reason() {
        let json = serde_json::to_value(AdapterHealthResponse {
            status: "ok".to_string(),
            outcome: "HEALTHY".to_string(),
            reason: None,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"status": "ok", "outcome": "HEALTHY"}));
    }

    #[test]
    fn at_adapter_11_local_runtime_answers_faq_in_user_language() {
        let runtime = AdapterRuntime::new(AdapterConfig::mvp_v1()).unwrap();
        let en = runtime.run_turn(TurnInput::text("What are your opening hours?", "s4"));
        assert_eq!(en.detected_language.as_str(), "en");
        assert!(en.reply_text.starts_with("🕐 *Opening Hours:*"), "{}", en.reply_text);

        let pt = runtime.run_turn(TurnInput::text("Olá, qual o preço?", "s5"));
        assert_eq!(pt.detected_language.as_str(), "pt");
        assert!(pt.reply_text.starts_with("💰 *Preços:*"), "{}", pt.reply_text);
    }

    #[test]
    fn at_adapter_12_local_runtime_treats_wanting_to_know_as_a_question() {
        let runtime = AdapterRuntime::new(AdapterConfig::mvp_v1()).unwrap();
        let out = runtime.run_turn(TurnInput::text("Quiero saber el horario", "s6"));
        assert_eq!(out.dialog_action, DialogActionKind::Close);
        assert_eq!(out.intent_state, Some(IntentState::Fulfilled));
        assert!(out.reply_text.starts_with("🕐 *Horario de Atención:*"), "{}", out.reply_text);
    }

    #[test]
    fn at_adapter_13_apology_keeps_session_language() {
        let runtime = AdapterRuntime::new(AdapterConfig::mvp_v1()).unwrap();
        let mut attrs = SessionAttributes::new();
        attrs.insert(ATTR_DETECTED_LANGUAGE.to_string(), "pt".to_string());
        let out = runtime.apology(attrs);
        assert_eq!(out.intent_state, Some(IntentState::Failed));
        assert_eq!(out.detected_language.as_str(), "pt");
        assert!(out.reply_text.starts_with("Desculpe, ocorreu um erro inesperado"));
    }
}
