#![forbid(unsafe_code)]

//! Blocking HTTP clients for the hosted language and generative services.

use std::time::Duration;

use cafe_kernel_contracts::language::LanguageCode;
use serde_json::{json, Value};

pub const DEFAULT_TIMEOUT_MS: u32 = 8_000;
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

const USER_AGENT: &str = "cafe-dialog/0.1";
const GENERATIVE_MAX_TOKENS: u32 = 300;
const GENERATIVE_TEMPERATURE: f64 = 0.7;
const GENERATIVE_TOP_P: f64 = 0.9;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("provider={provider} error=http_non_200 status={status}")]
    HttpStatus { provider: &'static str, status: u16 },
    #[error("provider={provider} error={kind}")]
    Transport {
        provider: &'static str,
        kind: &'static str,
    },
    #[error("provider={provider} error=invalid_response detail={detail}")]
    InvalidResponse {
        provider: &'static str,
        detail: &'static str,
    },
    #[error("translation {source_language}->{target_language} is not supported")]
    Unsupported {
        source_language: String,
        target_language: String,
    },
    #[error("provider config invalid: {0}")]
    Config(&'static str),
}

pub fn build_http_agent(timeout_ms: u32) -> Result<ureq::Agent, ProviderError> {
    if timeout_ms == 0 {
        return Err(ProviderError::Config("timeout must be > 0"));
    }
    let timeout = Duration::from_millis(u64::from(timeout_ms).max(100));
    Ok(ureq::AgentBuilder::new()
        .timeout_connect(timeout)
        .timeout_read(timeout)
        .timeout_write(timeout)
        .user_agent(USER_AGENT)
        .try_proxy_from_env(false)
        .build())
}

fn provider_error_from_ureq(provider: &'static str, err: ureq::Error) -> ProviderError {
    match err {
        ureq::Error::Status(status, _) => ProviderError::HttpStatus { provider, status },
        ureq::Error::Transport(transport) => {
            let combined = format!("{:?} {}", transport.kind(), transport);
            ProviderError::Transport {
                provider,
                kind: classify_transport_error_kind(&combined),
            }
        }
    }
}

fn classify_transport_error_kind(raw: &str) -> &'static str {
    let lower = raw.to_ascii_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        "timeout"
    } else if lower.contains("tls") || lower.contains("ssl") {
        "tls"
    } else if lower.contains("dns") {
        "dns"
    } else if lower.contains("connection") || lower.contains("connect") {
        "connection"
    } else {
        "transport"
    }
}

fn post_json(
    agent: &ureq::Agent,
    provider: &'static str,
    endpoint: &str,
    bearer: Option<&str>,
    payload: Value,
) -> Result<Value, ProviderError> {
    let mut request = agent
        .post(endpoint)
        .set("Content-Type", "application/json")
        .set("Accept", "application/json");
    if let Some(key) = bearer {
        request = request.set("Authorization", &format!("Bearer {key}"));
    }
    let response = request
        .send_json(payload)
        .map_err(|e| provider_error_from_ureq(provider, e))?;
    serde_json::from_reader(response.into_reader()).map_err(|_| ProviderError::InvalidResponse {
        provider,
        detail: "json_parse",
    })
}

fn join_endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

/// LibreTranslate-compatible `/detect` and `/translate`.
#[derive(Clone)]
pub struct HttpTranslateProvider {
    agent: ureq::Agent,
    base_url: String,
    api_key: Option<String>,
}

impl HttpTranslateProvider {
    const PROVIDER: &'static str = "translate";

    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout_ms: u32,
    ) -> Result<Self, ProviderError> {
        let base_url = base_url.into();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ProviderError::Config("translate url must be http(s)"));
        }
        Ok(Self {
            agent: build_http_agent(timeout_ms)?,
            base_url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn detect(&self, text: &str) -> Result<LanguageCode, ProviderError> {
        let mut payload = json!({ "q": text });
        self.attach_key(&mut payload);
        let response = post_json(
            &self.agent,
            Self::PROVIDER,
            &join_endpoint(&self.base_url, "detect"),
            None,
            payload,
        )?;
        parse_detect_response(&response)
    }

    pub fn translate(
        &self,
        text: &str,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> Result<String, ProviderError> {
        let mut payload = json!({
            "q": text,
            "source": source.as_str(),
            "target": target.as_str(),
            "format": "text",
        });
        self.attach_key(&mut payload);
        let response = post_json(
            &self.agent,
            Self::PROVIDER,
            &join_endpoint(&self.base_url, "translate"),
            None,
            payload,
        )?;
        parse_translate_response(&response)
    }

    fn attach_key(&self, payload: &mut Value) {
        if let (Some(key), Some(obj)) = (self.api_key.as_deref(), payload.as_object_mut()) {
            obj.insert("api_key".to_string(), Value::String(key.to_string()));
        }
    }
}

/// Highest-confidence entry of `[{"language": "en", "confidence": 90.0}, ...]`.
pub fn parse_detect_response(root: &Value) -> Result<LanguageCode, ProviderError> {
    let invalid = |detail| ProviderError::InvalidResponse {
        provider: HttpTranslateProvider::PROVIDER,
        detail,
    };
    let best = root
        .as_array()
        .ok_or_else(|| invalid("detect_not_array"))?
        .iter()
        .filter_map(|d| {
            let lang = d.get("language")?.as_str()?;
            let confidence = d.get("confidence").and_then(Value::as_f64).unwrap_or(0.0);
            Some((lang, confidence))
        })
        .fold(None::<(&str, f64)>, |best, cur| match best {
            Some(b) if b.1 >= cur.1 => Some(b),
            _ => Some(cur),
        })
        .ok_or_else(|| invalid("detect_empty"))?;
    LanguageCode::new(best.0).map_err(|_| invalid("detect_bad_code"))
}

pub fn parse_translate_response(root: &Value) -> Result<String, ProviderError> {
    root.get("translatedText")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(ProviderError::InvalidResponse {
            provider: HttpTranslateProvider::PROVIDER,
            detail: "missing_translated_text",
        })
}

#[derive(Clone)]
pub struct OpenAiGenerativeProvider {
    agent: ureq::Agent,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiGenerativeProvider {
    const PROVIDER: &'static str = "openai";

    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<String>,
        model: Option<String>,
        timeout_ms: u32,
    ) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::Config("openai api key must not be empty"));
        }
        let base_url = base_url.unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());
        Ok(Self {
            agent: build_http_agent(timeout_ms)?,
            endpoint: join_endpoint(&base_url, "chat/completions"),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
        })
    }

    pub fn generate(&self, text: &str) -> Result<String, ProviderError> {
        let response = post_json(
            &self.agent,
            Self::PROVIDER,
            &self.endpoint,
            Some(&self.api_key),
            chat_completion_payload(&self.model, text),
        )?;
        parse_chat_completion(&response)
    }
}

pub fn cafe_assistant_prompt(text: &str) -> String {
    format!(
        "Eres un asistente de una cafetería. Responde a la siguiente pregunta de un cliente de forma amable y concisa: '{text}'"
    )
}

pub fn chat_completion_payload(model: &str, text: &str) -> Value {
    json!({
        "model": model,
        "messages": [
            { "role": "user", "content": cafe_assistant_prompt(text) }
        ],
        "max_tokens": GENERATIVE_MAX_TOKENS,
        "temperature": GENERATIVE_TEMPERATURE,
        "top_p": GENERATIVE_TOP_P,
    })
}

pub fn parse_chat_completion(root: &Value) -> Result<String, ProviderError> {
    root.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(ProviderError::InvalidResponse {
            provider: OpenAiGenerativeProvider::PROVIDER,
            detail: "empty_completion",
        })
}
