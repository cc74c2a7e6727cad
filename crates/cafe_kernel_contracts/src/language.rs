#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::ContractViolation;

/// Language the lexicons and message tables fall back to.
pub const DEFAULT_LANGUAGE: SupportedLanguage = SupportedLanguage::Es;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportedLanguage {
    Es,
    En,
    Pt,
}

impl SupportedLanguage {
    pub const ALL: [SupportedLanguage; 3] = [
        SupportedLanguage::Es,
        SupportedLanguage::En,
        SupportedLanguage::Pt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SupportedLanguage::Es => "es",
            SupportedLanguage::En => "en",
            SupportedLanguage::Pt => "pt",
        }
    }

    /// Matches on the primary subtag, so `pt-BR` and `es_ES` resolve too.
    pub fn from_code(code: &str) -> Option<Self> {
        let primary = code
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match primary.as_str() {
            "es" => Some(SupportedLanguage::Es),
            "en" => Some(SupportedLanguage::En),
            "pt" => Some(SupportedLanguage::Pt),
            _ => None,
        }
    }

    pub fn resolve_or_default(code: &str) -> Self {
        Self::from_code(code).unwrap_or(DEFAULT_LANGUAGE)
    }
}

/// A language code as reported by a detector (not necessarily one we have lexicons for).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageCode(String);

impl LanguageCode {
    pub fn new(code: impl Into<String>) -> Result<Self, ContractViolation> {
        let code = code.into().trim().to_ascii_lowercase();
        if code.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "language_code",
                reason: "must not be empty",
            });
        }
        if code.len() > 16 {
            return Err(ContractViolation::InvalidValue {
                field: "language_code",
                reason: "must be <= 16 chars",
            });
        }
        if !code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ContractViolation::InvalidValue {
                field: "language_code",
                reason: "must contain only ASCII alphanumeric, hyphen or underscore",
            });
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn supported(&self) -> Option<SupportedLanguage> {
        SupportedLanguage::from_code(&self.0)
    }

    /// Lexicon/message-table language for this code.
    pub fn resolve_or_default(&self) -> SupportedLanguage {
        SupportedLanguage::resolve_or_default(&self.0)
    }

    pub fn same_language(&self, other: &LanguageCode) -> bool {
        match (self.supported(), other.supported()) {
            (Some(a), Some(b)) => a == b,
            _ => self.0 == other.0,
        }
    }
}

impl From<SupportedLanguage> for LanguageCode {
    fn from(v: SupportedLanguage) -> Self {
        LanguageCode(v.as_str().to_string())
    }
}

impl TryFrom<String> for LanguageCode {
    type Error = String;

    fn try_from(v: String) -> Result<Self, Self::Error> {
        LanguageCode::new(v).map_err(|e| e.to_string())
    }
}

impl From<LanguageCode> for String {
    fn from(v: LanguageCode) -> Self {
        v.0
    }
}

impl std::fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
