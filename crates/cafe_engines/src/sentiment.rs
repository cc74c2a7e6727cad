#![forbid(unsafe_code)]

use cafe_kernel_contracts::language::{LanguageCode, SupportedLanguage};
use cafe_kernel_contracts::sentiment::SentimentLabel;
use cafe_kernel_contracts::ContractViolation;

use crate::lexicon;

const POSITIVE_ES: &[&str] = &[
    "excelente",
    "bueno",
    "genial",
    "perfecto",
    "gracias",
    "ayuda",
    "útil",
    "fantástico",
    "maravilloso",
    "agradecido",
];
const NEGATIVE_ES: &[&str] = &[
    "malo",
    "horrible",
    "terrible",
    "pésimo",
    "odio",
    "frustrado",
    "enojado",
    "molesto",
    "insatisfecho",
    "decepcionado",
];
const POSITIVE_EN: &[&str] = &[
    "excellent",
    "good",
    "great",
    "perfect",
    "thanks",
    "helpful",
    "awesome",
    "fantastic",
    "wonderful",
    "thank you",
];
const NEGATIVE_EN: &[&str] = &[
    "bad",
    "horrible",
    "terrible",
    "awful",
    "hate",
    "frustrated",
    "angry",
    "upset",
    "dissatisfied",
    "disappointed",
];
const POSITIVE_PT: &[&str] = &[
    "excelente",
    "bom",
    "ótimo",
    "perfeito",
    "obrigado",
    "útil",
    "maravilhoso",
    "fantástico",
    "agradecido",
];
const NEGATIVE_PT: &[&str] = &[
    "ruim",
    "horrível",
    "terrível",
    "péssimo",
    "ódio",
    "frustrado",
    "nervoso",
    "chateado",
    "insatisfeito",
    "decepcionado",
];

pub fn positive_words(lang: SupportedLanguage) -> &'static [&'static str] {
    match lang {
        SupportedLanguage::Es => POSITIVE_ES,
        SupportedLanguage::En => POSITIVE_EN,
        SupportedLanguage::Pt => POSITIVE_PT,
    }
}

pub fn negative_words(lang: SupportedLanguage) -> &'static [&'static str] {
    match lang {
        SupportedLanguage::Es => NEGATIVE_ES,
        SupportedLanguage::En => NEGATIVE_EN,
        SupportedLanguage::Pt => NEGATIVE_PT,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentimentConfig {
    pub max_text_chars: usize,
}

impl SentimentConfig {
    pub fn mvp_v1() -> Self {
        Self {
            max_text_chars: 8192,
        }
    }
}

/// Best-effort sentiment: a failure is `Neutral`, never an error.
#[derive(Debug, Clone)]
pub struct SentimentRuntime {
    config: SentimentConfig,
}

impl SentimentRuntime {
    pub fn new(config: SentimentConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, text: &str, lang: &LanguageCode) -> SentimentLabel {
        match self.score(text, lang.resolve_or_default()) {
            Ok(s) => SentimentLabel::from_score(s),
            Err(violation) => {
                tracing::debug!(%violation, "sentiment scoring skipped");
                SentimentLabel::Neutral
            }
        }
    }

    pub fn score(&self, text: &str, lang: SupportedLanguage) -> Result<i32, ContractViolation> {
        if text.chars().count() > self.config.max_text_chars {
            return Err(ContractViolation::InvalidValue {
                field: "sentiment.text",
                reason: "exceeds max length",
            });
        }
        if text.chars().any(|c| c.is_control() && !c.is_whitespace()) {
            return Err(ContractViolation::InvalidValue {
                field: "sentiment.text",
                reason: "must not contain control characters",
            });
        }
        let normalized = lexicon::normalize(text);
        let positive = lexicon::score_normalized(&normalized, positive_words(lang));
        let negative = lexicon::score_normalized(&normalized, negative_words(lang));
        Ok(positive as i32 - negative as i32)
    }
}
