#![forbid(unsafe_code)]

//! Local stand-ins for the language collaborators: keyword-scored detection
//! and a keyword glossary into Spanish.

use cafe_kernel_contracts::language::{LanguageCode, SupportedLanguage, DEFAULT_LANGUAGE};

use crate::lexicon;
use crate::providers::ProviderError;

const DETECT_ES: &[&str] = &[
    "hola", "precio", "horario", "ubicación", "contacto", "gracias", "por favor",
    "qué", "cómo", "dónde", "quiero", "pedido", "tamaño", "cuánto", "bebida",
];
const DETECT_EN: &[&str] = &[
    "hello", "hi", "price", "cost", "schedule", "hours", "location", "address", "contact",
    "thanks", "please", "what", "how", "where", "want", "order", "coffee",
];
const DETECT_PT: &[&str] = &[
    "olá", "oi", "preço", "custo", "horário", "hora", "localização", "endereço", "contato",
    "obrigado", "por favor", "qual", "como", "onde", "quero", "você",
];

pub fn detection_words(lang: SupportedLanguage) -> &'static [&'static str] {
    match lang {
        SupportedLanguage::Es => DETECT_ES,
        SupportedLanguage::En => DETECT_EN,
        SupportedLanguage::Pt => DETECT_PT,
    }
}

/// Single words match whole tokens; phrases match as substrings.
fn keyword_score(normalized: &str, words: &[&str]) -> usize {
    words
        .iter()
        .filter(|w| {
            if w.contains(' ') {
                lexicon::score_normalized(normalized, &[*w]) > 0
            } else {
                lexicon::contains_token(normalized, w)
            }
        })
        .count()
}

#[derive(Debug, Clone, Default)]
pub struct LexiconLanguageDetector;

impl LexiconLanguageDetector {
    pub fn new() -> Self {
        Self
    }

    /// Ties resolve in es, en, pt order; no hits at all means Spanish.
    pub fn detect(&self, text: &str) -> SupportedLanguage {
        let normalized = lexicon::normalize(text);
        let mut best = (DEFAULT_LANGUAGE, 0usize);
        for lang in SupportedLanguage::ALL {
            let s = keyword_score(&normalized, detection_words(lang));
            if s > best.1 {
                best = (lang, s);
            }
        }
        best.0
    }

    pub fn detect_code(&self, text: &str) -> LanguageCode {
        LanguageCode::from(self.detect(text))
    }
}

const GLOSSARY_EN: &[(&str, &str)] = &[
    ("price", "precio"),
    ("cost", "precio"),
    ("schedule", "horario"),
    ("hours", "horario"),
    ("location", "ubicacion"),
    ("address", "ubicacion"),
    ("contact", "contacto"),
    ("support", "contacto"),
    ("what", "qué"),
    ("how", "cómo"),
    ("where", "dónde"),
    ("when", "cuándo"),
    ("why", "por qué"),
    ("want", "quiero"),
    ("need", "necesito"),
    ("know", "saber"),
    ("information", "información"),
    ("about", "sobre"),
    ("order", "pedido"),
    ("coffee", "café"),
    ("small", "pequeño"),
    ("medium", "mediano"),
    ("large", "grande"),
];
const GLOSSARY_PT: &[(&str, &str)] = &[
    ("preço", "precio"),
    ("custo", "precio"),
    ("horário", "horario"),
    ("hora", "horario"),
    ("localização", "ubicacion"),
    ("endereço", "ubicacion"),
    ("contato", "contacto"),
    ("suporte", "contacto"),
    ("qual", "qué"),
    ("como", "cómo"),
    ("onde", "dónde"),
    ("quando", "cuándo"),
    ("porque", "por qué"),
    ("quero", "quiero"),
    ("preciso", "necesito"),
    ("saber", "saber"),
    ("informação", "información"),
    ("sobre", "sobre"),
    ("pedido", "pedido"),
    ("pequeno", "pequeño"),
    ("médio", "mediano"),
];

/// Word-for-word en/pt -> es keyword glossary. Enough for the keyword
/// recognizer to see Spanish trigger words; not a general translator.
#[derive(Debug, Clone, Default)]
pub struct GlossaryTranslator;

impl GlossaryTranslator {
    pub fn new() -> Self {
        Self
    }

    pub fn translate(
        &self,
        text: &str,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> Result<String, ProviderError> {
        let unsupported = || ProviderError::Unsupported {
            source_language: source.as_str().to_string(),
            target_language: target.as_str().to_string(),
        };
        if target.supported() != Some(SupportedLanguage::Es) {
            return Err(unsupported());
        }
        let glossary = match source.supported() {
            Some(SupportedLanguage::Es) => return Ok(text.to_string()),
            Some(SupportedLanguage::En) => GLOSSARY_EN,
            Some(SupportedLanguage::Pt) => GLOSSARY_PT,
            None => return Err(unsupported()),
        };
        Ok(replace_tokens(text, glossary))
    }
}

fn replace_tokens(text: &str, glossary: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut token = String::new();
    let flush = |token: &mut String, out: &mut String| {
        if token.is_empty() {
            return;
        }
        let key = lexicon::normalize(token);
        match glossary.iter().find(|(from, _)| lexicon::normalize(from) == key) {
            Some((_, to)) => out.push_str(to),
            None => out.push_str(token),
        }
        token.clear();
    };
    for c in text.chars() {
        if c.is_alphanumeric() {
            token.push(c);
        } else {
            flush(&mut token, &mut out);
            out.push(c);
        }
    }
    flush(&mut token, &mut out);
    out
}
