#![forbid(unsafe_code)]

use cafe_kernel_contracts::intent::{StructuredIntent, FAQ_INTENT, FAQ_TOPIC_SLOT, ORDER_INTENT};
use cafe_kernel_contracts::language::SupportedLanguage;
use cafe_kernel_contracts::slot::{SlotMap, SlotValue};

use crate::faq::FaqKnowledgeBase;
use crate::lexicon;
use crate::slot_filling::{number_word, order_intent_spec, SlotFillingSpec, SlotRule, QUANTITY_SLOT};

pub const ORDER_CONFIDENCE: f64 = 0.9;
pub const FAQ_CONFIDENCE: f64 = 0.85;
pub const ORDER_FRAGMENT_CONFIDENCE: f64 = 0.7;

/// Always mean an order.
const ORDER_VERBS: &[&str] = &[
    "pedir", "pedido", "ordenar", "dame", "me das", "me da", "order", "encomendar",
];

/// Plain wanting ("quiero saber...") is an order only without an FAQ topic or
/// with order values in the text.
const DESIRE_VERBS: &[&str] = &[
    "quiero", "quisiera", "i want", "i'd like", "quero", "gostaria",
];

/// Articles that double as number words; never read them as a quantity.
const ARTICLES: &[&str] = &["un", "una", "um", "uma"];

/// Deterministic keyword recognizer for the cafe intents.
#[derive(Debug, Clone)]
pub struct KeywordIntentRecognizer {
    order: SlotFillingSpec,
    kb: FaqKnowledgeBase,
}

impl Default for KeywordIntentRecognizer {
    fn default() -> Self {
        Self::new(FaqKnowledgeBase::seeded())
    }
}

impl KeywordIntentRecognizer {
    pub fn new(kb: FaqKnowledgeBase) -> Self {
        Self {
            order: order_intent_spec(),
            kb,
        }
    }

    /// `locale` picks the language of FAQ answers.
    pub fn recognize(
        &self,
        text: &str,
        session_id: &str,
        locale: &str,
    ) -> Option<StructuredIntent> {
        if text.trim().is_empty() {
            return None;
        }
        let slots = self.extract_order_slots(text);
        let topic = self.kb.classify_topic(text);
        let wants = lexicon::contains_any(text, DESIRE_VERBS);
        let ordering = lexicon::contains_any(text, ORDER_VERBS)
            || (wants && (topic.is_none() || !slots.is_empty()));
        let intent = if ordering {
            order_intent(ORDER_CONFIDENCE, slots)
        } else if let Some(topic) = topic {
            let lang = SupportedLanguage::resolve_or_default(locale);
            let answer = self.kb.lookup(topic, lang).text.to_string();
            let mut faq_slots = SlotMap::new();
            faq_slots.insert(FAQ_TOPIC_SLOT.to_string(), Some(SlotValue::interpreted(topic)));
            StructuredIntent {
                name: FAQ_INTENT.to_string(),
                confidence: FAQ_CONFIDENCE,
                slots: faq_slots,
                messages: vec![answer],
            }
        } else if !slots.is_empty() {
            order_intent(ORDER_FRAGMENT_CONFIDENCE, slots)
        } else {
            tracing::debug!(session_id, "no keyword intent");
            return None;
        };
        tracing::debug!(
            session_id,
            intent = %intent.name,
            confidence = intent.confidence,
            slots = intent.slots.len(),
            "keyword intent recognized"
        );
        Some(intent)
    }

    fn extract_order_slots(&self, text: &str) -> SlotMap {
        let mut slots = SlotMap::new();
        for spec in self.order.slots() {
            let found = match (&spec.rule, spec.name.as_str()) {
                (SlotRule::OneOf(options), _) => options.iter().find_map(|o| {
                    std::iter::once(&o.canonical)
                        .chain(o.aliases.iter())
                        .find(|w| mentions(text, w))
                        .map(|w| SlotValue::with_original(o.canonical.clone(), w.clone()))
                }),
                (SlotRule::IntegerRange { .. }, QUANTITY_SLOT) => quantity_token(text),
                _ => None,
            };
            if let Some(v) = found {
                slots.insert(spec.name.clone(), Some(v));
            }
        }
        slots
    }
}

fn order_intent(confidence: f64, slots: SlotMap) -> StructuredIntent {
    StructuredIntent {
        name: ORDER_INTENT.to_string(),
        confidence,
        slots,
        messages: Vec::new(),
    }
}

fn mentions(text: &str, word: &str) -> bool {
    if word.contains(' ') {
        lexicon::contains_any(text, &[word])
    } else {
        lexicon::contains_token(text, word)
    }
}

fn quantity_token(text: &str) -> Option<SlotValue> {
    let normalized = lexicon::normalize(text);
    normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty() && !ARTICLES.contains(t))
        .find(|t| t.chars().all(|c| c.is_ascii_digit()) || number_word(t).is_some())
        .map(|t| match number_word(t) {
            Some(n) => SlotValue::with_original(n.to_string(), t),
            None => SlotValue::interpreted(t),
        })
}
