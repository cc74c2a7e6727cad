#![forbid(unsafe_code)]

use cafe_engines::slot_filling::{BEVERAGE_SLOT, QUANTITY_SLOT, SIZE_SLOT};
use cafe_kernel_contracts::language::SupportedLanguage;
use cafe_kernel_contracts::sentiment::SentimentLabel;
use cafe_kernel_contracts::slot::ResolvedSlots;

use crate::messages::{message, MessageKey};

/// A reply before personalization and translation, tagged with the
/// language it is written in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftReply {
    pub text: String,
    pub language: SupportedLanguage,
}

impl DraftReply {
    pub fn new(text: impl Into<String>, language: SupportedLanguage) -> Self {
        Self {
            text: text.into(),
            language,
        }
    }

    pub fn fixed(key: MessageKey, language: SupportedLanguage) -> Self {
        Self::new(message(key, language), language)
    }
}

/// First character upper-cased, the rest lower-cased.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// `None` when a resolved slot is missing or the quantity does not parse.
pub fn order_confirmation(resolved: &ResolvedSlots) -> Option<String> {
    let beverage = resolved.get(BEVERAGE_SLOT)?;
    let size = resolved.get(SIZE_SLOT)?;
    let quantity: u32 = resolved.get(QUANTITY_SLOT)?.trim().parse().ok()?;
    let beverage = if quantity > 1 {
        format!("{beverage}s")
    } else {
        beverage.to_string()
    };
    Some(format!(
        "¡Pedido confirmado! {quantity} {} de tamaño {size}. ¡Estará listo en unos minutos!",
        capitalize(&beverage)
    ))
}

pub fn personalize(draft: &DraftReply, sentiment: SentimentLabel) -> String {
    match sentiment {
        SentimentLabel::Positive => format!(
            "{}{}",
            message(MessageKey::PositivePreamble, draft.language),
            draft.text
        ),
        SentimentLabel::Negative => format!(
            "{}{}",
            draft.text,
            message(MessageKey::NegativeAppendix, draft.language)
        ),
        SentimentLabel::Neutral => draft.text.clone(),
    }
}
