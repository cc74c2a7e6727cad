#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use cafe_kernel_contracts::intent::FAQ_TOPIC_SLOT;
use cafe_kernel_contracts::language::SupportedLanguage;
use cafe_kernel_contracts::slot::SlotMap;
use cafe_kernel_contracts::ContractViolation;

use crate::lexicon;

pub const GENERAL_TOPIC: &str = "general";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalizedText {
    pub es: String,
    pub en: String,
    pub pt: String,
}

impl LocalizedText {
    pub fn new(es: &str, en: &str, pt: &str) -> Self {
        Self {
            es: es.to_string(),
            en: en.to_string(),
            pt: pt.to_string(),
        }
    }

    /// Falls back to Spanish when a translation is blank.
    pub fn get(&self, lang: SupportedLanguage) -> &str {
        let text = match lang {
            SupportedLanguage::Es => &self.es,
            SupportedLanguage::En => &self.en,
            SupportedLanguage::Pt => &self.pt,
        };
        if text.trim().is_empty() {
            &self.es
        } else {
            text
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaqEntry {
    pub keyword: String,
    /// Synonyms in any supported language. Matched exactly for topic
    /// lookup and as substrings for free-text classification.
    pub variations: Vec<String>,
    pub answer: LocalizedText,
}

impl FaqEntry {
    pub fn new(keyword: &str, variations: &[&str], answer: LocalizedText) -> Self {
        Self {
            keyword: keyword.to_string(),
            variations: variations.iter().map(|v| v.to_string()).collect(),
            answer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaqAnswer<'a> {
    /// `None` when the localized "no information" default was used.
    pub keyword: Option<&'a str>,
    pub text: &'a str,
}

#[derive(Debug, Clone)]
pub struct FaqKnowledgeBase {
    entries: Vec<FaqEntry>,
    unknown_topic: LocalizedText,
}

impl FaqKnowledgeBase {
    pub fn new(entries: Vec<FaqEntry>, unknown_topic: LocalizedText) -> Result<Self, ContractViolation> {
        let mut seen = BTreeSet::new();
        for e in &entries {
            let k = lexicon::normalize(e.keyword.trim());
            if k.is_empty() {
                return Err(ContractViolation::InvalidValue {
                    field: "faq_entry.keyword",
                    reason: "must not be empty",
                });
            }
            if !seen.insert(k) {
                return Err(ContractViolation::InvalidValue {
                    field: "faq_entry.keyword",
                    reason: "must be unique",
                });
            }
            if e.answer.es.trim().is_empty() {
                return Err(ContractViolation::InvalidValue {
                    field: "faq_entry.answer.es",
                    reason: "must not be empty",
                });
            }
        }
        Ok(Self {
            entries,
            unknown_topic,
        })
    }

    pub fn seeded() -> Self {
        Self {
            entries: seeded_entries(),
            unknown_topic: LocalizedText::new(
                "Lo siento, no tengo información sobre ese tema. ¿Puedes intentar con \"precio\", \"horario\" o \"ubicación\"?",
                "I'm sorry, I don't have information about that topic. Can you try with 'price', 'schedule' or 'location'?",
                "Desculpe, não tenho informações sobre esse tópico. Pode tentar com \"preço\", \"horário\" ou \"localização\"?",
            ),
        }
    }

    pub fn entries(&self) -> &[FaqEntry] {
        &self.entries
    }

    /// Exact keyword first, then variations, then the unknown-topic default.
    pub fn lookup(&self, topic: &str, lang: SupportedLanguage) -> FaqAnswer<'_> {
        let topic = lexicon::normalize(topic.trim());
        let by_keyword = self
            .entries
            .iter()
            .find(|e| lexicon::normalize(&e.keyword) == topic);
        let entry = by_keyword.or_else(|| {
            self.entries.iter().find(|e| {
                e.variations
                    .iter()
                    .any(|v| lexicon::normalize(v) == topic)
            })
        });
        match entry {
            Some(e) => FaqAnswer {
                keyword: Some(e.keyword.as_str()),
                text: e.answer.get(lang),
            },
            None => FaqAnswer {
                keyword: None,
                text: self.unknown_topic.get(lang),
            },
        }
    }

    /// First entry (declaration order) whose keyword or a variation occurs in `text`.
    pub fn classify_topic(&self, text: &str) -> Option<&str> {
        let normalized = lexicon::normalize(text);
        self.entries
            .iter()
            .find(|e| {
                let mut words: Vec<&str> = vec![e.keyword.as_str()];
                words.extend(e.variations.iter().map(String::as_str));
                lexicon::score_normalized(&normalized, &words) > 0
            })
            .map(|e| e.keyword.as_str())
    }
}

/// Topic slot as a lookup key: interpreted value, then original value, then `general`.
pub fn topic_from_slots(slots: &SlotMap) -> String {
    slots
        .get(FAQ_TOPIC_SLOT)
        .and_then(Option::as_ref)
        .and_then(|v| {
            [v.interpreted_value.as_deref(), v.original_value.as_deref()]
                .into_iter()
                .flatten()
                .map(str::trim)
                .find(|s| !s.is_empty())
        })
        .unwrap_or(GENERAL_TOPIC)
        .trim()
        .to_lowercase()
}

fn seeded_entries() -> Vec<FaqEntry> {
    vec![
        FaqEntry::new(
            "precio",
            &["precios", "price", "prices", "cost", "preço", "preços", "custo", "cuánto cuesta"],
            LocalizedText::new(
                "💰 *Precios:*\n• Espresso: $2.00\n• Americano o Tinto: $2.50\n• Cappuccino o Latte: $3.50\n• Tamaño grande: +$0.75\n\n¿Te gustaría hacer un pedido?",
                "💰 *Prices:*\n• Espresso: $2.00\n• Americano or Tinto: $2.50\n• Cappuccino or Latte: $3.50\n• Large size: +$0.75\n\nWould you like to place an order?",
                "💰 *Preços:*\n• Espresso: $2.00\n• Americano ou Tinto: $2.50\n• Cappuccino ou Latte: $3.50\n• Tamanho grande: +$0.75\n\nGostaria de fazer um pedido?",
            ),
        ),
        FaqEntry::new(
            "horario",
            &["horarios", "schedule", "hours", "opening", "horário", "horários", "que horas"],
            LocalizedText::new(
                "🕐 *Horario de Atención:*\n• Lunes a Viernes: 7:00 AM - 8:00 PM\n• Sábados: 8:00 AM - 2:00 PM\n• Domingos: cerrado\n\n¿Necesitas información específica sobre algún horario?",
                "🕐 *Opening Hours:*\n• Monday to Friday: 7:00 AM - 8:00 PM\n• Saturdays: 8:00 AM - 2:00 PM\n• Sundays: closed\n\nDo you need specific information about any schedule?",
                "🕐 *Horário de Atendimento:*\n• Segunda a Sexta: 7:00 às 20:00\n• Sábados: 8:00 às 14:00\n• Domingos: fechado\n\nPrecisa de informações específicas sobre algum horário?",
            ),
        ),
        FaqEntry::new(
            "ubicacion",
            &["ubicación", "dirección", "direccion", "dónde están", "location", "address", "localização", "endereço"],
            LocalizedText::new(
                "📍 *Ubicación:*\n• Dirección: Av. Principal 123, Ciudad\n• A dos cuadras de la estación central\n\n¿Necesitas direcciones específicas o información de transporte?",
                "📍 *Location:*\n• Address: Main Ave 123, City\n• Two blocks from the central station\n\nDo you need specific directions or transportation information?",
                "📍 *Localização:*\n• Endereço: Av. Principal 123, Cidade\n• A duas quadras da estação central\n\nPrecisa de direções específicas ou informações de transporte?",
            ),
        ),
        FaqEntry::new(
            "contacto",
            &["teléfono", "telefono", "correo", "contact", "phone", "email", "support", "contato", "telefone", "suporte"],
            LocalizedText::new(
                "📞 *Contacto:*\n• Teléfono: +1-234-567-8900\n• Email: hola@cafeteria.example\n• Redes sociales: @CafeteriaBot\n\n¿Por cuál medio prefieres contactarnos?",
                "📞 *Contact:*\n• Phone: +1-234-567-8900\n• Email: hola@cafeteria.example\n• Social media: @CafeteriaBot\n\nWhich contact method do you prefer?",
                "📞 *Contato:*\n• Telefone: +1-234-567-8900\n• Email: hola@cafeteria.example\n• Redes sociais: @CafeteriaBot\n\nPor qual meio prefere nos contactar?",
            ),
        ),
        FaqEntry::new(
            "saludo",
            &["hola", "buenos días", "buenas tardes", "hello", "good morning", "olá", "bom dia", "boa tarde"],
            LocalizedText::new(
                "¡Hola! ¿En qué puedo ayudarte? Puedes preguntar sobre precios, horarios, ubicación o contacto.",
                "Hello! How can I help you? You can ask about prices, schedules, location or contact.",
                "Olá! Como posso ajudá-lo? Pode perguntar sobre preços, horários, localização ou contato.",
            ),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use cafe_kernel_contracts::slot::SlotValue;

    #[test]
    fn at_faq_01_lookup_by_keyword_then_variation() {
        let kb = FaqKnowledgeBase::seeded();
        let a = kb.lookup("precio", SupportedLanguage::En);
        assert_eq!(a.keyword, Some("precio"));
        assert!(a.text.starts_with("💰 *Prices:*"));
        let b = kb.lookup(" Horários ", SupportedLanguage::Pt);
        assert_eq!(b.keyword, Some("horario"));
        assert!(b.text.contains("Horário de Atendimento"));
    }

    #[test]
    fn at_faq_02_unknown_topic_uses_localized_default() {
        let kb = FaqKnowledgeBase::seeded();
        let a = kb.lookup("wifi", SupportedLanguage::Es);
        assert_eq!(a.keyword, None);
        assert_eq!(
            a.text,
            "Lo siento, no tengo información sobre ese tema. ¿Puedes intentar con \"precio\", \"horario\" o \"ubicación\"?"
        );
        assert!(kb
            .lookup("general", SupportedLanguage::En)
            .text
            .starts_with("I'm sorry"));
    }

    #[test]
    fn at_faq_03_classify_topic_in_declaration_order() {
        let kb = FaqKnowledgeBase::seeded();
        assert_eq!(kb.classify_topic("What are your opening hours?"), Some("horario"));
        assert_eq!(kb.classify_topic("Hola, ¿cuál es el precio?"), Some("precio"));
        assert_eq!(kb.classify_topic("Qual é o endereço?"), Some("ubicacion"));
        assert_eq!(kb.classify_topic("quiero un latte"), None);
    }

    #[test]
    fn at_faq_04_topic_from_slots_prefers_interpreted_value() {
        let mut slots = SlotMap::new();
        assert_eq!(topic_from_slots(&slots), "general");
        slots.insert(
            FAQ_TOPIC_SLOT.to_string(),
            Some(SlotValue::unrecognized(" Horario ")),
        );
        assert_eq!(topic_from_slots(&slots), "horario");
        slots.insert(
            FAQ_TOPIC_SLOT.to_string(),
            Some(SlotValue::with_original("Precio", "cuánto cuesta")),
        );
        assert_eq!(topic_from_slots(&slots), "precio");
    }

    #[test]
    fn at_faq_05_knowledge_base_refuses_duplicate_keywords() {
        let answer = LocalizedText::new("a", "", "");
        let dup = vec![
            FaqEntry::new("precio", &[], answer.clone()),
            FaqEntry::new("Precio", &[], answer.clone()),
        ];
        assert!(FaqKnowledgeBase::new(dup, answer.clone()).is_err());
        let kb = FaqKnowledgeBase::new(vec![FaqEntry::new("precio", &[], answer.clone())], answer)
            .unwrap();
        assert_eq!(kb.lookup("precio", SupportedLanguage::Pt).text, "a");
    }
}
