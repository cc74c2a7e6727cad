#![forbid(unsafe_code)]

//! Code-hook entry point: the channel already resolved the intent and only
//! asks the core to validate and answer it.

use cafe_engines::faq::topic_from_slots;
use cafe_kernel_contracts::dialog::{DialogAction, FulfillmentRequest, IntentState, TurnOutput};
use cafe_kernel_contracts::intent::{SourceService, FAQ_INTENT, ORDER_INTENT};

use crate::compose::DraftReply;
use crate::orchestrator::{
    reason_codes, session_id_or_default, session_language, DialogOrchestrator, Resolution,
    TurnContext,
};

impl DialogOrchestrator {
    pub fn fulfill(&self, request: &FulfillmentRequest) -> TurnOutput {
        let session_id = session_id_or_default(&request.session_id);
        let attrs = request.session_attributes.clone();
        let detected = session_language(&attrs);
        let lang = self.fixed_language(&detected);
        let intent_name = request.intent_name.trim();

        let resolution = match intent_name {
            ORDER_INTENT => {
                self.resolve_order(session_id, request.slots.clone(), &attrs, &detected)
            }
            FAQ_INTENT => {
                let topic = topic_from_slots(&request.slots);
                let answer = self.kb.lookup(&topic, lang);
                tracing::debug!(
                    session_id,
                    topic = %topic,
                    matched = answer.keyword.is_some(),
                    "faq lookup"
                );
                let draft = DraftReply::new(answer.text, lang);
                Resolution {
                    action: DialogAction::close(IntentState::Fulfilled, draft.text.clone()),
                    draft,
                    source: SourceService::Structured,
                    intent_name: FAQ_INTENT.to_string(),
                    slots: request.slots.clone(),
                    open_order: None,
                }
            }
            other => {
                tracing::warn!(
                    session_id,
                    intent = other,
                    reason_code = reason_codes::CAFE_UNSUPPORTED_INTENT.0,
                    "unsupported intent in fulfillment"
                );
                let name = if other.is_empty() { "Unknown" } else { other };
                self.failed(&detected, name, request.slots.clone())
            }
        };
        tracing::debug!(session_id, intent = intent_name, "fulfillment dispatched");

        self.finish(
            &TurnContext {
                session_id,
                raw_text: &request.input_transcript,
                operational_text: &request.input_transcript,
                detected: &detected,
            },
            attrs,
            resolution,
            true,
        )
    }
}

#[cfg(test)]
mod tests {
    use cafe_engines::slot_filling::{BEVERAGE_SLOT, QUANTITY_SLOT, SIZE_SLOT};
    use cafe_kernel_contracts::dialog::DialogActionKind;
    use cafe_kernel_contracts::intent::FAQ_TOPIC_SLOT;
    use cafe_kernel_contracts::session::{
        SessionAttributes, ATTR_ACTIVE_INTENT, ATTR_DETECTED_LANGUAGE, ATTR_LAST_SENTIMENT,
    };
    use cafe_kernel_contracts::slot::{SlotMap, SlotValue};

    use super::*;
    use crate::orchestrator::tests::{harness, StubLanguage};

    fn request(intent: &str, slots: SlotMap, lang: &str, transcript: &str) -> FulfillmentRequest {
        let mut attrs = SessionAttributes::new();
        attrs.insert(ATTR_DETECTED_LANGUAGE.to_string(), lang.to_string());
        FulfillmentRequest {
            intent_name: intent.to_string(),
            slots,
            session_attributes: attrs,
            input_transcript: transcript.to_string(),
            session_id: "s9".to_string(),
        }
    }

    fn slots(entries: &[(&str, &str)]) -> SlotMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), Some(SlotValue::interpreted(*v))))
            .collect()
    }

    fn h() -> crate::orchestrator::tests::Harness {
        harness(StubLanguage::detecting("es"), Ok(None), Ok("gen".to_string()))
    }

    #[test]
    fn at_fulfill_01_order_goes_through_slot_filling() {
        let h = h();
        let out = h.orchestrator.fulfill(&request(
            ORDER_INTENT,
            slots(&[(BEVERAGE_SLOT, "Espresso"), (SIZE_SLOT, "mediano")]),
            "es",
            "un espresso mediano",
        ));
        assert_eq!(out.dialog_action, DialogActionKind::ElicitSlot);
        assert_eq!(out.slot_to_elicit.as_deref(), Some(QUANTITY_SLOT));
        assert_eq!(out.reply_text, "Ok, un Espresso mediano. ¿Cuántos vas a querer?");
        assert_eq!(out.session_attributes[ATTR_ACTIVE_INTENT], ORDER_INTENT);
        assert_eq!(h.records.lock().unwrap()[0].intent, ORDER_INTENT);
    }

    #[test]
    fn at_fulfill_02_faq_answers_in_session_language() {
        let h = h();
        let mut s = SlotMap::new();
        s.insert(
            FAQ_TOPIC_SLOT.to_string(),
            Some(SlotValue::with_original("horario", "hours")),
        );
        let out = h
            .orchestrator
            .fulfill(&request(FAQ_INTENT, s, "en", "what are your hours"));
        assert_eq!(out.intent_state, Some(IntentState::Fulfilled));
        assert!(out.reply_text.starts_with("🕐 *Opening Hours:*"));
        assert!(h.translations.lock().unwrap().is_empty());
    }

    #[test]
    fn at_fulfill_03_faq_reply_is_personalized() {
        let h = h();
        let out = h.orchestrator.fulfill(&request(
            FAQ_INTENT,
            SlotMap::new(),
            "es",
            "gracias, ¿y el tema general?",
        ));
        assert!(out
            .reply_text
            .starts_with("¡Me alegra saber que estás contento! Lo siento, no tengo información"));
        assert_eq!(out.session_attributes[ATTR_LAST_SENTIMENT], "positive");
    }

    #[test]
    fn at_fulfill_04_unsupported_intent_closes_failed() {
        let h = h();
        let out = h
            .orchestrator
            .fulfill(&request("CancelarPedido", SlotMap::new(), "es", "cancela"));
        assert_eq!(out.dialog_action, DialogActionKind::Close);
        assert_eq!(out.intent_state, Some(IntentState::Failed));
        assert_eq!(
            out.reply_text,
            "Lo siento, ocurrió un error inesperado al procesar tu pedido. Por favor, intenta de nuevo."
        );
        assert_eq!(h.records.lock().unwrap()[0].intent, "CancelarPedido");
    }

    #[test]
    fn at_fulfill_05_complete_order_confirms() {
        let h = h();
        let out = h.orchestrator.fulfill(&request(
            ORDER_INTENT,
            slots(&[
                (BEVERAGE_SLOT, "Tinto"),
                (SIZE_SLOT, "pequeño"),
                (QUANTITY_SLOT, "1"),
            ]),
            "es",
            "uno",
        ));
        assert_eq!(
            out.reply_text,
            "¡Pedido confirmado! 1 Tinto de tamaño pequeño. ¡Estará listo en unos minutos!"
        );
    }
}
