#![forbid(unsafe_code)]

use cafe_engines::faq::{topic_from_slots, FaqKnowledgeBase};
use cafe_engines::router::{ConfidenceRouter, RouteDecision, RouterConfig};
use cafe_engines::sentiment::{SentimentConfig, SentimentRuntime};
use cafe_engines::slot_filling::{order_validator, SlotFillingValidator};
use cafe_kernel_contracts::dialog::{
    DialogAction, IntentState, Turn, TurnInput, TurnOutput, ValidationOutcome, DEFAULT_SESSION_ID,
};
use cafe_kernel_contracts::intent::{
    SourceService, StructuredIntent, FALLBACK_INTENT, FAQ_INTENT, ORDER_INTENT,
};
use cafe_kernel_contracts::interaction::InteractionRecord;
use cafe_kernel_contracts::language::{LanguageCode, SupportedLanguage, DEFAULT_LANGUAGE};
use cafe_kernel_contracts::sentiment::SentimentLabel;
use cafe_kernel_contracts::session::{
    clear_slot_attrs, slot_attr_key, SessionAttributes, ATTR_ACTIVE_INTENT,
    ATTR_DETECTED_LANGUAGE, ATTR_LAST_SENTIMENT,
};
use cafe_kernel_contracts::slot::{ResolvedSlots, SlotMap, SlotState, SlotValue};
use cafe_kernel_contracts::{ContractViolation, ReasonCodeId, Validate};

use crate::collaborators::{
    CollaboratorError, GenerativeService, IntentRecognizer, InteractionLogger, LanguageService,
    GENERATIVE_SERVICE,
};
use crate::compose::{order_confirmation, personalize, DraftReply};
use crate::messages::{message, MessageKey};

pub mod reason_codes {
    use cafe_kernel_contracts::ReasonCodeId;

    pub const CAFE_DETECT_LANGUAGE_FAILED: ReasonCodeId = ReasonCodeId(0xCAFE_0101);
    pub const CAFE_TRANSLATE_INPUT_FAILED: ReasonCodeId = ReasonCodeId(0xCAFE_0102);
    pub const CAFE_RESOLVE_INTENT_FAILED: ReasonCodeId = ReasonCodeId(0xCAFE_0103);
    pub const CAFE_GENERATE_FAILED: ReasonCodeId = ReasonCodeId(0xCAFE_0104);
    pub const CAFE_TRANSLATE_REPLY_FAILED: ReasonCodeId = ReasonCodeId(0xCAFE_0105);
    pub const CAFE_LOG_INTERACTION_FAILED: ReasonCodeId = ReasonCodeId(0xCAFE_0106);
    pub const CAFE_TURN_REJECTED: ReasonCodeId = ReasonCodeId(0xCAFE_01F1);
    pub const CAFE_ORDER_CONTRADICTION: ReasonCodeId = ReasonCodeId(0xCAFE_01F2);
    pub const CAFE_UNSUPPORTED_INTENT: ReasonCodeId = ReasonCodeId(0xCAFE_01F3);
}

/// The collaborator calls a turn can make, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollaboratorStep {
    DetectLanguage,
    TranslateInput,
    ResolveIntent,
    Generate,
    TranslateReply,
    LogInteraction,
}

impl CollaboratorStep {
    pub fn as_str(self) -> &'static str {
        match self {
            CollaboratorStep::DetectLanguage => "detect_language",
            CollaboratorStep::TranslateInput => "translate_input",
            CollaboratorStep::ResolveIntent => "resolve_intent",
            CollaboratorStep::Generate => "generate",
            CollaboratorStep::TranslateReply => "translate_reply",
            CollaboratorStep::LogInteraction => "log_interaction",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackRule {
    pub step: CollaboratorStep,
    pub fallback: &'static str,
    pub reason_code: ReasonCodeId,
}

/// What each collaborator failure degrades to. The turn always completes.
pub struct FallbackPolicy;

impl FallbackPolicy {
    pub const RULES: [FallbackRule; 6] = [
        FallbackRule {
            step: CollaboratorStep::DetectLanguage,
            fallback: "default language",
            reason_code: reason_codes::CAFE_DETECT_LANGUAGE_FAILED,
        },
        FallbackRule {
            step: CollaboratorStep::TranslateInput,
            fallback: "original text",
            reason_code: reason_codes::CAFE_TRANSLATE_INPUT_FAILED,
        },
        FallbackRule {
            step: CollaboratorStep::ResolveIntent,
            fallback: "no structured candidate",
            reason_code: reason_codes::CAFE_RESOLVE_INTENT_FAILED,
        },
        FallbackRule {
            step: CollaboratorStep::Generate,
            fallback: "generative apology",
            reason_code: reason_codes::CAFE_GENERATE_FAILED,
        },
        FallbackRule {
            step: CollaboratorStep::TranslateReply,
            fallback: "untranslated reply",
            reason_code: reason_codes::CAFE_TRANSLATE_REPLY_FAILED,
        },
        FallbackRule {
            step: CollaboratorStep::LogInteraction,
            fallback: "record dropped",
            reason_code: reason_codes::CAFE_LOG_INTERACTION_FAILED,
        },
    ];

    pub fn rule(step: CollaboratorStep) -> FallbackRule {
        match step {
            CollaboratorStep::DetectLanguage => Self::RULES[0],
            CollaboratorStep::TranslateInput => Self::RULES[1],
            CollaboratorStep::ResolveIntent => Self::RULES[2],
            CollaboratorStep::Generate => Self::RULES[3],
            CollaboratorStep::TranslateReply => Self::RULES[4],
            CollaboratorStep::LogInteraction => Self::RULES[5],
        }
    }

    pub fn recover<T>(
        step: CollaboratorStep,
        session_id: &str,
        result: Result<T, CollaboratorError>,
        fallback: impl FnOnce() -> T,
    ) -> T {
        match result {
            Ok(v) => v,
            Err(err) => {
                let rule = Self::rule(step);
                tracing::warn!(
                    session_id,
                    step = step.as_str(),
                    service = err.service(),
                    fallback = rule.fallback,
                    reason_code = rule.reason_code.0,
                    error = %err,
                    "collaborator failed"
                );
                fallback()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Language the recognizer, prompts and knowledge base operate in.
    pub operational_language: LanguageCode,
    /// Locale handed to the intent recognizer.
    pub operational_locale: String,
    pub router: RouterConfig,
    pub sentiment: SentimentConfig,
}

impl OrchestratorConfig {
    pub fn mvp_v1() -> Self {
        Self {
            operational_language: LanguageCode::from(DEFAULT_LANGUAGE),
            operational_locale: "es_ES".to_string(),
            router: RouterConfig::mvp_v1(),
            sentiment: SentimentConfig::mvp_v1(),
        }
    }
}

pub struct Collaborators {
    pub language: Box<dyn LanguageService>,
    pub intents: Box<dyn IntentRecognizer>,
    pub generative: Box<dyn GenerativeService>,
    pub logger: Box<dyn InteractionLogger>,
}

/// How a turn was resolved, before personalization, translation and
/// session bookkeeping.
pub(crate) struct Resolution {
    pub action: DialogAction,
    pub draft: DraftReply,
    pub source: SourceService,
    pub intent_name: String,
    pub slots: SlotMap,
    /// `Some` keeps the order open and carries these values to the next turn.
    pub open_order: Option<ResolvedSlots>,
}

/// Per-turn values shared by the chat and code-hook entry points.
pub(crate) struct TurnContext<'a> {
    pub session_id: &'a str,
    pub raw_text: &'a str,
    pub operational_text: &'a str,
    pub detected: &'a LanguageCode,
}

pub struct DialogOrchestrator {
    config: OrchestratorConfig,
    operational: SupportedLanguage,
    router: ConfidenceRouter,
    sentiment: SentimentRuntime,
    pub(crate) order: SlotFillingValidator,
    pub(crate) kb: FaqKnowledgeBase,
    collaborators: Collaborators,
}

impl DialogOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        collaborators: Collaborators,
    ) -> Result<Self, ContractViolation> {
        let operational =
            config
                .operational_language
                .supported()
                .ok_or(ContractViolation::InvalidValue {
                    field: "orchestrator_config.operational_language",
                    reason: "must be one of es, en, pt",
                })?;
        if config.operational_locale.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "orchestrator_config.operational_locale",
                reason: "must not be empty",
            });
        }
        if config.sentiment.max_text_chars == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "orchestrator_config.sentiment.max_text_chars",
                reason: "must be > 0",
            });
        }
        Ok(Self {
            router: ConfidenceRouter::new(config.router)?,
            sentiment: SentimentRuntime::new(config.sentiment),
            operational,
            config,
            order: order_validator(),
            kb: FaqKnowledgeBase::seeded(),
            collaborators,
        })
    }

    pub fn with_knowledge_base(mut self, kb: FaqKnowledgeBase) -> Self {
        self.kb = kb;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Terminal apology for a turn the caller could not complete. Calls no
    /// collaborator and hands the session attributes back untouched.
    pub fn apology(&self, session_attributes: SessionAttributes) -> TurnOutput {
        let detected = session_language(&session_attributes);
        let draft = DraftReply::fixed(MessageKey::GenericApology, self.fixed_language(&detected));
        TurnOutput::from_action(
            DialogAction::close(IntentState::Failed, draft.text.clone()),
            SlotMap::new(),
            draft.text,
            session_attributes,
            SourceService::Structured,
            detected,
        )
    }

    pub fn handle_turn(&self, input: &TurnInput) -> TurnOutput {
        let session_id = session_id_or_default(&input.session_id);
        let attrs = input.session_attributes.clone();
        let raw_text = input.raw_text.as_str();

        if raw_text.trim().is_empty() && input.structured_intent_candidate.is_none() {
            let detected = session_language(&attrs);
            let lang = self.fixed_language(&detected);
            tracing::debug!(session_id, "blank turn closed without collaborators");
            return self.finish(
                &TurnContext {
                    session_id,
                    raw_text,
                    operational_text: raw_text,
                    detected: &detected,
                },
                attrs,
                Resolution {
                    action: DialogAction::close(
                        IntentState::Failed,
                        message(MessageKey::EmptyMessage, lang),
                    ),
                    draft: DraftReply::fixed(MessageKey::EmptyMessage, lang),
                    source: SourceService::Structured,
                    intent_name: FALLBACK_INTENT.to_string(),
                    slots: SlotMap::new(),
                    open_order: None,
                },
                false,
            );
        }

        // 1. language normalization
        let detected = if raw_text.trim().is_empty() {
            session_language(&attrs)
        } else {
            FallbackPolicy::recover(
                CollaboratorStep::DetectLanguage,
                session_id,
                self.collaborators.language.detect_language(raw_text),
                default_language,
            )
        };
        let operational_text = if detected.same_language(&self.config.operational_language)
            || raw_text.trim().is_empty()
        {
            raw_text.to_string()
        } else {
            FallbackPolicy::recover(
                CollaboratorStep::TranslateInput,
                session_id,
                self.collaborators.language.translate(
                    raw_text,
                    &detected,
                    &self.config.operational_language,
                ),
                || raw_text.to_string(),
            )
        };
        let turn = match Turn::v1(
            raw_text.to_string(),
            session_id.to_string(),
            operational_text,
            detected,
        ) {
            Ok(t) => t,
            Err(violation) => return self.reject_turn(session_id, attrs, &violation),
        };
        let ctx = TurnContext {
            session_id,
            raw_text: &turn.raw_text,
            operational_text: &turn.operational_text,
            detected: &turn.detected_language,
        };

        // 2. structured candidate
        let candidate = match input.structured_intent_candidate.as_ref() {
            Some(c) => checked_candidate(session_id, c.clone()),
            None => FallbackPolicy::recover(
                CollaboratorStep::ResolveIntent,
                session_id,
                self.collaborators.intents.resolve_intent(
                    &turn.operational_text,
                    session_id,
                    &self.config.operational_locale,
                ),
                || None,
            )
            .and_then(|c| checked_candidate(session_id, c)),
        };

        // 3./4. order slot filling, else confidence routing
        let decision = self.router.decide(candidate.as_ref());
        let order_open = attrs
            .get(ATTR_ACTIVE_INTENT)
            .is_some_and(|v| v.trim() == ORDER_INTENT);
        let order_accepted =
            matches!(decision, RouteDecision::Accept(c) if c.is_named(ORDER_INTENT));
        let other_accepted =
            matches!(decision, RouteDecision::Accept(c) if !c.is_named(ORDER_INTENT));
        let resolution = if order_accepted || (order_open && !other_accepted) {
            let slots = candidate
                .as_ref()
                .filter(|c| c.is_named(ORDER_INTENT))
                .map(|c| c.slots.clone())
                .unwrap_or_default();
            self.resolve_order(session_id, slots, &attrs, &turn.detected_language)
        } else {
            self.resolve_routed(&ctx, decision)
        };

        self.finish(&ctx, attrs, resolution, true)
    }

    /// Slot filling for the order intent; shared with the code hook.
    pub(crate) fn resolve_order(
        &self,
        session_id: &str,
        mut slots: SlotMap,
        attrs: &SessionAttributes,
        detected: &LanguageCode,
    ) -> Resolution {
        merge_carried_slots(&mut slots, attrs, self.order.spec().slot_names());
        let outcome = self.order.validate_and_clear(&mut slots);
        match outcome {
            ValidationOutcome::Invalid {
                violated_slot,
                prompt,
            } => {
                tracing::debug!(session_id, slot = %violated_slot, "eliciting order slot");
                let open = self.order.resolved_prefix(&slots);
                Resolution {
                    action: DialogAction::ElicitSlot {
                        slot_to_elicit: violated_slot,
                        prompt: prompt.clone(),
                        slots: slots.clone(),
                    },
                    draft: DraftReply::new(prompt, self.operational),
                    source: SourceService::Structured,
                    intent_name: ORDER_INTENT.to_string(),
                    slots,
                    open_order: Some(open),
                }
            }
            ValidationOutcome::Valid(resolved) => match order_confirmation(&resolved) {
                Some(text) => {
                    tracing::debug!(session_id, "order complete");
                    Resolution {
                        action: DialogAction::close(IntentState::Fulfilled, text.clone()),
                        draft: DraftReply::new(text, self.operational),
                        source: SourceService::Structured,
                        intent_name: ORDER_INTENT.to_string(),
                        slots,
                        open_order: None,
                    }
                }
                None => {
                    tracing::warn!(
                        session_id,
                        reason_code = reason_codes::CAFE_ORDER_CONTRADICTION.0,
                        "validated order has no confirmation"
                    );
                    self.failed(detected, ORDER_INTENT, slots)
                }
            },
        }
    }

    fn resolve_routed(&self, ctx: &TurnContext<'_>, decision: RouteDecision<'_>) -> Resolution {
        match decision {
            RouteDecision::Accept(c) => {
                tracing::debug!(
                    session_id = ctx.session_id,
                    intent = %c.name,
                    confidence = c.confidence,
                    "structured candidate accepted"
                );
                let draft = match (self.known_faq_answer(c, ctx.detected), c.first_message()) {
                    (Some(answer), _) => answer,
                    (None, Some(m)) => DraftReply::new(m, self.operational),
                    (None, None) => DraftReply::fixed(
                        MessageKey::NotUnderstood,
                        self.fixed_language(ctx.detected),
                    ),
                };
                Resolution {
                    action: DialogAction::close(IntentState::Fulfilled, draft.text.clone()),
                    draft,
                    source: SourceService::Structured,
                    intent_name: c.name.trim().to_string(),
                    slots: c.slots.clone(),
                    open_order: None,
                }
            }
            RouteDecision::Escalate(reason) => {
                tracing::debug!(
                    session_id = ctx.session_id,
                    reason = reason.as_str(),
                    threshold = self.router.threshold(),
                    "escalating to generative service"
                );
                let result = match self.collaborators.generative.generate(ctx.operational_text) {
                    Ok(answer) if answer.trim().is_empty() => {
                        Err(CollaboratorError::InvalidResponse {
                            service: GENERATIVE_SERVICE,
                            detail: "empty answer".to_string(),
                        })
                    }
                    other => other,
                };
                let draft = FallbackPolicy::recover(
                    CollaboratorStep::Generate,
                    ctx.session_id,
                    result.map(|answer| DraftReply::new(answer, self.operational)),
                    || {
                        DraftReply::fixed(
                            MessageKey::GenerativeUnavailable,
                            self.fixed_language(ctx.detected),
                        )
                    },
                );
                Resolution {
                    action: DialogAction::close(IntentState::Fulfilled, draft.text.clone()),
                    draft,
                    source: SourceService::Generative,
                    intent_name: FALLBACK_INTENT.to_string(),
                    slots: SlotMap::new(),
                    open_order: None,
                }
            }
        }
    }

    /// FAQ candidates naming a known topic are answered from the knowledge
    /// base directly in the user's language.
    fn known_faq_answer(
        &self,
        candidate: &StructuredIntent,
        detected: &LanguageCode,
    ) -> Option<DraftReply> {
        if !candidate.is_named(FAQ_INTENT) {
            return None;
        }
        let lang = self.fixed_language(detected);
        let answer = self.kb.lookup(&topic_from_slots(&candidate.slots), lang);
        answer.keyword.map(|_| DraftReply::new(answer.text, lang))
    }

    pub(crate) fn failed(
        &self,
        detected: &LanguageCode,
        intent_name: &str,
        slots: SlotMap,
    ) -> Resolution {
        let draft = DraftReply::fixed(MessageKey::GenericApology, self.fixed_language(detected));
        Resolution {
            action: DialogAction::close(IntentState::Failed, draft.text.clone()),
            draft,
            source: SourceService::Structured,
            intent_name: intent_name.to_string(),
            slots,
            open_order: None,
        }
    }

    /// Fixed defaults go straight to the user's language when we have it.
    pub(crate) fn fixed_language(&self, detected: &LanguageCode) -> SupportedLanguage {
        detected.supported().unwrap_or(self.operational)
    }

    pub(crate) fn translate_reply(
        &self,
        session_id: &str,
        text: String,
        from: SupportedLanguage,
        to: &LanguageCode,
    ) -> String {
        let from = LanguageCode::from(from);
        if from.same_language(to) || text.trim().is_empty() {
            return text;
        }
        let result = self.collaborators.language.translate(&text, &from, to);
        FallbackPolicy::recover(CollaboratorStep::TranslateReply, session_id, result, || text)
    }

    /// Steps 5-8: sentiment, personalization, translation, session
    /// bookkeeping and logging.
    pub(crate) fn finish(
        &self,
        ctx: &TurnContext<'_>,
        mut attrs: SessionAttributes,
        resolution: Resolution,
        log: bool,
    ) -> TurnOutput {
        let sentiment = if ctx.raw_text.trim().is_empty() {
            SentimentLabel::Neutral
        } else {
            self.sentiment.analyze(ctx.raw_text, ctx.detected)
        };
        let personalized = personalize(&resolution.draft, sentiment);
        let reply = self.translate_reply(
            ctx.session_id,
            personalized,
            resolution.draft.language,
            ctx.detected,
        );

        attrs.insert(
            ATTR_DETECTED_LANGUAGE.to_string(),
            ctx.detected.as_str().to_string(),
        );
        attrs.insert(
            ATTR_LAST_SENTIMENT.to_string(),
            sentiment.as_str().to_string(),
        );
        clear_slot_attrs(&mut attrs);
        match &resolution.open_order {
            Some(carried) => {
                attrs.insert(ATTR_ACTIVE_INTENT.to_string(), ORDER_INTENT.to_string());
                for (name, value) in carried.iter() {
                    attrs.insert(slot_attr_key(name), value.to_string());
                }
            }
            None => {
                attrs.remove(ATTR_ACTIVE_INTENT);
            }
        }

        let output = TurnOutput::from_action(
            resolution.action,
            resolution.slots,
            reply,
            attrs,
            resolution.source,
            ctx.detected.clone(),
        );

        if log {
            self.log_interaction(ctx, &resolution.intent_name, sentiment, &output);
        }
        tracing::info!(
            session_id = ctx.session_id,
            source = output.source_service.as_str(),
            dialog_action = ?output.dialog_action,
            intent = %resolution.intent_name,
            detected_language = ctx.detected.as_str(),
            sentiment = sentiment.as_str(),
            "turn handled"
        );
        output
    }

    fn log_interaction(
        &self,
        ctx: &TurnContext<'_>,
        intent_name: &str,
        sentiment: SentimentLabel,
        output: &TurnOutput,
    ) {
        let record = InteractionRecord {
            interaction_id: uuid::Uuid::new_v4().to_string(),
            session_id: ctx.session_id.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            user_input: ctx.raw_text.to_string(),
            detected_language: ctx.detected.clone(),
            translated_input: ctx.operational_text.to_string(),
            intent: if intent_name.trim().is_empty() {
                FALLBACK_INTENT.to_string()
            } else {
                intent_name.to_string()
            },
            slots: output.slots.clone(),
            response_text: output.reply_text.clone(),
            source_service: output.source_service,
            sentiment,
            is_fallback: output.source_service == SourceService::Generative,
        };
        let result = self.collaborators.logger.log_interaction(&record);
        FallbackPolicy::recover(
            CollaboratorStep::LogInteraction,
            ctx.session_id,
            result,
            || (),
        );
    }

    fn reject_turn(
        &self,
        session_id: &str,
        attrs: SessionAttributes,
        violation: &ContractViolation,
    ) -> TurnOutput {
        tracing::warn!(
            session_id,
            reason_code = reason_codes::CAFE_TURN_REJECTED.0,
            %violation,
            "turn rejected"
        );
        let detected = session_language(&attrs);
        let resolution = self.failed(&detected, FALLBACK_INTENT, SlotMap::new());
        self.finish(
            &TurnContext {
                session_id,
                raw_text: "",
                operational_text: "",
                detected: &detected,
            },
            attrs,
            resolution,
            false,
        )
    }
}

pub(crate) fn session_id_or_default(session_id: &str) -> &str {
    let trimmed = session_id.trim();
    if trimmed.is_empty() {
        DEFAULT_SESSION_ID
    } else {
        trimmed
    }
}

fn default_language() -> LanguageCode {
    LanguageCode::from(DEFAULT_LANGUAGE)
}

/// Language recorded by an earlier turn, else the default.
pub(crate) fn session_language(attrs: &SessionAttributes) -> LanguageCode {
    attrs
        .get(ATTR_DETECTED_LANGUAGE)
        .and_then(|c| LanguageCode::new(c.as_str()).ok())
        .unwrap_or_else(default_language)
}

/// Malformed candidates are treated as absent.
fn checked_candidate(session_id: &str, candidate: StructuredIntent) -> Option<StructuredIntent> {
    match candidate.validate() {
        Ok(()) => Some(candidate),
        Err(violation) => {
            tracing::debug!(session_id, %violation, "structured candidate dropped");
            None
        }
    }
}

/// Values carried from earlier turns fill only slots this turn left absent.
pub(crate) fn merge_carried_slots<'a>(
    slots: &mut SlotMap,
    attrs: &SessionAttributes,
    names: impl Iterator<Item = &'a str>,
) {
    for name in names {
        if !SlotState::of(slots, name).is_absent() {
            continue;
        }
        if let Some(v) = attrs
            .get(&slot_attr_key(name))
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
        {
            slots.insert(name.to_string(), Some(SlotValue::interpreted(v)));
        }
    }
}
