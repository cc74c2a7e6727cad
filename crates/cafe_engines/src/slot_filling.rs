#![forbid(unsafe_code)]

//! Declarative slot filling. The validator holds no conversation state: the
//! slot map is the state, and every call re-derives the current slot from it.

use std::collections::BTreeSet;

use cafe_kernel_contracts::dialog::ValidationOutcome;
use cafe_kernel_contracts::intent::ORDER_INTENT;
use cafe_kernel_contracts::slot::{ResolvedSlots, SlotMap, SlotState};
use cafe_kernel_contracts::ContractViolation;

use crate::lexicon;

pub const BEVERAGE_SLOT: &str = "TiposDeBebida";
pub const SIZE_SLOT: &str = "Tamao";
pub const QUANTITY_SLOT: &str = "Cantidad";

pub const MIN_QUANTITY: i64 = 1;
pub const MAX_QUANTITY: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedValue {
    pub canonical: String,
    pub aliases: Vec<String>,
}

impl AllowedValue {
    pub fn new(canonical: &str, aliases: &[&str]) -> Self {
        Self {
            canonical: canonical.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn matches(&self, normalized: &str) -> bool {
        lexicon::normalize(&self.canonical) == normalized
            || self
                .aliases
                .iter()
                .any(|a| lexicon::normalize(a) == normalized)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotRule {
    OneOf(Vec<AllowedValue>),
    /// Inclusive. Accepts digits and the number words one..ten in es/en/pt.
    IntegerRange { min: i64, max: i64 },
}

impl SlotRule {
    /// Canonical form of `value`, or `None` when the rule rejects it.
    pub fn resolve(&self, value: &str) -> Option<String> {
        let normalized = lexicon::normalize(value.trim());
        match self {
            SlotRule::OneOf(options) => options
                .iter()
                .find(|o| o.matches(&normalized))
                .map(|o| o.canonical.clone()),
            SlotRule::IntegerRange { min, max } => {
                let n = normalized
                    .parse::<i64>()
                    .ok()
                    .or_else(|| number_word(&normalized))?;
                (*min..=*max).contains(&n).then(|| n.to_string())
            }
        }
    }
}

const NUMBER_WORDS: &[(&str, i64)] = &[
    ("uno", 1),
    ("una", 1),
    ("un", 1),
    ("one", 1),
    ("um", 1),
    ("uma", 1),
    ("dos", 2),
    ("two", 2),
    ("dois", 2),
    ("duas", 2),
    ("tres", 3),
    ("três", 3),
    ("three", 3),
    ("cuatro", 4),
    ("four", 4),
    ("quatro", 4),
    ("cinco", 5),
    ("five", 5),
    ("seis", 6),
    ("six", 6),
    ("siete", 7),
    ("seven", 7),
    ("sete", 7),
    ("ocho", 8),
    ("eight", 8),
    ("oito", 8),
    ("nueve", 9),
    ("nine", 9),
    ("nove", 9),
    ("diez", 10),
    ("ten", 10),
    ("dez", 10),
];

pub fn number_word(word: &str) -> Option<i64> {
    let word = lexicon::normalize(word.trim());
    NUMBER_WORDS
        .iter()
        .find(|(w, _)| lexicon::normalize(w) == word)
        .map(|(_, n)| *n)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotPrompts {
    pub missing: String,
    pub unrecognized: String,
    pub invalid: String,
}

impl SlotPrompts {
    pub fn new(missing: &str, unrecognized: &str, invalid: &str) -> Self {
        Self {
            missing: missing.to_string(),
            unrecognized: unrecognized.to_string(),
            invalid: invalid.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSpec {
    pub name: String,
    pub rule: SlotRule,
    /// May reference earlier slots as `{SlotName}`.
    pub prompts: SlotPrompts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotFillingSpec {
    intent_name: String,
    slots: Vec<SlotSpec>,
}

impl SlotFillingSpec {
    pub fn new(
        intent_name: impl Into<String>,
        slots: Vec<SlotSpec>,
    ) -> Result<Self, ContractViolation> {
        let intent_name = intent_name.into();
        if intent_name.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "slot_filling_spec.intent_name",
                reason: "must not be empty",
            });
        }
        if slots.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "slot_filling_spec.slots",
                reason: "must declare at least one slot",
            });
        }
        let mut seen = BTreeSet::new();
        for s in &slots {
            if s.name.trim().is_empty() {
                return Err(ContractViolation::InvalidValue {
                    field: "slot_filling_spec.slots.name",
                    reason: "must not be empty",
                });
            }
            if !seen.insert(s.name.as_str()) {
                return Err(ContractViolation::InvalidValue {
                    field: "slot_filling_spec.slots.name",
                    reason: "must be unique",
                });
            }
            match &s.rule {
                SlotRule::OneOf(options) if options.is_empty() => {
                    return Err(ContractViolation::InvalidValue {
                        field: "slot_filling_spec.slots.rule",
                        reason: "allowed value set must not be empty",
                    });
                }
                SlotRule::IntegerRange { min, max } if min > max => {
                    return Err(ContractViolation::InvalidValue {
                        field: "slot_filling_spec.slots.rule",
                        reason: "min must be <= max",
                    });
                }
                _ => {}
            }
        }
        Ok(Self { intent_name, slots })
    }

    pub fn intent_name(&self) -> &str {
        &self.intent_name
    }

    pub fn slots(&self) -> &[SlotSpec] {
        &self.slots
    }

    pub fn slot_names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|s| s.name.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillState<'a> {
    Awaiting(&'a str),
    Complete,
}

#[derive(Debug, Clone)]
pub struct SlotFillingValidator {
    spec: SlotFillingSpec,
}

impl SlotFillingValidator {
    pub fn new(spec: SlotFillingSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &SlotFillingSpec {
        &self.spec
    }

    pub fn current_state(&self, slots: &SlotMap) -> FillState<'_> {
        match self.check(slots) {
            Ok(_) => FillState::Complete,
            Err(v) => FillState::Awaiting(v.spec.name.as_str()),
        }
    }

    pub fn validate(&self, slots: &SlotMap) -> ValidationOutcome {
        match self.check(slots) {
            Ok(resolved) => ValidationOutcome::Valid(resolved),
            Err(v) => ValidationOutcome::Invalid {
                violated_slot: v.spec.name.clone(),
                prompt: v.prompt,
            },
        }
    }

    /// Canonical values of the leading slots that already validate.
    pub fn resolved_prefix(&self, slots: &SlotMap) -> ResolvedSlots {
        match self.check(slots) {
            Ok(resolved) => resolved,
            Err(v) => v.resolved,
        }
    }

    /// `validate`, then clear the violated slot if it held a value.
    pub fn validate_and_clear(&self, slots: &mut SlotMap) -> ValidationOutcome {
        let outcome = self.validate(slots);
        if let ValidationOutcome::Invalid { violated_slot, .. } = &outcome {
            if let Some(v) = slots.get_mut(violated_slot) {
                if v.is_some() {
                    tracing::debug!(slot = %violated_slot, "clearing rejected slot value");
                    *v = None;
                }
            }
        }
        outcome
    }

    fn check(&self, slots: &SlotMap) -> Result<ResolvedSlots, Violation<'_>> {
        let mut resolved = ResolvedSlots::new();
        for spec in self.spec.slots() {
            let template = match SlotState::of(slots, &spec.name) {
                SlotState::Absent => &spec.prompts.missing,
                SlotState::Unrecognized { .. } => &spec.prompts.unrecognized,
                SlotState::Present(value) => match spec.rule.resolve(value) {
                    Some(canonical) => {
                        resolved.insert(spec.name.clone(), canonical);
                        continue;
                    }
                    None => &spec.prompts.invalid,
                },
            };
            return Err(Violation {
                spec,
                prompt: render_prompt(template, &resolved),
                resolved,
            });
        }
        Ok(resolved)
    }
}

struct Violation<'a> {
    spec: &'a SlotSpec,
    prompt: String,
    resolved: ResolvedSlots,
}

fn render_prompt(template: &str, resolved: &ResolvedSlots) -> String {
    let mut out = template.to_string();
    for (name, value) in resolved.iter() {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}

pub const BEVERAGES: [&str; 6] = ["Espresso", "Cappuccino", "Latte", "Americano", "Tinto", "Café"];
pub const SIZES: [&str; 3] = ["pequeño", "mediano", "grande"];

/// The cafe's `RealizarPedido` intent: beverage, then size, then quantity.
pub fn order_intent_spec() -> SlotFillingSpec {
    let beverages = vec![
        AllowedValue::new("Espresso", &["expreso", "espreso", "expresso"]),
        AllowedValue::new("Cappuccino", &["capuchino", "capuccino", "cappucino"]),
        AllowedValue::new("Latte", &["cafe latte", "café latte"]),
        AllowedValue::new("Americano", &[]),
        AllowedValue::new("Tinto", &[]),
        AllowedValue::new("Café", &["cafe", "coffee"]),
    ];
    let sizes = vec![
        AllowedValue::new("pequeño", &["pequeno", "small", "pequena", "pequeña"]),
        AllowedValue::new("mediano", &["medio", "médio", "medium"]),
        AllowedValue::new("grande", &["large", "big"]),
    ];
    let slots = vec![
        SlotSpec {
            name: BEVERAGE_SLOT.to_string(),
            rule: SlotRule::OneOf(beverages),
            prompts: SlotPrompts::new(
                "¿Qué tipo de bebida te gustaría pedir?",
                "No entendí tu bebida. Solo tenemos: Espresso, Cappuccino, Latte, Americano, Tinto, Café. ¿Cuál prefieres?",
                "Lo siento, solo tenemos: Espresso, Cappuccino, Latte, Americano, Tinto, Café. ¿Cuál te gustaría?",
            ),
        },
        SlotSpec {
            name: SIZE_SLOT.to_string(),
            rule: SlotRule::OneOf(sizes),
            prompts: SlotPrompts::new(
                "Perfecto, un {TiposDeBebida}. ¿En qué tamaño lo quieres: pequeño, mediano o grande?",
                "No entendí el tamaño. Solo tenemos pequeño, mediano o grande. ¿Cuál prefieres?",
                "Solo tenemos tamaños pequeño, mediano o grande. ¿Cuál prefieres?",
            ),
        },
        SlotSpec {
            name: QUANTITY_SLOT.to_string(),
            rule: SlotRule::IntegerRange {
                min: MIN_QUANTITY,
                max: MAX_QUANTITY,
            },
            prompts: SlotPrompts::new(
                "Ok, un {TiposDeBebida} {Tamao}. ¿Cuántos vas a querer?",
                "No entendí la cantidad. Por favor, dime un número.",
                "Por favor, dime un número entre 1 y 10.",
            ),
        },
    ];
    SlotFillingSpec {
        intent_name: ORDER_INTENT.to_string(),
        slots,
    }
}

pub fn order_validator() -> SlotFillingValidator {
    SlotFillingValidator::new(order_intent_spec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cafe_kernel_contracts::slot::SlotValue;

    fn slots(entries: &[(&str, &str)]) -> SlotMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), Some(SlotValue::interpreted(*v))))
            .collect()
    }

    fn invalid(slot: &str, prompt: &str) -> ValidationOutcome {
        ValidationOutcome::Invalid {
            violated_slot: slot.to_string(),
            prompt: prompt.to_string(),
        }
    }

    #[test]
    fn at_slot_fill_01_order_spec_passes_its_own_contract() {
        let spec = order_intent_spec();
        assert!(SlotFillingSpec::new(spec.intent_name(), spec.slots().to_vec()).is_ok());
        assert_eq!(
            spec.slot_names().collect::<Vec<_>>(),
            vec![BEVERAGE_SLOT, SIZE_SLOT, QUANTITY_SLOT]
        );
    }

    #[test]
    fn at_slot_fill_02_empty_map_asks_for_beverage() {
        let v = order_validator();
        assert_eq!(
            v.validate(&SlotMap::new()),
            invalid(BEVERAGE_SLOT, "¿Qué tipo de bebida te gustaría pedir?")
        );
        assert_eq!(v.current_state(&SlotMap::new()), FillState::Awaiting(BEVERAGE_SLOT));
    }

    #[test]
    fn at_slot_fill_03_single_missing_slot_is_named() {
        let v = order_validator();
        let all = slots(&[
            (BEVERAGE_SLOT, "Latte"),
            (SIZE_SLOT, "grande"),
            (QUANTITY_SLOT, "2"),
        ]);
        for name in [BEVERAGE_SLOT, SIZE_SLOT, QUANTITY_SLOT] {
            let mut partial = all.clone();
            partial.remove(name);
            match v.validate(&partial) {
                ValidationOutcome::Invalid { violated_slot, .. } => assert_eq!(violated_slot, name),
                other => panic!("expected invalid, got {other:?}"),
            }
        }
    }

    #[test]
    fn at_slot_fill_04_fixed_order_reports_beverage_first() {
        let v = order_validator();
        let bad = slots(&[(BEVERAGE_SLOT, "Mocha"), (SIZE_SLOT, "gigante")]);
        assert_eq!(
            v.validate(&bad),
            invalid(
                BEVERAGE_SLOT,
                "Lo siento, solo tenemos: Espresso, Cappuccino, Latte, Americano, Tinto, Café. ¿Cuál te gustaría?"
            )
        );
    }

    #[test]
    fn at_slot_fill_05_prompts_interpolate_resolved_values() {
        let v = order_validator();
        assert_eq!(
            v.validate(&slots(&[(BEVERAGE_SLOT, "latte")])),
            invalid(
                SIZE_SLOT,
                "Perfecto, un Latte. ¿En qué tamaño lo quieres: pequeño, mediano o grande?"
            )
        );
        assert_eq!(
            v.validate(&slots(&[(BEVERAGE_SLOT, "capuchino"), (SIZE_SLOT, "large")])),
            invalid(QUANTITY_SLOT, "Ok, un Cappuccino grande. ¿Cuántos vas a querer?")
        );
    }

    #[test]
    fn at_slot_fill_06_unrecognized_value_gets_its_own_prompt() {
        let v = order_validator();
        let mut map = slots(&[(BEVERAGE_SLOT, "Tinto")]);
        map.insert(SIZE_SLOT.to_string(), Some(SlotValue::unrecognized("enorme")));
        assert_eq!(
            v.validate(&map),
            invalid(
                SIZE_SLOT,
                "No entendí el tamaño. Solo tenemos pequeño, mediano o grande. ¿Cuál prefieres?"
            )
        );
    }

    #[test]
    fn at_slot_fill_07_quantity_range_and_words() {
        let v = order_validator();
        let out_of_range = slots(&[
            (BEVERAGE_SLOT, "Latte"),
            (SIZE_SLOT, "grande"),
            (QUANTITY_SLOT, "15"),
        ]);
        assert_eq!(
            v.validate(&out_of_range),
            invalid(QUANTITY_SLOT, "Por favor, dime un número entre 1 y 10.")
        );
        let word = slots(&[
            (BEVERAGE_SLOT, "Latte"),
            (SIZE_SLOT, "grande"),
            (QUANTITY_SLOT, "tres"),
        ]);
        match v.validate(&word) {
            ValidationOutcome::Valid(r) => assert_eq!(r.get(QUANTITY_SLOT), Some("3")),
            other => panic!("expected valid, got {other:?}"),
        }
        assert_eq!(number_word("Dois"), Some(2));
        assert_eq!(number_word("once"), None);
    }

    #[test]
    fn at_slot_fill_08_valid_order_resolves_canonical_values() {
        let v = order_validator();
        let map = slots(&[
            (BEVERAGE_SLOT, "coffee"),
            (SIZE_SLOT, "Pequeno"),
            (QUANTITY_SLOT, " 2 "),
        ]);
        let ValidationOutcome::Valid(r) = v.validate(&map) else {
            panic!("expected valid");
        };
        assert_eq!(r.get(BEVERAGE_SLOT), Some("Café"));
        assert_eq!(r.get(SIZE_SLOT), Some("pequeño"));
        assert_eq!(r.get(QUANTITY_SLOT), Some("2"));
        assert_eq!(v.current_state(&map), FillState::Complete);
    }

    #[test]
    fn at_slot_fill_09_validation_is_idempotent() {
        let v = order_validator();
        let map = slots(&[(BEVERAGE_SLOT, "Latte"), (QUANTITY_SLOT, "4")]);
        assert_eq!(v.validate(&map), v.validate(&map));
        assert_eq!(v.current_state(&map), v.current_state(&map));
    }

    #[test]
    fn at_slot_fill_10_clear_only_touches_present_violated_slot() {
        let v = order_validator();
        let mut map = slots(&[
            (BEVERAGE_SLOT, "Latte"),
            (SIZE_SLOT, "grande"),
            (QUANTITY_SLOT, "15"),
        ]);
        v.validate_and_clear(&mut map);
        assert_eq!(map.get(QUANTITY_SLOT), Some(&None));
        assert!(map.get(BEVERAGE_SLOT).unwrap().is_some());

        let mut missing = slots(&[(BEVERAGE_SLOT, "Latte")]);
        v.validate_and_clear(&mut missing);
        assert!(!missing.contains_key(SIZE_SLOT));
    }

    #[test]
    fn at_slot_fill_11_resolved_prefix_stops_at_first_violation() {
        let v = order_validator();
        let map = slots(&[
            (BEVERAGE_SLOT, "latte"),
            (SIZE_SLOT, "enorme"),
            (QUANTITY_SLOT, "2"),
        ]);
        let prefix = v.resolved_prefix(&map);
        assert_eq!(prefix.len(), 1);
        assert_eq!(prefix.get(BEVERAGE_SLOT), Some("Latte"));
    }

    #[test]
    fn at_slot_fill_12_contradictory_specs_are_refused() {
        let prompts = SlotPrompts::new("a", "b", "c");
        assert!(SlotFillingSpec::new("X", vec![]).is_err());
        assert!(SlotFillingSpec::new(
            "X",
            vec![SlotSpec {
                name: "S".to_string(),
                rule: SlotRule::OneOf(vec![]),
                prompts: prompts.clone(),
            }]
        )
        .is_err());
        assert!(SlotFillingSpec::new(
            "X",
            vec![SlotSpec {
                name: "N".to_string(),
                rule: SlotRule::IntegerRange { min: 5, max: 1 },
                prompts: prompts.clone(),
            }]
        )
        .is_err());
        let dup = SlotSpec {
            name: "N".to_string(),
            rule: SlotRule::IntegerRange { min: 1, max: 5 },
            prompts,
        };
        assert!(SlotFillingSpec::new("X", vec![dup.clone(), dup]).is_err());
    }
}
