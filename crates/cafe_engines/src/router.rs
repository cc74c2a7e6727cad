#![forbid(unsafe_code)]

use cafe_kernel_contracts::intent::StructuredIntent;
use cafe_kernel_contracts::ContractViolation;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouterConfig {
    /// Candidates must score strictly above this to be trusted.
    pub acceptance_threshold: f64,
}

impl RouterConfig {
    pub fn mvp_v1() -> Self {
        Self {
            acceptance_threshold: 0.6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationReason {
    NoCandidate,
    EmptyIntentName,
    BelowThreshold,
    InvalidConfidence,
}

impl EscalationReason {
    pub fn as_str(self) -> &'static str {
        match self {
            EscalationReason::NoCandidate => "no_candidate",
            EscalationReason::EmptyIntentName => "empty_intent_name",
            EscalationReason::BelowThreshold => "below_threshold",
            EscalationReason::InvalidConfidence => "invalid_confidence",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RouteDecision<'a> {
    Accept(&'a StructuredIntent),
    Escalate(EscalationReason),
}

impl RouteDecision<'_> {
    pub fn is_accept(&self) -> bool {
        matches!(self, RouteDecision::Accept(_))
    }
}

#[derive(Debug, Clone)]
pub struct ConfidenceRouter {
    config: RouterConfig,
}

impl ConfidenceRouter {
    pub fn new(config: RouterConfig) -> Result<Self, ContractViolation> {
        let t = config.acceptance_threshold;
        if !t.is_finite() {
            return Err(ContractViolation::NotFinite {
                field: "router_config.acceptance_threshold",
            });
        }
        if !(0.0..=1.0).contains(&t) {
            return Err(ContractViolation::InvalidRange {
                field: "router_config.acceptance_threshold",
                min: 0.0,
                max: 1.0,
                got: t,
            });
        }
        Ok(Self { config })
    }

    pub fn threshold(&self) -> f64 {
        self.config.acceptance_threshold
    }

    pub fn decide<'a>(&self, candidate: Option<&'a StructuredIntent>) -> RouteDecision<'a> {
        let Some(c) = candidate else {
            return RouteDecision::Escalate(EscalationReason::NoCandidate);
        };
        if c.name.trim().is_empty() {
            return RouteDecision::Escalate(EscalationReason::EmptyIntentName);
        }
        if !c.confidence.is_finite() {
            return RouteDecision::Escalate(EscalationReason::InvalidConfidence);
        }
        if c.confidence > self.config.acceptance_threshold {
            RouteDecision::Accept(c)
        } else {
            RouteDecision::Escalate(EscalationReason::BelowThreshold)
        }
    }
}
