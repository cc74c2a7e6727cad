#![forbid(unsafe_code)]

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReasonCodeId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub enum ContractViolation {
    InvalidValue {
        field: &'static str,
        reason: &'static str,
    },
    InvalidRange {
        field: &'static str,
        min: f64,
        max: f64,
        got: f64,
    },
    NotFinite {
        field: &'static str,
    },
}

impl std::fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContractViolation::InvalidValue { field, reason } => write!(f, "{field}: {reason}"),
            ContractViolation::InvalidRange {
                field,
                min,
                max,
                got,
            } => write!(f, "{field}: {got} outside [{min}, {max}]"),
            ContractViolation::NotFinite { field } => write!(f, "{field}: must be finite"),
        }
    }
}

impl std::error::Error for ContractViolation {}

pub trait Validate {
    fn validate(&self) -> Result<(), ContractViolation>;
}

pub(crate) fn validate_text(
    field: &'static str,
    text: &str,
    max_len: usize,
) -> Result<(), ContractViolation> {
    if text.trim().is_empty() {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must not be empty",
        });
    }
    if text.len() > max_len {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "exceeds max length",
        });
    }
    Ok(())
}

pub(crate) fn validate_unit_interval(field: &'static str, v: f64) -> Result<(), ContractViolation> {
    if !v.is_finite() {
        return Err(ContractViolation::NotFinite { field });
    }
    if !(0.0..=1.0).contains(&v) {
        return Err(ContractViolation::InvalidRange {
            field,
            min: 0.0,
            max: 1.0,
            got: v,
        });
    }
    Ok(())
}
