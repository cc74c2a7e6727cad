#![forbid(unsafe_code)]

pub mod common;
pub mod dialog;
pub mod intent;
pub mod interaction;
pub mod language;
pub mod sentiment;
pub mod session;
pub mod slot;

pub use common::{ContractViolation, ReasonCodeId, Validate};
