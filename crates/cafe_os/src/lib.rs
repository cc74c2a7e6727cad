#![forbid(unsafe_code)]

pub mod collaborators;
pub mod compose;
pub mod fulfillment;
pub mod messages;
pub mod orchestrator;
