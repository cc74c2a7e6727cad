#![forbid(unsafe_code)]

pub mod interaction_log;
pub mod repo;
