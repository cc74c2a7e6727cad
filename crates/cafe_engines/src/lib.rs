#![forbid(unsafe_code)]

pub mod faq;
pub mod language;
pub mod lexicon;
pub mod nlu;
pub mod providers;
pub mod router;
pub mod sentiment;
pub mod slot_filling;
