//! Domain types shared between the extractors and the agent crates.

pub mod message;
pub mod visa;

pub use message::{truncate_chars, ChatMessage};
pub use visa::{UnknownVisaRequirement, VisaRecord, VisaRequirement, NOT_AVAILABLE};
