// Main rules module - delegates to one file per rule family
// - engine.rs: RuleEngine, evidence plumbing and the DocumentRule trait
// - layout.rs: page count, signature overflow, envelope window
// - client_id.rs: client identifier presence
// - code_link.rs: QR payload vs. link annotation correspondence

pub mod client_id;
pub mod code_link;
pub mod engine;
pub mod layout;

pub use engine::*;
