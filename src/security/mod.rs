pub mod redaction;

pub use redaction::redact_body;
