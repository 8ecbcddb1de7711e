//! GRQ Answer: shaped outcomes into role-appropriate responses.

pub mod synthesizer;
pub mod templates;

pub use synthesizer::ResponseSynthesizer;
pub use templates::{TemplateRenderer, TemplatesFile};
