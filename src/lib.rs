//! chatgold - golden fixtures for chat-template conformance.
//!
//! A chat template deterministically flattens a structured conversation
//! (role-tagged messages, optional tool definitions, optional reasoning
//! content) into one prompt string for an instruction-tuned model. This
//! crate produces and consumes the golden fixtures that prove an
//! independently implemented renderer reproduces the reference engine
//! byte for byte:
//!
//! - [`catalog`] enumerates the canonical conversation scenarios;
//! - [`renderer`] defines the consumed [`renderer::TemplateRenderer`] and
//!   [`renderer::TemplateSource`] contracts — the evaluation engine
//!   itself is an external collaborator;
//! - [`store`] runs the generation pass and persists the corpus as one
//!   pretty-printed JSON document, written atomically;
//! - [`compare`] replays stored cases through a candidate renderer and
//!   reports byte-exact mismatches with the first index of divergence.

#![forbid(unsafe_code)]

pub mod catalog;
pub mod compare;
pub mod error;
pub mod model;
pub mod renderer;
pub mod store;

pub use catalog::{Scenario, ScenarioCatalog, CATALOG_VERSION};
pub use compare::{compare, compare_filtered, ConformanceReport};
pub use error::{Error, Result};
pub use model::{CaseResult, Corpus, FixtureRecord, Message, Role, SpecialTokens};
pub use renderer::{RenderRequest, TemplateRenderer, TemplateSource};
pub use store::{generate, load_corpus, write_corpus};
