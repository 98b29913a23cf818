//! Consumed interfaces around the reference rendering engine.
//!
//! The template-evaluation engine itself is a black box: any concrete
//! engine (a Jinja-style evaluator, a tokenizer binding, a subprocess)
//! can sit behind [`TemplateRenderer`]. This crate only depends on the
//! one-method contract, never on engine internals. Likewise
//! [`TemplateSource`] abstracts model-id resolution; it is injected
//! explicitly into the generation pass rather than looked up through any
//! process-wide registry.

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::{Message, SpecialTokens, ToolDefinition};

/// Everything a renderer needs for one scenario, passed through from the
/// catalog unmodified.
///
/// `tools` is `None` (not an empty slice) when the scenario defines no
/// tools, so templates can distinguish "no tool capability" from "empty
/// tool list".
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub messages: &'a [Message],
    pub tools: Option<&'a [ToolDefinition]>,
    pub add_generation_prompt: bool,
    /// Renderer-specific flags, e.g. `enable_thinking`.
    pub extra_context: Option<&'a Map<String, Value>>,
}

/// A chat-template renderer: flattens one structured conversation into
/// one prompt string.
pub trait TemplateRenderer {
    /// Render one scenario. A failure is scenario-local: a template with
    /// no tool-calling support may fail on tool messages without that
    /// affecting any other scenario or model.
    fn render(&self, request: &RenderRequest<'_>) -> Result<String, RenderError>;
}

/// A scenario-local rendering failure.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RenderError {
    message: String,
}

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A model id that could not be resolved to a template.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ResolveError {
    message: String,
}

impl ResolveError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// What resolving a model id yields: the raw template string, the model's
/// special tokens, and a callable reference renderer for that template.
pub struct ResolvedModel {
    pub template: String,
    pub special_tokens: SpecialTokens,
    pub renderer: Box<dyn TemplateRenderer>,
}

impl fmt::Debug for ResolvedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedModel")
            .field("template", &self.template)
            .field("special_tokens", &self.special_tokens)
            .finish_non_exhaustive()
    }
}

/// Resolves model identifiers to their reference template and renderer.
///
/// Loading, networking, and authentication live behind this trait; the
/// generation pass only sees success or a [`ResolveError`]. No retries
/// happen here — a transient failure is a permanent skip for the run.
pub trait TemplateSource {
    fn resolve(&self, model_id: &str) -> Result<ResolvedModel, ResolveError>;
}
