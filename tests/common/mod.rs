//! Shared test infrastructure: a deterministic ChatML-style reference
//! renderer and an in-memory template source.
//!
//! The renderer is not a template evaluator — it is a hand-written stand-in
//! with the same observable contract, precise enough to exercise every
//! catalog scenario (thinking toggle, tool declaration, parallel tool-call
//! correlation, reasoning content).

#![allow(dead_code)]

use chrono::NaiveDate;
use serde_json::{Map, Value};

use chatgold::model::{Role, SpecialTokens};
use chatgold::renderer::{
    RenderError, RenderRequest, ResolveError, ResolvedModel, TemplateRenderer, TemplateSource,
};

/// The raw template string advertised by [`StubSource`]. Opaque to the
/// subsystem under test; only its presence matters.
pub const CHATML_TEMPLATE: &str =
    "{%- for message in messages %}<|im_start|>{{ message.role }}\n{{ message.content }}<|im_end|>\n{%- endfor %}";

pub fn fixed_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, 27).unwrap()
}

pub fn chatml_special_tokens() -> SpecialTokens {
    SpecialTokens {
        bos_token: String::new(),
        eos_token: "<|im_end|>".to_owned(),
        unk_token: String::new(),
        pad_token: "<|endoftext|>".to_owned(),
    }
}

fn thinking_disabled(extra: Option<&Map<String, Value>>) -> bool {
    extra.and_then(|m| m.get("enable_thinking")).and_then(Value::as_bool) == Some(false)
}

/// ChatML-flavored reference renderer.
///
/// Emission rules:
/// - every turn renders as `<|im_start|>{role}\n...<|im_end|>\n`;
/// - declared tools render as a leading `# Tools` system block;
/// - assistant reasoning renders inside a `<think>` block before content;
/// - tool calls render as `<tool_call>` blocks in source order;
/// - tool results render tagged with their `tool_call_id`, in source
///   order, so correlation survives any downstream parse;
/// - the generation prompt appends `<|im_start|>assistant\n`, plus an
///   empty `<think>` block when thinking is explicitly disabled.
pub struct ChatMlRenderer;

impl TemplateRenderer for ChatMlRenderer {
    fn render(&self, request: &RenderRequest<'_>) -> Result<String, RenderError> {
        let mut out = String::new();

        if let Some(tools) = request.tools {
            let listing = serde_json::to_string(tools)
                .map_err(|err| RenderError::new(err.to_string()))?;
            out.push_str("<|im_start|>system\n# Tools\n");
            out.push_str(&listing);
            out.push_str("<|im_end|>\n");
        }

        for message in request.messages {
            if message.role == Role::Tool {
                let id = message
                    .tool_call_id
                    .as_deref()
                    .ok_or_else(|| RenderError::new("tool message without tool_call_id"))?;
                out.push_str("<|im_start|>tool\n[");
                out.push_str(id);
                out.push_str("] ");
                out.push_str(&message.content);
                out.push_str("<|im_end|>\n");
                continue;
            }

            out.push_str("<|im_start|>");
            out.push_str(&message.role.to_string());
            out.push('\n');
            if let Some(reasoning) = &message.reasoning_content {
                out.push_str("<think>\n");
                out.push_str(reasoning);
                out.push_str("\n</think>\n");
            }
            out.push_str(&message.content);
            if let Some(calls) = &message.tool_calls {
                for call in calls {
                    out.push_str("\n<tool_call>\n{\"name\": \"");
                    out.push_str(&call.function.name);
                    out.push_str("\", \"arguments\": ");
                    out.push_str(&call.function.arguments);
                    out.push_str("}\n</tool_call>");
                }
            }
            out.push_str("<|im_end|>\n");
        }

        if request.add_generation_prompt {
            out.push_str("<|im_start|>assistant\n");
            if thinking_disabled(request.extra_context) {
                out.push_str("<think>\n\n</think>\n\n");
            }
        }

        Ok(out)
    }
}

/// Reference renderer for a template family with no tool-calling support:
/// any tool traffic is a scenario-local render failure.
pub struct ToollessRenderer;

impl TemplateRenderer for ToollessRenderer {
    fn render(&self, request: &RenderRequest<'_>) -> Result<String, RenderError> {
        let has_tool_traffic = request.tools.is_some()
            || request
                .messages
                .iter()
                .any(|m| m.tool_calls.is_some() || m.role == Role::Tool);
        if has_tool_traffic {
            return Err(RenderError::new("template has no tool-calling support"));
        }
        ChatMlRenderer.render(request)
    }
}

/// Which reference renderer a stub model resolves to.
#[derive(Debug, Clone, Copy)]
pub enum ModelStyle {
    ChatMl,
    Toolless,
}

/// In-memory model source. Unknown ids fail resolution, which the
/// generation pass must treat as a whole-model skip.
pub struct StubSource {
    models: Vec<(String, ModelStyle)>,
}

impl StubSource {
    pub fn new(models: Vec<(&str, ModelStyle)>) -> Self {
        Self {
            models: models
                .into_iter()
                .map(|(id, style)| (id.to_owned(), style))
                .collect(),
        }
    }

    pub fn chatml(model_ids: &[&str]) -> Self {
        Self::new(model_ids.iter().map(|id| (*id, ModelStyle::ChatMl)).collect())
    }
}

impl TemplateSource for StubSource {
    fn resolve(&self, model_id: &str) -> Result<ResolvedModel, ResolveError> {
        let style = self
            .models
            .iter()
            .find(|(id, _)| id == model_id)
            .map(|(_, style)| *style)
            .ok_or_else(|| ResolveError::new(format!("no template found for {model_id}")))?;
        let renderer: Box<dyn TemplateRenderer> = match style {
            ModelStyle::ChatMl => Box::new(ChatMlRenderer),
            ModelStyle::Toolless => Box::new(ToollessRenderer),
        };
        Ok(ResolvedModel {
            template: CHATML_TEMPLATE.to_owned(),
            special_tokens: chatml_special_tokens(),
            renderer,
        })
    }
}
