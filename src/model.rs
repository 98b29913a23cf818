//! Wire data model for chat-template fixtures.
//!
//! These types are the shared fixture format used across the project:
//! - [`crate::catalog`] builds [`Message`]/[`ToolDefinition`] values into scenarios.
//! - [`crate::store`] captures rendered output as [`CaseResult`]s inside a
//!   per-model [`FixtureRecord`] and persists the whole [`Corpus`] as JSON.
//! - [`crate::compare`] replays the stored inputs through a candidate renderer.
//!
//! Field names follow the fixture JSON format (snake_case, `tool_call_id`,
//! `add_generation_prompt`), so the serialized corpus is directly consumable
//! by non-Rust verifiers.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ============================================================================
// Messages
// ============================================================================

/// Who authored a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// One turn of a conversation.
///
/// `content` may be empty when `tool_calls` carries the payload. A `tool`
/// message must carry `tool_call_id` and `name`; that is a catalog-authoring
/// invariant checked by [`crate::catalog::ScenarioCatalog::validate`], not
/// a serde-level constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Reasoning emitted separately from `content` (thinking-capable models).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
    /// Correlates a tool-result message back to the call that produced it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    /// A plain message with only role and content.
    pub fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: None,
            reasoning_content: None,
            tool_call_id: None,
            name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(Role::Assistant, content)
    }

    /// An assistant turn that requests tool execution.
    pub fn assistant_tool_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: Some(calls),
            ..Self::text(Role::Assistant, content)
        }
    }

    /// A tool-result turn correlated to `tool_call_id`.
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            name: Some(name.into()),
            ..Self::text(Role::Tool, content)
        }
    }

    /// Attach reasoning content to this turn.
    #[must_use]
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning_content = Some(reasoning.into());
        self
    }
}

// ============================================================================
// Tool calls and tool definitions
// ============================================================================

/// Discriminator for tool calls and tool definitions. Only functions exist
/// today; the enum keeps the wire field `"type": "function"` typed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    #[default]
    Function,
}

/// A tool invocation requested by an assistant turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique within the owning message.
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: ToolKind,
    pub function: FunctionCall,
}

impl ToolCall {
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: ToolKind::Function,
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// The function half of a [`ToolCall`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Pre-serialized structured arguments. Opaque here: this subsystem
    /// never parses them, only passes them through to the renderer.
    pub arguments: String,
}

/// A tool made available to the model for a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type", default)]
    pub kind: ToolKind,
    pub function: FunctionSpec,
}

impl ToolDefinition {
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            kind: ToolKind::Function,
            function: FunctionSpec {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

/// The declared shape of a callable function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    /// Unique within the owning tools list.
    pub name: String,
    pub description: String,
    /// Opaque parameter schema, passed through verbatim.
    pub parameters: serde_json::Value,
}

// ============================================================================
// Fixture records
// ============================================================================

/// Special-token values for a model. Absent tokens are empty strings,
/// never null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialTokens {
    #[serde(default)]
    pub bos_token: String,
    #[serde(default)]
    pub eos_token: String,
    #[serde(default)]
    pub unk_token: String,
    #[serde(default)]
    pub pad_token: String,
}

/// One scenario's captured result for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    /// Matches the scenario's description in the catalog.
    pub description: String,
    pub messages: Vec<Message>,
    pub add_generation_prompt: bool,
    /// Present only when the scenario supplied tools.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    /// Present only when the scenario supplied renderer flags. Without
    /// this a verifier could not replay e.g. the thinking-disabled case.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_context: Option<serde_json::Map<String, serde_json::Value>>,
    /// The rendered string captured from the reference renderer.
    pub expected: String,
}

/// All captured results for one model.
///
/// The model id lives in the [`Corpus`] map key, not inside the record,
/// matching the fixture JSON format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureRecord {
    /// Raw template string, opaque to this subsystem.
    pub template: String,
    pub special_tokens: SpecialTokens,
    pub cases: Vec<CaseResult>,
}

// ============================================================================
// Corpus
// ============================================================================

/// The full fixture corpus: model id → [`FixtureRecord`], in insertion order.
///
/// Serializes as a single JSON object whose key order is the order models
/// were inserted (i.e. generation order). A `BTreeMap` would silently
/// re-sort model ids, so the map is kept as an ordered vec with manual
/// serde impls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    entries: Vec<(String, FixtureRecord)>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a model's record. Last write wins if the id repeats, which
    /// cannot happen in a single generation pass.
    pub fn insert(&mut self, model_id: impl Into<String>, record: FixtureRecord) {
        let model_id = model_id.into();
        if let Some(existing) = self.entries.iter_mut().find(|(id, _)| *id == model_id) {
            existing.1 = record;
        } else {
            self.entries.push((model_id, record));
        }
    }

    pub fn get(&self, model_id: &str) -> Option<&FixtureRecord> {
        self.entries
            .iter()
            .find(|(id, _)| id == model_id)
            .map(|(_, record)| record)
    }

    pub fn contains(&self, model_id: &str) -> bool {
        self.get(model_id).is_some()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FixtureRecord)> {
        self.entries
            .iter()
            .map(|(id, record)| (id.as_str(), record))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Corpus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (model_id, record) in &self.entries {
            map.serialize_entry(model_id, record)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Corpus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CorpusVisitor;

        impl<'de> Visitor<'de> for CorpusVisitor {
            type Value = Corpus;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of model id to fixture record")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Corpus, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((model_id, record)) =
                    access.next_entry::<String, FixtureRecord>()?
                {
                    entries.push((model_id, record));
                }
                Ok(Corpus { entries })
            }
        }

        deserializer.deserialize_map(CorpusVisitor)
    }
}
