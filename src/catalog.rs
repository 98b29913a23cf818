//! The versioned scenario catalog.
//!
//! Scenarios enumerate the conversational shapes a conformant renderer
//! must handle: plain turns, consecutive same-role turns, generation
//! prompt on/off, thinking-mode toggling, tool declaration, single and
//! parallel tool calls with correlated results, separate reasoning
//! content, and date injection. They are created once per catalog version
//! and are read-only afterwards.
//!
//! The catalog never auto-repairs a scenario: a malformed entry (e.g. a
//! `tool` message without `tool_call_id`) is an authoring error surfaced
//! by [`ScenarioCatalog::validate`] before any generation begins.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde_json::{json, Map, Value};

use crate::error::{Error, Result};
use crate::model::{Message, Role, ToolCall, ToolDefinition};
use crate::renderer::RenderRequest;

/// Bumped whenever the scenario set or any scenario's shape changes.
pub const CATALOG_VERSION: u32 = 1;

/// A named, fixed renderer input.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    /// Unique human-readable identifier within a catalog version.
    pub description: String,
    pub messages: Vec<Message>,
    pub tools: Option<Vec<ToolDefinition>>,
    pub add_generation_prompt: bool,
    /// Renderer-specific flags (e.g. `enable_thinking`).
    pub extra_context: Option<Map<String, Value>>,
    /// Hand-authored reference string. Catches reference-renderer
    /// regressions before any per-model golden comparison happens.
    pub expected: Option<String>,
    /// Documented scenario-level expectation where renderer policy could
    /// otherwise be ambiguous (e.g. parallel tool-result ordering).
    pub note: Option<&'static str>,
}

impl Scenario {
    fn new(description: &str, messages: Vec<Message>) -> Self {
        Self {
            description: description.to_owned(),
            messages,
            tools: None,
            add_generation_prompt: false,
            extra_context: None,
            expected: None,
            note: None,
        }
    }

    #[must_use]
    fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = Some(tools);
        self
    }

    #[must_use]
    fn with_generation_prompt(mut self) -> Self {
        self.add_generation_prompt = true;
        self
    }

    #[must_use]
    fn with_extra_context(mut self, context: Map<String, Value>) -> Self {
        self.extra_context = Some(context);
        self
    }

    #[must_use]
    fn with_expected(mut self, expected: &str) -> Self {
        self.expected = Some(expected.to_owned());
        self
    }

    #[must_use]
    fn with_note(mut self, note: &'static str) -> Self {
        self.note = Some(note);
        self
    }

    /// Build the renderer request for this scenario, passing every field
    /// through unmodified. `tools` stays `None` when the scenario defines
    /// none so the template sees "no tool capability", not an empty list.
    pub fn render_request(&self) -> RenderRequest<'_> {
        RenderRequest {
            messages: &self.messages,
            tools: self.tools.as_deref(),
            add_generation_prompt: self.add_generation_prompt,
            extra_context: self.extra_context.as_ref(),
        }
    }
}

/// The full scenario set for one catalog version.
///
/// Construction is pure and deterministic given a date: the
/// date-sensitive scenarios embed it at catalog-read time, so two
/// generator runs on the same calendar day build identical catalogs.
#[derive(Debug, Clone)]
pub struct ScenarioCatalog {
    scenarios: Vec<Scenario>,
}

impl ScenarioCatalog {
    /// Build today's catalog (UTC calendar day).
    pub fn current() -> Self {
        Self::for_date(chrono::Utc::now().date_naive())
    }

    /// Build the catalog with an explicit date. Used by tests to pin the
    /// date-injection scenarios.
    pub fn for_date(date: NaiveDate) -> Self {
        let date = date.format("%Y-%m-%d").to_string();
        Self {
            scenarios: build_scenarios(&date),
        }
    }

    /// Build a catalog from explicit scenarios. For harnesses that need a
    /// non-standard set; [`validate`](Self::validate) still applies.
    pub fn from_scenarios(scenarios: Vec<Scenario>) -> Self {
        Self { scenarios }
    }

    /// Scenarios in canonical order.
    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Check catalog-authoring invariants.
    ///
    /// Called before any generation: a malformed scenario would corrupt
    /// every model's fixture, so any violation is fatal.
    pub fn validate(&self) -> Result<()> {
        let mut descriptions = BTreeSet::new();
        for scenario in &self.scenarios {
            if !descriptions.insert(scenario.description.as_str()) {
                return Err(Error::schema(format!(
                    "duplicate scenario description: {}",
                    scenario.description
                )));
            }
            validate_scenario(scenario)?;
        }
        Ok(())
    }
}

fn validate_scenario(scenario: &Scenario) -> Result<()> {
    let desc = &scenario.description;
    if scenario.messages.is_empty() {
        return Err(Error::schema(format!("{desc}: messages must be non-empty")));
    }

    // Tool-result messages must correlate to a tool call emitted earlier
    // in the same scenario.
    let mut known_call_ids: BTreeSet<&str> = BTreeSet::new();

    for (index, message) in scenario.messages.iter().enumerate() {
        if let Some(calls) = &message.tool_calls {
            if message.role != Role::Assistant {
                return Err(Error::schema(format!(
                    "{desc}: message {index} has tool_calls but role {}",
                    message.role
                )));
            }
            let mut ids_in_message = BTreeSet::new();
            for call in calls {
                if !ids_in_message.insert(call.id.as_str()) {
                    return Err(Error::schema(format!(
                        "{desc}: message {index} repeats tool call id {}",
                        call.id
                    )));
                }
                known_call_ids.insert(call.id.as_str());
            }
        }

        if message.role == Role::Tool {
            let Some(call_id) = message.tool_call_id.as_deref() else {
                return Err(Error::schema(format!(
                    "{desc}: tool message {index} is missing tool_call_id"
                )));
            };
            if message.name.is_none() {
                return Err(Error::schema(format!(
                    "{desc}: tool message {index} is missing name"
                )));
            }
            if !known_call_ids.contains(call_id) {
                return Err(Error::schema(format!(
                    "{desc}: tool message {index} references unknown tool call id {call_id}"
                )));
            }
        }
    }

    if let Some(tools) = &scenario.tools {
        let mut names = BTreeSet::new();
        for tool in tools {
            if !names.insert(tool.function.name.as_str()) {
                return Err(Error::schema(format!(
                    "{desc}: duplicate tool definition name {}",
                    tool.function.name
                )));
            }
        }
    }

    Ok(())
}

/// The two tools shared by every tool-bearing scenario.
fn sample_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::function(
            "get_weather",
            "Get current weather",
            json!({
                "type": "object",
                "properties": {
                    "location": { "type": "string" },
                    "unit": { "type": "string", "enum": ["c", "f"] }
                },
                "required": ["location"]
            }),
        ),
        ToolDefinition::function(
            "search",
            "Search web",
            json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" }
                },
                "required": ["query"]
            }),
        ),
    ]
}

fn thinking_disabled_context() -> Map<String, Value> {
    let mut context = Map::new();
    context.insert("enable_thinking".to_owned(), Value::Bool(false));
    context
}

fn build_scenarios(date: &str) -> Vec<Scenario> {
    vec![
        Scenario::new("basic_user", vec![Message::user("Hi")]),
        Scenario::new(
            "system_user_assistant",
            vec![
                Message::system("You are a helper."),
                Message::user("Who are you?"),
                Message::assistant("I am AI."),
            ],
        ),
        // Two same-role turns in a row: a renderer must keep them as two
        // turns, neither merged nor reordered.
        Scenario::new(
            "consecutive_users",
            vec![Message::user("Part 1"), Message::user("Part 2")],
        ),
        // gen_prompt_true/false share messages: the pair isolates the
        // generation-prompt suffix from the rest of the rendering.
        Scenario::new("gen_prompt_true", vec![Message::user("Hello")])
            .with_generation_prompt(),
        Scenario::new("gen_prompt_false", vec![Message::user("Hello")]),
        Scenario::new("disable_thinking", vec![Message::user("Hello")])
            .with_extra_context(thinking_disabled_context())
            .with_generation_prompt()
            .with_expected(
                "<|im_start|>user\nHello<|im_end|>\n<|im_start|>assistant\n<think>\n\n</think>\n\n",
            ),
        Scenario::new("tools_provided_no_call", vec![Message::user("Hi")])
            .with_tools(sample_tools())
            .with_generation_prompt(),
        Scenario::new(
            "assistant_tool_call_history",
            vec![
                Message::user("Weather in NY?"),
                Message::assistant_tool_calls(
                    "",
                    vec![ToolCall::function(
                        "call_123",
                        "get_weather",
                        "{\"location\":\"NY\"}",
                    )],
                ),
            ],
        )
        .with_tools(sample_tools()),
        Scenario::new(
            "tool_response_execution",
            vec![
                Message::user("Weather in NY?"),
                Message::assistant_tool_calls(
                    "",
                    vec![ToolCall::function(
                        "call_123",
                        "get_weather",
                        "{\"location\":\"NY\"}",
                    )],
                ),
                Message::tool_result("call_123", "get_weather", "{\"temp\": 20}"),
            ],
        )
        .with_tools(sample_tools())
        .with_generation_prompt(),
        Scenario::new(
            "parallel_tool_calls",
            vec![
                Message::user("Weather in NY and SF?"),
                Message::assistant_tool_calls(
                    "",
                    vec![
                        ToolCall::function("call_1", "get_weather", "{\"location\":\"NY\"}"),
                        ToolCall::function("call_2", "get_weather", "{\"location\":\"SF\"}"),
                    ],
                ),
                Message::tool_result("call_1", "get_weather", "20C"),
                Message::tool_result("call_2", "get_weather", "15C"),
            ],
        )
        .with_tools(sample_tools())
        .with_generation_prompt()
        .with_note(
            "Tool results are emitted in source order; each result must remain \
             resolvable to its call via tool_call_id. Renderers that re-sort by \
             id need a template-family-specific expected string.",
        ),
        Scenario::new(
            "reasoning_content",
            vec![
                Message::user("Solve"),
                Message::assistant("42").with_reasoning("Thinking process..."),
            ],
        ),
        Scenario::new(
            "date_injection_sim",
            vec![
                Message::system(format!("Current Date: {date}")),
                Message::user("Date?"),
            ],
        ),
    ]
}
