//! Conformance verification against a stored corpus.
//!
//! The comparator replays every stored case through a candidate renderer
//! and holds it to byte-exact equality with the captured reference
//! string. No trimming, no whitespace normalization: token spacing is
//! exactly what conformance is about. Mismatches are data carried in the
//! report, never raised as errors.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{CaseResult, Corpus};
use crate::renderer::{RenderRequest, TemplateRenderer};

/// One failed case: the candidate produced output, but the wrong bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseMismatch {
    pub model_id: String,
    pub description: String,
    pub expected: String,
    pub actual: String,
    /// First byte index at which the strings diverge. When one string is
    /// a prefix of the other, this is the shorter length.
    pub divergence: usize,
}

/// Why a case did not pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CaseFailure {
    Mismatch(CaseMismatch),
    /// The candidate renderer errored on replay. Reported, not raised:
    /// a renderer that cannot express a stored case is non-conformant
    /// for that case, nothing more.
    Error {
        model_id: String,
        description: String,
        message: String,
    },
}

impl CaseFailure {
    pub fn description(&self) -> &str {
        match self {
            Self::Mismatch(mismatch) => &mismatch.description,
            Self::Error { description, .. } => description,
        }
    }
}

/// Verification status of one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    /// Every stored case replayed byte-identically.
    Passed,
    Failed,
    /// The record holds zero cases, so nothing was verified. Distinct
    /// from `Passed` so coverage gaps stay visible.
    NoCoverage,
}

/// Per-model verification outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOutcome {
    pub model_id: String,
    pub status: ModelStatus,
    pub cases: usize,
    pub passed: usize,
    pub failures: Vec<CaseFailure>,
}

/// The full verification report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConformanceReport {
    pub outcomes: Vec<ModelOutcome>,
}

impl ConformanceReport {
    pub fn total_cases(&self) -> usize {
        self.outcomes.iter().map(|o| o.cases).sum()
    }

    pub fn total_passed(&self) -> usize {
        self.outcomes.iter().map(|o| o.passed).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.outcomes.iter().map(|o| o.failures.len()).sum()
    }

    /// Model ids with at least one failing case, in corpus order.
    pub fn failing_models(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.status == ModelStatus::Failed)
            .map(|o| o.model_id.as_str())
            .collect()
    }

    /// Model ids with empty case lists, in corpus order.
    pub fn uncovered_models(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.status == ModelStatus::NoCoverage)
            .map(|o| o.model_id.as_str())
            .collect()
    }

    /// True when no case failed. Note that an all-`NoCoverage` report is
    /// clean too; callers that care must also check `uncovered_models`.
    pub fn is_clean(&self) -> bool {
        self.outcomes.iter().all(|o| o.status != ModelStatus::Failed)
    }
}

/// Replay every case in `corpus` through `candidate` and diff.
pub fn compare(corpus: &Corpus, candidate: &dyn TemplateRenderer) -> ConformanceReport {
    compare_filtered(corpus, candidate, None)
}

/// Like [`compare`], restricted to model ids containing `filter`.
pub fn compare_filtered(
    corpus: &Corpus,
    candidate: &dyn TemplateRenderer,
    filter: Option<&str>,
) -> ConformanceReport {
    let mut report = ConformanceReport::default();
    for (model_id, record) in corpus.iter() {
        if let Some(filter) = filter {
            if !model_id.contains(filter) {
                continue;
            }
        }

        if record.cases.is_empty() {
            report.outcomes.push(ModelOutcome {
                model_id: model_id.to_owned(),
                status: ModelStatus::NoCoverage,
                cases: 0,
                passed: 0,
                failures: Vec::new(),
            });
            continue;
        }

        let mut passed = 0;
        let mut failures = Vec::new();
        for case in &record.cases {
            match replay_case(model_id, case, candidate) {
                Ok(()) => passed += 1,
                Err(failure) => failures.push(failure),
            }
        }

        let status = if failures.is_empty() {
            ModelStatus::Passed
        } else {
            ModelStatus::Failed
        };
        report.outcomes.push(ModelOutcome {
            model_id: model_id.to_owned(),
            status,
            cases: record.cases.len(),
            passed,
            failures,
        });
    }
    report
}

fn replay_case(
    model_id: &str,
    case: &CaseResult,
    candidate: &dyn TemplateRenderer,
) -> Result<(), CaseFailure> {
    let request = RenderRequest {
        messages: &case.messages,
        tools: case.tools.as_deref(),
        add_generation_prompt: case.add_generation_prompt,
        extra_context: case.extra_context.as_ref(),
    };
    let actual = match candidate.render(&request) {
        Ok(actual) => actual,
        Err(err) => {
            return Err(CaseFailure::Error {
                model_id: model_id.to_owned(),
                description: case.description.clone(),
                message: err.message().to_owned(),
            });
        }
    };

    if actual == case.expected {
        return Ok(());
    }
    let divergence = first_divergence(&case.expected, &actual);
    Err(CaseFailure::Mismatch(CaseMismatch {
        model_id: model_id.to_owned(),
        description: case.description.clone(),
        expected: case.expected.clone(),
        actual,
        divergence,
    }))
}

/// First byte index at which two strings differ.
pub fn first_divergence(expected: &str, actual: &str) -> usize {
    expected
        .as_bytes()
        .iter()
        .zip(actual.as_bytes())
        .position(|(a, b)| a != b)
        .unwrap_or_else(|| expected.len().min(actual.len()))
}

/// Make whitespace divergence inspectable: escape `\n`, `\r`, `\t` while
/// keeping real line breaks after each `\n` so long prompts stay readable.
fn visualize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '\n' => out.push_str("\\n\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.outcomes {
            match outcome.status {
                ModelStatus::Passed => {
                    writeln!(
                        f,
                        "{}: {} cases passed",
                        outcome.model_id, outcome.passed
                    )?;
                }
                ModelStatus::NoCoverage => {
                    writeln!(f, "{}: no coverage", outcome.model_id)?;
                }
                ModelStatus::Failed => {
                    writeln!(
                        f,
                        "{}: {}/{} cases passed",
                        outcome.model_id, outcome.passed, outcome.cases
                    )?;
                    for failure in &outcome.failures {
                        match failure {
                            CaseFailure::Error {
                                description,
                                message,
                                ..
                            } => {
                                writeln!(f, "  {description}: render error: {message}")?;
                            }
                            CaseFailure::Mismatch(mismatch) => {
                                writeln!(
                                    f,
                                    "  {}: mismatch at byte {}",
                                    mismatch.description, mismatch.divergence
                                )?;
                                writeln!(f, "  --- expected ---")?;
                                for line in visualize(&mismatch.expected).lines() {
                                    writeln!(f, "  | {line}")?;
                                }
                                writeln!(f, "  --- actual ---")?;
                                for line in visualize(&mismatch.actual).lines() {
                                    writeln!(f, "  | {line}")?;
                                }
                            }
                        }
                    }
                }
            }
        }
        let uncovered = self.uncovered_models().len();
        write!(
            f,
            "models: {}, cases: {}, passed: {}, failed: {}, no coverage: {}",
            self.outcomes.len(),
            self.total_cases(),
            self.total_passed(),
            self.total_failed(),
            uncovered
        )
    }
}
