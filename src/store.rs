//! Fixture generation and corpus persistence.
//!
//! One generation pass walks every (model, scenario) pair sequentially.
//! Sequential is not an ordering requirement, it is an isolation one:
//! each model resolution and each scenario render is a fault boundary,
//! and a failure there is recorded as an omission without touching any
//! other model or case. The pass itself only fails on a catalog schema
//! violation or on I/O.

use std::io::Write as _;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::catalog::ScenarioCatalog;
use crate::error::{Error, Result};
use crate::model::{CaseResult, Corpus, FixtureRecord};
use crate::renderer::TemplateSource;

/// Generate the fixture corpus for `models`.
///
/// Skip rules:
/// - unresolved template: the model is omitted from the corpus entirely,
///   never written as a placeholder;
/// - render failure: the case is omitted, remaining scenarios still run;
/// - zero rendered cases with a resolved template: the record is kept
///   with an empty `cases` list. Template presence gates inclusion,
///   renderability does not.
///
/// Re-running against unchanged templates and an unchanged catalog (same
/// calendar day) produces a byte-identical corpus.
pub fn generate<S: AsRef<str>>(
    models: &[S],
    catalog: &ScenarioCatalog,
    source: &dyn TemplateSource,
) -> Result<Corpus> {
    catalog.validate()?;

    let mut corpus = Corpus::new();
    for model in models {
        let model_id = model.as_ref();
        let resolved = match source.resolve(model_id) {
            Ok(resolved) => resolved,
            Err(err) => {
                let skip = Error::unresolved(model_id, err.message());
                warn!(model = model_id, error = %skip, "skipping model");
                continue;
            }
        };

        let mut cases = Vec::with_capacity(catalog.len());
        for scenario in catalog.scenarios() {
            let rendered = match resolved.renderer.render(&scenario.render_request()) {
                Ok(rendered) => rendered,
                Err(err) => {
                    let skip =
                        Error::render(model_id, scenario.description.as_str(), err.message());
                    warn!(
                        model = model_id,
                        scenario = scenario.description.as_str(),
                        error = %skip,
                        "skipping case"
                    );
                    continue;
                }
            };

            // The hand-authored literal guards against reference-renderer
            // regressions. It does not override the captured output.
            if let Some(literal) = &scenario.expected {
                if literal != &rendered {
                    warn!(
                        model = model_id,
                        scenario = scenario.description.as_str(),
                        "reference output diverges from hand-authored literal"
                    );
                }
            }

            cases.push(CaseResult {
                description: scenario.description.clone(),
                messages: scenario.messages.clone(),
                add_generation_prompt: scenario.add_generation_prompt,
                tools: scenario.tools.clone(),
                extra_context: scenario.extra_context.clone(),
                expected: rendered,
            });
        }

        debug!(
            model = model_id,
            cases = cases.len(),
            scenarios = catalog.len(),
            "model fixture captured"
        );
        corpus.insert(
            model_id,
            FixtureRecord {
                template: resolved.template,
                special_tokens: resolved.special_tokens,
                cases,
            },
        );
    }
    Ok(corpus)
}

/// Write the corpus as pretty-printed UTF-8 JSON, atomically.
///
/// The document is staged in a temp file next to the target and renamed
/// into place, so a failure mid-write never leaves a partial corpus.
pub fn write_corpus(path: &Path, corpus: &Corpus) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    if !parent.as_os_str().is_empty() {
        std::fs::create_dir_all(parent)?;
    }

    let mut contents = serde_json::to_string_pretty(corpus)?;
    contents.push('\n');

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

/// Load a previously written corpus.
pub fn load_corpus(path: &Path) -> Result<Corpus> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}
