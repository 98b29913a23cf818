//! End-to-end fixture generation: determinism, omission, isolation, and
//! on-disk persistence of the corpus.

mod common;

use pretty_assertions::assert_eq;

use chatgold::catalog::ScenarioCatalog;
use chatgold::store::{generate, load_corpus, write_corpus};

use common::{fixed_date, ModelStyle, StubSource, CHATML_TEMPLATE};

fn catalog() -> ScenarioCatalog {
    ScenarioCatalog::for_date(fixed_date())
}

#[test]
fn generates_one_record_per_resolvable_model() {
    let source = StubSource::chatml(&["acme/chat-7b", "acme/chat-72b"]);
    let catalog = catalog();
    let corpus = generate(&["acme/chat-7b", "acme/chat-72b"], &catalog, &source).unwrap();

    assert_eq!(corpus.len(), 2);
    for (_, record) in corpus.iter() {
        assert_eq!(record.template, CHATML_TEMPLATE);
        assert_eq!(record.special_tokens.eos_token, "<|im_end|>");
        assert_eq!(record.cases.len(), catalog.len());
    }
}

#[test]
fn corpus_keys_follow_input_order() {
    let source = StubSource::chatml(&["zeta/z", "alpha/a"]);
    let corpus = generate(&["zeta/z", "alpha/a"], &catalog(), &source).unwrap();
    let ids: Vec<&str> = corpus.iter().map(|(id, _)| id).collect();
    assert_eq!(ids, ["zeta/z", "alpha/a"]);
}

#[test]
fn unresolvable_model_is_absent_not_empty() {
    let source = StubSource::chatml(&["acme/known"]);
    let corpus = generate(&["acme/known", "acme/missing"], &catalog(), &source).unwrap();
    assert!(corpus.contains("acme/known"));
    assert!(!corpus.contains("acme/missing"));
    let json = serde_json::to_value(&corpus).unwrap();
    assert!(json.get("acme/missing").is_none());
}

#[test]
fn render_failures_for_one_model_do_not_leak_into_another() {
    let source = StubSource::new(vec![
        ("acme/toolless", ModelStyle::Toolless),
        ("acme/full", ModelStyle::ChatMl),
    ]);
    let catalog = catalog();
    let corpus = generate(&["acme/toolless", "acme/full"], &catalog, &source).unwrap();

    let full = corpus.get("acme/full").unwrap();
    assert_eq!(full.cases.len(), catalog.len());

    let toolless = corpus.get("acme/toolless").unwrap();
    let descriptions: Vec<&str> = toolless
        .cases
        .iter()
        .map(|c| c.description.as_str())
        .collect();
    // Tool scenarios fall out, everything else survives in catalog order.
    assert_eq!(
        descriptions,
        [
            "basic_user",
            "system_user_assistant",
            "consecutive_users",
            "gen_prompt_true",
            "gen_prompt_false",
            "disable_thinking",
            "reasoning_content",
            "date_injection_sim",
        ]
    );
}

#[test]
fn same_day_runs_are_byte_identical() {
    let source = StubSource::chatml(&["acme/chat-7b"]);
    let catalog = catalog();
    let a = generate(&["acme/chat-7b"], &catalog, &source).unwrap();
    let b = generate(&["acme/chat-7b"], &catalog, &source).unwrap();
    assert_eq!(
        serde_json::to_string_pretty(&a).unwrap(),
        serde_json::to_string_pretty(&b).unwrap()
    );
}

#[test]
fn thinking_disabled_case_captures_the_pinned_literal() {
    let source = StubSource::chatml(&["acme/chat-7b"]);
    let corpus = generate(&["acme/chat-7b"], &catalog(), &source).unwrap();
    let record = corpus.get("acme/chat-7b").unwrap();
    let case = record
        .cases
        .iter()
        .find(|c| c.description == "disable_thinking")
        .unwrap();
    assert_eq!(
        case.expected,
        "<|im_start|>user\nHello<|im_end|>\n<|im_start|>assistant\n<think>\n\n</think>\n\n"
    );
    // The replay inputs must carry the flag that produced this output.
    let extra = case.extra_context.as_ref().unwrap();
    assert_eq!(extra["enable_thinking"], serde_json::Value::Bool(false));
}

#[test]
fn generation_prompt_only_changes_the_trailing_suffix() {
    let source = StubSource::chatml(&["acme/chat-7b"]);
    let corpus = generate(&["acme/chat-7b"], &catalog(), &source).unwrap();
    let record = corpus.get("acme/chat-7b").unwrap();
    let on = &record
        .cases
        .iter()
        .find(|c| c.description == "gen_prompt_true")
        .unwrap()
        .expected;
    let off = &record
        .cases
        .iter()
        .find(|c| c.description == "gen_prompt_false")
        .unwrap()
        .expected;
    assert_eq!(on.as_str(), format!("{off}<|im_start|>assistant\n"));
}

#[test]
fn consecutive_user_turns_stay_separate_and_ordered() {
    let source = StubSource::chatml(&["acme/chat-7b"]);
    let corpus = generate(&["acme/chat-7b"], &catalog(), &source).unwrap();
    let case = corpus
        .get("acme/chat-7b")
        .unwrap()
        .cases
        .iter()
        .find(|c| c.description == "consecutive_users")
        .unwrap();
    assert_eq!(
        case.expected,
        "<|im_start|>user\nPart 1<|im_end|>\n<|im_start|>user\nPart 2<|im_end|>\n"
    );
}

#[test]
fn parallel_tool_results_stay_correlated_in_source_order() {
    let source = StubSource::chatml(&["acme/chat-7b"]);
    let corpus = generate(&["acme/chat-7b"], &catalog(), &source).unwrap();
    let case = corpus
        .get("acme/chat-7b")
        .unwrap()
        .cases
        .iter()
        .find(|c| c.description == "parallel_tool_calls")
        .unwrap();
    let first = case.expected.find("[call_1] 20C").unwrap();
    let second = case.expected.find("[call_2] 15C").unwrap();
    assert!(first < second, "results must keep source order");
}

#[test]
fn corpus_round_trips_through_disk() {
    let source = StubSource::chatml(&["acme/chat-7b", "acme/chat-72b"]);
    let corpus = generate(&["acme/chat-7b", "acme/chat-72b"], &catalog(), &source).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fixtures").join("chat_templates.json");
    write_corpus(&path, &corpus).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.ends_with('\n'));
    assert!(contents.contains("  \"template\""), "must be pretty-printed");

    let loaded = load_corpus(&path).unwrap();
    assert_eq!(loaded, corpus);
}

#[test]
fn failed_write_leaves_no_partial_file() {
    let source = StubSource::chatml(&["acme/chat-7b"]);
    let corpus = generate(&["acme/chat-7b"], &catalog(), &source).unwrap();

    let dir = tempfile::tempdir().unwrap();
    // Occupy the target path with a directory so the final rename fails.
    let path = dir.path().join("corpus.json");
    std::fs::create_dir(&path).unwrap();

    write_corpus(&path, &corpus).unwrap_err();

    assert!(path.is_dir(), "target must be untouched");
    let stray: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(stray.len(), 1, "no temp file may survive: {stray:?}");
}

#[test]
fn malformed_catalog_halts_before_any_generation() {
    struct PanickingSource;
    impl chatgold::renderer::TemplateSource for PanickingSource {
        fn resolve(
            &self,
            _: &str,
        ) -> Result<chatgold::renderer::ResolvedModel, chatgold::renderer::ResolveError> {
            panic!("resolution must never start under a schema violation");
        }
    }

    // An empty-messages scenario is a catalog-authoring error.
    let catalog = ScenarioCatalog::from_scenarios(vec![chatgold::Scenario {
        description: "empty".into(),
        messages: Vec::new(),
        tools: None,
        add_generation_prompt: false,
        extra_context: None,
        expected: None,
        note: None,
    }]);

    let err = generate(&["acme/chat-7b"], &catalog, &PanickingSource).unwrap_err();
    assert!(matches!(err, chatgold::Error::Schema(_)), "{err}");
}
