//! Enrichment gateway: typed LM operations over a pluggable backend.
//!
//! Each operation renders a prompt template, sends it through an
//! [`LmBackend`], and converts the reply into a domain value. Replies are
//! never trusted: JSON is pulled out of conversational wrapping by
//! [`extract::extract_json`], and structured replies must have exactly the
//! expected shape or the whole call fails with [`GatewayError::Shape`].
//!
//! # Prompt templates
//!
//! Prompts live in `prompts/*.md` and are compiled in. Placeholders use
//! `{name}` and are substituted with `str::replace`.

pub mod backend;
pub mod extract;

use crate::catalog::{Category, RoadmapPhase, INDICATORS};
use crate::document::{DiagnosisDetails, StrategyCandidate, SwotAnalysisResult, SwotData};
use crate::ideas::ActionIdeasImport;
use crate::roadmap::{RoadmapDraft, RoadmapImportRow};
use crate::stage::Stage;
use crate::strategy::StrategyImport;
use crate::swot::{self, SwotImport};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

pub use backend::{CommandBackend, GeminiBackend, Unconfigured};

const DIAGNOSIS_ANALYSIS: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/diagnosis_analysis.md"
));
const SWOT_SUGGESTIONS: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/swot_suggestions.md"
));
const IDEA_SUGGESTIONS: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/idea_suggestions.md"
));
const VISION_SUGGESTION: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/vision_suggestion.md"
));
const SWOT_MATRIX: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/swot_matrix.md"
));
const STRATEGY_CANDIDATES: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/strategy_candidates.md"
));
const ROADMAP: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/prompts/roadmap.md"));
const EXTRACT_TEXT: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/file_extract_text.md"
));
const EXTRACT_DIAGNOSIS: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/file_extract_diagnosis.md"
));
const EXTRACT_SWOT: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/file_extract_swot.md"
));
const EXTRACT_STRATEGY: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/file_extract_strategy.md"
));
const EXTRACT_ACTION_IDEAS: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/file_extract_action_ideas.md"
));
const EXTRACT_ROADMAP: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/file_extract_roadmap.md"
));

/// Number of records a generated roadmap must contain (3 categories x 3 phases).
pub const ROADMAP_RECORDS: usize = 9;

/// Typed failure of a gateway call. Never mutates the document.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no LM backend configured (set --lm, ESGW_LM_COMMAND or GEMINI_API_KEY)")]
    NotConfigured,
    #[error("LM invocation failed: {0}")]
    Invocation(String),
    #[error("LM returned an empty response")]
    Empty,
    #[error("LM response is not valid JSON: {0}")]
    Malformed(String),
    #[error("LM response has an unexpected shape: {0}")]
    Shape(String),
    #[error("file extraction is not available for the {0} stage")]
    UnsupportedStage(Stage),
}

/// A file sent alongside the prompt.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

#[derive(Debug, Clone)]
pub struct LmRequest {
    pub prompt: String,
    /// Ask the backend for a JSON-only reply when it supports that.
    pub expect_json: bool,
    pub attachment: Option<Attachment>,
}

/// Transport that turns a prompt into raw response text.
pub trait LmBackend {
    fn name(&self) -> &'static str;
    fn complete(&self, request: &LmRequest) -> Result<String, GatewayError>;
}

/// How an uploaded file should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMode {
    /// Stage-shaped structured data.
    Structured,
    /// Plain text, used as prompt context.
    TextOnly,
}

/// Result of a file extraction, one variant per stage shape.
#[derive(Debug, Clone)]
pub enum FileExtract {
    Text(String),
    Diagnosis(DiagnosisDetails),
    Swot(SwotImport),
    Strategy(StrategyImport),
    ActionIdeas(ActionIdeasImport),
    Roadmap(Vec<RoadmapImportRow>),
}

/// Inputs of the strategy-candidate prompt.
#[derive(Debug, Clone, Default)]
pub struct StrategyContext {
    pub mission: String,
    pub vision: String,
    /// Diagnosis analysis; HTML tags are stripped before prompting.
    pub diagnosis: String,
    /// SWOT text: an uploaded override, or the stored matrix.
    pub swot_text: String,
}

pub struct Gateway {
    backend: Box<dyn LmBackend>,
    language: String,
}

impl Gateway {
    pub fn new(backend: Box<dyn LmBackend>, language: impl Into<String>) -> Self {
        Gateway {
            backend,
            language: language.into(),
        }
    }

    /// A gateway whose every call fails with [`GatewayError::NotConfigured`].
    #[cfg(test)]
    pub fn unconfigured() -> Self {
        Gateway::new(Box::new(Unconfigured), "Korean (한국어)")
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    fn complete_text(&self, prompt: String) -> Result<String, GatewayError> {
        let request = LmRequest {
            prompt,
            expect_json: false,
            attachment: None,
        };
        let text = self.backend.complete(&request)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(GatewayError::Empty);
        }
        Ok(text.to_string())
    }

    fn complete_json(
        &self,
        prompt: String,
        attachment: Option<Attachment>,
    ) -> Result<Value, GatewayError> {
        let request = LmRequest {
            prompt,
            expect_json: true,
            attachment,
        };
        let text = self.backend.complete(&request)?;
        extract::extract_json(&text)
    }

    /// HTML fragment evaluating the 38 indicator scores.
    pub fn diagnosis_analysis(&self, details: &DiagnosisDetails) -> Result<String, GatewayError> {
        let scores = INDICATORS
            .iter()
            .map(|ind| format!("{} ({}): {}", ind.code, ind.label, details.get(ind.key)))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = DIAGNOSIS_ANALYSIS
            .replace("{scores}", &scores)
            .replace("{language}", &self.language);
        let html = extract::clean_html_fragment(&self.complete_text(prompt)?);
        if html.is_empty() {
            return Err(GatewayError::Empty);
        }
        Ok(html)
    }

    /// Free-text bullet suggestions for the SWOT buckets.
    pub fn swot_suggestions(&self, context: &str) -> Result<String, GatewayError> {
        let prompt = SWOT_SUGGESTIONS
            .replace("{context}", context)
            .replace("{language}", &self.language);
        self.complete_text(prompt)
    }

    pub fn idea_suggestions(&self, context: &str) -> Result<String, GatewayError> {
        let prompt = IDEA_SUGGESTIONS
            .replace("{context}", context)
            .replace("{language}", &self.language);
        self.complete_text(prompt)
    }

    pub fn vision_suggestion(&self, mission: &str) -> Result<String, GatewayError> {
        let prompt = VISION_SUGGESTION
            .replace("{context}", mission)
            .replace("{language}", &self.language);
        self.complete_text(prompt)
    }

    /// Summarized SWOT plus SO/WO/ST/WT strategies.
    pub fn swot_matrix_analysis(
        &self,
        swot: &SwotData,
        diagnosis_context: &str,
    ) -> Result<SwotAnalysisResult, GatewayError> {
        let context = swot::swot_context(swot, &extract::strip_html_tags(diagnosis_context));
        let prompt = SWOT_MATRIX
            .replace("{context}", &context)
            .replace("{language}", &self.language);
        let value = self.complete_json(prompt, None)?;
        shaped(value, "SWOT analysis")
    }

    /// Alternative strategy bundles. `candidates` must be a present, non-empty array.
    pub fn strategy_candidates(
        &self,
        context: &StrategyContext,
    ) -> Result<Vec<StrategyCandidate>, GatewayError> {
        let diagnosis = extract::strip_html_tags(&context.diagnosis);
        let prompt = STRATEGY_CANDIDATES
            .replace("{mission}", &context.mission)
            .replace("{vision}", &context.vision)
            .replace("{diagnosis}", &diagnosis)
            .replace("{swot}", &context.swot_text)
            .replace("{language}", &self.language);
        let value = self.complete_json(prompt, None)?;
        let candidates = match value.get("candidates") {
            Some(Value::Array(items)) if !items.is_empty() => items.clone(),
            Some(Value::Array(_)) => return Err(GatewayError::Shape("candidates is empty".into())),
            Some(_) => return Err(GatewayError::Shape("candidates is not an array".into())),
            None => return Err(GatewayError::Shape("missing candidates".into())),
        };
        if candidates.len() != 3 {
            tracing::warn!(count = candidates.len(), "expected 3 strategy candidates");
        }
        shaped(Value::Array(candidates), "strategy candidate")
    }

    /// Goals and tasks for all nine (category, phase) pairs.
    pub fn roadmap(
        &self,
        strategy_text: &str,
        swot_text: &str,
    ) -> Result<Vec<RoadmapDraft>, GatewayError> {
        let prompt = ROADMAP
            .replace("{strategy_text}", strategy_text)
            .replace("{swot_text}", swot_text)
            .replace("{phases}", &phase_list())
            .replace("{language}", &self.language);
        let value = self.complete_json(prompt, None)?;
        let records = match value {
            Value::Array(items) => items,
            _ => return Err(GatewayError::Shape("roadmap is not an array".into())),
        };
        if records.len() != ROADMAP_RECORDS {
            return Err(GatewayError::Shape(format!(
                "roadmap has {} records, expected {ROADMAP_RECORDS}",
                records.len()
            )));
        }
        let drafts: Vec<RoadmapDraft> = shaped(Value::Array(records), "roadmap record")?;
        let pairs: BTreeSet<(&str, &str)> = drafts
            .iter()
            .map(|draft| (draft.category.code(), draft.year.label()))
            .collect();
        if pairs.len() != ROADMAP_RECORDS {
            return Err(GatewayError::Shape(
                "roadmap does not cover every category and phase".into(),
            ));
        }
        Ok(drafts)
    }

    /// Read an uploaded file as stage-shaped data or as plain text.
    pub fn file_extract(
        &self,
        attachment: Attachment,
        stage: Stage,
        mode: ExtractMode,
    ) -> Result<FileExtract, GatewayError> {
        if mode == ExtractMode::TextOnly {
            let value = self.complete_json(EXTRACT_TEXT.to_string(), Some(attachment))?;
            return match value.get("text") {
                Some(Value::String(text)) => Ok(FileExtract::Text(text.trim().to_string())),
                _ => Err(GatewayError::Shape("missing text field".into())),
            };
        }
        let prompt = match stage {
            Stage::Diagnosis => diagnosis_extract_prompt(),
            Stage::Swot => EXTRACT_SWOT.to_string(),
            Stage::Strategy => EXTRACT_STRATEGY.to_string(),
            Stage::ActionIdeas => EXTRACT_ACTION_IDEAS.to_string(),
            Stage::Roadmap => EXTRACT_ROADMAP.replace("{phases}", &phase_list()),
            Stage::Report => return Err(GatewayError::UnsupportedStage(stage)),
        };
        let value = self.complete_json(prompt, Some(attachment))?;
        match stage {
            Stage::Diagnosis => {
                let details = value
                    .get("details")
                    .and_then(Value::as_object)
                    .ok_or_else(|| GatewayError::Shape("missing details object".into()))?;
                let details: BTreeMap<String, Value> =
                    details.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                Ok(FileExtract::Diagnosis(DiagnosisDetails::from_values(&details)))
            }
            Stage::Swot => Ok(FileExtract::Swot(shaped(value, "SWOT import")?)),
            Stage::Strategy => Ok(FileExtract::Strategy(shaped(value, "strategy import")?)),
            Stage::ActionIdeas => Ok(FileExtract::ActionIdeas(shaped(value, "action ideas import")?)),
            Stage::Roadmap => roadmap_rows(value).map(FileExtract::Roadmap),
            Stage::Report => Err(GatewayError::UnsupportedStage(stage)),
        }
    }
}

fn shaped<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, GatewayError> {
    serde_json::from_value(value).map_err(|err| GatewayError::Shape(format!("{what}: {err}")))
}

fn phase_list() -> String {
    RoadmapPhase::ALL
        .iter()
        .enumerate()
        .map(|(idx, phase)| format!("- Phase {}: '{}'", idx + 1, phase.label()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn diagnosis_extract_prompt() -> String {
    let indicators = Category::ALL
        .iter()
        .map(|category| {
            let codes = INDICATORS
                .iter()
                .filter(|ind| ind.category() == *category)
                .map(|ind| ind.code)
                .collect::<Vec<_>>()
                .join(", ");
            format!("{} ({}): {codes}", category.field_name(), category.code())
        })
        .collect::<Vec<_>>()
        .join("\n");
    let keys = INDICATORS
        .iter()
        .map(|ind| format!("\"{}\": number", ind.key))
        .collect::<Vec<_>>()
        .join(", ");
    EXTRACT_DIAGNOSIS
        .replace("{indicators}", &indicators)
        .replace("{keys}", &keys)
}

/// Rows with an unknown category or phase label are skipped.
fn roadmap_rows(value: Value) -> Result<Vec<RoadmapImportRow>, GatewayError> {
    let Value::Array(items) = value else {
        return Err(GatewayError::Shape("roadmap import is not an array".into()));
    };
    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<RoadmapImportRow>(item) {
            Ok(row) => rows.push(row),
            Err(err) => tracing::warn!(error = %err, "skipping roadmap import row"),
        }
    }
    Ok(rows)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Replays canned responses and records the prompts it saw.
    #[derive(Clone, Default)]
    pub(crate) struct ScriptedBackend {
        pub responses: Rc<RefCell<VecDeque<Result<String, String>>>>,
        pub prompts: Rc<RefCell<Vec<String>>>,
    }

    impl ScriptedBackend {
        pub fn with(responses: &[&str]) -> Self {
            let backend = ScriptedBackend::default();
            for response in responses {
                backend.push(response);
            }
            backend
        }

        pub fn push(&self, response: &str) {
            self.responses.borrow_mut().push_back(Ok(response.to_string()));
        }

        pub fn push_failure(&self, reason: &str) {
            self.responses.borrow_mut().push_back(Err(reason.to_string()));
        }
    }

    impl LmBackend for ScriptedBackend {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn complete(&self, request: &LmRequest) -> Result<String, GatewayError> {
            self.prompts.borrow_mut().push(request.prompt.clone());
            match self.responses.borrow_mut().pop_front() {
                Some(Ok(text)) => Ok(text),
                Some(Err(reason)) => Err(GatewayError::Invocation(reason)),
                None => Err(GatewayError::Invocation("no scripted response".into())),
            }
        }
    }

    fn gateway(responses: &[&str]) -> Gateway {
        Gateway::new(Box::new(ScriptedBackend::with(responses)), "Korean (한국어)")
    }

    pub(crate) fn full_roadmap_json() -> String {
        let mut records = Vec::new();
        for category in ["E", "S", "G"] {
            for phase in RoadmapPhase::ALL {
                records.push(serde_json::json!({
                    "category": category,
                    "year": phase.label(),
                    "goal": format!("{category} goal"),
                    "tasks": ["t1", "t2"],
                }));
            }
        }
        Value::Array(records).to_string()
    }

    #[test]
    fn unconfigured_gateway_fails_typed() {
        let err = Gateway::unconfigured().swot_suggestions("ctx").unwrap_err();
        assert!(matches!(err, GatewayError::NotConfigured));
    }

    #[test]
    fn diagnosis_prompt_lists_all_indicators_and_cleans_html() {
        let backend = ScriptedBackend::with(&["```html\n<html><body><h3>평가</h3></body></html>```"]);
        let prompts = backend.prompts.clone();
        let gateway = Gateway::new(Box::new(backend), "Korean (한국어)");
        let html = gateway.diagnosis_analysis(&DiagnosisDetails::zeroed()).unwrap();
        assert_eq!(html, "<h3>평가</h3>");
        let prompt = prompts.borrow()[0].clone();
        assert!(prompt.contains("E1-1"));
        assert!(prompt.contains("G4-5"));
        assert!(!prompt.contains("{scores}"));
        assert!(prompt.contains("Korean (한국어)"));
    }

    #[test]
    fn swot_matrix_parses_wrapped_json() {
        let reply = r#"Sure! ```json
{"summarized": {"strengths": ["a"], "weaknesses": [], "opportunities": [], "threats": []},
 "matrix": {"so": ["k: v"], "wo": [], "st": [], "wt": []}}
``` done"#;
        let result = gateway(&[reply])
            .swot_matrix_analysis(&SwotData::default(), "")
            .unwrap();
        assert_eq!(result.summarized.strengths, ["a"]);
        assert_eq!(result.matrix.so, ["k: v"]);
    }

    #[test]
    fn strategy_candidates_require_present_array() {
        let ctx = StrategyContext::default();
        let missing = gateway(&[r#"{"options": []}"#]).strategy_candidates(&ctx);
        assert!(matches!(missing, Err(GatewayError::Shape(_))));
        let not_array = gateway(&[r#"{"candidates": {}}"#]).strategy_candidates(&ctx);
        assert!(matches!(not_array, Err(GatewayError::Shape(_))));
        let empty = gateway(&[r#"{"candidates": []}"#]).strategy_candidates(&ctx);
        assert!(matches!(empty, Err(GatewayError::Shape(_))));

        let ok = r#"{"candidates": [{"versionName": "V1",
            "environment": {"strategy": "e", "tasks": ["1"]},
            "social": {"strategy": "s", "tasks": []},
            "governance": {"strategy": "g", "tasks": []}}]}"#;
        let candidates = gateway(&[ok]).strategy_candidates(&ctx).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].version_name, "V1");
    }

    #[test]
    fn roadmap_requires_nine_distinct_pairs() {
        let drafts = gateway(&[&full_roadmap_json()]).roadmap("s", "w").unwrap();
        assert_eq!(drafts.len(), ROADMAP_RECORDS);

        let mut eight: Vec<Value> = serde_json::from_str(&full_roadmap_json()).unwrap();
        eight.pop();
        let short = gateway(&[&Value::Array(eight.clone()).to_string()]).roadmap("s", "w");
        assert!(matches!(short, Err(GatewayError::Shape(_))));

        eight.push(eight[0].clone());
        let duplicated = gateway(&[&Value::Array(eight).to_string()]).roadmap("s", "w");
        assert!(matches!(duplicated, Err(GatewayError::Shape(_))));
    }

    #[test]
    fn roadmap_rejects_unknown_phase_label() {
        let mut records: Vec<Value> = serde_json::from_str(&full_roadmap_json()).unwrap();
        records[0]["year"] = Value::String("2031년".into());
        let result = gateway(&[&Value::Array(records).to_string()]).roadmap("s", "w");
        assert!(matches!(result, Err(GatewayError::Shape(_))));
    }

    #[test]
    fn malformed_reply_is_typed() {
        let result = gateway(&["I cannot help with that."])
            .swot_matrix_analysis(&SwotData::default(), "");
        assert!(matches!(result, Err(GatewayError::Malformed(_))));
    }

    fn attachment() -> Attachment {
        Attachment {
            bytes: b"a,b".to_vec(),
            mime_type: "text/csv".into(),
        }
    }

    #[test]
    fn file_extract_diagnosis_coerces_details() {
        let reply = r#"{"environment": 80, "details": {"e1_1": "3.5", "s1_1": 2, "bogus": 4}}"#;
        let extract = gateway(&[reply])
            .file_extract(attachment(), Stage::Diagnosis, ExtractMode::Structured)
            .unwrap();
        let FileExtract::Diagnosis(details) = extract else {
            panic!("expected diagnosis extract");
        };
        assert_eq!(details.iter().count(), 38);
        assert_eq!(details.get("e1_1"), 3.5);
        assert_eq!(details.get("s1_1"), 2.0);
        assert!(!details.contains_key("bogus"));
    }

    #[test]
    fn file_extract_text_mode_and_report_stage() {
        let extract = gateway(&[r#"{"text": " 본문 "}"#])
            .file_extract(attachment(), Stage::Strategy, ExtractMode::TextOnly)
            .unwrap();
        assert!(matches!(extract, FileExtract::Text(text) if text == "본문"));

        let report = gateway(&[])
            .file_extract(attachment(), Stage::Report, ExtractMode::Structured)
            .unwrap_err();
        assert!(matches!(report, GatewayError::UnsupportedStage(Stage::Report)));
    }

    #[test]
    fn file_extract_roadmap_skips_bad_rows() {
        let reply = r#"[{"category": "E", "task": "a", "year": "도입기 (2026년)"},
                        {"category": "X", "task": "b", "year": "도입기 (2026년)"}]"#;
        let extract = gateway(&[reply])
            .file_extract(attachment(), Stage::Roadmap, ExtractMode::Structured)
            .unwrap();
        let FileExtract::Roadmap(rows) = extract else {
            panic!("expected roadmap extract");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].task, "a");
    }

    #[test]
    fn diagnosis_extract_prompt_fills_placeholders() {
        let prompt = diagnosis_extract_prompt();
        assert!(prompt.contains("\"g4_5\": number"));
        assert!(prompt.contains("{ \"details\": { \"e1_1\": number"));
        assert!(!prompt.contains("{keys}"));
    }
}
