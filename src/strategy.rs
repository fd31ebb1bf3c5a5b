//! Strategy candidates: sanitizing gateway text and applying a chosen bundle.
//!
//! A candidate always replaces all three categories in one update. The
//! overwrite is destructive, so application takes a [`Confirmation`] that only
//! a [`Confirm`] implementation can hand out.
use crate::catalog::Category;
use crate::document::{
    StrategyCandidate, StrategyData, StrategyGroup, StrategyItem, TASKS_PER_STRATEGY,
};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::LazyLock;

/// Asks the user to approve a destructive action.
pub trait Confirm {
    /// Return `true` only on explicit approval.
    fn confirm(&mut self, question: &str) -> bool;
}

/// Proof that the user approved a destructive action.
#[derive(Debug)]
pub struct Confirmation(());

impl Confirmation {
    /// Ask `confirm`; `None` when the user declines.
    pub fn request(confirm: &mut dyn Confirm, question: &str) -> Option<Confirmation> {
        if confirm.confirm(question) {
            Some(Confirmation(()))
        } else {
            tracing::debug!(question, "confirmation declined");
            None
        }
    }
}

static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d+\.\s*|-\s*|•\s*)").expect("static regex"));

/// Strip list markers (`1. `, `- `, `• `), `**` emphasis and surrounding quotes.
pub fn sanitize_entry(raw: &str) -> String {
    let mut text = LIST_MARKER.replace(raw, "").into_owned();
    if let Some(stripped) = text.strip_prefix("**") {
        text = stripped.to_string();
    }
    if let Some(stripped) = text.strip_suffix("**") {
        text = stripped.to_string();
    }
    if let Some(stripped) = text.strip_prefix('"') {
        text = stripped.to_string();
    }
    if let Some(stripped) = text.strip_suffix('"') {
        text = stripped.to_string();
    }
    text.trim().to_string()
}

/// Exactly five tasks: truncate extras, pad with empty strings.
pub fn prepare_tasks<I, S>(tasks: I, clean: fn(&str) -> String) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut prepared: Vec<String> = tasks
        .into_iter()
        .take(TASKS_PER_STRATEGY)
        .map(|task| clean(task.as_ref()))
        .collect();
    prepared.resize(TASKS_PER_STRATEGY, String::new());
    prepared
}

pub(crate) fn trimmed(raw: &str) -> String {
    raw.trim().to_string()
}

fn sanitize_item(item: &StrategyItem) -> StrategyItem {
    StrategyItem {
        strategy: sanitize_entry(&item.strategy),
        tasks: prepare_tasks(&item.tasks, sanitize_entry),
    }
}

/// Build the sanitized strategy group a candidate would install.
pub fn candidate_strategies(candidate: &StrategyCandidate) -> StrategyGroup {
    StrategyGroup {
        environment: sanitize_item(candidate.get(Category::Environment)),
        social: sanitize_item(candidate.get(Category::Social)),
        governance: sanitize_item(candidate.get(Category::Governance)),
    }
}

/// Replace every category's strategy with the candidate's, keeping mission,
/// vision and the candidate list.
pub fn apply_candidate(
    data: &StrategyData,
    candidate: &StrategyCandidate,
    _confirmed: Confirmation,
) -> StrategyData {
    StrategyData {
        strategies: candidate_strategies(candidate),
        ..data.clone()
    }
}

/// The question shown before applying a candidate.
pub fn apply_question(candidate: &StrategyCandidate) -> String {
    let name = if candidate.version_name.trim().is_empty() {
        "선택한 전략"
    } else {
        candidate.version_name.trim()
    };
    format!("[{name}] 내용을 적용하시겠습니까? 기존 추진 전략 및 과제는 삭제되고 선택한 내용으로 대체됩니다.")
}

/// Strategy table extracted from an uploaded file.
///
/// Kept loose: the file may omit categories or carry non-string tasks.
#[derive(Debug, Clone, Deserialize)]
pub struct StrategyImport {
    pub strategies: Value,
}

fn imported_item(value: Option<&Value>) -> StrategyItem {
    let strategy = value
        .and_then(|item| item.get("strategy"))
        .and_then(Value::as_str)
        .map(trimmed)
        .unwrap_or_default();
    let tasks: Vec<String> = value
        .and_then(|item| item.get("tasks"))
        .and_then(Value::as_array)
        .map(|tasks| {
            tasks
                .iter()
                .map(|task| match task {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default();
    StrategyItem {
        strategy,
        tasks: prepare_tasks(&tasks, trimmed),
    }
}

/// Install an imported strategy table; mission and vision are never taken from files.
pub fn apply_import(data: &StrategyData, import: &StrategyImport) -> StrategyData {
    let strategies = &import.strategies;
    StrategyData {
        strategies: StrategyGroup {
            environment: imported_item(strategies.get("environment")),
            social: imported_item(strategies.get("social")),
            governance: imported_item(strategies.get("governance")),
        },
        ..data.clone()
    }
}

/// Vision suggestions arrive quoted; store them without double quotes.
pub fn clean_vision(raw: &str) -> String {
    raw.replace('"', "").trim().to_string()
}

/// Text form of the current strategy group, used as roadmap-prompt context.
pub fn strategy_text(data: &StrategyData) -> String {
    let mut text = String::new();
    if !data.mission.trim().is_empty() {
        text.push_str(&format!("Mission: {}\n", data.mission.trim()));
    }
    if !data.vision.trim().is_empty() {
        text.push_str(&format!("Vision: {}\n", data.vision.trim()));
    }
    for category in Category::ALL {
        let item = data.strategies.get(category);
        if item.strategy.trim().is_empty() && item.tasks.iter().all(|t| t.trim().is_empty()) {
            continue;
        }
        text.push_str(&format!("[{}] {}\n", category.code(), item.strategy.trim()));
        for task in item.tasks.iter().filter(|t| !t.trim().is_empty()) {
            text.push_str(&format!("- {}\n", task.trim()));
        }
    }
    text
}
