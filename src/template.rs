//! CSV templates for per-stage file upload, and MIME detection for uploads.
use crate::catalog::{Category, RoadmapPhase, INDICATORS};
use crate::document::TASKS_PER_STRATEGY;
use crate::stage::Stage;
use std::path::Path;

/// UTF-8 byte order mark; spreadsheet tools need it to read Korean CSV.
pub const BOM: &str = "\u{feff}";

/// CSV template for `stage`; `None` for the report stage.
pub fn csv_template(stage: Stage) -> Option<String> {
    let rows = match stage {
        Stage::Diagnosis => diagnosis_rows(),
        Stage::Swot => vec![
            "Type,Content".to_string(),
            "Strength,Internal strength example".to_string(),
            "Weakness,Internal weakness example".to_string(),
            "Opportunity,External opportunity example".to_string(),
            "Threat,External threat example".to_string(),
        ],
        Stage::Strategy => strategy_rows(),
        Stage::ActionIdeas => {
            let mut rows = vec!["Category,As-Is (Current),To-Be (Future),Idea".to_string()];
            rows.extend(["Environment", "Social", "Governance"].iter().map(|name| {
                format!("{name},Current status...,Future goal...,Action idea...")
            }));
            rows
        }
        Stage::Roadmap => {
            let examples = [
                (RoadmapPhase::Introduction, Category::Environment, "Paperless System"),
                (RoadmapPhase::Expansion, Category::Social, "Community Partnership"),
                (RoadmapPhase::Consolidation, Category::Governance, "Ethics Committee"),
            ];
            let mut rows = vec!["Year,Category (E/S/G),Task".to_string()];
            rows.extend(
                examples
                    .iter()
                    .map(|(phase, category, task)| format!("{},{},{task}", phase.label(), category.code())),
            );
            rows
        }
        Stage::Report => return None,
    };
    Some(rows.join("\n"))
}

/// Template text as written to disk, optionally BOM-prefixed.
pub fn render_template(stage: Stage, bom: bool) -> Option<String> {
    csv_template(stage).map(|body| if bom { format!("{BOM}{body}") } else { body })
}

/// File name used for a saved template, e.g. `template_action_ideas.csv`.
pub fn template_file_name(stage: Stage) -> String {
    format!("template_{}.csv", stage.as_str())
}

fn diagnosis_rows() -> Vec<String> {
    let mut rows = vec!["Code,Score(0.0-4.0)".to_string()];
    rows.extend(INDICATORS.iter().map(|indicator| format!("{},0.0", indicator.code)));
    rows
}

fn strategy_rows() -> Vec<String> {
    let names: Vec<&str> = Category::ALL.iter().map(|category| category.label()).collect();
    let mut rows = vec!["구분,환경 (Environment),사회 (Social),지배구조 (Governance)".to_string()];
    rows.push(format!(
        "추진 전략,{}",
        names
            .iter()
            .map(|name| format!("{name} 추진전략 입력"))
            .collect::<Vec<_>>()
            .join(",")
    ));
    for n in 1..=TASKS_PER_STRATEGY {
        rows.push(format!(
            "추진 과제 {n},{}",
            names
                .iter()
                .map(|name| format!("{name} 과제 {n}"))
                .collect::<Vec<_>>()
                .join(",")
        ));
    }
    rows
}

/// MIME type for an uploaded file, from its extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => "text/csv",
        "txt" | "md" => "text/plain",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}
