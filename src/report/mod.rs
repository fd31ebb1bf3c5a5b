//! Final report rendering.
//!
//! The layout is fixed: header, then five numbered sections (vision and
//! strategy system, diagnosis, SWOT, action ideas, roadmap). Markdown and HTML
//! share the section order and the text helpers below; the HTML output wraps
//! everything in `<div id="final-report-content">` so exporters can address
//! the report subtree directly.

mod html;
mod markdown;

use crate::document::WorkshopDocument;
use std::fmt;
use std::str::FromStr;

pub const REPORT_TITLE: &str = "ESG 경영 중장기 발전계획";
/// Element id of the HTML report root.
pub const REPORT_ROOT_ID: &str = "final-report-content";
/// Items shown per SWOT bucket.
pub const SWOT_ITEMS_SHOWN: usize = 5;

const NO_TEAM: &str = "(모둠명 미입력)";
const NO_STRATEGY: &str = "(전략 미입력)";
const SECTION_TITLES: [&str; 5] = [
    "1. 비전 및 전략체계",
    "2. 진단 결과 및 발전계획 제언",
    "3. SWOT 분석",
    "4. ESG 실천 아이디어",
    "5. 중장기 추진 과제",
];
const ANALYSIS_HEADING: &str = "중장기 발전계획 수립을 위한 AI 제언";
const TABLE_HEADING: &str = "상세 진단 결과 (4.0 만점 기준)";
const TABLE_COLUMNS: [&str; 6] = ["영역", "코드", "중분류", "진단지표", "점수", "상태"];
const IDEA_COLUMNS: [&str; 4] = ["구분", "As-Is", "To-Be", "Idea"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReportFormat {
    #[default]
    Markdown,
    Html,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Markdown => "markdown",
            ReportFormat::Html => "html",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Markdown => "md",
            ReportFormat::Html => "html",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            "html" | "htm" => Ok(ReportFormat::Html),
            other => Err(format!("unknown report format: {other} (expected markdown or html)")),
        }
    }
}

/// Render the whole document. `date` is printed under the team name.
pub fn render(document: &WorkshopDocument, format: ReportFormat, date: &str) -> String {
    match format {
        ReportFormat::Markdown => markdown::render(document, date),
        ReportFormat::Html => html::render(document, date),
    }
}

/// Suggested output file name, e.g. `ESG_Report_1모둠.html`.
pub fn default_file_name(document: &WorkshopDocument, format: ReportFormat) -> String {
    let team = document.team_name.trim();
    let team = if team.is_empty() { "Team" } else { team };
    let safe: String = team
        .chars()
        .map(|ch| if ch.is_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect();
    format!("ESG_Report_{safe}.{}", format.extension())
}

fn team_label(document: &WorkshopDocument) -> &str {
    let team = document.team_name.trim();
    if team.is_empty() {
        NO_TEAM
    } else {
        team
    }
}

fn or_dash(text: &str) -> &str {
    let text = text.trim();
    if text.is_empty() {
        "-"
    } else {
        text
    }
}

fn strategy_or_placeholder(text: &str) -> &str {
    let text = text.trim();
    if text.is_empty() {
        NO_STRATEGY
    } else {
        text
    }
}
