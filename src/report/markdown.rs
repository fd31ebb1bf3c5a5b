use super::*;
use crate::catalog::{Category, RoadmapPhase, INDICATORS};
use crate::document::SwotBucket;
use crate::gateway::extract::html_to_text;
use crate::roadmap;
use crate::score::indicator_status;

pub(super) fn render(document: &WorkshopDocument, date: &str) -> String {
    let mut out = String::new();
    append_header(&mut out, document, date);
    append_strategy_section(&mut out, document);
    append_diagnosis_section(&mut out, document);
    append_swot_section(&mut out, document);
    append_ideas_section(&mut out, document);
    append_roadmap_section(&mut out, document);
    out
}

fn append_header(out: &mut String, document: &WorkshopDocument, date: &str) {
    out.push_str(&format!("# {REPORT_TITLE}\n\n"));
    out.push_str(&format!("작성 모둠: {}  \n", team_label(document)));
    out.push_str(&format!("{date}\n\n"));
}

fn append_strategy_section(out: &mut String, document: &WorkshopDocument) {
    let strategy = &document.strategy;
    out.push_str(&format!("## {}\n\n", SECTION_TITLES[0]));
    out.push_str(&format!("**Mission**: {}\n\n", or_dash(&strategy.mission)));
    out.push_str(&format!("**Vision**: \"{}\"\n\n", or_dash(&strategy.vision)));
    for category in Category::ALL {
        let item = strategy.strategies.get(category);
        out.push_str(&format!(
            "### {}({}) 전략: {}\n\n",
            category.label(),
            category.code(),
            strategy_or_placeholder(&item.strategy)
        ));
        for task in &item.tasks {
            out.push_str(&format!("- {}\n", or_dash(task)));
        }
        out.push('\n');
    }
}

fn append_diagnosis_section(out: &mut String, document: &WorkshopDocument) {
    let diagnosis = &document.diagnosis;
    out.push_str(&format!("## {}\n\n", SECTION_TITLES[1]));
    for category in Category::ALL {
        out.push_str(&format!(
            "- {} ({}): {} / 100\n",
            category.label(),
            category.code(),
            diagnosis.category_score(category)
        ));
    }
    out.push('\n');

    if !document.diagnosis_analysis.trim().is_empty() {
        out.push_str(&format!("### {ANALYSIS_HEADING}\n\n"));
        out.push_str(&html_to_text(&document.diagnosis_analysis));
        out.push_str("\n\n");
    }

    out.push_str(&format!("### {TABLE_HEADING}\n\n"));
    out.push_str(&table_row(&TABLE_COLUMNS));
    out.push_str(&table_row(&["---"; 6]));
    for indicator in INDICATORS.iter() {
        let score = diagnosis.details.get(indicator.key);
        let shown = format!("{score:.1}");
        out.push_str(&table_row(&[
            indicator.category().label(),
            indicator.code,
            indicator.group,
            indicator.label,
            shown.as_str(),
            indicator_status(score),
        ]));
    }
    out.push('\n');
}

fn append_swot_section(out: &mut String, document: &WorkshopDocument) {
    out.push_str(&format!("## {}\n\n", SECTION_TITLES[2]));
    for bucket in SwotBucket::ALL {
        out.push_str(&format!("**{}**\n\n", bucket.report_label()));
        for item in document.swot.bucket(bucket).iter().take(SWOT_ITEMS_SHOWN) {
            out.push_str(&format!("- {}\n", item.text.trim()));
        }
        out.push('\n');
    }
}

fn append_ideas_section(out: &mut String, document: &WorkshopDocument) {
    out.push_str(&format!("## {}\n\n", SECTION_TITLES[3]));
    out.push_str(&table_row(&IDEA_COLUMNS));
    out.push_str(&table_row(&["---"; 4]));
    for category in Category::ALL {
        let row = document.action_ideas.get(category);
        let name = format!("{}({})", category.label(), category.code());
        out.push_str(&table_row(&[
            name.as_str(),
            row.as_is.as_str(),
            row.to_be.as_str(),
            row.idea.as_str(),
        ]));
    }
    out.push('\n');
}

fn append_roadmap_section(out: &mut String, document: &WorkshopDocument) {
    out.push_str(&format!("## {}\n\n", SECTION_TITLES[4]));
    let mut header = vec!["영역"];
    header.extend(RoadmapPhase::ALL.iter().map(|phase| phase.label()));
    out.push_str(&table_row(&header));
    out.push_str(&table_row(&["---"; 4]));
    for category in Category::ALL {
        let cells: Vec<String> = RoadmapPhase::ALL
            .iter()
            .map(|phase| roadmap_cell(document, category, *phase))
            .collect();
        let mut row = vec![category.code()];
        row.extend(cells.iter().map(String::as_str));
        out.push_str(&table_row(&row));
    }
}

fn roadmap_cell(document: &WorkshopDocument, category: Category, phase: RoadmapPhase) -> String {
    let mut lines = Vec::new();
    if let Some(goal) = roadmap::goal_for(&document.roadmap_goals, category, phase) {
        if !goal.trim().is_empty() {
            lines.push(format!("**{}**", goal.trim()));
        }
    }
    lines.extend(
        roadmap::tasks_in(&document.roadmap, category, phase)
            .map(|task| format!("• {}", task.task.trim())),
    );
    lines.join("<br>")
}

fn table_row(cells: &[&str]) -> String {
    let cells: Vec<String> = cells.iter().map(|cell| escape_cell(cell)).collect();
    format!("| {} |\n", cells.join(" | "))
}

fn escape_cell(text: &str) -> String {
    let mut out = String::new();
    for (idx, line) in text.trim().lines().enumerate() {
        if idx > 0 {
            out.push_str("<br>");
        }
        out.push_str(&line.replace('|', "\\|"));
    }
    out
}
