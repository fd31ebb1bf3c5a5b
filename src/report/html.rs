use super::*;
use crate::catalog::{Category, RoadmapPhase, INDICATORS};
use crate::document::SwotBucket;
use crate::roadmap;
use crate::score::indicator_status;

pub(super) fn render(document: &WorkshopDocument, date: &str) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html lang=\"ko\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str(&format!(
        "<title>{} - {}</title>\n</head>\n<body>\n",
        escape_text(REPORT_TITLE),
        escape_text(team_label(document))
    ));
    out.push_str(&format!("<div id=\"{REPORT_ROOT_ID}\">\n"));
    append_header(&mut out, document, date);
    append_strategy_section(&mut out, document);
    append_diagnosis_section(&mut out, document);
    append_swot_section(&mut out, document);
    append_ideas_section(&mut out, document);
    append_roadmap_section(&mut out, document);
    out.push_str("</div>\n</body>\n</html>\n");
    out
}

fn append_header(out: &mut String, document: &WorkshopDocument, date: &str) {
    out.push_str("<header>\n");
    out.push_str(&format!("<h1>{}</h1>\n", escape_text(REPORT_TITLE)));
    out.push_str(&format!(
        "<p>작성 모둠: {}</p>\n",
        escape_text(team_label(document))
    ));
    out.push_str(&format!("<p>{}</p>\n", escape_text(date)));
    out.push_str("</header>\n");
}

fn append_strategy_section(out: &mut String, document: &WorkshopDocument) {
    let strategy = &document.strategy;
    out.push_str(&format!("<section>\n<h2>{}</h2>\n", SECTION_TITLES[0]));
    out.push_str(&format!(
        "<p><strong>Mission</strong> {}</p>\n",
        escape_text(or_dash(&strategy.mission))
    ));
    out.push_str(&format!(
        "<p><strong>Vision</strong> &quot;{}&quot;</p>\n",
        escape_text(or_dash(&strategy.vision))
    ));
    for category in Category::ALL {
        let item = strategy.strategies.get(category);
        out.push_str(&format!(
            "<div class=\"strategy-{}\">\n<h3>{}({}) 전략</h3>\n<p><strong>{}</strong></p>\n<ul>\n",
            category.field_name(),
            category.label(),
            category.code(),
            escape_text(strategy_or_placeholder(&item.strategy))
        ));
        for task in &item.tasks {
            out.push_str(&format!("<li>{}</li>\n", escape_text(or_dash(task))));
        }
        out.push_str("</ul>\n</div>\n");
    }
    out.push_str("</section>\n");
}

fn append_diagnosis_section(out: &mut String, document: &WorkshopDocument) {
    let diagnosis = &document.diagnosis;
    out.push_str(&format!("<section>\n<h2>{}</h2>\n<ul>\n", SECTION_TITLES[1]));
    for category in Category::ALL {
        out.push_str(&format!(
            "<li>{} ({}): {} / 100</li>\n",
            category.label(),
            category.code(),
            diagnosis.category_score(category)
        ));
    }
    out.push_str("</ul>\n");

    if !document.diagnosis_analysis.trim().is_empty() {
        // The analysis is an HTML fragment already cleaned at the gateway.
        out.push_str(&format!(
            "<div class=\"analysis\">\n<h3>{ANALYSIS_HEADING}</h3>\n{}\n</div>\n",
            document.diagnosis_analysis.trim()
        ));
    }

    out.push_str(&format!("<h3>{TABLE_HEADING}</h3>\n<table>\n<thead>\n"));
    out.push_str(&header_row(&TABLE_COLUMNS));
    out.push_str("</thead>\n<tbody>\n");
    for indicator in INDICATORS.iter() {
        let score = diagnosis.details.get(indicator.key);
        let shown = format!("{score:.1}");
        out.push_str(&data_row(&[
            indicator.category().label(),
            indicator.code,
            indicator.group,
            indicator.label,
            shown.as_str(),
            indicator_status(score),
        ]));
    }
    out.push_str("</tbody>\n</table>\n</section>\n");
}

fn append_swot_section(out: &mut String, document: &WorkshopDocument) {
    out.push_str(&format!("<section>\n<h2>{}</h2>\n", SECTION_TITLES[2]));
    for bucket in SwotBucket::ALL {
        out.push_str(&format!(
            "<div class=\"swot-{}\">\n<strong>{}</strong>\n<ul>\n",
            bucket.field_name(),
            bucket.report_label()
        ));
        for item in document.swot.bucket(bucket).iter().take(SWOT_ITEMS_SHOWN) {
            out.push_str(&format!("<li>{}</li>\n", escape_text(item.text.trim())));
        }
        out.push_str("</ul>\n</div>\n");
    }
    out.push_str("</section>\n");
}

fn append_ideas_section(out: &mut String, document: &WorkshopDocument) {
    out.push_str(&format!("<section>\n<h2>{}</h2>\n<table>\n<thead>\n", SECTION_TITLES[3]));
    out.push_str(&header_row(&IDEA_COLUMNS));
    out.push_str("</thead>\n<tbody>\n");
    for category in Category::ALL {
        let row = document.action_ideas.get(category);
        let name = format!("{}({})", category.label(), category.code());
        out.push_str(&data_row(&[
            name.as_str(),
            row.as_is.as_str(),
            row.to_be.as_str(),
            row.idea.as_str(),
        ]));
    }
    out.push_str("</tbody>\n</table>\n</section>\n");
}

fn append_roadmap_section(out: &mut String, document: &WorkshopDocument) {
    out.push_str(&format!("<section>\n<h2>{}</h2>\n<table>\n<thead>\n", SECTION_TITLES[4]));
    let mut header = vec!["영역"];
    header.extend(RoadmapPhase::ALL.iter().map(|phase| phase.label()));
    out.push_str(&header_row(&header));
    out.push_str("</thead>\n<tbody>\n");
    for category in Category::ALL {
        out.push_str(&format!("<tr>\n<td>{}</td>\n", category.code()));
        for phase in RoadmapPhase::ALL {
            out.push_str("<td>\n");
            if let Some(goal) = roadmap::goal_for(&document.roadmap_goals, category, phase) {
                if !goal.trim().is_empty() {
                    out.push_str(&format!("<p><strong>{}</strong></p>\n", escape_text(goal.trim())));
                }
            }
            out.push_str("<ul>\n");
            for task in roadmap::tasks_in(&document.roadmap, category, phase) {
                out.push_str(&format!("<li>{}</li>\n", escape_text(task.task.trim())));
            }
            out.push_str("</ul>\n</td>\n");
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</tbody>\n</table>\n</section>\n");
}

fn header_row(cells: &[&str]) -> String {
    let cells: String = cells
        .iter()
        .map(|cell| format!("<th>{}</th>", escape_text(cell)))
        .collect();
    format!("<tr>{cells}</tr>\n")
}

fn data_row(cells: &[&str]) -> String {
    let cells: String = cells
        .iter()
        .map(|cell| format!("<td>{}</td>", escape_text(cell.trim()).replace('\n', "<br>")))
        .collect();
    format!("<tr>{cells}</tr>\n")
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::super::tests::sample_document;
    use super::*;

    #[test]
    fn report_is_wrapped_in_addressable_root() {
        let out = render(&sample_document(), "d");
        let open = out.find("<div id=\"final-report-content\">").unwrap();
        let title = out.find(REPORT_TITLE).unwrap();
        let roadmap = out.find(SECTION_TITLES[4]).unwrap();
        assert!(out.find("<title>").unwrap() < open);
        assert!(open < out.rfind("<h1>").unwrap());
        assert!(roadmap > open);
        assert!(title > 0);
        assert!(out.trim_end().ends_with("</div>\n</body>\n</html>"));
    }

    #[test]
    fn user_text_is_escaped_but_analysis_is_kept() {
        let mut doc = sample_document();
        doc.action_ideas.environment.idea = "<script>alert(1)</script>".into();
        let out = render(&doc, "d");
        assert!(out.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(out.contains("<h3>1. 종합 평가</h3><p>양호</p>"));
        assert!(out.contains("<td>4.0</td><td>양호</td>"));
    }

    #[test]
    fn swot_shows_first_five() {
        let out = render(&sample_document(), "d");
        assert!(out.contains("<li>강점0</li>"));
        assert!(out.contains("<li>강점4</li>"));
        assert!(!out.contains("강점5"));
    }
}
