//! Action-idea rows (as-is, to-be, idea) per ESG category.
use crate::catalog::Category;
use crate::document::{ActionIdeaData, ActionIdeaField, ActionIdeaRow};
use serde::Deserialize;

/// Set one field of one category's row.
pub fn update_field(
    data: &ActionIdeaData,
    category: Category,
    field: ActionIdeaField,
    text: &str,
) -> ActionIdeaData {
    let mut next = data.clone();
    *next.get_mut(category).field_mut(field) = text.to_string();
    next
}

/// Partially filled row from a file extraction.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActionIdeaRowImport {
    #[serde(default)]
    pub as_is: Option<String>,
    #[serde(default)]
    pub to_be: Option<String>,
    #[serde(default)]
    pub idea: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ActionIdeasImport {
    #[serde(default)]
    pub environment: Option<ActionIdeaRowImport>,
    #[serde(default)]
    pub social: Option<ActionIdeaRowImport>,
    #[serde(default)]
    pub governance: Option<ActionIdeaRowImport>,
}

impl ActionIdeasImport {
    fn get(&self, category: Category) -> Option<&ActionIdeaRowImport> {
        match category {
            Category::Environment => self.environment.as_ref(),
            Category::Social => self.social.as_ref(),
            Category::Governance => self.governance.as_ref(),
        }
    }
}

fn merge_row(row: &ActionIdeaRow, import: &ActionIdeaRowImport) -> ActionIdeaRow {
    ActionIdeaRow {
        as_is: import.as_is.clone().unwrap_or_else(|| row.as_is.clone()),
        to_be: import.to_be.clone().unwrap_or_else(|| row.to_be.clone()),
        idea: import.idea.clone().unwrap_or_else(|| row.idea.clone()),
    }
}

/// Overlay imported fields onto the existing rows; absent fields keep their text.
pub fn apply_import(data: &ActionIdeaData, import: &ActionIdeasImport) -> ActionIdeaData {
    let mut next = data.clone();
    for category in Category::ALL {
        if let Some(row) = import.get(category) {
            let merged = merge_row(data.get(category), row);
            *next.get_mut(category) = merged;
        }
    }
    next
}

/// Free-text context for the idea-suggestion prompt.
pub fn ideas_context(data: &ActionIdeaData) -> String {
    let mut context = String::new();
    for category in Category::ALL {
        let row = data.get(category);
        context.push_str(&format!(
            "[{}] As-Is: {} / To-Be: {}\n",
            category.code(),
            row.as_is.trim(),
            row.to_be.trim()
        ));
    }
    context
}
