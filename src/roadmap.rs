//! Roadmap goals and tasks.
//!
//! Goals are keyed by (category, phase): at most one per pair. Tasks use the
//! pair only for grouping and are identified by id.
use crate::catalog::{Category, RoadmapPhase};
use crate::document::{IdSource, RoadmapGoal, RoadmapItem};
use serde::Deserialize;

/// Set the goal text for a (category, phase) pair, appending if absent.
pub fn upsert_goal(
    goals: &[RoadmapGoal],
    category: Category,
    phase: RoadmapPhase,
    text: &str,
) -> Vec<RoadmapGoal> {
    let mut next = goals.to_vec();
    match next
        .iter_mut()
        .find(|goal| goal.category == category && goal.year == phase)
    {
        Some(goal) => goal.goal = text.to_string(),
        None => next.push(RoadmapGoal {
            category,
            year: phase,
            goal: text.to_string(),
        }),
    }
    next
}

pub fn goal_for(goals: &[RoadmapGoal], category: Category, phase: RoadmapPhase) -> Option<&str> {
    goals
        .iter()
        .find(|goal| goal.category == category && goal.year == phase)
        .map(|goal| goal.goal.as_str())
}

/// Append an empty task with a fresh id; returns the new list and the id.
pub fn add_task(
    tasks: &[RoadmapItem],
    category: Category,
    phase: RoadmapPhase,
    ids: &mut IdSource,
) -> (Vec<RoadmapItem>, String) {
    let id = ids.next_id();
    let mut next = tasks.to_vec();
    next.push(RoadmapItem {
        id: id.clone(),
        category,
        task: String::new(),
        year: phase,
    });
    (next, id)
}

/// Replace a task's text; unknown ids leave the list unchanged.
pub fn update_task(tasks: &[RoadmapItem], id: &str, text: &str) -> Vec<RoadmapItem> {
    tasks
        .iter()
        .map(|task| {
            if task.id == id {
                RoadmapItem {
                    task: text.to_string(),
                    ..task.clone()
                }
            } else {
                task.clone()
            }
        })
        .collect()
}

/// Remove a task by id; unknown ids are a no-op.
pub fn remove_task(tasks: &[RoadmapItem], id: &str) -> Vec<RoadmapItem> {
    tasks.iter().filter(|task| task.id != id).cloned().collect()
}

/// Tasks of one (category, phase) cell, in insertion order.
pub fn tasks_in(
    tasks: &[RoadmapItem],
    category: Category,
    phase: RoadmapPhase,
) -> impl Iterator<Item = &RoadmapItem> {
    tasks
        .iter()
        .filter(move |task| task.category == category && task.year == phase)
}

/// One generated (category, phase) record: a goal plus its tasks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoadmapDraft {
    pub category: Category,
    pub year: RoadmapPhase,
    pub goal: String,
    #[serde(default)]
    pub tasks: Vec<String>,
}

/// Convert generated drafts into a full replacement of goals and tasks.
pub fn from_drafts(drafts: &[RoadmapDraft], ids: &mut IdSource) -> (Vec<RoadmapGoal>, Vec<RoadmapItem>) {
    let mut goals = Vec::new();
    let mut tasks = Vec::new();
    for draft in drafts {
        goals = upsert_goal(&goals, draft.category, draft.year, &draft.goal);
        tasks.extend(draft.tasks.iter().map(|task| RoadmapItem {
            id: ids.next_id(),
            category: draft.category,
            task: task.clone(),
            year: draft.year,
        }));
    }
    (goals, tasks)
}

/// A task row extracted from an uploaded roadmap file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoadmapImportRow {
    pub category: Category,
    pub task: String,
    pub year: RoadmapPhase,
}

/// Append imported rows as new tasks.
pub fn import_tasks(
    tasks: &[RoadmapItem],
    rows: &[RoadmapImportRow],
    ids: &mut IdSource,
) -> Vec<RoadmapItem> {
    let mut next = tasks.to_vec();
    next.extend(rows.iter().map(|row| RoadmapItem {
        id: ids.next_id(),
        category: row.category,
        task: row.task.clone(),
        year: row.year,
    }));
    next
}
