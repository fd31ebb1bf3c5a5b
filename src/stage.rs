//! The six workshop stages and the sequencer that moves between them.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Workshop stages in their fixed order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Diagnosis,
    Swot,
    Strategy,
    ActionIdeas,
    Roadmap,
    Report,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Diagnosis,
        Stage::Swot,
        Stage::Strategy,
        Stage::ActionIdeas,
        Stage::Roadmap,
        Stage::Report,
    ];

    pub fn index(&self) -> usize {
        match self {
            Stage::Diagnosis => 0,
            Stage::Swot => 1,
            Stage::Strategy => 2,
            Stage::ActionIdeas => 3,
            Stage::Roadmap => 4,
            Stage::Report => 5,
        }
    }

    pub fn next(&self) -> Option<Stage> {
        Stage::ALL.get(self.index() + 1).copied()
    }

    pub fn previous(&self) -> Option<Stage> {
        self.index().checked_sub(1).map(|idx| Stage::ALL[idx])
    }

    /// Stable identifier used on the command line and in templates.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Diagnosis => "diagnosis",
            Stage::Swot => "swot",
            Stage::Strategy => "strategy",
            Stage::ActionIdeas => "action_ideas",
            Stage::Roadmap => "roadmap",
            Stage::Report => "report",
        }
    }

    /// Title shown in the progress bar.
    pub fn title(&self) -> &'static str {
        match self {
            Stage::Diagnosis => "자체진단",
            Stage::Swot => "SWOT",
            Stage::Strategy => "전략수립",
            Stage::ActionIdeas => "아이디어",
            Stage::Roadmap => "로드맵",
            Stage::Report => "결과보고",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
        if let Ok(number) = normalized.parse::<usize>() {
            return number
                .checked_sub(1)
                .and_then(|idx| Stage::ALL.get(idx).copied())
                .ok_or_else(|| format!("stage number out of range: {number} (expected 1-6)"));
        }
        if normalized == "ideas" {
            return Ok(Stage::ActionIdeas);
        }
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == normalized)
            .ok_or_else(|| format!("unknown stage: {raw}"))
    }
}

/// Tracks the current stage over the fixed order.
///
/// Forward movement is one step at a time; jumps are only allowed back to a
/// completed stage or onto the current one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StageSequencer {
    current: Stage,
}

impl StageSequencer {
    pub fn new() -> Self {
        StageSequencer::default()
    }

    pub fn current(&self) -> Stage {
        self.current
    }

    /// Move to the next stage; no-op at `Report`. Returns whether it moved.
    pub fn advance(&mut self) -> bool {
        match self.current.next() {
            Some(next) => self.transition(next),
            None => false,
        }
    }

    /// Move to the previous stage; no-op at `Diagnosis`. Returns whether it moved.
    pub fn retreat(&mut self) -> bool {
        match self.current.previous() {
            Some(previous) => self.transition(previous),
            None => false,
        }
    }

    /// Jump to `target` if it is the current stage or an earlier one.
    ///
    /// Returns whether the jump was permitted; forward jumps leave the stage unchanged.
    pub fn jump_to(&mut self, target: Stage) -> bool {
        if target > self.current {
            tracing::debug!(from = %self.current, to = %target, "forward jump rejected");
            return false;
        }
        self.transition(target)
    }

    /// A stage is completed once the session has moved past it.
    pub fn is_completed(&self, stage: Stage) -> bool {
        stage.index() < self.current.index()
    }

    fn transition(&mut self, to: Stage) -> bool {
        tracing::debug!(from = %self.current, to = %to, "stage transition");
        self.current = to;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(stage: Stage) -> StageSequencer {
        StageSequencer { current: stage }
    }

    #[test]
    fn retreat_at_first_stage_is_noop() {
        let mut seq = StageSequencer::new();
        assert!(!seq.retreat());
        assert_eq!(seq.current(), Stage::Diagnosis);
    }

    #[test]
    fn advance_at_report_is_noop() {
        let mut seq = at(Stage::Report);
        assert!(!seq.advance());
        assert_eq!(seq.current(), Stage::Report);
    }

    #[test]
    fn advance_then_retreat_returns_to_origin() {
        for stage in Stage::ALL.into_iter().filter(|s| *s != Stage::Report) {
            let mut seq = at(stage);
            assert!(seq.advance());
            assert!(seq.retreat());
            assert_eq!(seq.current(), stage);
        }
    }

    #[test]
    fn jump_only_to_current_or_earlier() {
        for current in Stage::ALL {
            for target in Stage::ALL {
                let mut seq = at(current);
                let moved = seq.jump_to(target);
                if target.index() <= current.index() {
                    assert!(moved);
                    assert_eq!(seq.current(), target);
                } else {
                    assert!(!moved);
                    assert_eq!(seq.current(), current);
                }
            }
        }
    }

    #[test]
    fn completed_means_strictly_before_current() {
        let seq = at(Stage::Strategy);
        assert!(seq.is_completed(Stage::Diagnosis));
        assert!(seq.is_completed(Stage::Swot));
        assert!(!seq.is_completed(Stage::Strategy));
        assert!(!seq.is_completed(Stage::Report));
    }

    #[test]
    fn parses_names_and_numbers() {
        assert_eq!("action-ideas".parse::<Stage>(), Ok(Stage::ActionIdeas));
        assert_eq!("ideas".parse::<Stage>(), Ok(Stage::ActionIdeas));
        assert_eq!("6".parse::<Stage>(), Ok(Stage::Report));
        assert!("0".parse::<Stage>().is_err());
        assert!("7".parse::<Stage>().is_err());
    }
}
