//! Line-oriented workshop shell.
//!
//! Each input line is split with `shell-words` and parsed as one command.
//! Destructive commands ask for `y/N` on the next input line, so a script can
//! answer them inline.
use crate::catalog::{Category, RoadmapPhase, INDICATORS};
use crate::document::{ActionIdeaField, SwotBucket};
use crate::gateway::ExtractMode;
use crate::report::ReportFormat;
use crate::session::{ContextSlot, WorkshopSession};
use crate::stage::Stage;
use crate::strategy::Confirm;
use crate::roadmap;
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "esgw",
    no_binary_name = true,
    disable_version_flag = true,
    subcommand_required = true
)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug)]
enum ShellCommand {
    /// Show stages, scores, counts and loaded context
    Status,
    /// Set the team name
    Team {
        #[arg(required = true, allow_hyphen_values = true)]
        name: Vec<String>,
    },
    /// Move to the next stage
    Next,
    /// Move to the previous stage
    Prev,
    /// Jump back to a completed stage (name or 1-6)
    Goto { stage: Stage },
    /// Rate one indicator, 0.0-4.0 (key like e1_1 or code like E1-1)
    Score {
        indicator: String,
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Ask for an analysis of the diagnosis scores
    Analyze,
    /// Edit SWOT items or run the SWOT helpers
    Swot {
        #[command(subcommand)]
        action: SwotAction,
    },
    /// Set the mission statement
    Mission {
        #[arg(allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Set the vision statement
    Vision {
        #[arg(allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Suggest a vision from the mission
    VisionSuggest,
    /// Generate strategy candidates
    Strategies {
        #[command(subcommand)]
        action: GenerateAction,
    },
    /// Apply a generated strategy candidate
    Candidate {
        #[command(subcommand)]
        action: CandidateAction,
    },
    /// Edit the strategy table
    Strategy {
        #[command(subcommand)]
        action: StrategyAction,
    },
    /// Set one action-idea cell (field: as-is, to-be, idea)
    Idea {
        category: Category,
        field: ActionIdeaField,
        #[arg(allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Suggest action ideas (from the given context or the current document)
    IdeaSuggest {
        #[arg(allow_hyphen_values = true)]
        context: Vec<String>,
    },
    /// Set the goal of one roadmap cell (phase: 1-3 or label)
    Goal {
        category: Category,
        phase: RoadmapPhase,
        #[arg(allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Edit roadmap tasks
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },
    /// Generate the full roadmap
    Roadmap {
        #[command(subcommand)]
        action: GenerateAction,
    },
    /// Read a file into the current stage
    Import {
        path: PathBuf,
        /// Read the file as plain prompt context
        #[arg(long)]
        text_only: bool,
    },
    /// Read a file as plain text context for later prompts
    Context { slot: ContextSlot, path: PathBuf },
    /// Clear the current stage (on the report stage: start over)
    Reset,
    /// Write the final report
    Report {
        format: Option<ReportFormat>,
        path: Option<PathBuf>,
    },
    /// Write the document as JSON
    Export { path: PathBuf },
    /// Send the document to the configured sink
    Submit,
    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

#[derive(Subcommand, Debug)]
enum SwotAction {
    /// Add an item (bucket: s, w, o, t)
    Add {
        bucket: SwotBucket,
        #[arg(required = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Replace an item's text
    Edit {
        bucket: SwotBucket,
        id: String,
        #[arg(allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Remove an item
    Rm { bucket: SwotBucket, id: String },
    /// Suggest items from a short description of the center
    Suggest {
        #[arg(allow_hyphen_values = true)]
        context: Vec<String>,
    },
    /// Run the SO/WO/ST/WT matrix analysis
    Analyze,
}

#[derive(Subcommand, Debug)]
enum GenerateAction {
    Generate,
}

#[derive(Subcommand, Debug)]
enum CandidateAction {
    /// Replace the strategy table with candidate N (asks for confirmation)
    Apply { number: usize },
}

#[derive(Subcommand, Debug)]
enum StrategyAction {
    /// Set a category's strategy statement
    Set {
        category: Category,
        #[arg(allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Set task N (1-5) of a category
    Task {
        category: Category,
        number: usize,
        #[arg(allow_hyphen_values = true)]
        text: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
enum TaskAction {
    /// Add a task to a cell; prints the new id
    Add {
        category: Category,
        phase: RoadmapPhase,
        #[arg(allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Replace a task's text
    Edit {
        id: String,
        #[arg(allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Remove a task
    Rm { id: String },
}

enum Flow {
    Continue,
    Quit,
}

/// Answers confirmations from the next input line.
struct LineConfirm<'a> {
    input: &'a mut dyn BufRead,
    out: &'a mut dyn Write,
}

impl Confirm for LineConfirm<'_> {
    fn confirm(&mut self, question: &str) -> bool {
        if write!(self.out, "{question} [y/N] ").and_then(|_| self.out.flush()).is_err() {
            return false;
        }
        let mut answer = String::new();
        match self.input.read_line(&mut answer) {
            Ok(0) | Err(_) => {
                let _ = writeln!(self.out);
                false
            }
            Ok(_) => {
                let answer = answer.trim().to_ascii_lowercase();
                let approved = answer == "y" || answer == "yes";
                if !approved {
                    let _ = writeln!(self.out, "cancelled");
                }
                approved
            }
        }
    }
}

pub struct Shell<R, W> {
    input: R,
    out: W,
    prompt: bool,
}

impl<R: BufRead, W: Write> Shell<R, W> {
    /// `prompt` prints `esgw[stage]> ` before each line (interactive use).
    pub fn new(input: R, out: W, prompt: bool) -> Self {
        Shell { input, out, prompt }
    }

    /// Run until `quit` or end of input.
    pub fn run(&mut self, session: &mut WorkshopSession) -> Result<()> {
        let mut line = String::new();
        loop {
            if self.prompt {
                write!(self.out, "esgw[{}]> ", session.stage())?;
                self.out.flush()?;
            }
            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                break;
            }
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let flow = self.execute(session, trimmed)?;
            if let Some(notice) = session.take_notice() {
                writeln!(self.out, "notice: {notice}")?;
            }
            if matches!(flow, Flow::Quit) {
                break;
            }
        }
        Ok(())
    }

    /// Parse and run one line; command errors are printed, I/O errors propagate.
    fn execute(&mut self, session: &mut WorkshopSession, line: &str) -> Result<Flow> {
        let words = match shell_words::split(line) {
            Ok(words) => words,
            Err(err) => {
                writeln!(self.out, "error: {err}")?;
                return Ok(Flow::Continue);
            }
        };
        let parsed = match ShellLine::try_parse_from(&words) {
            Ok(parsed) => parsed,
            Err(err) => {
                write!(self.out, "{}", err.render())?;
                return Ok(Flow::Continue);
            }
        };
        tracing::debug!(command = words.first().map(String::as_str), "shell command");
        match self.dispatch(session, parsed.command) {
            Ok(flow) => Ok(flow),
            Err(err) => {
                writeln!(self.out, "error: {err:#}")?;
                Ok(Flow::Continue)
            }
        }
    }

    fn dispatch(&mut self, session: &mut WorkshopSession, command: ShellCommand) -> Result<Flow> {
        match command {
            ShellCommand::Status => write_status(&mut self.out, session)?,
            ShellCommand::Team { name } => session.set_team_name(&name.join(" ")),
            ShellCommand::Next => {
                if !session.advance() {
                    writeln!(self.out, "already at the last stage")?;
                }
                self.write_stage(session)?;
            }
            ShellCommand::Prev => {
                if !session.retreat() {
                    writeln!(self.out, "already at the first stage")?;
                }
                self.write_stage(session)?;
            }
            ShellCommand::Goto { stage } => {
                if !session.jump_to(stage) {
                    writeln!(self.out, "{stage} is not completed yet; use `next`")?;
                }
                self.write_stage(session)?;
            }
            ShellCommand::Score { indicator, value } => {
                let stored = session.set_score(&indicator, &value)?;
                let diagnosis = &session.document().diagnosis;
                writeln!(
                    self.out,
                    "{indicator} = {stored:.1} (E {} / S {} / G {})",
                    diagnosis.environment, diagnosis.social, diagnosis.governance
                )?;
            }
            ShellCommand::Analyze => {
                if session.analyze_diagnosis() {
                    writeln!(self.out, "{}", session.document().diagnosis_analysis)?;
                }
            }
            ShellCommand::Swot { action } => self.dispatch_swot(session, action)?,
            ShellCommand::Mission { text } => session.set_mission(&text.join(" ")),
            ShellCommand::Vision { text } => session.set_vision(&text.join(" ")),
            ShellCommand::VisionSuggest => {
                if session.suggest_vision() {
                    writeln!(self.out, "vision: {}", session.document().strategy.vision)?;
                }
            }
            ShellCommand::Strategies {
                action: GenerateAction::Generate,
            } => {
                if session.generate_candidates() {
                    self.write_candidates(session)?;
                }
            }
            ShellCommand::Candidate {
                action: CandidateAction::Apply { number },
            } => {
                let applied = {
                    let mut confirm = LineConfirm {
                        input: &mut self.input,
                        out: &mut self.out,
                    };
                    session.apply_candidate(number, &mut confirm)?
                };
                if applied {
                    writeln!(self.out, "candidate {number} applied")?;
                }
            }
            ShellCommand::Strategy { action } => match action {
                StrategyAction::Set { category, text } => {
                    session.set_strategy(category, &text.join(" "))
                }
                StrategyAction::Task {
                    category,
                    number,
                    text,
                } => session.set_strategy_task(category, number, &text.join(" "))?,
            },
            ShellCommand::Idea {
                category,
                field,
                text,
            } => session.set_idea(category, field, &text.join(" ")),
            ShellCommand::IdeaSuggest { context } => {
                let context = context.join(" ");
                if let Some(text) = session.suggest_ideas(Some(context.as_str())) {
                    writeln!(self.out, "{text}")?;
                }
            }
            ShellCommand::Goal {
                category,
                phase,
                text,
            } => session.set_goal(category, phase, &text.join(" ")),
            ShellCommand::Task { action } => match action {
                TaskAction::Add {
                    category,
                    phase,
                    text,
                } => {
                    let id = session.add_task(category, phase, &text.join(" "));
                    writeln!(self.out, "task {id}")?;
                }
                TaskAction::Edit { id, text } => {
                    if !session.edit_task(&id, &text.join(" ")) {
                        writeln!(self.out, "no task with id {id}")?;
                    }
                }
                TaskAction::Rm { id } => {
                    if !session.remove_task(&id) {
                        writeln!(self.out, "no task with id {id}")?;
                    }
                }
            },
            ShellCommand::Roadmap {
                action: GenerateAction::Generate,
            } => {
                if session.generate_roadmap() {
                    writeln!(
                        self.out,
                        "roadmap generated: {} goals, {} tasks",
                        session.document().roadmap_goals.len(),
                        session.document().roadmap.len()
                    )?;
                }
            }
            ShellCommand::Import { path, text_only } => {
                let mode = if text_only {
                    ExtractMode::TextOnly
                } else {
                    ExtractMode::Structured
                };
                if session.import_file(&path, mode)? {
                    match ContextSlot::for_stage(session.stage()).filter(|_| text_only) {
                        Some(slot) => writeln!(self.out, "{slot} context loaded")?,
                        None => writeln!(self.out, "{} data imported", session.stage())?,
                    }
                }
            }
            ShellCommand::Context { slot, path } => {
                if session.import_context(slot, &path)? {
                    writeln!(self.out, "{slot} context loaded")?;
                }
            }
            ShellCommand::Reset => {
                let reset = {
                    let mut confirm = LineConfirm {
                        input: &mut self.input,
                        out: &mut self.out,
                    };
                    session.reset_stage(&mut confirm)
                };
                if reset {
                    writeln!(self.out, "{} reset", session.stage())?;
                }
            }
            ShellCommand::Report { format, path } => {
                let format = format.unwrap_or_default();
                let written = session.write_report(format, path.as_deref())?;
                writeln!(self.out, "report written to {}", written.display())?;
            }
            ShellCommand::Export { path } => {
                session.export(&path)?;
                writeln!(self.out, "document written to {}", path.display())?;
            }
            ShellCommand::Submit => {
                let outcome = session.submit();
                tracing::debug!(outcome = %outcome, "submit finished");
            }
            ShellCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn dispatch_swot(&mut self, session: &mut WorkshopSession, action: SwotAction) -> Result<()> {
        match action {
            SwotAction::Add { bucket, text } => {
                let id = session.add_swot_item(bucket, &text.join(" "));
                writeln!(self.out, "{} {id}", bucket.field_name())?;
            }
            SwotAction::Edit { bucket, id, text } => {
                if !session.edit_swot_item(bucket, &id, &text.join(" ")) {
                    writeln!(self.out, "no {} item with id {id}", bucket.field_name())?;
                }
            }
            SwotAction::Rm { bucket, id } => {
                if !session.remove_swot_item(bucket, &id) {
                    writeln!(self.out, "no {} item with id {id}", bucket.field_name())?;
                }
            }
            SwotAction::Suggest { context } => {
                if let Some(text) = session.suggest_swot(&context.join(" ")) {
                    writeln!(self.out, "{text}")?;
                }
            }
            SwotAction::Analyze => {
                if session.analyze_swot() {
                    let analysis = session
                        .document()
                        .swot
                        .analysis
                        .as_ref()
                        .ok_or_else(|| anyhow!("SWOT analysis missing after update"))?;
                    for (label, entries) in [
                        ("SO", &analysis.matrix.so),
                        ("WO", &analysis.matrix.wo),
                        ("ST", &analysis.matrix.st),
                        ("WT", &analysis.matrix.wt),
                    ] {
                        for entry in entries {
                            writeln!(self.out, "{label} {entry}")?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn write_stage(&mut self, session: &WorkshopSession) -> Result<()> {
        let stage = session.stage();
        writeln!(self.out, "stage {}: {} ({stage})", stage.index() + 1, stage.title())?;
        Ok(())
    }

    fn write_candidates(&mut self, session: &WorkshopSession) -> Result<()> {
        let candidates = session
            .document()
            .strategy
            .candidates
            .as_deref()
            .unwrap_or_default();
        for (idx, candidate) in candidates.iter().enumerate() {
            writeln!(self.out, "[{}] {}", idx + 1, candidate.version_name)?;
            for category in Category::ALL {
                let item = candidate.get(category);
                writeln!(self.out, "  {}: {}", category.code(), item.strategy)?;
                for task in item.tasks.iter().filter(|task| !task.trim().is_empty()) {
                    writeln!(self.out, "    - {task}")?;
                }
            }
        }
        Ok(())
    }
}

fn write_status(out: &mut impl Write, session: &WorkshopSession) -> Result<()> {
    let document = session.document();
    let current = session.stage();
    let team = if document.team_name.is_empty() {
        "-"
    } else {
        document.team_name.as_str()
    };
    writeln!(out, "team: {team}")?;
    for stage in Stage::ALL {
        let marker = if stage == current {
            ">"
        } else if session.is_completed(stage) {
            "x"
        } else {
            " "
        };
        writeln!(out, "[{marker}] {}. {}", stage.index() + 1, stage.title())?;
    }

    let diagnosis = &document.diagnosis;
    let rated = diagnosis.details.rated_count();
    writeln!(
        out,
        "scores: E {} / S {} / G {} ({rated}/{} rated){}",
        diagnosis.environment,
        diagnosis.social,
        diagnosis.governance,
        INDICATORS.len(),
        if document.diagnosis_analysis.is_empty() {
            ""
        } else {
            ", analysis ready"
        }
    )?;

    for bucket in SwotBucket::ALL {
        for item in document.swot.bucket(bucket) {
            writeln!(out, "swot {} {} {}", bucket.field_name(), item.id, item.text)?;
        }
    }
    if document.swot.analysis.is_some() {
        writeln!(out, "swot matrix: ready")?;
    }

    let strategy = &document.strategy;
    writeln!(out, "mission: {}", strategy.mission)?;
    writeln!(out, "vision: {}", strategy.vision)?;
    for category in Category::ALL {
        writeln!(
            out,
            "strategy {}: {}",
            category.code(),
            strategy.strategies.get(category).strategy
        )?;
    }
    if let Some(candidates) = &strategy.candidates {
        writeln!(out, "candidates: {}", candidates.len())?;
    }

    for category in Category::ALL {
        let row = document.action_ideas.get(category);
        let filled = [&row.as_is, &row.to_be, &row.idea]
            .iter()
            .filter(|cell| !cell.trim().is_empty())
            .count();
        writeln!(out, "ideas {}: {filled}/3", category.code())?;
    }

    for category in Category::ALL {
        for phase in RoadmapPhase::ALL {
            if let Some(goal) = roadmap::goal_for(&document.roadmap_goals, category, phase) {
                writeln!(out, "goal {} {}: {goal}", category.code(), phase.label())?;
            }
            for task in roadmap::tasks_in(&document.roadmap, category, phase) {
                writeln!(out, "task {} {} {}: {}", task.id, category.code(), phase.label(), task.task)?;
            }
        }
    }

    for slot in ContextSlot::ALL {
        if let Some(text) = session.context(slot) {
            writeln!(out, "context {slot}: {} chars", text.chars().count())?;
        }
    }
    writeln!(out, "submission: {}", session.submission())?;
    writeln!(out, "backend: {}", session.backend_name())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::tests::ScriptedBackend;
    use crate::gateway::Gateway;
    use crate::sink::tests::RecordingSink;
    use crate::sink::SubmissionOutcome;

    fn run_script(script: &str, backend: &ScriptedBackend) -> (WorkshopSession, String) {
        let gateway = Gateway::new(Box::new(backend.clone()), "Korean (한국어)");
        let mut session = WorkshopSession::new(
            gateway,
            Box::new(RecordingSink::new(SubmissionOutcome::DispatchedAssumedOk)),
        );
        let mut out = Vec::new();
        Shell::new(script.as_bytes(), &mut out, false)
            .run(&mut session)
            .unwrap();
        (session, String::from_utf8(out).unwrap())
    }

    #[test]
    fn scripted_edits_reach_the_document() {
        let script = "\
# comment lines are skipped
team \"1 모둠\"
score E1-1 4
score g4_5 -2
next
swot add s 전문 인력
mission 지역과 함께
idea S as-is 돌봄 공백
goal G 2 투명성 강화
task add G 2 윤리위원회 구성
";
        let (session, out) = run_script(script, &ScriptedBackend::default());
        let doc = session.document();
        assert_eq!(doc.team_name, "1 모둠");
        assert_eq!(doc.diagnosis.environment, 20);
        assert_eq!(doc.diagnosis.details.get("g4_5"), 0.0);
        assert_eq!(doc.swot.strengths[0].text, "전문 인력");
        assert_eq!(doc.strategy.mission, "지역과 함께");
        assert_eq!(doc.action_ideas.social.as_is, "돌봄 공백");
        assert_eq!(doc.roadmap[0].task, "윤리위원회 구성");
        assert_eq!(doc.roadmap[0].year, RoadmapPhase::Expansion);
        assert!(out.contains("E1-1 = 4.0 (E 20 / S 0 / G 0)"));
        assert!(out.contains("stage 2"));
    }

    #[test]
    fn confirmation_is_read_from_the_next_line() {
        let (session, out) = run_script("score e1_1 3\nreset\nn\n", &ScriptedBackend::default());
        assert_eq!(session.document().diagnosis.details.get("e1_1"), 3.0);
        assert!(out.contains("이 단계의 데이터를 모두 초기화하시겠습니까? [y/N]"));
        assert!(out.contains("cancelled"));

        let (session, _) = run_script("score e1_1 3\nreset\ny\n", &ScriptedBackend::default());
        assert_eq!(session.document().diagnosis.details.get("e1_1"), 0.0);
    }

    #[test]
    fn bad_input_is_reported_and_the_loop_continues() {
        let script = "frobnicate\nscore zz 1\ngoto report\nteam \"unterminated\nteam ok\n";
        let (session, out) = run_script(script, &ScriptedBackend::default());
        assert!(out.contains("error: unknown indicator: zz"));
        assert!(out.contains("report is not completed yet"));
        assert!(out.contains("error:"));
        assert_eq!(session.document().team_name, "ok");
        assert_eq!(session.stage(), Stage::Diagnosis);
    }

    #[test]
    fn gateway_failures_print_notices() {
        let backend = ScriptedBackend::default();
        backend.push_failure("timeout");
        let (session, out) = run_script("analyze\n", &backend);
        assert!(out.contains("notice: diagnosis analysis failed"));
        assert!(session.document().diagnosis_analysis.is_empty());
    }

    #[test]
    fn imports_report_what_was_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let upload = dir.path().join("notes.txt");
        std::fs::write(&upload, "우리 기관 소개").unwrap();
        let backend = ScriptedBackend::with(&[
            r#"{"text": "지역 복지관, 직원 30명"}"#,
            r#"{"strengths": ["지역 네트워크"]}"#,
        ]);
        let script = format!(
            "next\nimport --text-only {0}\nimport {0}\n",
            upload.display()
        );
        let (session, out) = run_script(&script, &backend);
        assert!(out.contains("swot context loaded"), "{out}");
        assert!(out.contains("swot data imported"), "{out}");
        assert_eq!(session.context(ContextSlot::Swot), Some("지역 복지관, 직원 30명"));
        assert_eq!(session.document().swot.strengths[0].text, "지역 네트워크");
    }

    #[test]
    fn quit_stops_before_remaining_lines() {
        let (session, _) = run_script("team a\nquit\nteam b\n", &ScriptedBackend::default());
        assert_eq!(session.document().team_name, "a");
    }

    #[test]
    fn status_lists_stages_and_items() {
        let (_, out) = run_script("swot add t 예산 감소\nnext\nstatus\n", &ScriptedBackend::default());
        assert!(out.contains("[x] 1."));
        assert!(out.contains("[>] 2."));
        assert!(out.contains("swot threats "));
        assert!(out.contains("submission: not submitted"));
    }
}
