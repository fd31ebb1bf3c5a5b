//! The workshop session: one document, one stage cursor, and the external
//! calls that enrich them.
//!
//! Every gateway call runs through [`WorkshopSession::run_request`], which
//! takes a [`RequestToken`] for the calling control before the call and only
//! hands the result back if that token is still the latest one afterwards.
//! Failed calls leave the document untouched and set a [`Notice`].
//!
//! The shell drives the session synchronously and `run_request` holds
//! `&mut self` across the call, so there a token is always still current.
//! The check only rejects anything once requests on one control overlap,
//! which `RequestTracker` supports on its own (see its tests).
use crate::catalog::{self, Category, RoadmapPhase};
use crate::document::{
    ActionIdeaData, ActionIdeaField, DiagnosisScore, DocumentPatch, DocumentStore, IdSource,
    RoadmapItem, StrategyData, SwotBucket, SwotData, WorkshopDocument, TASKS_PER_STRATEGY,
};
use crate::gateway::{Attachment, ExtractMode, FileExtract, Gateway, GatewayError, StrategyContext};
use crate::report::{self, ReportFormat};
use crate::sink::{Sink, SubmissionOutcome};
use crate::stage::{Stage, StageSequencer};
use crate::strategy::{self, Confirm, Confirmation};
use crate::{ideas, roadmap, score, swot, template};
use anyhow::{anyhow, bail, Context, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const RESET_QUESTION: &str = "이 단계의 데이터를 모두 초기화하시겠습니까?";
pub const RESTART_QUESTION: &str = "입력된 데이터가 모두 초기화됩니다. 처음부터 다시 시작하시겠습니까?";

/// A user-facing action that issues gateway requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Control {
    DiagnosisAnalysis,
    SwotSuggestions,
    SwotAnalysis,
    VisionSuggestion,
    StrategyCandidates,
    IdeaSuggestions,
    Roadmap,
    FileImport,
}

impl Control {
    pub fn as_str(&self) -> &'static str {
        match self {
            Control::DiagnosisAnalysis => "diagnosis analysis",
            Control::SwotSuggestions => "SWOT suggestions",
            Control::SwotAnalysis => "SWOT matrix analysis",
            Control::VisionSuggestion => "vision suggestion",
            Control::StrategyCandidates => "strategy generation",
            Control::IdeaSuggestions => "idea suggestions",
            Control::Roadmap => "roadmap generation",
            Control::FileImport => "file import",
        }
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generation number of one request on one control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken {
    control: Control,
    generation: u64,
}

impl RequestToken {
    pub fn control(&self) -> Control {
        self.control
    }
}

/// Hands out monotonically increasing tokens and remembers the newest per control.
#[derive(Debug, Default)]
pub struct RequestTracker {
    next: u64,
    latest: BTreeMap<Control, u64>,
}

impl RequestTracker {
    pub fn begin(&mut self, control: Control) -> RequestToken {
        self.next += 1;
        self.latest.insert(control, self.next);
        RequestToken {
            control,
            generation: self.next,
        }
    }

    /// Whether `token` is still the newest request for its control.
    pub fn finish(&self, token: &RequestToken) -> bool {
        self.latest.get(&token.control) == Some(&token.generation)
    }
}

/// Transient status left for the user after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    AnalysisFailed { control: Control, reason: String },
    SubmissionFailed(String),
    Submitted,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Info(text) => f.write_str(text),
            Notice::AnalysisFailed { control, reason } => {
                write!(f, "{control} failed: {reason} (document unchanged, retry when ready)")
            }
            Notice::SubmissionFailed(reason) => write!(f, "submission failed: {reason}"),
            Notice::Submitted => f.write_str("submitted (the receiver does not confirm delivery)"),
        }
    }
}

/// Where text read from an uploaded file is kept for later prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ContextSlot {
    /// Replaces the stored diagnosis analysis in strategy prompts.
    Diagnosis,
    /// Replaces the stored SWOT matrix in strategy and roadmap prompts.
    Swot,
    /// Replaces the stored strategy table in the roadmap prompt.
    Strategy,
}

impl ContextSlot {
    pub const ALL: [ContextSlot; 3] = [ContextSlot::Diagnosis, ContextSlot::Swot, ContextSlot::Strategy];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContextSlot::Diagnosis => "diagnosis",
            ContextSlot::Swot => "swot",
            ContextSlot::Strategy => "strategy",
        }
    }

    /// Slot filled by a text-only import on `stage`.
    pub fn for_stage(stage: Stage) -> Option<ContextSlot> {
        match stage {
            Stage::Diagnosis => Some(ContextSlot::Diagnosis),
            Stage::Swot => Some(ContextSlot::Swot),
            Stage::Strategy => Some(ContextSlot::Strategy),
            Stage::ActionIdeas | Stage::Roadmap | Stage::Report => None,
        }
    }
}

impl fmt::Display for ContextSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContextSlot {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "diagnosis" => Ok(ContextSlot::Diagnosis),
            "swot" => Ok(ContextSlot::Swot),
            "strategy" => Ok(ContextSlot::Strategy),
            other => Err(format!(
                "unknown context: {other} (expected diagnosis, swot or strategy)"
            )),
        }
    }
}

/// Read a saved document from JSON.
pub fn read_document(path: &Path) -> Result<WorkshopDocument> {
    let bytes = fs::read(path).with_context(|| format!("read document {}", path.display()))?;
    let document: WorkshopDocument = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse document JSON {}", path.display()))?;
    Ok(document)
}

pub struct WorkshopSession {
    store: DocumentStore,
    stages: StageSequencer,
    requests: RequestTracker,
    ids: IdSource,
    gateway: Gateway,
    sink: Box<dyn Sink>,
    submission: SubmissionOutcome,
    notice: Option<Notice>,
    contexts: BTreeMap<ContextSlot, String>,
}

impl WorkshopSession {
    pub fn new(gateway: Gateway, sink: Box<dyn Sink>) -> Self {
        Self::with_document(WorkshopDocument::initialize(), gateway, sink)
    }

    pub fn with_document(document: WorkshopDocument, gateway: Gateway, sink: Box<dyn Sink>) -> Self {
        WorkshopSession {
            store: DocumentStore::from_document(document),
            stages: StageSequencer::new(),
            requests: RequestTracker::default(),
            ids: IdSource::new(),
            gateway,
            sink,
            submission: SubmissionOutcome::default(),
            notice: None,
            contexts: BTreeMap::new(),
        }
    }

    pub fn document(&self) -> &WorkshopDocument {
        self.store.document()
    }

    pub fn stage(&self) -> Stage {
        self.stages.current()
    }

    pub fn is_completed(&self, stage: Stage) -> bool {
        self.stages.is_completed(stage)
    }

    pub fn submission(&self) -> &SubmissionOutcome {
        &self.submission
    }

    #[cfg(test)]
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    pub fn context(&self, slot: ContextSlot) -> Option<&str> {
        self.contexts.get(&slot).map(String::as_str)
    }

    pub fn backend_name(&self) -> &'static str {
        self.gateway.backend_name()
    }

    fn update(&mut self, patch: DocumentPatch) {
        self.store.update_slice(patch);
        tracing::trace!(revision = self.store.revision(), "document updated");
    }

    fn info(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice::Info(text.into()));
    }

    /// Run one gateway call under a fresh request token.
    ///
    /// Returns `None` when the call failed (a notice is set) or when a newer
    /// request on the same control superseded it.
    fn run_request<T>(
        &mut self,
        control: Control,
        call: impl FnOnce(&Gateway) -> Result<T, GatewayError>,
    ) -> Option<T> {
        let token = self.requests.begin(control);
        let result = call(&self.gateway);
        if !self.requests.finish(&token) {
            tracing::warn!(control = %token.control(), "dropping stale result");
            return None;
        }
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(control = %control, error = %err, "gateway call failed");
                self.notice = Some(Notice::AnalysisFailed {
                    control,
                    reason: err.to_string(),
                });
                None
            }
        }
    }

    // Navigation

    pub fn advance(&mut self) -> bool {
        self.stages.advance()
    }

    pub fn retreat(&mut self) -> bool {
        self.stages.retreat()
    }

    pub fn jump_to(&mut self, target: Stage) -> bool {
        self.stages.jump_to(target)
    }

    pub fn set_team_name(&mut self, name: &str) {
        self.update(DocumentPatch {
            team_name: Some(name.trim().to_string()),
            ..DocumentPatch::default()
        });
    }

    // Diagnosis

    /// Set one indicator from user input; returns the stored (coerced, clamped) value.
    pub fn set_score(&mut self, key_or_code: &str, raw: &str) -> Result<f64> {
        let indicator = catalog::find_indicator(key_or_code)
            .ok_or_else(|| anyhow!("unknown indicator: {key_or_code}"))?;
        let value = score::clamp_score(score::coerce_score_input(raw));
        let diagnosis = self
            .document()
            .diagnosis
            .with_detail(indicator.key, value)
            .ok_or_else(|| anyhow!("unknown indicator: {key_or_code}"))?;
        self.update(DocumentPatch {
            diagnosis: Some(diagnosis),
            ..DocumentPatch::default()
        });
        Ok(value)
    }

    pub fn analyze_diagnosis(&mut self) -> bool {
        let details = self.document().diagnosis.details.clone();
        let Some(analysis) =
            self.run_request(Control::DiagnosisAnalysis, |gw| gw.diagnosis_analysis(&details))
        else {
            return false;
        };
        self.update(DocumentPatch {
            diagnosis_analysis: Some(analysis),
            ..DocumentPatch::default()
        });
        true
    }

    // SWOT

    pub fn add_swot_item(&mut self, bucket: SwotBucket, text: &str) -> String {
        let next = swot::add_item(&self.store.document().swot, bucket, text, &mut self.ids);
        let id = next
            .bucket(bucket)
            .last()
            .map(|item| item.id.clone())
            .unwrap_or_default();
        self.set_swot(next);
        id
    }

    /// Returns whether an item with `id` existed.
    pub fn edit_swot_item(&mut self, bucket: SwotBucket, id: &str, text: &str) -> bool {
        let found = self.has_swot_item(bucket, id);
        let next = swot::update_item(&self.document().swot, bucket, id, text);
        self.set_swot(next);
        found
    }

    pub fn remove_swot_item(&mut self, bucket: SwotBucket, id: &str) -> bool {
        let found = self.has_swot_item(bucket, id);
        let next = swot::delete_item(&self.document().swot, bucket, id);
        self.set_swot(next);
        found
    }

    fn has_swot_item(&self, bucket: SwotBucket, id: &str) -> bool {
        self.document().swot.bucket(bucket).iter().any(|item| item.id == id)
    }

    fn set_swot(&mut self, swot: SwotData) {
        self.update(DocumentPatch {
            swot: Some(swot),
            ..DocumentPatch::default()
        });
    }

    /// Suggestions for the SWOT buckets from a short description of the center.
    ///
    /// The text is shown to the user, not stored.
    pub fn suggest_swot(&mut self, context: &str) -> Option<String> {
        if context.trim().is_empty() {
            self.info("describe the center first, e.g. `swot suggest \"지역 밀착형 복지관\"`");
            return None;
        }
        self.run_request(Control::SwotSuggestions, |gw| gw.swot_suggestions(context))
    }

    pub fn analyze_swot(&mut self) -> bool {
        let swot = self.document().swot.clone();
        if !swot.has_items() {
            self.info("add SWOT items before running the matrix analysis");
            return false;
        }
        let diagnosis = self.document().diagnosis_analysis.clone();
        let Some(analysis) =
            self.run_request(Control::SwotAnalysis, |gw| gw.swot_matrix_analysis(&swot, &diagnosis))
        else {
            return false;
        };
        self.set_swot(SwotData {
            analysis: Some(analysis),
            ..swot
        });
        true
    }

    // Strategy

    pub fn set_mission(&mut self, text: &str) {
        let strategy = StrategyData {
            mission: text.trim().to_string(),
            ..self.document().strategy.clone()
        };
        self.set_strategy_data(strategy);
    }

    pub fn set_vision(&mut self, text: &str) {
        let strategy = StrategyData {
            vision: text.trim().to_string(),
            ..self.document().strategy.clone()
        };
        self.set_strategy_data(strategy);
    }

    fn set_strategy_data(&mut self, strategy: StrategyData) {
        self.update(DocumentPatch {
            strategy: Some(strategy),
            ..DocumentPatch::default()
        });
    }

    /// Ask for a vision statement derived from the mission and store it.
    pub fn suggest_vision(&mut self) -> bool {
        let mission = self.document().strategy.mission.clone();
        if mission.trim().is_empty() {
            self.info("enter the mission first; the vision is suggested from it");
            return false;
        }
        let Some(vision) = self.run_request(Control::VisionSuggestion, |gw| gw.vision_suggestion(&mission))
        else {
            return false;
        };
        self.set_vision(&strategy::clean_vision(&vision));
        true
    }

    fn strategy_context(&self) -> StrategyContext {
        let document = self.document();
        let diagnosis = self
            .context(ContextSlot::Diagnosis)
            .unwrap_or(document.diagnosis_analysis.as_str())
            .to_string();
        let swot_text = match self.context(ContextSlot::Swot) {
            Some(text) => text.to_string(),
            None => swot::matrix_text(&document.swot),
        };
        StrategyContext {
            mission: document.strategy.mission.clone(),
            vision: document.strategy.vision.clone(),
            diagnosis,
            swot_text,
        }
    }

    /// Generate alternative strategy bundles and keep them as candidates.
    pub fn generate_candidates(&mut self) -> bool {
        let context = self.strategy_context();
        if context.mission.trim().is_empty() || context.vision.trim().is_empty() {
            self.info("enter the mission and vision before generating strategies");
            return false;
        }
        let Some(candidates) =
            self.run_request(Control::StrategyCandidates, |gw| gw.strategy_candidates(&context))
        else {
            return false;
        };
        let count = candidates.len();
        let strategy = StrategyData {
            candidates: Some(candidates),
            ..self.document().strategy.clone()
        };
        self.set_strategy_data(strategy);
        self.info(format!("{count} strategy candidates generated"));
        true
    }

    /// Replace the strategy table with candidate `number` (1-based) once confirmed.
    pub fn apply_candidate(&mut self, number: usize, confirm: &mut dyn Confirm) -> Result<bool> {
        let data = self.document().strategy.clone();
        let candidates = data.candidates.as_deref().unwrap_or_default();
        if candidates.is_empty() {
            bail!("no strategy candidates yet (run `strategies generate`)");
        }
        let candidate = number
            .checked_sub(1)
            .and_then(|idx| candidates.get(idx))
            .ok_or_else(|| anyhow!("candidate {number} out of range (1-{})", candidates.len()))?;
        let Some(confirmed) = Confirmation::request(confirm, &strategy::apply_question(candidate))
        else {
            return Ok(false);
        };
        let next = strategy::apply_candidate(&data, candidate, confirmed);
        self.set_strategy_data(next);
        Ok(true)
    }

    pub fn set_strategy(&mut self, category: Category, text: &str) {
        let mut data = self.document().strategy.clone();
        data.strategies.get_mut(category).strategy = text.trim().to_string();
        self.set_strategy_data(data);
    }

    /// Set task `number` (1-5) of a category.
    pub fn set_strategy_task(&mut self, category: Category, number: usize, text: &str) -> Result<()> {
        if !(1..=TASKS_PER_STRATEGY).contains(&number) {
            bail!("task number must be between 1 and {TASKS_PER_STRATEGY}");
        }
        let mut data = self.document().strategy.clone();
        let tasks = &mut data.strategies.get_mut(category).tasks;
        tasks.resize(TASKS_PER_STRATEGY, String::new());
        tasks[number - 1] = text.trim().to_string();
        self.set_strategy_data(data);
        Ok(())
    }

    // Action ideas

    pub fn set_idea(&mut self, category: Category, field: ActionIdeaField, text: &str) {
        let next = ideas::update_field(&self.document().action_ideas, category, field, text);
        self.set_ideas(next);
    }

    fn set_ideas(&mut self, ideas: ActionIdeaData) {
        self.update(DocumentPatch {
            action_ideas: Some(ideas),
            ..DocumentPatch::default()
        });
    }

    /// Action idea suggestions, from `context` or the current ideas and strategy.
    pub fn suggest_ideas(&mut self, context: Option<&str>) -> Option<String> {
        let context = match context.map(str::trim).filter(|text| !text.is_empty()) {
            Some(text) => text.to_string(),
            None => {
                let document = self.document();
                format!(
                    "{}\n{}",
                    strategy::strategy_text(&document.strategy),
                    ideas::ideas_context(&document.action_ideas)
                )
            }
        };
        self.run_request(Control::IdeaSuggestions, |gw| gw.idea_suggestions(&context))
    }

    // Roadmap

    pub fn set_goal(&mut self, category: Category, phase: RoadmapPhase, text: &str) {
        let goals = roadmap::upsert_goal(&self.document().roadmap_goals, category, phase, text.trim());
        self.update(DocumentPatch {
            roadmap_goals: Some(goals),
            ..DocumentPatch::default()
        });
    }

    /// Add a task to a cell; returns its id.
    pub fn add_task(&mut self, category: Category, phase: RoadmapPhase, text: &str) -> String {
        let (tasks, id) =
            roadmap::add_task(&self.store.document().roadmap, category, phase, &mut self.ids);
        let tasks = roadmap::update_task(&tasks, &id, text.trim());
        self.set_tasks(tasks);
        id
    }

    pub fn edit_task(&mut self, id: &str, text: &str) -> bool {
        let found = self.has_task(id);
        let tasks = roadmap::update_task(&self.document().roadmap, id, text.trim());
        self.set_tasks(tasks);
        found
    }

    pub fn remove_task(&mut self, id: &str) -> bool {
        let found = self.has_task(id);
        let tasks = roadmap::remove_task(&self.document().roadmap, id);
        self.set_tasks(tasks);
        found
    }

    fn has_task(&self, id: &str) -> bool {
        self.document().roadmap.iter().any(|task| task.id == id)
    }

    fn set_tasks(&mut self, tasks: Vec<RoadmapItem>) {
        self.update(DocumentPatch {
            roadmap: Some(tasks),
            ..DocumentPatch::default()
        });
    }

    /// Generate goals and tasks for every cell; replaces the whole roadmap.
    pub fn generate_roadmap(&mut self) -> bool {
        let document = self.document();
        let strategy_text = match self.context(ContextSlot::Strategy) {
            Some(text) => text.to_string(),
            None => strategy::strategy_text(&document.strategy),
        };
        let swot_text = match self.context(ContextSlot::Swot) {
            Some(text) => text.to_string(),
            None if document.swot.analysis.is_some() => swot::matrix_text(&document.swot),
            None => String::new(),
        };
        if strategy_text.trim().is_empty() && swot_text.trim().is_empty() {
            self.info("roadmap generation needs a strategy table or SWOT analysis (enter one or use `context`)");
            return false;
        }
        let Some(drafts) =
            self.run_request(Control::Roadmap, |gw| gw.roadmap(&strategy_text, &swot_text))
        else {
            return false;
        };
        let (goals, tasks) = roadmap::from_drafts(&drafts, &mut self.ids);
        self.update(DocumentPatch {
            roadmap_goals: Some(goals),
            roadmap: Some(tasks),
            ..DocumentPatch::default()
        });
        true
    }

    // Files

    fn read_attachment(path: &Path) -> Result<Attachment> {
        let bytes = fs::read(path).with_context(|| format!("read upload {}", path.display()))?;
        Ok(Attachment {
            bytes,
            mime_type: template::mime_for_path(path).to_string(),
        })
    }

    /// Read an uploaded file into the current stage.
    ///
    /// Structured imports merge into the stage's slice; text-only imports fill
    /// the stage's context slot.
    pub fn import_file(&mut self, path: &Path, mode: ExtractMode) -> Result<bool> {
        let stage = self.stage();
        if mode == ExtractMode::TextOnly {
            let slot = ContextSlot::for_stage(stage).ok_or_else(|| {
                anyhow!("no text context for the {stage} stage (use `context diagnosis|swot|strategy <path>`)")
            })?;
            return self.import_context(slot, path);
        }
        if stage == Stage::Report {
            bail!("file import is not available for the report stage");
        }
        let attachment = Self::read_attachment(path)?;
        let Some(extract) = self.run_request(Control::FileImport, |gw| {
            gw.file_extract(attachment, stage, ExtractMode::Structured)
        }) else {
            return Ok(false);
        };
        self.apply_extract(extract);
        Ok(true)
    }

    /// Read a file as plain text and keep it as prompt context.
    pub fn import_context(&mut self, slot: ContextSlot, path: &Path) -> Result<bool> {
        let attachment = Self::read_attachment(path)?;
        let stage = self.stage();
        let Some(extract) = self.run_request(Control::FileImport, |gw| {
            gw.file_extract(attachment, stage, ExtractMode::TextOnly)
        }) else {
            return Ok(false);
        };
        let FileExtract::Text(text) = extract else {
            return Ok(false);
        };
        tracing::debug!(slot = %slot, bytes = text.len(), "context loaded");
        self.contexts.insert(slot, text);
        Ok(true)
    }

    fn apply_extract(&mut self, extract: FileExtract) {
        let document = self.document().clone();
        match extract {
            FileExtract::Text(text) => {
                tracing::debug!(bytes = text.len(), "ignoring text extract in structured import");
            }
            FileExtract::Diagnosis(details) => self.update(DocumentPatch {
                diagnosis: Some(DiagnosisScore::from_details(details)),
                ..DocumentPatch::default()
            }),
            FileExtract::Swot(import) => {
                let next = swot::import_items(&document.swot, &import, &mut self.ids);
                self.set_swot(next);
            }
            FileExtract::Strategy(import) => {
                self.set_strategy_data(strategy::apply_import(&document.strategy, &import));
            }
            FileExtract::ActionIdeas(import) => {
                self.set_ideas(ideas::apply_import(&document.action_ideas, &import));
            }
            FileExtract::Roadmap(rows) => {
                let tasks = roadmap::import_tasks(&document.roadmap, &rows, &mut self.ids);
                self.set_tasks(tasks);
            }
        }
        let stage = self.stage();
        self.info(format!("file imported into the {stage} stage"));
    }

    // Reset

    /// Restore the current stage's slice to its defaults once confirmed.
    ///
    /// On the report stage the whole session starts over.
    pub fn reset_stage(&mut self, confirm: &mut dyn Confirm) -> bool {
        let stage = self.stage();
        let question = if stage == Stage::Report {
            RESTART_QUESTION
        } else {
            RESET_QUESTION
        };
        if Confirmation::request(confirm, question).is_none() {
            return false;
        }
        match stage {
            Stage::Diagnosis => self.update(DocumentPatch {
                diagnosis: Some(DiagnosisScore::default()),
                diagnosis_analysis: Some(String::new()),
                ..DocumentPatch::default()
            }),
            Stage::Swot => self.set_swot(SwotData::default()),
            Stage::Strategy => {
                self.set_strategy_data(StrategyData::default());
                self.contexts.remove(&ContextSlot::Diagnosis);
                self.contexts.remove(&ContextSlot::Swot);
            }
            Stage::ActionIdeas => self.set_ideas(ActionIdeaData::default()),
            Stage::Roadmap => {
                self.update(DocumentPatch {
                    roadmap_goals: Some(Vec::new()),
                    roadmap: Some(Vec::new()),
                    ..DocumentPatch::default()
                });
                self.contexts.remove(&ContextSlot::Strategy);
                self.contexts.remove(&ContextSlot::Swot);
            }
            Stage::Report => {
                self.store = DocumentStore::initialize();
                self.stages = StageSequencer::new();
                self.contexts.clear();
                self.submission = SubmissionOutcome::default();
            }
        }
        tracing::debug!(stage = %stage, "stage reset");
        true
    }

    // Output

    pub fn render_report(&self, format: ReportFormat) -> String {
        let date = chrono::Local::now().format("%Y-%m-%d").to_string();
        report::render(self.document(), format, &date)
    }

    /// Write the report; returns the path used.
    pub fn write_report(&self, format: ReportFormat, path: Option<&Path>) -> Result<PathBuf> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => report::default_file_name(self.document(), format).into(),
        };
        fs::write(&path, self.render_report(format))
            .with_context(|| format!("write report {}", path.display()))?;
        Ok(path)
    }

    pub fn export(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self.document()).context("serialize document")?;
        fs::write(path, format!("{json}\n")).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    /// Send the document to the configured sink.
    pub fn submit(&mut self) -> SubmissionOutcome {
        let outcome = self.sink.submit(self.document());
        self.notice = Some(match &outcome {
            SubmissionOutcome::DispatchFailed(reason) => Notice::SubmissionFailed(reason.clone()),
            SubmissionOutcome::Pending | SubmissionOutcome::DispatchedAssumedOk => Notice::Submitted,
        });
        self.submission = outcome.clone();
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::tests::{full_roadmap_json, ScriptedBackend};
    use crate::document::SwotAnalysisResult;
    use crate::sink::tests::RecordingSink;

    struct Answer(bool);

    impl Confirm for Answer {
        fn confirm(&mut self, _question: &str) -> bool {
            self.0
        }
    }

    fn session(backend: &ScriptedBackend) -> WorkshopSession {
        let gateway = Gateway::new(Box::new(backend.clone()), "Korean (한국어)");
        WorkshopSession::new(gateway, Box::new(RecordingSink::new(SubmissionOutcome::DispatchedAssumedOk)))
    }

    const CANDIDATES: &str = r#"Here you go:
```json
{"candidates": [
  {"versionName": "Version 1",
   "environment": {"strategy": "1. 탄소중립", "tasks": ["- 에너지 절감", "• 분리배출"]},
   "social": {"strategy": "**지역상생**", "tasks": []},
   "governance": {"strategy": "투명경영", "tasks": ["a", "b", "c", "d", "e", "f"]}},
  {"versionName": "Version 2",
   "environment": {"strategy": "e2", "tasks": []},
   "social": {"strategy": "s2", "tasks": []},
   "governance": {"strategy": "g2", "tasks": []}}
]}
```"#;

    #[test]
    fn set_score_recomputes_category() {
        let mut session = session(&ScriptedBackend::default());
        assert_eq!(session.set_score("E1-1", "4").unwrap(), 4.0);
        assert_eq!(session.document().diagnosis.environment, 20);
        assert_eq!(session.set_score("e2_1", "9").unwrap(), 4.0);
        assert_eq!(session.document().diagnosis.environment, 40);
        assert_eq!(session.set_score("s1_1", "abc").unwrap(), 0.0);
    }

    #[test]
    fn unknown_indicator_is_rejected_without_change() {
        let mut session = session(&ScriptedBackend::default());
        let before = session.document().clone();
        assert!(session.set_score("x9_9", "3").is_err());
        assert_eq!(session.document(), &before);
    }

    #[test]
    fn diagnosis_analysis_success_and_failure() {
        let backend = ScriptedBackend::with(&["```html\n<h3>1. 종합 평가</h3>\n```"]);
        let mut session = session(&backend);
        assert!(session.analyze_diagnosis());
        assert_eq!(session.document().diagnosis_analysis, "<h3>1. 종합 평가</h3>");

        backend.push_failure("network down");
        let before = session.document().clone();
        assert!(!session.analyze_diagnosis());
        assert_eq!(session.document(), &before);
        assert!(matches!(
            session.take_notice(),
            Some(Notice::AnalysisFailed { control: Control::DiagnosisAnalysis, .. })
        ));
        assert!(session.notice().is_none());
    }

    #[test]
    fn stale_tokens_are_rejected() {
        let mut tracker = RequestTracker::default();
        let first = tracker.begin(Control::Roadmap);
        let other = tracker.begin(Control::SwotAnalysis);
        let second = tracker.begin(Control::Roadmap);
        assert!(!tracker.finish(&first));
        assert!(tracker.finish(&second));
        assert!(tracker.finish(&other));
    }

    #[test]
    fn swot_edits_and_analysis() {
        let backend = ScriptedBackend::with(&[r#"{
            "summarized": {"strengths": ["s"], "weaknesses": [], "opportunities": [], "threats": []},
            "matrix": {"so": ["확장: 설명"], "wo": [], "st": [], "wt": []}
        }"#]);
        let mut session = session(&backend);
        assert!(!session.analyze_swot());
        assert!(matches!(session.take_notice(), Some(Notice::Info(_))));
        assert!(backend.prompts.borrow().is_empty());

        let id = session.add_swot_item(SwotBucket::Strengths, "전문 인력");
        assert!(session.edit_swot_item(SwotBucket::Strengths, &id, "숙련된 인력"));
        assert!(!session.remove_swot_item(SwotBucket::Threats, &id));
        assert!(session.analyze_swot());
        let swot = &session.document().swot;
        assert_eq!(swot.strengths[0].text, "숙련된 인력");
        assert_eq!(swot.analysis.as_ref().unwrap().matrix.so, ["확장: 설명"]);
    }

    const FULL_SWOT_ANALYSIS: &str = r#"{
        "summarized": {
            "strengths": ["우수한 인력", "지역 네트워크", "시설 인프라", "후원 기반", "프로그램 경험"],
            "weaknesses": ["예산 부족", "인력 이탈", "홍보 부족", "공간 협소", "노후 설비"],
            "opportunities": ["정책 지원", "ESG 관심 증가", "지역 협력", "기업 후원", "디지털 전환"],
            "threats": ["예산 감소", "경쟁 기관", "고령화", "규제 강화", "경기 침체"]
        },
        "matrix": {
            "so": ["인력 활용: 전문 인력으로 정책 사업 수행"],
            "wo": ["재원 확보: 기업 후원으로 예산 보완"],
            "st": ["네트워크 강화: 지역 협력으로 경쟁 대응"],
            "wt": ["효율화: 노후 설비 교체로 비용 절감"]
        }
    }"#;

    #[test]
    fn swot_analysis_is_stored_exactly_as_returned() {
        let backend = ScriptedBackend::with(&[FULL_SWOT_ANALYSIS]);
        let mut session = session(&backend);
        session.add_swot_item(SwotBucket::Strengths, "우수한 인력");
        assert!(session.analyze_swot());

        let expected: SwotAnalysisResult = serde_json::from_str(FULL_SWOT_ANALYSIS).unwrap();
        assert_eq!(session.document().swot.analysis, Some(expected));
        assert_eq!(session.document().swot.strengths.len(), 1);
        assert!(backend.prompts.borrow()[0].contains("Strengths: 우수한 인력"));
    }

    #[test]
    fn swot_suggestions_are_returned_not_stored() {
        let backend = ScriptedBackend::with(&["- 강점: 지역 네트워크"]);
        let mut session = session(&backend);
        let before = session.document().clone();
        assert_eq!(session.suggest_swot("   "), None);
        assert_eq!(
            session.suggest_swot("노인복지관").as_deref(),
            Some("- 강점: 지역 네트워크")
        );
        assert_eq!(session.document(), &before);
    }

    #[test]
    fn vision_suggestion_is_stored_without_quotes() {
        let backend = ScriptedBackend::with(&["\"함께 여는 지속가능한 내일\""]);
        let mut session = session(&backend);
        assert!(!session.suggest_vision());
        session.set_mission("지역사회와 함께");
        assert!(session.suggest_vision());
        assert_eq!(session.document().strategy.vision, "함께 여는 지속가능한 내일");
        assert!(backend.prompts.borrow()[0].contains("지역사회와 함께"));
    }

    #[test]
    fn candidates_require_mission_and_vision_then_apply_on_confirm() {
        let backend = ScriptedBackend::with(&[CANDIDATES]);
        let mut session = session(&backend);
        assert!(!session.generate_candidates());
        assert!(backend.prompts.borrow().is_empty());

        session.set_mission("m");
        session.set_vision("v");
        session.set_strategy(Category::Social, "기존 전략");
        assert!(session.generate_candidates());
        assert_eq!(session.document().strategy.candidates.as_ref().map(Vec::len), Some(2));

        let before = session.document().clone();
        assert!(!session.apply_candidate(1, &mut Answer(false)).unwrap());
        assert_eq!(session.document(), &before);
        assert!(session.apply_candidate(3, &mut Answer(true)).is_err());

        assert!(session.apply_candidate(1, &mut Answer(true)).unwrap());
        let strategy = &session.document().strategy;
        assert_eq!(strategy.mission, "m");
        assert_eq!(strategy.strategies.environment.strategy, "탄소중립");
        assert_eq!(strategy.strategies.environment.tasks[..2], ["에너지 절감", "분리배출"]);
        assert_eq!(strategy.strategies.social.strategy, "지역상생");
        assert_eq!(strategy.strategies.social.tasks, vec![String::new(); 5]);
        assert_eq!(strategy.strategies.governance.tasks, ["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn uploaded_context_overrides_prompt_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let upload = dir.path().join("swot.txt");
        fs::write(&upload, "SWOT 결과").unwrap();

        let backend = ScriptedBackend::with(&[r#"{"text": "업로드된 SWOT 분석"}"#]);
        backend.push(&full_roadmap_json());
        let mut session = session(&backend);
        assert!(!session.generate_roadmap());

        assert!(session.import_context(ContextSlot::Swot, &upload).unwrap());
        assert_eq!(session.context(ContextSlot::Swot), Some("업로드된 SWOT 분석"));
        assert!(session.generate_roadmap());
        assert!(backend.prompts.borrow()[1].contains("업로드된 SWOT 분석"));
        assert_eq!(session.document().roadmap_goals.len(), 9);
        assert_eq!(session.document().roadmap.len(), 18);
    }

    #[test]
    fn malformed_roadmap_leaves_existing_roadmap() {
        let backend = ScriptedBackend::with(&[r#"[{"category": "E", "year": "도입기 (2026년)", "goal": "g", "tasks": []}]"#]);
        let mut session = session(&backend);
        session.set_strategy(Category::Environment, "탄소중립");
        let id = session.add_task(Category::Environment, RoadmapPhase::Introduction, "기존 과제");
        assert!(!session.generate_roadmap());
        assert_eq!(session.document().roadmap.len(), 1);
        assert_eq!(session.document().roadmap[0].id, id);
        assert!(matches!(session.take_notice(), Some(Notice::AnalysisFailed { .. })));
    }

    #[test]
    fn roadmap_task_editing() {
        let mut session = session(&ScriptedBackend::default());
        session.set_goal(Category::Social, RoadmapPhase::Expansion, "지역 협력");
        session.set_goal(Category::Social, RoadmapPhase::Expansion, "지역 협력 확대");
        assert_eq!(session.document().roadmap_goals.len(), 1);

        let id = session.add_task(Category::Social, RoadmapPhase::Expansion, "협약 체결");
        assert!(session.edit_task(&id, "협약 3건 체결"));
        assert!(!session.edit_task("missing", "x"));
        assert_eq!(session.document().roadmap[0].task, "협약 3건 체결");
        assert!(session.remove_task(&id));
        assert!(session.document().roadmap.is_empty());
    }

    #[test]
    fn structured_import_follows_current_stage() {
        let dir = tempfile::tempdir().unwrap();
        let upload = dir.path().join("scores.csv");
        fs::write(&upload, "Code,Score\nE1-1,4.0\n").unwrap();

        let backend = ScriptedBackend::with(&[
            r#"{"details": {"e1_1": 4, "e2_1": "4.0", "zz_9": 3}}"#,
            r#"{"strengths": ["신규 강점"]}"#,
        ]);
        let mut session = session(&backend);
        assert!(session.import_file(&upload, ExtractMode::Structured).unwrap());
        assert_eq!(session.document().diagnosis.environment, 40);

        session.advance();
        session.add_swot_item(SwotBucket::Strengths, "기존 강점");
        assert!(session.import_file(&upload, ExtractMode::Structured).unwrap());
        let texts: Vec<_> = session.document().swot.strengths.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, ["기존 강점", "신규 강점"]);

        assert!(session.import_file(&dir.path().join("missing.csv"), ExtractMode::Structured).is_err());
    }

    #[test]
    fn reset_requires_confirmation() {
        let mut session = session(&ScriptedBackend::default());
        session.set_score("g1_1", "3").unwrap();
        assert!(!session.reset_stage(&mut Answer(false)));
        assert_eq!(session.document().diagnosis.details.get("g1_1"), 3.0);
        assert!(session.reset_stage(&mut Answer(true)));
        assert_eq!(session.document().diagnosis, DiagnosisScore::default());
    }

    #[test]
    fn report_stage_reset_starts_over() {
        let mut session = session(&ScriptedBackend::default());
        session.set_team_name("1모둠");
        while session.advance() {}
        assert_eq!(session.stage(), Stage::Report);
        assert!(session.reset_stage(&mut Answer(true)));
        assert_eq!(session.stage(), Stage::Diagnosis);
        assert_eq!(session.document(), &WorkshopDocument::initialize());
    }

    #[test]
    fn submission_outcomes_set_distinct_notices() {
        let sink = RecordingSink::new(SubmissionOutcome::DispatchFailed("offline".into()));
        let mut failing = WorkshopSession::new(Gateway::unconfigured(), Box::new(sink.clone()));
        failing.set_team_name("A");
        assert!(matches!(failing.submit(), SubmissionOutcome::DispatchFailed(_)));
        assert_eq!(failing.take_notice(), Some(Notice::SubmissionFailed("offline".into())));
        assert_eq!(sink.received.borrow()[0].team_name, "A");

        let mut ok = session(&ScriptedBackend::default());
        assert_eq!(ok.submit(), SubmissionOutcome::DispatchedAssumedOk);
        assert_eq!(ok.take_notice(), Some(Notice::Submitted));
        assert_eq!(ok.submission(), &SubmissionOutcome::DispatchedAssumedOk);
    }

    #[test]
    fn unconfigured_gateway_sets_notice() {
        let mut session = WorkshopSession::new(
            Gateway::unconfigured(),
            Box::new(RecordingSink::new(SubmissionOutcome::Pending)),
        );
        assert!(!session.analyze_diagnosis());
        let notice = session.take_notice().unwrap().to_string();
        assert!(notice.contains("no LM backend configured"), "{notice}");
    }

    #[test]
    fn export_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        let mut session = session(&ScriptedBackend::default());
        session.set_team_name("모둠");
        session.set_idea(Category::Governance, ActionIdeaField::Idea, "윤리 교육");
        session.export(&path).unwrap();
        let back = read_document(&path).unwrap();
        assert_eq!(&back, session.document());

        let report = session.write_report(ReportFormat::Html, Some(&dir.path().join("r.html"))).unwrap();
        assert!(fs::read_to_string(report).unwrap().contains("윤리 교육"));
    }

    #[test]
    fn read_document_ignores_stored_category_scores() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        let mut value = serde_json::to_value(WorkshopDocument::initialize()).unwrap();
        value["diagnosis"]["environment"] = 99.into();
        value["diagnosis"]["details"]["g1_1"] = 4.into();
        value["strategy"]["strategies"]["environment"]["tasks"] = serde_json::json!([]);
        fs::write(&path, value.to_string()).unwrap();

        let doc = read_document(&path).unwrap();
        assert_eq!(doc.diagnosis.environment, 0);
        assert_eq!(doc.diagnosis.governance, 8);
        assert_eq!(doc.strategy.strategies.environment.tasks.len(), 5);
    }
}
