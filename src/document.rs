//! The workshop document and its store.
//!
//! One `WorkshopDocument` exists per session. Stages read the whole document
//! and write their own slice through `DocumentStore::update_slice`, which is a
//! shallow merge of whole top-level fields.
use crate::catalog::{Category, RoadmapPhase, INDICATORS};
use crate::score;
use crate::strategy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Number of tasks carried by every strategy item.
pub const TASKS_PER_STRATEGY: usize = 5;

/// Raw 0.0–4.0 ratings keyed by indicator key.
///
/// Always holds exactly the catalog keys; construction and deserialization
/// both go through the catalog so extra keys are dropped and missing keys are
/// filled with 0.0.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DiagnosisDetails(BTreeMap<String, f64>);

impl DiagnosisDetails {
    /// All 38 indicators at 0.0.
    pub fn zeroed() -> Self {
        DiagnosisDetails(
            INDICATORS
                .iter()
                .map(|indicator| (indicator.key.to_string(), 0.0))
                .collect(),
        )
    }

    /// Build from loosely typed values (file extraction, saved documents).
    ///
    /// Numbers are taken as-is, strings are coerced, anything else counts as 0.
    pub fn from_values(values: &BTreeMap<String, Value>) -> Self {
        let mut details = Self::zeroed();
        for (key, raw) in values {
            match details.0.get_mut(key.as_str()) {
                Some(slot) => *slot = score::coerce_json_score(raw),
                None => tracing::warn!(key = key.as_str(), "dropping unknown indicator key"),
            }
        }
        details
    }

    /// Score for a key; unknown keys read as 0.
    pub fn get(&self, key: &str) -> f64 {
        self.0.get(key).copied().unwrap_or(0.0)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Return a copy with one key replaced; `None` when the key is not in the catalog.
    pub fn with_value(&self, key: &str, value: f64) -> Option<Self> {
        if !self.contains_key(key) {
            return None;
        }
        let mut next = self.0.clone();
        next.insert(key.to_string(), value);
        Some(DiagnosisDetails(next))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(key, value)| (key.as_str(), *value))
    }

    /// Indicators rated above zero.
    pub fn rated_count(&self) -> usize {
        self.iter().filter(|(_, value)| *value > 0.0).count()
    }
}

impl Default for DiagnosisDetails {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl<'de> Deserialize<'de> for DiagnosisDetails {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        Ok(DiagnosisDetails::from_values(&raw))
    }
}

/// Normalized 0–100 category scores plus the raw details they derive from.
///
/// Only `details` is read back from JSON; the category scores are always
/// recomputed from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(from = "StoredDiagnosis")]
pub struct DiagnosisScore {
    pub environment: u8,
    pub social: u8,
    pub governance: u8,
    pub details: DiagnosisDetails,
}

impl DiagnosisScore {
    /// Derive all three category scores from a full detail map.
    pub fn from_details(details: DiagnosisDetails) -> Self {
        let scores = score::recompute_diagnosis_score(&details);
        DiagnosisScore {
            environment: scores.environment,
            social: scores.social,
            governance: scores.governance,
            details,
        }
    }

    pub fn category_score(&self, category: Category) -> u8 {
        match category {
            Category::Environment => self.environment,
            Category::Social => self.social,
            Category::Governance => self.governance,
        }
    }
}

#[derive(Deserialize)]
struct StoredDiagnosis {
    #[serde(default)]
    details: DiagnosisDetails,
}

impl From<StoredDiagnosis> for DiagnosisScore {
    fn from(stored: StoredDiagnosis) -> Self {
        DiagnosisScore::from_details(stored.details)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwotItem {
    pub id: String,
    pub text: String,
}

/// The four SWOT buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwotBucket {
    Strengths,
    Weaknesses,
    Opportunities,
    Threats,
}

impl SwotBucket {
    pub const ALL: [SwotBucket; 4] = [
        SwotBucket::Strengths,
        SwotBucket::Weaknesses,
        SwotBucket::Opportunities,
        SwotBucket::Threats,
    ];

    pub fn field_name(&self) -> &'static str {
        match self {
            SwotBucket::Strengths => "strengths",
            SwotBucket::Weaknesses => "weaknesses",
            SwotBucket::Opportunities => "opportunities",
            SwotBucket::Threats => "threats",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            SwotBucket::Strengths => "Strengths",
            SwotBucket::Weaknesses => "Weaknesses",
            SwotBucket::Opportunities => "Opportunities",
            SwotBucket::Threats => "Threats",
        }
    }

    /// Heading used in the report grid.
    pub fn report_label(&self) -> &'static str {
        match self {
            SwotBucket::Strengths => "S (강점)",
            SwotBucket::Weaknesses => "W (약점)",
            SwotBucket::Opportunities => "O (기회)",
            SwotBucket::Threats => "T (위협)",
        }
    }
}

impl std::str::FromStr for SwotBucket {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "s" | "strength" | "strengths" => Ok(SwotBucket::Strengths),
            "w" | "weakness" | "weaknesses" => Ok(SwotBucket::Weaknesses),
            "o" | "opportunity" | "opportunities" => Ok(SwotBucket::Opportunities),
            "t" | "threat" | "threats" => Ok(SwotBucket::Threats),
            other => Err(format!("unknown SWOT bucket: {other} (expected s, w, o or t)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwotSummary {
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub opportunities: Vec<String>,
    pub threats: Vec<String>,
}

/// SO/WO/ST/WT strategy lists; each entry reads "keyword: explanation".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwotMatrix {
    pub so: Vec<String>,
    pub wo: Vec<String>,
    pub st: Vec<String>,
    pub wt: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwotAnalysisResult {
    pub summarized: SwotSummary,
    pub matrix: SwotMatrix,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SwotData {
    pub strengths: Vec<SwotItem>,
    pub weaknesses: Vec<SwotItem>,
    pub opportunities: Vec<SwotItem>,
    pub threats: Vec<SwotItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<SwotAnalysisResult>,
}

impl SwotData {
    pub fn bucket(&self, bucket: SwotBucket) -> &[SwotItem] {
        match bucket {
            SwotBucket::Strengths => &self.strengths,
            SwotBucket::Weaknesses => &self.weaknesses,
            SwotBucket::Opportunities => &self.opportunities,
            SwotBucket::Threats => &self.threats,
        }
    }

    pub fn bucket_mut(&mut self, bucket: SwotBucket) -> &mut Vec<SwotItem> {
        match bucket {
            SwotBucket::Strengths => &mut self.strengths,
            SwotBucket::Weaknesses => &mut self.weaknesses,
            SwotBucket::Opportunities => &mut self.opportunities,
            SwotBucket::Threats => &mut self.threats,
        }
    }

    pub fn has_items(&self) -> bool {
        SwotBucket::ALL
            .iter()
            .any(|bucket| !self.bucket(*bucket).is_empty())
    }
}

/// One strategic statement plus its five tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredStrategyItem")]
pub struct StrategyItem {
    pub strategy: String,
    pub tasks: Vec<String>,
}

#[derive(Deserialize)]
struct StoredStrategyItem {
    #[serde(default)]
    strategy: String,
    #[serde(default)]
    tasks: Vec<String>,
}

impl From<StoredStrategyItem> for StrategyItem {
    fn from(stored: StoredStrategyItem) -> Self {
        StrategyItem {
            strategy: stored.strategy,
            tasks: strategy::prepare_tasks(&stored.tasks, strategy::trimmed),
        }
    }
}

impl Default for StrategyItem {
    fn default() -> Self {
        StrategyItem {
            strategy: String::new(),
            tasks: vec![String::new(); TASKS_PER_STRATEGY],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StrategyGroup {
    pub environment: StrategyItem,
    pub social: StrategyItem,
    pub governance: StrategyItem,
}

impl StrategyGroup {
    pub fn get(&self, category: Category) -> &StrategyItem {
        match category {
            Category::Environment => &self.environment,
            Category::Social => &self.social,
            Category::Governance => &self.governance,
        }
    }

    pub fn get_mut(&mut self, category: Category) -> &mut StrategyItem {
        match category {
            Category::Environment => &mut self.environment,
            Category::Social => &mut self.social,
            Category::Governance => &mut self.governance,
        }
    }
}

/// An alternative strategy bundle proposed by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyCandidate {
    #[serde(default)]
    pub version_name: String,
    pub environment: StrategyItem,
    pub social: StrategyItem,
    pub governance: StrategyItem,
}

impl StrategyCandidate {
    pub fn get(&self, category: Category) -> &StrategyItem {
        match category {
            Category::Environment => &self.environment,
            Category::Social => &self.social,
            Category::Governance => &self.governance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StrategyData {
    pub mission: String,
    pub vision: String,
    pub strategies: StrategyGroup,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<StrategyCandidate>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ActionIdeaRow {
    #[serde(default)]
    pub as_is: String,
    #[serde(default)]
    pub to_be: String,
    #[serde(default)]
    pub idea: String,
}

/// Which column of an action-idea row to edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionIdeaField {
    AsIs,
    ToBe,
    Idea,
}

impl ActionIdeaRow {
    pub fn field_mut(&mut self, field: ActionIdeaField) -> &mut String {
        match field {
            ActionIdeaField::AsIs => &mut self.as_is,
            ActionIdeaField::ToBe => &mut self.to_be,
            ActionIdeaField::Idea => &mut self.idea,
        }
    }
}

impl std::str::FromStr for ActionIdeaField {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "asis" | "current" => Ok(ActionIdeaField::AsIs),
            "tobe" | "future" => Ok(ActionIdeaField::ToBe),
            "idea" => Ok(ActionIdeaField::Idea),
            other => Err(format!("unknown idea field: {other} (expected as-is, to-be or idea)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ActionIdeaData {
    pub environment: ActionIdeaRow,
    pub social: ActionIdeaRow,
    pub governance: ActionIdeaRow,
}

impl ActionIdeaData {
    pub fn get(&self, category: Category) -> &ActionIdeaRow {
        match category {
            Category::Environment => &self.environment,
            Category::Social => &self.social,
            Category::Governance => &self.governance,
        }
    }

    pub fn get_mut(&mut self, category: Category) -> &mut ActionIdeaRow {
        match category {
            Category::Environment => &mut self.environment,
            Category::Social => &mut self.social,
            Category::Governance => &mut self.governance,
        }
    }
}

/// At most one goal exists per (category, phase).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapGoal {
    pub category: Category,
    pub year: RoadmapPhase,
    pub goal: String,
}

/// A roadmap task; (category, phase) groups tasks but does not identify them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapItem {
    pub id: String,
    pub category: Category,
    pub task: String,
    pub year: RoadmapPhase,
}

/// The root aggregate for one workshop session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkshopDocument {
    pub team_name: String,
    pub diagnosis: DiagnosisScore,
    pub diagnosis_analysis: String,
    pub swot: SwotData,
    pub strategy: StrategyData,
    pub action_ideas: ActionIdeaData,
    pub roadmap_goals: Vec<RoadmapGoal>,
    pub roadmap: Vec<RoadmapItem>,
}

impl WorkshopDocument {
    /// A document with every field at its zero/empty default.
    pub fn initialize() -> Self {
        WorkshopDocument::default()
    }
}

/// A partial update: present fields replace the matching top-level field wholesale.
#[derive(Debug, Clone, Default)]
pub struct DocumentPatch {
    pub team_name: Option<String>,
    pub diagnosis: Option<DiagnosisScore>,
    pub diagnosis_analysis: Option<String>,
    pub swot: Option<SwotData>,
    pub strategy: Option<StrategyData>,
    pub action_ideas: Option<ActionIdeaData>,
    pub roadmap_goals: Option<Vec<RoadmapGoal>>,
    pub roadmap: Option<Vec<RoadmapItem>>,
}

impl DocumentPatch {
    pub fn is_empty(&self) -> bool {
        self.team_name.is_none()
            && self.diagnosis.is_none()
            && self.diagnosis_analysis.is_none()
            && self.swot.is_none()
            && self.strategy.is_none()
            && self.action_ideas.is_none()
            && self.roadmap_goals.is_none()
            && self.roadmap.is_none()
    }
}

/// Holds the session's document and applies shallow-merge updates.
#[derive(Debug, Default)]
pub struct DocumentStore {
    document: WorkshopDocument,
    revision: u64,
}

impl DocumentStore {
    pub fn initialize() -> Self {
        DocumentStore {
            document: WorkshopDocument::initialize(),
            revision: 0,
        }
    }

    pub fn from_document(document: WorkshopDocument) -> Self {
        DocumentStore {
            document,
            revision: 0,
        }
    }

    pub fn document(&self) -> &WorkshopDocument {
        &self.document
    }

    /// Increments on every non-empty update.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Merge the present fields of `patch` into the document. No validation.
    pub fn update_slice(&mut self, patch: DocumentPatch) {
        if patch.is_empty() {
            return;
        }
        let doc = &mut self.document;
        if let Some(team_name) = patch.team_name {
            doc.team_name = team_name;
        }
        if let Some(diagnosis) = patch.diagnosis {
            doc.diagnosis = diagnosis;
        }
        if let Some(analysis) = patch.diagnosis_analysis {
            doc.diagnosis_analysis = analysis;
        }
        if let Some(swot) = patch.swot {
            doc.swot = swot;
        }
        if let Some(strategy) = patch.strategy {
            doc.strategy = strategy;
        }
        if let Some(action_ideas) = patch.action_ideas {
            doc.action_ideas = action_ideas;
        }
        if let Some(goals) = patch.roadmap_goals {
            doc.roadmap_goals = goals;
        }
        if let Some(roadmap) = patch.roadmap {
            doc.roadmap = roadmap;
        }
        self.revision += 1;
    }
}

/// Generates ids for SWOT items and roadmap tasks.
///
/// Ids combine the session start time with a sequence number, so they stay
/// unique within a session and do not collide with ids of a re-loaded export.
#[derive(Debug)]
pub struct IdSource {
    prefix: i64,
    next: u64,
}

impl IdSource {
    pub fn new() -> Self {
        IdSource {
            prefix: chrono::Utc::now().timestamp_millis(),
            next: 0,
        }
    }

    pub fn next_id(&mut self) -> String {
        self.next += 1;
        format!("{}-{}", self.prefix, self.next)
    }
}

impl Default for IdSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn initialize_uses_zero_defaults() {
        let doc = WorkshopDocument::initialize();
        assert_eq!(doc.team_name, "");
        assert_eq!(doc.diagnosis.details.iter().count(), 38);
        assert_eq!(doc.diagnosis.details.rated_count(), 0);
        assert!(doc.diagnosis.details.iter().all(|(_, v)| v == 0.0));
        assert_eq!(
            (doc.diagnosis.environment, doc.diagnosis.social, doc.diagnosis.governance),
            (0, 0, 0)
        );
        assert_eq!(doc.strategy.strategies.social.tasks.len(), TASKS_PER_STRATEGY);
        assert!(doc.roadmap.is_empty() && doc.roadmap_goals.is_empty());
        assert!(doc.swot.analysis.is_none());
    }

    #[test]
    fn update_slice_replaces_only_present_fields() {
        let mut store = DocumentStore::initialize();
        store.update_slice(DocumentPatch {
            team_name: Some("A".into()),
            ..DocumentPatch::default()
        });
        let swot = SwotData {
            strengths: vec![SwotItem {
                id: "1".into(),
                text: "x".into(),
            }],
            ..SwotData::default()
        };
        store.update_slice(DocumentPatch {
            swot: Some(swot.clone()),
            ..DocumentPatch::default()
        });
        assert_eq!(store.document().team_name, "A");
        assert_eq!(store.document().swot, swot);
        assert_eq!(store.revision(), 2);

        store.update_slice(DocumentPatch::default());
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn details_deserialize_fills_missing_and_drops_unknown() {
        let details: DiagnosisDetails =
            serde_json::from_value(json!({"e1_1": 3.5, "s1_1": "2.5", "zz": 4, "g1_1": null}))
                .unwrap();
        assert_eq!(details.iter().count(), 38);
        assert_eq!(details.rated_count(), 2);
        assert_eq!(details.get("e1_1"), 3.5);
        assert_eq!(details.get("s1_1"), 2.5);
        assert_eq!(details.get("g1_1"), 0.0);
        assert!(!details.contains_key("zz"));
    }

    #[test]
    fn with_value_rejects_unknown_keys_and_leaves_source_untouched() {
        let details = DiagnosisDetails::zeroed();
        assert!(details.with_value("nope", 1.0).is_none());
        let next = details.with_value("e2_1", 1.5).unwrap();
        assert_eq!(next.get("e2_1"), 1.5);
        assert_eq!(details.get("e2_1"), 0.0);
    }

    #[test]
    fn document_round_trips_through_json() {
        let mut doc = WorkshopDocument::initialize();
        doc.team_name = "모둠 1".into();
        doc.diagnosis = DiagnosisScore::from_details(
            DiagnosisDetails::zeroed().with_value("g4_2", 3.1).unwrap(),
        );
        doc.strategy.candidates = Some(vec![StrategyCandidate {
            version_name: "Version 1".into(),
            environment: StrategyItem::default(),
            social: StrategyItem::default(),
            governance: StrategyItem::default(),
        }]);
        doc.roadmap_goals.push(RoadmapGoal {
            category: Category::Social,
            year: RoadmapPhase::Expansion,
            goal: "g".into(),
        });
        doc.roadmap.push(RoadmapItem {
            id: "1".into(),
            category: Category::Governance,
            task: "t".into(),
            year: RoadmapPhase::Consolidation,
        });

        let json = serde_json::to_string(&doc).unwrap();
        let back: WorkshopDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn loaded_scores_are_recomputed_from_details() {
        let score: DiagnosisScore =
            serde_json::from_value(json!({"environment": 99, "social": 7, "details": {}})).unwrap();
        assert_eq!((score.environment, score.social, score.governance), (0, 0, 0));

        let score: DiagnosisScore =
            serde_json::from_value(json!({"environment": 0, "details": {"e1_1": 4}})).unwrap();
        assert_eq!(score.environment, 20);
    }

    #[test]
    fn loaded_strategy_items_carry_five_tasks() {
        let item: StrategyItem = serde_json::from_value(json!({"strategy": "s", "tasks": []})).unwrap();
        assert_eq!(item.tasks, vec![String::new(); TASKS_PER_STRATEGY]);

        let item: StrategyItem =
            serde_json::from_value(json!({"tasks": [" a ", "b", "c", "d", "e", "f"]})).unwrap();
        assert_eq!(item.strategy, "");
        assert_eq!(item.tasks, ["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn document_uses_camel_case_field_names() {
        let value = serde_json::to_value(WorkshopDocument::initialize()).unwrap();
        for field in ["teamName", "diagnosisAnalysis", "actionIdeas", "roadmapGoals"] {
            assert!(value.get(field).is_some(), "missing {field}");
        }
        assert!(value["actionIdeas"]["social"].get("asIs").is_some());
    }

    #[test]
    fn id_source_never_repeats() {
        let mut ids = IdSource::new();
        let a = ids.next_id();
        let b = ids.next_id();
        assert_ne!(a, b);
    }
}
