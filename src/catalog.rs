//! Static reference data for the self-diagnosis: the 38 indicators, their
//! ESG categories, and the fixed roadmap phases.
//!
//! Everything here is defined once at process start and never mutated, so the
//! score aggregation and report layout can rely on a stable ordering.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the three ESG pillars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "E")]
    Environment,
    #[serde(rename = "S")]
    Social,
    #[serde(rename = "G")]
    Governance,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Environment, Category::Social, Category::Governance];

    /// Single-letter code used in indicator codes and roadmap records.
    pub fn code(&self) -> &'static str {
        match self {
            Category::Environment => "E",
            Category::Social => "S",
            Category::Governance => "G",
        }
    }

    /// Field name used for per-category slices of the document.
    pub fn field_name(&self) -> &'static str {
        match self {
            Category::Environment => "environment",
            Category::Social => "social",
            Category::Governance => "governance",
        }
    }

    /// Display label used in the report.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Environment => "환경",
            Category::Social => "사회",
            Category::Governance => "지배구조",
        }
    }

    /// Derive the category from an indicator code prefix (`E1-1` -> Environment).
    pub fn from_code_prefix(code: &str) -> Option<Category> {
        match code.chars().next()?.to_ascii_uppercase() {
            'E' => Some(Category::Environment),
            'S' => Some(Category::Social),
            'G' => Some(Category::Governance),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "e" | "env" | "environment" => Ok(Category::Environment),
            "s" | "soc" | "social" => Ok(Category::Social),
            "g" | "gov" | "governance" => Ok(Category::Governance),
            other => Err(format!("unknown category: {other} (expected E, S or G)")),
        }
    }
}

/// One of the three fixed roadmap time horizons, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RoadmapPhase {
    Introduction,
    Expansion,
    Consolidation,
}

impl RoadmapPhase {
    pub const ALL: [RoadmapPhase; 3] = [
        RoadmapPhase::Introduction,
        RoadmapPhase::Expansion,
        RoadmapPhase::Consolidation,
    ];

    /// The label stored in roadmap records and shown in the report.
    pub fn label(&self) -> &'static str {
        match self {
            RoadmapPhase::Introduction => "도입기 (2026년)",
            RoadmapPhase::Expansion => "확산기 (2027년 ~ 2028년)",
            RoadmapPhase::Consolidation => "정착기 (2029년 ~ 2030년)",
        }
    }

    pub fn from_label(label: &str) -> Option<RoadmapPhase> {
        let label = label.trim();
        RoadmapPhase::ALL
            .into_iter()
            .find(|phase| phase.label() == label)
    }
}

impl fmt::Display for RoadmapPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RoadmapPhase {
    type Err = String;

    /// Accepts the full label, a 1-based index, or a short English name.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if let Some(phase) = RoadmapPhase::from_label(raw) {
            return Ok(phase);
        }
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "introduction" | "intro" | "도입기" => Ok(RoadmapPhase::Introduction),
            "2" | "expansion" | "확산기" => Ok(RoadmapPhase::Expansion),
            "3" | "consolidation" | "정착기" => Ok(RoadmapPhase::Consolidation),
            other => Err(format!("unknown roadmap phase: {other} (expected 1, 2 or 3)")),
        }
    }
}

impl Serialize for RoadmapPhase {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for RoadmapPhase {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        RoadmapPhase::from_label(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown roadmap phase label: {raw}")))
    }
}

/// Definition of a single diagnosis indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorDefinition {
    pub key: &'static str,
    pub code: &'static str,
    pub group: &'static str,
    pub label: &'static str,
}

impl IndicatorDefinition {
    pub fn category(&self) -> Category {
        // Codes in INDICATORS all start with E, S or G.
        Category::from_code_prefix(self.code).unwrap_or(Category::Governance)
    }
}

const fn ind(
    key: &'static str,
    code: &'static str,
    group: &'static str,
    label: &'static str,
) -> IndicatorDefinition {
    IndicatorDefinition {
        key,
        code,
        group,
        label,
    }
}

pub const INDICATOR_COUNT: usize = 38;

/// The indicator catalog, in report order.
pub static INDICATORS: [IndicatorDefinition; INDICATOR_COUNT] = [
    ind("e1_1", "E1-1", "친환경 경영", "지역사회가 공감하는 목표수립 과정"),
    ind("e2_1", "E2-1", "복지관의 역할 및 대응", "복지관의 가치 실현"),
    ind("e3_1", "E3-1", "탄소배출감소", "효율적 에너지 사용 시스템 구축"),
    ind("e4_1", "E4-1", "자원재순환", "자원재순환 시스템 구축 및 실천"),
    ind("e5_1", "E5-1", "환경 인식강화", "지역사회 인식, 행동변화"),
    ind("s1_1", "S1-1", "노동관행", "노동관행 체계구축"),
    ind("s1_2", "S1-2", "노동관행", "공정한 채용"),
    ind("s1_3", "S1-3", "노동관행", "직원역량강화"),
    ind("s1_4", "S1-4", "노동관행", "직원복지"),
    ind("s2_1", "S2-1", "안전보건", "안전관리체계구축"),
    ind("s2_2", "S2-2", "안전보건", "안전사고 대응 체계"),
    ind("s2_3", "S2-3", "안전보건", "중대재해 예방"),
    ind("s3_1", "S3-1", "인권존중 및 보호", "인권 경영체계 구축"),
    ind("s3_2", "S3-2", "인권존중 및 보호", "학대예방 및 인권보장"),
    ind("s3_3", "S3-3", "인권존중 및 보호", "종사자 감정노동 보호"),
    ind("s3_4", "S3-4", "인권존중 및 보호", "인권 모니터링 및 평가"),
    ind("s3_5", "S3-5", "인권존중 및 보호", "사회적 불평등 계층 권리증진 및 보호실천"),
    ind("s4_1", "S4-1", "이용자 만족 및 권리", "이용자 만족경영 체계구축"),
    ind("s4_2", "S4-2", "이용자 만족 및 권리", "편의시설의 적절성"),
    ind("s4_3", "S4-3", "이용자 만족 및 권리", "고충처리 대응체계 구축"),
    ind("s4_4", "S4-4", "이용자 만족 및 권리", "개인정보 보호 및 비밀보장"),
    ind("s4_5", "S4-5", "이용자 만족 및 권리", "사회서비스 사전 고지 및 동의"),
    ind("s5_1", "S5-1", "동반성장 및 지역상생", "지역사회 민관협력 파트너쉽"),
    ind("s5_2", "S5-2", "동반성장 및 지역상생", "기업 및 지역 단체와의 사회공헌활동"),
    ind("s5_3", "S5-3", "동반성장 및 지역상생", "책임감 있는 공급망 관리"),
    ind("g1_1", "G1-1", "ESG 관리체계 구축", "ESG 가이드라인 및 정책"),
    ind("g1_2", "G1-2", "ESG 관리체계 구축", "ESG 활동의 효율적 관리"),
    ind("g2_1", "G2-1", "위원회 구성 및 활동", "운영위원회의 독립성 및 구성, 활동"),
    ind("g2_2", "G2-2", "위원회 구성 및 활동", "위원회 구성 현황"),
    ind("g3_1", "G3-1", "이해관계자 참여 및 소통", "ESG 정보 공시"),
    ind("g3_2", "G3-2", "이해관계자 참여 및 소통", "이해관계자 식별 및 소통"),
    ind("g3_3", "G3-3", "이해관계자 참여 및 소통", "자원봉사자 관리"),
    ind("g3_4", "G3-4", "이해관계자 참여 및 소통", "후원자 관리"),
    ind("g4_1", "G4-1", "청렴윤리", "윤리경영 체계구축"),
    ind("g4_2", "G4-2", "청렴윤리", "반부패 예방 및 청렴강화"),
    ind("g4_3", "G4-3", "청렴윤리", "청렴윤리 모니터링 및 평가"),
    ind("g4_4", "G4-4", "청렴윤리", "회계의 투명한 관리"),
    ind("g4_5", "G4-5", "청렴윤리", "법/규제 미준수 및 위반"),
];

/// Iterate the indicators belonging to one category, in catalog order.
pub fn indicators_in(category: Category) -> impl Iterator<Item = &'static IndicatorDefinition> {
    INDICATORS
        .iter()
        .filter(move |indicator| indicator.category() == category)
}

/// Number of indicators in a category (5, 20 and 13).
pub fn indicator_count(category: Category) -> usize {
    indicators_in(category).count()
}

/// Look up an indicator by key (`s3_2`) or code (`S3-2`), case-insensitively.
pub fn find_indicator(key_or_code: &str) -> Option<&'static IndicatorDefinition> {
    let needle = key_or_code.trim();
    INDICATORS.iter().find(|indicator| {
        indicator.key.eq_ignore_ascii_case(needle) || indicator.code.eq_ignore_ascii_case(needle)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn catalog_has_expected_category_counts() {
        assert_eq!(indicator_count(Category::Environment), 5);
        assert_eq!(indicator_count(Category::Social), 20);
        assert_eq!(indicator_count(Category::Governance), 13);
    }

    #[test]
    fn keys_and_codes_are_unique_and_consistent() {
        let keys: BTreeSet<_> = INDICATORS.iter().map(|i| i.key).collect();
        let codes: BTreeSet<_> = INDICATORS.iter().map(|i| i.code).collect();
        assert_eq!(keys.len(), INDICATOR_COUNT);
        assert_eq!(codes.len(), INDICATOR_COUNT);
        for indicator in &INDICATORS {
            assert_eq!(indicator.key.replace('_', "-").to_uppercase(), indicator.code);
        }
    }

    #[test]
    fn find_indicator_accepts_key_or_code() {
        assert_eq!(find_indicator("g4_5").map(|i| i.code), Some("G4-5"));
        assert_eq!(find_indicator("s3-2").map(|i| i.key), Some("s3_2"));
        assert!(find_indicator("x9_9").is_none());
    }

    #[test]
    fn phase_parses_labels_and_indices() {
        assert_eq!("2".parse::<RoadmapPhase>(), Ok(RoadmapPhase::Expansion));
        assert_eq!(
            "정착기 (2029년 ~ 2030년)".parse::<RoadmapPhase>(),
            Ok(RoadmapPhase::Consolidation)
        );
        assert!("4".parse::<RoadmapPhase>().is_err());
    }

    #[test]
    fn phase_serializes_as_label() {
        let json = serde_json::to_string(&RoadmapPhase::Introduction).unwrap();
        assert_eq!(json, "\"도입기 (2026년)\"");
        let phase: RoadmapPhase = serde_json::from_str(&json).unwrap();
        assert_eq!(phase, RoadmapPhase::Introduction);
    }
}
