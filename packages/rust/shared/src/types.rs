//! Core domain types for courseforge course packages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for build run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// LicenseTag
// ---------------------------------------------------------------------------

/// Canonical license tags recognized by the classifier.
///
/// The derived ordering follows the canonical string forms, so sorted
/// collections of tags match the sorted allowlist written to the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LicenseTag {
    #[serde(rename = "CC-BY")]
    CcBy,
    #[serde(rename = "CC-BY-SA")]
    CcBySa,
    #[serde(rename = "CC0")]
    Cc0,
    #[serde(rename = "Public-Domain")]
    PublicDomain,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl LicenseTag {
    /// Canonical string form, as written into manifests and reading lists.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CcBy => "CC-BY",
            Self::CcBySa => "CC-BY-SA",
            Self::Cc0 => "CC0",
            Self::PublicDomain => "Public-Domain",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for LicenseTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LicenseTag {
    type Err = String;

    /// Parse a canonical tag string. Accepts `Public Domain` as a spelling
    /// variant of `Public-Domain` since allowlists are user-supplied.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "CC-BY" => Ok(Self::CcBy),
            "CC-BY-SA" => Ok(Self::CcBySa),
            "CC0" => Ok(Self::Cc0),
            "Public-Domain" | "Public Domain" => Ok(Self::PublicDomain),
            "Unknown" => Ok(Self::Unknown),
            other => Err(format!("unrecognized license tag: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// CourseSpec
// ---------------------------------------------------------------------------

/// Structured course specification produced by the topic refiner.
///
/// Consumed read-only by the orchestrator to seed lesson titles. The refiner
/// guarantees `subtopics.len()` is at least the requested lesson count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseSpec {
    /// Course title.
    pub title: String,
    /// Target level (e.g., "introductory").
    pub level: String,
    /// Intended audience.
    pub audience: String,
    /// One-paragraph scope statement.
    pub scope: String,
    /// Course-wide learning objectives, in order.
    #[serde(default)]
    pub global_objectives: Vec<String>,
    /// Ordered subtopics, one per lesson (cycled when shorter).
    pub subtopics: Vec<String>,
    /// Keyword set for search seeding.
    #[serde(default)]
    pub keywords: Vec<String>,
}

// ---------------------------------------------------------------------------
// CuratedResource
// ---------------------------------------------------------------------------

/// A search result that passed license filtering. Immutable once curated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuratedResource {
    /// Document title.
    pub title: String,
    /// Canonical document URL.
    pub url: String,
    /// Classified license tag; always a member of the active allowlist.
    pub license: LicenseTag,
    /// Provider name (e.g., "wikipedia").
    pub source: String,
}

// ---------------------------------------------------------------------------
// Syllabus
// ---------------------------------------------------------------------------

/// A single lesson slot in the syllabus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonSpec {
    /// Global 1-based lesson number, strictly increasing across the syllabus.
    pub lesson: u32,
    /// Lesson title.
    pub title: String,
    /// Three template objectives parameterized by the base title.
    pub objectives: Vec<String>,
}

/// One week of the syllabus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Week {
    /// 1-based week index.
    pub week: u32,
    /// Lessons in this week, in lesson-number order.
    pub lessons: Vec<LessonSpec>,
}

/// The full course syllabus, written to `syllabus.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Syllabus {
    /// Course topic.
    pub topic: String,
    /// Weeks in order.
    pub weeks: Vec<Week>,
}

impl Syllabus {
    /// Iterate lessons in global lesson-number order with their week index.
    pub fn lessons(&self) -> impl Iterator<Item = (&Week, &LessonSpec)> {
        self.weeks
            .iter()
            .flat_map(|w| w.lessons.iter().map(move |l| (w, l)))
    }

    /// Total lesson count.
    pub fn lesson_count(&self) -> usize {
        self.weeks.iter().map(|w| w.lessons.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// CourseManifest
// ---------------------------------------------------------------------------

/// The `course_manifest.json` structure — the single source of truth for
/// downstream consumers. All paths are relative to the output root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseManifest {
    /// Course topic.
    pub topic: String,
    /// Number of weeks requested.
    pub weeks: u32,
    /// Lessons per week requested.
    pub lessons_per_week: u32,
    /// Lesson markdown paths, in lesson-number order.
    pub lessons: Vec<String>,
    /// Lesson PDF paths, in lesson-number order.
    pub lesson_pdfs: Vec<String>,
    /// Quiz JSON paths, in lesson-number order.
    pub quizzes: Vec<String>,
    /// Quiz PDF paths, in lesson-number order.
    pub quiz_pdfs: Vec<String>,
    /// Syllabus markdown path.
    pub syllabus_md: String,
    /// Syllabus PDF path.
    pub syllabus_pdf: String,
    /// Syllabus JSON path.
    pub syllabus_json: String,
    /// Reading list markdown path.
    pub reading_list: String,
    /// Reading list PDF path.
    pub reading_list_pdf: String,
    /// Sorted allowlist the run accepted.
    pub licenses: Vec<String>,
    /// Identifier of the build run that produced this package.
    pub run_id: RunId,
    /// When the build completed.
    pub generated_at: DateTime<Utc>,
    /// Tool version that produced the package.
    pub tool_version: String,
}

// ---------------------------------------------------------------------------
// QaReport
// ---------------------------------------------------------------------------

/// The `qa_report.json` structure: curated resources that failed the
/// post-hoc allowlist re-check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QaReport {
    /// Resources whose title+license string no longer passes the allowlist.
    pub license_violations: Vec<CuratedResource>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_roundtrip() {
        let id = RunId::new();
        let s = id.to_string();
        let parsed: RunId = s.parse().expect("parse RunId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn license_tag_serializes_canonically() {
        let json = serde_json::to_string(&LicenseTag::CcBySa).expect("serialize");
        assert_eq!(json, "\"CC-BY-SA\"");
        let parsed: LicenseTag = serde_json::from_str("\"Public-Domain\"").expect("deserialize");
        assert_eq!(parsed, LicenseTag::PublicDomain);
    }

    #[test]
    fn license_tag_parses_spelling_variants() {
        assert_eq!(
            "Public Domain".parse::<LicenseTag>().unwrap(),
            LicenseTag::PublicDomain
        );
        assert!("CC-BY-NC".parse::<LicenseTag>().is_err());
    }

    #[test]
    fn syllabus_lesson_iteration_is_week_major() {
        let syllabus = Syllabus {
            topic: "Topic".into(),
            weeks: vec![
                Week {
                    week: 1,
                    lessons: vec![
                        LessonSpec {
                            lesson: 1,
                            title: "A".into(),
                            objectives: vec![],
                        },
                        LessonSpec {
                            lesson: 2,
                            title: "B".into(),
                            objectives: vec![],
                        },
                    ],
                },
                Week {
                    week: 2,
                    lessons: vec![LessonSpec {
                        lesson: 3,
                        title: "C".into(),
                        objectives: vec![],
                    }],
                },
            ],
        };

        let numbers: Vec<u32> = syllabus.lessons().map(|(_, l)| l.lesson).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(syllabus.lesson_count(), 3);
    }

    #[test]
    fn manifest_serialization_roundtrip() {
        let manifest = CourseManifest {
            topic: "Photosynthesis".into(),
            weeks: 1,
            lessons_per_week: 2,
            lessons: vec!["lessons/week_1/lesson_1.md".into()],
            lesson_pdfs: vec!["lessons/week_1/lesson_1.pdf".into()],
            quizzes: vec!["quizzes/week_1_lesson_1.json".into()],
            quiz_pdfs: vec!["quizzes/week_1_lesson_1.pdf".into()],
            syllabus_md: "syllabus.md".into(),
            syllabus_pdf: "syllabus.pdf".into(),
            syllabus_json: "syllabus.json".into(),
            reading_list: "reading_list.md".into(),
            reading_list_pdf: "reading_list.pdf".into(),
            licenses: vec!["CC-BY-SA".into()],
            run_id: RunId::new(),
            generated_at: Utc::now(),
            tool_version: "0.1.0".into(),
        };

        let json = serde_json::to_string_pretty(&manifest).expect("serialize");
        let parsed: CourseManifest = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.topic, "Photosynthesis");
        assert_eq!(parsed.quizzes.len(), 1);
    }
}
