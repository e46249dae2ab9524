//! Quiz schema types and the model-output normalizer.
//!
//! Model-produced quiz JSON is untrusted: items may be missing fields, carry
//! letter-prefixed choices, or use letters instead of answer indexes.
//! [`normalize`] coerces any input shape into a schema-conformant [`Quiz`]
//! of exactly 5 MCQs followed by 1 short-answer item. It never fails.

mod normalize;

use serde::{Deserialize, Serialize};

pub use normalize::{normalize, resolve_answer, strip_choice_prefix};

/// Number of MCQ items in a normalized quiz.
pub const MCQ_COUNT: usize = 5;

/// Number of choices per MCQ.
pub const CHOICE_COUNT: usize = 4;

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Bloom's taxonomy level of an MCQ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bloom {
    Remember,
    Understand,
    Apply,
    Analyze,
    Evaluate,
    Create,
}

impl Bloom {
    /// Parse a (lowercased) level name; `None` on mismatch.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "remember" => Some(Self::Remember),
            "understand" => Some(Self::Understand),
            "apply" => Some(Self::Apply),
            "analyze" => Some(Self::Analyze),
            "evaluate" => Some(Self::Evaluate),
            "create" => Some(Self::Create),
            _ => None,
        }
    }
}

/// Difficulty rating of an MCQ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Parse a (lowercased) difficulty name; `None` on mismatch.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Quiz items
// ---------------------------------------------------------------------------

/// A single quiz item, serialized with a `type` tag (`mcq` or `short`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QuizItem {
    /// Multiple-choice question with exactly 4 choices.
    Mcq {
        question: String,
        choices: Vec<String>,
        /// 0-based index into `choices`.
        answer: usize,
        rationale: String,
        bloom: Bloom,
        difficulty: Difficulty,
    },
    /// Open short-answer prompt.
    Short { prompt: String },
}

impl QuizItem {
    /// Whether this item is an MCQ.
    pub fn is_mcq(&self) -> bool {
        matches!(self, Self::Mcq { .. })
    }
}

/// A normalized quiz: exactly [`MCQ_COUNT`] MCQs followed by one short item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub items: Vec<QuizItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiz_item_serializes_with_type_tag() {
        let item = QuizItem::Mcq {
            question: "What is chlorophyll?".into(),
            choices: vec!["A pigment".into(), "A sugar".into(), "A gas".into(), "A cell".into()],
            answer: 0,
            rationale: "Chlorophyll is the green pigment.".into(),
            bloom: Bloom::Remember,
            difficulty: Difficulty::Easy,
        };

        let json = serde_json::to_value(&item).expect("serialize");
        assert_eq!(json["type"], "mcq");
        assert_eq!(json["bloom"], "remember");
        assert_eq!(json["difficulty"], "easy");

        let short = QuizItem::Short {
            prompt: "Explain photosynthesis.".into(),
        };
        let json = serde_json::to_value(&short).expect("serialize");
        assert_eq!(json["type"], "short");
    }

    #[test]
    fn quiz_roundtrip() {
        let quiz = Quiz {
            items: vec![QuizItem::Short {
                prompt: "Summarize.".into(),
            }],
        };
        let json = serde_json::to_string(&quiz).expect("serialize");
        let parsed: Quiz = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, quiz);
    }

    #[test]
    fn enum_parsing_rejects_unknown() {
        assert_eq!(Bloom::parse("understand"), Some(Bloom::Understand));
        assert_eq!(Bloom::parse("memorize"), None);
        assert_eq!(Difficulty::parse("hard"), Some(Difficulty::Hard));
        assert_eq!(Difficulty::parse("brutal"), None);
    }
}
