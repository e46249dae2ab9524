//! Coercion of possibly-malformed model output into a strict [`Quiz`].

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::{Bloom, CHOICE_COUNT, Difficulty, MCQ_COUNT, Quiz, QuizItem};

/// Placeholder choice text used when a model returns fewer than 4 choices.
const PLACEHOLDER_CHOICE: &str = "Option";

/// Short-answer prompt synthesized when the model omits one.
const FALLBACK_SHORT_PROMPT: &str =
    "Write a brief summary connecting one objective to an example.";

static CHOICE_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[A-Da-d][.)]|\d+[.)])\s*").expect("valid regex"));

static LETTER_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-d])\)").expect("valid regex"));

/// Strip a leading `"A) "` / `"b."` / `"1."` style prefix from a choice string.
pub fn strip_choice_prefix(s: &str) -> String {
    CHOICE_PREFIX_RE.replace(s, "").trim().to_string()
}

/// Resolve a model-supplied answer value to a 0-based index into `choices`.
///
/// Accepts an in-range integer, a single letter a–d, an `"a) "`-prefixed
/// string, or choice text matched case-insensitively. Anything else defaults
/// to 0 — a known lossy fallback that can silently pick a wrong-but-plausible
/// correct answer; kept for behavioral parity with upstream consumers.
pub fn resolve_answer(answer: &Value, choices: &[String]) -> usize {
    if let Some(n) = answer.as_u64() {
        let n = n as usize;
        if n < choices.len() {
            return n;
        }
    }

    if let Some(s) = answer.as_str() {
        let s = s.trim().to_lowercase();

        if s.len() == 1 {
            if let Some(idx) = "abcd".find(&s) {
                return idx;
            }
        }

        if let Some(caps) = LETTER_PREFIX_RE.captures(&s) {
            if let Some(idx) = "abcd".find(&caps[1]) {
                return idx;
            }
        }

        for (i, choice) in choices.iter().enumerate() {
            if s == choice.trim().to_lowercase() {
                return i;
            }
        }
    }

    0
}

/// Normalize arbitrary parsed model output into a well-formed [`Quiz`].
///
/// Total function: any input shape (including non-objects or a missing
/// `items` array) produces exactly [`MCQ_COUNT`] MCQs followed by one short
/// item. Missing MCQs are synthesized as placeholders so downstream renderers
/// never see a short quiz.
pub fn normalize(raw: &Value) -> Quiz {
    let items = raw
        .get("items")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut mcqs = Vec::new();
    let mut short: Option<QuizItem> = None;

    for item in &items {
        match item.get("type").and_then(Value::as_str) {
            Some("mcq") if mcqs.len() < MCQ_COUNT => mcqs.push(normalize_mcq(item)),
            Some("short") if short.is_none() => {
                let prompt = item
                    .get("prompt")
                    .and_then(Value::as_str)
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| FALLBACK_SHORT_PROMPT.to_string());
                short = Some(QuizItem::Short { prompt });
            }
            _ => {}
        }
    }

    if mcqs.len() < MCQ_COUNT {
        debug!(
            found = mcqs.len(),
            "model returned fewer than {MCQ_COUNT} MCQs, padding with placeholders"
        );
    }
    while mcqs.len() < MCQ_COUNT {
        mcqs.push(placeholder_mcq(mcqs.len() + 1));
    }

    let mut out = mcqs;
    out.push(short.unwrap_or(QuizItem::Short {
        prompt: FALLBACK_SHORT_PROMPT.to_string(),
    }));

    Quiz { items: out }
}

/// Normalize a single untyped MCQ object.
fn normalize_mcq(item: &Value) -> QuizItem {
    let mut choices: Vec<String> = item
        .get("choices")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .map(|c| strip_choice_prefix(c.as_str().unwrap_or_default()))
                .collect()
        })
        .unwrap_or_default();

    choices.truncate(CHOICE_COUNT);
    while choices.len() < CHOICE_COUNT {
        choices.push(PLACEHOLDER_CHOICE.to_string());
    }

    let answer = resolve_answer(item.get("answer").unwrap_or(&Value::Null), &choices);

    let bloom = item
        .get("bloom")
        .and_then(Value::as_str)
        .and_then(|s| Bloom::parse(&s.trim().to_lowercase()))
        .unwrap_or(Bloom::Understand);

    let difficulty = item
        .get("difficulty")
        .and_then(Value::as_str)
        .and_then(|s| Difficulty::parse(&s.trim().to_lowercase()))
        .unwrap_or(Difficulty::Medium);

    QuizItem::Mcq {
        question: item
            .get("question")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string(),
        choices,
        answer,
        rationale: item
            .get("rationale")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        bloom,
        difficulty,
    }
}

/// Synthesized MCQ used to pad short model output to the fixed item count.
fn placeholder_mcq(position: usize) -> QuizItem {
    QuizItem::Mcq {
        question: format!("Which statement best reflects key idea {position} of this lesson?"),
        choices: (0..CHOICE_COUNT)
            .map(|_| PLACEHOLDER_CHOICE.to_string())
            .collect(),
        answer: 0,
        rationale: String::new(),
        bloom: Bloom::Understand,
        difficulty: Difficulty::Medium,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn choices() -> Vec<String> {
        vec!["x".into(), "y".into(), "z".into(), "w".into()]
    }

    #[test]
    fn resolve_answer_integer_passthrough() {
        assert_eq!(resolve_answer(&json!(2), &choices()), 2);
        assert_eq!(resolve_answer(&json!(0), &choices()), 0);
    }

    #[test]
    fn resolve_answer_letter() {
        assert_eq!(resolve_answer(&json!("B"), &choices()), 1);
        assert_eq!(resolve_answer(&json!("d"), &choices()), 3);
    }

    #[test]
    fn resolve_answer_letter_prefix() {
        assert_eq!(resolve_answer(&json!("c) something"), &choices()), 2);
    }

    #[test]
    fn resolve_answer_text_match_case_insensitive() {
        assert_eq!(resolve_answer(&json!("Z"), &choices()), 2);
        assert_eq!(resolve_answer(&json!("  w "), &choices()), 3);
    }

    #[test]
    fn resolve_answer_unresolvable_defaults_to_zero() {
        // Known lossy default: the item is not flagged, just forced to 0.
        assert_eq!(resolve_answer(&json!("not a choice"), &choices()), 0);
        assert_eq!(resolve_answer(&json!(null), &choices()), 0);
        assert_eq!(resolve_answer(&json!(17), &choices()), 0);
    }

    #[test]
    fn strip_choice_prefix_variants() {
        assert_eq!(strip_choice_prefix("A) Paris"), "Paris");
        assert_eq!(strip_choice_prefix("b. Lyon"), "Lyon");
        assert_eq!(strip_choice_prefix("1. Rome"), "Rome");
        assert_eq!(strip_choice_prefix("  C)  Berlin "), "Berlin");
        // No delimiter: not a prefix, leave the word intact.
        assert_eq!(strip_choice_prefix("Apple"), "Apple");
    }

    #[test]
    fn normalize_well_formed_input() {
        let raw = json!({
            "items": [
                {"type": "mcq", "question": "Q1?", "choices": ["a) one", "b) two", "c) three", "d) four"],
                 "answer": "b", "rationale": "because", "bloom": "Apply", "difficulty": "HARD"},
                {"type": "short", "prompt": " Explain. "}
            ]
        });

        let quiz = normalize(&raw);
        assert_eq!(quiz.items.len(), MCQ_COUNT + 1);

        let QuizItem::Mcq {
            choices,
            answer,
            bloom,
            difficulty,
            ..
        } = &quiz.items[0]
        else {
            panic!("expected mcq first");
        };
        assert_eq!(choices, &["one", "two", "three", "four"]);
        assert_eq!(*answer, 1);
        assert_eq!(*bloom, Bloom::Apply);
        assert_eq!(*difficulty, Difficulty::Hard);

        assert_eq!(
            quiz.items[MCQ_COUNT],
            QuizItem::Short {
                prompt: "Explain.".into()
            }
        );
    }

    #[test]
    fn normalize_is_total_on_garbage() {
        for raw in [
            json!({}),
            json!({"items": []}),
            json!(null),
            json!("not even an object"),
            json!({"items": [{"type": "mcq"}, {"bogus": true}, 42]}),
        ] {
            let quiz = normalize(&raw);
            assert_eq!(quiz.items.len(), MCQ_COUNT + 1);
            for item in &quiz.items[..MCQ_COUNT] {
                let QuizItem::Mcq {
                    choices, answer, ..
                } = item
                else {
                    panic!("expected mcq");
                };
                assert_eq!(choices.len(), CHOICE_COUNT);
                assert!(*answer < CHOICE_COUNT);
            }
            assert!(matches!(quiz.items[MCQ_COUNT], QuizItem::Short { .. }));
        }
    }

    #[test]
    fn normalize_pads_and_truncates_choices() {
        let raw = json!({
            "items": [
                {"type": "mcq", "question": "Q", "choices": ["only one"], "answer": 0},
                {"type": "mcq", "question": "Q", "choices": ["1","2","3","4","5","6"], "answer": 5}
            ]
        });

        let quiz = normalize(&raw);

        let QuizItem::Mcq { choices, .. } = &quiz.items[0] else {
            panic!()
        };
        assert_eq!(choices.len(), CHOICE_COUNT);
        assert_eq!(choices[1], "Option");

        let QuizItem::Mcq {
            choices, answer, ..
        } = &quiz.items[1]
        else {
            panic!()
        };
        assert_eq!(choices.len(), CHOICE_COUNT);
        // Answer index 5 no longer exists after truncation; lossy default.
        assert_eq!(*answer, 0);
    }

    #[test]
    fn normalize_takes_first_five_mcqs_and_first_short() {
        let mcq = json!({"type": "mcq", "question": "Q", "choices": ["a","b","c","d"], "answer": 0});
        let raw = json!({
            "items": [
                mcq, mcq, mcq, mcq, mcq, mcq, mcq,
                {"type": "short", "prompt": "first"},
                {"type": "short", "prompt": "second"}
            ]
        });

        let quiz = normalize(&raw);
        assert_eq!(quiz.items.len(), MCQ_COUNT + 1);
        assert_eq!(
            quiz.items[MCQ_COUNT],
            QuizItem::Short {
                prompt: "first".into()
            }
        );
    }

    #[test]
    fn normalize_synthesizes_short_prompt() {
        let mcq = json!({"type": "mcq", "question": "Q", "choices": ["a","b","c","d"], "answer": 0});
        let raw = json!({ "items": [mcq] });

        let quiz = normalize(&raw);
        let QuizItem::Short { prompt } = &quiz.items[MCQ_COUNT] else {
            panic!("expected short last");
        };
        assert!(!prompt.is_empty());
    }
}
