//! Quiz questions, user answers, and the payload normalizer.
//!
//! Question and answer payloads arrive as loosely structured JSON whose
//! schema is not fixed by the API contract: the question body may be a
//! JSON-encoded string or an object, may nest under a `question` key, and
//! varies its key names for titles and options. The normalizer extracts a
//! stable presentation shape from whatever arrives and never fails --
//! malformed input degrades to the least-presumptive default.
//!
//! Extraction is organized as small typed extractors composed in documented
//! priority order rather than ad-hoc type checks at each call site.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::EntityId;

// ---------------------------------------------------------------------------
// Key priority orders
// ---------------------------------------------------------------------------

/// Keys searched for a question title, in priority order.
const TITLE_KEYS: &[&str] = &["title", "prompt", "question", "text", "label"];

/// Keys searched for a description, in priority order.
const DESCRIPTION_KEYS: &[&str] = &["subtitle", "description", "helperText", "help", "note"];

/// Keys searched for a short badge, in priority order.
const BADGE_KEYS: &[&str] = &["badge", "codeLabel", "shortLabel"];

/// Value-bearing keys for an option object, in priority order.
const OPTION_VALUE_KEYS: &[&str] = &["value", "key", "code", "id", "slug", "label"];

/// Label keys for an option object, in priority order. Falls back to the
/// option value itself when none match.
const OPTION_LABEL_KEYS: &[&str] = &["label", "text", "title", "name", "display", "prompt"];

/// Keys searched when flattening a stored answer into readable text.
const ANSWER_TEXT_KEYS: &[&str] = &[
    "value", "label", "text", "title", "name", "choice", "answer", "code", "key",
];

/// Keys searched when flattening a stored answer into an editable value.
const ANSWER_EDIT_KEYS: &[&str] = &["value", "code", "key"];

/// Maximum depth of the option-array search over the question object graph.
const OPTION_SEARCH_MAX_DEPTH: usize = 4;

/// Title shown when no title-like key can be found anywhere.
pub const FALLBACK_QUESTION_TITLE: &str = "Design preference";

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A quiz question as served by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: EntityId,
    /// Stable short identifier, e.g. "METAL".
    pub code: String,
    /// Opaque structured payload; schema not fixed by the contract.
    pub question_json: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

/// A submitted answer, unique per process + question.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAnswer {
    pub question_id: EntityId,
    pub question_code: String,
    /// Opaque payload: string, primitive, or object with a value-bearing key.
    pub answer_json: Value,
    pub answered_at: DateTime<Utc>,
}

/// Canonical presentation shape extracted from a question payload.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionMeta {
    pub title: String,
    pub description: Option<String>,
    /// `None` means a free-text question; `Some` constrains answers to one
    /// of the option values.
    pub options: Option<Vec<QuestionOption>>,
    pub badge: Option<String>,
    pub kind: Option<String>,
}

/// One selectable option of a constrained question.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionOption {
    pub label: String,
    pub value: String,
}

/// An answer joined with its question title for display.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayAnswer {
    pub question_id: EntityId,
    pub question: String,
    pub answer: String,
}

// ---------------------------------------------------------------------------
// Primitive extractors
// ---------------------------------------------------------------------------

/// A non-blank string, or nothing.
fn as_string(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        _ => None,
    }
}

/// First non-blank string among `keys` on an object, in key priority order.
fn pick_string(node: &Value, keys: &[&str]) -> Option<String> {
    let obj = node.as_object()?;
    keys.iter()
        .find_map(|key| obj.get(*key).and_then(as_string))
        .map(str::to_owned)
}

/// Search `keys` at top level, then one level down under a nested
/// `question` key.
fn pick_string_nested(root: &Value, keys: &[&str]) -> Option<String> {
    pick_string(root, keys).or_else(|| {
        root.get("question")
            .and_then(|nested| pick_string(nested, keys))
    })
}

/// Parse the raw `question_json` payload into an object.
///
/// A string payload is decoded as JSON; decode failures and non-object
/// results degrade to an empty object rather than propagating.
fn question_object(raw: &Value) -> Value {
    match raw {
        Value::String(encoded) => match serde_json::from_str::<Value>(encoded) {
            Ok(parsed) if parsed.is_object() => parsed,
            _ => Value::Object(Default::default()),
        },
        Value::Object(_) => raw.clone(),
        _ => Value::Object(Default::default()),
    }
}

// ---------------------------------------------------------------------------
// Option discovery
// ---------------------------------------------------------------------------

/// Map a single option entry to `{label, value}`.
///
/// Primitives stringify into both fields. Objects need a value-bearing key
/// ([`OPTION_VALUE_KEYS`]); the label falls back through
/// [`OPTION_LABEL_KEYS`] and finally to the value itself.
fn map_option(entry: &Value) -> Option<QuestionOption> {
    match entry {
        Value::String(s) => Some(QuestionOption {
            label: s.clone(),
            value: s.clone(),
        }),
        Value::Number(n) => {
            let s = n.to_string();
            Some(QuestionOption {
                label: s.clone(),
                value: s,
            })
        }
        Value::Object(_) => {
            let value = pick_string(entry, OPTION_VALUE_KEYS)?;
            let label = pick_string(entry, OPTION_LABEL_KEYS).unwrap_or_else(|| value.clone());
            Some(QuestionOption { label, value })
        }
        _ => None,
    }
}

/// Map an array of entries, keeping only the mappable ones.
fn map_options(entries: &[Value]) -> Vec<QuestionOption> {
    entries.iter().filter_map(map_option).collect()
}

/// Bounded depth-first search for the first array whose entries map to
/// options. Arrays win over deeper nesting; depth is capped at
/// [`OPTION_SEARCH_MAX_DEPTH`].
fn find_options(node: &Value, depth: usize) -> Option<Vec<QuestionOption>> {
    if depth > OPTION_SEARCH_MAX_DEPTH {
        return None;
    }
    match node {
        Value::Array(entries) => {
            let mapped = map_options(entries);
            if mapped.is_empty() {
                None
            } else {
                Some(mapped)
            }
        }
        Value::Object(fields) => fields
            .values()
            .find_map(|child| find_options(child, depth + 1)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Question normalization
// ---------------------------------------------------------------------------

/// Extract the canonical presentation shape from a question payload.
///
/// Never fails: any malformed input degrades to the fallback title with no
/// options (a free-text question).
pub fn question_meta(question: &QuizQuestion) -> QuestionMeta {
    let raw = question_object(&question.question_json);

    let options = raw
        .get("options")
        .and_then(Value::as_array)
        .map(|entries| map_options(entries))
        .filter(|mapped| !mapped.is_empty())
        .or_else(|| find_options(&raw, 0));

    QuestionMeta {
        title: pick_string_nested(&raw, TITLE_KEYS)
            .unwrap_or_else(|| FALLBACK_QUESTION_TITLE.to_string()),
        description: pick_string_nested(&raw, DESCRIPTION_KEYS),
        options,
        badge: pick_string_nested(&raw, BADGE_KEYS),
        kind: pick_string(&raw, &["type"]),
    }
}

/// Short title for an answer-review listing: title-like keys plus `name`,
/// falling back to the question code and finally `"Question {id}"`.
pub fn question_title(question: &QuizQuestion) -> String {
    let raw = question_object(&question.question_json);
    pick_string(&raw, &["title", "prompt", "question", "text", "label", "name"])
        .or_else(|| {
            if question.code.trim().is_empty() {
                None
            } else {
                Some(question.code.clone())
            }
        })
        .unwrap_or_else(|| format!("Question {}", question.id))
}

/// Remove a leading "1. " / "2) " style numbering prefix from a label.
pub fn strip_leading_numbering(label: &str) -> String {
    let trimmed = label.trim_start();
    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &trimmed[digits..];
        if let Some(stripped) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return stripped.trim().to_string();
        }
    }
    label.trim().to_string()
}

// ---------------------------------------------------------------------------
// Answer normalization
// ---------------------------------------------------------------------------

/// Flatten a stored answer payload into human-readable text.
///
/// Strings pass through; numbers and booleans stringify; objects yield the
/// first non-blank value among [`ANSWER_TEXT_KEYS`]. Anything else falls
/// back to its compact JSON form, and to the empty string as a last resort.
pub fn extract_answer_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Object(fields) => {
            for key in ANSWER_TEXT_KEYS {
                match fields.get(*key) {
                    Some(Value::String(s)) if !s.trim().is_empty() => return s.clone(),
                    Some(Value::Number(n)) => return n.to_string(),
                    Some(Value::Bool(b)) => return b.to_string(),
                    _ => {}
                }
            }
            serde_json::to_string(value).unwrap_or_default()
        }
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// Flatten a stored answer into the flat editable value the quiz form works
/// with: a string passes through, objects yield the first of
/// [`ANSWER_EDIT_KEYS`], everything else is empty.
pub fn answer_edit_value(answer: Option<&UserAnswer>) -> String {
    match answer.map(|a| &a.answer_json) {
        Some(Value::String(s)) => s.clone(),
        Some(value @ Value::Object(_)) => pick_string(value, ANSWER_EDIT_KEYS).unwrap_or_default(),
        _ => String::new(),
    }
}

/// Accept an answer collection shipped either as a bare array or wrapped in
/// an `{answers: [...]}` envelope. Unusable shapes yield an empty list.
///
/// One answer per question: when the payload repeats a `question_id`, the
/// later entry wins.
pub fn normalize_answer_list(data: &Value) -> Vec<UserAnswer> {
    let entries = match data {
        Value::Array(entries) => entries.as_slice(),
        Value::Object(fields) => match fields.get("answers") {
            Some(Value::Array(entries)) => entries.as_slice(),
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };
    let mut answers: Vec<UserAnswer> = Vec::with_capacity(entries.len());
    for entry in entries {
        if let Ok(answer) = serde_json::from_value::<UserAnswer>(entry.clone()) {
            upsert_answer(&mut answers, answer);
        }
    }
    answers
}

/// Insert or replace an answer by `question_id`, keeping list order stable
/// for replacements.
pub fn upsert_answer(answers: &mut Vec<UserAnswer>, answer: UserAnswer) {
    match answers.iter_mut().find(|a| a.question_id == answer.question_id) {
        Some(existing) => *existing = answer,
        None => answers.push(answer),
    }
}

/// Join answers with their question titles for the prompt review panel.
pub fn format_answers_for_display(
    answers: &[UserAnswer],
    questions: &[QuizQuestion],
) -> Vec<DisplayAnswer> {
    answers
        .iter()
        .map(|answer| {
            let label = questions
                .iter()
                .find(|q| q.id == answer.question_id)
                .map(question_title)
                .unwrap_or_else(|| {
                    if answer.question_code.trim().is_empty() {
                        format!("Question {}", answer.question_id)
                    } else {
                        answer.question_code.clone()
                    }
                });
            DisplayAnswer {
                question_id: answer.question_id,
                question: strip_leading_numbering(&label),
                answer: extract_answer_text(&answer.answer_json),
            }
        })
        .collect()
}

/// The question the quiz flow should show next: the first question without
/// an answer, or the last question once everything is answered.
pub fn next_question<'a>(
    questions: &'a [QuizQuestion],
    answers: &[UserAnswer],
) -> Option<&'a QuizQuestion> {
    if questions.is_empty() {
        return None;
    }
    questions
        .iter()
        .find(|q| !answers.iter().any(|a| a.question_id == q.id))
        .or_else(|| questions.last())
}
