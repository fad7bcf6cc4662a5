//! Decoding of analyst score replies.
//!
//! Models are asked to answer with a JSON object of the form
//! `{"scores": [{"candidate_index": 0, "score": 85, "rationale": "..."}]}`.
//! Replies often wrap that object in prose or Markdown code fences, so each
//! plausible object start is tried in turn and decoded up to its own closing
//! brace. Entries inside `scores` are decoded one by one; a malformed entry
//! is dropped without discarding the rest of the reply.

use std::sync::LazyLock;

use jobplanner_shared::{JobPlannerError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One candidate's score as reported by an analyst.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub candidate_index: usize,
    pub score: f64,
    #[serde(default)]
    pub rationale: String,
}

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// An opening brace followed by a key or an immediate close, i.e. something
/// that can start a JSON object (prose like `{salary unknown}` does not).
static OBJECT_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\{\s*["}]"#).expect("object start regex"));

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Every well-formed JSON object embedded in `text`, with its source span.
fn json_objects(text: &str) -> impl Iterator<Item = (&str, Value)> {
    OBJECT_START_RE.find_iter(text).filter_map(move |m| {
        let rest = &text[m.start()..];
        let mut stream = serde_json::Deserializer::from_str(rest).into_iter::<Value>();
        match stream.next() {
            Some(Ok(value @ Value::Object(_))) => Some((&rest[..stream.byte_offset()], value)),
            _ => None,
        }
    })
}

/// Locate the first complete JSON object embedded in free-form reply text.
pub fn extract_json_object(text: &str) -> Option<&str> {
    json_objects(text).next().map(|(span, _)| span)
}

/// Decode an analyst reply into per-candidate score entries.
///
/// Fails when the text holds no object with a `scores` array. Entries that
/// do not match the expected shape are skipped, so the result may be
/// shorter than the array. An empty `scores` array is not an error.
pub fn parse_score_reply(text: &str) -> Result<Vec<ScoreEntry>> {
    let scores = json_objects(text)
        .find_map(|(_, value)| match value {
            Value::Object(mut map) => map.remove("scores"),
            _ => None,
        })
        .ok_or_else(|| JobPlannerError::parse("reply contains no score object"))?;

    let Value::Array(items) = scores else {
        return Err(JobPlannerError::parse("`scores` is not an array"));
    };

    let mut entries = Vec::with_capacity(items.len());
    for (pos, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<ScoreEntry>(item) {
            Ok(entry) => entries.push(entry),
            Err(e) => debug!(position = pos, error = %e, "skipping malformed score entry"),
        }
    }

    Ok(entries)
}
