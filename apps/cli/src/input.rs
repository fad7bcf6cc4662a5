//! Candidate file loading.
//!
//! Accepts either a bare JSON array or an object with a `candidates` array.
//! Entries without an explicit `index` are numbered by position; fields
//! other than the known ones are kept as free-form metadata.

use std::io::Read;
use std::path::Path;

use color_eyre::eyre::{Result, WrapErr, eyre};
use jobplanner_shared::Candidate;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct CandidateInput {
    #[serde(default)]
    index: Option<usize>,
    #[serde(alias = "company", alias = "company_name")]
    label: String,
    #[serde(alias = "position", alias = "job_title")]
    title: String,
    #[serde(default)]
    skills: Vec<String>,
    #[serde(flatten)]
    metadata: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CandidateFile {
    List(Vec<CandidateInput>),
    Wrapped { candidates: Vec<CandidateInput> },
}

/// Parse candidates from JSON text.
pub(crate) fn parse_candidates(text: &str) -> Result<Vec<Candidate>> {
    let file: CandidateFile = serde_json::from_str(text)
        .map_err(|e| eyre!("invalid candidate file: {e}"))?;
    let entries = match file {
        CandidateFile::List(entries) => entries,
        CandidateFile::Wrapped { candidates } => candidates,
    };

    Ok(entries
        .into_iter()
        .enumerate()
        .map(|(pos, entry)| Candidate {
            index: entry.index.unwrap_or(pos),
            label: entry.label,
            title: entry.title,
            skills: entry.skills,
            metadata: entry.metadata,
        })
        .collect())
}

/// Read candidates from a file, or from stdin when `path` is `-`.
pub(crate) fn read_candidates(path: &Path) -> Result<Vec<Candidate>> {
    let text = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .wrap_err("failed to read candidates from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read {}", path.display()))?
    };
    parse_candidates(&text)
}
