//! Deterministic fallback scoring.
//!
//! Used whenever an analyst cannot be consulted or its reply cannot be
//! decoded. The result is a pure function of `(candidate, perspective, seed,
//! rules)`: the base score is drawn from an RNG keyed by a SHA-256 digest of
//! the seed, perspective id and candidate index, then adjusted by the
//! perspective's rule-based bonus.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

use jobplanner_shared::{
    Candidate, FallbackRules, Perspective, PerspectiveFocus, ScoreOrigin, ScoreRecord,
};

/// Derive a per-pair RNG seed.
fn pair_seed(seed: u64, perspective_id: &str, candidate_index: usize) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update((perspective_id.len() as u64).to_le_bytes());
    hasher.update(perspective_id.as_bytes());
    hasher.update((candidate_index as u64).to_le_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Skills that appear in the technology vocabulary (case-insensitive).
fn matching_technologies<'a>(candidate: &'a Candidate, rules: &FallbackRules) -> Vec<&'a str> {
    candidate
        .skills
        .iter()
        .filter(|skill| {
            rules
                .tech_vocabulary
                .iter()
                .any(|tech| tech.eq_ignore_ascii_case(skill.trim()))
        })
        .map(String::as_str)
        .collect()
}

fn is_top_employer(candidate: &Candidate, rules: &FallbackRules) -> bool {
    let label = candidate.label.trim();
    rules
        .top_employers
        .iter()
        .any(|employer| employer.eq_ignore_ascii_case(label))
}

/// Produce a fallback score for one `(candidate, perspective)` pair.
pub fn fallback_score(
    candidate: &Candidate,
    perspective: &Perspective,
    seed: u64,
    rules: &FallbackRules,
) -> ScoreRecord {
    let mut rng = ChaCha8Rng::seed_from_u64(pair_seed(seed, &perspective.id, candidate.index));
    let base = rng.random_range(rules.min_score..=rules.max_score);

    let mut notes = Vec::new();
    let bonus = match perspective.focus {
        PerspectiveFocus::Technical => {
            let hits = matching_technologies(candidate, rules);
            if hits.is_empty() {
                0
            } else {
                notes.push(format!("stack overlap: {}", hits.join(", ")));
                rules.tech_bonus
            }
        }
        PerspectiveFocus::Recruiter if is_top_employer(candidate, rules) => {
            notes.push(format!("{} is a top employer", candidate.label));
            rules.employer_bonus
        }
        _ => 0,
    };

    let score = base.saturating_add(bonus).min(100);

    let mut rationale = format!(
        "{} estimate for {} at {} based on {}",
        perspective.display_name, candidate.title, candidate.label, perspective.focus_description
    );
    if !notes.is_empty() {
        rationale.push_str(&format!(" ({})", notes.join("; ")));
    }

    ScoreRecord {
        candidate_index: candidate.index,
        perspective_id: perspective.id.clone(),
        score: f64::from(score),
        rationale,
        origin: ScoreOrigin::Fallback,
    }
}
