//! Weighted consensus across perspectives.

use std::cmp::Ordering;

use tracing::debug;

use jobplanner_shared::{
    Candidate, ConsensusLevel, ConsensusRanking, JobPlannerError, Perspective, Result,
    clamp_score,
};

use crate::analysts::ScoreSheet;

/// Reconcile every candidate's scores into a ranked list.
///
/// `final_score` is the weight-normalised mean of the available scores,
/// rounded half away from zero. Agreement is `high` when the spread
/// (max - min) of the individual scores is at most `high_spread`.
/// Ties on score are broken by ascending candidate index.
pub fn build_consensus(
    candidates: &[Candidate],
    perspectives: &[Perspective],
    sheet: &ScoreSheet,
    high_spread: f64,
) -> Result<Vec<ConsensusRanking>> {
    let mut ranking = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        let mut individual = Vec::with_capacity(perspectives.len());

        for perspective in perspectives {
            if let Some(record) = sheet.get(candidate.index, &perspective.id) {
                weighted += record.score * perspective.weight;
                total_weight += perspective.weight;
                individual.push(record.score);
            }
        }

        if individual.is_empty() || total_weight <= 0.0 {
            return Err(JobPlannerError::consistency(format!(
                "no scores recorded for candidate {} ({})",
                candidate.index, candidate.label
            )));
        }

        let final_score = clamp_score((weighted / total_weight).round()) as u32;
        let (min, max) = individual
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
                (lo.min(*s), hi.max(*s))
            });
        let consensus_level = if max - min <= high_spread {
            ConsensusLevel::High
        } else {
            ConsensusLevel::Medium
        };

        debug!(
            candidate = candidate.index,
            final_score,
            spread = max - min,
            level = consensus_level.as_str(),
            "consensus computed"
        );

        ranking.push(ConsensusRanking {
            rank: 0,
            candidate_index: candidate.index,
            label: candidate.label.clone(),
            title: candidate.title.clone(),
            final_score,
            individual_scores: individual,
            consensus_level,
        });
    }

    ranking.sort_by(|a, b| match b.final_score.cmp(&a.final_score) {
        Ordering::Equal => a.candidate_index.cmp(&b.candidate_index),
        other => other,
    });
    for (pos, entry) in ranking.iter_mut().enumerate() {
        entry.rank = pos + 1;
    }

    Ok(ranking)
}
