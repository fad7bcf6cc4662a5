//! Natural-language summary of a run.
//!
//! The narrative is advisory: when the service fails, stalls, or answers
//! with nothing, a fixed template built from the ranking and schedule is
//! used instead.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use jobplanner_shared::{
    ConsensusRanking, JobPlannerError, Perspective, Result, ScheduleDay, ScheduleSummary,
};

/// Everything a narrator may draw on.
#[derive(Debug, Clone, Copy)]
pub struct NarrativeRequest<'a> {
    pub perspectives: &'a [Perspective],
    pub ranking: &'a [ConsensusRanking],
    pub schedule: &'a [ScheduleDay],
    pub summary: &'a ScheduleSummary,
}

/// Produces a free-text narrative for a completed run.
#[async_trait]
pub trait NarrativeService: Send + Sync {
    async fn narrate(&self, request: &NarrativeRequest<'_>) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeSource {
    External,
    Template,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Narrative {
    pub text: String,
    pub source: NarrativeSource,
}

impl Narrative {
    pub fn template(request: &NarrativeRequest<'_>) -> Self {
        Self {
            text: template_narrative(request),
            source: NarrativeSource::Template,
        }
    }
}

/// Ask the service for a narrative, falling back to the template.
pub async fn compose_narrative(
    service: &dyn NarrativeService,
    request: &NarrativeRequest<'_>,
    timeout: Duration,
) -> Narrative {
    match tokio::time::timeout(timeout, service.narrate(request)).await {
        Ok(Ok(text)) if !text.trim().is_empty() => Narrative {
            text: text.trim().to_string(),
            source: NarrativeSource::External,
        },
        Ok(Ok(_)) => {
            warn!("narrative service returned an empty reply, using template");
            Narrative::template(request)
        }
        Ok(Err(e)) => {
            warn!(error = %e, "narrative service failed, using template");
            Narrative::template(request)
        }
        Err(_) => {
            warn!("narrative service timed out, using template");
            Narrative::template(request)
        }
    }
}

/// Deterministic narrative built from the run's results.
pub fn template_narrative(request: &NarrativeRequest<'_>) -> String {
    let Some(top) = request.ranking.first() else {
        return "No opportunities were provided, so nothing was ranked or scheduled.".to_string();
    };

    let summary = request.summary;
    let overflow = request
        .schedule
        .iter()
        .flat_map(|d| d.interviews.iter())
        .filter(|i| i.overflow)
        .count();

    let mut text = format!(
        "{} analysts evaluated {} opportunities. The top recommendation is {} at {} \
         with a consensus score of {} ({} agreement). ",
        request.perspectives.len(),
        request.ranking.len(),
        top.title,
        top.label,
        top.final_score,
        top.consensus_level.as_str(),
    );

    if summary.total_interviews > 0 {
        text.push_str(&format!(
            "{} interviews are scheduled across {} days, about {} per day. ",
            summary.total_interviews, summary.span_days, summary.average_per_day
        ));
    }
    if overflow > 0 {
        text.push_str(&format!(
            "{overflow} of them could not fit the daily limit and were moved to extra days. "
        ));
    }
    text.push_str(
        "Prepare most thoroughly for the highest-ranked roles and weigh each offer against \
         your own priorities.",
    );

    text
}

/// Narrator used when no service is configured. Always defers to the template.
pub struct OfflineNarrator;

#[async_trait]
impl NarrativeService for OfflineNarrator {
    async fn narrate(&self, _request: &NarrativeRequest<'_>) -> Result<String> {
        Err(JobPlannerError::Collaborator("narrative service disabled".into()))
    }
}
