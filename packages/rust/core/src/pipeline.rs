//! End-to-end ranking and scheduling pipeline.
//!
//! Orchestrates: slot generation → multi-perspective scoring → consensus
//! → greedy scheduling → summary → narrative.

use std::collections::HashSet;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use jobplanner_shared::{
    Candidate, ConsensusRanking, JobPlannerError, PipelineConfig, Preferences, Result, RunId,
    ScheduleDay, ScheduleSummary,
};

use crate::analysts::{
    FallbackPolicy, PerspectiveReport, ScoringCollaborator, collect_scores,
};
use crate::consensus::build_consensus;
use crate::narrative::{Narrative, NarrativeRequest, NarrativeService, compose_narrative};
use crate::scheduler::{ScheduleRequest, build_schedule};
use crate::slots::{SlotSets, generate_slots};
use crate::summary::summarize;

// ---------------------------------------------------------------------------
// Inputs / outputs
// ---------------------------------------------------------------------------

/// External collaborators used by a run.
#[derive(Clone, Copy)]
pub struct Services<'a> {
    pub scorer: &'a dyn ScoringCollaborator,
    pub narrator: &'a dyn NarrativeService,
}

/// Everything a run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub run_id: RunId,
    pub ranking: Vec<ConsensusRanking>,
    pub schedule: Vec<ScheduleDay>,
    pub summary: ScheduleSummary,
    pub narrative: Narrative,
    pub reports: Vec<PerspectiveReport>,
    pub available_slots: SlotSets,
}

impl PipelineOutput {
    /// Number of scheduled interviews placed in overflow slots.
    pub fn overflow_count(&self) -> usize {
        self.schedule
            .iter()
            .flat_map(|d| d.interviews.iter())
            .filter(|i| i.overflow)
            .count()
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for the pipeline.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once per perspective after scores are collected.
    fn perspective_done(&self, report: &PerspectiveReport);
    /// Called when the pipeline completes.
    fn done(&self, output: &PipelineOutput);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn perspective_done(&self, _report: &PerspectiveReport) {}
    fn done(&self, _output: &PipelineOutput) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

fn validate_candidates(candidates: &[Candidate]) -> Result<()> {
    let mut seen = HashSet::new();
    for c in candidates {
        if !seen.insert(c.index) {
            return Err(JobPlannerError::validation(format!(
                "duplicate candidate index {}",
                c.index
            )));
        }
    }
    Ok(())
}

/// Rank candidates across all perspectives and schedule the top K.
///
/// Collaborator failures degrade to fallback scores and a template
/// narrative; only invalid input or configuration fails the run.
#[instrument(skip_all, fields(candidates = candidates.len(), perspectives = config.perspectives.len()))]
pub async fn rank_and_schedule(
    candidates: &[Candidate],
    config: &PipelineConfig,
    preferences: &Preferences,
    services: Services<'_>,
    progress: &dyn ProgressReporter,
) -> Result<PipelineOutput> {
    let start = Instant::now();
    let run_id = RunId::new();

    config.validate()?;
    let (max_per_day, top_k) = preferences.resolve(config)?;
    validate_candidates(candidates)?;

    info!(%run_id, max_per_day, top_k, seed = config.seed, "starting run");

    if candidates.is_empty() {
        let summary = ScheduleSummary::default();
        let narrative = Narrative::template(&NarrativeRequest {
            perspectives: &config.perspectives,
            ranking: &[],
            schedule: &[],
            summary: &summary,
        });
        let output = PipelineOutput {
            run_id,
            ranking: Vec::new(),
            schedule: Vec::new(),
            summary,
            narrative,
            reports: Vec::new(),
            available_slots: SlotSets::new(),
        };
        info!("no candidates, nothing to rank");
        progress.done(&output);
        return Ok(output);
    }

    // --- Phase 1: Slots ---
    progress.phase("Generating interview slots");
    let available_slots = generate_slots(
        candidates,
        config.anchor_date,
        config.lookahead_days,
        config.seed,
    );

    // --- Phase 2: Scores ---
    progress.phase("Consulting analysts");
    let round = collect_scores(
        candidates,
        &config.perspectives,
        services.scorer,
        config.perspective_timeout,
        FallbackPolicy {
            seed: config.seed,
            rules: &config.fallback,
        },
    )
    .await?;
    for report in &round.reports {
        progress.perspective_done(report);
    }

    // --- Phase 3: Consensus ---
    progress.phase("Building consensus");
    let ranking = build_consensus(
        candidates,
        &config.perspectives,
        &round.sheet,
        config.high_consensus_spread,
    )?;

    // --- Phase 4: Schedule ---
    progress.phase("Scheduling interviews");
    let schedule = build_schedule(ScheduleRequest {
        ranking: &ranking,
        slots: &available_slots,
        max_per_day,
        top_k,
        anchor_date: config.anchor_date,
    });
    let summary = summarize(&schedule);

    // --- Phase 5: Narrative ---
    progress.phase("Writing summary");
    let narrative = compose_narrative(
        services.narrator,
        &NarrativeRequest {
            perspectives: &config.perspectives,
            ranking: &ranking,
            schedule: &schedule,
            summary: &summary,
        },
        config.perspective_timeout,
    )
    .await;

    let output = PipelineOutput {
        run_id,
        ranking,
        schedule,
        summary,
        narrative,
        reports: round.reports,
        available_slots,
    };

    info!(
        run_id = %output.run_id,
        ranked = output.ranking.len(),
        scheduled = output.summary.total_interviews,
        overflow = output.overflow_count(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "run complete"
    );

    progress.done(&output);
    Ok(output)
}
