//! Multi-perspective score collection.
//!
//! Every configured perspective is consulted concurrently through a
//! [`ScoringCollaborator`]. Each call is bounded by a timeout; whatever the
//! collaborator fails to deliver is filled in with [`fallback_score`], so the
//! resulting [`ScoreSheet`] always holds exactly one record per
//! `(candidate, perspective)` pair.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use jobplanner_llm::ScoreEntry;
use jobplanner_shared::{
    Candidate, FallbackRules, JobPlannerError, Perspective, Result, ScoreOrigin, ScoreRecord,
    clamp_score,
};

use crate::fallback::fallback_score;

// ---------------------------------------------------------------------------
// Collaborator seam
// ---------------------------------------------------------------------------

/// What a single perspective is asked to score.
#[derive(Debug, Clone, Copy)]
pub struct ScoringRequest<'a> {
    pub perspective: &'a Perspective,
    pub candidates: &'a [Candidate],
}

/// Outcome of one analyst call.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoringReply {
    /// Reply decoded into per-candidate entries (possibly incomplete).
    Parsed(Vec<ScoreEntry>),
    /// The collaborator answered but the reply could not be decoded.
    Unparsable(String),
    /// The call itself failed.
    Failed(String),
}

/// Something that can score candidates from one perspective.
#[async_trait]
pub trait ScoringCollaborator: Send + Sync {
    async fn request_scores(&self, request: &ScoringRequest<'_>) -> ScoringReply;
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// How much of a perspective's output came from the collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerspectiveOutcome {
    External,
    Partial,
    Fallback,
}

impl PerspectiveOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::External => "external",
            Self::Partial => "partial",
            Self::Fallback => "fallback",
        }
    }
}

/// Why fallback scores were used for a perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    Unavailable,
    TimedOut,
    Unparsable,
    MissingCandidates,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unavailable => "unavailable",
            Self::TimedOut => "timed_out",
            Self::Unparsable => "unparsable",
            Self::MissingCandidates => "missing_candidates",
        }
    }
}

/// Per-perspective account of one collection round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerspectiveReport {
    pub perspective_id: String,
    pub display_name: String,
    pub outcome: PerspectiveOutcome,
    pub external_count: usize,
    pub fallback_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<FallbackReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

// ---------------------------------------------------------------------------
// ScoreSheet
// ---------------------------------------------------------------------------

/// Score records keyed by `(candidate_index, perspective_id)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreSheet {
    records: BTreeMap<(usize, String), ScoreRecord>,
}

impl ScoreSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record. A second record for the same pair is a consistency error.
    pub fn insert(&mut self, record: ScoreRecord) -> Result<()> {
        let key = (record.candidate_index, record.perspective_id.clone());
        if self.records.contains_key(&key) {
            return Err(JobPlannerError::consistency(format!(
                "duplicate score for candidate {} from perspective '{}'",
                key.0, key.1
            )));
        }
        self.records.insert(key, record);
        Ok(())
    }

    pub fn get(&self, candidate_index: usize, perspective_id: &str) -> Option<&ScoreRecord> {
        self.records
            .get(&(candidate_index, perspective_id.to_string()))
    }

    pub fn records(&self) -> impl Iterator<Item = &ScoreRecord> {
        self.records.values()
    }

    pub fn count_origin(&self, origin: ScoreOrigin) -> usize {
        self.records.values().filter(|r| r.origin == origin).count()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Result of consulting every perspective.
#[derive(Debug, Clone)]
pub struct AnalystRound {
    pub sheet: ScoreSheet,
    pub reports: Vec<PerspectiveReport>,
}

/// Fallback inputs shared by every perspective in a round.
#[derive(Debug, Clone, Copy)]
pub struct FallbackPolicy<'a> {
    pub seed: u64,
    pub rules: &'a FallbackRules,
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

/// Consult every perspective concurrently and merge the results.
///
/// Collaborator failures never abort the round; they are logged and the
/// affected pairs are scored by the fallback scorer.
#[instrument(skip_all, fields(candidates = candidates.len(), perspectives = perspectives.len()))]
pub async fn collect_scores(
    candidates: &[Candidate],
    perspectives: &[Perspective],
    collaborator: &dyn ScoringCollaborator,
    timeout: Duration,
    policy: FallbackPolicy<'_>,
) -> Result<AnalystRound> {
    let calls = perspectives
        .iter()
        .map(|p| consult(p, candidates, collaborator, timeout, policy));
    let results = join_all(calls).await;

    let mut sheet = ScoreSheet::new();
    let mut reports = Vec::with_capacity(results.len());
    for (records, report) in results {
        for record in records {
            sheet.insert(record)?;
        }
        reports.push(report);
    }

    info!(
        external = sheet.count_origin(ScoreOrigin::External),
        fallback = sheet.count_origin(ScoreOrigin::Fallback),
        "score collection complete"
    );

    Ok(AnalystRound { sheet, reports })
}

/// Ask one perspective, then fill every gap with fallback scores.
async fn consult(
    perspective: &Perspective,
    candidates: &[Candidate],
    collaborator: &dyn ScoringCollaborator,
    timeout: Duration,
    policy: FallbackPolicy<'_>,
) -> (Vec<ScoreRecord>, PerspectiveReport) {
    let request = ScoringRequest {
        perspective,
        candidates,
    };

    let reply = match tokio::time::timeout(timeout, collaborator.request_scores(&request)).await {
        Ok(reply) => Some(reply),
        Err(_) => {
            warn!(
                perspective = %perspective.id,
                timeout_secs = timeout.as_secs_f64(),
                "analyst timed out, using fallback scores"
            );
            None
        }
    };

    let known: HashSet<usize> = candidates.iter().map(|c| c.index).collect();
    let mut external: BTreeMap<usize, ScoreRecord> = BTreeMap::new();

    let (mut reason, detail) = match reply {
        None => (Some(FallbackReason::TimedOut), Some("timed out".to_string())),
        Some(ScoringReply::Failed(err)) => {
            warn!(perspective = %perspective.id, error = %err, "analyst unavailable, using fallback scores");
            (Some(FallbackReason::Unavailable), Some(err))
        }
        Some(ScoringReply::Unparsable(raw)) => {
            let preview: String = raw.chars().take(120).collect();
            warn!(perspective = %perspective.id, reply = %preview, "analyst reply unparsable, using fallback scores");
            (Some(FallbackReason::Unparsable), None)
        }
        Some(ScoringReply::Parsed(entries)) => {
            for entry in entries {
                if !known.contains(&entry.candidate_index) {
                    debug!(perspective = %perspective.id, index = entry.candidate_index, "ignoring score for unknown candidate");
                    continue;
                }
                if external.contains_key(&entry.candidate_index) {
                    debug!(perspective = %perspective.id, index = entry.candidate_index, "ignoring repeated score");
                    continue;
                }
                external.insert(
                    entry.candidate_index,
                    ScoreRecord {
                        candidate_index: entry.candidate_index,
                        perspective_id: perspective.id.clone(),
                        score: clamp_score(entry.score),
                        rationale: entry.rationale,
                        origin: ScoreOrigin::External,
                    },
                );
            }
            (None, None)
        }
    };

    let external_count = external.len();
    let mut records: Vec<ScoreRecord> = Vec::with_capacity(candidates.len());
    let mut fallback_count = 0;
    for candidate in candidates {
        match external.remove(&candidate.index) {
            Some(record) => records.push(record),
            None => {
                records.push(fallback_score(candidate, perspective, policy.seed, policy.rules));
                fallback_count += 1;
            }
        }
    }

    if reason.is_none() && fallback_count > 0 {
        warn!(
            perspective = %perspective.id,
            missing = fallback_count,
            "analyst reply omitted candidates, using fallback scores"
        );
        reason = Some(FallbackReason::MissingCandidates);
    }

    let outcome = if fallback_count == 0 {
        PerspectiveOutcome::External
    } else if external_count == 0 {
        PerspectiveOutcome::Fallback
    } else {
        PerspectiveOutcome::Partial
    };

    let report = PerspectiveReport {
        perspective_id: perspective.id.clone(),
        display_name: perspective.display_name.clone(),
        outcome,
        external_count,
        fallback_count,
        reason,
        detail,
    };

    (records, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use jobplanner_shared::default_perspectives;

    /// Canned replies keyed by perspective id; unknown ids fail.
    struct ScriptedScorer {
        replies: HashMap<String, ScoringReply>,
        stall: HashSet<String>,
    }

    impl ScriptedScorer {
        fn new() -> Self {
            Self {
                replies: HashMap::new(),
                stall: HashSet::new(),
            }
        }

        fn reply(mut self, id: &str, reply: ScoringReply) -> Self {
            self.replies.insert(id.to_string(), reply);
            self
        }

        fn stall(mut self, id: &str) -> Self {
            self.stall.insert(id.to_string());
            self
        }
    }

    #[async_trait]
    impl ScoringCollaborator for ScriptedScorer {
        async fn request_scores(&self, request: &ScoringRequest<'_>) -> ScoringReply {
            if self.stall.contains(&request.perspective.id) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            self.replies
                .get(&request.perspective.id)
                .cloned()
                .unwrap_or_else(|| ScoringReply::Failed("connection refused".into()))
        }
    }

    fn entry(index: usize, score: f64) -> ScoreEntry {
        ScoreEntry {
            candidate_index: index,
            score,
            rationale: format!("scored {score}"),
        }
    }

    fn candidates() -> Vec<Candidate> {
        vec![
            Candidate::new(0, "Acme", "Backend Engineer").with_skills(["Rust", "Python"]),
            Candidate::new(1, "Tencent", "Data Engineer").with_skills(["Java"]),
            Candidate::new(2, "Smallco", "Frontend Engineer").with_skills(["React"]),
        ]
    }

    async fn run(scorer: &ScriptedScorer, timeout: Duration) -> AnalystRound {
        let rules = FallbackRules::default();
        collect_scores(
            &candidates(),
            &default_perspectives(),
            scorer,
            timeout,
            FallbackPolicy { seed: 7, rules: &rules },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn all_collaborators_fail_gives_full_fallback_sheet() {
        let round = run(&ScriptedScorer::new(), Duration::from_secs(5)).await;

        assert_eq!(round.sheet.len(), 9);
        assert_eq!(round.sheet.count_origin(ScoreOrigin::Fallback), 9);
        for record in round.sheet.records() {
            assert!((60.0..=100.0).contains(&record.score));
        }
        for report in &round.reports {
            assert_eq!(report.outcome, PerspectiveOutcome::Fallback);
            assert_eq!(report.reason, Some(FallbackReason::Unavailable));
            assert_eq!(report.fallback_count, 3);
        }
    }

    #[tokio::test]
    async fn complete_reply_is_all_external() {
        let scorer = ScriptedScorer::new().reply(
            "technical",
            ScoringReply::Parsed(vec![entry(0, 88.0), entry(1, 72.0), entry(2, 150.0)]),
        );
        let round = run(&scorer, Duration::from_secs(5)).await;

        let tech = &round.reports[0];
        assert_eq!(tech.outcome, PerspectiveOutcome::External);
        assert_eq!(tech.reason, None);
        assert_eq!(round.sheet.get(0, "technical").unwrap().score, 88.0);
        assert_eq!(round.sheet.get(2, "technical").unwrap().score, 100.0);
        assert_eq!(round.sheet.count_origin(ScoreOrigin::External), 3);
    }

    #[tokio::test]
    async fn partial_reply_fills_gaps_and_ignores_noise() {
        let scorer = ScriptedScorer::new().reply(
            "recruiter",
            ScoringReply::Parsed(vec![entry(1, 80.0), entry(1, 10.0), entry(42, 99.0)]),
        );
        let round = run(&scorer, Duration::from_secs(5)).await;

        let recruiter = round
            .reports
            .iter()
            .find(|r| r.perspective_id == "recruiter")
            .unwrap();
        assert_eq!(recruiter.outcome, PerspectiveOutcome::Partial);
        assert_eq!(recruiter.reason, Some(FallbackReason::MissingCandidates));
        assert_eq!(recruiter.external_count, 1);
        assert_eq!(recruiter.fallback_count, 2);

        let kept = round.sheet.get(1, "recruiter").unwrap();
        assert_eq!(kept.score, 80.0);
        assert_eq!(kept.origin, ScoreOrigin::External);
        assert!(round.sheet.get(42, "recruiter").is_none());
        assert_eq!(round.sheet.len(), 9);
    }

    #[tokio::test]
    async fn malformed_entry_keeps_the_rest_of_the_reply() {
        let text = r#"{"scores":[
            {"candidate_index":0,"score":88,"rationale":"clear growth path"},
            {"candidate_index":1,"score":"N/A"},
            {"candidate_index":2,"score":61}
        ]}
        Caveat: {salary unknown}"#;
        let entries = jobplanner_llm::parse_score_reply(text).unwrap();
        let scorer = ScriptedScorer::new().reply("career", ScoringReply::Parsed(entries));
        let round = run(&scorer, Duration::from_secs(5)).await;

        let career = round
            .reports
            .iter()
            .find(|r| r.perspective_id == "career")
            .unwrap();
        assert_eq!(career.outcome, PerspectiveOutcome::Partial);
        assert_eq!(career.reason, Some(FallbackReason::MissingCandidates));
        assert_eq!(career.external_count, 2);
        assert_eq!(career.fallback_count, 1);

        let first = round.sheet.get(0, "career").unwrap();
        assert_eq!(first.score, 88.0);
        assert_eq!(first.origin, ScoreOrigin::External);
        assert_eq!(round.sheet.get(2, "career").unwrap().origin, ScoreOrigin::External);
        assert_eq!(round.sheet.get(1, "career").unwrap().origin, ScoreOrigin::Fallback);
    }

    #[tokio::test]
    async fn unparsable_reply_falls_back() {
        let scorer = ScriptedScorer::new()
            .reply("career", ScoringReply::Unparsable("I like them all".into()));
        let round = run(&scorer, Duration::from_secs(5)).await;

        let career = &round.reports[2];
        assert_eq!(career.reason, Some(FallbackReason::Unparsable));
        assert_eq!(career.outcome, PerspectiveOutcome::Fallback);
    }

    #[tokio::test]
    async fn stalled_collaborator_times_out() {
        let scorer = ScriptedScorer::new()
            .stall("technical")
            .reply("recruiter", ScoringReply::Parsed(vec![entry(0, 70.0), entry(1, 70.0), entry(2, 70.0)]));
        let round = run(&scorer, Duration::from_millis(50)).await;

        assert_eq!(round.reports[0].reason, Some(FallbackReason::TimedOut));
        assert_eq!(round.reports[1].outcome, PerspectiveOutcome::External);
        assert_eq!(round.sheet.len(), 9);
    }

    #[tokio::test]
    async fn fallback_scores_are_deterministic() {
        let a = run(&ScriptedScorer::new(), Duration::from_secs(5)).await;
        let b = run(&ScriptedScorer::new(), Duration::from_secs(5)).await;
        assert_eq!(a.sheet, b.sheet);
    }

    #[test]
    fn sheet_rejects_duplicate_pair() {
        let record = ScoreRecord {
            candidate_index: 0,
            perspective_id: "technical".into(),
            score: 50.0,
            rationale: String::new(),
            origin: ScoreOrigin::External,
        };
        let mut sheet = ScoreSheet::new();
        sheet.insert(record.clone()).unwrap();
        let err = sheet.insert(record).unwrap_err();
        assert!(matches!(err, JobPlannerError::DataConsistency { .. }));
    }
}
