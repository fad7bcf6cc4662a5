//! Core domain types for ranking and interview scheduling.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one pipeline invocation (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Candidate
// ---------------------------------------------------------------------------

/// An opportunity under evaluation (typically one job posting).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Stable ordinal, unique within a ranking run.
    pub index: usize,
    /// Company or organisation name.
    pub label: String,
    /// Position title.
    pub title: String,
    /// Skills the posting asks for.
    #[serde(default)]
    pub skills: Vec<String>,
    /// Free-form extra fields (location, salary range, source URL, ...).
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Candidate {
    /// Convenience constructor with no skills or metadata.
    pub fn new(index: usize, label: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            index,
            label: label.into(),
            title: title.into(),
            skills: Vec::new(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Builder-style skill list.
    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skills = skills.into_iter().map(Into::into).collect();
        self
    }
}

// ---------------------------------------------------------------------------
// Perspective
// ---------------------------------------------------------------------------

/// Which rule set the fallback scorer applies for a perspective.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerspectiveFocus {
    /// Technical expert: rewards known technology stacks.
    Technical,
    /// Recruiter / HR: rewards well-known employers.
    Recruiter,
    /// Career planner: no rule-based bonus.
    Career,
    #[default]
    General,
}

/// A named, weighted evaluation lens applied to every candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Perspective {
    /// Stable identifier (used as a key in score records).
    pub id: String,
    /// Human-readable analyst name.
    pub display_name: String,
    /// What this analyst pays attention to; sent to the scoring service.
    pub focus_description: String,
    /// Weight in the consensus mean. Must be positive.
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Rule set for fallback scoring.
    #[serde(default)]
    pub focus: PerspectiveFocus,
    /// Model that answers for this analyst (defaults to the configured model).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

fn default_weight() -> f64 {
    1.0
}

// ---------------------------------------------------------------------------
// ScoreRecord
// ---------------------------------------------------------------------------

/// Where a score came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreOrigin {
    External,
    Fallback,
}

/// One perspective's opinion of one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub candidate_index: usize,
    pub perspective_id: String,
    /// Score in `[0, 100]`.
    pub score: f64,
    pub rationale: String,
    pub origin: ScoreOrigin,
}

/// Clamp a raw score into `[0, 100]`, mapping NaN to 0.
pub fn clamp_score(raw: f64) -> f64 {
    if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 100.0) }
}

// ---------------------------------------------------------------------------
// ConsensusRanking
// ---------------------------------------------------------------------------

/// Qualitative agreement among the perspectives for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsensusLevel {
    High,
    Medium,
}

impl ConsensusLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
        }
    }
}

/// The reconciled result for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusRanking {
    /// 1-based position in the final ordering.
    pub rank: usize,
    pub candidate_index: usize,
    pub label: String,
    pub title: String,
    /// Weighted mean of the individual scores, rounded, in `[0, 100]`.
    pub final_score: u32,
    /// One score per perspective, in perspective order.
    pub individual_scores: Vec<f64>,
    pub consensus_level: ConsensusLevel,
}

// ---------------------------------------------------------------------------
// TimeSlot
// ---------------------------------------------------------------------------

/// Part of the day an interview slot covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Morning,
    Afternoon,
    Evening,
}

impl Period {
    /// All periods in chronological order.
    pub const ALL: [Period; 3] = [Period::Morning, Period::Afternoon, Period::Evening];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
        }
    }

    /// Fixed display range for the period.
    pub fn time_range(&self) -> &'static str {
        match self {
            Self::Morning => "09:00-12:00",
            Self::Afternoon => "14:00-17:00",
            Self::Evening => "18:00-21:00",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A schedulable window identified by `(date, period)`.
///
/// Field order matters: the derived `Ord` sorts chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeSlot {
    pub date: NaiveDate,
    pub period: Period,
}

impl TimeSlot {
    pub fn new(date: NaiveDate, period: Period) -> Self {
        Self { date, period }
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date.format("%Y-%m-%d"), self.period.time_range())
    }
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// One candidate assigned to one slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledInterview {
    pub candidate_index: usize,
    pub label: String,
    pub title: String,
    pub slot: TimeSlot,
    /// Copied from the candidate's consensus rank.
    pub priority_rank: usize,
    pub final_score: u32,
    /// True when the slot was synthesized because no compliant slot existed.
    pub overflow: bool,
    pub preparation_tip: String,
}

/// Interviews sharing a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleDay {
    pub date: NaiveDate,
    pub interviews: Vec<ScheduledInterview>,
}

impl ScheduleDay {
    /// Whether any interview on this date sits in an overflow slot.
    pub fn has_overflow(&self) -> bool {
        self.interviews.iter().any(|i| i.overflow)
    }
}

/// Aggregate statistics over a completed schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSummary {
    pub total_interviews: usize,
    pub span_days: usize,
    /// Interviews per scheduled day, rounded to one decimal.
    pub average_per_day: f64,
}
