//! Shared types, error model, and configuration for jobplanner.
//!
//! This crate is the foundation depended on by all other jobplanner crates.
//! It provides:
//! - [`JobPlannerError`], the unified error type
//! - Domain types ([`Candidate`], [`Perspective`], [`ScoreRecord`], [`TimeSlot`], ...)
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DEFAULT_SEED, DefaultsConfig, FallbackRules, LlmConfig, PipelineConfig,
    Preferences, config_dir, config_file_path, default_perspectives, init_config, load_config,
    load_config_from, resolve_api_key,
};
pub use error::{JobPlannerError, Result};
pub use types::{
    Candidate, ConsensusLevel, ConsensusRanking, Period, Perspective, PerspectiveFocus, RunId,
    ScheduleDay, ScheduleSummary, ScheduledInterview, ScoreOrigin, ScoreRecord, TimeSlot,
    clamp_score,
};
