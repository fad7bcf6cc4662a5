//! Core pipeline orchestration and domain logic for jobplanner.
//!
//! This crate ties together slot generation, multi-perspective scoring,
//! consensus, and greedy scheduling into a single run
//! ([`pipeline::rank_and_schedule`]).

pub mod analysts;
pub mod collaborator;
pub mod consensus;
pub mod fallback;
pub mod narrative;
pub mod pipeline;
pub mod scheduler;
pub mod slots;
pub mod summary;
