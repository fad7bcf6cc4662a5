//! Candidate interview slot generation.
//!
//! Each candidate is offered between three and five distinct
//! `(date, period)` windows inside `[tomorrow, tomorrow + lookahead)`.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Days, NaiveDate};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use jobplanner_shared::{Candidate, Period, TimeSlot};

/// Fewest slots offered per candidate (when the window allows it).
pub const MIN_SLOTS_PER_CANDIDATE: usize = 3;

/// Most slots offered per candidate.
pub const MAX_SLOTS_PER_CANDIDATE: usize = 5;

/// Available slots keyed by candidate index, each list sorted chronologically.
pub type SlotSets = BTreeMap<usize, Vec<TimeSlot>>;

/// Seeded slot generator. The same seed, anchor and window always yield the
/// same sequence of slot sets.
pub struct SlotGenerator {
    rng: ChaCha8Rng,
    anchor_date: NaiveDate,
    lookahead_days: u32,
}

impl SlotGenerator {
    /// `anchor_date` is "today"; slots start the following day.
    pub fn new(anchor_date: NaiveDate, lookahead_days: u32, seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            anchor_date,
            lookahead_days,
        }
    }

    /// Number of distinct slots the window can hold.
    fn capacity(&self) -> usize {
        self.lookahead_days as usize * Period::ALL.len()
    }

    /// Draw one candidate's slot set, re-drawing on collisions.
    pub fn next_slots(&mut self) -> Vec<TimeSlot> {
        let wanted = self
            .rng
            .random_range(MIN_SLOTS_PER_CANDIDATE..=MAX_SLOTS_PER_CANDIDATE)
            .min(self.capacity());

        let mut chosen = BTreeSet::new();
        while chosen.len() < wanted {
            let offset = self.rng.random_range(1..=self.lookahead_days);
            let period = Period::ALL[self.rng.random_range(0..Period::ALL.len())];
            let date = self.anchor_date + Days::new(u64::from(offset));
            chosen.insert(TimeSlot::new(date, period));
        }

        chosen.into_iter().collect()
    }
}

/// Generate slot sets for every candidate, in input order.
pub fn generate_slots(
    candidates: &[Candidate],
    anchor_date: NaiveDate,
    lookahead_days: u32,
    seed: u64,
) -> SlotSets {
    let mut generator = SlotGenerator::new(anchor_date, lookahead_days, seed);
    candidates
        .iter()
        .map(|c| (c.index, generator.next_slots()))
        .collect()
}
