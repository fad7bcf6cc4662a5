//! Greedy interview scheduling under a daily cap.
//!
//! Candidates are placed in rank order. Each takes its earliest available
//! slot on a date still below the cap; when none qualifies an overflow slot
//! is synthesised past the anchor date so nobody in the top K is dropped.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Days, NaiveDate};
use tracing::{debug, instrument, warn};

use jobplanner_shared::{ConsensusRanking, Period, ScheduleDay, ScheduledInterview, TimeSlot};

use crate::slots::SlotSets;

/// Period used for synthesised overflow slots.
pub const OVERFLOW_PERIOD: Period = Period::Morning;

/// Inputs for one scheduling pass.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleRequest<'a> {
    /// Ranking to draw from; processed in ascending `rank`.
    pub ranking: &'a [ConsensusRanking],
    pub slots: &'a SlotSets,
    pub max_per_day: usize,
    pub top_k: usize,
    /// "Today". Overflow slots are placed relative to this date.
    pub anchor_date: NaiveDate,
}

/// Interview preparation hint for a role.
pub fn preparation_tip(title: &str) -> String {
    format!("Prepare to demonstrate skills relevant to the {title} role")
}

/// Mutable bookkeeping for one pass.
#[derive(Default)]
struct Ledger {
    used: HashSet<TimeSlot>,
    per_date: HashMap<NaiveDate, usize>,
    days: BTreeMap<NaiveDate, Vec<ScheduledInterview>>,
}

impl Ledger {
    fn compliant_slot(&self, options: &[TimeSlot], max_per_day: usize) -> Option<TimeSlot> {
        options.iter().copied().find(|slot| {
            !self.used.contains(slot)
                && self.per_date.get(&slot.date).copied().unwrap_or(0) < max_per_day
        })
    }

    fn overflow_slot(&self, anchor_date: NaiveDate, position: usize) -> TimeSlot {
        let mut date = anchor_date + Days::new(position as u64);
        while self.used.contains(&TimeSlot::new(date, OVERFLOW_PERIOD)) {
            date = date + Days::new(1);
        }
        TimeSlot::new(date, OVERFLOW_PERIOD)
    }

    fn book(&mut self, interview: ScheduledInterview) {
        let slot = interview.slot;
        self.used.insert(slot);
        *self.per_date.entry(slot.date).or_insert(0) += 1;
        self.days.entry(slot.date).or_default().push(interview);
    }
}

/// Assign the top `top_k` ranked candidates to interview slots.
///
/// Returns one [`ScheduleDay`] per used date, ascending by date, with each
/// day's interviews ordered by period.
#[instrument(skip_all, fields(top_k = request.top_k, max_per_day = request.max_per_day))]
pub fn build_schedule(request: ScheduleRequest<'_>) -> Vec<ScheduleDay> {
    let mut ordered: Vec<&ConsensusRanking> = request.ranking.iter().collect();
    ordered.sort_by_key(|r| r.rank);

    let mut ledger = Ledger::default();

    for (pos, entry) in ordered.into_iter().take(request.top_k).enumerate() {
        let mut options = request
            .slots
            .get(&entry.candidate_index)
            .cloned()
            .unwrap_or_default();
        options.sort();

        let (slot, overflow) = match ledger.compliant_slot(&options, request.max_per_day) {
            Some(slot) => (slot, false),
            None => {
                let slot = ledger.overflow_slot(request.anchor_date, pos + 1);
                warn!(
                    candidate = entry.candidate_index,
                    rank = entry.rank,
                    slot = %slot,
                    "no compliant slot, scheduling overflow interview"
                );
                (slot, true)
            }
        };

        debug!(candidate = entry.candidate_index, rank = entry.rank, slot = %slot, "scheduled");

        ledger.book(ScheduledInterview {
            candidate_index: entry.candidate_index,
            label: entry.label.clone(),
            title: entry.title.clone(),
            slot,
            priority_rank: entry.rank,
            final_score: entry.final_score,
            overflow,
            preparation_tip: preparation_tip(&entry.title),
        });
    }

    ledger
        .days
        .into_iter()
        .map(|(date, mut interviews)| {
            interviews.sort_by_key(|i| i.slot);
            ScheduleDay { date, interviews }
        })
        .collect()
}
