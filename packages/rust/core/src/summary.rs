use jobplanner_shared::{ScheduleDay, ScheduleSummary};

/// Totals over a schedule. The average is rounded to one decimal.
pub fn summarize(schedule: &[ScheduleDay]) -> ScheduleSummary {
    let total_interviews: usize = schedule.iter().map(|d| d.interviews.len()).sum();
    let span_days = schedule.len();
    let average = total_interviews as f64 / span_days.max(1) as f64;

    ScheduleSummary {
        total_interviews,
        span_days,
        average_per_day: (average * 10.0).round() / 10.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use jobplanner_shared::{Period, ScheduledInterview, TimeSlot};

    fn day_with(n: usize, d: u32) -> ScheduleDay {
        let date = NaiveDate::from_ymd_opt(2026, 5, d).unwrap();
        ScheduleDay {
            date,
            interviews: (0..n)
                .map(|i| ScheduledInterview {
                    candidate_index: i,
                    label: String::new(),
                    title: String::new(),
                    slot: TimeSlot::new(date, Period::ALL[i % 3]),
                    priority_rank: i + 1,
                    final_score: 80,
                    overflow: false,
                    preparation_tip: String::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn averages_to_one_decimal() {
        let schedule = vec![day_with(2, 2), day_with(1, 3), day_with(2, 5)];
        let summary = summarize(&schedule);
        assert_eq!(summary.total_interviews, 5);
        assert_eq!(summary.span_days, 3);
        assert_eq!(summary.average_per_day, 1.7);
    }

    #[test]
    fn empty_schedule_is_zero() {
        assert_eq!(summarize(&[]), ScheduleSummary::default());
    }
}
