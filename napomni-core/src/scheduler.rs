//! Occurrence scheduler: moves a reminder's target forward as time passes
//! and picks the next instant a notification is due.
//!
//! Everything here works on local civil time supplied by the caller and never
//! reads a clock. Callers must not run two `advance` calls on the same
//! reminder concurrently; the store that owns the state serializes them.

use std::iter;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::lead_times::LeadTimeSet;
use crate::parser::ParseResult;
use crate::units::{IntervalQuantity, Recurrence};

/// The mutable part of a stored reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderState {
    pub target: NaiveDateTime,
    pub recurrence: Option<Recurrence>,
    pub lead_times: LeadTimeSet,
}

impl ReminderState {
    pub fn next_wake(&self, now: NaiveDateTime) -> NaiveDateTime {
        next_wake(self.target, &self.lead_times, now)
    }
}

impl From<ParseResult> for ReminderState {
    fn from(parsed: ParseResult) -> Self {
        Self {
            target: parsed.target,
            recurrence: parsed.recurrence,
            lead_times: parsed.lead_times,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerOutcome {
    /// The target has passed and nothing repeats; the caller drops the reminder.
    Finished,
    /// `advanced` counts recurrence steps taken by this call (0 when the
    /// target was still ahead).
    Updated {
        next_wake: NaiveDateTime,
        advanced: u32,
    },
}

/// One entry of a notification schedule; `lead` is `None` for the target itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlannedNotice {
    pub lead: Option<IntervalQuantity>,
    pub at: NaiveDateTime,
}

/// Earliest of the target and its lead instants that is still after `now`.
/// Falls back to `target` when every candidate has passed.
pub fn next_wake(target: NaiveDateTime, lead_times: &LeadTimeSet, now: NaiveDateTime) -> NaiveDateTime {
    lead_times
        .instants_before(target)
        .chain(iter::once(target))
        .filter(|at| *at > now)
        .min()
        .unwrap_or(target)
}

/// Every notification for `target`, earliest first, the target last.
pub fn notify_plan(target: NaiveDateTime, lead_times: &LeadTimeSet) -> Vec<PlannedNotice> {
    lead_times
        .iter()
        .map(|lead| PlannedNotice {
            lead: Some(*lead),
            at: lead.shift_back(target),
        })
        .chain(iter::once(PlannedNotice { lead: None, at: target }))
        .collect()
}

/// Bring `state` up to date with `now`.
///
/// While the target is not after `now`, a recurring reminder steps its target
/// by the recurrence until it is; each step moves at least one day, so the
/// loop runs at most `(now - target).num_days() + 1` times. A reminder
/// without recurrence whose target has passed is `Finished` and left
/// untouched. With the target still ahead nothing is mutated and repeated
/// calls return the same outcome.
pub fn advance(state: &mut ReminderState, now: NaiveDateTime) -> SchedulerOutcome {
    let mut advanced: u32 = 0;
    while state.target <= now {
        let Some(recurrence) = state.recurrence else {
            debug!(target_at = %state.target, %now, "reminder finished");
            return SchedulerOutcome::Finished;
        };
        state.target = recurrence.next_instant(state.target);
        advanced = advanced.saturating_add(1);
        trace!(target_at = %state.target, %recurrence, "recurrence step");
    }

    let next_wake = state.next_wake(now);
    if advanced > 0 {
        debug!(target_at = %state.target, %next_wake, advanced, "reminder advanced");
    }
    SchedulerOutcome::Updated { next_wake, advanced }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{DurationUnit, WeekdayUnit};
    use chrono::{Datelike, NaiveDate, Weekday};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn q(count: u32, unit: DurationUnit) -> IntervalQuantity {
        IntervalQuantity::new(count, unit).unwrap()
    }

    fn state(target: NaiveDateTime, recurrence: Option<Recurrence>, leads: Vec<IntervalQuantity>) -> ReminderState {
        ReminderState {
            target,
            recurrence,
            lead_times: leads.into(),
        }
    }

    #[test]
    fn next_wake_picks_earliest_future_lead() {
        let leads: LeadTimeSet = vec![q(1, DurationUnit::Week), q(1, DurationUnit::Day)].into();
        let target = at(2025, 8, 20, 10, 0);
        assert_eq!(next_wake(target, &leads, at(2025, 8, 1, 0, 0)), at(2025, 8, 13, 10, 0));
        assert_eq!(next_wake(target, &leads, at(2025, 8, 13, 10, 0)), at(2025, 8, 19, 10, 0));
        assert_eq!(next_wake(target, &leads, at(2025, 8, 19, 12, 0)), target);
    }

    #[test]
    fn next_wake_falls_back_to_target() {
        let target = at(2025, 8, 20, 10, 0);
        assert_eq!(next_wake(target, &LeadTimeSet::new(), at(2025, 8, 25, 0, 0)), target);
    }

    #[test]
    fn notify_plan_is_chronological() {
        let leads: LeadTimeSet = vec![q(1, DurationUnit::Day), q(1, DurationUnit::Month)].into();
        let target = at(2025, 12, 31, 10, 0);
        let plan = notify_plan(target, &leads);
        assert_eq!(
            plan,
            vec![
                PlannedNotice { lead: Some(q(1, DurationUnit::Month)), at: at(2025, 12, 1, 10, 0) },
                PlannedNotice { lead: Some(q(1, DurationUnit::Day)), at: at(2025, 12, 30, 10, 0) },
                PlannedNotice { lead: None, at: target },
            ]
        );
    }

    #[test]
    fn future_target_is_not_mutated() {
        let mut s = state(at(2025, 8, 20, 10, 0), Some(q(1, DurationUnit::Day).into()), vec![]);
        let before = s.clone();
        let now = at(2025, 8, 19, 0, 0);
        let first = advance(&mut s, now);
        let second = advance(&mut s, now);
        assert_eq!(s, before);
        assert_eq!(first, second);
        assert_eq!(
            first,
            SchedulerOutcome::Updated { next_wake: at(2025, 8, 20, 10, 0), advanced: 0 }
        );
    }

    #[test]
    fn one_shot_finishes() {
        let mut s = state(at(2025, 8, 20, 10, 0), None, vec![q(1, DurationUnit::Day)]);
        assert_eq!(advance(&mut s, at(2025, 8, 20, 10, 0)), SchedulerOutcome::Finished);
        assert_eq!(s.target, at(2025, 8, 20, 10, 0));
    }

    #[test]
    fn weekday_recurrence_moves_to_next_monday() {
        // 2025-08-11 is a Monday
        let mut s = state(at(2025, 8, 11, 10, 0), Some(WeekdayUnit::Monday.into()), vec![]);
        let outcome = advance(&mut s, at(2025, 8, 11, 10, 0));
        assert_eq!(s.target, at(2025, 8, 18, 10, 0));
        assert_eq!(s.target.weekday(), Weekday::Mon);
        assert_eq!(
            outcome,
            SchedulerOutcome::Updated { next_wake: at(2025, 8, 18, 10, 0), advanced: 1 }
        );
    }

    #[test]
    fn stale_target_catches_up_in_one_call() {
        let mut s = state(at(2025, 1, 1, 10, 0), Some(q(1, DurationUnit::Day).into()), vec![]);
        let now = at(2025, 1, 10, 12, 0);
        let outcome = advance(&mut s, now);
        assert_eq!(s.target, at(2025, 1, 11, 10, 0));
        assert!(s.target > now);
        assert_eq!(
            outcome,
            SchedulerOutcome::Updated { next_wake: at(2025, 1, 11, 10, 0), advanced: 10 }
        );
    }

    #[test]
    fn advance_recomputes_wake_against_new_target() {
        let mut s = state(
            at(2025, 1, 1, 10, 0),
            Some(q(1, DurationUnit::Year).into()),
            vec![q(1, DurationUnit::Week)],
        );
        let outcome = advance(&mut s, at(2025, 1, 1, 10, 0));
        assert_eq!(s.target, at(2026, 1, 1, 10, 0));
        assert_eq!(
            outcome,
            SchedulerOutcome::Updated { next_wake: at(2025, 12, 25, 10, 0), advanced: 1 }
        );
    }

    #[test]
    fn advance_terminates_for_every_unit() {
        let now = at(2030, 6, 15, 12, 0);
        for unit in DurationUnit::ALL {
            let mut s = state(at(2020, 1, 1, 10, 0), Some(q(1, unit).into()), vec![]);
            advance(&mut s, now);
            assert!(s.target > now, "{unit}");
        }
        for day in WeekdayUnit::ALL {
            let mut s = state(at(2020, 1, 1, 10, 0), Some(day.into()), vec![]);
            advance(&mut s, now);
            assert!(s.target > now);
            assert!(s.target - now <= chrono::Duration::days(7));
        }
    }
}
