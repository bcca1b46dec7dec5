// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Daily and monthly quota boundaries.
//!
//! A boundary is a fixed instant: the configured hour of every local day, and
//! local midnight on the first day of every month, both in one reference
//! timezone.  A pool is due for a reset iff the most recent boundary at or
//! before `now` is later than the account's last reset stamp.  Because the
//! guard compares against the boundary instant rather than counting resets,
//! applying a reset twice inside the same window is a no-op.
//!
//! A boundary whose local time is skipped by a DST jump falls on the first
//! valid instant after the gap.  A boundary that cannot be resolved at all (a
//! date outside chrono's range) is reported as "not due" and balances are left
//! untouched.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::{info, warn};

use crate::config::Config;
use crate::types::Account;

/// Granularity used to walk out of a DST gap.
const GAP_STEP_MINUTES: i64 = 15;
/// Longest gap walked before giving up; covers whole skipped days.
const MAX_GAP_HOURS: i64 = 48;

/// Computes and applies quota boundary resets.
///
/// # Examples
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use chrono_tz::Tz;
/// use credit_gate_core::schedule::ResetScheduler;
///
/// let scheduler = ResetScheduler::new(7, Tz::UTC, 5);
/// let now = Utc.with_ymd_and_hms(2026, 3, 2, 7, 30, 0).unwrap();
/// let boundary = scheduler.daily_boundary(now).unwrap();
/// assert_eq!(boundary, Utc.with_ymd_and_hms(2026, 3, 2, 7, 0, 0).unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetScheduler {
    reset_hour: u32,
    timezone: Tz,
    daily_allotment: u32,
}

impl ResetScheduler {
    pub fn new(reset_hour: u32, timezone: Tz, daily_allotment: u32) -> Self {
        Self {
            reset_hour,
            timezone,
            daily_allotment,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.daily_reset_hour,
            config.reset_timezone,
            config.daily_free_credit_allotment,
        )
    }

    /// Free credits granted at each daily boundary.
    pub fn daily_allotment(&self) -> u32 {
        self.daily_allotment
    }

    // -----------------------------------------------------------------------
    // Boundaries
    // -----------------------------------------------------------------------

    /// The most recent daily boundary at or before `now`.
    pub fn daily_boundary(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let today = now.with_timezone(&self.timezone).date_naive();
        let candidate = self.daily_instant(today)?;
        if candidate <= now {
            Some(candidate)
        } else {
            self.daily_instant(today.pred_opt()?)
        }
    }

    /// The first daily boundary strictly after `now`.
    pub fn next_daily_boundary(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let today = now.with_timezone(&self.timezone).date_naive();
        let candidate = self.daily_instant(today)?;
        if candidate > now {
            Some(candidate)
        } else {
            self.daily_instant(today.succ_opt()?)
        }
    }

    /// The first instant of the calendar month containing `now`.
    pub fn monthly_boundary(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local = now.with_timezone(&self.timezone);
        let first = NaiveDate::from_ymd_opt(local.year(), local.month(), 1)?;
        self.midnight(first)
    }

    /// The first instant of the following calendar month.
    pub fn next_monthly_boundary(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local = now.with_timezone(&self.timezone);
        let (year, month) = if local.month() == 12 {
            (local.year() + 1, 1)
        } else {
            (local.year(), local.month() + 1)
        };
        self.midnight(NaiveDate::from_ymd_opt(year, month, 1)?)
    }

    /// Time left until the next daily refill, for display only.
    pub fn time_until_next_reset(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.next_daily_boundary(now).map(|next| next - now)
    }

    /// Time left until the monthly contact counter clears, for display only.
    pub fn time_until_next_monthly_reset(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.next_monthly_boundary(now).map(|next| next - now)
    }

    // -----------------------------------------------------------------------
    // Due checks
    // -----------------------------------------------------------------------

    pub fn due_for_daily_reset(&self, account: &Account, now: DateTime<Utc>) -> bool {
        match self.daily_boundary(now) {
            Some(boundary) => boundary > account.daily_reset_at,
            None => {
                warn!(account = %account.account_id, %now, "daily boundary unresolvable; skipping reset");
                false
            }
        }
    }

    pub fn due_for_monthly_reset(&self, account: &Account, now: DateTime<Utc>) -> bool {
        match self.monthly_boundary(now) {
            Some(boundary) => boundary > account.monthly_reset_at,
            None => {
                warn!(account = %account.account_id, %now, "monthly boundary unresolvable; skipping reset");
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // Resets
    // -----------------------------------------------------------------------

    /// Refill the free pool and clear the general-question counter if a daily
    /// boundary has been crossed.  Returns whether anything changed.
    pub fn apply_daily_reset(&self, account: &mut Account, now: DateTime<Utc>) -> bool {
        if !self.due_for_daily_reset(account, now) {
            return false;
        }
        account.free_credits = self.daily_allotment;
        account.general_question_counter = 0;
        account.daily_reset_at = now;
        info!(account = %account.account_id, free_credits = self.daily_allotment, "daily reset applied");
        true
    }

    /// Clear the monthly contact counter if a month boundary has been crossed.
    pub fn apply_monthly_reset(&self, account: &mut Account, now: DateTime<Utc>) -> bool {
        if !self.due_for_monthly_reset(account, now) {
            return false;
        }
        account.monthly_contacts_used = 0;
        account.monthly_reset_at = now;
        info!(account = %account.account_id, "monthly reset applied");
        true
    }

    /// Apply whichever resets are due.
    pub fn apply_due_resets(&self, account: &mut Account, now: DateTime<Utc>) -> bool {
        let daily = self.apply_daily_reset(account, now);
        let monthly = self.apply_monthly_reset(account, now);
        daily || monthly
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn daily_instant(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        self.resolve_local(date.and_hms_opt(self.reset_hour, 0, 0)?)
    }

    fn midnight(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        self.resolve_local(date.and_hms_opt(0, 0, 0)?)
    }

    /// Map a local wall-clock time to an instant.  An ambiguous time takes
    /// its earlier reading; a skipped time moves forward to the end of the gap.
    fn resolve_local(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        let step = Duration::minutes(GAP_STEP_MINUTES);
        let limit = local.checked_add_signed(Duration::hours(MAX_GAP_HOURS))?;
        let mut candidate = local;
        while candidate <= limit {
            if let Some(instant) = self.timezone.from_local_datetime(&candidate).earliest() {
                return Some(instant.with_timezone(&Utc));
            }
            candidate = candidate.checked_add_signed(step)?;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PlanTier;

    fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
    }

    fn account(daily_reset_at: DateTime<Utc>, monthly_reset_at: DateTime<Utc>) -> Account {
        Account {
            account_id: "acct-1".into(),
            plan_tier: PlanTier::Free,
            free_credits: 0,
            premium_credits: 0,
            general_question_counter: 1,
            daily_reset_at,
            monthly_contacts_used: 10,
            monthly_reset_at,
        }
    }

    #[test]
    fn test_daily_reset_due_after_boundary_and_idempotent() {
        let scheduler = ResetScheduler::new(7, Tz::UTC, 5);
        let yesterday_eight = at(2026, 3, 1, 8, 0);
        let now = at(2026, 3, 2, 7, 30);
        let mut acct = account(yesterday_eight, yesterday_eight);

        assert!(scheduler.due_for_daily_reset(&acct, now));
        assert!(scheduler.apply_daily_reset(&mut acct, now));
        assert_eq!(acct.free_credits, 5);
        assert_eq!(acct.general_question_counter, 0);
        assert_eq!(acct.daily_reset_at, now);

        assert!(!scheduler.due_for_daily_reset(&acct, now));
        acct.free_credits = 2;
        assert!(!scheduler.apply_daily_reset(&mut acct, now));
        assert_eq!(acct.free_credits, 2);
    }

    #[test]
    fn test_daily_reset_not_due_before_hour() {
        let scheduler = ResetScheduler::new(7, Tz::UTC, 5);
        let acct = account(at(2026, 3, 1, 8, 0), at(2026, 3, 1, 8, 0));
        assert!(!scheduler.due_for_daily_reset(&acct, at(2026, 3, 2, 6, 59)));
    }

    #[test]
    fn test_daily_boundary_uses_reference_timezone() {
        // 07:00 in Ho Chi Minh City (UTC+7) is 00:00 UTC.
        let scheduler = ResetScheduler::new(7, chrono_tz::Asia::Ho_Chi_Minh, 5);
        let boundary = scheduler.daily_boundary(at(2026, 3, 2, 0, 30)).unwrap();
        assert_eq!(boundary, at(2026, 3, 2, 0, 0));

        let before = scheduler.daily_boundary(at(2026, 3, 1, 23, 30)).unwrap();
        assert_eq!(before, at(2026, 3, 1, 0, 0));
    }

    #[test]
    fn test_monthly_reset_due_once_per_month() {
        let scheduler = ResetScheduler::new(7, Tz::UTC, 5);
        let mut acct = account(at(2026, 3, 31, 8, 0), at(2026, 3, 15, 12, 0));

        assert!(!scheduler.due_for_monthly_reset(&acct, at(2026, 3, 31, 23, 59)));
        let now = at(2026, 4, 1, 0, 1);
        assert!(scheduler.apply_monthly_reset(&mut acct, now));
        assert_eq!(acct.monthly_contacts_used, 0);
        assert!(!scheduler.apply_monthly_reset(&mut acct, at(2026, 4, 20, 0, 0)));
    }

    #[test]
    fn test_next_monthly_boundary_wraps_year() {
        let scheduler = ResetScheduler::new(7, Tz::UTC, 5);
        let next = scheduler.next_monthly_boundary(at(2026, 12, 20, 10, 0)).unwrap();
        assert_eq!(next, at(2027, 1, 1, 0, 0));
    }

    #[test]
    fn test_time_until_next_reset() {
        let scheduler = ResetScheduler::new(7, Tz::UTC, 5);
        let remaining = scheduler.time_until_next_reset(at(2026, 3, 2, 7, 30)).unwrap();
        assert_eq!(remaining, Duration::hours(23) + Duration::minutes(30));

        let remaining = scheduler.time_until_next_reset(at(2026, 3, 2, 6, 0)).unwrap();
        assert_eq!(remaining, Duration::hours(1));
    }

    #[test]
    fn test_skipped_reset_hour_moves_to_end_of_gap() {
        // 02:00 does not exist in New York on 2026-03-08; clocks jump to 03:00 EDT.
        let scheduler = ResetScheduler::new(2, chrono_tz::America::New_York, 5);
        let now = at(2026, 3, 8, 12, 0);
        let acct = account(at(2026, 3, 7, 12, 0), at(2026, 3, 1, 12, 0));
        assert_eq!(scheduler.daily_boundary(now), Some(at(2026, 3, 8, 7, 0)));
        assert!(scheduler.due_for_daily_reset(&acct, now));
        assert!(!scheduler.due_for_daily_reset(&acct, at(2026, 3, 8, 6, 59)));
    }

    #[test]
    fn test_skipped_month_start_still_resets() {
        // Asuncion skipped local midnight on 2023-10-01 (00:00 -04 became 01:00 -03).
        let scheduler = ResetScheduler::new(7, chrono_tz::America::Asuncion, 5);
        let month_start = at(2023, 10, 1, 4, 0);
        for day in [1, 10, 20, 31] {
            assert_eq!(scheduler.monthly_boundary(at(2023, 10, day, 12, 0)), Some(month_start));
        }
        assert_eq!(scheduler.next_monthly_boundary(at(2023, 9, 20, 12, 0)), Some(month_start));

        let mut acct = account(at(2023, 9, 30, 12, 0), at(2023, 9, 15, 12, 0));
        assert!(scheduler.apply_monthly_reset(&mut acct, at(2023, 10, 10, 12, 0)));
        assert_eq!(acct.monthly_contacts_used, 0);
        assert!(!scheduler.apply_monthly_reset(&mut acct, at(2023, 10, 20, 12, 0)));
    }
}
