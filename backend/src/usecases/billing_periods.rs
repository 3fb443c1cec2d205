//! Calendar math for trials, billing periods and invoice due dates.

use chrono::{Days, Months, NaiveDate};
use crates::domain::value_objects::enums::{
    billing_cycles::BillingCycle, subscription_statuses::SubscriptionStatus,
};

/// Status and period columns written when a plan is (re-)assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingSchedule {
    pub status: SubscriptionStatus,
    pub trial_end: Option<NaiveDate>,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub next_invoice_date: NaiveDate,
    /// Date every later period is counted from.
    pub anchor: NaiveDate,
}

impl BillingSchedule {
    /// Starts a fresh schedule on `today`. A positive `trial_days` puts the
    /// subscription in trial and defers the first period to the trial end.
    pub fn start(today: NaiveDate, trial_days: u32, cycle: BillingCycle) -> Option<Self> {
        if trial_days == 0 {
            let period_end = period_end(today, cycle)?;
            return Some(Self {
                status: SubscriptionStatus::Active,
                trial_end: None,
                period_start: today,
                period_end,
                next_invoice_date: today,
                anchor: today,
            });
        }

        let trial_end = today.checked_add_days(Days::new(u64::from(trial_days)))?;
        Self::continue_trial(trial_end, cycle)
    }

    /// Keeps an already running trial that ends on `trial_end`.
    pub fn continue_trial(trial_end: NaiveDate, cycle: BillingCycle) -> Option<Self> {
        let period_end = period_end(trial_end, cycle)?;
        Some(Self {
            status: SubscriptionStatus::Trial,
            trial_end: Some(trial_end),
            period_start: trial_end,
            period_end,
            next_invoice_date: trial_end,
            anchor: trial_end,
        })
    }
}

pub fn period_end(period_start: NaiveDate, cycle: BillingCycle) -> Option<NaiveDate> {
    period_start.checked_add_months(cycle.months())
}

/// Start of the `index`-th period counted from `anchor`. Counting from the
/// anchor keeps a month-end anchor from drifting after a short month.
pub fn nth_period_start(anchor: NaiveDate, index: u32, cycle: BillingCycle) -> Option<NaiveDate> {
    let months = index.checked_mul(cycle.month_count())?;
    anchor.checked_add_months(Months::new(months))
}

/// Returns the anchored period containing `today` once the stored
/// `[start, end)` has elapsed. Periods that still contain `today` (or lie in
/// the future) are returned unchanged.
pub fn current_period(
    anchor: NaiveDate,
    start: NaiveDate,
    end: NaiveDate,
    cycle: BillingCycle,
    today: NaiveDate,
) -> Option<(NaiveDate, NaiveDate)> {
    if today < end {
        return Some((start, end));
    }

    let mut index: u32 = 0;
    loop {
        let next_start = nth_period_start(anchor, index.checked_add(1)?, cycle)?;
        if next_start > today {
            return Some((nth_period_start(anchor, index, cycle)?, next_start));
        }
        index = index.checked_add(1)?;
    }
}

/// Invoices are never due before the period they bill.
pub fn invoice_due_date(next_invoice_date: Option<NaiveDate>, period_start: NaiveDate) -> NaiveDate {
    next_invoice_date
        .map(|date| date.max(period_start))
        .unwrap_or(period_start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn no_trial_starts_active_today() {
        let schedule = BillingSchedule::start(date(2026, 3, 10), 0, BillingCycle::Monthly).unwrap();

        assert_eq!(schedule.status, SubscriptionStatus::Active);
        assert_eq!(schedule.trial_end, None);
        assert_eq!(schedule.period_start, date(2026, 3, 10));
        assert_eq!(schedule.period_end, date(2026, 4, 10));
        assert_eq!(schedule.next_invoice_date, date(2026, 3, 10));
        assert_eq!(schedule.anchor, date(2026, 3, 10));
    }

    #[test]
    fn trial_defers_first_period() {
        let schedule = BillingSchedule::start(date(2026, 3, 10), 14, BillingCycle::Yearly).unwrap();

        assert_eq!(schedule.status, SubscriptionStatus::Trial);
        assert_eq!(schedule.trial_end, Some(date(2026, 3, 24)));
        assert_eq!(schedule.period_start, date(2026, 3, 24));
        assert_eq!(schedule.period_end, date(2027, 3, 24));
        assert_eq!(schedule.next_invoice_date, date(2026, 3, 24));
        assert_eq!(schedule.anchor, date(2026, 3, 24));
    }

    #[test]
    fn month_end_is_clamped() {
        assert_eq!(
            period_end(date(2026, 1, 31), BillingCycle::Monthly),
            Some(date(2026, 2, 28))
        );
    }

    #[test]
    fn current_period_rolls_forward_past_periods() {
        let rolled = current_period(
            date(2026, 1, 5),
            date(2026, 1, 5),
            date(2026, 2, 5),
            BillingCycle::Monthly,
            date(2026, 4, 20),
        );
        assert_eq!(rolled, Some((date(2026, 4, 5), date(2026, 5, 5))));
    }

    #[test]
    fn current_period_boundary_belongs_to_next_period() {
        let rolled = current_period(
            date(2026, 1, 5),
            date(2026, 1, 5),
            date(2026, 2, 5),
            BillingCycle::Monthly,
            date(2026, 2, 5),
        );
        assert_eq!(rolled, Some((date(2026, 2, 5), date(2026, 3, 5))));
    }

    #[test]
    fn current_or_future_period_is_unchanged() {
        let period = (date(2026, 5, 1), date(2026, 6, 1));
        assert_eq!(
            current_period(period.0, period.0, period.1, BillingCycle::Monthly, date(2026, 4, 1)),
            Some(period)
        );
        assert_eq!(
            current_period(period.0, period.0, period.1, BillingCycle::Monthly, date(2026, 5, 20)),
            Some(period)
        );
    }

    #[test]
    fn month_end_anchor_recovers_after_february() {
        let anchor = date(2026, 1, 31);
        let february = (date(2026, 2, 28), date(2026, 3, 31));

        assert_eq!(
            current_period(anchor, anchor, date(2026, 2, 28), BillingCycle::Monthly, date(2026, 3, 1)),
            Some(february)
        );
        assert_eq!(
            current_period(anchor, february.0, february.1, BillingCycle::Monthly, date(2026, 4, 2)),
            Some((date(2026, 3, 31), date(2026, 4, 30)))
        );
        assert_eq!(
            current_period(anchor, anchor, date(2026, 2, 28), BillingCycle::Monthly, date(2026, 5, 30)),
            Some((date(2026, 4, 30), date(2026, 5, 31)))
        );
    }

    #[test]
    fn yearly_leap_day_anchor_returns_to_february_29() {
        let anchor = date(2028, 2, 29);
        assert_eq!(nth_period_start(anchor, 1, BillingCycle::Yearly), Some(date(2029, 2, 28)));
        assert_eq!(nth_period_start(anchor, 4, BillingCycle::Yearly), Some(date(2032, 2, 29)));
    }

    #[test]
    fn due_date_never_precedes_period_start() {
        let start = date(2026, 5, 1);
        assert_eq!(invoice_due_date(None, start), start);
        assert_eq!(invoice_due_date(Some(date(2026, 4, 1)), start), start);
        assert_eq!(invoice_due_date(Some(date(2026, 5, 3)), start), date(2026, 5, 3));
    }
}
