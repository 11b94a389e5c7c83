use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SchoolError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Day,
    Week,
    Month,
    Year,
}

/// Spacing between consecutive installment due dates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeInterval {
    pub every: u32,
    pub unit: TimeUnit,
}

impl TimeInterval {
    pub fn monthly() -> Self {
        Self {
            every: 1,
            unit: TimeUnit::Month,
        }
    }

    /// Date reached after `steps` intervals from `anchor`.
    ///
    /// Month and year steps are measured from the anchor rather than chained, so
    /// a Jan 31 anchor yields Feb 28/29 then Mar 31. Dates past the calendar
    /// range are a validation error.
    pub fn nth_after(&self, anchor: NaiveDate, steps: u32) -> Result<NaiveDate> {
        let shifted = match self.unit {
            TimeUnit::Day => self
                .span(steps, 1)
                .and_then(|days| anchor.checked_add_days(Days::new(days))),
            TimeUnit::Week => self
                .span(steps, 7)
                .and_then(|days| anchor.checked_add_days(Days::new(days))),
            TimeUnit::Month => self
                .span(steps, 1)
                .and_then(|months| u32::try_from(months).ok())
                .and_then(|months| anchor.checked_add_months(Months::new(months))),
            TimeUnit::Year => self
                .span(steps, 12)
                .and_then(|months| u32::try_from(months).ok())
                .and_then(|months| anchor.checked_add_months(Months::new(months))),
        };
        shifted.ok_or_else(|| {
            SchoolError::Validation(format!(
                "{steps} x {} {:?} after {anchor} is out of the supported date range",
                self.every, self.unit
            ))
        })
    }

    fn span(&self, steps: u32, factor: u64) -> Option<u64> {
        u64::from(self.every)
            .checked_mul(u64::from(steps))?
            .checked_mul(factor)
    }

    pub fn is_valid(&self) -> bool {
        self.every > 0
    }
}

impl Default for TimeInterval {
    fn default() -> Self {
        Self::monthly()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn monthly_steps_clamp_to_month_end() {
        let interval = TimeInterval::monthly();
        let anchor = date(2024, 1, 31);
        assert_eq!(interval.nth_after(anchor, 1).unwrap(), date(2024, 2, 29));
        assert_eq!(interval.nth_after(anchor, 2).unwrap(), date(2024, 3, 31));
        assert_eq!(interval.nth_after(anchor, 12).unwrap(), date(2025, 1, 31));
    }

    #[test]
    fn weekly_and_yearly_steps() {
        let weekly = TimeInterval {
            every: 2,
            unit: TimeUnit::Week,
        };
        assert_eq!(weekly.nth_after(date(2024, 1, 1), 2).unwrap(), date(2024, 1, 29));

        let yearly = TimeInterval {
            every: 1,
            unit: TimeUnit::Year,
        };
        assert_eq!(yearly.nth_after(date(2024, 2, 29), 1).unwrap(), date(2025, 2, 28));
    }

    #[test]
    fn out_of_range_steps_are_errors() {
        let anchor = date(2024, 1, 1);
        let daily = TimeInterval {
            every: u32::MAX,
            unit: TimeUnit::Day,
        };
        assert!(matches!(daily.nth_after(anchor, 2), Err(SchoolError::Validation(_))));

        let huge_months = TimeInterval {
            every: 3_000_000_000,
            unit: TimeUnit::Month,
        };
        assert!(huge_months.nth_after(anchor, 2).is_err());

        let far_months = TimeInterval {
            every: 5_000_000,
            unit: TimeUnit::Month,
        };
        assert!(far_months.nth_after(anchor, 1).is_err());
        assert_eq!(far_months.nth_after(anchor, 0).unwrap(), anchor);
    }
}
