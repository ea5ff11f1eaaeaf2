//! Calendar offsets used for eligibility thresholds ("60 years", "1 year").

use std::fmt;

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// A calendar offset made of whole years, months and days.
///
/// Month arithmetic clamps to the end of the month, so 31 March minus one
/// month is the last day of February.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DateOffset {
    pub years: u32,
    pub months: u32,
    pub days: u32,
}

impl DateOffset {
    #[must_use]
    pub const fn years(years: u32) -> Self {
        Self {
            years,
            months: 0,
            days: 0,
        }
    }

    #[must_use]
    pub const fn months(months: u32) -> Self {
        Self {
            years: 0,
            months,
            days: 0,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.years == 0 && self.months == 0 && self.days == 0
    }

    fn total_months(&self) -> u32 {
        self.years.saturating_mul(12).saturating_add(self.months)
    }

    /// The date this offset before `date`.
    pub fn before(&self, date: NaiveDate) -> Result<NaiveDate> {
        date.checked_sub_months(Months::new(self.total_months()))
            .and_then(|d| d.checked_sub_days(Days::new(u64::from(self.days))))
            .ok_or_else(|| ModelError::DateOutOfRange {
                date,
                operation: format!("minus {self}"),
            })
    }

    /// The date this offset after `date`.
    pub fn after(&self, date: NaiveDate) -> Result<NaiveDate> {
        date.checked_add_months(Months::new(self.total_months()))
            .and_then(|d| d.checked_add_days(Days::new(u64::from(self.days))))
            .ok_or_else(|| ModelError::DateOutOfRange {
                date,
                operation: format!("plus {self}"),
            })
    }
}

impl fmt::Display for DateOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}y{}m{}d", self.years, self.months, self.days)
    }
}
