//! Calendar frequencies and discrete period labels.
//!
//! Slices are anchored on the first day of a period (a "period start" date
//! range), and treatment periods are named by labels such as `2016-Q1` or
//! `2016-02`.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Stride of a calendar axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    #[default]
    Monthly,
    Quarterly,
}

impl Frequency {
    pub const fn months(self) -> u32 {
        match self {
            Self::Monthly => 1,
            Self::Quarterly => 3,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
        }
    }

    /// First day of the period containing `date`.
    pub fn period_start(self, date: NaiveDate) -> NaiveDate {
        let month0 = date.month0() - date.month0() % self.months();
        date.with_day(1)
            .and_then(|d| d.with_month0(month0))
            .unwrap_or(date)
    }

    /// Every period start that falls inside `[start, end]`, ascending.
    pub fn anchors(self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        let mut anchors = Vec::new();
        let mut current = self.period_start(start);
        if current < start {
            match current.checked_add_months(Months::new(self.months())) {
                Some(next) => current = next,
                None => return anchors,
            }
        }
        while current <= end {
            anchors.push(current);
            match current.checked_add_months(Months::new(self.months())) {
                Some(next) => current = next,
                None => break,
            }
        }
        anchors
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A discrete month or quarter, such as `2016-02` or `2016-Q1`.
///
/// Stored as the period's first day so the label is always valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PeriodLabel {
    start: NaiveDate,
    frequency: Frequency,
}

impl PeriodLabel {
    /// The period of `frequency` that contains `date`.
    pub fn containing(date: NaiveDate, frequency: Frequency) -> Self {
        Self {
            start: frequency.period_start(date),
            frequency,
        }
    }

    pub fn month(year: i32, month: u32) -> Result<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            ModelError::InvalidPeriodLabel {
                label: format!("{year:04}-{month:02}"),
            }
        })?;
        Ok(Self::containing(start, Frequency::Monthly))
    }

    pub fn quarter(year: i32, quarter: u32) -> Result<Self> {
        let start = (1..=4)
            .contains(&quarter)
            .then(|| NaiveDate::from_ymd_opt(year, (quarter - 1) * 3 + 1, 1))
            .flatten()
            .ok_or_else(|| ModelError::InvalidPeriodLabel {
                label: format!("{year:04}-Q{quarter}"),
            })?;
        Ok(Self::containing(start, Frequency::Quarterly))
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the period.
    pub fn end(&self) -> NaiveDate {
        self.start
            .checked_add_months(Months::new(self.frequency.months()))
            .and_then(|next| next.checked_sub_days(Days::new(1)))
            .unwrap_or(NaiveDate::MAX)
    }

    /// The following period, if representable.
    pub fn succ(&self) -> Option<Self> {
        let start = self
            .start
            .checked_add_months(Months::new(self.frequency.months()))?;
        Some(Self {
            start,
            frequency: self.frequency,
        })
    }

    /// Labels from `self` through `last` inclusive. Empty when `last` precedes `self`.
    pub fn range_through(&self, last: NaiveDate) -> Vec<Self> {
        let mut labels = Vec::new();
        let mut current = Some(*self);
        while let Some(label) = current {
            if label.start > last {
                break;
            }
            labels.push(label);
            current = label.succ();
        }
        labels
    }
}

impl fmt::Display for PeriodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.frequency {
            Frequency::Monthly => write!(f, "{:04}-{:02}", self.start.year(), self.start.month()),
            Frequency::Quarterly => write!(
                f,
                "{:04}-Q{}",
                self.start.year(),
                self.start.month0() / 3 + 1
            ),
        }
    }
}

impl FromStr for PeriodLabel {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self> {
        let invalid = || ModelError::InvalidPeriodLabel {
            label: value.to_string(),
        };
        let (year, rest) = value.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        if let Some(quarter) = rest.strip_prefix('Q').or_else(|| rest.strip_prefix('q')) {
            let quarter: u32 = quarter.parse().map_err(|_| invalid())?;
            Self::quarter(year, quarter).map_err(|_| invalid())
        } else {
            let month: u32 = rest.parse().map_err(|_| invalid())?;
            Self::month(year, month).map_err(|_| invalid())
        }
    }
}

impl TryFrom<String> for PeriodLabel {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<PeriodLabel> for String {
    fn from(label: PeriodLabel) -> Self {
        label.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn quarterly_anchors_cover_two_years() {
        let anchors = Frequency::Quarterly.anchors(date(2016, 1, 1), date(2017, 12, 31));
        assert_eq!(anchors.len(), 8);
        assert_eq!(anchors[0], date(2016, 1, 1));
        assert_eq!(anchors[7], date(2017, 10, 1));
    }

    #[test]
    fn anchors_skip_partial_first_period() {
        let anchors = Frequency::Quarterly.anchors(date(2016, 2, 15), date(2016, 12, 31));
        assert_eq!(anchors, vec![date(2016, 4, 1), date(2016, 7, 1), date(2016, 10, 1)]);
    }

    #[test]
    fn anchors_empty_when_range_inverted() {
        assert!(Frequency::Monthly
            .anchors(date(2017, 1, 1), date(2016, 1, 1))
            .is_empty());
    }

    #[test]
    fn label_display_and_parse() {
        let quarter = PeriodLabel::containing(date(2016, 2, 10), Frequency::Quarterly);
        assert_eq!(quarter.to_string(), "2016-Q1");
        assert_eq!("2016-Q1".parse::<PeriodLabel>().unwrap(), quarter);

        let month = PeriodLabel::containing(date(2016, 2, 10), Frequency::Monthly);
        assert_eq!(month.to_string(), "2016-02");
        assert_eq!(month.start(), date(2016, 2, 1));
        assert_eq!(month.end(), date(2016, 2, 29));
    }

    #[test]
    fn rejects_malformed_labels() {
        assert!("2016".parse::<PeriodLabel>().is_err());
        assert!("2016-13".parse::<PeriodLabel>().is_err());
        assert!("2016-Q5".parse::<PeriodLabel>().is_err());
    }

    #[test]
    fn range_through_is_inclusive() {
        let first = PeriodLabel::month(2016, 11).unwrap();
        let labels: Vec<String> = first
            .range_through(date(2017, 2, 1))
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(labels, vec!["2016-11", "2016-12", "2017-01", "2017-02"]);
    }
}
