//! Date-versioned configuration lookup.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::error::{Result, RuleError};

/// Values keyed by the date they come into force.
///
/// [`resolve`](Self::resolve) returns the value with the greatest effective
/// date on or before the query date. There is no fallback: a query before
/// every effective date fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemporalSelector<T> {
    by_date: BTreeMap<NaiveDate, T>,
}

impl<T> Default for TemporalSelector<T> {
    fn default() -> Self {
        Self {
            by_date: BTreeMap::new(),
        }
    }
}

impl<T> TemporalSelector<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the one it replaced.
    pub fn insert(&mut self, effective: NaiveDate, value: T) -> Option<T> {
        self.by_date.insert(effective, value)
    }

    #[must_use]
    pub fn with(mut self, effective: NaiveDate, value: T) -> Self {
        self.insert(effective, value);
        self
    }

    pub fn resolve(&self, date: NaiveDate) -> Result<&T> {
        self.resolve_entry(date).map(|(_, value)| value)
    }

    /// Like [`resolve`](Self::resolve), also returning the effective date.
    pub fn resolve_entry(&self, date: NaiveDate) -> Result<(NaiveDate, &T)> {
        self.by_date
            .range(..=date)
            .next_back()
            .map(|(effective, value)| (*effective, value))
            .ok_or(RuleError::ConfigurationResolution { date })
    }

    pub fn effective_dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.by_date.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.by_date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }

    /// Map every value, keeping the effective dates.
    pub fn try_map<U, E>(
        self,
        mut f: impl FnMut(T) -> std::result::Result<U, E>,
    ) -> std::result::Result<TemporalSelector<U>, E> {
        let by_date = self
            .by_date
            .into_iter()
            .map(|(date, value)| f(value).map(|value| (date, value)))
            .collect::<std::result::Result<_, E>>()?;
        Ok(TemporalSelector { by_date })
    }
}

impl<T> FromIterator<(NaiveDate, T)> for TemporalSelector<T> {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, T)>>(iter: I) -> Self {
        Self {
            by_date: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn exact_effective_date_resolves_to_itself() {
        let selector = TemporalSelector::new().with(date(2016, 1, 1), "P1");
        assert_eq!(selector.resolve(date(2016, 1, 1)).unwrap(), &"P1");
    }

    #[test]
    fn empty_selector_never_resolves() {
        let selector: TemporalSelector<()> = TemporalSelector::new();
        assert!(matches!(
            selector.resolve(date(2020, 1, 1)),
            Err(RuleError::ConfigurationResolution { .. })
        ));
    }

    #[test]
    fn try_map_keeps_dates() {
        let selector = TemporalSelector::new()
            .with(date(2016, 1, 1), "1")
            .with(date(2017, 1, 1), "2");
        let mapped = selector
            .try_map(|value| value.parse::<u32>())
            .unwrap();
        assert_eq!(
            mapped.resolve_entry(date(2017, 3, 1)).unwrap(),
            (date(2017, 1, 1), &2)
        );
    }
}
