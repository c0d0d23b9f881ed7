//! Vitals normal ranges that vary with patient age.

use chrono::{Datelike, NaiveDate};

use crate::config::{NormalRange, NormalRangeSpec, ValidationCriteria};

/// A patient's age expressed in each unit a range can be banded by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatientAge {
    pub years: i64,
    pub months: i64,
    pub weeks: i64,
}

impl PatientAge {
    /// Completed years, months and weeks between `date_of_birth` and `today`.
    pub fn from_birth_date(date_of_birth: NaiveDate, today: NaiveDate) -> Self {
        let mut months = i64::from(today.year() - date_of_birth.year()) * 12
            + i64::from(today.month()) - i64::from(date_of_birth.month());
        if today.day() < date_of_birth.day() {
            months -= 1;
        }
        let weeks = (today - date_of_birth).num_days() / 7;
        Self {
            years: months.div_euclid(12),
            months,
            weeks,
        }
    }

    fn in_unit(&self, unit: &str) -> Option<i64> {
        match unit {
            "years" => Some(self.years),
            "months" => Some(self.months),
            "weeks" => Some(self.weeks),
            _ => None,
        }
    }
}

/// Selects the normal range that applies to `age`.
///
/// A single range applies to everyone. From a list, the first entry whose
/// `ageUnit` is known and whose `[ageMin, ageMax)` band contains the age wins.
pub fn normal_range_by_age(
    criteria: &ValidationCriteria,
    age: &PatientAge,
) -> Option<NormalRange> {
    match criteria.normal_range.as_ref()? {
        NormalRangeSpec::Single(range) => Some(range.clone()),
        NormalRangeSpec::ByAge(ranges) => ranges
            .iter()
            .find(|range| {
                let Some(age) = range
                    .age_unit
                    .as_deref()
                    .and_then(|unit| age.in_unit(unit))
                else {
                    return false;
                };
                let age = age as f64;
                age >= range.age_min.unwrap_or(f64::NEG_INFINITY)
                    && age < range.age_max.unwrap_or(f64::INFINITY)
            })
            .cloned(),
    }
}
