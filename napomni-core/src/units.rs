//! Recurrence/duration value types shared by the parser and the scheduler.
//!
//! All arithmetic is in whole days with fixed unit lengths (a month is 30
//! days, a year is 365). Adding "1 MONTH" is a 30-day shift, not "same day
//! next month".
//!
//! Every type here has two text forms:
//! - a canonical form (`"3 DAY"`, `"MONDAY"`) used for persistence; parsing it
//!   is strict and fails with [`ModelError`];
//! - a Russian locale form (`"дня"`, `"среду"`) accepted by `from_locale`,
//!   which returns `None` for anything it does not know.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DurationUnit {
    Year,
    Month,
    Week,
    Day,
}

impl DurationUnit {
    pub const ALL: [DurationUnit; 4] = [
        DurationUnit::Year,
        DurationUnit::Month,
        DurationUnit::Week,
        DurationUnit::Day,
    ];

    /// Approximate length in days.
    pub const fn days(self) -> i64 {
        match self {
            DurationUnit::Year => 365,
            DurationUnit::Month => 30,
            DurationUnit::Week => 7,
            DurationUnit::Day => 1,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            DurationUnit::Year => "YEAR",
            DurationUnit::Month => "MONTH",
            DurationUnit::Week => "WEEK",
            DurationUnit::Day => "DAY",
        }
    }
}

impl fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DurationUnit {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DurationUnit::ALL
            .into_iter()
            .find(|u| u.as_str() == s)
            .ok_or_else(|| ModelError::malformed(s, "unknown duration unit"))
    }
}

/// `count` units of a [`DurationUnit`], e.g. "3 DAY" or "6 MONTH".
///
/// Ordered by total span first. Two quantities with the same span but a
/// different spelling (`1 WEEK` / `7 DAY`) compare by count so that `Ord`
/// agrees with `Eq`; use [`IntervalQuantity::span_days`] when only the span
/// matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct IntervalQuantity {
    count: u32,
    unit: DurationUnit,
}

impl IntervalQuantity {
    /// Longest accepted span, roughly a thousand years.
    pub const MAX_SPAN_DAYS: i64 = 365_000;

    /// Returns `None` for a zero count or a span over [`Self::MAX_SPAN_DAYS`].
    pub fn new(count: u32, unit: DurationUnit) -> Option<Self> {
        let span = i64::from(count) * unit.days();
        (count > 0 && span <= Self::MAX_SPAN_DAYS).then_some(Self { count, unit })
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn unit(&self) -> DurationUnit {
        self.unit
    }

    pub fn span_days(&self) -> i64 {
        i64::from(self.count) * self.unit.days()
    }

    pub fn span(&self) -> Duration {
        Duration::days(self.span_days())
    }

    /// Multiply the count, as in "за 3 дня" (3 × 1 DAY) or "за 2 полгода"
    /// (2 × 6 MONTH).
    pub fn scaled(self, factor: u32) -> Option<Self> {
        let count = self.count.checked_mul(factor)?;
        Self::new(count, self.unit)
    }

    pub fn shift_forward(&self, dt: NaiveDateTime) -> NaiveDateTime {
        dt + self.span()
    }

    pub fn shift_back(&self, dt: NaiveDateTime) -> NaiveDateTime {
        dt - self.span()
    }

    /// Russian duration words, case-insensitive.
    pub fn from_locale(word: &str) -> Option<Self> {
        let (count, unit) = match word.to_lowercase().as_str() {
            "год" | "года" | "лет" => (1, DurationUnit::Year),
            "полгода" => (6, DurationUnit::Month),
            "месяц" | "месяца" | "месяцев" => (1, DurationUnit::Month),
            "неделю" | "недели" | "недель" | "неделя" => (1, DurationUnit::Week),
            "день" | "дня" | "дней" => (1, DurationUnit::Day),
            _ => return None,
        };
        Self::new(count, unit)
    }
}

impl PartialOrd for IntervalQuantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IntervalQuantity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.span_days()
            .cmp(&other.span_days())
            .then_with(|| self.count.cmp(&other.count))
    }
}

impl fmt::Display for IntervalQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.count, self.unit)
    }
}

impl FromStr for IntervalQuantity {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (count, unit) = s
            .split_once(' ')
            .ok_or_else(|| ModelError::malformed(s, "expected \"<count> <UNIT>\""))?;
        // Exactly what `Display` writes: no sign, no leading zeros.
        let canonical_digits = !count.is_empty()
            && !count.starts_with('0')
            && count.bytes().all(|b| b.is_ascii_digit());
        let count: u32 = canonical_digits
            .then(|| count.parse().ok())
            .flatten()
            .ok_or_else(|| ModelError::malformed(s, "count is not a positive integer"))?;
        let unit: DurationUnit = unit
            .parse()
            .map_err(|_| ModelError::malformed(s, "unknown duration unit"))?;
        Self::new(count, unit).ok_or_else(|| ModelError::malformed(s, "count out of range"))
    }
}

impl From<IntervalQuantity> for String {
    fn from(value: IntervalQuantity) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for IntervalQuantity {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// ISO weekday, Monday = 1 … Sunday = 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum WeekdayUnit {
    Monday = 1,
    Tuesday = 2,
    Wednesday = 3,
    Thursday = 4,
    Friday = 5,
    Saturday = 6,
    Sunday = 7,
}

impl WeekdayUnit {
    pub const ALL: [WeekdayUnit; 7] = [
        WeekdayUnit::Monday,
        WeekdayUnit::Tuesday,
        WeekdayUnit::Wednesday,
        WeekdayUnit::Thursday,
        WeekdayUnit::Friday,
        WeekdayUnit::Saturday,
        WeekdayUnit::Sunday,
    ];

    pub const fn iso_number(self) -> u32 {
        self as u32
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            WeekdayUnit::Monday => "MONDAY",
            WeekdayUnit::Tuesday => "TUESDAY",
            WeekdayUnit::Wednesday => "WEDNESDAY",
            WeekdayUnit::Thursday => "THURSDAY",
            WeekdayUnit::Friday => "FRIDAY",
            WeekdayUnit::Saturday => "SATURDAY",
            WeekdayUnit::Sunday => "SUNDAY",
        }
    }

    pub fn weekday(self) -> Weekday {
        match self {
            WeekdayUnit::Monday => Weekday::Mon,
            WeekdayUnit::Tuesday => Weekday::Tue,
            WeekdayUnit::Wednesday => Weekday::Wed,
            WeekdayUnit::Thursday => Weekday::Thu,
            WeekdayUnit::Friday => Weekday::Fri,
            WeekdayUnit::Saturday => Weekday::Sat,
            WeekdayUnit::Sunday => Weekday::Sun,
        }
    }

    /// Accusative forms as used after "в"/"каждый", plus "суббота".
    pub fn from_locale(word: &str) -> Option<Self> {
        match word.to_lowercase().as_str() {
            "понедельник" => Some(WeekdayUnit::Monday),
            "вторник" => Some(WeekdayUnit::Tuesday),
            "среду" | "среда" => Some(WeekdayUnit::Wednesday),
            "четверг" => Some(WeekdayUnit::Thursday),
            "пятницу" | "пятница" => Some(WeekdayUnit::Friday),
            "субботу" | "суббота" => Some(WeekdayUnit::Saturday),
            "воскресенье" => Some(WeekdayUnit::Sunday),
            _ => None,
        }
    }

    /// First instant strictly after `dt` (1..=7 days later, same time of day)
    /// that falls on this weekday.
    pub fn next_after(self, dt: NaiveDateTime) -> NaiveDateTime {
        let target = self.weekday();
        let mut next = dt + Duration::days(1);
        // Bounded: a week holds every weekday once.
        while next.weekday() != target {
            next += Duration::days(1);
        }
        next
    }
}

impl fmt::Display for WeekdayUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeekdayUnit {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WeekdayUnit::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| ModelError::malformed(s, "unknown weekday"))
    }
}

impl From<WeekdayUnit> for String {
    fn from(value: WeekdayUnit) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for WeekdayUnit {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// How a reminder repeats: every N units, or every given weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Recurrence {
    Interval(IntervalQuantity),
    Weekday(WeekdayUnit),
}

impl Recurrence {
    /// Duration words win over weekday words; the two vocabularies are disjoint.
    pub fn from_locale(word: &str) -> Option<Self> {
        IntervalQuantity::from_locale(word)
            .map(Recurrence::Interval)
            .or_else(|| WeekdayUnit::from_locale(word).map(Recurrence::Weekday))
    }

    /// Next occurrence strictly after `dt`.
    pub fn next_instant(&self, dt: NaiveDateTime) -> NaiveDateTime {
        match self {
            Recurrence::Interval(q) => q.shift_forward(dt),
            Recurrence::Weekday(d) => d.next_after(dt),
        }
    }
}

impl From<IntervalQuantity> for Recurrence {
    fn from(value: IntervalQuantity) -> Self {
        Recurrence::Interval(value)
    }
}

impl From<WeekdayUnit> for Recurrence {
    fn from(value: WeekdayUnit) -> Self {
        Recurrence::Weekday(value)
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recurrence::Interval(q) => q.fmt(f),
            Recurrence::Weekday(d) => d.fmt(f),
        }
    }
}

impl FromStr for Recurrence {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(q) = s.parse::<IntervalQuantity>() {
            return Ok(Recurrence::Interval(q));
        }
        if let Ok(d) = s.parse::<WeekdayUnit>() {
            return Ok(Recurrence::Weekday(d));
        }
        Err(ModelError::malformed(s, "neither an interval nor a weekday"))
    }
}

impl From<Recurrence> for String {
    fn from(value: Recurrence) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for Recurrence {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
