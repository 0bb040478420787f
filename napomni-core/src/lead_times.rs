//! Lead-time set: the "remind me N units before" offsets of a reminder.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::units::IntervalQuantity;

/// Lead times sorted by descending span, at most one entry per span.
///
/// Inserting a quantity whose span is already present replaces the earlier
/// entry: "за неделю, ..., за 7 дней" keeps `7 DAY`, not `1 WEEK`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<IntervalQuantity>", from = "Vec<IntervalQuantity>")]
pub struct LeadTimeSet {
    by_span: BTreeMap<i64, IntervalQuantity>,
}

impl LeadTimeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later insert wins on a span collision. Returns the displaced entry.
    pub fn insert(&mut self, lead: IntervalQuantity) -> Option<IntervalQuantity> {
        self.by_span.insert(lead.span_days(), lead)
    }

    pub fn len(&self) -> usize {
        self.by_span.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_span.is_empty()
    }

    /// Longest lead first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &IntervalQuantity> + '_ {
        self.by_span.values().rev()
    }

    pub fn to_vec(&self) -> Vec<IntervalQuantity> {
        self.iter().copied().collect()
    }

    /// Instants `target - lead` for every lead, earliest first.
    pub fn instants_before(&self, target: NaiveDateTime) -> impl Iterator<Item = NaiveDateTime> + '_ {
        self.iter().map(move |lead| lead.shift_back(target))
    }

    pub fn to_canonical(&self) -> Vec<String> {
        self.iter().map(ToString::to_string).collect()
    }

    pub fn from_canonical<I, S>(values: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for value in values {
            set.insert(value.as_ref().parse()?);
        }
        Ok(set)
    }
}

impl FromIterator<IntervalQuantity> for LeadTimeSet {
    fn from_iter<T: IntoIterator<Item = IntervalQuantity>>(iter: T) -> Self {
        let mut set = Self::new();
        for lead in iter {
            set.insert(lead);
        }
        set
    }
}

impl From<Vec<IntervalQuantity>> for LeadTimeSet {
    fn from(value: Vec<IntervalQuantity>) -> Self {
        value.into_iter().collect()
    }
}

impl From<LeadTimeSet> for Vec<IntervalQuantity> {
    fn from(value: LeadTimeSet) -> Self {
        value.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::DurationUnit::{Day, Month, Week, Year};
    use crate::units::DurationUnit;

    fn q(count: u32, unit: DurationUnit) -> IntervalQuantity {
        IntervalQuantity::new(count, unit).unwrap()
    }

    #[test]
    fn empty_by_default() {
        let set = LeadTimeSet::new();
        assert!(set.is_empty());
        assert!(set.to_vec().is_empty());
    }

    #[test]
    fn sorted_by_descending_span() {
        let set: LeadTimeSet = vec![q(1, Day), q(1, Week), q(1, Month), q(3, Day)].into();
        assert_eq!(set.to_vec(), vec![q(1, Month), q(1, Week), q(3, Day), q(1, Day)]);
    }

    #[test]
    fn later_entry_wins_on_equal_span() {
        let set: LeadTimeSet = vec![q(1, Week), q(2, Day), q(7, Day), q(3, Day), q(2, Day), q(1, Day)]
            .into_iter()
            .collect();
        assert_eq!(set.to_vec(), vec![q(7, Day), q(3, Day), q(2, Day), q(1, Day)]);

        let set: LeadTimeSet = vec![q(7, Day), q(1, Week)].into();
        assert_eq!(set.to_vec(), vec![q(1, Week)]);
    }

    #[test]
    fn insert_reports_displaced_entry() {
        let mut set = LeadTimeSet::new();
        assert_eq!(set.insert(q(1, Week)), None);
        assert_eq!(set.insert(q(7, Day)), Some(q(1, Week)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn years_and_half_years_keep_their_place() {
        let set: LeadTimeSet = vec![q(3, Year), q(1, Year), q(6, Month), q(3, Month), q(10, Day), q(1, Week)].into();
        assert_eq!(
            set.to_vec(),
            vec![q(3, Year), q(1, Year), q(6, Month), q(3, Month), q(10, Day), q(1, Week)]
        );
    }

    #[test]
    fn canonical_list_round_trip() {
        let set: LeadTimeSet = vec![q(1, Month), q(3, Day)].into();
        let text = set.to_canonical();
        assert_eq!(text, vec!["1 MONTH".to_string(), "3 DAY".to_string()]);
        assert_eq!(LeadTimeSet::from_canonical(&text).unwrap(), set);
        assert!(LeadTimeSet::from_canonical(["1 MONTH", "soon"]).is_err());
    }

    #[test]
    fn serde_rebuilds_invariant() {
        let set: LeadTimeSet = serde_json::from_str(r#"["1 DAY", "1 WEEK", "7 DAY"]"#).unwrap();
        assert_eq!(set.to_vec(), vec![q(7, Day), q(1, Day)]);
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["7 DAY","1 DAY"]"#);
    }
}
