// 📊 Percentage-Share Aggregator
// share = value / Σ(group) × 100, and 0 whenever that would not be a number

use crate::fiscal::ExpenditureType;
use crate::model::FactRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// GROUPING KEY
// ============================================================================

/// Which records are compared against each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupBy {
    /// Components of one state in one year (composition over time)
    StateYear,
    /// Everything for one state (one-year slices compared across states)
    State,
    /// Every state in one year
    Year,
    /// One state, one year, one expenditure type
    StateYearType,
    /// One state, one expenditure type
    StateType,
}

impl GroupBy {
    pub fn code(&self) -> &'static str {
        match self {
            GroupBy::StateYear => "state-year",
            GroupBy::State => "state",
            GroupBy::Year => "year",
            GroupBy::StateYearType => "state-year-type",
            GroupBy::StateType => "state-type",
        }
    }

    fn key<'a>(&self, record: &'a FactRecord) -> GroupKey<'a> {
        let state = Some(record.entity.as_str());
        let year = Some(record.year);
        let kind = record.kind;
        match self {
            GroupBy::StateYear => GroupKey(state, year, None),
            GroupBy::State => GroupKey(state, None, None),
            GroupBy::Year => GroupKey(None, year, None),
            GroupBy::StateYearType => GroupKey(state, year, kind),
            GroupBy::StateType => GroupKey(state, None, kind),
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for GroupBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "state-year" => Ok(GroupBy::StateYear),
            "state" => Ok(GroupBy::State),
            "year" => Ok(GroupBy::Year),
            "state-year-type" => Ok(GroupBy::StateYearType),
            "state-type" => Ok(GroupBy::StateType),
            other => Err(format!("unknown grouping '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct GroupKey<'a>(Option<&'a str>, Option<i32>, Option<ExpenditureType>);

// ============================================================================
// SHARES
// ============================================================================

/// A record together with its percentage of the group total
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareRecord {
    #[serde(flatten)]
    pub fact: FactRecord,
    pub share: f64,
}

/// Percentage share of each record within its group, aligned with `records`
///
/// Missing values count as nothing toward the sum and get a share of 0.
/// Groups whose sum is not positive (all zero, all missing) give 0 to every
/// member, never NaN.
pub fn percentage_shares(records: &[FactRecord], group_by: GroupBy) -> Vec<f64> {
    let mut totals: HashMap<GroupKey<'_>, f64> = HashMap::new();
    for record in records {
        let total = totals.entry(group_by.key(record)).or_insert(0.0);
        if let Some(value) = record.value {
            *total += value;
        }
    }

    records
        .iter()
        .map(|record| {
            let total = totals[&group_by.key(record)];
            match record.value {
                Some(value) if total > 0.0 => value / total * 100.0,
                _ => 0.0,
            }
        })
        .collect()
}

/// Records paired with their share, original order kept
pub fn with_shares(records: &[FactRecord], group_by: GroupBy) -> Vec<ShareRecord> {
    percentage_shares(records, group_by)
        .into_iter()
        .zip(records)
        .map(|(share, fact)| ShareRecord {
            fact: fact.clone(),
            share,
        })
        .collect()
}
