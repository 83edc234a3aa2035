//! Demographic summaries and their flattened, export-ready form.

use std::collections::BTreeMap;

use chalandise_geography_models::{AgeBracket, AttributeCategory, Occupation, Sex};
use serde::{Deserialize, Serialize};

/// Demographic statistics over a set of statistical cells.
///
/// The default value is the summary of an empty cell set: only a zero
/// population is reported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    /// Number of cells summarized.
    pub cell_count: usize,
    /// Summed population, rounded to the nearest integer.
    pub population_total: u64,
    /// Population-weighted average of cell median incomes, if any cell
    /// reports one.
    pub weighted_median_income: Option<f64>,
    /// Share of each age bracket, in percent.
    pub age_distribution: Option<BTreeMap<AgeBracket, f64>>,
    /// Share of each sex, in percent.
    pub sex_distribution: Option<BTreeMap<Sex, f64>>,
    /// Share of each occupation category, in percent.
    pub occupation_distribution: Option<BTreeMap<Occupation, f64>>,
}

impl StatsSummary {
    /// Whether this summarizes an empty cell set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.cell_count == 0
    }

    /// Flattens the summary into scalar fields.
    ///
    /// Distributions become one `<parent>_<category>` field per category
    /// (e.g. `age_pct_age_0_17`). An empty summary yields exactly
    /// `population_total`.
    #[must_use]
    pub fn flatten(&self) -> FlatStats {
        let mut flat = FlatStats::default();
        flat.push("population_total", StatValue::Integer(self.population_total));

        if self.is_empty() {
            return flat;
        }

        flat.push(
            "weighted_median_income",
            self.weighted_median_income
                .map_or(StatValue::Missing, StatValue::Number),
        );
        push_distribution(&mut flat, "age_pct", self.age_distribution.as_ref());
        push_distribution(&mut flat, "sex_pct", self.sex_distribution.as_ref());
        push_distribution(
            &mut flat,
            "occupation_pct",
            self.occupation_distribution.as_ref(),
        );

        flat
    }
}

fn push_distribution<C: AttributeCategory>(
    flat: &mut FlatStats,
    parent: &str,
    distribution: Option<&BTreeMap<C, f64>>,
) {
    let Some(distribution) = distribution else {
        return;
    };
    for (category, pct) in distribution {
        let key: &str = category.as_ref();
        flat.push(format!("{parent}_{key}"), StatValue::Number(*pct));
    }
}

/// A single flattened statistic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    /// A count.
    Integer(u64),
    /// A measurement or percentage.
    Number(f64),
    /// Not available for this cell set.
    Missing,
}

impl StatValue {
    /// Numeric value, if any.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(v as f64),
            Self::Number(v) => Some(v),
            Self::Missing => None,
        }
    }
}

impl std::fmt::Display for StatValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Number(v) => write!(f, "{v}"),
            Self::Missing => Ok(()),
        }
    }
}

/// Ordered list of `(field name, value)` pairs with stable names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatStats(Vec<(String, StatValue)>);

impl FlatStats {
    /// Appends a field.
    pub fn push(&mut self, name: impl Into<String>, value: StatValue) {
        self.0.push((name.into(), value));
    }

    /// Value of the named field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<StatValue> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    /// Field names, in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    /// Fields, in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, StatValue)> {
        self.0.iter().map(|(n, v)| (n.as_str(), *v))
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
