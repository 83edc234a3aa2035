//! Demographic aggregation over a subset of statistical cells.
//!
//! Missing attribute values count as zero in sums. A distribution is only
//! reported when every one of its category columns is present on at least
//! one cell and the summed counts are positive; each distribution is
//! decided independently of the others.

use std::collections::BTreeMap;

use chalandise_geography_models::{
    AgeBracket, AttributeCategory, Occupation, Sex, StatisticalCell,
};
use chalandise_zones_models::StatsSummary;

/// Summarizes the demographics of `cells`.
///
/// An empty input yields [`StatsSummary::default`], whose only reported
/// figure is a zero population.
#[must_use]
pub fn aggregate<'a, I>(cells: I) -> StatsSummary
where
    I: IntoIterator<Item = &'a StatisticalCell>,
{
    let cells: Vec<&StatisticalCell> = cells.into_iter().collect();
    if cells.is_empty() {
        return StatsSummary::default();
    }

    let population: f64 = cells.iter().filter_map(|c| c.population()).sum();

    StatsSummary {
        cell_count: cells.len(),
        population_total: round_count(population),
        weighted_median_income: weighted_income(&cells),
        age_distribution: distribution::<AgeBracket>(&cells),
        sex_distribution: distribution::<Sex>(&cells),
        occupation_distribution: distribution::<Occupation>(&cells),
    }
}

/// Population-weighted mean of the cells' median incomes.
///
/// Only cells reporting both an income and a population take part.
fn weighted_income(cells: &[&StatisticalCell]) -> Option<f64> {
    let (weighted_sum, weight) = cells
        .iter()
        .filter_map(|c| Some((c.population()?, c.median_income()?)))
        .fold((0.0, 0.0), |(sum, weight), (population, income)| {
            (population.mul_add(income, sum), weight + population)
        });

    if weight > 0.0 {
        Some(round_to(weighted_sum / weight, 2))
    } else {
        None
    }
}

/// Percentage share of each category, rounded to one decimal.
fn distribution<C: AttributeCategory>(cells: &[&StatisticalCell]) -> Option<BTreeMap<C, f64>> {
    let mut totals = BTreeMap::new();

    for &category in C::ALL {
        let column = category.column();
        let mut present = false;
        let mut sum = 0.0;
        for value in cells.iter().filter_map(|c| c.attribute(column)) {
            present = true;
            sum += value;
        }
        if !present {
            return None;
        }
        totals.insert(category, sum);
    }

    let total: f64 = totals.values().sum();
    if total <= 0.0 {
        return None;
    }

    Some(
        totals
            .into_iter()
            .map(|(category, count)| (category, round_to(count / total * 100.0, 1)))
            .collect(),
    )
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_count(value: f64) -> u64 {
    value.max(0.0).round_ties_even() as u64
}

/// Rounds to `decimals` decimal places, halves to even.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}
