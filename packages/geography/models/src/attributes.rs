//! Demographic attribute column codes.
//!
//! Maps the fixed demographic categories (age brackets, sex, occupation
//! categories) to the column names used by the statistical-layer
//! demographics file, and to the stable snake-case keys used when
//! statistics are flattened for export.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Default column holding the statistical cell code.
pub const CELL_CODE_COLUMN: &str = "CODE_IRIS";

/// Total resident population of a cell.
pub const POPULATION_ATTRIBUTE: &str = "POP_TOTAL";

/// Median household income of a cell, in euros.
pub const INCOME_ATTRIBUTE: &str = "REVENU_MEDIAN";

/// A fixed set of demographic categories whose counts are stored as one
/// attribute column per category.
///
/// `as_ref()` yields the stable export key (e.g. `"age_0_17"`).
pub trait AttributeCategory: Copy + Ord + AsRef<str> + 'static {
    /// Every category, in reporting order.
    const ALL: &'static [Self];

    /// Column name holding this category's count.
    fn column(self) -> &'static str;
}

/// Age brackets reported for each cell.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum AgeBracket {
    /// Residents aged 0 to 17.
    #[serde(rename = "age_0_17")]
    #[strum(serialize = "age_0_17")]
    Age0To17,
    /// Students aged 18 to 24.
    #[serde(rename = "students_18_24")]
    #[strum(serialize = "students_18_24")]
    Students18To24,
    /// Working-age residents aged 25 to 39.
    #[serde(rename = "workers_25_39")]
    #[strum(serialize = "workers_25_39")]
    Workers25To39,
    /// Residents aged 40 to 64.
    #[serde(rename = "age_40_64")]
    #[strum(serialize = "age_40_64")]
    Age40To64,
    /// Residents aged 65 and over.
    #[serde(rename = "age_65_plus")]
    #[strum(serialize = "age_65_plus")]
    Age65Plus,
}

impl AttributeCategory for AgeBracket {
    const ALL: &'static [Self] = &[
        Self::Age0To17,
        Self::Students18To24,
        Self::Workers25To39,
        Self::Age40To64,
        Self::Age65Plus,
    ];

    fn column(self) -> &'static str {
        match self {
            Self::Age0To17 => "AGE_0_17",
            Self::Students18To24 => "ETUDIANTS_18_24",
            Self::Workers25To39 => "ACTIFS_25_39",
            Self::Age40To64 => "AGE_40_64",
            Self::Age65Plus => "AGE_65_PLUS",
        }
    }
}

/// Sex of residents.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Sex {
    /// Male residents.
    Male,
    /// Female residents.
    Female,
}

impl AttributeCategory for Sex {
    const ALL: &'static [Self] = &[Self::Male, Self::Female];

    fn column(self) -> &'static str {
        match self {
            Self::Male => "HOMMES",
            Self::Female => "FEMMES",
        }
    }
}

/// Socio-professional category of residents aged 15 and over.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Occupation {
    /// Farmers.
    Farmers,
    /// Craftspeople, shopkeepers and business owners.
    Shopkeepers,
    /// Executives and higher intellectual professions.
    Executives,
    /// Intermediate professions.
    Intermediate,
    /// Office and service employees.
    Employees,
    /// Manual workers.
    Workers,
    /// Retirees.
    Retirees,
    /// Other people without professional activity.
    OtherInactive,
}

impl AttributeCategory for Occupation {
    const ALL: &'static [Self] = &[
        Self::Farmers,
        Self::Shopkeepers,
        Self::Executives,
        Self::Intermediate,
        Self::Employees,
        Self::Workers,
        Self::Retirees,
        Self::OtherInactive,
    ];

    fn column(self) -> &'static str {
        match self {
            Self::Farmers => "AGRICULTEURS",
            Self::Shopkeepers => "COMMERCANTS",
            Self::Executives => "CADRES",
            Self::Intermediate => "INTERMEDIAIRES",
            Self::Employees => "EMPLOYES",
            Self::Workers => "OUVRIERS",
            Self::Retirees => "RETRAITES",
            Self::OtherInactive => "AUTRES_INACTIFS",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::str::FromStr as _;

    use super::*;

    fn columns<C: AttributeCategory>() -> Vec<&'static str> {
        C::ALL.iter().map(|c| c.column()).collect()
    }

    #[test]
    fn category_counts() {
        assert_eq!(AgeBracket::ALL.len(), 5);
        assert_eq!(Sex::ALL.len(), 2);
        assert_eq!(Occupation::ALL.len(), 8);
    }

    #[test]
    fn columns_are_unique() {
        let mut seen = BTreeSet::new();
        let all = columns::<AgeBracket>()
            .into_iter()
            .chain(columns::<Sex>())
            .chain(columns::<Occupation>())
            .chain([POPULATION_ATTRIBUTE, INCOME_ATTRIBUTE]);
        for column in all {
            assert!(seen.insert(column), "duplicate attribute column: {column}");
        }
    }

    #[test]
    fn export_keys() {
        assert_eq!(AgeBracket::Age0To17.as_ref(), "age_0_17");
        assert_eq!(AgeBracket::Age65Plus.as_ref(), "age_65_plus");
        assert_eq!(Sex::Female.as_ref(), "female");
        assert_eq!(Occupation::OtherInactive.as_ref(), "other_inactive");
    }

    #[test]
    fn keys_roundtrip() {
        for bracket in AgeBracket::ALL {
            assert_eq!(AgeBracket::from_str(bracket.as_ref()).ok(), Some(*bracket));
        }
        for occupation in Occupation::ALL {
            assert_eq!(
                Occupation::from_str(occupation.as_ref()).ok(),
                Some(*occupation)
            );
        }
    }
}
