//! Environment classes and their catchment radii.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Normalizes an environment class label for lookups (trim + lowercase).
#[must_use]
pub fn normalize_environment_class(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Settings for a single environment class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSettings {
    /// Catchment radius in kilometers.
    pub radius_km: f64,
}

/// Environment class label -> catchment radius.
///
/// Keys are normalized on construction, so `"Com > 200 m habts "` and
/// `"com > 200 m habts"` refer to the same class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, EnvironmentSettings>",
    into = "BTreeMap<String, EnvironmentSettings>"
)]
pub struct EnvironmentParameters {
    classes: BTreeMap<String, EnvironmentSettings>,
}

impl EnvironmentParameters {
    /// Builds parameters from `(label, radius_km)` pairs.
    #[must_use]
    pub fn from_radii<I, S>(radii: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let classes = radii
            .into_iter()
            .map(|(label, radius_km)| {
                (
                    normalize_environment_class(label.as_ref()),
                    EnvironmentSettings { radius_km },
                )
            })
            .collect();
        Self { classes }
    }

    /// Catchment radius for `class`.
    ///
    /// # Errors
    ///
    /// Returns an [`EnvironmentLookupError`] if the class is not
    /// configured or its radius is not strictly positive.
    pub fn radius_km(&self, class: &str) -> Result<f64, EnvironmentLookupError> {
        let normalized = normalize_environment_class(class);
        let Some(settings) = self.classes.get(&normalized) else {
            return Err(EnvironmentLookupError::Missing { class: normalized });
        };

        let radius_km = settings.radius_km;
        if !(radius_km.is_finite() && radius_km > 0.0) {
            return Err(EnvironmentLookupError::NonPositiveRadius {
                class: normalized,
                radius_km,
            });
        }

        Ok(radius_km)
    }

    /// Configured (normalized) class labels.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    /// Number of configured classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether no class is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl From<BTreeMap<String, EnvironmentSettings>> for EnvironmentParameters {
    fn from(raw: BTreeMap<String, EnvironmentSettings>) -> Self {
        Self::from_radii(raw.into_iter().map(|(k, v)| (k, v.radius_km)))
    }
}

impl From<EnvironmentParameters> for BTreeMap<String, EnvironmentSettings> {
    fn from(params: EnvironmentParameters) -> Self {
        params.classes
    }
}

/// Error returned when an environment class has no usable radius.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvironmentLookupError {
    /// The class is not configured.
    Missing {
        /// The normalized class label.
        class: String,
    },
    /// The configured radius is zero, negative or not a number.
    NonPositiveRadius {
        /// The normalized class label.
        class: String,
        /// The configured radius.
        radius_km: f64,
    },
}

impl std::fmt::Display for EnvironmentLookupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing { class } => {
                write!(f, "environment class '{class}' is not configured")
            }
            Self::NonPositiveRadius { class, radius_km } => write!(
                f,
                "environment class '{class}' must have a radius_km > 0 (got {radius_km})"
            ),
        }
    }
}

impl std::error::Error for EnvironmentLookupError {}
