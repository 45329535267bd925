//! Weight unit conversion.
//!
//! Weights are stored canonically in pounds and converted only for display.

use serde::{Deserialize, Serialize};

/// Pounds to kilograms factor.
const KG_PER_LB: f64 = 0.453592;

/// Weight unit preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    /// Pounds (canonical storage unit)
    #[default]
    Lbs,
    /// Kilograms
    Kg,
}

impl WeightUnit {
    /// Short label used in notifications and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            WeightUnit::Lbs => "LBS",
            WeightUnit::Kg => "KG",
        }
    }

    /// The other unit.
    pub fn toggled(&self) -> Self {
        match self {
            WeightUnit::Lbs => WeightUnit::Kg,
            WeightUnit::Kg => WeightUnit::Lbs,
        }
    }
}

impl std::fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Convert pounds to kilograms, rounded to one decimal.
pub fn lbs_to_kg(lbs: f64) -> f64 {
    if lbs == 0.0 || !lbs.is_finite() {
        return 0.0;
    }
    (lbs * KG_PER_LB * 10.0).round() / 10.0
}

/// Convert kilograms to whole pounds.
pub fn kg_to_lbs(kg: f64) -> f64 {
    if kg == 0.0 || !kg.is_finite() {
        return 0.0;
    }
    (kg / KG_PER_LB).round()
}

/// Convert a canonical pound value into the preferred display unit.
pub fn display_weight(lbs: f64, unit: WeightUnit) -> f64 {
    match unit {
        WeightUnit::Kg => lbs_to_kg(lbs),
        WeightUnit::Lbs => lbs,
    }
}
