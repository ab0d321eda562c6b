//! Nutrition aggregation and AKG evaluation
//!
//! Turns a list of food items into per-nutrient totals for one portion size
//! and compares those totals against a threshold record. Everything here is
//! a pure function of its inputs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::ParseError;

/// Lower tolerance band for nutrients that must reach their target
pub const LOWER_BAND: f64 = 0.8;

/// Upper tolerance band for nutrients penalized for excess (fat)
pub const UPPER_BAND: f64 = 1.2;

/// Fixed fiber floor used by the daily menu screen, in grams
pub const DEFAULT_FIBER_FLOOR_GRAMS: f64 = 3.0;

/// Portion scale (porsi besar / porsi kecil)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum PortionSize {
    #[default]
    #[serde(alias = "besar")]
    Large,
    #[serde(alias = "kecil")]
    Small,
}

impl PortionSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortionSize::Large => "large",
            PortionSize::Small => "small",
        }
    }
}

impl FromStr for PortionSize {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "large" | "besar" => Ok(PortionSize::Large),
            "small" | "kecil" => Ok(PortionSize::Small),
            other => Err(ParseError::PortionSize(other.to_string())),
        }
    }
}

impl fmt::Display for PortionSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five nutrients tracked against AKG
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Nutrient {
    Energy,
    Protein,
    Fat,
    Fiber,
    Carbohydrate,
}

impl Nutrient {
    /// Display order used by every evaluation
    pub const ALL: [Nutrient; 5] = [
        Nutrient::Energy,
        Nutrient::Protein,
        Nutrient::Fat,
        Nutrient::Fiber,
        Nutrient::Carbohydrate,
    ];
}

impl fmt::Display for Nutrient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Nutrient::Energy => "energy",
            Nutrient::Protein => "protein",
            Nutrient::Fat => "fat",
            Nutrient::Fiber => "fiber",
            Nutrient::Carbohydrate => "carbohydrate",
        };
        f.write_str(name)
    }
}

/// Nutrient values for one unit of a food at one portion size
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct NutrientProfile {
    #[serde(default)]
    pub energy: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub fat: f64,
    #[serde(default)]
    pub fiber: f64,
    #[serde(default)]
    pub carbohydrate: f64,
}

impl NutrientProfile {
    pub fn new(energy: f64, protein: f64, fat: f64, fiber: f64, carbohydrate: f64) -> Self {
        Self {
            energy,
            protein,
            fat,
            fiber,
            carbohydrate,
        }
    }

    pub fn get(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::Energy => self.energy,
            Nutrient::Protein => self.protein,
            Nutrient::Fat => self.fat,
            Nutrient::Fiber => self.fiber,
            Nutrient::Carbohydrate => self.carbohydrate,
        }
    }

    /// Iterate `(nutrient, value)` pairs in display order
    pub fn values(&self) -> impl Iterator<Item = (Nutrient, f64)> + '_ {
        Nutrient::ALL.into_iter().map(move |n| (n, self.get(n)))
    }
}

/// The ten per-unit values carried by a catalog food: five nutrients at
/// two portion sizes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct PortionNutrition {
    #[serde(default)]
    pub large: NutrientProfile,
    #[serde(default)]
    pub small: NutrientProfile,
}

impl PortionNutrition {
    pub fn new(large: NutrientProfile, small: NutrientProfile) -> Self {
        Self { large, small }
    }

    pub fn for_portion(&self, portion: PortionSize) -> &NutrientProfile {
        match portion {
            PortionSize::Large => &self.large,
            PortionSize::Small => &self.small,
        }
    }
}

/// A detected or selected food, normalized for aggregation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodItem {
    pub name: String,
    pub quantity: f64,
    /// Detection certainty, informational only
    #[serde(default)]
    pub confidence: f64,
    /// Tray compartment tag, informational only
    #[serde(default)]
    pub tray_slot: Option<String>,
    /// `None` when the name had no catalog match
    #[serde(default)]
    pub nutrition: Option<PortionNutrition>,
}

impl FoodItem {
    pub fn new(name: impl Into<String>, quantity: f64, nutrition: Option<PortionNutrition>) -> Self {
        Self {
            name: name.into(),
            quantity,
            confidence: 0.0,
            tray_slot: None,
            nutrition,
        }
    }

    /// Contribution of this item to one nutrient total
    fn contribution(&self, nutrient: Nutrient, portion: PortionSize) -> f64 {
        match &self.nutrition {
            Some(n) => self.quantity * n.for_portion(portion).get(nutrient),
            None => 0.0,
        }
    }
}

/// Accumulated nutrients of a meal for one portion size
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct NutrientTotals {
    pub portion: PortionSize,
    pub energy: f64,
    pub protein: f64,
    pub fat: f64,
    pub fiber: f64,
    pub carbohydrate: f64,
}

impl NutrientTotals {
    pub fn zero(portion: PortionSize) -> Self {
        Self {
            portion,
            ..Self::default()
        }
    }

    pub fn get(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::Energy => self.energy,
            Nutrient::Protein => self.protein,
            Nutrient::Fat => self.fat,
            Nutrient::Fiber => self.fiber,
            Nutrient::Carbohydrate => self.carbohydrate,
        }
    }

    fn set(&mut self, nutrient: Nutrient, value: f64) {
        match nutrient {
            Nutrient::Energy => self.energy = value,
            Nutrient::Protein => self.protein = value,
            Nutrient::Fat => self.fat = value,
            Nutrient::Fiber => self.fiber = value,
            Nutrient::Carbohydrate => self.carbohydrate = value,
        }
    }
}

/// Target nutrient values of one AKG record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Threshold {
    pub energy: f64,
    pub protein: f64,
    pub fat: f64,
    #[serde(default)]
    pub fiber: f64,
    pub carbohydrate: f64,
}

impl Threshold {
    pub fn new(energy: f64, protein: f64, fat: f64, fiber: f64, carbohydrate: f64) -> Self {
        Self {
            energy,
            protein,
            fat,
            fiber,
            carbohydrate,
        }
    }

    pub fn get(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::Energy => self.energy,
            Nutrient::Protein => self.protein,
            Nutrient::Fat => self.fat,
            Nutrient::Fiber => self.fiber,
            Nutrient::Carbohydrate => self.carbohydrate,
        }
    }
}

/// How fiber is judged
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FiberPolicy {
    /// fiber >= threshold.fiber * 0.8
    ThresholdRelative,
    /// fiber >= a fixed number of grams, ignoring the threshold record
    FixedFloor { grams: f64 },
}

impl Default for FiberPolicy {
    fn default() -> Self {
        FiberPolicy::ThresholdRelative
    }
}

impl FiberPolicy {
    /// Parse the configuration form (`threshold_relative` / `fixed_floor`)
    pub fn from_config(name: &str, floor_grams: f64) -> Result<Self, ParseError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "threshold_relative" | "relative" => Ok(FiberPolicy::ThresholdRelative),
            "fixed_floor" | "fixed" => Ok(FiberPolicy::FixedFloor { grams: floor_grams }),
            other => Err(ParseError::FiberPolicy(other.to_string())),
        }
    }
}

/// Evaluation knobs that are policy rather than arithmetic
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct EvaluationRules {
    pub fiber_policy: FiberPolicy,
    /// Whether the fiber check takes part in `overall_met`
    pub fiber_in_overall: bool,
}

/// Direction of a nutrient's tolerance band
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Bound {
    AtLeast,
    AtMost,
}

/// Outcome for one nutrient
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NutrientCheck {
    pub nutrient: Nutrient,
    pub total: f64,
    /// Target taken from the threshold record
    pub target: f64,
    /// The value `total` was compared against
    pub limit: f64,
    pub bound: Bound,
    pub met: bool,
    /// `total / target * 100`, zero when the target is zero. Display only.
    pub percent_of_target: f64,
}

/// Per-nutrient met flags and the overall verdict
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Verdict {
    pub checks: Vec<NutrientCheck>,
    pub overall_met: bool,
}

impl Verdict {
    pub fn check(&self, nutrient: Nutrient) -> Option<&NutrientCheck> {
        self.checks.iter().find(|c| c.nutrient == nutrient)
    }

    pub fn met(&self, nutrient: Nutrient) -> Option<bool> {
        self.check(nutrient).map(|c| c.met)
    }
}

/// Totals plus verdict, the shape returned by every evaluation endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NutritionReport {
    pub totals: NutrientTotals,
    pub verdict: Option<Verdict>,
}

/// Sum `quantity × per-unit value` over all items for the selected portion.
///
/// Items without nutrition contribute zero. Contributions are added in a
/// canonical order, so the result does not depend on the order of `items`.
/// No validation happens here: negative or non-finite inputs flow through.
pub fn compute_totals(items: &[FoodItem], portion: PortionSize) -> NutrientTotals {
    let mut totals = NutrientTotals::zero(portion);
    let mut contributions = Vec::with_capacity(items.len());

    for nutrient in Nutrient::ALL {
        contributions.clear();
        contributions.extend(items.iter().map(|item| item.contribution(nutrient, portion)));
        contributions.sort_by(|a, b| a.total_cmp(b));
        totals.set(nutrient, contributions.iter().sum());
    }

    totals
}

/// Compare totals against a threshold record.
///
/// Returns `None` when no threshold is available: a missing standard is not
/// the same as an unmet one.
pub fn evaluate(
    totals: &NutrientTotals,
    threshold: Option<&Threshold>,
    rules: &EvaluationRules,
) -> Option<Verdict> {
    let threshold = threshold?;

    let checks: Vec<NutrientCheck> = Nutrient::ALL
        .into_iter()
        .map(|nutrient| check_nutrient(nutrient, totals.get(nutrient), threshold, rules))
        .collect();

    let overall_met = checks
        .iter()
        .filter(|c| c.nutrient != Nutrient::Fiber || rules.fiber_in_overall)
        .all(|c| c.met);

    Some(Verdict {
        checks,
        overall_met,
    })
}

/// Totals and verdict in one call
pub fn evaluate_items(
    items: &[FoodItem],
    portion: PortionSize,
    threshold: Option<&Threshold>,
    rules: &EvaluationRules,
) -> NutritionReport {
    let totals = compute_totals(items, portion);
    let verdict = evaluate(&totals, threshold, rules);
    NutritionReport { totals, verdict }
}

fn check_nutrient(
    nutrient: Nutrient,
    total: f64,
    threshold: &Threshold,
    rules: &EvaluationRules,
) -> NutrientCheck {
    let target = threshold.get(nutrient);

    let (bound, limit) = match nutrient {
        Nutrient::Fat => (Bound::AtMost, target * UPPER_BAND),
        Nutrient::Fiber => match rules.fiber_policy {
            FiberPolicy::ThresholdRelative => (Bound::AtLeast, target * LOWER_BAND),
            FiberPolicy::FixedFloor { grams } => (Bound::AtLeast, grams),
        },
        _ => (Bound::AtLeast, target * LOWER_BAND),
    };

    let met = match bound {
        Bound::AtLeast => total >= limit,
        Bound::AtMost => total <= limit,
    };

    let percent_of_target = if target > 0.0 {
        total / target * 100.0
    } else {
        0.0
    };

    NutrientCheck {
        nutrient,
        total,
        target,
        limit,
        bound,
        met,
        percent_of_target,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nasi() -> FoodItem {
        FoodItem::new(
            "Nasi",
            1.0,
            Some(PortionNutrition::new(
                NutrientProfile::new(175.0, 3.0, 0.3, 0.4, 40.0),
                NutrientProfile::new(87.0, 1.5, 0.15, 0.2, 20.0),
            )),
        )
    }

    fn ayam_goreng() -> FoodItem {
        FoodItem::new(
            "Ayam Goreng",
            1.0,
            Some(PortionNutrition::new(
                NutrientProfile::new(260.0, 27.0, 14.0, 0.0, 8.0),
                NutrientProfile::new(130.0, 13.5, 7.0, 0.0, 4.0),
            )),
        )
    }

    fn lunch_standard() -> Threshold {
        Threshold::new(700.0, 20.0, 20.0, 8.0, 100.0)
    }

    #[test]
    fn test_empty_items_give_zero_totals() {
        let totals = compute_totals(&[], PortionSize::Small);
        assert_eq!(totals, NutrientTotals::zero(PortionSize::Small));
    }

    #[test]
    fn test_large_portion_totals() {
        let totals = compute_totals(&[nasi(), ayam_goreng()], PortionSize::Large);
        assert!((totals.energy - 435.0).abs() < 1e-9);
        assert!((totals.protein - 30.0).abs() < 1e-9);
        assert!((totals.fat - 14.3).abs() < 1e-9);
        assert!((totals.fiber - 0.4).abs() < 1e-9);
        assert!((totals.carbohydrate - 48.0).abs() < 1e-9);
    }

    #[test]
    fn test_small_portion_uses_small_fields() {
        let totals = compute_totals(&[nasi(), ayam_goreng()], PortionSize::Small);
        assert!((totals.energy - 217.0).abs() < 1e-9);
        assert!((totals.protein - 15.0).abs() < 1e-9);
        assert_eq!(totals.portion, PortionSize::Small);
    }

    #[test]
    fn test_quantity_multiplies_contribution() {
        let mut rice = nasi();
        rice.quantity = 2.5;
        let totals = compute_totals(&[rice], PortionSize::Large);
        assert!((totals.energy - 437.5).abs() < 1e-9);
    }

    #[test]
    fn test_unmatched_item_contributes_nothing() {
        let unknown = FoodItem::new("Rendang", 4.0, None);
        let totals = compute_totals(&[nasi(), unknown], PortionSize::Large);
        assert!((totals.energy - 175.0).abs() < 1e-9);
    }

    #[test]
    fn test_nan_propagates() {
        let mut rice = nasi();
        rice.quantity = f64::NAN;
        let totals = compute_totals(&[rice], PortionSize::Large);
        assert!(totals.energy.is_nan());
    }

    #[test]
    fn test_evaluate_without_threshold_is_none() {
        let totals = compute_totals(&[nasi()], PortionSize::Large);
        assert!(evaluate(&totals, None, &EvaluationRules::default()).is_none());
    }

    #[test]
    fn test_evaluate_lunch_scenario() {
        let totals = compute_totals(&[nasi(), ayam_goreng()], PortionSize::Large);
        let verdict = evaluate(&totals, Some(&lunch_standard()), &EvaluationRules::default())
            .expect("threshold given");

        assert_eq!(verdict.met(Nutrient::Energy), Some(false));
        assert_eq!(verdict.met(Nutrient::Protein), Some(true));
        assert_eq!(verdict.met(Nutrient::Fat), Some(true));
        assert_eq!(verdict.met(Nutrient::Carbohydrate), Some(false));
        assert!(!verdict.overall_met);

        let energy = verdict.check(Nutrient::Energy).unwrap();
        assert!((energy.limit - 560.0).abs() < 1e-9);
        assert!((energy.percent_of_target - 62.142857).abs() < 1e-5);
    }

    #[test]
    fn test_fat_is_an_upper_bound() {
        let threshold = lunch_standard();
        let mut totals = NutrientTotals::zero(PortionSize::Large);
        totals.fat = 24.0;
        let verdict = evaluate(&totals, Some(&threshold), &EvaluationRules::default()).unwrap();
        assert_eq!(verdict.met(Nutrient::Fat), Some(true));

        totals.fat = 24.1;
        let verdict = evaluate(&totals, Some(&threshold), &EvaluationRules::default()).unwrap();
        assert_eq!(verdict.met(Nutrient::Fat), Some(false));
    }

    #[test]
    fn test_empty_meal_fails_lower_bounds_but_passes_fat() {
        let totals = compute_totals(&[], PortionSize::Large);
        let verdict =
            evaluate(&totals, Some(&lunch_standard()), &EvaluationRules::default()).unwrap();
        assert_eq!(verdict.met(Nutrient::Energy), Some(false));
        assert_eq!(verdict.met(Nutrient::Fat), Some(true));
        assert!(!verdict.overall_met);
    }

    #[test]
    fn test_fiber_policies() {
        let mut totals = NutrientTotals::zero(PortionSize::Large);
        totals.fiber = 3.5;
        let threshold = lunch_standard();

        let relative = EvaluationRules::default();
        let verdict = evaluate(&totals, Some(&threshold), &relative).unwrap();
        // 3.5 < 8 * 0.8
        assert_eq!(verdict.met(Nutrient::Fiber), Some(false));

        let floor = EvaluationRules {
            fiber_policy: FiberPolicy::FixedFloor {
                grams: DEFAULT_FIBER_FLOOR_GRAMS,
            },
            fiber_in_overall: false,
        };
        let verdict = evaluate(&totals, Some(&threshold), &floor).unwrap();
        assert_eq!(verdict.met(Nutrient::Fiber), Some(true));
    }

    #[test]
    fn test_fiber_in_overall_toggle() {
        let threshold = Threshold::new(100.0, 10.0, 10.0, 10.0, 10.0);
        let totals = NutrientTotals {
            portion: PortionSize::Large,
            energy: 100.0,
            protein: 10.0,
            fat: 10.0,
            fiber: 0.0,
            carbohydrate: 10.0,
        };

        let excluded = evaluate(&totals, Some(&threshold), &EvaluationRules::default()).unwrap();
        assert!(excluded.overall_met);

        let included = EvaluationRules {
            fiber_in_overall: true,
            ..EvaluationRules::default()
        };
        let verdict = evaluate(&totals, Some(&threshold), &included).unwrap();
        assert!(!verdict.overall_met);
    }

    #[test]
    fn test_zero_target_percent_is_zero() {
        let threshold = Threshold::new(0.0, 0.0, 0.0, 0.0, 0.0);
        let totals = compute_totals(&[nasi()], PortionSize::Large);
        let verdict = evaluate(&totals, Some(&threshold), &EvaluationRules::default()).unwrap();
        assert!(verdict.checks.iter().all(|c| c.percent_of_target == 0.0));
    }

    #[test]
    fn test_portion_size_parsing() {
        assert_eq!("large".parse::<PortionSize>().unwrap(), PortionSize::Large);
        assert_eq!("Kecil".parse::<PortionSize>().unwrap(), PortionSize::Small);
        assert!("medium".parse::<PortionSize>().is_err());
    }

    #[test]
    fn test_portion_size_deserializes_indonesian_names() {
        let small: PortionSize = serde_json::from_str(r#""kecil""#).unwrap();
        let large: PortionSize = serde_json::from_str(r#""besar""#).unwrap();
        assert_eq!(small, PortionSize::Small);
        assert_eq!(large, PortionSize::Large);
        assert_eq!(serde_json::to_string(&small).unwrap(), r#""small""#);
    }

    #[test]
    fn test_fiber_policy_from_config() {
        assert_eq!(
            FiberPolicy::from_config("threshold_relative", 3.0).unwrap(),
            FiberPolicy::ThresholdRelative
        );
        assert_eq!(
            FiberPolicy::from_config("fixed_floor", 3.0).unwrap(),
            FiberPolicy::FixedFloor { grams: 3.0 }
        );
        assert!(FiberPolicy::from_config("lenient", 3.0).is_err());
    }
}
