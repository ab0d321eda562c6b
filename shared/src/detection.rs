//! Detection result normalization
//!
//! The ML service returns a loosely shaped JSON document. These structs
//! model it with optional fields so a partial response still parses, and
//! the functions below reduce it to the `FoodItem`s the aggregator needs.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::nutrition::{FoodItem, PortionNutrition};

/// Number of compartments on a standard MBG tray
pub const MAX_TRAY_FOODS: usize = 5;

/// Slot number used for foods whose tray class carries no `sekat-<n>` tag
pub const UNKNOWN_SLOT: u32 = 999;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// A food found inside one tray
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrayFood {
    pub class_name: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub bbox: Option<BoundingBox>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
}

/// A tray compartment found by the tray detector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tray {
    pub tray_id: i64,
    #[serde(default)]
    pub tray_class: String,
    #[serde(default)]
    pub tray_confidence: f64,
    #[serde(default)]
    pub tray_bbox: Option<BoundingBox>,
    #[serde(default)]
    pub foods: Vec<TrayFood>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tray_image_base64: Option<String>,
}

/// Flattened entry of `all_foods`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectedFood {
    pub class_name: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub tray_id: Option<i64>,
    #[serde(default)]
    pub tray_class: Option<String>,
}

/// Full response of `/predict/{endpoint}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DetectionResult {
    #[serde(default)]
    pub recognized: bool,
    #[serde(default)]
    pub num_trays: u32,
    #[serde(default)]
    pub total_foods_detected: u32,
    #[serde(default)]
    pub trays: Vec<Tray>,
    #[serde(default)]
    pub all_foods: Vec<DetectedFood>,
    #[serde(default)]
    pub total_unique_foods: u32,
    #[serde(default)]
    pub image_size: Option<ImageSize>,
}

impl DetectionResult {
    /// Lowercased, deduplicated class names in first-seen order
    pub fn unique_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.all_foods
            .iter()
            .map(|f| f.class_name.to_lowercase())
            .filter(|name| seen.insert(name.clone()))
            .collect()
    }
}

/// Extract `n` from a tray class such as `food-tray-sekat-2`
pub fn tray_slot_number(tray_class: &str) -> Option<u32> {
    let lower = tray_class.to_ascii_lowercase();
    let start = lower.rfind("sekat-")? + "sekat-".len();
    let digits: String = lower[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn slot_of(food: &DetectedFood) -> u32 {
    food.tray_class
        .as_deref()
        .and_then(tray_slot_number)
        .unwrap_or(UNKNOWN_SLOT)
}

/// Pick the foods shown for one tray photo.
///
/// Foods are ordered by compartment number (untagged last), then by
/// confidence, highest first. Later duplicates of a class name are dropped
/// and at most `limit` foods are kept.
pub fn select_foods(all_foods: &[DetectedFood], limit: usize) -> Vec<DetectedFood> {
    let mut sorted: Vec<&DetectedFood> = all_foods.iter().collect();
    sorted.sort_by(|a, b| {
        slot_of(a)
            .cmp(&slot_of(b))
            .then_with(|| b.confidence.total_cmp(&a.confidence))
    });

    let mut seen = HashSet::new();
    sorted
        .into_iter()
        .filter(|f| seen.insert(f.class_name.to_lowercase()))
        .take(limit)
        .cloned()
        .collect()
}

/// Turn selected detections into aggregator input.
///
/// `catalog` is keyed by lowercase food name. Unmatched names keep
/// `nutrition = None` and contribute nothing to totals.
pub fn to_food_items(
    selected: &[DetectedFood],
    catalog: &HashMap<String, PortionNutrition>,
) -> Vec<FoodItem> {
    selected
        .iter()
        .map(|food| FoodItem {
            name: food.class_name.clone(),
            quantity: 1.0,
            confidence: food.confidence,
            tray_slot: food.tray_class.clone(),
            nutrition: catalog.get(&food.class_name.to_lowercase()).copied(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nutrition::NutrientProfile;

    fn food(name: &str, confidence: f64, tray_class: Option<&str>) -> DetectedFood {
        DetectedFood {
            class_name: name.to_string(),
            confidence,
            tray_id: None,
            tray_class: tray_class.map(str::to_string),
        }
    }

    #[test]
    fn test_tray_slot_number() {
        assert_eq!(tray_slot_number("food-tray-sekat-2"), Some(2));
        assert_eq!(tray_slot_number("Sekat-12"), Some(12));
        assert_eq!(tray_slot_number("food-tray"), None);
        assert_eq!(tray_slot_number("sekat-"), None);
    }

    #[test]
    fn test_select_orders_by_slot_then_confidence() {
        let foods = vec![
            food("Tempe Goreng", 0.9, Some("sekat-3")),
            food("Nasi", 0.7, Some("sekat-1")),
            food("Pisang", 0.95, None),
            food("Sawi", 0.8, Some("sekat-1")),
        ];

        let names: Vec<String> = select_foods(&foods, MAX_TRAY_FOODS)
            .into_iter()
            .map(|f| f.class_name)
            .collect();
        assert_eq!(names, vec!["Sawi", "Nasi", "Tempe Goreng", "Pisang"]);
    }

    #[test]
    fn test_select_drops_duplicates_and_limits() {
        let foods = vec![
            food("Nasi", 0.9, Some("sekat-1")),
            food("nasi", 0.5, Some("sekat-2")),
            food("Tahu", 0.9, Some("sekat-2")),
            food("Telur", 0.9, Some("sekat-3")),
            food("Apel", 0.9, Some("sekat-4")),
            food("Sawi", 0.9, Some("sekat-5")),
            food("Jeruk", 0.9, Some("sekat-6")),
        ];

        let selected = select_foods(&foods, MAX_TRAY_FOODS);
        assert_eq!(selected.len(), 5);
        assert_eq!(selected[0].class_name, "Nasi");
        assert!(selected.iter().all(|f| f.class_name != "nasi"));
        assert!(selected.iter().all(|f| f.class_name != "Jeruk"));
    }

    #[test]
    fn test_to_food_items_matches_case_insensitively() {
        let mut catalog = HashMap::new();
        catalog.insert(
            "nasi".to_string(),
            PortionNutrition::new(
                NutrientProfile::new(175.0, 3.0, 0.3, 0.4, 40.0),
                NutrientProfile::new(87.0, 1.5, 0.15, 0.2, 20.0),
            ),
        );

        let items = to_food_items(
            &[food("Nasi", 0.8, Some("sekat-1")), food("Rendang", 0.6, None)],
            &catalog,
        );
        assert_eq!(items.len(), 2);
        assert!(items[0].nutrition.is_some());
        assert_eq!(items[0].quantity, 1.0);
        assert_eq!(items[0].tray_slot.as_deref(), Some("sekat-1"));
        assert!(items[1].nutrition.is_none());
    }

    #[test]
    fn test_partial_result_parses() {
        let json = r#"{"recognized": true, "all_foods": [{"class_name": "Nasi", "confidence": 0.91}]}"#;
        let result: DetectionResult = serde_json::from_str(json).unwrap();
        assert!(result.trays.is_empty());
        assert_eq!(result.all_foods[0].tray_class, None);
        assert_eq!(result.unique_names(), vec!["nasi"]);
    }
}
