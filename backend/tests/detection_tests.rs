//! Detection normalization tests
//!
//! Covers parsing of full detector responses and the food selection rules:
//! compartment order, duplicate names and the per-tray limit.

use std::collections::HashMap;

use proptest::prelude::*;
use shared::detection::{
    select_foods, to_food_items, tray_slot_number, DetectedFood, DetectionResult, MAX_TRAY_FOODS,
};
use shared::nutrition::{compute_totals, NutrientProfile, PortionNutrition, PortionSize};

const PIPELINE_RESPONSE: &str = r#"{
    "recognized": true,
    "num_trays": 1,
    "total_foods_detected": 4,
    "trays": [
        {
            "tray_id": 0,
            "tray_class": "food-tray",
            "tray_confidence": 0.97,
            "tray_bbox": {"x1": 10, "y1": 12, "x2": 620, "y2": 410},
            "foods": [
                {"class_name": "Nasi", "confidence": 0.93, "bbox": {"x1": 20, "y1": 30, "x2": 200, "y2": 180}}
            ]
        }
    ],
    "all_foods": [
        {"class_name": "Ayam Goreng", "confidence": 0.88, "tray_id": 0, "tray_class": "food-tray-sekat-2"},
        {"class_name": "Nasi", "confidence": 0.93, "tray_id": 0, "tray_class": "food-tray-sekat-1"},
        {"class_name": "Sawi", "confidence": 0.61, "tray_id": 0, "tray_class": "food-tray-sekat-3"},
        {"class_name": "nasi", "confidence": 0.42, "tray_id": 0, "tray_class": "food-tray-sekat-4"}
    ],
    "total_unique_foods": 3,
    "image_size": {"width": 640, "height": 480}
}"#;

fn catalog() -> HashMap<String, PortionNutrition> {
    let mut catalog = HashMap::new();
    catalog.insert(
        "nasi".to_string(),
        PortionNutrition::new(
            NutrientProfile::new(175.0, 3.0, 0.3, 0.4, 40.0),
            NutrientProfile::new(87.0, 1.5, 0.15, 0.2, 20.0),
        ),
    );
    catalog.insert(
        "ayam goreng".to_string(),
        PortionNutrition::new(
            NutrientProfile::new(260.0, 27.0, 14.0, 0.0, 8.0),
            NutrientProfile::new(130.0, 13.5, 7.0, 0.0, 4.0),
        ),
    );
    catalog
}

// ============================================================================
// Unit Tests
// ============================================================================

mod unit_tests {
    use super::*;

    #[test]
    fn parses_pipeline_response() {
        let result: DetectionResult = serde_json::from_str(PIPELINE_RESPONSE).unwrap();
        assert!(result.recognized);
        assert_eq!(result.trays.len(), 1);
        assert_eq!(result.all_foods.len(), 4);
        assert_eq!(
            result.image_size.map(|s| (s.width, s.height)),
            Some((640, 480))
        );
        assert_eq!(result.unique_names(), vec!["ayam goreng", "nasi", "sawi"]);
    }

    #[test]
    fn unrecognized_response_has_no_foods() {
        let result: DetectionResult = serde_json::from_str(r#"{"recognized": false}"#).unwrap();
        assert!(result.all_foods.is_empty());
        assert!(select_foods(&result.all_foods, MAX_TRAY_FOODS).is_empty());
    }

    #[test]
    fn tray_photo_to_totals() {
        let result: DetectionResult = serde_json::from_str(PIPELINE_RESPONSE).unwrap();
        let selected = select_foods(&result.all_foods, MAX_TRAY_FOODS);
        let names: Vec<&str> = selected.iter().map(|f| f.class_name.as_str()).collect();
        assert_eq!(names, vec!["Nasi", "Ayam Goreng", "Sawi"]);

        let items = to_food_items(&selected, &catalog());
        assert!(items[2].nutrition.is_none());

        let totals = compute_totals(&items, PortionSize::Large);
        assert_eq!(totals.energy, 435.0);
        assert_eq!(totals.carbohydrate, 48.0);
    }

    #[test]
    fn slot_numbers() {
        assert_eq!(tray_slot_number("food-tray-sekat-1"), Some(1));
        assert_eq!(tray_slot_number("FOOD-TRAY-SEKAT-5"), Some(5));
        assert_eq!(tray_slot_number("food-tray-sekat-x"), None);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

fn detected_food_strategy() -> impl Strategy<Value = DetectedFood> {
    (
        prop_oneof![
            Just("Nasi"),
            Just("nasi"),
            Just("Tahu"),
            Just("Tempe Goreng"),
            Just("Sawi"),
            Just("Apel"),
            Just("Jeruk"),
            Just("Telur"),
        ],
        0.0f64..=1.0,
        prop::option::of(1u32..8),
    )
        .prop_map(|(name, confidence, slot)| DetectedFood {
            class_name: name.to_string(),
            confidence,
            tray_id: Some(0),
            tray_class: slot.map(|n| format!("food-tray-sekat-{}", n)),
        })
}

mod property_tests {
    use super::*;

    fn slot(food: &DetectedFood) -> u32 {
        food.tray_class
            .as_deref()
            .and_then(tray_slot_number)
            .unwrap_or(u32::MAX)
    }

    proptest! {
        #[test]
        fn selection_respects_limit(
            foods in prop::collection::vec(detected_food_strategy(), 0..20),
            limit in 0usize..8,
        ) {
            prop_assert!(select_foods(&foods, limit).len() <= limit);
        }

        #[test]
        fn selection_has_unique_names(foods in prop::collection::vec(detected_food_strategy(), 0..20)) {
            let selected = select_foods(&foods, MAX_TRAY_FOODS);
            let mut names: Vec<String> = selected.iter().map(|f| f.class_name.to_lowercase()).collect();
            let before = names.len();
            names.sort();
            names.dedup();
            prop_assert_eq!(names.len(), before);
        }

        #[test]
        fn selection_follows_compartment_order(foods in prop::collection::vec(detected_food_strategy(), 0..20)) {
            let selected = select_foods(&foods, MAX_TRAY_FOODS);
            for pair in selected.windows(2) {
                prop_assert!(slot(&pair[0]) <= slot(&pair[1]));
            }
        }

        #[test]
        fn selected_foods_come_from_input(foods in prop::collection::vec(detected_food_strategy(), 0..20)) {
            for chosen in select_foods(&foods, MAX_TRAY_FOODS) {
                prop_assert!(foods.contains(&chosen));
            }
        }
    }
}
