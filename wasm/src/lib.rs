//! WebAssembly module for the MBG nutrition monitor
//!
//! Runs the nutrition aggregator in the browser so the meal form can show
//! totals and the AKG verdict before anything is saved:
//! - Nutrient totals for a food list
//! - AKG evaluation
//! - Food selection from a raw detection result

use shared::detection::{select_foods, to_food_items, DetectionResult, MAX_TRAY_FOODS};
use shared::nutrition::{
    compute_totals, evaluate_items, EvaluationRules, FoodItem, PortionNutrition, PortionSize,
    Threshold,
};
use std::collections::HashMap;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::nutrition::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::log_1(&JsValue::from_str("mbg-nutrition wasm ready"));
}

fn parse_portion(portion: &str) -> Result<PortionSize, String> {
    if portion.trim().is_empty() {
        return Ok(PortionSize::Large);
    }
    portion.parse().map_err(|e| format!("{}", e))
}

fn to_js(json: String) -> Result<JsValue, JsValue> {
    js_sys::JSON::parse(&json)
}

/// Totals of `items_json` (array of food items) as JSON
pub fn totals_json(items_json: &str, portion: &str) -> Result<String, String> {
    let items: Vec<FoodItem> =
        serde_json::from_str(items_json).map_err(|e| format!("Invalid items JSON: {}", e))?;
    let totals = compute_totals(&items, parse_portion(portion)?);
    serde_json::to_string(&totals).map_err(|e| e.to_string())
}

/// Totals and verdict as JSON. An empty `threshold_json` skips the verdict,
/// an empty `rules_json` uses the default rules.
pub fn evaluate_json(
    items_json: &str,
    portion: &str,
    threshold_json: &str,
    rules_json: &str,
) -> Result<String, String> {
    let items: Vec<FoodItem> =
        serde_json::from_str(items_json).map_err(|e| format!("Invalid items JSON: {}", e))?;
    let threshold: Option<Threshold> = if threshold_json.trim().is_empty() {
        None
    } else {
        Some(
            serde_json::from_str(threshold_json)
                .map_err(|e| format!("Invalid threshold JSON: {}", e))?,
        )
    };
    let rules: EvaluationRules = if rules_json.trim().is_empty() {
        EvaluationRules::default()
    } else {
        serde_json::from_str(rules_json).map_err(|e| format!("Invalid rules JSON: {}", e))?
    };

    let report = evaluate_items(&items, parse_portion(portion)?, threshold.as_ref(), &rules);
    serde_json::to_string(&report).map_err(|e| e.to_string())
}

/// Food items picked from a raw detection document.
///
/// `catalog_json` maps food names to their large/small nutrition.
pub fn detected_items_json(detection_json: &str, catalog_json: &str) -> Result<String, String> {
    let result: DetectionResult = serde_json::from_str(detection_json)
        .map_err(|e| format!("Invalid detection JSON: {}", e))?;
    let catalog: HashMap<String, PortionNutrition> = serde_json::from_str(catalog_json)
        .map_err(|e| format!("Invalid catalog JSON: {}", e))?;
    let catalog = catalog
        .into_iter()
        .map(|(name, nutrition)| (name.to_lowercase(), nutrition))
        .collect();

    let selected = select_foods(&result.all_foods, MAX_TRAY_FOODS);
    serde_json::to_string(&to_food_items(&selected, &catalog)).map_err(|e| e.to_string())
}

#[wasm_bindgen(js_name = computeTotals)]
pub fn compute_totals_js(items_json: &str, portion: &str) -> Result<JsValue, JsValue> {
    to_js(totals_json(items_json, portion).map_err(|e| JsValue::from_str(&e))?)
}

#[wasm_bindgen(js_name = evaluateNutrition)]
pub fn evaluate_js(
    items_json: &str,
    portion: &str,
    threshold_json: &str,
    rules_json: &str,
) -> Result<JsValue, JsValue> {
    to_js(
        evaluate_json(items_json, portion, threshold_json, rules_json)
            .map_err(|e| JsValue::from_str(&e))?,
    )
}

#[wasm_bindgen(js_name = detectedItems)]
pub fn detected_items_js(detection_json: &str, catalog_json: &str) -> Result<JsValue, JsValue> {
    to_js(detected_items_json(detection_json, catalog_json).map_err(|e| JsValue::from_str(&e))?)
}

/// Whether a typed-in nutrient value is acceptable
#[wasm_bindgen(js_name = isValidNutrientValue)]
pub fn is_valid_nutrient_value(value: f64) -> bool {
    validate_nutrient_value(value).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITEMS: &str = r#"[
        {"name": "Nasi Putih", "quantity": 1,
         "nutrition": {
            "large": {"energy": 180, "protein": 3, "fat": 0.3, "fiber": 0.2, "carbohydrate": 40},
            "small": {"energy": 120, "protein": 2, "fat": 0.2, "fiber": 0.1, "carbohydrate": 27}}},
        {"name": "Ayam Goreng", "quantity": 1,
         "nutrition": {
            "large": {"energy": 255, "protein": 27, "fat": 14, "fiber": 0.2, "carbohydrate": 8},
            "small": {"energy": 170, "protein": 18, "fat": 9, "fiber": 0.1, "carbohydrate": 5}}},
        {"name": "Mystery", "quantity": 2}
    ]"#;

    #[test]
    fn test_totals_json() {
        let totals: serde_json::Value =
            serde_json::from_str(&totals_json(ITEMS, "large").unwrap()).unwrap();
        assert_eq!(totals["energy"], 435.0);
        assert_eq!(totals["protein"], 30.0);
        assert_eq!(totals["portion"], "large");

        let small: serde_json::Value =
            serde_json::from_str(&totals_json(ITEMS, "kecil").unwrap()).unwrap();
        assert_eq!(small["energy"], 290.0);
    }

    #[test]
    fn test_evaluate_json_without_threshold() {
        let report: serde_json::Value =
            serde_json::from_str(&evaluate_json(ITEMS, "", "", "").unwrap()).unwrap();
        assert!(report["verdict"].is_null());
    }

    #[test]
    fn test_evaluate_json_with_threshold() {
        let threshold = r#"{"energy": 700, "protein": 20, "fat": 20, "fiber": 8, "carbohydrate": 100}"#;
        let report: serde_json::Value =
            serde_json::from_str(&evaluate_json(ITEMS, "large", threshold, "").unwrap()).unwrap();
        assert_eq!(report["verdict"]["overall_met"], false);
    }

    #[test]
    fn test_bad_input_is_reported() {
        assert!(totals_json("not json", "large").is_err());
        assert!(totals_json(ITEMS, "medium").is_err());
    }

    #[test]
    fn test_detected_items_json() {
        let detection = r#"{
            "all_foods": [
                {"class_name": "Ayam Goreng", "confidence": 0.7, "tray_class": "food-tray-sekat-2"},
                {"class_name": "Nasi Putih", "confidence": 0.9, "tray_class": "food-tray-sekat-1"}
            ]
        }"#;
        let catalog = r#"{
            "nasi putih": {
                "large": {"energy": 180, "protein": 3, "fat": 0.3, "fiber": 0.2, "carbohydrate": 40},
                "small": {"energy": 120, "protein": 2, "fat": 0.2, "fiber": 0.1, "carbohydrate": 27}}
        }"#;
        let items: Vec<FoodItem> =
            serde_json::from_str(&detected_items_json(detection, catalog).unwrap()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Nasi Putih");
        assert!(items[0].nutrition.is_some());
        assert!(items[1].nutrition.is_none());
    }

    #[test]
    fn test_nutrient_value_check() {
        assert!(is_valid_nutrient_value(12.5));
        assert!(!is_valid_nutrient_value(-1.0));
        assert!(!is_valid_nutrient_value(f64::NAN));
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    const ITEMS: &str = r#"[
        {"name": "Nasi", "quantity": 1,
         "nutrition": {
            "large": {"energy": 175, "protein": 3, "fat": 0.3, "fiber": 0.4, "carbohydrate": 40},
            "small": {"energy": 87, "protein": 1.5, "fat": 0.15, "fiber": 0.2, "carbohydrate": 20}}},
        {"name": "Ayam Goreng", "quantity": 1,
         "nutrition": {
            "large": {"energy": 260, "protein": 27, "fat": 14, "fiber": 0, "carbohydrate": 8},
            "small": {"energy": 130, "protein": 13.5, "fat": 7, "fiber": 0, "carbohydrate": 4}}}
    ]"#;

    fn field(value: &JsValue, key: &str) -> JsValue {
        js_sys::Reflect::get(value, &JsValue::from_str(key)).unwrap()
    }

    #[wasm_bindgen_test]
    fn compute_totals_returns_js_object() {
        let totals = compute_totals_js(ITEMS, "besar").unwrap();
        assert_eq!(field(&totals, "energy").as_f64(), Some(435.0));
        assert_eq!(field(&totals, "carbohydrate").as_f64(), Some(48.0));
        assert_eq!(field(&totals, "portion").as_string().as_deref(), Some("large"));
    }

    #[wasm_bindgen_test]
    fn evaluate_nutrition_returns_verdict() {
        let threshold =
            r#"{"energy": 700, "protein": 20, "fat": 20, "fiber": 8, "carbohydrate": 100}"#;
        let report = evaluate_js(ITEMS, "large", threshold, "").unwrap();
        let verdict = field(&report, "verdict");
        assert_eq!(field(&verdict, "overall_met").as_bool(), Some(false));
    }

    #[wasm_bindgen_test]
    fn bad_json_becomes_js_error() {
        let err = compute_totals_js("not json", "large").unwrap_err();
        assert!(err.as_string().unwrap_or_default().contains("Invalid items JSON"));
    }
}
