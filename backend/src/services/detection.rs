//! Detection service
//!
//! Sends a tray photo to the ML service, normalizes the detections and
//! prices them against the food catalog.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use shared::detection::{select_foods, to_food_items, DetectionResult};
use shared::nutrition::{evaluate_items, EvaluationRules, FoodItem, NutritionReport, PortionSize};
use shared::{validate_conf_threshold, validate_file_name, validate_image_content_type, FoodType};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::MlConfig;
use crate::error::{AppError, AppResult};
use crate::external::{ImagePayload, MlDetectionClient};
use crate::services::akg::AkgService;
use crate::services::food_type::FoodTypeService;

#[derive(Clone)]
pub struct DetectionService {
    db: PgPool,
    ml: MlDetectionClient,
    config: MlConfig,
}

/// Query parameters of `POST /detect`
#[derive(Debug, Default, Deserialize)]
pub struct DetectionQuery {
    pub endpoint: Option<String>,
    pub conf_threshold: Option<f64>,
    pub portion: Option<PortionSize>,
    pub threshold_id: Option<Uuid>,
}

/// Raw ML document enriched with catalog data
#[derive(Debug, Serialize)]
pub struct DetectionOutcome {
    #[serde(flatten)]
    pub result: serde_json::Map<String, serde_json::Value>,
    pub annotated_image_base64: Option<String>,
    /// Lowercase food name to catalog entry
    pub nutrition_map: HashMap<String, FoodType>,
    pub foods: Vec<FoodItem>,
    pub report: NutritionReport,
}

impl DetectionService {
    pub fn new(db: PgPool, ml: MlDetectionClient, config: MlConfig) -> Self {
        Self { db, ml, config }
    }

    pub async fn detect(
        &self,
        image: ImagePayload,
        query: DetectionQuery,
        rules: &EvaluationRules,
    ) -> AppResult<DetectionOutcome> {
        validate_image_content_type(&image.content_type)
            .map_err(|m| AppError::invalid_field("file", m))?;
        validate_file_name(&image.file_name).map_err(|m| AppError::invalid_field("file", m))?;
        if image.bytes.is_empty() {
            return Err(AppError::invalid_field("file", "File is empty"));
        }

        let endpoint = query
            .endpoint
            .unwrap_or_else(|| self.config.default_endpoint.clone());
        validate_endpoint(&endpoint).map_err(|m| AppError::invalid_field("endpoint", m))?;

        let conf = query
            .conf_threshold
            .unwrap_or(self.config.default_conf_threshold);
        validate_conf_threshold(conf).map_err(|m| AppError::invalid_field("conf_threshold", m))?;

        let portion = query.portion.unwrap_or_default();

        let (predicted, annotated) = tokio::join!(
            self.ml.predict(&endpoint, conf, &image),
            self.ml.annotated_image(&endpoint, conf, &image)
        );
        let raw = predicted?;
        let annotated_image_base64 = match annotated {
            Ok(encoded) => Some(encoded),
            Err(e) => {
                tracing::warn!(error = %e, "Annotated image unavailable");
                None
            }
        };

        let result = match raw {
            serde_json::Value::Object(map) => map,
            _ => {
                return Err(AppError::MlService {
                    status: None,
                    message: "Detection response is not a JSON object".to_string(),
                })
            }
        };
        let parsed: DetectionResult = serde_json::from_value(serde_json::Value::Object(result.clone()))
            .map_err(|e| AppError::MlService {
                status: None,
                message: format!("Unexpected detection response: {}", e),
            })?;

        let names = parsed.unique_names();
        tracing::debug!(names = ?names, "Detected foods");

        let nutrition_map = FoodTypeService::new(self.db.clone())
            .find_by_names(&names)
            .await?;
        tracing::debug!(matched = ?nutrition_map.keys().collect::<Vec<_>>(), "Matched catalog foods");

        let catalog: HashMap<String, _> = nutrition_map
            .iter()
            .map(|(name, food)| (name.clone(), food.nutrition))
            .collect();
        let selected = select_foods(&parsed.all_foods, self.config.max_detected_foods);
        let foods = to_food_items(&selected, &catalog);

        let akg = AkgService::new(self.db.clone())
            .resolve(query.threshold_id)
            .await?;
        let report = evaluate_items(&foods, portion, akg.as_ref().map(|a| &a.threshold), rules);

        Ok(DetectionOutcome {
            result,
            annotated_image_base64,
            nutrition_map,
            foods,
            report,
        })
    }
}

/// ML endpoint names are path segments: letters, digits, `-` and `_`
pub fn validate_endpoint(endpoint: &str) -> Result<(), &'static str> {
    if endpoint.is_empty() {
        return Err("Endpoint is required");
    }
    if !endpoint
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err("Endpoint may only contain letters, digits, '-' and '_'");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_endpoint() {
        assert!(validate_endpoint("pipeline").is_ok());
        assert!(validate_endpoint("food_v2-small").is_ok());
        assert!(validate_endpoint("").is_err());
        assert!(validate_endpoint("../admin").is_err());
        assert!(validate_endpoint("a/b").is_err());
    }

    #[test]
    fn test_outcome_flattens_raw_result() {
        let mut result = serde_json::Map::new();
        result.insert("recognized".to_string(), serde_json::json!(true));
        let outcome = DetectionOutcome {
            result,
            annotated_image_base64: None,
            nutrition_map: HashMap::new(),
            foods: Vec::new(),
            report: NutritionReport {
                totals: shared::nutrition::NutrientTotals::zero(PortionSize::Large),
                verdict: None,
            },
        };

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["recognized"], true);
        assert!(json["annotated_image_base64"].is_null());
        assert_eq!(json["report"]["totals"]["energy"], 0.0);
    }
}
