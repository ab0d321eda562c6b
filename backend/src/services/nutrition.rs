//! Ad-hoc evaluation of a food list

use serde::Deserialize;
use shared::nutrition::{evaluate_items, EvaluationRules, FoodItem, NutritionReport, PortionSize, Threshold};
use shared::{validate_confidence, validate_portion_nutrition, validate_quantity, validate_threshold};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::akg::AkgService;

#[derive(Clone)]
pub struct NutritionService {
    db: PgPool,
}

/// `POST /nutrition/evaluate` body.
///
/// An inline `threshold` wins over `threshold_id`; with neither, the
/// default AKG is used.
#[derive(Debug, Deserialize)]
pub struct EvaluateInput {
    pub items: Vec<FoodItem>,
    #[serde(default)]
    pub portion: PortionSize,
    pub threshold_id: Option<Uuid>,
    pub threshold: Option<Threshold>,
}

impl NutritionService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn evaluate(
        &self,
        input: EvaluateInput,
        rules: &EvaluationRules,
    ) -> AppResult<NutritionReport> {
        validate_items(&input.items)?;

        let threshold = match input.threshold {
            Some(threshold) => {
                validate_threshold(&threshold).map_err(|m| AppError::invalid_field("threshold", m))?;
                Some(threshold)
            }
            None => AkgService::new(self.db.clone())
                .resolve(input.threshold_id)
                .await?
                .map(|akg| akg.threshold),
        };

        Ok(evaluate_items(&input.items, input.portion, threshold.as_ref(), rules))
    }
}

pub fn validate_items(items: &[FoodItem]) -> AppResult<()> {
    for item in items {
        validate_quantity(item.quantity).map_err(|m| AppError::invalid_field("quantity", m))?;
        validate_confidence(item.confidence)
            .map_err(|m| AppError::invalid_field("confidence", m))?;
        if let Some(nutrition) = &item.nutrition {
            validate_portion_nutrition(nutrition)
                .map_err(|m| AppError::invalid_field("nutrition", m))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::nutrition::{NutrientProfile, PortionNutrition};

    fn item(quantity: f64, energy: f64) -> FoodItem {
        let profile = NutrientProfile::new(energy, 1.0, 1.0, 1.0, 1.0);
        FoodItem::new("nasi", quantity, Some(PortionNutrition::new(profile, profile)))
    }

    #[test]
    fn test_validate_items() {
        assert!(validate_items(&[item(1.0, 100.0)]).is_ok());
        assert!(validate_items(&[]).is_ok());
        assert!(validate_items(&[item(0.0, 100.0)]).is_err());
        assert!(validate_items(&[item(1.0, -5.0)]).is_err());
        assert!(validate_items(&[FoodItem::new("unknown", 2.0, None)]).is_ok());
    }

    #[test]
    fn test_input_defaults_to_large_portion() {
        let input: EvaluateInput = serde_json::from_str(r#"{"items": []}"#).unwrap();
        assert_eq!(input.portion, PortionSize::Large);
        assert!(input.threshold.is_none());
    }
}
