//! Food catalog models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::nutrition::{FoodItem, PortionNutrition};

/// A catalog entry: one food class the detector knows, with per-unit
/// nutrients for both portion sizes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodType {
    pub id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub nutrition: PortionNutrition,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FoodType {
    /// Lookup key used to match detector class names
    pub fn match_key(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn to_food_item(&self, quantity: f64) -> FoodItem {
        FoodItem::new(self.name.clone(), quantity, Some(self.nutrition))
    }
}
