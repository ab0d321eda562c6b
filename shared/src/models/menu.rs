//! Menu template models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::FoodType;
use crate::nutrition::{FoodItem, NutrientTotals};

/// A reusable combination of catalog foods
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Menu {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub detected_image_url: Option<String>,
    /// Large-portion totals, recomputed on every write
    pub totals: NutrientTotals,
    pub foods: Vec<MenuFood>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One catalog food in a menu
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MenuFood {
    pub id: Uuid,
    pub quantity: f64,
    pub food: FoodType,
}

impl Menu {
    pub fn food_items(&self) -> Vec<FoodItem> {
        self.foods
            .iter()
            .map(|mf| mf.food.to_food_item(mf.quantity))
            .collect()
    }
}
