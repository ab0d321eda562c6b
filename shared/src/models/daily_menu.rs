//! Daily menu models
//!
//! A daily menu is what was actually served on a date. Its foods are
//! snapshots: nutrient values are copied at save time so later catalog
//! edits do not rewrite history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::UserSummary;
use crate::nutrition::{FoodItem, PortionNutrition};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyMenu {
    pub id: Uuid,
    pub user: UserSummary,
    pub menu_id: Option<Uuid>,
    pub menu_name: Option<String>,
    pub date: DateTime<Utc>,
    pub notes: Option<String>,
    pub original_image_url: Option<String>,
    pub detected_image_url: Option<String>,
    pub foods: Vec<DailyMenuFood>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyMenuFood {
    pub id: Uuid,
    pub food_name: String,
    pub quantity: f64,
    pub confidence: f64,
    pub tray_class: Option<String>,
    pub food_image_url: Option<String>,
    pub nutrition: PortionNutrition,
}

impl DailyMenuFood {
    pub fn to_food_item(&self) -> FoodItem {
        FoodItem {
            name: self.food_name.clone(),
            quantity: self.quantity,
            confidence: self.confidence,
            tray_slot: self.tray_class.clone(),
            nutrition: Some(self.nutrition),
        }
    }
}

impl DailyMenu {
    pub fn food_items(&self) -> Vec<FoodItem> {
        self.foods.iter().map(DailyMenuFood::to_food_item).collect()
    }
}
