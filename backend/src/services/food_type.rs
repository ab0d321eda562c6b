//! Food catalog service

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::nutrition::{NutrientProfile, PortionNutrition};
use shared::{validate_name, validate_portion_nutrition, FoodType};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Catalog service for food types
#[derive(Clone)]
pub struct FoodTypeService {
    db: PgPool,
}

/// Catalog row as stored
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FoodTypeRow {
    pub id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub energy_large: f64,
    pub protein_large: f64,
    pub fat_large: f64,
    pub fiber_large: f64,
    pub carbohydrate_large: f64,
    pub energy_small: f64,
    pub protein_small: f64,
    pub fat_small: f64,
    pub fiber_small: f64,
    pub carbohydrate_small: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<FoodTypeRow> for FoodType {
    fn from(row: FoodTypeRow) -> Self {
        FoodType {
            id: row.id,
            name: row.name,
            image_url: row.image_url,
            nutrition: PortionNutrition::new(
                NutrientProfile::new(
                    row.energy_large,
                    row.protein_large,
                    row.fat_large,
                    row.fiber_large,
                    row.carbohydrate_large,
                ),
                NutrientProfile::new(
                    row.energy_small,
                    row.protein_small,
                    row.fat_small,
                    row.fiber_small,
                    row.carbohydrate_small,
                ),
            ),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub(crate) const FOOD_TYPE_COLUMNS: &str = "id, name, image_url, \
     energy_large, protein_large, fat_large, fiber_large, carbohydrate_large, \
     energy_small, protein_small, fat_small, fiber_small, carbohydrate_small, \
     created_at, updated_at";

/// Input for creating a food type
#[derive(Debug, Deserialize, Validate)]
pub struct CreateFoodTypeInput {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    #[validate(url(message = "Image URL must be a valid URL"))]
    pub image_url: Option<String>,
    #[serde(default)]
    pub nutrition: PortionNutrition,
}

/// Input for updating a food type
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateFoodTypeInput {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: Option<String>,
    #[validate(url(message = "Image URL must be a valid URL"))]
    pub image_url: Option<String>,
    pub nutrition: Option<PortionNutrition>,
}

impl FoodTypeService {
    /// Create a new FoodTypeService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// All catalog entries, ordered by name
    pub async fn list(&self) -> AppResult<Vec<FoodType>> {
        let rows = sqlx::query_as::<_, FoodTypeRow>(&format!(
            "SELECT {} FROM food_types ORDER BY name ASC",
            FOOD_TYPE_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(FoodType::from).collect())
    }

    pub async fn get(&self, id: Uuid) -> AppResult<FoodType> {
        sqlx::query_as::<_, FoodTypeRow>(&format!(
            "SELECT {} FROM food_types WHERE id = $1",
            FOOD_TYPE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .map(FoodType::from)
        .ok_or_else(|| AppError::NotFound("Food type".to_string()))
    }

    /// Case-insensitive lookup by name, keyed by lowercase name
    pub async fn find_by_names(&self, names: &[String]) -> AppResult<HashMap<String, FoodType>> {
        if names.is_empty() {
            return Ok(HashMap::new());
        }

        let lowered: Vec<String> = names.iter().map(|n| n.to_lowercase()).collect();
        let rows = sqlx::query_as::<_, FoodTypeRow>(&format!(
            "SELECT {} FROM food_types WHERE LOWER(name) = ANY($1)",
            FOOD_TYPE_COLUMNS
        ))
        .bind(&lowered)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(FoodType::from)
            .map(|food| (food.match_key(), food))
            .collect())
    }

    pub async fn create(&self, input: CreateFoodTypeInput) -> AppResult<FoodType> {
        input.validate()?;
        validate_name(&input.name).map_err(|m| AppError::invalid_field("name", m))?;
        validate_portion_nutrition(&input.nutrition)
            .map_err(|m| AppError::invalid_field("nutrition", m))?;
        self.ensure_unique_name(&input.name, None).await?;

        let n = &input.nutrition;
        let row = sqlx::query_as::<_, FoodTypeRow>(&format!(
            r#"
            INSERT INTO food_types (name, image_url,
                energy_large, protein_large, fat_large, fiber_large, carbohydrate_large,
                energy_small, protein_small, fat_small, fiber_small, carbohydrate_small)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            FOOD_TYPE_COLUMNS
        ))
        .bind(input.name.trim())
        .bind(&input.image_url)
        .bind(n.large.energy)
        .bind(n.large.protein)
        .bind(n.large.fat)
        .bind(n.large.fiber)
        .bind(n.large.carbohydrate)
        .bind(n.small.energy)
        .bind(n.small.protein)
        .bind(n.small.fat)
        .bind(n.small.fiber)
        .bind(n.small.carbohydrate)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(food_type_id = %row.id, name = %row.name, "Food type created");
        Ok(row.into())
    }

    pub async fn update(&self, id: Uuid, input: UpdateFoodTypeInput) -> AppResult<FoodType> {
        input.validate()?;
        let existing = self.get(id).await?;

        if let Some(ref name) = input.name {
            validate_name(name).map_err(|m| AppError::invalid_field("name", m))?;
            self.ensure_unique_name(name, Some(id)).await?;
        }
        if let Some(ref nutrition) = input.nutrition {
            validate_portion_nutrition(nutrition)
                .map_err(|m| AppError::invalid_field("nutrition", m))?;
        }

        let name = input
            .name
            .map(|n| n.trim().to_string())
            .unwrap_or(existing.name);
        let image_url = input.image_url.or(existing.image_url);
        let n = input.nutrition.unwrap_or(existing.nutrition);

        let row = sqlx::query_as::<_, FoodTypeRow>(&format!(
            r#"
            UPDATE food_types
            SET name = $1, image_url = $2,
                energy_large = $3, protein_large = $4, fat_large = $5,
                fiber_large = $6, carbohydrate_large = $7,
                energy_small = $8, protein_small = $9, fat_small = $10,
                fiber_small = $11, carbohydrate_small = $12,
                updated_at = NOW()
            WHERE id = $13
            RETURNING {}
            "#,
            FOOD_TYPE_COLUMNS
        ))
        .bind(&name)
        .bind(&image_url)
        .bind(n.large.energy)
        .bind(n.large.protein)
        .bind(n.large.fat)
        .bind(n.large.fiber)
        .bind(n.large.carbohydrate)
        .bind(n.small.energy)
        .bind(n.small.protein)
        .bind(n.small.fat)
        .bind(n.small.fiber)
        .bind(n.small.carbohydrate)
        .bind(id)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Set the image only when the entry has none yet
    pub async fn fill_missing_image(&self, id: Uuid, image_url: &str) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE food_types
            SET image_url = $1, updated_at = NOW()
            WHERE id = $2 AND (image_url IS NULL OR image_url = '')
            "#,
        )
        .bind(image_url)
        .bind(id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let in_use = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM menu_foods WHERE food_type_id = $1",
        )
        .bind(id)
        .fetch_one(&self.db)
        .await?;

        if in_use > 0 {
            return Err(AppError::Conflict {
                resource: "food_type".to_string(),
                message: format!("Cannot delete food type: used by {} menu entries", in_use),
                message_id: format!(
                    "Jenis makanan tidak dapat dihapus: dipakai oleh {} menu",
                    in_use
                ),
            });
        }

        let result = sqlx::query("DELETE FROM food_types WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Food type".to_string()));
        }

        Ok(())
    }

    async fn ensure_unique_name(&self, name: &str, exclude: Option<Uuid>) -> AppResult<()> {
        let duplicate = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM food_types WHERE LOWER(name) = LOWER($1) AND ($2::uuid IS NULL OR id != $2)",
        )
        .bind(name.trim())
        .bind(exclude)
        .fetch_one(&self.db)
        .await?;

        if duplicate > 0 {
            return Err(AppError::Conflict {
                resource: "food_type".to_string(),
                message: "A food type with this name already exists".to_string(),
                message_id: "Jenis makanan dengan nama ini sudah ada".to_string(),
            });
        }
        Ok(())
    }
}
