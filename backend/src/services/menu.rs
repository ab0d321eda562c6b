//! Menu template service
//!
//! Menus are reusable sets of catalog foods. Their large-portion totals are
//! stored and recomputed from the catalog on every write.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::nutrition::{
    compute_totals, evaluate_items, EvaluationRules, FoodItem, NutrientTotals, NutritionReport,
    PortionSize,
};
use shared::{validate_name, validate_quantity, FoodType, Menu, MenuFood};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::akg::AkgService;
use crate::services::daily_menu::DailyMenuService;
use crate::services::food_type::{FoodTypeRow, FoodTypeService, FOOD_TYPE_COLUMNS};

#[derive(Clone)]
pub struct MenuService {
    db: PgPool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MenuRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub detected_image_url: Option<String>,
    pub total_energy: f64,
    pub total_protein: f64,
    pub total_fat: f64,
    pub total_fiber: f64,
    pub total_carbohydrate: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Menu food joined with its catalog row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MenuFoodRow {
    pub menu_food_id: Uuid,
    pub menu_id: Uuid,
    pub quantity: f64,
    #[sqlx(flatten)]
    pub food: FoodTypeRow,
}

impl MenuRow {
    fn into_menu(self, foods: Vec<MenuFood>) -> Menu {
        Menu {
            id: self.id,
            name: self.name,
            description: self.description,
            image_url: self.image_url,
            detected_image_url: self.detected_image_url,
            totals: NutrientTotals {
                portion: PortionSize::Large,
                energy: self.total_energy,
                protein: self.total_protein,
                fat: self.total_fat,
                fiber: self.total_fiber,
                carbohydrate: self.total_carbohydrate,
            },
            foods,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const MENU_COLUMNS: &str = "id, name, description, image_url, detected_image_url, \
     total_energy, total_protein, total_fat, total_fiber, total_carbohydrate, \
     created_at, updated_at";

/// One food line of a menu
#[derive(Debug, Clone, Deserialize)]
pub struct MenuFoodInput {
    pub food_id: Uuid,
    /// Defaults to 1
    pub quantity: Option<f64>,
}

/// Catalog image captured while building a menu
#[derive(Debug, Clone, Deserialize)]
pub struct FoodImageInput {
    pub food_id: Uuid,
    pub image_url: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMenuInput {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub detected_image_url: Option<String>,
    #[serde(default)]
    pub foods: Vec<MenuFoodInput>,
    #[serde(default)]
    pub food_images: Vec<FoodImageInput>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMenuInput {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub detected_image_url: Option<String>,
    /// Replaces the food list wholesale when present
    pub foods: Option<Vec<MenuFoodInput>>,
}

/// Optional overrides when promoting a daily menu
#[derive(Debug, Default, Deserialize)]
pub struct PromoteDailyMenuInput {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl MenuService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// All menus, newest first, with their foods
    pub async fn list(&self) -> AppResult<Vec<Menu>> {
        let rows = sqlx::query_as::<_, MenuRow>(&format!(
            "SELECT {} FROM menus ORDER BY created_at DESC",
            MENU_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut foods = self.load_foods(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let menu_foods = foods.remove(&row.id).unwrap_or_default();
                row.into_menu(menu_foods)
            })
            .collect())
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Menu> {
        let row = sqlx::query_as::<_, MenuRow>(&format!(
            "SELECT {} FROM menus WHERE id = $1",
            MENU_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Menu".to_string()))?;

        let mut foods = self.load_foods(&[id]).await?;
        Ok(row.into_menu(foods.remove(&id).unwrap_or_default()))
    }

    pub async fn create(&self, input: CreateMenuInput) -> AppResult<Menu> {
        input.validate()?;
        validate_name(&input.name).map_err(|m| AppError::invalid_field("name", m))?;

        let lines = self.resolve_foods(&input.foods).await?;
        let totals = totals_of(&lines);

        if !input.food_images.is_empty() {
            let catalog = FoodTypeService::new(self.db.clone());
            for image in &input.food_images {
                if image.image_url.trim().is_empty() {
                    continue;
                }
                if catalog.fill_missing_image(image.food_id, &image.image_url).await? {
                    tracing::debug!(food_type_id = %image.food_id, "Catalog image filled from menu");
                }
            }
        }

        let mut tx = self.db.begin().await?;

        let menu_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO menus (name, description, image_url, detected_image_url,
                               total_energy, total_protein, total_fat, total_fiber, total_carbohydrate)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(&input.image_url)
        .bind(&input.detected_image_url)
        .bind(totals.energy)
        .bind(totals.protein)
        .bind(totals.fat)
        .bind(totals.fiber)
        .bind(totals.carbohydrate)
        .fetch_one(&mut *tx)
        .await?;

        for (food, quantity) in &lines {
            sqlx::query("INSERT INTO menu_foods (menu_id, food_type_id, quantity) VALUES ($1, $2, $3)")
                .bind(menu_id)
                .bind(food.id)
                .bind(quantity)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(menu_id = %menu_id, foods = lines.len(), energy = totals.energy, "Menu created");
        self.get(menu_id).await
    }

    pub async fn update(&self, id: Uuid, input: UpdateMenuInput) -> AppResult<Menu> {
        input.validate()?;
        let existing = self.get(id).await?;

        if let Some(ref name) = input.name {
            validate_name(name).map_err(|m| AppError::invalid_field("name", m))?;
        }

        let lines = match input.foods {
            Some(ref foods) => self.resolve_foods(foods).await?,
            None => existing
                .foods
                .iter()
                .map(|mf| (mf.food.clone(), mf.quantity))
                .collect(),
        };
        let totals = totals_of(&lines);

        let name = input
            .name
            .map(|n| n.trim().to_string())
            .unwrap_or(existing.name);
        let description = input.description.or(existing.description);
        let image_url = input.image_url.or(existing.image_url);
        let detected_image_url = input.detected_image_url.or(existing.detected_image_url);

        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            UPDATE menus
            SET name = $1, description = $2, image_url = $3, detected_image_url = $4,
                total_energy = $5, total_protein = $6, total_fat = $7,
                total_fiber = $8, total_carbohydrate = $9, updated_at = NOW()
            WHERE id = $10
            "#,
        )
        .bind(&name)
        .bind(&description)
        .bind(&image_url)
        .bind(&detected_image_url)
        .bind(totals.energy)
        .bind(totals.protein)
        .bind(totals.fat)
        .bind(totals.fiber)
        .bind(totals.carbohydrate)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if input.foods.is_some() {
            sqlx::query("DELETE FROM menu_foods WHERE menu_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            for (food, quantity) in &lines {
                sqlx::query(
                    "INSERT INTO menu_foods (menu_id, food_type_id, quantity) VALUES ($1, $2, $3)",
                )
                .bind(id)
                .bind(food.id)
                .bind(quantity)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        self.get(id).await
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM menus WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Menu".to_string()));
        }

        Ok(())
    }

    /// Build a menu template from a recorded daily menu.
    ///
    /// Daily foods are matched to the catalog by case-insensitive name;
    /// unmatched foods are skipped. Food photos fill empty catalog images.
    pub async fn promote_daily_menu(
        &self,
        daily_menu_id: Uuid,
        user: &AuthUser,
        input: PromoteDailyMenuInput,
    ) -> AppResult<Menu> {
        let daily = DailyMenuService::new(self.db.clone())
            .get(daily_menu_id, user)
            .await?;

        let names: Vec<String> = daily.foods.iter().map(|f| f.food_name.clone()).collect();
        let catalog = FoodTypeService::new(self.db.clone())
            .find_by_names(&names)
            .await?;

        let mut foods = Vec::new();
        let mut food_images = Vec::new();
        for daily_food in &daily.foods {
            match catalog.get(&daily_food.food_name.to_lowercase()) {
                Some(food) => {
                    foods.push(MenuFoodInput {
                        food_id: food.id,
                        quantity: Some(daily_food.quantity),
                    });
                    if let Some(ref url) = daily_food.food_image_url {
                        food_images.push(FoodImageInput {
                            food_id: food.id,
                            image_url: url.clone(),
                        });
                    }
                }
                None => {
                    tracing::debug!(food = %daily_food.food_name, "Daily food has no catalog match, skipped");
                }
            }
        }

        let name = input.name.filter(|n| !n.trim().is_empty()).unwrap_or_else(|| {
            daily
                .menu_name
                .clone()
                .unwrap_or_else(|| default_menu_name(&daily.date))
        });

        self.create(CreateMenuInput {
            name,
            description: input.description.or(daily.notes),
            image_url: daily.original_image_url,
            detected_image_url: daily.detected_image_url,
            foods,
            food_images,
        })
        .await
    }

    /// Totals and AKG verdict for a menu at the requested portion
    pub async fn evaluate(
        &self,
        id: Uuid,
        portion: PortionSize,
        threshold_id: Option<Uuid>,
        rules: &EvaluationRules,
    ) -> AppResult<NutritionReport> {
        let menu = self.get(id).await?;
        let akg = AkgService::new(self.db.clone()).resolve(threshold_id).await?;

        Ok(evaluate_items(
            &menu.food_items(),
            portion,
            akg.as_ref().map(|a| &a.threshold),
            rules,
        ))
    }

    /// Look up catalog rows for menu lines, failing on unknown ids
    async fn resolve_foods(&self, foods: &[MenuFoodInput]) -> AppResult<Vec<(FoodType, f64)>> {
        if foods.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = foods.iter().map(|f| f.food_id).collect();
        let rows = sqlx::query_as::<_, FoodTypeRow>(&format!(
            "SELECT {} FROM food_types WHERE id = ANY($1)",
            FOOD_TYPE_COLUMNS
        ))
        .bind(&ids)
        .fetch_all(&self.db)
        .await?;
        let catalog: HashMap<Uuid, FoodType> = rows
            .into_iter()
            .map(|row| (row.id, FoodType::from(row)))
            .collect();

        foods
            .iter()
            .map(|line| {
                let quantity = line.quantity.unwrap_or(1.0);
                validate_quantity(quantity).map_err(|m| AppError::invalid_field("quantity", m))?;
                let food = catalog.get(&line.food_id).cloned().ok_or_else(|| {
                    AppError::Validation {
                        field: "foods".to_string(),
                        message: format!("Unknown food type {}", line.food_id),
                        message_id: format!("Jenis makanan {} tidak ditemukan", line.food_id),
                    }
                })?;
                Ok((food, quantity))
            })
            .collect()
    }

    async fn load_foods(&self, menu_ids: &[Uuid]) -> AppResult<HashMap<Uuid, Vec<MenuFood>>> {
        let rows = sqlx::query_as::<_, MenuFoodRow>(
            r#"
            SELECT mf.id AS menu_food_id, mf.menu_id, mf.quantity,
                   ft.id, ft.name, ft.image_url,
                   ft.energy_large, ft.protein_large, ft.fat_large, ft.fiber_large, ft.carbohydrate_large,
                   ft.energy_small, ft.protein_small, ft.fat_small, ft.fiber_small, ft.carbohydrate_small,
                   ft.created_at, ft.updated_at
            FROM menu_foods mf
            JOIN food_types ft ON ft.id = mf.food_type_id
            WHERE mf.menu_id = ANY($1)
            ORDER BY mf.created_at ASC
            "#,
        )
        .bind(menu_ids)
        .fetch_all(&self.db)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<MenuFood>> = HashMap::new();
        for row in rows {
            grouped.entry(row.menu_id).or_default().push(MenuFood {
                id: row.menu_food_id,
                quantity: row.quantity,
                food: row.food.into(),
            });
        }
        Ok(grouped)
    }
}

/// Large-portion totals stored on the menu row
fn totals_of(lines: &[(FoodType, f64)]) -> NutrientTotals {
    let items: Vec<FoodItem> = lines
        .iter()
        .map(|(food, quantity)| food.to_food_item(*quantity))
        .collect();
    compute_totals(&items, PortionSize::Large)
}

/// `Menu dd/mm/yyyy`, the name given to menus promoted from unnamed records
fn default_menu_name(date: &DateTime<Utc>) -> String {
    format!("Menu {}", date.format("%d/%m/%Y"))
}
