//! Daily menu service
//!
//! Records what was served on a date. Foods are stored as snapshots with
//! both portion profiles so historical evaluations stay stable.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use shared::nutrition::{
    compute_totals, evaluate, evaluate_items, EvaluationRules, NutrientProfile, NutritionReport,
    PortionNutrition, PortionSize, Threshold,
};
use shared::{
    validate_confidence, validate_portion_nutrition, validate_quantity, DailyMenu, DailyMenuFood,
    UserSummary,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::akg::AkgService;
use crate::services::menu::MenuService;

#[derive(Clone)]
pub struct DailyMenuService {
    db: PgPool,
}

/// Daily menu joined with its owner and linked menu name
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DailyMenuRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub menu_id: Option<Uuid>,
    pub menu_name: Option<String>,
    pub date: DateTime<Utc>,
    pub notes: Option<String>,
    pub original_image_url: Option<String>,
    pub detected_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DailyMenuFoodRow {
    pub id: Uuid,
    pub daily_menu_id: Uuid,
    pub food_name: String,
    pub quantity: f64,
    pub confidence: f64,
    pub tray_class: Option<String>,
    pub food_image_url: Option<String>,
    pub energy: f64,
    pub protein: f64,
    pub fat: f64,
    pub fiber: f64,
    pub carbohydrate: f64,
    pub energy_small: f64,
    pub protein_small: f64,
    pub fat_small: f64,
    pub fiber_small: f64,
    pub carbohydrate_small: f64,
}

impl From<DailyMenuFoodRow> for DailyMenuFood {
    fn from(row: DailyMenuFoodRow) -> Self {
        DailyMenuFood {
            id: row.id,
            food_name: row.food_name,
            quantity: row.quantity,
            confidence: row.confidence,
            tray_class: row.tray_class,
            food_image_url: row.food_image_url,
            nutrition: PortionNutrition::new(
                NutrientProfile::new(row.energy, row.protein, row.fat, row.fiber, row.carbohydrate),
                NutrientProfile::new(
                    row.energy_small,
                    row.protein_small,
                    row.fat_small,
                    row.fiber_small,
                    row.carbohydrate_small,
                ),
            ),
        }
    }
}

impl DailyMenuRow {
    fn into_daily_menu(self, foods: Vec<DailyMenuFood>) -> DailyMenu {
        DailyMenu {
            id: self.id,
            user: UserSummary {
                id: self.user_id,
                name: self.user_name,
                email: self.user_email,
            },
            menu_id: self.menu_id,
            menu_name: self.menu_name,
            date: self.date,
            notes: self.notes,
            original_image_url: self.original_image_url,
            detected_image_url: self.detected_image_url,
            foods,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const DAILY_MENU_SELECT: &str = r#"
    SELECT dm.id, dm.user_id, u.name AS user_name, u.email AS user_email,
           dm.menu_id, m.name AS menu_name, dm.date, dm.notes,
           dm.original_image_url, dm.detected_image_url, dm.created_at, dm.updated_at
    FROM daily_menus dm
    JOIN users u ON u.id = dm.user_id
    LEFT JOIN menus m ON m.id = dm.menu_id
"#;

/// Query filter for listing and export
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DailyMenuFilter {
    /// Calendar day
    pub date: Option<NaiveDate>,
    /// Honored for admins only
    pub user_id: Option<Uuid>,
}

/// One detected or selected food. Missing values default to zero,
/// quantity to 1.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DailyMenuFoodInput {
    pub food_name: String,
    pub quantity: Option<f64>,
    pub confidence: Option<f64>,
    pub tray_class: Option<String>,
    pub food_image_url: Option<String>,
    #[serde(default)]
    pub energy: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub fat: f64,
    #[serde(default)]
    pub fiber: f64,
    #[serde(default)]
    pub carbohydrate: f64,
    #[serde(default)]
    pub energy_small: f64,
    #[serde(default)]
    pub protein_small: f64,
    #[serde(default)]
    pub fat_small: f64,
    #[serde(default)]
    pub fiber_small: f64,
    #[serde(default)]
    pub carbohydrate_small: f64,
}

impl DailyMenuFoodInput {
    fn nutrition(&self) -> PortionNutrition {
        PortionNutrition::new(
            NutrientProfile::new(self.energy, self.protein, self.fat, self.fiber, self.carbohydrate),
            NutrientProfile::new(
                self.energy_small,
                self.protein_small,
                self.fat_small,
                self.fiber_small,
                self.carbohydrate_small,
            ),
        )
    }

    fn from_catalog(name: &str, quantity: f64, image_url: Option<String>, n: &PortionNutrition) -> Self {
        Self {
            food_name: name.to_string(),
            quantity: Some(quantity),
            confidence: None,
            tray_class: None,
            food_image_url: image_url,
            energy: n.large.energy,
            protein: n.large.protein,
            fat: n.large.fat,
            fiber: n.large.fiber,
            carbohydrate: n.large.carbohydrate,
            energy_small: n.small.energy,
            protein_small: n.small.protein,
            fat_small: n.small.fat,
            fiber_small: n.small.fiber,
            carbohydrate_small: n.small.carbohydrate,
        }
    }
}

/// Food line after defaults and validation
struct FoodSnapshot {
    food_name: String,
    quantity: f64,
    confidence: f64,
    tray_class: Option<String>,
    food_image_url: Option<String>,
    nutrition: PortionNutrition,
}

fn snapshot(input: &DailyMenuFoodInput) -> AppResult<FoodSnapshot> {
    let food_name = input.food_name.trim();
    if food_name.is_empty() {
        return Err(AppError::validation(
            "food_name",
            "Food name is required",
            "Nama makanan wajib diisi",
        ));
    }

    let quantity = input.quantity.unwrap_or(1.0);
    validate_quantity(quantity).map_err(|m| AppError::invalid_field("quantity", m))?;
    let confidence = input.confidence.unwrap_or(0.0);
    validate_confidence(confidence).map_err(|m| AppError::invalid_field("confidence", m))?;
    let nutrition = input.nutrition();
    validate_portion_nutrition(&nutrition).map_err(|m| AppError::invalid_field("nutrition", m))?;

    Ok(FoodSnapshot {
        food_name: food_name.to_string(),
        quantity,
        confidence,
        tray_class: input.tray_class.clone().filter(|t| !t.is_empty()),
        food_image_url: input.food_image_url.clone().filter(|u| !u.is_empty()),
        nutrition,
    })
}

#[derive(Debug, Deserialize)]
pub struct CreateDailyMenuInput {
    pub menu_id: Option<Uuid>,
    /// Defaults to now
    pub date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub original_image_url: Option<String>,
    pub detected_image_url: Option<String>,
    /// When omitted and `menu_id` is set, the menu's foods are copied
    pub foods: Option<Vec<DailyMenuFoodInput>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDailyMenuInput {
    /// Absent keeps the stored notes, `null` clears them
    #[serde(default, deserialize_with = "present")]
    pub notes: Option<Option<String>>,
    /// Replaces the food list wholesale when present
    pub foods: Option<Vec<DailyMenuFoodInput>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl UpdateDailyMenuInput {
    fn next_notes(&self, current: Option<String>) -> Option<String> {
        match &self.notes {
            Some(notes) => notes.clone(),
            None => current,
        }
    }
}

/// One CSV export line
#[derive(Debug, Serialize)]
pub struct DailyMenuExportRow {
    pub date: String,
    pub user: String,
    pub menu: String,
    pub foods: String,
    pub energy: f64,
    pub protein: f64,
    pub fat: f64,
    pub fiber: f64,
    pub carbohydrate: f64,
    /// Empty when no AKG record exists
    pub akg_met: String,
}

impl DailyMenuService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Daily menus, newest first. Users only see their own records.
    pub async fn list(&self, user: &AuthUser, filter: &DailyMenuFilter) -> AppResult<Vec<DailyMenu>> {
        let owner = if user.is_admin() {
            filter.user_id.unwrap_or(user.user_id)
        } else {
            user.user_id
        };

        let rows = sqlx::query_as::<_, DailyMenuRow>(&format!(
            r#"{}
            WHERE dm.user_id = $1
              AND ($2::date IS NULL OR (dm.date >= $2::date AND dm.date < $2::date + INTERVAL '1 day'))
            ORDER BY dm.date DESC
            "#,
            DAILY_MENU_SELECT
        ))
        .bind(owner)
        .bind(filter.date)
        .fetch_all(&self.db)
        .await?;

        self.attach_foods(rows).await
    }

    /// Most recent records for the dashboard; all users for admins
    pub async fn recent(&self, user: &AuthUser, limit: i64) -> AppResult<Vec<DailyMenu>> {
        let rows = sqlx::query_as::<_, DailyMenuRow>(&format!(
            r#"{}
            WHERE ($1 OR dm.user_id = $2)
            ORDER BY dm.date DESC
            LIMIT $3
            "#,
            DAILY_MENU_SELECT
        ))
        .bind(user.is_admin())
        .bind(user.user_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        self.attach_foods(rows).await
    }

    pub async fn get(&self, id: Uuid, user: &AuthUser) -> AppResult<DailyMenu> {
        let row = sqlx::query_as::<_, DailyMenuRow>(&format!("{} WHERE dm.id = $1", DAILY_MENU_SELECT))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Daily menu".to_string()))?;

        if !user.can_modify(row.user_id) {
            // Other users' records are invisible, not forbidden
            return Err(AppError::NotFound("Daily menu".to_string()));
        }

        let mut menus = self.attach_foods(vec![row]).await?;
        menus
            .pop()
            .ok_or_else(|| AppError::NotFound("Daily menu".to_string()))
    }

    pub async fn create(&self, user: &AuthUser, input: CreateDailyMenuInput) -> AppResult<DailyMenu> {
        let foods = match (input.foods, input.menu_id) {
            (Some(foods), _) => foods,
            (None, Some(menu_id)) => {
                let menu = MenuService::new(self.db.clone()).get(menu_id).await?;
                menu.foods
                    .iter()
                    .map(|mf| {
                        DailyMenuFoodInput::from_catalog(
                            &mf.food.name,
                            mf.quantity,
                            mf.food.image_url.clone(),
                            &mf.food.nutrition,
                        )
                    })
                    .collect()
            }
            (None, None) => Vec::new(),
        };
        let snapshots = foods.iter().map(snapshot).collect::<AppResult<Vec<_>>>()?;

        if let Some(menu_id) = input.menu_id {
            let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM menus WHERE id = $1")
                .bind(menu_id)
                .fetch_one(&self.db)
                .await?;
            if exists == 0 {
                return Err(AppError::NotFound("Menu".to_string()));
            }
        }

        let mut tx = self.db.begin().await?;

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO daily_menus (user_id, menu_id, date, notes, original_image_url, detected_image_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(user.user_id)
        .bind(input.menu_id)
        .bind(input.date.unwrap_or_else(Utc::now))
        .bind(&input.notes)
        .bind(&input.original_image_url)
        .bind(&input.detected_image_url)
        .fetch_one(&mut *tx)
        .await?;

        insert_foods(&mut tx, id, &snapshots).await?;
        tx.commit().await?;

        tracing::info!(
            daily_menu_id = %id,
            user_id = %user.user_id,
            foods = snapshots.len(),
            "Daily menu recorded"
        );
        self.get(id, user).await
    }

    pub async fn update(
        &self,
        id: Uuid,
        user: &AuthUser,
        input: UpdateDailyMenuInput,
    ) -> AppResult<DailyMenu> {
        let existing = self.get(id, user).await?;

        let snapshots = match input.foods {
            Some(ref foods) => Some(foods.iter().map(snapshot).collect::<AppResult<Vec<_>>>()?),
            None => None,
        };

        let mut tx = self.db.begin().await?;

        sqlx::query("UPDATE daily_menus SET notes = $1, updated_at = NOW() WHERE id = $2")
            .bind(input.next_notes(existing.notes))
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if let Some(ref snapshots) = snapshots {
            sqlx::query("DELETE FROM daily_menu_foods WHERE daily_menu_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_foods(&mut tx, id, snapshots).await?;
        }

        tx.commit().await?;

        self.get(id, user).await
    }

    pub async fn delete(&self, id: Uuid, user: &AuthUser) -> AppResult<()> {
        let owner = sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM daily_menus WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Daily menu".to_string()))?;

        if !user.can_modify(owner) {
            return Err(AppError::InsufficientPermissions);
        }

        sqlx::query("DELETE FROM daily_menus WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        tracing::info!(daily_menu_id = %id, user_id = %user.user_id, "Daily menu deleted");
        Ok(())
    }

    /// Totals and AKG verdict from the stored snapshots
    pub async fn evaluate(
        &self,
        id: Uuid,
        user: &AuthUser,
        portion: PortionSize,
        threshold_id: Option<Uuid>,
        rules: &EvaluationRules,
    ) -> AppResult<NutritionReport> {
        let daily = self.get(id, user).await?;
        let akg = AkgService::new(self.db.clone()).resolve(threshold_id).await?;

        Ok(evaluate_items(
            &daily.food_items(),
            portion,
            akg.as_ref().map(|a| &a.threshold),
            rules,
        ))
    }

    /// CSV with large-portion totals and the verdict against the default AKG
    pub async fn export_csv(
        &self,
        user: &AuthUser,
        filter: &DailyMenuFilter,
        rules: &EvaluationRules,
    ) -> AppResult<String> {
        let menus = self.list(user, filter).await?;
        let akg = AkgService::new(self.db.clone()).resolve(None).await?;
        let rows = export_rows(&menus, akg.as_ref().map(|a| &a.threshold), rules);

        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in &rows {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;

        String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }

    async fn attach_foods(&self, rows: Vec<DailyMenuRow>) -> AppResult<Vec<DailyMenu>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let food_rows = sqlx::query_as::<_, DailyMenuFoodRow>(
            r#"
            SELECT id, daily_menu_id, food_name, quantity, confidence, tray_class, food_image_url,
                   energy, protein, fat, fiber, carbohydrate,
                   energy_small, protein_small, fat_small, fiber_small, carbohydrate_small
            FROM daily_menu_foods
            WHERE daily_menu_id = ANY($1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<DailyMenuFood>> = HashMap::new();
        for row in food_rows {
            grouped.entry(row.daily_menu_id).or_default().push(row.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let foods = grouped.remove(&row.id).unwrap_or_default();
                row.into_daily_menu(foods)
            })
            .collect())
    }
}

async fn insert_foods(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    daily_menu_id: Uuid,
    foods: &[FoodSnapshot],
) -> AppResult<()> {
    for food in foods {
        let (l, s) = (&food.nutrition.large, &food.nutrition.small);
        sqlx::query(
            r#"
            INSERT INTO daily_menu_foods (daily_menu_id, food_name, quantity, confidence, tray_class,
                food_image_url, energy, protein, fat, fiber, carbohydrate,
                energy_small, protein_small, fat_small, fiber_small, carbohydrate_small)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(daily_menu_id)
        .bind(&food.food_name)
        .bind(food.quantity)
        .bind(food.confidence)
        .bind(&food.tray_class)
        .bind(&food.food_image_url)
        .bind(l.energy)
        .bind(l.protein)
        .bind(l.fat)
        .bind(l.fiber)
        .bind(l.carbohydrate)
        .bind(s.energy)
        .bind(s.protein)
        .bind(s.fat)
        .bind(s.fiber)
        .bind(s.carbohydrate)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

fn export_rows(
    menus: &[DailyMenu],
    threshold: Option<&Threshold>,
    rules: &EvaluationRules,
) -> Vec<DailyMenuExportRow> {
    menus
        .iter()
        .map(|dm| {
            let totals = compute_totals(&dm.food_items(), PortionSize::Large);
            let verdict = evaluate(&totals, threshold, rules);
            DailyMenuExportRow {
                date: dm.date.format("%Y-%m-%d").to_string(),
                user: dm.user.name.clone(),
                menu: dm.menu_name.clone().unwrap_or_default(),
                foods: dm
                    .foods
                    .iter()
                    .map(|f| f.food_name.as_str())
                    .collect::<Vec<_>>()
                    .join("; "),
                energy: totals.energy,
                protein: totals.protein,
                fat: totals.fat,
                fiber: totals.fiber,
                carbohydrate: totals.carbohydrate,
                akg_met: verdict
                    .map(|v| if v.overall_met { "yes" } else { "no" }.to_string())
                    .unwrap_or_default(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn daily_menu(foods: Vec<DailyMenuFood>) -> DailyMenu {
        DailyMenu {
            id: Uuid::new_v4(),
            user: UserSummary {
                id: Uuid::new_v4(),
                name: "Petugas SD 1".to_string(),
                email: "sd1@mbg.id".to_string(),
            },
            menu_id: None,
            menu_name: None,
            date: Utc::now(),
            notes: None,
            original_image_url: None,
            detected_image_url: None,
            foods,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn food(name: &str, large: NutrientProfile) -> DailyMenuFood {
        DailyMenuFood {
            id: Uuid::new_v4(),
            food_name: name.to_string(),
            quantity: 1.0,
            confidence: 0.9,
            tray_class: None,
            food_image_url: None,
            nutrition: PortionNutrition::new(large, NutrientProfile::default()),
        }
    }

    #[test]
    fn test_snapshot_defaults() {
        let input = DailyMenuFoodInput {
            food_name: " Nasi ".to_string(),
            energy: 175.0,
            ..Default::default()
        };
        let snap = snapshot(&input).unwrap();
        assert_eq!(snap.food_name, "Nasi");
        assert_eq!(snap.quantity, 1.0);
        assert_eq!(snap.confidence, 0.0);
        assert_eq!(snap.nutrition.small, NutrientProfile::default());
    }

    #[test]
    fn test_snapshot_rejects_bad_values() {
        let negative = DailyMenuFoodInput {
            food_name: "Nasi".to_string(),
            fat: -1.0,
            ..Default::default()
        };
        assert!(snapshot(&negative).is_err());

        let zero_quantity = DailyMenuFoodInput {
            food_name: "Nasi".to_string(),
            quantity: Some(0.0),
            ..Default::default()
        };
        assert!(snapshot(&zero_quantity).is_err());

        let unnamed = DailyMenuFoodInput::default();
        assert!(snapshot(&unnamed).is_err());
    }

    #[test]
    fn test_update_notes_keep_set_or_clear() {
        let current = Some("Sayur kurang".to_string());

        let absent: UpdateDailyMenuInput = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.next_notes(current.clone()), current);

        let cleared: UpdateDailyMenuInput = serde_json::from_str(r#"{"notes": null}"#).unwrap();
        assert_eq!(cleared.next_notes(current.clone()), None);

        let replaced: UpdateDailyMenuInput =
            serde_json::from_str(r#"{"notes": "Habis semua"}"#).unwrap();
        assert_eq!(
            replaced.next_notes(current),
            Some("Habis semua".to_string())
        );
    }

    #[test]
    fn test_export_rows() {
        let menus = vec![daily_menu(vec![
            food("Nasi", NutrientProfile::new(175.0, 3.0, 0.3, 0.4, 40.0)),
            food("Ayam Goreng", NutrientProfile::new(260.0, 27.0, 14.0, 0.0, 8.0)),
        ])];
        let threshold = Threshold::new(700.0, 20.0, 20.0, 8.0, 100.0);

        let rows = export_rows(&menus, Some(&threshold), &EvaluationRules::default());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].foods, "Nasi; Ayam Goreng");
        assert!((rows[0].energy - 435.0).abs() < 1e-9);
        assert_eq!(rows[0].akg_met, "no");

        let rows = export_rows(&menus, None, &EvaluationRules::default());
        assert_eq!(rows[0].akg_met, "");
    }
}
