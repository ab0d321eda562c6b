//! AKG threshold service

use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::nutrition::Threshold;
use shared::{validate_name, validate_threshold, Akg};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct AkgService {
    db: PgPool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AkgRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub energy: f64,
    pub protein: f64,
    pub fat: f64,
    pub fiber: f64,
    pub carbohydrate: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AkgRow> for Akg {
    fn from(row: AkgRow) -> Self {
        Akg {
            id: row.id,
            name: row.name,
            description: row.description,
            threshold: Threshold::new(row.energy, row.protein, row.fat, row.fiber, row.carbohydrate),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const AKG_COLUMNS: &str =
    "id, name, description, energy, protein, fat, fiber, carbohydrate, created_at, updated_at";

/// Input for creating an AKG record
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAkgInput {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[serde(flatten)]
    pub threshold: Threshold,
}

/// Input for updating an AKG record
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAkgInput {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub energy: Option<f64>,
    pub protein: Option<f64>,
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
    pub carbohydrate: Option<f64>,
}

impl AkgService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> AppResult<Vec<Akg>> {
        let rows = sqlx::query_as::<_, AkgRow>(&format!(
            "SELECT {} FROM akg_thresholds ORDER BY name ASC",
            AKG_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Akg::from).collect())
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Akg> {
        sqlx::query_as::<_, AkgRow>(&format!(
            "SELECT {} FROM akg_thresholds WHERE id = $1",
            AKG_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .map(Akg::from)
        .ok_or_else(|| AppError::NotFound("AKG".to_string()))
    }

    /// The requested record, or the first one by name when none is given.
    /// `None` only when no record exists at all.
    pub async fn resolve(&self, id: Option<Uuid>) -> AppResult<Option<Akg>> {
        match id {
            Some(id) => self.get(id).await.map(Some),
            None => {
                let row = sqlx::query_as::<_, AkgRow>(&format!(
                    "SELECT {} FROM akg_thresholds ORDER BY name ASC LIMIT 1",
                    AKG_COLUMNS
                ))
                .fetch_optional(&self.db)
                .await?;
                Ok(row.map(Akg::from))
            }
        }
    }

    pub async fn create(&self, input: CreateAkgInput) -> AppResult<Akg> {
        input.validate()?;
        validate_name(&input.name).map_err(|m| AppError::invalid_field("name", m))?;
        validate_threshold(&input.threshold).map_err(|m| AppError::invalid_field("threshold", m))?;

        let t = &input.threshold;
        let row = sqlx::query_as::<_, AkgRow>(&format!(
            r#"
            INSERT INTO akg_thresholds (name, description, energy, protein, fat, fiber, carbohydrate)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            AKG_COLUMNS
        ))
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(t.energy)
        .bind(t.protein)
        .bind(t.fat)
        .bind(t.fiber)
        .bind(t.carbohydrate)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(akg_id = %row.id, name = %row.name, "AKG record created");
        Ok(row.into())
    }

    pub async fn update(&self, id: Uuid, input: UpdateAkgInput) -> AppResult<Akg> {
        input.validate()?;
        let existing = self.get(id).await?;

        if let Some(ref name) = input.name {
            validate_name(name).map_err(|m| AppError::invalid_field("name", m))?;
        }

        let current = existing.threshold;
        let threshold = Threshold::new(
            input.energy.unwrap_or(current.energy),
            input.protein.unwrap_or(current.protein),
            input.fat.unwrap_or(current.fat),
            input.fiber.unwrap_or(current.fiber),
            input.carbohydrate.unwrap_or(current.carbohydrate),
        );
        validate_threshold(&threshold).map_err(|m| AppError::invalid_field("threshold", m))?;

        let name = input
            .name
            .map(|n| n.trim().to_string())
            .unwrap_or(existing.name);
        let description = input.description.or(existing.description);

        let row = sqlx::query_as::<_, AkgRow>(&format!(
            r#"
            UPDATE akg_thresholds
            SET name = $1, description = $2, energy = $3, protein = $4, fat = $5,
                fiber = $6, carbohydrate = $7, updated_at = NOW()
            WHERE id = $8
            RETURNING {}
            "#,
            AKG_COLUMNS
        ))
        .bind(&name)
        .bind(&description)
        .bind(threshold.energy)
        .bind(threshold.protein)
        .bind(threshold.fat)
        .bind(threshold.fiber)
        .bind(threshold.carbohydrate)
        .bind(id)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM akg_thresholds WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("AKG".to_string()));
        }

        Ok(())
    }
}
