//! Profile service for the signed-in account

use bcrypt::{hash, DEFAULT_COST};
use serde::Deserialize;
use shared::User;
use sqlx::PgPool;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::auth::{UserRow, USER_COLUMNS};

#[derive(Clone)]
pub struct ProfileService {
    db: PgPool,
}

/// Partial profile update; absent or blank fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileInput {
    #[validate(length(max = 255, message = "Name is too long"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
    pub avatar: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ProfileService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn get(&self, user: &AuthUser) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(user.user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        Ok(row.into())
    }

    pub async fn update(&self, user: &AuthUser, input: UpdateProfileInput) -> AppResult<User> {
        let input = UpdateProfileInput {
            name: present(input.name),
            email: present(input.email),
            password: input.password.filter(|p| !p.is_empty()),
            avatar: present(input.avatar),
        };
        input.validate()?;

        if let Some(email) = &input.email {
            let taken = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM users WHERE LOWER(email) = LOWER($1) AND id <> $2",
            )
            .bind(email)
            .bind(user.user_id)
            .fetch_one(&self.db)
            .await?;

            if taken > 0 {
                return Err(AppError::Conflict {
                    resource: "email".to_string(),
                    message: "Email is already registered".to_string(),
                    message_id: "Email sudah terdaftar".to_string(),
                });
            }
        }

        let password_hash = match &input.password {
            Some(password) => Some(
                hash(password, DEFAULT_COST)
                    .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?,
            ),
            None => None,
        };

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash),
                avatar = COALESCE($5, avatar),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user.user_id)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&password_hash)
        .bind(&input.avatar)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        tracing::info!(
            user_id = %user.user_id,
            password_changed = password_hash.is_some(),
            "Profile updated"
        );
        Ok(row.into())
    }
}
