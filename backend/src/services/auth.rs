//! Authentication service for login, token management and account creation

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared::types::Role;
use shared::User;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::config::{BootstrapConfig, Config};
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
}

/// Input for creating an account (admin only)
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub role: Option<Role>,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub name: String,
    pub email: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn into_auth_user(self) -> AppResult<AuthUser> {
        let user_id = Uuid::parse_str(&self.sub).map_err(|_| AppError::InvalidToken)?;
        Ok(AuthUser {
            user_id,
            name: self.name,
            email: self.email,
            role: self.role,
        })
    }
}

/// Authentication tokens
#[derive(Debug, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: User,
}

/// User info from database
#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub avatar: Option<String>,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            name: row.name,
            email: row.email,
            // Unknown roles get the least privilege
            role: row.role.parse().unwrap_or_default(),
            avatar: row.avatar,
            is_active: row.is_active,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub(crate) const USER_COLUMNS: &str = "id, name, email, password_hash, role, avatar, is_active, \
     last_login_at, created_at, updated_at";

/// Revokes a live refresh token and yields its owner
pub(crate) const REVOKE_REFRESH_TOKEN: &str = r#"
    UPDATE refresh_tokens
    SET revoked_at = NOW()
    WHERE token_hash = $1
      AND revoked_at IS NULL
      AND expires_at > NOW()
    RETURNING user_id
"#;

fn invalid_refresh_token() -> AppError {
    AppError::Unauthorized {
        message: "Invalid or expired refresh token".to_string(),
        message_id: "Refresh token tidak valid atau kedaluwarsa".to_string(),
    }
}

/// Decode and validate an access token
pub fn decode_access_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
            refresh_token_expiry: config.jwt.refresh_token_expiry,
        }
    }

    /// Authenticate user with email and password
    pub async fn login(&self, email: &str, password: &str) -> AppResult<AuthTokens> {
        let user = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER($1)",
            USER_COLUMNS
        ))
        .bind(email.trim())
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AppError::Unauthorized {
                message: "Account is disabled".to_string(),
                message_id: "Akun dinonaktifkan".to_string(),
            });
        }

        let valid = verify(password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

        if !valid {
            tracing::info!(email = %email, "Rejected login attempt");
            return Err(AppError::InvalidCredentials);
        }

        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(user.id)
            .execute(&self.db)
            .await?;

        let user: User = user.into();
        let tokens = self.issue_tokens(user).await?;
        tracing::info!(user_id = %tokens.user.id, "User logged in");

        Ok(tokens)
    }

    /// Rotate a refresh token and issue a new access token
    pub async fn refresh_token(&self, refresh_token: &str) -> AppResult<AuthTokens> {
        let token_hash = hash_token(refresh_token);

        // Only one concurrent caller can revoke a given token
        let user_id = sqlx::query_scalar::<_, Uuid>(REVOKE_REFRESH_TOKEN)
            .bind(&token_hash)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(invalid_refresh_token)?;

        let user = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1 AND is_active = true",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(invalid_refresh_token)?;

        self.issue_tokens(user.into()).await
    }

    /// Create an account
    pub async fn create_user(&self, input: CreateUserInput) -> AppResult<User> {
        input.validate()?;

        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE LOWER(email) = LOWER($1)",
        )
        .bind(&input.email)
        .fetch_one(&self.db)
        .await?;

        if existing > 0 {
            return Err(AppError::Conflict {
                resource: "email".to_string(),
                message: "Email is already registered".to_string(),
                message_id: "Email sudah terdaftar".to_string(),
            });
        }

        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;
        let role = input.role.unwrap_or_default();

        let user = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(input.name.trim())
        .bind(input.email.trim())
        .bind(&password_hash)
        .bind(role.as_str())
        .fetch_one(&self.db)
        .await?;

        tracing::info!(user_id = %user.id, role = %role, "User created");
        Ok(user.into())
    }

    /// Create the configured admin account when it does not exist yet
    pub async fn ensure_bootstrap_admin(&self, bootstrap: &BootstrapConfig) -> AppResult<()> {
        if bootstrap.admin_email.trim().is_empty() {
            return Ok(());
        }

        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE LOWER(email) = LOWER($1)",
        )
        .bind(&bootstrap.admin_email)
        .fetch_one(&self.db)
        .await?;

        if exists > 0 {
            return Ok(());
        }

        self.create_user(CreateUserInput {
            name: bootstrap.admin_name.clone(),
            email: bootstrap.admin_email.clone(),
            password: bootstrap.admin_password.clone(),
            role: Some(Role::Admin),
        })
        .await?;

        tracing::info!(email = %bootstrap.admin_email, "Bootstrap admin account created");
        Ok(())
    }

    async fn issue_tokens(&self, user: User) -> AppResult<AuthTokens> {
        let (access_token, refresh_token) = self.generate_tokens(&user)?;
        self.store_refresh_token(user.id, &refresh_token).await?;

        Ok(AuthTokens {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
            user,
        })
    }

    /// Generate access and refresh tokens
    fn generate_tokens(&self, user: &User) -> AppResult<(String, String)> {
        let now = Utc::now();
        let access_exp = now + Duration::seconds(self.access_token_expiry);

        let access_claims = Claims {
            sub: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            exp: access_exp.timestamp(),
            iat: now.timestamp(),
        };

        let access_token = encode(
            &Header::default(),
            &access_claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

        // Refresh token (opaque random value)
        let refresh_token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());

        Ok((access_token, refresh_token))
    }

    /// Store refresh token in database
    async fn store_refresh_token(&self, user_id: Uuid, token: &str) -> AppResult<()> {
        let token_hash = hash_token(token);
        let expires_at = Utc::now() + Duration::seconds(self.refresh_token_expiry);

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(&token_hash)
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

/// Hash a token for storage (hex SHA-256)
fn hash_token(token: &str) -> String {
    Sha256::digest(token.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(exp_offset: i64) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            sub: Uuid::new_v4().to_string(),
            name: "Admin".to_string(),
            email: "admin@mbg.id".to_string(),
            role: Role::Admin,
            exp: now + exp_offset,
            iat: now,
        }
    }

    fn sign(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_token_round_trip() {
        let original = claims(3600);
        let token = sign(&original, "secret");
        let decoded = decode_access_token(&token, "secret").unwrap();
        assert_eq!(decoded.sub, original.sub);
        assert_eq!(decoded.role, Role::Admin);

        let user = decoded.into_auth_user().unwrap();
        assert!(user.is_admin());
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = sign(&claims(3600), "secret");
        assert!(matches!(
            decode_access_token(&token, "other"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token() {
        let token = sign(&claims(-3600), "secret");
        assert!(matches!(
            decode_access_token(&token, "secret"),
            Err(AppError::TokenExpired)
        ));
    }

    #[test]
    fn test_hash_token_is_hex_sha256() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_refresh_revocation_is_a_single_guarded_update() {
        let sql: String = REVOKE_REFRESH_TOKEN.split_whitespace().collect::<Vec<_>>().join(" ");
        assert!(sql.starts_with("UPDATE refresh_tokens SET revoked_at = NOW()"));
        assert!(sql.contains("AND revoked_at IS NULL"));
        assert!(sql.contains("AND expires_at > NOW()"));
        assert!(sql.ends_with("RETURNING user_id"));
    }

    #[test]
    fn test_create_user_input_validation() {
        let input = CreateUserInput {
            name: "Petugas".to_string(),
            email: "not-an-email".to_string(),
            password: "123".to_string(),
            role: None,
        };
        assert!(input.validate().is_err());
    }
}
