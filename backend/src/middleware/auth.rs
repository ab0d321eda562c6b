//! Authentication middleware
//!
//! JWT authentication and role checks

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared::types::Role;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::auth::decode_access_token;
use crate::AppState;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Fail with 403 unless the user is an admin
    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::InsufficientPermissions)
        }
    }

    /// Owners and admins may change a record
    pub fn can_modify(&self, owner_id: Uuid) -> bool {
        self.is_admin() || self.user_id == owner_id
    }
}

/// Authentication middleware that validates JWT tokens from the
/// Authorization header and stores the `AuthUser` in request extensions
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) if !token.trim().is_empty() => token.trim(),
        _ => {
            return AppError::Unauthorized {
                message: "Missing or invalid Authorization header".to_string(),
                message_id: "Header Authorization tidak ada atau tidak valid".to_string(),
            }
            .into_response();
        }
    };

    let claims = match decode_access_token(token, &state.config.jwt.secret) {
        Ok(claims) => claims,
        Err(e) => return e.into_response(),
    };

    let auth_user = match claims.into_auth_user() {
        Ok(user) => user,
        Err(e) => return e.into_response(),
    };

    tracing::debug!(user_id = %auth_user.user_id, role = %auth_user.role, "Authenticated request");
    request.extensions_mut().insert(auth_user);

    next.run(request).await
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized {
                message: "Authentication required".to_string(),
                message_id: "Silakan masuk terlebih dahulu".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            name: "Petugas".to_string(),
            email: "petugas@mbg.id".to_string(),
            role,
        }
    }

    #[test]
    fn test_require_admin() {
        assert!(user(Role::Admin).require_admin().is_ok());
        assert!(matches!(
            user(Role::User).require_admin(),
            Err(AppError::InsufficientPermissions)
        ));
    }

    #[test]
    fn test_can_modify_own_records_only() {
        let staff = user(Role::User);
        assert!(staff.can_modify(staff.user_id));
        assert!(!staff.can_modify(Uuid::new_v4()));
        assert!(user(Role::Admin).can_modify(Uuid::new_v4()));
    }
}
