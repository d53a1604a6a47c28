use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};

use salesdash_core::filter::AccessScope;

use crate::config::AuthMode;
use crate::error::AppError;
use crate::state::AppState;

use super::jwt::{decode_jwt, ADMIN_ROLE};

/// Caller identity injected into request extensions after successful auth.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub subject: String,
    pub role: String,
    pub scope: AccessScope,
}

impl AuthContext {
    /// Every caller when `SALESDASH_AUTH=none`.
    pub fn anonymous_admin() -> Self {
        Self {
            subject: "anonymous".to_string(),
            role: ADMIN_ROLE.to_string(),
            scope: AccessScope::unrestricted(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

/// Resolve the caller from a `Bearer` JWT (or grant full access when auth is
/// off) and attach an [`AuthContext`] to the request.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let ctx = match &state.config.auth_mode {
        AuthMode::None => AuthContext::anonymous_admin(),
        AuthMode::Jwt(secret) => {
            let token = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::trim);
            let Some(token) = token else {
                return AppError::Unauthorized.into_response();
            };
            match decode_jwt(token, secret) {
                Ok(claims) => AuthContext {
                    scope: claims.scope(),
                    subject: claims.sub,
                    role: claims.role,
                },
                Err(e) => {
                    tracing::debug!(error = %e, "Rejected bearer token");
                    return AppError::Unauthorized.into_response();
                }
            }
        }
    };
    request.extensions_mut().insert(ctx);
    next.run(request).await
}

/// Reject callers without the admin role. Runs after [`require_auth`].
pub async fn require_admin(request: Request, next: Next) -> Response {
    match request.extensions().get::<AuthContext>() {
        Some(ctx) if ctx.is_admin() => next.run(request).await,
        Some(_) => AppError::Forbidden.into_response(),
        None => AppError::Unauthorized.into_response(),
    }
}
