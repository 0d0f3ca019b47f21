use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, instrument, warn};

use super::types::AuthUser;
use crate::shared::{AppError, AppState};

/// Identity middleware - validates the Authorization Bearer header and adds AuthUser to the request.
/// Usage: .layer(middleware::from_fn_with_state(app_state.clone(), auth::require_auth))
/// Handlers can then extract Extension(user): Extension<AuthUser>.
#[instrument(skip(state, req, next))]
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| {
            warn!(uri = %req.uri(), "Missing Authorization header in request");
            AppError::Unauthorized("Missing auth token".to_string())
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        warn!("Invalid Authorization header format (expected Bearer token)");
        AppError::Unauthorized("Invalid authorization header format".to_string())
    })?;

    let claims = state.token_config.validate_token(token)?;
    debug!(auth_id = %claims.sub, "Caller authenticated");

    req.extensions_mut().insert(AuthUser {
        auth_id: claims.sub,
    });

    Ok(next.run(req).await)
}
