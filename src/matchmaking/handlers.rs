use axum::{extract::State, Extension, Json};
use tracing::{info, instrument};

use super::types::{SuggestRequest, SuggestionResponse};
use crate::auth::AuthUser;
use crate::shared::{AppError, AppState};

/// HTTP handler for opponent suggestions
///
/// POST /matchmaking/suggest
/// Returns up to five players with the closest rating in the requested mode
#[instrument(name = "suggest_opponents", skip(state, user))]
pub async fn suggest_opponents(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<SuggestRequest>,
) -> Result<Json<SuggestionResponse>, AppError> {
    info!(auth_id = %user.auth_id, mode = ?request.mode, "Suggesting opponents");

    let response = state
        .matchmaking_service
        .suggest(&user.auth_id, request.mode)
        .await?;

    Ok(Json(response))
}
