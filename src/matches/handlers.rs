use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::types::{
    CancelMatchRequest, ConfirmMatchResponse, MatchRequest, MatchResponse, MessageResponse,
    SubmitScoreRequest, VideoLinkRequest,
};
use crate::auth::AuthUser;
use crate::shared::{AppError, AppState};

/// HTTP handler for recording a new match
///
/// POST /matches
/// Returns the pending match with its confirmation list
#[instrument(name = "create_match", skip(state, user, request))]
pub async fn create_match(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<MatchRequest>,
) -> Result<(StatusCode, Json<MatchResponse>), AppError> {
    info!(submitter = %user.auth_id, "Creating match");

    let created = state
        .match_service
        .create_match(request, &user.auth_id)
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /matches/pending
#[instrument(name = "list_pending_matches", skip(state, user))]
pub async fn list_pending_matches(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<MatchResponse>>, AppError> {
    let matches = state
        .match_service
        .list_pending_confirmations(&user.auth_id)
        .await?;

    info!(auth_id = %user.auth_id, count = matches.len(), "Pending confirmations listed");
    Ok(Json(matches))
}

/// GET /matches/user/{auth_id}
#[instrument(name = "list_user_matches", skip(state))]
pub async fn list_user_matches(
    State(state): State<AppState>,
    Path(auth_id): Path<String>,
) -> Result<Json<Vec<MatchResponse>>, AppError> {
    let matches = state.match_service.list_matches_for_user(&auth_id).await?;
    Ok(Json(matches))
}

/// GET /matches/{match_id}
#[instrument(name = "get_match", skip(state))]
pub async fn get_match(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
) -> Result<Json<MatchResponse>, AppError> {
    Ok(Json(state.match_service.get_match(match_id).await?))
}

/// DELETE /matches/{match_id}
#[instrument(name = "delete_match", skip(state, user))]
pub async fn delete_match(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(match_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    let message = state
        .match_service
        .delete_match(match_id, &user.auth_id)
        .await?;
    Ok(Json(message))
}

/// POST /matches/{match_id}/submit-score
#[instrument(name = "submit_match_score", skip(state, user, request))]
pub async fn submit_match_score(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(match_id): Path<Uuid>,
    Json(request): Json<SubmitScoreRequest>,
) -> Result<Json<MatchResponse>, AppError> {
    let updated = state
        .match_service
        .submit_match_score(match_id, &user.auth_id, request)
        .await?;
    Ok(Json(updated))
}

/// PUT /matches/{match_id}
#[instrument(name = "edit_match", skip(state, user, request))]
pub async fn edit_match(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(match_id): Path<Uuid>,
    Json(request): Json<MatchRequest>,
) -> Result<Json<MatchResponse>, AppError> {
    let updated = state
        .match_service
        .edit_pending_match(match_id, &user.auth_id, request)
        .await?;
    Ok(Json(updated))
}

/// POST /matches/{match_id}/cancel
#[instrument(name = "cancel_match", skip(state, user, request))]
pub async fn cancel_match(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(match_id): Path<Uuid>,
    Json(request): Json<CancelMatchRequest>,
) -> Result<Json<MatchResponse>, AppError> {
    let cancelled = state
        .match_service
        .cancel_match(match_id, &user.auth_id, request.reason)
        .await?;
    Ok(Json(cancelled))
}

/// HTTP handler for confirming a match
///
/// POST /matches/{match_id}/confirm
/// Applies rating changes and returns per-player rating and rank movement
#[instrument(name = "confirm_match", skip(state, user))]
pub async fn confirm_match(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(match_id): Path<Uuid>,
) -> Result<Json<ConfirmMatchResponse>, AppError> {
    info!(%match_id, confirmer = %user.auth_id, "Confirming match");

    let result = state
        .match_service
        .confirm_match(match_id, &user.auth_id)
        .await?;
    Ok(Json(result))
}

/// POST /matches/{match_id}/reject
#[instrument(name = "reject_match", skip(state, user))]
pub async fn reject_match(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(match_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    let message = state
        .match_service
        .reject_match(match_id, &user.auth_id)
        .await?;
    Ok(Json(message))
}

/// POST /matches/{match_id}/video
#[instrument(name = "update_match_video", skip(state, user, request))]
pub async fn update_match_video(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(match_id): Path<Uuid>,
    Json(request): Json<VideoLinkRequest>,
) -> Result<Json<MatchResponse>, AppError> {
    let updated = state
        .match_service
        .update_match_video_link(match_id, &user.auth_id, &request.video_link)
        .await?;
    Ok(Json(updated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::AppStateBuilder;
    use axum::{
        body::Body,
        http::Request,
        routing::{get, post},
        Router,
    };
    use tower::ServiceExt; // for `oneshot`

    /// Router with a fixed caller identity in place of the auth middleware
    fn app_as(state: AppState, auth_id: &str) -> Router {
        Router::new()
            .route("/matches", post(create_match))
            .route("/matches/:match_id", get(get_match))
            .route("/matches/:match_id/confirm", post(confirm_match))
            .layer(Extension(AuthUser {
                auth_id: auth_id.to_string(),
            }))
            .with_state(state)
    }

    async fn send(app: Router, method: &str, uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }

    const SINGLES: &str = r#"{
        "match_type": "singles",
        "players_team_A": ["alice"],
        "players_team_B": ["bob"],
        "score": "21-15,21-13"
    }"#;

    #[tokio::test]
    async fn test_create_and_confirm_handlers() {
        let state = AppStateBuilder::new().with_players(&["alice", "bob"]).build();

        let (status, created) = send(app_as(state.clone(), "alice"), "POST", "/matches", SINGLES).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["status"], "pending");
        assert_eq!(created["needs_confirmation_from_list"][0], "bob");

        let match_id = created["match_id"].as_str().unwrap().to_string();
        let confirm_uri = format!("/matches/{}/confirm", match_id);

        let (status, confirmed) = send(app_as(state.clone(), "bob"), "POST", &confirm_uri, "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(confirmed["status"], "confirmed");
        assert_eq!(confirmed["winner_team"], "A");
        assert!(confirmed["elo_change_side_a"].as_i64().unwrap() > 0);

        let (status, again) = send(app_as(state.clone(), "bob"), "POST", &confirm_uri, "").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(again["code"], "CONFLICT");

        let (status, fetched) =
            send(app_as(state, "alice"), "GET", &format!("/matches/{}", match_id), "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["team_B_players"][0], "bob");
        assert_eq!(fetched["status"], "confirmed");
    }

    #[tokio::test]
    async fn test_create_match_handler_rejects_bad_score() {
        let state = AppStateBuilder::new().with_players(&["alice", "bob"]).build();
        let body = SINGLES.replace("21-15,21-13", "21-19,15-21");

        let (status, json) = send(app_as(state, "alice"), "POST", "/matches", &body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Score must produce a winner");
        assert_eq!(json["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_self_confirmation_is_forbidden() {
        let state = AppStateBuilder::new().with_players(&["alice", "bob"]).build();

        let (_, created) = send(app_as(state.clone(), "alice"), "POST", "/matches", SINGLES).await;
        let confirm_uri = format!("/matches/{}/confirm", created["match_id"].as_str().unwrap());

        let (status, json) = send(app_as(state, "alice"), "POST", &confirm_uri, "").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_get_unknown_match() {
        let state = AppStateBuilder::new().build();
        let uri = format!("/matches/{}", Uuid::new_v4());

        let (status, _) = send(app_as(state, "alice"), "GET", &uri, "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
