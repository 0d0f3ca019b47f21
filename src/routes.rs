use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{auth, matches, matchmaking, players, shared::AppState};

/// Builds the HTTP router. Match, rating-series and matchmaking routes sit
/// behind `require_auth`; rank and leaderboard lookups are public.
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/matches", post(matches::create_match))
        .route("/matches/pending", get(matches::list_pending_matches))
        .route("/matches/user/:auth_id", get(matches::list_user_matches))
        .route(
            "/matches/:match_id",
            get(matches::get_match)
                .put(matches::edit_match)
                .delete(matches::delete_match),
        )
        .route(
            "/matches/:match_id/submit-score",
            post(matches::submit_match_score),
        )
        .route("/matches/:match_id/cancel", post(matches::cancel_match))
        .route("/matches/:match_id/confirm", post(matches::confirm_match))
        .route("/matches/:match_id/reject", post(matches::reject_match))
        .route("/matches/:match_id/video", post(matches::update_match_video))
        .route(
            "/players/me/rating-series",
            get(players::get_rating_series),
        )
        .route(
            "/matchmaking/suggest",
            post(matchmaking::suggest_opponents),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    let public = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/players/:auth_id/rank", get(players::get_player_rank))
        .route("/leaderboard/:gender", get(players::get_leaderboard));

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::{bearer, AppStateBuilder};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt; // for `oneshot`

    fn app() -> Router {
        create_router(
            AppStateBuilder::new()
                .with_players(&["alice", "bob"])
                .build(),
        )
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_match_routes_require_identity() {
        let request = Request::builder()
            .uri("/matches/pending")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .uri("/matches/pending")
            .header("Authorization", "Bearer not-a-token")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_authenticated_request_reaches_handler() {
        let request = Request::builder()
            .uri("/matches/pending")
            .header("Authorization", bearer("bob"))
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_rank_is_public() {
        let request = Request::builder()
            .uri("/players/alice/rank?discipline=singles")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
