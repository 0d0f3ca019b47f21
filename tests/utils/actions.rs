use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`

use super::setup::TestSetup;

// ============================================================================
// Request helpers, one per endpoint used by the lifecycle tests
// ============================================================================

impl TestSetup {
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        caller: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(auth_id) = caller {
            builder = builder.header("Authorization", self.bearer(auth_id));
        }
        let body = body.map(|value| value.to_string()).unwrap_or_default();
        let request = builder.body(Body::from(body)).unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    pub async fn send_create_match(
        &self,
        caller: &str,
        match_type: &str,
        team_a: &[&str],
        team_b: &[&str],
        score: &str,
    ) -> (StatusCode, Value) {
        let body = json!({
            "match_type": match_type,
            "players_team_A": team_a,
            "players_team_B": team_b,
            "score": score,
        });
        self.request("POST", "/matches", Some(caller), Some(body)).await
    }

    /// Creates a match and returns its ID, panicking if creation fails
    pub async fn create_match_id(
        &self,
        caller: &str,
        match_type: &str,
        team_a: &[&str],
        team_b: &[&str],
        score: &str,
    ) -> String {
        let (status, body) = self
            .send_create_match(caller, match_type, team_a, team_b, score)
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
        body["match_id"].as_str().unwrap().to_string()
    }

    pub async fn send_confirm(&self, caller: &str, match_id: &str) -> (StatusCode, Value) {
        let uri = format!("/matches/{}/confirm", match_id);
        self.request("POST", &uri, Some(caller), None).await
    }

    pub async fn send_reject(&self, caller: &str, match_id: &str) -> (StatusCode, Value) {
        let uri = format!("/matches/{}/reject", match_id);
        self.request("POST", &uri, Some(caller), None).await
    }

    pub async fn send_cancel(
        &self,
        caller: &str,
        match_id: &str,
        reason: Option<&str>,
    ) -> (StatusCode, Value) {
        let uri = format!("/matches/{}/cancel", match_id);
        self.request("POST", &uri, Some(caller), Some(json!({ "reason": reason })))
            .await
    }

    pub async fn send_submit_score(
        &self,
        caller: &str,
        match_id: &str,
        score: &str,
    ) -> (StatusCode, Value) {
        let uri = format!("/matches/{}/submit-score", match_id);
        self.request("POST", &uri, Some(caller), Some(json!({ "score": score })))
            .await
    }

    pub async fn send_video(&self, caller: &str, match_id: &str, link: &str) -> (StatusCode, Value) {
        let uri = format!("/matches/{}/video", match_id);
        self.request("POST", &uri, Some(caller), Some(json!({ "video_link": link })))
            .await
    }

    pub async fn get_match(&self, caller: &str, match_id: &str) -> (StatusCode, Value) {
        let uri = format!("/matches/{}", match_id);
        self.request("GET", &uri, Some(caller), None).await
    }

    pub async fn get_rank(&self, auth_id: &str, discipline: &str) -> (StatusCode, Value) {
        let uri = format!("/players/{}/rank?discipline={}", auth_id, discipline);
        self.request("GET", &uri, None, None).await
    }
}
