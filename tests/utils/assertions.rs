use axum::http::StatusCode;
use serde_json::Value;

// ============================================================================
// Response assertions
// ============================================================================

pub struct ResponseAssertion {
    status: StatusCode,
    body: Value,
}

impl ResponseAssertion {
    pub fn new((status, body): (StatusCode, Value)) -> Self {
        Self { status, body }
    }

    pub fn has_status(self, expected: StatusCode) -> Self {
        assert_eq!(
            self.status, expected,
            "unexpected status, body: {}",
            self.body
        );
        self
    }

    pub fn has_error_code(self, code: &str) -> Self {
        assert_eq!(self.body["code"], code, "body: {}", self.body);
        self
    }

    pub fn has_field(self, field: &str, expected: Value) -> Self {
        assert_eq!(self.body[field], expected, "field {} in {}", field, self.body);
        self
    }

    /// Delta reported for one player in a confirmation response
    pub fn player_delta(&self, auth_id: &str) -> i64 {
        self.body["players"]
            .as_array()
            .and_then(|players| players.iter().find(|p| p["auth_id"] == auth_id))
            .and_then(|player| player["delta"].as_i64())
            .unwrap_or_else(|| panic!("no delta for {} in {}", auth_id, self.body))
    }

    pub fn body(&self) -> &Value {
        &self.body
    }
}
