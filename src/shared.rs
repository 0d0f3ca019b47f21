use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::auth::TokenConfig;
use crate::matches::MatchService;
use crate::matchmaking::MatchmakingService;
use crate::players::PlayerService;
use crate::scoring::ScoreError;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub match_service: Arc<MatchService>,
    pub player_service: Arc<PlayerService>,
    pub matchmaking_service: Arc<MatchmakingService>,
    pub token_config: TokenConfig,
}

impl AppState {
    pub fn new(
        match_service: Arc<MatchService>,
        player_service: Arc<PlayerService>,
        matchmaking_service: Arc<MatchmakingService>,
        token_config: TokenConfig,
    ) -> Self {
        Self {
            match_service,
            player_service,
            matchmaking_service,
            token_config,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal server error")]
    Internal,
}

impl AppError {
    /// HTTP status hint for callers
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::DatabaseError(_) | AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-stable error code
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::Internal => "INTERNAL_ERROR",
        }
    }
}

impl From<ScoreError> for AppError {
    fn from(error: ScoreError) -> Self {
        AppError::Validation(error.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let error_message = match self {
            AppError::Validation(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => msg,
            AppError::DatabaseError(msg) => format!("Database error: {}", msg),
            AppError::Internal => "Internal server error".to_string(),
        };

        let body = Json(json!({
            "error": error_message,
            "code": code,
        }));

        (status, body).into_response()
    }
}


#[cfg(test)]
pub mod test_utils {
    use super::*;
    use crate::matches::InMemoryMatchRepository;
    use crate::players::{InMemoryPlayerRepository, PlayerModel};
    use crate::rating::{EloFormulaFactory, FormulaVersion};

    pub const TEST_SECRET: &str = "test-secret";

    /// Builder for creating AppState backed by in-memory repositories
    pub struct AppStateBuilder {
        players: Vec<PlayerModel>,
        formula_version: FormulaVersion,
    }

    impl AppStateBuilder {
        pub fn new() -> Self {
            Self {
                players: Vec::new(),
                formula_version: FormulaVersion::V2,
            }
        }

        pub fn with_player(mut self, player: PlayerModel) -> Self {
            self.players.push(player);
            self
        }

        pub fn with_players(mut self, auth_ids: &[&str]) -> Self {
            for auth_id in auth_ids {
                self.players.push(PlayerModel::new(*auth_id, *auth_id));
            }
            self
        }

        pub fn with_formula_version(mut self, version: FormulaVersion) -> Self {
            self.formula_version = version;
            self
        }

        pub fn build(self) -> AppState {
            let players = Arc::new(InMemoryPlayerRepository::with_players(self.players));
            let matches = Arc::new(InMemoryMatchRepository::new(players.clone()));
            let formula = EloFormulaFactory::create_formula(self.formula_version);

            AppState {
                match_service: Arc::new(MatchService::new(
                    matches,
                    players.clone(),
                    formula,
                    crate::config::DEFAULT_K_FACTOR,
                )),
                player_service: Arc::new(PlayerService::new(players.clone())),
                matchmaking_service: Arc::new(MatchmakingService::new(players)),
                token_config: TokenConfig::new(TEST_SECRET),
            }
        }
    }

    impl Default for AppStateBuilder {
        fn default() -> Self {
            Self::new()
        }
    }

    /// Authorization header value for `auth_id` signed with the test secret
    pub fn bearer(auth_id: &str) -> String {
        let token = TokenConfig::new(TEST_SECRET)
            .create_token(auth_id, chrono::Duration::hours(1))
            .unwrap();
        format!("Bearer {}", token)
    }
}
