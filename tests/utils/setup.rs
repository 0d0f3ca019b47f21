use axum::Router;
use std::sync::Arc;

use ladder::{
    auth::TokenConfig,
    config::DEFAULT_K_FACTOR,
    create_router,
    matches::{InMemoryMatchRepository, MatchService},
    matchmaking::MatchmakingService,
    players::{InMemoryPlayerRepository, PlayerModel, PlayerService},
    AppState, EloFormulaFactory, FormulaVersion,
};

const TEST_SECRET: &str = "integration-secret";

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub router: Router,
    pub players: Arc<InMemoryPlayerRepository>,
    tokens: TokenConfig,
}

impl TestSetup {
    /// Authorization header value for a player
    pub fn bearer(&self, auth_id: &str) -> String {
        let token = self
            .tokens
            .create_token(auth_id, chrono::Duration::hours(1))
            .expect("token should encode");
        format!("Bearer {}", token)
    }
}

pub struct TestSetupBuilder {
    players: Vec<PlayerModel>,
    formula_version: FormulaVersion,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            players: vec![],
            formula_version: FormulaVersion::V2,
        }
    }

    pub fn with_player(mut self, auth_id: &str, singles: i32, doubles: i32) -> Self {
        self.players.push(
            PlayerModel::new(auth_id, auth_id)
                .with_gender("female")
                .with_ratings(singles, doubles),
        );
        self
    }

    pub fn with_two_players(self) -> Self {
        self.with_player("alice", 1000, 1000)
            .with_player("bob", 1000, 1000)
    }

    pub fn with_four_players(self) -> Self {
        self.with_player("alice", 1000, 1100)
            .with_player("bob", 1000, 1000)
            .with_player("charlie", 1000, 1000)
            .with_player("david", 1000, 1050)
    }

    pub fn with_formula_version(mut self, version: FormulaVersion) -> Self {
        self.formula_version = version;
        self
    }

    pub fn build(self) -> TestSetup {
        let players = Arc::new(InMemoryPlayerRepository::with_players(self.players));
        let matches = Arc::new(InMemoryMatchRepository::new(players.clone()));
        let formula = EloFormulaFactory::create_formula(self.formula_version);
        let tokens = TokenConfig::new(TEST_SECRET);

        let state = AppState::new(
            Arc::new(MatchService::new(matches, players.clone(), formula, DEFAULT_K_FACTOR)),
            Arc::new(PlayerService::new(players.clone())),
            Arc::new(MatchmakingService::new(players.clone())),
            tokens.clone(),
        );

        TestSetup {
            router: create_router(state),
            players,
            tokens,
        }
    }
}
