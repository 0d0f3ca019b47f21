// Library crate for the ladder backend
// This file exposes the public API for integration tests

pub mod auth;
pub mod config;
pub mod matches;
pub mod matchmaking;
pub mod players;
pub mod rating;
pub mod routes;
pub mod scoring;
pub mod shared;

// Re-export commonly used types for easier access in tests
pub use config::Settings;
pub use matches::{InMemoryMatchRepository, MatchRepository, MatchService, MatchStatus};
pub use players::{InMemoryPlayerRepository, PlayerModel, PlayerRepository, PlayerService};
pub use rating::{Discipline, EloFormulaFactory, FormulaVersion};
pub use routes::create_router;
pub use scoring::{parse_score, ParsedScore, Team};
pub use shared::{AppError, AppState};
