// Public API - what other modules can use
pub use handlers::{get_leaderboard, get_player_rank, get_rating_series};
pub use models::{PlayerModel, RatingColumn, DEFAULT_RATING};
pub use repository::{InMemoryPlayerRepository, PlayerRepository, PostgresPlayerRepository};
pub use service::PlayerService;

// Internal modules
mod handlers;
pub mod models;
pub mod repository;
mod service;
pub mod types;
