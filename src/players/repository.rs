use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::models::{AppliedRating, EloHistoryModel, PlayerModel, RatingColumn};
use crate::{rating::Discipline, shared::AppError};

/// Signed rating change to apply to one player inside a confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingUpdate {
    pub auth_id: String,
    pub delta: i32,
}

/// Trait for player rating repository operations
#[async_trait]
pub trait PlayerRepository {
    /// Inserts the player unless the ID is already known; existing ratings are never touched.
    /// Returns true when a row was added.
    async fn register_player(&self, player: &PlayerModel) -> Result<bool, AppError>;
    async fn get_player(&self, auth_id: &str) -> Result<Option<PlayerModel>, AppError>;
    async fn get_players(&self, auth_ids: &[String]) -> Result<Vec<PlayerModel>, AppError>;

    /// Number of players whose `column` rating is strictly greater than `rating`
    async fn count_players_above(
        &self,
        column: RatingColumn,
        rating: i32,
    ) -> Result<u64, AppError>;

    /// Highest rated players first; players without a value in `column` are skipped
    async fn list_top_players(
        &self,
        column: RatingColumn,
        gender: Option<&str>,
        limit: u32,
    ) -> Result<Vec<PlayerModel>, AppError>;

    /// Players other than `exclude_auth_id` rated within `range` of `target` (any rating when
    /// `None`), closest first with the higher rating winning ties. `limit` applies after ordering.
    async fn find_players_in_range(
        &self,
        column: RatingColumn,
        exclude_auth_id: &str,
        target: i32,
        range: Option<i32>,
        limit: u32,
    ) -> Result<Vec<PlayerModel>, AppError>;

    /// History rows of a player, oldest first
    async fn list_rating_history(
        &self,
        auth_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<EloHistoryModel>, AppError>;
}

#[derive(Debug, Default)]
struct PlayerTables {
    players: HashMap<String, PlayerModel>,
    history: Vec<EloHistoryModel>,
}

/// In-memory implementation of PlayerRepository for development and testing
#[derive(Debug, Default)]
pub struct InMemoryPlayerRepository {
    tables: RwLock<PlayerTables>,
}

impl InMemoryPlayerRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an in-memory repository with pre-populated players
    pub fn with_players(players: Vec<PlayerModel>) -> Self {
        let players = players
            .into_iter()
            .map(|player| (player.auth_id.clone(), player))
            .collect();

        Self {
            tables: RwLock::new(PlayerTables {
                players,
                history: Vec::new(),
            }),
        }
    }

    /// Total number of history rows (useful for asserting no double writes)
    pub async fn history_count(&self) -> usize {
        self.tables.read().await.history.len()
    }

    /// Applies every update and appends history, or changes nothing if any player is missing
    #[instrument(skip(self, updates))]
    pub(crate) async fn apply_rating_updates(
        &self,
        match_id: Uuid,
        discipline: Discipline,
        updates: &[RatingUpdate],
        played_at: DateTime<Utc>,
    ) -> Result<Vec<AppliedRating>, AppError> {
        let mut tables = self.tables.write().await;

        if let Some(missing) = updates
            .iter()
            .find(|update| !tables.players.contains_key(&update.auth_id))
        {
            warn!(auth_id = %missing.auth_id, "Player missing while applying ratings");
            return Err(AppError::NotFound(format!(
                "Player not found: {}",
                missing.auth_id
            )));
        }

        let mut applied = Vec::with_capacity(updates.len());
        for update in updates {
            if let Some(player) = tables.players.get_mut(&update.auth_id) {
                let new_elo = player.discipline_rating(discipline) + update.delta;
                applied.push(player.apply_rating(discipline, new_elo));
            }
        }

        let rows: Vec<EloHistoryModel> = applied
            .iter()
            .map(|rating| EloHistoryModel::from_applied(rating, match_id, discipline, played_at))
            .collect();
        tables.history.extend(rows);

        debug!(%match_id, updated = applied.len(), "Ratings applied in memory");
        Ok(applied)
    }
}

#[async_trait]
impl PlayerRepository for InMemoryPlayerRepository {
    #[instrument(skip(self, player))]
    async fn register_player(&self, player: &PlayerModel) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        if tables.players.contains_key(&player.auth_id) {
            return Ok(false);
        }
        debug!(auth_id = %player.auth_id, "Registering player in memory");
        tables.players.insert(player.auth_id.clone(), player.clone());
        Ok(true)
    }

    #[instrument(skip(self))]
    async fn get_player(&self, auth_id: &str) -> Result<Option<PlayerModel>, AppError> {
        Ok(self.tables.read().await.players.get(auth_id).cloned())
    }

    #[instrument(skip(self))]
    async fn get_players(&self, auth_ids: &[String]) -> Result<Vec<PlayerModel>, AppError> {
        let tables = self.tables.read().await;
        Ok(auth_ids
            .iter()
            .filter_map(|auth_id| tables.players.get(auth_id).cloned())
            .collect())
    }

    #[instrument(skip(self))]
    async fn count_players_above(
        &self,
        column: RatingColumn,
        rating: i32,
    ) -> Result<u64, AppError> {
        let tables = self.tables.read().await;
        let count = tables
            .players
            .values()
            .filter(|player| player.rating(column).is_some_and(|value| value > rating))
            .count();
        Ok(count as u64)
    }

    #[instrument(skip(self))]
    async fn list_top_players(
        &self,
        column: RatingColumn,
        gender: Option<&str>,
        limit: u32,
    ) -> Result<Vec<PlayerModel>, AppError> {
        let tables = self.tables.read().await;
        let mut players: Vec<PlayerModel> = tables
            .players
            .values()
            .filter(|player| player.rating(column).is_some())
            .filter(|player| gender.is_none() || player.gender.as_deref() == gender)
            .cloned()
            .collect();

        players.sort_by(|a, b| {
            b.rating(column)
                .cmp(&a.rating(column))
                .then_with(|| a.auth_id.cmp(&b.auth_id))
        });
        players.truncate(limit as usize);
        Ok(players)
    }

    #[instrument(skip(self))]
    async fn find_players_in_range(
        &self,
        column: RatingColumn,
        exclude_auth_id: &str,
        target: i32,
        range: Option<i32>,
        limit: u32,
    ) -> Result<Vec<PlayerModel>, AppError> {
        let tables = self.tables.read().await;
        let mut players: Vec<(i32, PlayerModel)> = tables
            .players
            .values()
            .filter(|player| player.auth_id != exclude_auth_id)
            .filter_map(|player| {
                let value = player.rating(column)?;
                let within = range.map_or(true, |range| (value - target).abs() <= range);
                within.then(|| (value, player.clone()))
            })
            .collect();

        players.sort_by(|(a, a_player), (b, b_player)| {
            (a - target)
                .abs()
                .cmp(&(b - target).abs())
                .then_with(|| b.cmp(a))
                .then_with(|| a_player.auth_id.cmp(&b_player.auth_id))
        });
        players.truncate(limit as usize);
        Ok(players.into_iter().map(|(_, player)| player).collect())
    }

    #[instrument(skip(self))]
    async fn list_rating_history(
        &self,
        auth_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<EloHistoryModel>, AppError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<EloHistoryModel> = tables
            .history
            .iter()
            .filter(|row| row.auth_id == auth_id)
            .filter(|row| since.map_or(true, |since| row.created_at >= since))
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.created_at);
        Ok(rows)
    }
}

pub(crate) fn map_db_error(error: sqlx::Error) -> AppError {
    warn!(error = %error, "Database operation failed");
    AppError::DatabaseError(error.to_string())
}

const PLAYER_COLUMNS: &str = "auth_id, username, gender, singles_elo, doubles_elo, overall_elo, singles_matches_played, doubles_matches_played";

/// PostgreSQL implementation of player repository
pub struct PostgresPlayerRepository {
    pool: PgPool,
}

impl PostgresPlayerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlayerRepository for PostgresPlayerRepository {
    #[instrument(skip(self, player))]
    async fn register_player(&self, player: &PlayerModel) -> Result<bool, AppError> {
        debug!(auth_id = %player.auth_id, "Registering player in database");

        let inserted = sqlx::query(
            "INSERT INTO players (auth_id, username, gender, singles_elo, doubles_elo, overall_elo, singles_matches_played, doubles_matches_played) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (auth_id) DO NOTHING",
        )
        .bind(&player.auth_id)
        .bind(&player.username)
        .bind(&player.gender)
        .bind(player.singles_elo)
        .bind(player.doubles_elo)
        .bind(player.overall_elo)
        .bind(player.singles_matches_played)
        .bind(player.doubles_matches_played)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?
        .rows_affected();

        Ok(inserted > 0)
    }

    #[instrument(skip(self))]
    async fn get_player(&self, auth_id: &str) -> Result<Option<PlayerModel>, AppError> {
        debug!(auth_id = %auth_id, "Fetching player from database");

        sqlx::query_as::<_, PlayerModel>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE auth_id = $1"
        ))
        .bind(auth_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn get_players(&self, auth_ids: &[String]) -> Result<Vec<PlayerModel>, AppError> {
        sqlx::query_as::<_, PlayerModel>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE auth_id = ANY($1)"
        ))
        .bind(auth_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn count_players_above(
        &self,
        column: RatingColumn,
        rating: i32,
    ) -> Result<u64, AppError> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM players WHERE {} > $1",
            column.column_name()
        ))
        .bind(rating)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(count.max(0) as u64)
    }

    #[instrument(skip(self))]
    async fn list_top_players(
        &self,
        column: RatingColumn,
        gender: Option<&str>,
        limit: u32,
    ) -> Result<Vec<PlayerModel>, AppError> {
        let name = column.column_name();
        sqlx::query_as::<_, PlayerModel>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players \
             WHERE {name} IS NOT NULL AND ($1::text IS NULL OR gender = $1) \
             ORDER BY {name} DESC, auth_id ASC LIMIT $2"
        ))
        .bind(gender)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn find_players_in_range(
        &self,
        column: RatingColumn,
        exclude_auth_id: &str,
        target: i32,
        range: Option<i32>,
        limit: u32,
    ) -> Result<Vec<PlayerModel>, AppError> {
        let name = column.column_name();
        sqlx::query_as::<_, PlayerModel>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players \
             WHERE auth_id <> $1 AND {name} IS NOT NULL \
             AND ($3::int IS NULL OR ABS({name} - $2) <= $3) \
             ORDER BY ABS({name} - $2), {name} DESC, auth_id LIMIT $4"
        ))
        .bind(exclude_auth_id)
        .bind(target)
        .bind(range)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn list_rating_history(
        &self,
        auth_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<EloHistoryModel>, AppError> {
        sqlx::query_as::<_, EloHistoryModel>(
            "SELECT id, auth_id, match_id, discipline, old_elo, new_elo, old_overall_elo, new_overall_elo, created_at \
             FROM elo_history WHERE auth_id = $1 AND ($2::timestamptz IS NULL OR created_at >= $2) \
             ORDER BY created_at ASC",
        )
        .bind(auth_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }
}
