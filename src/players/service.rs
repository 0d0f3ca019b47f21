use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::{
    models::{PlayerModel, RatingColumn},
    repository::PlayerRepository,
    types::{
        LeaderboardEntry, LeaderboardResponse, PlayerRankResponse, RatingPoint,
        RatingSeriesResponse, SeriesRange,
    },
};
use crate::shared::AppError;

const LEADERBOARD_GENDERS: [&str; 3] = ["male", "female", "mixed"];
pub const MAX_LEADERBOARD_SIZE: u32 = 100;

/// Service for rank, leaderboard and rating history queries
pub struct PlayerService {
    repository: Arc<dyn PlayerRepository + Send + Sync>,
}

impl PlayerService {
    pub fn new(repository: Arc<dyn PlayerRepository + Send + Sync>) -> Self {
        Self { repository }
    }

    /// Ordinal rank of a rating: players strictly above it, plus one.
    /// Tied players share the same rank.
    #[instrument(skip(self))]
    pub async fn rank_for_rating(&self, rating: i32, column: RatingColumn) -> Result<u64, AppError> {
        let above = self.repository.count_players_above(column, rating).await?;
        Ok(above + 1)
    }

    #[instrument(skip(self))]
    pub async fn get_player(&self, auth_id: &str) -> Result<PlayerModel, AppError> {
        self.repository
            .get_player(auth_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Player not found: {}", auth_id)))
    }

    #[instrument(skip(self))]
    pub async fn player_rank(
        &self,
        auth_id: &str,
        column: RatingColumn,
    ) -> Result<PlayerRankResponse, AppError> {
        let player = self.get_player(auth_id).await?;
        let rating = player.rating(column);
        let rank = match rating {
            Some(value) => Some(self.rank_for_rating(value, column).await?),
            None => None,
        };

        Ok(PlayerRankResponse {
            auth_id: player.auth_id,
            discipline: column,
            rating,
            rank,
        })
    }

    /// Top players for a gender (`mixed` means everyone)
    #[instrument(skip(self))]
    pub async fn leaderboard(
        &self,
        gender: &str,
        column: RatingColumn,
        limit: Option<u32>,
    ) -> Result<LeaderboardResponse, AppError> {
        let gender = gender.to_lowercase();
        if !LEADERBOARD_GENDERS.contains(&gender.as_str()) {
            return Err(AppError::Validation("Invalid gender".to_string()));
        }

        let limit = limit
            .unwrap_or(MAX_LEADERBOARD_SIZE)
            .clamp(1, MAX_LEADERBOARD_SIZE);
        let filter = (gender != "mixed").then_some(gender.as_str());

        let players = self
            .repository
            .list_top_players(column, filter, limit)
            .await?;

        let mut leaders: Vec<LeaderboardEntry> = Vec::with_capacity(players.len());
        for (index, player) in players.into_iter().enumerate() {
            let Some(rating) = player.rating(column) else {
                continue;
            };
            let rank = match leaders.last() {
                Some(previous) if previous.rating == rating => previous.rank,
                _ => index as u64 + 1,
            };
            leaders.push(LeaderboardEntry {
                rank,
                auth_id: player.auth_id,
                username: player.username,
                gender: player.gender,
                rating,
            });
        }

        debug!(count = leaders.len(), "Leaderboard built");
        Ok(LeaderboardResponse {
            gender,
            discipline: column,
            leaders,
        })
    }

    /// Rating after each confirmed match inside `range`, oldest first
    #[instrument(skip(self))]
    pub async fn rating_series(
        &self,
        auth_id: &str,
        column: RatingColumn,
        range: SeriesRange,
    ) -> Result<RatingSeriesResponse, AppError> {
        let since = range.since(Utc::now());
        let history = self.repository.list_rating_history(auth_id, since).await?;

        let points = history
            .into_iter()
            .filter_map(|row| {
                let rating = match column {
                    RatingColumn::Overall => row.new_overall_elo?,
                    _ if row.discipline == column.to_string() => row.new_elo,
                    _ => return None,
                };
                Some(RatingPoint {
                    match_id: row.match_id,
                    played_at: row.created_at,
                    rating,
                })
            })
            .collect();

        Ok(RatingSeriesResponse {
            auth_id: auth_id.to_string(),
            discipline: column,
            range,
            points,
        })
    }
}
