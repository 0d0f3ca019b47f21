use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use tracing::{info, instrument};

use super::{
    models::RatingColumn,
    types::{
        LeaderboardQuery, LeaderboardResponse, PlayerRankResponse, RankQuery, RatingSeriesQuery,
        RatingSeriesResponse,
    },
};
use crate::auth::AuthUser;
use crate::shared::{AppError, AppState};

/// GET /players/{auth_id}/rank?discipline=
#[instrument(name = "get_player_rank", skip(state))]
pub async fn get_player_rank(
    State(state): State<AppState>,
    Path(auth_id): Path<String>,
    Query(query): Query<RankQuery>,
) -> Result<Json<PlayerRankResponse>, AppError> {
    let rank = state
        .player_service
        .player_rank(&auth_id, query.discipline)
        .await?;

    info!(auth_id = %auth_id, rank = ?rank.rank, "Rank computed");
    Ok(Json(rank))
}

/// GET /players/me/rating-series?discipline=&range=
///
/// Defaults to the overall rating over the last month.
#[instrument(name = "get_rating_series", skip(state, user))]
pub async fn get_rating_series(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<RatingSeriesQuery>,
) -> Result<Json<RatingSeriesResponse>, AppError> {
    let column = query.discipline.unwrap_or(RatingColumn::Overall);
    let series = state
        .player_service
        .rating_series(&user.auth_id, column, query.range)
        .await?;

    info!(auth_id = %user.auth_id, points = series.points.len(), "Rating series loaded");
    Ok(Json(series))
}

/// GET /leaderboard/{gender}?discipline=&limit=
#[instrument(name = "get_leaderboard", skip(state))]
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Path(gender): Path<String>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let board = state
        .player_service
        .leaderboard(&gender, query.discipline, query.limit)
        .await?;

    info!(gender = %board.gender, count = board.leaders.len(), "Leaderboard served");
    Ok(Json(board))
}
