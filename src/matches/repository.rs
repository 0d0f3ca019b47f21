use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::models::{MatchModel, MatchPlayerModel, MatchStatus, MatchWithPlayers};
use crate::{
    players::{
        models::{AppliedRating, EloHistoryModel},
        repository::{map_db_error, InMemoryPlayerRepository, RatingUpdate},
        PlayerModel,
    },
    rating::Discipline,
    scoring::Team,
    shared::AppError,
};

/// Everything written when a match becomes confirmed
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationRecord {
    pub match_id: Uuid,
    pub discipline: Discipline,
    pub updates: Vec<RatingUpdate>,
    pub elo_change_side_a: i32,
    pub elo_change_side_b: i32,
    pub played_at: DateTime<Utc>,
    pub confirmed_at: DateTime<Utc>,
    /// `submitted_at` of the version the confirmer checked
    pub submitted_at: DateTime<Utc>,
}

/// Result of attempting to apply a confirmation
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyConfirmationResult {
    /// Ratings, history and match status were written together
    Applied(Vec<AppliedRating>),
    /// Another confirmation won the race
    AlreadyConfirmed,
    /// Match left the pending state some other way
    NotPending(MatchStatus),
    /// Score or roster was resubmitted after the confirmer read it
    Resubmitted,
    /// Match no longer exists
    MatchNotFound,
}

/// Trait for match repository operations
#[async_trait]
pub trait MatchRepository {
    async fn create_match(
        &self,
        record: &MatchModel,
        players: &[MatchPlayerModel],
    ) -> Result<(), AppError>;

    async fn get_match(&self, match_id: Uuid) -> Result<Option<MatchWithPlayers>, AppError>;

    /// Matches the player took part in, newest `played_at` first
    async fn list_matches_for_player(
        &self,
        auth_id: &str,
    ) -> Result<Vec<MatchWithPlayers>, AppError>;

    /// Pending matches still waiting on this player's confirmation
    async fn list_pending_for_confirmer(
        &self,
        auth_id: &str,
    ) -> Result<Vec<MatchWithPlayers>, AppError>;

    /// Stores a new score and confirmation list, upserting player rows by (match, player).
    /// Returns false when the match is no longer pending.
    async fn resubmit_score(
        &self,
        record: &MatchModel,
        players: &[MatchPlayerModel],
    ) -> Result<bool, AppError>;

    /// Rewrites a pending match and replaces all of its player rows.
    /// Returns false when the match is no longer pending.
    async fn replace_pending_match(
        &self,
        record: &MatchModel,
        players: &[MatchPlayerModel],
    ) -> Result<bool, AppError>;

    /// Returns false when the match is no longer pending
    async fn cancel_match(
        &self,
        match_id: Uuid,
        cancelled_by: &str,
        reason: Option<&str>,
        cancelled_at: DateTime<Utc>,
    ) -> Result<bool, AppError>;

    /// Returns false unless the match is confirmed
    async fn set_video_link(
        &self,
        match_id: Uuid,
        video_link: &str,
        added_at: DateTime<Utc>,
    ) -> Result<bool, AppError>;

    /// Deletes the match and its player rows if its status is one of `allowed`
    async fn delete_match(&self, match_id: Uuid, allowed: &[MatchStatus])
        -> Result<bool, AppError>;

    /// Atomically applies rating updates, history rows and the `pending -> confirmed`
    /// transition. Either all of it is written or none of it.
    async fn apply_confirmation(
        &self,
        confirmation: &ConfirmationRecord,
    ) -> Result<ApplyConfirmationResult, AppError>;
}

/// In-memory implementation of MatchRepository for development and testing.
///
/// Shares the player repository so a confirmation updates ratings and the
/// match while holding the match table lock.
pub struct InMemoryMatchRepository {
    matches: RwLock<HashMap<Uuid, MatchWithPlayers>>,
    players: Arc<InMemoryPlayerRepository>,
}

impl InMemoryMatchRepository {
    pub fn new(players: Arc<InMemoryPlayerRepository>) -> Self {
        Self {
            matches: RwLock::new(HashMap::new()),
            players,
        }
    }
}

fn newest_first(matches: &mut [MatchWithPlayers]) {
    matches.sort_by(|a, b| b.record.played_at.cmp(&a.record.played_at));
}

#[async_trait]
impl MatchRepository for InMemoryMatchRepository {
    #[instrument(skip(self, record, players))]
    async fn create_match(
        &self,
        record: &MatchModel,
        players: &[MatchPlayerModel],
    ) -> Result<(), AppError> {
        debug!(match_id = %record.match_id, "Creating match in memory");

        let mut matches = self.matches.write().await;
        if matches.contains_key(&record.match_id) {
            return Err(AppError::Conflict("Match already exists".to_string()));
        }
        matches.insert(
            record.match_id,
            MatchWithPlayers {
                record: record.clone(),
                players: players.to_vec(),
            },
        );
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_match(&self, match_id: Uuid) -> Result<Option<MatchWithPlayers>, AppError> {
        Ok(self.matches.read().await.get(&match_id).cloned())
    }

    #[instrument(skip(self))]
    async fn list_matches_for_player(
        &self,
        auth_id: &str,
    ) -> Result<Vec<MatchWithPlayers>, AppError> {
        let mut found: Vec<MatchWithPlayers> = self
            .matches
            .read()
            .await
            .values()
            .filter(|entry| entry.is_participant(auth_id))
            .cloned()
            .collect();
        newest_first(&mut found);
        Ok(found)
    }

    #[instrument(skip(self))]
    async fn list_pending_for_confirmer(
        &self,
        auth_id: &str,
    ) -> Result<Vec<MatchWithPlayers>, AppError> {
        let mut found: Vec<MatchWithPlayers> = self
            .matches
            .read()
            .await
            .values()
            .filter(|entry| entry.record.is_pending() && entry.record.needs_confirmation_from(auth_id))
            .cloned()
            .collect();
        newest_first(&mut found);
        Ok(found)
    }

    #[instrument(skip(self, record, players))]
    async fn resubmit_score(
        &self,
        record: &MatchModel,
        players: &[MatchPlayerModel],
    ) -> Result<bool, AppError> {
        let mut matches = self.matches.write().await;
        let Some(entry) = matches.get_mut(&record.match_id) else {
            return Ok(false);
        };
        if !entry.record.is_pending() {
            return Ok(false);
        }

        entry.record = record.clone();
        for row in players {
            match entry
                .players
                .iter_mut()
                .find(|existing| existing.auth_id == row.auth_id)
            {
                Some(existing) => *existing = row.clone(),
                None => entry.players.push(row.clone()),
            }
        }

        debug!(match_id = %record.match_id, "Score resubmitted in memory");
        Ok(true)
    }

    #[instrument(skip(self, record, players))]
    async fn replace_pending_match(
        &self,
        record: &MatchModel,
        players: &[MatchPlayerModel],
    ) -> Result<bool, AppError> {
        let mut matches = self.matches.write().await;
        match matches.get_mut(&record.match_id) {
            Some(entry) if entry.record.is_pending() => {
                entry.record = record.clone();
                entry.players = players.to_vec();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    #[instrument(skip(self))]
    async fn cancel_match(
        &self,
        match_id: Uuid,
        cancelled_by: &str,
        reason: Option<&str>,
        cancelled_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut matches = self.matches.write().await;
        match matches.get_mut(&match_id) {
            Some(entry) if entry.record.is_pending() => {
                entry.record.status = MatchStatus::Cancelled;
                entry.record.cancelled_by = Some(cancelled_by.to_string());
                entry.record.cancel_reason = reason.map(str::to_string);
                entry.record.cancelled_at = Some(cancelled_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    #[instrument(skip(self))]
    async fn set_video_link(
        &self,
        match_id: Uuid,
        video_link: &str,
        added_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut matches = self.matches.write().await;
        match matches.get_mut(&match_id) {
            Some(entry) if entry.record.status == MatchStatus::Confirmed => {
                entry.record.video_link = Some(video_link.to_string());
                entry.record.video_added_at = Some(added_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    #[instrument(skip(self))]
    async fn delete_match(
        &self,
        match_id: Uuid,
        allowed: &[MatchStatus],
    ) -> Result<bool, AppError> {
        let mut matches = self.matches.write().await;
        let deletable = matches
            .get(&match_id)
            .is_some_and(|entry| allowed.contains(&entry.record.status));

        if deletable {
            matches.remove(&match_id);
            debug!(%match_id, "Match deleted from memory");
        }
        Ok(deletable)
    }

    #[instrument(skip(self, confirmation), fields(match_id = %confirmation.match_id))]
    async fn apply_confirmation(
        &self,
        confirmation: &ConfirmationRecord,
    ) -> Result<ApplyConfirmationResult, AppError> {
        let mut matches = self.matches.write().await;
        let Some(entry) = matches.get_mut(&confirmation.match_id) else {
            return Ok(ApplyConfirmationResult::MatchNotFound);
        };

        match entry.record.status {
            MatchStatus::Pending => {}
            MatchStatus::Confirmed => return Ok(ApplyConfirmationResult::AlreadyConfirmed),
            other => return Ok(ApplyConfirmationResult::NotPending(other)),
        }
        if entry.record.submitted_at != confirmation.submitted_at {
            return Ok(ApplyConfirmationResult::Resubmitted);
        }

        // Ratings first: a failure here leaves the match pending
        let applied = self
            .players
            .apply_rating_updates(
                confirmation.match_id,
                confirmation.discipline,
                &confirmation.updates,
                confirmation.played_at,
            )
            .await?;

        entry.record.status = MatchStatus::Confirmed;
        entry.record.confirmed_at = Some(confirmation.confirmed_at);
        entry.record.elo_change_side_a = Some(confirmation.elo_change_side_a);
        entry.record.elo_change_side_b = Some(confirmation.elo_change_side_b);
        entry.record.needs_confirmation_from_list.clear();

        info!(updated = applied.len(), "Confirmation applied in memory");
        Ok(ApplyConfirmationResult::Applied(applied))
    }
}

const MATCH_COLUMNS: &str = "match_id, match_type, score, status, created_by, submitted_by, \
    needs_confirmation_from_list, played_at, submitted_at, confirmed_at, cancelled_at, \
    cancelled_by, cancel_reason, elo_change_side_a, elo_change_side_b, video_link, video_added_at";

/// Raw matches row; enum columns are stored as text
#[derive(Debug, FromRow)]
struct MatchRow {
    match_id: Uuid,
    match_type: String,
    score: String,
    status: String,
    created_by: String,
    submitted_by: String,
    needs_confirmation_from_list: Vec<String>,
    played_at: DateTime<Utc>,
    submitted_at: DateTime<Utc>,
    confirmed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    cancelled_by: Option<String>,
    cancel_reason: Option<String>,
    elo_change_side_a: Option<i32>,
    elo_change_side_b: Option<i32>,
    video_link: Option<String>,
    video_added_at: Option<DateTime<Utc>>,
}

impl TryFrom<MatchRow> for MatchModel {
    type Error = AppError;

    fn try_from(row: MatchRow) -> Result<Self, Self::Error> {
        let match_type = row.match_type.parse::<Discipline>().map_err(|_| {
            AppError::DatabaseError(format!("Unknown match_type: {}", row.match_type))
        })?;
        let status = row
            .status
            .parse::<MatchStatus>()
            .map_err(|_| AppError::DatabaseError(format!("Unknown status: {}", row.status)))?;

        Ok(MatchModel {
            match_id: row.match_id,
            match_type,
            score: row.score,
            status,
            created_by: row.created_by,
            submitted_by: row.submitted_by,
            needs_confirmation_from_list: row.needs_confirmation_from_list,
            played_at: row.played_at,
            submitted_at: row.submitted_at,
            confirmed_at: row.confirmed_at,
            cancelled_at: row.cancelled_at,
            cancelled_by: row.cancelled_by,
            cancel_reason: row.cancel_reason,
            elo_change_side_a: row.elo_change_side_a,
            elo_change_side_b: row.elo_change_side_b,
            video_link: row.video_link,
            video_added_at: row.video_added_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MatchPlayerRow {
    match_id: Uuid,
    auth_id: String,
    team: String,
    is_winner: bool,
}

impl TryFrom<MatchPlayerRow> for MatchPlayerModel {
    type Error = AppError;

    fn try_from(row: MatchPlayerRow) -> Result<Self, Self::Error> {
        let team = row
            .team
            .parse::<Team>()
            .map_err(|_| AppError::DatabaseError(format!("Unknown team: {}", row.team)))?;
        Ok(MatchPlayerModel {
            match_id: row.match_id,
            auth_id: row.auth_id,
            team,
            is_winner: row.is_winner,
        })
    }
}

/// PostgreSQL implementation of match repository
pub struct PostgresMatchRepository {
    pool: PgPool,
}

impl PostgresMatchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attaches player rows to already-ordered match rows
    async fn with_players(&self, rows: Vec<MatchRow>) -> Result<Vec<MatchWithPlayers>, AppError> {
        let ids: Vec<Uuid> = rows.iter().map(|row| row.match_id).collect();
        let player_rows = sqlx::query_as::<_, MatchPlayerRow>(
            "SELECT match_id, auth_id, team, is_winner FROM match_players \
             WHERE match_id = ANY($1) ORDER BY team, auth_id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        let mut grouped: HashMap<Uuid, Vec<MatchPlayerModel>> = HashMap::new();
        for row in player_rows {
            let player = MatchPlayerModel::try_from(row)?;
            grouped.entry(player.match_id).or_default().push(player);
        }

        rows.into_iter()
            .map(|row| {
                let players = grouped.remove(&row.match_id).unwrap_or_default();
                Ok(MatchWithPlayers {
                    record: MatchModel::try_from(row)?,
                    players,
                })
            })
            .collect()
    }
}

async fn insert_match_players(
    tx: &mut Transaction<'_, Postgres>,
    players: &[MatchPlayerModel],
    upsert: bool,
) -> Result<(), AppError> {
    let statement = if upsert {
        "INSERT INTO match_players (match_id, auth_id, team, is_winner) VALUES ($1, $2, $3, $4) \
         ON CONFLICT (match_id, auth_id) DO UPDATE SET team = EXCLUDED.team, is_winner = EXCLUDED.is_winner"
    } else {
        "INSERT INTO match_players (match_id, auth_id, team, is_winner) VALUES ($1, $2, $3, $4)"
    };

    for player in players {
        sqlx::query(statement)
            .bind(player.match_id)
            .bind(&player.auth_id)
            .bind(player.team.as_ref())
            .bind(player.is_winner)
            .execute(&mut **tx)
            .await
            .map_err(map_db_error)?;
    }
    Ok(())
}

#[async_trait]
impl MatchRepository for PostgresMatchRepository {
    #[instrument(skip(self, record, players))]
    async fn create_match(
        &self,
        record: &MatchModel,
        players: &[MatchPlayerModel],
    ) -> Result<(), AppError> {
        debug!(match_id = %record.match_id, "Creating match in database");

        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        sqlx::query(
            "INSERT INTO matches (match_id, match_type, score, status, created_by, submitted_by, \
             needs_confirmation_from_list, played_at, submitted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(record.match_id)
        .bind(record.match_type.as_ref())
        .bind(&record.score)
        .bind(record.status.as_ref())
        .bind(&record.created_by)
        .bind(&record.submitted_by)
        .bind(&record.needs_confirmation_from_list)
        .bind(record.played_at)
        .bind(record.submitted_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        insert_match_players(&mut tx, players, false).await?;
        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_match(&self, match_id: Uuid) -> Result<Option<MatchWithPlayers>, AppError> {
        let row = sqlx::query_as::<_, MatchRow>(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE match_id = $1"
        ))
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        match row {
            Some(row) => Ok(self.with_players(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn list_matches_for_player(
        &self,
        auth_id: &str,
    ) -> Result<Vec<MatchWithPlayers>, AppError> {
        let rows = sqlx::query_as::<_, MatchRow>(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches \
             WHERE match_id IN (SELECT match_id FROM match_players WHERE auth_id = $1) \
             ORDER BY played_at DESC"
        ))
        .bind(auth_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        self.with_players(rows).await
    }

    #[instrument(skip(self))]
    async fn list_pending_for_confirmer(
        &self,
        auth_id: &str,
    ) -> Result<Vec<MatchWithPlayers>, AppError> {
        let rows = sqlx::query_as::<_, MatchRow>(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches \
             WHERE status = 'pending' AND $1 = ANY(needs_confirmation_from_list) \
             ORDER BY played_at DESC"
        ))
        .bind(auth_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        self.with_players(rows).await
    }

    #[instrument(skip(self, record, players))]
    async fn resubmit_score(
        &self,
        record: &MatchModel,
        players: &[MatchPlayerModel],
    ) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        let updated = sqlx::query(
            "UPDATE matches SET score = $2, submitted_by = $3, needs_confirmation_from_list = $4, \
             submitted_at = $5 WHERE match_id = $1 AND status = 'pending'",
        )
        .bind(record.match_id)
        .bind(&record.score)
        .bind(&record.submitted_by)
        .bind(&record.needs_confirmation_from_list)
        .bind(record.submitted_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?
        .rows_affected();

        if updated == 0 {
            return Ok(false);
        }

        insert_match_players(&mut tx, players, true).await?;
        tx.commit().await.map_err(map_db_error)?;
        Ok(true)
    }

    #[instrument(skip(self, record, players))]
    async fn replace_pending_match(
        &self,
        record: &MatchModel,
        players: &[MatchPlayerModel],
    ) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        let updated = sqlx::query(
            "UPDATE matches SET match_type = $2, score = $3, submitted_by = $4, \
             needs_confirmation_from_list = $5, played_at = $6, submitted_at = $7 \
             WHERE match_id = $1 AND status = 'pending'",
        )
        .bind(record.match_id)
        .bind(record.match_type.as_ref())
        .bind(&record.score)
        .bind(&record.submitted_by)
        .bind(&record.needs_confirmation_from_list)
        .bind(record.played_at)
        .bind(record.submitted_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?
        .rows_affected();

        if updated == 0 {
            return Ok(false);
        }

        sqlx::query("DELETE FROM match_players WHERE match_id = $1")
            .bind(record.match_id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        insert_match_players(&mut tx, players, false).await?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(true)
    }

    #[instrument(skip(self))]
    async fn cancel_match(
        &self,
        match_id: Uuid,
        cancelled_by: &str,
        reason: Option<&str>,
        cancelled_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE matches SET status = 'cancelled', cancelled_by = $2, cancel_reason = $3, \
             cancelled_at = $4 WHERE match_id = $1 AND status = 'pending'",
        )
        .bind(match_id)
        .bind(cancelled_by)
        .bind(reason)
        .bind(cancelled_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn set_video_link(
        &self,
        match_id: Uuid,
        video_link: &str,
        added_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE matches SET video_link = $2, video_added_at = $3 \
             WHERE match_id = $1 AND status = 'confirmed'",
        )
        .bind(match_id)
        .bind(video_link)
        .bind(added_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn delete_match(
        &self,
        match_id: Uuid,
        allowed: &[MatchStatus],
    ) -> Result<bool, AppError> {
        let statuses: Vec<String> = allowed.iter().map(|status| status.to_string()).collect();

        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        sqlx::query(
            "DELETE FROM match_players WHERE match_id IN \
             (SELECT match_id FROM matches WHERE match_id = $1 AND status = ANY($2))",
        )
        .bind(match_id)
        .bind(&statuses)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let deleted = sqlx::query("DELETE FROM matches WHERE match_id = $1 AND status = ANY($2)")
            .bind(match_id)
            .bind(&statuses)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?
            .rows_affected();

        tx.commit().await.map_err(map_db_error)?;
        Ok(deleted > 0)
    }

    #[instrument(skip(self, confirmation), fields(match_id = %confirmation.match_id))]
    async fn apply_confirmation(
        &self,
        confirmation: &ConfirmationRecord,
    ) -> Result<ApplyConfirmationResult, AppError> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        // Row lock serialises racing confirmations and resubmissions on the same match
        let locked: Option<(String, bool)> = sqlx::query_as(
            "SELECT status, submitted_at = $2 FROM matches WHERE match_id = $1 FOR UPDATE",
        )
        .bind(confirmation.match_id)
        .bind(confirmation.submitted_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let (status, unchanged) = match locked {
            None => return Ok(ApplyConfirmationResult::MatchNotFound),
            Some((raw, unchanged)) => {
                let status = raw
                    .parse::<MatchStatus>()
                    .map_err(|_| AppError::DatabaseError(format!("Unknown status: {}", raw)))?;
                (status, unchanged)
            }
        };
        match status {
            MatchStatus::Pending => {}
            MatchStatus::Confirmed => return Ok(ApplyConfirmationResult::AlreadyConfirmed),
            other => return Ok(ApplyConfirmationResult::NotPending(other)),
        }
        if !unchanged {
            return Ok(ApplyConfirmationResult::Resubmitted);
        }

        // Lock players in a stable order so concurrent confirmations cannot deadlock
        let mut updates = confirmation.updates.clone();
        updates.sort_by(|a, b| a.auth_id.cmp(&b.auth_id));

        let mut applied = Vec::with_capacity(updates.len());
        for update in &updates {
            let mut player = sqlx::query_as::<_, PlayerModel>(
                "SELECT auth_id, username, gender, singles_elo, doubles_elo, overall_elo, \
                 singles_matches_played, doubles_matches_played FROM players WHERE auth_id = $1 FOR UPDATE",
            )
            .bind(&update.auth_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| AppError::NotFound(format!("Player not found: {}", update.auth_id)))?;

            let new_elo = player.discipline_rating(confirmation.discipline) + update.delta;
            let rating = player.apply_rating(confirmation.discipline, new_elo);

            sqlx::query(
                "UPDATE players SET singles_elo = $2, doubles_elo = $3, overall_elo = $4, \
                 singles_matches_played = $5, doubles_matches_played = $6 WHERE auth_id = $1",
            )
            .bind(&player.auth_id)
            .bind(player.singles_elo)
            .bind(player.doubles_elo)
            .bind(player.overall_elo)
            .bind(player.singles_matches_played)
            .bind(player.doubles_matches_played)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

            let history = EloHistoryModel::from_applied(
                &rating,
                confirmation.match_id,
                confirmation.discipline,
                confirmation.played_at,
            );
            sqlx::query(
                "INSERT INTO elo_history (id, auth_id, match_id, discipline, old_elo, new_elo, \
                 old_overall_elo, new_overall_elo, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(history.id)
            .bind(&history.auth_id)
            .bind(history.match_id)
            .bind(&history.discipline)
            .bind(history.old_elo)
            .bind(history.new_elo)
            .bind(history.old_overall_elo)
            .bind(history.new_overall_elo)
            .bind(history.created_at)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

            applied.push(rating);
        }

        let confirmed = sqlx::query(
            "UPDATE matches SET status = 'confirmed', confirmed_at = $2, elo_change_side_a = $3, \
             elo_change_side_b = $4, needs_confirmation_from_list = '{}' \
             WHERE match_id = $1 AND status = 'pending'",
        )
        .bind(confirmation.match_id)
        .bind(confirmation.confirmed_at)
        .bind(confirmation.elo_change_side_a)
        .bind(confirmation.elo_change_side_b)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?
        .rows_affected();

        if confirmed == 0 {
            warn!("Match left pending state during confirmation, rolling back");
            tx.rollback().await.map_err(map_db_error)?;
            return Ok(ApplyConfirmationResult::AlreadyConfirmed);
        }

        tx.commit().await.map_err(map_db_error)?;

        // Keep the caller's update order
        applied.sort_by_key(|rating| {
            confirmation
                .updates
                .iter()
                .position(|update| update.auth_id == rating.auth_id)
        });

        info!(updated = applied.len(), "Confirmation committed");
        Ok(ApplyConfirmationResult::Applied(applied))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::players::repository::PlayerRepository;

    mod helpers {
        use super::*;

        pub fn ids(values: &[&str]) -> Vec<String> {
            values.iter().map(|v| v.to_string()).collect()
        }

        pub fn repositories() -> (InMemoryMatchRepository, Arc<InMemoryPlayerRepository>) {
            let players = Arc::new(InMemoryPlayerRepository::with_players(vec![
                PlayerModel::new("a", "alice"),
                PlayerModel::new("b", "bob"),
                PlayerModel::new("c", "carol"),
            ]));
            (InMemoryMatchRepository::new(players.clone()), players)
        }

        pub fn singles(submitter: &str, opponent: &str, played_at: DateTime<Utc>) -> MatchWithPlayers {
            let record = MatchModel::new_pending(
                Discipline::Singles,
                "21-15,21-13".to_string(),
                submitter,
                ids(&[opponent]),
                played_at,
            );
            let players = MatchPlayerModel::rows_for(
                record.match_id,
                &ids(&[submitter]),
                &ids(&[opponent]),
                Some(Team::A),
            );
            MatchWithPlayers { record, players }
        }

        pub fn confirmation(record: &MatchModel, updates: &[(&str, i32)]) -> ConfirmationRecord {
            ConfirmationRecord {
                match_id: record.match_id,
                discipline: Discipline::Singles,
                updates: updates
                    .iter()
                    .map(|(auth_id, delta)| RatingUpdate {
                        auth_id: auth_id.to_string(),
                        delta: *delta,
                    })
                    .collect(),
                elo_change_side_a: 20,
                elo_change_side_b: -20,
                played_at: Utc::now(),
                confirmed_at: Utc::now(),
                submitted_at: record.submitted_at,
            }
        }
    }

    use helpers::*;

    #[tokio::test]
    async fn test_create_and_get_match() {
        let (repo, _) = repositories();
        let created = singles("a", "b", Utc::now());
        repo.create_match(&created.record, &created.players).await.unwrap();

        let loaded = repo.get_match(created.record.match_id).await.unwrap().unwrap();
        assert_eq!(loaded, created);
        assert!(repo.get_match(Uuid::new_v4()).await.unwrap().is_none());

        let duplicate = repo.create_match(&created.record, &created.players).await;
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_list_matches_newest_first() {
        let (repo, _) = repositories();
        let older = singles("a", "b", Utc::now() - Duration::days(2));
        let newer = singles("c", "a", Utc::now());
        let unrelated = singles("b", "c", Utc::now());
        for entry in [&older, &newer, &unrelated] {
            repo.create_match(&entry.record, &entry.players).await.unwrap();
        }

        let listed = repo.list_matches_for_player("a").await.unwrap();
        let ids: Vec<Uuid> = listed.iter().map(|m| m.record.match_id).collect();
        assert_eq!(ids, vec![newer.record.match_id, older.record.match_id]);

        let pending = repo.list_pending_for_confirmer("a").await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].record.match_id, newer.record.match_id);
    }

    #[tokio::test]
    async fn test_resubmit_upserts_player_rows() {
        let (repo, _) = repositories();
        let created = singles("a", "b", Utc::now());
        repo.create_match(&created.record, &created.players).await.unwrap();

        let mut record = created.record.clone();
        record.score = "15-21,13-21".to_string();
        record.submitted_by = "b".to_string();
        record.needs_confirmation_from_list = ids(&["a"]);
        let rows = MatchPlayerModel::rows_for(record.match_id, &ids(&["a"]), &ids(&["b"]), Some(Team::B));

        assert!(repo.resubmit_score(&record, &rows).await.unwrap());

        let loaded = repo.get_match(record.match_id).await.unwrap().unwrap();
        assert_eq!(loaded.players.len(), 2);
        assert_eq!(loaded.winner_team(), Some(Team::B));
        assert_eq!(loaded.record.submitted_by, "b");
    }

    #[tokio::test]
    async fn test_cancelled_match_rejects_further_writes() {
        let (repo, _) = repositories();
        let created = singles("a", "b", Utc::now());
        let match_id = created.record.match_id;
        repo.create_match(&created.record, &created.players).await.unwrap();

        assert!(repo.cancel_match(match_id, "a", Some("rain"), Utc::now()).await.unwrap());
        assert!(!repo.cancel_match(match_id, "a", None, Utc::now()).await.unwrap());
        assert!(!repo.resubmit_score(&created.record, &created.players).await.unwrap());
        assert!(!repo.set_video_link(match_id, "https://v", Utc::now()).await.unwrap());

        let loaded = repo.get_match(match_id).await.unwrap().unwrap();
        assert_eq!(loaded.record.status, MatchStatus::Cancelled);
        assert_eq!(loaded.record.cancel_reason.as_deref(), Some("rain"));
        assert_eq!(loaded.record.cancelled_by.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_delete_match_respects_allowed_statuses() {
        let (repo, _) = repositories();
        let created = singles("a", "b", Utc::now());
        let match_id = created.record.match_id;
        repo.create_match(&created.record, &created.players).await.unwrap();

        assert!(!repo.delete_match(match_id, &[MatchStatus::Cancelled]).await.unwrap());
        assert!(repo.delete_match(match_id, &[MatchStatus::Pending]).await.unwrap());
        assert!(repo.get_match(match_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_apply_confirmation_once() {
        let (repo, players) = repositories();
        let created = singles("a", "b", Utc::now());
        let match_id = created.record.match_id;
        repo.create_match(&created.record, &created.players).await.unwrap();

        let record = confirmation(&created.record, &[("a", 20), ("b", -20)]);
        let applied = match repo.apply_confirmation(&record).await.unwrap() {
            ApplyConfirmationResult::Applied(applied) => applied,
            other => panic!("expected confirmation to apply, got {:?}", other),
        };
        assert_eq!(applied.len(), 2);
        assert_eq!(applied[0].new_elo, 1020);
        assert_eq!(applied[1].new_elo, 980);

        let second = repo.apply_confirmation(&record).await.unwrap();
        assert_eq!(second, ApplyConfirmationResult::AlreadyConfirmed);
        assert_eq!(players.history_count().await, 2);

        let loaded = repo.get_match(match_id).await.unwrap().unwrap();
        assert_eq!(loaded.record.status, MatchStatus::Confirmed);
        assert_eq!(loaded.record.elo_change_side_a, Some(20));
        assert!(loaded.record.needs_confirmation_from_list.is_empty());
    }

    #[tokio::test]
    async fn test_apply_confirmation_failure_keeps_match_pending() {
        let (repo, players) = repositories();
        let created = singles("a", "ghost", Utc::now());
        let match_id = created.record.match_id;
        repo.create_match(&created.record, &created.players).await.unwrap();

        let result = repo
            .apply_confirmation(&confirmation(&created.record, &[("a", 20), ("ghost", -20)]))
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let loaded = repo.get_match(match_id).await.unwrap().unwrap();
        assert_eq!(loaded.record.status, MatchStatus::Pending);
        assert_eq!(players.history_count().await, 0);
        assert_eq!(players.get_player("a").await.unwrap().unwrap().singles_elo, 1000);
    }

    #[tokio::test]
    async fn test_apply_confirmation_on_cancelled_or_missing_match() {
        let (repo, _) = repositories();
        let created = singles("a", "b", Utc::now());
        let match_id = created.record.match_id;
        repo.create_match(&created.record, &created.players).await.unwrap();
        repo.cancel_match(match_id, "a", None, Utc::now()).await.unwrap();

        let record = confirmation(&created.record, &[("a", 20), ("b", -20)]);
        assert_eq!(
            repo.apply_confirmation(&record).await.unwrap(),
            ApplyConfirmationResult::NotPending(MatchStatus::Cancelled)
        );

        let never_stored = singles("a", "b", Utc::now());
        let missing = confirmation(&never_stored.record, &[]);
        assert_eq!(
            repo.apply_confirmation(&missing).await.unwrap(),
            ApplyConfirmationResult::MatchNotFound
        );
    }

    #[tokio::test]
    async fn test_apply_confirmation_refuses_resubmitted_match() {
        let (repo, players) = repositories();
        let created = singles("a", "b", Utc::now());
        let match_id = created.record.match_id;
        repo.create_match(&created.record, &created.players).await.unwrap();
        let stale = confirmation(&created.record, &[("a", 20), ("b", -20)]);

        let mut resubmitted = created.record.clone();
        resubmitted.score = "15-21,13-21".to_string();
        resubmitted.submitted_by = "b".to_string();
        resubmitted.submitted_at = created.record.submitted_at + Duration::seconds(5);
        let rows = MatchPlayerModel::rows_for(match_id, &ids(&["a"]), &ids(&["b"]), Some(Team::B));
        assert!(repo.resubmit_score(&resubmitted, &rows).await.unwrap());

        assert_eq!(
            repo.apply_confirmation(&stale).await.unwrap(),
            ApplyConfirmationResult::Resubmitted
        );
        let loaded = repo.get_match(match_id).await.unwrap().unwrap();
        assert_eq!(loaded.record.status, MatchStatus::Pending);
        assert_eq!(players.history_count().await, 0);
    }
}
