use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{
    models::{MatchModel, MatchPlayerModel, MatchStatus, MatchWithPlayers},
    repository::{ApplyConfirmationResult, ConfirmationRecord, MatchRepository},
    types::{
        ConfirmMatchResponse, MatchRequest, MatchResponse, MessageResponse, PlayerRatingChange,
        SubmitScoreRequest, UpsetSummary,
    },
    validation::{
        confirmers_for_creation, confirmers_for_submitter, resolve_winner, team_of,
        validate_teams, validate_video_link,
    },
};
use crate::{
    players::{repository::RatingUpdate, PlayerModel, PlayerRepository, RatingColumn, DEFAULT_RATING},
    rating::{team_rating, EloFormula, EloInput},
    scoring::{parse_score, Team},
    shared::AppError,
};

/// Orchestrates the match lifecycle: submission, confirmation, rejection,
/// cancellation and edits of pending matches.
pub struct MatchService {
    matches: Arc<dyn MatchRepository + Send + Sync>,
    players: Arc<dyn PlayerRepository + Send + Sync>,
    formula: Arc<dyn EloFormula>,
    k_factor: f64,
}

impl MatchService {
    pub fn new(
        matches: Arc<dyn MatchRepository + Send + Sync>,
        players: Arc<dyn PlayerRepository + Send + Sync>,
        formula: Arc<dyn EloFormula>,
        k_factor: f64,
    ) -> Self {
        Self {
            matches,
            players,
            formula,
            k_factor,
        }
    }

    async fn load_match(&self, match_id: Uuid) -> Result<MatchWithPlayers, AppError> {
        self.matches
            .get_match(match_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Match not found: {}", match_id)))
    }

    /// Loads every listed player, failing on the first unknown ID
    async fn load_players(&self, auth_ids: &[String]) -> Result<Vec<PlayerModel>, AppError> {
        let found = self.players.get_players(auth_ids).await?;
        let mut by_id: HashMap<String, PlayerModel> = found
            .into_iter()
            .map(|player| (player.auth_id.clone(), player))
            .collect();

        auth_ids
            .iter()
            .map(|auth_id| {
                by_id
                    .remove(auth_id)
                    .ok_or_else(|| AppError::NotFound(format!("Player not found: {}", auth_id)))
            })
            .collect()
    }

    /// Unknown participants join the ladder at the default rating
    async fn register_participants(&self, auth_ids: &[String]) -> Result<(), AppError> {
        for auth_id in auth_ids {
            if self
                .players
                .register_player(&PlayerModel::new(auth_id.as_str(), auth_id.as_str()))
                .await?
            {
                info!(auth_id = %auth_id, rating = DEFAULT_RATING, "Registered new player");
            }
        }
        Ok(())
    }

    async fn rank_of(&self, rating: i32, column: RatingColumn) -> Result<u64, AppError> {
        Ok(self.players.count_players_above(column, rating).await? + 1)
    }

    fn ensure_pending(record: &MatchModel, action: &str) -> Result<(), AppError> {
        if record.is_pending() {
            Ok(())
        } else {
            Err(AppError::Validation(format!(
                "Only pending matches can be {} (match is {})",
                action, record.status
            )))
        }
    }

    #[instrument(skip(self, request), fields(match_type = %request.match_type))]
    pub async fn create_match(
        &self,
        request: MatchRequest,
        submitter: &str,
    ) -> Result<MatchResponse, AppError> {
        validate_teams(
            request.match_type,
            &request.players_team_a,
            &request.players_team_b,
        )?;
        let parsed = parse_score(&request.score)?;
        let winner = resolve_winner(&parsed, request.winner_team)?;

        let participants: Vec<String> = request
            .players_team_a
            .iter()
            .chain(&request.players_team_b)
            .cloned()
            .collect();
        self.register_participants(&participants).await?;

        let confirmers =
            confirmers_for_creation(&request.players_team_a, &request.players_team_b, submitter);
        let record = MatchModel::new_pending(
            request.match_type,
            parsed.canonical(),
            submitter,
            confirmers,
            request.played_at.unwrap_or_else(Utc::now),
        );
        let players = MatchPlayerModel::rows_for(
            record.match_id,
            &request.players_team_a,
            &request.players_team_b,
            winner,
        );

        self.matches.create_match(&record, &players).await?;

        info!(
            match_id = %record.match_id,
            submitter = %submitter,
            confirmers = ?record.needs_confirmation_from_list,
            "Match created"
        );
        Ok(MatchWithPlayers { record, players }.into())
    }

    /// Replaces the score of a pending match; the opposing team must confirm again
    #[instrument(skip(self, request))]
    pub async fn submit_match_score(
        &self,
        match_id: Uuid,
        submitter: &str,
        request: SubmitScoreRequest,
    ) -> Result<MatchResponse, AppError> {
        let current = self.load_match(match_id).await?;
        Self::ensure_pending(&current.record, "rescored")?;

        let team_a = current.team(Team::A);
        let team_b = current.team(Team::B);
        let confirmers = confirmers_for_submitter(&team_a, &team_b, submitter)?;

        let parsed = parse_score(&request.score)?;
        let winner = resolve_winner(&parsed, request.winner_team)?;

        let mut record = current.record;
        record.score = parsed.canonical();
        record.submitted_by = submitter.to_string();
        record.needs_confirmation_from_list = confirmers;
        record.submitted_at = Utc::now();
        let players = MatchPlayerModel::rows_for(match_id, &team_a, &team_b, winner);

        if !self.matches.resubmit_score(&record, &players).await? {
            warn!(%match_id, "Match left pending state before resubmission");
            return Err(AppError::Validation(
                "Only pending matches can be rescored".to_string(),
            ));
        }

        info!(%match_id, submitter = %submitter, score = %record.score, "Score resubmitted");
        Ok(MatchWithPlayers { record, players }.into())
    }

    /// Full rewrite of a pending match by its original submitter
    #[instrument(skip(self, request))]
    pub async fn edit_pending_match(
        &self,
        match_id: Uuid,
        requester: &str,
        request: MatchRequest,
    ) -> Result<MatchResponse, AppError> {
        let current = self.load_match(match_id).await?;
        Self::ensure_pending(&current.record, "edited")?;
        if current.record.created_by != requester {
            return Err(AppError::Forbidden(
                "Only the original submitter can edit this match".to_string(),
            ));
        }

        validate_teams(
            request.match_type,
            &request.players_team_a,
            &request.players_team_b,
        )?;
        if team_of(&request.players_team_a, &request.players_team_b, requester).is_none() {
            return Err(AppError::Validation(
                "Submitter must be one of the match participants".to_string(),
            ));
        }

        let parsed = parse_score(&request.score)?;
        let winner = resolve_winner(&parsed, request.winner_team)?;

        let participants: Vec<String> = request
            .players_team_a
            .iter()
            .chain(&request.players_team_b)
            .cloned()
            .collect();
        self.register_participants(&participants).await?;

        let mut record = current.record;
        record.match_type = request.match_type;
        record.score = parsed.canonical();
        record.submitted_by = requester.to_string();
        record.needs_confirmation_from_list =
            confirmers_for_submitter(&request.players_team_a, &request.players_team_b, requester)?;
        record.played_at = request.played_at.unwrap_or(record.played_at);
        record.submitted_at = Utc::now();
        let players = MatchPlayerModel::rows_for(
            match_id,
            &request.players_team_a,
            &request.players_team_b,
            winner,
        );

        if !self.matches.replace_pending_match(&record, &players).await? {
            return Err(AppError::Validation(
                "Only pending matches can be edited".to_string(),
            ));
        }

        info!(%match_id, requester = %requester, "Pending match edited");
        Ok(MatchWithPlayers { record, players }.into())
    }

    #[instrument(skip(self))]
    pub async fn cancel_match(
        &self,
        match_id: Uuid,
        user: &str,
        reason: Option<String>,
    ) -> Result<MatchResponse, AppError> {
        let current = self.load_match(match_id).await?;
        Self::ensure_pending(&current.record, "cancelled")?;
        if !current.is_participant(user) && current.record.created_by != user {
            return Err(AppError::Forbidden(
                "Only participants or the creator can cancel this match".to_string(),
            ));
        }

        let reason = reason
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        if !self
            .matches
            .cancel_match(match_id, user, reason.as_deref(), Utc::now())
            .await?
        {
            return Err(AppError::Validation(
                "Only pending matches can be cancelled".to_string(),
            ));
        }

        info!(%match_id, cancelled_by = %user, "Match cancelled");
        Ok(self.load_match(match_id).await?.into())
    }

    /// Confirms a pending match and applies the rating changes.
    ///
    /// The confirmer must be a participant on the side opposite the
    /// submitter. Ratings, history rows and the status change are written
    /// in a single repository call; a second confirmation fails with
    /// [`AppError::Conflict`] and never writes anything.
    #[instrument(skip(self))]
    pub async fn confirm_match(
        &self,
        match_id: Uuid,
        confirmer: &str,
    ) -> Result<ConfirmMatchResponse, AppError> {
        let current = self.load_match(match_id).await?;
        let record = &current.record;
        match record.status {
            MatchStatus::Pending => {}
            MatchStatus::Confirmed => {
                warn!(%match_id, confirmer = %confirmer, "Repeat confirmation rejected");
                return Err(AppError::Conflict("Match already confirmed".to_string()));
            }
            other => {
                return Err(AppError::Validation(format!(
                    "Match cannot be confirmed (match is {})",
                    other
                )))
            }
        }

        if !record.needs_confirmation_from_list.is_empty()
            && !record.needs_confirmation_from(confirmer)
        {
            return Err(AppError::Forbidden(
                "You are not required to confirm this match".to_string(),
            ));
        }
        let Some(confirmer_team) = current.team_of(confirmer) else {
            return Err(AppError::Forbidden(
                "Only match participants can confirm".to_string(),
            ));
        };
        if current.team_of(&record.submitted_by) == Some(confirmer_team) {
            warn!(%match_id, confirmer = %confirmer, "Same-team confirmation rejected");
            return Err(AppError::Forbidden(
                "Confirmation must come from the opposing team".to_string(),
            ));
        }

        // Edits may have changed the roster since creation
        let team_a = current.team(Team::A);
        let team_b = current.team(Team::B);
        validate_teams(record.match_type, &team_a, &team_b)?;

        let parsed = parse_score(&record.score)?;
        let discipline = record.match_type;
        let column = RatingColumn::from(discipline);

        let roster_a = self.load_players(&team_a).await?;
        let roster_b = self.load_players(&team_b).await?;
        let ratings_a: Vec<i32> = roster_a.iter().map(|p| p.discipline_rating(discipline)).collect();
        let ratings_b: Vec<i32> = roster_b.iter().map(|p| p.discipline_rating(discipline)).collect();

        let mut previous_ranks = HashMap::new();
        for player in roster_a.iter().chain(&roster_b) {
            let rank = self
                .rank_of(player.discipline_rating(discipline), column)
                .await?;
            previous_ranks.insert(player.auth_id.clone(), rank);
        }

        let (Some(effective_a), Some(effective_b)) =
            (team_rating(&ratings_a), team_rating(&ratings_b))
        else {
            return Err(AppError::Validation(
                "Both teams need at least one player".to_string(),
            ));
        };
        let delta = self.formula.compute_delta(&EloInput {
            rating_a: effective_a,
            rating_b: effective_b,
            score_a: parsed.outcome_for_a(),
            parsed_score: &parsed,
            k_factor: self.k_factor,
            mode: discipline,
        });
        let delta_a = delta.delta_a.round() as i32;
        let delta_b = delta.delta_b.round() as i32;
        debug!(
            effective_a,
            effective_b,
            raw_a = delta.delta_a,
            raw_b = delta.delta_b,
            "Rating delta computed"
        );

        let updates: Vec<RatingUpdate> = team_a
            .iter()
            .map(|auth_id| RatingUpdate {
                auth_id: auth_id.clone(),
                delta: delta_a,
            })
            .chain(team_b.iter().map(|auth_id| RatingUpdate {
                auth_id: auth_id.clone(),
                delta: delta_b,
            }))
            .collect();

        let confirmation = ConfirmationRecord {
            match_id,
            discipline,
            updates,
            elo_change_side_a: delta_a,
            elo_change_side_b: delta_b,
            played_at: record.played_at,
            confirmed_at: Utc::now(),
            submitted_at: record.submitted_at,
        };

        let applied = match self.matches.apply_confirmation(&confirmation).await? {
            ApplyConfirmationResult::Applied(applied) => applied,
            ApplyConfirmationResult::AlreadyConfirmed => {
                warn!(%match_id, "Lost confirmation race");
                return Err(AppError::Conflict("Match already confirmed".to_string()));
            }
            ApplyConfirmationResult::Resubmitted => {
                warn!(%match_id, confirmer = %confirmer, "Match changed while confirming");
                return Err(AppError::Conflict(
                    "Match was changed before it could be confirmed".to_string(),
                ));
            }
            ApplyConfirmationResult::NotPending(status) => {
                return Err(AppError::Validation(format!(
                    "Match cannot be confirmed (match is {})",
                    status
                )))
            }
            ApplyConfirmationResult::MatchNotFound => {
                return Err(AppError::NotFound(format!("Match not found: {}", match_id)))
            }
        };

        let mut players = Vec::with_capacity(applied.len());
        for rating in applied {
            let new_rank = self.rank_of(rating.new_elo, column).await?;
            let previous_rank = previous_ranks
                .get(&rating.auth_id)
                .copied()
                .unwrap_or(new_rank);
            let team = current.team_of(&rating.auth_id).unwrap_or(Team::A);

            players.push(PlayerRatingChange {
                team,
                old_elo: rating.old_elo,
                new_elo: rating.new_elo,
                delta: rating.new_elo - rating.old_elo,
                old_overall_elo: rating.old_overall_elo,
                new_overall_elo: rating.new_overall_elo,
                previous_rank,
                new_rank,
                rank_change: previous_rank as i64 - new_rank as i64,
                auth_id: rating.auth_id,
            });
        }

        let upset = parsed.winner_team.map(|winner| {
            let (winner_avg_elo, loser_avg_elo) = match winner {
                Team::A => (effective_a, effective_b),
                Team::B => (effective_b, effective_a),
            };
            UpsetSummary {
                winner_avg_elo,
                loser_avg_elo,
                is_upset: winner_avg_elo < loser_avg_elo,
            }
        });

        info!(
            %match_id,
            confirmer = %confirmer,
            delta_a,
            delta_b,
            is_upset = upset.as_ref().is_some_and(|u| u.is_upset),
            "Match confirmed"
        );

        Ok(ConfirmMatchResponse {
            match_id,
            status: MatchStatus::Confirmed,
            match_type: discipline,
            winner_team: parsed.winner_team,
            is_draw: parsed.is_draw,
            elo_change_side_a: delta_a,
            elo_change_side_b: delta_b,
            players,
            upset,
        })
    }

    /// Rejection deletes the pending match outright
    #[instrument(skip(self))]
    pub async fn reject_match(
        &self,
        match_id: Uuid,
        user: &str,
    ) -> Result<MessageResponse, AppError> {
        let current = self.load_match(match_id).await?;
        Self::ensure_pending(&current.record, "rejected")?;
        if !current.record.needs_confirmation_from(user) {
            return Err(AppError::Forbidden(
                "Only a listed confirmer can reject this match".to_string(),
            ));
        }

        if !self
            .matches
            .delete_match(match_id, &[MatchStatus::Pending])
            .await?
        {
            return Err(AppError::Validation(
                "Only pending matches can be rejected".to_string(),
            ));
        }

        info!(%match_id, rejected_by = %user, "Match rejected and deleted");
        Ok(MessageResponse::new("Match rejected"))
    }

    #[instrument(skip(self))]
    pub async fn update_match_video_link(
        &self,
        match_id: Uuid,
        user: &str,
        url: &str,
    ) -> Result<MatchResponse, AppError> {
        let current = self.load_match(match_id).await?;
        if current.record.status != MatchStatus::Confirmed {
            return Err(AppError::Validation(
                "Video links can only be added to confirmed matches".to_string(),
            ));
        }
        if !current.is_participant(user) {
            return Err(AppError::Forbidden(
                "Only match participants can add a video".to_string(),
            ));
        }
        let url = validate_video_link(url)?;

        if !self.matches.set_video_link(match_id, &url, Utc::now()).await? {
            return Err(AppError::Validation(
                "Video links can only be added to confirmed matches".to_string(),
            ));
        }

        info!(%match_id, user = %user, "Video link added");
        Ok(self.load_match(match_id).await?.into())
    }

    #[instrument(skip(self))]
    pub async fn get_match(&self, match_id: Uuid) -> Result<MatchResponse, AppError> {
        Ok(self.load_match(match_id).await?.into())
    }

    #[instrument(skip(self))]
    pub async fn list_matches_for_user(&self, auth_id: &str) -> Result<Vec<MatchResponse>, AppError> {
        let matches = self.matches.list_matches_for_player(auth_id).await?;
        debug!(count = matches.len(), "Matches listed");
        Ok(matches.into_iter().map(MatchResponse::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn list_pending_confirmations(
        &self,
        auth_id: &str,
    ) -> Result<Vec<MatchResponse>, AppError> {
        let matches = self.matches.list_pending_for_confirmer(auth_id).await?;
        Ok(matches.into_iter().map(MatchResponse::from).collect())
    }

    /// Creator-only delete; confirmed matches carry applied ratings and stay
    #[instrument(skip(self))]
    pub async fn delete_match(
        &self,
        match_id: Uuid,
        requester: &str,
    ) -> Result<MessageResponse, AppError> {
        let current = self.load_match(match_id).await?;
        if current.record.created_by != requester {
            return Err(AppError::Forbidden(
                "Not authorized to delete this match".to_string(),
            ));
        }

        let deletable = [MatchStatus::Pending, MatchStatus::Cancelled];
        if !self.matches.delete_match(match_id, &deletable).await? {
            return Err(AppError::Validation(
                "Confirmed matches cannot be deleted".to_string(),
            ));
        }

        info!(%match_id, requester = %requester, "Match deleted");
        Ok(MessageResponse::new("Match deleted successfully"))
    }
}
