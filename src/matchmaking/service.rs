use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::types::{Recommendation, SearchCriteria, SuggestionResponse};
use crate::{
    players::{PlayerModel, PlayerRepository, RatingColumn},
    rating::Discipline,
    shared::AppError,
};

/// Rating windows tried in order before falling back to an unbounded search
const SEARCH_RANGES: [i32; 3] = [100, 200, 400];
const CANDIDATE_LIMIT: u32 = 50;
const MAX_RECOMMENDATIONS: usize = 5;

/// Nearest-rating opponent search. Nothing is persisted.
pub struct MatchmakingService {
    players: Arc<dyn PlayerRepository + Send + Sync>,
}

impl MatchmakingService {
    pub fn new(players: Arc<dyn PlayerRepository + Send + Sync>) -> Self {
        Self { players }
    }

    #[instrument(skip(self))]
    pub async fn suggest(
        &self,
        auth_id: &str,
        mode: Option<Discipline>,
    ) -> Result<SuggestionResponse, AppError> {
        let mode = mode.ok_or_else(|| AppError::Validation("Mode is required".to_string()))?;
        let column = RatingColumn::from(mode);

        let requester = self
            .players
            .get_player(auth_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Player not found: {}", auth_id)))?;
        let target_elo = requester.discipline_rating(mode);

        let windows = SEARCH_RANGES.iter().copied().map(Some).chain([None]);
        for range in windows {
            let candidates = self
                .players
                .find_players_in_range(
                    column,
                    auth_id,
                    target_elo,
                    range,
                    CANDIDATE_LIMIT,
                )
                .await?;
            debug!(?range, found = candidates.len(), "Searched rating window");

            if !candidates.is_empty() {
                let recommendations = closest(target_elo, mode, candidates);
                info!(
                    auth_id = %auth_id,
                    count = recommendations.len(),
                    ?range,
                    "Opponents suggested"
                );
                return Ok(SuggestionResponse::Suggested {
                    recommendations,
                    criteria: SearchCriteria { target_elo, range },
                });
            }
        }

        info!(auth_id = %auth_id, "No opponents available");
        Ok(SuggestionResponse::NoSuggestions {
            message: "No other players available to recommend at this time.".to_string(),
        })
    }
}

/// Smallest rating gap first; equal gaps favour the higher rated player
fn closest(target_elo: i32, mode: Discipline, candidates: Vec<PlayerModel>) -> Vec<Recommendation> {
    let mut recommendations: Vec<Recommendation> = candidates
        .into_iter()
        .map(|player| {
            let elo = player.discipline_rating(mode);
            Recommendation {
                elo,
                elo_gap: (elo - target_elo).abs(),
                auth_id: player.auth_id,
                username: player.username,
                gender: player.gender,
            }
        })
        .collect();

    recommendations.sort_by(|a, b| a.elo_gap.cmp(&b.elo_gap).then_with(|| b.elo.cmp(&a.elo)));
    recommendations.truncate(MAX_RECOMMENDATIONS);
    recommendations
}
