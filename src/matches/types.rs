use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::models::{MatchModel, MatchStatus, MatchWithPlayers};
use crate::{rating::Discipline, scoring::Team};

/// Full match payload, used both to create a match and to edit a pending one
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRequest {
    pub match_type: Discipline,
    #[serde(rename = "players_team_A", default)]
    pub players_team_a: Vec<String>,
    #[serde(rename = "players_team_B", default)]
    pub players_team_b: Vec<String>,
    pub winner_team: Option<Team>, // Optional hint, must agree with the score
    pub score: String,
    pub played_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitScoreRequest {
    pub score: String,
    pub winner_team: Option<Team>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelMatchRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoLinkRequest {
    pub video_link: String,
}

/// Match with both rosters and the winner derived from the player rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResponse {
    #[serde(flatten)]
    pub record: MatchModel,
    #[serde(rename = "team_A_players")]
    pub team_a_players: Vec<String>,
    #[serde(rename = "team_B_players")]
    pub team_b_players: Vec<String>,
    pub winner_team: Option<Team>,
}

impl From<MatchWithPlayers> for MatchResponse {
    fn from(entry: MatchWithPlayers) -> Self {
        let team_a_players = entry.team(Team::A);
        let team_b_players = entry.team(Team::B);
        let winner_team = entry.winner_team();

        MatchResponse {
            record: entry.record,
            team_a_players,
            team_b_players,
            winner_team,
        }
    }
}

/// Rating and rank movement of one participant after a confirmation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRatingChange {
    pub auth_id: String,
    pub team: Team,
    pub old_elo: i32,
    pub new_elo: i32,
    pub delta: i32,
    pub old_overall_elo: Option<i32>,
    pub new_overall_elo: Option<i32>,
    pub previous_rank: u64,
    pub new_rank: u64,
    pub rank_change: i64, // Positive when the player moved up
}

/// Pre-match average ratings of winners and losers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsetSummary {
    pub winner_avg_elo: f64,
    pub loser_avg_elo: f64,
    pub is_upset: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmMatchResponse {
    pub match_id: Uuid,
    pub status: MatchStatus,
    pub match_type: Discipline,
    pub winner_team: Option<Team>,
    pub is_draw: bool,
    pub elo_change_side_a: i32,
    pub elo_change_side_b: i32,
    pub players: Vec<PlayerRatingChange>,
    pub upset: Option<UpsetSummary>, // None for draws
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
