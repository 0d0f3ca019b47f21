use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{rating::Discipline, scoring::Team};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MatchStatus {
    Pending,
    Confirmed,
    Cancelled,
}

/// Database model for the matches table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchModel {
    pub match_id: Uuid,
    pub match_type: Discipline,
    pub score: String, // Canonical set scores, e.g. "21-15,18-21,21-19"
    pub status: MatchStatus,
    pub created_by: String,
    pub submitted_by: String, // Participant who last proposed the score
    pub needs_confirmation_from_list: Vec<String>,
    pub played_at: DateTime<Utc>,
    pub submitted_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<String>,
    pub cancel_reason: Option<String>,
    pub elo_change_side_a: Option<i32>,
    pub elo_change_side_b: Option<i32>,
    pub video_link: Option<String>,
    pub video_added_at: Option<DateTime<Utc>>,
}

impl MatchModel {
    /// Creates a pending match with a fresh ID
    pub fn new_pending(
        match_type: Discipline,
        score: String,
        submitter: &str,
        needs_confirmation_from_list: Vec<String>,
        played_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            match_id: Uuid::new_v4(),
            match_type,
            score,
            status: MatchStatus::Pending,
            created_by: submitter.to_string(),
            submitted_by: submitter.to_string(),
            needs_confirmation_from_list,
            played_at,
            submitted_at: now,
            confirmed_at: None,
            cancelled_at: None,
            cancelled_by: None,
            cancel_reason: None,
            elo_change_side_a: None,
            elo_change_side_b: None,
            video_link: None,
            video_added_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == MatchStatus::Pending
    }

    pub fn needs_confirmation_from(&self, auth_id: &str) -> bool {
        self.needs_confirmation_from_list
            .iter()
            .any(|pending| pending == auth_id)
    }
}

/// Database model for the match_players join table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPlayerModel {
    pub match_id: Uuid,
    pub auth_id: String,
    pub team: Team,
    pub is_winner: bool, // Mirrors the parsed score
}

impl MatchPlayerModel {
    /// Rows for both teams with `is_winner` derived from the resolved winner
    pub fn rows_for(
        match_id: Uuid,
        team_a: &[String],
        team_b: &[String],
        winner: Option<Team>,
    ) -> Vec<Self> {
        let side = |team: Team, ids: &[String]| -> Vec<Self> {
            ids.iter()
                .map(|auth_id| MatchPlayerModel {
                    match_id,
                    auth_id: auth_id.clone(),
                    team,
                    is_winner: winner == Some(team),
                })
                .collect()
        };

        let mut rows = side(Team::A, team_a);
        rows.extend(side(Team::B, team_b));
        rows
    }
}

/// A match together with its player rows
#[derive(Debug, Clone, PartialEq)]
pub struct MatchWithPlayers {
    pub record: MatchModel,
    pub players: Vec<MatchPlayerModel>,
}

impl MatchWithPlayers {
    pub fn team(&self, team: Team) -> Vec<String> {
        self.players
            .iter()
            .filter(|player| player.team == team)
            .map(|player| player.auth_id.clone())
            .collect()
    }

    /// Team of a participant; `None` when not registered on the match
    pub fn team_of(&self, auth_id: &str) -> Option<Team> {
        self.players
            .iter()
            .find(|player| player.auth_id == auth_id)
            .map(|player| player.team)
    }

    pub fn is_participant(&self, auth_id: &str) -> bool {
        self.team_of(auth_id).is_some()
    }

    /// Winner according to the stored `is_winner` flags
    pub fn winner_team(&self) -> Option<Team> {
        self.players
            .iter()
            .find(|player| player.is_winner)
            .map(|player| player.team)
    }
}
