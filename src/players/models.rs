use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum_macros::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::rating::Discipline;

/// Rating assigned to players who have not played yet
pub const DEFAULT_RATING: i32 = 1000;

/// Rating column a query ranks or sorts by
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RatingColumn {
    #[default]
    Singles,
    Doubles,
    Overall,
}

impl RatingColumn {
    /// Column name in the players table
    pub fn column_name(self) -> &'static str {
        match self {
            RatingColumn::Singles => "singles_elo",
            RatingColumn::Doubles => "doubles_elo",
            RatingColumn::Overall => "overall_elo",
        }
    }
}

impl From<Discipline> for RatingColumn {
    fn from(discipline: Discipline) -> Self {
        match discipline {
            Discipline::Singles => RatingColumn::Singles,
            Discipline::Doubles => RatingColumn::Doubles,
        }
    }
}

/// Database model for the players table (rating snapshot)
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct PlayerModel {
    pub auth_id: String,
    pub username: String,
    pub gender: Option<String>,
    pub singles_elo: i32,
    pub doubles_elo: i32,
    pub overall_elo: Option<i32>, // Derived, null until the first confirmed match
    pub singles_matches_played: i32,
    pub doubles_matches_played: i32,
}

/// Result of applying a new discipline rating to a player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedRating {
    pub auth_id: String,
    pub old_elo: i32,
    pub new_elo: i32,
    pub old_overall_elo: Option<i32>,
    pub new_overall_elo: Option<i32>,
}

impl PlayerModel {
    /// Creates an unrated player
    pub fn new(auth_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            auth_id: auth_id.into(),
            username: username.into(),
            gender: None,
            singles_elo: DEFAULT_RATING,
            doubles_elo: DEFAULT_RATING,
            overall_elo: None,
            singles_matches_played: 0,
            doubles_matches_played: 0,
        }
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    pub fn with_ratings(mut self, singles_elo: i32, doubles_elo: i32) -> Self {
        self.singles_elo = singles_elo;
        self.doubles_elo = doubles_elo;
        self
    }

    pub fn discipline_rating(&self, discipline: Discipline) -> i32 {
        match discipline {
            Discipline::Singles => self.singles_elo,
            Discipline::Doubles => self.doubles_elo,
        }
    }

    /// Value of a rating column; `None` only for an unset overall rating
    pub fn rating(&self, column: RatingColumn) -> Option<i32> {
        match column {
            RatingColumn::Singles => Some(self.singles_elo),
            RatingColumn::Doubles => Some(self.doubles_elo),
            RatingColumn::Overall => self.overall_elo,
        }
    }

    /// Sets the discipline rating, counts the match and recomputes the overall rating
    pub fn apply_rating(&mut self, discipline: Discipline, new_elo: i32) -> AppliedRating {
        let old_elo = self.discipline_rating(discipline);
        let old_overall_elo = self.overall_elo;

        match discipline {
            Discipline::Singles => {
                self.singles_elo = new_elo;
                self.singles_matches_played += 1;
            }
            Discipline::Doubles => {
                self.doubles_elo = new_elo;
                self.doubles_matches_played += 1;
            }
        }
        self.recompute_overall();

        AppliedRating {
            auth_id: self.auth_id.clone(),
            old_elo,
            new_elo,
            old_overall_elo,
            new_overall_elo: self.overall_elo,
        }
    }

    /// Overall rating is the discipline ratings weighted by matches played
    pub fn recompute_overall(&mut self) {
        let singles = i64::from(self.singles_matches_played);
        let doubles = i64::from(self.doubles_matches_played);
        let total = singles + doubles;

        self.overall_elo = if total > 0 {
            let weighted =
                i64::from(self.singles_elo) * singles + i64::from(self.doubles_elo) * doubles;
            Some((weighted as f64 / total as f64).round() as i32)
        } else {
            None
        };
    }
}

/// Database model for the elo_history table. Append-only, one row per player per match.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct EloHistoryModel {
    pub id: Uuid,
    pub auth_id: String,
    pub match_id: Uuid,
    pub discipline: String,
    pub old_elo: i32,
    pub new_elo: i32,
    pub old_overall_elo: Option<i32>,
    pub new_overall_elo: Option<i32>,
    pub created_at: DateTime<Utc>, // Match played_at
}

impl EloHistoryModel {
    pub fn from_applied(
        applied: &AppliedRating,
        match_id: Uuid,
        discipline: Discipline,
        played_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            auth_id: applied.auth_id.clone(),
            match_id,
            discipline: discipline.to_string(),
            old_elo: applied.old_elo,
            new_elo: applied.new_elo,
            old_overall_elo: applied.old_overall_elo,
            new_overall_elo: applied.new_overall_elo,
            created_at: played_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_player_defaults() {
        let player = PlayerModel::new("auth-1", "alice");
        assert_eq!(player.singles_elo, DEFAULT_RATING);
        assert_eq!(player.doubles_elo, DEFAULT_RATING);
        assert_eq!(player.overall_elo, None);
        assert_eq!(player.rating(RatingColumn::Overall), None);
    }

    #[test]
    fn test_apply_singles_rating() {
        let mut player = PlayerModel::new("auth-1", "alice");
        let applied = player.apply_rating(Discipline::Singles, 1041);

        assert_eq!(applied.old_elo, 1000);
        assert_eq!(applied.new_elo, 1041);
        assert_eq!(applied.old_overall_elo, None);
        assert_eq!(applied.new_overall_elo, Some(1041));
        assert_eq!(player.singles_matches_played, 1);
        assert_eq!(player.doubles_matches_played, 0);
        assert_eq!(player.doubles_elo, 1000);
    }

    #[test]
    fn test_overall_is_weighted_by_matches_played() {
        let mut player = PlayerModel::new("auth-1", "alice").with_ratings(1100, 1000);
        player.singles_matches_played = 3;
        player.doubles_matches_played = 0;
        player.recompute_overall();
        assert_eq!(player.overall_elo, Some(1100));

        let applied = player.apply_rating(Discipline::Doubles, 900);
        // (1100 * 3 + 900 * 1) / 4
        assert_eq!(applied.new_overall_elo, Some(1050));
        assert_eq!(applied.old_overall_elo, Some(1100));
    }

    #[test]
    fn test_rating_column_from_discipline() {
        assert_eq!(RatingColumn::from(Discipline::Doubles), RatingColumn::Doubles);
        assert_eq!(RatingColumn::Overall.column_name(), "overall_elo");
        assert_eq!("overall".parse::<RatingColumn>().unwrap(), RatingColumn::Overall);
    }
}
