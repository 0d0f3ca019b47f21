use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{AsRefStr, EnumString};
use thiserror::Error;

/// Maximum number of sets a scoreline may contain
pub const MAX_SETS: usize = 3;

/// Side of a match. Team A is always the first number of every set score.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, AsRefStr,
)]
pub enum Team {
    A,
    B,
}

impl Team {
    pub fn opposite(self) -> Team {
        match self {
            Team::A => Team::B,
            Team::B => Team::A,
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreError {
    #[error("Score text is required")]
    Missing,

    #[error("Score must contain between 1 and {MAX_SETS} sets")]
    SetCount,

    #[error("Set scores must be integers")]
    NotInteger,

    #[error("Set scores cannot be tied")]
    TiedSet,

    #[error("Score must produce a winner")]
    NoWinner,
}

/// Points for each side in a single set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetScore {
    pub a: u32,
    pub b: u32,
}

impl SetScore {
    pub fn point_diff(&self) -> u32 {
        self.a.abs_diff(self.b)
    }

    pub fn winner(&self) -> Team {
        if self.a > self.b {
            Team::A
        } else {
            Team::B
        }
    }
}

/// Validated outcome of a scoreline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedScore {
    pub sets: Vec<SetScore>,
    pub team_a_sets_won: u32,
    pub team_b_sets_won: u32,
    pub winner_team: Option<Team>,
    pub is_draw: bool,
}

impl ParsedScore {
    /// Canonical form used for storage, e.g. `21-15,18-21,21-19`
    pub fn canonical(&self) -> String {
        self.sets
            .iter()
            .map(|set| format!("{}-{}", set.a, set.b))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Sum of the absolute point differential of every set
    pub fn points_diff(&self) -> u32 {
        self.sets.iter().map(SetScore::point_diff).sum()
    }

    pub fn sets_diff(&self) -> u32 {
        self.team_a_sets_won.abs_diff(self.team_b_sets_won)
    }

    /// Actual result from team A's point of view: 1 win, 0 loss, 0.5 draw
    pub fn outcome_for_a(&self) -> f64 {
        match self.winner_team {
            Some(Team::A) => 1.0,
            Some(Team::B) => 0.0,
            None => 0.5,
        }
    }
}

/// Parses a comma-separated scoreline such as `21-15, 18-21, 21-19`.
///
/// A single tied set is rejected. A 1-1 split over two sets is a draw only
/// when both sets were won by the same margin; any other split fails with
/// [`ScoreError::NoWinner`].
pub fn parse_score(score_text: &str) -> Result<ParsedScore, ScoreError> {
    if score_text.trim().is_empty() {
        return Err(ScoreError::Missing);
    }

    let raw_sets: Vec<&str> = score_text
        .split(',')
        .map(str::trim)
        .filter(|set| !set.is_empty())
        .collect();

    if raw_sets.is_empty() || raw_sets.len() > MAX_SETS {
        return Err(ScoreError::SetCount);
    }

    let mut sets = Vec::with_capacity(raw_sets.len());
    let mut team_a_sets_won = 0;
    let mut team_b_sets_won = 0;

    for raw in raw_sets {
        let set = parse_set(raw)?;
        match set.winner() {
            Team::A => team_a_sets_won += 1,
            Team::B => team_b_sets_won += 1,
        }
        sets.push(set);
    }

    if team_a_sets_won != team_b_sets_won {
        let winner = if team_a_sets_won > team_b_sets_won {
            Team::A
        } else {
            Team::B
        };
        return Ok(ParsedScore {
            sets,
            team_a_sets_won,
            team_b_sets_won,
            winner_team: Some(winner),
            is_draw: false,
        });
    }

    // Sets can only be level over exactly two sets since no set is tied
    let same_margin = sets.len() == 2 && sets[0].point_diff() == sets[1].point_diff();
    if !same_margin {
        return Err(ScoreError::NoWinner);
    }

    Ok(ParsedScore {
        sets,
        team_a_sets_won,
        team_b_sets_won,
        winner_team: None,
        is_draw: true,
    })
}

fn parse_set(raw: &str) -> Result<SetScore, ScoreError> {
    let (a_text, b_text) = raw.split_once('-').ok_or(ScoreError::NotInteger)?;
    let a = parse_points(a_text)?;
    let b = parse_points(b_text)?;

    if a == b {
        return Err(ScoreError::TiedSet);
    }

    Ok(SetScore { a, b })
}

/// Plain ASCII digits only; `u32::from_str` would also take a leading `+`
fn parse_points(text: &str) -> Result<u32, ScoreError> {
    let text = text.trim();
    if text.is_empty() || !text.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(ScoreError::NotInteger);
    }
    text.parse::<u32>().map_err(|_| ScoreError::NotInteger)
}
