use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::scoring::ParsedScore;

/// Singles or doubles. Each discipline carries an independently tracked rating.
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
pub enum Discipline {
    Singles,
    Doubles,
}

impl Discipline {
    /// Players required on each side
    pub fn team_size(self) -> usize {
        match self {
            Discipline::Singles => 1,
            Discipline::Doubles => 2,
        }
    }
}

/// Which rating formula the engine runs, chosen once at startup
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
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FormulaVersion {
    /// Flat K-factor ELO
    V1,
    /// Margin-of-victory and upset aware ELO
    #[default]
    V2,
}

/// Inputs for a single rating computation, from side A's point of view
#[derive(Debug, Clone, Copy)]
pub struct EloInput<'a> {
    pub rating_a: f64,
    pub rating_b: f64,
    /// 1 for a win, 0 for a loss, 0.5 for a draw
    pub score_a: f64,
    pub parsed_score: &'a ParsedScore,
    pub k_factor: f64,
    pub mode: Discipline,
}

/// Unrounded rating movement for each side
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EloDelta {
    pub delta_a: f64,
    pub delta_b: f64,
}

pub trait EloFormula: Send + Sync {
    fn compute_delta(&self, input: &EloInput<'_>) -> EloDelta;

    fn version(&self) -> FormulaVersion;
}
