// Public API - what other modules can use
pub use classic::ClassicEloFormula;
pub use factory::EloFormulaFactory;
pub use margin::MarginOfVictoryFormula;
pub use types::{Discipline, EloDelta, EloFormula, EloInput, FormulaVersion};

// Internal modules
mod classic;
mod factory;
mod margin;
mod types;

/// Probability that a player rated `rating` beats one rated `opponent`
pub fn expected_score(rating: f64, opponent: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((opponent - rating) / 400.0))
}

/// Effective rating of a side: the single player in singles, the team average in doubles.
/// `None` for an empty side.
pub fn team_rating(ratings: &[i32]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    Some(ratings.iter().map(|r| f64::from(*r)).sum::<f64>() / ratings.len() as f64)
}
