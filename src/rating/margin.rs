use super::{expected_score, EloDelta, EloFormula, EloInput, FormulaVersion};

/// Weight of the point differential in the margin factor
const ALPHA: f64 = 0.9;
/// Weight of the set differential in the margin factor
const BETA: f64 = 0.4;
/// Weight of the upset factor
const GAMMA: f64 = 0.6;
/// Point differential at which the tanh curve reaches ~76%
const P0: f64 = 15.0;
const MAX_SETS: f64 = 3.0;
/// Fixed rating bonus awarded to both sides of a draw
pub const DRAW_BONUS: f64 = 5.0;
const DELTA_LIMIT: f64 = 60.0;
const VARIABILITY_SCALE: f64 = 1.25;

/// ELO scaled by margin of victory and by how surprising the result was.
///
/// Decisive results are zero-sum. Draws bypass the proportional formula and
/// award [`DRAW_BONUS`] to both sides.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarginOfVictoryFormula;

impl MarginOfVictoryFormula {
    pub fn new() -> Self {
        Self
    }

    /// Saturating multiplier (>= 1) derived from point and set differentials
    pub fn margin_factor(points_diff: u32, sets_diff: u32) -> f64 {
        let points_factor = 1.0 + ALPHA * (f64::from(points_diff) / P0).tanh();
        let sets_factor = 1.0 + BETA * (f64::from(sets_diff) / MAX_SETS);
        (points_factor * sets_factor).max(1.0)
    }

    pub fn upset_factor(score_a: f64, expected_a: f64) -> f64 {
        1.0 + GAMMA * (score_a - expected_a).abs()
    }
}

impl EloFormula for MarginOfVictoryFormula {
    fn compute_delta(&self, input: &EloInput<'_>) -> EloDelta {
        if input.parsed_score.is_draw {
            return EloDelta {
                delta_a: DRAW_BONUS,
                delta_b: DRAW_BONUS,
            };
        }

        let expected_a = expected_score(input.rating_a, input.rating_b);
        let margin = Self::margin_factor(
            input.parsed_score.points_diff(),
            input.parsed_score.sets_diff(),
        );
        let upset = Self::upset_factor(input.score_a, expected_a);

        let base = input.k_factor * (input.score_a - expected_a);
        let delta_a =
            (base * margin * upset * VARIABILITY_SCALE).clamp(-DELTA_LIMIT, DELTA_LIMIT);

        EloDelta {
            delta_a,
            delta_b: -delta_a,
        }
    }

    fn version(&self) -> FormulaVersion {
        FormulaVersion::V2
    }
}
