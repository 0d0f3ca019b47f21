use super::{expected_score, EloDelta, EloFormula, EloInput, FormulaVersion};

/// Plain ELO: `K * (actual - expected)`, no margin or upset scaling.
/// Kept as a selectable compatibility mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClassicEloFormula;

impl ClassicEloFormula {
    pub fn new() -> Self {
        Self
    }
}

impl EloFormula for ClassicEloFormula {
    fn compute_delta(&self, input: &EloInput<'_>) -> EloDelta {
        let expected_a = expected_score(input.rating_a, input.rating_b);
        let delta_a = input.k_factor * (input.score_a - expected_a);

        EloDelta {
            delta_a,
            delta_b: -delta_a,
        }
    }

    fn version(&self) -> FormulaVersion {
        FormulaVersion::V1
    }
}
