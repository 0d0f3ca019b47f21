use std::sync::Arc;

use super::{ClassicEloFormula, EloFormula, FormulaVersion, MarginOfVictoryFormula};

/// Factory for creating the rating formula selected by configuration
pub struct EloFormulaFactory;

impl EloFormulaFactory {
    pub fn create_formula(version: FormulaVersion) -> Arc<dyn EloFormula> {
        match version {
            FormulaVersion::V1 => Arc::new(ClassicEloFormula::new()),
            FormulaVersion::V2 => Arc::new(MarginOfVictoryFormula::new()),
        }
    }
}
