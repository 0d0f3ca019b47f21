// Public API - what other modules can use
pub use parser::{parse_score, ParsedScore, ScoreError, SetScore, Team};

// Internal modules
mod parser;
