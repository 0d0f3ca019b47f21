use serde::{Deserialize, Serialize};

use crate::rating::Discipline;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestRequest {
    pub mode: Option<Discipline>,
}

/// Candidate opponent with their distance from the requester's rating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub auth_id: String,
    pub username: String,
    pub gender: Option<String>,
    pub elo: i32,
    pub elo_gap: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCriteria {
    pub target_elo: i32,
    pub range: Option<i32>, // None once the search is unbounded
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SuggestionResponse {
    Suggested {
        recommendations: Vec<Recommendation>,
        criteria: SearchCriteria,
    },
    NoSuggestions {
        message: String,
    },
}
