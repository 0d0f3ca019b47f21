// Public API - what other modules can use
pub use handlers::suggest_opponents;
pub use service::MatchmakingService;
pub use types::{Recommendation, SearchCriteria, SuggestRequest, SuggestionResponse};

// Internal modules
mod handlers;
mod service;
mod types;
