// Public API - what other modules can use
pub use handlers::{
    cancel_match, confirm_match, create_match, delete_match, edit_match, get_match,
    list_pending_matches, list_user_matches, reject_match, submit_match_score,
    update_match_video,
};
pub use models::{MatchModel, MatchPlayerModel, MatchStatus, MatchWithPlayers};
pub use repository::{
    ApplyConfirmationResult, ConfirmationRecord, InMemoryMatchRepository, MatchRepository,
    PostgresMatchRepository,
};
pub use service::MatchService;
pub use types::{
    CancelMatchRequest, ConfirmMatchResponse, MatchRequest, MatchResponse, MessageResponse,
    PlayerRatingChange, SubmitScoreRequest, UpsetSummary, VideoLinkRequest,
};

// Internal modules
mod handlers;
pub mod models;
pub mod repository;
mod service;
pub mod types;
pub mod validation;
