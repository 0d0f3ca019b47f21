use std::collections::HashSet;

use crate::{
    rating::Discipline,
    scoring::{ParsedScore, Team},
    shared::AppError,
};

/// Checks 1v1 / 2v2 shape, blank IDs and duplicate players across both teams
pub fn validate_teams(
    discipline: Discipline,
    team_a: &[String],
    team_b: &[String],
) -> Result<(), AppError> {
    let size = discipline.team_size();
    if team_a.len() != size || team_b.len() != size {
        return Err(AppError::Validation(format!(
            "{} matches require {} player(s) per team",
            discipline, size
        )));
    }

    if team_a.iter().chain(team_b).any(|id| id.trim().is_empty()) {
        return Err(AppError::Validation("Player IDs cannot be empty".to_string()));
    }

    let mut seen = HashSet::new();
    if !team_a.iter().chain(team_b).all(|id| seen.insert(id.as_str())) {
        return Err(AppError::Validation(
            "A player cannot appear more than once in a match".to_string(),
        ));
    }

    Ok(())
}

/// Team a participant is listed on, if any
pub fn team_of(team_a: &[String], team_b: &[String], auth_id: &str) -> Option<Team> {
    if team_a.iter().any(|id| id == auth_id) {
        Some(Team::A)
    } else if team_b.iter().any(|id| id == auth_id) {
        Some(Team::B)
    } else {
        None
    }
}

/// Confirmers for a new match: the submitter's opponents, or everyone else
/// when the submitter is not playing.
pub fn confirmers_for_creation(
    team_a: &[String],
    team_b: &[String],
    submitter: &str,
) -> Vec<String> {
    match team_of(team_a, team_b, submitter) {
        Some(Team::A) => team_b.to_vec(),
        Some(Team::B) => team_a.to_vec(),
        None => team_a
            .iter()
            .chain(team_b)
            .filter(|id| id.as_str() != submitter)
            .cloned()
            .collect(),
    }
}

/// Confirmers after a resubmission: strictly the submitter's opposing team
pub fn confirmers_for_submitter(
    team_a: &[String],
    team_b: &[String],
    submitter: &str,
) -> Result<Vec<String>, AppError> {
    match team_of(team_a, team_b, submitter) {
        Some(Team::A) => Ok(team_b.to_vec()),
        Some(Team::B) => Ok(team_a.to_vec()),
        None => Err(AppError::Forbidden(
            "Only match participants can submit a score".to_string(),
        )),
    }
}

/// Reconciles an optional client-declared winner with the parsed score
pub fn resolve_winner(parsed: &ParsedScore, hint: Option<Team>) -> Result<Option<Team>, AppError> {
    match (hint, parsed.winner_team) {
        (Some(_), None) => Err(AppError::Validation(
            "A drawn score cannot declare a winner".to_string(),
        )),
        (Some(declared), Some(actual)) if declared != actual => Err(AppError::Validation(
            "Declared winner does not match the score".to_string(),
        )),
        (_, winner) => Ok(winner),
    }
}

/// Accepts only `https://` links
pub fn validate_video_link(url: &str) -> Result<String, AppError> {
    let url = url.trim();
    match url.strip_prefix("https://") {
        Some(rest) if !rest.is_empty() => Ok(url.to_string()),
        _ => Err(AppError::Validation(
            "Video link must start with https://".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::parse_score;
    use rstest::rstest;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[rstest]
    #[case(Discipline::Singles, &["a"], &["b"], true)]
    #[case(Discipline::Doubles, &["a", "b"], &["c", "d"], true)]
    #[case(Discipline::Singles, &["a", "b"], &["c"], false)]
    #[case(Discipline::Doubles, &["a"], &["b"], false)]
    #[case(Discipline::Doubles, &["a", "b"], &["b", "c"], false)]
    #[case(Discipline::Doubles, &["a", "a"], &["c", "d"], false)]
    #[case(Discipline::Singles, &[""], &["b"], false)]
    fn test_validate_teams(
        #[case] discipline: Discipline,
        #[case] team_a: &[&str],
        #[case] team_b: &[&str],
        #[case] valid: bool,
    ) {
        let result = validate_teams(discipline, &ids(team_a), &ids(team_b));
        assert_eq!(result.is_ok(), valid, "{:?}", result);
    }

    #[test]
    fn test_confirmers_for_creation() {
        let a = ids(&["a1", "a2"]);
        let b = ids(&["b1", "b2"]);

        assert_eq!(confirmers_for_creation(&a, &b, "a2"), b);
        assert_eq!(confirmers_for_creation(&a, &b, "b1"), a);
        // Non-playing submitter falls back to everyone else
        assert_eq!(
            confirmers_for_creation(&a, &b, "organiser"),
            ids(&["a1", "a2", "b1", "b2"])
        );
    }

    #[test]
    fn test_confirmers_for_submitter_requires_participant() {
        let a = ids(&["a1"]);
        let b = ids(&["b1"]);

        assert_eq!(confirmers_for_submitter(&a, &b, "b1").unwrap(), a);
        assert!(matches!(
            confirmers_for_submitter(&a, &b, "organiser"),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_resolve_winner() {
        let win = parse_score("21-15,21-13").unwrap();
        assert_eq!(resolve_winner(&win, None).unwrap(), Some(Team::A));
        assert_eq!(resolve_winner(&win, Some(Team::A)).unwrap(), Some(Team::A));
        assert!(matches!(
            resolve_winner(&win, Some(Team::B)),
            Err(AppError::Validation(_))
        ));

        let draw = parse_score("21-19,19-21").unwrap();
        assert_eq!(resolve_winner(&draw, None).unwrap(), None);
        assert!(matches!(
            resolve_winner(&draw, Some(Team::A)),
            Err(AppError::Validation(_))
        ));
    }

    #[rstest]
    #[case("https://youtu.be/abc", true)]
    #[case("  https://video.example/m/1 ", true)]
    #[case("http://youtu.be/abc", false)]
    #[case("https://", false)]
    #[case("ftp://files", false)]
    fn test_validate_video_link(#[case] url: &str, #[case] valid: bool) {
        assert_eq!(validate_video_link(url).is_ok(), valid);
    }
}
