use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use uuid::Uuid;

use super::models::RatingColumn;

/// Time window for rating history series
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr)]
pub enum SeriesRange {
    #[serde(rename = "1D")]
    #[strum(serialize = "1D")]
    OneDay,
    #[serde(rename = "1W")]
    #[strum(serialize = "1W")]
    OneWeek,
    #[default]
    #[serde(rename = "1M")]
    #[strum(serialize = "1M")]
    OneMonth,
    #[serde(rename = "YTD")]
    #[strum(serialize = "YTD")]
    YearToDate,
    #[serde(rename = "ALL")]
    #[strum(serialize = "ALL")]
    All,
}

impl SeriesRange {
    /// Start of the window relative to `now`, `None` for all time
    pub fn since(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            SeriesRange::OneDay => Some(now - chrono::Duration::days(1)),
            SeriesRange::OneWeek => Some(now - chrono::Duration::weeks(1)),
            SeriesRange::OneMonth => Some(now - chrono::Duration::days(30)),
            SeriesRange::YearToDate => Utc.with_ymd_and_hms(now.year(), 1, 1, 0, 0, 0).single(),
            SeriesRange::All => None,
        }
    }
}

/// Query string for rank lookups
#[derive(Debug, Default, Deserialize)]
pub struct RankQuery {
    #[serde(default)]
    pub discipline: RatingColumn,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PlayerRankResponse {
    pub auth_id: String,
    pub discipline: RatingColumn,
    pub rating: Option<i32>,
    pub rank: Option<u64>,
}

/// Query string for leaderboards
#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default)]
    pub discipline: RatingColumn,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardEntry {
    pub rank: u64,
    pub auth_id: String,
    pub username: String,
    pub gender: Option<String>,
    pub rating: i32,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardResponse {
    pub gender: String,
    pub discipline: RatingColumn,
    pub leaders: Vec<LeaderboardEntry>,
}

/// Query string for rating series
#[derive(Debug, Default, Deserialize)]
pub struct RatingSeriesQuery {
    #[serde(default)]
    pub discipline: Option<RatingColumn>,
    #[serde(default)]
    pub range: SeriesRange,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct RatingPoint {
    pub match_id: Uuid,
    pub played_at: DateTime<Utc>,
    pub rating: i32,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct RatingSeriesResponse {
    pub auth_id: String,
    pub discipline: RatingColumn,
    pub range: SeriesRange,
    pub points: Vec<RatingPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_range_parsing() {
        assert_eq!("1W".parse::<SeriesRange>().unwrap(), SeriesRange::OneWeek);
        assert_eq!("YTD".parse::<SeriesRange>().unwrap(), SeriesRange::YearToDate);
        assert!("2Y".parse::<SeriesRange>().is_err());
        assert_eq!(
            serde_json::from_str::<SeriesRange>("\"ALL\"").unwrap(),
            SeriesRange::All
        );
    }

    #[test]
    fn test_series_range_since() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
        assert_eq!(SeriesRange::All.since(now), None);
        assert_eq!(
            SeriesRange::OneDay.since(now),
            Some(Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap())
        );
        assert_eq!(
            SeriesRange::YearToDate.since(now),
            Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap())
        );
    }
}
