use serde::Deserialize;

use super::de;

/// A play on a beatmap
///
/// `get_scores` fills `score_id`, `username` and `replay_available`;
/// `get_user_best` and `get_user_recent` fill `beatmap_id` instead.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Score {
    #[serde(default, deserialize_with = "de::optional")]
    pub score_id: Option<u64>,
    #[serde(default, deserialize_with = "de::optional")]
    pub beatmap_id: Option<u64>,
    #[serde(deserialize_with = "de::parsed")]
    pub score: u64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(deserialize_with = "de::parsed")]
    pub user_id: u64,
    #[serde(rename = "maxcombo", deserialize_with = "de::parsed")]
    pub max_combo: u32,
    #[serde(deserialize_with = "de::parsed")]
    pub count300: u32,
    #[serde(deserialize_with = "de::parsed")]
    pub count100: u32,
    #[serde(deserialize_with = "de::parsed")]
    pub count50: u32,
    #[serde(rename = "countmiss", deserialize_with = "de::parsed")]
    pub count_miss: u32,
    #[serde(rename = "countkatu", deserialize_with = "de::parsed")]
    pub count_katu: u32,
    #[serde(rename = "countgeki", deserialize_with = "de::parsed")]
    pub count_geki: u32,
    /// Full combo
    #[serde(deserialize_with = "de::flag")]
    pub perfect: bool,
    /// Raw mods bitmask
    #[serde(deserialize_with = "de::parsed")]
    pub enabled_mods: u32,
    pub date: String,
    /// Grade letter, `F` for a failed recent play
    pub rank: String,
    #[serde(default, deserialize_with = "de::optional")]
    pub pp: Option<f64>,
    #[serde(default, deserialize_with = "de::optional_flag")]
    pub replay_available: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_leaderboard_score() {
        let score: Score = serde_json::from_value(json!({
            "score_id": "7",
            "score": "1234567",
            "username": "peppy",
            "maxcombo": "899",
            "count50": "0",
            "count100": "4",
            "count300": "600",
            "countmiss": "0",
            "countkatu": "3",
            "countgeki": "120",
            "perfect": "1",
            "enabled_mods": "72",
            "user_id": "2",
            "date": "2018-09-01 08:00:00",
            "rank": "SH",
            "pp": "310.2",
            "replay_available": "1"
        }))
        .unwrap();

        assert_eq!(score.score_id, Some(7));
        assert_eq!(score.beatmap_id, None);
        assert!(score.perfect);
        assert_eq!(score.enabled_mods, 72);
        assert_eq!(score.replay_available, Some(true));
    }

    #[test]
    fn test_decode_recent_score() {
        let score: Score = serde_json::from_value(json!({
            "beatmap_id": "252002",
            "score": "1000",
            "maxcombo": "12",
            "count50": "1",
            "count100": "2",
            "count300": "3",
            "countmiss": "9",
            "countkatu": "0",
            "countgeki": "0",
            "perfect": "0",
            "enabled_mods": "0",
            "user_id": "2",
            "date": "2018-09-01 08:00:00",
            "rank": "F"
        }))
        .unwrap();

        assert_eq!(score.beatmap_id, Some(252002));
        assert_eq!(score.username, None);
        assert_eq!(score.pp, None);
        assert!(!score.perfect);
    }
}
