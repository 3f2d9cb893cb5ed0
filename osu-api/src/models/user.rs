use serde::Deserialize;
use std::fmt;

use super::de;

/// Hit judgement totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HitCounts {
    pub count300: u64,
    pub count100: u64,
    pub count50: u64,
}

/// Number of plays per grade
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RankCounts {
    pub ss: u64,
    pub ssh: u64,
    pub s: u64,
    pub sh: u64,
    pub a: u64,
}

/// Recent notable activity of a user
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Event {
    pub display_html: String,
    #[serde(default, deserialize_with = "de::optional")]
    pub beatmap_id: Option<u64>,
    #[serde(default, deserialize_with = "de::optional")]
    pub beatmapset_id: Option<u64>,
    pub date: String,
    /// 1 to 32; how remarkable the event is
    #[serde(rename = "epicfactor", deserialize_with = "de::parsed")]
    pub epic_factor: u32,
}

/// A player profile, as returned by `get_user`
///
/// Stats are `None` for accounts that have not played the requested mode.
/// `E` is the record type the client's event decoder produces.
#[derive(Debug, Clone, PartialEq)]
pub struct User<E = Event> {
    pub id: u64,
    pub username: String,
    pub hit_counts: Option<HitCounts>,
    pub playcount: Option<u64>,
    pub ranked_score: Option<u64>,
    pub total_score: Option<u64>,
    pub level: Option<f64>,
    pub rank: Option<u64>,
    pub pp: Option<f64>,
    /// Between 0 and 1
    pub accuracy: Option<f64>,
    pub rank_counts: Option<RankCounts>,
    pub country: String,
    pub country_rank: Option<u64>,
    pub events: Vec<E>,
}

impl<E> fmt::Display for User<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.username, self.id)
    }
}

/// `get_user` entry as sent, minus its events
#[derive(Deserialize)]
pub(crate) struct RawUser {
    #[serde(deserialize_with = "de::parsed")]
    user_id: u64,
    username: String,
    #[serde(default, deserialize_with = "de::optional")]
    count300: Option<u64>,
    #[serde(default, deserialize_with = "de::optional")]
    count100: Option<u64>,
    #[serde(default, deserialize_with = "de::optional")]
    count50: Option<u64>,
    #[serde(default, deserialize_with = "de::optional")]
    playcount: Option<u64>,
    #[serde(default, deserialize_with = "de::optional")]
    ranked_score: Option<u64>,
    #[serde(default, deserialize_with = "de::optional")]
    total_score: Option<u64>,
    #[serde(default, deserialize_with = "de::optional")]
    pp_rank: Option<u64>,
    #[serde(default, deserialize_with = "de::optional")]
    level: Option<f64>,
    #[serde(default, deserialize_with = "de::optional")]
    pp_raw: Option<f64>,
    #[serde(default, deserialize_with = "de::optional")]
    accuracy: Option<f64>,
    #[serde(default, deserialize_with = "de::optional")]
    count_rank_ss: Option<u64>,
    #[serde(default, deserialize_with = "de::optional")]
    count_rank_ssh: Option<u64>,
    #[serde(default, deserialize_with = "de::optional")]
    count_rank_s: Option<u64>,
    #[serde(default, deserialize_with = "de::optional")]
    count_rank_sh: Option<u64>,
    #[serde(default, deserialize_with = "de::optional")]
    count_rank_a: Option<u64>,
    country: String,
    #[serde(default, deserialize_with = "de::optional")]
    pp_country_rank: Option<u64>,
}

impl RawUser {
    pub(crate) fn with_events<E>(self, events: Vec<E>) -> Result<User<E>, String> {
        let hit_counts = match (self.count300, self.count100, self.count50) {
            (Some(count300), Some(count100), Some(count50)) => Some(HitCounts {
                count300,
                count100,
                count50,
            }),
            (None, None, None) => None,
            _ => return Err("hit counts are only partially present".to_string()),
        };

        let rank_counts = match (
            self.count_rank_ss,
            self.count_rank_ssh,
            self.count_rank_s,
            self.count_rank_sh,
            self.count_rank_a,
        ) {
            (Some(ss), Some(ssh), Some(s), Some(sh), Some(a)) => {
                Some(RankCounts { ss, ssh, s, sh, a })
            }
            (None, None, None, None, None) => None,
            _ => return Err("rank counts are only partially present".to_string()),
        };

        Ok(User {
            id: self.user_id,
            username: self.username,
            hit_counts,
            playcount: self.playcount,
            ranked_score: self.ranked_score,
            total_score: self.total_score,
            level: self.level,
            rank: self.pp_rank,
            pp: self.pp_raw,
            accuracy: self.accuracy.map(|percent| percent / 100.0),
            rank_counts,
            country: self.country,
            country_rank: self.pp_country_rank,
            events,
        })
    }
}
