use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use super::GameMode;
use super::de;

const GENRE_NAMES: [&str; 15] = [
    "Any",
    "Unspecified",
    "Video Game",
    "Anime",
    "Rock",
    "Pop",
    "Other",
    "Novelty",
    "Unknown",
    "Hip Hop",
    "Electronic",
    "Metal",
    "Classical",
    "Folk",
    "Jazz",
];

const LANGUAGE_NAMES: [&str; 15] = [
    "Any",
    "Other",
    "English",
    "Japanese",
    "Chinese",
    "Instrumental",
    "Korean",
    "French",
    "German",
    "Swedish",
    "Spanish",
    "Italian",
    "Russian",
    "Polish",
    "Other",
];

/// Ranking state of a beatmap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalStatus {
    Graveyard,
    Wip,
    Pending,
    Ranked,
    Approved,
    Qualified,
    Loved,
}

impl ApprovalStatus {
    pub fn name(self) -> &'static str {
        match self {
            ApprovalStatus::Graveyard => "Graveyard",
            ApprovalStatus::Wip => "WIP",
            ApprovalStatus::Pending => "Pending",
            ApprovalStatus::Ranked => "Ranked",
            ApprovalStatus::Approved => "Approved",
            ApprovalStatus::Qualified => "Qualified",
            ApprovalStatus::Loved => "Loved",
        }
    }
}

impl FromStr for ApprovalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "-2" => Ok(ApprovalStatus::Graveyard),
            "-1" => Ok(ApprovalStatus::Wip),
            "0" => Ok(ApprovalStatus::Pending),
            "1" => Ok(ApprovalStatus::Ranked),
            "2" => Ok(ApprovalStatus::Approved),
            "3" => Ok(ApprovalStatus::Qualified),
            "4" => Ok(ApprovalStatus::Loved),
            other => Err(format!("unknown approval status {other}")),
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Difficulty attributes of a beatmap
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Difficulty {
    #[serde(deserialize_with = "de::parsed")]
    pub bpm: f64,
    #[serde(rename = "difficultyrating", deserialize_with = "de::parsed")]
    pub stars: f64,
    #[serde(rename = "diff_size", deserialize_with = "de::parsed")]
    pub cs: f64,
    #[serde(rename = "diff_overall", deserialize_with = "de::parsed")]
    pub od: f64,
    #[serde(rename = "diff_approach", deserialize_with = "de::parsed")]
    pub ar: f64,
    #[serde(rename = "diff_drain", deserialize_with = "de::parsed")]
    pub hp: f64,
    /// Seconds from first to last note, breaks included
    #[serde(rename = "total_length", deserialize_with = "de::parsed")]
    pub length: u32,
    /// Seconds from first to last note, breaks excluded
    #[serde(rename = "hit_length", deserialize_with = "de::parsed")]
    pub drain: u32,
    #[serde(default, deserialize_with = "de::optional")]
    pub max_combo: Option<u32>,
}

/// One difficulty of a beatmap set, as returned by `get_beatmaps`
///
/// `D` is the record type the client's difficulty decoder produces.
#[derive(Debug, Clone, PartialEq)]
pub struct Beatmap<D = Difficulty> {
    pub approved: ApprovalStatus,
    pub approved_date: Option<String>,
    pub last_update: String,
    pub artist: String,
    pub beatmap_id: u64,
    pub beatmapset_id: u64,
    pub creator: String,
    pub creator_id: u64,
    pub difficulty: D,
    pub source: String,
    pub genre_id: usize,
    pub language_id: usize,
    pub title: String,
    /// Difficulty name
    pub version: String,
    pub file_md5: String,
    pub mode: GameMode,
    pub tags: Vec<String>,
    pub favourites: u64,
    pub playcount: u64,
    pub passcount: u64,
}

/// `get_beatmaps` entry as sent, minus its difficulty attributes
#[derive(Deserialize)]
pub(crate) struct RawBeatmap {
    #[serde(deserialize_with = "de::parsed")]
    approved: ApprovalStatus,
    approved_date: Option<String>,
    last_update: String,
    artist: String,
    #[serde(deserialize_with = "de::parsed")]
    beatmap_id: u64,
    #[serde(deserialize_with = "de::parsed")]
    beatmapset_id: u64,
    creator: String,
    #[serde(deserialize_with = "de::parsed")]
    creator_id: u64,
    source: String,
    #[serde(deserialize_with = "de::parsed")]
    genre_id: usize,
    #[serde(deserialize_with = "de::parsed")]
    language_id: usize,
    title: String,
    version: String,
    file_md5: String,
    #[serde(deserialize_with = "de::parsed")]
    mode: GameMode,
    #[serde(deserialize_with = "de::tags")]
    tags: Vec<String>,
    #[serde(rename = "favourite_count", deserialize_with = "de::parsed")]
    favourites: u64,
    #[serde(deserialize_with = "de::parsed")]
    playcount: u64,
    #[serde(deserialize_with = "de::parsed")]
    passcount: u64,
}

impl RawBeatmap {
    pub(crate) fn with_difficulty<D>(self, difficulty: D) -> Beatmap<D> {
        Beatmap {
            approved: self.approved,
            approved_date: self.approved_date,
            last_update: self.last_update,
            artist: self.artist,
            beatmap_id: self.beatmap_id,
            beatmapset_id: self.beatmapset_id,
            creator: self.creator,
            creator_id: self.creator_id,
            difficulty,
            source: self.source,
            genre_id: self.genre_id,
            language_id: self.language_id,
            title: self.title,
            version: self.version,
            file_md5: self.file_md5,
            mode: self.mode,
            tags: self.tags,
            favourites: self.favourites,
            playcount: self.playcount,
            passcount: self.passcount,
        }
    }
}

impl<D> Beatmap<D> {
    pub fn genre(&self) -> &'static str {
        GENRE_NAMES.get(self.genre_id).copied().unwrap_or("Unknown")
    }

    pub fn language(&self) -> &'static str {
        LANGUAGE_NAMES
            .get(self.language_id)
            .copied()
            .unwrap_or("Unknown")
    }
}

impl<D> fmt::Display for Beatmap<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}/{})",
            self.title, self.beatmap_id, self.beatmapset_id
        )
    }
}
