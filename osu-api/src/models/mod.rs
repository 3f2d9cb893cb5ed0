//! Records returned by the API and the decoders that build them
//!
//! The client never constructs records itself. It hands raw JSON to a
//! [`Decoders`] table given at construction, so callers can substitute their
//! own record types per entity kind, nested kinds (a user's events, a
//! beatmap's difficulty) included:
//!
//! ```ignore
//! fn my_event(value: serde_json::Value) -> osu_api::Result<MyEvent> { /* ... */ }
//!
//! let api = OsuApi::builder()
//!     .decoders(Decoders {
//!         beatmap: decode_beatmap,
//!         difficulty: decode_difficulty,
//!         user: decode_user,
//!         event: my_event,
//!         score: decode_score,
//!     })
//!     .build(key)?;
//! // api.get_user(..) now returns User<MyEvent>
//! ```

pub mod beatmap;
pub mod de;
pub mod replay;
pub mod score;
pub mod user;

pub use beatmap::{ApprovalStatus, Beatmap, Difficulty};
pub use replay::Replay;
pub use score::Score;
pub use user::{Event, HitCounts, RankCounts, User};

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{ClientError, Result};

/// Game mode (`m` parameter)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GameMode {
    #[default]
    Standard,
    Taiko,
    CatchTheBeat,
    Mania,
}

impl GameMode {
    /// Wire value
    pub fn id(self) -> u8 {
        match self {
            GameMode::Standard => 0,
            GameMode::Taiko => 1,
            GameMode::CatchTheBeat => 2,
            GameMode::Mania => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            GameMode::Standard => "Standard",
            GameMode::Taiko => "Taiko",
            GameMode::CatchTheBeat => "CtB",
            GameMode::Mania => "Mania",
        }
    }
}

impl TryFrom<i64> for GameMode {
    type Error = ClientError;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            0 => Ok(GameMode::Standard),
            1 => Ok(GameMode::Taiko),
            2 => Ok(GameMode::CatchTheBeat),
            3 => Ok(GameMode::Mania),
            _ => Err(ClientError::argument("mode", value, "Integer[0, 3]")),
        }
    }
}

impl FromStr for GameMode {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| ClientError::argument("mode", s, "Integer[0, 3]"))?;
        GameMode::try_from(value)
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the `u` parameter is interpreted (`type` parameter)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdMode {
    /// `u` is a username
    String,
    /// `u` is a numeric user id
    Id,
}

impl IdMode {
    pub fn as_param(self) -> &'static str {
        match self {
            IdMode::String => "string",
            IdMode::Id => "id",
        }
    }
}

impl FromStr for IdMode {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "string" => Ok(IdMode::String),
            "id" => Ok(IdMode::Id),
            _ => Err(ClientError::argument(
                "IDMode",
                s,
                r#"("string", "id", None)"#,
            )),
        }
    }
}

/// Table of per-kind decoders from raw JSON to records
///
/// Composite records are assembled from their parts: the `difficulty`
/// decoder reads the attributes of a beatmap object and the `beatmap`
/// decoder receives the result, while each entry of a user's `events` array
/// goes through `event` before `user` receives the list.
pub struct Decoders<B = Beatmap, U = User, S = Score, E = Event, D = Difficulty> {
    pub beatmap: fn(Value, D) -> Result<B>,
    pub difficulty: fn(Value) -> Result<D>,
    pub user: fn(Value, Vec<E>) -> Result<U>,
    pub event: fn(Value) -> Result<E>,
    pub score: fn(Value) -> Result<S>,
}

impl<B, U, S, E, D> Decoders<B, U, S, E, D> {
    /// Decode one entry of a `get_beatmaps` response
    pub fn build_beatmap(&self, value: Value) -> Result<B> {
        let difficulty = (self.difficulty)(value.clone())?;
        (self.beatmap)(value, difficulty)
    }

    /// Decode a `get_user` result, events included
    pub fn build_user(&self, mut value: Value) -> Result<U> {
        let events: Vec<Value> = match value.as_object_mut().and_then(|o| o.remove("events")) {
            None | Some(Value::Null) => Vec::new(),
            Some(events) => serde_json::from_value(events)
                .map_err(|source| ClientError::Decode { kind: "event", source })?,
        };
        let events = events
            .into_iter()
            .map(self.event)
            .collect::<Result<Vec<_>>>()?;
        (self.user)(value, events)
    }
}

impl<B, U, S, E, D> Clone for Decoders<B, U, S, E, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B, U, S, E, D> Copy for Decoders<B, U, S, E, D> {}

impl Default for Decoders {
    fn default() -> Self {
        Self {
            beatmap: decode_beatmap,
            difficulty: decode_difficulty,
            user: decode_user,
            event: decode_event,
            score: decode_score,
        }
    }
}

impl<B, U, S, E, D> fmt::Debug for Decoders<B, U, S, E, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoders").finish_non_exhaustive()
    }
}

fn decode<T: DeserializeOwned>(kind: &'static str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|source| ClientError::Decode { kind, source })
}

fn invalid(kind: &'static str, message: String) -> ClientError {
    ClientError::Decode {
        kind,
        source: serde::de::Error::custom(message),
    }
}

/// Beatmap fields other than the difficulty attributes
pub fn decode_beatmap<D>(value: Value, difficulty: D) -> Result<Beatmap<D>> {
    let raw: beatmap::RawBeatmap = decode("beatmap", value)?;
    Ok(raw.with_difficulty(difficulty))
}

pub fn decode_difficulty(value: Value) -> Result<Difficulty> {
    decode("difficulty", value)
}

/// User fields other than the events
pub fn decode_user<E>(value: Value, events: Vec<E>) -> Result<User<E>> {
    let raw: user::RawUser = decode("user", value)?;
    raw.with_events(events).map_err(|message| invalid("user", message))
}

pub fn decode_event(value: Value) -> Result<Event> {
    decode("event", value)
}

pub fn decode_score(value: Value) -> Result<Score> {
    decode("score", value)
}

pub fn decode_replay(value: Value) -> Result<Replay> {
    decode("replay", value)
}
