//! Typed endpoint wrappers
//!
//! Each wrapper validates its arguments locally, builds the query, dispatches
//! it and decodes the body with the client's [`Decoders`]. Validation errors
//! are returned before the dispatcher sees the call, so they never consume a
//! call identifier, an audit row or gate capacity.

use chrono::NaiveDate;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::audit::AuditLog;
use crate::config::ClientConfig;
use crate::diagnostics::{Diagnostics, TracingDiagnostics, Verbosity};
use crate::dispatcher::{Dispatcher, Params};
use crate::error::{ClientError, Result};
use crate::gate::Gate;
use crate::models::{
    Beatmap, Decoders, Difficulty, Event, GameMode, IdMode, Replay, Score, User, decode_replay,
};

/// Documented `1..=max` range of an integer parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bound {
    pub name: &'static str,
    pub max: u32,
    pub condition: &'static str,
}

impl Bound {
    fn check(self, value: u32) -> Result<()> {
        if (1..=self.max).contains(&value) {
            Ok(())
        } else {
            Err(ClientError::argument(self.name, value, self.condition))
        }
    }
}

// The upstream API documents a different ceiling per endpoint.
pub const BEATMAPS_LIMIT: Bound = Bound {
    name: "limit",
    max: 500,
    condition: "Integer[1-500]",
};
pub const SCORES_LIMIT: Bound = Bound {
    name: "limit",
    max: 100,
    condition: "Integer[1-100]",
};
pub const USER_BEST_LIMIT: Bound = Bound {
    name: "limit",
    max: 100,
    condition: "Integer[1-100]",
};
pub const USER_RECENT_LIMIT: Bound = Bound {
    name: "limit",
    max: 50,
    condition: "Integer[1-50]",
};
pub const EVENT_DAYS: Bound = Bound {
    name: "event_days",
    max: 31,
    condition: "Integer[1, 31]",
};

/// Key of the game mode parameter of `get_beatmaps`
const BEATMAPS_MODE_PARAM: &str = "mode";
/// Key of the game mode parameter of the user and score endpoints
const MODE_PARAM: &str = "m";

/// A user given by name or numeric id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRef {
    Name(String),
    Id(u64),
}

impl UserRef {
    fn param(&self) -> String {
        match self {
            UserRef::Name(name) => name.clone(),
            UserRef::Id(id) => id.to_string(),
        }
    }
}

impl From<&str> for UserRef {
    fn from(name: &str) -> Self {
        UserRef::Name(name.to_string())
    }
}

impl From<String> for UserRef {
    fn from(name: String) -> Self {
        UserRef::Name(name)
    }
}

impl From<u64> for UserRef {
    fn from(id: u64) -> Self {
        UserRef::Id(id)
    }
}

/// Filters of `get_beatmaps`
#[derive(Debug, Clone)]
pub struct BeatmapQuery {
    /// Only beatmaps ranked or loved since this date
    pub since: Option<NaiveDate>,
    pub beatmapset: Option<u64>,
    pub beatmap: Option<u64>,
    pub user: Option<UserRef>,
    /// Only sent together with `user`
    pub id_mode: Option<IdMode>,
    pub mode: Option<GameMode>,
    /// Include converted beatmaps; only sent for non-standard modes
    pub include_converted: bool,
    pub hash: Option<String>,
    pub limit: u32,
}

impl Default for BeatmapQuery {
    fn default() -> Self {
        Self {
            since: None,
            beatmapset: None,
            beatmap: None,
            user: None,
            id_mode: None,
            mode: None,
            include_converted: false,
            hash: None,
            limit: BEATMAPS_LIMIT.max,
        }
    }
}

/// Filters of `get_scores`
#[derive(Debug, Clone)]
pub struct ScoreQuery {
    pub beatmap: u64,
    pub user: Option<UserRef>,
    pub id_mode: Option<IdMode>,
    pub mode: GameMode,
    /// Only scores with exactly this mods bitmask
    pub mods: Option<u32>,
    pub limit: u32,
}

impl ScoreQuery {
    pub fn new(beatmap: u64) -> Self {
        Self {
            beatmap,
            user: None,
            id_mode: None,
            mode: GameMode::Standard,
            mods: None,
            limit: 50,
        }
    }
}

/// Builder for creating an [`OsuApi`] client
pub struct ClientBuilder<B = Beatmap, U = User, S = Score, E = Event, D = Difficulty> {
    config: ClientConfig,
    decoders: Decoders<B, U, S, E, D>,
    diagnostics: Option<Arc<dyn Diagnostics>>,
    http: Option<reqwest::Client>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    /// Create a new client builder
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            decoders: Decoders::default(),
            diagnostics: None,
            http: None,
        }
    }
}

impl<B, U, S, E, D> ClientBuilder<B, U, S, E, D> {
    /// Replace the whole configuration
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the rate gate capacity in calls per minute
    pub fn rate_per_minute(mut self, rate: i64) -> Self {
        self.config.rate_per_minute = rate;
        self
    }

    /// Set how often a waiting call re-checks a full gate
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Enable the audit log at `path`
    pub fn audit_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.audit_log = Some(path.into());
        self
    }

    /// Set the verbosity of the default diagnostics sink
    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.config.verbosity = verbosity;
        self
    }

    /// Point the client at another API root
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the transport timeout per request
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Use a custom diagnostics sink instead of `tracing`
    pub fn diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Use a preconfigured HTTP client; `request_timeout` is then ignored
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Use other record types
    pub fn decoders<B2, U2, S2, E2, D2>(
        self,
        decoders: Decoders<B2, U2, S2, E2, D2>,
    ) -> ClientBuilder<B2, U2, S2, E2, D2> {
        ClientBuilder {
            config: self.config,
            decoders,
            diagnostics: self.diagnostics,
            http: self.http,
        }
    }

    /// Build the client with the given API key
    ///
    /// Opens (or creates) the audit log if one is configured.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Io`] / [`ClientError::AuditLog`] if the audit log
    ///   cannot be opened
    /// - [`ClientError::Http`] if the HTTP client cannot be created
    pub fn build(self, key: impl Into<String>) -> Result<OsuApi<B, U, S, E, D>> {
        let diagnostics = self.diagnostics.unwrap_or_else(|| {
            Arc::new(TracingDiagnostics::new(self.config.verbosity)) as Arc<dyn Diagnostics>
        });

        let (rate, warnings) = self.config.effective_rate();
        for warning in &warnings {
            diagnostics.config_warning(warning);
        }

        let http = match self.http {
            Some(http) => http,
            None => reqwest::Client::builder()
                .timeout(self.config.request_timeout)
                .build()?,
        };

        let audit = match &self.config.audit_log {
            Some(path) => Some(AuditLog::open(path)?),
            None => None,
        };

        let dispatcher = Dispatcher::new(
            http,
            self.config.normalized_base_url(),
            key.into(),
            Gate::rate(rate, self.config.poll_interval),
            Gate::replay(self.config.poll_interval),
            audit,
            diagnostics,
        );

        tracing::debug!(
            rate,
            base_url = %self.config.normalized_base_url(),
            audit = self.config.audit_log.is_some(),
            "osu! API client ready"
        );

        Ok(OsuApi {
            dispatcher: Arc::new(dispatcher),
            decoders: self.decoders,
        })
    }
}

/// Rate-limited client for the osu! API
///
/// Cloning is cheap; clones share gates, audit log and call counter.
pub struct OsuApi<B = Beatmap, U = User, S = Score, E = Event, D = Difficulty> {
    dispatcher: Arc<Dispatcher>,
    decoders: Decoders<B, U, S, E, D>,
}

impl<B, U, S, E, D> Clone for OsuApi<B, U, S, E, D> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            decoders: self.decoders,
        }
    }
}

impl OsuApi {
    /// Create a client with default configuration
    pub fn new(key: impl Into<String>) -> Result<Self> {
        ClientBuilder::new().build(key)
    }

    /// Create a new client builder for advanced configuration
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }
}

impl<B, U, S, E, D> OsuApi<B, U, S, E, D> {
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn rate_gate(&self) -> &Gate {
        self.dispatcher.rate_gate()
    }

    pub fn replay_gate(&self) -> &Gate {
        self.dispatcher.replay_gate()
    }

    /// Identifier the next dispatched call will get
    pub fn next_call_id(&self) -> u64 {
        self.dispatcher.peek_call_id()
    }

    /// Raw call returning the decoded JSON body
    pub async fn call(&self, endpoint: &str, params: Params) -> Result<Value> {
        self.dispatcher.call(endpoint, params).await
    }

    /// Look up beatmaps
    pub async fn get_beatmaps(&self, query: BeatmapQuery) -> Result<Vec<B>> {
        BEATMAPS_LIMIT.check(query.limit)?;

        let mut params = Params::new();
        if let Some(since) = query.since {
            params.insert("since".into(), since.format("%Y-%m-%d").to_string().into());
        }
        if let Some(set) = query.beatmapset {
            params.insert("s".into(), set.to_string().into());
        }
        if let Some(beatmap) = query.beatmap {
            params.insert("b".into(), beatmap.to_string().into());
        }
        if let Some(user) = &query.user {
            params.insert("u".into(), user.param().into());
            if let Some(id_mode) = query.id_mode {
                params.insert("type".into(), id_mode.as_param().into());
            }
        }
        if let Some(mode) = query.mode {
            params.insert(BEATMAPS_MODE_PARAM.into(), mode.id().to_string().into());
            if mode != GameMode::Standard && query.include_converted {
                params.insert("a".into(), "1".into());
            }
        }
        if let Some(hash) = query.hash {
            params.insert("h".into(), hash.into());
        }
        params.insert("limit".into(), query.limit.to_string().into());

        let body = self.dispatcher.call("get_beatmaps", params).await?;
        decode_list(body, |item| self.decoders.build_beatmap(item))
    }

    /// Look up a user profile
    ///
    /// `event_days` of `None` means 1.
    pub async fn get_user(
        &self,
        user: impl Into<UserRef>,
        mode: GameMode,
        id_mode: Option<IdMode>,
        event_days: Option<u32>,
    ) -> Result<U> {
        let event_days = event_days.unwrap_or(1);
        EVENT_DAYS.check(event_days)?;

        let mut params = user_params(user.into(), mode, id_mode);
        params.insert("event_days".into(), event_days.to_string().into());

        let body = self.dispatcher.call("get_user", params).await?;
        let first = first_item(body, "get_user")?;
        self.decoders.build_user(first)
    }

    /// Top scores on a beatmap
    pub async fn get_scores(&self, query: ScoreQuery) -> Result<Vec<S>> {
        SCORES_LIMIT.check(query.limit)?;

        let mut params = Params::new();
        params.insert("b".into(), query.beatmap.to_string().into());
        if let Some(user) = &query.user {
            params.insert("u".into(), user.param().into());
            if let Some(id_mode) = query.id_mode {
                params.insert("type".into(), id_mode.as_param().into());
            }
        }
        params.insert(MODE_PARAM.into(), query.mode.id().to_string().into());
        if let Some(mods) = query.mods {
            params.insert("mods".into(), mods.to_string().into());
        }
        params.insert("limit".into(), query.limit.to_string().into());

        let body = self.dispatcher.call("get_scores", params).await?;
        decode_list(body, self.decoders.score)
    }

    /// Best performance scores of a user
    pub async fn get_user_best(
        &self,
        user: impl Into<UserRef>,
        mode: GameMode,
        id_mode: Option<IdMode>,
        limit: u32,
    ) -> Result<Vec<S>> {
        USER_BEST_LIMIT.check(limit)?;

        let mut params = user_params(user.into(), mode, id_mode);
        params.insert("limit".into(), limit.to_string().into());

        let body = self.dispatcher.call("get_user_best", params).await?;
        decode_list(body, self.decoders.score)
    }

    /// Plays of a user in the last 24 hours
    pub async fn get_user_recent(
        &self,
        user: impl Into<UserRef>,
        mode: GameMode,
        id_mode: Option<IdMode>,
        limit: u32,
    ) -> Result<Vec<S>> {
        USER_RECENT_LIMIT.check(limit)?;

        let mut params = user_params(user.into(), mode, id_mode);
        params.insert("limit".into(), limit.to_string().into());

        let body = self.dispatcher.call("get_user_recent", params).await?;
        decode_list(body, self.decoders.score)
    }

    /// Replay of a user's play on a beatmap
    ///
    /// Goes through the replay gate as well as the rate gate.
    pub async fn get_replay(
        &self,
        beatmap: u64,
        user: impl Into<UserRef>,
        mode: GameMode,
        id_mode: Option<IdMode>,
        mods: Option<u32>,
    ) -> Result<Replay> {
        let mut params = user_params(user.into(), mode, id_mode);
        params.insert("b".into(), beatmap.to_string().into());
        if let Some(mods) = mods {
            params.insert("mods".into(), mods.to_string().into());
        }

        let body = self.dispatcher.call_replay("get_replay", params).await?;
        decode_replay(body)
    }
}

impl<B, U, S, E, D> std::fmt::Debug for OsuApi<B, U, S, E, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OsuApi")
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

fn user_params(user: UserRef, mode: GameMode, id_mode: Option<IdMode>) -> Params {
    let mut params = Params::new();
    params.insert("u".into(), user.param().into());
    params.insert(MODE_PARAM.into(), mode.id().to_string().into());
    if let Some(id_mode) = id_mode {
        params.insert("type".into(), id_mode.as_param().into());
    }
    params
}

fn decode_list<T>(body: Value, decode: impl FnMut(Value) -> Result<T>) -> Result<Vec<T>> {
    match body {
        Value::Array(items) => items.into_iter().map(decode).collect(),
        other => Err(ClientError::InvalidResponse(format!(
            "expected a JSON array, found {other}"
        ))),
    }
}

fn first_item(body: Value, endpoint: &str) -> Result<Value> {
    match body {
        Value::Array(items) => items.into_iter().next().ok_or_else(|| {
            ClientError::InvalidResponse(format!("{endpoint} returned no results"))
        }),
        other => Err(ClientError::InvalidResponse(format!(
            "expected a JSON array, found {other}"
        ))),
    }
}
