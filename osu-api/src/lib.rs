//! # osu-api
//!
//! Async client for the osu! API v1 that makes it hard to exceed the
//! server's rate limit by accident.
//!
//! ## Overview
//!
//! Every request goes through one [`Dispatcher`], which
//! - waits on a rate gate allowing `rate_per_minute` calls in any rolling
//!   60 second window (and on a separate 10-per-10-seconds replay gate for
//!   `get_replay`)
//! - sends the request and turns `{"error": ...}` bodies into
//!   [`ClientError::Api`]
//! - optionally appends one row per call to an audit log, even when the call
//!   fails or the process dies mid-call
//!
//! Nothing is cached and nothing is retried.
//!
//! ## Quick Start
//!
//! ```no_run
//! use osu_api::{GameMode, OsuApi};
//!
//! # async fn run() -> osu_api::Result<()> {
//! let api = OsuApi::builder()
//!     .rate_per_minute(60)
//!     .audit_log("osu-calls.log")
//!     .build("my-api-key")?;
//!
//! let user = api.get_user("peppy", GameMode::Standard, None, None).await?;
//! println!("{} has {:?}pp", user, user.pp);
//! # Ok(())
//! # }
//! ```
//!
//! ## Errors
//!
//! - [`ClientError::Argument`]: a parameter is outside its documented range;
//!   raised before anything is sent or logged
//! - [`ClientError::Api`]: the server reported an error
//! - [`ClientError::Http`] / [`ClientError::Json`]: the transport failed or the
//!   body was not JSON
//!
//! ## Audit log format
//!
//! See [`audit`] for the row layout and crash recovery rules.

pub mod audit;
pub mod client;
pub mod config;
pub mod diagnostics;
pub mod dispatcher;
pub mod error;
pub mod gate;
pub mod models;

pub use audit::{AuditLog, AuditRow};
pub use client::{BeatmapQuery, ClientBuilder, OsuApi, ScoreQuery, UserRef};
pub use config::ClientConfig;
pub use diagnostics::{
    DiagnosticEvent, Diagnostics, GateKind, MemoryDiagnostics, TracingDiagnostics, Verbosity,
};
pub use dispatcher::{Dispatcher, Params};
pub use error::{ClientError, Result};
pub use gate::{Gate, Reservation};
pub use models::{
    ApprovalStatus, Beatmap, Decoders, Difficulty, Event, GameMode, IdMode, Replay, Score, User,
};
