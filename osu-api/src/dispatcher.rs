//! The single choke point for outbound requests
//!
//! Every call goes through [`Dispatcher::call`] (or
//! [`Dispatcher::call_replay`]), which:
//!
//! 1. takes the next call identifier, from the audit log when one is
//!    configured (the identifier is only consumed once the row prefix is
//!    written)
//! 2. writes the audit row prefix, if an audit log is configured
//! 3. waits on the replay gate (replay calls only), then on the rate gate
//! 4. sends `GET <base>/<endpoint>?<params>&k=<key>`
//! 5. decodes the body as JSON and turns an `error` body into
//!    [`ClientError::Api`]
//! 6. finalises the audit row on every exit path
//!
//! Nothing is retried. Errors reach the caller as they happened. Calls hold
//! no lock while in flight, so concurrent calls overlap whether or not they
//! are audited.

use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;
use tokio::time::Instant;

use crate::audit::{AuditLog, AuditRecord};
use crate::diagnostics::{Diagnostics, GateKind};
use crate::error::{ClientError, Result};
use crate::gate::Gate;

/// Query parameters of a call, keyed by their wire name
pub type Params = serde_json::Map<String, Value>;

/// Name of the query parameter carrying the API key
const KEY_PARAM: &str = "k";

pub struct Dispatcher {
    http: Client,
    base_url: String,
    key: String,
    rate_gate: Gate,
    replay_gate: Gate,
    audit: Option<AuditLog>,
    next_call_id: AtomicU64,
    diagnostics: Arc<dyn Diagnostics>,
}

impl Dispatcher {
    /// Assemble a dispatcher
    ///
    /// With an audit log, call identifiers continue from the log. Without
    /// one they start at 0.
    pub fn new(
        http: Client,
        base_url: String,
        key: String,
        rate_gate: Gate,
        replay_gate: Gate,
        audit: Option<AuditLog>,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Self {
        Self {
            http,
            base_url,
            key,
            rate_gate,
            replay_gate,
            audit,
            next_call_id: AtomicU64::new(0),
            diagnostics,
        }
    }

    pub fn rate_gate(&self) -> &Gate {
        &self.rate_gate
    }

    pub fn replay_gate(&self) -> &Gate {
        &self.replay_gate
    }

    pub fn audit_log(&self) -> Option<&AuditLog> {
        self.audit.as_ref()
    }

    /// Identifier the next call will get
    pub fn peek_call_id(&self) -> u64 {
        match &self.audit {
            Some(log) => log.next_call_id(),
            None => self.next_call_id.load(Ordering::SeqCst),
        }
    }

    /// Dispatch a call through the rate gate
    pub async fn call(&self, endpoint: &str, params: Params) -> Result<Value> {
        self.dispatch(endpoint, params, false).await
    }

    /// Dispatch a call through the replay gate and then the rate gate
    pub async fn call_replay(&self, endpoint: &str, params: Params) -> Result<Value> {
        self.dispatch(endpoint, params, true).await
    }

    async fn dispatch(&self, endpoint: &str, params: Params, replay: bool) -> Result<Value> {
        let mut record = match &self.audit {
            Some(log) => Some(log.begin(SystemTime::now(), endpoint, &params)?),
            None => None,
        };
        let call_id = match &record {
            Some(record) => record.call_id(),
            None => self.next_call_id.fetch_add(1, Ordering::SeqCst),
        };

        let result = self
            .execute(call_id, endpoint, &params, replay, record.as_mut())
            .await;

        if let Err(e) = &result {
            self.diagnostics
                .call_failed(call_id, endpoint, &e.to_string());
        }

        // Writes the audit suffix
        drop(record);

        result
    }

    async fn execute(
        &self,
        call_id: u64,
        endpoint: &str,
        params: &Params,
        replay: bool,
        record: Option<&mut AuditRecord>,
    ) -> Result<Value> {
        if replay {
            self.admit(&self.replay_gate, GateKind::Replay, endpoint, call_id)
                .await;
        }
        self.admit(&self.rate_gate, GateKind::Rate, endpoint, call_id)
            .await;

        self.diagnostics.call_started(call_id, endpoint);
        let started = Instant::now();

        let response = self
            .http
            .get(format!("{}{}", self.base_url, endpoint))
            .query(&query_pairs(params))
            .query(&[(KEY_PARAM, self.key.as_str())])
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = response.status().as_u16();
        let elapsed = started.elapsed();
        if let Some(record) = record {
            record.record_response(status, elapsed);
        }
        self.diagnostics
            .call_finished(call_id, endpoint, status, elapsed);

        let body = response
            .bytes()
            .await
            .map_err(reqwest::Error::without_url)?;
        let value: Value = serde_json::from_slice(&body)?;

        if let Some(error) = value.get("error") {
            let message = match error {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return Err(ClientError::Api {
                endpoint: endpoint.to_string(),
                message,
            });
        }

        Ok(value)
    }

    async fn admit(&self, gate: &Gate, kind: GateKind, endpoint: &str, call_id: u64) {
        if gate.is_saturated() {
            self.diagnostics
                .gate_saturated(kind, endpoint, call_id, gate.time_until_free());
        }
        gate.acquire().await;
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("base_url", &self.base_url)
            .field("key", &"<redacted>")
            .field("rate_gate", &self.rate_gate)
            .field("replay_gate", &self.replay_gate)
            .field("audit", &self.audit)
            .field("next_call_id", &self.peek_call_id())
            .finish()
    }
}

fn query_pairs(params: &Params) -> Vec<(&str, String)> {
    params
        .iter()
        .map(|(name, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (name.as_str(), value)
        })
        .collect()
}
