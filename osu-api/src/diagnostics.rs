//! Diagnostics sink for the client
//!
//! The client never touches a process-wide logger directly. Every notable
//! event goes through a [`Diagnostics`] implementation handed to the client at
//! construction, so its lifetime is that of the client instance.
//!
//! [`TracingDiagnostics`] is the default and forwards events to `tracing`.
//! [`MemoryDiagnostics`] keeps them in memory, which is what tests inspect.

use parking_lot::Mutex;
use serde::Deserialize;
use std::time::Duration;

/// How chatty the default sink is
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Configuration warnings only
    Quiet,
    /// Warnings plus gate saturation notices
    #[default]
    Normal,
    /// Everything, including per-call start/finish events
    Verbose,
}

impl std::str::FromStr for Verbosity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "quiet" => Ok(Verbosity::Quiet),
            "normal" => Ok(Verbosity::Normal),
            "verbose" => Ok(Verbosity::Verbose),
            _ => Err(format!(
                "Invalid verbosity: {s}. Valid options are: quiet, normal, verbose"
            )),
        }
    }
}

/// Which gate a saturation notice refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateKind {
    Rate,
    Replay,
}

impl std::fmt::Display for GateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateKind::Rate => f.write_str("rate"),
            GateKind::Replay => f.write_str("replay"),
        }
    }
}

/// Receiver for client diagnostics
///
/// Implementations must not block; they are called from inside the dispatch
/// path. None of the arguments ever carry the API key.
pub trait Diagnostics: Send + Sync {
    /// A configuration value was accepted with a caveat or coerced
    fn config_warning(&self, message: &str);

    /// A call is about to wait on a full gate
    fn gate_saturated(&self, gate: GateKind, endpoint: &str, call_id: u64, wait: Duration);

    /// A call passed its gates and is about to hit the network
    fn call_started(&self, call_id: u64, endpoint: &str);

    /// A response was received
    fn call_finished(&self, call_id: u64, endpoint: &str, status: u16, elapsed: Duration);

    /// The call ended with an error
    fn call_failed(&self, call_id: u64, endpoint: &str, error: &str);
}

/// Default sink forwarding to `tracing`
#[derive(Debug, Clone, Default)]
pub struct TracingDiagnostics {
    verbosity: Verbosity,
}

impl TracingDiagnostics {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }
}

impl Diagnostics for TracingDiagnostics {
    fn config_warning(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn gate_saturated(&self, gate: GateKind, endpoint: &str, call_id: u64, wait: Duration) {
        if self.verbosity >= Verbosity::Normal {
            tracing::info!(
                %gate,
                endpoint,
                call_id = format_args!("{call_id:x}"),
                wait_secs = wait.as_secs_f64(),
                "Gate saturated, waiting for capacity"
            );
        }
    }

    fn call_started(&self, call_id: u64, endpoint: &str) {
        if self.verbosity >= Verbosity::Verbose {
            tracing::debug!(call_id = format_args!("{call_id:x}"), endpoint, "Dispatching");
        }
    }

    fn call_finished(&self, call_id: u64, endpoint: &str, status: u16, elapsed: Duration) {
        if self.verbosity >= Verbosity::Verbose {
            tracing::debug!(
                call_id = format_args!("{call_id:x}"),
                endpoint,
                status,
                elapsed_secs = elapsed.as_secs_f64(),
                "Response received"
            );
        }
    }

    fn call_failed(&self, call_id: u64, endpoint: &str, error: &str) {
        if self.verbosity >= Verbosity::Normal {
            tracing::warn!(call_id = format_args!("{call_id:x}"), endpoint, error, "Call failed");
        }
    }
}

/// An event captured by [`MemoryDiagnostics`]
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticEvent {
    ConfigWarning(String),
    GateSaturated {
        gate: GateKind,
        endpoint: String,
        call_id: u64,
        wait: Duration,
    },
    CallStarted {
        call_id: u64,
        endpoint: String,
    },
    CallFinished {
        call_id: u64,
        endpoint: String,
        status: u16,
    },
    CallFailed {
        call_id: u64,
        endpoint: String,
        error: String,
    },
}

/// Sink that records every event in memory
#[derive(Debug, Default)]
pub struct MemoryDiagnostics {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl MemoryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events seen so far
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().clone()
    }

    pub fn config_warnings(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                DiagnosticEvent::ConfigWarning(msg) => Some(msg.clone()),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: DiagnosticEvent) {
        self.events.lock().push(event);
    }
}

impl Diagnostics for MemoryDiagnostics {
    fn config_warning(&self, message: &str) {
        self.push(DiagnosticEvent::ConfigWarning(message.to_string()));
    }

    fn gate_saturated(&self, gate: GateKind, endpoint: &str, call_id: u64, wait: Duration) {
        self.push(DiagnosticEvent::GateSaturated {
            gate,
            endpoint: endpoint.to_string(),
            call_id,
            wait,
        });
    }

    fn call_started(&self, call_id: u64, endpoint: &str) {
        self.push(DiagnosticEvent::CallStarted {
            call_id,
            endpoint: endpoint.to_string(),
        });
    }

    fn call_finished(&self, call_id: u64, endpoint: &str, status: u16, _elapsed: Duration) {
        self.push(DiagnosticEvent::CallFinished {
            call_id,
            endpoint: endpoint.to_string(),
            status,
        });
    }

    fn call_failed(&self, call_id: u64, endpoint: &str, error: &str) {
        self.push(DiagnosticEvent::CallFailed {
            call_id,
            endpoint: endpoint.to_string(),
            error: error.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_verbosity_from_str() {
        assert_eq!(Verbosity::from_str("quiet").unwrap(), Verbosity::Quiet);
        assert_eq!(Verbosity::from_str("VERBOSE").unwrap(), Verbosity::Verbose);
        assert!(Verbosity::from_str("loud").is_err());
        assert!(Verbosity::Quiet < Verbosity::Normal);
    }

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemoryDiagnostics::new();
        sink.config_warning("rate above 60");
        sink.call_started(3, "get_user");
        sink.call_finished(3, "get_user", 200, Duration::from_millis(12));

        let events = sink.events();
        assert_eq!(events.len(), 3);
        assert_eq!(sink.config_warnings(), vec!["rate above 60".to_string()]);
        assert_eq!(
            events[2],
            DiagnosticEvent::CallFinished {
                call_id: 3,
                endpoint: "get_user".to_string(),
                status: 200
            }
        );
    }
}
