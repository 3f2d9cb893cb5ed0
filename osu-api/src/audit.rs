//! Append-only audit log of dispatched calls
//!
//! One pipe-delimited row per call:
//!
//! ```text
//! callID|epochTime|path|parameters|responseStatus|timeElapsed
//! 1f|1539000000.125|get_user|{"m":"0","u":"peppy"}|200|0.412
//! 20|1539000001.002|get_user|{"m":"0","u":"nobody"}||
//! ```
//!
//! A row is written in two appends. The prefix (identifier, issue time, path
//! and parameters) goes out before the request is sent; the suffix (status and
//! elapsed seconds) once the call is over. A call that never got a response
//! ends its row with the empty suffix `|\n`.
//!
//! Calls overlap, so another prefix may be appended while a row is still
//! open. The open row is then terminated where it stands (a five field line
//! ending in `|`) and its call later appends a completion line carrying its
//! identifier instead of an in-place suffix:
//!
//! ```text
//! 21|1539000002.000|get_beatmaps|{"limit":"500"}|
//! 22|1539000002.010|get_user|{"u":"peppy"}|200|0.388
//! 21|200|0.512
//! ```
//!
//! [`AuditLog::read_rows`] joins completion lines back onto their rows. A
//! terminated row with no completion line is a call the process never saw
//! finish. Each append holds the log only for the write itself.
//!
//! The suffix is written by [`AuditRecord`]'s `Drop`, so every exit path of a
//! call finalises its row exactly once.
//!
//! On open, the highest identifier in the log seeds the call identifier
//! counter. A last line without its newline (the process died mid-call) is
//! closed with the empty suffix first.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::dispatcher::Params;
use crate::error::{ClientError, Result};

/// First line of every audit log
pub const HEADER: &str = "callID|epochTime|path|parameters|responseStatus|timeElapsed";

/// Suffix of a row whose call produced no response
pub const EMPTY_SUFFIX: &str = "|\n";

struct LogState {
    file: File,
    /// Call whose prefix is the unterminated last line
    open_row: Option<u64>,
    next_call_id: u64,
}

impl LogState {
    fn append(&mut self, entry: &str) -> std::io::Result<()> {
        self.file.write_all(entry.as_bytes())?;
        self.file.flush()
    }
}

/// Audit log handle, cheap to clone
#[derive(Clone)]
pub struct AuditLog {
    path: PathBuf,
    state: Arc<Mutex<LogState>>,
    last_call_id: Option<u64>,
}

impl AuditLog {
    /// Open or create the log at `path`
    ///
    /// # Errors
    ///
    /// - [`ClientError::Io`] if the file cannot be read or written
    /// - [`ClientError::AuditLog`] if a row has no readable identifier
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let existing = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;

        let last_call_id = if existing.is_empty() {
            file.write_all(format!("{HEADER}\n").as_bytes())?;
            file.flush()?;
            tracing::debug!(path = %path.display(), "Created audit log");
            None
        } else {
            if !existing.ends_with('\n') {
                tracing::warn!(
                    path = %path.display(),
                    "Audit log ends in an unfinished row, closing it with an empty suffix"
                );
                file.write_all(EMPTY_SUFFIX.as_bytes())?;
                file.flush()?;
            }
            let last_call_id = highest_call_id(&existing)?;
            tracing::debug!(
                path = %path.display(),
                last_call_id = ?last_call_id,
                "Resumed audit log"
            );
            last_call_id
        };

        Ok(Self {
            path,
            state: Arc::new(Mutex::new(LogState {
                file,
                open_row: None,
                next_call_id: last_call_id.map_or(0, |id| id + 1),
            })),
            last_call_id,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Identifier of the newest row present when the log was opened
    pub fn last_call_id(&self) -> Option<u64> {
        self.last_call_id
    }

    /// Identifier the next [`begin`](Self::begin) will hand out
    pub fn next_call_id(&self) -> u64 {
        self.state.lock().next_call_id
    }

    /// Take the next call identifier and write the prefix of its row
    ///
    /// The identifier is only consumed once the prefix is on disk, so a
    /// failed write leaves no gap in the log.
    pub fn begin(&self, issued_at: SystemTime, path: &str, params: &Params) -> Result<AuditRecord> {
        let params = serde_json::to_string(params)?;

        let mut state = self.state.lock();
        let call_id = state.next_call_id;

        let mut entry = String::new();
        if state.open_row.take().is_some() {
            entry.push('\n');
        }
        entry.push_str(&format_prefix(call_id, issued_at, path, &params));
        state.append(&entry)?;

        state.open_row = Some(call_id);
        state.next_call_id += 1;

        Ok(AuditRecord {
            call_id,
            state: self.state.clone(),
            response: None,
        })
    }

    /// Read every call recorded in the log at `path`, in issue order
    ///
    /// Completion lines are folded into the rows they finish.
    pub fn read_rows(path: impl AsRef<Path>) -> Result<Vec<AuditRow>> {
        let content = std::fs::read_to_string(path)?;

        let mut rows: Vec<AuditRow> = Vec::new();
        let mut by_id = HashMap::new();
        for line in content.lines().filter(|l| !l.is_empty() && *l != HEADER) {
            match Entry::parse(line)? {
                Entry::Row(row) => {
                    by_id.insert(row.call_id, rows.len());
                    rows.push(row);
                }
                Entry::Completion {
                    call_id,
                    status,
                    elapsed,
                } => {
                    let index = by_id.get(&call_id).ok_or_else(|| {
                        ClientError::AuditLog(format!("completion of unknown call: {line}"))
                    })?;
                    rows[*index].status = status;
                    rows[*index].elapsed = elapsed;
                }
            }
        }
        Ok(rows)
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("path", &self.path)
            .field("last_call_id", &self.last_call_id)
            .finish()
    }
}

/// An open audit row; its suffix is written when this is dropped
pub struct AuditRecord {
    call_id: u64,
    state: Arc<Mutex<LogState>>,
    response: Option<(u16, Duration)>,
}

impl AuditRecord {
    pub fn call_id(&self) -> u64 {
        self.call_id
    }

    /// Note the response status and latency for the suffix
    pub fn record_response(&mut self, status: u16, elapsed: Duration) {
        self.response = Some((status, elapsed));
    }

    fn suffix(&self) -> String {
        match self.response {
            Some((status, elapsed)) => format!("{}|{:.3}\n", status, elapsed.as_secs_f64()),
            None => EMPTY_SUFFIX.to_string(),
        }
    }
}

impl std::fmt::Debug for AuditRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditRecord")
            .field("call_id", &self.call_id)
            .field("response", &self.response)
            .finish()
    }
}

impl Drop for AuditRecord {
    fn drop(&mut self) {
        let suffix = self.suffix();
        let mut state = self.state.lock();

        let entry = if state.open_row == Some(self.call_id) {
            suffix
        } else {
            let detach = if state.open_row.is_some() { "\n" } else { "" };
            format!("{detach}{:x}|{suffix}", self.call_id)
        };
        state.open_row = None;

        if let Err(e) = state.append(&entry) {
            tracing::error!(
                call_id = format_args!("{:x}", self.call_id),
                "Failed to finalise audit row: {}",
                e
            );
        }
    }
}

/// A call as recorded in the log
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRow {
    pub call_id: u64,
    pub epoch_time: f64,
    pub path: String,
    /// Parameters JSON with the `|` escaping removed
    pub parameters: String,
    pub status: Option<u16>,
    pub elapsed: Option<f64>,
}

impl AuditRow {
    /// True if the call never received a response
    pub fn is_unanswered(&self) -> bool {
        self.status.is_none() && self.elapsed.is_none()
    }
}

/// One line of the log
enum Entry {
    /// A full row, or a row terminated before its suffix
    Row(AuditRow),
    /// Suffix of a terminated row
    Completion {
        call_id: u64,
        status: Option<u16>,
        elapsed: Option<f64>,
    },
}

impl Entry {
    fn parse(line: &str) -> Result<Self> {
        let fields = split_fields(line);
        let bad = |what: &str| ClientError::AuditLog(format!("bad {what} in row: {line}"));

        let call_id = u64::from_str_radix(&fields[0], 16).map_err(|_| bad("callID"))?;
        let status = |field: &str| optional_field::<u16>(field).map_err(|_| bad("responseStatus"));
        let elapsed = |field: &str| optional_field::<f64>(field).map_err(|_| bad("timeElapsed"));

        match fields.len() {
            3 => Ok(Entry::Completion {
                call_id,
                status: status(fields[1].as_str())?,
                elapsed: elapsed(fields[2].as_str())?,
            }),
            5 | 6 => {
                let (status, elapsed) = if fields.len() == 6 {
                    (status(fields[4].as_str())?, elapsed(fields[5].as_str())?)
                } else if fields[4].is_empty() {
                    (None, None)
                } else {
                    return Err(bad("row ending"));
                };
                Ok(Entry::Row(AuditRow {
                    call_id,
                    epoch_time: fields[1].parse().map_err(|_| bad("epochTime"))?,
                    path: fields[2].clone(),
                    parameters: fields[3].clone(),
                    status,
                    elapsed,
                }))
            }
            n => Err(ClientError::AuditLog(format!(
                "expected 3, 5 or 6 fields, found {n}: {line}"
            ))),
        }
    }
}

fn optional_field<T: std::str::FromStr>(field: &str) -> std::result::Result<Option<T>, T::Err> {
    if field.is_empty() {
        Ok(None)
    } else {
        field.parse().map(Some)
    }
}

/// Split on `|`, honouring `\|` escapes
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = vec![String::new()];
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                chars.next();
                if let Some(field) = fields.last_mut() {
                    field.push('|');
                }
            }
            '|' => fields.push(String::new()),
            _ => {
                if let Some(field) = fields.last_mut() {
                    field.push(c);
                }
            }
        }
    }
    fields
}

fn escape(field: &str) -> String {
    field.replace('|', "\\|")
}

fn format_prefix(call_id: u64, issued_at: SystemTime, path: &str, params: &str) -> String {
    let epoch = issued_at
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs_f64();
    format!(
        "{:x}|{:.3}|{}|{}|",
        call_id,
        epoch,
        escape(path),
        escape(params)
    )
}

/// Every line, completion lines included, starts with a call identifier
fn highest_call_id(content: &str) -> Result<Option<u64>> {
    let mut highest = None;
    for line in content.lines() {
        if line.trim().is_empty() || line == HEADER {
            continue;
        }
        let id = line.split('|').next().unwrap_or_default();
        let id = u64::from_str_radix(id, 16).map_err(|_| {
            ClientError::AuditLog(format!("cannot read call identifier from: {line}"))
        })?;
        highest = highest.max(Some(id));
    }
    Ok(highest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn params(value: serde_json::Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    fn lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_new_log_has_header_and_starts_at_zero() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("calls.log");

        let log = AuditLog::open(&path).unwrap();

        assert_eq!(log.next_call_id(), 0);
        assert_eq!(log.last_call_id(), None);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            format!("{HEADER}\n")
        );
    }

    #[test]
    fn test_row_written_in_two_parts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("calls.log");
        let log = AuditLog::open(&path).unwrap();
        let issued_at = UNIX_EPOCH + Duration::from_millis(1_539_000_000_125);

        let mut record = log
            .begin(issued_at, "get_user", &params(json!({"u": "peppy"})))
            .unwrap();
        assert_eq!(record.call_id(), 0);

        // Prefix is on disk before the call completes
        let partial = std::fs::read_to_string(&path).unwrap();
        assert!(partial.ends_with("\n0|1539000000.125|get_user|{\"u\":\"peppy\"}|"));

        record.record_response(200, Duration::from_millis(412));
        drop(record);

        assert_eq!(
            lines(&path)[1],
            "0|1539000000.125|get_user|{\"u\":\"peppy\"}|200|0.412"
        );
        let rows = AuditLog::read_rows(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].path, "get_user");
        assert_eq!(rows[0].status, Some(200));
        assert_eq!(rows[0].elapsed, Some(0.412));
    }

    #[test]
    fn test_unanswered_call_gets_empty_suffix() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("calls.log");
        let log = AuditLog::open(&path).unwrap();

        let record = log
            .begin(SystemTime::now(), "get_scores", &params(json!({"b": "75"})))
            .unwrap();
        drop(record);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.ends_with("|{\"b\":\"75\"}||\n"));
        let rows = AuditLog::read_rows(&path).unwrap();
        assert!(rows[0].is_unanswered());
    }

    #[test]
    fn test_pipes_in_parameters_are_escaped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("calls.log");
        let log = AuditLog::open(&path).unwrap();

        drop(
            log.begin(SystemTime::now(), "get_user", &params(json!({"u": "a|b"})))
                .unwrap(),
        );

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains(r#"{"u":"a\|b"}"#));

        let rows = AuditLog::read_rows(&path).unwrap();
        assert_eq!(rows[0].parameters, r#"{"u":"a|b"}"#);
    }

    #[test]
    fn test_overlapping_rows_are_completed_by_identifier() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("calls.log");
        let log = AuditLog::open(&path).unwrap();

        let mut first = log
            .begin(SystemTime::now(), "get_beatmaps", &Params::new())
            .unwrap();
        let mut second = log
            .begin(SystemTime::now(), "get_user", &Params::new())
            .unwrap();

        first.record_response(200, Duration::from_millis(100));
        drop(first);
        second.record_response(404, Duration::from_millis(50));
        drop(second);

        let lines = lines(&path);
        assert_eq!(lines.len(), 5);
        assert!(lines[1].starts_with("0|") && lines[1].ends_with("|get_beatmaps|{}|"));
        assert!(lines[2].starts_with("1|") && lines[2].ends_with("|get_user|{}|"));
        assert_eq!(lines[3], "0|200|0.100");
        assert_eq!(lines[4], "1|404|0.050");

        let rows = AuditLog::read_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].call_id, rows[0].status), (0, Some(200)));
        assert_eq!((rows[1].call_id, rows[1].status), (1, Some(404)));
        assert_eq!(rows[1].elapsed, Some(0.05));
    }

    #[test]
    fn test_row_still_last_is_completed_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("calls.log");
        let log = AuditLog::open(&path).unwrap();

        let first = log
            .begin(SystemTime::now(), "get_beatmaps", &Params::new())
            .unwrap();
        let mut second = log
            .begin(SystemTime::now(), "get_user", &Params::new())
            .unwrap();

        // The second row is the open tail, so it takes a normal suffix
        second.record_response(200, Duration::from_millis(20));
        drop(second);
        drop(first);

        let lines = lines(&path);
        assert!(lines[2].ends_with("|get_user|{}|200|0.020"));
        assert_eq!(lines[3], "0||");

        let rows = AuditLog::read_rows(&path).unwrap();
        assert!(rows[0].is_unanswered());
        assert_eq!(rows[1].status, Some(200));
    }

    #[test]
    fn test_terminated_row_without_completion_is_unanswered() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("calls.log");
        std::fs::write(
            &path,
            format!("{HEADER}\n7|1539000000.000|get_user|{{}}|\n8|1539000001.000|get_user|{{}}|200|0.100\n"),
        )
        .unwrap();

        let rows = AuditLog::read_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].is_unanswered());
        assert_eq!(rows[1].status, Some(200));
    }

    #[test]
    fn test_reopen_resumes_after_highest_identifier() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("calls.log");
        std::fs::write(
            &path,
            format!("{HEADER}\na|1539000000.000|get_user|{{}}|\nb|1539000001.000|get_user|{{}}|200|0.100\na|200|0.300\n"),
        )
        .unwrap();

        let log = AuditLog::open(&path).unwrap();
        assert_eq!(log.last_call_id(), Some(0xb));
        assert_eq!(log.next_call_id(), 0xc);

        drop(
            log.begin(SystemTime::now(), "get_user", &Params::new())
                .unwrap(),
        );
        let rows = AuditLog::read_rows(&path).unwrap();
        assert_eq!(rows.last().unwrap().call_id, 0xc);
    }

    #[test]
    fn test_reopen_closes_torn_row() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("calls.log");
        std::fs::write(
            &path,
            format!("{HEADER}\n4|1539000000.000|get_user|{{}}|200|0.100\n5|1539000001.000|get_user|{{}}|"),
        )
        .unwrap();

        let log = AuditLog::open(&path).unwrap();
        assert_eq!(log.next_call_id(), 6);

        let rows = AuditLog::read_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[1].is_unanswered());
        assert_eq!(rows[1].call_id, 5);
    }

    #[test]
    fn test_garbage_row_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("calls.log");
        std::fs::write(&path, format!("{HEADER}\nnot-hex|x|y|z||\n")).unwrap();

        let err = AuditLog::open(&path).unwrap_err();
        assert!(matches!(err, ClientError::AuditLog(_)));
    }

    #[test]
    fn test_failed_prefix_write_consumes_no_identifier() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("calls.log");
        let log = AuditLog::open(&path).unwrap();

        // A read-only handle makes every append fail
        let writable = std::mem::replace(&mut log.state.lock().file, File::open(&path).unwrap());
        let err = log
            .begin(SystemTime::now(), "get_user", &Params::new())
            .unwrap_err();
        assert!(matches!(err, ClientError::Io(_)));
        assert_eq!(log.next_call_id(), 0);

        log.state.lock().file = writable;
        let record = log
            .begin(SystemTime::now(), "get_user", &Params::new())
            .unwrap();
        assert_eq!(record.call_id(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_rows_stay_readable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("calls.log");
        let log = AuditLog::open(&path).unwrap();

        let mut handles = vec![];
        for n in 0..8u64 {
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                let mut record = log
                    .begin(SystemTime::now(), "get_user", &Params::new())
                    .unwrap();
                for _ in 0..n % 3 {
                    tokio::task::yield_now().await;
                }
                if record.call_id() % 2 == 0 {
                    record.record_response(200, Duration::from_millis(n));
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let rows = AuditLog::read_rows(&path).unwrap();
        let ids: Vec<u64> = rows.iter().map(|r| r.call_id).collect();
        assert_eq!(ids, (0..8).collect::<Vec<_>>());
        for row in rows {
            assert_eq!(row.status.is_some(), row.call_id % 2 == 0);
        }
    }
}
