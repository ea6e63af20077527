//! Per-session diagnostic trail
//!
//! Every step the pipeline takes for a capture is written as a
//! [`DiagnosticEntry`]. Entries are append-only and belong to exactly one
//! session. A [`DiagnosticsRecorder`] is the single writer for its session:
//! it numbers entries with a monotonic sequence and never lets timestamps go
//! backwards, so a session's trail stays ordered even while other sessions
//! append to the same store.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use super::types::{CaptureSource, FailureReason};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticStep {
    /// Capture was rejected before any processing
    Failed,
    /// No model collaborator is usable; routed straight to the fallback parser
    LlmUnavailable,
    /// One call to the model collaborator
    LlmAttempt,
    /// A model response satisfied the JSON contract
    Validated,
    /// Every model attempt failed or was rejected
    LlmExhausted,
    /// Pipeline produced its final items
    Completed,
}

impl DiagnosticStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticStep::Failed => "FAILED",
            DiagnosticStep::LlmUnavailable => "LLM_UNAVAILABLE",
            DiagnosticStep::LlmAttempt => "LLM_ATTEMPT",
            DiagnosticStep::Validated => "VALIDATED",
            DiagnosticStep::LlmExhausted => "LLM_EXHAUSTED",
            DiagnosticStep::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for DiagnosticStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticLevel {
    Info,
    Warn,
    Error,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiagnosticLevel::Info => "INFO",
            DiagnosticLevel::Warn => "WARN",
            DiagnosticLevel::Error => "ERROR",
        })
    }
}

/// One audit record for a capture session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticEntry {
    pub id: String,
    pub session_id: String,
    /// Position within the session, starting at 1
    pub sequence: u64,
    pub timestamp_millis: i64,
    pub source: CaptureSource,
    pub step: DiagnosticStep,
    pub level: DiagnosticLevel,
    pub message: String,
    pub transcript: Option<String>,
    pub task_count: Option<usize>,
    pub failure_reason: Option<FailureReason>,
}

/// Fields of an entry that the caller chooses; the recorder fills in the rest
#[derive(Debug, Clone)]
pub struct Diagnostic {
    step: DiagnosticStep,
    level: DiagnosticLevel,
    message: String,
    transcript: Option<String>,
    task_count: Option<usize>,
    failure_reason: Option<FailureReason>,
}

impl Diagnostic {
    pub fn new(step: DiagnosticStep, level: DiagnosticLevel, message: impl Into<String>) -> Self {
        Self {
            step,
            level,
            message: message.into(),
            transcript: None,
            task_count: None,
            failure_reason: None,
        }
    }

    pub fn info(step: DiagnosticStep, message: impl Into<String>) -> Self {
        Self::new(step, DiagnosticLevel::Info, message)
    }

    pub fn warn(step: DiagnosticStep, message: impl Into<String>) -> Self {
        Self::new(step, DiagnosticLevel::Warn, message)
    }

    pub fn error(step: DiagnosticStep, message: impl Into<String>) -> Self {
        Self::new(step, DiagnosticLevel::Error, message)
    }

    pub fn transcript(mut self, transcript: impl Into<String>) -> Self {
        self.transcript = Some(transcript.into());
        self
    }

    pub fn task_count(mut self, count: usize) -> Self {
        self.task_count = Some(count);
        self
    }

    pub fn failure_reason(mut self, reason: FailureReason) -> Self {
        self.failure_reason = Some(reason);
        self
    }
}

/// Shared write target for diagnostic entries
pub trait DiagnosticsStore: Send + Sync {
    fn append(&self, entry: DiagnosticEntry);

    /// Entries of one session in the order they were appended
    fn entries_for_session(&self, session_id: &str) -> Vec<DiagnosticEntry>;
}

/// Bounded in-memory diagnostics store
///
/// Keeps at most `max_entries_per_session` entries per session (oldest
/// dropped first, so the terminal entry always survives) and at most
/// `max_sessions` sessions (least recently started session evicted first).
pub struct InMemoryDiagnosticsStore {
    max_entries_per_session: usize,
    max_sessions: usize,
    inner: Mutex<SessionLog>,
}

#[derive(Default)]
struct SessionLog {
    sessions: HashMap<String, VecDeque<DiagnosticEntry>>,
    order: VecDeque<String>,
}

impl InMemoryDiagnosticsStore {
    pub const DEFAULT_MAX_ENTRIES_PER_SESSION: usize = 64;
    pub const DEFAULT_MAX_SESSIONS: usize = 256;

    pub fn new(max_entries_per_session: usize, max_sessions: usize) -> Self {
        Self {
            max_entries_per_session: max_entries_per_session.max(1),
            max_sessions: max_sessions.max(1),
            inner: Mutex::new(SessionLog::default()),
        }
    }

    pub fn session_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sessions
            .len()
    }
}

impl Default for InMemoryDiagnosticsStore {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_MAX_ENTRIES_PER_SESSION,
            Self::DEFAULT_MAX_SESSIONS,
        )
    }
}

impl DiagnosticsStore for InMemoryDiagnosticsStore {
    fn append(&self, entry: DiagnosticEntry) {
        let mut log = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        if !log.sessions.contains_key(&entry.session_id) {
            while log.order.len() >= self.max_sessions {
                match log.order.pop_front() {
                    Some(evicted) => {
                        log.sessions.remove(&evicted);
                    }
                    None => break,
                }
            }
            log.order.push_back(entry.session_id.clone());
        }

        let entries = log.sessions.entry(entry.session_id.clone()).or_default();
        if entries.len() >= self.max_entries_per_session {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    fn entries_for_session(&self, session_id: &str) -> Vec<DiagnosticEntry> {
        let log = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        log.sessions
            .get(session_id)
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }
}

/// Single writer for one session's trail
///
/// Every recorded entry is appended to the shared store immediately (so it
/// stays committed if the pipeline is cancelled later) and also kept locally
/// so the full trail can be returned with the result.
pub struct DiagnosticsRecorder {
    store: Arc<dyn DiagnosticsStore>,
    session_id: String,
    source: CaptureSource,
    sequence: u64,
    last_timestamp: i64,
    trail: Vec<DiagnosticEntry>,
}

impl DiagnosticsRecorder {
    pub fn new(
        store: Arc<dyn DiagnosticsStore>,
        session_id: impl Into<String>,
        source: CaptureSource,
    ) -> Self {
        Self {
            store,
            session_id: session_id.into(),
            source,
            sequence: 0,
            last_timestamp: i64::MIN,
            trail: Vec::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn record(&mut self, diagnostic: Diagnostic) -> &DiagnosticEntry {
        self.sequence += 1;
        let timestamp_millis = Utc::now().timestamp_millis().max(self.last_timestamp);
        self.last_timestamp = timestamp_millis;

        let entry = DiagnosticEntry {
            id: format!("{}-{:04}", self.session_id, self.sequence),
            session_id: self.session_id.clone(),
            sequence: self.sequence,
            timestamp_millis,
            source: self.source,
            step: diagnostic.step,
            level: diagnostic.level,
            message: diagnostic.message,
            transcript: diagnostic.transcript,
            task_count: diagnostic.task_count,
            failure_reason: diagnostic.failure_reason,
        };

        self.store.append(entry.clone());
        self.trail.push(entry);
        &self.trail[self.trail.len() - 1]
    }

    pub fn trail(&self) -> &[DiagnosticEntry] {
        &self.trail
    }

    pub fn into_trail(self) -> Vec<DiagnosticEntry> {
        self.trail
    }
}
