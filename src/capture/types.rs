use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::diagnostics::DiagnosticEntry;
use super::input_gate::NormalizedText;

/// Where a capture came from
///
/// Uses snake_case naming to match TOML serialization format.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaptureSource {
    /// Quick capture box on the Today screen
    today_quick_capture,
    /// Voice transcription from the quick-add sheet
    quick_add_voice,
    /// Text recognised from a scanned page or photo
    ocr_scan,
    /// Item imported from an external inbox
    inbox_import,
}

impl CaptureSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureSource::today_quick_capture => "TODAY_QUICK_CAPTURE",
            CaptureSource::quick_add_voice => "QUICK_ADD_VOICE",
            CaptureSource::ocr_scan => "OCR_SCAN",
            CaptureSource::inbox_import => "INBOX_IMPORT",
        }
    }
}

impl fmt::Display for CaptureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaptureSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "today_quick_capture" => Ok(CaptureSource::today_quick_capture),
            "quick_add_voice" | "voice" => Ok(CaptureSource::quick_add_voice),
            "ocr_scan" | "ocr" => Ok(CaptureSource::ocr_scan),
            "inbox_import" => Ok(CaptureSource::inbox_import),
            _ => Err(format!(
                "Invalid source '{}'. Valid options are: today_quick_capture, quick_add_voice, ocr_scan, inbox_import",
                s
            )),
        }
    }
}

/// One captured text fragment, as handed to the pipeline
///
/// Created once per capture event and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCapture {
    pub text: String,
    pub source: CaptureSource,
    /// Date the capture is interpreted against ("today" for relative cues)
    pub reference_date: NaiveDate,
    /// IANA time zone name of the household (e.g. "America/Chicago")
    pub time_zone: String,
    pub person_id: String,
}

impl RawCapture {
    pub fn new(text: impl Into<String>, source: CaptureSource, reference_date: NaiveDate) -> Self {
        Self {
            text: text.into(),
            source,
            reference_date,
            time_zone: "UTC".to_string(),
            person_id: String::new(),
        }
    }

    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = time_zone.into();
        self
    }

    pub fn with_person(mut self, person_id: impl Into<String>) -> Self {
        self.person_id = person_id.into();
        self
    }
}

/// A candidate task or event pulled out of a capture
///
/// The title is guaranteed non-blank: the only ways to build an item are
/// [`ExtractedItem::new`], which refuses blank titles, and the crate-internal
/// constructor that takes already-normalized text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedItem {
    title: String,
    date: Option<NaiveDate>,
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
    all_day: bool,
    source_text: Option<String>,
}

impl ExtractedItem {
    /// Create an item with the given title, or `None` when the title is blank
    pub fn new(title: &str) -> Option<Self> {
        let title = title.trim();
        if title.is_empty() {
            return None;
        }
        Some(Self::untimed(title.to_string()))
    }

    pub(crate) fn from_normalized(text: &NormalizedText) -> Self {
        Self::untimed(text.as_str().to_string())
    }

    fn untimed(title: String) -> Self {
        Self {
            title,
            date: None,
            start_time: None,
            end_time: None,
            all_day: false,
            source_text: None,
        }
    }

    pub fn with_date(mut self, date: Option<NaiveDate>) -> Self {
        self.date = date;
        self
    }

    pub fn with_times(mut self, start: Option<NaiveTime>, end: Option<NaiveTime>) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    pub fn with_all_day(mut self, all_day: bool) -> Self {
        self.all_day = all_day;
        self
    }

    pub fn with_source_text(mut self, source_text: Option<String>) -> Self {
        self.source_text = source_text.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn start_time(&self) -> Option<NaiveTime> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<NaiveTime> {
        self.end_time
    }

    pub fn all_day(&self) -> bool {
        self.all_day
    }

    pub fn source_text(&self) -> Option<&str> {
        self.source_text.as_deref()
    }
}

/// Items in textual order of discovery, tagged with the path that produced them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredResult {
    pub items: Vec<ExtractedItem>,
    pub used_heuristic_fallback: bool,
}

/// Reason attached to a diagnostic entry or a rejected model attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    EmptyTranscript,
    LlmUnavailable,
    Exception,
    BlankResponse,
    JsonBlockNotFound,
    SchemaInvalid,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::EmptyTranscript => "EMPTY_TRANSCRIPT",
            FailureReason::LlmUnavailable => "LLM_UNAVAILABLE",
            FailureReason::Exception => "EXCEPTION",
            FailureReason::BlankResponse => "BLANK_RESPONSE",
            FailureReason::JsonBlockNotFound => "JSON_BLOCK_NOT_FOUND",
            FailureReason::SchemaInvalid => "SCHEMA_INVALID",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The only failures visible to callers of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessFailure {
    /// Capture was blank after trimming; the user should be asked for more input
    EmptyTranscript,
}

impl ProcessFailure {
    pub fn reason(&self) -> FailureReason {
        match self {
            ProcessFailure::EmptyTranscript => FailureReason::EmptyTranscript,
        }
    }
}

impl fmt::Display for ProcessFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason().as_str())
    }
}

/// Outcome of one pipeline invocation
#[derive(Debug, Clone)]
pub enum ProcessResult {
    Success {
        session_id: String,
        items: Vec<ExtractedItem>,
        task_count: usize,
        used_heuristic_fallback: bool,
        diagnostics: Vec<DiagnosticEntry>,
    },
    Failure {
        session_id: String,
        reason: ProcessFailure,
        diagnostics: Vec<DiagnosticEntry>,
    },
}

impl ProcessResult {
    pub fn session_id(&self) -> &str {
        match self {
            ProcessResult::Success { session_id, .. } | ProcessResult::Failure { session_id, .. } => {
                session_id
            }
        }
    }

    pub fn diagnostics(&self) -> &[DiagnosticEntry] {
        match self {
            ProcessResult::Success { diagnostics, .. } | ProcessResult::Failure { diagnostics, .. } => {
                diagnostics
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProcessResult::Success { .. })
    }
}
