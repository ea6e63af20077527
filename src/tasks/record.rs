use chrono::{Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::capture::CaptureSource;

/// Get the current date in local timezone
pub fn local_date_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Processing state of a stored capture
///
/// Uses snake_case naming to match TOML serialization format.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaptureStatus {
    /// Received but not yet run through the pipeline
    pending,
    /// Pipeline succeeded and its tasks were stored
    processed,
    /// Pipeline rejected the capture (blank transcript)
    failed,
}

/// A task or event created from a capture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Unique identifier (e.g., "task-12")
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub all_day: bool,
    /// Household member the task belongs to
    pub person_id: String,
    pub source: CaptureSource,
    /// Capture this task was extracted from
    pub capture_id: String,
    /// Fragment of the capture the task came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_text: Option<String>,
    pub created_at: NaiveDate,
    pub updated_at: NaiveDate,
}

/// A raw capture as kept in the inbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRecord {
    /// Unique identifier (e.g., "capture-3")
    pub id: String,
    pub text: String,
    pub source: CaptureSource,
    pub person_id: String,
    pub reference_date: NaiveDate,
    pub status: CaptureStatus,
    /// Pipeline session that processed this capture
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub task_ids: Vec<String>,
    pub created_at: NaiveDate,
}
