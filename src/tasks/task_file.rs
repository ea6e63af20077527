use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::record::{CaptureRecord, CaptureStatus, TaskRecord, local_date_today};
use crate::capture::CaptureSource;

/// Everything the server persists: the capture inbox and the tasks made from it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskFile {
    /// Format version for the TOML file (current: 1)
    pub format_version: u32,

    /// Counter for generating unique task IDs
    pub task_counter: u32,

    /// Counter for generating unique capture IDs
    pub capture_counter: u32,

    /// Tasks in insertion order
    ///
    /// A Vec keeps the TOML output stable between saves, which keeps diffs
    /// of the data file readable.
    pub tasks: Vec<TaskRecord>,

    /// Captures in the order they arrived
    pub captures: Vec<CaptureRecord>,
}

impl Default for TaskFile {
    fn default() -> Self {
        Self {
            format_version: 1,
            task_counter: 0,
            capture_counter: 0,
            tasks: Vec::new(),
            captures: Vec::new(),
        }
    }
}

impl TaskFile {
    /// Create a new empty TaskFile instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a new unique task ID
    pub fn generate_task_id(&mut self) -> String {
        self.task_counter += 1;
        format!("task-{}", self.task_counter)
    }

    /// Generate a new unique capture ID
    pub fn generate_capture_id(&mut self) -> String {
        self.capture_counter += 1;
        format!("capture-{}", self.capture_counter)
    }

    /// Count stored tasks
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Record a new capture in the inbox with status `pending`
    ///
    /// # Arguments
    /// * `text` - Raw captured text, stored untrimmed
    /// * `source` - Where the capture came from
    /// * `person_id` - Household member the capture belongs to
    /// * `reference_date` - Date relative cues are resolved against
    ///
    /// # Returns
    /// The generated capture ID
    pub fn add_capture(
        &mut self,
        text: &str,
        source: CaptureSource,
        person_id: &str,
        reference_date: NaiveDate,
    ) -> String {
        let id = self.generate_capture_id();
        self.captures.push(CaptureRecord {
            id: id.clone(),
            text: text.to_string(),
            source,
            person_id: person_id.to_string(),
            reference_date,
            status: CaptureStatus::pending,
            session_id: None,
            task_ids: Vec::new(),
            created_at: local_date_today(),
        });
        id
    }

    /// Find a capture by its ID
    pub fn find_capture(&self, id: &str) -> Option<&CaptureRecord> {
        self.captures.iter().find(|c| c.id == id)
    }

    pub(crate) fn find_capture_mut(&mut self, id: &str) -> Option<&mut CaptureRecord> {
        self.captures.iter_mut().find(|c| c.id == id)
    }

    /// Find a task by its ID
    pub fn find_task(&self, id: &str) -> Option<&TaskRecord> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Captures with the given status, oldest first
    pub fn captures_with_status(&self, status: CaptureStatus) -> Vec<&CaptureRecord> {
        self.captures.iter().filter(|c| c.status == status).collect()
    }

    /// List tasks, optionally only those on `date`
    ///
    /// # Arguments
    /// * `date` - Keep only tasks scheduled on this day; undated tasks are dropped
    ///
    /// # Returns
    /// Cloned tasks in insertion order
    pub fn list_tasks(&self, date: Option<NaiveDate>) -> Vec<TaskRecord> {
        self.tasks
            .iter()
            .filter(|t| date.is_none_or(|d| t.date == Some(d)))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn test_ids_are_sequential() {
        let mut file = TaskFile::new();
        assert_eq!(file.generate_task_id(), "task-1");
        assert_eq!(file.generate_task_id(), "task-2");
        assert_eq!(file.generate_capture_id(), "capture-1");
    }

    #[test]
    fn test_add_capture_is_pending() {
        let mut file = TaskFile::new();
        let id = file.add_capture("  swim friday ", CaptureSource::quick_add_voice, "kid-1", date(10));
        let capture = file.find_capture(&id).unwrap();
        assert_eq!(capture.text, "  swim friday ");
        assert_eq!(capture.status, CaptureStatus::pending);
        assert_eq!(file.captures_with_status(CaptureStatus::pending).len(), 1);
        assert!(file.captures_with_status(CaptureStatus::processed).is_empty());
    }

    #[test]
    fn test_toml_round_trip_keeps_tasks() {
        let mut file = TaskFile::new();
        let capture_id = file.add_capture("x", CaptureSource::ocr_scan, "p", date(10));
        let id = file.generate_task_id();
        file.tasks.push(TaskRecord {
            id,
            title: "Dentist".to_string(),
            date: Some(date(12)),
            start_time: chrono::NaiveTime::from_hms_opt(9, 30, 0),
            end_time: None,
            all_day: false,
            person_id: "p".to_string(),
            source: CaptureSource::ocr_scan,
            capture_id,
            source_text: None,
            created_at: date(10),
            updated_at: date(10),
        });

        let text = toml::to_string_pretty(&file).unwrap();
        let loaded: TaskFile = toml::from_str(&text).unwrap();
        assert_eq!(loaded, file);
        assert_eq!(loaded.list_tasks(Some(date(12))).len(), 1);
        assert!(loaded.list_tasks(Some(date(13))).is_empty());
        assert_eq!(loaded.list_tasks(None).len(), 1);
    }
}
