//! Downstream stores the pipeline output is written to.

use super::record::{CaptureStatus, TaskRecord, local_date_today};
use super::task_file::TaskFile;
use crate::capture::{CaptureSource, ExtractedItem};

/// Where an extracted item came from
#[derive(Debug, Clone, Copy)]
pub struct TaskOrigin<'a> {
    pub capture_id: &'a str,
    pub person_id: &'a str,
    pub source: CaptureSource,
}

pub trait TaskStore {
    /// Insert the item as a task, or update the task already created for
    /// the same capture with the same title, date and start time
    ///
    /// # Returns
    /// The ID of the inserted or updated task
    fn upsert(&mut self, item: &ExtractedItem, origin: &TaskOrigin<'_>) -> String;
}

pub trait InboxStore {
    /// Mark a capture as processed and remember the session and tasks
    ///
    /// # Returns
    /// `false` when the capture does not exist
    fn mark_processed(&mut self, capture_id: &str, session_id: &str, task_ids: Vec<String>) -> bool;

    /// Mark a capture as failed
    ///
    /// # Returns
    /// `false` when the capture does not exist
    fn mark_failed(&mut self, capture_id: &str, session_id: &str) -> bool;
}

impl TaskStore for TaskFile {
    fn upsert(&mut self, item: &ExtractedItem, origin: &TaskOrigin<'_>) -> String {
        let today = local_date_today();

        if let Some(task) = self
            .tasks
            .iter_mut()
            .find(|t| {
                t.capture_id == origin.capture_id
                    && t.title == item.title()
                    && t.date == item.date()
                    && t.start_time == item.start_time()
            })
        {
            task.end_time = item.end_time();
            task.all_day = item.all_day();
            task.source_text = item.source_text().map(str::to_string);
            task.updated_at = today;
            return task.id.clone();
        }

        let id = self.generate_task_id();
        self.tasks.push(TaskRecord {
            id: id.clone(),
            title: item.title().to_string(),
            date: item.date(),
            start_time: item.start_time(),
            end_time: item.end_time(),
            all_day: item.all_day(),
            person_id: origin.person_id.to_string(),
            source: origin.source,
            capture_id: origin.capture_id.to_string(),
            source_text: item.source_text().map(str::to_string),
            created_at: today,
            updated_at: today,
        });
        id
    }
}

impl InboxStore for TaskFile {
    fn mark_processed(&mut self, capture_id: &str, session_id: &str, task_ids: Vec<String>) -> bool {
        match self.find_capture_mut(capture_id) {
            Some(capture) => {
                capture.status = CaptureStatus::processed;
                capture.session_id = Some(session_id.to_string());
                capture.task_ids = task_ids;
                true
            }
            None => false,
        }
    }

    fn mark_failed(&mut self, capture_id: &str, session_id: &str) -> bool {
        match self.find_capture_mut(capture_id) {
            Some(capture) => {
                capture.status = CaptureStatus::failed;
                capture.session_id = Some(session_id.to_string());
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn origin(capture_id: &str) -> TaskOrigin<'_> {
        TaskOrigin {
            capture_id,
            person_id: "kid-1",
            source: CaptureSource::quick_add_voice,
        }
    }

    #[test]
    fn test_upsert_inserts_then_updates() {
        let mut file = TaskFile::new();
        let item = ExtractedItem::new("Swim lesson")
            .unwrap()
            .with_date(NaiveDate::from_ymd_opt(2025, 3, 14));
        let first = file.upsert(&item, &origin("capture-1"));

        let all_day = item.clone().with_all_day(true);
        let second = file.upsert(&all_day, &origin("capture-1"));

        assert_eq!(first, second);
        assert_eq!(file.task_count(), 1);
        let task = file.find_task(&first).unwrap();
        assert_eq!(task.date, NaiveDate::from_ymd_opt(2025, 3, 14));
        assert!(task.all_day);
        assert_eq!(task.person_id, "kid-1");

        // Same title on another day is another event
        let moved = item.clone().with_date(NaiveDate::from_ymd_opt(2025, 3, 21));
        let other_day = file.upsert(&moved, &origin("capture-1"));
        assert_ne!(first, other_day);
        assert_eq!(file.task_count(), 2);
        assert_eq!(
            file.find_task(&first).unwrap().date,
            NaiveDate::from_ymd_opt(2025, 3, 14)
        );

        // Same title from another capture is a separate task
        let third = file.upsert(&item, &origin("capture-2"));
        assert_ne!(first, third);
        assert_eq!(file.task_count(), 3);
    }

    #[test]
    fn test_mark_processed_and_failed() {
        let mut file = TaskFile::new();
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let ok = file.add_capture("swim", CaptureSource::ocr_scan, "p", date);
        let bad = file.add_capture("  ", CaptureSource::ocr_scan, "p", date);

        assert!(file.mark_processed(&ok, "s-1", vec!["task-1".to_string()]));
        assert!(file.mark_failed(&bad, "s-2"));
        assert!(!file.mark_failed("capture-99", "s-3"));

        let ok = file.find_capture(&ok).unwrap();
        assert_eq!(ok.status, CaptureStatus::processed);
        assert_eq!(ok.session_id.as_deref(), Some("s-1"));
        assert_eq!(ok.task_ids, vec!["task-1".to_string()]);
        assert_eq!(file.find_capture(&bad).unwrap().status, CaptureStatus::failed);
    }
}
