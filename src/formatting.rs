//! Text output of the MCP tools

use crate::capture::DiagnosticEntry;
use crate::tasks::TaskRecord;
use chrono::NaiveTime;

fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// One-line schedule for a task, e.g. "2025-03-14 15:00-16:00" or "undated"
pub fn format_when(task: &TaskRecord) -> String {
    let mut when = match task.date {
        Some(date) => date.to_string(),
        None => "undated".to_string(),
    };
    if task.all_day {
        when.push_str(" (all day)");
    } else {
        match (task.start_time, task.end_time) {
            (Some(start), Some(end)) => {
                when.push_str(&format!(" {}-{}", format_time(start), format_time(end)))
            }
            (Some(start), None) => when.push_str(&format!(" {}", format_time(start))),
            (None, Some(end)) => when.push_str(&format!(" until {}", format_time(end))),
            (None, None) => {}
        }
    }
    when
}

/// Format tasks for display
///
/// # Arguments
/// * `tasks` - Tasks to format, in display order
///
/// # Returns
/// A human-readable listing, or a short note when there is nothing to show
pub fn format_tasks(tasks: &[TaskRecord]) -> String {
    if tasks.is_empty() {
        return "No tasks found".to_string();
    }

    let mut result = format!("Found {} task(s):\n\n", tasks.len());
    for task in tasks {
        result.push_str(&format!(
            "- [{}] {} ({})\n",
            task.id,
            task.title,
            format_when(task)
        ));
        result.push_str(&format!(
            "  Person: {}, Source: {}, Capture: {}\n",
            task.person_id, task.source, task.capture_id
        ));
    }
    result
}

/// Summary returned by the capture tool after a successful run
pub fn format_capture_summary(
    capture_id: &str,
    session_id: &str,
    tasks: &[TaskRecord],
    used_heuristic_fallback: bool,
) -> String {
    let mut result = format!(
        "Capture {} processed (session: {}, fallback: {})\n",
        capture_id, session_id, used_heuristic_fallback
    );
    result.push_str(&format!("Extracted {} task(s):\n", tasks.len()));
    for task in tasks {
        result.push_str(&format!(
            "- [{}] {} ({})\n",
            task.id,
            task.title,
            format_when(task)
        ));
    }
    result
}

/// Format a session's diagnostic trail
pub fn format_diagnostics(session_id: &str, entries: &[DiagnosticEntry]) -> String {
    let mut result = format!(
        "Diagnostics for session {} ({} entries):\n\n",
        session_id,
        entries.len()
    );
    for entry in entries {
        result.push_str(&format!(
            "{}. [{}] {}: {}",
            entry.sequence, entry.level, entry.step, entry.message
        ));
        if let Some(reason) = entry.failure_reason {
            result.push_str(&format!(" (reason: {})", reason));
        }
        if let Some(count) = entry.task_count {
            result.push_str(&format!(" (tasks: {})", count));
        }
        result.push('\n');
    }
    result
}
