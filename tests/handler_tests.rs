//! MCP handler tests: capture, list_tasks and diagnostics
mod common;

use capture_mcp::capture::ModelCollaborator;
use capture_mcp::*;
use common::{Reply, ScriptedModel};
use std::sync::Arc;
use tempfile::NamedTempFile;

fn get_test_handler(model: Arc<dyn ModelCollaborator>) -> (CaptureServerHandler, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let handler = CaptureServerHandler::with_model(
        temp_file.path().to_str().unwrap(),
        CaptureConfig::default(),
        model,
    )
    .unwrap();
    (handler, temp_file)
}

/// Session id from a capture summary: "... (session: <id>, fallback: ...)"
fn extract_session_id(response: &str) -> String {
    let start = response.find("session: ").unwrap() + "session: ".len();
    let end = response[start..].find(',').unwrap();
    response[start..start + end].to_string()
}

#[tokio::test]
async fn test_capture_creates_task_with_fallback() {
    let (handler, _temp) = get_test_handler(ScriptedModel::unavailable());

    let response = handler
        .handle_capture(
            "Kid 1 has an appointment today at 8am".to_string(),
            Some("voice".to_string()),
            Some("2025-03-10".to_string()),
            Some("kid-1".to_string()),
        )
        .await
        .unwrap();

    assert!(response.contains("Capture capture-1 processed"));
    assert!(response.contains("fallback: true"));
    assert!(response.contains("[task-1] Kid 1 has an appointment today at 8am (2025-03-10 08:00)"));

    let data = handler.snapshot();
    assert_eq!(data.task_count(), 1);
    let task = data.find_task("task-1").unwrap();
    assert_eq!(task.person_id, "kid-1");
    assert_eq!(task.source, capture::CaptureSource::quick_add_voice);

    let capture = data.find_capture("capture-1").unwrap();
    assert_eq!(capture.status, CaptureStatus::processed);
    assert_eq!(capture.task_ids, vec!["task-1".to_string()]);
    assert_eq!(
        capture.session_id.as_deref(),
        Some(extract_session_id(&response).as_str())
    );
}

#[tokio::test]
async fn test_capture_uses_model_reply() {
    let model = ScriptedModel::new(vec![Reply::Text(
        r#"{"events":[{"title":"Soccer","date":"2025-03-15","startTime":"09:00","endTime":"10:30"},{"title":"Bring oranges"}]}"#,
    )]);
    let (handler, _temp) = get_test_handler(model);

    let response = handler
        .handle_capture(
            "soccer saturday 9 to 10:30, bring oranges".to_string(),
            None,
            Some("2025-03-10".to_string()),
            None,
        )
        .await
        .unwrap();

    assert!(response.contains("fallback: false"));
    assert!(response.contains("Extracted 2 task(s)"));

    let data = handler.snapshot();
    assert_eq!(data.task_count(), 2);
    assert!(data.tasks.iter().all(|t| t.person_id == "household"));
    assert!(
        data.tasks
            .iter()
            .all(|t| t.source == capture::CaptureSource::today_quick_capture)
    );
}

#[tokio::test]
async fn test_blank_capture_is_rejected_and_marked_failed() {
    let model = ScriptedModel::new(vec![]);
    let (handler, _temp) = get_test_handler(model.clone());

    let result = handler
        .handle_capture("   ".to_string(), None, None, None)
        .await;

    assert!(result.is_err());
    assert_eq!(model.calls(), 0);
    let data = handler.snapshot();
    assert_eq!(data.task_count(), 0);
    assert_eq!(
        data.find_capture("capture-1").unwrap().status,
        CaptureStatus::failed
    );
}

#[tokio::test]
async fn test_invalid_parameters_are_rejected() {
    let (handler, _temp) = get_test_handler(ScriptedModel::unavailable());

    let bad_source = handler
        .handle_capture("Dentist".to_string(), Some("fax".to_string()), None, None)
        .await;
    assert!(bad_source.is_err());

    let bad_date = handler
        .handle_capture("Dentist".to_string(), None, Some("03/10/2025".to_string()), None)
        .await;
    assert!(bad_date.is_err());

    let bad_filter = handler.handle_list_tasks(Some("tomorrow".to_string())).await;
    assert!(bad_filter.is_err());

    // Nothing is stored for rejected parameters
    assert!(handler.snapshot().captures.is_empty());
}

#[tokio::test]
async fn test_list_tasks_filters_by_date() {
    let (handler, _temp) = get_test_handler(ScriptedModel::unavailable());

    handler
        .handle_capture(
            "Swim lesson friday 4pm\nDentist tomorrow 9am".to_string(),
            None,
            Some("2025-03-10".to_string()),
            None,
        )
        .await
        .unwrap();

    let all = handler.handle_list_tasks(None).await.unwrap();
    assert!(all.starts_with("Found 2 task(s)"));

    let friday = handler
        .handle_list_tasks(Some("2025-03-14".to_string()))
        .await
        .unwrap();
    assert!(friday.contains("Swim lesson friday 4pm"));
    assert!(!friday.contains("Dentist"));

    let empty = handler
        .handle_list_tasks(Some("2025-04-01".to_string()))
        .await
        .unwrap();
    assert_eq!(empty, "No tasks found");
}

#[tokio::test]
async fn test_diagnostics_for_session() {
    let (handler, _temp) = get_test_handler(ScriptedModel::new(vec![Reply::Crash]));

    let response = handler
        .handle_capture(
            "Bake sale next friday".to_string(),
            None,
            Some("2025-03-10".to_string()),
            None,
        )
        .await
        .unwrap();
    let session_id = extract_session_id(&response);

    let trail = handler.handle_diagnostics(session_id.clone()).await.unwrap();
    assert!(trail.contains(&format!("Diagnostics for session {}", session_id)));
    assert!(trail.contains("LLM_ATTEMPT"));
    assert!(trail.contains("reason: EXCEPTION"));
    assert!(trail.contains("LLM_EXHAUSTED"));
    assert!(trail.contains("COMPLETED"));

    assert!(
        handler
            .handle_diagnostics("no-such-session".to_string())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_tasks_survive_reload() {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().to_str().unwrap().to_string();

    {
        let handler = CaptureServerHandler::with_model(
            &path,
            CaptureConfig::default(),
            ScriptedModel::unavailable(),
        )
        .unwrap();
        handler
            .handle_capture("Piano recital 4/2".to_string(), None, Some("2025-03-10".to_string()), None)
            .await
            .unwrap();
    }

    let reloaded = CaptureServerHandler::with_model(
        &path,
        CaptureConfig::default(),
        ScriptedModel::unavailable(),
    )
    .unwrap();
    let data = reloaded.snapshot();
    assert_eq!(data.task_count(), 1);
    assert_eq!(data.task_counter, 1);
    assert_eq!(
        data.tasks[0].date,
        chrono::NaiveDate::from_ymd_opt(2025, 4, 2)
    );
    assert!(data.tasks[0].all_day);
}

#[tokio::test]
async fn test_same_title_on_different_days_stays_separate() {
    let model = ScriptedModel::new(vec![Reply::Text(
        r#"{"events":[{"title":"Swim","date":"2025-03-11"},{"title":"Swim","date":"2025-03-13"}]}"#,
    )]);
    let (handler, _temp) = get_test_handler(model);

    let response = handler
        .handle_capture(
            "swim tuesday and thursday".to_string(),
            None,
            Some("2025-03-10".to_string()),
            None,
        )
        .await
        .unwrap();

    assert!(response.contains("Extracted 2 task(s)"));
    assert!(response.contains("[task-1] Swim (2025-03-11 (all day))"));
    assert!(response.contains("[task-2] Swim (2025-03-13 (all day))"));

    let data = handler.snapshot();
    assert_eq!(data.task_count(), 2);
    assert_eq!(
        data.find_capture("capture-1").unwrap().task_ids,
        vec!["task-1".to_string(), "task-2".to_string()]
    );
}

#[tokio::test]
async fn test_identical_items_collapse_into_one_task() {
    let model = ScriptedModel::new(vec![Reply::Text(
        r#"{"events":[{"title":"Swim","date":"2025-03-11"},{"title":"Swim","date":"2025-03-11"}]}"#,
    )]);
    let (handler, _temp) = get_test_handler(model);

    let response = handler
        .handle_capture("swim tuesday".to_string(), None, Some("2025-03-10".to_string()), None)
        .await
        .unwrap();

    assert!(response.contains("Extracted 1 task(s)"));
    assert_eq!(response.matches("[task-1]").count(), 1);
    assert_eq!(
        handler.snapshot().find_capture("capture-1").unwrap().task_ids,
        vec!["task-1".to_string()]
    );
}

#[tokio::test]
async fn test_cancelled_capture_is_saved_as_pending() {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().to_str().unwrap().to_string();
    let handler = CaptureServerHandler::with_model(
        &path,
        CaptureConfig::default(),
        ScriptedModel::new(vec![Reply::Hang]),
    )
    .unwrap();

    let run = handler.handle_capture("Dentist friday".to_string(), None, None, None);
    let outcome = tokio::time::timeout(std::time::Duration::from_millis(50), run).await;
    assert!(outcome.is_err());

    let saved = Storage::new(&path).load().unwrap();
    let capture = saved.find_capture("capture-1").unwrap();
    assert_eq!(capture.status, CaptureStatus::pending);
    assert_eq!(saved.task_count(), 0);
}
