//! Common test utilities for integration tests
#![allow(dead_code)]

use anyhow::{Result, bail};
use async_trait::async_trait;
use capture_mcp::capture::{
    CaptureSource, InMemoryDiagnosticsStore, ModelCollaborator, PipelineCoordinator,
    PipelineSettings, RawCapture,
};
use chrono::NaiveDate;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// One scripted model reply
#[derive(Debug, Clone)]
pub enum Reply {
    Text(&'static str),
    Nothing,
    Crash,
    /// Never finishes
    Hang,
}

/// Model collaborator that plays back a fixed list of replies
///
/// Once the script runs out every further call returns a blank string.
pub struct ScriptedModel {
    available: bool,
    replies: Mutex<VecDeque<Reply>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            available: true,
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            available: false,
            replies: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelCollaborator for ScriptedModel {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn generate(&self, _: &str, _: NaiveDate, _: &str) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Text(text)) => Ok(Some(text.to_string())),
            Some(Reply::Nothing) => Ok(None),
            Some(Reply::Crash) => bail!("model runtime crashed"),
            Some(Reply::Hang) => std::future::pending().await,
            None => Ok(Some(String::new())),
        }
    }
}

pub fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

pub fn raw(text: &str) -> RawCapture {
    RawCapture::new(text, CaptureSource::quick_add_voice, reference_date())
}

/// Pipeline around `model` with its own diagnostics store
pub fn pipeline(
    model: Arc<dyn ModelCollaborator>,
    retry_count: i32,
) -> (PipelineCoordinator, Arc<InMemoryDiagnosticsStore>) {
    let store = Arc::new(InMemoryDiagnosticsStore::default());
    let settings = PipelineSettings {
        retry_count,
        ..PipelineSettings::default()
    };
    (
        PipelineCoordinator::with_model(model, store.clone(), settings),
        store,
    )
}
