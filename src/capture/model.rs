//! Model collaborator abstraction
//!
//! The on-device language model is optional. Each build wires in one
//! implementation of [`ModelCollaborator`]; callers only look at the
//! `is_available` capability flag and never assume the output is valid JSON.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[async_trait]
pub trait ModelCollaborator: Send + Sync {
    /// Whether the model can be called at all on this device
    fn is_available(&self) -> bool;

    /// Generate a reply for `prompt`. May return `None`, blank or arbitrary text.
    ///
    /// Cancellation is the implementation's job: dropping the returned future
    /// must stop the in-flight generation.
    async fn generate(
        &self,
        prompt: &str,
        reference_date: NaiveDate,
        time_zone: &str,
    ) -> Result<Option<String>>;
}

/// Stand-in for builds without a model
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableModel;

#[async_trait]
impl ModelCollaborator for UnavailableModel {
    fn is_available(&self) -> bool {
        false
    }

    async fn generate(
        &self,
        _prompt: &str,
        _reference_date: NaiveDate,
        _time_zone: &str,
    ) -> Result<Option<String>> {
        bail!("no language model is installed")
    }
}

/// Runs a local model runtime as a child process
///
/// The prompt is written to the child's stdin and its stdout is taken as the
/// reply. The reference date and time zone are passed through the
/// `CAPTURE_REFERENCE_DATE` and `CAPTURE_TIME_ZONE` environment variables.
/// The child is killed if the generation future is dropped.
#[derive(Debug, Clone)]
pub struct CommandModel {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandModel {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn resolve_program(&self) -> Option<PathBuf> {
        if self.program.components().count() > 1 {
            return self.program.is_file().then(|| self.program.clone());
        }
        let paths = std::env::var_os("PATH")?;
        std::env::split_paths(&paths)
            .map(|dir| dir.join(&self.program))
            .find(|candidate| candidate.is_file())
    }
}

#[async_trait]
impl ModelCollaborator for CommandModel {
    fn is_available(&self) -> bool {
        self.resolve_program().is_some()
    }

    async fn generate(
        &self,
        prompt: &str,
        reference_date: NaiveDate,
        time_zone: &str,
    ) -> Result<Option<String>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env("CAPTURE_REFERENCE_DATE", reference_date.to_string())
            .env("CAPTURE_TIME_ZONE", time_zone)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start model runtime {}", self.program.display()))?;

        // Feed stdin while stdout is drained, or a chatty runtime fills both
        // pipes and never exits. Dropping stdin closes it.
        let stdin = child.stdin.take();
        let write_prompt = async move {
            match stdin {
                Some(mut stdin) => stdin.write_all(prompt.as_bytes()).await,
                None => Ok(()),
            }
        };
        let (written, output) = tokio::join!(write_prompt, child.wait_with_output());
        let output = output.context("Failed to read model runtime output")?;

        if !output.status.success() {
            bail!("Model runtime exited with {}", output.status);
        }
        if let Err(e) = written
            && e.kind() != ErrorKind::BrokenPipe
        {
            return Err(e).context("Failed to send prompt to model runtime");
        }

        Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unavailable_model() {
        let model = UnavailableModel;
        assert!(!model.is_available());
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        assert!(model.generate("hi", date, "UTC").await.is_err());
    }

    #[test]
    fn test_missing_command_is_unavailable() {
        let model = CommandModel::new("/definitely/not/a/model-runtime", vec![]);
        assert!(!model.is_available());
        let model = CommandModel::new("no-such-model-runtime-binary", vec![]);
        assert!(!model.is_available());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_model_echoes_stdin() {
        let model = CommandModel::new("/bin/cat", vec![]);
        assert!(model.is_available());
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let reply = model.generate("{\"events\":[]}", date, "UTC").await.unwrap();
        assert_eq!(reply.as_deref(), Some("{\"events\":[]}"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_model_handles_large_prompt() {
        let model = CommandModel::new("/bin/cat", vec![]);
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let prompt = "x".repeat(300_000);

        let reply = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            model.generate(&prompt, date, "UTC"),
        )
        .await
        .expect("model runtime should not block on a large prompt")
        .unwrap();

        assert_eq!(reply.map(|r| r.len()), Some(300_000));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_model_failure_is_error() {
        let model = CommandModel::new("/bin/sh", vec!["-c".to_string(), "exit 3".to_string()]);
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        assert!(model.generate("prompt", date, "UTC").await.is_err());
    }
}
