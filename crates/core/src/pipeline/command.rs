use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::{debug, info};

use crate::{
    config::Settings,
    error::{NetraError, Result},
    pipeline::{Pipeline, parse_output},
};

/// Runs an external pipeline executable.
///
/// Sessions invoke `<program> <args..> session <video> <topic>`; payloads
/// invoke `<program> <args..> payload` with the JSON on stdin. The child gets
/// the coach credential and analysis settings through its environment.
#[derive(Clone, Debug)]
pub struct CommandPipeline {
    program: PathBuf,
    args: Vec<String>,
    env: Vec<(String, String)>,
}

impl CommandPipeline {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, settings: &Settings) -> Self {
        let coach = &settings.coach;
        let provider = coach.provider.config();

        let mut env: Vec<(String, String)> = settings
            .analysis
            .env_pairs()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        env.push(("NETRA_LLM_PROVIDER".to_string(), coach.provider.name().to_string()));
        env.push(("NETRA_LLM_MODEL".to_string(), coach.model().to_string()));
        env.push(("NETRA_LLM_API_URL".to_string(), provider.api_url.to_string()));
        if let Some(key) = coach.api_key() {
            env.push((provider.env_var.to_string(), key.to_string()));
        }

        Self {
            program: program.into(),
            args,
            env,
        }
    }

    /// Split a whitespace-separated command line into program and arguments.
    pub fn from_command_line(command_line: &str, settings: &Settings) -> Result<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or_else(|| NetraError::InvalidSetting {
            key: "pipeline command".to_string(),
            value: command_line.to_string(),
            reason: "command is empty".to_string(),
        })?;
        Ok(Self::new(program, parts.collect(), settings))
    }

    async fn run(&self, stage: &str, extra_args: &[&str], stdin: Option<Vec<u8>>) -> Result<Option<Value>> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .args(extra_args)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(program = %self.program.display(), stage, "spawning pipeline");
        let mut child = command.spawn().map_err(|e| NetraError::PipelineFailed {
            stage: stage.to_string(),
            reason: format!("failed to start {}: {e}", self.program.display()),
        })?;

        let writer = match (stdin, child.stdin.take()) {
            (Some(input), Some(mut pipe)) => Some(tokio::spawn(async move {
                pipe.write_all(&input).await?;
                pipe.shutdown().await
            })),
            _ => None,
        };

        let output = child.wait_with_output().await?;
        if let Some(writer) = writer {
            // A child that exits without reading stdin closes the pipe early;
            // its exit status below is what matters.
            if let Ok(Err(e)) = writer.await {
                debug!(stage, error = %e, "pipeline stdin closed early");
            }
        }

        if !output.status.success() {
            return Err(NetraError::PipelineFailed {
                stage: stage.to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        info!(stage, stdout_bytes = output.stdout.len(), "pipeline finished");
        parse_output(stage, &output.stdout)
    }
}

#[async_trait]
impl Pipeline for CommandPipeline {
    fn name(&self) -> &str {
        "command"
    }

    async fn process_session(&self, video: &Path, topic: &str) -> Result<Option<Value>> {
        let video = video.to_string_lossy().into_owned();
        self.run("session", &["session", video.as_str(), topic], None)
            .await
    }

    async fn process_payload(&self, payload: Value) -> Result<Option<Value>> {
        let input = serde_json::to_vec(&payload)?;
        self.run("payload", &["payload"], Some(input)).await
    }
}
