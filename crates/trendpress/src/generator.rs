//! Generation provider backed by an external command
//!
//! Spawns the configured command (by default `claude -p`), pipes the prompt
//! to its stdin and reads the draft from stdout. Output in the
//! `--output-format json` envelope is unwrapped; anything else is taken as
//! plain text. Token counts are estimated from character counts when the
//! command does not report them.

use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};
use trendpress_protocol::{
    GenerationOutput, GenerationProvider, GenerationRequest, ProviderError, ProviderResult,
};

use crate::config::GenerationConfig;

/// Rough characters-per-token ratio used for estimates.
const CHARS_PER_TOKEN: u64 = 4;

/// JSON envelope printed by `claude -p --output-format json`
#[derive(Debug, Deserialize)]
struct CommandResponse {
    #[serde(default)]
    result: String,
    #[serde(default)]
    is_error: bool,
    #[serde(default)]
    usage: Option<CommandUsage>,
    #[serde(default)]
    total_cost_usd: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CommandUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

pub struct CommandGenerator {
    command: String,
    args: Vec<String>,
    timeout: Duration,
    input_price_per_mtok: f64,
    output_price_per_mtok: f64,
}

impl CommandGenerator {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        let defaults = GenerationConfig::default();
        Self {
            command: command.into(),
            args,
            timeout: Duration::from_secs(defaults.timeout_secs),
            input_price_per_mtok: defaults.input_price_per_mtok,
            output_price_per_mtok: defaults.output_price_per_mtok,
        }
    }

    pub fn from_config(config: &GenerationConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            input_price_per_mtok: config.input_price_per_mtok,
            output_price_per_mtok: config.output_price_per_mtok,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 * self.input_price_per_mtok
            + output_tokens as f64 * self.output_price_per_mtok)
            / 1_000_000.0
    }

    async fn run(&self, prompt: &str) -> ProviderResult<std::process::Output> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ProviderError::Unavailable(format!("{} not found on PATH", self.command))
                } else {
                    ProviderError::Io(e)
                }
            })?;

        // stdout is drained while the prompt is written, both under the timeout
        let stdin = child.stdin.take();
        let write = async move {
            if let Some(mut stdin) = stdin {
                match stdin.write_all(prompt.as_bytes()).await {
                    Ok(()) => {}
                    // the command may exit without reading its input
                    Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                    Err(e) => return Err(ProviderError::Io(e)),
                }
            }
            Ok(())
        };
        let exchange = async move {
            let (written, output) = tokio::join!(write, child.wait_with_output());
            written?;
            Ok::<_, ProviderError>(output?)
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(output) => output,
            Err(_) => {
                warn!("{} timed out after {:?}", self.command, self.timeout);
                Err(ProviderError::Timeout {
                    after_ms: self.timeout.as_millis().min(u64::MAX as u128) as u64,
                })
            }
        }
    }
}

#[async_trait]
impl GenerationProvider for CommandGenerator {
    fn name(&self) -> &str {
        &self.command
    }

    async fn generate(&self, request: &GenerationRequest) -> ProviderResult<GenerationOutput> {
        let started = Instant::now();
        let output = self.run(&request.prompt).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProviderError::Provider {
                provider: self.command.clone(),
                message: format!("exited with {}: {}", output.status, stderr.trim()),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let (text, usage, reported_cost) = match serde_json::from_str::<CommandResponse>(&stdout) {
            Ok(response) if response.is_error => {
                return Err(ProviderError::Provider {
                    provider: self.command.clone(),
                    message: response.result,
                });
            }
            Ok(response) => (response.result, response.usage, response.total_cost_usd),
            Err(_) => (stdout.trim().to_string(), None, None),
        };

        if text.trim().is_empty() {
            return Err(ProviderError::InvalidResponse(format!(
                "{} returned no text",
                self.command
            )));
        }

        let (input_tokens, output_tokens) = match usage {
            Some(u) => (u.input_tokens, u.output_tokens),
            None => (
                estimate_tokens(&request.prompt),
                estimate_tokens(&text),
            ),
        };
        let cost_usd = reported_cost.unwrap_or_else(|| self.cost(input_tokens, output_tokens));
        let latency_ms = started.elapsed().as_millis().min(u64::MAX as u128) as u64;

        debug!(
            "{} produced {} chars ({} in / {} out tokens) in {}ms",
            self.command,
            text.chars().count(),
            input_tokens,
            output_tokens,
            latency_ms
        );

        Ok(GenerationOutput {
            text,
            input_tokens,
            output_tokens,
            cost_usd,
            latency_ms,
        })
    }
}

fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(CHARS_PER_TOKEN)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use trendpress_protocol::GenerationConstraints;

    fn request(prompt: &str) -> GenerationRequest {
        GenerationRequest {
            prompt: prompt.to_string(),
            constraints: GenerationConstraints::default(),
        }
    }

    fn shell(script: &str) -> CommandGenerator {
        CommandGenerator::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[tokio::test]
    async fn test_plain_text_output() {
        let generator = shell("cat");
        let output = generator.generate(&request("# 제목\n\n본문입니다")).await.unwrap();

        assert_eq!(output.text, "# 제목\n\n본문입니다");
        // 11 chars -> 3 tokens each way
        assert_eq!(output.input_tokens, 3);
        assert_eq!(output.output_tokens, 3);
        assert!((output.cost_usd - generator.cost(3, 3)).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_json_envelope_is_unwrapped() {
        let generator = shell(
            r##"printf '{"type":"result","result":"# Title","is_error":false,"usage":{"input_tokens":12,"output_tokens":34},"total_cost_usd":0.5}'"##,
        );
        let output = generator.generate(&request("prompt")).await.unwrap();
        assert_eq!(output.text, "# Title");
        assert_eq!(output.input_tokens, 12);
        assert_eq!(output.output_tokens, 34);
        assert_eq!(output.cost_usd, 0.5);
    }

    #[tokio::test]
    async fn test_error_envelope_fails() {
        let generator = shell(r#"printf '{"result":"quota exhausted","is_error":true}'"#);
        let err = generator.generate(&request("prompt")).await.unwrap_err();
        assert!(err.to_string().contains("quota exhausted"));
    }

    #[tokio::test]
    async fn test_non_zero_exit_reports_stderr() {
        let generator = shell("echo boom >&2; exit 3");
        let err = generator.generate(&request("prompt")).await.unwrap_err();
        match err {
            ProviderError::Provider { message, .. } => assert!(message.contains("boom")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout() {
        let generator = shell("sleep 5").with_timeout(Duration::from_millis(100));
        let err = generator.generate(&request("prompt")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout { after_ms: 100 }));
    }

    #[tokio::test]
    async fn test_timeout_covers_unread_large_prompt() {
        // larger than any pipe buffer, never read by the command
        let prompt = "가".repeat(256 * 1024);
        let generator = shell("sleep 5").with_timeout(Duration::from_millis(200));

        let started = std::time::Instant::now();
        let err = generator.generate(&request(&prompt)).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout { after_ms: 200 }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_missing_command_is_unavailable() {
        let generator = CommandGenerator::new("trendpress-no-such-command", vec![]);
        let err = generator.generate(&request("prompt")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_empty_output_is_invalid() {
        let generator = shell("true");
        let err = generator.generate(&request("prompt")).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }
}
