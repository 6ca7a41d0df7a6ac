//! AI-style analyzer.
//!
//! The recommendation itself comes from an external reasoning service
//! reached through an [`AiTransport`]. This analyzer only shapes the request,
//! validates the reply, and turns every failure into `ai-fallback`.
//!
//! [`CommandTransport`] is the bundled transport: it runs a user-configured
//! shell command, writes the request as JSON on stdin, and reads the reply
//! as JSON from stdout:
//!
//! ```text
//! stdin:  {"description": "...", "context": {"project_name": "...", ...}}
//! stdout: {"bump": "minor", "confidence": 0.7, "reasoning": "..."}
//! ```

use std::io::Write as _;
use std::process::{Command, Stdio};
use std::sync::Arc;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::{AnalysisResult, Analyzer, AnalyzerId, clamp_confidence};
use crate::evidence::{AnalysisContext, Evidence};
use crate::version::BumpLevel;

/// Errors from an AI transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to spawn or talk to the transport process.
    #[error("failed to run AI command: {0}")]
    Exec(#[from] std::io::Error),

    /// The transport exited unsuccessfully.
    #[error("AI command failed (exit {exit_code:?}): {stderr}")]
    CommandFailed {
        /// The exit code, if available.
        exit_code: Option<i32>,
        /// Captured stderr.
        stderr: String,
    },

    /// The reply was not a valid recommendation.
    #[error("malformed AI reply: {0}")]
    Malformed(String),
}

/// Request sent to the reasoning service.
#[derive(Debug, Clone, Serialize)]
pub struct AiRequest<'a> {
    /// Free-text change description.
    pub description: &'a str,
    /// Project context.
    pub context: &'a AnalysisContext,
}

/// Reply from the reasoning service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AiRecommendation {
    /// Recommended bump.
    pub bump: BumpLevel,
    /// Service-reported confidence; clamped before use.
    pub confidence: f64,
    /// Free-text justification.
    #[serde(default)]
    pub reasoning: String,
}

/// Boundary to an external reasoning service.
pub trait AiTransport: Send + Sync {
    /// Obtain a recommendation for the request.
    fn recommend(&self, request: &AiRequest<'_>) -> Result<AiRecommendation, TransportError>;
}

/// Transport that runs a shell command with JSON over stdin/stdout.
#[derive(Debug, Clone)]
pub struct CommandTransport {
    command: String,
    working_dir: Option<Utf8PathBuf>,
}

impl CommandTransport {
    /// Transport running `command` via `sh -c`.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            working_dir: None,
        }
    }

    /// Run the command from `dir`.
    #[must_use]
    pub fn in_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

impl AiTransport for CommandTransport {
    #[instrument(skip_all, fields(command = %self.command))]
    fn recommend(&self, request: &AiRequest<'_>) -> Result<AiRecommendation, TransportError> {
        let payload =
            serde_json::to_vec(request).map_err(|e| TransportError::Malformed(e.to_string()))?;

        let mut cmd = Command::new("sh");
        cmd.args(["-c", &self.command])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn()?;
        // Feed stdin while stdout and stderr drain, or a command that echoes
        // a large request blocks on a full pipe
        let output = std::thread::scope(|scope| {
            if let Some(mut stdin) = child.stdin.take() {
                let payload = &payload;
                scope.spawn(move || {
                    // A command that ignores stdin may close it early
                    if let Err(e) = stdin.write_all(payload) {
                        debug!(%e, "AI command closed stdin");
                    }
                });
            }
            child.wait_with_output()
        })?;

        if !output.status.success() {
            return Err(TransportError::CommandFailed {
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        serde_json::from_str(stdout.trim()).map_err(|e| TransportError::Malformed(e.to_string()))
    }
}

/// Analyzer backed by an optional [`AiTransport`].
#[derive(Clone, Default)]
pub struct AiAnalyzer {
    transport: Option<Arc<dyn AiTransport>>,
}

impl std::fmt::Debug for AiAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiAnalyzer")
            .field("configured", &self.transport.is_some())
            .finish()
    }
}

impl AiAnalyzer {
    /// Analyzer without a transport; always returns `ai-fallback`.
    pub fn unconfigured() -> Self {
        Self::default()
    }

    /// Analyzer using the given transport.
    pub fn with_transport(transport: Arc<dyn AiTransport>) -> Self {
        Self {
            transport: Some(transport),
        }
    }
}

impl Analyzer for AiAnalyzer {
    fn id(&self) -> AnalyzerId {
        AnalyzerId::Ai
    }

    fn analyze(&self, evidence: &Evidence, context: &AnalysisContext) -> AnalysisResult {
        let Some(transport) = &self.transport else {
            return AnalysisResult::fallback(self.id(), "no AI transport configured");
        };

        let description = if evidence.description.trim().is_empty() {
            evidence.raw_text()
        } else {
            evidence.description.clone()
        };
        if description.trim().is_empty() {
            return AnalysisResult::fallback(self.id(), "no change description");
        }

        let request = AiRequest {
            description: &description,
            context,
        };
        match transport.recommend(&request) {
            Ok(reply) if reply.confidence.is_finite() => {
                let confidence = clamp_confidence(reply.confidence);
                let reasoning = if reply.reasoning.trim().is_empty() {
                    format!("AI recommends {}", reply.bump)
                } else {
                    reply.reasoning
                };
                AnalysisResult::new(self.id(), reply.bump, confidence, reasoning, ["ai-recommendation"])
            }
            Ok(reply) => {
                warn!(confidence = reply.confidence, "AI reply has non-finite confidence");
                AnalysisResult::fallback(self.id(), "non-finite confidence in reply")
            }
            Err(e) => {
                warn!(error = %e, "AI transport failed");
                AnalysisResult::fallback(self.id(), e)
            }
        }
    }
}
