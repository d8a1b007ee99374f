//! Reasoning capabilities behind the diagnostic pipeline.
//!
//! The three stages (anomaly detection, root cause analysis, validation)
//! are one-method traits so the pipeline stays independent of any model
//! invocation detail and can be unit-tested with stubs. The shipped
//! implementations share one chat-completions client and differ only in
//! model name and prompt.

pub mod client;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::error::{RcaError, RcaResult};
use crate::report::RcaReport;
use client::LlmClient;

/// Classifies a diagnostic context into an anomaly type.
#[async_trait]
pub trait AnomalyDetector: Send + Sync {
    /// Classify the full context; returns the raw, unsanitized model
    /// output (expected to be an anomaly type or `HEALTHY`).
    async fn detect(&self, context: &str) -> RcaResult<String>;
}

/// Explains the root cause of a detected anomaly.
#[async_trait]
pub trait RootCauseAnalyst: Send + Sync {
    /// Produce a free-text root cause analysis and proposed fix.
    async fn analyze(&self, anomaly: &str, context: &str) -> RcaResult<String>;
}

/// Validates an analysis and structures it into a report.
#[async_trait]
pub trait ReportValidator: Send + Sync {
    /// Critique and structure the raw analysis into an [`RcaReport`].
    async fn validate_and_format(&self, rca_output: &str, context: &str)
        -> RcaResult<RcaReport>;
}

const DETECTOR_SYSTEM_PROMPT: &str = "You are a specialized anomaly detection model. \
     Analyze the METRICS and POD STATUS data. Output ONLY the anomaly type or 'HEALTHY'. \
     Example: 'OOM_KILLED'.";

/// Model-backed anomaly detector.
pub struct LlmAnomalyDetector {
    client: Arc<LlmClient>,
    model: String,
}

impl LlmAnomalyDetector {
    #[must_use]
    pub fn new(client: Arc<LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl AnomalyDetector for LlmAnomalyDetector {
    async fn detect(&self, context: &str) -> RcaResult<String> {
        info!(model = %self.model, "Running anomaly detection");
        self.client
            .chat(&self.model, Some(DETECTOR_SYSTEM_PROMPT), context, false)
            .await
    }
}

/// Model-backed root cause analyst.
pub struct LlmRootCauseAnalyst {
    client: Arc<LlmClient>,
    model: String,
}

impl LlmRootCauseAnalyst {
    #[must_use]
    pub fn new(client: Arc<LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl RootCauseAnalyst for LlmRootCauseAnalyst {
    async fn analyze(&self, anomaly: &str, context: &str) -> RcaResult<String> {
        info!(model = %self.model, anomaly = %anomaly, "Running root cause analysis");
        let prompt = format!(
            "You are the Root Cause Analyst. Use all provided context to provide a \
             detailed, reasoned RCA and proposed fix. Focus heavily on the JFR data.\n\n\
             ANOMALY TYPE: {anomaly}\n\
             FULL CONTEXT: {context}\n\n\
             Your task: Determine the root cause and propose a solution. Output only the \
             detailed analysis and fix."
        );
        self.client.chat(&self.model, None, &prompt, false).await
    }
}

/// Model-backed validator producing the structured report.
pub struct LlmReportValidator {
    client: Arc<LlmClient>,
    model: String,
}

impl LlmReportValidator {
    #[must_use]
    pub fn new(client: Arc<LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl ReportValidator for LlmReportValidator {
    async fn validate_and_format(
        &self,
        rca_output: &str,
        context: &str,
    ) -> RcaResult<RcaReport> {
        info!(model = %self.model, "Running validation and formatting");
        let prompt = format!(
            "You are the Validation Agent. Your task is to validate the RCA output and \
             format it into a structured report JSON object.\n\n\
             You MUST return a valid JSON object with these EXACT fields:\n\
             {{\n\
             \u{20} \"title\": \"Brief title summarizing the issue (e.g., 'OOM Killed - Memory Limit Exceeded')\",\n\
             \u{20} \"issue\": \"Detailed description of what went wrong and why\",\n\
             \u{20} \"evidence\": \"Key metrics, observations, and data points supporting the diagnosis\",\n\
             \u{20} \"supportedLogs\": [\"Array of relevant log entries or patterns\"],\n\
             \u{20} \"proposedSolution\": \"Concrete, actionable steps to fix the issue\",\n\
             \u{20} \"validationConfidence\": 0.00\n\
             }}\n\n\
             IMPORTANT:\n\
             - Extract the issue description from the RCA output\n\
             - Include specific metrics and values in the evidence field\n\
             - Provide actionable solutions, not generic advice\n\
             - Set validationConfidence between 0.0 and 1.0 based on how confident you are\n\
             - If any field is missing from RCA output, infer it from the context\n\n\
             RCA Output to Validate:\n{rca_output}\n\n\
             Original Context:\n{context}\n\n\
             Return ONLY the JSON object, no other text."
        );
        let raw = self.client.chat(&self.model, None, &prompt, true).await?;
        parse_report(&raw)
    }
}

/// Parse the validator's JSON output, tolerating Markdown code fences.
fn parse_report(raw: &str) -> RcaResult<RcaReport> {
    let body = strip_code_fences(raw);
    serde_json::from_str(body).map_err(|e| {
        RcaError::ModelOutput(format!("validator returned unparsable report: {e}"))
    })
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
