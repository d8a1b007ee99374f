//! RCA report model and fixed-width box rendering.
//!
//! The rendered box is the one text artifact whose exact byte format this
//! service owns, so layout is done in characters (the border glyphs are
//! multi-byte UTF-8) and every content line is exactly [`BOX_TOTAL_WIDTH`]
//! characters wide, borders included.

use serde::{Deserialize, Serialize};

/// Total box width in characters, including both border glyphs.
const BOX_TOTAL_WIDTH: usize = 86;
/// Interior width between the border glyphs.
const BOX_CONTENT_WIDTH: usize = BOX_TOTAL_WIDTH - 2;
/// Maximum rendered title length before truncation.
const TITLE_MAX_LENGTH: usize = 76;
/// Field width of the confidence value.
const CONFIDENCE_LABEL_WIDTH: usize = 60;
/// Longest token that still word-wraps; anything longer is hard-wrapped.
const MAX_WORD_LENGTH: usize = BOX_CONTENT_WIDTH - 2;

/// Result of one root cause analysis run.
///
/// Built exactly once per run, either as the canned healthy report or as
/// the validation stage's structured output, and never mutated after
/// construction. Field names serialize in the camelCase form the
/// validation model is prompted to emit, which is also the REST response
/// shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RcaReport {
    /// Concise summary of the issue.
    pub title: String,
    /// What went wrong and why.
    pub issue: String,
    /// Metrics, observations and data points supporting the diagnosis.
    pub evidence: String,
    /// Relevant log lines or patterns, if any.
    pub supported_logs: Vec<String>,
    /// Concrete remediation steps.
    pub proposed_solution: String,
    /// Validator confidence in `[0.0, 1.0]`; `None` renders as `0.00`.
    pub validation_confidence: Option<f64>,
}

impl RcaReport {
    /// The canned report for the healthy short-circuit path.
    #[must_use]
    pub fn healthy() -> Self {
        Self {
            title: "System Healthy".to_string(),
            issue: "No anomaly detected".to_string(),
            evidence: "Metrics within normal range".to_string(),
            supported_logs: Vec::new(),
            proposed_solution: "No action needed".to_string(),
            validation_confidence: Some(1.0),
        }
    }
}

impl std::fmt::Display for RcaReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&render(self))
    }
}

/// Render a report as the fixed-width bordered box.
///
/// Pure and deterministic: the same report always yields byte-identical
/// output, independent of platform or locale.
#[must_use]
pub fn render(report: &RcaReport) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(rule('╔', '╗'));
    lines.push(format!("║{:^width$}║", "RCA REPORT", width = BOX_CONTENT_WIDTH));
    lines.push(rule('╠', '╣'));
    lines.push(format!(
        "║ Title: {:<width$}║",
        truncate(&report.title, TITLE_MAX_LENGTH),
        width = TITLE_MAX_LENGTH
    ));
    lines.push(rule('╠', '╣'));
    lines.push(content_line("Issue Description:"));
    wrap_into(&mut lines, &report.issue);
    lines.push(rule('╠', '╣'));
    lines.push(content_line("Evidence:"));
    wrap_into(&mut lines, &report.evidence);
    lines.push(rule('╠', '╣'));
    lines.push(content_line("Proposed Solution:"));
    wrap_into(&mut lines, &report.proposed_solution);
    if !report.supported_logs.is_empty() {
        lines.push(rule('╠', '╣'));
        lines.push(content_line("Supported Logs:"));
        for log in &report.supported_logs {
            wrap_into(&mut lines, &format!("• {log}"));
        }
    }
    lines.push(rule('╠', '╣'));
    lines.push(format!(
        "║ Validation Confidence: {:<width$.2}║",
        report.validation_confidence.unwrap_or(0.0),
        width = CONFIDENCE_LABEL_WIDTH
    ));
    lines.push(rule('╚', '╝'));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// A horizontal rule line with the given corner/junction glyphs.
fn rule(left: char, right: char) -> String {
    let mut line = String::with_capacity(BOX_TOTAL_WIDTH * 3);
    line.push(left);
    for _ in 0..BOX_CONTENT_WIDTH {
        line.push('═');
    }
    line.push(right);
    line
}

/// A bordered line with a two-character left margin, space-padded to the
/// full box width.
fn content_line(content: &str) -> String {
    format!("║ {:<width$}║", content, width = BOX_CONTENT_WIDTH - 1)
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max - 3).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

/// Word-wrap `text` into bordered lines, hard-wrapping any token longer
/// than [`MAX_WORD_LENGTH`] into fixed-size chunks.
fn wrap_into(lines: &mut Vec<String>, text: &str) {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        lines.push(content_line("N/A"));
        return;
    }

    // Buffer of the current line's content after the left margin; each
    // appended word carries its trailing separator space.
    let mut buf = String::new();
    let mut buf_len = 0usize;

    for word in words {
        let word_len = word.chars().count();

        if word_len > MAX_WORD_LENGTH {
            if buf_len > 0 {
                lines.push(content_line(&buf));
                buf.clear();
                buf_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for chunk in chars.chunks(MAX_WORD_LENGTH) {
                let piece: String = chunk.iter().collect();
                lines.push(content_line(&piece));
            }
            continue;
        }

        // Margin (2) + buffered content + word + separator must stay
        // short of the right border column.
        if 2 + buf_len + word_len + 1 >= BOX_TOTAL_WIDTH - 1 {
            lines.push(content_line(&buf));
            buf.clear();
            buf_len = 0;
        }

        buf.push_str(word);
        buf.push(' ');
        buf_len += word_len + 1;
    }

    if buf_len > 0 {
        lines.push(content_line(&buf));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> RcaReport {
        RcaReport {
            title: "OOM Killed - Memory Limit Exceeded".to_string(),
            issue: "The application container was terminated by the kernel after exceeding \
                    its configured memory limit during a traffic spike."
                .to_string(),
            evidence: "Memory usage reached 512.00 MB against a 512.00 MB limit shortly \
                       before the restart."
                .to_string(),
            supported_logs: vec![
                "OOMKilled: container exceeded memory limit".to_string(),
                "Back-off restarting failed container".to_string(),
            ],
            proposed_solution: "Raise the memory limit to 768Mi or reduce the in-memory \
                                cache size."
                .to_string(),
            validation_confidence: Some(0.95),
        }
    }

    fn char_len(line: &str) -> usize {
        line.chars().count()
    }

    #[test]
    fn test_render_is_deterministic() {
        let report = sample_report();
        assert_eq!(render(&report), render(&report));
    }

    #[test]
    fn test_every_line_is_box_width() {
        let reports = [
            sample_report(),
            RcaReport::healthy(),
            RcaReport::default(),
            RcaReport {
                title: "t".repeat(200),
                issue: "x".repeat(200),
                evidence: format!("prefix {}", "y".repeat(300)),
                supported_logs: vec!["z".repeat(150)],
                proposed_solution: String::new(),
                validation_confidence: None,
            },
        ];
        for report in &reports {
            let rendered = render(report);
            for line in rendered.lines() {
                assert_eq!(char_len(line), BOX_TOTAL_WIDTH, "bad width: {line:?}");
            }
        }
    }

    #[test]
    fn test_hard_wrap_chunk_sizes() {
        let token = "x".repeat(200);
        let report = RcaReport {
            issue: token,
            ..RcaReport::default()
        };
        let rendered = render(&report);

        let chunks: Vec<usize> = rendered
            .lines()
            .filter(|l| l.contains('x'))
            .map(|l| l.chars().filter(|c| *c == 'x').count())
            .collect();

        // ceil(200 / 82) = 3 chunks, all full-length except the last.
        assert_eq!(chunks, vec![MAX_WORD_LENGTH, MAX_WORD_LENGTH, 36]);
    }

    #[test]
    fn test_blank_sections_render_na() {
        let rendered = render(&RcaReport::default());
        assert!(rendered.contains("║ N/A"));
    }

    #[test]
    fn test_logs_section_omitted_when_empty() {
        let report = RcaReport {
            title: "OOM".to_string(),
            issue: "x".to_string(),
            evidence: "y".to_string(),
            supported_logs: Vec::new(),
            proposed_solution: "z".to_string(),
            validation_confidence: Some(0.95),
        };
        let rendered = render(&report);
        assert!(!rendered.contains("Supported Logs:"));
        assert!(rendered.contains("║ Validation Confidence: 0.95"));
    }

    #[test]
    fn test_logs_render_as_bulleted_paragraphs() {
        let rendered = render(&sample_report());
        assert!(rendered.contains("Supported Logs:"));
        assert!(rendered.contains("• OOMKilled: container exceeded memory limit"));
        assert!(rendered.contains("• Back-off restarting failed container"));
    }

    #[test]
    fn test_title_truncated_with_ellipsis() {
        let report = RcaReport {
            title: "a".repeat(100),
            ..RcaReport::default()
        };
        let rendered = render(&report);
        let expected = format!("║ Title: {}...", "a".repeat(TITLE_MAX_LENGTH - 3));
        assert!(rendered.contains(&expected));
    }

    #[test]
    fn test_missing_confidence_renders_zero() {
        let rendered = render(&RcaReport::default());
        assert!(rendered.contains("║ Validation Confidence: 0.00"));
    }

    #[test]
    fn test_word_wrap_keeps_words_intact() {
        let report = RcaReport {
            issue: "alpha bravo charlie ".repeat(20),
            ..RcaReport::default()
        };
        let rendered = render(&report);
        for line in rendered.lines().filter(|l| l.contains("alpha")) {
            let content = line.trim_matches('║').trim();
            for word in content.split_whitespace() {
                assert!(matches!(word, "alpha" | "bravo" | "charlie"));
            }
        }
    }

    #[test]
    fn test_healthy_report_contents() {
        let report = RcaReport::healthy();
        assert_eq!(report.title, "System Healthy");
        assert_eq!(report.issue, "No anomaly detected");
        assert_eq!(report.validation_confidence, Some(1.0));
        let rendered = render(&report);
        assert!(rendered.contains("║ Validation Confidence: 1.00"));
    }

    #[test]
    fn test_report_deserializes_from_validator_json() {
        let json = r#"{
            "title": "OOM Killed",
            "issue": "memory exhausted",
            "evidence": "usage at 100% of limit",
            "supportedLogs": ["OOMKilled"],
            "proposedSolution": "raise the limit",
            "validationConfidence": 0.9
        }"#;
        let report: RcaReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.supported_logs, vec!["OOMKilled".to_string()]);
        assert_eq!(report.validation_confidence, Some(0.9));
    }

    #[test]
    fn test_report_tolerates_missing_fields() {
        let report: RcaReport = serde_json::from_str(r#"{"title": "x"}"#).unwrap();
        assert_eq!(report.title, "x");
        assert!(report.issue.is_empty());
        assert!(report.supported_logs.is_empty());
        assert!(report.validation_confidence.is_none());
    }
}
