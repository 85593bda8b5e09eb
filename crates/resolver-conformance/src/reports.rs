//! Certification reporting

use crate::orchestrator::{CertificationRun, SuiteOutcome, SuiteStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Report summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub certified: bool,
}

/// Complete certification report
///
/// `passed`, `failedTests` and `suites` keep the field names consumers of
/// `conformance-report.json` already read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificationReport {
    pub passed: bool,
    #[serde(rename = "failedTests")]
    pub failed_tests: usize,
    pub suites: Vec<String>,
    pub resolver: String,
    pub timestamp: DateTime<Utc>,
    pub duration: Duration,
    pub summary: ReportSummary,
    pub results: Vec<SuiteOutcome>,
}

impl CertificationReport {
    /// Build a report from a finished run
    pub fn from_run(run: &CertificationRun) -> Self {
        let summary = ReportSummary {
            total: run.outcomes.len(),
            passed: run.passed(),
            failed: run.failed,
            skipped: run.skipped(),
            certified: run.is_certified(),
        };
        let duration = (run.completed_at - run.started_at)
            .to_std()
            .unwrap_or_default();

        Self {
            passed: run.is_certified(),
            failed_tests: run.failed,
            suites: run.outcomes.iter().map(|o| o.suite.clone()).collect(),
            resolver: run.resolver.clone(),
            timestamp: run.completed_at,
            duration,
            summary,
            results: run.outcomes.clone(),
        }
    }

    pub fn is_certified(&self) -> bool {
        self.summary.certified
    }

    /// Generate a text report
    pub fn to_text(&self) -> String {
        let mut output = String::new();

        output.push_str("╔════════════════════════════════════════════════════════════╗\n");
        output.push_str("║  O-lang Resolver Certification Report                      ║\n");
        output.push_str("╠════════════════════════════════════════════════════════════╣\n");
        output.push_str(&format!("║  Resolver: {:<47} ║\n", self.resolver));
        output.push_str(&format!(
            "║  Timestamp: {:<46} ║\n",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        output.push_str(&format!(
            "║  Duration: {:<47} ║\n",
            format!("{:?}", self.duration)
        ));
        output.push_str("╠════════════════════════════════════════════════════════════╣\n");

        for result in &self.results {
            let status_icon = match result.status {
                SuiteStatus::Passed => "✓",
                SuiteStatus::Failed { .. } | SuiteStatus::LoadFailed { .. } => "✗",
                SuiteStatus::Crashed { .. } => "!",
                SuiteStatus::Skipped => "○",
            };

            output.push_str(&format!(
                "║  {} {:<45} {:>8?}\n",
                status_icon, result.suite, result.duration
            ));

            match &result.status {
                SuiteStatus::Failed { verdict } => {
                    for failure in &verdict.failures {
                        output.push_str(&format!("║      {}\n", failure));
                    }
                }
                SuiteStatus::LoadFailed { reason } => {
                    output.push_str(&format!("║      Not evaluated: {}\n", reason));
                }
                SuiteStatus::Crashed { reason } => {
                    output.push_str(&format!("║      Crashed: {}\n", reason));
                }
                SuiteStatus::Passed | SuiteStatus::Skipped => {}
            }
        }

        output.push_str("╠════════════════════════════════════════════════════════════╣\n");
        output.push_str("║  Summary:                                                  ║\n");
        output.push_str(&format!(
            "║    Total: {:<5}  Passed: {:<5}  Failed: {:<5}  Skipped: {:<3} ║\n",
            self.summary.total, self.summary.passed, self.summary.failed, self.summary.skipped
        ));
        output.push_str("║                                                            ║\n");

        if self.summary.certified {
            output.push_str("║  Result: ✓ CERTIFIED                                       ║\n");
        } else {
            output.push_str("║  Result: ✗ NOT CERTIFIED                                   ║\n");
        }

        output.push_str("╚════════════════════════════════════════════════════════════╝\n");

        output
    }

    /// Generate JSON report
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Certification badge for this report
    pub fn badge_svg(&self) -> String {
        badge_svg(self.is_certified())
    }
}

/// 160x28 two-tone SVG badge: "O-lang" on the left, the verdict on the right.
pub fn badge_svg(certified: bool) -> String {
    let (color, label) = if certified {
        ("#4cbb17", "CERTIFIED")
    } else {
        ("#bb2124", "FAILED")
    };

    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="160" height="28">
  <rect rx="4" width="160" height="28" fill="#2d2d2d"/>
  <rect rx="4" x="80" width="80" height="28" fill="{color}"/>
  <text x="40" y="18" fill="#fff" font-size="13" font-family="Arial" text-anchor="middle">O-lang</text>
  <text x="120" y="18" fill="#fff" font-size="13" font-family="Arial" text-anchor="middle">{label}</text>
</svg>"##
    )
}
