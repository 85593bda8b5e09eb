//! The certification command: run suites, print, write report and badge

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output;
use crate::process::ProcessResolver;
use resolver_conformance::{CertificationReport, SuiteOrchestrator};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Command-line choices, already merged over the config file.
#[derive(Debug, Clone)]
pub struct CertifyOptions {
    pub resolver: String,
    pub suites_dir: PathBuf,
    pub suites: Vec<String>,
    pub json: bool,
    pub badge: bool,
    pub timeout: Option<Duration>,
}

impl CertifyOptions {
    /// Command-line values win; the config file fills the gaps.
    pub fn merge(
        resolver: Option<String>,
        suites_dir: Option<PathBuf>,
        suites: Vec<String>,
        json: bool,
        badge: bool,
        config: &CliConfig,
    ) -> CliResult<Self> {
        let resolver = resolver
            .or_else(|| config.resolver.clone())
            .ok_or(CliError::MissingResolver)?;
        let suites_dir = suites_dir
            .or_else(|| config.suites_dir.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."));
        let suites = if suites.is_empty() {
            config.suites_or_default()
        } else {
            suites
        };

        Ok(Self {
            resolver,
            suites_dir,
            suites,
            json,
            badge,
            timeout: config.invocation_timeout_secs.map(Duration::from_secs),
        })
    }
}

/// Run the certification. Returns whether the resolver is certified.
pub async fn execute(options: CertifyOptions, config: &CliConfig) -> CliResult<bool> {
    let cwd = std::env::current_dir()?;
    let resolver = ProcessResolver::locate(&options.resolver, &cwd)?.with_timeout(options.timeout);
    tracing::info!("Certifying resolver {}", resolver.program().display());

    let orchestrator = SuiteOrchestrator::with_config(&options.suites_dir, config.conformance.clone());
    let run = orchestrator.run(options.suites.as_slice(), &resolver).await;
    let report = CertificationReport::from_run(&run);

    if options.json {
        let json = report.to_json()?;
        println!("{}", json);
        write_report(&json, &config.report_path())?;
    } else {
        for outcome in &run.outcomes {
            output::print_outcome(outcome);
        }
    }

    if options.badge {
        let badge_path = write_badge(&report, &config.badge_dir())?;
        output::print_info(&format!("Badge written to {}", badge_path.display()));
    }

    if !options.json {
        output::print_summary(&run);
    }

    Ok(run.is_certified())
}

pub fn write_report(json: &str, path: &Path) -> CliResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)?;
    Ok(())
}

/// Write `certified.svg` under `dir`, creating it if needed.
pub fn write_badge(report: &CertificationReport, dir: &Path) -> CliResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join("certified.svg");
    std::fs::write(&path, report.badge_svg())?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use resolver_conformance::CertificationRun;
    use tempfile::TempDir;

    fn empty_report() -> CertificationReport {
        let now = chrono::Utc::now();
        CertificationReport::from_run(&CertificationRun {
            resolver: "calc".into(),
            failed: 0,
            outcomes: Vec::new(),
            started_at: now,
            completed_at: now,
        })
    }

    #[test]
    fn test_merge_prefers_command_line() {
        let config = CliConfig {
            resolver: Some("from-config".into()),
            suites: vec!["R-005".into()],
            invocation_timeout_secs: Some(3),
            ..Default::default()
        };

        let options =
            CertifyOptions::merge(Some("from-cli".into()), None, Vec::new(), false, false, &config)
                .unwrap();
        assert_eq!(options.resolver, "from-cli");
        assert_eq!(options.suites, ["R-005"]);
        assert_eq!(options.suites_dir, PathBuf::from("."));
        assert_eq!(options.timeout, Some(Duration::from_secs(3)));

        let options = CertifyOptions::merge(
            None,
            Some("suites".into()),
            vec!["R-011-determinism".into()],
            true,
            true,
            &config,
        )
        .unwrap();
        assert_eq!(options.resolver, "from-config");
        assert_eq!(options.suites, ["R-011-determinism"]);
    }

    #[test]
    fn test_merge_requires_a_resolver() {
        let result =
            CertifyOptions::merge(None, None, Vec::new(), false, false, &CliConfig::default());
        assert!(matches!(result, Err(CliError::MissingResolver)));
    }

    #[test]
    fn test_write_badge_and_report() {
        let dir = TempDir::new().unwrap();
        let report = empty_report();

        let badge = write_badge(&report, &dir.path().join("badges")).unwrap();
        assert_eq!(badge, dir.path().join("badges").join("certified.svg"));
        assert!(std::fs::read_to_string(&badge).unwrap().contains("CERTIFIED"));

        let report_path = dir.path().join("out").join("conformance-report.json");
        write_report(&report.to_json().unwrap(), &report_path).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
        assert_eq!(written["passed"], serde_json::json!(true));
    }
}
