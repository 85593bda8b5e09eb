//! Output formatting utilities

use colored::*;
use resolver_conformance::{CertificationRun, SuiteOutcome, SuiteStatus};

/// One line per suite, plus one line per failed assertion.
pub fn print_outcome(outcome: &SuiteOutcome) {
    match &outcome.status {
        SuiteStatus::Passed => {
            println!("{} {} passed", "✓".green(), outcome.suite);
        }
        SuiteStatus::Failed { verdict } => {
            println!("{} {} failed", "✗".red(), outcome.suite.bold());
            for failure in &verdict.failures {
                println!("    {}", failure.to_string().dimmed());
            }
        }
        SuiteStatus::LoadFailed { reason } => {
            println!("{} {} not evaluated: {}", "✗".red(), outcome.suite.bold(), reason);
        }
        SuiteStatus::Crashed { reason } => {
            println!("{} {} crashed: {}", "!".red().bold(), outcome.suite.bold(), reason);
        }
        SuiteStatus::Skipped => {
            println!("{} {} skipped", "○".dimmed(), outcome.suite);
        }
    }
}

/// Final verdict line for a run
pub fn print_summary(run: &CertificationRun) {
    if run.is_certified() {
        print_success(&format!("All {} resolver suite(s) passed", run.passed()));
    } else {
        print_error(&format!("{} resolver suite(s) failed", run.failed));
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}
