//! Configuration for conformance runs

use serde::{Deserialize, Serialize};

/// Suite id whose runtime observation repeats invocations.
pub const DETERMINISM_SUITE_ID: &str = "R-011-determinism";

/// Invocations made for the determinism suite.
pub const DETERMINISM_REPETITIONS: usize = 3;

/// Category that routes a suite to runtime observation.
pub const RUNTIME_CATEGORY: &str = "resolver-runtime";

/// Spec file looked up in each suite directory.
pub const SPEC_FILE_NAME: &str = "test.json";

/// Configuration for conformance testing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConformanceConfig {
    /// Spec file name inside each suite directory
    pub spec_file_name: String,

    /// `category` value selecting the runtime path
    pub runtime_category: String,

    /// `test_id` selecting repeated invocation (exact match)
    pub determinism_suite_id: String,

    /// Invocations for the determinism suite; at least two are made
    pub determinism_repetitions: usize,

    /// Keep running suites after one fails
    pub continue_on_failure: bool,
}

impl Default for ConformanceConfig {
    fn default() -> Self {
        Self {
            spec_file_name: SPEC_FILE_NAME.to_string(),
            runtime_category: RUNTIME_CATEGORY.to_string(),
            determinism_suite_id: DETERMINISM_SUITE_ID.to_string(),
            determinism_repetitions: DETERMINISM_REPETITIONS,
            continue_on_failure: true,
        }
    }
}
