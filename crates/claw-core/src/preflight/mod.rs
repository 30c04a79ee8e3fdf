//! Pre-deployment compatibility checks against a target device.
//!
//! The engine walks a fixed, ordered list of checks and stops at the first
//! `Fail`. Results are data; only provider errors carry an [`ErrorKind`].

mod checks;
mod facts;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ErrorKind;

pub use checks::{classify_architecture, classify_version};
pub use facts::StaticFacts;

/// Facts about the device, supplied by whatever talks to it.
///
/// Calls are blocking; deadlines belong to the implementor.
pub trait DeviceFacts {
    fn version(&self) -> anyhow::Result<String>;
    fn architecture(&self) -> anyhow::Result<String>;
    fn container_config(&self) -> anyhow::Result<BTreeMap<String, String>>;
    fn veth_interfaces(&self) -> anyhow::Result<Vec<String>>;
}

impl<T: DeviceFacts + ?Sized> DeviceFacts for &T {
    fn version(&self) -> anyhow::Result<String> {
        (**self).version()
    }

    fn architecture(&self) -> anyhow::Result<String> {
        (**self).architecture()
    }

    fn container_config(&self) -> anyhow::Result<BTreeMap<String, String>> {
        (**self).container_config()
    }

    fn veth_interfaces(&self) -> anyhow::Result<Vec<String>> {
        (**self).veth_interfaces()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    Pass,
    /// Passed with caveats. Does not halt the run.
    Warn,
    Fail,
}

impl CheckStatus {
    pub fn label(self) -> &'static str {
        match self {
            CheckStatus::Pass => "PASS",
            CheckStatus::Warn => "WARN",
            CheckStatus::Fail => "FAIL",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub checked_at: DateTime<Utc>,
}

impl CheckResult {
    pub fn new(name: &str, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            details: BTreeMap::new(),
            error_kind: None,
            checked_at: Utc::now(),
        }
    }

    pub fn pass(name: &str, message: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Pass, message)
    }

    pub fn warn(name: &str, message: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Warn, message)
    }

    pub fn fail(name: &str, message: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Fail, message)
    }

    /// Provider call failed; the run stops here.
    pub fn fetch_failed(name: &str, what: &str, err: &anyhow::Error) -> Self {
        let mut result = Self::fail(name, format!("{name}: failed to get {what}: {err:#}"));
        result.error_kind = Some(ErrorKind::UpstreamFetchFailed);
        result
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn is_fail(&self) -> bool {
        self.status == CheckStatus::Fail
    }
}

/// What the caller may do after a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Proceed,
    ConfirmRequired,
    Blocked,
}

/// One entry in the engine's ordered check list.
pub struct CheckDescriptor<F> {
    pub name: &'static str,
    pub run: fn(&F) -> CheckResult,
}

impl<F> Clone for CheckDescriptor<F> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            run: self.run,
        }
    }
}

pub const VERSION_CHECK: &str = "RouterOS Version";
pub const ARCHITECTURE_CHECK: &str = "Architecture";
pub const RUNTIME_CHECK: &str = "Container Runtime";
pub const VETH_CHECK: &str = "VETH Configuration";
pub const RESOURCES_CHECK: &str = "Resources";

/// Runs the check list against one device. Not shareable across concurrent runs;
/// build one engine per device.
pub struct PreflightEngine<F> {
    facts: F,
    checks: Vec<CheckDescriptor<F>>,
    results: Vec<CheckResult>,
}

impl<F: DeviceFacts> PreflightEngine<F> {
    pub fn new(facts: F) -> Self {
        let checks = vec![
            CheckDescriptor {
                name: VERSION_CHECK,
                run: checks::check_version::<F>,
            },
            CheckDescriptor {
                name: ARCHITECTURE_CHECK,
                run: checks::check_architecture::<F>,
            },
            CheckDescriptor {
                name: RUNTIME_CHECK,
                run: checks::check_container_runtime::<F>,
            },
            CheckDescriptor {
                name: VETH_CHECK,
                run: checks::check_veth::<F>,
            },
            CheckDescriptor {
                name: RESOURCES_CHECK,
                run: checks::check_resources::<F>,
            },
        ];
        Self {
            facts,
            checks,
            results: Vec::new(),
        }
    }

    pub fn check_names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|c| c.name).collect()
    }

    /// Runs every check in order, stopping after the first `Fail`.
    /// Results from a previous run are discarded.
    pub fn run(&mut self) -> &[CheckResult] {
        self.results.clear();
        for check in &self.checks {
            let result = (check.run)(&self.facts);
            let halt = result.is_fail();
            self.results.push(result);
            if halt {
                break;
            }
        }
        &self.results
    }

    pub fn results(&self) -> &[CheckResult] {
        &self.results
    }

    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|r| r.status == CheckStatus::Fail)
    }

    pub fn has_warnings(&self) -> bool {
        self.results.iter().any(|r| r.status == CheckStatus::Warn)
    }

    pub fn verdict(&self) -> Verdict {
        if self.has_failures() {
            Verdict::Blocked
        } else if self.has_warnings() {
            Verdict::ConfirmRequired
        } else {
            Verdict::Proceed
        }
    }

    pub fn into_results(self) -> Vec<CheckResult> {
        self.results
    }
}
