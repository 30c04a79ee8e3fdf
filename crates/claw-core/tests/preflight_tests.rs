use std::cell::Cell;
use std::collections::BTreeMap;

use anyhow::{bail, Result};
use claw_core::preflight::{StaticFacts, ARCHITECTURE_CHECK, RESOURCES_CHECK, VERSION_CHECK};
use claw_core::{CheckStatus, DeviceFacts, ErrorKind, PreflightEngine, Verdict};

/// Counts provider calls so tests can see where a run stopped.
#[derive(Default)]
struct CountingFacts {
    inner: StaticFacts,
    calls: Cell<usize>,
    fail_arch: bool,
}

impl CountingFacts {
    fn tick(&self) {
        self.calls.set(self.calls.get() + 1);
    }
}

impl DeviceFacts for CountingFacts {
    fn version(&self) -> Result<String> {
        self.tick();
        self.inner.version()
    }

    fn architecture(&self) -> Result<String> {
        self.tick();
        if self.fail_arch {
            bail!("connection reset by peer");
        }
        self.inner.architecture()
    }

    fn container_config(&self) -> Result<BTreeMap<String, String>> {
        self.tick();
        self.inner.container_config()
    }

    fn veth_interfaces(&self) -> Result<Vec<String>> {
        self.tick();
        self.inner.veth_interfaces()
    }
}

fn healthy() -> StaticFacts {
    StaticFacts {
        version: Some("7.16.2".into()),
        architecture: Some("arm64".into()),
        container_config: Some(BTreeMap::from([
            ("enabled".to_string(), "true".to_string()),
            ("registry-url".to_string(), "https://ghcr.io".to_string()),
        ])),
        veth_interfaces: Some(vec!["veth-mikroclaw".into()]),
    }
}

#[test]
fn healthy_device_proceeds() {
    let facts = healthy();
    let mut engine = PreflightEngine::new(&facts);
    let results = engine.run();
    assert_eq!(results.len(), 5);
    assert!(results.iter().all(|r| r.status == CheckStatus::Pass));
    assert_eq!(engine.verdict(), Verdict::Proceed);
}

#[test]
fn buggy_version_stops_after_first_check() {
    let facts = CountingFacts {
        inner: StaticFacts {
            version: Some("7.14.3".into()),
            ..healthy()
        },
        ..CountingFacts::default()
    };
    let mut engine = PreflightEngine::new(&facts);
    let results = engine.run().to_vec();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, VERSION_CHECK);
    assert_eq!(results[0].status, CheckStatus::Fail);
    assert!(engine.has_failures());
    assert_eq!(engine.verdict(), Verdict::Blocked);
    assert_eq!(facts.calls.get(), 1);
}

#[test]
fn warning_does_not_halt() {
    let facts = StaticFacts {
        veth_interfaces: Some(vec![]),
        ..healthy()
    };
    let mut engine = PreflightEngine::new(&facts);
    let results = engine.run();

    assert_eq!(results.len(), 5);
    assert_eq!(results[3].status, CheckStatus::Warn);
    assert_eq!(results[4].name, RESOURCES_CHECK);
    assert!(!engine.has_failures());
    assert!(engine.has_warnings());
    assert_eq!(engine.verdict(), Verdict::ConfirmRequired);
}

#[test]
fn provider_error_halts_with_kind() {
    let facts = CountingFacts {
        inner: healthy(),
        fail_arch: true,
        ..CountingFacts::default()
    };
    let mut engine = PreflightEngine::new(&facts);
    let results = engine.run().to_vec();

    assert_eq!(results.len(), 2);
    assert_eq!(results[1].name, ARCHITECTURE_CHECK);
    assert_eq!(results[1].error_kind, Some(ErrorKind::UpstreamFetchFailed));
    assert!(results[1].message.contains("connection reset by peer"));
    assert_eq!(facts.calls.get(), 2);
}

#[test]
fn rerun_replaces_previous_results() {
    let facts = healthy();
    let mut engine = PreflightEngine::new(&facts);
    engine.run();
    engine.run();
    assert_eq!(engine.results().len(), 5);
}

#[test]
fn results_serialize_for_reporting() {
    let facts = StaticFacts {
        architecture: Some("x86_64".into()),
        ..healthy()
    };
    let mut engine = PreflightEngine::new(&facts);
    engine.run();
    let json = serde_json::to_value(engine.results()).unwrap();
    assert_eq!(json[1]["status"], "WARN");
    assert_eq!(json[2]["details"]["registry"], "https://ghcr.io");
}
