use serde_json::Value;

use super::{
    CheckResult, CheckStatus, DeviceFacts, ARCHITECTURE_CHECK, RESOURCES_CHECK, RUNTIME_CHECK,
    VERSION_CHECK, VETH_CHECK,
};
use crate::version::{parse_version, VersionNumber};

const MIN_SUPPORTED: VersionNumber = VersionNumber::new(6, 40);
const BUGGY_FROM: VersionNumber = VersionNumber::new(7, 14);
const BUGGY_TO: VersionNumber = VersionNumber::new(7, 15);
const STABLE_FROM: VersionNumber = VersionNumber::new(7, 16);
const VETH_CHANGES_FROM: VersionNumber = VersionNumber::new(7, 20);
const VETH_CHANGES_TO: VersionNumber = VersionNumber::new(7, 21);

const RUNTIME_ENABLED_KEY: &str = "enabled";
const RUNTIME_ENABLED_VALUE: &str = "true";
const REGISTRY_URL_KEY: &str = "registry-url";

/// Version ranges, first match wins.
pub fn classify_version(v: VersionNumber) -> (CheckStatus, String) {
    if (BUGGY_FROM..=BUGGY_TO).contains(&v) {
        (
            CheckStatus::Fail,
            format!(
                "RouterOS v{v} has critical container bugs. Upgrade to v7.16+ or downgrade to v7.13"
            ),
        )
    } else if (VETH_CHANGES_FROM..=VETH_CHANGES_TO).contains(&v) {
        (
            CheckStatus::Warn,
            format!("RouterOS v{v} has VETH breaking changes. Manual configuration may be required."),
        )
    } else if (STABLE_FROM..VETH_CHANGES_FROM).contains(&v) {
        (
            CheckStatus::Pass,
            format!("RouterOS v{v} is stable for containers"),
        )
    } else if v >= MIN_SUPPORTED {
        (
            CheckStatus::Pass,
            format!("RouterOS v{v} supports containers (REST API)"),
        )
    } else {
        (
            CheckStatus::Fail,
            format!("RouterOS v{v} may not support containers. Minimum recommended: v{MIN_SUPPORTED}"),
        )
    }
}

/// Case-insensitive architecture support table.
pub fn classify_architecture(arch: &str) -> (CheckStatus, String) {
    match arch.to_ascii_lowercase().as_str() {
        "arm64" => (
            CheckStatus::Pass,
            "ARM64 architecture - Full container support".to_string(),
        ),
        "x86_64" | "amd64" => (
            CheckStatus::Warn,
            format!("{arch} architecture - CHR detected. CHR does not support containers!"),
        ),
        "arm" => (
            CheckStatus::Warn,
            "ARM32 architecture - Limited to ARMv5 containers".to_string(),
        ),
        _ => (
            CheckStatus::Fail,
            format!("Architecture '{arch}' may not support containers"),
        ),
    }
}

pub(super) fn check_version<F: DeviceFacts>(facts: &F) -> CheckResult {
    let raw = match facts.version() {
        Ok(raw) => raw,
        Err(e) => return CheckResult::fetch_failed(VERSION_CHECK, "RouterOS version", &e),
    };
    let parsed = parse_version(&raw);
    let (status, message) = classify_version(parsed);
    CheckResult::new(VERSION_CHECK, status, message)
        .with_detail("version", raw)
        .with_detail("parsed_version", parsed.as_f64())
}

pub(super) fn check_architecture<F: DeviceFacts>(facts: &F) -> CheckResult {
    let arch = match facts.architecture() {
        Ok(arch) => arch,
        Err(e) => return CheckResult::fetch_failed(ARCHITECTURE_CHECK, "architecture", &e),
    };
    let (status, message) = classify_architecture(&arch);
    CheckResult::new(ARCHITECTURE_CHECK, status, message).with_detail("architecture", arch)
}

pub(super) fn check_container_runtime<F: DeviceFacts>(facts: &F) -> CheckResult {
    let config = match facts.container_config() {
        Ok(config) => config,
        Err(e) => return CheckResult::fetch_failed(RUNTIME_CHECK, "container config", &e),
    };

    let enabled = config.get(RUNTIME_ENABLED_KEY).map(String::as_str) == Some(RUNTIME_ENABLED_VALUE);
    let registry = config
        .get(REGISTRY_URL_KEY)
        .filter(|url| !url.is_empty())
        .cloned();

    let mut result = if enabled {
        CheckResult::pass(RUNTIME_CHECK, "Container runtime is enabled")
    } else {
        CheckResult::fail(
            RUNTIME_CHECK,
            "Container runtime is not enabled. Run: /container/config/set enabled=yes",
        )
    };
    result.details = config
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
    if enabled {
        if let Some(url) = registry {
            result = result.with_detail("registry", url);
        }
    }
    result
}

pub(super) fn check_veth<F: DeviceFacts>(facts: &F) -> CheckResult {
    let veths = match facts.veth_interfaces() {
        Ok(veths) => veths,
        Err(e) => return CheckResult::fetch_failed(VETH_CHECK, "VETH interfaces", &e),
    };
    let result = if veths.is_empty() {
        CheckResult::warn(
            VETH_CHECK,
            "No VETH interfaces found. For RouterOS v7.20+, VETH configuration is required for container networking.",
        )
    } else {
        CheckResult::pass(VETH_CHECK, format!("Found {} VETH interface(s)", veths.len()))
    };
    result.with_detail("veth_count", veths.len())
}

/// Resource introspection is not exposed by the fact provider; never fatal.
pub(super) fn check_resources<F: DeviceFacts>(_facts: &F) -> CheckResult {
    CheckResult::pass(
        RESOURCES_CHECK,
        "Resource check skipped (manual verification recommended)",
    )
}
