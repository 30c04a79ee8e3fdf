use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use super::DeviceFacts;

/// Fixed facts, typically captured from a device earlier and stored as JSON.
/// A field left out reads as a failed fetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticFacts {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub architecture: Option<String>,
    #[serde(default)]
    pub container_config: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub veth_interfaces: Option<Vec<String>>,
}

impl StaticFacts {
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("open facts file {}", path.display()))?;
        let facts = serde_json::from_reader(file)
            .with_context(|| format!("parse facts file {}", path.display()))?;
        Ok(facts)
    }
}

fn reported<T: Clone>(value: &Option<T>, what: &str) -> Result<T> {
    value
        .clone()
        .ok_or_else(|| anyhow!("{what} not reported by device"))
}

impl DeviceFacts for StaticFacts {
    fn version(&self) -> Result<String> {
        reported(&self.version, "version")
    }

    fn architecture(&self) -> Result<String> {
        reported(&self.architecture, "architecture")
    }

    fn container_config(&self) -> Result<BTreeMap<String, String>> {
        reported(&self.container_config, "container config")
    }

    fn veth_interfaces(&self) -> Result<Vec<String>> {
        reported(&self.veth_interfaces, "VETH interface list")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn loads_partial_facts() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, r#"{{"version": "7.16", "architecture": "arm64"}}"#).unwrap();
        let facts = StaticFacts::load(f.path()).unwrap();
        assert_eq!(facts.version().unwrap(), "7.16");
        assert_eq!(facts.architecture().unwrap(), "arm64");
        let err = facts.container_config().unwrap_err();
        assert!(err.to_string().contains("not reported"));
    }

    #[test]
    fn rejects_invalid_json() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "not json").unwrap();
        assert!(StaticFacts::load(f.path()).is_err());
    }
}
