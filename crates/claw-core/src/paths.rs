use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use directories::BaseDirs;

use crate::config::write_private;

pub const APP_DIR_NAME: &str = "mikroclaw";
pub const CONFIG_DIR_ENV: &str = "MIKROCLAW_CONFIG_DIR";
const LAST_CONFIG_FILE: &str = ".lastconfig";

/// Where saved installer configurations live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDir {
    root: PathBuf,
}

impl ConfigDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `$MIKROCLAW_CONFIG_DIR`, else `<user config dir>/mikroclaw`.
    pub fn locate() -> anyhow::Result<Self> {
        if let Ok(override_path) = std::env::var(CONFIG_DIR_ENV) {
            if !override_path.is_empty() {
                return Ok(Self::new(override_path));
            }
        }
        let dirs = BaseDirs::new().ok_or_else(|| anyhow::anyhow!("cannot determine config directory"))?;
        Ok(Self::new(dirs.config_dir().join(APP_DIR_NAME)))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure(&self) -> anyhow::Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("create config dir {}", self.root.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.root, fs::Permissions::from_mode(0o700))?;
        }
        Ok(())
    }

    /// Bare names resolve inside the directory; anything with a separator is used as given.
    pub fn resolve(&self, name: &str) -> PathBuf {
        let candidate = Path::new(name);
        if candidate.components().count() > 1 || candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        }
    }

    /// Sorted names of saved `*.json` configs, skipping hidden files.
    pub fn list(&self) -> anyhow::Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("read config dir {}", self.root.display()))
            }
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !name.ends_with(".json") {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    pub fn remember_last(&self, config_path: &Path) -> anyhow::Result<()> {
        self.ensure()?;
        let marker = self.root.join(LAST_CONFIG_FILE);
        write_private(&marker, config_path.to_string_lossy().as_bytes())
            .with_context(|| format!("write {}", marker.display()))?;
        Ok(())
    }

    /// Path recorded by the last successful save, if any.
    pub fn last_used(&self) -> Option<PathBuf> {
        let raw = fs::read_to_string(self.root.join(LAST_CONFIG_FILE)).ok()?;
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
    }
}
