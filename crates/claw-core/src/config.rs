//! Installer configuration: model, defaults, load/save with optional
//! encryption, validation and the generated container environment.
//!
//! Loading reads the file, decrypts it when it has the envelope shape,
//! expands `${VAR}` references and only then parses JSON.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::codec;
use crate::envelope::{looks_encrypted, EncryptedStore};
use crate::error::{ErrorKind, StoreError};

pub const API_SSL_PORT: u16 = 7778;
pub const MIN_PASSWORD_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("config is encrypted - password required")]
    PasswordRequired,
    #[error("decrypting config: {0}")]
    Decrypt(#[from] StoreError),
    #[error("config is not valid utf-8")]
    NotUtf8,
    #[error("parsing config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ConfigError::Decrypt(e) => e.kind(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterOsConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub use_tls: bool,
}

impl Default for RouterOsConfig {
    fn default() -> Self {
        Self {
            host: "192.168.88.1".into(),
            port: 443,
            username: "admin".into(),
            password: String::new(),
            use_tls: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    pub name: String,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env_vars: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub mounts: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
    pub auto_start: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            name: "mikroclaw".into(),
            image: "ghcr.io/openclaw/mikroclaw:latest".into(),
            file: None,
            env_vars: BTreeMap::new(),
            mounts: BTreeMap::new(),
            interface: None,
            auto_start: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: "https://ghcr.io".into(),
            username: None,
            password: None,
            token: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentConfig {
    pub dry_run: bool,
    pub skip_preflight: bool,
    pub auto_fix_veth: bool,
    pub force_overwrite: bool,
}

/// Runtime settings handed to the MikroClaw container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MikroClawConfig {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub memu_key: String,
    pub llm_provider: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub telegram_token: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub telegram_allowlist: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub discord_webhook: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub slack_webhook: String,
}

impl Default for MikroClawConfig {
    fn default() -> Self {
        Self {
            memu_key: String::new(),
            llm_provider: "openrouter".into(),
            api_key: String::new(),
            base_url: "https://openrouter.ai/api/v1".into(),
            model: "google/gemini-flash-1.5".into(),
            telegram_token: String::new(),
            telegram_allowlist: String::new(),
            discord_webhook: String::new(),
            slack_webhook: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    pub routeros: RouterOsConfig,
    pub container: ContainerConfig,
    pub registry: RegistryConfig,
    pub deployment: DeploymentConfig,
    pub mikroclaw: MikroClawConfig,
}

impl InstallerConfig {
    /// Hard errors come back as `Err`; soft findings as the returned warnings.
    pub fn validate(&self) -> Result<Vec<String>, ConfigError> {
        if self.routeros.host.is_empty() {
            return Err(ConfigError::Invalid("routeros host is required".into()));
        }
        if self.routeros.username.is_empty() {
            return Err(ConfigError::Invalid("routeros username is required".into()));
        }
        if self.container.name.is_empty() {
            return Err(ConfigError::Invalid("container name is required".into()));
        }
        let has_file = self.container.file.as_deref().is_some_and(|f| !f.is_empty());
        if self.container.image.is_empty() && !has_file {
            return Err(ConfigError::Invalid(
                "either container image or file must be specified".into(),
            ));
        }
        if self.routeros.port == API_SSL_PORT && !self.routeros.use_tls {
            return Err(ConfigError::Invalid(format!(
                "port {API_SSL_PORT} requires TLS - set use_tls to true"
            )));
        }

        let mut warnings = Vec::new();
        let pw_len = self.routeros.password.chars().count();
        if pw_len > 0 && pw_len < MIN_PASSWORD_LEN {
            let msg = format!("RouterOS password is less than {MIN_PASSWORD_LEN} characters");
            warn!("{msg}");
            warnings.push(msg);
        }
        Ok(warnings)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Whether a stored file carries the envelope shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Encrypted,
    Plaintext,
}

impl FileKind {
    pub fn of(data: &[u8]) -> Self {
        if looks_encrypted(data) {
            FileKind::Encrypted
        } else {
            FileKind::Plaintext
        }
    }

    pub fn probe(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self::of(&fs::read(path)?))
    }
}

/// Decrypts (when needed), expands and parses configuration bytes.
pub fn parse_config(
    data: &[u8],
    password: Option<&str>,
    store: &EncryptedStore,
) -> Result<InstallerConfig, ConfigError> {
    let plaintext = if looks_encrypted(data) {
        let password = password
            .filter(|p| !p.is_empty())
            .ok_or(ConfigError::PasswordRequired)?;
        store.decrypt(data, password)?
    } else {
        data.to_vec()
    };
    let text = String::from_utf8(plaintext).map_err(|_| ConfigError::NotUtf8)?;
    let expanded = codec::expand(&text);
    Ok(serde_json::from_str(&expanded)?)
}

pub fn load_config(path: &Path, password: Option<&str>) -> Result<InstallerConfig, ConfigError> {
    load_config_with(path, password, &EncryptedStore::default())
}

pub fn load_config_with(
    path: &Path,
    password: Option<&str>,
    store: &EncryptedStore,
) -> Result<InstallerConfig, ConfigError> {
    let data = fs::read(path)?;
    debug!(path = %path.display(), kind = ?FileKind::of(&data), "loading config");
    parse_config(&data, password, store)
}

pub fn save_config(config: &InstallerConfig, path: &Path) -> Result<(), ConfigError> {
    let data = config.to_json()?;
    write_private(path, data.as_bytes())?;
    info!(path = %path.display(), "config saved (plaintext)");
    Ok(())
}

pub fn save_config_encrypted(
    config: &InstallerConfig,
    path: &Path,
    password: &str,
) -> Result<(), ConfigError> {
    save_config_encrypted_with(config, path, password, &EncryptedStore::default())
}

pub fn save_config_encrypted_with(
    config: &InstallerConfig,
    path: &Path,
    password: &str,
    store: &EncryptedStore,
) -> Result<(), ConfigError> {
    let data = config.to_json()?;
    let sealed = store.encrypt(data.as_bytes(), password)?;
    write_private(path, &sealed)?;
    info!(path = %path.display(), "config saved (encrypted)");
    Ok(())
}

/// Writes through a sibling temp file renamed over `path`, so a failed write
/// leaves the previous contents intact. Owner-only permissions on Unix.
pub fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Defaults plus placeholder secrets and a data mount.
pub fn sample_config() -> InstallerConfig {
    let mut config = InstallerConfig::default();
    config.mikroclaw.memu_key = "your-memu-api-key".into();
    config.mikroclaw.api_key = "your-llm-api-key".into();
    config.mikroclaw.telegram_token = "your-telegram-bot-token".into();
    config.mikroclaw.telegram_allowlist = "*".into();
    config
        .container
        .mounts
        .insert("disk1/mikroclaw-data".into(), "/app/data".into());
    config
}

/// Template whose secrets are environment references, for plaintext deployments.
pub const SECURE_TEMPLATE: &str = r#"{
  "routeros": {
    "host": "${MIKROCLAW_ROUTEROS_HOST:-192.168.88.1}",
    "port": ${MIKROCLAW_ROUTEROS_PORT:-443},
    "username": "${MIKROCLAW_ROUTEROS_USERNAME:-admin}",
    "password": "${MIKROCLAW_ROUTEROS_PASSWORD}",
    "use_tls": true
  },
  "container": {
    "name": "mikroclaw",
    "image": "ghcr.io/openclaw/mikroclaw:latest",
    "auto_start": true,
    "mounts": {
      "disk1/mikroclaw-data": "/app/data"
    }
  },
  "registry": {
    "url": "https://ghcr.io"
  },
  "deployment": {
    "dry_run": false,
    "skip_preflight": false,
    "auto_fix_veth": true,
    "force_overwrite": false
  },
  "mikroclaw": {
    "llm_provider": "openrouter",
    "api_key": "${MIKROCLAW_API_KEY}",
    "base_url": "https://openrouter.ai/api/v1",
    "model": "google/gemini-flash-1.5",
    "memu_key": "${MIKROCLAW_MEMU_KEY}",
    "telegram_token": "${MIKROCLAW_TELEGRAM_TOKEN}",
    "telegram_allowlist": "*"
  }
}
"#;

pub fn write_secure_template(path: &Path) -> Result<(), ConfigError> {
    write_private(path, SECURE_TEMPLATE.as_bytes())?;
    info!(path = %path.display(), "secure template written");
    Ok(())
}

/// Environment document the container reads at start-up.
pub fn container_env(config: &InstallerConfig) -> serde_json::Value {
    let m = &config.mikroclaw;
    json!({
        "BOT_TOKEN": m.telegram_token,
        "LLM_PROVIDER": m.llm_provider,
        "LLM_API_KEY": m.api_key,
        "LLM_BASE_URL": m.base_url,
        "MODEL": m.model,
        "MEMU_KEY": m.memu_key,
        "TELEGRAM_TOKEN": m.telegram_token,
        "TELEGRAM_ALLOWLIST": m.telegram_allowlist,
        "DISCORD_WEBHOOK": m.discord_webhook,
    })
}

pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    match chars.len() {
        0 => "(not set)".to_string(),
        n if n <= 8 => "****".to_string(),
        n => {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[n - 4..].iter().collect();
            format!("{head}****{tail}")
        }
    }
}
