pub mod codec;
pub mod config;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod paths;
pub mod preflight;
pub mod version;

pub use config::{load_config, save_config, save_config_encrypted, ConfigError, InstallerConfig};
pub use envelope::{decrypt, encrypt, looks_encrypted, EncryptedStore};
pub use error::{ErrorKind, StoreError};
pub use preflight::{CheckResult, CheckStatus, DeviceFacts, PreflightEngine, Verdict};
