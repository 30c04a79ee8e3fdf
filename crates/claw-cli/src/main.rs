mod password;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use claw_core::config::{
    self, container_env, mask_secret, sample_config, write_private, ConfigError, FileKind,
    InstallerConfig, SECURE_TEMPLATE,
};
use claw_core::paths::ConfigDir;
use claw_core::preflight::StaticFacts;
use claw_core::{codec, looks_encrypted, CheckStatus, PreflightEngine, Verdict};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::password::{prompt_password_once, prompt_password_twice};

#[derive(Parser, Debug)]
#[command(name = "mikroclaw-install")]
#[command(author, version, about = "MikroClaw installer configuration and preflight tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt a plaintext config file in place (or to --output)
    Encrypt {
        config: String,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Decrypt a config file to stdout (or to --output)
    Decrypt {
        config: String,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Report whether a file is encrypted or plaintext
    Inspect { config: String },
    /// Print a config with ${VAR} references expanded
    Expand { config: String },
    /// Load and validate a config
    Validate { config: String },
    /// Run preflight checks against captured device facts
    Preflight {
        #[arg(long)]
        facts: PathBuf,
        /// Emit results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate a sample config
    Generate {
        /// Use ${MIKROCLAW_*} references instead of placeholder secrets
        #[arg(long)]
        secure: bool,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List saved configs
    List,
    /// Show what a deployment would do, with secrets masked
    DryRun {
        /// Defaults to the last config saved
        config: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Encrypt { config, output } => encrypt_file(&resolve(&config)?, output),
        Commands::Decrypt { config, output } => decrypt_file(&resolve(&config)?, output),
        Commands::Inspect { config } => {
            let path = resolve(&config)?;
            let kind = FileKind::probe(&path)?;
            println!("{}: {}", path.display(), kind_label(kind));
            Ok(())
        }
        Commands::Expand { config } => {
            let text = read_text(&resolve(&config)?)?;
            print!("{}", codec::expand(&text));
            Ok(())
        }
        Commands::Validate { config } => {
            let cfg = load(&resolve(&config)?)?;
            for warning in cfg.validate()? {
                println!("warning: {warning}");
            }
            println!("configuration is valid");
            Ok(())
        }
        Commands::Preflight { facts, json } => preflight(&facts, json),
        Commands::Generate { secure, output } => generate(secure, output),
        Commands::List => list_configs(),
        Commands::DryRun { config } => {
            let path = match config {
                Some(name) => resolve(&name)?,
                None => ConfigDir::locate()?
                    .last_used()
                    .ok_or_else(|| anyhow!("no config given and no previously saved config"))?,
            };
            dry_run(&path)
        }
    }
}

/// Existing paths are used as given; otherwise the name is looked up in the config dir.
fn resolve(name: &str) -> Result<PathBuf> {
    let direct = PathBuf::from(name);
    if direct.exists() {
        return Ok(direct);
    }
    let path = ConfigDir::locate()?.resolve(name);
    if !path.exists() {
        bail!("config not found: {name}");
    }
    Ok(path)
}

fn kind_label(kind: FileKind) -> &'static str {
    match kind {
        FileKind::Encrypted => "encrypted",
        FileKind::Plaintext => "plaintext",
    }
}

fn read_text(path: &Path) -> Result<String> {
    let data = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let plain = if looks_encrypted(&data) {
        let pw = prompt_password_once("Config password: ")?;
        claw_core::decrypt(&data, &pw)?
    } else {
        data
    };
    String::from_utf8(plain).map_err(|_| anyhow!("{} is not valid utf-8", path.display()))
}

fn load(path: &Path) -> Result<InstallerConfig> {
    let cfg = match config::load_config(path, None) {
        Err(ConfigError::PasswordRequired) => {
            let pw = prompt_password_once("Config password: ")?;
            config::load_config(path, Some(&pw))?
        }
        other => other?,
    };
    remember(path);
    Ok(cfg)
}

fn encrypt_file(path: &Path, output: Option<PathBuf>) -> Result<()> {
    let data = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    if looks_encrypted(&data) {
        bail!("{} is already encrypted", path.display());
    }
    serde_json::from_slice::<serde_json::Value>(&data)
        .with_context(|| format!("{} is not a JSON config", path.display()))?;

    let pw = prompt_password_twice("New config password: ")?;
    let sealed = claw_core::encrypt(&data, &pw)?;
    let target = output.unwrap_or_else(|| path.to_path_buf());
    write_private(&target, &sealed).with_context(|| format!("write {}", target.display()))?;
    remember(&target);
    info!(path = %target.display(), "config encrypted");
    println!("encrypted {}", target.display());
    Ok(())
}

fn decrypt_file(path: &Path, output: Option<PathBuf>) -> Result<()> {
    let data = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    if !looks_encrypted(&data) {
        bail!("{} is not encrypted", path.display());
    }
    let pw = prompt_password_once("Config password: ")?;
    let plain = claw_core::decrypt(&data, &pw)?;
    match output {
        Some(target) => {
            write_private(&target, &plain).with_context(|| format!("write {}", target.display()))?;
            println!("decrypted to {}", target.display());
        }
        None => {
            let text = String::from_utf8(plain).map_err(|_| anyhow!("decrypted config is not utf-8"))?;
            print!("{text}");
        }
    }
    Ok(())
}

fn preflight(facts_path: &Path, json: bool) -> Result<()> {
    let facts = StaticFacts::load(facts_path)?;
    let mut engine = PreflightEngine::new(facts);
    engine.run();
    debug!(checks = engine.results().len(), "preflight finished");

    if json {
        println!("{}", serde_json::to_string_pretty(engine.results())?);
    } else {
        for result in engine.results() {
            println!("[{}] {}: {}", result.status.label(), result.name, result.message);
        }
    }

    match engine.verdict() {
        Verdict::Proceed => {
            if !json {
                println!("all checks passed");
            }
            Ok(())
        }
        Verdict::ConfirmRequired => {
            if !json {
                let warned = engine
                    .results()
                    .iter()
                    .filter(|r| r.status == CheckStatus::Warn)
                    .count();
                println!("{warned} warning(s); review before deploying");
            }
            Ok(())
        }
        Verdict::Blocked => {
            let failed = engine
                .results()
                .iter()
                .find(|r| r.is_fail())
                .map(|r| r.name.clone())
                .unwrap_or_default();
            bail!("preflight blocked by {failed}")
        }
    }
}

fn generate(secure: bool, output: Option<PathBuf>) -> Result<()> {
    let text = if secure {
        SECURE_TEMPLATE.to_string()
    } else {
        format!("{}\n", sample_config().to_json()?)
    };
    match output {
        Some(path) => {
            write_private(&path, text.as_bytes())
                .with_context(|| format!("write {}", path.display()))?;
            println!("wrote {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn list_configs() -> Result<()> {
    let dir = ConfigDir::locate()?;
    let names = dir.list()?;
    if names.is_empty() {
        println!("no saved configs in {}", dir.root().display());
        return Ok(());
    }
    let last = dir.last_used();
    for name in names {
        let path = dir.resolve(&name);
        let kind = FileKind::probe(&path).map(kind_label).unwrap_or("unreadable");
        let marker = if last.as_deref() == Some(path.as_path()) { " (last used)" } else { "" };
        println!("{name}\t{kind}{marker}");
    }
    Ok(())
}

/// Records the file as last used when it lives in the config dir; best effort.
fn remember(path: &Path) {
    let Ok(dir) = ConfigDir::locate() else { return };
    if path.parent() == Some(dir.root()) {
        if let Err(e) = dir.remember_last(path) {
            debug!("could not record last config: {e:#}");
        }
    }
}

fn dry_run(path: &Path) -> Result<()> {
    let cfg = load(path)?;
    let warnings = cfg.validate()?;

    println!("DRY RUN - no changes will be made");
    println!("config: {}", path.display());
    println!();
    println!("RouterOS");
    println!("  host:     {}:{}", cfg.routeros.host, cfg.routeros.port);
    println!("  user:     {}", cfg.routeros.username);
    println!("  password: {}", mask_secret(&cfg.routeros.password));
    println!("  tls:      {}", cfg.routeros.use_tls);
    println!("Container");
    println!("  name:     {}", cfg.container.name);
    match cfg.container.file.as_deref().filter(|f| !f.is_empty()) {
        Some(file) => println!("  file:     {file}"),
        None => println!("  image:    {}", cfg.container.image),
    }
    for (src, dst) in &cfg.container.mounts {
        println!("  mount:    {src} -> {dst}");
    }
    println!("Environment");
    let env = container_env(&cfg);
    if let Some(map) = env.as_object() {
        for (key, value) in map {
            let value = value.as_str().unwrap_or_default();
            let shown = if key.contains("KEY") || key.contains("TOKEN") || key.contains("WEBHOOK") {
                mask_secret(value)
            } else {
                value.to_string()
            };
            println!("  {key}={shown}");
        }
    }
    println!("Steps");
    if !cfg.deployment.skip_preflight {
        println!("  - run preflight checks");
    }
    println!("  - upload container environment");
    println!("  - create container {}", cfg.container.name);
    if cfg.container.auto_start {
        println!("  - start container");
    }
    for warning in warnings {
        println!("warning: {warning}");
    }
    Ok(())
}
