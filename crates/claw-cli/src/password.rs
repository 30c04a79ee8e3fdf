use anyhow::{anyhow, Result};

pub const PASSWORD_ENV: &str = "MIKROCLAW_CONFIG_PASSWORD";
pub const PASSWORD_CONFIRM_ENV: &str = "MIKROCLAW_CONFIG_PASSWORD_CONFIRM";

fn from_env() -> Option<String> {
    std::env::var(PASSWORD_ENV).ok().filter(|pw| !pw.is_empty())
}

pub fn prompt_password_once(prompt: &str) -> Result<String> {
    if let Some(pw) = from_env() {
        return Ok(pw);
    }
    let pw = rpassword::prompt_password(prompt).map_err(|e| anyhow!("password prompt: {e}"))?;
    if pw.is_empty() {
        return Err(anyhow!("password cannot be empty"));
    }
    Ok(pw)
}

/// Used when sealing a file: a typo here would lock the owner out.
pub fn prompt_password_twice(prompt: &str) -> Result<String> {
    if let Some(pw) = from_env() {
        if let Ok(confirm) = std::env::var(PASSWORD_CONFIRM_ENV) {
            if confirm != pw {
                return Err(anyhow!("password confirmation mismatch"));
            }
        }
        return Ok(pw);
    }
    let first = prompt_password_once(prompt)?;
    let second = rpassword::prompt_password("Confirm password: ")
        .map_err(|e| anyhow!("password prompt: {e}"))?;
    if first != second {
        return Err(anyhow!("passwords do not match"));
    }
    Ok(first)
}
