use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$NAPOMNI_HOME`, or `~/.napomni`.
pub fn napomni_home() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("NAPOMNI_HOME") {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".napomni"))
}

pub fn ensure_napomni_home() -> Result<PathBuf> {
    let dir = napomni_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn reminders_path() -> Result<PathBuf> {
    Ok(ensure_napomni_home()?.join("reminders.jsonl"))
}
