use anyhow::{Context, Result, bail};
use napomni_core::Defaults;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::state::ensure_napomni_home;
use crate::tz::Zone;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: DefaultsSection,
    #[serde(default)]
    pub schedule: ScheduleSection,
    #[serde(default)]
    pub log: LogSection,
}

/// Time of day for commands without an explicit `HH:MM`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsSection {
    pub hour: u32,
    pub minute: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSection {
    /// IANA name or `±HH:MM`.
    pub timezone: String,
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// `EnvFilter` directives; `RUST_LOG` takes precedence.
    pub filter: String,
}

impl Default for DefaultsSection {
    fn default() -> Self {
        let d = Defaults::default();
        Self {
            hour: d.hour,
            minute: d.minute,
        }
    }
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            poll_interval_secs: 1,
        }
    }
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Config {
    pub fn parser_defaults(&self) -> Defaults {
        Defaults {
            hour: self.defaults.hour,
            minute: self.defaults.minute,
        }
    }

    pub fn zone(&self) -> Result<Zone> {
        Zone::parse(&self.schedule.timezone).context("[schedule].timezone")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.schedule.poll_interval_secs.max(1))
    }

    pub fn validate(&self) -> Result<()> {
        if self.defaults.hour > 23 || self.defaults.minute > 59 {
            bail!(
                "[defaults] {:02}:{:02} is not a time of day",
                self.defaults.hour,
                self.defaults.minute
            );
        }
        self.zone()?;
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_napomni_home()?.join("config.toml"))
}

/// `None` when the file does not exist. A file that is present must parse
/// and validate.
fn read_config(path: &Path) -> Result<Option<Config>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("read {}", path.display())),
    };
    let cfg: Config =
        toml::from_str(&text).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid {}", path.display()))?;
    Ok(Some(cfg))
}

/// The file at `~/.napomni/config.toml`, or built-in defaults without one.
pub fn load_config() -> Result<Config> {
    Ok(read_config(&config_path()?)?.unwrap_or_default())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    let text = toml::to_string_pretty(&Config::default()).context("serialize config")?;
    fs::write(&p, text).with_context(|| format!("write {}", p.display()))?;
    println!("Wrote {}", p.display());
    Ok(())
}

pub fn show_config() -> Result<()> {
    let p = config_path()?;
    let (cfg, source) = match read_config(&p)? {
        Some(cfg) => (cfg, "file"),
        None => (Config::default(), "built-in defaults"),
    };
    println!("# {} ({source})", p.display());
    print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_toml() {
        let cfg = Config::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("[defaults]"));
        assert!(text.contains("hour = 10"));
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn partial_file_fills_missing_values() {
        let cfg: Config = toml::from_str("[schedule]\ntimezone = \"Europe/Moscow\"\n").unwrap();
        assert_eq!(cfg.schedule.timezone, "Europe/Moscow");
        assert_eq!(cfg.schedule.poll_interval_secs, 1);
        assert_eq!(cfg.parser_defaults(), Defaults { hour: 10, minute: 0 });
        assert_eq!(cfg.log.filter, "info");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut cfg = Config::default();
        cfg.defaults.hour = 24;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.schedule.timezone = "Nowhere/Land".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn read_config_tells_missing_from_broken() {
        let ts = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let dir = std::env::temp_dir().join(format!("napomni-config-{}-{ts}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        assert_eq!(read_config(&path).unwrap(), None);

        fs::write(&path, "[defaults]\nhour = 8\n").unwrap();
        let cfg = read_config(&path).unwrap().unwrap();
        assert_eq!(cfg.parser_defaults(), Defaults { hour: 8, minute: 0 });
        assert_eq!(cfg.schedule, ScheduleSection::default());

        fs::write(&path, "[defaults]\nhour = 25\n").unwrap();
        let err = read_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("not a time of day"));

        fs::write(&path, "[defaults\n").unwrap();
        assert!(read_config(&path).is_err());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn poll_interval_is_at_least_a_second() {
        let mut cfg = Config::default();
        cfg.schedule.poll_interval_secs = 0;
        assert_eq!(cfg.poll_interval(), Duration::from_secs(1));
    }
}
