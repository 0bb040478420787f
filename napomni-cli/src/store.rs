//! Local reminder store: one JSON record per line.
//!
//! Recurrence and lead times are kept as canonical text (`"1 YEAR"`,
//! `"MONDAY"`, `["1 WEEK", "1 DAY"]`); times are local civil time in the
//! configured zone, except the `*_utc` bookkeeping fields.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use napomni_core::{LeadTimeSet, ModelError, ParseResult, Recurrence, ReminderState};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::state::reminders_path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReminder {
    pub id: u64,
    pub created_at_utc: DateTime<Utc>,
    pub original_text: String,
    pub label: String,
    pub target: NaiveDateTime,
    pub next_wake: NaiveDateTime,
    pub recurrence: Option<String>,
    pub lead_times: Option<Vec<String>>,
    #[serde(default)]
    pub last_sent_utc: Option<DateTime<Utc>>,
}

impl StoredReminder {
    pub fn new(
        id: u64,
        original_text: &str,
        parsed: ParseResult,
        now_local: NaiveDateTime,
        created_at_utc: DateTime<Utc>,
    ) -> Self {
        let label = parsed.label.clone();
        let state = ReminderState::from(parsed);
        let mut record = Self {
            id,
            created_at_utc,
            original_text: original_text.to_string(),
            label,
            target: state.target,
            next_wake: state.target,
            recurrence: None,
            lead_times: None,
            last_sent_utc: None,
        };
        record.apply(&state, state.next_wake(now_local));
        record
    }

    /// Rebuild the scheduler state from the canonical columns.
    pub fn state(&self) -> Result<ReminderState, ModelError> {
        let recurrence = self
            .recurrence
            .as_deref()
            .map(str::parse::<Recurrence>)
            .transpose()?;
        let lead_times = match &self.lead_times {
            Some(values) => LeadTimeSet::from_canonical(values)?,
            None => LeadTimeSet::new(),
        };
        Ok(ReminderState {
            target: self.target,
            recurrence,
            lead_times,
        })
    }

    pub fn apply(&mut self, state: &ReminderState, next_wake: NaiveDateTime) {
        self.target = state.target;
        self.next_wake = next_wake;
        self.recurrence = state.recurrence.map(|r| r.to_string());
        self.lead_times = (!state.lead_times.is_empty()).then(|| state.lead_times.to_canonical());
    }
}

pub struct ReminderStore {
    path: PathBuf,
}

impl ReminderStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn open_default() -> Result<Self> {
        Ok(Self::new(reminders_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file reads as empty.
    pub fn load(&self) -> Result<Vec<StoredReminder>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let f = File::open(&self.path).with_context(|| format!("open {}", self.path.display()))?;
        let mut records = Vec::new();
        for (n, line) in BufReader::new(f).lines().enumerate() {
            let line = line.with_context(|| format!("read {}", self.path.display()))?;
            if line.trim().is_empty() {
                continue;
            }
            let record: StoredReminder = serde_json::from_str(&line)
                .with_context(|| format!("{}:{}: bad reminder record", self.path.display(), n + 1))?;
            records.push(record);
        }
        Ok(records)
    }

    /// Replace the whole file via a sibling temp file and a rename.
    pub fn save(&self, records: &[StoredReminder]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let tmp = self.path.with_extension("jsonl.tmp");
        {
            let f = File::create(&tmp).with_context(|| format!("create {}", tmp.display()))?;
            let mut w = BufWriter::new(f);
            for record in records {
                let line = serde_json::to_string(record).context("serialize reminder")?;
                writeln!(w, "{}", line)?;
            }
            w.flush().with_context(|| format!("write {}", tmp.display()))?;
        }
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("rename {} -> {}", tmp.display(), self.path.display()))?;
        Ok(())
    }
}

pub fn next_id(records: &[StoredReminder]) -> u64 {
    records.iter().map(|r| r.id).max().map_or(1, |id| id + 1)
}
