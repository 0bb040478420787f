use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDateTime, Utc};
use clap::Subcommand;
use napomni_core::{SchedulerOutcome, advance, parse};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::render::{notification, summary};
use crate::store::{ReminderStore, StoredReminder, next_id};
use crate::tz::Zone;

#[derive(Subcommand, Debug)]
pub enum RemindersCommand {
    /// Parse a command and store the reminder
    Add {
        /// Command text, e.g. 'Напомни о "Покупки" завтра в 18:00'
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// List stored reminders, soonest first
    List,

    /// Delete a reminder by id
    Rm { id: u64 },

    /// Deliver every reminder that is due now, once
    Tick {
        /// Print what would be delivered; do not touch the store
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// Poll the store and deliver reminders until interrupted
    Watch,
}

/// One fired reminder.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub id: u64,
    pub text: String,
    /// The reminder had no further occurrence and was dropped.
    pub finished: bool,
}

pub async fn run(cmd: RemindersCommand, cfg: &Config) -> Result<()> {
    match cmd {
        RemindersCommand::Add { text } => add(&text.join(" "), cfg),
        RemindersCommand::List => list(cfg),
        RemindersCommand::Rm { id } => remove(id),
        RemindersCommand::Tick { dry_run } => {
            let zone = cfg.zone()?;
            let store = ReminderStore::open_default()?;
            let sent = run_pass(&store, &zone, dry_run)?;
            if sent == 0 {
                println!("No due reminders.");
            }
            Ok(())
        }
        RemindersCommand::Watch => watch(cfg).await,
    }
}

fn add(text: &str, cfg: &Config) -> Result<()> {
    let zone = cfg.zone()?;
    let now_utc = Utc::now();
    let now_local = zone.local_from_utc(now_utc);

    let parsed = parse(text, now_local, cfg.parser_defaults())
        .with_context(|| format!("could not parse {text:?}"))?;

    let store = ReminderStore::open_default()?;
    let mut records = store.load()?;
    let record = StoredReminder::new(next_id(&records), text, parsed, now_local, now_utc);
    let state = record.state()?;

    println!("Reminder set");
    println!("{}", summary(&record, &state, &zone));
    info!(id = record.id, next_wake = %record.next_wake, "reminder stored");

    records.push(record);
    store.save(&records)
}

fn list(cfg: &Config) -> Result<()> {
    let zone = cfg.zone()?;
    let store = ReminderStore::open_default()?;
    let mut records = store.load()?;
    if records.is_empty() {
        println!("No reminders in {}", store.path().display());
        return Ok(());
    }

    records.sort_by_key(|r| (r.next_wake, r.id));
    for record in &records {
        let state = record
            .state()
            .with_context(|| format!("reminder #{}", record.id))?;
        println!("{}\n", summary(record, &state, &zone));
    }
    Ok(())
}

fn remove(id: u64) -> Result<()> {
    let store = ReminderStore::open_default()?;
    let mut records = store.load()?;
    let Some(pos) = records.iter().position(|r| r.id == id) else {
        bail!("no reminder #{id} in {}", store.path().display());
    };
    let removed = records.remove(pos);
    store.save(&records)?;
    println!("Removed #{} {}", removed.id, removed.label);
    Ok(())
}

/// Load, deliver due reminders, persist. Returns the number delivered.
fn run_pass(store: &ReminderStore, zone: &Zone, dry_run: bool) -> Result<usize> {
    let now_utc = Utc::now();
    let now_local = zone.local_from_utc(now_utc);

    let mut records = store.load()?;
    let deliveries = process_due(&mut records, now_local, now_utc, zone)?;

    for d in &deliveries {
        println!("{}", delivery_line(d, dry_run));
    }

    if !dry_run && !deliveries.is_empty() {
        store.save(&records)?;
    }
    Ok(deliveries.len())
}

/// What `tick` and `watch` print for one delivery.
fn delivery_line(d: &Delivery, dry_run: bool) -> String {
    let mut line = if dry_run {
        format!("[DRY RUN] #{} {}", d.id, d.text)
    } else {
        d.text.clone()
    };
    if d.finished {
        line.push_str(&format!("\n  (no further occurrences, #{} removed)", d.id));
    }
    line
}

/// Fire every record whose wake time has come, soonest first.
///
/// Recurring and lead-time records are moved to their next wake time;
/// records with nothing left are removed from `records`.
pub fn process_due(
    records: &mut Vec<StoredReminder>,
    now_local: NaiveDateTime,
    now_utc: DateTime<Utc>,
    zone: &Zone,
) -> Result<Vec<Delivery>> {
    let mut due: Vec<usize> = (0..records.len())
        .filter(|&i| now_local >= records[i].next_wake)
        .collect();
    due.sort_by_key(|&i| (records[i].next_wake, records[i].id));

    let mut deliveries = Vec::with_capacity(due.len());
    let mut finished = Vec::new();

    for i in due {
        let record = &mut records[i];
        let mut state = record
            .state()
            .with_context(|| format!("reminder #{}", record.id))?;

        match advance(&mut state, now_local) {
            SchedulerOutcome::Finished => {
                info!(id = record.id, "reminder finished");
                deliveries.push(Delivery {
                    id: record.id,
                    text: notification(&record.label, None, zone),
                    finished: true,
                });
                finished.push(record.id);
            }
            SchedulerOutcome::Updated { next_wake, advanced } => {
                debug!(id = record.id, %next_wake, advanced, "reminder rescheduled");
                record.apply(&state, next_wake);
                record.last_sent_utc = Some(now_utc);
                deliveries.push(Delivery {
                    id: record.id,
                    text: notification(&record.label, Some(next_wake), zone),
                    finished: false,
                });
            }
        }
    }

    records.retain(|r| !finished.contains(&r.id));
    Ok(deliveries)
}

async fn watch(cfg: &Config) -> Result<()> {
    let zone = cfg.zone()?;
    let store = ReminderStore::open_default()?;
    let mut interval = tokio::time::interval(cfg.poll_interval());

    info!(
        store = %store.path().display(),
        %zone,
        every_secs = cfg.poll_interval().as_secs(),
        "watching reminders"
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = run_pass(&store, &zone, false) {
                    error!("reminder pass failed: {e:#}");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("stopping");
                return Ok(());
            }
        }
    }
}
