use chrono::NaiveDateTime;
use napomni_core::{ReminderState, notify_plan};

use crate::store::StoredReminder;
use crate::tz::Zone;

pub const DATETIME_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

pub fn datetime_to_str(dt: NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

/// Local time followed by its UTC counterpart.
pub fn local_and_utc(local: NaiveDateTime, zone: &Zone) -> String {
    match zone.to_utc(local) {
        Some(utc) => format!(
            "{} (UTC {})",
            datetime_to_str(local),
            datetime_to_str(utc.naive_utc())
        ),
        None => format!("{} (no such time in {zone})", datetime_to_str(local)),
    }
}

pub fn summary(record: &StoredReminder, state: &ReminderState, zone: &Zone) -> String {
    let mut lines = vec![
        format!("#{} {}", record.id, record.label),
        format!("  target: {}", local_and_utc(state.target, zone)),
        format!("  next:   {}", local_and_utc(record.next_wake, zone)),
        format!(
            "  repeat: {}",
            state
                .recurrence
                .map_or_else(|| "none".to_string(), |r| r.to_string())
        ),
    ];

    if state.lead_times.is_empty() {
        lines.push("  no lead times".to_string());
    } else {
        lines.push("  lead times:".to_string());
        for notice in notify_plan(state.target, &state.lead_times) {
            if let Some(lead) = notice.lead {
                lines.push(format!("    {}: {}", lead, local_and_utc(notice.at, zone)));
            }
        }
    }
    lines.join("\n")
}

/// Text delivered when a reminder fires; `next` is absent for the last one.
pub fn notification(label: &str, next: Option<NaiveDateTime>, zone: &Zone) -> String {
    match next {
        Some(next) => format!("⌛ {label}\n  next: {}", local_and_utc(next, zone)),
        None => format!("⌛ {label}"),
    }
}
