//! Timezone resolution: an IANA name (`Europe/Moscow`) or a fixed offset
//! (`+02:30`). The core only sees the resulting local civil time.

use std::fmt;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Named(Tz),
    Fixed(FixedOffset),
}

impl Zone {
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if let Some(offset) = parse_offset(value)? {
            return Ok(Zone::Fixed(offset));
        }
        value
            .parse::<Tz>()
            .map(Zone::Named)
            .map_err(|_| anyhow!("unknown timezone: {value:?}"))
    }

    pub fn local_from_utc(&self, utc: DateTime<Utc>) -> NaiveDateTime {
        match self {
            Zone::Named(tz) => utc.with_timezone(tz).naive_local(),
            Zone::Fixed(offset) => utc.with_timezone(offset).naive_local(),
        }
    }

    pub fn now_local(&self) -> NaiveDateTime {
        self.local_from_utc(Utc::now())
    }

    /// `None` for a wall time skipped by a DST jump; an ambiguous wall time
    /// resolves to its earlier instant.
    pub fn to_utc(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            Zone::Named(tz) => tz
                .from_local_datetime(&local)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
            Zone::Fixed(offset) => offset
                .from_local_datetime(&local)
                .single()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Named(tz) => f.write_str(tz.name()),
            Zone::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

/// `Ok(None)` when `value` does not look like an offset at all.
fn parse_offset(value: &str) -> Result<Option<FixedOffset>> {
    let (sign, rest) = if let Some(rest) = value.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = value.strip_prefix('-') {
        (-1, rest)
    } else {
        return Ok(None);
    };

    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = hours
        .parse()
        .with_context(|| format!("bad offset hours in {value:?}"))?;
    let minutes: i32 = minutes
        .parse()
        .with_context(|| format!("bad offset minutes in {value:?}"))?;
    if !(0..60).contains(&minutes) {
        bail!("bad offset minutes in {value:?}");
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .map(Some)
        .ok_or_else(|| anyhow!("offset out of range: {value:?}"))
}
