//! napomni-core: parsing and scheduling of Russian-language reminders
//!
//! `parse` turns a command such as
//! `Напомни о "Покупки" завтра в 18:00. Повтор каждую субботу` into a
//! [`ParseResult`]; `advance` keeps the resulting [`ReminderState`] moving as
//! time passes. Both are pure functions of their inputs and work in local
//! civil time.

pub mod error;
pub mod lead_times;
mod lexer;
pub mod parser;
pub mod scheduler;
pub mod units;

pub use error::{ModelError, ParseError};
pub use lead_times::LeadTimeSet;
pub use parser::{parse, Defaults, ParseResult};
pub use scheduler::{advance, next_wake, notify_plan, PlannedNotice, ReminderState, SchedulerOutcome};
pub use units::{DurationUnit, IntervalQuantity, Recurrence, WeekdayUnit};
