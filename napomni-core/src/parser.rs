//! Temporal expression parser for Russian reminder commands.
//!
//! The command is tokenized once (see `lexer`) and then read clause by clause:
//!
//! ```text
//! command     := [template] LABEL date_clause ... [repeat] ... [leads]
//! template    := "День рождения" | "Праздник" | "Напомни о"
//! date_clause := NUMBER month ... [YEAR] ... [TIME]
//!              | ["в"] ["следующ-"] (сегодня | завтра | послезавтра | weekday) ... [TIME]
//! repeat      := "Повтор" ("раз в" | "кажд-") [NUMBER] (unit | weekday)
//! leads       := "Напомни(ть)" ("за" [NUMBER] unit) {"," "за" [NUMBER] unit}
//! ```
//!
//! The date words must follow the label directly. The time is the first
//! `HH:MM` anywhere after them; the year is the first four-digit number after
//! them that is not inside a repeat or lead clause (a marker up to the next
//! period), so "за 2027 дней" is never a year. Templates carry no meaning:
//! the label is always the first double-quoted span.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ParseError;
use crate::lead_times::LeadTimeSet;
use crate::lexer::{Lexeme, Token, tokenize};
use crate::units::{IntervalQuantity, Recurrence, WeekdayUnit};

/// Genitive month names, January first.
pub const MONTHS: [&str; 12] = [
    "января",
    "февраля",
    "марта",
    "апреля",
    "мая",
    "июня",
    "июля",
    "августа",
    "сентября",
    "октября",
    "ноября",
    "декабря",
];

const REPEAT_MARKERS: [&str; 2] = ["повтор", "повторять"];
const REMIND_MARKERS: [&str; 3] = ["напомни", "напомнить", "напоминать"];

/// Time of day used when the command has no explicit `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    pub hour: u32,
    pub minute: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self { hour: 10, minute: 0 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseResult {
    pub label: String,
    /// Local civil time of the first occurrence.
    pub target: NaiveDateTime,
    pub recurrence: Option<Recurrence>,
    pub lead_times: LeadTimeSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateClause {
    Absolute {
        day: u32,
        month: u32,
        year: Option<i32>,
    },
    Today,
    Tomorrow,
    DayAfterTomorrow,
    Weekday(WeekdayUnit),
}

/// Parse a reminder command against `reference`, the caller's "now" in local
/// civil time.
///
/// A target that lands before `reference` is rolled forward once: by a day
/// for "сегодня", by a year for every other date form. There is no search
/// for the closest future occurrence beyond that.
pub fn parse(
    command: &str,
    reference: NaiveDateTime,
    defaults: Defaults,
) -> Result<ParseResult, ParseError> {
    let parser = Parser::new(command);

    let (label_at, label) = parser.label()?;
    let body = label_at + 1;
    let (date, time) = parser.date_clause(body, parser.clause_end(body))?;
    let target = resolve(date, time, reference, defaults)?;
    let recurrence = parser.recurrence(body)?;
    let lead_times = parser.lead_times(body)?;

    debug!(
        label,
        %target,
        recurrence = ?recurrence.map(|r| r.to_string()),
        leads = lead_times.len(),
        "parsed reminder command"
    );

    Ok(ParseResult {
        label: label.to_string(),
        target,
        recurrence,
        lead_times,
    })
}

fn month_number(word: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|m| *m == word)
        .and_then(|i| u32::try_from(i + 1).ok())
}

fn is_marker(lexeme: &Lexeme<'_>) -> bool {
    lexeme
        .word()
        .is_some_and(|w| REPEAT_MARKERS.contains(&w) || REMIND_MARKERS.contains(&w))
}

fn is_boundary(lexeme: &Lexeme<'_>) -> bool {
    lexeme.is_punct('.') || is_marker(lexeme)
}

fn resolve(
    date: DateClause,
    time: Option<(u32, u32)>,
    reference: NaiveDateTime,
    defaults: Defaults,
) -> Result<NaiveDateTime, ParseError> {
    let (hour, minute) = time.unwrap_or((defaults.hour, defaults.minute));
    let time = NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| ParseError::InvalidDateTime(format!("{hour:02}:{minute:02}")))?;

    let day = match date {
        DateClause::Absolute { day, month, year } => {
            let year = year.unwrap_or(reference.year());
            NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
                ParseError::InvalidDateTime(format!("{day:02}.{month:02}.{year}"))
            })?
        }
        DateClause::Today => reference.date(),
        DateClause::Tomorrow => reference.date() + Duration::days(1),
        DateClause::DayAfterTomorrow => reference.date() + Duration::days(2),
        DateClause::Weekday(weekday) => weekday.next_after(reference).date(),
    };

    let target = day.and_time(time);
    if target >= reference {
        return Ok(target);
    }
    if date == DateClause::Today {
        return Ok(target + Duration::days(1));
    }
    target.with_year(target.year() + 1).ok_or_else(|| {
        ParseError::InvalidDateTime(format!(
            "{} rolled into {}",
            target.format("%d.%m.%Y"),
            target.year() + 1
        ))
    })
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Lexeme<'a>>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            tokens: tokenize(input),
        }
    }

    /// Source text covered by tokens `from..to`.
    fn fragment(&self, from: usize, to: usize) -> String {
        let to = to.min(self.tokens.len());
        if from >= to {
            return String::new();
        }
        self.input[self.tokens[from].start..self.tokens[to - 1].end].to_string()
    }

    fn word(&self, i: usize) -> Option<&str> {
        self.tokens.get(i).and_then(Lexeme::word)
    }

    fn sentence_end(&self, from: usize) -> usize {
        self.tokens[from.min(self.tokens.len())..]
            .iter()
            .position(|l| l.is_punct('.'))
            .map_or(self.tokens.len(), |p| from + p)
    }

    fn clause_end(&self, from: usize) -> usize {
        self.tokens[from.min(self.tokens.len())..]
            .iter()
            .position(is_boundary)
            .map_or(self.tokens.len(), |p| from + p)
    }

    fn label(&self) -> Result<(usize, &'a str), ParseError> {
        let (at, label) = self
            .tokens
            .iter()
            .enumerate()
            .find_map(|(i, l)| match l.token {
                Token::Quoted(text) => Some((i, text)),
                _ => None,
            })
            .ok_or_else(|| {
                ParseError::GrammarMismatch(format!("no quoted label in {:?}", self.input))
            })?;
        if label.trim().is_empty() {
            return Err(ParseError::GrammarMismatch(format!(
                "empty label in {:?}",
                self.input
            )));
        }
        Ok((at, label))
    }

    fn time_after(&self, from: usize) -> Option<(u32, u32)> {
        self.tokens.get(from..)?.iter().find_map(|l| match l.token {
            Token::Time { hour, minute } => Some((hour, minute)),
            _ => None,
        })
    }

    fn year_after(&self, from: usize) -> Option<i32> {
        let mut in_marker_clause = false;
        for lexeme in self.tokens.get(from..)? {
            if lexeme.is_punct('.') {
                in_marker_clause = false;
            } else if is_marker(lexeme) {
                in_marker_clause = true;
            } else if let Token::Number(raw) = lexeme.token {
                if !in_marker_clause && raw.len() == 4 {
                    return raw.parse().ok();
                }
            }
        }
        None
    }

    fn date_clause(
        &self,
        from: usize,
        to: usize,
    ) -> Result<(DateClause, Option<(u32, u32)>), ParseError> {
        let clause = &self.tokens[from.min(to)..to];
        let mismatch = |what: &str| {
            ParseError::GrammarMismatch(format!(
                "expected {what} after the label, found {:?}",
                self.fragment(from, to)
            ))
        };

        match clause.first().map(|l| &l.token) {
            Some(Token::Number(raw)) => {
                let day: u32 = match raw.len() {
                    1 | 2 => raw.parse().map_err(|_| mismatch("a day of month"))?,
                    _ => return Err(mismatch("a day of month")),
                };
                let month_word = clause
                    .get(1)
                    .and_then(Lexeme::word)
                    .ok_or_else(|| mismatch("a month name"))?;
                let month = month_number(month_word)
                    .ok_or_else(|| ParseError::UnknownMonth(month_word.to_string()))?;
                let date = DateClause::Absolute {
                    day,
                    month,
                    year: self.year_after(from + 2),
                };
                Ok((date, self.time_after(from + 2)))
            }
            Some(Token::Word(_)) => {
                let mut i = 0;
                if clause[i].is_word("в") || clause[i].is_word("во") {
                    i += 1;
                }
                if clause
                    .get(i)
                    .and_then(Lexeme::word)
                    .is_some_and(|w| w.starts_with("следующ"))
                {
                    i += 1;
                }
                let word = clause
                    .get(i)
                    .and_then(Lexeme::word)
                    .ok_or_else(|| mismatch("a day or weekday"))?;
                let date = match word {
                    "сегодня" => DateClause::Today,
                    "завтра" => DateClause::Tomorrow,
                    "послезавтра" => DateClause::DayAfterTomorrow,
                    other => WeekdayUnit::from_locale(other)
                        .map(DateClause::Weekday)
                        .ok_or_else(|| ParseError::UnknownRelativeToken(other.to_string()))?,
                };
                Ok((date, self.time_after(from + i + 1)))
            }
            _ => Err(mismatch("a date")),
        }
    }

    /// Optional positive count at token `i`; `item` marks where the enclosing
    /// clause starts, for the error message.
    fn count_at(&self, i: usize, item: usize) -> Result<(Option<u32>, usize), ParseError> {
        match self.tokens.get(i).map(|l| &l.token) {
            Some(Token::Number(raw)) => match raw.parse::<u32>() {
                Ok(n) if n > 0 => Ok((Some(n), i + 1)),
                _ => Err(ParseError::GrammarMismatch(format!(
                    "count must be a positive number in {:?}",
                    self.fragment(item, i + 1)
                ))),
            },
            _ => Ok((None, i)),
        }
    }

    fn recurrence(&self, from: usize) -> Result<Option<Recurrence>, ParseError> {
        let Some(start) = (from..self.tokens.len())
            .find(|&i| self.word(i).is_some_and(|w| REPEAT_MARKERS.contains(&w)))
        else {
            return Ok(None);
        };
        let end = self.sentence_end(start);
        let mismatch = |what: &str| {
            ParseError::GrammarMismatch(format!(
                "{what} in {:?}",
                self.fragment(start, end)
            ))
        };

        let mut i = start + 1;
        match self.word(i) {
            Some("раз") if matches!(self.word(i + 1), Some("в" | "во")) => i += 2,
            Some(w) if w.starts_with("кажд") => i += 1,
            _ => return Err(mismatch("expected \"раз в\" or \"каждый\"")),
        }

        let (count, i) = self.count_at(i, start)?;
        let unit_word = self
            .word(i)
            .ok_or_else(|| mismatch("expected a unit or a weekday"))?;
        let recurrence = Recurrence::from_locale(unit_word)
            .ok_or_else(|| ParseError::UnknownDurationUnit(unit_word.to_string()))?;

        match (recurrence, count) {
            (Recurrence::Interval(q), Some(n)) => q
                .scaled(n)
                .map(|q| Some(Recurrence::Interval(q)))
                .ok_or_else(|| mismatch("interval too long")),
            (Recurrence::Weekday(_), Some(n)) if n != 1 => {
                Err(mismatch("a weekday repeat takes no count"))
            }
            (recurrence, _) => Ok(Some(recurrence)),
        }
    }

    fn lead_times(&self, from: usize) -> Result<LeadTimeSet, ParseError> {
        let mut set = LeadTimeSet::new();
        let Some(marker) = (from..self.tokens.len()).find(|&i| {
            self.word(i).is_some_and(|w| REMIND_MARKERS.contains(&w)) && self.word(i + 1) == Some("за")
        }) else {
            return Ok(set);
        };

        let mut i = marker + 1;
        while let Some(lexeme) = self.tokens.get(i) {
            if lexeme.is_punct(',') || lexeme.is_word("и") {
                i += 1;
                continue;
            }
            if !lexeme.is_word("за") {
                break;
            }
            let item = i;
            let (count, at) = self.count_at(i + 1, item)?;
            let word = self.word(at).ok_or_else(|| {
                ParseError::GrammarMismatch(format!(
                    "expected a unit in {:?}",
                    self.fragment(item, at + 1)
                ))
            })?;
            let lead = IntervalQuantity::from_locale(word)
                .ok_or_else(|| ParseError::UnknownDurationUnit(word.to_string()))?;
            let lead = match count {
                Some(n) => lead.scaled(n).ok_or_else(|| {
                    ParseError::GrammarMismatch(format!(
                        "lead time too long in {:?}",
                        self.fragment(item, at + 1)
                    ))
                })?,
                None => lead,
            };
            set.insert(lead);
            i = at + 1;
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::DurationUnit;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn reference() -> NaiveDateTime {
        at(2025, 8, 9, 22, 0)
    }

    fn defaults() -> Defaults {
        Defaults { hour: 11, minute: 0 }
    }

    fn target(command: &str) -> NaiveDateTime {
        parse(command, reference(), defaults()).unwrap().target
    }

    fn q(count: u32, unit: DurationUnit) -> IntervalQuantity {
        IntervalQuantity::new(count, unit).unwrap()
    }

    #[test]
    fn today_past_default_rolls_one_day() {
        assert_eq!(target(r#"Напомни о "Покупки" сегодня"#), at(2025, 8, 10, 11, 0));
    }

    #[test]
    fn today_with_future_time_stays_today() {
        let reference = at(2025, 8, 9, 9, 0);
        let parsed = parse(r#"Напомни о "Покупки" сегодня в 18:00"#, reference, defaults()).unwrap();
        assert_eq!(parsed.target, at(2025, 8, 9, 18, 0));
    }

    #[test]
    fn relative_days() {
        assert_eq!(target(r#"Напомни о "x" завтра"#), at(2025, 8, 10, 11, 0));
        assert_eq!(target(r#"Напомни о "x" послезавтра"#), at(2025, 8, 11, 11, 0));
        assert_eq!(target(r#"Напомни о "x" завтра в 07:30"#), at(2025, 8, 10, 7, 30));
    }

    #[test]
    fn weekday_never_matches_same_day() {
        // reference is a Saturday
        assert_eq!(target(r#"Напомни о "x" в субботу"#), at(2025, 8, 16, 11, 0));
        assert_eq!(target(r#"Напомни о "x" в следующее воскресенье"#), at(2025, 8, 10, 11, 0));
        assert_eq!(target(r#"Напомни о "x" в понедельник"#), at(2025, 8, 11, 11, 0));
    }

    #[test]
    fn absolute_date_in_past_rolls_a_year() {
        assert_eq!(target(r#"День рождения "xxx" 10 февраля"#), at(2026, 2, 10, 11, 0));
        assert_eq!(target(r#"Праздник "Новый год" 29 декабря"#), at(2025, 12, 29, 11, 0));
    }

    #[test]
    fn explicit_year_and_time() {
        assert_eq!(
            target(r#"Напомни о "x" 10 февраля 2027 года в 14:55"#),
            at(2027, 2, 10, 14, 55)
        );
    }

    #[test]
    fn time_after_the_first_sentence_applies() {
        assert_eq!(target(r#"Напомни о "x" 10 февраля. В 14:55"#), at(2026, 2, 10, 14, 55));
        assert_eq!(
            target(r#"Напомни о "x" 10 февраля. Повтор каждый год в 14:55"#),
            at(2026, 2, 10, 14, 55)
        );
        assert_eq!(target(r#"Напомни о "x" завтра. В 07:15"#), at(2025, 8, 10, 7, 15));
    }

    #[test]
    fn year_after_the_first_sentence_applies() {
        assert_eq!(target(r#"Напомни о "x" 10 февраля. 2027 год"#), at(2027, 2, 10, 11, 0));
        assert_eq!(
            target(r#"Напомни о "x" 10 февраля. Повтор раз в 2028 дней. В 2027 году"#),
            at(2027, 2, 10, 11, 0)
        );
    }

    #[test]
    fn lead_time_count_is_not_a_year() {
        let parsed = parse(
            r#"Напомни о "x" 10 февраля. Напомнить за 2027 дней"#,
            reference(),
            defaults(),
        )
        .unwrap();
        assert_eq!(parsed.target, at(2026, 2, 10, 11, 0));
        assert_eq!(parsed.lead_times.to_vec(), vec![q(2027, DurationUnit::Day)]);
    }

    #[test]
    fn label_keeps_original_text() {
        let parsed = parse(r#"Напомни о "Чатик 🍕" завтра"#, reference(), defaults()).unwrap();
        assert_eq!(parsed.label, "Чатик 🍕");
        let parsed = parse(r#""Встреча с Коляном" сегодня"#, reference(), defaults()).unwrap();
        assert_eq!(parsed.label, "Встреча с Коляном");
    }

    #[test]
    fn recurrence_forms() {
        let rec = |command: &str| parse(command, reference(), defaults()).unwrap().recurrence;
        assert_eq!(
            rec(r#"Напомни о "x" завтра. Повтор каждый день"#),
            Some(q(1, DurationUnit::Day).into())
        );
        assert_eq!(
            rec(r#"Напомни о "x" завтра. Повтор раз в полгода"#),
            Some(q(6, DurationUnit::Month).into())
        );
        assert_eq!(
            rec(r#"Напомни о "x" завтра. Повтор каждые 4 дня"#),
            Some(q(4, DurationUnit::Day).into())
        );
        assert_eq!(
            rec(r#"Напомни о "x" завтра. Повтор каждую среду"#),
            Some(WeekdayUnit::Wednesday.into())
        );
        assert_eq!(rec(r#"Напомни о "x" завтра"#), None);
    }

    #[test]
    fn recurrence_errors() {
        let err = |command: &str| parse(command, reference(), defaults()).unwrap_err();
        assert!(matches!(
            err(r#"Напомни о "x" завтра. Повтор иногда"#),
            ParseError::GrammarMismatch(_)
        ));
        assert_eq!(
            err(r#"Напомни о "x" завтра. Повтор каждый час"#),
            ParseError::UnknownDurationUnit("час".into())
        );
        assert!(matches!(
            err(r#"Напомни о "x" завтра. Повтор каждые 2 среды"#),
            ParseError::UnknownDurationUnit(_)
        ));
        assert!(matches!(
            err(r#"Напомни о "x" завтра. Повтор каждые 2 среду"#),
            ParseError::GrammarMismatch(_)
        ));
        assert!(matches!(
            err(r#"Напомни о "x" завтра. Повтор каждые 0 дней"#),
            ParseError::GrammarMismatch(_)
        ));
    }

    #[test]
    fn lead_times_in_input_order_with_overwrite() {
        let parsed = parse(
            r#"Напомни о "x" завтра. Напомнить за неделю, за 2 дня, за 7 дней, за 3 дня, за 2 дня, за день"#,
            reference(),
            defaults(),
        )
        .unwrap();
        assert_eq!(
            parsed.lead_times.to_vec(),
            vec![
                q(7, DurationUnit::Day),
                q(3, DurationUnit::Day),
                q(2, DurationUnit::Day),
                q(1, DurationUnit::Day),
            ]
        );
    }

    #[test]
    fn lead_time_errors() {
        let err = |command: &str| parse(command, reference(), defaults()).unwrap_err();
        assert_eq!(
            err(r#"Напомни о "x" завтра. Напомнить за час"#),
            ParseError::UnknownDurationUnit("час".into())
        );
        assert!(matches!(
            err(r#"Напомни о "x" завтра. Напомнить за 3"#),
            ParseError::GrammarMismatch(_)
        ));
    }

    #[test]
    fn grammar_errors() {
        let err = |command: &str| parse(command, reference(), defaults()).unwrap_err();
        assert!(matches!(err("Некорректная команда"), ParseError::GrammarMismatch(_)));
        assert!(matches!(err(r#"Напомни о "x""#), ParseError::GrammarMismatch(_)));
        assert!(matches!(err(r#"Напомни о "  " завтра"#), ParseError::GrammarMismatch(_)));
        assert_eq!(
            err(r#"Напомни о "x" 10 брюмера"#),
            ParseError::UnknownMonth("брюмера".into())
        );
        assert_eq!(
            err(r#"Напомни о "x" в пятничку"#),
            ParseError::UnknownRelativeToken("пятничку".into())
        );
    }

    #[test]
    fn impossible_dates_are_errors() {
        let err = |command: &str| parse(command, reference(), defaults()).unwrap_err();
        assert!(matches!(err(r#"Напомни о "x" 30 февраля"#), ParseError::InvalidDateTime(_)));
        assert!(matches!(err(r#"Напомни о "x" завтра в 25:00"#), ParseError::InvalidDateTime(_)));
        // 29.02.2024 is in the past and 2025 has no 29 February
        assert!(matches!(
            err(r#"Напомни о "x" 29 февраля 2024"#),
            ParseError::InvalidDateTime(_)
        ));
    }

    #[test]
    fn error_carries_offending_fragment() {
        let err = parse(r#"Напомни о "x" завтра. Повтор иногда. Ещё"#, reference(), defaults()).unwrap_err();
        assert!(err.to_string().contains("Повтор иногда"));
        assert!(!err.to_string().contains("Ещё"));
    }
}
