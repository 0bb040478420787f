//! Tokenizer for reminder commands.
//!
//! One regex pass splits the command into a closed token set; the grammar in
//! `parser` then works over tokens instead of raw text. Words are lower-cased,
//! quoted labels keep their original spelling.

use std::sync::LazyLock;

use regex::Regex;

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#""(?P<quoted>[^"]+)""#,
        r"|(?P<time>[0-9]{1,2}:[0-9]{2})",
        r"|(?P<number>[0-9]+)",
        r"|(?P<word>\p{L}+(?:-\p{L}+)*)",
        r"|(?P<punct>[^\s\p{L}\p{N}])",
    ))
    .expect("token pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    /// Content between double quotes.
    Quoted(&'a str),
    /// `HH:MM`; range is checked when the time is built.
    Time { hour: u32, minute: u32 },
    /// ASCII digits, kept as text so the digit count can be checked.
    Number(&'a str),
    Word(String),
    Punct(char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Lexeme<'a> {
    pub token: Token<'a>,
    /// Byte range in the source text.
    pub start: usize,
    pub end: usize,
}

impl Lexeme<'_> {
    pub fn word(&self) -> Option<&str> {
        match &self.token {
            Token::Word(w) => Some(w.as_str()),
            _ => None,
        }
    }

    pub fn is_word(&self, expected: &str) -> bool {
        self.word() == Some(expected)
    }

    pub fn is_punct(&self, expected: char) -> bool {
        self.token == Token::Punct(expected)
    }
}

pub(crate) fn tokenize(input: &str) -> Vec<Lexeme<'_>> {
    TOKEN_RE
        .captures_iter(input)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let token = if let Some(m) = caps.name("quoted") {
                Token::Quoted(m.as_str())
            } else if let Some(m) = caps.name("time") {
                let (h, mm) = m.as_str().split_once(':')?;
                Token::Time {
                    hour: h.parse().ok()?,
                    minute: mm.parse().ok()?,
                }
            } else if let Some(m) = caps.name("number") {
                Token::Number(m.as_str())
            } else if let Some(m) = caps.name("word") {
                Token::Word(m.as_str().to_lowercase())
            } else {
                Token::Punct(caps.name("punct")?.as_str().chars().next()?)
            };
            Some(Lexeme {
                token,
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}
