//! Response Parser
//!
//! Turns raw model output into a [`ParsedResult`]. Agents are prompted to
//! answer with a literal mapping such as
//! `{'thought': 'need the deductions', 'deductions': 'rent=500'}`; the parser
//! accepts exactly that shape (string keys, string or numeric values) and
//! nothing else. There is no evaluation of any kind: text that is not a
//! well-formed mapping literal is rejected and the caller falls back.

use std::fmt;

use crate::error::{AgentError, Result};

/// Key carrying the model's free-form reasoning; never used for routing
pub const THOUGHT_KEY: &str = "thought";

/// A value inside a parsed mapping
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LiteralValue {
    /// Quoted string
    Text(String),
    /// Numeric literal, kept verbatim
    Number(String),
}

impl LiteralValue {
    pub fn as_str(&self) -> &str {
        match self {
            LiteralValue::Text(s) | LiteralValue::Number(s) => s,
        }
    }
}

/// Ordered key/value mapping produced from one completion
///
/// Keys keep the order in which the model wrote them so the rendered form
/// (see the `Display` impl) reads back like the model wrote it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedResult {
    entries: Vec<(String, LiteralValue)>,
}

impl ParsedResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-entry text mapping, the shape of every fallback result
    pub fn single(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut result = Self::new();
        result.insert_text(key, value);
        result
    }

    /// Insert or replace a text value. A replaced key keeps its position.
    pub fn insert_text(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.insert(key.into(), LiteralValue::Text(value.into()));
    }

    /// Insert or replace a numeric value.
    pub fn insert_number(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.insert(key.into(), LiteralValue::Number(value.into()));
    }

    fn insert(&mut self, key: String, value: LiteralValue) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Payload for `key`, numbers rendered as written
    pub fn get(&self, key: &str) -> Option<&str> {
        self.value(key).map(LiteralValue::as_str)
    }

    pub fn value(&self, key: &str) -> Option<&LiteralValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.value(key).is_some()
    }

    /// The model's stated line of thought, if any
    pub fn thought(&self) -> Option<&str> {
        self.get(THOUGHT_KEY)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for ParsedResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&quote_literal(key))?;
            f.write_str(": ")?;
            match value {
                LiteralValue::Text(s) => f.write_str(&quote_literal(s))?,
                LiteralValue::Number(n) => f.write_str(n)?,
            }
        }
        f.write_str("}")
    }
}

/// Quote like a literal-mapping repr: single quotes unless the text contains
/// a single quote and no double quote.
pub(crate) fn quote_literal(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Parser bound to the set of keys an agent is allowed to answer with
#[derive(Clone, Debug)]
pub struct ResponseParser {
    recognized: Vec<String>,
}

impl ResponseParser {
    pub fn new<I, S>(recognized: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            recognized: recognized.into_iter().map(Into::into).collect(),
        }
    }

    pub fn recognized_keys(&self) -> &[String] {
        &self.recognized
    }

    /// Parse `text` and require at least one recognized key.
    pub fn parse(&self, text: &str) -> Result<ParsedResult> {
        let result = parse_literal_mapping(text)?;
        if self.recognized.iter().any(|k| result.contains_key(k)) {
            Ok(result)
        } else {
            Err(AgentError::Parse(format!(
                "mapping has none of the expected keys [{}]",
                self.recognized.join(", ")
            )))
        }
    }
}

/// Parse a single literal mapping, without any key requirements.
pub fn parse_literal_mapping(text: &str) -> Result<ParsedResult> {
    let mut scanner = Scanner::new(text);
    let result = scanner.mapping()?;
    scanner.skip_ws();
    if let Some(c) = scanner.peek() {
        return Err(scanner.error(&format!("unexpected '{}' after mapping", c)));
    }
    Ok(result)
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
}

impl Scanner {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(&format!("expected '{}', found '{}'", expected, c))),
            None => Err(self.error(&format!("expected '{}', found end of input", expected))),
        }
    }

    fn error(&self, msg: &str) -> AgentError {
        AgentError::Parse(format!("{} at offset {}", msg, self.pos))
    }

    fn mapping(&mut self) -> Result<ParsedResult> {
        let mut result = ParsedResult::new();
        self.skip_ws();
        self.expect('{')?;
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(result);
            }
            let key = self.string()?;
            self.skip_ws();
            self.expect(':')?;
            self.skip_ws();
            let value = match self.peek() {
                Some('\'' | '"') => LiteralValue::Text(self.string()?),
                Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => {
                    LiteralValue::Number(self.number()?)
                }
                Some(c) => return Err(self.error(&format!("unsupported value starting with '{}'", c))),
                None => return Err(self.error("expected value, found end of input")),
            };
            result.insert(key, value);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(result),
                Some(c) => return Err(self.error(&format!("expected ',' or '}}', found '{}'", c))),
                None => return Err(self.error("unterminated mapping")),
            }
        }
    }

    fn string(&mut self) -> Result<String> {
        let quote = match self.bump() {
            Some(q @ ('\'' | '"')) => q,
            Some(c) => return Err(self.error(&format!("expected quoted string, found '{}'", c))),
            None => return Err(self.error("expected quoted string, found end of input")),
        };
        let mut out = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some(c @ ('\\' | '\'' | '"')) => out.push(c),
                    Some(c) => {
                        out.push('\\');
                        out.push(c);
                    }
                    None => return Err(self.error("unterminated escape")),
                },
                Some('\n') => return Err(self.error("line break inside string")),
                Some(c) => out.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn number(&mut self) -> Result<String> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.pos += 1;
        }
        let mut digits = 0;
        let mut seen_dot = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits += 1;
            } else if c == '.' && !seen_dot {
                seen_dot = true;
            } else {
                break;
            }
            self.pos += 1;
        }
        if digits == 0 {
            return Err(self.error("malformed number"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }
}
