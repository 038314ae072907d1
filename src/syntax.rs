//! Parser for override assignments.
//!
//! An assignment is a dotted key, an action token and a value:
//!
//! ```text
//! tool.build.args+=[-j, 4]
//! tool."odd key".flags=!
//! tool.env.PATH=+(path)/opt/bin
//! tool.env = {CC = gcc, CXX = "g++"}
//! ```
//!
//! Keys are bare (letters, digits, `_`, `-`) or quoted. Values are either a
//! structured literal (arrays, inline tables, quoted strings) or the rest of the
//! input, trimmed. Bare values that are exactly an integer or a boolean are
//! typed; everything else is a string. Override files hold one assignment per
//! line and allow `#` comments; a single command-line assignment does not.

use crate::error::ConfigError;
use crate::node::{Node, Table};
use crate::path::ConfPath;
use crate::types::OverrideAction;

/// One parsed `key<action>value` assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub action: OverrideAction,
    pub key: ConfPath,
    /// [`Node::Absent`] for `=!`.
    pub value: Node,
}

/// Parse a single command-line assignment.
pub fn parse_assignment(text: &str) -> Result<Assignment, ConfigError> {
    Parser::new(text, 1, false).assignment()
}

/// Parse an override file: one assignment per line, blank lines and `#`
/// comments ignored.
pub fn parse_assignments(text: &str) -> Result<Vec<Assignment>, ConfigError> {
    let mut assignments = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let mut parser = Parser::new(line, index + 1, true);
        parser.skip_ws();
        if parser.at_value_end() {
            continue;
        }
        assignments.push(parser.assignment()?);
    }
    Ok(assignments)
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
    line: usize,
    comments: bool,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str, line: usize, comments: bool) -> Self {
        Self {
            text,
            pos: 0,
            line,
            comments,
        }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// End of input, or the start of a comment where comments are allowed.
    fn at_value_end(&self) -> bool {
        match self.peek() {
            None => true,
            Some('#') => self.comments,
            Some(_) => false,
        }
    }

    fn error(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::Syntax {
            line: self.line,
            column: self.text[..self.pos].chars().count() + 1,
            message: message.into(),
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), ConfigError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.bump();
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected '{expected}', found '{c}'"))),
            None => Err(self.error(format!("expected '{expected}', found end of input"))),
        }
    }

    fn assignment(&mut self) -> Result<Assignment, ConfigError> {
        self.skip_ws();
        let key = self.key()?;
        self.skip_ws();
        let action = self.action()?;
        let value = match action {
            OverrideAction::Clear => Node::Absent,
            _ => self.value()?,
        };
        self.skip_ws();
        if !self.at_value_end() {
            return Err(self.error("unexpected characters after the value"));
        }
        Ok(Assignment { action, key, value })
    }

    fn key(&mut self) -> Result<ConfPath, ConfigError> {
        let mut segments = vec![self.key_segment()?];
        loop {
            self.skip_ws();
            if self.peek() != Some('.') {
                break;
            }
            self.bump();
            self.skip_ws();
            segments.push(self.key_segment()?);
        }
        Ok(ConfPath::new(segments))
    }

    fn key_segment(&mut self) -> Result<String, ConfigError> {
        match self.peek() {
            Some('"') => self.quoted(),
            Some('\'') => self.literal(),
            _ => {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    let is_key_char = c.is_alphanumeric() || c == '_' || c == '-';
                    // `-=` ends the key.
                    if !is_key_char || (c == '-' && self.rest()[1..].starts_with('=')) {
                        break;
                    }
                    self.bump();
                }
                if self.pos == start {
                    return Err(self.error("expected a key"));
                }
                Ok(self.text[start..self.pos].to_string())
            }
        }
    }

    fn action(&mut self) -> Result<OverrideAction, ConfigError> {
        let rest = self.rest();
        let Some(action) = OverrideAction::BY_TOKEN_LENGTH
            .into_iter()
            .find(|action| rest.starts_with(action.token()))
        else {
            let tokens: Vec<&str> = OverrideAction::BY_TOKEN_LENGTH
                .iter()
                .map(|action| action.token())
                .collect();
            return Err(self.error(format!("expected one of {}", tokens.join(" "))));
        };
        self.pos += action.token().len();
        Ok(action)
    }

    /// The top-level value: a structured literal, or everything up to the end.
    fn value(&mut self) -> Result<Node, ConfigError> {
        let start = self.pos;
        self.skip_ws();
        match self.peek() {
            Some('[' | '{') => self.structured(),
            Some('"') => self.quoted().map(Node::Str),
            Some('\'') => self.literal().map(Node::Str),
            _ => {
                self.pos = start;
                while !self.at_value_end() {
                    self.bump();
                }
                Ok(bare_scalar(self.text[start..self.pos].trim()))
            }
        }
    }

    fn structured(&mut self) -> Result<Node, ConfigError> {
        match self.bump() {
            Some('[') => {
                let mut items = Vec::new();
                self.skip_ws();
                while self.peek() != Some(']') {
                    items.push(self.element()?);
                    if !self.separator(']')? {
                        break;
                    }
                }
                self.expect(']')?;
                Ok(Node::List(items))
            }
            Some('{') => {
                let mut table = Table::new();
                self.skip_ws();
                while self.peek() != Some('}') {
                    let key = self.key_segment()?;
                    self.skip_ws();
                    self.expect('=')?;
                    let value = self.element()?;
                    table.insert(key, value);
                    if !self.separator('}')? {
                        break;
                    }
                }
                self.expect('}')?;
                Ok(Node::Table(table))
            }
            _ => Err(self.error("expected '[' or '{'")),
        }
    }

    /// After an element: consume a `,` (returning whether more may follow) or
    /// stop in front of `close`.
    fn separator(&mut self, close: char) -> Result<bool, ConfigError> {
        self.skip_ws();
        match self.peek() {
            Some(',') => {
                self.bump();
                self.skip_ws();
                Ok(true)
            }
            Some(c) if c == close => Ok(false),
            _ => Err(self.error(format!("expected ',' or '{close}'"))),
        }
    }

    /// A value inside a structured literal.
    fn element(&mut self) -> Result<Node, ConfigError> {
        self.skip_ws();
        match self.peek() {
            Some('[' | '{') => self.structured(),
            Some('"') => self.quoted().map(Node::Str),
            Some('\'') => self.literal().map(Node::Str),
            _ => {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if matches!(c, ',' | ']' | '}') || self.at_value_end() {
                        break;
                    }
                    self.bump();
                }
                let token = self.text[start..self.pos].trim();
                if token.is_empty() {
                    return Err(self.error("expected a value"));
                }
                Ok(bare_scalar(token))
            }
        }
    }

    /// A double-quoted string with backslash escapes.
    fn quoted(&mut self) -> Result<String, ConfigError> {
        self.expect('"')?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some('"') => return Ok(out),
                Some('\\') => out.push(self.escape()?),
                Some(c) => out.push(c),
            }
        }
    }

    fn escape(&mut self) -> Result<char, ConfigError> {
        let c = match self.bump() {
            Some('\\') => '\\',
            Some('"') => '"',
            Some('\'') => '\'',
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('0') => '\0',
            Some('u') => self.unicode(4)?,
            Some('U') => self.unicode(8)?,
            Some(other) => return Err(self.error(format!("invalid escape sequence '\\{other}'"))),
            None => return Err(self.error("unterminated string")),
        };
        Ok(c)
    }

    fn unicode(&mut self, digits: usize) -> Result<char, ConfigError> {
        let hex = self
            .rest()
            .get(..digits)
            .filter(|hex| hex.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| self.error(format!("expected {digits} hexadecimal digits")))?;
        let c = u32::from_str_radix(hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.error(format!("invalid unicode scalar value {hex}")))?;
        self.pos += digits;
        Ok(c)
    }

    /// A single-quoted string, taken literally.
    fn literal(&mut self) -> Result<String, ConfigError> {
        self.expect('\'')?;
        let start = self.pos;
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some('\'') => return Ok(self.text[start..self.pos - 1].to_string()),
                Some(_) => {}
            }
        }
    }
}

/// A bare token: an integer or boolean when it is exactly one, else a string.
fn bare_scalar(token: &str) -> Node {
    match token {
        "true" | "True" => return Node::Bool(true),
        "false" | "False" => return Node::Bool(false),
        _ => {}
    }
    match token.parse::<i64>() {
        Ok(i) if i.to_string() == token => Node::Int(i),
        _ => Node::Str(token.to_string()),
    }
}
