//! S-Expression codec
//!
//! Project and job files are stored as S-expressions. The parser keeps the
//! distinction between bare symbols and quoted strings so that nodes written
//! by a newer tool version can be re-emitted without changing their text.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Unexpected end of input")]
    UnexpectedEof,
    #[error("Unexpected token: {0}")]
    UnexpectedToken(String),
    #[error("Parse error at position {0}: {1}")]
    ParseError(usize, String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SExp {
    /// Bare symbol, e.g. `default` or a UUID.
    Atom(String),
    /// Quoted string.
    Str(String),
    List(Vec<SExp>),
}

impl SExp {
    pub fn atom(s: impl Into<String>) -> Self {
        SExp::Atom(s.into())
    }

    pub fn string(s: impl Into<String>) -> Self {
        SExp::Str(s.into())
    }

    /// Creates a list whose first element is the symbol `head`.
    pub fn list(head: &str) -> Self {
        SExp::List(vec![SExp::atom(head)])
    }

    /// Builder variant of [`SExp::push`].
    pub fn with(mut self, item: SExp) -> Self {
        self.push(item);
        self
    }

    pub fn push(&mut self, item: SExp) {
        if let SExp::List(items) = self {
            items.push(item);
        }
    }

    pub fn as_atom(&self) -> Option<&str> {
        match self {
            SExp::Atom(s) | SExp::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SExp]> {
        match self {
            SExp::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<SExp>> {
        match self {
            SExp::List(items) => Some(items),
            _ => None,
        }
    }

    /// The symbol at the head of a list, e.g. `job` for `(job ...)`.
    pub fn head(&self) -> Option<&str> {
        self.as_list()
            .and_then(|items| items.first())
            .and_then(|first| first.as_atom())
    }

    /// The n-th atom after the head of a list.
    pub fn value(&self, index: usize) -> Option<&str> {
        self.as_list()
            .and_then(|items| items.get(index + 1))
            .and_then(|item| item.as_atom())
    }

    /// First child list starting with `key`.
    pub fn child(&self, key: &str) -> Option<&SExp> {
        self.as_list()?
            .iter()
            .skip(1)
            .find(|item| item.head() == Some(key))
    }

    /// Follows a `/`-separated path of child lists, e.g. `drills/merge`.
    pub fn child_path(&self, path: &str) -> Option<&SExp> {
        path.split('/')
            .try_fold(self, |node, key| node.child(key))
    }

    /// First atom of the child list at `path`.
    pub fn child_value(&self, path: &str) -> Option<&str> {
        self.child_path(path).and_then(|node| node.value(0))
    }

    /// All child lists starting with `key`, in document order.
    pub fn children(&self, key: &str) -> Vec<&SExp> {
        let mut results = Vec::new();
        if let SExp::List(items) = self {
            for item in items.iter().skip(1) {
                if item.head() == Some(key) {
                    results.push(item);
                }
            }
        }
        results
    }

    /// Renders the expression with one nested block per line.
    ///
    /// Short lists (no grandchildren lists) stay on a single line, everything
    /// else puts each child list on its own line indented by one space.
    pub fn to_pretty_string(&self) -> String {
        let mut out = String::new();
        self.write_pretty(&mut out, 0);
        out.push('\n');
        out
    }

    fn write_pretty(&self, out: &mut String, indent: usize) {
        let items = match self {
            SExp::List(items) if !self.is_inline() => items,
            _ => {
                out.push_str(&self.to_string());
                return;
            }
        };
        out.push('(');
        let mut first = true;
        let mut in_block = false;
        for item in items {
            if matches!(item, SExp::List(_)) {
                out.push('\n');
                out.push_str(&" ".repeat(indent + 1));
                item.write_pretty(out, indent + 1);
                in_block = true;
            } else {
                if in_block {
                    out.push('\n');
                    out.push_str(&" ".repeat(indent + 1));
                } else if !first {
                    out.push(' ');
                }
                out.push_str(&item.to_string());
            }
            first = false;
        }
        if in_block {
            out.push('\n');
            out.push_str(&" ".repeat(indent));
        }
        out.push(')');
    }

    fn is_inline(&self) -> bool {
        match self {
            SExp::List(items) => items.iter().all(|item| match item {
                SExp::List(sub) => sub.iter().all(|s| !matches!(s, SExp::List(_))),
                _ => true,
            }),
            _ => true,
        }
    }
}

fn needs_quotes(s: &str) -> bool {
    s.is_empty()
        || s.chars()
            .any(|c| c.is_whitespace() || c == '(' || c == ')' || c == '"' || c == '\\')
}

fn escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            '\r' => escaped.push_str("\\r"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

impl fmt::Display for SExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SExp::Atom(s) => {
                if needs_quotes(s) {
                    write!(f, "\"{}\"", escape(s))
                } else {
                    write!(f, "{}", s)
                }
            }
            SExp::Str(s) => write!(f, "\"{}\"", escape(s)),
            SExp::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

pub struct SExpParser {
    input: Vec<char>,
    pos: usize,
}

impl SExpParser {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
        }
    }

    /// Parses exactly one expression; trailing non-whitespace is an error.
    pub fn parse(&mut self) -> Result<SExp, ParseError> {
        self.skip_whitespace();
        if self.is_eof() {
            return Err(ParseError::UnexpectedEof);
        }
        let root = self.parse_sexp()?;
        self.skip_whitespace();
        if !self.is_eof() {
            return Err(ParseError::ParseError(
                self.pos,
                "trailing content after root expression".to_string(),
            ));
        }
        Ok(root)
    }

    fn parse_sexp(&mut self) -> Result<SExp, ParseError> {
        self.skip_whitespace();

        if self.is_eof() {
            return Err(ParseError::UnexpectedEof);
        }

        match self.peek() {
            '(' => self.parse_list(),
            ')' => Err(ParseError::ParseError(
                self.pos,
                "unbalanced ')'".to_string(),
            )),
            _ => self.parse_atom(),
        }
    }

    fn parse_list(&mut self) -> Result<SExp, ParseError> {
        self.expect_char('(')?;
        let mut items = Vec::new();

        loop {
            self.skip_whitespace();

            if self.is_eof() {
                return Err(ParseError::UnexpectedEof);
            }

            if self.peek() == ')' {
                self.advance();
                break;
            }

            items.push(self.parse_sexp()?);
        }

        Ok(SExp::List(items))
    }

    fn parse_atom(&mut self) -> Result<SExp, ParseError> {
        self.skip_whitespace();

        if self.peek() == '"' {
            self.parse_string()
        } else {
            self.parse_symbol()
        }
    }

    fn parse_string(&mut self) -> Result<SExp, ParseError> {
        self.expect_char('"')?;
        let mut s = String::new();
        let mut escaped = false;

        loop {
            if self.is_eof() {
                return Err(ParseError::UnexpectedEof);
            }
            let ch = self.peek();
            self.advance();

            if escaped {
                match ch {
                    'n' => s.push('\n'),
                    't' => s.push('\t'),
                    'r' => s.push('\r'),
                    _ => s.push(ch),
                }
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                break;
            } else {
                s.push(ch);
            }
        }

        Ok(SExp::Str(s))
    }

    fn parse_symbol(&mut self) -> Result<SExp, ParseError> {
        let mut s = String::new();

        while !self.is_eof() {
            let ch = self.peek();
            if ch.is_whitespace() || ch == '(' || ch == ')' || ch == '"' {
                break;
            }
            s.push(ch);
            self.advance();
        }

        if s.is_empty() {
            Err(ParseError::UnexpectedToken("empty symbol".to_string()))
        } else {
            Ok(SExp::Atom(s))
        }
    }

    fn skip_whitespace(&mut self) {
        while !self.is_eof() && self.peek().is_whitespace() {
            self.advance();
        }
    }

    fn peek(&self) -> char {
        if self.pos < self.input.len() {
            self.input[self.pos]
        } else {
            '\0'
        }
    }

    fn advance(&mut self) {
        if self.pos < self.input.len() {
            self.pos += 1;
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        if self.is_eof() {
            return Err(ParseError::UnexpectedEof);
        }

        let ch = self.peek();
        if ch == expected {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken(format!(
                "Expected '{}', found '{}'",
                expected, ch
            )))
        }
    }
}

/// Convenience wrapper around [`SExpParser`].
pub fn parse(input: &str) -> Result<SExp, ParseError> {
    SExpParser::new(input).parse()
}
