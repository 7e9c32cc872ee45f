//! JSON-path-like expressions used as rule keys and mismatch locations.
//!
//! Supported syntax: `$` (root), `.name`, `['quoted name']`, `[3]`, `[*]`
//! (any index) and `.*` (any field).

use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::RuleError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathToken {
    Root,
    Field(String),
    Index(usize),
    AnyIndex,
    AnyField,
}

impl PathToken {
    /// Whether this (pattern) token accepts the given concrete token.
    fn accepts(&self, concrete: &PathToken) -> bool {
        match (self, concrete) {
            (PathToken::Root, PathToken::Root) => true,
            (PathToken::Field(a), PathToken::Field(b)) => a == b,
            (PathToken::Index(a), PathToken::Index(b)) => a == b,
            (PathToken::AnyIndex, PathToken::Index(_) | PathToken::AnyIndex) => true,
            (PathToken::AnyField, PathToken::Field(_) | PathToken::AnyField) => true,
            _ => false,
        }
    }

    fn weight(&self) -> u32 {
        match self {
            PathToken::AnyIndex | PathToken::AnyField => 1,
            _ => 2,
        }
    }
}

/// A parsed path. Concrete paths (no wildcards) and patterns share this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathExpr {
    tokens: Vec<PathToken>,
}

impl PathExpr {
    pub fn root() -> Self {
        Self {
            tokens: vec![PathToken::Root],
        }
    }

    pub fn parse(input: &str) -> Result<Self, RuleError> {
        Parser::new(input).parse()
    }

    pub fn tokens(&self) -> &[PathToken] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.tokens == [PathToken::Root]
    }

    pub fn field(&self, name: &str) -> Self {
        self.push(PathToken::Field(name.to_string()))
    }

    pub fn index(&self, index: usize) -> Self {
        self.push(PathToken::Index(index))
    }

    pub fn any_index(&self) -> Self {
        self.push(PathToken::AnyIndex)
    }

    fn push(&self, token: PathToken) -> Self {
        let mut tokens = Vec::with_capacity(self.tokens.len() + 1);
        tokens.extend_from_slice(&self.tokens);
        tokens.push(token);
        Self { tokens }
    }

    /// Single field name of a `$.name` path (header, query and metadata keys).
    pub fn single_field(&self) -> Option<&str> {
        match self.tokens.as_slice() {
            [PathToken::Root, PathToken::Field(name)] => Some(name),
            _ => None,
        }
    }

    /// Specificity of this pattern against a concrete path; 0 when it does not match.
    pub fn weight(&self, concrete: &PathExpr) -> u32 {
        if self.tokens.len() != concrete.tokens.len() {
            return 0;
        }
        self.tokens
            .iter()
            .zip(&concrete.tokens)
            .try_fold(1u32, |acc, (pattern, token)| {
                pattern
                    .accepts(token)
                    .then(|| acc.saturating_mul(pattern.weight()))
            })
            .unwrap_or(0)
    }

    pub fn matches(&self, concrete: &PathExpr) -> bool {
        self.weight(concrete) > 0
    }

    /// True when this pattern continues past `prefix` with `[*]`.
    pub fn has_wildcard_after(&self, prefix: &PathExpr) -> bool {
        let n = prefix.tokens.len();
        self.tokens.len() > n
            && self.tokens[n] == PathToken::AnyIndex
            && self.tokens[..n]
                .iter()
                .zip(&prefix.tokens)
                .all(|(pattern, token)| pattern.accepts(token))
    }

    /// Re-root a path under a field, e.g. `$.a` under `body` becomes `$.body.a`.
    pub fn rooted_at(&self, field: &str) -> Self {
        let mut tokens = Vec::with_capacity(self.tokens.len() + 1);
        tokens.push(PathToken::Root);
        tokens.push(PathToken::Field(field.to_string()));
        tokens.extend(
            self.tokens
                .iter()
                .skip_while(|t| **t == PathToken::Root)
                .cloned(),
        );
        Self { tokens }
    }

    /// Strip a leading `$.field` prefix, the inverse of [`PathExpr::rooted_at`].
    pub fn strip_root_field(&self, field: &str) -> Option<Self> {
        match self.tokens.as_slice() {
            [PathToken::Root, PathToken::Field(name), rest @ ..] if name == field => {
                let mut tokens = Vec::with_capacity(rest.len() + 1);
                tokens.push(PathToken::Root);
                tokens.extend_from_slice(rest);
                Some(Self { tokens })
            }
            _ => None,
        }
    }
}

/// Plain names print as `.name`; XML attribute and text keys keep their `@`/`#` sigil.
fn is_plain_field(name: &str) -> bool {
    let rest = name.strip_prefix(['@', '#']).unwrap_or(name);
    !rest.is_empty()
        && rest
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            match token {
                PathToken::Root => f.write_str("$")?,
                PathToken::Field(name) if is_plain_field(name) => write!(f, ".{name}")?,
                PathToken::Field(name) => write!(f, "['{}']", name.replace('\'', "\\'"))?,
                PathToken::Index(i) => write!(f, "[{i}]")?,
                PathToken::AnyIndex => f.write_str("[*]")?,
                PathToken::AnyField => f.write_str(".*")?,
            }
        }
        Ok(())
    }
}

impl Serialize for PathExpr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct Parser<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    fn error(&self, reason: impl Into<String>) -> RuleError {
        RuleError::InvalidPath {
            path: self.input.to_string(),
            reason: reason.into(),
        }
    }

    fn parse(mut self) -> Result<PathExpr, RuleError> {
        match self.chars.next() {
            Some((_, '$')) => {}
            _ => return Err(self.error("must start with '$'")),
        }

        let mut tokens = vec![PathToken::Root];
        while let Some((_, c)) = self.chars.next() {
            let token = match c {
                '.' => self.parse_field()?,
                '[' => self.parse_bracket()?,
                other => return Err(self.error(format!("unexpected character '{other}'"))),
            };
            tokens.push(token);
        }
        Ok(PathExpr { tokens })
    }

    fn parse_field(&mut self) -> Result<PathToken, RuleError> {
        if let Some((_, '*')) = self.chars.peek() {
            self.chars.next();
            return Ok(PathToken::AnyField);
        }
        let mut name = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if matches!(c, '.' | '[' | ']' | '\'' | '"') {
                break;
            }
            name.push(c);
            self.chars.next();
        }
        if name.is_empty() {
            return Err(self.error("empty field name"));
        }
        Ok(PathToken::Field(name))
    }

    fn parse_bracket(&mut self) -> Result<PathToken, RuleError> {
        let token = match self.chars.peek().map(|&(_, c)| c) {
            Some('*') => {
                self.chars.next();
                PathToken::AnyIndex
            }
            Some(quote @ ('\'' | '"')) => {
                self.chars.next();
                PathToken::Field(self.parse_quoted(quote)?)
            }
            Some(c) if c.is_ascii_digit() => {
                let mut digits = String::new();
                while let Some(&(_, d)) = self.chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    digits.push(d);
                    self.chars.next();
                }
                let index = digits
                    .parse()
                    .map_err(|_| self.error(format!("index '{digits}' out of range")))?;
                PathToken::Index(index)
            }
            _ => return Err(self.error("expected index, '*' or quoted name after '['")),
        };
        match self.chars.next() {
            Some((_, ']')) => Ok(token),
            _ => Err(self.error("unterminated '['")),
        }
    }

    fn parse_quoted(&mut self, quote: char) -> Result<String, RuleError> {
        let mut name = String::new();
        loop {
            match self.chars.next() {
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, c)) => name.push(c),
                    None => return Err(self.error("dangling escape")),
                },
                Some((_, c)) if c == quote => return Ok(name),
                Some((_, c)) => name.push(c),
                None => return Err(self.error("unterminated quoted name")),
            }
        }
    }
}
