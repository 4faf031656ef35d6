//! Requirement specifier grammar.
//!
//! [`SpecifierParser`] is the seam through which a requirement string is turned
//! into a [`Requirement`]. [`Pep508Parser`] covers the subset of PEP 508 that
//! shows up in requirements listings: a name, optional extras, either a direct
//! URL or a list of version clauses, and an optional environment marker.

use crate::types::{PackageName, Version};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecifierError {
    #[error("missing package name")]
    MissingName,
    #[error("invalid package name '{0}'")]
    InvalidName(String),
    #[error("unterminated extras list")]
    UnterminatedExtras,
    #[error("expected a version operator at offset {0}")]
    ExpectedOperator(usize),
    #[error("missing version after '{0}'")]
    MissingVersion(Operator),
    #[error("invalid version '{version}' for operator '{operator}'")]
    InvalidVersion { operator: Operator, version: String },
    #[error("unbalanced parenthesis in version specifier")]
    UnbalancedParen,
    #[error("missing URL after '@'")]
    MissingUrl,
    #[error("empty environment marker after ';'")]
    EmptyMarker,
    #[error("unexpected '{found}' at offset {offset}")]
    Unexpected { offset: usize, found: char },
}

/// Version comparison operator of a single constraint clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "===")]
    ArbitraryEqual,
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "~=")]
    Compatible,
    #[serde(rename = "<=")]
    LessEqual,
    #[serde(rename = ">=")]
    GreaterEqual,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = ">")]
    Greater,
}

impl Operator {
    /// Longest spelling first, so prefix matching picks `===` over `==`.
    const ALL: [Operator; 8] = [
        Operator::ArbitraryEqual,
        Operator::Equal,
        Operator::NotEqual,
        Operator::Compatible,
        Operator::LessEqual,
        Operator::GreaterEqual,
        Operator::Less,
        Operator::Greater,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::ArbitraryEqual => "===",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::Compatible => "~=",
            Operator::LessEqual => "<=",
            Operator::GreaterEqual => ">=",
            Operator::Less => "<",
            Operator::Greater => ">",
        }
    }

    /// `==` and `===` are the only operators that can pin a version.
    pub fn is_equality(self) -> bool {
        matches!(self, Operator::Equal | Operator::ArbitraryEqual)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Constraint {
    pub operator: Operator,
    pub version: Version,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operator, self.version)
    }
}

/// A parsed requirement specifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub name: PackageName,
    #[serde(default)]
    pub extras: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub marker: Option<String>,
}

impl Requirement {
    /// The version this requirement is pinned to, if it has exactly one
    /// equality constraint.
    pub fn pinned_version(&self) -> Option<&Version> {
        match self.constraints.as_slice() {
            [only] if only.operator.is_equality() => Some(&only.version),
            _ => None,
        }
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned_version().is_some()
    }
}

/// Turns a requirement specifier string into a [`Requirement`].
pub trait SpecifierParser {
    fn parse(&self, specifier: &str) -> Result<Requirement, SpecifierError>;
}

/// Default grammar for requirement specifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pep508Parser;

impl SpecifierParser for Pep508Parser {
    fn parse(&self, specifier: &str) -> Result<Requirement, SpecifierError> {
        let mut cur = Cursor::new(specifier);
        cur.skip_ws();

        let name = cur.take_while(is_name_char);
        if name.is_empty() {
            return Err(SpecifierError::MissingName);
        }
        if !is_valid_name(name) {
            return Err(SpecifierError::InvalidName(name.to_owned()));
        }

        cur.skip_ws();
        let extras = if cur.eat('[') {
            parse_extras(&mut cur)?
        } else {
            Vec::new()
        };

        cur.skip_ws();
        let mut url = None;
        let mut constraints = Vec::new();
        if cur.eat('@') {
            cur.skip_ws();
            let raw = cur.take_while(|c| c != ';').trim_end();
            if raw.is_empty() {
                return Err(SpecifierError::MissingUrl);
            }
            url = Some(raw.to_owned());
        } else if cur.eat('(') {
            constraints = parse_constraints(&mut cur)?;
            cur.skip_ws();
            if !cur.eat(')') {
                return Err(SpecifierError::UnbalancedParen);
            }
        } else if cur.peek().is_some_and(is_operator_start) {
            constraints = parse_constraints(&mut cur)?;
        }

        cur.skip_ws();
        let mut marker = None;
        if cur.eat(';') {
            let raw = cur.take_rest().trim();
            if raw.is_empty() {
                return Err(SpecifierError::EmptyMarker);
            }
            marker = Some(raw.to_owned());
        }

        if let Some(found) = cur.peek() {
            return Err(SpecifierError::Unexpected {
                offset: cur.pos,
                found,
            });
        }

        Ok(Requirement {
            name: PackageName::new(name),
            extras,
            constraints,
            url,
            marker,
        })
    }
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn is_done(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, s: &str) -> bool {
        if self.rest().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let end = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += end;
        &rest[..end]
    }

    fn take_rest(&mut self) -> &'a str {
        let rest = self.rest();
        self.pos = self.src.len();
        rest
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

fn is_valid_name(name: &str) -> bool {
    let starts_ok = name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());
    let ends_ok = name
        .chars()
        .next_back()
        .is_some_and(|c| c.is_ascii_alphanumeric());
    starts_ok && ends_ok
}

fn is_operator_start(c: char) -> bool {
    matches!(c, '=' | '!' | '~' | '<' | '>')
}

fn is_version_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '*' | '+' | '!' | '_' | '-')
}

/// Check a clause version against the operator it follows.
///
/// `===` takes any text. A trailing `.*` is only allowed after `==` and `!=`,
/// and `~=` needs at least two release segments.
fn is_valid_clause_version(operator: Operator, version: &str) -> bool {
    if operator == Operator::ArbitraryEqual {
        return true;
    }
    if !version.chars().all(is_version_char) {
        return false;
    }
    if version.contains('*') {
        let prefix_ok = version
            .strip_suffix(".*")
            .is_some_and(|prefix| !prefix.is_empty() && !prefix.contains('*'));
        return prefix_ok && matches!(operator, Operator::Equal | Operator::NotEqual);
    }
    if operator == Operator::Compatible {
        return release_segments(version) >= 2;
    }
    true
}

fn release_segments(version: &str) -> usize {
    let without_epoch = version.split_once('!').map_or(version, |(_, rest)| rest);
    let release_end = without_epoch
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(without_epoch.len());
    without_epoch[..release_end]
        .split('.')
        .filter(|segment| !segment.is_empty())
        .count()
}

fn parse_extras(cur: &mut Cursor<'_>) -> Result<Vec<String>, SpecifierError> {
    let mut extras = Vec::new();
    loop {
        cur.skip_ws();
        if extras.is_empty() && cur.eat(']') {
            return Ok(extras);
        }
        let extra = cur.take_while(is_name_char);
        if extra.is_empty() {
            return Err(unexpected_or(cur, SpecifierError::UnterminatedExtras));
        }
        extras.push(extra.to_owned());
        cur.skip_ws();
        if cur.eat(']') {
            return Ok(extras);
        }
        if !cur.eat(',') {
            return Err(unexpected_or(cur, SpecifierError::UnterminatedExtras));
        }
    }
}

fn parse_constraints(cur: &mut Cursor<'_>) -> Result<Vec<Constraint>, SpecifierError> {
    let mut constraints = Vec::new();
    loop {
        cur.skip_ws();
        let offset = cur.pos;
        let operator = Operator::ALL
            .into_iter()
            .find(|op| cur.eat_str(op.as_str()))
            .ok_or(SpecifierError::ExpectedOperator(offset))?;

        cur.skip_ws();
        let version =
            cur.take_while(|c| !matches!(c, ',' | ';' | ')') && !c.is_whitespace());
        if version.is_empty() {
            return Err(SpecifierError::MissingVersion(operator));
        }
        if !is_valid_clause_version(operator, version) {
            return Err(SpecifierError::InvalidVersion {
                operator,
                version: version.to_owned(),
            });
        }
        constraints.push(Constraint {
            operator,
            version: Version::new(version),
        });

        cur.skip_ws();
        if !cur.eat(',') {
            return Ok(constraints);
        }
    }
}

fn unexpected_or(cur: &Cursor<'_>, at_end: SpecifierError) -> SpecifierError {
    match cur.peek() {
        Some(found) if !cur.is_done() => SpecifierError::Unexpected {
            offset: cur.pos,
            found,
        },
        _ => at_end,
    }
}
