//! Mutation statements: the Cypher subset understood by the in-process stores.
//!
//! Generated statements are plain Cypher so they run unchanged on Neo4j. The
//! in-process stores parse them with this module and accept:
//!
//! - `MATCH`, `MERGE`, `CREATE` followed by comma-separated path patterns
//! - `MATCH ... WHERE var.key = literal [AND ...]`, folded into the node patterns
//! - `MERGE ... ON CREATE SET ... ON MATCH SET ...`
//! - `SET var.key = literal, ...`
//! - a trailing `RETURN ...` (ignored) and an optional `;`
//!
//! Anything outside that grammar is a [`StoreError::Syntax`].

use crate::error::StoreError;
use crate::types::{Properties, PropertyValue};
use std::str::FromStr;

/// A parsed statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub clauses: Vec<Clause>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Match(Vec<Pattern>),
    Merge(MergeClause),
    Create(Vec<Pattern>),
    Set(Vec<Assignment>),
}

/// `MERGE` with its optional `ON CREATE SET` / `ON MATCH SET` actions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeClause {
    pub patterns: Vec<Pattern>,
    pub on_create: Vec<Assignment>,
    pub on_match: Vec<Assignment>,
}

/// `var.key = value`
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub variable: String,
    pub key: String,
    pub value: PropertyValue,
}

/// A chain `(a)-[:R]->(b)<-[:S]-(c)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub start: NodePattern,
    pub steps: Vec<Step>,
}

/// One relationship hop and the node it leads to.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub rel: RelPattern,
    pub node: NodePattern,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePattern {
    pub variable: Option<String>,
    pub labels: Vec<String>,
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelPattern {
    pub variable: Option<String>,
    pub rel_type: Option<String>,
    pub direction: Direction,
    pub properties: Properties,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `-[]->`
    Outgoing,
    /// `<-[]-`
    Incoming,
    /// `-[]-`
    Undirected,
}

impl Statement {
    /// Parse a single statement.
    pub fn parse(input: &str) -> Result<Self, StoreError> {
        let tokens = tokenize(input)?;
        Parser { tokens, pos: 0 }.statement()
    }

    /// Whether the statement only reads (MATCH/RETURN).
    pub fn is_read_only(&self) -> bool {
        self.clauses.iter().all(|c| matches!(c, Clause::Match(_)))
    }
}

impl FromStr for Statement {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Statement::parse(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Colon,
    Comma,
    Dot,
    Dash,
    Lt,
    Gt,
    Eq,
    Star,
    Semicolon,
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
}

fn tokenize(input: &str) -> Result<Vec<Token>, StoreError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let single = match c {
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            '{' => Some(Token::LBrace),
            '}' => Some(Token::RBrace),
            ':' => Some(Token::Colon),
            ',' => Some(Token::Comma),
            '.' => Some(Token::Dot),
            '-' => Some(Token::Dash),
            '<' => Some(Token::Lt),
            '>' => Some(Token::Gt),
            '=' => Some(Token::Eq),
            '*' => Some(Token::Star),
            ';' => Some(Token::Semicolon),
            _ => None,
        };
        if let Some(tok) = single {
            tokens.push(tok);
            i += 1;
            continue;
        }

        if c.is_whitespace() {
            i += 1;
        } else if c == '\'' || c == '"' {
            let (s, next) = read_string(&chars, i)?;
            tokens.push(Token::Str(s));
            i = next;
        } else if c == '`' {
            let start = i + 1;
            let end = chars[start..]
                .iter()
                .position(|&ch| ch == '`')
                .map(|p| start + p)
                .ok_or_else(|| StoreError::syntax(format!("unterminated identifier at {}", i)))?;
            tokens.push(Token::Ident(chars[start..end].iter().collect()));
            i = end + 1;
        } else if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            let is_float =
                i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_digit();
            if is_float {
                i += 1;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            let text: String = chars[start..i].iter().collect();
            let tok = if is_float {
                text.parse().map(Token::Float).ok()
            } else {
                text.parse().map(Token::Int).ok()
            };
            tokens.push(tok.ok_or_else(|| StoreError::syntax(format!("bad number '{}'", text)))?);
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else {
            return Err(StoreError::syntax(format!(
                "unexpected character '{}' at {}",
                c, i
            )));
        }
    }

    Ok(tokens)
}

/// Read a quoted literal starting at `start`; returns the unescaped text and the index after it.
fn read_string(chars: &[char], start: usize) -> Result<(String, usize), StoreError> {
    let quote = chars[start];
    let mut out = String::new();
    let mut i = start + 1;

    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                out.push(match chars[i + 1] {
                    'n' => '\n',
                    't' => '\t',
                    other => other,
                });
                i += 2;
            }
            c if c == quote => return Ok((out, i + 1)),
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    Err(StoreError::syntax(format!(
        "unterminated string literal starting at {}",
        start
    )))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn eat(&mut self, tok: &Token) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: Token) -> Result<(), StoreError> {
        match self.advance() {
            Some(ref t) if *t == tok => Ok(()),
            Some(t) => Err(StoreError::syntax(format!("expected {:?}, found {:?}", tok, t))),
            None => Err(StoreError::syntax(format!("expected {:?}, found end of input", tok))),
        }
    }

    fn ident(&mut self) -> Result<String, StoreError> {
        match self.advance() {
            Some(Token::Ident(s)) => Ok(s),
            Some(t) => Err(StoreError::syntax(format!("expected identifier, found {:?}", t))),
            None => Err(StoreError::syntax("expected identifier, found end of input")),
        }
    }

    /// Consume `kw` (case-insensitive) if it is next.
    fn eat_keyword(&mut self, kw: &str) -> bool {
        match self.peek() {
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case(kw) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn expect_keyword(&mut self, kw: &str) -> Result<(), StoreError> {
        if self.eat_keyword(kw) {
            Ok(())
        } else {
            Err(StoreError::syntax(format!(
                "expected {}, found {:?}",
                kw,
                self.peek()
            )))
        }
    }

    fn statement(&mut self) -> Result<Statement, StoreError> {
        let mut clauses = Vec::new();

        while let Some(tok) = self.peek().cloned() {
            match tok {
                Token::Semicolon => {
                    self.pos += 1;
                    if self.peek().is_some() {
                        return Err(StoreError::syntax("only one statement is allowed"));
                    }
                }
                Token::Ident(word) => {
                    self.pos += 1;
                    match word.to_ascii_uppercase().as_str() {
                        "MATCH" => {
                            let mut patterns = self.patterns()?;
                            if self.eat_keyword("WHERE") {
                                self.where_filter(&mut patterns)?;
                            }
                            clauses.push(Clause::Match(patterns));
                        }
                        "MERGE" => clauses.push(Clause::Merge(self.merge()?)),
                        "CREATE" => clauses.push(Clause::Create(self.patterns()?)),
                        "SET" => clauses.push(Clause::Set(self.assignments()?)),
                        "RETURN" => {
                            // Projection is irrelevant for mutations.
                            let rest = self.tokens[self.pos..]
                                .iter()
                                .position(|t| *t == Token::Semicolon);
                            self.pos = rest.map(|p| self.pos + p).unwrap_or(self.tokens.len());
                        }
                        other => {
                            return Err(StoreError::syntax(format!(
                                "unsupported clause '{}'",
                                other
                            )))
                        }
                    }
                }
                other => {
                    return Err(StoreError::syntax(format!(
                        "expected a clause keyword, found {:?}",
                        other
                    )))
                }
            }
        }

        if clauses.is_empty() {
            return Err(StoreError::syntax("statement has no clauses"));
        }
        Ok(Statement { clauses })
    }

    fn merge(&mut self) -> Result<MergeClause, StoreError> {
        let mut clause = MergeClause {
            patterns: self.patterns()?,
            ..MergeClause::default()
        };
        while self.eat_keyword("ON") {
            let on_create = if self.eat_keyword("CREATE") {
                true
            } else if self.eat_keyword("MATCH") {
                false
            } else {
                return Err(StoreError::syntax("expected CREATE or MATCH after ON"));
            };
            self.expect_keyword("SET")?;
            let assignments = self.assignments()?;
            if on_create {
                clause.on_create.extend(assignments);
            } else {
                clause.on_match.extend(assignments);
            }
        }
        Ok(clause)
    }

    /// `WHERE a.key = literal AND ...`, moved into the property maps of the
    /// node patterns that declare `a`.
    fn where_filter(&mut self, patterns: &mut [Pattern]) -> Result<(), StoreError> {
        loop {
            let variable = self.ident()?;
            self.expect(Token::Dot)?;
            let key = self.ident()?;
            self.expect(Token::Eq)?;
            let value = self.value()?;

            let mut declared = false;
            for pattern in patterns.iter_mut() {
                let nodes = std::iter::once(&mut pattern.start)
                    .chain(pattern.steps.iter_mut().map(|step| &mut step.node));
                for node in nodes {
                    if node.variable.as_deref() != Some(variable.as_str()) {
                        continue;
                    }
                    declared = true;
                    match node.properties.get(&key) {
                        Some(existing) if *existing != value => {
                            return Err(StoreError::syntax(format!(
                                "WHERE contradicts the pattern for {}.{}",
                                variable, key
                            )))
                        }
                        _ => {
                            node.properties.insert(key.clone(), value.clone());
                        }
                    }
                }
            }
            if !declared {
                return Err(StoreError::syntax(format!(
                    "WHERE refers to `{}`, which this MATCH does not declare",
                    variable
                )));
            }

            if !self.eat_keyword("AND") {
                return Ok(());
            }
        }
    }

    fn patterns(&mut self) -> Result<Vec<Pattern>, StoreError> {
        let mut patterns = vec![self.pattern()?];
        while self.eat(&Token::Comma) {
            patterns.push(self.pattern()?);
        }
        Ok(patterns)
    }

    fn pattern(&mut self) -> Result<Pattern, StoreError> {
        let start = self.node()?;
        let mut steps = Vec::new();
        while matches!(self.peek(), Some(Token::Dash) | Some(Token::Lt)) {
            steps.push(self.step()?);
        }
        Ok(Pattern { start, steps })
    }

    fn step(&mut self) -> Result<Step, StoreError> {
        let incoming = self.eat(&Token::Lt);
        self.expect(Token::Dash)?;

        let (variable, rel_type, properties) = if self.peek() == Some(&Token::LBracket) {
            self.rel_body()?
        } else {
            (None, None, Properties::new())
        };

        self.expect(Token::Dash)?;
        let outgoing = self.eat(&Token::Gt);

        let direction = match (incoming, outgoing) {
            (true, true) => {
                return Err(StoreError::syntax("relationship cannot point both ways"))
            }
            (true, false) => Direction::Incoming,
            (false, true) => Direction::Outgoing,
            (false, false) => Direction::Undirected,
        };

        let node = self.node()?;
        Ok(Step {
            rel: RelPattern {
                variable,
                rel_type,
                direction,
                properties,
            },
            node,
        })
    }

    fn rel_body(&mut self) -> Result<(Option<String>, Option<String>, Properties), StoreError> {
        self.expect(Token::LBracket)?;

        let variable = match self.peek() {
            Some(Token::Ident(_)) => Some(self.ident()?),
            _ => None,
        };
        let rel_type = if self.eat(&Token::Colon) {
            Some(self.ident()?)
        } else {
            None
        };
        if self.peek() == Some(&Token::Star) {
            return Err(StoreError::syntax(
                "variable-length relationships are not supported",
            ));
        }
        let properties = if self.peek() == Some(&Token::LBrace) {
            self.properties()?
        } else {
            Properties::new()
        };

        self.expect(Token::RBracket)?;
        Ok((variable, rel_type, properties))
    }

    fn node(&mut self) -> Result<NodePattern, StoreError> {
        self.expect(Token::LParen)?;

        let variable = match self.peek() {
            Some(Token::Ident(_)) => Some(self.ident()?),
            _ => None,
        };
        let mut labels = Vec::new();
        while self.eat(&Token::Colon) {
            labels.push(self.ident()?);
        }
        let properties = if self.peek() == Some(&Token::LBrace) {
            self.properties()?
        } else {
            Properties::new()
        };

        self.expect(Token::RParen)?;
        Ok(NodePattern {
            variable,
            labels,
            properties,
        })
    }

    fn properties(&mut self) -> Result<Properties, StoreError> {
        self.expect(Token::LBrace)?;
        let mut props = Properties::new();
        if self.eat(&Token::RBrace) {
            return Ok(props);
        }

        loop {
            let key = match self.advance() {
                Some(Token::Ident(s)) | Some(Token::Str(s)) => s,
                Some(t) => {
                    return Err(StoreError::syntax(format!(
                        "expected property name, found {:?}",
                        t
                    )))
                }
                None => return Err(StoreError::syntax("unterminated property map")),
            };
            self.expect(Token::Colon)?;
            let value = self.value()?;
            props.insert(key, value);

            if !self.eat(&Token::Comma) {
                self.expect(Token::RBrace)?;
                return Ok(props);
            }
        }
    }

    fn value(&mut self) -> Result<PropertyValue, StoreError> {
        match self.advance() {
            Some(Token::Str(s)) => Ok(PropertyValue::String(s)),
            Some(Token::Int(i)) => Ok(PropertyValue::Integer(i)),
            Some(Token::Float(x)) => Ok(PropertyValue::Float(x)),
            Some(Token::Dash) => match self.advance() {
                Some(Token::Int(i)) => Ok(PropertyValue::Integer(-i)),
                Some(Token::Float(x)) => Ok(PropertyValue::Float(-x)),
                _ => Err(StoreError::syntax("expected number after '-'")),
            },
            Some(Token::Ident(word)) => match word.to_ascii_lowercase().as_str() {
                "true" => Ok(PropertyValue::Boolean(true)),
                "false" => Ok(PropertyValue::Boolean(false)),
                "null" => Ok(PropertyValue::Null),
                _ => Err(StoreError::syntax(format!(
                    "expressions are not supported as values: {}",
                    word
                ))),
            },
            Some(Token::LBracket) => Err(StoreError::syntax("list values are not supported")),
            Some(t) => Err(StoreError::syntax(format!("expected a literal, found {:?}", t))),
            None => Err(StoreError::syntax("expected a literal, found end of input")),
        }
    }

    fn assignments(&mut self) -> Result<Vec<Assignment>, StoreError> {
        let mut out = Vec::new();
        loop {
            let variable = self.ident()?;
            self.expect(Token::Dot)?;
            let key = self.ident()?;
            self.expect(Token::Eq)?;
            let value = self.value()?;
            out.push(Assignment {
                variable,
                key,
                value,
            });
            if !self.eat(&Token::Comma) {
                return Ok(out);
            }
        }
    }
}
