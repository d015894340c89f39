//! Selector lists over a [`Dom`]: `*`, type, `#id`, `.class`, `[attr]`,
//! `[attr=value]` and `:not(...)`, combined into compounds and separated by
//! commas. No combinators.
use crate::dom::Dom;
use crate::types::NodeKey;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectorError {
    Empty,
    UnexpectedChar { at: usize, ch: char },
    UnterminatedAttribute,
    UnterminatedNot,
}

impl fmt::Display for SelectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectorError::Empty => write!(f, "empty selector"),
            SelectorError::UnexpectedChar { at, ch } => {
                write!(f, "unexpected {ch:?} at byte {at} in selector")
            }
            SelectorError::UnterminatedAttribute => write!(f, "unterminated attribute selector"),
            SelectorError::UnterminatedNot => write!(f, "unterminated :not("),
        }
    }
}

impl std::error::Error for SelectorError {}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Simple {
    Universal,
    Type(String),
    Id(String),
    Class(String),
    Attr { name: String, value: Option<String> },
    Not(Compound),
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Compound {
    parts: Vec<Simple>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Compound>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let mut parser = Parser { input, pos: 0 };
        let mut alternatives = Vec::new();
        loop {
            parser.skip_whitespace();
            alternatives.push(parser.compound()?);
            parser.skip_whitespace();
            match parser.peek() {
                None => break,
                Some(',') => parser.pos += 1,
                Some(ch) => return Err(SelectorError::UnexpectedChar { at: parser.pos, ch }),
            }
        }
        Ok(Self {
            source: input.trim().to_string(),
            alternatives,
        })
    }

    /// Selector matching any element carrying `name`.
    pub fn has_attribute(name: &str) -> Self {
        let name = name.to_ascii_lowercase();
        Self {
            source: format!("[{name}]"),
            alternatives: vec![Compound {
                parts: vec![Simple::Attr { name, value: None }],
            }],
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Only elements match; fragments, text and comments never do.
    pub fn matches(&self, dom: &Dom, key: NodeKey) -> bool {
        dom.is_element(key) && self.alternatives.iter().any(|c| c.matches(dom, key))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

impl Compound {
    fn matches(&self, dom: &Dom, key: NodeKey) -> bool {
        self.parts.iter().all(|part| match part {
            Simple::Universal => true,
            Simple::Type(name) => dom.element_name(key) == Some(name.as_str()),
            Simple::Id(id) => dom.attr(key, "id") == Some(id.as_str()),
            Simple::Class(class) => dom
                .attr(key, "class")
                .is_some_and(|list| list.split_ascii_whitespace().any(|c| c == class)),
            Simple::Attr { name, value: None } => dom.has_attr(key, name),
            Simple::Attr {
                name,
                value: Some(value),
            } => dom.attr(key, name) == Some(value.as_str()),
            Simple::Not(inner) => !inner.matches(dom, key),
        })
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek()
            && ch.is_whitespace()
        {
            self.pos += ch.len_utf8();
        }
    }

    fn ident(&mut self) -> Option<String> {
        let start = self.pos;
        while let Some(ch) = self.peek()
            && (ch.is_alphanumeric() || ch == '-' || ch == '_')
        {
            self.pos += ch.len_utf8();
        }
        (self.pos > start).then(|| self.input[start..self.pos].to_string())
    }

    fn expect_ident(&mut self) -> Result<String, SelectorError> {
        let at = self.pos;
        match self.ident() {
            Some(name) => Ok(name),
            None => Err(match self.peek() {
                Some(ch) => SelectorError::UnexpectedChar { at, ch },
                None => SelectorError::Empty,
            }),
        }
    }

    fn compound(&mut self) -> Result<Compound, SelectorError> {
        let mut parts = Vec::new();
        while let Some(ch) = self.peek() {
            match ch {
                '*' => {
                    self.pos += 1;
                    parts.push(Simple::Universal);
                }
                '#' => {
                    self.pos += 1;
                    parts.push(Simple::Id(self.expect_ident()?));
                }
                '.' => {
                    self.pos += 1;
                    parts.push(Simple::Class(self.expect_ident()?));
                }
                '[' => {
                    self.pos += 1;
                    parts.push(self.attribute()?);
                }
                ':' => {
                    self.pos += 1;
                    parts.push(self.not()?);
                }
                _ if ch.is_alphanumeric() => {
                    let name = self.expect_ident()?;
                    parts.push(Simple::Type(name.to_ascii_lowercase()));
                }
                _ => break,
            }
        }
        if parts.is_empty() {
            return Err(match self.peek() {
                Some(ch) if ch != ',' && ch != ')' => SelectorError::UnexpectedChar { at: self.pos, ch },
                _ => SelectorError::Empty,
            });
        }
        Ok(Compound { parts })
    }

    // After '['.
    fn attribute(&mut self) -> Result<Simple, SelectorError> {
        self.skip_whitespace();
        let name = match self.ident() {
            Some(name) => name.to_ascii_lowercase(),
            None if self.peek().is_none() => return Err(SelectorError::UnterminatedAttribute),
            None => return self.unexpected(),
        };
        self.skip_whitespace();
        let value = match self.peek() {
            Some(']') => None,
            Some('=') => {
                self.pos += 1;
                self.skip_whitespace();
                let value = self.attribute_value()?;
                self.skip_whitespace();
                Some(value)
            }
            None => return Err(SelectorError::UnterminatedAttribute),
            Some(_) => return self.unexpected(),
        };
        match self.peek() {
            Some(']') => {
                self.pos += 1;
                Ok(Simple::Attr { name, value })
            }
            None => Err(SelectorError::UnterminatedAttribute),
            Some(_) => self.unexpected(),
        }
    }

    fn attribute_value(&mut self) -> Result<String, SelectorError> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                let start = self.pos + 1;
                let end = self.input[start..]
                    .find(quote)
                    .ok_or(SelectorError::UnterminatedAttribute)?;
                self.pos = start + end + 1;
                Ok(self.input[start..start + end].to_string())
            }
            None => Err(SelectorError::UnterminatedAttribute),
            Some(_) => {
                let start = self.pos;
                while let Some(ch) = self.peek()
                    && ch != ']'
                    && !ch.is_whitespace()
                {
                    self.pos += ch.len_utf8();
                }
                if self.pos == start {
                    return self.unexpected();
                }
                Ok(self.input[start..self.pos].to_string())
            }
        }
    }

    // After ':'. Only `:not(<compound>)` is supported.
    fn not(&mut self) -> Result<Simple, SelectorError> {
        let rest = &self.input[self.pos..];
        if !rest
            .get(..4)
            .is_some_and(|head| head.eq_ignore_ascii_case("not("))
        {
            return Err(SelectorError::UnexpectedChar {
                at: self.pos.saturating_sub(1),
                ch: ':',
            });
        }
        self.pos += 4;
        self.skip_whitespace();
        let inner = self.compound().map_err(|err| match err {
            SelectorError::Empty => SelectorError::UnterminatedNot,
            other => other,
        })?;
        self.skip_whitespace();
        match self.peek() {
            Some(')') => {
                self.pos += 1;
                Ok(Simple::Not(inner))
            }
            None => Err(SelectorError::UnterminatedNot),
            Some(_) => self.unexpected(),
        }
    }

    fn unexpected<T>(&self) -> Result<T, SelectorError> {
        match self.peek() {
            Some(ch) => Err(SelectorError::UnexpectedChar { at: self.pos, ch }),
            None => Err(SelectorError::Empty),
        }
    }
}
