//! Path expressions into structured data
//!
//! Grammar: `ident ( "." ident | "[" digits "]" )*`, with an optional leading
//! `[index]`. An empty expression addresses the root.
//!
//! Lookups never fail: a missing key, an out-of-range index, or a step into
//! a scalar yields `None`. A `length` segment applied to an array or string
//! yields its length, so `warnings.length` counts parser warnings.

use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => write!(f, ".{}", key),
            Segment::Index(index) => write!(f, "[{}]", index),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid path expression '{expr}': {reason}")]
pub struct PathError {
    pub expr: String,
    pub reason: String,
}

/// A parsed path expression.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathExpr {
    segments: Vec<Segment>,
}

impl PathExpr {
    pub fn parse(expr: &str) -> Result<Self, PathError> {
        let error = |reason: &str| PathError {
            expr: expr.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut chars = expr.chars().peekable();
        let mut expect_key = true;

        while let Some(&c) = chars.peek() {
            match c {
                '[' => {
                    chars.next();
                    let mut digits = String::new();
                    loop {
                        match chars.next() {
                            Some(']') => break,
                            Some(d) if d.is_ascii_digit() => digits.push(d),
                            Some(_) => return Err(error("index must be a non-negative integer")),
                            None => return Err(error("unclosed '['")),
                        }
                    }
                    let index = digits
                        .parse::<usize>()
                        .map_err(|_| error("empty or oversized index"))?;
                    segments.push(Segment::Index(index));
                    expect_key = false;
                }
                '.' => {
                    if expect_key {
                        return Err(error("empty segment"));
                    }
                    chars.next();
                    expect_key = true;
                    if chars.peek().is_none() {
                        return Err(error("trailing '.'"));
                    }
                }
                ']' => return Err(error("unexpected ']'")),
                _ => {
                    if !expect_key {
                        return Err(error("expected '.' or '[' between segments"));
                    }
                    let mut key = String::new();
                    while let Some(&k) = chars.peek() {
                        if k == '.' || k == '[' || k == ']' {
                            break;
                        }
                        key.push(k);
                        chars.next();
                    }
                    segments.push(Segment::Key(key));
                    expect_key = false;
                }
            }
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Resolve against `root`. Borrowed where possible; `length` is computed.
    pub fn lookup<'a>(&self, root: &'a Value) -> Option<Cow<'a, Value>> {
        let mut current = root;
        let last = self.segments.len().saturating_sub(1);

        for (position, segment) in self.segments.iter().enumerate() {
            let next = match (segment, current) {
                (Segment::Key(key), Value::Object(map)) => map.get(key.as_str()),
                (Segment::Key(key), Value::Array(items)) => {
                    if key == "length" {
                        return (position == last).then(|| Cow::Owned(Value::from(items.len())));
                    }
                    key.parse::<usize>().ok().and_then(|i| items.get(i))
                }
                (Segment::Key(key), Value::String(text)) if key == "length" => {
                    return (position == last)
                        .then(|| Cow::Owned(Value::from(text.chars().count())));
                }
                (Segment::Index(index), Value::Array(items)) => items.get(*index),
                (Segment::Index(index), Value::Object(map)) => map.get(&index.to_string()),
                _ => None,
            };
            current = next?;
        }

        Some(Cow::Borrowed(current))
    }
}

impl FromStr for PathExpr {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(key) if position == 0 => f.write_str(key)?,
                other => write!(f, "{}", other)?,
            }
        }
        Ok(())
    }
}

/// Parse and resolve in one step; an invalid expression resolves to nothing.
pub fn lookup<'a>(root: &'a Value, expr: &str) -> Option<Cow<'a, Value>> {
    PathExpr::parse(expr).ok()?.lookup(root)
}
