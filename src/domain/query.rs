//! Record search conditions
//!
//! Conditions are ANDed together. A condition path may be dotted (`partner_id.country_id.code`)
//! to traverse many2one relations.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Comparison operator of a search condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not in")]
    NotIn,
    #[serde(rename = "child_of")]
    ChildOf,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::In => "in",
            Operator::NotIn => "not in",
            Operator::ChildOf => "child_of",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "=" | "==" => Ok(Operator::Eq),
            "!=" | "<>" => Ok(Operator::Ne),
            "<" => Ok(Operator::Lt),
            "<=" => Ok(Operator::Le),
            ">" => Ok(Operator::Gt),
            ">=" => Ok(Operator::Ge),
            "in" => Ok(Operator::In),
            "not in" => Ok(Operator::NotIn),
            "child_of" => Ok(Operator::ChildOf),
            other => Err(format!("Unsupported operator: {other}")),
        }
    }
}

/// One `(path, operator, value)` search condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub path: String,
    pub operator: Operator,
    pub value: Value,
}

impl Condition {
    pub fn new(path: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            path: path.into(),
            operator,
            value: value.into(),
        }
    }

    /// Equality condition
    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(path, Operator::Eq, value)
    }

    /// Splits the dotted path into its segments
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('.')
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "('{}', '{}', {})", self.path, self.operator, self.value)
    }
}

/// Parses an operator-entered filter expression into conditions
///
/// Accepts a JSON array of `[path, operator, value]` triples, or the equivalent
/// Python-literal notation (`[('active', '=', True)]`). Logical prefix operators
/// (`'&'`, `'|'`) and malformed elements are skipped; only a syntactically broken
/// expression is an error.
pub fn parse_filter(text: &str) -> Result<Vec<Condition>, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let parsed: Value = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(_) => serde_json::from_str(&normalize_python_literal(trimmed))
            .map_err(|e| format!("Invalid filter expression '{trimmed}': {e}"))?,
    };

    let items = match parsed {
        Value::Array(items) => items,
        _ => return Err(format!("Filter expression must be a list: {trimmed}")),
    };

    let mut conditions = Vec::new();
    for item in items {
        let Value::Array(parts) = item else {
            continue;
        };
        if parts.len() != 3 {
            continue;
        }
        let (Some(path), Some(op)) = (parts[0].as_str(), parts[1].as_str()) else {
            continue;
        };
        let Ok(operator) = Operator::from_str(op) else {
            continue;
        };
        conditions.push(Condition::new(path, operator, parts[2].clone()));
    }
    Ok(conditions)
}

fn normalize_python_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut word = String::new();

    let flush = |word: &mut String, out: &mut String| {
        match word.as_str() {
            "True" => out.push_str("true"),
            "False" => out.push_str("false"),
            "None" => out.push_str("null"),
            _ => out.push_str(word),
        }
        word.clear();
    };

    for ch in text.chars() {
        if in_string {
            match ch {
                '\'' => {
                    in_string = false;
                    out.push('"');
                }
                '"' => out.push_str("\\\""),
                _ => out.push(ch),
            }
            continue;
        }
        if ch.is_alphanumeric() || ch == '_' {
            word.push(ch);
            continue;
        }
        flush(&mut word, &mut out);
        match ch {
            '\'' => {
                in_string = true;
                out.push('"');
            }
            '(' => out.push('['),
            ')' => out.push(']'),
            _ => out.push(ch),
        }
    }
    flush(&mut word, &mut out);
    out
}
