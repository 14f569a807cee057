//! Evaluated cell results.
//!
//! A `Value` is what reading a cell produces. Computed errors (`#REF!`,
//! `#VALUE!`, `#DIV/0!`) are ordinary values: they are cached, displayed and
//! propagated through arithmetic like any number, never surfaced as `Err`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of a computed formula error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A reference to an address outside the sheet bounds.
    Ref,
    /// A value that cannot be used where a number is required.
    Value,
    /// Division by zero.
    Div0,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Ref => "#REF!",
            ErrorKind::Value => "#VALUE!",
            ErrorKind::Div0 => "#DIV/0!",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// No content. Renders as empty text, converts to 0 in arithmetic.
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Error(ErrorKind),
}

impl Value {
    /// Numeric view used by formula arithmetic.
    ///
    /// Empty is 0, text must parse as a number in full (empty text is 0),
    /// errors propagate their own category.
    pub fn to_number(&self) -> Result<f64, ErrorKind> {
        match self {
            Value::Empty => Ok(0.0),
            Value::Number(n) => Ok(*n),
            Value::Text(s) if s.is_empty() => Ok(0.0),
            Value::Text(s) => s.parse::<f64>().map_err(|_| ErrorKind::Value),
            Value::Error(kind) => Err(*kind),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
            Value::Error(kind) => f.write_str(kind.as_str()),
        }
    }
}
