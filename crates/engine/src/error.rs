//! Structural failures of sheet operations.
//!
//! Everything here aborts the triggering call with no mutation. Computed
//! errors (`Value::Error`) are data, not errors, and never appear in these
//! enums.

use thiserror::Error;

use crate::position::Position;

/// Errors from the formula tokenizer/parser. Parsing never partially
/// succeeds: any of these leaves the owning cell untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty formula")]
    EmptyFormula,

    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),

    #[error("invalid cell reference '{0}'")]
    InvalidReference(String),

    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),

    #[error("expected a value")]
    ExpectedOperand,

    #[error("expected ')'")]
    ExpectedClosingParen,

    #[error("unexpected end of formula")]
    UnexpectedEnd,

    #[error("unexpected trailing input")]
    TrailingInput,
}

/// Errors surfaced by `Sheet` operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SheetError {
    #[error("invalid position {0}")]
    InvalidPosition(Position),

    #[error("editing {0} would create a circular dependency")]
    CircularDependency(Position),

    #[error("formula parse error: {0}")]
    Parse(#[from] ParseError),
}
