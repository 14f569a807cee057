//! Cell content and the memoized value cache.

use std::cell::RefCell;
use std::fmt;

use crate::error::ParseError;
use crate::formula::{CellReader, CompiledFormula, FormulaEngine};
use crate::position::Position;
use crate::value::Value;

/// Leading character that selects formula interpretation.
pub const FORMULA_SIGIL: char = '=';
/// Leading character that keeps text literal even when it starts with `=`.
pub const ESCAPE_SIGIL: char = '\'';

/// The active interpretation of a cell's input text.
///
/// Exactly one variant is live at a time; `Sheet::set_cell` swaps it
/// atomically once an edit has passed parsing and the cycle check.
#[derive(Default)]
pub enum Content {
    #[default]
    Empty,
    Text(String),
    Formula(Box<dyn CompiledFormula>),
}

impl Content {
    /// Classify raw input text.
    ///
    /// Empty input is `Empty`. A `=` followed by at least one character, the
    /// first of which is not whitespace, is a formula and the remainder goes
    /// through the engine (parse failures propagate untouched). Everything
    /// else is literal text, including a lone `=`, `= `-prefixed input, and
    /// `'`-escaped strings.
    pub fn from_input(
        text: &str,
        engine: &dyn FormulaEngine,
    ) -> Result<Self, ParseError> {
        if text.is_empty() {
            return Ok(Content::Empty);
        }
        if let Some(expr) = text.strip_prefix(FORMULA_SIGIL) {
            let starts_formula = expr
                .chars()
                .next()
                .is_some_and(|c| !c.is_whitespace());
            if starts_formula {
                return Ok(Content::Formula(engine.parse(expr)?));
            }
        }
        Ok(Content::Text(text.to_string()))
    }

    /// Positions this content reads; empty for `Empty` and `Text`.
    pub fn referenced_cells(&self) -> &[Position] {
        match self {
            Content::Formula(formula) => formula.referenced_cells(),
            Content::Empty | Content::Text(_) => &[],
        }
    }
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Empty => f.write_str("Empty"),
            Content::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Content::Formula(formula) => {
                f.debug_tuple("Formula").field(&formula.expression()).finish()
            }
        }
    }
}

/// One cell of a sheet: content plus the memoized evaluation result.
///
/// The cache is meaningful only for formula content; its presence is the
/// validity flag. Interior mutability lets read paths fill it through
/// `&Sheet`, which is sound here because the committed reference graph is
/// acyclic and the kernel is single-threaded.
#[derive(Debug, Default)]
pub struct Cell {
    content: Content,
    cached: RefCell<Option<Value>>,
}

impl Cell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in new content and drop the memo. Graph rewiring and dependent
    /// invalidation are the sheet's responsibility.
    pub(crate) fn commit(&mut self, content: Content) {
        self.content = content;
        *self.cached.borrow_mut() = None;
    }

    /// The evaluated value: memoized formula result, escaped-stripped text,
    /// or `Value::Empty`.
    pub fn value(&self, cells: &dyn CellReader) -> Value {
        match &self.content {
            Content::Empty => Value::Empty,
            Content::Text(text) => {
                let text = text.strip_prefix(ESCAPE_SIGIL).unwrap_or(text);
                Value::Text(text.to_string())
            }
            Content::Formula(formula) => {
                if let Some(value) = self.cached.borrow().as_ref() {
                    return value.clone();
                }
                let value = formula.evaluate(cells);
                *self.cached.borrow_mut() = Some(value.clone());
                value
            }
        }
    }

    /// The input-equivalent text: `=` plus the canonical expression for
    /// formulas, the stored text verbatim otherwise.
    pub fn text(&self) -> String {
        match &self.content {
            Content::Empty => String::new(),
            Content::Text(text) => text.clone(),
            Content::Formula(formula) => {
                format!("{}{}", FORMULA_SIGIL, formula.expression())
            }
        }
    }

    /// Positions the current content reads.
    pub fn referenced_cells(&self) -> &[Position] {
        self.content.referenced_cells()
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.content, Content::Empty)
    }

    /// Whether the memo still reflects the dependencies' current values.
    /// Non-formula content has nothing to go stale and counts as valid.
    pub fn is_cache_valid(&self) -> bool {
        match self.content {
            Content::Formula(_) => self.cached.borrow().is_some(),
            Content::Empty | Content::Text(_) => true,
        }
    }

    /// Drop the memo so the next read recomputes.
    pub(crate) fn invalidate(&self) {
        *self.cached.borrow_mut() = None;
    }
}

#[cfg(test)]
mod tests {
    use crate::formula::ExprEngine;
    use crate::value::ErrorKind;

    use super::*;

    /// A reader with no cells at all.
    struct NoCells;

    impl CellReader for NoCells {
        fn value_at(&self, _pos: Position) -> Value {
            Value::Empty
        }
    }

    fn content(text: &str) -> Content {
        Content::from_input(text, &ExprEngine).unwrap()
    }

    #[test]
    fn test_classification() {
        assert!(matches!(content(""), Content::Empty));
        assert!(matches!(content("meow"), Content::Text(_)));
        assert!(matches!(content("=1+2"), Content::Formula(_)));
        // Formula sigil without a parseable body stays literal text.
        assert!(matches!(content("="), Content::Text(_)));
        assert!(matches!(content("= 1+2"), Content::Text(_)));
        assert!(matches!(content("'=1+2"), Content::Text(_)));
    }

    #[test]
    fn test_parse_failure_propagates() {
        let err = Content::from_input("=R2D2", &ExprEngine).unwrap_err();
        assert_eq!(err, ParseError::InvalidReference("R2D2".into()));
    }

    #[test]
    fn test_text_round_trip() {
        let mut cell = Cell::new();
        cell.commit(content("Hello"));
        assert_eq!(cell.text(), "Hello");
        assert_eq!(cell.value(&NoCells), Value::Text("Hello".into()));
    }

    #[test]
    fn test_escaped_text_strips_sigil_in_value_only() {
        let mut cell = Cell::new();
        cell.commit(content("'=escaped"));
        assert_eq!(cell.text(), "'=escaped");
        assert_eq!(cell.value(&NoCells), Value::Text("=escaped".into()));
    }

    #[test]
    fn test_formula_text_is_canonical() {
        let mut cell = Cell::new();
        cell.commit(content("=1 + 2"));
        assert_eq!(cell.text(), "=1+2");
    }

    #[test]
    fn test_formula_value_memoized_until_invalidated() {
        let mut cell = Cell::new();
        cell.commit(content("=2*21"));
        assert!(!cell.is_cache_valid());
        assert_eq!(cell.value(&NoCells), Value::Number(42.0));
        assert!(cell.is_cache_valid());

        cell.invalidate();
        assert!(!cell.is_cache_valid());
        assert_eq!(cell.value(&NoCells), Value::Number(42.0));
    }

    #[test]
    fn test_error_results_are_cached_values() {
        let mut cell = Cell::new();
        cell.commit(content("=1/0"));
        assert_eq!(cell.value(&NoCells), Value::Error(ErrorKind::Div0));
        assert!(cell.is_cache_valid());
    }

    #[test]
    fn test_commit_drops_stale_cache() {
        let mut cell = Cell::new();
        cell.commit(content("=1"));
        assert_eq!(cell.value(&NoCells), Value::Number(1.0));
        cell.commit(content("=2"));
        assert!(!cell.is_cache_valid());
        assert_eq!(cell.value(&NoCells), Value::Number(2.0));
    }

    #[test]
    fn test_empty_and_text_always_cache_valid() {
        let cell = Cell::new();
        assert!(cell.is_cache_valid());
        let mut cell = Cell::new();
        cell.commit(content("meow"));
        assert!(cell.is_cache_valid());
    }
}
