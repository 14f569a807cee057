//! Formula engine boundary.
//!
//! The kernel consumes formulas only through the traits below: an engine
//! parses expression text (without the leading `=`) into a compiled handle,
//! and the handle evaluates against a read-only sheet view, reports the
//! cells it reads, and re-serializes itself canonically. Keeping the
//! boundary this narrow lets the graph/cache machinery be exercised with a
//! stub engine, independent of any real grammar.

pub mod eval;
pub mod parser;

use rustc_hash::FxHashSet;

use crate::error::ParseError;
use crate::position::Position;
use crate::value::Value;

use self::parser::Expr;

/// Read-only view of a sheet during evaluation.
pub trait CellReader {
    /// Evaluated value at `pos`; `Value::Empty` when no cell exists there.
    fn value_at(&self, pos: Position) -> Value;
}

/// A parsed formula expression.
pub trait CompiledFormula {
    /// Evaluate against the current sheet state. Computed errors come back
    /// as `Value::Error`, never as a failure.
    fn evaluate(&self, cells: &dyn CellReader) -> Value;

    /// The cells the expression reads: ascending, duplicate-free, and
    /// stable across calls.
    fn referenced_cells(&self) -> &[Position];

    /// Canonical re-serialization, independent of the input's whitespace.
    fn expression(&self) -> String;
}

/// Turns expression text into compiled handles.
pub trait FormulaEngine {
    fn parse(&self, expr: &str) -> Result<Box<dyn CompiledFormula>, ParseError>;
}

/// The built-in engine: arithmetic over numbers and A1 cell references.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExprEngine;

impl FormulaEngine for ExprEngine {
    fn parse(&self, expr: &str) -> Result<Box<dyn CompiledFormula>, ParseError> {
        let ast = parser::parse(expr)?;
        let refs = collect_refs(&ast);
        Ok(Box::new(ExprFormula { ast, refs }))
    }
}

struct ExprFormula {
    ast: Expr,
    refs: Vec<Position>,
}

impl CompiledFormula for ExprFormula {
    fn evaluate(&self, cells: &dyn CellReader) -> Value {
        eval::evaluate(&self.ast, cells)
    }

    fn referenced_cells(&self) -> &[Position] {
        &self.refs
    }

    fn expression(&self) -> String {
        self.ast.to_string()
    }
}

/// All cell references of an expression, deduplicated and in ascending
/// row-major order.
fn collect_refs(expr: &Expr) -> Vec<Position> {
    let mut seen = FxHashSet::default();
    collect_into(expr, &mut seen);
    let mut refs: Vec<Position> = seen.into_iter().collect();
    refs.sort_unstable();
    refs
}

fn collect_into(expr: &Expr, seen: &mut FxHashSet<Position>) {
    match expr {
        Expr::Number(_) => {}
        Expr::CellRef(pos) => {
            seen.insert(*pos);
        }
        Expr::Unary { operand, .. } => collect_into(operand, seen),
        Expr::Binary { left, right, .. } => {
            collect_into(left, seen);
            collect_into(right, seen);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a1(text: &str) -> Position {
        Position::parse_a1(text).unwrap()
    }

    #[test]
    fn test_referenced_cells_sorted_and_deduped() {
        let formula = ExprEngine
            .parse("A1 + A2 + A1 + A3 + A1 + A2 + A1")
            .unwrap();
        assert_eq!(formula.expression(), "A1+A2+A1+A3+A1+A2+A1");
        assert_eq!(
            formula.referenced_cells(),
            &[a1("A1"), a1("A2"), a1("A3")]
        );
    }

    #[test]
    fn test_no_references() {
        let formula = ExprEngine.parse("1+2*3").unwrap();
        assert!(formula.referenced_cells().is_empty());
    }

    #[test]
    fn test_references_ascend_row_major() {
        let formula = ExprEngine.parse("C1+A2+B1").unwrap();
        assert_eq!(
            formula.referenced_cells(),
            &[a1("B1"), a1("C1"), a1("A2")]
        );
    }

    #[test]
    fn test_references_stable_across_calls() {
        let formula = ExprEngine.parse("B2+C3").unwrap();
        let first: Vec<_> = formula.referenced_cells().to_vec();
        assert_eq!(formula.referenced_cells(), first.as_slice());
        assert_eq!(first, vec![a1("B2"), a1("C3")]);
    }
}
