// Formula evaluator - walks the parsed tree against a sheet view.
//
// Arithmetic is numeric throughout: every operand is coerced with
// `Value::to_number`, and the first coercion failure (left to right) decides
// the error category of the whole expression.

use crate::value::{ErrorKind, Value};

use super::parser::{BinaryOp, Expr, UnaryOp};
use super::CellReader;

/// Evaluate an expression tree. Computed errors come back as values.
pub fn evaluate(expr: &Expr, cells: &dyn CellReader) -> Value {
    match eval_number(expr, cells) {
        Ok(n) => Value::Number(n),
        Err(kind) => Value::Error(kind),
    }
}

fn eval_number(expr: &Expr, cells: &dyn CellReader) -> Result<f64, ErrorKind> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::CellRef(pos) => {
            // Parsing bounds-checks references, but a foreign engine's
            // handle may not have.
            if !pos.is_valid() {
                return Err(ErrorKind::Ref);
            }
            cells.value_at(*pos).to_number()
        }
        Expr::Unary { op, operand } => {
            let value = eval_number(operand, cells)?;
            Ok(match op {
                UnaryOp::Plus => value,
                UnaryOp::Minus => -value,
            })
        }
        Expr::Binary { op, left, right } => {
            let lhs = eval_number(left, cells)?;
            let rhs = eval_number(right, cells)?;
            match op {
                BinaryOp::Add => Ok(lhs + rhs),
                BinaryOp::Sub => Ok(lhs - rhs),
                BinaryOp::Mul => Ok(lhs * rhs),
                BinaryOp::Div => {
                    if rhs == 0.0 {
                        Err(ErrorKind::Div0)
                    } else {
                        Ok(lhs / rhs)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rustc_hash::FxHashMap;

    use crate::formula::parser::parse;
    use crate::position::Position;

    use super::*;

    /// Fixed lookup table standing in for a sheet.
    #[derive(Default)]
    struct Fixture {
        values: FxHashMap<Position, Value>,
    }

    impl Fixture {
        fn with(mut self, a1: &str, value: Value) -> Self {
            self.values.insert(Position::parse_a1(a1).unwrap(), value);
            self
        }
    }

    impl CellReader for Fixture {
        fn value_at(&self, pos: Position) -> Value {
            self.values.get(&pos).cloned().unwrap_or_default()
        }
    }

    fn eval(input: &str, cells: &Fixture) -> Value {
        evaluate(&parse(input).unwrap(), cells)
    }

    #[test]
    fn test_arithmetic() {
        let cells = Fixture::default();
        assert_eq!(eval("1", &cells), Value::Number(1.0));
        assert_eq!(eval("42", &cells), Value::Number(42.0));
        assert_eq!(eval("2 + 2", &cells), Value::Number(4.0));
        assert_eq!(eval("2 + 2*2", &cells), Value::Number(6.0));
        assert_eq!(eval("4/2 + 6/3", &cells), Value::Number(4.0));
        assert_eq!(eval("(2+3)*4 + (3-4)*5", &cells), Value::Number(15.0));
        assert_eq!(
            eval("(12+13) * (14+(13-24/(1+1))*55-46)", &cells),
            Value::Number(575.0)
        );
    }

    #[test]
    fn test_unary() {
        let cells = Fixture::default();
        assert_eq!(eval("-3", &cells), Value::Number(-3.0));
        assert_eq!(eval("--3", &cells), Value::Number(3.0));
        assert_eq!(eval("+3", &cells), Value::Number(3.0));
        assert_eq!(eval("2*-3", &cells), Value::Number(-6.0));
    }

    #[test]
    fn test_cell_references() {
        let cells = Fixture::default()
            .with("A1", Value::Number(1.0))
            .with("A2", Value::Number(2.0));
        assert_eq!(eval("A1", &cells), Value::Number(1.0));
        assert_eq!(eval("A1+A2", &cells), Value::Number(3.0));
    }

    #[test]
    fn test_absent_and_empty_cells_are_zero() {
        let cells = Fixture::default()
            .with("A1", Value::Number(1.0))
            .with("B3", Value::Text(String::new()));
        assert_eq!(eval("A1+B3", &cells), Value::Number(1.0));
        assert_eq!(eval("A1+B1", &cells), Value::Number(1.0));
        assert_eq!(eval("A1+E4", &cells), Value::Number(1.0));
    }

    #[test]
    fn test_numeric_text_participates() {
        let cells = Fixture::default().with("A1", Value::Text("3".into()));
        assert_eq!(eval("A1*2", &cells), Value::Number(6.0));
    }

    #[test]
    fn test_non_numeric_text_is_value_error() {
        let cells = Fixture::default().with("A1", Value::Text("meow".into()));
        assert_eq!(eval("A1+1", &cells), Value::Error(ErrorKind::Value));
    }

    #[test]
    fn test_division_by_zero() {
        let cells = Fixture::default().with("A1", Value::Number(0.0));
        assert_eq!(eval("1/0", &cells), Value::Error(ErrorKind::Div0));
        assert_eq!(eval("1/A1", &cells), Value::Error(ErrorKind::Div0));
        assert_eq!(eval("1/B9", &cells), Value::Error(ErrorKind::Div0));
    }

    #[test]
    fn test_errors_propagate_through_arithmetic() {
        let cells = Fixture::default().with("A1", Value::Error(ErrorKind::Div0));
        assert_eq!(eval("A1+1", &cells), Value::Error(ErrorKind::Div0));
        assert_eq!(eval("-A1", &cells), Value::Error(ErrorKind::Div0));
    }

    #[test]
    fn test_leftmost_error_wins() {
        let cells = Fixture::default()
            .with("A1", Value::Error(ErrorKind::Div0))
            .with("B1", Value::Text("meow".into()));
        assert_eq!(eval("A1+B1", &cells), Value::Error(ErrorKind::Div0));
        assert_eq!(eval("B1+A1", &cells), Value::Error(ErrorKind::Value));
    }
}
