//! Arithmetic formulas for calculated questions.
//!
//! Formulas reference other questions by data element code:
//! `round(WEIGHT / (HEIGHT / 100) ^ 2, 1)`. Parsing and evaluation are pure;
//! [`FormulaEngine`] carries no state and can be created wherever needed.

pub mod ast;
pub mod eval;
pub mod parser;

use thiserror::Error;

pub use ast::{BinaryOp, Expr, UnaryOp};
pub use eval::{Binding, FormulaEngine, Operand, Scope};
pub use parser::{MAX_NESTING, parse};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    #[error("formula is empty")]
    Empty,
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },
    #[error("formula nests deeper than {limit} levels (offset {offset})")]
    TooDeep { limit: usize, offset: usize },
    #[error("undefined symbol '{0}'")]
    UnknownVariable(String),
    #[error("undefined function '{0}'")]
    UnknownFunction(String),
    #[error("function '{function}' expects {expected} argument(s), got {found}")]
    Arity {
        function: String,
        expected: &'static str,
        found: usize,
    },
    #[error("cannot convert value of '{name}' to a number")]
    NonNumericVariable { name: String },
    #[error("formula result is not a number")]
    NotANumber,
    #[error("formula result is a boolean, not a number")]
    NonNumericResult,
}

/// Parses a formula into its expression tree.
pub fn compile(formula: &str) -> Result<Expr, FormulaError> {
    parse(formula)
}
