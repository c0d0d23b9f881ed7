use std::collections::HashMap;
use std::f64::consts;

use serde_json::{Map, Value};

use crate::coerce::parse_number;
use crate::formula::ast::{BinaryOp, Expr, UnaryOp};
use crate::formula::{FormulaError, compile};

/// Intermediate value during evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Number(f64),
    Bool(bool),
}

impl Operand {
    pub fn as_number(self) -> f64 {
        match self {
            Operand::Number(number) => number,
            Operand::Bool(flag) => {
                if flag {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    pub fn is_truthy(self) -> bool {
        match self {
            Operand::Number(number) => number != 0.0 && !number.is_nan(),
            Operand::Bool(flag) => flag,
        }
    }
}

/// What a variable name is bound to.
#[derive(Debug, Clone, Copy)]
pub enum Binding<'a> {
    /// Raw answer as submitted.
    Answer(&'a Value),
    /// Full-precision result of an earlier formula.
    Computed(f64),
}

/// Source of variable bindings for a formula.
pub trait Scope {
    fn lookup(&self, name: &str) -> Option<Binding<'_>>;
}

impl Scope for Map<String, Value> {
    fn lookup(&self, name: &str) -> Option<Binding<'_>> {
        self.get(name).map(Binding::Answer)
    }
}

impl Scope for HashMap<String, f64> {
    fn lookup(&self, name: &str) -> Option<Binding<'_>> {
        self.get(name).copied().map(Binding::Computed)
    }
}

/// Stateless evaluator for calculated question formulas.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormulaEngine;

impl FormulaEngine {
    pub fn new() -> Self {
        Self
    }

    /// Compiles and evaluates `formula`, requiring a numeric result.
    ///
    /// `NaN` results are errors; infinities are returned as is.
    pub fn evaluate(&self, formula: &str, scope: &dyn Scope) -> Result<f64, FormulaError> {
        let expr = compile(formula)?;
        self.evaluate_expr(&expr, scope)
    }

    pub fn evaluate_expr(&self, expr: &Expr, scope: &dyn Scope) -> Result<f64, FormulaError> {
        match eval(expr, scope)? {
            Operand::Number(number) if number.is_nan() => Err(FormulaError::NotANumber),
            Operand::Number(number) => Ok(number),
            Operand::Bool(_) => Err(FormulaError::NonNumericResult),
        }
    }
}

fn eval(expr: &Expr, scope: &dyn Scope) -> Result<Operand, FormulaError> {
    match expr {
        Expr::Number(number) => Ok(Operand::Number(*number)),
        Expr::Variable(name) => resolve(name, scope),
        Expr::Prefix { ops, operand } => Ok(apply_prefix(ops, eval(operand, scope)?)),
        Expr::Chain { first, rest } => {
            let mut acc = eval(first, scope)?;
            for (op, operand) in rest {
                acc = apply_binary(*op, acc, eval(operand, scope)?);
            }
            Ok(acc)
        }
        Expr::Power { base, exponents } => {
            let base = eval(base, scope)?.as_number();
            let operands = exponents
                .iter()
                .map(|(ops, exponent)| {
                    eval(exponent, scope).map(|value| (ops.as_slice(), value.as_number()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            // Right associative: fold from the innermost exponent outwards.
            let mut exponent = 0.0;
            for (index, (ops, value)) in operands.iter().enumerate().rev() {
                let raised = if index + 1 == operands.len() {
                    *value
                } else {
                    value.powf(exponent)
                };
                exponent = apply_prefix(ops, Operand::Number(raised)).as_number();
            }
            Ok(Operand::Number(base.powf(exponent)))
        }
        Expr::Conditional {
            condition,
            when_true,
            when_false,
        } => {
            if eval(condition, scope)?.is_truthy() {
                eval(when_true, scope)
            } else {
                eval(when_false, scope)
            }
        }
        Expr::Call { function, args } => {
            let args = args
                .iter()
                .map(|arg| eval(arg, scope).map(Operand::as_number))
                .collect::<Result<Vec<_>, _>>()?;
            call(function, &args).map(Operand::Number)
        }
    }
}

// Scope bindings shadow built-in constants.
fn resolve(name: &str, scope: &dyn Scope) -> Result<Operand, FormulaError> {
    if let Some(binding) = scope.lookup(name) {
        return operand_from_binding(name, binding);
    }
    let constant = match name {
        "pi" | "PI" => consts::PI,
        "e" | "E" => consts::E,
        "tau" => consts::TAU,
        "phi" => (1.0 + 5f64.sqrt()) / 2.0,
        "LN2" => consts::LN_2,
        "LN10" => consts::LN_10,
        "SQRT2" => consts::SQRT_2,
        "Infinity" => f64::INFINITY,
        "NaN" => f64::NAN,
        "true" => return Ok(Operand::Bool(true)),
        "false" => return Ok(Operand::Bool(false)),
        _ => return Err(FormulaError::UnknownVariable(name.to_string())),
    };
    Ok(Operand::Number(constant))
}

fn operand_from_binding(name: &str, binding: Binding<'_>) -> Result<Operand, FormulaError> {
    let non_numeric = || FormulaError::NonNumericVariable {
        name: name.to_string(),
    };
    match binding {
        Binding::Computed(number) => Ok(Operand::Number(number)),
        Binding::Answer(Value::Null) => Ok(Operand::Number(0.0)),
        Binding::Answer(Value::Bool(flag)) => Ok(Operand::Bool(*flag)),
        Binding::Answer(Value::Number(number)) => {
            number.as_f64().map(Operand::Number).ok_or_else(non_numeric)
        }
        Binding::Answer(Value::String(text)) => {
            parse_number(text).map(Operand::Number).ok_or_else(non_numeric)
        }
        Binding::Answer(_) => Err(non_numeric()),
    }
}

// The operator nearest the operand applies first.
fn apply_prefix(ops: &[UnaryOp], operand: Operand) -> Operand {
    ops.iter().rev().fold(operand, |operand, op| match op {
        UnaryOp::Plus => Operand::Number(operand.as_number()),
        UnaryOp::Negate => Operand::Number(-operand.as_number()),
        UnaryOp::Not => Operand::Bool(!operand.is_truthy()),
    })
}

fn apply_binary(op: BinaryOp, left: Operand, right: Operand) -> Operand {
    let (a, b) = (left.as_number(), right.as_number());
    match op {
        BinaryOp::Add => Operand::Number(a + b),
        BinaryOp::Subtract => Operand::Number(a - b),
        BinaryOp::Multiply => Operand::Number(a * b),
        BinaryOp::Divide => Operand::Number(a / b),
        BinaryOp::Modulo => Operand::Number(modulo(a, b)),
        BinaryOp::Equal => Operand::Bool(a == b),
        BinaryOp::NotEqual => Operand::Bool(a != b),
        BinaryOp::Less => Operand::Bool(a < b),
        BinaryOp::LessEqual => Operand::Bool(a <= b),
        BinaryOp::Greater => Operand::Bool(a > b),
        BinaryOp::GreaterEqual => Operand::Bool(a >= b),
        BinaryOp::And => Operand::Bool(left.is_truthy() && right.is_truthy()),
        BinaryOp::Or => Operand::Bool(left.is_truthy() || right.is_truthy()),
        BinaryOp::Xor => Operand::Bool(left.is_truthy() != right.is_truthy()),
    }
}

// Result takes the sign of the divisor; x mod 0 is x.
fn modulo(a: f64, b: f64) -> f64 {
    if b == 0.0 {
        return a;
    }
    a - b * (a / b).floor()
}

fn round_to(value: f64, digits: f64) -> f64 {
    if digits == 0.0 {
        return value.round();
    }
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}

fn call(function: &str, args: &[f64]) -> Result<f64, FormulaError> {
    let arity = |expected: &'static str| FormulaError::Arity {
        function: function.to_string(),
        expected,
        found: args.len(),
    };
    let one = |f: fn(f64) -> f64| match args {
        [x] => Ok(f(*x)),
        _ => Err(arity("1")),
    };
    let two = |f: fn(f64, f64) -> f64| match args {
        [x, y] => Ok(f(*x, *y)),
        _ => Err(arity("2")),
    };
    let one_or_two = |f: fn(f64) -> f64, g: fn(f64, f64) -> f64| match args {
        [x] => Ok(f(*x)),
        [x, y] => Ok(g(*x, *y)),
        _ => Err(arity("1 or 2")),
    };
    let at_least_one = |f: fn(f64, f64) -> f64| match args {
        [] => Err(arity("at least 1")),
        [first, rest @ ..] => Ok(rest.iter().fold(*first, |acc, x| f(acc, *x))),
    };

    match function {
        "abs" => one(f64::abs),
        "sqrt" => one(f64::sqrt),
        "cbrt" => one(f64::cbrt),
        "exp" => one(f64::exp),
        "log10" => one(f64::log10),
        "log2" => one(f64::log2),
        "sin" => one(f64::sin),
        "cos" => one(f64::cos),
        "tan" => one(f64::tan),
        "asin" => one(f64::asin),
        "acos" => one(f64::acos),
        "atan" => one(f64::atan),
        "fix" => one(f64::trunc),
        "sign" => one(|x| if x == 0.0 || x.is_nan() { x } else { x.signum() }),
        "square" => one(|x| x * x),
        "cube" => one(|x| x * x * x),
        "atan2" => two(f64::atan2),
        "pow" => two(f64::powf),
        "mod" => two(modulo),
        "log" => one_or_two(f64::ln, |x, base| x.ln() / base.ln()),
        "round" => one_or_two(f64::round, round_to),
        "floor" => one_or_two(f64::floor, |x, digits| {
            let factor = 10f64.powi(digits as i32);
            (x * factor).floor() / factor
        }),
        "ceil" => one_or_two(f64::ceil, |x, digits| {
            let factor = 10f64.powi(digits as i32);
            (x * factor).ceil() / factor
        }),
        "min" => at_least_one(|a, b| if a.is_nan() || b.is_nan() { f64::NAN } else { a.min(b) }),
        "max" => at_least_one(|a, b| if a.is_nan() || b.is_nan() { f64::NAN } else { a.max(b) }),
        "hypot" => Ok(args.iter().map(|x| x * x).sum::<f64>().sqrt()),
        "sum" => Ok(args.iter().sum()),
        "mean" => match args {
            [] => Err(arity("at least 1")),
            _ => Ok(args.iter().sum::<f64>() / args.len() as f64),
        },
        other => Err(FormulaError::UnknownFunction(other.to_string())),
    }
}
