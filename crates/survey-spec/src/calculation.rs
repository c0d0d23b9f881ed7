use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::answers::AnswerMap;
use crate::coerce::format_number;
use crate::formula::{Binding, FormulaEngine, Scope};
use crate::spec::component::SurveyComponent;

/// Data element code to its formatted result, `None` when the formula failed.
pub type CalculatedValues = BTreeMap<String, Option<String>>;

/// Answers overlaid with results computed earlier in the same pass.
struct CalculationScope<'a> {
    answers: &'a AnswerMap,
    computed: HashMap<String, f64>,
}

impl Scope for CalculationScope<'_> {
    fn lookup(&self, name: &str) -> Option<Binding<'_>> {
        match self.computed.get(name) {
            Some(number) => Some(Binding::Computed(*number)),
            None => self.answers.get(name).map(Binding::Answer),
        }
    }
}

/// Evaluates every calculated component in order.
///
/// `values` is keyed by data element code. Each successful result is visible
/// to later formulas at full precision and reported with two decimals; a
/// failing formula yields `None` for its own code only.
pub fn run_calculations(components: &[SurveyComponent], values: &AnswerMap) -> CalculatedValues {
    let engine = FormulaEngine::new();
    let mut scope = CalculationScope {
        answers: values,
        computed: HashMap::new(),
    };
    let mut calculated = CalculatedValues::new();

    for component in components {
        let Some(formula) = component.formula() else {
            continue;
        };
        let code = component.code().to_string();
        match engine.evaluate(formula, &scope) {
            Ok(value) => {
                scope.computed.insert(code.clone(), value);
                calculated.insert(code, Some(to_fixed(value, 2)));
            }
            Err(error) => {
                debug!(%code, %formula, %error, "calculated question failed");
                calculated.insert(code, None);
            }
        }
    }

    calculated
}

/// Fixed-point rendering with `Number.prototype.toFixed` semantics: exact
/// ties round away from zero and magnitudes from 1e21 use exponent form.
pub fn to_fixed(value: f64, digits: usize) -> String {
    if !value.is_finite() || value.abs() >= 1e21 {
        return format_number(value);
    }
    let sign = if value < 0.0 { "-" } else { "" };
    let magnitude = value.abs();

    const GUARD: usize = 40;
    let exact = format!("{:.*}", digits + GUARD, magnitude);
    let (head, tail) = exact.split_at(exact.len() - GUARD);
    let is_tie = tail.starts_with('5') && tail[1..].bytes().all(|digit| digit == b'0');
    let body = if is_tie {
        round_up_decimal(head.trim_end_matches('.'))
    } else {
        format!("{:.*}", digits, magnitude)
    };
    format!("{sign}{body}")
}

fn round_up_decimal(text: &str) -> String {
    let mut bytes = text.as_bytes().to_vec();
    let mut index = bytes.len();
    loop {
        if index == 0 {
            bytes.insert(0, b'1');
            break;
        }
        index -= 1;
        match bytes[index] {
            b'.' => continue,
            b'9' => bytes[index] = b'0',
            digit => {
                bytes[index] = digit + 1;
                break;
            }
        }
    }
    String::from_utf8(bytes).unwrap_or_default()
}
