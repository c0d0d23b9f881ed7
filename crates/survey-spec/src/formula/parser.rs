//! Formula grammar.
//!
//! Precedence from loosest to tightest:
//!
//! 1. `?:` (right associative)
//! 2. `or`
//! 3. `xor`
//! 4. `and`
//! 5. `== != < <= > >=`
//! 6. `+ -`
//! 7. `* / % mod`
//! 8. prefix `+ - not`
//! 9. `^` (right associative, binds tighter than a prefix on its left)
//!
//! Atoms are numbers (`1`, `.5`, `2e-3`), variables, calls (`round(x, 1)`)
//! and parenthesized formulas.

use chumsky::prelude::*;

use crate::formula::FormulaError;
use crate::formula::ast::{BinaryOp, Expr, UnaryOp};

/// Deepest nesting of parentheses and open `?:` branches accepted.
pub const MAX_NESTING: usize = 16;

const KEYWORDS: [&str; 5] = ["and", "or", "xor", "not", "mod"];

type ParseExtra<'src> = extra::Err<Rich<'src, char>>;

/// Parses a formula.
///
/// ```
/// use survey_spec::formula::{Expr, parse};
///
/// let expr = parse("round(WEIGHT / HEIGHT ^ 2, 1)").unwrap();
/// assert!(matches!(expr, Expr::Call { .. }));
/// assert_eq!(expr.variables(), vec!["WEIGHT", "HEIGHT"]);
/// ```
pub fn parse(formula: &str) -> Result<Expr, FormulaError> {
    if formula.trim().is_empty() {
        return Err(FormulaError::Empty);
    }
    check_nesting(formula)?;

    formula_parser()
        .parse(formula)
        .into_result()
        .map_err(|errors| match errors.into_iter().next() {
            Some(error) => FormulaError::Syntax {
                offset: error.span().start,
                message: error.to_string(),
            },
            None => FormulaError::Syntax {
                offset: 0,
                message: "invalid formula".into(),
            },
        })
}

// The grammar recurses once per nesting level; bound it before parsing.
fn check_nesting(formula: &str) -> Result<(), FormulaError> {
    // One entry per open parenthesis (plus the top level), counting the
    // conditionals opened at that level.
    let mut levels = vec![0usize];
    for (offset, ch) in formula.char_indices() {
        match ch {
            '(' => levels.push(0),
            ')' if levels.len() > 1 => {
                levels.pop();
            }
            '?' => {
                if let Some(open) = levels.last_mut() {
                    *open += 1;
                }
            }
            _ => continue,
        }
        let nesting = levels.len() - 1 + levels.iter().sum::<usize>();
        if nesting > MAX_NESTING {
            return Err(FormulaError::TooDeep {
                limit: MAX_NESTING,
                offset,
            });
        }
    }
    Ok(())
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

fn is_identifier_part(ch: char) -> bool {
    is_identifier_start(ch) || ch.is_ascii_digit()
}

fn chain((first, rest): (Expr, Vec<(BinaryOp, Expr)>)) -> Expr {
    if rest.is_empty() {
        first
    } else {
        Expr::Chain {
            first: Box::new(first),
            rest,
        }
    }
}

fn formula_parser<'src>() -> impl Parser<'src, &'src str, Expr, ParseExtra<'src>> + Clone + 'src {
    let digits = text::digits(10);
    let number = choice((
        digits
            .clone()
            .then(just('.').then(digits.clone().or_not()).or_not())
            .ignored(),
        just('.').then(digits.clone()).ignored(),
    ))
    .then(
        one_of("eE")
            .then(one_of("+-").or_not())
            .then(digits.clone())
            .or_not(),
    )
    .to_slice()
    .try_map(|text: &str, span| {
        text.parse::<f64>()
            .map_err(|_| Rich::custom(span, format!("invalid number '{text}'")))
    })
    .map(Expr::Number)
    .padded()
    .boxed();

    let identifier = any()
        .filter(|ch: &char| is_identifier_start(*ch))
        .then(any().filter(|ch: &char| is_identifier_part(*ch)).repeated())
        .to_slice()
        .try_map(|name: &str, span| {
            if KEYWORDS.contains(&name) {
                Err(Rich::custom(span, format!("unexpected keyword '{name}'")))
            } else {
                Ok(name.to_string())
            }
        })
        .padded()
        .boxed();

    let prefix = choice((
        just('+').to(UnaryOp::Plus),
        just('-').to(UnaryOp::Negate),
        text::keyword("not").to(UnaryOp::Not),
    ))
    .padded();

    recursive(|expr| {
        let args = expr
            .clone()
            .separated_by(just(',').padded())
            .collect::<Vec<_>>()
            .delimited_by(just('(').padded(), just(')').padded());

        let call_or_variable = identifier
            .then(args.or_not())
            .map(|(name, args)| match args {
                Some(args) => Expr::Call {
                    function: name,
                    args,
                },
                None => Expr::Variable(name),
            });

        let atom = choice((
            number,
            call_or_variable,
            expr.clone()
                .delimited_by(just('(').padded(), just(')').padded()),
        ))
        .boxed();

        let exponent = prefix
            .clone()
            .repeated()
            .collect::<Vec<_>>()
            .then(atom.clone());
        let power = atom
            .then(
                just('^')
                    .padded()
                    .ignore_then(exponent)
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .map(|(base, exponents)| {
                if exponents.is_empty() {
                    base
                } else {
                    Expr::Power {
                        base: Box::new(base),
                        exponents,
                    }
                }
            })
            .boxed();

        let unary = prefix
            .repeated()
            .collect::<Vec<_>>()
            .then(power)
            .map(|(ops, operand)| {
                if ops.is_empty() {
                    operand
                } else {
                    Expr::Prefix {
                        ops,
                        operand: Box::new(operand),
                    }
                }
            })
            .boxed();

        let op_mul = choice((
            just('*').to(BinaryOp::Multiply),
            just('/').to(BinaryOp::Divide),
            just('%').to(BinaryOp::Modulo),
            text::keyword("mod").to(BinaryOp::Modulo),
        ))
        .padded();
        let multiplicative = unary
            .clone()
            .then(op_mul.then(unary).repeated().collect::<Vec<_>>())
            .map(chain)
            .boxed();

        let op_add = choice((
            just('+').to(BinaryOp::Add),
            just('-').to(BinaryOp::Subtract),
        ))
        .padded();
        let additive = multiplicative
            .clone()
            .then(op_add.then(multiplicative).repeated().collect::<Vec<_>>())
            .map(chain)
            .boxed();

        let op_compare = choice((
            just("==").to(BinaryOp::Equal),
            just("!=").to(BinaryOp::NotEqual),
            just("<=").to(BinaryOp::LessEqual),
            just(">=").to(BinaryOp::GreaterEqual),
            just('<').to(BinaryOp::Less),
            just('>').to(BinaryOp::Greater),
        ))
        .padded();
        let comparison = additive
            .clone()
            .then(op_compare.then(additive).repeated().collect::<Vec<_>>())
            .map(chain)
            .boxed();

        let op_and = text::keyword("and").to(BinaryOp::And).padded();
        let logical_and = comparison
            .clone()
            .then(op_and.then(comparison).repeated().collect::<Vec<_>>())
            .map(chain)
            .boxed();

        let op_xor = text::keyword("xor").to(BinaryOp::Xor).padded();
        let logical_xor = logical_and
            .clone()
            .then(op_xor.then(logical_and).repeated().collect::<Vec<_>>())
            .map(chain)
            .boxed();

        let op_or = text::keyword("or").to(BinaryOp::Or).padded();
        let logical_or = logical_xor
            .clone()
            .then(op_or.then(logical_xor).repeated().collect::<Vec<_>>())
            .map(chain)
            .boxed();

        logical_or
            .then(
                just('?')
                    .padded()
                    .ignore_then(expr.clone())
                    .then_ignore(just(':').padded())
                    .then(expr)
                    .or_not(),
            )
            .map(|(condition, branches)| match branches {
                Some((when_true, when_false)) => Expr::Conditional {
                    condition: Box::new(condition),
                    when_true: Box::new(when_true),
                    when_false: Box::new(when_false),
                },
                None => condition,
            })
    })
    .then_ignore(end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(value: f64) -> Expr {
        Expr::Number(value)
    }

    fn var(name: &str) -> Expr {
        Expr::Variable(name.into())
    }

    fn chain_of(first: Expr, rest: Vec<(BinaryOp, Expr)>) -> Expr {
        Expr::Chain {
            first: Box::new(first),
            rest,
        }
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(
            parse("1 + 2 * 3").expect("parse"),
            chain_of(
                num(1.0),
                vec![(
                    BinaryOp::Add,
                    chain_of(num(2.0), vec![(BinaryOp::Multiply, num(3.0))])
                )]
            )
        );
    }

    #[test]
    fn same_precedence_operators_stay_flat() {
        assert_eq!(
            parse("A - B - 1").expect("parse"),
            chain_of(
                var("A"),
                vec![(BinaryOp::Subtract, var("B")), (BinaryOp::Subtract, num(1.0))]
            )
        );
    }

    #[test]
    fn power_binds_tighter_than_negation() {
        assert_eq!(
            parse("-2 ^ 3 ^ 2").expect("parse"),
            Expr::Prefix {
                ops: vec![UnaryOp::Negate],
                operand: Box::new(Expr::Power {
                    base: Box::new(num(2.0)),
                    exponents: vec![(vec![], num(3.0)), (vec![], num(2.0))],
                }),
            }
        );
    }

    #[test]
    fn reads_numbers_with_fractions_and_exponents() {
        assert_eq!(parse("1.5"), Ok(num(1.5)));
        assert_eq!(parse(".5"), Ok(num(0.5)));
        assert_eq!(parse("2e3"), Ok(num(2000.0)));
        assert_eq!(parse(" 2E-1 "), Ok(num(0.2)));
        assert_eq!(
            parse("2-1"),
            Ok(chain_of(num(2.0), vec![(BinaryOp::Subtract, num(1.0))]))
        );
    }

    #[test]
    fn keywords_are_operators_not_variables() {
        assert_eq!(
            parse("pde_Weight and not x2").expect("parse"),
            chain_of(
                var("pde_Weight"),
                vec![(
                    BinaryOp::And,
                    Expr::Prefix {
                        ops: vec![UnaryOp::Not],
                        operand: Box::new(var("x2")),
                    }
                )]
            )
        );
        assert_eq!(parse("nothing"), Ok(var("nothing")));
        assert!(parse("and").is_err());
    }

    #[test]
    fn parses_calls_and_conditionals() {
        let expr = parse("WEIGHT > 0 ? round(WEIGHT / HEIGHT ^ 2, 1) : 0").expect("parse");
        assert!(matches!(expr, Expr::Conditional { .. }));
        assert_eq!(expr.variables(), vec!["WEIGHT", "HEIGHT"]);
    }

    #[test]
    fn parses_empty_argument_lists() {
        assert_eq!(
            parse("random()").expect("parse"),
            Expr::Call {
                function: "random".into(),
                args: vec![],
            }
        );
    }

    #[test]
    fn reports_syntax_errors() {
        assert_eq!(parse(""), Err(FormulaError::Empty));
        assert_eq!(parse("   "), Err(FormulaError::Empty));
        for formula in ["1 +", "(1 + 2", "1 2", "max(1,)", "A # B", "A = B", "1.2.3"] {
            assert!(
                matches!(parse(formula), Err(FormulaError::Syntax { .. })),
                "{formula}"
            );
        }
    }

    #[test]
    fn nesting_within_limit_parses() {
        let formula = format!("{}1{}", "(".repeat(12), ")".repeat(12));
        assert_eq!(parse(&formula), Ok(num(1.0)));

        let conditionals = vec!["A ? 1 :"; 4].join(" ") + " 0";
        assert!(matches!(parse(&conditionals), Ok(Expr::Conditional { .. })));
    }

    #[test]
    fn deep_nesting_is_rejected_before_parsing() {
        let formula = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(
            parse(&formula),
            Err(FormulaError::TooDeep {
                limit: MAX_NESTING,
                offset: MAX_NESTING,
            })
        );

        let conditionals = vec!["A ? 1 :"; 100].join(" ") + " 0";
        assert!(matches!(parse(&conditionals), Err(FormulaError::TooDeep { .. })));
    }

    #[test]
    fn long_operator_runs_stay_flat() {
        let formula = vec!["1"; 200_000].join("+");
        match parse(&formula).expect("parse") {
            Expr::Chain { rest, .. } => assert_eq!(rest.len(), 199_999),
            other => panic!("unexpected {other:?}"),
        }
        let prefixes = format!("{}1", "-".repeat(10_000));
        assert!(matches!(parse(&prefixes), Ok(Expr::Prefix { .. })));
    }
}
