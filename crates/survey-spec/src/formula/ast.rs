#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Negate,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
    Xor,
}

/// Parsed formula.
///
/// Runs of same-precedence operators are stored flat rather than as nested
/// binary nodes, so tree depth follows parenthesis nesting only.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(String),
    /// `-not x` is `ops: [Negate, Not]`; the last operator applies first.
    Prefix {
        ops: Vec<UnaryOp>,
        operand: Box<Expr>,
    },
    /// `first op1 e1 op2 e2 ...`, folded left to right.
    Chain {
        first: Box<Expr>,
        rest: Vec<(BinaryOp, Expr)>,
    },
    /// `base ^ p1 e1 ^ p2 e2 ...`, right associative. Each exponent carries
    /// the prefix operators written before it, which bind looser than the
    /// powers to their right: `2 ^ -3 ^ 2` is `2 ^ -(3 ^ 2)`.
    Power {
        base: Box<Expr>,
        exponents: Vec<(Vec<UnaryOp>, Expr)>,
    },
    Conditional {
        condition: Box<Expr>,
        when_true: Box<Expr>,
        when_false: Box<Expr>,
    },
    Call {
        function: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Names of all variables the formula reads, in first-use order.
    pub fn variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Variable(name) => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            Expr::Prefix { operand, .. } => operand.collect_variables(names),
            Expr::Chain { first, rest } => {
                first.collect_variables(names);
                for (_, operand) in rest {
                    operand.collect_variables(names);
                }
            }
            Expr::Power { base, exponents } => {
                base.collect_variables(names);
                for (_, exponent) in exponents {
                    exponent.collect_variables(names);
                }
            }
            Expr::Conditional {
                condition,
                when_true,
                when_false,
            } => {
                condition.collect_variables(names);
                when_true.collect_variables(names);
                when_false.collect_variables(names);
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.collect_variables(names);
                }
            }
        }
    }
}
