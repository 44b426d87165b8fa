use crate::spec::{Block, BranchOp, BranchRule, Screen};
use std::fmt;

/// Right-hand side of a lowered condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Text(String),
    Number(f64),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Literal::Text(s) => write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    NotEq,
    Gt,
    Lt,
}

impl Comparison {
    fn symbol(&self) -> &'static str {
        match self {
            Comparison::Eq => "==",
            Comparison::NotEq => "!=",
            Comparison::Gt => ">",
            Comparison::Lt => "<",
        }
    }
}

/// A branch rule lowered into the vendor's conditional-rendering expression grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare {
        field: String,
        cmp: Comparison,
        rhs: Literal,
    },
    Contains {
        field: String,
        rhs: Literal,
    },
    Truthy {
        field: String,
        negated: bool,
    },
}

impl Condition {
    /// Lowers a rule using the block it references to pick literal types.
    pub fn lower(rule: &BranchRule, screen: &Screen) -> Self {
        let field = rule.field.clone();
        let block = screen.input(&rule.field);
        let raw = rule.value.clone().unwrap_or_default();
        let numeric = || raw.trim().parse::<f64>().ok();

        let literal = || match (block, numeric()) {
            (Some(Block::Number(_)), Some(n)) => Literal::Number(n),
            _ => Literal::Text(raw.clone()),
        };
        let ordered = || numeric().map(Literal::Number).unwrap_or_else(|| Literal::Text(raw.clone()));

        match rule.op {
            BranchOp::IsFilled => Condition::Compare {
                field,
                cmp: Comparison::NotEq,
                rhs: Literal::Text(String::new()),
            },
            BranchOp::IsEmpty => Condition::Compare {
                field,
                cmp: Comparison::Eq,
                rhs: Literal::Text(String::new()),
            },
            BranchOp::Equals => Condition::Compare {
                field,
                cmp: Comparison::Eq,
                rhs: literal(),
            },
            BranchOp::Contains if block.is_some_and(Block::is_single_valued_choice) => {
                Condition::Compare {
                    field,
                    cmp: Comparison::Eq,
                    rhs: literal(),
                }
            }
            BranchOp::Contains => Condition::Contains {
                field,
                rhs: literal(),
            },
            BranchOp::Gt => Condition::Compare {
                field,
                cmp: Comparison::Gt,
                rhs: ordered(),
            },
            BranchOp::Lt => Condition::Compare {
                field,
                cmp: Comparison::Lt,
                rhs: ordered(),
            },
            BranchOp::IsTrue => Condition::Truthy {
                field,
                negated: false,
            },
            BranchOp::IsFalse => Condition::Truthy {
                field,
                negated: true,
            },
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Compare { field, cmp, rhs } => {
                write!(f, "${{form.{}}} {} {}", field, cmp.symbol(), rhs)
            }
            Condition::Contains { field, rhs } => write!(f, "contains(${{form.{}}}, {})", field, rhs),
            Condition::Truthy { field, negated } => {
                if *negated {
                    write!(f, "!")?;
                }
                write!(f, "${{form.{}}}", field)
            }
        }
    }
}
