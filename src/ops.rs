//! Primitive operators carried by OPE nodes.

use std::fmt;
use std::str::FromStr;

use crate::error::ReduceError;
use crate::kind::NodeKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
}

/// Value an operator can consume.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    Num(i64),
    Bool(bool),
}

impl Operand {
    pub fn kind(self) -> NodeKind {
        match self {
            Operand::Num(_) => NodeKind::Num,
            Operand::Bool(_) => NodeKind::Bool,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Num(n) => write!(f, "{n}"),
            Operand::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl Operator {
    pub fn name(self) -> &'static str {
        match self {
            Operator::Add => "add",
            Operator::Sub => "sub",
            Operator::Mul => "mul",
            Operator::Div => "div",
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Lt => "lt",
            Operator::Le => "le",
            Operator::Gt => "gt",
            Operator::Ge => "ge",
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Not => "not",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::And => "&&",
            Operator::Or => "||",
            Operator::Not => "not",
        }
    }

    pub fn is_unary(self) -> bool {
        matches!(self, Operator::Not)
    }

    /// Number of ports an OPE node needs for this operator.
    pub fn arity(self) -> usize {
        if self.is_unary() { 2 } else { 3 }
    }

    /// Reject operands of the wrong type before any state is stored.
    pub fn check(self, operand: Operand) -> Result<(), ReduceError> {
        let ok = match self {
            Operator::Add
            | Operator::Sub
            | Operator::Mul
            | Operator::Div
            | Operator::Lt
            | Operator::Le
            | Operator::Gt
            | Operator::Ge => matches!(operand, Operand::Num(_)),
            Operator::And | Operator::Or | Operator::Not => matches!(operand, Operand::Bool(_)),
            Operator::Eq | Operator::Ne => true,
        };
        if ok {
            Ok(())
        } else {
            Err(ReduceError::OperandMismatch {
                operator: self,
                found: operand.kind(),
            })
        }
    }

    pub fn apply_unary(self, operand: Operand) -> Result<Operand, ReduceError> {
        match (self, operand) {
            (Operator::Not, Operand::Bool(b)) => Ok(Operand::Bool(!b)),
            _ => Err(ReduceError::OperandMismatch {
                operator: self,
                found: operand.kind(),
            }),
        }
    }

    /// Combine the stored first operand with the second one.
    pub fn apply(self, lhs: Operand, rhs: Operand) -> Result<Operand, ReduceError> {
        let mismatch = |found: Operand| ReduceError::OperandMismatch {
            operator: self,
            found: found.kind(),
        };
        match (lhs, rhs) {
            (Operand::Num(a), Operand::Num(b)) => {
                let overflow = || ReduceError::Overflow(self);
                let out = match self {
                    Operator::Add => Operand::Num(a.checked_add(b).ok_or_else(overflow)?),
                    Operator::Sub => Operand::Num(a.checked_sub(b).ok_or_else(overflow)?),
                    Operator::Mul => Operand::Num(a.checked_mul(b).ok_or_else(overflow)?),
                    Operator::Div => Operand::Num(floor_div(a, b).ok_or_else(|| {
                        if b == 0 {
                            ReduceError::DivisionByZero
                        } else {
                            ReduceError::Overflow(self)
                        }
                    })?),
                    Operator::Eq => Operand::Bool(a == b),
                    Operator::Ne => Operand::Bool(a != b),
                    Operator::Lt => Operand::Bool(a < b),
                    Operator::Le => Operand::Bool(a <= b),
                    Operator::Gt => Operand::Bool(a > b),
                    Operator::Ge => Operand::Bool(a >= b),
                    Operator::And | Operator::Or | Operator::Not => return Err(mismatch(rhs)),
                };
                Ok(out)
            }
            (Operand::Bool(a), Operand::Bool(b)) => match self {
                Operator::And => Ok(Operand::Bool(a && b)),
                Operator::Or => Ok(Operand::Bool(a || b)),
                Operator::Eq => Ok(Operand::Bool(a == b)),
                Operator::Ne => Ok(Operand::Bool(a != b)),
                _ => Err(mismatch(rhs)),
            },
            _ => Err(mismatch(rhs)),
        }
    }
}

/// Division rounding toward negative infinity. `None` on zero divisor or overflow.
fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if (a % b != 0) && ((a < 0) != (b < 0)) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operator {
    type Err = ReduceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const ALL: [Operator; 13] = [
            Operator::Add,
            Operator::Sub,
            Operator::Mul,
            Operator::Div,
            Operator::Eq,
            Operator::Ne,
            Operator::Lt,
            Operator::Le,
            Operator::Gt,
            Operator::Ge,
            Operator::And,
            Operator::Or,
            Operator::Not,
        ];
        ALL.iter()
            .copied()
            .find(|op| op.name() == s || op.symbol() == s)
            .ok_or_else(|| ReduceError::UnknownOperator(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn arithmetic() -> Result<()> {
        assert_eq!(Operator::Add.apply(Operand::Num(5), Operand::Num(3))?, Operand::Num(8));
        assert_eq!(Operator::Sub.apply(Operand::Num(10), Operand::Num(4))?, Operand::Num(6));
        assert_eq!(Operator::Mul.apply(Operand::Num(6), Operand::Num(7))?, Operand::Num(42));
        assert_eq!(Operator::Div.apply(Operand::Num(15), Operand::Num(4))?, Operand::Num(3));
        Ok(())
    }

    #[test]
    fn division_rounds_down() -> Result<()> {
        assert_eq!(Operator::Div.apply(Operand::Num(-7), Operand::Num(2))?, Operand::Num(-4));
        assert_eq!(Operator::Div.apply(Operand::Num(7), Operand::Num(-2))?, Operand::Num(-4));
        assert_eq!(Operator::Div.apply(Operand::Num(-8), Operand::Num(2))?, Operand::Num(-4));
        assert_eq!(
            Operator::Div.apply(Operand::Num(1), Operand::Num(0)),
            Err(ReduceError::DivisionByZero)
        );
        assert_eq!(
            Operator::Div.apply(Operand::Num(i64::MIN), Operand::Num(-1)),
            Err(ReduceError::Overflow(Operator::Div))
        );
        Ok(())
    }

    #[test]
    fn comparisons_and_logic() -> Result<()> {
        assert_eq!(Operator::Lt.apply(Operand::Num(3), Operand::Num(4))?, Operand::Bool(true));
        assert_eq!(Operator::Ge.apply(Operand::Num(3), Operand::Num(4))?, Operand::Bool(false));
        assert_eq!(
            Operator::Eq.apply(Operand::Bool(true), Operand::Bool(true))?,
            Operand::Bool(true)
        );
        assert_eq!(
            Operator::And.apply(Operand::Bool(true), Operand::Bool(false))?,
            Operand::Bool(false)
        );
        assert_eq!(Operator::Not.apply_unary(Operand::Bool(false))?, Operand::Bool(true));
        Ok(())
    }

    #[test]
    fn operand_types_are_checked() -> Result<()> {
        assert!(Operator::Add.check(Operand::Num(1)).is_ok());
        assert_eq!(
            Operator::Add.check(Operand::Bool(true)),
            Err(ReduceError::OperandMismatch {
                operator: Operator::Add,
                found: NodeKind::Bool,
            })
        );
        assert!(Operator::Eq.apply(Operand::Num(1), Operand::Bool(true)).is_err());
        assert_eq!(
            Operator::Add.apply(Operand::Num(i64::MAX), Operand::Num(1)),
            Err(ReduceError::Overflow(Operator::Add))
        );
        Ok(())
    }

    #[test]
    fn parse_by_name_or_symbol() -> Result<()> {
        assert_eq!("add".parse::<Operator>()?, Operator::Add);
        assert_eq!("<=".parse::<Operator>()?, Operator::Le);
        assert_eq!(
            "pow".parse::<Operator>(),
            Err(ReduceError::UnknownOperator("pow".into()))
        );
        Ok(())
    }
}
