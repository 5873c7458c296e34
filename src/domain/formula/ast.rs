// Formula syntax tree
use crate::domain::value::BinaryOp;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(f64),
    TagRef(String),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            name: name.into(),
            args,
        }
    }

    /// Tag identifiers referenced by the formula, in order of appearance.
    pub fn tag_refs(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        self.collect_tag_refs(&mut refs);
        refs
    }

    fn collect_tag_refs<'a>(&'a self, refs: &mut Vec<&'a str>) {
        match self {
            Expr::Literal(_) => {}
            Expr::TagRef(id) => refs.push(id),
            Expr::Binary { left, right, .. } => {
                left.collect_tag_refs(refs);
                right.collect_tag_refs(refs);
            }
            Expr::Call { args, .. } => args.iter().for_each(|a| a.collect_tag_refs(refs)),
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Binary { op, .. } => op.precedence(),
            _ => u8::MAX,
        }
    }
}

/// Canonical text with the fewest parentheses that re-parse to the same tree.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(n) => write!(f, "{n}"),
            Expr::TagRef(id) => f.write_str(id),
            Expr::Binary { op, left, right } => {
                let prec = op.precedence();
                if left.precedence() < prec {
                    write!(f, "({left})")?;
                } else {
                    write!(f, "{left}")?;
                }
                write!(f, " {op} ")?;
                // Operators are left-associative, so an equal-precedence right child needs parens.
                if right.precedence() <= prec {
                    write!(f, "({right})")
                } else {
                    write!(f, "{right}")
                }
            }
            Expr::Call { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_minimal_parens() {
        let e = Expr::binary(
            BinaryOp::Sub,
            Expr::Literal(10.0),
            Expr::binary(BinaryOp::Sub, Expr::Literal(4.0), Expr::Literal(3.0)),
        );
        assert_eq!(e.to_string(), "10 - (4 - 3)");

        let e = Expr::binary(
            BinaryOp::Mul,
            Expr::binary(BinaryOp::Add, Expr::TagRef("PI001".into()), Expr::Literal(0.5)),
            Expr::call("avg", vec![Expr::TagRef("TI001".into()), Expr::TagRef("PI002".into())]),
        );
        assert_eq!(e.to_string(), "(PI001 + 0.5) * avg(TI001, PI002)");
    }

    #[test]
    fn test_tag_refs_in_order() {
        let e = Expr::binary(
            BinaryOp::Add,
            Expr::call("derivative", vec![Expr::TagRef("PI001".into())]),
            Expr::TagRef("PI001".into()),
        );
        assert_eq!(e.tag_refs(), vec!["PI001", "PI001"]);
    }
}
