// Recursive-descent formula parser
//
// expression := term (('+'|'-') term)*
// term       := factor (('*'|'/') factor)*
// factor     := NUMBER | TAG_ID | FUNCTION '(' expression (',' expression)* ')' | '(' expression ')'
use super::ast::Expr;
use super::error::SyntaxError;
use super::lexer::{tokenize, Spanned, Token};
use crate::domain::value::BinaryOp;

/// Bound on both syntax tree depth and bracket nesting. Evaluation and
/// formatting recurse over the tree, so it must stay shallow.
pub const MAX_DEPTH: usize = 256;

pub fn parse(input: &str) -> Result<Expr, SyntaxError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        end: input.len(),
        nesting: 0,
    };
    let (expr, _) = parser.expression()?;
    if let Some(extra) = parser.peek() {
        return Err(SyntaxError::new(
            extra.position,
            format!("unexpected token '{}'", extra.token),
        ));
    }
    Ok(expr)
}

/// A parsed subtree and its depth.
type Parsed = (Expr, usize);

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    end: usize,
    nesting: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Spanned> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Spanned> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), SyntaxError> {
        match self.next() {
            Some(s) if s.token == expected => Ok(()),
            Some(s) => Err(SyntaxError::new(
                s.position,
                format!("expected '{expected}', found '{}'", s.token),
            )),
            None => Err(SyntaxError::new(
                self.end,
                format!("expected '{expected}', found end of input"),
            )),
        }
    }

    fn enter(&mut self, position: usize) -> Result<(), SyntaxError> {
        self.nesting += 1;
        if self.nesting > MAX_DEPTH {
            return Err(too_deep(position));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.nesting -= 1;
    }

    fn expression(&mut self) -> Result<Parsed, SyntaxError> {
        let (mut left, mut depth) = self.term()?;
        while let Some((op, position)) = self.operator(additive) {
            let (right, right_depth) = self.term()?;
            depth = node_depth(position, depth.max(right_depth))?;
            left = Expr::binary(op, left, right);
        }
        Ok((left, depth))
    }

    fn term(&mut self) -> Result<Parsed, SyntaxError> {
        let (mut left, mut depth) = self.factor()?;
        while let Some((op, position)) = self.operator(multiplicative) {
            let (right, right_depth) = self.factor()?;
            depth = node_depth(position, depth.max(right_depth))?;
            left = Expr::binary(op, left, right);
        }
        Ok((left, depth))
    }

    /// Consume the next token if `classify` maps it to an operator.
    fn operator(&mut self, classify: fn(&Token) -> Option<BinaryOp>) -> Option<(BinaryOp, usize)> {
        let spanned = self.peek()?;
        let op = classify(&spanned.token)?;
        self.pos += 1;
        Some((op, spanned.position))
    }

    fn factor(&mut self) -> Result<Parsed, SyntaxError> {
        let Some(spanned) = self.next() else {
            return Err(SyntaxError::new(self.end, "expected operand, found end of input"));
        };
        match &spanned.token {
            Token::Number(n) => Ok((Expr::Literal(*n), 1)),
            Token::Tag(id) => Ok((Expr::TagRef(id.clone()), 1)),
            Token::Function(name) => {
                self.expect(Token::LParen)?;
                if matches!(self.peek(), Some(s) if s.token == Token::RParen) {
                    return Err(SyntaxError::new(
                        spanned.position,
                        format!("function '{name}' requires at least one argument"),
                    ));
                }
                self.enter(spanned.position)?;
                let (first, mut depth) = self.expression()?;
                let mut args = vec![first];
                while matches!(self.peek(), Some(s) if s.token == Token::Comma) {
                    self.pos += 1;
                    let (arg, arg_depth) = self.expression()?;
                    depth = depth.max(arg_depth);
                    args.push(arg);
                }
                self.expect(Token::RParen)?;
                self.leave();
                Ok((Expr::call(name.clone(), args), node_depth(spanned.position, depth)?))
            }
            Token::LParen => {
                self.enter(spanned.position)?;
                let inner = self.expression()?;
                self.expect(Token::RParen)?;
                self.leave();
                Ok(inner)
            }
            other => Err(SyntaxError::new(
                spanned.position,
                format!("expected operand, found '{other}'"),
            )),
        }
    }
}

/// Depth of a node whose deepest child has `child_depth`.
fn node_depth(position: usize, child_depth: usize) -> Result<usize, SyntaxError> {
    let depth = child_depth + 1;
    if depth > MAX_DEPTH {
        return Err(too_deep(position));
    }
    Ok(depth)
}

fn too_deep(position: usize) -> SyntaxError {
    SyntaxError::new(position, format!("formula nests deeper than {MAX_DEPTH} levels"))
}

fn additive(token: &Token) -> Option<BinaryOp> {
    match token {
        Token::Plus => Some(BinaryOp::Add),
        Token::Minus => Some(BinaryOp::Sub),
        _ => None,
    }
}

fn multiplicative(token: &Token) -> Option<BinaryOp> {
    match token {
        Token::Star => Some(BinaryOp::Mul),
        Token::Slash => Some(BinaryOp::Div),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(id: &str) -> Expr {
        Expr::TagRef(id.to_string())
    }

    #[test]
    fn test_multiplication_binds_tighter() {
        assert_eq!(
            parse("2 + 3 * 4").unwrap(),
            Expr::binary(
                BinaryOp::Add,
                Expr::Literal(2.0),
                Expr::binary(BinaryOp::Mul, Expr::Literal(3.0), Expr::Literal(4.0)),
            )
        );
    }

    #[test]
    fn test_left_associativity() {
        assert_eq!(
            parse("10 - 4 - 3").unwrap(),
            Expr::binary(
                BinaryOp::Sub,
                Expr::binary(BinaryOp::Sub, Expr::Literal(10.0), Expr::Literal(4.0)),
                Expr::Literal(3.0),
            )
        );
        assert_eq!(
            parse("PI001 / 2 * TI001").unwrap(),
            Expr::binary(
                BinaryOp::Mul,
                Expr::binary(BinaryOp::Div, tag("PI001"), Expr::Literal(2.0)),
                tag("TI001"),
            )
        );
    }

    #[test]
    fn test_parentheses_override_precedence() {
        assert_eq!(
            parse("(2 + 3) * 4").unwrap(),
            Expr::binary(
                BinaryOp::Mul,
                Expr::binary(BinaryOp::Add, Expr::Literal(2.0), Expr::Literal(3.0)),
                Expr::Literal(4.0),
            )
        );
    }

    #[test]
    fn test_function_calls() {
        assert_eq!(
            parse("PI001 * 2 - avg(TI001, PI002)").unwrap(),
            Expr::binary(
                BinaryOp::Sub,
                Expr::binary(BinaryOp::Mul, tag("PI001"), Expr::Literal(2.0)),
                Expr::call("avg", vec![tag("TI001"), tag("PI002")]),
            )
        );
        assert_eq!(
            parse("derivative(PI001 + 1)").unwrap(),
            Expr::call(
                "derivative",
                vec![Expr::binary(BinaryOp::Add, tag("PI001"), Expr::Literal(1.0))]
            )
        );
    }

    #[test]
    fn test_syntax_errors() {
        let cases = [
            ("(PI001 + 2", 10),
            ("PI001 + 2)", 9),
            ("PI001 +", 7),
            ("* 2", 0),
            ("2 + * 3", 4),
            ("avg()", 0),
            ("avg(PI001,)", 10),
            ("PI001(2)", 0),
            ("PI001 TI001", 6),
            ("", 0),
            ("sum(PI001 PI002)", 10),
        ];
        for (input, position) in cases {
            let err = parse(input).unwrap_err();
            assert_eq!(err.position, position, "{input}: {err}");
        }
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |levels: usize| format!("{}1{}", "(".repeat(levels), ")".repeat(levels));
        assert_eq!(parse(&nested(200)).unwrap(), Expr::Literal(1.0));

        // The first bracket past the limit is reported.
        let err = parse(&nested(200_000)).unwrap_err();
        assert_eq!(err.position, MAX_DEPTH);
        assert!(err.message.contains("deeper than 256"));

        let calls = format!("{}PI001{}", "sum(".repeat(300), ")".repeat(300));
        assert!(parse(&calls).is_err());
    }

    #[test]
    fn test_operator_chain_depth_limit() {
        let chain = |terms: usize| format!("1{}", " + 1".repeat(terms - 1));
        assert!(parse(&chain(MAX_DEPTH)).is_ok());

        // "1 + 1 + ..." : the 256th '+' would make the tree 257 deep.
        let err = parse(&chain(100_000)).unwrap_err();
        assert_eq!(err.position, 2 + 4 * (MAX_DEPTH - 1));
    }

    #[test]
    fn test_overflowing_literal_is_rejected() {
        let huge = format!("{} + 1", "9".repeat(400));
        let err = parse(&huge).unwrap_err();
        assert_eq!(err.position, 0);

        let big = format!("{} + 1", "9".repeat(300));
        let tree = parse(&big).unwrap();
        assert_eq!(parse(&tree.to_string()).unwrap(), tree);
    }

    #[test]
    fn test_canonical_text_reparses_to_same_tree() {
        let formulas = [
            "PI001 * 2 - avg(TI001, PI002)",
            "10 - 4 - 3",
            "10 - (4 - 3)",
            "((2))",
            "8 / (4 / 2)",
            "8 / 4 / 2",
            "(PI001 + TI001) * (PI002 - 1.25)",
            "derivative(sum(PI001, TI001 * 3, 0.5)) / 60",
            "1 - (2 + 3) * 4 / (5 - 6)",
        ];
        for text in formulas {
            let tree = parse(text).unwrap();
            let canonical = tree.to_string();
            assert_eq!(parse(&canonical).unwrap(), tree, "{text} -> {canonical}");
        }
    }
}
