// Formula tokenizer
use super::error::SyntaxError;
use crate::domain::tag::TagId;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Tag(String),
    /// Identifier immediately followed by `(`; the paren is its own token.
    Function(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{n}"),
            Token::Tag(id) => f.write_str(id),
            Token::Function(name) => write!(f, "{name}("),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Star => f.write_str("*"),
            Token::Slash => f.write_str("/"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Comma => f.write_str(","),
        }
    }
}

pub fn tokenize(input: &str) -> Result<Vec<Spanned>, SyntaxError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;
        let token = match c {
            b' ' | b'\t' | b'\r' | b'\n' => {
                i += 1;
                continue;
            }
            b'+' => Token::Plus,
            b'-' => Token::Minus,
            b'*' => Token::Star,
            b'/' => Token::Slash,
            b'(' => Token::LParen,
            b')' => Token::RParen,
            b',' => Token::Comma,
            b'0'..=b'9' => {
                let (number, end) = lex_number(input, start)?;
                tokens.push(Spanned {
                    token: Token::Number(number),
                    position: start,
                });
                i = end;
                continue;
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                let word = &input[start..i];
                let called = bytes.get(i) == Some(&b'(');
                let token = match (TagId::is_valid(word), called) {
                    (true, true) => {
                        return Err(SyntaxError::new(
                            start,
                            format!("tag id '{word}' cannot be used as a function name"),
                        ));
                    }
                    (true, false) => Token::Tag(word.to_string()),
                    (false, true) => Token::Function(word.to_string()),
                    (false, false) => {
                        return Err(SyntaxError::new(
                            start,
                            format!("unrecognized identifier '{word}'"),
                        ));
                    }
                };
                tokens.push(Spanned { token, position: start });
                continue;
            }
            _ => {
                let ch = input[start..].chars().next().unwrap_or('?');
                return Err(SyntaxError::new(start, format!("unexpected character '{ch}'")));
            }
        };
        tokens.push(Spanned { token, position: start });
        i += 1;
    }

    Ok(tokens)
}

/// `[0-9]+(\.[0-9]+)?` starting at `start`; returns the value and end offset.
fn lex_number(input: &str, start: usize) -> Result<(f64, usize), SyntaxError> {
    let bytes = input.as_bytes();
    let mut end = start;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if bytes.get(end) == Some(&b'.') {
        let fraction = end + 1;
        let mut frac_end = fraction;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if frac_end == fraction {
            return Err(SyntaxError::new(end, "expected digits after decimal point"));
        }
        end = frac_end;
    }
    let text = &input[start..end];
    match text.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok((n, end)),
        Ok(_) => Err(SyntaxError::new(start, "number is too large")),
        Err(_) => Err(SyntaxError::new(start, format!("invalid number '{text}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn test_tokenize_formula() {
        assert_eq!(
            kinds("PI001 * 2.5 - avg(TI001, PI002)"),
            vec![
                Token::Tag("PI001".into()),
                Token::Star,
                Token::Number(2.5),
                Token::Minus,
                Token::Function("avg".into()),
                Token::LParen,
                Token::Tag("TI001".into()),
                Token::Comma,
                Token::Tag("PI002".into()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_whitespace_is_discarded_and_positions_kept() {
        let tokens = tokenize("  12 +\tTI001").unwrap();
        let positions: Vec<usize> = tokens.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![2, 5, 7]);
    }

    #[test]
    fn test_function_requires_adjacent_paren() {
        let err = tokenize("avg (PI001)").unwrap_err();
        assert_eq!(err.position, 0);
    }

    #[test]
    fn test_tag_shaped_function_name_rejected() {
        let err = tokenize("1 + PI001(TI001)").unwrap_err();
        assert_eq!(err.position, 4);
        assert!(err.message.contains("function name"));
    }

    #[test]
    fn test_lowercase_tag_is_unrecognized() {
        let err = tokenize("pi001 + 1").unwrap_err();
        assert!(err.message.contains("unrecognized identifier 'pi001'"));
    }

    #[test]
    fn test_malformed_numbers() {
        assert_eq!(tokenize("3.").unwrap_err().position, 1);
        assert_eq!(tokenize(".5").unwrap_err().position, 0);
    }

    #[test]
    fn test_number_out_of_range() {
        let input = format!("2 * {}", "9".repeat(400));
        assert_eq!(tokenize(&input).unwrap_err(), SyntaxError::new(4, "number is too large"));
        assert_eq!(kinds(&"9".repeat(300)).len(), 1);
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("PI001 % 2").unwrap_err();
        assert_eq!(err, SyntaxError::new(6, "unexpected character '%'"));
    }
}
