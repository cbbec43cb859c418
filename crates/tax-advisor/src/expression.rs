//! Arithmetic Expression Evaluator
//!
//! The calculator agent answers with an expression such as
//! `(24000 - 6000) * 0.19 / 12`; this module turns it into a number.
//! Only decimal literals, `+ - * /`, parentheses and unary signs are
//! accepted. Everything is computed in [`Decimal`].

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{AdvisorError, Result};

/// Digits kept after the decimal point in a result
const RESULT_SCALE: u32 = 10;

/// Parenthesis nesting limit
const MAX_DEPTH: usize = 64;

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(Decimal),
    Plus,
    Minus,
    Star,
    Slash,
    Open,
    Close,
}

/// Evaluate `expression` and return the exact [`Decimal`] result
pub fn evaluate(expression: &str) -> Result<Decimal> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err(AdvisorError::InvalidExpression("empty expression".into()));
    }

    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    match parser.peek() {
        None => Ok(value),
        Some(token) => Err(AdvisorError::InvalidExpression(format!(
            "unexpected {:?} at token {}",
            token, parser.pos
        ))),
    }
}

/// Evaluate and render the result the way the calculator reports it:
/// rounded to ten decimal places, trailing zeros dropped.
pub fn evaluate_to_string(expression: &str) -> Result<String> {
    let value = evaluate(expression)?;
    Ok(value.round_dp(RESULT_SCALE).normalize().to_string())
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut end = start;
                let mut dots = 0;
                while let Some(&(i, d)) = chars.peek() {
                    if d.is_ascii_digit() {
                        end = i + 1;
                    } else if d == '.' {
                        dots += 1;
                        end = i + 1;
                    } else {
                        break;
                    }
                    chars.next();
                }
                let literal = &input[start..end];
                if dots > 1 || literal == "." {
                    return Err(AdvisorError::InvalidExpression(format!(
                        "malformed number '{}'",
                        literal
                    )));
                }
                let value = Decimal::from_str(literal).map_err(|e| {
                    AdvisorError::InvalidExpression(format!("number '{}': {}", literal, e))
                })?;
                tokens.push(Token::Number(value));
            }
            _ => {
                let token = match c {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    '(' => Token::Open,
                    ')' => Token::Close,
                    other => {
                        return Err(AdvisorError::InvalidExpression(format!(
                            "unsupported character '{}'",
                            other
                        )))
                    }
                };
                tokens.push(token);
                chars.next();
            }
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<Decimal> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    let rhs = self.term()?;
                    value = value.checked_add(rhs).ok_or(AdvisorError::Overflow)?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    let rhs = self.term()?;
                    value = value.checked_sub(rhs).ok_or(AdvisorError::Overflow)?;
                }
                _ => return Ok(value),
            }
        }
    }

    // term := factor (('*' | '/') factor)*
    fn term(&mut self) -> Result<Decimal> {
        let mut value = self.factor()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    let rhs = self.factor()?;
                    value = value.checked_mul(rhs).ok_or(AdvisorError::Overflow)?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    let rhs = self.factor()?;
                    if rhs.is_zero() {
                        return Err(AdvisorError::DivisionByZero);
                    }
                    value = value.checked_div(rhs).ok_or(AdvisorError::Overflow)?;
                }
                _ => return Ok(value),
            }
        }
    }

    // factor := ('+' | '-') factor | number | '(' expr ')'
    fn factor(&mut self) -> Result<Decimal> {
        let position = self.pos;
        match self.advance().cloned() {
            Some(Token::Plus) => self.nested(Self::factor),
            Some(Token::Minus) => Ok(-self.nested(Self::factor)?),
            Some(Token::Number(value)) => Ok(value),
            Some(Token::Open) => {
                let value = self.nested(Self::expr)?;
                match self.advance() {
                    Some(Token::Close) => Ok(value),
                    _ => Err(AdvisorError::InvalidExpression("unbalanced parenthesis".into())),
                }
            }
            Some(token) => Err(AdvisorError::InvalidExpression(format!(
                "unexpected {:?} at token {}",
                token, position
            ))),
            None => Err(AdvisorError::InvalidExpression("unexpected end of expression".into())),
        }
    }

    fn nested(&mut self, rule: fn(&mut Self) -> Result<Decimal>) -> Result<Decimal> {
        if self.depth >= MAX_DEPTH {
            return Err(AdvisorError::InvalidExpression("expression nested too deeply".into()));
        }
        self.depth += 1;
        let value = rule(self);
        self.depth -= 1;
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_precedence_and_parentheses() {
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), dec!(14));
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), dec!(20));
        assert_eq!(evaluate("10 - 4 - 3").unwrap(), dec!(3));
        assert_eq!(evaluate("100 / 10 / 2").unwrap(), dec!(5));
    }

    #[test]
    fn test_monthly_projection() {
        assert_eq!(evaluate("1000 * 12").unwrap(), dec!(12000));
        assert_eq!(evaluate_to_string("1000 / 12").unwrap(), "83.3333333333");
        assert_eq!(evaluate_to_string("(24000 - 6000) * 0.19").unwrap(), "3420");
    }

    #[test]
    fn test_unary_signs() {
        assert_eq!(evaluate("-5 + 2").unwrap(), dec!(-3));
        assert_eq!(evaluate("-(2 + 3)").unwrap(), dec!(-5));
        assert_eq!(evaluate("--4").unwrap(), dec!(4));
        assert_eq!(evaluate("+0.5").unwrap(), dec!(0.5));
    }

    #[test]
    fn test_normalized_output() {
        assert_eq!(evaluate_to_string("1.50 + 1.50").unwrap(), "3");
        assert_eq!(evaluate_to_string("0.1 + 0.2").unwrap(), "0.3");
    }

    #[test]
    fn test_rejects_non_arithmetic() {
        for input in ["2 ** 3", "2 ^ 3", "abs(-1)", "__import__('os')", "1,000 * 2", "3 % 2", ""] {
            assert!(
                matches!(evaluate(input), Err(AdvisorError::InvalidExpression(_))),
                "accepted {input:?}"
            );
        }
    }

    #[test]
    fn test_malformed_input() {
        assert!(evaluate("1.2.3").is_err());
        assert!(evaluate("(1 + 2").is_err());
        assert!(evaluate("1 + 2)").is_err());
        assert!(evaluate("4 *").is_err());
        assert!(evaluate(".").is_err());
    }

    #[test]
    fn test_division_by_zero() {
        assert!(matches!(evaluate("1 / (2 - 2)"), Err(AdvisorError::DivisionByZero)));
    }

    #[test]
    fn test_overflow() {
        let huge = "79228162514264337593543950335";
        assert!(matches!(evaluate(&format!("{huge} * 10")), Err(AdvisorError::Overflow)));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert!(evaluate(&deep).is_err());
        let shallow = format!("{}1{}", "(".repeat(10), ")".repeat(10));
        assert_eq!(evaluate(&shallow).unwrap(), dec!(1));
    }
}
