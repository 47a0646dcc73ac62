//! calculator tool - arithmetic expression evaluation

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::tools::{Tool, ToolContext, ToolError, ToolResult};

/// Evaluate arithmetic expressions
pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &'static str {
        "calculator"
    }

    fn description(&self) -> &'static str {
        "Evaluate an arithmetic expression with + - * / % ^, parentheses and decimals."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "Expression to evaluate, e.g. (2 + 3) * 4"
                }
            },
            "required": ["expression"]
        })
    }

    fn input_from_argument(&self, argument: &str) -> Value {
        serde_json::json!({ "expression": argument })
    }

    async fn execute(&self, input: Value, _ctx: &mut ToolContext) -> ToolResult {
        debug!(?input, "CalculatorTool::execute: called");
        let expression = input["expression"].as_str().unwrap_or("").trim();
        if expression.is_empty() {
            return ToolResult::error("expression is required");
        }

        match evaluate(expression) {
            Ok(value) => ToolResult::success(format!("Result: {}", format_number(value))),
            Err(e) => {
                debug!(%e, "CalculatorTool::execute: evaluation failed");
                ToolResult::error(format!("Error evaluating '{}': {}", expression, e))
            }
        }
    }
}

/// Evaluate `expression`
///
/// Grammar, loosest binding first:
///
/// ```text
/// expr   := term (('+' | '-') term)*
/// term   := unary (('*' | '/' | '%') unary)*
/// unary  := '-' unary | power
/// power  := atom ('^' unary)?
/// atom   := number | '(' expr ')'
/// ```
///
/// `^` is right-associative and binds tighter than unary minus on its left,
/// so `-2^2` is `-4`. Nesting (parentheses, unary signs and `^` chains) is
/// capped at [`MAX_DEPTH`] levels.
pub fn evaluate(expression: &str) -> Result<f64, ToolError> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if let Some(token) = parser.peek() {
        return Err(ToolError::InvalidArgument(format!("unexpected '{}'", token)));
    }
    if !value.is_finite() {
        return Err(ToolError::InvalidArgument("result is not a finite number".to_string()));
    }
    Ok(value)
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Op(char),
    LParen,
    RParen,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Op(c) => write!(f, "{}", c),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ToolError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| ToolError::InvalidArgument(format!("invalid number '{}'", literal)))?;
                tokens.push(Token::Number(value));
            }
            '+' | '-' | '*' | '/' | '%' | '^' => {
                tokens.push(Token::Op(c));
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            other => return Err(ToolError::InvalidArgument(format!("unexpected character '{}'", other))),
        }
    }
    Ok(tokens)
}

/// Deepest nesting the parser will recurse into
pub const MAX_DEPTH: usize = 256;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    /// Run `f` one nesting level deeper
    fn nested(&mut self, f: impl FnOnce(&mut Self) -> Result<f64, ToolError>) -> Result<f64, ToolError> {
        if self.depth >= MAX_DEPTH {
            return Err(ToolError::InvalidArgument("expression nested too deeply".to_string()));
        }
        self.depth += 1;
        let value = f(self);
        self.depth -= 1;
        value
    }

    fn expr(&mut self) -> Result<f64, ToolError> {
        let mut value = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, ToolError> {
        let mut value = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/' | '%'))) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = match op {
                '*' => value * rhs,
                _ if rhs == 0.0 => return Err(ToolError::InvalidArgument("division by zero".to_string())),
                '/' => value / rhs,
                _ => value % rhs,
            };
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<f64, ToolError> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                Ok(-self.nested(Self::unary)?)
            }
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.nested(Self::unary)
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<f64, ToolError> {
        let base = self.atom()?;
        if let Some(Token::Op('^')) = self.peek() {
            self.pos += 1;
            let exponent = self.nested(Self::unary)?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<f64, ToolError> {
        match self.next() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.nested(Self::expr)?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(ToolError::InvalidArgument("missing ')'".to_string())),
                }
            }
            Some(token) => Err(ToolError::InvalidArgument(format!("unexpected '{}'", token))),
            None => Err(ToolError::InvalidArgument("unexpected end of expression".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::Session;
    use tempfile::tempdir;

    #[test]
    fn test_precedence() {
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), 20.0);
        assert_eq!(evaluate("10 - 4 - 3").unwrap(), 3.0);
        assert_eq!(evaluate("2 ^ 3 ^ 2").unwrap(), 512.0);
        assert_eq!(evaluate("17 % 5").unwrap(), 2.0);
    }

    #[test]
    fn test_unary_and_decimals() {
        assert_eq!(evaluate("-2 ^ 2").unwrap(), -4.0);
        assert_eq!(evaluate("-(3 - 5)").unwrap(), 2.0);
        assert_eq!(evaluate("1.5 * 4").unwrap(), 6.0);
        assert_eq!(evaluate("2 * -3").unwrap(), -6.0);
    }

    #[test]
    fn test_division_by_zero() {
        let err = evaluate("1 / (2 - 2)").unwrap_err();
        assert!(err.to_string().contains("division by zero"));
        assert!(evaluate("5 % 0").is_err());
    }

    #[test]
    fn test_malformed() {
        assert!(evaluate("2 +").is_err());
        assert!(evaluate("(1 + 2").is_err());
        assert!(evaluate("1 2").is_err());
        assert!(evaluate("import os").is_err());
        assert!(evaluate("1..2").is_err());
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let parens = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        let err = evaluate(&parens).unwrap_err();
        assert!(err.to_string().contains("nested too deeply"));

        assert!(evaluate(&format!("{}1", "-".repeat(100_000))).is_err());
        assert!(evaluate(&format!("{}2", "2^".repeat(100_000))).is_err());
    }

    #[test]
    fn test_nesting_within_limit() {
        let parens = format!("{}7{}", "(".repeat(MAX_DEPTH - 1), ")".repeat(MAX_DEPTH - 1));
        assert_eq!(evaluate(&parens).unwrap(), 7.0);
        assert_eq!(evaluate("--3").unwrap(), 3.0);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(42.0), "42");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(-3.0), "-3");
    }

    #[tokio::test]
    async fn test_calculator_tool() {
        let temp = tempdir().unwrap();
        let mut ctx = ToolContext::new(Session::new(temp.path()).unwrap());

        let ok = CalculatorTool
            .execute(serde_json::json!({"expression": "6 * 7"}), &mut ctx)
            .await;
        assert!(!ok.is_error);
        assert_eq!(ok.content, "Result: 42");

        let bad = CalculatorTool
            .execute(serde_json::json!({"expression": "1 / 0"}), &mut ctx)
            .await;
        assert!(bad.is_error);
        assert!(bad.content.starts_with("Error evaluating '1 / 0'"));

        let deep = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        let nested = CalculatorTool
            .execute(serde_json::json!({ "expression": deep }), &mut ctx)
            .await;
        assert!(nested.is_error);
        assert!(nested.content.ends_with("expression nested too deeply"));
    }
}
