use std::fmt::Display;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::lex::{LexError, Lexer, Token, TokenKind};

#[derive(Error, Debug, Diagnostic)]
pub enum EvalError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Lex(#[from] LexError),

    #[error("Expected a number, found {found}")]
    #[diagnostic(help(
        "an expression starts with a number and every operator must be followed by one"
    ))]
    ExpectedOperand {
        #[source_code]
        src: NamedSource<String>,

        #[label("expected a number here")]
        bad_bit: SourceSpan,

        found: String,
    },

    #[error("Expected an operator, found {found}")]
    #[diagnostic(help("use one of `+`, `-`, `*`, `/` between two numbers"))]
    ExpectedOperator {
        #[source_code]
        src: NamedSource<String>,

        #[label("expected an operator here")]
        bad_bit: SourceSpan,

        found: String,
    },

    #[error("Division by zero")]
    DivisionByZero {
        #[source_code]
        src: NamedSource<String>,

        #[label("this divisor is zero")]
        bad_bit: SourceSpan,
    },

    #[error("Integer overflow")]
    #[diagnostic(help("the result does not fit in a signed 64-bit integer"))]
    Overflow {
        #[source_code]
        src: NamedSource<String>,

        #[label("this operation overflows")]
        bad_bit: SourceSpan,
    },
}

impl EvalError {
    /// Byte offset where the error was detected.
    pub fn position(&self) -> usize {
        match self {
            EvalError::Lex(e) => e.position(),
            EvalError::ExpectedOperand { bad_bit, .. }
            | EvalError::ExpectedOperator { bad_bit, .. }
            | EvalError::DivisionByZero { bad_bit, .. }
            | EvalError::Overflow { bad_bit, .. } => bad_bit.offset(),
        }
    }
}

/// The running result of an expression. It starts out as an integer and
/// becomes real after the first division.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Real(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Integer(n) => n as f64,
            Number::Real(n) => n,
        }
    }
}

impl Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Number::Integer(n) => write!(f, "{n}"),
            Number::Real(n) if n.is_finite() && n == n.trunc() => write!(f, "{n}.0"),
            Number::Real(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Plus,
    Minus,
    Multiply,
    Divide,
}

impl Op {
    pub fn from_kind(kind: TokenKind) -> Option<Op> {
        match kind {
            TokenKind::Plus => Some(Op::Plus),
            TokenKind::Minus => Some(Op::Minus),
            TokenKind::Multiply => Some(Op::Multiply),
            TokenKind::Divide => Some(Op::Divide),
            TokenKind::Integer(_) | TokenKind::EndOfInput => None,
        }
    }

    /// Computes `lhs op rhs`. Returns `None` when integer arithmetic
    /// overflows. The caller rejects a zero divisor before getting here.
    pub fn apply(self, lhs: Number, rhs: i64) -> Option<Number> {
        match (self, lhs) {
            // Only the fractional part goes through a lossy conversion.
            (Op::Divide, Number::Integer(lhs)) => {
                let (q, r) = (lhs / rhs, lhs % rhs);
                Some(Number::Real(q as f64 + r as f64 / rhs as f64))
            }
            (Op::Divide, Number::Real(lhs)) => Some(Number::Real(lhs / rhs as f64)),
            (Op::Plus, Number::Integer(lhs)) => lhs.checked_add(rhs).map(Number::Integer),
            (Op::Minus, Number::Integer(lhs)) => lhs.checked_sub(rhs).map(Number::Integer),
            (Op::Multiply, Number::Integer(lhs)) => lhs.checked_mul(rhs).map(Number::Integer),
            (Op::Plus, Number::Real(lhs)) => Some(Number::Real(lhs + rhs as f64)),
            (Op::Minus, Number::Real(lhs)) => Some(Number::Real(lhs - rhs as f64)),
            (Op::Multiply, Number::Real(lhs)) => Some(Number::Real(lhs * rhs as f64)),
        }
    }
}

enum State<'de> {
    Start,
    HaveOperand(Number),
    HaveOperator(Number, Op, Token<'de>),
}

/// Evaluates one expression strictly left to right, without precedence.
pub struct Evaluator<'de> {
    lexer: Lexer<'de>,
}

impl<'de> Evaluator<'de> {
    pub fn new(filename: Option<&'de str>, whole: &'de str) -> Self {
        Self {
            lexer: Lexer::new(filename, whole),
        }
    }

    pub fn evaluate(mut self) -> Result<Number, EvalError> {
        let mut state = State::Start;
        loop {
            let token = self.lexer.next_token()?;
            state = match (state, token.kind) {
                (State::Start, TokenKind::Integer(n)) => State::HaveOperand(Number::Integer(n)),
                (State::Start, _) => return Err(self.expected_operand(token)),
                (State::HaveOperand(result), TokenKind::EndOfInput) => return Ok(result),
                (State::HaveOperand(result), kind) => match Op::from_kind(kind) {
                    Some(op) => State::HaveOperator(result, op, token),
                    None => return Err(self.expected_operator(token)),
                },
                (State::HaveOperator(result, op, op_token), TokenKind::Integer(rhs)) => {
                    State::HaveOperand(self.apply(result, op, op_token, token, rhs)?)
                }
                (State::HaveOperator(..), _) => return Err(self.expected_operand(token)),
            };
        }
    }

    fn apply(
        &self,
        lhs: Number,
        op: Op,
        op_token: Token<'de>,
        rhs_token: Token<'de>,
        rhs: i64,
    ) -> Result<Number, EvalError> {
        let rhs_end = rhs_token.offset + rhs_token.literal.len();
        if op == Op::Divide && rhs == 0 {
            return Err(EvalError::DivisionByZero {
                src: self.lexer.source(),
                bad_bit: SourceSpan::from(rhs_token.offset..rhs_end),
            });
        }
        op.apply(lhs, rhs).ok_or_else(|| EvalError::Overflow {
            src: self.lexer.source(),
            bad_bit: SourceSpan::from(op_token.offset..rhs_end),
        })
    }

    fn expected_operand(&self, found: Token<'de>) -> EvalError {
        EvalError::ExpectedOperand {
            src: self.lexer.source(),
            bad_bit: span_of(&found),
            found: describe(&found),
        }
    }

    fn expected_operator(&self, found: Token<'de>) -> EvalError {
        EvalError::ExpectedOperator {
            src: self.lexer.source(),
            bad_bit: span_of(&found),
            found: describe(&found),
        }
    }
}

fn span_of(token: &Token<'_>) -> SourceSpan {
    SourceSpan::from(token.offset..token.offset + token.literal.len())
}

fn describe(token: &Token<'_>) -> String {
    match token.kind {
        TokenKind::EndOfInput => "end of input".to_string(),
        _ => format!("`{}`", token.literal),
    }
}

/// Evaluates a single line of input.
pub fn evaluate(line: &str) -> Result<Number, EvalError> {
    Evaluator::new(None, line).evaluate()
}
