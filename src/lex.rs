use std::fmt::Display;
use std::iter::FusedIterator;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum LexError {
    #[error("Unexpected character '{token}'")]
    #[diagnostic(help("only digits, `+`, `-`, `*`, `/` and whitespace may appear in an expression"))]
    UnexpectedCharacter {
        #[source_code]
        src: NamedSource<String>,

        #[label("this character")]
        bad_bit: SourceSpan,

        token: char,
    },

    #[error("Integer literal `{literal}` is too large")]
    #[diagnostic(help("this calculator stores integers as signed 64-bit values; use a literal no larger than 9223372036854775807"))]
    IntegerTooLarge {
        #[source_code]
        src: NamedSource<String>,

        #[label("this numeric literal")]
        bad_bit: SourceSpan,

        literal: String,
    },
}

impl LexError {
    /// Byte offset of the offending input.
    pub fn position(&self) -> usize {
        match self {
            LexError::UnexpectedCharacter { bad_bit, .. }
            | LexError::IntegerTooLarge { bad_bit, .. } => bad_bit.offset(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'de> {
    pub kind: TokenKind,
    pub literal: &'de str,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Integer(i64),
    Plus,
    Minus,
    Multiply,
    Divide,
    EndOfInput,
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lit = self.literal;
        match self.kind {
            TokenKind::Integer(n) => write!(f, "INTEGER {lit} {n}"),
            TokenKind::Plus => write!(f, "PLUS {lit} null"),
            TokenKind::Minus => write!(f, "MINUS {lit} null"),
            TokenKind::Multiply => write!(f, "MULTIPLY {lit} null"),
            TokenKind::Divide => write!(f, "DIVIDE {lit} null"),
            TokenKind::EndOfInput => write!(f, "EOF {lit} null"),
        }
    }
}

/// Splits one line of input into tokens, one call at a time.
///
/// The cursor only moves forward. Once the input is exhausted every further
/// call to [`Lexer::next_token`] returns an `EndOfInput` token at the same
/// offset.
pub struct Lexer<'de> {
    filename: Option<&'de str>,
    whole: &'de str,
    rest: &'de str,
    byte: usize,
    finished: bool,
}

impl<'de> Lexer<'de> {
    pub fn new(filename: Option<&'de str>, input: &'de str) -> Self {
        Lexer {
            filename,
            whole: input,
            rest: input,
            byte: 0,
            finished: false,
        }
    }

    /// Byte offset of the cursor.
    pub fn position(&self) -> usize {
        self.byte
    }

    pub fn source(&self) -> NamedSource<String> {
        NamedSource::new(self.filename.unwrap_or("<input>"), self.whole.to_string())
    }

    pub fn next_token(&mut self) -> Result<Token<'de>, LexError> {
        // Skip whitespace
        let trimmed = self.rest.trim_start();
        self.byte += self.rest.len() - trimmed.len();
        self.rest = trimmed;

        let cur = self.rest;
        let offset = self.byte;
        let mut chars = cur.chars();
        let Some(c) = chars.next() else {
            return Ok(Token {
                kind: TokenKind::EndOfInput,
                literal: "",
                offset,
            });
        };

        let kind = match c {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Multiply,
            '/' => TokenKind::Divide,
            '0'..='9' => {
                let first_non_digit = cur
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(cur.len());
                let literal = &cur[..first_non_digit];

                let n = literal
                    .parse::<i64>()
                    .map_err(|_| LexError::IntegerTooLarge {
                        src: self.source(),
                        bad_bit: SourceSpan::from(offset..offset + literal.len()),
                        literal: literal.to_string(),
                    })?;

                self.rest = &cur[first_non_digit..];
                self.byte += first_non_digit;

                return Ok(Token {
                    kind: TokenKind::Integer(n),
                    literal,
                    offset,
                });
            }
            c => {
                return Err(LexError::UnexpectedCharacter {
                    src: self.source(),
                    bad_bit: SourceSpan::from(offset..offset + c.len_utf8()),
                    token: c,
                });
            }
        };

        self.rest = chars.as_str();
        self.byte += c.len_utf8();

        Ok(Token {
            kind,
            literal: &cur[..c.len_utf8()],
            offset,
        })
    }
}

/// Yields every token up to and including `EndOfInput`, then stops. An error
/// also ends the iteration.
impl<'de> Iterator for Lexer<'de> {
    type Item = Result<Token<'de>, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        match &token {
            Ok(Token {
                kind: TokenKind::EndOfInput,
                ..
            })
            | Err(_) => self.finished = true,
            Ok(_) => {}
        }
        Some(token)
    }
}

impl FusedIterator for Lexer<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(None, input)
            .map(|token| token.expect("valid input").kind)
            .collect()
    }

    #[test]
    fn operators_and_integers() {
        assert_eq!(
            kinds("1+2-3*4/5"),
            vec![
                TokenKind::Integer(1),
                TokenKind::Plus,
                TokenKind::Integer(2),
                TokenKind::Minus,
                TokenKind::Integer(3),
                TokenKind::Multiply,
                TokenKind::Integer(4),
                TokenKind::Divide,
                TokenKind::Integer(5),
                TokenKind::EndOfInput,
            ]
        );
    }

    #[test]
    fn multi_digit_integer_is_one_token() {
        let mut lexer = Lexer::new(None, "123+045");
        let token = lexer.next_token().unwrap();
        assert_eq!(token.kind, TokenKind::Integer(123));
        assert_eq!(token.literal, "123");
        assert_eq!(token.offset, 0);

        lexer.next_token().unwrap();
        let token = lexer.next_token().unwrap();
        assert_eq!(token.kind, TokenKind::Integer(45));
        assert_eq!(token.literal, "045");
        assert_eq!(token.offset, 4);
    }

    #[test]
    fn whitespace_is_skipped() {
        assert_eq!(kinds(" \t2 +\t 3  "), kinds("2+3"));
        assert_eq!(kinds("   "), vec![TokenKind::EndOfInput]);
        assert_eq!(kinds(""), vec![TokenKind::EndOfInput]);
    }

    #[test]
    fn end_of_input_is_idempotent() {
        let mut lexer = Lexer::new(None, "7 ");
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Integer(7));
        for _ in 0..3 {
            let token = lexer.next_token().unwrap();
            assert_eq!(token.kind, TokenKind::EndOfInput);
            assert_eq!(token.offset, 2);
        }
        assert_eq!(lexer.position(), 2);
    }

    #[test]
    fn iterator_yields_single_end_of_input() {
        let mut lexer = Lexer::new(None, "1");
        assert!(lexer.next().is_some());
        assert!(matches!(
            lexer.next(),
            Some(Ok(Token {
                kind: TokenKind::EndOfInput,
                ..
            }))
        ));
        assert!(lexer.next().is_none());
        assert!(lexer.next().is_none());
    }

    #[test]
    fn unexpected_character_reports_position() {
        let mut lexer = Lexer::new(None, "2 + a");
        lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        let err = lexer.next_token().unwrap_err();
        assert!(matches!(err, LexError::UnexpectedCharacter { token: 'a', .. }));
        assert_eq!(err.position(), 4);
        assert_eq!(err.to_string(), "Unexpected character 'a'");
    }

    #[test]
    fn iterator_stops_after_error() {
        let tokens: Vec<_> = Lexer::new(None, "1 ( 2").collect();
        assert_eq!(tokens.len(), 2);
        assert!(tokens[0].is_ok());
        assert!(tokens[1].is_err());
    }

    #[test]
    fn non_ascii_character_is_rejected() {
        let err = Lexer::new(None, "é").next_token().unwrap_err();
        assert!(matches!(err, LexError::UnexpectedCharacter { token: 'é', .. }));
        assert_eq!(err.position(), 0);
    }

    #[test]
    fn oversized_integer_is_rejected() {
        let err = Lexer::new(None, "1+99999999999999999999")
            .find_map(Result::err)
            .expect("lexing fails");
        assert!(matches!(err, LexError::IntegerTooLarge { ref literal, .. } if literal == "99999999999999999999"));
        assert_eq!(err.position(), 2);
        let help = err.help().expect("help text").to_string();
        assert!(help.contains("9223372036854775807"));
    }

    #[test]
    fn display_matches_tokenize_format() {
        let rendered: Vec<String> = Lexer::new(None, "12 * 3")
            .map(|token| token.unwrap().to_string())
            .collect();
        assert_eq!(
            rendered,
            vec!["INTEGER 12 12", "MULTIPLY * null", "INTEGER 3 3", "EOF  null"]
        );
    }
}
