//! Recursive-descent parser for trigger conditions.
//!
//! Grammar (NOT binds tighter than AND, which binds tighter than OR):
//!
//! ```text
//! or      := and ( OR and )*
//! and     := unary ( AND unary )*
//! unary   := NOT unary | primary
//! primary := IDENT | "(" or ")"
//! ```

use std::collections::BTreeSet;

use crate::error::{ParseError, ParseErrorKind};

use super::expression::TriggerExpression;
use super::lexer::{tokenize, Token, TokenKind};

/// Maximum nesting of parentheses and NOT operators.
pub const MAX_NESTING_DEPTH: usize = 128;

/// Parses a trigger condition without checking query names.
pub fn parse(source: &str) -> Result<TriggerExpression, ParseError> {
    ExpressionParser::new().parse(source)
}

/// Trigger condition parser.
///
/// When declared queries are configured, references to any other name fail
/// with [`ParseErrorKind::UnknownQuery`].
#[derive(Debug, Clone, Default)]
pub struct ExpressionParser {
    declared: Option<BTreeSet<String>>,
}

impl ExpressionParser {
    /// Creates a parser that accepts any query name.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts query references to `names`.
    #[must_use]
    pub fn with_declared_queries<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declared = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Parses `source` into an expression tree.
    pub fn parse(&self, source: &str) -> Result<TriggerExpression, ParseError> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(ParseError::new(ParseErrorKind::EmptyExpression, 0));
        }

        let mut state = ParserState {
            tokens: &tokens,
            pos: 0,
            end: source.len(),
            depth: 0,
            declared: self.declared.as_ref(),
        };

        let expr = state.parse_or()?;

        if let Some(token) = state.peek() {
            let kind = if token.kind == TokenKind::RParen {
                ParseErrorKind::UnbalancedParens
            } else {
                ParseErrorKind::UnexpectedToken {
                    found: token.kind.to_string(),
                }
            };
            return Err(ParseError::new(kind, token.position));
        }

        Ok(expr)
    }
}

struct ParserState<'a> {
    tokens: &'a [Token],
    pos: usize,
    end: usize,
    depth: usize,
    declared: Option<&'a BTreeSet<String>>,
}

impl<'a> ParserState<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().is_some_and(|t| &t.kind == kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn enter(&mut self, position: usize) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(ParseError::new(
                ParseErrorKind::NestingTooDeep {
                    max_depth: MAX_NESTING_DEPTH,
                },
                position,
            ));
        }
        Ok(())
    }

    fn parse_or(&mut self) -> Result<TriggerExpression, ParseError> {
        let mut operands = vec![self.parse_and()?];
        while self.eat(&TokenKind::Or) {
            operands.push(self.parse_and()?);
        }
        Ok(TriggerExpression::or(operands))
    }

    fn parse_and(&mut self) -> Result<TriggerExpression, ParseError> {
        let mut operands = vec![self.parse_unary()?];
        while self.eat(&TokenKind::And) {
            operands.push(self.parse_unary()?);
        }
        Ok(TriggerExpression::and(operands))
    }

    fn parse_unary(&mut self) -> Result<TriggerExpression, ParseError> {
        if let Some(token) = self.peek() {
            if token.kind == TokenKind::Not {
                self.pos += 1;
                self.enter(token.position)?;
                let operand = self.parse_unary()?;
                self.depth -= 1;
                return Ok(TriggerExpression::not(operand));
            }
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<TriggerExpression, ParseError> {
        let Some(token) = self.next() else {
            return Err(ParseError::new(ParseErrorKind::UnexpectedEnd, self.end));
        };

        match &token.kind {
            TokenKind::Ident(name) => {
                if let Some(declared) = self.declared {
                    if !declared.contains(name) {
                        return Err(ParseError::new(
                            ParseErrorKind::UnknownQuery { name: name.clone() },
                            token.position,
                        ));
                    }
                }
                Ok(TriggerExpression::query(name.clone()))
            }
            TokenKind::LParen => {
                self.enter(token.position)?;
                let inner = self.parse_or()?;
                match self.next() {
                    Some(close) if close.kind == TokenKind::RParen => {
                        self.depth -= 1;
                        Ok(inner)
                    }
                    Some(other) => Err(ParseError::new(
                        ParseErrorKind::UnexpectedToken {
                            found: other.kind.to_string(),
                        },
                        other.position,
                    )),
                    None => Err(ParseError::new(ParseErrorKind::UnbalancedParens, token.position)),
                }
            }
            TokenKind::RParen if self.depth == 0 => {
                Err(ParseError::new(ParseErrorKind::UnbalancedParens, token.position))
            }
            other => Err(ParseError::new(
                ParseErrorKind::UnexpectedToken {
                    found: other.to_string(),
                },
                token.position,
            )),
        }
    }
}
