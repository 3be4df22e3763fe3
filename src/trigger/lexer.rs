//! Tokenizer for trigger conditions.

use std::fmt;

use crate::error::{ParseError, ParseErrorKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Ident(String),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(name) => write!(f, "{name}"),
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
            Self::Not => write!(f, "NOT"),
            Self::LParen => write!(f, "("),
            Self::RParen => write!(f, ")"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character.
    pub position: usize,
}

impl Token {
    const fn new(kind: TokenKind, position: usize) -> Self {
        Self { kind, position }
    }
}

const fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn keyword(word: &str) -> Option<TokenKind> {
    if word.eq_ignore_ascii_case("and") {
        Some(TokenKind::And)
    } else if word.eq_ignore_ascii_case("or") {
        Some(TokenKind::Or)
    } else if word.eq_ignore_ascii_case("not") {
        Some(TokenKind::Not)
    } else {
        None
    }
}

/// Whether `name` lexes as a single query identifier.
pub(crate) fn is_query_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_ident_char) && keyword(name).is_none()
}

/// Split `source` into tokens.
///
/// Keywords are case-insensitive. `&&`, `||` and `!` are accepted as
/// aliases for AND, OR and NOT.
pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::new(TokenKind::LParen, pos));
            }
            ')' => {
                chars.next();
                tokens.push(Token::new(TokenKind::RParen, pos));
            }
            '!' => {
                chars.next();
                tokens.push(Token::new(TokenKind::Not, pos));
            }
            '&' | '|' => {
                chars.next();
                match chars.next() {
                    Some((_, next)) if next == c => {
                        let kind = if c == '&' { TokenKind::And } else { TokenKind::Or };
                        tokens.push(Token::new(kind, pos));
                    }
                    _ => {
                        return Err(ParseError::new(
                            ParseErrorKind::InvalidCharacter { found: c },
                            pos,
                        ));
                    }
                }
            }
            c if is_ident_char(c) => {
                let mut end = pos;
                while let Some(&(i, next)) = chars.peek() {
                    if !is_ident_char(next) {
                        break;
                    }
                    end = i + next.len_utf8();
                    chars.next();
                }
                let word = &source[pos..end];
                let kind = keyword(word).unwrap_or_else(|| TokenKind::Ident(word.to_string()));
                tokens.push(Token::new(kind, pos));
            }
            other => {
                return Err(ParseError::new(
                    ParseErrorKind::InvalidCharacter { found: other },
                    pos,
                ));
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_query_name_rules() {
        assert!(is_query_name("cpu_high"));
        assert!(is_query_name("q1"));
        assert!(!is_query_name(""));
        assert!(!is_query_name("a b"));
        assert!(!is_query_name("Not"));
        assert!(!is_query_name("a-b"));
    }

    #[test]
    fn test_tokenize_words_and_parens() {
        assert_eq!(
            kinds("(q1 AND q_2) or NOT q3"),
            vec![
                TokenKind::LParen,
                TokenKind::Ident("q1".to_string()),
                TokenKind::And,
                TokenKind::Ident("q_2".to_string()),
                TokenKind::RParen,
                TokenKind::Or,
                TokenKind::Not,
                TokenKind::Ident("q3".to_string()),
            ]
        );
    }

    #[test]
    fn test_tokenize_symbolic_aliases() {
        assert_eq!(
            kinds("a&&b||!c"),
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::And,
                TokenKind::Ident("b".to_string()),
                TokenKind::Or,
                TokenKind::Not,
                TokenKind::Ident("c".to_string()),
            ]
        );
    }

    #[test]
    fn test_tokenize_positions() {
        let tokens = tokenize("  a  OR b").unwrap();
        let positions: Vec<usize> = tokens.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![2, 5, 8]);
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        assert_eq!(kinds("android"), vec![TokenKind::Ident("android".to_string())]);
    }

    #[test]
    fn test_single_ampersand_is_invalid() {
        let err = tokenize("a & b").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidCharacter { found: '&' });
        assert_eq!(err.position, 2);
    }

    #[test]
    fn test_invalid_character() {
        let err = tokenize("a AND b.c").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidCharacter { found: '.' });
        assert_eq!(err.position, 7);
    }
}
