//! Token definitions for the PLC language
//!
//! Keywords are not a separate token type: `LET`, `DEF`, `DO` and friends
//! are identifiers, and the parser matches them by lexeme.

use crate::error::SourceLocation;
use std::fmt;

/// A token in the PLC language
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub location: SourceLocation,
}

impl Token {
    /// Create a new token
    pub fn new(token_type: TokenType, lexeme: String, location: SourceLocation) -> Self {
        Self {
            token_type,
            lexeme,
            location,
        }
    }

    /// Character offset of the first character of the lexeme
    pub fn offset(&self) -> usize {
        self.location.offset
    }

    /// Location just past the last character of the lexeme
    pub fn end_location(&self) -> SourceLocation {
        self.location.advanced(self.lexeme.chars().count())
    }
}

/// Token types in the PLC language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Identifier,
    Integer,
    Decimal,
    Character,
    String,
    Operator,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier => write!(f, "identifier"),
            Self::Integer => write!(f, "integer"),
            Self::Decimal => write!(f, "decimal"),
            Self::Character => write!(f, "character"),
            Self::String => write!(f, "string"),
            Self::Operator => write!(f, "operator"),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.token_type, self.lexeme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_location_counts_characters() {
        let token = Token::new(
            TokenType::String,
            "\"héllo\"".to_string(),
            SourceLocation::new(4, 1, 5),
        );
        assert_eq!(token.offset(), 4);
        assert_eq!(token.end_location(), SourceLocation::new(11, 1, 12));
    }

    #[test]
    fn test_token_display() {
        let token = Token::new(TokenType::Operator, "<=".to_string(), SourceLocation::default());
        assert_eq!(token.to_string(), "operator '<='");
    }
}
