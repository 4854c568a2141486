//! Lexer/Scanner implementation for the PLC language
//!
//! This module implements lexical analysis, converting source code into tokens.
//! Every decision is made with `peek`/`match_all` over a run of character
//! patterns: a run either matches at consecutive positions and (for
//! `match_all`) is consumed as a whole, or nothing is consumed.

use log::debug;

use super::token::{Token, TokenType};
use crate::error::{LexErrorKind, PlcError, PlcResult, SourceLocation};

/// A single-character class test
type Pattern = fn(char) -> bool;

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\u{8}' | '\n' | '\r' | '\t')
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_part(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

fn is_sign(c: char) -> bool {
    c == '+' || c == '-'
}

fn is_dot(c: char) -> bool {
    c == '.'
}

fn is_quote(c: char) -> bool {
    c == '\''
}

fn is_double_quote(c: char) -> bool {
    c == '"'
}

fn is_backslash(c: char) -> bool {
    c == '\\'
}

fn is_character_body(c: char) -> bool {
    !matches!(c, '\'' | '\n' | '\r' | '\\')
}

fn is_character_escape(c: char) -> bool {
    matches!(c, 'b' | 'n' | 'r' | 't')
}

fn is_string_body(c: char) -> bool {
    !matches!(c, '"' | '\n' | '\r' | '\\')
}

fn is_string_escape(c: char) -> bool {
    matches!(c, 'b' | 'n' | 'r' | 't' | '\'' | '"' | '\\')
}

fn is_comparison_start(c: char) -> bool {
    matches!(c, '<' | '>' | '!' | '=')
}

fn is_equals(c: char) -> bool {
    c == '='
}

/// Lexer for PLC source code
pub struct Lexer {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: usize,
    column: usize,
    start_location: SourceLocation,
}

impl Lexer {
    /// Create a new lexer
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
            column: 1,
            start_location: SourceLocation::new(0, 1, 1),
        }
    }

    /// Tokenize the source code
    pub fn tokenize(&mut self) -> PlcResult<Vec<Token>> {
        while !self.is_at_end() {
            if self.match_all(&[is_whitespace]) {
                continue;
            }

            self.start = self.current;
            self.start_location = self.current_location();
            self.scan_token()?;
        }

        debug!("lexed {} tokens", self.tokens.len());
        Ok(std::mem::take(&mut self.tokens))
    }

    /// Scan a single token, dispatching on look-ahead only
    fn scan_token(&mut self) -> PlcResult<()> {
        if self.peek(&[is_identifier_start]) {
            self.scan_identifier()
        } else if self.peek(&[is_digit]) || self.peek(&[is_sign, is_digit]) {
            self.scan_number()
        } else if self.peek(&[is_quote]) {
            self.scan_character()
        } else if self.peek(&[is_double_quote]) {
            self.scan_string()
        } else {
            self.scan_operator()
        }
    }

    /// Scan an identifier; keywords are identifiers too
    fn scan_identifier(&mut self) -> PlcResult<()> {
        self.advance();
        while self.match_all(&[is_identifier_part]) {}
        self.add_token(TokenType::Identifier)
    }

    /// Scan a number literal (integer or decimal)
    fn scan_number(&mut self) -> PlcResult<()> {
        self.match_all(&[is_sign]);

        let mut is_decimal = false;
        loop {
            if self.match_all(&[is_digit]) {
                continue;
            }
            // A second '.' ends the number in front of it
            if !is_decimal && self.match_all(&[is_dot, is_digit]) {
                is_decimal = true;
                continue;
            }
            break;
        }

        if is_decimal {
            self.add_token(TokenType::Decimal)
        } else {
            self.add_token(TokenType::Integer)
        }
    }

    /// Scan a character literal
    fn scan_character(&mut self) -> PlcResult<()> {
        self.advance(); // opening quote

        if self.peek(&[is_quote]) {
            return Err(self.error(
                LexErrorKind::EmptyCharacterLiteral,
                "Empty character literal",
            ));
        }

        if self.match_all(&[is_character_body, is_quote])
            || self.match_all(&[is_backslash, is_character_escape, is_quote])
        {
            return self.add_token(TokenType::Character);
        }

        Err(self.error(
            LexErrorKind::InvalidCharacterLiteral,
            "Invalid character literal",
        ))
    }

    /// Scan a string literal; escapes stay in the lexeme
    fn scan_string(&mut self) -> PlcResult<()> {
        self.advance(); // opening quote

        loop {
            if self.match_all(&[is_double_quote]) {
                return self.add_token(TokenType::String);
            }

            if self.match_all(&[is_string_body]) || self.match_all(&[is_backslash, is_string_escape]) {
                continue;
            }

            if self.peek(&[is_backslash]) && self.current + 1 < self.source.len() {
                self.advance();
                return Err(self.error(
                    LexErrorKind::InvalidEscape,
                    format!("Invalid escape sequence '\\{}'", self.source[self.current]),
                ));
            }

            return Err(self.error(LexErrorKind::UnterminatedString, "Unterminated string"));
        }
    }

    /// Scan an operator: two-character comparisons first, else any single character
    fn scan_operator(&mut self) -> PlcResult<()> {
        if !self.match_all(&[is_comparison_start, is_equals]) {
            self.advance();
        }
        self.add_token(TokenType::Operator)
    }

    /// Add a token spanning `start..current` to the token list
    fn add_token(&mut self, token_type: TokenType) -> PlcResult<()> {
        let lexeme: String = self.source[self.start..self.current].iter().collect();
        self.tokens
            .push(Token::new(token_type, lexeme, self.start_location));
        Ok(())
    }

    /// True if the characters at consecutive look-ahead positions satisfy
    /// `patterns` in order. Never consumes.
    fn peek(&self, patterns: &[Pattern]) -> bool {
        patterns.iter().enumerate().all(|(i, pattern)| {
            self.source
                .get(self.current + i)
                .is_some_and(|&c| pattern(c))
        })
    }

    /// Like `peek`, but consumes every matched character on success
    fn match_all(&mut self, patterns: &[Pattern]) -> bool {
        let matched = self.peek(patterns);
        if matched {
            for _ in patterns {
                self.advance();
            }
        }
        matched
    }

    /// Advance to the next character, tracking line and column
    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    /// Check if we've reached the end of the source
    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    /// Get the current source location
    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.current, self.line, self.column)
    }

    /// Create an error at the current location
    fn error(&self, kind: LexErrorKind, message: impl Into<String>) -> PlcError {
        PlcError::lex_error(kind, message, self.current_location())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tokenize_source(source: &str) -> PlcResult<Vec<Token>> {
        Lexer::new(source).tokenize()
    }

    fn kinds_and_lexemes(source: &str) -> Vec<(TokenType, String)> {
        tokenize_source(source)
            .unwrap()
            .into_iter()
            .map(|t| (t.token_type, t.lexeme))
            .collect()
    }

    fn lex_error_kind(source: &str) -> (LexErrorKind, usize) {
        match tokenize_source(source) {
            Err(PlcError::LexError { kind, location, .. }) => (kind, location.offset),
            other => panic!("expected lex error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_source() {
        assert!(tokenize_source("").unwrap().is_empty());
        assert!(tokenize_source(" \t\r\n\u{8}").unwrap().is_empty());
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(
            kinds_and_lexemes("getName _private a-b-c thelegend27"),
            vec![
                (TokenType::Identifier, "getName".to_string()),
                (TokenType::Identifier, "_private".to_string()),
                (TokenType::Identifier, "a-b-c".to_string()),
                (TokenType::Identifier, "thelegend27".to_string()),
            ]
        );
    }

    #[test]
    fn test_identifier_cannot_start_with_hyphen_or_digit() {
        let tokens = kinds_and_lexemes("1fish");
        assert_eq!(tokens[0], (TokenType::Integer, "1".to_string()));
        assert_eq!(tokens[1], (TokenType::Identifier, "fish".to_string()));

        let tokens = kinds_and_lexemes("-five");
        assert_eq!(tokens[0], (TokenType::Operator, "-".to_string()));
        assert_eq!(tokens[1], (TokenType::Identifier, "five".to_string()));
    }

    #[test]
    fn test_integer_literals() {
        assert_eq!(
            kinds_and_lexemes("0 42 +7 -12 007"),
            vec![
                (TokenType::Integer, "0".to_string()),
                (TokenType::Integer, "42".to_string()),
                (TokenType::Integer, "+7".to_string()),
                (TokenType::Integer, "-12".to_string()),
                (TokenType::Integer, "007".to_string()),
            ]
        );
    }

    #[test]
    fn test_decimal_literals() {
        assert_eq!(
            kinds_and_lexemes("3.14 -0.5"),
            vec![
                (TokenType::Decimal, "3.14".to_string()),
                (TokenType::Decimal, "-0.5".to_string()),
            ]
        );
    }

    #[test]
    fn test_trailing_dot_is_not_part_of_number() {
        assert_eq!(
            kinds_and_lexemes("1."),
            vec![
                (TokenType::Integer, "1".to_string()),
                (TokenType::Operator, ".".to_string()),
            ]
        );
    }

    #[test]
    fn test_second_dot_terminates_decimal() {
        assert_eq!(
            kinds_and_lexemes("1.2.3"),
            vec![
                (TokenType::Decimal, "1.2".to_string()),
                (TokenType::Operator, ".".to_string()),
                (TokenType::Integer, "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_character_literals() {
        assert_eq!(
            kinds_and_lexemes(r"'c' '\n' ' '"),
            vec![
                (TokenType::Character, "'c'".to_string()),
                (TokenType::Character, r"'\n'".to_string()),
                (TokenType::Character, "' '".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_character_literal() {
        assert_eq!(lex_error_kind("''"), (LexErrorKind::EmptyCharacterLiteral, 1));
    }

    #[test]
    fn test_invalid_character_literals() {
        assert_eq!(lex_error_kind("'ab'").0, LexErrorKind::InvalidCharacterLiteral);
        assert_eq!(lex_error_kind("'a").0, LexErrorKind::InvalidCharacterLiteral);
        assert_eq!(lex_error_kind(r"'\q'").0, LexErrorKind::InvalidCharacterLiteral);
        assert_eq!(lex_error_kind("'\n'").0, LexErrorKind::InvalidCharacterLiteral);
    }

    #[test]
    fn test_string_literals() {
        assert_eq!(
            kinds_and_lexemes(r#""" "abc" "Hello,\nWorld!" "a\"b\\c""#),
            vec![
                (TokenType::String, r#""""#.to_string()),
                (TokenType::String, r#""abc""#.to_string()),
                (TokenType::String, r#""Hello,\nWorld!""#.to_string()),
                (TokenType::String, r#""a\"b\\c""#.to_string()),
            ]
        );
    }

    #[test]
    fn test_invalid_escape() {
        assert_eq!(lex_error_kind(r#""invalid\escape""#), (LexErrorKind::InvalidEscape, 9));
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(lex_error_kind("\"unterminated").0, LexErrorKind::UnterminatedString);
        assert_eq!(lex_error_kind("\"new\nline\"").0, LexErrorKind::UnterminatedString);
        assert_eq!(lex_error_kind("\"trailing\\").0, LexErrorKind::UnterminatedString);
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds_and_lexemes("<= >= == != < > = ! ( ) ; . , : $"),
            ["<=", ">=", "==", "!=", "<", ">", "=", "!", "(", ")", ";", ".", ",", ":", "$"]
                .iter()
                .map(|op| (TokenType::Operator, op.to_string()))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_comparison_prefers_two_characters() {
        assert_eq!(
            kinds_and_lexemes("===="),
            vec![
                (TokenType::Operator, "==".to_string()),
                (TokenType::Operator, "==".to_string()),
            ]
        );
    }

    #[test]
    fn test_field_declaration_offsets() {
        let tokens = tokenize_source("LET x: Integer = 5;").unwrap();
        let offsets: Vec<usize> = tokens.iter().map(Token::offset).collect();
        assert_eq!(offsets, vec![0, 4, 5, 7, 15, 17, 18]);
    }

    #[test]
    fn test_source_location() {
        let tokens = tokenize_source("LET\n  x").unwrap();
        assert_eq!(tokens[0].location, SourceLocation::new(0, 1, 1));
        assert_eq!(tokens[1].location, SourceLocation::new(6, 2, 3));
    }
}
