//! Parser implementation
//!
//! Recursive descent over the token list with a fixed precedence ladder:
//! logical < equality < additive < multiplicative < secondary < primary.
//! The first grammar violation aborts the parse.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use log::debug;
use num_bigint::BigInt;

use super::ast::*;
use crate::error::{PlcError, PlcResult};
use crate::lexer::{Token, TokenType};

/// Parser for PLC source code
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    /// Create a new parser from tokens
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0 }
    }

    /// Parse tokens into a `Source`: `field* method*`
    pub fn parse(&mut self) -> PlcResult<Source> {
        let mut fields = Vec::new();
        let mut methods = Vec::new();

        while self.check("LET") {
            fields.push(self.field()?);
        }

        while self.check("DEF") {
            methods.push(self.method()?);
        }

        if !self.is_at_end() {
            return Err(self.error("Expected 'DEF' or end of input"));
        }

        debug!("parsed {} fields and {} methods", fields.len(), methods.len());
        Ok(Source { fields, methods })
    }

    // ===== Declarations =====

    fn field(&mut self) -> PlcResult<Field> {
        let location = self.consume("LET", "Expected 'LET'")?.location;
        let name = self.consume_identifier("Expected field name")?;
        self.consume(":", "Expected ':' after field name")?;
        let type_name = self.consume_identifier("Expected field type")?;

        let value = if self.match_lexeme("=") {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(";", "Expected ';' after field")?;

        Ok(Field {
            name,
            type_name,
            value,
            variable: None,
            location,
        })
    }

    fn method(&mut self) -> PlcResult<Method> {
        let location = self.consume("DEF", "Expected 'DEF'")?.location;
        let name = self.consume_identifier("Expected method name")?;
        self.consume("(", "Expected '(' after method name")?;

        let mut parameters = Vec::new();
        let mut parameter_type_names = Vec::new();
        if !self.check(")") {
            loop {
                parameters.push(self.consume_identifier("Expected parameter name")?);
                self.consume(":", "Expected ':' after parameter name")?;
                parameter_type_names.push(self.consume_identifier("Expected parameter type")?);

                if !self.match_lexeme(",") {
                    break;
                }
            }
        }
        self.consume(")", "Expected ')' after parameters")?;

        let return_type_name = if self.match_lexeme(":") {
            Some(self.consume_identifier("Expected return type")?)
        } else {
            None
        };

        self.consume("DO", "Expected 'DO' before method body")?;
        let statements = self.block(&["END"])?;
        self.consume("END", "Expected 'END' after method body")?;

        Ok(Method {
            name,
            parameters,
            parameter_type_names,
            return_type_name,
            statements,
            function: None,
            location,
        })
    }

    // ===== Statements =====

    fn statement(&mut self) -> PlcResult<Stmt> {
        if self.check("LET") {
            self.declaration_statement()
        } else if self.check("IF") {
            self.if_statement()
        } else if self.check("FOR") {
            self.for_statement()
        } else if self.check("WHILE") {
            self.while_statement()
        } else if self.check("RETURN") {
            self.return_statement()
        } else {
            self.expression_statement()
        }
    }

    fn declaration_statement(&mut self) -> PlcResult<Stmt> {
        let location = self.consume("LET", "Expected 'LET'")?.location;
        let name = self.consume_identifier("Expected variable name")?;

        let type_name = if self.match_lexeme(":") {
            Some(self.consume_identifier("Expected variable type")?)
        } else {
            None
        };

        let value = if self.match_lexeme("=") {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(";", "Expected ';' after declaration")?;

        Ok(Stmt::Declaration {
            name,
            type_name,
            value,
            variable: None,
            location,
        })
    }

    fn if_statement(&mut self) -> PlcResult<Stmt> {
        let location = self.consume("IF", "Expected 'IF'")?.location;
        let condition = self.expression()?;
        self.consume("DO", "Expected 'DO' after if condition")?;

        let then_statements = self.block(&["ELSE", "END"])?;
        let else_statements = if self.match_lexeme("ELSE") {
            self.block(&["END"])?
        } else {
            Vec::new()
        };

        self.consume("END", "Expected 'END' after if statement")?;

        Ok(Stmt::If {
            condition,
            then_statements,
            else_statements,
            location,
        })
    }

    fn for_statement(&mut self) -> PlcResult<Stmt> {
        let location = self.consume("FOR", "Expected 'FOR'")?.location;
        let name = self.consume_identifier("Expected loop variable name")?;
        self.consume("IN", "Expected 'IN' after loop variable")?;
        let value = self.expression()?;
        self.consume("DO", "Expected 'DO' after for iterable")?;
        let statements = self.block(&["END"])?;
        self.consume("END", "Expected 'END' after for body")?;

        Ok(Stmt::For {
            name,
            value,
            statements,
            location,
        })
    }

    fn while_statement(&mut self) -> PlcResult<Stmt> {
        let location = self.consume("WHILE", "Expected 'WHILE'")?.location;
        let condition = self.expression()?;
        self.consume("DO", "Expected 'DO' after while condition")?;
        let statements = self.block(&["END"])?;
        self.consume("END", "Expected 'END' after while body")?;

        Ok(Stmt::While {
            condition,
            statements,
            location,
        })
    }

    fn return_statement(&mut self) -> PlcResult<Stmt> {
        let location = self.consume("RETURN", "Expected 'RETURN'")?.location;
        let value = self.expression()?;
        self.consume(";", "Expected ';' after return value")?;

        Ok(Stmt::Return { value, location })
    }

    /// Expression statement, rewritten to an assignment when followed by '='
    fn expression_statement(&mut self) -> PlcResult<Stmt> {
        let expr = self.expression()?;
        let location = expr.location();

        let stmt = if self.match_lexeme("=") {
            let value = self.expression()?;
            Stmt::Assignment {
                receiver: expr,
                value,
                location,
            }
        } else {
            Stmt::Expression { expr, location }
        };

        self.consume(";", "Expected ';' after statement")?;
        Ok(stmt)
    }

    /// Statements up to (not including) one of `terminators`
    fn block(&mut self, terminators: &[&str]) -> PlcResult<Vec<Stmt>> {
        let mut statements = Vec::new();

        while !self.is_at_end() && !terminators.iter().any(|t| self.check(t)) {
            statements.push(self.statement()?);
        }

        Ok(statements)
    }

    // ===== Expressions =====

    pub fn expression(&mut self) -> PlcResult<Expr> {
        self.logical()
    }

    fn logical(&mut self) -> PlcResult<Expr> {
        self.binary_level(&["AND", "OR"], Self::equality)
    }

    fn equality(&mut self) -> PlcResult<Expr> {
        self.binary_level(&["<", "<=", ">", ">=", "==", "!="], Self::additive)
    }

    fn additive(&mut self) -> PlcResult<Expr> {
        self.binary_level(&["+", "-"], Self::multiplicative)
    }

    fn multiplicative(&mut self) -> PlcResult<Expr> {
        self.binary_level(&["*", "/"], Self::secondary)
    }

    /// One left-associative precedence level
    fn binary_level(
        &mut self,
        operators: &[&str],
        operand: fn(&mut Self) -> PlcResult<Expr>,
    ) -> PlcResult<Expr> {
        let mut expr = operand(self)?;

        while let Some(operator) = self.match_operator(operators) {
            let location = self.previous().location;
            let right = operand(self)?;
            expr = Expr::binary(operator, expr, right, location);
        }

        Ok(expr)
    }

    /// Chain of `.name` accesses and `.name(args)` calls, threaded left to right
    fn secondary(&mut self) -> PlcResult<Expr> {
        let mut expr = self.primary()?;

        while self.match_lexeme(".") {
            let name = self.consume_identifier("Expected identifier after '.'")?;
            let location = self.previous().location;

            expr = if self.match_lexeme("(") {
                let arguments = self.arguments()?;
                Expr::function(Some(expr), name, arguments, location)
            } else {
                Expr::access(Some(expr), name, location)
            };
        }

        Ok(expr)
    }

    fn primary(&mut self) -> PlcResult<Expr> {
        let token = match self.peek() {
            Some(token) => token.clone(),
            None => return Err(self.error("Expected expression")),
        };
        let location = token.location;

        match token.token_type {
            TokenType::Identifier => {
                self.advance();
                match token.lexeme.as_str() {
                    "TRUE" => Ok(Expr::literal(Literal::Boolean(true), location)),
                    "FALSE" => Ok(Expr::literal(Literal::Boolean(false), location)),
                    "NIL" => Ok(Expr::literal(Literal::Nil, location)),
                    _ => {
                        if self.match_lexeme("(") {
                            let arguments = self.arguments()?;
                            Ok(Expr::function(None, token.lexeme, arguments, location))
                        } else {
                            Ok(Expr::access(None, token.lexeme, location))
                        }
                    }
                }
            }

            TokenType::Integer => {
                self.advance();
                let value = BigInt::from_str(token.lexeme.trim_start_matches('+')).map_err(|_| {
                    PlcError::parse_error(format!("Invalid integer literal '{}'", token.lexeme), location)
                })?;
                Ok(Expr::literal(Literal::Integer(value), location))
            }

            TokenType::Decimal => {
                self.advance();
                let value = BigDecimal::from_str(token.lexeme.trim_start_matches('+')).map_err(|_| {
                    PlcError::parse_error(format!("Invalid decimal literal '{}'", token.lexeme), location)
                })?;
                Ok(Expr::literal(Literal::Decimal(value), location))
            }

            TokenType::Character => {
                self.advance();
                let value = unescape(strip_delimiters(&token.lexeme));
                let mut chars = value.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Expr::literal(Literal::Character(c), location)),
                    _ => Err(PlcError::parse_error(
                        format!("Invalid character literal {}", token.lexeme),
                        location,
                    )),
                }
            }

            TokenType::String => {
                self.advance();
                let value = unescape(strip_delimiters(&token.lexeme));
                Ok(Expr::literal(Literal::String(value), location))
            }

            TokenType::Operator if token.lexeme == "(" => {
                self.advance();
                let expr = self.expression()?;
                self.consume(")", "Expected ')' after expression")?;
                Ok(Expr::group(expr, location))
            }

            TokenType::Operator => Err(self.error("Expected expression")),
        }
    }

    /// Argument list after an opening '('
    fn arguments(&mut self) -> PlcResult<Vec<Expr>> {
        let mut arguments = Vec::new();

        if !self.check(")") {
            loop {
                arguments.push(self.expression()?);
                if !self.match_lexeme(",") {
                    break;
                }
            }
        }

        self.consume(")", "Expected ')' after arguments")?;
        Ok(arguments)
    }

    // ===== Helper Methods =====

    fn match_lexeme(&mut self, lexeme: &str) -> bool {
        if self.check(lexeme) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_operator(&mut self, operators: &[&str]) -> Option<BinaryOp> {
        let lexeme = operators.iter().find(|op| self.check(op))?;
        self.advance();
        BinaryOp::from_lexeme(lexeme)
    }

    fn check(&self, lexeme: &str) -> bool {
        self.peek().is_some_and(|token| token.lexeme == lexeme)
    }

    fn check_type(&self, token_type: TokenType) -> bool {
        self.peek().is_some_and(|token| token.token_type == token_type)
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current)
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn consume(&mut self, lexeme: &str, message: &str) -> PlcResult<&Token> {
        if self.check(lexeme) {
            Ok(self.advance())
        } else {
            Err(self.error(message))
        }
    }

    fn consume_identifier(&mut self, message: &str) -> PlcResult<String> {
        if self.check_type(TokenType::Identifier) {
            Ok(self.advance().lexeme.clone())
        } else {
            Err(self.error(message))
        }
    }

    /// Error at the next token, or just past the last one at end of input
    fn error(&self, message: &str) -> PlcError {
        let location = match self.peek() {
            Some(token) => token.location,
            None => self
                .tokens
                .last()
                .map(Token::end_location)
                .unwrap_or_default(),
        };
        PlcError::parse_error(message, location)
    }
}

fn strip_delimiters(lexeme: &str) -> &str {
    let mut chars = lexeme.chars();
    chars.next();
    chars.next_back();
    chars.as_str()
}

/// Replace backslash escapes with the characters they denote
fn unescape(body: &str) -> String {
    let mut value = String::with_capacity(body.len());
    let mut chars = body.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            value.push(c);
            continue;
        }
        match chars.next() {
            Some('b') => value.push('\u{8}'),
            Some('n') => value.push('\n'),
            Some('r') => value.push('\r'),
            Some('t') => value.push('\t'),
            Some('f') => value.push('\u{c}'),
            Some(other) => value.push(other),
            None => value.push('\\'),
        }
    }

    value
}
