//! Statement parsing implementation
//!
//! This module handles parsing of all statement types:
//!
//! - Variable declarations: `int x = 42;`
//! - Control flow: `if`, `while`, `for`, `do-while`, `switch`, C++ range-for
//! - Jump statements: `return`, `break`, `continue`
//! - Compound statements: `{ ... }`
//! - Expression statements: function calls, assignments
//!
//! # Grammar
//!
//! ```text
//! statement ::= var_decl | if_stmt | while_stmt | for_stmt
//!             | do_while_stmt | switch_stmt | return_stmt
//!             | break_stmt | continue_stmt | block | expr_stmt | ";"
//! ```

use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::parser::parse::Parser;
use crate::parser::{CompileError, Dialect};

impl Parser {
    /// Parse block statements (inside braces, excluding the braces themselves)
    pub(crate) fn parse_block_statements(&mut self) -> Result<Vec<AstNode>, CompileError> {
        let mut statements = Vec::new();

        while !self.check(&Token::RBrace(self.current_location())) && !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }

        Ok(statements)
    }

    /// Parse a statement
    pub(crate) fn parse_statement(&mut self) -> Result<AstNode, CompileError> {
        let loc = self.current_location();

        match self.peek() {
            Token::Return(_) => {
                self.advance();
                self.parse_return_statement(loc)
            }
            Token::If(_) => {
                self.advance();
                self.parse_if_statement(loc)
            }
            Token::While(_) => {
                self.advance();
                self.parse_while_statement(loc)
            }
            Token::Do(_) => {
                self.advance();
                self.parse_do_while_statement(loc)
            }
            Token::For(_) => {
                self.advance();
                self.parse_for_statement(loc)
            }
            Token::Switch(_) => {
                self.advance();
                self.parse_switch_statement(loc)
            }
            Token::Break(_) => {
                self.advance();
                self.expect_semicolon("after 'break'")?;
                Ok(AstNode::Break { location: loc })
            }
            Token::Continue(_) => {
                self.advance();
                self.expect_semicolon("after 'continue'")?;
                Ok(AstNode::Continue { location: loc })
            }
            Token::LBrace(_) => {
                self.advance();
                let statements = self.parse_block_statements()?;
                self.expect_rbrace("after block")?;
                Ok(AstNode::Block {
                    statements,
                    location: loc,
                })
            }
            Token::Semicolon(_) => {
                self.advance();
                Ok(AstNode::Empty { location: loc })
            }
            Token::Case(_) | Token::Default(_) => {
                Err(self.error("'case' label outside of a switch statement"))
            }
            Token::Else(_) => Err(self.error("'else' without a matching 'if'")),
            _ if self.is_type_start() => self.parse_declaration(),
            _ => {
                let expr = self.parse_expression()?;
                self.expect_semicolon("after expression")?;
                Ok(AstNode::ExpressionStatement {
                    expr: Box::new(expr),
                    location: loc,
                })
            }
        }
    }

    /// Body of a control statement; a braced block is flattened.
    fn parse_body(&mut self) -> Result<Vec<AstNode>, CompileError> {
        let loc = self.current_location();
        if self.match_token(&Token::LBrace(loc)) {
            let statements = self.parse_block_statements()?;
            self.expect_rbrace("after block")?;
            Ok(statements)
        } else {
            Ok(vec![self.parse_statement()?])
        }
    }

    fn parse_condition(&mut self, keyword: &str) -> Result<AstNode, CompileError> {
        self.expect_lparen(&format!("after '{keyword}'"))?;
        let condition = self.parse_expression()?;
        self.expect_rparen(&format!("after {keyword} condition"))?;
        Ok(condition)
    }

    fn parse_return_statement(&mut self, loc: SourceLocation) -> Result<AstNode, CompileError> {
        let expr = if self.check(&Token::Semicolon(loc)) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.expect_semicolon("after return statement")?;
        Ok(AstNode::Return { expr, location: loc })
    }

    fn parse_if_statement(&mut self, loc: SourceLocation) -> Result<AstNode, CompileError> {
        let condition = self.parse_condition("if")?;
        let then_branch = self.parse_body()?;
        let else_branch = if self.match_token(&Token::Else(loc)) {
            Some(self.parse_body()?)
        } else {
            None
        };

        Ok(AstNode::If {
            condition: Box::new(condition),
            then_branch,
            else_branch,
            location: loc,
        })
    }

    fn parse_while_statement(&mut self, loc: SourceLocation) -> Result<AstNode, CompileError> {
        let condition = self.parse_condition("while")?;
        let body = self.parse_body()?;
        Ok(AstNode::While {
            condition: Box::new(condition),
            body,
            location: loc,
        })
    }

    fn parse_do_while_statement(&mut self, loc: SourceLocation) -> Result<AstNode, CompileError> {
        let body = self.parse_body()?;
        self.expect_token(&Token::While(loc), "Expected 'while' after do body")?;
        let condition = self.parse_condition("while")?;
        self.expect_semicolon("after do-while")?;
        Ok(AstNode::DoWhile {
            body,
            condition: Box::new(condition),
            location: loc,
        })
    }

    fn parse_for_statement(&mut self, loc: SourceLocation) -> Result<AstNode, CompileError> {
        self.expect_lparen("after 'for'")?;

        if self.dialect == Dialect::Cpp && self.is_type_start() {
            if let Some(range_for) = self.try_parse_range_for(loc)? {
                return Ok(range_for);
            }
        }

        let init = if self.match_token(&Token::Semicolon(loc)) {
            None
        } else if self.is_type_start() {
            // parse_declaration consumes the ';'
            Some(Box::new(self.parse_declaration()?))
        } else {
            let expr = self.parse_expression()?;
            self.expect_semicolon("after for initializer")?;
            Some(Box::new(AstNode::ExpressionStatement {
                location: *expr.location(),
                expr: Box::new(expr),
            }))
        };

        let condition = if self.check(&Token::Semicolon(loc)) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.expect_semicolon("after for condition")?;

        let increment = if self.check(&Token::RParen(loc)) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.expect_rparen("after for clauses")?;

        let body = self.parse_body()?;
        Ok(AstNode::For {
            init,
            condition,
            increment,
            body,
            location: loc,
        })
    }

    /// `for (type [&]name : expr)`; restores the cursor when it is not one.
    fn try_parse_range_for(&mut self, loc: SourceLocation) -> Result<Option<AstNode>, CompileError> {
        let saved = self.position;
        let (mut var_type, _) = self.parse_type_specifier()?;
        while self.match_token(&Token::Star(loc)) {
            var_type = var_type.with_pointer();
        }
        let by_ref = self.match_token(&Token::Amp(loc));
        let name = match self.peek_token() {
            Token::Ident(name, _) if self.check_ahead(1, &Token::Colon(loc)) => name,
            _ => {
                self.position = saved;
                return Ok(None);
            }
        };
        self.advance();
        self.advance();

        let iterable = self.parse_expression()?;
        self.expect_rparen("after range-for expression")?;
        let body = self.parse_body()?;

        Ok(Some(AstNode::ForEach {
            var_type,
            name,
            by_ref,
            iterable: Box::new(iterable),
            body,
            location: loc,
        }))
    }

    fn parse_switch_statement(&mut self, loc: SourceLocation) -> Result<AstNode, CompileError> {
        let expr = self.parse_condition("switch")?;
        if !self.match_token(&Token::LBrace(loc)) {
            return Err(self.error("Expected '{' after switch expression"));
        }

        let mut cases = Vec::new();
        while !self.check(&Token::RBrace(loc)) && !self.is_at_end() {
            let case_loc = self.current_location();
            if self.match_token(&Token::Case(case_loc)) {
                let value = self.parse_ternary_expression()?;
                self.expect_token(&Token::Colon(case_loc), "Expected ':' after case value")?;
                let statements = self.parse_case_statements()?;
                cases.push(CaseNode::Case {
                    value: Box::new(value),
                    statements,
                    location: case_loc,
                });
            } else if self.match_token(&Token::Default(case_loc)) {
                self.expect_token(&Token::Colon(case_loc), "Expected ':' after 'default'")?;
                let statements = self.parse_case_statements()?;
                cases.push(CaseNode::Default {
                    statements,
                    location: case_loc,
                });
            } else {
                return Err(self.error(format!("Expected 'case' or 'default', found {}", self.peek())));
            }
        }
        self.expect_rbrace("after switch body")?;

        Ok(AstNode::Switch {
            expr: Box::new(expr),
            cases,
            location: loc,
        })
    }

    fn parse_case_statements(&mut self) -> Result<Vec<AstNode>, CompileError> {
        let mut statements = Vec::new();
        while !matches!(self.peek(), Token::Case(_) | Token::Default(_) | Token::RBrace(_) | Token::Eof(_)) {
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }
}
