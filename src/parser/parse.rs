//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing infrastructure:
//! helper methods, type-specifier recognition and the program entry point.
//!
//! # Parser Architecture
//!
//! The Parser uses a recursive descent approach with the following organization:
//! - This module: Parser struct, helper methods, and coordination
//! - `declarations`: functions, prototypes, variables and type specifiers
//! - `statements`: statements (if, while, for, switch, ...)
//! - `expressions`: expressions with one method per precedence level
//!
//! Parser methods are split across multiple files using `impl Parser` blocks.

use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::parser::{CompileError, Dialect};

/// Words that start a type specifier in both dialects.
const TYPE_WORDS: &[&str] = &[
    "void", "bool", "_Bool", "char", "short", "int", "long", "float", "double", "signed",
    "unsigned", "const", "static", "volatile", "register", "extern", "inline", "FILE", "size_t",
    "ssize_t", "ptrdiff_t", "time_t", "clock_t", "int8_t", "int16_t", "int32_t", "int64_t",
    "uint8_t", "uint16_t", "uint32_t", "uint64_t", "intptr_t", "uintptr_t",
];

/// Additional type words in C++.
const CPP_TYPE_WORDS: &[&str] = &["string", "auto", "constexpr"];

/// Recursive descent parser for the C/C++ subset
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
    pub(crate) dialect: Dialect,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>, dialect: Dialect) -> Self {
        if !matches!(tokens.last(), Some(Token::Eof(_))) {
            let loc = tokens.last().map(Token::location).unwrap_or_default();
            tokens.push(Token::Eof(loc));
        }
        Self {
            tokens,
            position: 0,
            dialect,
        }
    }

    /// Parse the entire program (top-level declarations)
    pub fn parse_program(&mut self) -> Result<Program, CompileError> {
        let mut program = Program::new();

        while !self.is_at_end() {
            if self.match_token(&Token::Semicolon(self.current_location())) {
                continue;
            }
            let decl = self.parse_top_level_declaration()?;
            program.nodes.push(decl);
        }

        Ok(program)
    }

    // ===== Helper methods =====

    /// The token at `offset` starts a type specifier.
    pub(crate) fn is_type_word_at(&self, offset: usize) -> bool {
        match self.peek_ahead(offset) {
            Some(Token::Ident(name, _)) => {
                TYPE_WORDS.contains(&name.as_str())
                    || (self.dialect == Dialect::Cpp && CPP_TYPE_WORDS.contains(&name.as_str()))
            }
            _ => false,
        }
    }

    pub(crate) fn is_type_start(&self) -> bool {
        self.is_type_word_at(0)
    }

    pub(crate) fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn match_ident(&mut self, name: &str) -> bool {
        if self.peek().is_ident(name) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    pub(crate) fn check_ahead(&self, n: usize, token: &Token) -> bool {
        self.peek_ahead(n)
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(token))
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.previous()
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof(_))
    }

    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.position]
    }

    pub(crate) fn peek_token(&self) -> Token {
        self.tokens[self.position].clone()
    }

    pub(crate) fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.position.saturating_sub(1)]
    }

    pub(crate) fn previous_location(&self) -> SourceLocation {
        self.previous().location()
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.peek().location()
    }

    pub(crate) fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::new(message, self.current_location())
    }

    pub(crate) fn expect_token(&mut self, token: &Token, message: &str) -> Result<(), CompileError> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("{}, found {}", message, self.peek())))
        }
    }

    pub(crate) fn expect_lparen(&mut self, ctx: &str) -> Result<(), CompileError> {
        self.expect_token(&Token::LParen(self.current_location()), &format!("Expected '(' {ctx}"))
    }

    pub(crate) fn expect_rparen(&mut self, ctx: &str) -> Result<(), CompileError> {
        self.expect_token(&Token::RParen(self.current_location()), &format!("Expected ')' {ctx}"))
    }

    pub(crate) fn expect_rbrace(&mut self, ctx: &str) -> Result<(), CompileError> {
        self.expect_token(&Token::RBrace(self.current_location()), &format!("Expected '}}' {ctx}"))
    }

    pub(crate) fn expect_rbracket(&mut self, ctx: &str) -> Result<(), CompileError> {
        self.expect_token(&Token::RBracket(self.current_location()), &format!("Expected ']' {ctx}"))
    }

    pub(crate) fn expect_semicolon(&mut self, ctx: &str) -> Result<(), CompileError> {
        self.expect_token(&Token::Semicolon(self.current_location()), &format!("Expected ';' {ctx}"))
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<String, CompileError> {
        if let Token::Ident(name, _) = self.peek_token() {
            self.advance();
            Ok(name)
        } else {
            Err(self.error(format!("Expected identifier, found {}", self.peek())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::Lexer;

    fn parse(source: &str, dialect: Dialect) -> Result<Program, CompileError> {
        let tokens = Lexer::new(source, dialect).tokenize()?;
        Parser::new(tokens, dialect).parse_program()
    }

    #[test]
    fn test_parse_simple_function() {
        let program = parse("int main() { return 0; }", Dialect::C).unwrap();

        assert_eq!(program.nodes.len(), 1);
        match &program.nodes[0] {
            AstNode::FunctionDef {
                name,
                params,
                return_type,
                body,
                ..
            } => {
                assert_eq!(name, "main");
                assert_eq!(params.len(), 0);
                assert_eq!(return_type.base, BaseType::Int);
                assert_eq!(body.len(), 1);
            }
            _ => panic!("Expected function definition"),
        }
    }

    #[test]
    fn test_parse_prototype_and_globals() {
        let program = parse(
            "int add(int, int);\nstatic const int LIMIT = 3, grid[2][3];\nint add(int a, int b) { return a + b; }",
            Dialect::C,
        )
        .unwrap();
        assert!(matches!(program.nodes[0], AstNode::FunctionDecl { .. }));
        assert!(matches!(program.nodes[1], AstNode::DeclList { ref decls, .. } if decls.len() == 2));
        assert!(matches!(program.nodes[2], AstNode::FunctionDef { ref params, .. } if params.len() == 2));
    }

    #[test]
    fn test_parse_unsigned_long_long_and_pointers() {
        let program = parse("int main() { unsigned long long x = 1; char **argv; }", Dialect::C).unwrap();
        let AstNode::FunctionDef { body, .. } = &program.nodes[0] else {
            panic!("Expected function definition");
        };
        assert!(matches!(
            body[0],
            AstNode::VarDecl { var_type: Type { base: BaseType::ULong, pointer_depth: 0 }, .. }
        ));
        assert!(matches!(
            body[1],
            AstNode::VarDecl { var_type: Type { base: BaseType::Char, pointer_depth: 2 }, .. }
        ));
    }

    #[test]
    fn test_parse_error_location() {
        let err = parse("int main() {\n  int x = ;\n}", Dialect::C).unwrap_err();
        assert_eq!(err.location.line, 2);
    }

    #[test]
    fn test_cpp_reference_param_and_range_for() {
        let program = parse(
            "void inc(int &x) { x++; }\nint main() { string s = \"ab\"; for (char c : s) {} }",
            Dialect::Cpp,
        )
        .unwrap();
        assert!(matches!(&program.nodes[0], AstNode::FunctionDef { params, .. } if params[0].by_ref));
        let AstNode::FunctionDef { body, .. } = &program.nodes[1] else {
            panic!("Expected function definition");
        };
        assert!(matches!(body[1], AstNode::ForEach { .. }));
    }
}
