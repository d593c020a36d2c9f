//! Declaration parsing implementation
//!
//! This module handles parsing of declarations:
//!
//! - Function definitions and prototypes: `type name(params) { ... }` / `;`
//! - Variable declarations with several declarators: `int a = 1, *p, b[3][4];`
//! - Type specifiers: multi-word base types, qualifiers, pointers, references
//! - Brace initializer lists
//!
//! # Grammar
//!
//! ```text
//! declaration ::= specifiers ( function | declarator ("," declarator)* ";" )
//! function    ::= identifier "(" params ")" ( block | ";" )
//! declarator  ::= "*"* "&"? identifier ("[" expr? "]")* ("=" initializer | "(" args ")")?
//! initializer ::= expression | "{" (initializer ",")* "}"
//! ```

use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::parser::parse::Parser;
use crate::parser::{CompileError, Dialect};

/// Storage and qualifier words seen while reading a specifier.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Specifiers {
    pub is_static: bool,
}

impl Parser {
    /// Parse a top-level declaration (function, prototype or globals)
    pub(crate) fn parse_top_level_declaration(&mut self) -> Result<AstNode, CompileError> {
        if !self.is_type_start() {
            return Err(self.error(format!("Expected a declaration, found {}", self.peek())));
        }

        let loc = self.current_location();
        let (base, specs) = self.parse_type_specifier()?;

        // Look past pointer stars for `name (`
        let mut offset = 0;
        while self.check_ahead(offset, &Token::Star(loc)) {
            offset += 1;
        }
        let is_function = matches!(self.peek_ahead(offset), Some(Token::Ident(_, _)))
            && self.check_ahead(offset + 1, &Token::LParen(loc));

        if is_function {
            let mut return_type = base;
            while self.match_token(&Token::Star(loc)) {
                return_type = return_type.with_pointer();
            }
            return self.parse_function_rest(return_type);
        }

        self.parse_declarators(base, specs, loc)
    }

    /// Parse `name(params)` followed by a body or `;`.
    fn parse_function_rest(&mut self, return_type: Type) -> Result<AstNode, CompileError> {
        let name = self.expect_identifier()?;
        let loc = self.previous_location();

        self.expect_lparen("after function name")?;
        let params = self.parse_parameter_list()?;
        self.expect_rparen("after parameters")?;

        if self.match_token(&Token::Semicolon(loc)) {
            return Ok(AstNode::FunctionDecl {
                name,
                return_type,
                location: loc,
            });
        }

        if !self.match_token(&Token::LBrace(loc)) {
            return Err(self.error(format!("Expected '{{' before function body, found {}", self.peek())));
        }
        let body = self.parse_block_statements()?;
        self.expect_rbrace("after function body")?;

        Ok(AstNode::FunctionDef {
            name,
            params,
            return_type,
            body,
            location: loc,
        })
    }

    /// Parse parameter list: (type name, type name, ...)
    fn parse_parameter_list(&mut self) -> Result<Vec<Param>, CompileError> {
        let mut params = Vec::new();
        let loc = self.current_location();

        if self.check(&Token::RParen(loc)) {
            return Ok(params);
        }
        if self.peek().is_ident("void") && self.check_ahead(1, &Token::RParen(loc)) {
            self.advance();
            return Ok(params);
        }

        loop {
            if !self.is_type_start() {
                return Err(self.error(format!("Expected parameter type, found {}", self.peek())));
            }
            let (mut param_type, _) = self.parse_type_specifier()?;
            while self.match_token(&Token::Star(loc)) {
                param_type = param_type.with_pointer();
            }
            let by_ref = self.dialect == Dialect::Cpp && self.match_token(&Token::Amp(loc));

            let name = match self.peek_token() {
                Token::Ident(name, _) => {
                    self.advance();
                    name
                }
                _ => format!("__unnamed{}", params.len()),
            };

            // Each `[]` or `[N]` decays to one level of pointer.
            while self.match_token(&Token::LBracket(loc)) {
                if !self.check(&Token::RBracket(loc)) {
                    self.parse_expression()?;
                }
                self.expect_rbracket("in array parameter")?;
                param_type = param_type.with_pointer();
            }

            params.push(Param {
                name,
                param_type,
                by_ref,
            });

            if !self.match_token(&Token::Comma(loc)) {
                break;
            }
        }

        Ok(params)
    }

    /// Parse a declaration statement (specifiers already expected at the cursor).
    pub(crate) fn parse_declaration(&mut self) -> Result<AstNode, CompileError> {
        let loc = self.current_location();
        let (base, specs) = self.parse_type_specifier()?;
        self.parse_declarators(base, specs, loc)
    }

    /// Parse `declarator ("," declarator)* ";"` after the specifiers.
    fn parse_declarators(
        &mut self,
        base: Type,
        specs: Specifiers,
        loc: SourceLocation,
    ) -> Result<AstNode, CompileError> {
        let mut decls = Vec::new();
        loop {
            decls.push(self.parse_declarator(base, specs)?);
            if !self.match_token(&Token::Comma(loc)) {
                break;
            }
        }
        self.expect_semicolon("after declaration")?;

        if decls.len() == 1 {
            Ok(decls.remove(0))
        } else {
            Ok(AstNode::DeclList {
                decls,
                location: loc,
            })
        }
    }

    fn parse_declarator(&mut self, base: Type, specs: Specifiers) -> Result<AstNode, CompileError> {
        let loc = self.current_location();
        let mut var_type = base;
        while self.match_token(&Token::Star(loc)) {
            var_type = var_type.with_pointer();
        }
        let is_ref = self.dialect == Dialect::Cpp && self.match_token(&Token::Amp(loc));

        if self.check(&Token::LParen(loc)) {
            return Err(self.error("Function pointers are not supported"));
        }

        let name = self.expect_identifier()?;
        let location = self.previous_location();

        let mut dims = Vec::new();
        while self.match_token(&Token::LBracket(loc)) {
            if self.match_token(&Token::RBracket(loc)) {
                dims.push(None);
            } else {
                let size = self.parse_expression()?;
                self.expect_rbracket("after array size")?;
                dims.push(Some(Box::new(size)));
            }
        }

        let init = if self.match_token(&Token::Eq(loc)) {
            Some(Box::new(self.parse_initializer()?))
        } else if self.dialect == Dialect::Cpp && self.check(&Token::LBrace(loc)) {
            Some(Box::new(self.parse_initializer()?))
        } else if self.dialect == Dialect::Cpp && self.check(&Token::LParen(loc)) && dims.is_empty() {
            // Constructor-style initialization: `int x(5);`, `string s(3, 'a');`
            let call_loc = self.current_location();
            self.advance();
            let args = self.parse_arguments()?;
            match args.len() {
                0 => None,
                1 if var_type.base != BaseType::Str => args.into_iter().next().map(Box::new),
                _ => Some(Box::new(AstNode::FunctionCall {
                    name: "string".to_string(),
                    args,
                    location: call_loc,
                })),
            }
        } else {
            None
        };

        Ok(AstNode::VarDecl {
            name,
            var_type,
            dims,
            init,
            is_static: specs.is_static,
            is_ref,
            location,
        })
    }

    /// `expression` or a (possibly nested) brace list.
    pub(crate) fn parse_initializer(&mut self) -> Result<AstNode, CompileError> {
        let loc = self.current_location();
        if !self.match_token(&Token::LBrace(loc)) {
            return self.parse_assignment_expression();
        }

        let mut items = Vec::new();
        while !self.check(&Token::RBrace(loc)) {
            items.push(self.parse_initializer()?);
            if !self.match_token(&Token::Comma(loc)) {
                break;
            }
        }
        self.expect_rbrace("after initializer list")?;

        Ok(AstNode::InitList {
            items,
            location: loc,
        })
    }

    /// Parse a multi-word type specifier such as `unsigned long long` or
    /// `const char`. Pointer stars are left for the declarator.
    pub(crate) fn parse_type_specifier(&mut self) -> Result<(Type, Specifiers), CompileError> {
        let loc = self.current_location();
        let mut specs = Specifiers::default();
        let mut unsigned = false;
        let mut signed = false;
        let mut longs = 0;
        let mut short = false;
        let mut word: Option<String> = None;

        while self.is_type_start() {
            let Token::Ident(name, _) = self.peek_token() else {
                break;
            };
            match name.as_str() {
                "const" | "volatile" | "register" | "extern" | "inline" | "constexpr" => {}
                "static" => specs.is_static = true,
                "unsigned" => unsigned = true,
                "signed" => signed = true,
                "long" => longs += 1,
                "short" => short = true,
                _ if word.is_none() => word = Some(name),
                _ => break,
            }
            self.advance();
        }

        let base = match word.as_deref() {
            None | Some("int") => {
                if word.is_none() && !unsigned && !signed && longs == 0 && !short {
                    return Err(CompileError::new("Expected a type name", loc));
                }
                match (short, longs > 0, unsigned) {
                    (true, _, false) => BaseType::Short,
                    (true, _, true) => BaseType::UShort,
                    (false, true, false) => BaseType::Long,
                    (false, true, true) => BaseType::ULong,
                    (false, false, false) => BaseType::Int,
                    (false, false, true) => BaseType::UInt,
                }
            }
            Some("char") => {
                if unsigned {
                    BaseType::UChar
                } else {
                    BaseType::Char
                }
            }
            Some("double") | Some("float") if longs > 0 => BaseType::Double,
            Some("double") => BaseType::Double,
            Some("float") => BaseType::Float,
            Some("void") => BaseType::Void,
            Some("bool") | Some("_Bool") => BaseType::Bool,
            Some("FILE") => BaseType::File,
            Some("string") => BaseType::Str,
            Some("auto") => BaseType::Auto,
            Some("size_t") | Some("uint64_t") | Some("uintptr_t") => BaseType::ULong,
            Some("ssize_t") | Some("ptrdiff_t") | Some("time_t") | Some("clock_t")
            | Some("int64_t") | Some("intptr_t") => BaseType::Long,
            Some("int32_t") => BaseType::Int,
            Some("uint32_t") => BaseType::UInt,
            Some("int16_t") => BaseType::Short,
            Some("uint16_t") => BaseType::UShort,
            Some("int8_t") => BaseType::Char,
            Some("uint8_t") => BaseType::UChar,
            Some(other) => {
                return Err(CompileError::new(format!("Unknown type '{other}'"), loc));
            }
        };

        Ok((Type::new(base), specs))
    }

    /// Parse a type name as used in casts and `sizeof(type)`.
    pub(crate) fn parse_type_name(&mut self) -> Result<Type, CompileError> {
        let loc = self.current_location();
        let (mut ty, _) = self.parse_type_specifier()?;
        while self.match_token(&Token::Star(loc)) {
            ty = ty.with_pointer();
        }
        // `const char &` in a cast
        self.match_token(&Token::Amp(loc));
        Ok(ty)
    }
}
