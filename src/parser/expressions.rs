//! Expression parsing implementation
//!
//! One method per precedence level, from the comma operator down to primary
//! expressions.
//!
//! # Supported Expressions
//!
//! - Literals: integers, floats, characters, strings (adjacent strings concatenate)
//! - Identifiers, function calls and C++ method calls (`s.size()`)
//! - Binary operators: arithmetic, comparison, logical, bitwise
//! - Unary operators: `-`, `+`, `!`, `~`, `&`, `*`, `++`, `--`
//! - Postfix: `[]`, `()`, `.method()`, `++`, `--`
//! - Ternary, assignment and compound assignment, comma
//! - Type casts: `(type)expr` and C++ functional casts `int(x)`
//! - `sizeof(type)` and `sizeof expr`

use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::parser::parse::Parser;
use crate::parser::CompileError;

impl Parser {
    /// Parse expression (top-level entry point, includes the comma operator)
    pub(crate) fn parse_expression(&mut self) -> Result<AstNode, CompileError> {
        let mut expr = self.parse_assignment_expression()?;
        while self.check(&Token::Comma(self.current_location())) {
            let loc = self.current_location();
            self.advance();
            let right = self.parse_assignment_expression()?;
            expr = AstNode::Comma {
                left: Box::new(expr),
                right: Box::new(right),
                location: loc,
            };
        }
        Ok(expr)
    }

    /// Parse assignment or ternary (right-associative)
    pub(crate) fn parse_assignment_expression(&mut self) -> Result<AstNode, CompileError> {
        let expr = self.parse_ternary_expression()?;

        let loc = self.current_location();
        if self.match_token(&Token::Eq(loc)) {
            let rhs = if self.check(&Token::LBrace(loc)) {
                self.parse_initializer()?
            } else {
                self.parse_assignment_expression()?
            };
            return Ok(AstNode::Assignment {
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
                location: loc,
            });
        }

        let compound_op = match self.peek() {
            Token::PlusEq(_) => Some(BinOp::Add),
            Token::MinusEq(_) => Some(BinOp::Sub),
            Token::StarEq(_) => Some(BinOp::Mul),
            Token::SlashEq(_) => Some(BinOp::Div),
            Token::PercentEq(_) => Some(BinOp::Mod),
            Token::AmpEq(_) => Some(BinOp::BitAnd),
            Token::PipeEq(_) => Some(BinOp::BitOr),
            Token::CaretEq(_) => Some(BinOp::BitXor),
            Token::LtLtEq(_) => Some(BinOp::Shl),
            Token::GtGtEq(_) => Some(BinOp::Shr),
            _ => None,
        };

        if let Some(op) = compound_op {
            self.advance();
            let rhs = self.parse_assignment_expression()?;
            return Ok(AstNode::CompoundAssignment {
                lhs: Box::new(expr),
                op,
                rhs: Box::new(rhs),
                location: loc,
            });
        }

        Ok(expr)
    }

    /// Parse ternary: condition ? true_expr : false_expr
    pub(crate) fn parse_ternary_expression(&mut self) -> Result<AstNode, CompileError> {
        let condition = self.parse_logical_or()?;

        let loc = self.current_location();
        if self.match_token(&Token::Question(loc)) {
            let true_expr = self.parse_expression()?;
            self.expect_token(&Token::Colon(loc), "Expected ':' in ternary expression")?;
            let false_expr = self.parse_assignment_expression()?;
            return Ok(AstNode::TernaryOp {
                condition: Box::new(condition),
                true_expr: Box::new(true_expr),
                false_expr: Box::new(false_expr),
                location: loc,
            });
        }

        Ok(condition)
    }

    /// Left-associative binary level: `next (op next)*`.
    fn parse_binary_level(
        &mut self,
        next: fn(&mut Parser) -> Result<AstNode, CompileError>,
        operator: fn(&Token) -> Option<BinOp>,
    ) -> Result<AstNode, CompileError> {
        let mut left = next(self)?;
        while let Some(op) = operator(self.peek()) {
            let loc = self.current_location();
            self.advance();
            let right = next(self)?;
            left = AstNode::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
                location: loc,
            };
        }
        Ok(left)
    }

    fn parse_logical_or(&mut self) -> Result<AstNode, CompileError> {
        self.parse_binary_level(Parser::parse_logical_and, |t| match t {
            Token::OrOr(_) => Some(BinOp::Or),
            _ => None,
        })
    }

    fn parse_logical_and(&mut self) -> Result<AstNode, CompileError> {
        self.parse_binary_level(Parser::parse_bitwise_or, |t| match t {
            Token::AndAnd(_) => Some(BinOp::And),
            _ => None,
        })
    }

    fn parse_bitwise_or(&mut self) -> Result<AstNode, CompileError> {
        self.parse_binary_level(Parser::parse_bitwise_xor, |t| match t {
            Token::Pipe(_) => Some(BinOp::BitOr),
            _ => None,
        })
    }

    fn parse_bitwise_xor(&mut self) -> Result<AstNode, CompileError> {
        self.parse_binary_level(Parser::parse_bitwise_and, |t| match t {
            Token::Caret(_) => Some(BinOp::BitXor),
            _ => None,
        })
    }

    fn parse_bitwise_and(&mut self) -> Result<AstNode, CompileError> {
        self.parse_binary_level(Parser::parse_equality, |t| match t {
            Token::Amp(_) => Some(BinOp::BitAnd),
            _ => None,
        })
    }

    fn parse_equality(&mut self) -> Result<AstNode, CompileError> {
        self.parse_binary_level(Parser::parse_relational, |t| match t {
            Token::EqEq(_) => Some(BinOp::Eq),
            Token::NotEq(_) => Some(BinOp::Ne),
            _ => None,
        })
    }

    fn parse_relational(&mut self) -> Result<AstNode, CompileError> {
        self.parse_binary_level(Parser::parse_shift, |t| match t {
            Token::Lt(_) => Some(BinOp::Lt),
            Token::Le(_) => Some(BinOp::Le),
            Token::Gt(_) => Some(BinOp::Gt),
            Token::Ge(_) => Some(BinOp::Ge),
            _ => None,
        })
    }

    fn parse_shift(&mut self) -> Result<AstNode, CompileError> {
        self.parse_binary_level(Parser::parse_additive, |t| match t {
            Token::LtLt(_) => Some(BinOp::Shl),
            Token::GtGt(_) => Some(BinOp::Shr),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> Result<AstNode, CompileError> {
        self.parse_binary_level(Parser::parse_multiplicative, |t| match t {
            Token::Plus(_) => Some(BinOp::Add),
            Token::Minus(_) => Some(BinOp::Sub),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> Result<AstNode, CompileError> {
        self.parse_binary_level(Parser::parse_unary, |t| match t {
            Token::Star(_) => Some(BinOp::Mul),
            Token::Slash(_) => Some(BinOp::Div),
            Token::Percent(_) => Some(BinOp::Mod),
            _ => None,
        })
    }

    /// Parse prefix operators, casts and `sizeof`
    fn parse_unary(&mut self) -> Result<AstNode, CompileError> {
        let loc = self.current_location();

        let prefix = match self.peek() {
            Token::Minus(_) => Some(UnOp::Neg),
            Token::Plus(_) => Some(UnOp::Plus),
            Token::Bang(_) => Some(UnOp::Not),
            Token::Tilde(_) => Some(UnOp::BitNot),
            Token::PlusPlus(_) => Some(UnOp::PreInc),
            Token::MinusMinus(_) => Some(UnOp::PreDec),
            Token::Star(_) => Some(UnOp::Deref),
            Token::Amp(_) => Some(UnOp::AddrOf),
            _ => None,
        };
        if let Some(op) = prefix {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(AstNode::UnaryOp {
                op,
                operand: Box::new(operand),
                location: loc,
            });
        }

        if self.match_token(&Token::Sizeof(loc)) {
            if self.check(&Token::LParen(loc)) && self.is_type_word_at(1) {
                self.advance();
                let target_type = self.parse_type_name()?;
                self.expect_rparen("after sizeof type")?;
                return Ok(AstNode::SizeofType {
                    target_type,
                    location: loc,
                });
            }
            let expr = self.parse_unary()?;
            return Ok(AstNode::SizeofExpr {
                expr: Box::new(expr),
                location: loc,
            });
        }

        // (type) expr
        if self.check(&Token::LParen(loc)) && self.is_type_word_at(1) {
            self.advance();
            let target_type = self.parse_type_name()?;
            self.expect_rparen("after cast type")?;
            let expr = self.parse_unary()?;
            return Ok(AstNode::Cast {
                target_type,
                expr: Box::new(expr),
                location: loc,
            });
        }

        self.parse_postfix()
    }

    /// Parse postfix operators: indexing, method calls, `++`, `--`
    fn parse_postfix(&mut self) -> Result<AstNode, CompileError> {
        let mut expr = self.parse_primary()?;

        loop {
            let loc = self.current_location();
            match self.peek() {
                Token::LBracket(_) => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect_rbracket("after array index")?;
                    expr = AstNode::ArrayAccess {
                        array: Box::new(expr),
                        index: Box::new(index),
                        location: loc,
                    };
                }
                Token::Dot(_) => {
                    self.advance();
                    let method = self.expect_identifier()?;
                    if !self.match_token(&Token::LParen(loc)) {
                        return Err(CompileError::new(
                            format!("Member access '.{method}' is not supported"),
                            loc,
                        ));
                    }
                    let args = self.parse_arguments()?;
                    expr = AstNode::MethodCall {
                        object: Box::new(expr),
                        method,
                        args,
                        location: loc,
                    };
                }
                Token::PlusPlus(_) | Token::MinusMinus(_) => {
                    let op = if matches!(self.peek(), Token::PlusPlus(_)) {
                        UnOp::PostInc
                    } else {
                        UnOp::PostDec
                    };
                    self.advance();
                    expr = AstNode::UnaryOp {
                        op,
                        operand: Box::new(expr),
                        location: loc,
                    };
                }
                Token::LParen(_) => {
                    return Err(self.error("Calling a non-function expression is not supported"));
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    /// Arguments after a consumed `(`, including the closing `)`.
    pub(crate) fn parse_arguments(&mut self) -> Result<Vec<AstNode>, CompileError> {
        let mut args = Vec::new();
        let loc = self.current_location();
        if !self.check(&Token::RParen(loc)) {
            loop {
                args.push(self.parse_assignment_expression()?);
                if !self.match_token(&Token::Comma(loc)) {
                    break;
                }
            }
        }
        self.expect_rparen("after arguments")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<AstNode, CompileError> {
        let loc = self.current_location();

        // C++ functional cast or constructor call: int(x), string(3, 'a')
        if self.is_type_start() && self.check_ahead(1, &Token::LParen(loc)) {
            let target_type = self.parse_type_name()?;
            self.expect_lparen("in functional cast")?;
            let mut args = self.parse_arguments()?;
            if args.len() == 1 && target_type.base != BaseType::Str {
                return Ok(AstNode::Cast {
                    target_type,
                    expr: Box::new(args.remove(0)),
                    location: loc,
                });
            }
            return Ok(AstNode::FunctionCall {
                name: "string".to_string(),
                args,
                location: loc,
            });
        }

        match self.peek_token() {
            Token::IntLiteral(n, _) => {
                self.advance();
                Ok(AstNode::IntLiteral(n, loc))
            }
            Token::FloatLiteral(n, _) => {
                self.advance();
                Ok(AstNode::FloatLiteral(n, loc))
            }
            Token::CharLiteral(c, _) => {
                self.advance();
                Ok(AstNode::CharLiteral(c, loc))
            }
            Token::StringLiteral(mut bytes, _) => {
                self.advance();
                while let Token::StringLiteral(more, _) = self.peek_token() {
                    bytes.extend_from_slice(&more);
                    self.advance();
                }
                Ok(AstNode::StringLiteral(bytes, loc))
            }
            Token::Null(_) => {
                self.advance();
                Ok(AstNode::Null { location: loc })
            }
            Token::Ident(name, _) => {
                self.advance();
                if self.match_token(&Token::LParen(loc)) {
                    let args = self.parse_arguments()?;
                    return Ok(AstNode::FunctionCall {
                        name,
                        args,
                        location: loc,
                    });
                }
                Ok(AstNode::Variable(name, loc))
            }
            Token::LParen(_) => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_rparen("after expression")?;
                Ok(expr)
            }
            Token::LBrace(_) => self.parse_initializer(),
            Token::ColonColon(_) => Err(self.error("Qualified names other than std:: are not supported")),
            other => Err(self.error(format!("Unexpected {} in expression", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::Lexer;
    use crate::parser::Dialect;

    fn expr(source: &str) -> AstNode {
        let tokens = Lexer::new(source, Dialect::Cpp).tokenize().unwrap();
        Parser::new(tokens, Dialect::Cpp).parse_expression().unwrap()
    }

    #[test]
    fn test_precedence() {
        let AstNode::BinaryOp { op, right, .. } = expr("1 + 2 * 3") else {
            panic!("Expected binary op");
        };
        assert_eq!(op, BinOp::Add);
        assert!(matches!(*right, AstNode::BinaryOp { op: BinOp::Mul, .. }));
    }

    #[test]
    fn test_stream_chain_is_left_associative() {
        let AstNode::BinaryOp { op, left, .. } = expr("cout << a << endl") else {
            panic!("Expected binary op");
        };
        assert_eq!(op, BinOp::Shl);
        assert!(matches!(*left, AstNode::BinaryOp { op: BinOp::Shl, .. }));
    }

    #[test]
    fn test_cast_and_sizeof() {
        assert!(matches!(expr("(double)x / 2"), AstNode::BinaryOp { op: BinOp::Div, .. }));
        assert!(matches!(expr("sizeof(int)"), AstNode::SizeofType { .. }));
        assert!(matches!(expr("sizeof arr"), AstNode::SizeofExpr { .. }));
        assert!(matches!(expr("int(3.7)"), AstNode::Cast { .. }));
    }

    #[test]
    fn test_method_call_and_postfix() {
        assert!(matches!(expr("s.substr(1, 2)"), AstNode::MethodCall { ref args, .. } if args.len() == 2));
        assert!(matches!(expr("a[i]++"), AstNode::UnaryOp { op: UnOp::PostInc, .. }));
    }

    #[test]
    fn test_adjacent_strings_concatenate() {
        assert!(matches!(expr("\"ab\" \"cd\""), AstNode::StringLiteral(ref b, _) if b == b"abcd"));
    }
}
