//! Lexer (tokenizer) for preprocessed C and C++ source
//!
//! Converts comment-free, preprocessed text into a flat [`Token`] stream.
//! Type names (`int`, `double`, `string`, ...) are produced as identifiers and
//! recognized by the parser; only control-flow words and the words the syntax
//! gate must see are keywords. C++-only keywords are plain identifiers when
//! lexing C.

use super::ast::SourceLocation;
use super::Dialect;
use std::fmt;

/// All token variants produced by the lexer.
///
/// Every variant carries a [`SourceLocation`] so that compile errors can
/// report an accurate line and column without a separate location table.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    IntLiteral(i64, SourceLocation),
    FloatLiteral(f64, SourceLocation),
    CharLiteral(i64, SourceLocation),
    StringLiteral(Vec<u8>, SourceLocation),

    // Identifiers
    Ident(String, SourceLocation),

    // Keywords
    If(SourceLocation),
    Else(SourceLocation),
    While(SourceLocation),
    Do(SourceLocation),
    For(SourceLocation),
    Switch(SourceLocation),
    Case(SourceLocation),
    Default(SourceLocation),
    Break(SourceLocation),
    Continue(SourceLocation),
    Return(SourceLocation),
    Goto(SourceLocation),
    Sizeof(SourceLocation),
    Null(SourceLocation),
    Struct(SourceLocation),
    Union(SourceLocation),
    Enum(SourceLocation),
    Typedef(SourceLocation),

    // C++ keywords
    Class(SourceLocation),
    Template(SourceLocation),
    Typename(SourceLocation),
    Namespace(SourceLocation),
    Using(SourceLocation),
    New(SourceLocation),
    Delete(SourceLocation),
    Try(SourceLocation),
    Catch(SourceLocation),
    Throw(SourceLocation),

    // Arithmetic
    Plus(SourceLocation),    // +
    Minus(SourceLocation),   // -
    Star(SourceLocation),    // *
    Slash(SourceLocation),   // /
    Percent(SourceLocation), // %

    // Comparison
    EqEq(SourceLocation),  // ==
    NotEq(SourceLocation), // !=
    Lt(SourceLocation),    // <
    Le(SourceLocation),    // <=
    Gt(SourceLocation),    // >
    Ge(SourceLocation),    // >=

    // Logical
    AndAnd(SourceLocation), // &&
    OrOr(SourceLocation),   // ||
    Bang(SourceLocation),   // !

    // Bitwise
    Amp(SourceLocation),   // &
    Pipe(SourceLocation),  // |
    Caret(SourceLocation), // ^
    Tilde(SourceLocation), // ~
    LtLt(SourceLocation),  // <<
    GtGt(SourceLocation),  // >>

    // Assignment
    Eq(SourceLocation),        // =
    PlusEq(SourceLocation),    // +=
    MinusEq(SourceLocation),   // -=
    StarEq(SourceLocation),    // *=
    SlashEq(SourceLocation),   // /=
    PercentEq(SourceLocation), // %=
    AmpEq(SourceLocation),     // &=
    PipeEq(SourceLocation),    // |=
    CaretEq(SourceLocation),   // ^=
    LtLtEq(SourceLocation),    // <<=
    GtGtEq(SourceLocation),    // >>=

    // Increment/Decrement
    PlusPlus(SourceLocation),   // ++
    MinusMinus(SourceLocation), // --

    // Member access
    Dot(SourceLocation),        // .
    Arrow(SourceLocation),      // ->
    ColonColon(SourceLocation), // ::

    // Ternary
    Question(SourceLocation), // ?
    Colon(SourceLocation),    // :

    // Punctuation
    LParen(SourceLocation),    // (
    RParen(SourceLocation),    // )
    LBrace(SourceLocation),    // {
    RBrace(SourceLocation),    // }
    LBracket(SourceLocation),  // [
    RBracket(SourceLocation),  // ]
    Semicolon(SourceLocation), // ;
    Comma(SourceLocation),     // ,

    // End of file
    Eof(SourceLocation),
}

impl Token {
    /// Returns the source location where this token appears.
    pub fn location(&self) -> SourceLocation {
        match self {
            Token::IntLiteral(_, loc)
            | Token::FloatLiteral(_, loc)
            | Token::CharLiteral(_, loc)
            | Token::StringLiteral(_, loc)
            | Token::Ident(_, loc)
            | Token::If(loc)
            | Token::Else(loc)
            | Token::While(loc)
            | Token::Do(loc)
            | Token::For(loc)
            | Token::Switch(loc)
            | Token::Case(loc)
            | Token::Default(loc)
            | Token::Break(loc)
            | Token::Continue(loc)
            | Token::Return(loc)
            | Token::Goto(loc)
            | Token::Sizeof(loc)
            | Token::Null(loc)
            | Token::Struct(loc)
            | Token::Union(loc)
            | Token::Enum(loc)
            | Token::Typedef(loc)
            | Token::Class(loc)
            | Token::Template(loc)
            | Token::Typename(loc)
            | Token::Namespace(loc)
            | Token::Using(loc)
            | Token::New(loc)
            | Token::Delete(loc)
            | Token::Try(loc)
            | Token::Catch(loc)
            | Token::Throw(loc)
            | Token::Plus(loc)
            | Token::Minus(loc)
            | Token::Star(loc)
            | Token::Slash(loc)
            | Token::Percent(loc)
            | Token::EqEq(loc)
            | Token::NotEq(loc)
            | Token::Lt(loc)
            | Token::Le(loc)
            | Token::Gt(loc)
            | Token::Ge(loc)
            | Token::AndAnd(loc)
            | Token::OrOr(loc)
            | Token::Bang(loc)
            | Token::Amp(loc)
            | Token::Pipe(loc)
            | Token::Caret(loc)
            | Token::Tilde(loc)
            | Token::LtLt(loc)
            | Token::GtGt(loc)
            | Token::Eq(loc)
            | Token::PlusEq(loc)
            | Token::MinusEq(loc)
            | Token::StarEq(loc)
            | Token::SlashEq(loc)
            | Token::PercentEq(loc)
            | Token::AmpEq(loc)
            | Token::PipeEq(loc)
            | Token::CaretEq(loc)
            | Token::LtLtEq(loc)
            | Token::GtGtEq(loc)
            | Token::PlusPlus(loc)
            | Token::MinusMinus(loc)
            | Token::Dot(loc)
            | Token::Arrow(loc)
            | Token::ColonColon(loc)
            | Token::Question(loc)
            | Token::Colon(loc)
            | Token::LParen(loc)
            | Token::RParen(loc)
            | Token::LBrace(loc)
            | Token::RBrace(loc)
            | Token::LBracket(loc)
            | Token::RBracket(loc)
            | Token::Semicolon(loc)
            | Token::Comma(loc)
            | Token::Eof(loc) => *loc,
        }
    }

    /// True for an identifier token spelled `name`.
    pub fn is_ident(&self, name: &str) -> bool {
        matches!(self, Token::Ident(s, _) if s == name)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::IntLiteral(n, _) => write!(f, "int literal {}", n),
            Token::FloatLiteral(n, _) => write!(f, "float literal {}", n),
            Token::CharLiteral(c, _) => {
                let byte = *c as u8;
                if byte.is_ascii_graphic() || byte == b' ' {
                    write!(f, "char literal '{}'", byte as char)
                } else {
                    write!(f, "char literal '\\x{:02x}'", byte)
                }
            }
            Token::StringLiteral(s, _) => {
                write!(f, "string literal \"{}\"", String::from_utf8_lossy(s).escape_debug())
            }
            Token::Ident(s, _) => write!(f, "identifier '{}'", s),
            Token::If(_) => write!(f, "'if'"),
            Token::Else(_) => write!(f, "'else'"),
            Token::While(_) => write!(f, "'while'"),
            Token::Do(_) => write!(f, "'do'"),
            Token::For(_) => write!(f, "'for'"),
            Token::Switch(_) => write!(f, "'switch'"),
            Token::Case(_) => write!(f, "'case'"),
            Token::Default(_) => write!(f, "'default'"),
            Token::Break(_) => write!(f, "'break'"),
            Token::Continue(_) => write!(f, "'continue'"),
            Token::Return(_) => write!(f, "'return'"),
            Token::Goto(_) => write!(f, "'goto'"),
            Token::Sizeof(_) => write!(f, "'sizeof'"),
            Token::Null(_) => write!(f, "'NULL'"),
            Token::Struct(_) => write!(f, "'struct'"),
            Token::Union(_) => write!(f, "'union'"),
            Token::Enum(_) => write!(f, "'enum'"),
            Token::Typedef(_) => write!(f, "'typedef'"),
            Token::Class(_) => write!(f, "'class'"),
            Token::Template(_) => write!(f, "'template'"),
            Token::Typename(_) => write!(f, "'typename'"),
            Token::Namespace(_) => write!(f, "'namespace'"),
            Token::Using(_) => write!(f, "'using'"),
            Token::New(_) => write!(f, "'new'"),
            Token::Delete(_) => write!(f, "'delete'"),
            Token::Try(_) => write!(f, "'try'"),
            Token::Catch(_) => write!(f, "'catch'"),
            Token::Throw(_) => write!(f, "'throw'"),
            Token::Plus(_) => write!(f, "'+'"),
            Token::Minus(_) => write!(f, "'-'"),
            Token::Star(_) => write!(f, "'*'"),
            Token::Slash(_) => write!(f, "'/'"),
            Token::Percent(_) => write!(f, "'%'"),
            Token::EqEq(_) => write!(f, "'=='"),
            Token::NotEq(_) => write!(f, "'!='"),
            Token::Lt(_) => write!(f, "'<'"),
            Token::Le(_) => write!(f, "'<='"),
            Token::Gt(_) => write!(f, "'>'"),
            Token::Ge(_) => write!(f, "'>='"),
            Token::AndAnd(_) => write!(f, "'&&'"),
            Token::OrOr(_) => write!(f, "'||'"),
            Token::Bang(_) => write!(f, "'!'"),
            Token::Amp(_) => write!(f, "'&'"),
            Token::Pipe(_) => write!(f, "'|'"),
            Token::Caret(_) => write!(f, "'^'"),
            Token::Tilde(_) => write!(f, "'~'"),
            Token::LtLt(_) => write!(f, "'<<'"),
            Token::GtGt(_) => write!(f, "'>>'"),
            Token::Eq(_) => write!(f, "'='"),
            Token::PlusEq(_) => write!(f, "'+='"),
            Token::MinusEq(_) => write!(f, "'-='"),
            Token::StarEq(_) => write!(f, "'*='"),
            Token::SlashEq(_) => write!(f, "'/='"),
            Token::PercentEq(_) => write!(f, "'%='"),
            Token::AmpEq(_) => write!(f, "'&='"),
            Token::PipeEq(_) => write!(f, "'|='"),
            Token::CaretEq(_) => write!(f, "'^='"),
            Token::LtLtEq(_) => write!(f, "'<<='"),
            Token::GtGtEq(_) => write!(f, "'>>='"),
            Token::PlusPlus(_) => write!(f, "'++'"),
            Token::MinusMinus(_) => write!(f, "'--'"),
            Token::Dot(_) => write!(f, "'.'"),
            Token::Arrow(_) => write!(f, "'->'"),
            Token::ColonColon(_) => write!(f, "'::'"),
            Token::Question(_) => write!(f, "'?'"),
            Token::Colon(_) => write!(f, "':'"),
            Token::LParen(_) => write!(f, "'('"),
            Token::RParen(_) => write!(f, "')'"),
            Token::LBrace(_) => write!(f, "'{{'"),
            Token::RBrace(_) => write!(f, "'}}'"),
            Token::LBracket(_) => write!(f, "'['"),
            Token::RBracket(_) => write!(f, "']'"),
            Token::Semicolon(_) => write!(f, "';'"),
            Token::Comma(_) => write!(f, "','"),
            Token::Eof(_) => write!(f, "end of file"),
        }
    }
}

/// Lexer error type
#[derive(Debug)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Lexer error at line {}, column {}: {}",
            self.location.line, self.location.column, self.message
        )
    }
}

impl std::error::Error for LexError {}

/// Lexer for preprocessed C/C++ source
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    dialect: Dialect,
}

impl Lexer {
    pub fn new(input: &str, dialect: Dialect) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            dialect,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();

            if self.is_at_end() {
                tokens.push(Token::Eof(self.current_location()));
                break;
            }

            tokens.push(self.next_token()?);
        }

        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        let loc = self.current_location();
        let ch = self.advance().ok_or_else(|| LexError {
            message: "Unexpected end of file".to_string(),
            location: loc,
        })?;

        let token = match ch {
            '"' => return self.string_literal(loc),
            '\'' => return self.char_literal(loc),
            '0'..='9' => return self.number_literal(ch, loc),
            '.' if matches!(self.peek(), Some('0'..='9')) => {
                return self.number_literal(ch, loc)
            }
            'a'..='z' | 'A'..='Z' | '_' => return Ok(self.identifier_or_keyword(ch, loc)),

            '+' => self.pick(&[("+", Token::PlusPlus(loc)), ("=", Token::PlusEq(loc))], Token::Plus(loc)),
            '-' => self.pick(
                &[
                    ("-", Token::MinusMinus(loc)),
                    ("=", Token::MinusEq(loc)),
                    (">", Token::Arrow(loc)),
                ],
                Token::Minus(loc),
            ),
            '*' => self.pick(&[("=", Token::StarEq(loc))], Token::Star(loc)),
            '/' => self.pick(&[("=", Token::SlashEq(loc))], Token::Slash(loc)),
            '%' => self.pick(&[("=", Token::PercentEq(loc))], Token::Percent(loc)),
            '=' => self.pick(&[("=", Token::EqEq(loc))], Token::Eq(loc)),
            '!' => self.pick(&[("=", Token::NotEq(loc))], Token::Bang(loc)),
            '<' => self.pick(
                &[
                    ("<=", Token::LtLtEq(loc)),
                    ("<", Token::LtLt(loc)),
                    ("=", Token::Le(loc)),
                ],
                Token::Lt(loc),
            ),
            '>' => self.pick(
                &[
                    (">=", Token::GtGtEq(loc)),
                    (">", Token::GtGt(loc)),
                    ("=", Token::Ge(loc)),
                ],
                Token::Gt(loc),
            ),
            '&' => self.pick(&[("&", Token::AndAnd(loc)), ("=", Token::AmpEq(loc))], Token::Amp(loc)),
            '|' => self.pick(&[("|", Token::OrOr(loc)), ("=", Token::PipeEq(loc))], Token::Pipe(loc)),
            '^' => self.pick(&[("=", Token::CaretEq(loc))], Token::Caret(loc)),
            ':' => self.pick(&[(":", Token::ColonColon(loc))], Token::Colon(loc)),
            '~' => Token::Tilde(loc),
            '.' => Token::Dot(loc),
            '?' => Token::Question(loc),
            '(' => Token::LParen(loc),
            ')' => Token::RParen(loc),
            '{' => Token::LBrace(loc),
            '}' => Token::RBrace(loc),
            '[' => Token::LBracket(loc),
            ']' => Token::RBracket(loc),
            ';' => Token::Semicolon(loc),
            ',' => Token::Comma(loc),

            _ => {
                return Err(LexError {
                    message: format!("Unexpected character: '{}'", ch),
                    location: loc,
                })
            }
        };
        Ok(token)
    }

    /// Longest-match selection among operator continuations.
    fn pick(&mut self, options: &[(&str, Token)], single: Token) -> Token {
        for (rest, token) in options {
            if rest.chars().enumerate().all(|(i, c)| self.peek_ahead(i) == Some(c)) {
                for _ in 0..rest.len() {
                    self.advance();
                }
                return token.clone();
            }
        }
        single
    }

    fn string_literal(&mut self, loc: SourceLocation) -> Result<Token, LexError> {
        let mut bytes = Vec::new();

        while let Some(ch) = self.peek() {
            match ch {
                '"' => {
                    self.advance();
                    return Ok(Token::StringLiteral(bytes, loc));
                }
                '\n' => break,
                '\\' => {
                    self.advance();
                    let value = self.escape_sequence()?;
                    bytes.push(value as u8);
                }
                _ => {
                    self.advance();
                    let mut buf = [0u8; 4];
                    bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                }
            }
        }

        Err(LexError {
            message: "Unterminated string literal".to_string(),
            location: loc,
        })
    }

    fn char_literal(&mut self, loc: SourceLocation) -> Result<Token, LexError> {
        let ch = self.advance().ok_or_else(|| LexError {
            message: "Unexpected end of file in character literal".to_string(),
            location: loc,
        })?;

        let value = match ch {
            '\\' => self.escape_sequence()?,
            '\'' | '\n' => {
                return Err(LexError {
                    message: "Empty character literal".to_string(),
                    location: loc,
                })
            }
            _ if (ch as u32) > 0x7f => {
                return Err(LexError {
                    message: "Multi-byte character literal is not supported".to_string(),
                    location: loc,
                })
            }
            _ => ch as i64,
        };

        if self.advance() != Some('\'') {
            return Err(LexError {
                message: "Expected closing quote in character literal".to_string(),
                location: loc,
            });
        }

        // char is signed: '\xff' is -1
        Ok(Token::CharLiteral(value as u8 as i8 as i64, loc))
    }

    /// Decode the escape after a consumed backslash.
    fn escape_sequence(&mut self) -> Result<i64, LexError> {
        let loc = self.current_location();
        let escaped = self.advance().ok_or_else(|| LexError {
            message: "Unexpected end of file in escape sequence".to_string(),
            location: loc,
        })?;

        let value = match escaped {
            'n' => 10,
            't' => 9,
            'r' => 13,
            'a' => 7,
            'b' => 8,
            'f' => 12,
            'v' => 11,
            'e' => 27,
            '\\' => 92,
            '\'' => 39,
            '"' => 34,
            '?' => 63,
            'x' => {
                let mut value: i64 = 0;
                let mut digits = 0;
                while let Some(d) = self.peek().and_then(|c| c.to_digit(16)) {
                    value = (value << 4 | d as i64) & 0xff;
                    digits += 1;
                    self.advance();
                }
                if digits == 0 {
                    return Err(LexError {
                        message: "Incomplete hex escape sequence".to_string(),
                        location: loc,
                    });
                }
                value
            }
            '0'..='7' => {
                let mut value = escaped as i64 - '0' as i64;
                for _ in 0..2 {
                    match self.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d as i64;
                            self.advance();
                        }
                        None => break,
                    }
                }
                value & 0xff
            }
            _ => {
                return Err(LexError {
                    message: format!("Unknown escape sequence: \\{}", escaped),
                    location: loc,
                })
            }
        };
        Ok(value)
    }

    fn number_literal(&mut self, first: char, loc: SourceLocation) -> Result<Token, LexError> {
        let mut text = String::new();
        text.push(first);

        let is_radix_prefixed = first == '0' && matches!(self.peek(), Some('x' | 'X' | 'b' | 'B'));
        while let Some(ch) = self.peek() {
            let exponent_sign = matches!(ch, '+' | '-')
                && !is_radix_prefixed
                && matches!(text.chars().last(), Some('e' | 'E'));
            if ch.is_ascii_alphanumeric() || ch == '.' || exponent_sign {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let invalid = || LexError {
            message: format!("Invalid numeric literal: {}", text),
            location: loc,
        };

        let lower = text.to_ascii_lowercase();
        if let Some(hex) = lower.strip_prefix("0x") {
            let digits = hex.trim_end_matches(['u', 'l']);
            let value = u64::from_str_radix(digits, 16).map_err(|_| invalid())?;
            return Ok(Token::IntLiteral(value as i64, loc));
        }
        if let Some(bin) = lower.strip_prefix("0b") {
            let digits = bin.trim_end_matches(['u', 'l']);
            let value = u64::from_str_radix(digits, 2).map_err(|_| invalid())?;
            return Ok(Token::IntLiteral(value as i64, loc));
        }

        let is_float = lower.contains('.') || lower.contains('e');
        if is_float {
            let digits = lower.trim_end_matches(['f', 'l']);
            let value = digits.parse::<f64>().map_err(|_| invalid())?;
            return Ok(Token::FloatLiteral(value, loc));
        }

        let digits = lower.trim_end_matches(['u', 'l']);
        let value = if digits.len() > 1 && digits.starts_with('0') {
            u64::from_str_radix(&digits[1..], 8).map_err(|_| invalid())?
        } else {
            digits.parse::<u64>().map_err(|_| invalid())?
        };
        Ok(Token::IntLiteral(value as i64, loc))
    }

    fn identifier_or_keyword(&mut self, first: char, loc: SourceLocation) -> Token {
        let mut ident = String::new();
        ident.push(first);

        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match ident.as_str() {
            "if" => Token::If(loc),
            "else" => Token::Else(loc),
            "while" => Token::While(loc),
            "do" => Token::Do(loc),
            "for" => Token::For(loc),
            "switch" => Token::Switch(loc),
            "case" => Token::Case(loc),
            "default" => Token::Default(loc),
            "break" => Token::Break(loc),
            "continue" => Token::Continue(loc),
            "return" => Token::Return(loc),
            "goto" => Token::Goto(loc),
            "sizeof" => Token::Sizeof(loc),
            "NULL" => Token::Null(loc),
            "struct" => Token::Struct(loc),
            "union" => Token::Union(loc),
            "enum" => Token::Enum(loc),
            "typedef" => Token::Typedef(loc),
            _ if self.dialect == Dialect::Cpp => match ident.as_str() {
                "nullptr" => Token::Null(loc),
                "true" => Token::IntLiteral(1, loc),
                "false" => Token::IntLiteral(0, loc),
                "class" => Token::Class(loc),
                "template" => Token::Template(loc),
                "typename" => Token::Typename(loc),
                "namespace" => Token::Namespace(loc),
                "using" => Token::Using(loc),
                "new" => Token::New(loc),
                "delete" => Token::Delete(loc),
                "try" => Token::Try(loc),
                "catch" => Token::Catch(loc),
                "throw" => Token::Throw(loc),
                _ => Token::Ident(ident, loc),
            },
            _ => Token::Ident(ident, loc),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = *self.input.get(self.position)?;
        self.position += 1;

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(ch)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<Token> {
        Lexer::new(src, Dialect::C).tokenize().unwrap()
    }

    #[test]
    fn test_simple_tokens() {
        let tokens = lex("int main() { return 0; }");

        assert!(tokens[0].is_ident("int"));
        assert!(matches!(tokens[1], Token::Ident(ref s, _) if s == "main"));
        assert!(matches!(tokens[2], Token::LParen(_)));
        assert!(matches!(tokens[3], Token::RParen(_)));
        assert!(matches!(tokens[4], Token::LBrace(_)));
        assert!(matches!(tokens[5], Token::Return(_)));
        assert!(matches!(tokens[6], Token::IntLiteral(0, _)));
        assert!(matches!(tokens[7], Token::Semicolon(_)));
        assert!(matches!(tokens[8], Token::RBrace(_)));
        assert!(matches!(tokens[9], Token::Eof(_)));
    }

    #[test]
    fn test_operators_longest_match() {
        let tokens = lex("++ -- += <<= >>= -> :: && || a<<b");

        assert!(matches!(tokens[0], Token::PlusPlus(_)));
        assert!(matches!(tokens[1], Token::MinusMinus(_)));
        assert!(matches!(tokens[2], Token::PlusEq(_)));
        assert!(matches!(tokens[3], Token::LtLtEq(_)));
        assert!(matches!(tokens[4], Token::GtGtEq(_)));
        assert!(matches!(tokens[5], Token::Arrow(_)));
        assert!(matches!(tokens[6], Token::ColonColon(_)));
        assert!(matches!(tokens[7], Token::AndAnd(_)));
        assert!(matches!(tokens[8], Token::OrOr(_)));
        assert!(matches!(tokens[10], Token::LtLt(_)));
    }

    #[test]
    fn test_char_literal_escapes() {
        let tokens = lex(r"'a' '\n' '\x41' '\101' '\0' '\xff'");
        let values: Vec<i64> = tokens
            .iter()
            .filter_map(|t| match t {
                Token::CharLiteral(v, _) => Some(*v),
                _ => None,
            })
            .collect();
        assert_eq!(values, vec![97, 10, 65, 65, 0, -1]);
    }

    #[test]
    fn test_numeric_literals() {
        let tokens = lex("42 0x1F 017 3.5 1e3 2.5f 10UL .5");
        assert!(matches!(tokens[0], Token::IntLiteral(42, _)));
        assert!(matches!(tokens[1], Token::IntLiteral(31, _)));
        assert!(matches!(tokens[2], Token::IntLiteral(15, _)));
        assert!(matches!(tokens[3], Token::FloatLiteral(v, _) if v == 3.5));
        assert!(matches!(tokens[4], Token::FloatLiteral(v, _) if v == 1000.0));
        assert!(matches!(tokens[5], Token::FloatLiteral(v, _) if v == 2.5));
        assert!(matches!(tokens[6], Token::IntLiteral(10, _)));
        assert!(matches!(tokens[7], Token::FloatLiteral(v, _) if v == 0.5));
    }

    #[test]
    fn test_string_literal() {
        let tokens = lex(r#""hello\nworld\t\"q\"""#);
        match &tokens[0] {
            Token::StringLiteral(s, _) => assert_eq!(s, b"hello\nworld\t\"q\""),
            _ => panic!("Expected string literal"),
        }
    }

    #[test]
    fn test_cpp_keywords_only_in_cpp() {
        assert!(lex("new")[0].is_ident("new"));
        let tokens = Lexer::new("new true nullptr", Dialect::Cpp).tokenize().unwrap();
        assert!(matches!(tokens[0], Token::New(_)));
        assert!(matches!(tokens[1], Token::IntLiteral(1, _)));
        assert!(matches!(tokens[2], Token::Null(_)));
    }

    #[test]
    fn test_locations() {
        let tokens = lex("int x;\n  y = 1;");
        assert_eq!(tokens[3].location(), SourceLocation::new(2, 3));
    }
}
