//! Syntax gate
//!
//! Rejects constructs the inbuilt engines cannot emulate faithfully before
//! any parsing happens, pointing at the exact token. Working on tokens means
//! a keyword inside a string literal never trips the gate.

use super::lexer::Token;
use super::{CompileError, Dialect};

/// Qualifiers removed by [`strip_std`].
const QUALIFIERS: &[&str] = &["std", "ios", "ios_base", "string"];

/// Library calls that are refused in both dialects.
const REJECTED_CALLS: &[&str] = &["gets", "fread", "fwrite", "system"];

pub fn check(tokens: &[Token], dialect: Dialect) -> Result<(), CompileError> {
    let language = dialect.language_name();
    for (index, token) in tokens.iter().enumerate() {
        let construct = match token {
            Token::Struct(_) => "'struct'",
            Token::Union(_) => "'union'",
            Token::Enum(_) => "'enum'",
            Token::Typedef(_) => "'typedef'",
            Token::Goto(_) => "'goto'",
            Token::Arrow(_) => "Pointer member access ('->')",
            Token::Class(_) => "'class'",
            Token::Template(_) => "'template'",
            Token::Typename(_) => "'typename'",
            Token::New(_) | Token::Delete(_) => "'new'/'delete'",
            Token::Try(_) | Token::Catch(_) | Token::Throw(_) => "Exception handling",
            Token::Namespace(_) if !is_using_namespace_std(tokens, index) => "A custom namespace",
            Token::Ident(name, _)
                if REJECTED_CALLS.contains(&name.as_str())
                    && matches!(tokens.get(index + 1), Some(Token::LParen(_))) =>
            {
                return Err(CompileError::new(
                    format!("'{name}' is not supported by the inbuilt {language} engine"),
                    token.location(),
                ));
            }
            _ => continue,
        };

        return Err(CompileError::new(
            format!("{construct} is not supported by the inbuilt {language} engine"),
            token.location(),
        ));
    }
    Ok(())
}

/// `using namespace std;` with `namespace` at `index`.
fn is_using_namespace_std(tokens: &[Token], index: usize) -> bool {
    index > 0
        && matches!(tokens[index - 1], Token::Using(_))
        && tokens.get(index + 1).is_some_and(|t| t.is_ident("std"))
        && matches!(tokens.get(index + 2), Some(Token::Semicolon(_)))
}

/// Drop `std::` qualifiers, `using namespace std;` and `using std::x;`.
/// `ios::`/`ios_base::`/`string::` qualifiers are dropped too so that
/// `ios::sync_with_stdio(false)` becomes a plain call and `string::npos` a
/// builtin constant.
pub fn strip_std(tokens: Vec<Token>) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let is_qualifier = matches!(&tokens[i], Token::Ident(name, _) if QUALIFIERS.contains(&name.as_str()))
            && matches!(tokens.get(i + 1), Some(Token::ColonColon(_)));

        if matches!(tokens[i], Token::Using(_)) {
            // using namespace std;  |  using std::name;
            let end = tokens[i..]
                .iter()
                .position(|t| matches!(t, Token::Semicolon(_) | Token::Eof(_)))
                .map(|p| i + p);
            if let Some(end) = end {
                if matches!(tokens[end], Token::Semicolon(_)) {
                    i = end + 1;
                    continue;
                }
            }
            out.push(tokens[i].clone());
            i += 1;
        } else if is_qualifier {
            i += 2;
        } else {
            out.push(tokens[i].clone());
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::Lexer;

    fn gate(src: &str, dialect: Dialect) -> Result<(), CompileError> {
        let tokens = Lexer::new(src, dialect).tokenize().unwrap();
        check(&tokens, dialect)
    }

    #[test]
    fn test_struct_rejected_with_location() {
        let err = gate("int x;\n  struct P { int a; };", Dialect::C).unwrap_err();
        assert_eq!((err.location.line, err.location.column), (2, 3));
        assert!(err.message.contains("struct"));
    }

    #[test]
    fn test_keyword_inside_string_is_fine() {
        assert!(gate(r#"int main() { printf("struct goto ->"); }"#, Dialect::C).is_ok());
    }

    #[test]
    fn test_rejected_calls() {
        let err = gate("int main() { system(\"ls\"); }", Dialect::C).unwrap_err();
        assert!(err.message.contains("system"));
        assert!(gate("int main() { int gets = 1; }", Dialect::C).is_ok());
    }

    #[test]
    fn test_cpp_namespace_rules() {
        assert!(gate("using namespace std; int main() {}", Dialect::Cpp).is_ok());
        assert!(gate("namespace foo { int x; }", Dialect::Cpp).is_err());
        assert!(gate("int main() { int *p = new int; }", Dialect::Cpp).is_err());
        assert!(gate("template <typename T> T id(T x) { return x; }", Dialect::Cpp).is_err());
        // In C these are ordinary identifiers.
        assert!(gate("int main() { int new = 1, class = 2; }", Dialect::C).is_ok());
    }

    #[test]
    fn test_strip_std() {
        let tokens = Lexer::new(
            "using namespace std; using std::cout; std::string s; std::cout << s;",
            Dialect::Cpp,
        )
        .tokenize()
        .unwrap();
        let stripped = strip_std(tokens);
        let names: Vec<String> = stripped
            .iter()
            .filter_map(|t| match t {
                Token::Ident(s, _) => Some(s.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["string", "s", "cout", "s"]);
        assert!(!stripped.iter().any(|t| matches!(t, Token::ColonColon(_) | Token::Using(_))));
    }
}
