//! `cin`/`cout`/`cerr` emulation
//!
//! Insertion chains arrive as one [`AstNode::StreamWrite`] node whose items
//! carry the static type hint of each operand; extraction chains arrive as
//! [`AstNode::StreamRead`]. `cout` and `cerr` share the program output.

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::files::STDIN;
use crate::interpreter::format::{format_fixed, format_general, parse_float_prefix, parse_int_prefix};
use crate::memory::value::{Place, Value};
use crate::parser::ast::{AstNode, SourceLocation, StdStream, StreamItem, TypeHint};

/// Formatting and error state shared by the standard streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamState {
    pub precision: usize,
    pub fixed: bool,
    /// Field width for the next inserted value only.
    pub width: usize,
    pub cin_failed: bool,
}

impl Default for StreamState {
    fn default() -> Self {
        StreamState {
            precision: 6,
            fixed: false,
            width: 0,
            cin_failed: false,
        }
    }
}

impl StreamState {
    /// Text `cout << value` produces.
    pub fn render(&self, value: &Value, hint: TypeHint) -> Vec<u8> {
        match value {
            Value::Int(n) => match hint {
                TypeHint::Char => vec![*n as u8],
                _ => n.to_string().into_bytes(),
            },
            Value::Float(f) => {
                let text = if !f.is_finite() {
                    if f.is_nan() {
                        "nan".to_string()
                    } else if *f < 0.0 {
                        "-inf".to_string()
                    } else {
                        "inf".to_string()
                    }
                } else if self.fixed {
                    format_fixed(*f, self.precision)
                } else {
                    let text = format_general(f.abs(), self.precision, false, false);
                    if f.is_sign_negative() && *f != 0.0 {
                        format!("-{text}")
                    } else {
                        text
                    }
                };
                text.into_bytes()
            }
            Value::Str(bytes) => bytes.clone(),
            Value::Null => b"0".to_vec(),
            Value::Void => Vec::new(),
            other => format!("0x{:x}", other.address()).into_bytes(),
        }
    }
}

impl Interpreter {
    /// A width or precision argument, clamped to one past the output cap.
    fn field_arg(&mut self, expr: &AstNode, location: SourceLocation) -> Result<usize, RuntimeError> {
        let n = self.int_arg(expr, location)?.max(0);
        Ok(usize::try_from(n).unwrap_or(usize::MAX).min(self.output.cap().saturating_add(1)))
    }

    pub(crate) fn stream_write(
        &mut self,
        _stream: StdStream,
        items: &[StreamItem],
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        for item in items {
            match item {
                StreamItem::Value { expr, hint } => {
                    let value = self.evaluate_expr(expr)?;
                    let mut bytes = match &value {
                        // char* prints as text
                        Value::Ptr(ptr) if *hint == TypeHint::String || ptr.buf.borrow().elem.is_char() => {
                            self.c_string(&value, location)?
                        }
                        _ => self.stream.render(&value, *hint),
                    };
                    let width = std::mem::take(&mut self.stream.width);
                    if bytes.len() < width {
                        let mut padded = vec![b' '; width - bytes.len()];
                        padded.append(&mut bytes);
                        bytes = padded;
                    }
                    self.emit(&bytes)?;
                }
                StreamItem::Endl => self.emit(b"\n")?,
                StreamItem::Fixed => self.stream.fixed = true,
                StreamItem::SetPrecision(expr) => {
                    self.stream.precision = self.field_arg(expr, location)?;
                }
                StreamItem::SetWidth(expr) => {
                    self.stream.width = self.field_arg(expr, location)?;
                }
            }
        }
        Ok(Value::Int(1))
    }

    fn skip_input_whitespace(&mut self) {
        let skip = self
            .files
            .remaining(STDIN)
            .iter()
            .take_while(|b| b.is_ascii_whitespace())
            .count();
        self.files.advance(STDIN, skip, false);
    }

    /// `cin >> a >> b`. Evaluates to the stream's state, so it works as a
    /// loop condition.
    pub(crate) fn stream_read(
        &mut self,
        targets: &[(AstNode, TypeHint)],
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        for (target, hint) in targets {
            if self.stream.cin_failed {
                break;
            }
            let place = self.place_of(target)?;
            self.skip_input_whitespace();
            if self.files.remaining(STDIN).is_empty() {
                self.files.advance(STDIN, 0, true);
                self.stream.cin_failed = true;
                break;
            }

            let hint = match hint {
                TypeHint::Auto => match self.read_place(&place, location)? {
                    Value::Float(_) => TypeHint::Double,
                    Value::Str(_) | Value::Ptr(_) => TypeHint::String,
                    _ => TypeHint::Int,
                },
                other => *other,
            };

            let input = self.files.remaining(STDIN);
            let (value, used) = match hint {
                TypeHint::Int | TypeHint::Bool => {
                    let (n, used) = parse_int_prefix(input, 10);
                    (Value::Int(n), used)
                }
                TypeHint::Double => {
                    let (f, used) = parse_float_prefix(input);
                    (Value::Float(f), used)
                }
                TypeHint::Char => (Value::Int(input[0] as i8 as i64), 1),
                TypeHint::String | TypeHint::Auto => {
                    let used = input.iter().take_while(|b| !b.is_ascii_whitespace()).count();
                    (Value::Str(input[..used].to_vec()), used)
                }
            };
            if used == 0 {
                self.stream.cin_failed = true;
                self.write_place(&place, Value::Int(0), location)?;
                break;
            }
            self.files.advance(STDIN, used, false);
            self.store_read(&place, value, location)?;
        }
        Ok(Value::bool(!self.stream.cin_failed))
    }

    /// Store an extracted value; text goes into a `std::string` or a `char`
    /// array.
    fn store_read(&mut self, place: &Place, value: Value, location: SourceLocation) -> Result<(), RuntimeError> {
        if let Value::Str(text) = &value {
            if !self.holds_text(place) {
                if let Value::Ptr(_) = self.read_place(place, location)? {
                    let dest = self.read_place(place, location)?;
                    return self.write_c_string(&dest, text, location);
                }
            }
        }
        self.write_place(place, value, location).map(|_| ())
    }

    /// `getline(cin, s[, delim])`
    pub(crate) fn read_line(
        &mut self,
        target: &AstNode,
        delimiter: Option<&AstNode>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let delimiter = match delimiter {
            Some(expr) => self.int_arg(expr, location)? as u8,
            None => b'\n',
        };
        let place = self.place_of(target)?;
        if self.stream.cin_failed {
            return Ok(Value::bool(false));
        }

        let input = self.files.remaining(STDIN);
        if input.is_empty() {
            self.files.advance(STDIN, 0, true);
            self.stream.cin_failed = true;
            self.write_place(&place, Value::Str(Vec::new()), location)?;
            return Ok(Value::bool(false));
        }
        let (line, used) = match input.iter().position(|b| *b == delimiter) {
            Some(i) => (input[..i].to_vec(), i + 1),
            None => (input.to_vec(), input.len()),
        };
        self.files.advance(STDIN, used, false);
        self.write_place(&place, Value::Str(line), location)?;
        Ok(Value::bool(true))
    }

    /// `cin.get()`, `cout.precision(n)` and the other member functions of
    /// the standard streams.
    pub(crate) fn stream_method(
        &mut self,
        stream: &str,
        method: &str,
        args: &[AstNode],
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let value = match (stream, method) {
            ("cin", "ignore") => {
                let count = match args.first() {
                    Some(n) => self.int_arg(n, location)?,
                    None => 1,
                };
                let delimiter = match args.get(1) {
                    Some(d) => Some(self.int_arg(d, location)? as u8),
                    None => None,
                };
                let input = self.files.remaining(STDIN);
                let limit = if count < 0 { input.len() } else { (count as usize).min(input.len()) };
                let used = match delimiter.and_then(|d| input[..limit].iter().position(|b| *b == d)) {
                    Some(i) => i + 1,
                    None => limit,
                };
                self.files.advance(STDIN, used, false);
                Value::Int(1)
            }
            ("cin", "get") => match args.first() {
                None => Value::Int(self.files.read_byte(STDIN).map_or(-1, i64::from)),
                Some(target) => {
                    let place = self.place_of(target)?;
                    match self.files.read_byte(STDIN) {
                        Some(b) => {
                            self.write_place(&place, Value::Int(b as i8 as i64), location)?;
                        }
                        None => self.stream.cin_failed = true,
                    }
                    Value::bool(!self.stream.cin_failed)
                }
            },
            ("cin", "peek") => Value::Int(self.files.peek_byte(STDIN).map_or(-1, i64::from)),
            ("cin", "eof") => Value::bool(self.files.eof(STDIN)),
            ("cin", "fail") => Value::bool(self.stream.cin_failed),
            ("cin", "good") => Value::bool(!self.stream.cin_failed && !self.files.eof(STDIN)),
            ("cin", "clear") => {
                self.stream.cin_failed = false;
                Value::Void
            }
            ("cin", "tie") | ("cout", "flush") | ("cerr", "flush") => Value::Int(1),
            ("cout" | "cerr", "precision") => {
                let old = self.stream.precision as i64;
                if let Some(n) = args.first() {
                    self.stream.precision = self.field_arg(n, location)?;
                }
                Value::Int(old)
            }
            ("cout" | "cerr", "width") => {
                let old = self.stream.width as i64;
                if let Some(n) = args.first() {
                    self.stream.width = self.field_arg(n, location)?;
                }
                Value::Int(old)
            }
            ("cout" | "cerr", "put") => {
                let c = match args.first() {
                    Some(c) => self.int_arg(c, location)? as u8,
                    None => {
                        return Err(RuntimeError::ArgumentCountMismatch {
                            function: "put".to_string(),
                            expected: 1,
                            got: 0,
                            location,
                        })
                    }
                };
                self.emit(&[c])?;
                Value::Int(1)
            }
            _ => {
                return Err(RuntimeError::Unsupported {
                    message: format!("{stream}.{method}()"),
                    location,
                })
            }
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(state: &StreamState, value: Value, hint: TypeHint) -> String {
        String::from_utf8(state.render(&value, hint)).unwrap()
    }

    #[test]
    fn test_default_float_rendering() {
        let state = StreamState::default();
        assert_eq!(render(&state, Value::Float(3.14159265), TypeHint::Double), "3.14159");
        assert_eq!(render(&state, Value::Float(2.0), TypeHint::Double), "2");
        assert_eq!(render(&state, Value::Float(-0.5), TypeHint::Double), "-0.5");
        assert_eq!(render(&state, Value::Float(1e20), TypeHint::Double), "1e+20");
    }

    #[test]
    fn test_fixed_and_precision() {
        let state = StreamState {
            fixed: true,
            precision: 2,
            ..StreamState::default()
        };
        assert_eq!(render(&state, Value::Float(3.14159), TypeHint::Double), "3.14");
        assert_eq!(render(&state, Value::Float(2.0), TypeHint::Double), "2.00");
    }

    #[test]
    fn test_char_and_int_hints() {
        let state = StreamState::default();
        assert_eq!(render(&state, Value::Int(65), TypeHint::Char), "A");
        assert_eq!(render(&state, Value::Int(65), TypeHint::Int), "65");
        assert_eq!(render(&state, Value::Int(1), TypeHint::Bool), "1");
        assert_eq!(render(&state, Value::Str(b"hi".to_vec()), TypeHint::String), "hi");
    }
}
