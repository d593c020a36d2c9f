//! `printf` and `scanf` format engines
//!
//! [`format`] renders a C format string, pulling arguments lazily through a
//! [`FormatSource`] so a conversion decides how its argument is read.
//! [`scan`] is a pure `scanf` matcher over a byte slice; callers store the
//! returned values and advance their input by [`ScanResult::consumed`].
//!
//! Supported conversions: `d i u x X o c s f F e E g G p %`, with flags
//! (`- + space # 0`), width and precision (including `*`) and the usual
//! length modifiers. `scanf` additionally supports `[set]` and assignment
//! suppression.

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::memory::value::{Place, Value};
use crate::parser::ast::{AstNode, ScanSource, SourceLocation};

/// Where `printf` conversions take their arguments from.
pub(crate) trait FormatSource {
    fn next_int(&mut self) -> Result<i64, String>;
    fn next_float(&mut self) -> Result<f64, String>;
    /// `None` for a null pointer.
    fn next_text(&mut self) -> Result<Option<Vec<u8>>, String>;
    /// `None` for a null pointer.
    fn next_address(&mut self) -> Result<Option<usize>, String>;
}

#[derive(Debug, Default, Clone, Copy)]
struct Spec {
    left: bool,
    plus: bool,
    space: bool,
    alt: bool,
    zero: bool,
    width: usize,
    precision: Option<usize>,
    length: Length,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Length {
    #[default]
    Default,
    Char,
    Short,
    Long,
}

/// Render `fmt` with arguments from `args`.
///
/// Field widths and precisions are clamped to `limit + 1` and rendering stops
/// once the output passes `limit` bytes, so a caller can compare the result
/// against its own cap without ever allocating an unbounded field.
pub(crate) fn format(fmt: &[u8], args: &mut dyn FormatSource, limit: usize) -> Result<Vec<u8>, String> {
    let bound = limit.saturating_add(1);
    let mut out = Vec::with_capacity(fmt.len().min(bound));
    let mut i = 0;
    while i < fmt.len() && out.len() <= limit {
        let b = fmt[i];
        i += 1;
        if b != b'%' {
            out.push(b);
            continue;
        }
        if i >= fmt.len() {
            out.push(b'%');
            break;
        }

        let mut spec = Spec::default();
        while let Some(&flag) = fmt.get(i) {
            match flag {
                b'-' => spec.left = true,
                b'+' => spec.plus = true,
                b' ' => spec.space = true,
                b'#' => spec.alt = true,
                b'0' => spec.zero = true,
                _ => break,
            }
            i += 1;
        }

        if fmt.get(i) == Some(&b'*') {
            i += 1;
            let w = args.next_int()?;
            if w < 0 {
                spec.left = true;
            }
            spec.width = usize::try_from(w.unsigned_abs()).unwrap_or(usize::MAX);
        } else {
            spec.width = read_number(fmt, &mut i);
        }
        spec.width = spec.width.min(bound);

        if fmt.get(i) == Some(&b'.') {
            i += 1;
            if fmt.get(i) == Some(&b'*') {
                i += 1;
                let p = args.next_int()?;
                spec.precision = (p >= 0).then_some(p as usize);
            } else {
                spec.precision = Some(read_number(fmt, &mut i));
            }
            spec.precision = spec.precision.map(|p| p.min(bound));
        }

        loop {
            match fmt.get(i) {
                Some(b'h') => {
                    spec.length = if spec.length == Length::Short {
                        Length::Char
                    } else {
                        Length::Short
                    };
                }
                Some(b'l' | b'L' | b'q' | b'j' | b'z' | b't') => spec.length = Length::Long,
                _ => break,
            }
            i += 1;
        }

        let Some(&conv) = fmt.get(i) else {
            return Err("incomplete conversion at end of format".to_string());
        };
        i += 1;

        let body: Vec<u8> = match conv {
            b'%' => {
                out.push(b'%');
                continue;
            }
            b'd' | b'i' => {
                let n = match spec.length {
                    Length::Default => args.next_int()? as i32 as i64,
                    Length::Short => args.next_int()? as i16 as i64,
                    Length::Char => args.next_int()? as i8 as i64,
                    Length::Long => args.next_int()?,
                };
                let sign = if n < 0 {
                    "-"
                } else if spec.plus {
                    "+"
                } else if spec.space {
                    " "
                } else {
                    ""
                };
                let digits = int_digits(n.unsigned_abs().to_string(), spec.precision);
                pad_number(sign, &digits, &spec)
            }
            b'u' | b'x' | b'X' | b'o' => {
                let raw = args.next_int()?;
                let n = match spec.length {
                    Length::Default => raw as u32 as u64,
                    Length::Short => raw as u16 as u64,
                    Length::Char => raw as u8 as u64,
                    Length::Long => raw as u64,
                };
                let text = match conv {
                    b'u' => n.to_string(),
                    b'x' => format!("{n:x}"),
                    b'X' => format!("{n:X}"),
                    _ => format!("{n:o}"),
                };
                let mut digits = int_digits(text, spec.precision);
                if spec.alt && conv == b'o' && !digits.starts_with('0') {
                    digits.insert(0, '0');
                }
                let prefix = match conv {
                    b'x' if spec.alt && n != 0 => "0x",
                    b'X' if spec.alt && n != 0 => "0X",
                    _ => "",
                };
                pad_number(prefix, &digits, &spec)
            }
            b'c' => pad(vec![args.next_int()? as u8], &spec),
            b's' => {
                let mut text = args.next_text()?.unwrap_or_else(|| b"(null)".to_vec());
                if let Some(p) = spec.precision {
                    text.truncate(p);
                }
                pad(text, &spec)
            }
            b'p' => {
                let text = match args.next_address()? {
                    Some(addr) => format!("0x{addr:x}"),
                    None => "(nil)".to_string(),
                };
                pad(text.into_bytes(), &spec)
            }
            b'f' | b'F' | b'e' | b'E' | b'g' | b'G' => {
                let v = args.next_float()?;
                let upper = conv.is_ascii_uppercase();
                let precision = spec.precision.unwrap_or(6);
                let sign = if v.is_sign_negative() && !v.is_nan() {
                    "-"
                } else if spec.plus {
                    "+"
                } else if spec.space {
                    " "
                } else {
                    ""
                };
                let magnitude = v.abs();
                let mut digits = if !v.is_finite() {
                    let word = if v.is_nan() { "nan" } else { "inf" };
                    if upper {
                        word.to_ascii_uppercase()
                    } else {
                        word.to_string()
                    }
                } else {
                    match conv {
                        b'f' | b'F' => format_fixed(magnitude, precision),
                        b'e' | b'E' => format_exp(magnitude, precision, upper),
                        _ => format_general(magnitude, precision, spec.alt, upper),
                    }
                };
                if spec.alt && !digits.contains('.') && v.is_finite() && matches!(conv, b'f' | b'F') {
                    digits.push('.');
                }
                let mut spec = spec;
                if !v.is_finite() {
                    spec.zero = false;
                }
                spec.precision = None;
                pad_number(sign, &digits, &spec)
            }
            b'n' => return Err("%n is not supported".to_string()),
            other => return Err(format!("unknown conversion '%{}'", other as char)),
        };
        out.extend_from_slice(&body);
    }
    Ok(out)
}

fn read_number(fmt: &[u8], i: &mut usize) -> usize {
    let mut n = 0usize;
    while let Some(d) = fmt.get(*i).filter(|b| b.is_ascii_digit()) {
        n = n.saturating_mul(10).saturating_add((d - b'0') as usize);
        *i += 1;
    }
    n
}

/// Apply an integer precision (minimum digit count).
fn int_digits(digits: String, precision: Option<usize>) -> String {
    match precision {
        Some(0) if digits == "0" => String::new(),
        Some(p) if digits.len() < p => format!("{}{}", "0".repeat(p - digits.len()), digits),
        _ => digits,
    }
}

/// Pad a number to the field width, placing zero padding after the sign.
fn pad_number(sign: &str, digits: &str, spec: &Spec) -> Vec<u8> {
    let len = sign.len() + digits.len();
    if len >= spec.width {
        return format!("{sign}{digits}").into_bytes();
    }
    let fill = spec.width - len;
    if spec.left {
        format!("{sign}{digits}{}", " ".repeat(fill)).into_bytes()
    } else if spec.zero && spec.precision.is_none() {
        format!("{sign}{}{digits}", "0".repeat(fill)).into_bytes()
    } else {
        format!("{}{sign}{digits}", " ".repeat(fill)).into_bytes()
    }
}

fn pad(text: Vec<u8>, spec: &Spec) -> Vec<u8> {
    if text.len() >= spec.width {
        return text;
    }
    let fill = vec![b' '; spec.width - text.len()];
    if spec.left {
        [text, fill].concat()
    } else {
        [fill, text].concat()
    }
}

/// `%.Nf`
pub fn format_fixed(v: f64, precision: usize) -> String {
    format!("{v:.precision$}")
}

/// `%.Ne`, with a sign and at least two exponent digits.
pub fn format_exp(v: f64, precision: usize, upper: bool) -> String {
    let text = format!("{v:.precision$e}");
    let (mantissa, exp) = text.split_once('e').unwrap_or((&text, "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let e = if upper { 'E' } else { 'e' };
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{mantissa}{e}{sign}{:02}", exp.unsigned_abs())
}

/// `%.Ng`: the shorter of fixed and exponent notation, trailing zeros removed
/// unless `alt` is set.
pub fn format_general(v: f64, precision: usize, alt: bool, upper: bool) -> String {
    let p = precision.max(1);
    if v == 0.0 {
        return if alt {
            format!("{:.*}", p - 1, 0.0)
        } else {
            "0".to_string()
        };
    }
    let exp_form = format_exp(v, p - 1, upper);
    let exponent: i32 = exp_form
        .rsplit_once(['e', 'E'])
        .and_then(|(_, e)| e.parse().ok())
        .unwrap_or(0);

    if exponent >= -4 && exponent < p as i32 {
        let decimals = (p as i32 - 1 - exponent).max(0) as usize;
        let fixed = format_fixed(v, decimals);
        if alt {
            fixed
        } else {
            strip_zeros(&fixed)
        }
    } else if alt {
        exp_form
    } else {
        let split = exp_form.find(['e', 'E']).unwrap_or(exp_form.len());
        let (mantissa, exp) = exp_form.split_at(split);
        format!("{}{}", strip_zeros(mantissa), exp)
    }
}

fn strip_zeros(text: &str) -> String {
    if !text.contains('.') {
        return text.to_string();
    }
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

// ===== scanf =====

/// One converted `scanf` field.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Scanned {
    Int(i64),
    Float(f64),
    /// `%s` and `%[`: stored with a terminating NUL
    Text(Vec<u8>),
    /// `%c`: stored as raw characters
    Chars(Vec<u8>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ScanResult {
    pub values: Vec<Scanned>,
    /// Input bytes consumed.
    pub consumed: usize,
    /// Input ran out before the format was satisfied.
    pub input_failure: bool,
}

impl ScanResult {
    /// `scanf` return value: assignments made, or `EOF` when input ran out
    /// before the first conversion.
    pub fn return_value(&self) -> i64 {
        if self.values.is_empty() && self.input_failure {
            -1
        } else {
            self.values.len() as i64
        }
    }
}

/// Match `fmt` against `input`.
pub(crate) fn scan(fmt: &[u8], input: &[u8]) -> ScanResult {
    let mut result = ScanResult::default();
    let mut pos = 0usize;
    let mut i = 0usize;

    while i < fmt.len() {
        let f = fmt[i];
        if f.is_ascii_whitespace() {
            while input.get(pos).is_some_and(u8::is_ascii_whitespace) {
                pos += 1;
            }
            i += 1;
            continue;
        }
        if f != b'%' {
            match input.get(pos) {
                Some(&b) if b == f => {
                    pos += 1;
                    i += 1;
                    continue;
                }
                Some(_) => break,
                None => {
                    result.input_failure = true;
                    break;
                }
            }
        }

        i += 1;
        let suppress = fmt.get(i) == Some(&b'*');
        if suppress {
            i += 1;
        }
        let width = match read_number(fmt, &mut i) {
            0 => None,
            w => Some(w),
        };
        while matches!(fmt.get(i), Some(b'h' | b'l' | b'L' | b'q' | b'j' | b'z' | b't')) {
            i += 1;
        }
        let Some(&conv) = fmt.get(i) else { break };
        i += 1;

        if conv != b'c' && conv != b'[' && conv != b'n' {
            while input.get(pos).is_some_and(u8::is_ascii_whitespace) {
                pos += 1;
            }
        }
        if conv == b'%' {
            if input.get(pos) == Some(&b'%') {
                pos += 1;
                continue;
            }
            result.input_failure = pos >= input.len();
            break;
        }
        if conv != b'n' && pos >= input.len() {
            result.input_failure = true;
            break;
        }

        let limit = width.map_or(input.len(), |w| (pos + w).min(input.len()));
        let field = &input[pos..limit];
        let (value, used) = match conv {
            b'd' | b'u' => {
                let (n, used) = parse_int_prefix(field, 10);
                (Scanned::Int(n), used)
            }
            b'i' => {
                let (n, used) = parse_int_prefix(field, 0);
                (Scanned::Int(n), used)
            }
            b'x' | b'X' => {
                let (n, used) = parse_int_prefix(field, 16);
                (Scanned::Int(n), used)
            }
            b'o' => {
                let (n, used) = parse_int_prefix(field, 8);
                (Scanned::Int(n), used)
            }
            b'f' | b'F' | b'e' | b'E' | b'g' | b'G' | b'a' => {
                let (v, used) = parse_float_prefix(field);
                (Scanned::Float(v), used)
            }
            b's' => {
                let used = field.iter().take_while(|b| !b.is_ascii_whitespace()).count();
                (Scanned::Text(field[..used].to_vec()), used)
            }
            b'c' => {
                let want = width.unwrap_or(1);
                let used = want.min(input.len() - pos);
                (Scanned::Chars(input[pos..pos + used].to_vec()), used)
            }
            b'[' => {
                let Some((set, end)) = parse_set(fmt, i) else { break };
                i = end;
                let used = field.iter().take_while(|b| set.matches(**b)).count();
                (Scanned::Text(field[..used].to_vec()), used)
            }
            b'n' => {
                if !suppress {
                    result.values.push(Scanned::Int(pos as i64));
                }
                continue;
            }
            _ => break,
        };
        if used == 0 {
            break;
        }
        pos += used;
        if !suppress {
            result.values.push(value);
        }
    }

    result.consumed = pos;
    result
}

struct ScanSet {
    negated: bool,
    members: [bool; 256],
}

impl ScanSet {
    fn matches(&self, b: u8) -> bool {
        self.members[b as usize] != self.negated
    }
}

/// Parse a `%[...]` set starting just after `[`; returns the set and the
/// index after `]`.
fn parse_set(fmt: &[u8], mut i: usize) -> Option<(ScanSet, usize)> {
    let mut set = ScanSet {
        negated: false,
        members: [false; 256],
    };
    if fmt.get(i) == Some(&b'^') {
        set.negated = true;
        i += 1;
    }
    let start = i;
    loop {
        let b = *fmt.get(i)?;
        if b == b']' && i > start {
            return Some((set, i + 1));
        }
        if fmt.get(i + 1) == Some(&b'-') && fmt.get(i + 2).is_some_and(|e| *e != b']') {
            let end = fmt[i + 2];
            for c in b..=end {
                set.members[c as usize] = true;
            }
            i += 3;
        } else {
            set.members[b as usize] = true;
            i += 1;
        }
    }
}

/// `strtol`-style integer prefix. `base` 0 detects `0x` and leading `0`.
/// Returns the value and the bytes used (0 when nothing matched).
pub(crate) fn parse_int_prefix(text: &[u8], base: u32) -> (i64, usize) {
    let mut i = 0;
    while text.get(i).is_some_and(u8::is_ascii_whitespace) {
        i += 1;
    }
    let negative = match text.get(i) {
        Some(b'-') => {
            i += 1;
            true
        }
        Some(b'+') => {
            i += 1;
            false
        }
        _ => false,
    };

    let has_hex_prefix = text.get(i) == Some(&b'0')
        && matches!(text.get(i + 1), Some(b'x' | b'X'))
        && text.get(i + 2).is_some_and(u8::is_ascii_hexdigit);
    let mut base = base;
    if (base == 16 || base == 0) && has_hex_prefix {
        i += 2;
        base = 16;
    } else if base == 0 {
        base = if text.get(i) == Some(&b'0') { 8 } else { 10 };
    }

    let digits_start = i;
    let mut value: i64 = 0;
    while let Some(d) = text.get(i).and_then(|b| (*b as char).to_digit(base)) {
        value = value.wrapping_mul(base as i64).wrapping_add(d as i64);
        i += 1;
    }
    if i == digits_start {
        return (0, 0);
    }
    (if negative { value.wrapping_neg() } else { value }, i)
}

/// `strtod`-style float prefix, including `inf` and `nan`.
pub(crate) fn parse_float_prefix(text: &[u8]) -> (f64, usize) {
    let mut i = 0;
    while text.get(i).is_some_and(u8::is_ascii_whitespace) {
        i += 1;
    }
    let start = i;
    if matches!(text.get(i), Some(b'-' | b'+')) {
        i += 1;
    }

    let rest = text[i..].to_ascii_lowercase();
    for word in ["infinity", "inf", "nan"] {
        if rest.starts_with(word.as_bytes()) {
            let negative = text[start] == b'-';
            let v = if word == "nan" { f64::NAN } else { f64::INFINITY };
            return (if negative { -v } else { v }, i + word.len());
        }
    }

    let int_start = i;
    while text.get(i).is_some_and(u8::is_ascii_digit) {
        i += 1;
    }
    let mut digits = i - int_start;
    if text.get(i) == Some(&b'.') {
        let frac_start = i + 1;
        let mut j = frac_start;
        while text.get(j).is_some_and(u8::is_ascii_digit) {
            j += 1;
        }
        digits += j - frac_start;
        if digits > 0 {
            i = j;
        }
    }
    if digits == 0 {
        return (0.0, 0);
    }
    if matches!(text.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(text.get(j), Some(b'-' | b'+')) {
            j += 1;
        }
        let exp_start = j;
        while text.get(j).is_some_and(u8::is_ascii_digit) {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }

    let literal = String::from_utf8_lossy(&text[start..i]);
    (literal.parse().unwrap_or(0.0), i)
}

// ===== Interpreter glue =====

/// Evaluated call arguments feeding a [`format`] run.
struct ValueArgs<'a> {
    interp: &'a Interpreter,
    values: std::vec::IntoIter<Value>,
    location: SourceLocation,
}

impl ValueArgs<'_> {
    fn next(&mut self) -> Result<Value, String> {
        self.values
            .next()
            .ok_or_else(|| "not enough arguments for format string".to_string())
    }
}

impl FormatSource for ValueArgs<'_> {
    fn next_int(&mut self) -> Result<i64, String> {
        match self.next()? {
            Value::Int(n) => Ok(n),
            Value::Float(f) => Ok(f as i64),
            Value::Null => Ok(0),
            other => Ok(other.address() as i64),
        }
    }

    fn next_float(&mut self) -> Result<f64, String> {
        let value = self.next()?;
        value
            .as_float()
            .ok_or_else(|| format!("expected a floating-point argument, got {}", value.type_name()))
    }

    fn next_text(&mut self) -> Result<Option<Vec<u8>>, String> {
        match self.next()? {
            Value::Null => Ok(None),
            value => self
                .interp
                .c_string(&value, self.location)
                .map(Some)
                .map_err(|e| e.to_string()),
        }
    }

    fn next_address(&mut self) -> Result<Option<usize>, String> {
        match self.next()? {
            Value::Null => Ok(None),
            Value::Int(n) => Ok((n != 0).then_some(n as usize)),
            other => Ok(Some(other.address())),
        }
    }
}

impl Interpreter {
    /// Format `fmt` with the remaining call arguments, `printf` style.
    ///
    /// The result may run one field past `limit`; callers that cannot clip
    /// use [`Interpreter::format_bounded`].
    pub(crate) fn format_args(
        &mut self,
        fmt: &AstNode,
        args: &[AstNode],
        limit: usize,
        location: SourceLocation,
    ) -> Result<Vec<u8>, RuntimeError> {
        let fmt = self.evaluate_expr(fmt)?;
        let fmt = self.c_string(&fmt, location)?;
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.evaluate_expr(arg)?);
        }
        let mut source = ValueArgs {
            interp: self,
            values: values.into_iter(),
            location,
        };
        format(&fmt, &mut source, limit).map_err(|message| RuntimeError::InvalidFormat { message, location })
    }

    /// [`Interpreter::format_args`] into a buffer of at most `max_buffer_elems` bytes.
    pub(crate) fn format_bounded(
        &mut self,
        fmt: &AstNode,
        args: &[AstNode],
        location: SourceLocation,
    ) -> Result<Vec<u8>, RuntimeError> {
        let limit = self.max_buffer_elems;
        let bytes = self.format_args(fmt, args, limit, location)?;
        if bytes.len() > limit {
            return Err(RuntimeError::InvalidFormat {
                message: format!("formatted output exceeds {limit} bytes"),
                location,
            });
        }
        Ok(bytes)
    }

    /// Output bytes left before the program output cap.
    pub(crate) fn output_budget(&self) -> usize {
        self.output.cap().saturating_sub(self.output.len())
    }

    /// Run a lowered `scanf`/`fscanf`/`sscanf`.
    pub(crate) fn evaluate_scan(
        &mut self,
        source: &ScanSource,
        format: &AstNode,
        targets: &[AstNode],
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let fmt = self.evaluate_expr(format)?;
        let fmt = self.c_string(&fmt, location)?;

        let (result, handle) = match source {
            ScanSource::Stdin => (scan(&fmt, self.files.remaining(0)), Some(0)),
            ScanSource::File(file) => {
                let handle = self.file_handle(file, location)?;
                (scan(&fmt, self.files.remaining(handle)), Some(handle))
            }
            ScanSource::Text(text) => {
                let text = self.evaluate_expr(text)?;
                let text = self.c_string(&text, location)?;
                (scan(&fmt, &text), None)
            }
        };
        if let Some(handle) = handle {
            self.files.advance(handle, result.consumed, result.input_failure);
        }

        for (value, target) in result.values.iter().zip(targets) {
            self.store_scanned(target, value.clone(), location)?;
        }
        Ok(Value::Int(result.return_value()))
    }

    fn store_scanned(
        &mut self,
        target: &AstNode,
        value: Scanned,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let place = match target {
            AstNode::OutParam { target, .. } => self.place_of(target)?,
            other => {
                let pointer = self.evaluate_expr(other)?;
                self.element_place(pointer, 0, location)?
            }
        };
        match value {
            Scanned::Int(n) => self.write_place(&place, Value::Int(n), location).map(|_| ()),
            Scanned::Float(f) => self.write_place(&place, Value::Float(f), location).map(|_| ()),
            Scanned::Text(bytes) => self.store_text(&place, &bytes, true, location),
            Scanned::Chars(bytes) => self.store_text(&place, &bytes, false, location),
        }
    }

    /// Store scanned characters at `place`: into a `std::string`, into the
    /// array a pointer variable refers to, or element by element.
    fn store_text(
        &mut self,
        place: &Place,
        bytes: &[u8],
        terminate: bool,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        if self.holds_text(place) {
            return self.write_place(place, Value::Str(bytes.to_vec()), location).map(|_| ());
        }
        let start = match place {
            Place::Elem(ptr) => ptr.clone(),
            other => match self.read_place(other, location)? {
                Value::Ptr(ptr) => ptr,
                _ if !terminate && bytes.len() == 1 => {
                    return self
                        .write_place(other, Value::Int(bytes[0] as i8 as i64), location)
                        .map(|_| ())
                }
                other => {
                    return Err(RuntimeError::TypeError {
                        message: format!("cannot store text in {}", other.type_name()),
                        location,
                    })
                }
            },
        };
        for (i, b) in bytes.iter().enumerate() {
            let elem = Place::Elem(start.offset_by(i as i64));
            self.write_place(&elem, Value::Int(*b as i8 as i64), location)?;
        }
        if terminate {
            let end = Place::Elem(start.offset_by(bytes.len() as i64));
            self.write_place(&end, Value::Int(0), location)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    enum Arg {
        I(i64),
        F(f64),
        S(&'static str),
    }

    struct Args(std::vec::IntoIter<Arg>);

    impl FormatSource for Args {
        fn next_int(&mut self) -> Result<i64, String> {
            match self.0.next() {
                Some(Arg::I(n)) => Ok(n),
                _ => Err("int expected".into()),
            }
        }
        fn next_float(&mut self) -> Result<f64, String> {
            match self.0.next() {
                Some(Arg::F(f)) => Ok(f),
                Some(Arg::I(n)) => Ok(n as f64),
                _ => Err("float expected".into()),
            }
        }
        fn next_text(&mut self) -> Result<Option<Vec<u8>>, String> {
            match self.0.next() {
                Some(Arg::S(s)) => Ok(Some(s.as_bytes().to_vec())),
                _ => Ok(None),
            }
        }
        fn next_address(&mut self) -> Result<Option<usize>, String> {
            Ok(None)
        }
    }

    fn fmt(f: &str, args: Vec<Arg>) -> String {
        let mut args = Args(args.into_iter());
        String::from_utf8(format(f.as_bytes(), &mut args, 4096).unwrap()).unwrap()
    }

    #[test]
    fn test_integer_conversions() {
        assert_eq!(fmt("%d|%5d|%-5d|%05d", vec![Arg::I(42), Arg::I(42), Arg::I(42), Arg::I(-42)]), "42|   42|42   |-0042");
        assert_eq!(fmt("%x %X %#x %o", vec![Arg::I(255), Arg::I(255), Arg::I(255), Arg::I(8)]), "ff FF 0xff 10");
        assert_eq!(fmt("%u", vec![Arg::I(-1)]), "4294967295");
        assert_eq!(fmt("%lld", vec![Arg::I(i64::MIN)]), "-9223372036854775808");
        assert_eq!(fmt("%+d %.3d", vec![Arg::I(5), Arg::I(7)]), "+5 007");
    }

    #[test]
    fn test_float_conversions() {
        assert_eq!(fmt("%f", vec![Arg::F(3.14159)]), "3.141590");
        assert_eq!(fmt("%.2f", vec![Arg::F(2.675)]), "2.67");
        assert_eq!(fmt("%8.3f|", vec![Arg::F(-1.5)]), "  -1.500|");
        assert_eq!(fmt("%e", vec![Arg::F(12345.678)]), "1.234568e+04");
        assert_eq!(fmt("%g %g %g", vec![Arg::F(0.0001), Arg::F(100000.0), Arg::F(1e6)]), "0.0001 100000 1e+06");
        assert_eq!(fmt("%g", vec![Arg::F(2.5)]), "2.5");
        assert_eq!(fmt("%f", vec![Arg::F(f64::INFINITY)]), "inf");
    }

    #[test]
    fn test_text_conversions() {
        assert_eq!(fmt("[%s] [%5s] [%-5s] [%.2s]", vec![Arg::S("hi"), Arg::S("hi"), Arg::S("hi"), Arg::S("hello")]), "[hi] [   hi] [hi   ] [he]");
        assert_eq!(fmt("%c%c", vec![Arg::I(72), Arg::I(105)]), "Hi");
        assert_eq!(fmt("100%%", vec![]), "100%");
        assert_eq!(fmt("%*d", vec![Arg::I(4), Arg::I(7)]), "   7");
    }

    #[test]
    fn test_missing_argument_is_an_error() {
        let mut args = Args(Vec::new().into_iter());
        assert!(format(b"%d", &mut args, 4096).is_err());
    }

    #[test]
    fn test_huge_width_is_clamped_to_limit() {
        let mut args = Args(vec![Arg::I(1)].into_iter());
        let out = format(b"%1000000000000d\n", &mut args, 16).unwrap();
        assert_eq!(out.len(), 17);
        assert!(out.ends_with(b"1"));

        let mut args = Args(vec![Arg::I(i64::from(i32::MAX)), Arg::I(1), Arg::I(2)].into_iter());
        let out = format(b"%*d and %d", &mut args, 8).unwrap();
        assert_eq!(out.len(), 9);

        let mut args = Args(vec![Arg::F(1.0)].into_iter());
        let out = format(b"%.99999999999f", &mut args, 32).unwrap();
        assert_eq!(out.len(), 2 + 33);
        assert!(out.starts_with(b"1.000"));

        let mut args = Args(vec![Arg::S("abc")].into_iter());
        assert_eq!(format(b"%.99999999999s", &mut args, 8).unwrap(), b"abc");
    }

    #[test]
    fn test_scan_int_and_word() {
        let result = scan(b"%d %s", b"42 hello\n");
        assert_eq!(
            result.values,
            vec![Scanned::Int(42), Scanned::Text(b"hello".to_vec())]
        );
        assert_eq!(result.consumed, 8);
        assert_eq!(result.return_value(), 2);
    }

    #[test]
    fn test_scan_stops_early() {
        let result = scan(b"%d %d %d", b"1 2");
        assert_eq!(result.values, vec![Scanned::Int(1), Scanned::Int(2)]);
        assert_eq!(result.return_value(), 2);

        let result = scan(b"%d", b"   ");
        assert_eq!(result.return_value(), -1);

        let result = scan(b"%d", b"abc");
        assert_eq!(result.return_value(), 0);
        assert_eq!(result.consumed, 0);
    }

    #[test]
    fn test_scan_floats_chars_and_sets() {
        let result = scan(b"%lf,%c%[a-z]%*d%x", b"2.5e1,Zabc9 ff");
        assert_eq!(
            result.values,
            vec![
                Scanned::Float(25.0),
                Scanned::Chars(b"Z".to_vec()),
                Scanned::Text(b"abc".to_vec()),
                Scanned::Int(255),
            ]
        );
    }

    #[test]
    fn test_prefix_parsers() {
        assert_eq!(parse_int_prefix(b"  -123abc", 10), (-123, 6));
        assert_eq!(parse_int_prefix(b"0x1F", 0), (31, 4));
        assert_eq!(parse_int_prefix(b"017", 0), (15, 3));
        assert_eq!(parse_int_prefix(b"xyz", 10), (0, 0));
        assert_eq!(parse_float_prefix(b"3.5rest"), (3.5, 3));
        assert_eq!(parse_float_prefix(b"-.5"), (-0.5, 3));
        assert_eq!(parse_float_prefix(b"."), (0.0, 0));
    }
}
