//! Expression evaluation
//!
//! Adds `impl Interpreter` methods that evaluate expressions to [`Value`]s,
//! resolve assignable expressions to [`Place`]s, and build arrays.
//!
//! Pointer arithmetic moves a `(buffer, offset)` pair; subtracting two
//! pointers is only defined within one buffer.

use crate::interpreter::constants;
use crate::interpreter::engine::{Binding, Interpreter};
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::statements::is_assignable;
use crate::memory::buffer::Buffer;
use crate::memory::value::{Place, Pointer, Value};
use crate::parser::ast::*;
use crate::parser::Dialect;
use std::cmp::Ordering;

impl Interpreter {
    pub(crate) fn evaluate_expr(&mut self, expr: &AstNode) -> Result<Value, RuntimeError> {
        match expr {
            AstNode::IntLiteral(n, _) | AstNode::CharLiteral(n, _) => Ok(Value::Int(*n)),
            AstNode::FloatLiteral(f, _) => Ok(Value::Float(*f)),
            AstNode::StringLiteral(bytes, _) => {
                Ok(Value::Ptr(Pointer::new(Buffer::c_string(bytes).into_ref(), 0)))
            }
            AstNode::Null { .. } => Ok(Value::Null),
            AstNode::Variable(name, location) => self.evaluate_variable(name, *location),

            AstNode::BinaryOp {
                op: BinOp::And,
                left,
                right,
                ..
            } => Ok(Value::bool(
                self.evaluate_expr(left)?.is_truthy() && self.evaluate_expr(right)?.is_truthy(),
            )),
            AstNode::BinaryOp {
                op: BinOp::Or,
                left,
                right,
                ..
            } => Ok(Value::bool(
                self.evaluate_expr(left)?.is_truthy() || self.evaluate_expr(right)?.is_truthy(),
            )),
            AstNode::BinaryOp {
                op,
                left,
                right,
                location,
            } => {
                let l = self.evaluate_expr(left)?;
                let r = self.evaluate_expr(right)?;
                self.binary_op(*op, l, r, *location)
            }
            AstNode::UnaryOp {
                op,
                operand,
                location,
            } => self.evaluate_unary(*op, operand, *location),
            AstNode::TernaryOp {
                condition,
                true_expr,
                false_expr,
                ..
            } => {
                if self.evaluate_expr(condition)?.is_truthy() {
                    self.evaluate_expr(true_expr)
                } else {
                    self.evaluate_expr(false_expr)
                }
            }
            AstNode::Assignment { lhs, rhs, location } => {
                let value = self.evaluate_expr(rhs)?;
                let place = self.place_of(lhs)?;
                self.write_place(&place, value, *location)
            }
            AstNode::CompoundAssignment {
                lhs,
                op,
                rhs,
                location,
            } => {
                let place = self.place_of(lhs)?;
                let rhs = self.evaluate_expr(rhs)?;
                let current = self.read_place(&place, *location)?;
                let value = self.binary_op(*op, current, rhs, *location)?;
                self.write_place(&place, value, *location)
            }
            AstNode::Comma { left, right, .. } => {
                self.evaluate_expr(left)?;
                self.evaluate_expr(right)
            }
            AstNode::FunctionCall {
                name,
                args,
                location,
            } => self.evaluate_call(name, args, *location),
            AstNode::MethodCall {
                object,
                method,
                args,
                location,
            } => self.evaluate_method_call(object, method, args, *location),
            AstNode::ArrayAccess { location, .. } => {
                let place = self.place_of(expr)?;
                self.read_place(&place, *location)
            }
            AstNode::Cast {
                target_type,
                expr,
                location,
            } => {
                let value = self.evaluate_expr(expr)?;
                self.convert(value, target_type, *location)
            }
            AstNode::SizeofValue { expr, .. } => {
                let value = self.evaluate_expr(expr)?;
                Ok(Value::Int(sizeof_value(&value) as i64))
            }
            AstNode::SizeofType { target_type, .. } => Ok(Value::Int(target_type.size() as i64)),
            AstNode::SizeofExpr { expr, .. } => {
                let value = self.evaluate_expr(expr)?;
                Ok(Value::Int(sizeof_value(&value) as i64))
            }
            AstNode::ArrayNew {
                elem_type,
                dims,
                init,
                location,
            } => self.build_array(elem_type, dims, init.as_deref(), *location),
            AstNode::OutParam { target, .. } => match self.place_of(target)? {
                Place::Elem(ptr) => Ok(Value::Ptr(ptr)),
                place => Ok(Value::Ref(place)),
            },
            AstNode::Scan {
                source,
                format,
                targets,
                location,
            } => self.evaluate_scan(source, format, targets, *location),
            AstNode::StreamWrite {
                stream,
                items,
                location,
            } => self.stream_write(*stream, items, *location),
            AstNode::StreamRead { targets, location } => self.stream_read(targets, *location),
            AstNode::ReadLine {
                target,
                delimiter,
                location,
            } => self.read_line(target, delimiter.as_deref(), *location),
            AstNode::InitList { location, .. } => Err(RuntimeError::Unsupported {
                message: "brace initializer in this position".to_string(),
                location: *location,
            }),
            other => Err(RuntimeError::Unsupported {
                message: "statement used as an expression".to_string(),
                location: *other.location(),
            }),
        }
    }

    fn evaluate_variable(&mut self, name: &str, location: SourceLocation) -> Result<Value, RuntimeError> {
        if let Some(place) = self.lookup(name) {
            let place = place.clone();
            return self.read_place(&place, location);
        }
        if let Some(value) = constants::lookup(name, self.dialect) {
            return Ok(value);
        }
        match name {
            "cin" if self.dialect == Dialect::Cpp => {
                Ok(Value::bool(!self.stream.cin_failed))
            }
            "cout" | "cerr" if self.dialect == Dialect::Cpp => Ok(Value::Int(1)),
            _ if self.functions.contains_key(name) => Err(RuntimeError::Unsupported {
                message: format!("function pointer to '{name}'"),
                location,
            }),
            _ => Err(RuntimeError::UndefinedVariable {
                name: name.to_string(),
                location,
            }),
        }
    }

    /// Resolve an assignable expression to its storage.
    pub(crate) fn place_of(&mut self, expr: &AstNode) -> Result<Place, RuntimeError> {
        match expr {
            AstNode::Variable(name, location) => match self.lookup(name) {
                Some(place) => Ok(place.clone()),
                None if constants::lookup(name, self.dialect).is_some() => {
                    Err(RuntimeError::Unsupported {
                        message: format!("assignment to constant '{name}'"),
                        location: *location,
                    })
                }
                None => Err(RuntimeError::UndefinedVariable {
                    name: name.clone(),
                    location: *location,
                }),
            },
            AstNode::ArrayAccess {
                array,
                index,
                location,
            } => {
                let base = if is_assignable(array) {
                    let place = self.place_of(array)?;
                    if self.holds_text(&place) {
                        let index = self.index_value(index, *location)?;
                        if index < 0 {
                            return Err(RuntimeError::BufferOverrun {
                                index: index as isize,
                                size: self.with_text(&place, *location, |t| Ok(t.len()))?,
                                location: *location,
                            });
                        }
                        return Ok(Place::TextChar {
                            base: Box::new(place),
                            index: index as usize,
                        });
                    }
                    self.read_place(&place, *location)?
                } else {
                    self.evaluate_expr(array)?
                };
                let index = self.index_value(index, *location)?;
                self.element_place(base, index, *location)
            }
            AstNode::UnaryOp {
                op: UnOp::Deref,
                operand,
                location,
            } => {
                let value = self.evaluate_expr(operand)?;
                self.element_place(value, 0, *location)
            }
            AstNode::OutParam { target, .. } => self.place_of(target),
            other => Err(RuntimeError::Unsupported {
                message: "expression is not assignable".to_string(),
                location: *other.location(),
            }),
        }
    }

    fn index_value(&mut self, index: &AstNode, location: SourceLocation) -> Result<i64, RuntimeError> {
        let value = self.evaluate_expr(index)?;
        value.as_int().ok_or_else(|| RuntimeError::TypeError {
            message: format!("array index is a {}", value.type_name()),
            location,
        })
    }

    /// The place `base[index]` for a pointer-like base value.
    pub(crate) fn element_place(
        &self,
        base: Value,
        index: i64,
        location: SourceLocation,
    ) -> Result<Place, RuntimeError> {
        match base {
            Value::Ptr(ptr) => Ok(Place::Elem(ptr.offset_by(index))),
            Value::Ref(place) if index == 0 => Ok(place),
            Value::Ref(_) => Err(RuntimeError::Unsupported {
                message: "pointer arithmetic on the address of a scalar".to_string(),
                location,
            }),
            Value::Null => Err(RuntimeError::NullDereference { location }),
            Value::Str(text) => {
                let place = Place::slot(Value::Str(text), Type::new(BaseType::Str));
                Ok(Place::TextChar {
                    base: Box::new(place),
                    index: index.max(0) as usize,
                })
            }
            other => Err(RuntimeError::TypeError {
                message: format!("cannot dereference {}", other.type_name()),
                location,
            }),
        }
    }

    fn evaluate_unary(
        &mut self,
        op: UnOp,
        operand: &AstNode,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        match op {
            UnOp::Neg => match self.evaluate_expr(operand)? {
                Value::Int(n) => Ok(Value::Int(n.wrapping_neg())),
                Value::Float(f) => Ok(Value::Float(-f)),
                other => Err(self.operand_error("-", &other, location)),
            },
            UnOp::Plus => match self.evaluate_expr(operand)? {
                v @ (Value::Int(_) | Value::Float(_)) => Ok(v),
                other => Err(self.operand_error("+", &other, location)),
            },
            UnOp::Not => Ok(Value::bool(!self.evaluate_expr(operand)?.is_truthy())),
            UnOp::BitNot => match self.evaluate_expr(operand)? {
                Value::Int(n) => Ok(Value::Int(!n)),
                other => Err(self.operand_error("~", &other, location)),
            },
            UnOp::Deref => {
                let value = self.evaluate_expr(operand)?;
                let place = self.element_place(value, 0, location)?;
                self.read_place(&place, location)
            }
            UnOp::AddrOf => match operand {
                AstNode::UnaryOp {
                    op: UnOp::Deref,
                    operand,
                    ..
                } => self.evaluate_expr(operand),
                _ => match self.place_of(operand)? {
                    Place::Elem(ptr) => Ok(Value::Ptr(ptr)),
                    place => Ok(Value::Ref(place)),
                },
            },
            UnOp::PreInc | UnOp::PreDec | UnOp::PostInc | UnOp::PostDec => {
                let place = self.place_of(operand)?;
                let old = self.read_place(&place, location)?;
                let delta = if matches!(op, UnOp::PreInc | UnOp::PostInc) { 1 } else { -1 };
                let new = match &old {
                    Value::Int(n) => Value::Int(n.wrapping_add(delta)),
                    Value::Float(f) => Value::Float(f + delta as f64),
                    Value::Ptr(ptr) => Value::Ptr(ptr.offset_by(delta)),
                    other => return Err(self.operand_error("++/--", other, location)),
                };
                let stored = self.write_place(&place, new, location)?;
                Ok(if matches!(op, UnOp::PreInc | UnOp::PreDec) {
                    stored
                } else {
                    old
                })
            }
        }
    }

    fn operand_error(&self, op: &str, value: &Value, location: SourceLocation) -> RuntimeError {
        RuntimeError::TypeError {
            message: format!("invalid operand to '{op}': {}", value.type_name()),
            location,
        }
    }

    pub(crate) fn binary_op(
        &self,
        op: BinOp,
        l: Value,
        r: Value,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        match (&l, &r) {
            // std::string
            (Value::Str(_), _) | (_, Value::Str(_)) => self.string_op(op, l, r, location),

            // Pointer arithmetic
            (Value::Ptr(p), Value::Int(n)) if matches!(op, BinOp::Add | BinOp::Sub) => {
                let delta = if op == BinOp::Add { *n } else { n.wrapping_neg() };
                Ok(Value::Ptr(p.offset_by(delta)))
            }
            (Value::Int(n), Value::Ptr(p)) if op == BinOp::Add => Ok(Value::Ptr(p.offset_by(*n))),
            (Value::Ptr(a), Value::Ptr(b)) if op == BinOp::Sub => {
                if !a.same_buffer(b) {
                    return Err(RuntimeError::Unsupported {
                        message: "subtraction of pointers into different buffers".to_string(),
                        location,
                    });
                }
                Ok(Value::Int((a.offset - b.offset) as i64))
            }
            _ if l.is_pointer() || r.is_pointer() || matches!(l, Value::File(_)) || matches!(r, Value::File(_)) => {
                self.pointer_compare(op, &l, &r, location)
            }

            (Value::Float(_), _) | (_, Value::Float(_)) => {
                let (a, b) = match (l.as_float(), r.as_float()) {
                    (Some(a), Some(b)) => (a, b),
                    _ => return Err(self.operand_error(op_symbol(op), &l, location)),
                };
                float_op(op, a, b).ok_or_else(|| RuntimeError::TypeError {
                    message: format!("invalid operands to '{}' (floating point)", op_symbol(op)),
                    location,
                })
            }
            (Value::Int(a), Value::Int(b)) => int_op(op, *a, *b, location),
            _ => Err(RuntimeError::TypeError {
                message: format!(
                    "invalid operands to '{}': {} and {}",
                    op_symbol(op),
                    l.type_name(),
                    r.type_name()
                ),
                location,
            }),
        }
    }

    fn pointer_compare(
        &self,
        op: BinOp,
        l: &Value,
        r: &Value,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let ordering = match (l, r) {
            (Value::Ptr(a), Value::Ptr(b)) if a.same_buffer(b) => a.offset.cmp(&b.offset),
            (Value::Ref(a), Value::Ref(b)) if a.same_as(b) => Ordering::Equal,
            _ => pointer_key(l).cmp(&pointer_key(r)),
        };
        let result = match op {
            BinOp::Eq => ordering == Ordering::Equal,
            BinOp::Ne => ordering != Ordering::Equal,
            BinOp::Lt => ordering == Ordering::Less,
            BinOp::Le => ordering != Ordering::Greater,
            BinOp::Gt => ordering == Ordering::Greater,
            BinOp::Ge => ordering != Ordering::Less,
            _ => {
                return Err(RuntimeError::TypeError {
                    message: format!(
                        "invalid operands to '{}': {} and {}",
                        op_symbol(op),
                        l.type_name(),
                        r.type_name()
                    ),
                    location,
                })
            }
        };
        Ok(Value::bool(result))
    }

    fn string_op(&self, op: BinOp, l: Value, r: Value, location: SourceLocation) -> Result<Value, RuntimeError> {
        let text = |value: &Value| -> Result<Vec<u8>, RuntimeError> {
            match value {
                Value::Str(bytes) => Ok(bytes.clone()),
                Value::Ptr(_) | Value::Null => self.c_string(value, location),
                Value::Int(c) if op == BinOp::Add => Ok(vec![*c as u8]),
                other => Err(RuntimeError::TypeError {
                    message: format!("invalid string operand: {}", other.type_name()),
                    location,
                }),
            }
        };
        let a = text(&l)?;
        let b = text(&r)?;
        let ordering = a.cmp(&b);
        Ok(match op {
            BinOp::Add => {
                let mut joined = a;
                joined.extend_from_slice(&b);
                Value::Str(joined)
            }
            BinOp::Eq => Value::bool(ordering == Ordering::Equal),
            BinOp::Ne => Value::bool(ordering != Ordering::Equal),
            BinOp::Lt => Value::bool(ordering == Ordering::Less),
            BinOp::Le => Value::bool(ordering != Ordering::Greater),
            BinOp::Gt => Value::bool(ordering == Ordering::Greater),
            BinOp::Ge => Value::bool(ordering != Ordering::Less),
            _ => {
                return Err(RuntimeError::TypeError {
                    message: format!("invalid operands to '{}' on strings", op_symbol(op)),
                    location,
                })
            }
        })
    }

    /// Evaluate a call to a user function or a library builtin.
    fn evaluate_call(
        &mut self,
        name: &str,
        args: &[AstNode],
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        if let Some(function) = self.functions.get(name).cloned() {
            let mut bound = Vec::with_capacity(args.len());
            for (i, arg) in args.iter().enumerate() {
                let by_ref = function.params.get(i).is_some_and(|p| p.by_ref);
                bound.push(if by_ref && is_assignable(arg) {
                    Binding::Place(self.place_of(arg)?)
                } else if by_ref {
                    let ty = function.params[i].param_type;
                    let value = self.evaluate_expr(arg)?;
                    Binding::Place(Place::slot(self.convert(value, &ty, location)?, ty))
                } else {
                    Binding::Value(self.evaluate_expr(arg)?)
                });
            }
            return self.invoke(&function, bound, location);
        }

        match self.call_builtin(name, args, location)? {
            Some(value) => Ok(value),
            None => Err(RuntimeError::UndefinedFunction {
                name: name.to_string(),
                location,
            }),
        }
    }

    fn evaluate_method_call(
        &mut self,
        object: &AstNode,
        method: &str,
        args: &[AstNode],
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        if let AstNode::Variable(name, _) = object {
            if self.lookup(name).is_none() && matches!(name.as_str(), "cin" | "cout" | "cerr") {
                return self.stream_method(name, method, args, location);
            }
        }
        self.string_method(object, method, args, location)
    }

    /// Allocate an array value, filling it from `init` when present.
    fn build_array(
        &mut self,
        elem_type: &Type,
        dims: &[AstNode],
        init: Option<&AstNode>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let mut sizes = Vec::with_capacity(dims.len());
        for dim in dims {
            let n = self.index_value(dim, location)?;
            if n < 0 {
                return Err(RuntimeError::TypeError {
                    message: format!("array size {n} is negative"),
                    location,
                });
            }
            sizes.push(n as usize);
        }
        let total = sizes.iter().try_fold(1usize, |acc, n| acc.checked_mul(*n)).unwrap_or(usize::MAX);
        self.check_allocation(total, location)?;

        let buffer = make_array(elem_type, &sizes);
        if let Some(init) = init {
            self.fill_array(&buffer, elem_type, &sizes, init, location)?;
        }
        Ok(Value::Ptr(buffer))
    }

    fn fill_array(
        &mut self,
        array: &Pointer,
        elem_type: &Type,
        sizes: &[usize],
        init: &AstNode,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let nested = sizes.len() > 1;
        match init {
            AstNode::StringLiteral(bytes, _) if !nested && elem_type.is_char() => {
                let len = sizes.first().copied().unwrap_or(0);
                if bytes.len() > len {
                    return Err(RuntimeError::Unsupported {
                        message: format!("initializer string of {} characters is too long for char[{len}]", bytes.len()),
                        location,
                    });
                }
                let mut buf = array.buf.borrow_mut();
                for (i, b) in bytes.iter().enumerate() {
                    buf.elems[i] = Value::Int(*b as i8 as i64);
                }
                Ok(())
            }
            AstNode::InitList { items, .. } => {
                let len = sizes.first().copied().unwrap_or(0);
                let nested_items = nested
                    && items
                        .iter()
                        .all(|i| matches!(i, AstNode::InitList { .. } | AstNode::StringLiteral(..)));
                if nested && !nested_items {
                    // Flat list for a multi-dimensional array fills row-major
                    let mut leaves = Vec::new();
                    collect_leaves(array, &mut leaves);
                    if items.len() > leaves.len() {
                        return Err(too_many_initializers(location));
                    }
                    for (item, leaf) in items.iter().zip(leaves) {
                        let value = self.evaluate_expr(item)?;
                        self.write_place(&Place::Elem(leaf), value, location)?;
                    }
                    return Ok(());
                }
                if items.len() > len {
                    return Err(too_many_initializers(location));
                }
                for (i, item) in items.iter().enumerate() {
                    let elem = Place::Elem(array.offset_by(i as i64));
                    if nested {
                        let row = match self.read_place(&elem, location)? {
                            Value::Ptr(row) => row,
                            _ => return Err(too_many_initializers(location)),
                        };
                        self.fill_array(&row, elem_type, &sizes[1..], item, location)?;
                    } else {
                        let value = self.evaluate_expr(item)?;
                        self.write_place(&elem, value, location)?;
                    }
                }
                Ok(())
            }
            other => {
                let value = self.evaluate_expr(other)?;
                match value {
                    Value::Ptr(_) => Err(RuntimeError::Unsupported {
                        message: "array initialization from another array".to_string(),
                        location,
                    }),
                    scalar => self.write_place(&Place::Elem(array.clone()), scalar, location).map(|_| ()),
                }
            }
        }
    }
}

fn too_many_initializers(location: SourceLocation) -> RuntimeError {
    RuntimeError::Unsupported {
        message: "too many initializers for array".to_string(),
        location,
    }
}

/// A zeroed (possibly nested) array.
fn make_array(elem_type: &Type, sizes: &[usize]) -> Pointer {
    let Some((&len, rest)) = sizes.split_first() else {
        return Pointer::new(Buffer::zeroed(*elem_type, 0).into_ref(), 0);
    };
    if rest.is_empty() {
        return Pointer::new(Buffer::zeroed(*elem_type, len).into_ref(), 0);
    }
    let mut row_type = *elem_type;
    for _ in rest {
        row_type = row_type.with_pointer();
    }
    let rows = (0..len).map(|_| Value::Ptr(make_array(elem_type, rest))).collect();
    let mut buffer = Buffer::from_values(row_type, rows);
    buffer.nested = true;
    Pointer::new(buffer.into_ref(), 0)
}

/// Innermost element positions of a nested array, row-major.
fn collect_leaves(array: &Pointer, out: &mut Vec<Pointer>) {
    let buf = array.buf.borrow();
    if !buf.nested {
        out.extend((0..buf.elems.len()).map(|i| Pointer::new(array.buf.clone(), i as isize)));
        return;
    }
    for row in &buf.elems {
        if let Value::Ptr(row) = row {
            collect_leaves(row, out);
        }
    }
}

/// `sizeof` of a runtime value (arrays report their full storage).
pub(crate) fn sizeof_value(value: &Value) -> usize {
    match value {
        Value::Int(_) => 4,
        Value::Float(_) => 8,
        Value::Ptr(ptr) => {
            let buf = ptr.buf.borrow();
            let elem = buf.elem_size().max(1);
            buf.size_in_bytes()
                .saturating_sub(ptr.offset.max(0) as usize * elem)
        }
        Value::Str(_) => Type::new(BaseType::Str).size(),
        Value::File(_) => Type::new(BaseType::File).size(),
        Value::Ref(_) | Value::Null => 8,
        Value::Void => 1,
    }
}

/// Ordering key for comparing unrelated pointers (and pointers with `0`).
fn pointer_key(value: &Value) -> usize {
    match value {
        Value::Int(n) => *n as usize,
        other => other.address(),
    }
}

fn int_op(op: BinOp, a: i64, b: i64, location: SourceLocation) -> Result<Value, RuntimeError> {
    Ok(Value::Int(match op {
        BinOp::Add => a.wrapping_add(b),
        BinOp::Sub => a.wrapping_sub(b),
        BinOp::Mul => a.wrapping_mul(b),
        BinOp::Div | BinOp::Mod if b == 0 => return Err(RuntimeError::DivisionByZero { location }),
        BinOp::Div => a.wrapping_div(b),
        BinOp::Mod => a.wrapping_rem(b),
        BinOp::Eq => (a == b) as i64,
        BinOp::Ne => (a != b) as i64,
        BinOp::Lt => (a < b) as i64,
        BinOp::Le => (a <= b) as i64,
        BinOp::Gt => (a > b) as i64,
        BinOp::Ge => (a >= b) as i64,
        BinOp::And => (a != 0 && b != 0) as i64,
        BinOp::Or => (a != 0 || b != 0) as i64,
        BinOp::BitAnd => a & b,
        BinOp::BitOr => a | b,
        BinOp::BitXor => a ^ b,
        BinOp::Shl => a.wrapping_shl((b & 63) as u32),
        BinOp::Shr => a.wrapping_shr((b & 63) as u32),
    }))
}

fn float_op(op: BinOp, a: f64, b: f64) -> Option<Value> {
    Some(match op {
        BinOp::Add => Value::Float(a + b),
        BinOp::Sub => Value::Float(a - b),
        BinOp::Mul => Value::Float(a * b),
        BinOp::Div => Value::Float(a / b),
        BinOp::Mod => Value::Float(a % b),
        BinOp::Eq => Value::bool(a == b),
        BinOp::Ne => Value::bool(a != b),
        BinOp::Lt => Value::bool(a < b),
        BinOp::Le => Value::bool(a <= b),
        BinOp::Gt => Value::bool(a > b),
        BinOp::Ge => Value::bool(a >= b),
        BinOp::And => Value::bool(a != 0.0 && b != 0.0),
        BinOp::Or => Value::bool(a != 0.0 || b != 0.0),
        BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::Shl | BinOp::Shr => return None,
    })
}

pub(crate) fn op_symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Mod => "%",
        BinOp::Eq => "==",
        BinOp::Ne => "!=",
        BinOp::Lt => "<",
        BinOp::Le => "<=",
        BinOp::Gt => ">",
        BinOp::Ge => ">=",
        BinOp::And => "&&",
        BinOp::Or => "||",
        BinOp::BitAnd => "&",
        BinOp::BitOr => "|",
        BinOp::BitXor => "^",
        BinOp::Shl => "<<",
        BinOp::Shr => ">>",
    }
}
