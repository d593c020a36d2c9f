//! Structural lowering
//!
//! Rewrites the parsed program into the shape the interpreter executes:
//!
//! - `sizeof(type)` and statically known `sizeof expr` become constants; the
//!   rest become [`AstNode::SizeofValue`]
//! - array declarations become heap-array constructors ([`AstNode::ArrayNew`])
//! - prototypes disappear
//! - `scanf`/`fscanf`/`sscanf` become [`AstNode::Scan`] with assignable targets,
//!   and `strtod`-style end pointers become [`AstNode::OutParam`]
//! - pointer casts are dropped unless they type a fresh allocation
//! - in C++, `cout`/`cerr` insertion chains, `cin` extraction chains and
//!   `getline(cin, s)` become stream nodes parameterized by type hints
//!
//! Type information is tracked with a scope stack of declared symbols.

use crate::parser::ast::*;
use crate::parser::{CompileError, Dialect};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
struct Symbol {
    /// Declared type; for arrays the element type.
    ty: Type,
    /// Array dimensions, `None` where not a compile-time constant.
    dims: Vec<Option<usize>>,
}

impl Symbol {
    /// Type of the symbol used as a value (arrays decay).
    fn value_type(&self) -> Type {
        let mut ty = self.ty;
        for _ in &self.dims {
            ty = ty.with_pointer();
        }
        ty
    }
}

const ALLOCATORS: &[&str] = &["malloc", "calloc", "realloc"];

const DOUBLE_RESULTS: &[&str] = &[
    "sqrt", "cbrt", "pow", "exp", "log", "log10", "log2", "sin", "cos", "tan", "asin", "acos",
    "atan", "atan2", "sinh", "cosh", "tanh", "fabs", "ceil", "floor", "round", "trunc", "hypot",
    "fmod", "stod", "atof", "strtod", "difftime",
];

/// Run the lowering pass.
pub fn lower_program(program: Program, dialect: Dialect) -> Result<Program, CompileError> {
    let mut lowerer = Lowerer {
        dialect,
        functions: FxHashMap::default(),
        scopes: vec![FxHashMap::default()],
    };
    lowerer.lower(program)
}

struct Lowerer {
    dialect: Dialect,
    functions: FxHashMap<String, Type>,
    scopes: Vec<FxHashMap<String, Symbol>>,
}

impl Lowerer {
    fn lower(&mut self, program: Program) -> Result<Program, CompileError> {
        let mut defined: FxHashMap<String, SourceLocation> = FxHashMap::default();
        for node in &program.nodes {
            match node {
                AstNode::FunctionDef {
                    name,
                    return_type,
                    location,
                    ..
                } => {
                    if defined.insert(name.clone(), *location).is_some() {
                        return Err(CompileError::new(
                            format!("Redefinition of function '{name}'"),
                            *location,
                        ));
                    }
                    self.functions.insert(name.clone(), *return_type);
                }
                AstNode::FunctionDecl {
                    name, return_type, ..
                } => {
                    self.functions.entry(name.clone()).or_insert(*return_type);
                }
                _ => {}
            }
        }

        if !defined.contains_key("main") {
            return Err(CompileError::new(
                "Missing main function",
                SourceLocation::new(1, 1),
            ));
        }

        let mut lowered = Program::new();
        for node in program.nodes {
            match node {
                AstNode::FunctionDecl { .. } => {}
                AstNode::FunctionDef {
                    name,
                    params,
                    body,
                    return_type,
                    location,
                } => {
                    self.scopes.push(FxHashMap::default());
                    for param in &params {
                        self.declare(&param.name, param.param_type, Vec::new());
                    }
                    let body = self.lower_block(body);
                    self.scopes.pop();
                    lowered.nodes.push(AstNode::FunctionDef {
                        name,
                        params,
                        body: body?,
                        return_type,
                        location,
                    });
                }
                other => lowered.nodes.push(self.lower_stmt(other)?),
            }
        }
        Ok(lowered)
    }

    // ===== Scopes =====

    fn declare(&mut self, name: &str, ty: Type, dims: Vec<Option<usize>>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), Symbol { ty, dims });
        }
    }

    fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }

    fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, CompileError>) -> Result<T, CompileError> {
        self.scopes.push(FxHashMap::default());
        let result = f(self);
        self.scopes.pop();
        result
    }

    fn is_stream(&self, expr: &AstNode, name: &str) -> bool {
        self.dialect == Dialect::Cpp
            && matches!(expr, AstNode::Variable(n, _) if n == name)
            && self.lookup(name).is_none()
    }

    // ===== Statements =====

    fn lower_block(&mut self, statements: Vec<AstNode>) -> Result<Vec<AstNode>, CompileError> {
        statements.into_iter().map(|s| self.lower_stmt(s)).collect()
    }

    fn lower_scoped_block(&mut self, statements: Vec<AstNode>) -> Result<Vec<AstNode>, CompileError> {
        self.scoped(|this| this.lower_block(statements))
    }

    fn lower_opt(&mut self, node: Option<Box<AstNode>>) -> Result<Option<Box<AstNode>>, CompileError> {
        node.map(|n| self.lower_expr(*n).map(Box::new)).transpose()
    }

    fn lower_stmt(&mut self, node: AstNode) -> Result<AstNode, CompileError> {
        Ok(match node {
            AstNode::VarDecl {
                name,
                var_type,
                dims,
                init,
                is_static,
                is_ref,
                location,
            } => self.lower_var_decl(name, var_type, dims, init, is_static, is_ref, location)?,
            AstNode::DeclList { decls, location } => AstNode::DeclList {
                decls: self.lower_block(decls)?,
                location,
            },
            AstNode::Block {
                statements,
                location,
            } => AstNode::Block {
                statements: self.lower_scoped_block(statements)?,
                location,
            },
            AstNode::Return { expr, location } => AstNode::Return {
                expr: self.lower_opt(expr)?,
                location,
            },
            AstNode::If {
                condition,
                then_branch,
                else_branch,
                location,
            } => AstNode::If {
                condition: Box::new(self.lower_expr(*condition)?),
                then_branch: self.lower_scoped_block(then_branch)?,
                else_branch: else_branch.map(|b| self.lower_scoped_block(b)).transpose()?,
                location,
            },
            AstNode::While {
                condition,
                body,
                location,
            } => AstNode::While {
                condition: Box::new(self.lower_expr(*condition)?),
                body: self.lower_scoped_block(body)?,
                location,
            },
            AstNode::DoWhile {
                body,
                condition,
                location,
            } => AstNode::DoWhile {
                body: self.lower_scoped_block(body)?,
                condition: Box::new(self.lower_expr(*condition)?),
                location,
            },
            AstNode::For {
                init,
                condition,
                increment,
                body,
                location,
            } => self.scoped(|this| {
                let init = init.map(|i| this.lower_stmt(*i).map(Box::new)).transpose()?;
                Ok(AstNode::For {
                    init,
                    condition: this.lower_opt(condition)?,
                    increment: this.lower_opt(increment)?,
                    body: this.lower_scoped_block(body)?,
                    location,
                })
            })?,
            AstNode::ForEach {
                var_type,
                name,
                by_ref,
                iterable,
                body,
                location,
            } => {
                let iterable = self.lower_expr(*iterable)?;
                let var_type = if var_type.base == BaseType::Auto {
                    self.element_type(&iterable).unwrap_or(var_type)
                } else {
                    var_type
                };
                self.scoped(|this| {
                    this.declare(&name, var_type, Vec::new());
                    Ok(AstNode::ForEach {
                        var_type,
                        name,
                        by_ref,
                        iterable: Box::new(iterable),
                        body: this.lower_scoped_block(body)?,
                        location,
                    })
                })?
            }
            AstNode::Switch {
                expr,
                cases,
                location,
            } => {
                let expr = self.lower_expr(*expr)?;
                let cases = self.scoped(|this| {
                    cases
                        .into_iter()
                        .map(|case| {
                            Ok(match case {
                                CaseNode::Case {
                                    value,
                                    statements,
                                    location,
                                } => CaseNode::Case {
                                    value: Box::new(this.lower_expr(*value)?),
                                    statements: this.lower_block(statements)?,
                                    location,
                                },
                                CaseNode::Default {
                                    statements,
                                    location,
                                } => CaseNode::Default {
                                    statements: this.lower_block(statements)?,
                                    location,
                                },
                            })
                        })
                        .collect::<Result<Vec<_>, CompileError>>()
                })?;
                AstNode::Switch {
                    expr: Box::new(expr),
                    cases,
                    location,
                }
            }
            AstNode::ExpressionStatement { expr, location } => AstNode::ExpressionStatement {
                expr: Box::new(self.lower_expr(*expr)?),
                location,
            },
            AstNode::FunctionDef { location, .. } => {
                return Err(CompileError::new("Nested function definitions are not supported", location));
            }
            AstNode::FunctionDecl { location, .. } => AstNode::Empty { location },
            other @ (AstNode::Break { .. } | AstNode::Continue { .. } | AstNode::Empty { .. }) => other,
            expr => self.lower_expr(expr)?,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn lower_var_decl(
        &mut self,
        name: String,
        var_type: Type,
        dims: Vec<Option<Box<AstNode>>>,
        init: Option<Box<AstNode>>,
        is_static: bool,
        is_ref: bool,
        location: SourceLocation,
    ) -> Result<AstNode, CompileError> {
        let init = self.lower_opt(init)?;

        if dims.is_empty() {
            let var_type = if var_type.base == BaseType::Auto && var_type.pointer_depth == 0 {
                init.as_deref().and_then(|i| self.static_type(i)).unwrap_or(var_type)
            } else {
                var_type
            };
            let init = match init.map(|i| *i) {
                Some(AstNode::InitList { mut items, location }) if var_type.base != BaseType::Auto => {
                    if items.len() > 1 {
                        return Err(CompileError::new(
                            format!("Too many initializers for scalar '{name}'"),
                            location,
                        ));
                    }
                    Some(Box::new(items.pop().unwrap_or(AstNode::IntLiteral(0, location))))
                }
                other => other.map(Box::new),
            };
            self.declare(&name, var_type, Vec::new());
            return Ok(AstNode::VarDecl {
                name,
                var_type,
                dims: Vec::new(),
                init,
                is_static,
                is_ref,
                location,
            });
        }

        // Array: resolve every dimension, inferring `[]` from the initializer.
        let mut sizes = Vec::with_capacity(dims.len());
        let mut known = Vec::with_capacity(dims.len());
        for (depth, dim) in dims.into_iter().enumerate() {
            let size = match dim {
                Some(expr) => self.lower_expr(*expr)?,
                None => {
                    let inferred = init
                        .as_deref()
                        .and_then(|i| inferred_length(i, depth))
                        .ok_or_else(|| {
                            CompileError::new(
                                format!("Array size of '{name}' cannot be inferred"),
                                location,
                            )
                        })?;
                    AstNode::IntLiteral(inferred as i64, location)
                }
            };
            known.push(const_int(&size).and_then(|v| usize::try_from(v).ok()));
            sizes.push(size);
        }

        self.declare(&name, var_type, known);
        let decayed = self.lookup(&name).map(Symbol::value_type).unwrap_or(var_type);

        Ok(AstNode::VarDecl {
            name,
            var_type: decayed,
            dims: Vec::new(),
            init: Some(Box::new(AstNode::ArrayNew {
                elem_type: var_type,
                dims: sizes,
                init,
                location,
            })),
            is_static,
            is_ref: false,
            location,
        })
    }

    // ===== Expressions =====

    fn lower_args(&mut self, args: Vec<AstNode>) -> Result<Vec<AstNode>, CompileError> {
        args.into_iter().map(|a| self.lower_expr(a)).collect()
    }

    fn lower_box(&mut self, node: Box<AstNode>) -> Result<Box<AstNode>, CompileError> {
        Ok(Box::new(self.lower_expr(*node)?))
    }

    fn lower_expr(&mut self, node: AstNode) -> Result<AstNode, CompileError> {
        Ok(match node {
            AstNode::SizeofType {
                target_type,
                location,
            } => AstNode::IntLiteral(target_type.size() as i64, location),
            AstNode::SizeofExpr { expr, location } => {
                let expr = self.lower_expr(*expr)?;
                match self.static_size(&expr) {
                    Some(size) => AstNode::IntLiteral(size as i64, location),
                    None => AstNode::SizeofValue {
                        expr: Box::new(expr),
                        location,
                    },
                }
            }
            AstNode::Cast {
                target_type,
                expr,
                location,
            } => {
                let expr = self.lower_expr(*expr)?;
                let types_allocation =
                    matches!(&expr, AstNode::FunctionCall { name, .. } if ALLOCATORS.contains(&name.as_str()));
                if target_type.is_pointer() && !types_allocation {
                    expr
                } else {
                    AstNode::Cast {
                        target_type,
                        expr: Box::new(expr),
                        location,
                    }
                }
            }
            AstNode::FunctionCall {
                name,
                args,
                location,
            } => self.lower_call(name, args, location)?,
            AstNode::BinaryOp {
                op: BinOp::Shl,
                left,
                right,
                location,
            } if self.is_stream(leftmost_shift(&left, BinOp::Shl), "cout")
                || self.is_stream(leftmost_shift(&left, BinOp::Shl), "cerr") =>
            {
                let stream = if self.is_stream(leftmost_shift(&left, BinOp::Shl), "cerr") {
                    StdStream::Err
                } else {
                    StdStream::Out
                };
                let mut operands = Vec::new();
                flatten_shift(*left, BinOp::Shl, &mut operands);
                operands.push(*right);
                let items = operands
                    .into_iter()
                    .skip(1)
                    .filter_map(|operand| self.stream_item(operand).transpose())
                    .collect::<Result<Vec<_>, CompileError>>()?;
                AstNode::StreamWrite {
                    stream,
                    items,
                    location,
                }
            }
            AstNode::BinaryOp {
                op: BinOp::Shr,
                left,
                right,
                location,
            } if self.is_stream(leftmost_shift(&left, BinOp::Shr), "cin") => {
                let mut operands = Vec::new();
                flatten_shift(*left, BinOp::Shr, &mut operands);
                operands.push(*right);
                let targets = operands
                    .into_iter()
                    .skip(1)
                    .map(|operand| {
                        let target = self.lower_expr(operand)?;
                        let hint = self.static_type(&target).map(|t| t.hint()).unwrap_or(TypeHint::Auto);
                        Ok((target, hint))
                    })
                    .collect::<Result<Vec<_>, CompileError>>()?;
                AstNode::StreamRead { targets, location }
            }
            AstNode::BinaryOp {
                op,
                left,
                right,
                location,
            } => AstNode::BinaryOp {
                op,
                left: self.lower_box(left)?,
                right: self.lower_box(right)?,
                location,
            },
            AstNode::UnaryOp {
                op,
                operand,
                location,
            } => AstNode::UnaryOp {
                op,
                operand: self.lower_box(operand)?,
                location,
            },
            AstNode::TernaryOp {
                condition,
                true_expr,
                false_expr,
                location,
            } => AstNode::TernaryOp {
                condition: self.lower_box(condition)?,
                true_expr: self.lower_box(true_expr)?,
                false_expr: self.lower_box(false_expr)?,
                location,
            },
            AstNode::Assignment { lhs, rhs, location } => AstNode::Assignment {
                lhs: self.lower_box(lhs)?,
                rhs: self.lower_box(rhs)?,
                location,
            },
            AstNode::CompoundAssignment {
                lhs,
                op,
                rhs,
                location,
            } => AstNode::CompoundAssignment {
                lhs: self.lower_box(lhs)?,
                op,
                rhs: self.lower_box(rhs)?,
                location,
            },
            AstNode::Comma {
                left,
                right,
                location,
            } => AstNode::Comma {
                left: self.lower_box(left)?,
                right: self.lower_box(right)?,
                location,
            },
            AstNode::MethodCall {
                object,
                method,
                args,
                location,
            } => AstNode::MethodCall {
                object: self.lower_box(object)?,
                method,
                args: self.lower_args(args)?,
                location,
            },
            AstNode::ArrayAccess {
                array,
                index,
                location,
            } => AstNode::ArrayAccess {
                array: self.lower_box(array)?,
                index: self.lower_box(index)?,
                location,
            },
            AstNode::InitList { items, location } => AstNode::InitList {
                items: self.lower_args(items)?,
                location,
            },
            AstNode::Variable(name, location) if name == "endl" && self.dialect == Dialect::Cpp => {
                return Err(CompileError::new("'endl' is only supported in a cout chain", location));
            }
            other => other,
        })
    }

    fn lower_call(
        &mut self,
        name: String,
        args: Vec<AstNode>,
        location: SourceLocation,
    ) -> Result<AstNode, CompileError> {
        let user_defined = self.functions.contains_key(&name);

        if !user_defined {
            let scan_source = match name.as_str() {
                "scanf" => Some(0),
                "fscanf" | "sscanf" => Some(1),
                _ => None,
            };
            if let Some(skip) = scan_source {
                return self.lower_scan(&name, args, skip, location);
            }

            if matches!(name.as_str(), "strtod" | "strtof" | "strtol" | "strtoul" | "strtoll" | "strtoull") {
                let args = args
                    .into_iter()
                    .enumerate()
                    .map(|(i, arg)| if i == 1 { self.out_param(arg) } else { self.lower_expr(arg) })
                    .collect::<Result<Vec<_>, CompileError>>()?;
                return Ok(AstNode::FunctionCall {
                    name,
                    args,
                    location,
                });
            }

            if name == "getline" && self.dialect == Dialect::Cpp {
                if let Some(first) = args.first() {
                    if self.is_stream(first, "cin") {
                        let mut rest = args.into_iter().skip(1);
                        let target = rest
                            .next()
                            .ok_or_else(|| CompileError::new("getline expects a target string", location))?;
                        let delimiter = rest.next().map(|d| self.lower_expr(d)).transpose()?;
                        return Ok(AstNode::ReadLine {
                            target: Box::new(self.lower_expr(target)?),
                            delimiter: delimiter.map(Box::new),
                            location,
                        });
                    }
                }
            }
        }

        Ok(AstNode::FunctionCall {
            name,
            args: self.lower_args(args)?,
            location,
        })
    }

    fn lower_scan(
        &mut self,
        name: &str,
        args: Vec<AstNode>,
        fixed: usize,
        location: SourceLocation,
    ) -> Result<AstNode, CompileError> {
        let mut args = args.into_iter();
        let source = match fixed {
            0 => ScanSource::Stdin,
            _ => {
                let first = args
                    .next()
                    .ok_or_else(|| CompileError::new(format!("{name} expects a source argument"), location))?;
                let first = Box::new(self.lower_expr(first)?);
                if name == "fscanf" {
                    ScanSource::File(first)
                } else {
                    ScanSource::Text(first)
                }
            }
        };
        let format = args
            .next()
            .ok_or_else(|| CompileError::new(format!("{name} expects a format string"), location))?;
        let format = Box::new(self.lower_expr(format)?);
        let targets = args.map(|a| self.out_param(a)).collect::<Result<Vec<_>, CompileError>>()?;
        Ok(AstNode::Scan {
            source,
            format,
            targets,
            location,
        })
    }

    /// `&x` becomes an assignable target; pointers and arrays stay values.
    fn out_param(&mut self, arg: AstNode) -> Result<AstNode, CompileError> {
        match arg {
            AstNode::UnaryOp {
                op: UnOp::AddrOf,
                operand,
                location,
            } => Ok(AstNode::OutParam {
                target: self.lower_box(operand)?,
                location,
            }),
            other => self.lower_expr(other),
        }
    }

    fn stream_item(&mut self, operand: AstNode) -> Result<Option<StreamItem>, CompileError> {
        if let AstNode::Variable(name, _) = &operand {
            if self.lookup(name).is_none() {
                match name.as_str() {
                    "endl" => return Ok(Some(StreamItem::Endl)),
                    "fixed" => return Ok(Some(StreamItem::Fixed)),
                    "flush" => return Ok(None),
                    _ => {}
                }
            }
        }
        Ok(Some(match operand {
            AstNode::FunctionCall {
                name,
                mut args,
                location,
            } if !self.functions.contains_key(&name) && (name == "setprecision" || name == "setw") => {
                if args.len() != 1 {
                    return Err(CompileError::new(format!("{name} expects one argument"), location));
                }
                let arg = self.lower_expr(args.remove(0))?;
                if name == "setw" {
                    StreamItem::SetWidth(arg)
                } else {
                    StreamItem::SetPrecision(arg)
                }
            }
            other => self.value_item(other)?,
        }))
    }

    fn value_item(&mut self, operand: AstNode) -> Result<StreamItem, CompileError> {
        let expr = self.lower_expr(operand)?;
        let hint = self.static_type(&expr).map(|t| t.hint()).unwrap_or(TypeHint::Auto);
        Ok(StreamItem::Value { expr, hint })
    }

    // ===== Static types =====

    fn element_type(&self, iterable: &AstNode) -> Option<Type> {
        let ty = self.static_type(iterable)?;
        if ty.base == BaseType::Str && !ty.is_pointer() {
            Some(Type::new(BaseType::Char))
        } else if ty.is_pointer() {
            Some(ty.pointee())
        } else {
            None
        }
    }

    /// Best-effort static type of an expression.
    fn static_type(&self, expr: &AstNode) -> Option<Type> {
        match expr {
            AstNode::IntLiteral(..) | AstNode::SizeofValue { .. } => Some(Type::new(BaseType::Int)),
            AstNode::FloatLiteral(..) => Some(Type::new(BaseType::Double)),
            AstNode::CharLiteral(..) => Some(Type::new(BaseType::Char)),
            AstNode::StringLiteral(..) => Some(Type::new(BaseType::Char).with_pointer()),
            AstNode::Variable(name, _) => self.lookup(name).map(Symbol::value_type),
            AstNode::ArrayAccess { array, .. } => {
                let ty = self.static_type(array)?;
                if ty.is_pointer() {
                    Some(ty.pointee())
                } else if ty.base == BaseType::Str {
                    Some(Type::new(BaseType::Char))
                } else {
                    None
                }
            }
            AstNode::Cast { target_type, .. } => Some(*target_type),
            AstNode::Assignment { lhs, .. } | AstNode::CompoundAssignment { lhs, .. } => {
                self.static_type(lhs)
            }
            AstNode::Comma { right, .. } => self.static_type(right),
            AstNode::TernaryOp {
                true_expr,
                false_expr,
                ..
            } => {
                let a = self.static_type(true_expr);
                let b = self.static_type(false_expr);
                match (a, b) {
                    (Some(a), Some(b)) if a.is_floating() || b.is_floating() => {
                        Some(Type::new(BaseType::Double))
                    }
                    (Some(a), Some(b)) if a.is_char() && !b.is_char() => Some(b),
                    (a, b) => a.or(b),
                }
            }
            AstNode::UnaryOp { op, operand, .. } => {
                let ty = self.static_type(operand);
                match op {
                    UnOp::Not => Some(Type::new(BaseType::Bool)),
                    UnOp::Deref => ty.filter(Type::is_pointer).map(|t| t.pointee()),
                    UnOp::AddrOf => ty.map(Type::with_pointer),
                    UnOp::Neg | UnOp::Plus | UnOp::BitNot => ty.map(promote),
                    UnOp::PreInc | UnOp::PreDec | UnOp::PostInc | UnOp::PostDec => ty,
                }
            }
            AstNode::BinaryOp { op, left, right, .. } => {
                let l = self.static_type(left);
                let r = self.static_type(right);
                match op {
                    BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge | BinOp::And | BinOp::Or => {
                        Some(Type::new(BaseType::Bool))
                    }
                    _ => match (l, r) {
                        (Some(l), _) if l.base == BaseType::Str && !l.is_pointer() => Some(l),
                        (_, Some(r)) if r.base == BaseType::Str && !r.is_pointer() => Some(r),
                        (Some(l), Some(r)) if l.is_pointer() && r.is_pointer() => Some(Type::new(BaseType::Long)),
                        (Some(l), _) if l.is_pointer() => Some(l),
                        (_, Some(r)) if r.is_pointer() => Some(r),
                        (Some(l), Some(r)) if l.is_floating() || r.is_floating() => {
                            Some(Type::new(BaseType::Double))
                        }
                        (Some(l), Some(r)) => Some(wider(promote(l), promote(r))),
                        (Some(l), None) => Some(promote(l)),
                        (None, Some(r)) => Some(promote(r)),
                        (None, None) => None,
                    },
                }
            }
            AstNode::FunctionCall { name, .. } => {
                if let Some(ty) = self.functions.get(name) {
                    return Some(*ty);
                }
                match name.as_str() {
                    "to_string" | "string" => Some(Type::new(BaseType::Str)),
                    n if DOUBLE_RESULTS.contains(&n) => Some(Type::new(BaseType::Double)),
                    "strchr" | "strrchr" | "strstr" | "strcpy" | "strncpy" | "strcat" | "strncat"
                    | "strdup" | "fgets" => Some(Type::new(BaseType::Char).with_pointer()),
                    "max" | "min" | "abs" => None,
                    _ => Some(Type::new(BaseType::Int)),
                }
            }
            AstNode::MethodCall { method, .. } => match method.as_str() {
                "substr" | "append" => Some(Type::new(BaseType::Str)),
                "c_str" | "data" => Some(Type::new(BaseType::Char).with_pointer()),
                "at" | "front" | "back" => Some(Type::new(BaseType::Char)),
                "empty" => Some(Type::new(BaseType::Bool)),
                _ => Some(Type::new(BaseType::Long)),
            },
            AstNode::StreamRead { .. } | AstNode::ReadLine { .. } => Some(Type::new(BaseType::Bool)),
            _ => None,
        }
    }

    /// `sizeof expr` when it is known without running the program.
    fn static_size(&self, expr: &AstNode) -> Option<usize> {
        let mut depth = 0;
        let mut base = expr;
        while let AstNode::ArrayAccess { array, .. } = base {
            depth += 1;
            base = array;
        }
        if let AstNode::Variable(name, _) = base {
            if let Some(symbol) = self.lookup(name) {
                if depth < symbol.dims.len() {
                    let remaining = &symbol.dims[depth..];
                    return remaining
                        .iter()
                        .try_fold(symbol.ty.size(), |acc, dim| dim.map(|d| acc * d));
                }
            }
        }
        match expr {
            AstNode::StringLiteral(bytes, _) => Some(bytes.len() + 1),
            _ => self.static_type(expr).map(|t| t.size()),
        }
    }
}

fn promote(ty: Type) -> Type {
    match ty.base {
        BaseType::Bool | BaseType::Char | BaseType::UChar | BaseType::Short | BaseType::UShort
            if !ty.is_pointer() =>
        {
            Type::new(BaseType::Int)
        }
        _ => ty,
    }
}

fn wider(a: Type, b: Type) -> Type {
    if b.size() > a.size() {
        b
    } else {
        a
    }
}

fn leftmost_shift(expr: &AstNode, op: BinOp) -> &AstNode {
    match expr {
        AstNode::BinaryOp { op: o, left, .. } if *o == op => leftmost_shift(left, op),
        other => other,
    }
}

fn flatten_shift(expr: AstNode, op: BinOp, out: &mut Vec<AstNode>) {
    match expr {
        AstNode::BinaryOp {
            op: o, left, right, ..
        } if o == op => {
            flatten_shift(*left, op, out);
            out.push(*right);
        }
        other => out.push(other),
    }
}

/// Length of dimension `depth` implied by an initializer.
fn inferred_length(init: &AstNode, depth: usize) -> Option<usize> {
    match init {
        AstNode::StringLiteral(bytes, _) if depth == 0 => Some(bytes.len() + 1),
        AstNode::InitList { items, .. } if depth == 0 => Some(items.len()),
        AstNode::InitList { items, .. } => items
            .iter()
            .filter_map(|item| inferred_length(item, depth - 1))
            .max(),
        _ => None,
    }
}

/// Fold an integer constant expression.
fn const_int(expr: &AstNode) -> Option<i64> {
    match expr {
        AstNode::IntLiteral(n, _) | AstNode::CharLiteral(n, _) => Some(*n),
        AstNode::Cast { expr, .. } => const_int(expr),
        AstNode::UnaryOp {
            op: UnOp::Neg,
            operand,
            ..
        } => const_int(operand).map(i64::wrapping_neg),
        AstNode::UnaryOp {
            op: UnOp::Plus,
            operand,
            ..
        } => const_int(operand),
        AstNode::BinaryOp { op, left, right, .. } => {
            let (l, r) = (const_int(left)?, const_int(right)?);
            match op {
                BinOp::Add => l.checked_add(r),
                BinOp::Sub => l.checked_sub(r),
                BinOp::Mul => l.checked_mul(r),
                BinOp::Div => l.checked_div(r),
                BinOp::Mod => l.checked_rem(r),
                BinOp::Shl => l.checked_shl(r as u32),
                BinOp::Shr => l.checked_shr(r as u32),
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::compile_program;

    fn main_body(source: &str, dialect: Dialect) -> Vec<AstNode> {
        let program = compile_program(source, dialect).unwrap();
        program
            .nodes
            .into_iter()
            .find_map(|n| match n {
                AstNode::FunctionDef { name, body, .. } if name == "main" => Some(body),
                _ => None,
            })
            .unwrap()
    }

    fn first_expr(body: &[AstNode]) -> &AstNode {
        body.iter()
            .find_map(|n| match n {
                AstNode::ExpressionStatement { expr, .. } => Some(expr.as_ref()),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_missing_main() {
        let err = compile_program("int helper() { return 1; }", Dialect::C).unwrap_err();
        assert!(err.message.contains("main"));
    }

    #[test]
    fn test_prototypes_removed() {
        let program = compile_program("int f(int);\nint main() { return f(1); }\nint f(int x) { return x; }", Dialect::C).unwrap();
        assert_eq!(program.nodes.len(), 2);
    }

    #[test]
    fn test_sizeof_constants() {
        let body = main_body(
            "int main() { int a[10]; double d; int n = sizeof(a) / sizeof(a[0]); long s = sizeof(d) + sizeof(char); }",
            Dialect::C,
        );
        let AstNode::VarDecl { init: Some(init), .. } = &body[2] else {
            panic!("Expected declaration");
        };
        assert!(matches!(init.as_ref(), AstNode::BinaryOp { left, right, .. }
            if matches!(left.as_ref(), AstNode::IntLiteral(40, _)) && matches!(right.as_ref(), AstNode::IntLiteral(4, _))));
    }

    #[test]
    fn test_array_declaration_becomes_constructor() {
        let body = main_body("int main() { char s[] = \"hi\"; int m[2][3]; }", Dialect::C);
        assert!(matches!(&body[0], AstNode::VarDecl { init: Some(init), .. }
            if matches!(init.as_ref(), AstNode::ArrayNew { dims, .. } if matches!(dims[0], AstNode::IntLiteral(3, _)))));
        assert!(matches!(&body[1], AstNode::VarDecl { var_type, .. } if var_type.pointer_depth == 2));
    }

    #[test]
    fn test_scanf_targets() {
        let body = main_body("int main() { int x; char name[8]; scanf(\"%d %s\", &x, name); }", Dialect::C);
        let AstNode::Scan { targets, source, .. } = first_expr(&body) else {
            panic!("Expected scan node");
        };
        assert!(matches!(source, ScanSource::Stdin));
        assert!(matches!(targets[0], AstNode::OutParam { .. }));
        assert!(matches!(targets[1], AstNode::Variable(..)));
    }

    #[test]
    fn test_cout_chain_with_hints() {
        let body = main_body(
            "#include <iostream>\nusing namespace std;\nint main() { char c = 'x'; double d = 1; cout << c << d << 3 << endl; }",
            Dialect::Cpp,
        );
        let AstNode::StreamWrite { items, stream, .. } = first_expr(&body) else {
            panic!("Expected stream write");
        };
        assert_eq!(*stream, StdStream::Out);
        assert_eq!(items.len(), 4);
        assert!(matches!(items[0], StreamItem::Value { hint: TypeHint::Char, .. }));
        assert!(matches!(items[1], StreamItem::Value { hint: TypeHint::Double, .. }));
        assert!(matches!(items[2], StreamItem::Value { hint: TypeHint::Int, .. }));
        assert!(matches!(items[3], StreamItem::Endl));
    }

    #[test]
    fn test_cin_and_getline() {
        let body = main_body(
            "using namespace std; int main() { int n; string s; cin >> n >> s; getline(cin, s); }",
            Dialect::Cpp,
        );
        let reads: Vec<&AstNode> = body
            .iter()
            .filter_map(|n| match n {
                AstNode::ExpressionStatement { expr, .. } => Some(expr.as_ref()),
                _ => None,
            })
            .collect();
        let AstNode::StreamRead { targets, .. } = reads[0] else {
            panic!("Expected stream read");
        };
        assert_eq!(targets[0].1, TypeHint::Int);
        assert_eq!(targets[1].1, TypeHint::String);
        assert!(matches!(reads[1], AstNode::ReadLine { .. }));
    }

    #[test]
    fn test_pointer_cast_dropped_except_allocation() {
        let body = main_body("int main() { int *p = (int*)malloc(8); char *q = (char*)p; }", Dialect::C);
        assert!(matches!(&body[0], AstNode::VarDecl { init: Some(i), .. } if matches!(i.as_ref(), AstNode::Cast { .. })));
        assert!(matches!(&body[1], AstNode::VarDecl { init: Some(i), .. } if matches!(i.as_ref(), AstNode::Variable(..))));
    }
}
