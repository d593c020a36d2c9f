//! Statement execution
//!
//! Adds `impl Interpreter` methods for declarations, blocks, `if`, `switch`,
//! `return`, `break`/`continue` and expression statements. Loops live in
//! [`super::loops`].

use crate::interpreter::engine::{ControlFlow, Interpreter};
use crate::interpreter::errors::RuntimeError;
use crate::memory::value::{Place, Value};
use crate::memory::zero_value;
use crate::parser::ast::*;

impl Interpreter {
    /// Execute statements in order, stopping at the first control-flow signal.
    pub(crate) fn execute_block(&mut self, statements: &[AstNode]) -> Result<(), RuntimeError> {
        for stmt in statements {
            self.execute_statement(stmt)?;
            if self.control_flow != ControlFlow::Normal {
                break;
            }
        }
        Ok(())
    }

    /// Execute statements inside a fresh block scope.
    pub(crate) fn execute_scoped(&mut self, statements: &[AstNode]) -> Result<(), RuntimeError> {
        self.enter_scope();
        let result = self.execute_block(statements);
        self.exit_scope();
        result
    }

    pub(crate) fn execute_statement(&mut self, stmt: &AstNode) -> Result<(), RuntimeError> {
        self.tick()?;
        self.current_location = *stmt.location();

        match stmt {
            AstNode::VarDecl {
                name,
                var_type,
                init,
                is_static,
                is_ref,
                location,
                ..
            } => self.execute_var_decl(name, var_type, init.as_deref(), *is_static, *is_ref, *location),
            AstNode::DeclList { decls, .. } => {
                for decl in decls {
                    self.execute_statement(decl)?;
                }
                Ok(())
            }
            AstNode::Block { statements, .. } => self.execute_scoped(statements),
            AstNode::Return { expr, .. } => {
                self.return_value = match expr {
                    Some(expr) => Some(self.evaluate_expr(expr)?),
                    None => None,
                };
                self.control_flow = ControlFlow::Return;
                Ok(())
            }
            AstNode::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                if self.evaluate_expr(condition)?.is_truthy() {
                    self.execute_scoped(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute_scoped(else_branch)
                } else {
                    Ok(())
                }
            }
            AstNode::While {
                condition,
                body,
                location,
            } => self.execute_while(condition, body, *location),
            AstNode::DoWhile {
                body,
                condition,
                location,
            } => self.execute_do_while(body, condition, *location),
            AstNode::For {
                init,
                condition,
                increment,
                body,
                location,
            } => self.execute_for(
                init.as_deref(),
                condition.as_deref(),
                increment.as_deref(),
                body,
                *location,
            ),
            AstNode::ForEach {
                var_type,
                name,
                by_ref,
                iterable,
                body,
                location,
            } => self.execute_for_each(var_type, name, *by_ref, iterable, body, *location),
            AstNode::Switch { expr, cases, .. } => self.execute_switch(expr, cases),
            AstNode::Break { .. } => {
                self.control_flow = ControlFlow::Break;
                Ok(())
            }
            AstNode::Continue { .. } => {
                self.control_flow = ControlFlow::Continue;
                Ok(())
            }
            AstNode::ExpressionStatement { expr, .. } => {
                self.evaluate_expr(expr)?;
                Ok(())
            }
            AstNode::Empty { .. } | AstNode::FunctionDecl { .. } => Ok(()),
            AstNode::FunctionDef { name, location, .. } => Err(RuntimeError::Unsupported {
                message: format!("nested definition of '{name}'"),
                location: *location,
            }),
            expr => {
                self.evaluate_expr(expr)?;
                Ok(())
            }
        }
    }

    fn execute_var_decl(
        &mut self,
        name: &str,
        var_type: &Type,
        init: Option<&AstNode>,
        is_static: bool,
        is_ref: bool,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        // A static local is initialized once and shared by every call
        let is_static_local = is_static && self.in_function();
        if is_static_local {
            if let Some(place) = self.statics.get(&location).cloned() {
                self.bind(name, place);
                return Ok(());
            }
        }

        let place = if is_ref {
            let target = init.ok_or_else(|| RuntimeError::Unsupported {
                message: format!("reference '{name}' must be initialized"),
                location,
            })?;
            if is_assignable(target) {
                self.place_of(target)?
            } else {
                let value = self.evaluate_expr(target)?;
                Place::slot(self.convert(value, var_type, location)?, *var_type)
            }
        } else {
            let value = match init {
                Some(expr) => self.evaluate_expr(expr)?,
                None => zero_value(var_type),
            };
            let value = self.convert(value, var_type, location)?;
            let ty = match (var_type.base, &value) {
                (BaseType::Auto, Value::Float(_)) => Type::new(BaseType::Double),
                (BaseType::Auto, Value::Str(_)) => Type::new(BaseType::Str),
                (BaseType::Auto, Value::Int(_)) => Type::new(BaseType::Long),
                _ => *var_type,
            };
            Place::slot(value, ty)
        };

        if is_static_local {
            self.statics.insert(location, place.clone());
        }
        self.bind(name, place);
        Ok(())
    }

    fn execute_switch(&mut self, expr: &AstNode, cases: &[CaseNode]) -> Result<(), RuntimeError> {
        let switch_val = self.evaluate_expr(expr)?;
        let switch_int = switch_val.as_int().ok_or_else(|| RuntimeError::TypeError {
            message: format!("switch on {}", switch_val.type_name()),
            location: *expr.location(),
        })?;

        let mut start = None;
        let mut default_index = None;
        for (i, case) in cases.iter().enumerate() {
            match case {
                CaseNode::Case { value, .. } => {
                    if self.evaluate_expr(value)?.as_int() == Some(switch_int) {
                        start = Some(i);
                        break;
                    }
                }
                CaseNode::Default { .. } => default_index = Some(i),
            }
        }
        let Some(start) = start.or(default_index) else {
            return Ok(());
        };

        self.enter_scope();
        let mut result = Ok(());
        for case in &cases[start..] {
            let statements = match case {
                CaseNode::Case { statements, .. } | CaseNode::Default { statements, .. } => statements,
            };
            result = self.execute_block(statements);
            if result.is_err() || self.control_flow != ControlFlow::Normal {
                break;
            }
        }
        self.exit_scope();

        if self.control_flow == ControlFlow::Break {
            self.control_flow = ControlFlow::Normal;
        }
        result
    }
}

/// Expressions that denote storage and can be bound by reference.
pub(crate) fn is_assignable(expr: &AstNode) -> bool {
    matches!(
        expr,
        AstNode::Variable(..)
            | AstNode::ArrayAccess { .. }
            | AstNode::UnaryOp { op: UnOp::Deref, .. }
            | AstNode::OutParam { .. }
    )
}
