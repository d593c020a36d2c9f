//! Loop statement execution (`while`, `do-while`, `for`, range-`for`).
//!
//! `break` and `continue` are propagated via `LoopBodyResult` so the loop
//! driver can react without inspecting `control_flow` directly. A `return`
//! inside a body yields `LoopBodyResult::Exit`, which unwinds the loop and
//! leaves the signal for the enclosing call.

use crate::interpreter::engine::{ControlFlow, Interpreter};
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::statements::is_assignable;
use crate::memory::value::{Place, Value};
use crate::parser::ast::*;

/// How a loop body ended.
pub(crate) enum LoopBodyResult {
    /// Ran to completion or hit `continue`
    Continue,
    /// Hit `break`
    Break,
    /// `return`; unwind and propagate
    Exit,
}

impl Interpreter {
    /// Executes `body` inside a fresh scope.
    pub(crate) fn execute_loop_body(
        &mut self,
        body: &[AstNode],
    ) -> Result<LoopBodyResult, RuntimeError> {
        self.execute_scoped(body)?;
        Ok(match self.control_flow {
            ControlFlow::Normal => LoopBodyResult::Continue,
            ControlFlow::Continue => {
                self.control_flow = ControlFlow::Normal;
                LoopBodyResult::Continue
            }
            ControlFlow::Break => {
                self.control_flow = ControlFlow::Normal;
                LoopBodyResult::Break
            }
            ControlFlow::Return => LoopBodyResult::Exit,
        })
    }

    pub(crate) fn execute_while(
        &mut self,
        condition: &AstNode,
        body: &[AstNode],
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        loop {
            self.current_location = location;
            self.tick()?;
            if !self.evaluate_expr(condition)?.is_truthy() {
                return Ok(());
            }
            match self.execute_loop_body(body)? {
                LoopBodyResult::Continue => {}
                LoopBodyResult::Break | LoopBodyResult::Exit => return Ok(()),
            }
        }
    }

    pub(crate) fn execute_do_while(
        &mut self,
        body: &[AstNode],
        condition: &AstNode,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        loop {
            self.tick()?;
            match self.execute_loop_body(body)? {
                LoopBodyResult::Continue => {}
                LoopBodyResult::Break | LoopBodyResult::Exit => return Ok(()),
            }
            self.current_location = location;
            if !self.evaluate_expr(condition)?.is_truthy() {
                return Ok(());
            }
        }
    }

    pub(crate) fn execute_for(
        &mut self,
        init: Option<&AstNode>,
        condition: Option<&AstNode>,
        increment: Option<&AstNode>,
        body: &[AstNode],
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        // The init declaration is scoped to the loop
        self.enter_scope();
        let result = self.run_for(init, condition, increment, body, location);
        self.exit_scope();
        result
    }

    fn run_for(
        &mut self,
        init: Option<&AstNode>,
        condition: Option<&AstNode>,
        increment: Option<&AstNode>,
        body: &[AstNode],
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        if let Some(init) = init {
            self.execute_statement(init)?;
        }
        loop {
            self.current_location = location;
            self.tick()?;
            if let Some(condition) = condition {
                if !self.evaluate_expr(condition)?.is_truthy() {
                    return Ok(());
                }
            }
            match self.execute_loop_body(body)? {
                LoopBodyResult::Continue => {}
                LoopBodyResult::Break | LoopBodyResult::Exit => return Ok(()),
            }
            if let Some(increment) = increment {
                self.evaluate_expr(increment)?;
            }
        }
    }

    /// `for (T x : s)` over a `std::string`, or over an array.
    pub(crate) fn execute_for_each(
        &mut self,
        var_type: &Type,
        name: &str,
        by_ref: bool,
        iterable: &AstNode,
        body: &[AstNode],
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let base = if is_assignable(iterable) {
            self.place_of(iterable)?
        } else {
            let value = self.evaluate_expr(iterable)?;
            Place::slot(value, Type::new(BaseType::Auto))
        };

        let over_text = self.holds_text(&base);
        let array = if over_text {
            None
        } else {
            match self.read_place(&base, location)? {
                Value::Ptr(ptr) => Some(ptr),
                other => {
                    return Err(RuntimeError::TypeError {
                        message: format!("cannot iterate over {}", other.type_name()),
                        location,
                    })
                }
            }
        };

        let mut index = 0usize;
        loop {
            self.tick()?;
            let place = match &array {
                None => {
                    let len = self.with_text(&base, location, |t| Ok(t.len()))?;
                    if index >= len {
                        return Ok(());
                    }
                    Place::TextChar {
                        base: Box::new(base.clone()),
                        index,
                    }
                }
                Some(ptr) => {
                    let len = ptr.buf.borrow().len() as isize;
                    if ptr.offset + index as isize >= len {
                        return Ok(());
                    }
                    Place::Elem(ptr.offset_by(index as i64))
                }
            };

            self.enter_scope();
            if by_ref {
                self.bind(name, place);
            } else {
                let value = self.read_place(&place, location)?;
                let value = self.convert(value, var_type, location)?;
                self.bind(name, Place::slot(value, *var_type));
            }
            let result = self.execute_block(body);
            self.exit_scope();
            result?;

            match self.control_flow {
                ControlFlow::Normal => {}
                ControlFlow::Continue => self.control_flow = ControlFlow::Normal,
                ControlFlow::Break => {
                    self.control_flow = ControlFlow::Normal;
                    return Ok(());
                }
                ControlFlow::Return => return Ok(()),
            }
            index += 1;
        }
    }
}
