// Execution engine for the inbuilt C and C++ subsets

use crate::interpreter::errors::RuntimeError;
use crate::interpreter::files::FileTable;
use crate::interpreter::streams::StreamState;
use crate::memory::buffer::{Buffer, MemError};
use crate::memory::output::OutputSink;
use crate::memory::value::{Place, Pointer, Value};
use crate::memory::{coerce, zero_value};
use crate::parser::ast::*;
use crate::parser::Dialect;
use rustc_hash::FxHashMap;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

/// How often (in executed steps) the deadline and control channel are polled.
const POLL_INTERVAL: u64 = 1024;

/// Everything an [`Interpreter`] needs besides the program itself.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub dialect: Dialect,
    pub stdin: String,
    /// Directory relative file paths are resolved against.
    pub source_dir: PathBuf,
    pub timeout: Duration,
    pub max_output_bytes: usize,
    pub max_call_depth: usize,
    pub max_buffer_elems: usize,
}

/// Messages a host can send to a running interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Terminate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ControlFlow {
    Normal,
    Break,
    Continue,
    Return,
}

#[derive(Debug)]
pub(crate) struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<AstNode>,
    pub return_type: Type,
}

/// One activation record: a stack of block scopes.
#[derive(Debug, Default)]
struct Frame {
    scopes: Vec<FxHashMap<String, Place>>,
}

/// Tree-walking interpreter for a lowered program
pub struct Interpreter {
    pub(crate) dialect: Dialect,
    pub(crate) functions: FxHashMap<String, Rc<FunctionDef>>,
    globals_init: Vec<AstNode>,
    globals: FxHashMap<String, Place>,
    frames: Vec<Frame>,
    /// `static` locals, keyed by their declaration site
    pub(crate) statics: FxHashMap<SourceLocation, Place>,
    pub(crate) control_flow: ControlFlow,
    pub(crate) return_value: Option<Value>,
    pub(crate) output: OutputSink,
    pub(crate) files: FileTable,
    pub(crate) stream: StreamState,
    pub(crate) rand_state: u64,
    pub(crate) started: Instant,
    deadline: Instant,
    timeout: Duration,
    control: Option<Receiver<Control>>,
    steps: u64,
    max_call_depth: usize,
    pub(crate) max_buffer_elems: usize,
    pub(crate) current_location: SourceLocation,
}

impl Interpreter {
    pub fn new(program: Program, options: RunOptions) -> Self {
        let mut functions = FxHashMap::default();
        let mut globals_init = Vec::new();

        for node in program.nodes {
            match node {
                AstNode::FunctionDef {
                    name,
                    params,
                    body,
                    return_type,
                    ..
                } => {
                    functions.insert(
                        name.clone(),
                        Rc::new(FunctionDef {
                            name,
                            params,
                            body,
                            return_type,
                        }),
                    );
                }
                other => globals_init.push(other),
            }
        }

        let started = Instant::now();
        Interpreter {
            dialect: options.dialect,
            functions,
            globals_init,
            globals: FxHashMap::default(),
            frames: Vec::new(),
            statics: FxHashMap::default(),
            control_flow: ControlFlow::Normal,
            return_value: None,
            output: OutputSink::new(options.max_output_bytes),
            files: FileTable::new(options.stdin.into_bytes(), options.source_dir),
            stream: StreamState::default(),
            rand_state: 1,
            started,
            deadline: started + options.timeout,
            timeout: options.timeout,
            control: None,
            steps: 0,
            max_call_depth: options.max_call_depth,
            max_buffer_elems: options.max_buffer_elems,
            current_location: SourceLocation::new(1, 1),
        }
    }

    /// Accept [`Control`] messages from the host while running.
    pub fn with_control(mut self, control: Receiver<Control>) -> Self {
        self.control = Some(control);
        self
    }

    /// Run the program to completion and return its exit code.
    ///
    /// `exit(code)` is reported as `Ok(code)`. Open files are flushed on every
    /// path out of the program.
    pub fn run(&mut self) -> Result<i32, RuntimeError> {
        let result = self.run_main();
        self.files.flush_all();
        match result {
            Err(RuntimeError::Exit { code }) => Ok(code),
            other => other,
        }
    }

    fn run_main(&mut self) -> Result<i32, RuntimeError> {
        let globals = std::mem::take(&mut self.globals_init);
        for decl in &globals {
            self.execute_statement(decl)?;
        }

        let main = self
            .functions
            .get("main")
            .cloned()
            .ok_or_else(|| RuntimeError::UndefinedFunction {
                name: "main".to_string(),
                location: SourceLocation::new(1, 1),
            })?;

        // main(int argc, char **argv) sees a single program name
        let args: Vec<Value> = match main.params.len() {
            0 => Vec::new(),
            _ => {
                let name = Value::Ptr(Pointer::new(Buffer::c_string(b"main").into_ref(), 0));
                let argv = Buffer::from_values(
                    Type::new(BaseType::Char).with_pointer(),
                    vec![name, Value::Null],
                );
                let mut args = vec![Value::Int(1), Value::Ptr(Pointer::new(argv.into_ref(), 0))];
                args.truncate(main.params.len());
                args
            }
        };

        let location = SourceLocation::new(1, 1);
        let value = self.invoke(&main, args.into_iter().map(Binding::Value).collect(), location)?;
        Ok(match value {
            Value::Void => 0,
            other => other.as_int().unwrap_or(0) as i32,
        })
    }

    // ===== Limits =====

    /// Count one step; every [`POLL_INTERVAL`] steps check the deadline and the
    /// control channel.
    pub(crate) fn tick(&mut self) -> Result<(), RuntimeError> {
        self.steps += 1;
        if self.steps % POLL_INTERVAL != 0 {
            return Ok(());
        }
        if Instant::now() >= self.deadline {
            return Err(RuntimeError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            });
        }
        if let Some(control) = &self.control {
            match control.try_recv() {
                Ok(Control::Terminate) | Err(TryRecvError::Disconnected) => {
                    return Err(RuntimeError::Cancelled)
                }
                Err(TryRecvError::Empty) => {}
            }
        }
        Ok(())
    }

    /// Fail if a buffer of `elems` elements would exceed the heap budget.
    pub(crate) fn check_allocation(
        &self,
        elems: usize,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        if elems > self.max_buffer_elems {
            return Err(RuntimeError::OutOfMemory {
                requested: elems,
                limit: self.max_buffer_elems,
                location,
            });
        }
        Ok(())
    }

    // ===== Scopes =====

    pub(crate) fn enter_scope(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.scopes.push(FxHashMap::default());
        }
    }

    pub(crate) fn exit_scope(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.scopes.pop();
        }
    }

    pub(crate) fn in_function(&self) -> bool {
        !self.frames.is_empty()
    }

    /// Bind `name` in the innermost scope (or globally outside functions).
    pub(crate) fn bind(&mut self, name: &str, place: Place) {
        match self.frames.last_mut().and_then(|f| f.scopes.last_mut()) {
            Some(scope) => {
                scope.insert(name.to_string(), place);
            }
            None => {
                self.globals.insert(name.to_string(), place);
            }
        }
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<&Place> {
        if let Some(frame) = self.frames.last() {
            if let Some(place) = frame.scopes.iter().rev().find_map(|s| s.get(name)) {
                return Some(place);
            }
        }
        self.globals.get(name)
    }

    // ===== Places =====

    pub(crate) fn mem_error(&self, err: MemError, location: SourceLocation) -> RuntimeError {
        match err {
            MemError::OutOfBounds { index, size } => RuntimeError::BufferOverrun {
                index,
                size,
                location,
            },
            MemError::Freed => RuntimeError::UseAfterFree { location },
            MemError::Unterminated => RuntimeError::InvalidString {
                message: "string is not NUL-terminated".to_string(),
                location,
            },
        }
    }

    pub(crate) fn read_place(
        &self,
        place: &Place,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        match place {
            Place::Slot { cell, .. } => Ok(cell.borrow().clone()),
            Place::Elem(ptr) => ptr
                .buf
                .borrow_mut()
                .get(ptr.offset)
                .map_err(|e| self.mem_error(e, location)),
            Place::TextChar { base, index } => self.with_text(base, location, |text| {
                match text.get(*index) {
                    Some(b) => Ok(Value::Int(*b as i8 as i64)),
                    None if *index == text.len() => Ok(Value::Int(0)),
                    None => Err(MemError::OutOfBounds {
                        index: *index as isize,
                        size: text.len(),
                    }),
                }
            }),
        }
    }

    /// Store `value` (converted to the place's type) and return what was stored.
    pub(crate) fn write_place(
        &self,
        place: &Place,
        value: Value,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        match place {
            Place::Slot { cell, ty } => {
                let value = self.convert(value, ty, location)?;
                *cell.borrow_mut() = value.clone();
                Ok(value)
            }
            Place::Elem(ptr) => {
                let elem = {
                    let buf = ptr.buf.borrow();
                    if buf.typed {
                        buf.elem
                    } else {
                        Type::new(BaseType::UChar)
                    }
                };
                let value = self.convert(value, &elem, location)?;
                ptr.buf
                    .borrow_mut()
                    .set(ptr.offset, value.clone())
                    .map_err(|e| self.mem_error(e, location))?;
                Ok(value)
            }
            Place::TextChar { base, index } => {
                let byte = value.as_int().ok_or_else(|| RuntimeError::TypeError {
                    message: format!("cannot store {} in a string character", value.type_name()),
                    location,
                })? as u8;
                let mut text = match self.read_place(base, location)? {
                    Value::Str(text) => text,
                    other => {
                        return Err(RuntimeError::TypeError {
                            message: format!("{} is not a string", other.type_name()),
                            location,
                        })
                    }
                };
                match text.get_mut(*index) {
                    Some(slot) => *slot = byte,
                    None => {
                        return Err(RuntimeError::BufferOverrun {
                            index: *index as isize,
                            size: text.len(),
                            location,
                        })
                    }
                }
                self.write_place(base, Value::Str(text), location)?;
                Ok(Value::Int(byte as i8 as i64))
            }
        }
    }

    /// Run `f` on the string stored at `place` without copying it.
    pub(crate) fn with_text<T>(
        &self,
        place: &Place,
        location: SourceLocation,
        f: impl FnOnce(&[u8]) -> Result<T, MemError>,
    ) -> Result<T, RuntimeError> {
        let value = match place {
            Place::Slot { cell, .. } => {
                if let Value::Str(text) = &*cell.borrow() {
                    return f(text).map_err(|e| self.mem_error(e, location));
                }
                cell.borrow().clone()
            }
            other => self.read_place(other, location)?,
        };
        match value {
            Value::Str(text) => f(&text).map_err(|e| self.mem_error(e, location)),
            other => Err(RuntimeError::TypeError {
                message: format!("{} is not a string", other.type_name()),
                location,
            }),
        }
    }

    /// Whether `place` currently holds a `std::string`.
    pub(crate) fn holds_text(&self, place: &Place) -> bool {
        match place {
            Place::Slot { cell, .. } => matches!(&*cell.borrow(), Value::Str(_)),
            Place::Elem(ptr) => {
                let buf = ptr.buf.borrow();
                buf.typed && buf.elem.base == BaseType::Str && !buf.elem.is_pointer()
            }
            Place::TextChar { .. } => false,
        }
    }

    pub(crate) fn convert(
        &self,
        value: Value,
        ty: &Type,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        coerce(value, ty).map_err(|message| RuntimeError::TypeError { message, location })
    }

    // ===== Calls =====

    /// Invoke a user-defined function with already evaluated arguments.
    pub(crate) fn invoke(
        &mut self,
        function: &FunctionDef,
        args: Vec<Binding>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        if args.len() != function.params.len() {
            return Err(RuntimeError::ArgumentCountMismatch {
                function: function.name.clone(),
                expected: function.params.len(),
                got: args.len(),
                location,
            });
        }
        if self.frames.len() >= self.max_call_depth {
            return Err(RuntimeError::StackOverflow {
                limit: self.max_call_depth,
                location,
            });
        }
        self.tick()?;

        let mut scope = FxHashMap::default();
        for (param, arg) in function.params.iter().zip(args) {
            let place = match arg {
                Binding::Place(place) => place,
                Binding::Value(value) => {
                    let value = self.convert(value, &param.param_type, location)?;
                    Place::slot(value, param.param_type)
                }
            };
            scope.insert(param.name.clone(), place);
        }
        self.frames.push(Frame {
            scopes: vec![scope],
        });

        let saved_location = self.current_location;
        let result = self.execute_block(&function.body);
        self.frames.pop();
        self.current_location = saved_location;
        result?;

        self.control_flow = ControlFlow::Normal;
        let value = self.return_value.take();
        if function.return_type.base == BaseType::Void && !function.return_type.is_pointer() {
            return Ok(Value::Void);
        }
        match value {
            Some(value) => self.convert(value, &function.return_type, location),
            None => Ok(zero_value(&function.return_type)),
        }
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.current_location
    }

    pub fn output(&self) -> &OutputSink {
        &self.output
    }
}

/// An argument as passed to a user function.
#[derive(Debug, Clone)]
pub(crate) enum Binding {
    Value(Value),
    /// C++ reference parameter
    Place(Place),
}
