//! Tree-walking evaluator: frames, the completion state machine and the
//! host-facing entry points.

use std::rc::Rc;
use std::time::Instant;

use crate::ast::{Program, Statement, StatementKind};
use crate::error::{Error, ErrorKind};
use crate::parser::{self, ParseError};
use crate::types::{JsString, JsValue, ObjectId};

/// Unwraps a `Completion::Normal` value, returning any other completion
/// from the enclosing function.
macro_rules! try_completion {
    ($e:expr) => {
        match $e {
            Completion::Normal(v) => v,
            other => return other,
        }
    };
}

/// Unwraps `Ok`, returning the `Err` completion from the enclosing function.
macro_rules! try_result {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(c) => return c,
        }
    };
}

mod builtins;
mod call;
mod coerce;
mod eval;
mod exec;
mod heap;
mod object;
mod report;
mod scope;
#[cfg(test)]
mod tests;

pub(crate) use builtins::Builtins;
pub use coerce::{string_to_number, to_boolean};
pub use heap::GcStats;
use heap::Heap;
pub use object::{
    AddPropertyHook, Callable, HookOp, Internal, JsObject, NativeFn, NativeFunction, ObjFlags,
    VarFlags, VarHook, VarHookFn, VarLink, VarRef, Variable,
};
pub use report::{
    DebugAction, DebugEvent, DefaultHost, ErrorAction, ErrorReport, Feedback, Host,
};

use crate::config::Config;

/// Outcome of evaluating a statement or expression.
#[derive(Clone, Debug)]
pub enum Completion {
    Normal(JsValue),
    Return(JsValue),
    Throw(JsValue),
    Break(Option<JsString>),
    Continue(Option<JsString>),
    /// Execution was aborted by an error, the host or the debugger. Unwinds
    /// everything, skipping `finally` blocks.
    Stop,
}

impl Completion {
    pub fn is_abrupt(&self) -> bool {
        !matches!(self, Completion::Normal(_))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FrameKind {
    Global,
    Function,
    /// Shares the caller's scope.
    Eval,
    /// Synthetic frame around a native call.
    Native,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct WithEntry {
    pub object: ObjectId,
    /// Installed by the host; visible from every nested frame.
    pub global: bool,
}

/// One activation. The outermost frame is the global frame and is never
/// popped.
#[derive(Debug)]
pub(crate) struct Frame {
    pub kind: FrameKind,
    /// Activation object holding parameters and `var`s.
    pub locals: ObjectId,
    /// Lexical scope the function was defined in.
    pub fscope: ObjectId,
    pub with_stack: Vec<WithEntry>,
    pub arguments: Option<ObjectId>,
    /// The function object being run.
    pub def: Option<ObjectId>,
    pub this: Option<ObjectId>,
    pub construct: bool,
}

impl Frame {
    fn global(global: ObjectId) -> Self {
        Frame {
            kind: FrameKind::Global,
            locals: global,
            fscope: global,
            with_stack: Vec::new(),
            arguments: None,
            def: None,
            this: Some(global),
            construct: false,
        }
    }

    fn roots(&self, out: &mut Vec<ObjectId>) {
        out.push(self.locals);
        out.push(self.fscope);
        out.extend(self.with_stack.iter().map(|w| w.object));
        out.extend(self.arguments);
        out.extend(self.def);
        out.extend(self.this);
    }
}

pub struct Interpreter {
    pub(crate) heap: Heap,
    pub(crate) config: Config,
    pub(crate) host: Box<dyn Host>,
    pub(crate) frames: Vec<Frame>,
    pub(crate) global: ObjectId,
    pub(crate) builtins: Builtins,
    pub(crate) call_depth: usize,
    pub(crate) try_depth: usize,
    /// Key required to read protected variables; 0 reads only unprotected ones.
    pub(crate) protkey: u32,
    pub(crate) pending_error: Option<(ErrorKind, String)>,
    pub(crate) random_state: u64,
    stopped: bool,
    single_step: bool,
    started: Instant,
    elements: u64,
    result: JsValue,
}

impl Interpreter {
    pub fn new(config: Config) -> Self {
        let host = Box::new(DefaultHost::new(config.timeout));
        Self::with_host(config, host)
    }

    pub fn with_host(config: Config, host: Box<dyn Host>) -> Self {
        let mut heap = Heap::new();
        let builtins = Builtins::allocate(&mut heap);
        let global = heap.alloc(JsObject::with_prototype(Some(builtins.object_proto)));
        let seed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x2545_F491_4F6C_DD1D);
        let mut interp = Interpreter {
            heap,
            config,
            host,
            frames: vec![Frame::global(global)],
            global,
            builtins,
            call_depth: 0,
            try_depth: 0,
            protkey: 0,
            pending_error: None,
            random_state: seed | 1,
            stopped: false,
            single_step: false,
            started: Instant::now(),
            elements: 0,
            result: JsValue::Undefined,
        };
        interp.setup_globals();
        log::debug!("interpreter ready, {} objects", interp.heap.live());
        interp
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn global(&self) -> ObjectId {
        self.global
    }

    /// Parses source text into a reusable program.
    pub fn compile(&self, source: &str) -> Result<Program, ParseError> {
        parser::parse(source)
    }

    /// Runs `program` at global level. `this` defaults to the global object;
    /// `with_table` objects are searched before the global object for the
    /// whole run. Returns the value of the last value-producing statement.
    pub fn execute(
        &mut self,
        program: &Program,
        this: Option<ObjectId>,
        with_table: &[ObjectId],
    ) -> JsValue {
        self.reset_run_state();
        self.frames.truncate(1);
        let global = self.global;
        {
            let frame = &mut self.frames[0];
            frame.this = Some(this.unwrap_or(global));
            frame.with_stack = with_table
                .iter()
                .map(|&object| WithEntry {
                    object,
                    global: true,
                })
                .collect();
        }
        log::debug!("executing {} top-level statements", program.body.len());

        self.hoist(&program.body, global);
        let mut result = JsValue::Undefined;
        for stmt in &program.body {
            match self.exec_statement(stmt) {
                Completion::Normal(v) => {
                    if produces_value(stmt) {
                        result = v;
                    }
                }
                Completion::Stop => break,
                _ => {}
            }
            if self.stopped {
                break;
            }
            // The collector roots the last value through `self.result`.
            self.result = result.clone();
            self.maybe_gc();
        }

        let frame = &mut self.frames[0];
        frame.with_stack.clear();
        frame.this = Some(global);
        log::debug!(
            "execution finished after {} elements{}",
            self.elements,
            if self.stopped { " (stopped)" } else { "" }
        );
        self.result = result.clone();
        result
    }

    /// Compiles and executes `source` against the global object. Syntax
    /// errors are reported through the host and returned; runtime errors
    /// are only reported.
    pub fn run_javascript(&mut self, source: &str) -> Result<JsValue, Error> {
        let program = match self.compile(source) {
            Ok(p) => p,
            Err(e) => {
                if self.config.show_errors {
                    let report = ErrorReport {
                        kind: ErrorKind::Syntax,
                        message: e.message.clone(),
                        line: e.line,
                        source: source_line(source, e.line),
                    };
                    self.host.report_error(&report);
                }
                return Err(e.into());
            }
        };
        Ok(self.execute(&program, None, &[]))
    }

    /// True when the last execution was aborted.
    pub fn was_stopped(&self) -> bool {
        self.stopped
    }

    /// Value of the last execution.
    pub fn return_value(&self) -> &JsValue {
        &self.result
    }

    /// String conversion as scripts see it, invoking `toString` on objects.
    pub fn to_display_string(&mut self, value: &JsValue) -> String {
        match self.to_string(value) {
            Ok(s) => s.to_string(),
            Err(_) => value.to_string(),
        }
    }

    pub fn new_object(&mut self) -> ObjectId {
        let proto = self.builtins.object_proto;
        self.heap.alloc(JsObject::with_prototype(Some(proto)))
    }

    pub fn new_array(&mut self, elements: &[JsValue]) -> ObjectId {
        self.create_array(elements.to_vec())
    }

    pub fn set_property(&mut self, object: ObjectId, name: &str, value: JsValue) {
        let _ = self.put_member(object, name, value);
    }

    pub fn get_property(&mut self, object: ObjectId, name: &str) -> JsValue {
        match self.get_member(&JsValue::object(object), name) {
            Completion::Normal(v) => v,
            _ => JsValue::Undefined,
        }
    }

    /// Adds a native method to `target` (or to the global object).
    pub fn register_function(
        &mut self,
        target: Option<ObjectId>,
        name: &str,
        params: &[&str],
        func: impl Fn(&mut Interpreter, &JsValue, &[JsValue]) -> Completion + 'static,
    ) -> ObjectId {
        let target = target.unwrap_or(self.global);
        let f = self.make_native(name, params, Rc::new(func));
        self.define_hidden(target, name, JsValue::object(f));
        f
    }

    /// Installs a get/set hook on `object.name`, creating the variable.
    pub fn add_hook(&mut self, object: ObjectId, name: &str, func: VarHookFn, owner: ObjectId) {
        if let Some(obj) = self.heap.get_mut(object) {
            if obj.own(name).is_none() {
                obj.push(Variable::new(Rc::from(name), JsValue::Undefined));
            }
            if let Some(var) = obj.own_mut(name) {
                var.link = VarLink::Hook(VarHook { func, owner });
            }
        }
    }

    /// Lets scripts call `object(key)` as shorthand for `object[key]`, the
    /// way host collections such as `document.forms` are used.
    pub fn set_call_as_member(&mut self, object: ObjectId, enabled: bool) {
        if let Some(obj) = self.heap.get_mut(object) {
            obj.flags.set(ObjFlags::ASFUNCTION, enabled);
        }
    }

    pub fn set_add_property_hook(&mut self, object: ObjectId, hook: Option<AddPropertyHook>) {
        if let Some(obj) = self.heap.get_mut(object) {
            obj.add_hook = hook;
        }
    }

    /// Makes `object.name` readable only while the interpreter's key equals
    /// `key`.
    pub fn protect_property(&mut self, object: ObjectId, name: &str, key: u32) {
        if let Some(var) = self.heap.get_mut(object).and_then(|o| o.own_mut(name)) {
            var.protkey = key;
        }
    }

    pub fn set_protection_key(&mut self, key: u32) {
        self.protkey = key;
    }

    /// Pins or releases a host-held object so collection leaves it alone.
    pub fn keep_object(&mut self, object: ObjectId, keep: bool) {
        if keep {
            self.heap.pin(object);
        } else {
            self.heap.unpin(object);
        }
    }

    pub fn is_live(&self, object: ObjectId) -> bool {
        self.heap.contains(object)
    }

    pub fn collect_garbage(&mut self) -> GcStats {
        let mut roots = vec![self.global];
        self.builtins.roots(&mut roots);
        for frame in &self.frames {
            frame.roots(&mut roots);
        }
        heap::trace_value(&self.result, &mut roots);
        let stats = self.heap.collect(roots);
        log::debug!("gc: {} live, {} freed", stats.live, stats.freed);
        stats
    }

    fn maybe_gc(&mut self) {
        if self.frames.len() == 1 && self.heap.allocated_since_gc() > self.config.gc_threshold {
            self.collect_garbage();
        }
    }

    fn reset_run_state(&mut self) {
        self.stopped = false;
        self.single_step = false;
        self.pending_error = None;
        self.try_depth = 0;
        self.call_depth = 0;
        self.elements = 0;
        self.started = Instant::now();
    }

    pub(crate) fn frame(&self) -> &Frame {
        // The global frame is never popped.
        &self.frames[self.frames.len() - 1]
    }

    pub(crate) fn frame_mut(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Counts one evaluated element and asks the host whether to go on.
    pub(crate) fn poll_feedback(&mut self) -> bool {
        self.elements += 1;
        let info = Feedback {
            elapsed: self.started.elapsed(),
            elements: self.elements,
        };
        if self.host.feedback(&info) {
            true
        } else {
            log::info!("host cancelled execution");
            self.stopped = true;
            false
        }
    }

    /// Raises a runtime error: a catchable `Error` object inside `try`,
    /// otherwise a pending report that stops execution once it reaches the
    /// innermost statement.
    pub(crate) fn runtime_error(&mut self, kind: ErrorKind, message: impl Into<String>) -> Completion {
        let message = message.into();
        if self.try_depth > 0 {
            let err = self.new_error(kind, &message);
            return Completion::Throw(err);
        }
        if !self.stopped && self.pending_error.is_none() {
            log::debug!("runtime error: {kind}: {message}");
            self.pending_error = Some((kind, message));
        }
        Completion::Stop
    }

    pub(crate) fn type_error(&mut self, message: impl Into<String>) -> Completion {
        self.runtime_error(ErrorKind::Type, message)
    }

    pub(crate) fn stack_overflow(&mut self) -> Completion {
        self.runtime_error(ErrorKind::General, "Stack overflow")
    }

    /// Converts an exception escaping every `try` into a pending report.
    fn uncaught(&mut self, value: JsValue) {
        let kind = value
            .as_object()
            .and_then(|id| match self.heap.get(id)?.internal {
                Internal::Error(kind) => Some(kind),
                _ => None,
            });
        let entry = match kind {
            Some(kind) => {
                let msg = self.get_property_silent(&value, "message");
                (kind, msg)
            }
            None => {
                let text = self.to_display_string(&value);
                (ErrorKind::General, format!("uncaught exception: {text}"))
            }
        };
        if self.pending_error.is_none() {
            self.pending_error = Some(entry);
        }
    }

    fn get_property_silent(&mut self, value: &JsValue, name: &str) -> String {
        match self.get_member(value, name) {
            Completion::Normal(v) => self.to_display_string(&v),
            _ => String::new(),
        }
    }

    /// Hands a pending error to the host. A `Debug` answer resumes in
    /// single-step mode after the failing statement.
    fn report_pending(&mut self, stmt: &Statement) -> Completion {
        let Some((kind, message)) = self.pending_error.take() else {
            self.stopped = true;
            return Completion::Stop;
        };
        let report = ErrorReport {
            kind,
            message,
            line: stmt.line,
            source: stmt.to_string(),
        };
        let action = if self.config.show_errors {
            self.host.report_error(&report)
        } else {
            log::debug!("suppressed {}: {}", report.kind, report.message);
            ErrorAction::Abort
        };
        match action {
            ErrorAction::Debug => {
                self.single_step = true;
                self.stopped = false;
                Completion::Normal(JsValue::Undefined)
            }
            ErrorAction::Abort => {
                self.stopped = true;
                Completion::Stop
            }
        }
    }

    /// Gives the debugger a chance to run before `stmt`.
    fn debug_hook(&mut self, stmt: &Statement) -> bool {
        if !self.single_step {
            return true;
        }
        let event = DebugEvent {
            line: stmt.line,
            source: stmt.to_string(),
        };
        match self.host.debug_step(&event) {
            DebugAction::Step => true,
            DebugAction::Continue => {
                self.single_step = false;
                true
            }
            DebugAction::Abort => {
                self.stopped = true;
                false
            }
        }
    }
}

/// Statements whose normal completion replaces the running result.
pub(crate) fn produces_value(stmt: &Statement) -> bool {
    !matches!(
        stmt.kind,
        StatementKind::Empty | StatementKind::Variable(_) | StatementKind::FunctionDeclaration(_)
    )
}

fn source_line(source: &str, line: u32) -> String {
    source
        .lines()
        .nth(line.saturating_sub(1) as usize)
        .unwrap_or_default()
        .trim()
        .to_string()
}
