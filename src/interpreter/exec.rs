use super::*;
use crate::ast::*;
use crate::interpreter::coerce::strict_equals;
use crate::stack;

/// What a loop does after its body completes.
enum Flow {
    Next,
    Exit,
    Abrupt(Completion),
}

fn loop_flow(completion: Completion, labels: &[JsString], value: &mut JsValue) -> Flow {
    match completion {
        Completion::Normal(v) => {
            *value = v;
            Flow::Next
        }
        Completion::Continue(None) => Flow::Next,
        Completion::Continue(Some(l)) if labels.contains(&l) => Flow::Next,
        Completion::Break(None) => Flow::Exit,
        Completion::Break(Some(l)) if labels.contains(&l) => Flow::Exit,
        other => Flow::Abrupt(other),
    }
}

impl Interpreter {
    /// Runs one statement. This is where pending runtime errors and
    /// exceptions that escaped every `try` are reported.
    pub(crate) fn exec_statement(&mut self, stmt: &Statement) -> Completion {
        self.exec_labeled(stmt, &[])
    }

    fn exec_labeled(&mut self, stmt: &Statement, labels: &[JsString]) -> Completion {
        if self.is_stopped() || !self.poll_feedback() || !self.debug_hook(stmt) {
            return Completion::Stop;
        }
        let result = if stack::exhausted(stack::EVAL_RED_ZONE) {
            self.stack_overflow()
        } else {
            self.exec_statement_kind(stmt, labels)
        };
        match result {
            Completion::Throw(value) if self.try_depth == 0 => {
                self.uncaught(value);
                self.report_pending(stmt)
            }
            Completion::Stop if self.pending_error.is_some() => self.report_pending(stmt),
            other => other,
        }
    }

    fn exec_statement_kind(&mut self, stmt: &Statement, labels: &[JsString]) -> Completion {
        match &stmt.kind {
            StatementKind::Empty | StatementKind::FunctionDeclaration(_) => {
                Completion::Normal(JsValue::Undefined)
            }
            StatementKind::Expression(expr) => self.eval_expression(expr),
            StatementKind::Block(stmts) => self.exec_block(stmts),
            StatementKind::Variable(decls) => self.exec_variable_declarations(decls),
            StatementKind::If(i) => {
                let test = try_completion!(self.eval_expression(&i.test));
                if to_boolean(&test) {
                    self.exec_statement(&i.consequent)
                } else if let Some(alt) = &i.alternate {
                    self.exec_statement(alt)
                } else {
                    Completion::Normal(JsValue::Undefined)
                }
            }
            StatementKind::While(w) => self.exec_while(w, labels),
            StatementKind::DoWhile(d) => self.exec_do_while(d, labels),
            StatementKind::For(f) => self.exec_for(f, labels),
            StatementKind::ForIn(f) => self.exec_for_in(f, labels),
            StatementKind::Return(expr) => {
                let value = match expr {
                    Some(e) => try_completion!(self.eval_expression(e)),
                    None => JsValue::Undefined,
                };
                Completion::Return(value)
            }
            StatementKind::Break(label) => Completion::Break(label.clone()),
            StatementKind::Continue(label) => Completion::Continue(label.clone()),
            StatementKind::Throw(expr) => {
                let value = try_completion!(self.eval_expression(expr));
                Completion::Throw(value)
            }
            StatementKind::Try(t) => self.exec_try(t),
            StatementKind::Switch(s) => self.exec_switch(s, labels),
            StatementKind::Labeled(label, body) => {
                let mut all = labels.to_vec();
                all.push(label.clone());
                match self.exec_labeled(body, &all) {
                    Completion::Break(Some(l)) if all.contains(&l) => {
                        Completion::Normal(JsValue::Undefined)
                    }
                    other => other,
                }
            }
            StatementKind::With(expr, body) => {
                let value = try_completion!(self.eval_expression(expr));
                let object = try_result!(self.to_object(&value));
                self.frame_mut().with_stack.push(WithEntry {
                    object,
                    global: false,
                });
                let result = self.exec_statement(body);
                self.frame_mut().with_stack.pop();
                result
            }
        }
    }

    /// Runs a statement list; the value is that of the last statement that
    /// produced one.
    pub(crate) fn exec_block(&mut self, stmts: &[Statement]) -> Completion {
        let mut value = JsValue::Undefined;
        for stmt in stmts {
            match self.exec_statement(stmt) {
                Completion::Normal(v) => {
                    if produces_value(stmt) {
                        value = v;
                    }
                }
                other => return other,
            }
        }
        Completion::Normal(value)
    }

    /// Declares `var`s and functions of `body` in `scope` before it runs.
    pub(crate) fn hoist(&mut self, body: &[Statement], scope: ObjectId) {
        let (vars, funcs) = hoisted_declarations(body);
        for name in &vars {
            self.declare_var(scope, name);
        }
        for decl in funcs {
            let Some(name) = decl.name.clone() else {
                continue;
            };
            let f = self.new_function(decl, scope);
            self.declare_var(scope, &name);
            if let Some(var) = self.heap.get_mut(scope).and_then(|o| o.own_mut(&name)) {
                var.value = JsValue::object(f);
            }
        }
    }

    fn exec_variable_declarations(&mut self, decls: &[VariableDeclarator]) -> Completion {
        let locals = self.frame().locals;
        for d in decls {
            self.declare_var(locals, &d.name);
            if let Some(init) = &d.init {
                let value = try_completion!(self.eval_expression(init));
                let vref = VarRef {
                    object: locals,
                    name: d.name.clone(),
                };
                try_completion!(self.set_var(&vref, value));
            }
        }
        Completion::Normal(JsValue::Undefined)
    }

    fn exec_while(&mut self, w: &WhileStatement, labels: &[JsString]) -> Completion {
        let mut value = JsValue::Undefined;
        loop {
            let test = try_completion!(self.eval_expression(&w.test));
            if !to_boolean(&test) {
                break;
            }
            match loop_flow(self.exec_statement(&w.body), labels, &mut value) {
                Flow::Next => {}
                Flow::Exit => break,
                Flow::Abrupt(c) => return c,
            }
        }
        Completion::Normal(value)
    }

    fn exec_do_while(&mut self, d: &DoWhileStatement, labels: &[JsString]) -> Completion {
        let mut value = JsValue::Undefined;
        loop {
            match loop_flow(self.exec_statement(&d.body), labels, &mut value) {
                Flow::Next => {}
                Flow::Exit => break,
                Flow::Abrupt(c) => return c,
            }
            let test = try_completion!(self.eval_expression(&d.test));
            if !to_boolean(&test) {
                break;
            }
        }
        Completion::Normal(value)
    }

    fn exec_for(&mut self, f: &ForStatement, labels: &[JsString]) -> Completion {
        match &f.init {
            Some(ForInit::Variable(decls)) => {
                try_completion!(self.exec_variable_declarations(decls));
            }
            Some(ForInit::Expression(e)) => {
                try_completion!(self.eval_expression(e));
            }
            None => {}
        }
        let mut value = JsValue::Undefined;
        loop {
            if let Some(test) = &f.test {
                let t = try_completion!(self.eval_expression(test));
                if !to_boolean(&t) {
                    break;
                }
            }
            match loop_flow(self.exec_statement(&f.body), labels, &mut value) {
                Flow::Next => {}
                Flow::Exit => break,
                Flow::Abrupt(c) => return c,
            }
            if let Some(update) = &f.update {
                try_completion!(self.eval_expression(update));
            }
        }
        Completion::Normal(value)
    }

    /// Keys are collected before the first iteration; keys deleted while
    /// looping are skipped.
    fn exec_for_in(&mut self, f: &ForInStatement, labels: &[JsString]) -> Completion {
        if let ForInLeft::Variable(d) = &f.left {
            try_completion!(self.exec_variable_declarations(std::slice::from_ref(d)));
        }
        let subject = try_completion!(self.eval_expression(&f.right));
        if subject.is_undefined() || subject.is_null() {
            return Completion::Normal(JsValue::Undefined);
        }
        let object = try_result!(self.to_object(&subject));
        let keys = self.enumerable_keys(object);
        let mut value = JsValue::Undefined;
        for key in keys {
            if !self.has_property(object, &key) {
                continue;
            }
            let key_value = JsValue::String(key);
            match &f.left {
                ForInLeft::Variable(d) => {
                    let vref = VarRef {
                        object: self.frame().locals,
                        name: d.name.clone(),
                    };
                    try_completion!(self.set_var(&vref, key_value));
                }
                ForInLeft::Target(expr) => {
                    let target = try_result!(self.eval_target(expr));
                    try_completion!(self.write_target(&target, key_value));
                }
            }
            match loop_flow(self.exec_statement(&f.body), labels, &mut value) {
                Flow::Next => {}
                Flow::Exit => break,
                Flow::Abrupt(c) => return c,
            }
        }
        Completion::Normal(value)
    }

    /// `try_depth` counts dynamically enclosing `try` blocks. It is dropped
    /// before the handler runs so errors inside `catch` escape normally.
    /// A stop skips `finally`.
    fn exec_try(&mut self, t: &TryStatement) -> Completion {
        self.try_depth += 1;
        let mut result = self.exec_block(&t.block);
        self.try_depth -= 1;

        if let Completion::Throw(thrown) = &result
            && let Some(handler) = &t.handler
        {
            let thrown = thrown.clone();
            let locals = self.frame().locals;
            self.declare_var(locals, &handler.param);
            let vref = VarRef {
                object: locals,
                name: handler.param.clone(),
            };
            result = match self.set_var(&vref, thrown) {
                Completion::Normal(_) => {
                    // A bare assignment may have created the name as deletable.
                    if let Some(var) = self
                        .heap
                        .get_mut(locals)
                        .and_then(|o| o.own_mut(&handler.param))
                    {
                        var.flags |= VarFlags::DONTDELETE;
                    }
                    self.exec_block(&handler.body)
                }
                other => other,
            };
        }
        if matches!(result, Completion::Stop) {
            return result;
        }
        if let Some(finalizer) = &t.finalizer {
            let fin = self.exec_block(finalizer);
            if fin.is_abrupt() {
                return fin;
            }
        }
        result
    }

    fn exec_switch(&mut self, s: &SwitchStatement, labels: &[JsString]) -> Completion {
        let discriminant = try_completion!(self.eval_expression(&s.discriminant));
        let mut start = None;
        for (i, case) in s.cases.iter().enumerate() {
            if let Some(test) = &case.test {
                let v = try_completion!(self.eval_expression(test));
                if strict_equals(&discriminant, &v) {
                    start = Some(i);
                    break;
                }
            }
        }
        let Some(start) = start.or_else(|| s.cases.iter().position(|c| c.test.is_none())) else {
            return Completion::Normal(JsValue::Undefined);
        };
        let mut value = JsValue::Undefined;
        for stmt in s.cases[start..].iter().flat_map(|c| &c.consequent) {
            match self.exec_statement(stmt) {
                Completion::Normal(v) => {
                    if produces_value(stmt) {
                        value = v;
                    }
                }
                Completion::Break(None) => break,
                Completion::Break(Some(l)) if labels.contains(&l) => break,
                other => return other,
            }
        }
        Completion::Normal(value)
    }

    /// Runs `source` as `eval` code in the scope of the script that called
    /// `eval`: its locals, definition scope and `this`.
    pub(crate) fn eval_source(&mut self, source: &str) -> Completion {
        let program = match parser::parse(source) {
            Ok(p) => p,
            Err(e) => return self.runtime_error(ErrorKind::Syntax, e.message),
        };
        // The innermost frame belongs to the native `eval` itself.
        let caller = &self.frames[self.frames.len().saturating_sub(2)];
        let frame = Frame {
            kind: FrameKind::Eval,
            locals: caller.locals,
            fscope: caller.fscope,
            with_stack: Vec::new(),
            arguments: caller.arguments,
            def: caller.def,
            this: caller.this,
            construct: false,
        };
        let locals = frame.locals;
        self.frames.push(frame);
        self.hoist(&program.body, locals);
        let result = self.exec_block(&program.body);
        self.frames.pop();
        result
    }
}
