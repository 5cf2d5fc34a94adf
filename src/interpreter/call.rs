//! Function objects, invocation, construction and the recursion guard.

use super::*;
use crate::ast::FunctionDecl;
use crate::stack;

impl Interpreter {
    pub(crate) fn new_function(&mut self, decl: Rc<FunctionDecl>, scope: ObjectId) -> ObjectId {
        let mut obj = JsObject::with_prototype(Some(self.builtins.function_proto));
        obj.put_hidden("length", JsValue::number(decl.params.len()));
        obj.callable = Some(Callable::Script { decl, scope });
        self.heap.alloc(obj)
    }

    pub(crate) fn make_native(&mut self, name: &str, params: &[&str], func: NativeFn) -> ObjectId {
        let mut obj = JsObject::with_prototype(Some(self.builtins.function_proto));
        obj.put_hidden("length", JsValue::number(params.len()));
        obj.callable = Some(Callable::Native(Rc::new(NativeFunction {
            name: Rc::from(name),
            params: params.iter().map(|p| Rc::from(*p)).collect(),
            func,
        })));
        self.heap.alloc(obj)
    }

    /// The function object a value refers to, if it is callable.
    pub(crate) fn callable_id(&self, value: &JsValue) -> Option<ObjectId> {
        let id = value.as_object()?;
        self.heap.get(id)?.is_callable().then_some(id)
    }

    pub(crate) fn is_script_function(&self, id: ObjectId) -> bool {
        matches!(
            self.heap.get(id).and_then(|o| o.callable.as_ref()),
            Some(Callable::Script { .. })
        )
    }

    /// `F.prototype`, created on first use for script functions.
    pub(crate) fn function_prototype(&mut self, func: ObjectId) -> ObjectId {
        let existing = self
            .heap
            .get(func)
            .and_then(|o| o.own("prototype"))
            .and_then(|v| v.value.as_object());
        if let Some(proto) = existing {
            return proto;
        }
        let mut proto = JsObject::with_prototype(Some(self.builtins.object_proto));
        proto.put_hidden("constructor", JsValue::object(func));
        let proto = self.heap.alloc(proto);
        self.define_hidden(func, "prototype", JsValue::object(proto));
        proto
    }

    /// Calls `value` if it is a function, reporting a type error otherwise.
    pub(crate) fn call_value(
        &mut self,
        value: &JsValue,
        this: Option<ObjectId>,
        args: &[JsValue],
    ) -> Completion {
        match self.callable_id(value) {
            Some(f) => self.call_function(f, this, args, false),
            None => self.type_error(format!("{value} is not a function")),
        }
    }

    /// Invokes a function object. A missing `this` means the global
    /// object. Calls nested deeper than the configured limit, or made with
    /// too little native stack left, raise a stack overflow error instead of
    /// recursing further.
    pub(crate) fn call_function(
        &mut self,
        func: ObjectId,
        this: Option<ObjectId>,
        args: &[JsValue],
        construct: bool,
    ) -> Completion {
        let Some(callable) = self.heap.get(func).and_then(|o| o.callable.clone()) else {
            return self.type_error("value is not a function");
        };
        if self.call_depth >= self.config.max_call_depth {
            log::debug!("call depth limit {} reached", self.config.max_call_depth);
            return self.stack_overflow();
        }
        if stack::exhausted(stack::EVAL_RED_ZONE) {
            return self.stack_overflow();
        }
        let this = Some(this.unwrap_or(self.global));
        self.call_depth += 1;
        log::trace!(
            "call {} (depth {})",
            callable.name().unwrap_or("<anonymous>"),
            self.call_depth
        );
        let result = match callable {
            Callable::Script { decl, scope } => {
                self.call_script(func, &decl, scope, this, args, construct)
            }
            Callable::Native(native) => self.call_native(func, &native, this, args, construct),
        };
        self.call_depth -= 1;
        result
    }

    fn call_script(
        &mut self,
        func: ObjectId,
        decl: &FunctionDecl,
        scope: ObjectId,
        this: Option<ObjectId>,
        args: &[JsValue],
        construct: bool,
    ) -> Completion {
        let locals = self.heap.alloc(JsObject::with_prototype(Some(scope)));
        let arguments = self.arguments_object(func, locals, decl, args);
        if let Some(obj) = self.heap.get_mut(locals) {
            for (i, param) in decl.params.iter().enumerate() {
                let value = args.get(i).cloned().unwrap_or(JsValue::Undefined);
                obj.put(param, value.unbound());
            }
            if obj.own("arguments").is_none() {
                let var = obj.push(Variable::new(Rc::from("arguments"), JsValue::object(arguments)));
                var.flags |= VarFlags::DONTDELETE;
            }
        }
        self.frames.push(Frame {
            kind: FrameKind::Function,
            locals,
            fscope: scope,
            with_stack: Vec::new(),
            arguments: Some(arguments),
            def: Some(func),
            this,
            construct,
        });
        self.hoist(&decl.body, locals);
        let result = self.exec_block(&decl.body);
        self.frames.pop();
        match result {
            Completion::Normal(_) => Completion::Normal(JsValue::Undefined),
            Completion::Return(v) => Completion::Normal(v),
            other => other,
        }
    }

    /// Array-like `arguments`: element `i` aliases parameter `i` while one
    /// exists, so writes through either name are seen by the other.
    fn arguments_object(
        &mut self,
        func: ObjectId,
        locals: ObjectId,
        decl: &FunctionDecl,
        args: &[JsValue],
    ) -> ObjectId {
        let arguments = self.new_array_object(args.len());
        if let Some(obj) = self.heap.get_mut(arguments) {
            obj.prototype = Some(self.builtins.object_proto);
            for (i, value) in args.iter().enumerate() {
                let name: JsString = Rc::from(i.to_string());
                let var = match decl.params.get(i) {
                    Some(param) => Variable {
                        link: VarLink::Synonym(VarRef {
                            object: locals,
                            name: param.clone(),
                        }),
                        flags: VarFlags::SYNONYM,
                        ..Variable::new(name, JsValue::Undefined)
                    },
                    None => Variable::new(name, value.clone().unbound()),
                };
                obj.push(var);
            }
            obj.put_hidden("callee", JsValue::object(func));
        }
        arguments
    }

    fn call_native(
        &mut self,
        func: ObjectId,
        native: &NativeFunction,
        this: Option<ObjectId>,
        args: &[JsValue],
        construct: bool,
    ) -> Completion {
        let global = self.global;
        self.frames.push(Frame {
            kind: FrameKind::Native,
            locals: global,
            fscope: global,
            with_stack: Vec::new(),
            arguments: None,
            def: Some(func),
            this,
            construct,
        });
        let this_value = this.map_or(JsValue::Undefined, JsValue::object);
        let result = (native.func)(self, &this_value, args);
        self.frames.pop();
        match result {
            Completion::Return(v) => Completion::Normal(v),
            other => other,
        }
    }

    /// `new F(args)`: a fresh object inheriting from `F.prototype` is passed
    /// as `this` and is the result unless the constructor returns another
    /// object. It stays pinned while the constructor runs.
    pub(crate) fn construct(&mut self, func: ObjectId, args: &[JsValue]) -> Completion {
        let proto = self.function_prototype(func);
        let mut obj = JsObject::with_prototype(Some(proto));
        obj.constructor = Some(func);
        let id = self.heap.alloc(obj);
        self.heap.pin(id);
        let result = self.call_function(func, Some(id), args, true);
        self.heap.unpin(id);
        match result {
            Completion::Normal(v) => match v.as_object() {
                Some(other) => Completion::Normal(JsValue::object(other)),
                None => Completion::Normal(JsValue::object(id)),
            },
            other => other,
        }
    }

    /// Whether the running native was invoked through `new`.
    pub(crate) fn is_constructing(&self) -> bool {
        self.frame().construct
    }
}
