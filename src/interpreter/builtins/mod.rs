pub(crate) mod array;
mod date;
mod error;
mod number;
mod string;

use super::*;
use crate::types::JsNumber;

use super::heap::Heap;

/// Signature of the built-in methods.
pub(crate) type Builtin = fn(&mut Interpreter, &JsValue, &[JsValue]) -> Completion;

/// Prototype objects shared by every instance of a built-in class. They are
/// allocated before the global object and stay rooted for the lifetime of
/// the interpreter.
#[derive(Debug)]
pub(crate) struct Builtins {
    pub object_proto: ObjectId,
    pub function_proto: ObjectId,
    pub array_proto: ObjectId,
    pub string_proto: ObjectId,
    pub boolean_proto: ObjectId,
    pub number_proto: ObjectId,
    pub date_proto: ObjectId,
    pub error_proto: ObjectId,
    /// Indexed like [`ErrorKind::NATIVE`].
    pub native_error_protos: [ObjectId; 6],
}

impl Builtins {
    pub(crate) fn allocate(heap: &mut Heap) -> Self {
        let object_proto = heap.alloc(JsObject::default());
        let derived = |heap: &mut Heap, parent: ObjectId, internal: Internal| {
            let mut obj = JsObject::with_prototype(Some(parent));
            obj.internal = internal;
            heap.alloc(obj)
        };
        let function_proto = derived(heap, object_proto, Internal::None);
        let array_proto = derived(heap, object_proto, Internal::None);
        let string_proto = derived(heap, object_proto, Internal::String(Rc::from("")));
        let boolean_proto = derived(heap, object_proto, Internal::Boolean(false));
        let number_proto = derived(heap, object_proto, Internal::Number(JsNumber::ZERO));
        let date_proto = derived(heap, object_proto, Internal::None);
        let error_proto = derived(heap, object_proto, Internal::None);
        let native_error_protos =
            ErrorKind::NATIVE.map(|_| derived(heap, error_proto, Internal::None));
        Builtins {
            object_proto,
            function_proto,
            array_proto,
            string_proto,
            boolean_proto,
            number_proto,
            date_proto,
            error_proto,
            native_error_protos,
        }
    }

    pub(crate) fn error_proto(&self, kind: ErrorKind) -> ObjectId {
        ErrorKind::NATIVE
            .iter()
            .position(|k| *k == kind)
            .map_or(self.error_proto, |i| self.native_error_protos[i])
    }

    pub(crate) fn roots(&self, out: &mut Vec<ObjectId>) {
        out.extend([
            self.object_proto,
            self.function_proto,
            self.array_proto,
            self.string_proto,
            self.boolean_proto,
            self.number_proto,
            self.date_proto,
            self.error_proto,
        ]);
        out.extend(self.native_error_protos);
    }
}

pub(crate) fn arg(args: &[JsValue], i: usize) -> JsValue {
    args.get(i).cloned().unwrap_or(JsValue::Undefined)
}

impl Interpreter {
    pub(crate) fn setup_globals(&mut self) {
        let global = self.global;
        self.define_hidden(global, "NaN", JsValue::Number(JsNumber::NAN));
        self.define_hidden(global, "Infinity", JsValue::Number(JsNumber::POS_INFINITY));
        self.define_hidden(global, "undefined", JsValue::Undefined);

        self.setup_object();
        self.setup_function();
        self.setup_boolean();
        self.setup_number();
        self.setup_math();
        self.setup_string();
        self.setup_array();
        self.setup_date();
        self.setup_errors();

        self.define_method(global, "eval", &["x"], global_eval);
        self.define_method(global, "escape", &["string"], global_escape);
        self.define_method(global, "unescape", &["string"], global_unescape);
    }

    pub(crate) fn define_method(&mut self, target: ObjectId, name: &str, params: &[&str], f: Builtin) {
        let func = self.make_native(name, params, Rc::new(f));
        self.define_hidden(target, name, JsValue::object(func));
    }

    /// Registers a global constructor and links it with its prototype.
    pub(crate) fn define_constructor(
        &mut self,
        name: &str,
        params: &[&str],
        f: impl Fn(&mut Interpreter, &JsValue, &[JsValue]) -> Completion + 'static,
        proto: ObjectId,
    ) -> ObjectId {
        let ctor = self.make_native(name, params, Rc::new(f));
        self.define_hidden(ctor, "prototype", JsValue::object(proto));
        self.define_hidden(proto, "constructor", JsValue::object(ctor));
        let global = self.global;
        self.define_hidden(global, name, JsValue::object(ctor));
        ctor
    }

    /// Replaces the internal payload of a constructor's `this`.
    pub(crate) fn set_internal(&mut self, object: ObjectId, internal: Internal) {
        if let Some(obj) = self.heap.get_mut(object) {
            obj.internal = internal;
        }
    }

    pub(crate) fn internal_of(&self, value: &JsValue) -> Option<&Internal> {
        Some(&self.heap.get(value.as_object()?)?.internal)
    }

    fn setup_object(&mut self) {
        let proto = self.builtins.object_proto;
        self.define_constructor("Object", &["value"], object_ctor, proto);
        self.define_method(proto, "toString", &[], object_to_string);
        self.define_method(proto, "toLocaleString", &[], object_to_locale_string);
        self.define_method(proto, "valueOf", &[], object_value_of);
        self.define_method(proto, "hasOwnProperty", &["name"], object_has_own_property);
        self.define_method(proto, "isPrototypeOf", &["object"], object_is_prototype_of);
        self.define_method(
            proto,
            "propertyIsEnumerable",
            &["name"],
            object_property_is_enumerable,
        );
    }

    fn setup_function(&mut self) {
        let proto = self.builtins.function_proto;
        self.define_constructor("Function", &["body"], function_ctor, proto);
        self.define_method(proto, "toString", &[], function_to_string);
        self.define_method(proto, "call", &["thisArg"], function_call);
        self.define_method(proto, "apply", &["thisArg", "args"], function_apply);
    }

    fn setup_boolean(&mut self) {
        let proto = self.builtins.boolean_proto;
        self.define_constructor("Boolean", &["value"], boolean_ctor, proto);
        self.define_method(proto, "toString", &[], boolean_to_string);
        self.define_method(proto, "valueOf", &[], boolean_value_of);
    }
}

fn object_ctor(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    match args.first() {
        Some(v) if !v.is_undefined() && !v.is_null() => {
            Completion::Normal(JsValue::object(try_result!(interp.to_object(v))))
        }
        _ if interp.is_constructing() => Completion::Normal(this.clone()),
        _ => Completion::Normal(JsValue::object(interp.new_object())),
    }
}

fn object_to_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Completion {
    let class = match this.as_object().and_then(|id| interp.heap.get(id)) {
        Some(obj) => obj.class_name(),
        None => "Object",
    };
    Completion::Normal(JsValue::from(format!("[object {class}]")))
}

fn object_to_locale_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Completion {
    Completion::Normal(JsValue::String(try_result!(interp.to_string(this))))
}

fn object_value_of(_interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Completion {
    Completion::Normal(this.clone())
}

fn object_has_own_property(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    let key = try_result!(interp.to_string(&arg(args, 0)));
    let found = this.as_object().is_some_and(|id| interp.has_own(id, &key));
    Completion::Normal(JsValue::Boolean(found))
}

fn object_is_prototype_of(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    let (Some(proto), Some(object)) = (this.as_object(), arg(args, 0).as_object()) else {
        return Completion::Normal(JsValue::Boolean(false));
    };
    let mut current = interp.heap.get(object).and_then(|o| o.prototype);
    while let Some(id) = current {
        if id == proto {
            return Completion::Normal(JsValue::Boolean(true));
        }
        current = interp.heap.get(id).and_then(|o| o.prototype);
    }
    Completion::Normal(JsValue::Boolean(false))
}

fn object_property_is_enumerable(
    interp: &mut Interpreter,
    this: &JsValue,
    args: &[JsValue],
) -> Completion {
    let key = try_result!(interp.to_string(&arg(args, 0)));
    let enumerable = this
        .as_object()
        .and_then(|id| interp.heap.get(id))
        .and_then(|o| o.own(&key))
        .is_some_and(|v| !v.flags.contains(VarFlags::HIDDEN));
    Completion::Normal(JsValue::Boolean(enumerable))
}

/// `Function(p1, ..., body)` compiles a new global-scope function.
fn function_ctor(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Completion {
    let mut params = Vec::new();
    let body = match args.split_last() {
        Some((last, rest)) => {
            for p in rest {
                params.push(try_result!(interp.to_string(p)).to_string());
            }
            try_result!(interp.to_string(last)).to_string()
        }
        None => String::new(),
    };
    let source = format!("function anonymous({}) {{\n{}\n}}", params.join(", "), body);
    let program = match parser::parse(&source) {
        Ok(p) => p,
        Err(e) => return interp.runtime_error(ErrorKind::Syntax, e.message),
    };
    let decl = match program.body.first().map(|s| &s.kind) {
        Some(StatementKind::FunctionDeclaration(decl)) if program.body.len() == 1 => decl.clone(),
        _ => return interp.runtime_error(ErrorKind::Syntax, "invalid function body"),
    };
    let global = interp.global;
    Completion::Normal(JsValue::object(interp.new_function(decl, global)))
}

fn function_to_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Completion {
    let callable = this
        .as_object()
        .and_then(|id| interp.heap.get(id))
        .and_then(|o| o.callable.clone());
    let text = match callable {
        Some(Callable::Script { decl, .. }) => decl.to_string(),
        Some(Callable::Native(native)) => {
            format!("function {}() {{\n    [native code]\n}}", native.name)
        }
        None => return interp.type_error("Function.prototype.toString called on incompatible object"),
    };
    Completion::Normal(JsValue::from(text))
}

/// Receiver for `call`/`apply`: null and undefined mean the global object.
fn receiver(interp: &mut Interpreter, value: &JsValue) -> Result<Option<ObjectId>, Completion> {
    if value.is_undefined() || value.is_null() {
        return Ok(None);
    }
    interp.to_object(value).map(Some)
}

fn function_call(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    let receiver = try_result!(receiver(interp, &arg(args, 0)));
    let rest = args.get(1..).unwrap_or_default();
    interp.call_value(&this.clone().unbound(), receiver, rest)
}

fn function_apply(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    let receiver = try_result!(receiver(interp, &arg(args, 0)));
    let list = arg(args, 1);
    let values = if list.is_undefined() || list.is_null() {
        Vec::new()
    } else {
        let Some(id) = list.as_object() else {
            return interp.type_error("second argument to Function.prototype.apply must be an array");
        };
        try_result!(interp.array_like_values(id))
    };
    interp.call_value(&this.clone().unbound(), receiver, &values)
}

fn boolean_ctor(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    let value = args.first().is_some_and(to_boolean);
    if interp.is_constructing()
        && let Some(id) = this.as_object()
    {
        interp.set_internal(id, Internal::Boolean(value));
        return Completion::Normal(this.clone());
    }
    Completion::Normal(JsValue::Boolean(value))
}

fn this_boolean(interp: &mut Interpreter, this: &JsValue) -> Result<bool, Completion> {
    match this {
        JsValue::Boolean(b) => Ok(*b),
        _ => match interp.internal_of(this) {
            Some(Internal::Boolean(b)) => Ok(*b),
            _ => Err(interp.type_error("Boolean.prototype method called on incompatible object")),
        },
    }
}

fn boolean_to_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Completion {
    let b = try_result!(this_boolean(interp, this));
    Completion::Normal(JsValue::string(if b { "true" } else { "false" }))
}

fn boolean_value_of(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Completion {
    Completion::Normal(JsValue::Boolean(try_result!(this_boolean(interp, this))))
}

/// Non-string arguments are returned unchanged.
fn global_eval(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Completion {
    match args.first() {
        Some(JsValue::String(source)) => {
            let source = source.clone();
            interp.eval_source(&source)
        }
        Some(other) => Completion::Normal(other.clone()),
        None => Completion::Normal(JsValue::Undefined),
    }
}

fn is_escape_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || "@*_+-./".contains(c)
}

fn global_escape(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Completion {
    let s = try_result!(interp.to_string(&arg(args, 0)));
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if is_escape_safe(c) {
            out.push(c);
            continue;
        }
        let mut units = [0u16; 2];
        for unit in c.encode_utf16(&mut units) {
            if *unit < 0x100 {
                out.push_str(&format!("%{unit:02X}"));
            } else {
                out.push_str(&format!("%u{unit:04X}"));
            }
        }
    }
    Completion::Normal(JsValue::from(out))
}

fn global_unescape(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Completion {
    let s = try_result!(interp.to_string(&arg(args, 0)));
    let chars: Vec<char> = s.chars().collect();
    let mut units: Vec<u16> = Vec::with_capacity(chars.len());
    let hex = |digits: &[char]| -> Option<u16> {
        let text: String = digits.iter().collect();
        if digits.iter().all(char::is_ascii_hexdigit) {
            u16::from_str_radix(&text, 16).ok()
        } else {
            None
        }
    };
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '%' {
            if chars.get(i + 1) == Some(&'u')
                && let Some(unit) = chars.get(i + 2..i + 6).and_then(hex)
            {
                units.push(unit);
                i += 6;
                continue;
            }
            if let Some(unit) = chars.get(i + 1..i + 3).and_then(hex) {
                units.push(unit);
                i += 3;
                continue;
            }
        }
        let mut buf = [0u16; 2];
        units.extend_from_slice(chars[i].encode_utf16(&mut buf));
        i += 1;
    }
    Completion::Normal(JsValue::from(String::from_utf16_lossy(&units)))
}
