//! `Error` and the native error constructors.

use super::*;

impl Interpreter {
    pub(crate) fn setup_errors(&mut self) {
        let proto = self.builtins.error_proto;
        self.define_constructor(
            "Error",
            &["message"],
            |interp: &mut Interpreter, this: &JsValue, args: &[JsValue]| {
                construct_error(interp, ErrorKind::General, this, args)
            },
            proto,
        );
        self.define_hidden(proto, "name", JsValue::string("Error"));
        self.define_hidden(proto, "message", JsValue::string(""));
        self.define_method(proto, "toString", &[], error_to_string);

        for (i, kind) in ErrorKind::NATIVE.into_iter().enumerate() {
            let proto = self.builtins.native_error_protos[i];
            self.define_constructor(
                kind.name(),
                &["message"],
                move |interp: &mut Interpreter, this: &JsValue, args: &[JsValue]| {
                    construct_error(interp, kind, this, args)
                },
                proto,
            );
            self.define_hidden(proto, "name", JsValue::string(kind.name()));
            self.define_hidden(proto, "message", JsValue::string(""));
        }
    }

    /// Error object of `kind` carrying `message`, as raised by runtime
    /// errors inside `try`.
    pub(crate) fn new_error(&mut self, kind: ErrorKind, message: &str) -> JsValue {
        let mut obj = JsObject::with_prototype(Some(self.builtins.error_proto(kind)));
        obj.internal = Internal::Error(kind);
        obj.put("message", JsValue::string(message));
        JsValue::object(self.heap.alloc(obj))
    }
}

/// Called with or without `new`; both produce a fresh error object.
fn construct_error(
    interp: &mut Interpreter,
    kind: ErrorKind,
    this: &JsValue,
    args: &[JsValue],
) -> Completion {
    let target = match this.as_object() {
        Some(id) if interp.is_constructing() => id,
        _ => {
            let proto = interp.builtins.error_proto(kind);
            interp.heap.alloc(JsObject::with_prototype(Some(proto)))
        }
    };
    interp.set_internal(target, Internal::Error(kind));
    let message = arg(args, 0);
    if !message.is_undefined() {
        let text = try_result!(interp.to_string(&message));
        try_completion!(interp.put_member(target, "message", JsValue::String(text)));
    }
    Completion::Normal(JsValue::object(target))
}

fn error_to_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Completion {
    let name = try_completion!(interp.get_member(this, "name"));
    let name = try_result!(interp.to_string(&name));
    let message = try_completion!(interp.get_member(this, "message"));
    let message = try_result!(interp.to_string(&message));
    if message.is_empty() {
        return Completion::Normal(JsValue::String(name));
    }
    Completion::Normal(JsValue::from(format!("{name}: {message}")))
}
