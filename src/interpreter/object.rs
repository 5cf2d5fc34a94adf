use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;

use super::{Completion, Interpreter};
use crate::ast::FunctionDecl;
use crate::error::ErrorKind;
use crate::types::{JsNumber, JsString, JsValue, ObjectId};

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct VarFlags: u8 {
        /// Skipped by `for..in`; cleared by explicit assignment.
        const HIDDEN = 1 << 0;
        const SYNONYM = 1 << 1;
        const DONTDELETE = 1 << 2;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ObjFlags: u8 {
        const CLEARING = 1 << 0;
        const TEMP = 1 << 1;
        const USED = 1 << 2;
        /// `obj(key)` is sugar for `obj[key]`.
        const ASFUNCTION = 1 << 3;
    }
}

/// Assignable location: a named slot in an object's property list.
#[derive(Clone, Debug, PartialEq)]
pub struct VarRef {
    pub object: ObjectId,
    pub name: JsString,
}

pub enum HookOp {
    Get,
    Set(JsValue),
}

/// Property hook: intercepts reads and writes of one variable. `Get`
/// returns the value to read; `Set` returns the value actually stored.
pub type VarHookFn = fn(&mut Interpreter, ObjectId, HookOp) -> Completion;

/// Offered a name before a plain property is added to an object. Returns
/// `true` when the hook created the property itself.
pub type AddPropertyHook = fn(&mut Interpreter, ObjectId, &str) -> bool;

#[derive(Clone, Copy)]
pub struct VarHook {
    pub func: VarHookFn,
    pub owner: ObjectId,
}

#[derive(Clone, Default)]
pub enum VarLink {
    #[default]
    None,
    Hook(VarHook),
    Synonym(VarRef),
}

#[derive(Clone)]
pub struct Variable {
    pub name: JsString,
    pub value: JsValue,
    pub link: VarLink,
    pub protkey: u32,
    pub flags: VarFlags,
}

impl Variable {
    pub fn new(name: JsString, value: JsValue) -> Self {
        Variable {
            name,
            value,
            link: VarLink::None,
            protkey: 0,
            flags: VarFlags::empty(),
        }
    }
}

/// Native payload of built-in object kinds.
#[derive(Clone, Debug, Default)]
pub enum Internal {
    #[default]
    None,
    Array {
        length: usize,
    },
    Date(JsNumber),
    String(JsString),
    Boolean(bool),
    Number(JsNumber),
    Error(ErrorKind),
}

pub type NativeFn = Rc<dyn Fn(&mut Interpreter, &JsValue, &[JsValue]) -> Completion>;

pub struct NativeFunction {
    pub name: JsString,
    pub params: Vec<JsString>,
    pub func: NativeFn,
}

#[derive(Clone)]
pub enum Callable {
    Script { decl: Rc<FunctionDecl>, scope: ObjectId },
    Native(Rc<NativeFunction>),
}

impl Callable {
    pub fn name(&self) -> Option<&str> {
        match self {
            Callable::Script { decl, .. } => decl.name.as_deref(),
            Callable::Native(n) => Some(&n.name),
        }
    }
}

#[derive(Default)]
pub struct JsObject {
    pub properties: Vec<Variable>,
    pub internal: Internal,
    pub callable: Option<Callable>,
    pub constructor: Option<ObjectId>,
    pub prototype: Option<ObjectId>,
    pub add_hook: Option<AddPropertyHook>,
    pub flags: ObjFlags,
}

impl JsObject {
    pub fn with_prototype(prototype: Option<ObjectId>) -> Self {
        JsObject {
            prototype,
            ..Default::default()
        }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|v| &*v.name == name)
    }

    pub fn own(&self, name: &str) -> Option<&Variable> {
        self.properties.iter().find(|v| &*v.name == name)
    }

    pub fn own_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.properties.iter_mut().find(|v| &*v.name == name)
    }

    /// Inserts a binding. Callers check for an existing name first.
    pub fn push(&mut self, var: Variable) -> &mut Variable {
        let idx = self.properties.len();
        self.properties.push(var);
        &mut self.properties[idx]
    }

    /// Sets or replaces a plain value, keeping an existing variable's flags.
    pub fn put(&mut self, name: &str, value: JsValue) {
        match self.own_mut(name) {
            Some(var) => var.value = value,
            None => {
                self.push(Variable::new(Rc::from(name), value));
            }
        }
    }

    pub fn put_hidden(&mut self, name: &str, value: JsValue) {
        self.put(name, value);
        if let Some(var) = self.own_mut(name) {
            var.flags |= VarFlags::HIDDEN;
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Variable> {
        self.position(name).map(|i| self.properties.remove(i))
    }

    pub fn is_callable(&self) -> bool {
        self.callable.is_some()
    }

    /// `[object <Class>]` tag.
    pub fn class_name(&self) -> &'static str {
        if self.callable.is_some() {
            return "Function";
        }
        match self.internal {
            Internal::None => "Object",
            Internal::Array { .. } => "Array",
            Internal::Date(_) => "Date",
            Internal::String(_) => "String",
            Internal::Boolean(_) => "Boolean",
            Internal::Number(_) => "Number",
            Internal::Error(_) => "Error",
        }
    }
}

impl fmt::Debug for JsObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsObject")
            .field("class", &self.class_name())
            .field(
                "properties",
                &self.properties.iter().map(|v| &*v.name).collect::<Vec<_>>(),
            )
            .field("prototype", &self.prototype)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_keeps_insertion_order_and_flags() {
        let mut obj = JsObject::default();
        obj.put("b", JsValue::number(1.0));
        obj.put_hidden("length", JsValue::number(0.0));
        obj.put("a", JsValue::number(2.0));
        obj.put("b", JsValue::number(3.0));
        let names: Vec<&str> = obj.properties.iter().map(|v| &*v.name).collect();
        assert_eq!(names, ["b", "length", "a"]);
        assert!(obj.own("length").unwrap().flags.contains(VarFlags::HIDDEN));
        assert_eq!(obj.own("b").unwrap().value.to_string(), "3");
    }

    #[test]
    fn remove_drops_binding() {
        let mut obj = JsObject::default();
        obj.put("x", JsValue::Boolean(true));
        assert!(obj.remove("x").is_some());
        assert!(obj.own("x").is_none());
        assert!(obj.remove("x").is_none());
    }

    #[test]
    fn class_names() {
        let mut obj = JsObject::default();
        assert_eq!(obj.class_name(), "Object");
        obj.internal = Internal::Array { length: 0 };
        assert_eq!(obj.class_name(), "Array");
        obj.internal = Internal::Date(JsNumber::ZERO);
        assert_eq!(obj.class_name(), "Date");
    }
}
