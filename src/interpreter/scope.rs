//! Name resolution and variable access: the scope search, synonym and hook
//! following, protection keys and member get/put.

use std::rc::Rc;

use super::builtins::array::array_index;
use super::{Completion, FrameKind, HookOp, Interpreter, VarFlags, VarLink, VarRef, Variable};
use crate::error::ErrorKind;
use crate::types::{JsString, JsValue, ObjectId};

/// Longest prototype chain walked before giving up on a cycle.
const MAX_CHAIN: usize = 10_000;
const MAX_SYNONYMS: usize = 64;

impl Interpreter {
    /// First object on the prototype chain of `start` that owns `name`.
    pub(crate) fn find_owner(&self, start: ObjectId, name: &str) -> Option<ObjectId> {
        let mut current = Some(start);
        for _ in 0..MAX_CHAIN {
            let id = current?;
            let obj = self.heap.get(id)?;
            if obj.own(name).is_some() {
                return Some(id);
            }
            current = obj.prototype;
        }
        None
    }

    pub(crate) fn has_property(&self, object: ObjectId, name: &str) -> bool {
        self.find_owner(object, name).is_some()
    }

    pub(crate) fn has_own(&self, object: ObjectId, name: &str) -> bool {
        self.heap.get(object).is_some_and(|o| o.own(name).is_some())
    }

    /// Resolves an identifier without creating it. Returns the variable and
    /// the object to use as `this` when the name is called as a function.
    ///
    /// Search order: the innermost frame's `with` objects, its locals, its
    /// definition scope chain, its `this` chain; then outer frames, where
    /// host-installed `with` objects are always visible and everything else
    /// only when every frame in between is an eval or native frame; finally
    /// the global object.
    pub(crate) fn lookup(&self, name: &JsString) -> Option<(VarRef, Option<ObjectId>)> {
        let found = |object: ObjectId| VarRef {
            object,
            name: name.clone(),
        };
        let top = self.frames.len() - 1;
        let frame = &self.frames[top];

        for w in frame.with_stack.iter().rev() {
            if let Some(owner) = self.find_owner(w.object, name) {
                return Some((found(owner), Some(w.object)));
            }
        }
        if matches!(frame.kind, FrameKind::Function | FrameKind::Eval)
            && self.has_own(frame.locals, name)
        {
            return Some((found(frame.locals), None));
        }
        if let Some(owner) = self.find_owner(frame.fscope, name) {
            return Some((found(owner), None));
        }
        if let Some(this) = frame.this
            && let Some(owner) = self.find_owner(this, name)
        {
            return Some((found(owner), Some(this)));
        }

        let mut transparent = matches!(frame.kind, FrameKind::Eval | FrameKind::Native);
        for outer in self.frames[..top].iter().rev() {
            for w in outer.with_stack.iter().rev() {
                if (w.global || transparent)
                    && let Some(owner) = self.find_owner(w.object, name)
                {
                    return Some((found(owner), Some(w.object)));
                }
            }
            if transparent && outer.kind != FrameKind::Native && self.has_own(outer.locals, name) {
                return Some((found(outer.locals), None));
            }
            transparent = transparent && matches!(outer.kind, FrameKind::Eval | FrameKind::Native);
        }

        self.find_owner(self.global, name)
            .map(|owner| (found(owner), None))
    }

    /// Like [`Interpreter::lookup`], but an unknown name is created as an
    /// undefined global.
    pub(crate) fn findvar(&mut self, name: &JsString) -> (VarRef, Option<ObjectId>) {
        if let Some(found) = self.lookup(name) {
            return found;
        }
        let global = self.global;
        if let Some(obj) = self.heap.get_mut(global) {
            obj.push(Variable::new(name.clone(), JsValue::Undefined));
        }
        (
            VarRef {
                object: global,
                name: name.clone(),
            },
            None,
        )
    }

    /// Declares `name` in `scope` if it is not already an own variable.
    pub(crate) fn declare_var(&mut self, scope: ObjectId, name: &JsString) {
        if let Some(obj) = self.heap.get_mut(scope)
            && obj.own(name).is_none()
        {
            let var = obj.push(Variable::new(name.clone(), JsValue::Undefined));
            var.flags |= VarFlags::DONTDELETE;
        }
    }

    pub(crate) fn define_hidden(&mut self, object: ObjectId, name: &str, value: JsValue) {
        if let Some(obj) = self.heap.get_mut(object) {
            obj.put_hidden(name, value);
        }
    }

    /// Follows synonym links to the variable that actually stores the value.
    fn resolve_synonym(&self, vref: &VarRef) -> VarRef {
        let mut current = vref.clone();
        for _ in 0..MAX_SYNONYMS {
            match self.heap.get(current.object).and_then(|o| o.own(&current.name)) {
                Some(Variable {
                    link: VarLink::Synonym(target),
                    ..
                }) => current = target.clone(),
                _ => break,
            }
        }
        current
    }

    /// Reads a variable through synonyms and get hooks. A variable carrying
    /// a protection key other than the interpreter's raises an error.
    pub(crate) fn get_var(&mut self, vref: &VarRef) -> Completion {
        let target = self.resolve_synonym(vref);
        let Some(var) = self.heap.get(target.object).and_then(|o| o.own(&target.name)) else {
            return Completion::Normal(JsValue::Undefined);
        };
        if var.protkey != 0 && var.protkey != self.protkey {
            let name = var.name.clone();
            return self.runtime_error(
                ErrorKind::General,
                format!("access to protected variable '{name}' denied"),
            );
        }
        match &var.link {
            VarLink::Hook(hook) => {
                let hook = *hook;
                (hook.func)(self, hook.owner, HookOp::Get)
            }
            _ => Completion::Normal(var.value.clone()),
        }
    }

    /// Writes a variable through synonyms and set hooks. Plain writes clear
    /// the hidden flag. Protection keys do not apply to writes.
    pub(crate) fn set_var(&mut self, vref: &VarRef, value: JsValue) -> Completion {
        let target = self.resolve_synonym(vref);
        let value = value.unbound();
        let hook = self
            .heap
            .get(target.object)
            .and_then(|o| o.own(&target.name))
            .and_then(|var| match &var.link {
                VarLink::Hook(hook) => Some(*hook),
                _ => None,
            });
        if let Some(hook) = hook {
            return (hook.func)(self, hook.owner, HookOp::Set(value));
        }
        if let Some(obj) = self.heap.get_mut(target.object) {
            match obj.own_mut(&target.name) {
                Some(var) => {
                    var.value = value.clone();
                    var.flags.remove(VarFlags::HIDDEN);
                }
                None => {
                    obj.push(Variable::new(target.name.clone(), value.clone()));
                }
            }
        }
        Completion::Normal(value)
    }

    /// `base[key]`. Primitives read through their prototype; methods found
    /// that way are bound to a temporary wrapper object.
    pub(crate) fn get_member(&mut self, base: &JsValue, key: &str) -> Completion {
        let proto = match base {
            JsValue::Object(r) => match r.id {
                Some(id) => return self.object_member(id, key),
                None => return self.type_error("null has no properties"),
            },
            JsValue::Undefined => return self.type_error("undefined has no properties"),
            JsValue::String(s) => {
                if key == "length" {
                    return Completion::Normal(JsValue::number(s.chars().count()));
                }
                self.builtins.string_proto
            }
            JsValue::Number(_) => self.builtins.number_proto,
            JsValue::Boolean(_) => self.builtins.boolean_proto,
        };
        let Some(owner) = self.find_owner(proto, key) else {
            return Completion::Normal(JsValue::Undefined);
        };
        let value = try_completion!(self.get_var(&VarRef {
            object: owner,
            name: Rc::from(key),
        }));
        if self.callable_id(&value).is_some() {
            let wrapper = try_result!(self.to_object(base));
            return Completion::Normal(self.bind_this(value, wrapper));
        }
        Completion::Normal(value)
    }

    fn object_member(&mut self, object: ObjectId, key: &str) -> Completion {
        match self.find_owner(object, key) {
            Some(owner) => {
                let value = try_completion!(self.get_var(&VarRef {
                    object: owner,
                    name: Rc::from(key),
                }));
                Completion::Normal(self.bind_this(value, object))
            }
            None if key == "prototype" && self.is_script_function(object) => {
                Completion::Normal(JsValue::object(self.function_prototype(object)))
            }
            None => Completion::Normal(JsValue::Undefined),
        }
    }

    /// Function values read as members remember their receiver.
    fn bind_this(&self, value: JsValue, receiver: ObjectId) -> JsValue {
        match self.callable_id(&value) {
            Some(f) => JsValue::bound(f, receiver),
            None => value,
        }
    }

    /// `object[key] = value`. An absent member is first offered to the
    /// object's add-property hook, then added as a plain property.
    pub(crate) fn put_member(&mut self, object: ObjectId, key: &str, value: JsValue) -> Completion {
        let vref = VarRef {
            object,
            name: Rc::from(key),
        };
        if self.has_own(object, key) {
            try_completion!(self.set_var(&vref, value.clone()));
            return Completion::Normal(value);
        }
        let hook = self.heap.get(object).and_then(|o| o.add_hook);
        if let Some(hook) = hook
            && hook(self, object, key)
        {
            try_completion!(self.set_var(&vref, value.clone()));
            return Completion::Normal(value);
        }
        if let Some(obj) = self.heap.get_mut(object) {
            obj.push(Variable::new(vref.name, value.clone().unbound()));
        }
        Completion::Normal(value)
    }

    /// Removes an own property. Non-deletable variables stay and report
    /// `false`.
    pub(crate) fn delete_member(&mut self, object: ObjectId, key: &str) -> bool {
        let Some(obj) = self.heap.get_mut(object) else {
            return true;
        };
        match obj.own(key) {
            Some(var) if var.flags.contains(VarFlags::DONTDELETE) => false,
            Some(_) => {
                obj.remove(key);
                true
            }
            None => true,
        }
    }

    /// Array indices below `limit` held by `start` or its prototypes,
    /// ascending and without duplicates.
    pub(crate) fn index_keys(&self, start: ObjectId, limit: usize) -> Vec<usize> {
        let mut keys = Vec::new();
        let mut current = Some(start);
        for _ in 0..MAX_CHAIN {
            let Some(obj) = current.and_then(|id| self.heap.get(id)) else {
                break;
            };
            keys.extend(
                obj.properties
                    .iter()
                    .filter_map(|var| array_index(&var.name))
                    .filter(|&i| i < limit),
            );
            current = obj.prototype;
        }
        keys.sort_unstable();
        keys.dedup();
        keys
    }

    /// Names visited by `for..in`: own properties first, then inherited
    /// ones, skipping hidden variables and shadowed names.
    pub(crate) fn enumerable_keys(&self, object: ObjectId) -> Vec<JsString> {
        let mut seen: Vec<JsString> = Vec::new();
        let mut keys = Vec::new();
        let mut current = Some(object);
        for _ in 0..MAX_CHAIN {
            let Some(obj) = current.and_then(|id| self.heap.get(id)) else {
                break;
            };
            for var in &obj.properties {
                if seen.contains(&var.name) {
                    continue;
                }
                seen.push(var.name.clone());
                if !var.flags.contains(VarFlags::HIDDEN) {
                    keys.push(var.name.clone());
                }
            }
            current = obj.prototype;
        }
        keys
    }
}
