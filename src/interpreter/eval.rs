use std::cmp::Ordering;

use super::*;
use crate::ast::*;
use crate::interpreter::coerce::strict_equals;
use crate::stack;
use crate::types::{JsNumber, number_ops};

/// Assignable location produced by the left side of an assignment.
pub(crate) enum Target {
    Var(VarRef),
    Member(ObjectId, JsString),
}

impl Interpreter {
    pub(crate) fn eval_expression(&mut self, expr: &Expression) -> Completion {
        if self.is_stopped() || !self.poll_feedback() {
            return Completion::Stop;
        }
        if stack::exhausted(stack::EVAL_RED_ZONE) {
            return self.stack_overflow();
        }
        match expr {
            Expression::Literal(lit) => Completion::Normal(literal_value(lit)),
            Expression::Identifier(name) => {
                let (vref, _) = self.findvar(name);
                self.get_var(&vref)
            }
            Expression::This => {
                let this = self.frame().this.unwrap_or(self.global);
                Completion::Normal(JsValue::object(this))
            }
            Expression::Array(elements) => self.eval_array_literal(elements),
            Expression::Object(props) => self.eval_object_literal(props),
            Expression::Function(decl) => {
                Completion::Normal(JsValue::object(self.function_expression(decl)))
            }
            Expression::Unary(op, operand) => {
                let v = try_completion!(self.eval_expression(operand));
                self.eval_unary(*op, &v)
            }
            Expression::Binary(op, left, right) => {
                let l = try_completion!(self.eval_expression(left));
                let r = try_completion!(self.eval_expression(right));
                self.binary_op(*op, &l, &r)
            }
            Expression::Logical(op, left, right) => {
                let l = try_completion!(self.eval_expression(left));
                match (op, to_boolean(&l)) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Completion::Normal(l),
                    _ => self.eval_expression(right),
                }
            }
            Expression::Update(op, prefix, target) => self.eval_update(*op, *prefix, target),
            Expression::Assign(op, left, right) => self.eval_assign(*op, left, right),
            Expression::Conditional(test, then, otherwise) => {
                let t = try_completion!(self.eval_expression(test));
                if to_boolean(&t) {
                    self.eval_expression(then)
                } else {
                    self.eval_expression(otherwise)
                }
            }
            Expression::Call(callee, args) => self.eval_call(callee, args),
            Expression::New(callee, args) => self.eval_new(callee, args),
            Expression::Member(object, prop) => {
                let base = try_completion!(self.eval_expression(object));
                let key = try_result!(self.member_key(prop));
                if base.is_undefined() || base.is_null() {
                    return self.type_error(format!("{object} has no properties"));
                }
                self.get_member(&base, &key)
            }
            Expression::Typeof(operand) => {
                let value = match &**operand {
                    Expression::Identifier(name) => match self.lookup(name) {
                        Some((vref, _)) => try_completion!(self.get_var(&vref)),
                        None => JsValue::Undefined,
                    },
                    other => try_completion!(self.eval_expression(other)),
                };
                Completion::Normal(JsValue::string(self.type_of(&value)))
            }
            Expression::Void(operand) => {
                try_completion!(self.eval_expression(operand));
                Completion::Normal(JsValue::Undefined)
            }
            Expression::Delete(operand) => self.eval_delete(operand),
            Expression::Sequence(exprs) => {
                let mut value = JsValue::Undefined;
                for e in exprs {
                    value = try_completion!(self.eval_expression(e));
                }
                Completion::Normal(value)
            }
        }
    }

    fn member_key(&mut self, prop: &MemberProperty) -> Result<JsString, Completion> {
        match prop {
            MemberProperty::Dot(name) => Ok(name.clone()),
            MemberProperty::Computed(e) => match self.eval_expression(e) {
                Completion::Normal(v) => self.to_string(&v),
                other => Err(other),
            },
        }
    }

    fn eval_array_literal(&mut self, elements: &[Option<Expression>]) -> Completion {
        let array = self.new_array_object(elements.len());
        for (i, element) in elements.iter().enumerate() {
            if let Some(e) = element {
                let v = try_completion!(self.eval_expression(e));
                try_completion!(self.put_member(array, &i.to_string(), v));
            }
        }
        Completion::Normal(JsValue::object(array))
    }

    fn eval_object_literal(&mut self, props: &[Property]) -> Completion {
        let object = self.new_object();
        for prop in props {
            let key: JsString = match &prop.key {
                PropertyKey::Identifier(s) | PropertyKey::String(s) => s.clone(),
                PropertyKey::Number(n) => number_ops::to_string(JsNumber::new(*n)).into(),
            };
            let v = try_completion!(self.eval_expression(&prop.value));
            try_completion!(self.put_member(object, &key, v));
        }
        Completion::Normal(JsValue::object(object))
    }

    /// A named function expression sees its own name through an extra
    /// scope object between it and the enclosing scope.
    fn function_expression(&mut self, decl: &Rc<FunctionDecl>) -> ObjectId {
        let locals = self.frame().locals;
        match &decl.name {
            Some(name) => {
                let scope = self.heap.alloc(JsObject::with_prototype(Some(locals)));
                let f = self.new_function(decl.clone(), scope);
                if let Some(obj) = self.heap.get_mut(scope) {
                    obj.put(name, JsValue::object(f));
                }
                f
            }
            None => self.new_function(decl.clone(), locals),
        }
    }

    fn eval_unary(&mut self, op: UnaryOp, value: &JsValue) -> Completion {
        let result = match op {
            UnaryOp::Minus => JsValue::Number(number_ops::neg(try_result!(self.to_number(value)))),
            UnaryOp::Plus => JsValue::Number(try_result!(self.to_number(value))),
            UnaryOp::Not => JsValue::Boolean(!to_boolean(value)),
            UnaryOp::BitNot => {
                let n = try_result!(self.to_number(value));
                JsValue::number(f64::from(!number_ops::to_int32(n)))
            }
        };
        Completion::Normal(result)
    }

    pub(crate) fn binary_op(&mut self, op: BinaryOp, l: &JsValue, r: &JsValue) -> Completion {
        let value = match op {
            BinaryOp::Add => return self.add_values(l, r),
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                let x = try_result!(self.to_number(l));
                let y = try_result!(self.to_number(r));
                let n = match op {
                    BinaryOp::Sub => number_ops::sub(x, y),
                    BinaryOp::Mul => number_ops::mul(x, y),
                    BinaryOp::Div => number_ops::div(x, y),
                    _ => number_ops::rem(x, y),
                };
                JsValue::Number(n)
            }
            BinaryOp::Eq => JsValue::Boolean(try_result!(self.loose_equals(l, r))),
            BinaryOp::NotEq => JsValue::Boolean(!try_result!(self.loose_equals(l, r))),
            BinaryOp::StrictEq => JsValue::Boolean(strict_equals(l, r)),
            BinaryOp::StrictNotEq => JsValue::Boolean(!strict_equals(l, r)),
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::LtEq | BinaryOp::GtEq => {
                let ord = try_result!(self.compare(l, r));
                JsValue::Boolean(match op {
                    BinaryOp::Lt => ord == Some(Ordering::Less),
                    BinaryOp::Gt => ord == Some(Ordering::Greater),
                    BinaryOp::LtEq => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
                    _ => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
                })
            }
            BinaryOp::LShift
            | BinaryOp::RShift
            | BinaryOp::URShift
            | BinaryOp::BitAnd
            | BinaryOp::BitOr
            | BinaryOp::BitXor => {
                let x = try_result!(self.to_number(l));
                let y = try_result!(self.to_number(r));
                let shift = number_ops::to_uint32(y) & 31;
                let n = match op {
                    BinaryOp::LShift => f64::from(number_ops::to_int32(x).wrapping_shl(shift)),
                    BinaryOp::RShift => f64::from(number_ops::to_int32(x) >> shift),
                    BinaryOp::URShift => f64::from(number_ops::to_uint32(x) >> shift),
                    BinaryOp::BitAnd => f64::from(number_ops::to_int32(x) & number_ops::to_int32(y)),
                    BinaryOp::BitOr => f64::from(number_ops::to_int32(x) | number_ops::to_int32(y)),
                    _ => f64::from(number_ops::to_int32(x) ^ number_ops::to_int32(y)),
                };
                JsValue::number(n)
            }
            BinaryOp::In => {
                let Some(object) = r.as_object() else {
                    return self.type_error("invalid 'in' operand");
                };
                let key = try_result!(self.to_string(l));
                JsValue::Boolean(self.has_property(object, &key))
            }
            BinaryOp::Instanceof => {
                let Some(f) = self.callable_id(r) else {
                    return self.type_error("invalid 'instanceof' operand");
                };
                JsValue::Boolean(self.is_instance(l, f))
            }
        };
        Completion::Normal(value)
    }

    fn add_values(&mut self, l: &JsValue, r: &JsValue) -> Completion {
        let a = try_result!(self.add_operand(l));
        let b = try_result!(self.add_operand(r));
        if a.is_string() || b.is_string() {
            let sa = try_result!(self.to_string(&a));
            let sb = try_result!(self.to_string(&b));
            let mut joined = String::with_capacity(sa.len() + sb.len());
            joined.push_str(&sa);
            joined.push_str(&sb);
            return Completion::Normal(JsValue::from(joined));
        }
        let x = try_result!(self.to_number(&a));
        let y = try_result!(self.to_number(&b));
        Completion::Normal(JsValue::Number(number_ops::add(x, y)))
    }

    fn is_instance(&mut self, value: &JsValue, constructor: ObjectId) -> bool {
        let Some(object) = value.as_object() else {
            return false;
        };
        let proto = self.function_prototype(constructor);
        let mut current = self.heap.get(object).and_then(|o| o.prototype);
        while let Some(id) = current {
            if id == proto {
                return true;
            }
            current = self.heap.get(id).and_then(|o| o.prototype);
        }
        false
    }

    pub(crate) fn eval_target(&mut self, expr: &Expression) -> Result<Target, Completion> {
        match expr {
            Expression::Identifier(name) => Ok(Target::Var(self.findvar(name).0)),
            Expression::Member(object, prop) => {
                let base = match self.eval_expression(object) {
                    Completion::Normal(v) => v,
                    other => return Err(other),
                };
                let key = self.member_key(prop)?;
                if base.is_undefined() || base.is_null() {
                    return Err(self.type_error(format!("{object} has no properties")));
                }
                Ok(Target::Member(self.to_object(&base)?, key))
            }
            other => Err(self.runtime_error(
                ErrorKind::Reference,
                format!("invalid assignment target: {other}"),
            )),
        }
    }

    fn read_target(&mut self, target: &Target) -> Completion {
        match target {
            Target::Var(vref) => self.get_var(vref),
            Target::Member(object, key) => self.get_member(&JsValue::object(*object), key),
        }
    }

    pub(crate) fn write_target(&mut self, target: &Target, value: JsValue) -> Completion {
        match target {
            Target::Var(vref) => {
                try_completion!(self.set_var(vref, value.clone()));
                Completion::Normal(value)
            }
            Target::Member(object, key) => self.put_member(*object, key, value),
        }
    }

    fn eval_assign(&mut self, op: AssignOp, left: &Expression, right: &Expression) -> Completion {
        let target = try_result!(self.eval_target(left));
        let value = match op.binary_op() {
            None => try_completion!(self.eval_expression(right)),
            Some(bop) => {
                let old = try_completion!(self.read_target(&target));
                let r = try_completion!(self.eval_expression(right));
                try_completion!(self.binary_op(bop, &old, &r))
            }
        };
        self.write_target(&target, value)
    }

    fn eval_update(&mut self, op: UpdateOp, prefix: bool, expr: &Expression) -> Completion {
        let target = try_result!(self.eval_target(expr));
        let old = try_completion!(self.read_target(&target));
        let old = try_result!(self.to_number(&old));
        let one = JsNumber::from(1);
        let new = match op {
            UpdateOp::Increment => number_ops::add(old, one),
            UpdateOp::Decrement => number_ops::sub(old, one),
        };
        try_completion!(self.write_target(&target, JsValue::Number(new)));
        Completion::Normal(JsValue::Number(if prefix { new } else { old }))
    }

    fn eval_delete(&mut self, operand: &Expression) -> Completion {
        let deleted = match operand {
            Expression::Member(object, prop) => {
                let base = try_completion!(self.eval_expression(object));
                let key = try_result!(self.member_key(prop));
                match base.as_object() {
                    Some(id) => self.delete_member(id, &key),
                    None => true,
                }
            }
            Expression::Identifier(name) => match self.lookup(name) {
                Some((vref, _)) => self.delete_member(vref.object, &vref.name),
                None => true,
            },
            other => {
                try_completion!(self.eval_expression(other));
                true
            }
        };
        Completion::Normal(JsValue::Boolean(deleted))
    }

    fn eval_arguments(&mut self, args: &[Expression]) -> Result<Vec<JsValue>, Completion> {
        let mut values = Vec::with_capacity(args.len());
        for a in args {
            match self.eval_expression(a) {
                Completion::Normal(v) => values.push(v),
                other => return Err(other),
            }
        }
        Ok(values)
    }

    /// Calls the callee with `this` taken from the member receiver, the
    /// `with` object or `this` a name was found on, or the global object.
    fn eval_call(&mut self, callee: &Expression, args: &[Expression]) -> Completion {
        let (func, this) = match callee {
            Expression::Member(object, prop) => {
                let base = try_completion!(self.eval_expression(object));
                let key = try_result!(self.member_key(prop));
                if base.is_undefined() || base.is_null() {
                    return self.type_error(format!("{object} has no properties"));
                }
                let f = try_completion!(self.get_member(&base, &key));
                let this = match &f {
                    JsValue::Object(r) => r.this,
                    _ => None,
                };
                (f, this)
            }
            Expression::Identifier(name) => {
                let (vref, owner) = self.findvar(name);
                let f = try_completion!(self.get_var(&vref));
                let bound = match &f {
                    JsValue::Object(r) => r.this,
                    _ => None,
                };
                (f, owner.or(bound))
            }
            other => {
                let f = try_completion!(self.eval_expression(other));
                let bound = match &f {
                    JsValue::Object(r) => r.this,
                    _ => None,
                };
                (f, bound)
            }
        };

        let Some(id) = func.as_object() else {
            return self.type_error(format!("{callee} is not a function"));
        };
        let (callable, as_function) = match self.heap.get(id) {
            Some(o) => (o.is_callable(), o.flags.contains(ObjFlags::ASFUNCTION)),
            None => (false, false),
        };
        if !callable && !as_function {
            return self.type_error(format!("{callee} is not a function"));
        }
        let argv = try_result!(self.eval_arguments(args));
        if callable {
            return self.call_function(id, this, &argv, false);
        }
        let key = match argv.first() {
            Some(k) => try_result!(self.to_string(k)),
            None => Rc::from("undefined"),
        };
        self.get_member(&func, &key)
    }

    fn eval_new(&mut self, callee: &Expression, args: &[Expression]) -> Completion {
        let f = try_completion!(self.eval_expression(callee));
        let Some(id) = self.callable_id(&f) else {
            return self.type_error(format!("{callee} is not a constructor"));
        };
        let argv = try_result!(self.eval_arguments(args));
        self.construct(id, &argv)
    }
}

fn literal_value(lit: &Literal) -> JsValue {
    match lit {
        Literal::Null => JsValue::null(),
        Literal::Boolean(b) => JsValue::Boolean(*b),
        Literal::Number(n) => JsValue::number(*n),
        Literal::String(s) => JsValue::String(s.clone()),
    }
}
