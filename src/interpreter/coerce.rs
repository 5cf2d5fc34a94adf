//! Type conversions and the comparison algorithms built on them.

use std::cmp::Ordering;
use std::rc::Rc;

use super::{Completion, Internal, Interpreter, JsObject, ObjFlags};
use crate::types::{JsNumber, JsString, JsValue, ObjectId, number_ops};

pub fn to_boolean(value: &JsValue) -> bool {
    match value {
        JsValue::Undefined => false,
        JsValue::Boolean(b) => *b,
        JsValue::Number(n) => !(n.is_nan() || n.is_zero()),
        JsValue::String(s) => !s.is_empty(),
        JsValue::Object(r) => r.id.is_some(),
    }
}

fn is_js_whitespace(c: char) -> bool {
    matches!(
        c,
        ' ' | '\t' | '\n' | '\r' | '\u{000B}' | '\u{000C}' | '\u{00A0}' | '\u{FEFF}'
    ) || c.is_whitespace()
}

pub(crate) fn trim_js(s: &str) -> &str {
    s.trim_matches(is_js_whitespace)
}

pub(crate) fn trim_js_start(s: &str) -> &str {
    s.trim_start_matches(is_js_whitespace)
}

/// Numeric value of a string: decimal or `0x` hex, surrounding whitespace
/// ignored, empty meaning zero. Anything else is NaN.
pub fn string_to_number(s: &str) -> JsNumber {
    let t = trim_js(s);
    if t.is_empty() {
        return JsNumber::ZERO;
    }
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        if hex.is_empty() {
            return JsNumber::NAN;
        }
        let mut value = 0.0f64;
        for c in hex.chars() {
            match c.to_digit(16) {
                Some(d) => value = value * 16.0 + f64::from(d),
                None => return JsNumber::NAN,
            }
        }
        return JsNumber::new(value);
    }
    match t {
        "Infinity" | "+Infinity" => return JsNumber::POS_INFINITY,
        "-Infinity" => return JsNumber::NEG_INFINITY,
        _ => {}
    }
    // Rust's float parser also takes "inf" and "nan"; restrict the alphabet.
    if !t
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
    {
        return JsNumber::NAN;
    }
    t.parse::<f64>().map_or(JsNumber::NAN, JsNumber::new)
}

pub(crate) fn strict_equals(a: &JsValue, b: &JsValue) -> bool {
    match (a, b) {
        (JsValue::Undefined, JsValue::Undefined) => true,
        (JsValue::Number(x), JsValue::Number(y)) => number_ops::equal(*x, *y),
        (JsValue::String(x), JsValue::String(y)) => x == y,
        (JsValue::Boolean(x), JsValue::Boolean(y)) => x == y,
        (JsValue::Object(x), JsValue::Object(y)) => x.id == y.id,
        _ => false,
    }
}

fn number_ordering(x: JsNumber, y: JsNumber) -> Option<Ordering> {
    match number_ops::less_than(x, y)? {
        true => Some(Ordering::Less),
        false if number_ops::equal(x, y) => Some(Ordering::Equal),
        false => Some(Ordering::Greater),
    }
}

impl Interpreter {
    pub(crate) fn to_number(&mut self, value: &JsValue) -> Result<JsNumber, Completion> {
        match value {
            JsValue::Undefined => Ok(JsNumber::NAN),
            JsValue::Boolean(b) => Ok(JsNumber::from(i32::from(*b))),
            JsValue::Number(n) => Ok(*n),
            JsValue::String(s) => Ok(string_to_number(s)),
            JsValue::Object(r) => match r.id {
                None => Ok(JsNumber::ZERO),
                Some(id) => {
                    if let Some(JsValue::Number(n)) = self.invoke_method(id, "valueOf", &[])? {
                        return Ok(n);
                    }
                    let s = self.to_string(value)?;
                    Ok(string_to_number(&s))
                }
            },
        }
    }

    pub(crate) fn to_string(&mut self, value: &JsValue) -> Result<JsString, Completion> {
        let id = match value {
            JsValue::String(s) => return Ok(s.clone()),
            JsValue::Object(r) => match r.id {
                Some(id) => id,
                None => return Ok(Rc::from("null")),
            },
            other => return Ok(Rc::from(other.to_string())),
        };
        if let Some(v) = self.invoke_method(id, "toString", &[])?
            && !matches!(v, JsValue::Object(_))
        {
            return self.to_string(&v);
        }
        if let Some(v) = self.invoke_method(id, "valueOf", &[])?
            && !matches!(v, JsValue::Object(_))
        {
            return self.to_string(&v);
        }
        let class = self.heap.get(id).map_or("Object", JsObject::class_name);
        Ok(Rc::from(format!("[object {class}]")))
    }

    /// Integer part of a number; NaN becomes 0, infinities are kept.
    pub(crate) fn to_integer(&mut self, value: &JsValue) -> Result<f64, Completion> {
        let n = self.to_number(value)?;
        if n.is_nan() {
            return Ok(0.0);
        }
        Ok(n.value().trunc())
    }

    /// Primitive value of an object: the first primitive result of
    /// `valueOf`, then `toString`.
    pub(crate) fn to_primitive(&mut self, value: &JsValue) -> Result<JsValue, Completion> {
        let Some(id) = value.as_object() else {
            return Ok(value.clone());
        };
        for method in ["valueOf", "toString"] {
            if let Some(v) = self.invoke_method(id, method, &[])?
                && v.as_object().is_none()
            {
                return Ok(v);
            }
        }
        Err(self.type_error("cannot convert object to primitive value"))
    }

    /// Boxes primitives into temporary wrapper objects.
    pub(crate) fn to_object(&mut self, value: &JsValue) -> Result<ObjectId, Completion> {
        let (proto, internal) = match value {
            JsValue::Object(r) => match r.id {
                Some(id) => return Ok(id),
                None => return Err(self.type_error("null has no properties")),
            },
            JsValue::Undefined => return Err(self.type_error("undefined has no properties")),
            JsValue::String(s) => (self.builtins.string_proto, Internal::String(s.clone())),
            JsValue::Number(n) => (self.builtins.number_proto, Internal::Number(*n)),
            JsValue::Boolean(b) => (self.builtins.boolean_proto, Internal::Boolean(*b)),
        };
        let id = self.wrap_primitive(proto, internal);
        if let Some(obj) = self.heap.get_mut(id) {
            obj.flags |= ObjFlags::TEMP;
        }
        Ok(id)
    }

    /// Wrapper object for a primitive. String wrappers carry a hidden
    /// `length`.
    pub(crate) fn wrap_primitive(&mut self, proto: ObjectId, internal: Internal) -> ObjectId {
        let mut obj = JsObject::with_prototype(Some(proto));
        if let Internal::String(s) = &internal {
            obj.put_hidden("length", JsValue::number(s.chars().count()));
        }
        obj.internal = internal;
        self.heap.alloc(obj)
    }

    /// Calls `object.name()` if it is a function. `Ok(None)` when it is not.
    pub(crate) fn invoke_method(
        &mut self,
        object: ObjectId,
        name: &str,
        args: &[JsValue],
    ) -> Result<Option<JsValue>, Completion> {
        let method = match self.get_member(&JsValue::object(object), name) {
            Completion::Normal(v) => v,
            other => return Err(other),
        };
        let Some(f) = self.callable_id(&method) else {
            return Ok(None);
        };
        match self.call_function(f, Some(object), args, false) {
            Completion::Normal(v) => Ok(Some(v)),
            other => Err(other),
        }
    }

    /// Operand conversion for `+`: functions become their source text and
    /// other objects their `valueOf` number, or their string form when
    /// `valueOf` yields anything else.
    pub(crate) fn add_operand(&mut self, value: &JsValue) -> Result<JsValue, Completion> {
        let Some(id) = value.as_object() else {
            return Ok(value.clone());
        };
        if self.callable_id(value).is_none()
            && let Some(n @ JsValue::Number(_)) = self.invoke_method(id, "valueOf", &[])?
        {
            return Ok(n);
        }
        Ok(JsValue::String(self.to_string(value)?))
    }

    pub(crate) fn loose_equals(&mut self, a: &JsValue, b: &JsValue) -> Result<bool, Completion> {
        Ok(match (a, b) {
            (JsValue::Undefined, JsValue::Undefined) => true,
            (JsValue::Object(x), JsValue::Object(y)) => x.id == y.id,
            (JsValue::Undefined, JsValue::Object(r)) | (JsValue::Object(r), JsValue::Undefined) => {
                r.id.is_none()
            }
            (JsValue::Undefined, _) | (_, JsValue::Undefined) => false,
            (JsValue::Object(r), _) | (_, JsValue::Object(r)) if r.id.is_none() => false,
            (JsValue::Object(_), _) => {
                let p = self.to_primitive(a)?;
                return self.loose_equals(&p, b);
            }
            (_, JsValue::Object(_)) => {
                let p = self.to_primitive(b)?;
                return self.loose_equals(a, &p);
            }
            (JsValue::String(x), JsValue::String(y)) => x == y,
            (JsValue::String(_), _) | (_, JsValue::String(_)) => {
                self.to_string(a)? == self.to_string(b)?
            }
            _ => number_ops::equal(self.to_number(a)?, self.to_number(b)?),
        })
    }

    /// Relational ordering: lexicographic when either side is a string after
    /// primitive conversion, numeric otherwise. `None` involves NaN.
    pub(crate) fn compare(&mut self, a: &JsValue, b: &JsValue) -> Result<Option<Ordering>, Completion> {
        let pa = self.to_primitive(a)?;
        let pb = self.to_primitive(b)?;
        if pa.is_string() || pb.is_string() {
            let sa = self.to_string(&pa)?;
            let sb = self.to_string(&pb)?;
            return Ok(Some(sa.cmp(&sb)));
        }
        let x = self.to_number(&pa)?;
        let y = self.to_number(&pb)?;
        Ok(number_ordering(x, y))
    }

    pub(crate) fn type_of(&self, value: &JsValue) -> &'static str {
        match value {
            JsValue::Undefined => "undefined",
            JsValue::Boolean(_) => "boolean",
            JsValue::Number(_) => "number",
            JsValue::String(_) => "string",
            JsValue::Object(_) if self.callable_id(value).is_some() => "function",
            JsValue::Object(_) => "object",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_to_number_forms() {
        assert_eq!(string_to_number("  42 ").finite(), Some(42.0));
        assert_eq!(string_to_number("").finite(), Some(0.0));
        assert_eq!(string_to_number("0x1F").finite(), Some(31.0));
        assert_eq!(string_to_number("1e3").finite(), Some(1000.0));
        assert_eq!(string_to_number(".5").finite(), Some(0.5));
        assert!(string_to_number("-Infinity").is_negative());
        assert!(string_to_number("inf").is_nan());
        assert!(string_to_number("nan").is_nan());
        assert!(string_to_number("12px").is_nan());
        assert!(string_to_number("0x").is_nan());
    }

    #[test]
    fn truthiness() {
        assert!(!to_boolean(&JsValue::Undefined));
        assert!(!to_boolean(&JsValue::null()));
        assert!(!to_boolean(&JsValue::number(f64::NAN)));
        assert!(!to_boolean(&JsValue::number(0.0)));
        assert!(!to_boolean(&JsValue::string("")));
        assert!(to_boolean(&JsValue::string("0")));
        assert!(to_boolean(&JsValue::object(ObjectId(0))));
    }

    #[test]
    fn strict_equality_requires_same_type() {
        assert!(strict_equals(&JsValue::number(1.0), &JsValue::number(1.0)));
        assert!(!strict_equals(&JsValue::number(1.0), &JsValue::string("1")));
        assert!(!strict_equals(&JsValue::number(f64::NAN), &JsValue::number(f64::NAN)));
        assert!(strict_equals(&JsValue::null(), &JsValue::null()));
        assert!(!strict_equals(&JsValue::null(), &JsValue::Undefined));
    }
}
