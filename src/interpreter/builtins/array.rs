//! `Array`: the native length counter, its `length` hook and the prototype
//! methods.

use std::cmp::Ordering;

use super::*;
use crate::types::number_ops;

/// Longest string `join` builds.
const MAX_JOIN_LENGTH: usize = 1 << 30;
/// Longest array spread into an argument list.
const MAX_ARGUMENTS: usize = 1 << 16;

/// Length and present `(index, value)` pairs of an array-like object, in
/// index order. Missing indices are holes.
struct Elements {
    len: usize,
    present: Vec<(usize, JsValue)>,
}

impl Elements {
    fn get(&self, index: usize) -> Option<&JsValue> {
        self.present
            .binary_search_by_key(&index, |&(i, _)| i)
            .ok()
            .map(|pos| &self.present[pos].1)
    }

    /// Elements in `start..end`, renumbered from `to`.
    fn moved(&self, start: usize, end: usize, to: usize) -> impl Iterator<Item = (usize, JsValue)> {
        self.present
            .iter()
            .filter(move |&&(i, _)| i >= start && i < end)
            .map(move |(i, v)| (i - start + to, v.clone()))
    }
}

/// Canonical array index form of a property name: digits without leading
/// zeros, below 2^32 - 1.
pub(crate) fn array_index(name: &str) -> Option<usize> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if name.len() > 1 && name.starts_with('0') {
        return None;
    }
    let n: u64 = name.parse().ok()?;
    (n < u64::from(u32::MAX)).then_some(n as usize)
}

/// Add-property hook of arrays: creates index properties and grows the
/// length counter past them. Other names are left to the caller.
fn array_add_property(interp: &mut Interpreter, array: ObjectId, name: &str) -> bool {
    let Some(index) = array_index(name) else {
        return false;
    };
    let Some(obj) = interp.heap.get_mut(array) else {
        return false;
    };
    obj.push(Variable::new(Rc::from(name), JsValue::Undefined));
    if let Internal::Array { length } = &mut obj.internal
        && index >= *length
    {
        *length = index + 1;
    }
    true
}

/// Hook on the hidden `length` variable. Writes below the current length
/// drop the trailing index properties.
fn array_length_hook(interp: &mut Interpreter, array: ObjectId, op: HookOp) -> Completion {
    let current = match interp.heap.get(array).map(|o| &o.internal) {
        Some(Internal::Array { length }) => *length,
        _ => 0,
    };
    let value = match op {
        HookOp::Get => return Completion::Normal(JsValue::number(current)),
        HookOp::Set(value) => value,
    };
    let n = try_result!(interp.to_number(&value));
    let new_len = match n.finite() {
        Some(x) if x >= 0.0 && x.fract() == 0.0 && x < f64::from(u32::MAX) => x as usize,
        _ => return interp.runtime_error(ErrorKind::Range, "invalid array length"),
    };
    if let Some(obj) = interp.heap.get_mut(array) {
        if new_len < current {
            obj.properties
                .retain(|var| array_index(&var.name).is_none_or(|i| i < new_len));
        }
        obj.internal = Internal::Array { length: new_len };
    }
    Completion::Normal(JsValue::number(new_len))
}

impl Interpreter {
    pub(crate) fn setup_array(&mut self) {
        let proto = self.builtins.array_proto;
        self.make_array(proto, 0);
        self.define_constructor("Array", &["length"], array_ctor, proto);
        let methods: [(&str, &[&str], Builtin); 11] = [
            ("toString", &[], array_to_string),
            ("join", &["separator"], array_join),
            ("reverse", &[], array_reverse),
            ("sort", &["comparefn"], array_sort),
            ("push", &["item"], array_push),
            ("pop", &[], array_pop),
            ("shift", &[], array_shift),
            ("unshift", &["item"], array_unshift),
            ("splice", &["start", "deleteCount"], array_splice),
            ("slice", &["start", "end"], array_slice),
            ("concat", &["item"], array_concat),
        ];
        for (name, params, f) in methods {
            self.define_method(proto, name, params, f);
        }
    }

    /// Turns `object` into an array of `length` with no elements.
    fn make_array(&mut self, object: ObjectId, length: usize) {
        let Some(obj) = self.heap.get_mut(object) else {
            return;
        };
        obj.internal = Internal::Array { length };
        obj.add_hook = Some(array_add_property);
        if obj.own("length").is_none() {
            obj.push(Variable::new(Rc::from("length"), JsValue::Undefined));
        }
        if let Some(var) = obj.own_mut("length") {
            var.flags |= VarFlags::HIDDEN | VarFlags::DONTDELETE;
            var.link = VarLink::Hook(VarHook {
                func: array_length_hook,
                owner: object,
            });
        }
    }

    /// Empty array whose length counter starts at `length`.
    pub(crate) fn new_array_object(&mut self, length: usize) -> ObjectId {
        let id = self
            .heap
            .alloc(JsObject::with_prototype(Some(self.builtins.array_proto)));
        self.make_array(id, length);
        id
    }

    pub(crate) fn create_array(&mut self, values: Vec<JsValue>) -> ObjectId {
        let id = self.new_array_object(values.len());
        if let Some(obj) = self.heap.get_mut(id) {
            for (i, value) in values.into_iter().enumerate() {
                obj.push(Variable::new(Rc::from(i.to_string()), value.unbound()));
            }
        }
        id
    }

    fn is_array(&self, value: &JsValue) -> bool {
        matches!(self.internal_of(value), Some(Internal::Array { .. }))
    }

    fn length_of(&mut self, object: ObjectId) -> Result<usize, Completion> {
        let len = match self.get_member(&JsValue::object(object), "length") {
            Completion::Normal(v) => self.to_number(&v)?,
            other => return Err(other),
        };
        Ok(number_ops::to_uint32(len) as usize)
    }

    /// Elements of an array-like object. Only indices that exist are
    /// visited, so a huge length with few elements stays cheap.
    fn read_elements(&mut self, object: ObjectId) -> Result<Elements, Completion> {
        let len = self.length_of(object)?;
        let indices = self.index_keys(object, len);
        let mut present = Vec::with_capacity(indices.len());
        for i in indices {
            match self.get_member(&JsValue::object(object), &i.to_string()) {
                Completion::Normal(v) => present.push((i, v.unbound())),
                other => return Err(other),
            }
        }
        Ok(Elements { len, present })
    }

    /// Stores `elements` into `object`, deletes the indices in `old` that
    /// are now holes and sets the length.
    fn write_elements(&mut self, object: ObjectId, old: &Elements, elements: Elements) -> Completion {
        let mut kept = Vec::with_capacity(elements.present.len());
        for (i, value) in elements.present {
            try_completion!(self.put_member(object, &i.to_string(), value));
            kept.push(i);
        }
        for &(i, _) in &old.present {
            if kept.binary_search(&i).is_err() {
                self.delete_member(object, &i.to_string());
            }
        }
        self.put_member(object, "length", JsValue::number(elements.len))
    }

    /// Array with the given length and elements.
    fn sparse_array(&mut self, elements: Elements) -> ObjectId {
        let id = self.new_array_object(elements.len);
        if let Some(obj) = self.heap.get_mut(id) {
            for (i, value) in elements.present {
                obj.push(Variable::new(Rc::from(i.to_string()), value));
            }
        }
        id
    }

    /// Values of an array-like object for an argument list, holes read as
    /// undefined.
    pub(crate) fn array_like_values(&mut self, object: ObjectId) -> Result<Vec<JsValue>, Completion> {
        let elements = self.read_elements(object)?;
        if elements.len > MAX_ARGUMENTS {
            return Err(self.runtime_error(ErrorKind::Range, "too many arguments"));
        }
        let mut values = vec![JsValue::Undefined; elements.len];
        for (i, value) in elements.present {
            values[i] = value;
        }
        Ok(values)
    }

    /// Undefined sorts after everything else without consulting the
    /// comparator.
    fn sort_compare(
        &mut self,
        comparator: Option<&JsValue>,
        a: &JsValue,
        b: &JsValue,
    ) -> Result<Ordering, Completion> {
        match (a.is_undefined(), b.is_undefined()) {
            (true, true) => return Ok(Ordering::Equal),
            (true, false) => return Ok(Ordering::Greater),
            (false, true) => return Ok(Ordering::Less),
            (false, false) => {}
        }
        match comparator {
            Some(f) => {
                let result = match self.call_value(f, None, &[a.clone(), b.clone()]) {
                    Completion::Normal(v) => self.to_number(&v)?,
                    other => return Err(other),
                };
                let x = result.value();
                Ok(if x < 0.0 {
                    Ordering::Less
                } else if x > 0.0 {
                    Ordering::Greater
                } else {
                    Ordering::Equal
                })
            }
            None => {
                let a = self.to_string(a)?;
                let b = self.to_string(b)?;
                Ok(a.cmp(&b))
            }
        }
    }

    /// Stable merge sort with a comparator that may throw.
    fn merge_sort(
        &mut self,
        mut items: Vec<JsValue>,
        comparator: Option<&JsValue>,
    ) -> Result<Vec<JsValue>, Completion> {
        if items.len() <= 1 {
            return Ok(items);
        }
        let right = items.split_off(items.len() / 2);
        let left = self.merge_sort(items, comparator)?;
        let right = self.merge_sort(right, comparator)?;

        let mut merged = Vec::with_capacity(left.len() + right.len());
        let mut left = left.into_iter().peekable();
        let mut right = right.into_iter().peekable();
        while let (Some(l), Some(r)) = (left.peek(), right.peek()) {
            let take_right = self.sort_compare(comparator, l, r)? == Ordering::Greater;
            let next = if take_right { right.next() } else { left.next() };
            merged.extend(next);
        }
        merged.extend(left);
        merged.extend(right);
        Ok(merged)
    }
}

fn this_array(interp: &mut Interpreter, this: &JsValue) -> Result<ObjectId, Completion> {
    interp.to_object(this)
}

/// Index argument counted from the end when negative, clamped to `0..=len`.
fn relative_index(
    interp: &mut Interpreter,
    value: Option<&JsValue>,
    len: usize,
    default: usize,
) -> Result<usize, Completion> {
    match value {
        None | Some(JsValue::Undefined) => Ok(default),
        Some(v) => {
            let n = interp.to_integer(v)?;
            let len = len as f64;
            let index = if n < 0.0 { (len + n).max(0.0) } else { n.min(len) };
            Ok(index as usize)
        }
    }
}

fn array_ctor(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    let array = match this.as_object() {
        Some(id) if interp.is_constructing() => {
            interp.make_array(id, 0);
            id
        }
        _ => interp.new_array_object(0),
    };
    if let [JsValue::Number(n)] = args {
        try_completion!(interp.put_member(array, "length", JsValue::Number(*n)));
    } else {
        for (i, value) in args.iter().enumerate() {
            try_completion!(interp.put_member(array, &i.to_string(), value.clone()));
        }
    }
    Completion::Normal(JsValue::object(array))
}

fn array_to_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Completion {
    array_join(interp, this, &[])
}

fn array_join(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    let array = try_result!(this_array(interp, this));
    let separator = match args.first() {
        None | Some(JsValue::Undefined) => Rc::from(","),
        Some(sep) => try_result!(interp.to_string(sep)),
    };
    let elements = try_result!(interp.read_elements(array));
    let separators = elements.len.saturating_sub(1);
    if separator.len().saturating_mul(separators) > MAX_JOIN_LENGTH {
        return interp.runtime_error(ErrorKind::Range, "invalid string length");
    }
    let pad = |out: &mut String, count: usize| {
        if !separator.is_empty() {
            out.extend(std::iter::repeat_n(&*separator, count));
        }
    };
    let mut out = String::new();
    let mut written = 0;
    for (i, element) in &elements.present {
        pad(&mut out, i - written);
        written = *i;
        if !element.is_undefined() && !element.is_null() {
            out.push_str(&try_result!(interp.to_string(element)));
        }
        if out.len() > MAX_JOIN_LENGTH {
            return interp.runtime_error(ErrorKind::Range, "invalid string length");
        }
    }
    pad(&mut out, separators - written);
    Completion::Normal(JsValue::from(out))
}

fn array_reverse(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Completion {
    let array = try_result!(this_array(interp, this));
    let old = try_result!(interp.read_elements(array));
    let len = old.len;
    let present = old
        .present
        .iter()
        .rev()
        .map(|(i, v)| (len - 1 - i, v.clone()))
        .collect();
    try_completion!(interp.write_elements(array, &old, Elements { len, present }));
    Completion::Normal(JsValue::object(array))
}

fn array_sort(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    let array = try_result!(this_array(interp, this));
    let comparator = match args.first() {
        None | Some(JsValue::Undefined) => None,
        Some(f) if interp.callable_id(f).is_some() => Some(f.clone()),
        Some(_) => return interp.type_error("sort comparator must be a function"),
    };
    let old = try_result!(interp.read_elements(array));
    let values: Vec<JsValue> = old.present.iter().map(|(_, v)| v.clone()).collect();
    let sorted = try_result!(interp.merge_sort(values, comparator.as_ref()));
    let sorted = Elements {
        len: old.len,
        present: sorted.into_iter().enumerate().collect(),
    };
    try_completion!(interp.write_elements(array, &old, sorted));
    Completion::Normal(JsValue::object(array))
}

fn array_push(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    let array = try_result!(this_array(interp, this));
    let len = try_result!(interp.length_of(array));
    for (i, value) in args.iter().enumerate() {
        try_completion!(interp.put_member(array, &(len + i).to_string(), value.clone()));
    }
    let new_len = JsValue::number(len + args.len());
    try_completion!(interp.put_member(array, "length", new_len.clone()));
    Completion::Normal(new_len)
}

fn array_pop(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Completion {
    let array = try_result!(this_array(interp, this));
    let len = try_result!(interp.length_of(array));
    if len == 0 {
        try_completion!(interp.put_member(array, "length", JsValue::number(0)));
        return Completion::Normal(JsValue::Undefined);
    }
    let key = (len - 1).to_string();
    let last = try_completion!(interp.get_member(&JsValue::object(array), &key));
    interp.delete_member(array, &key);
    try_completion!(interp.put_member(array, "length", JsValue::number(len - 1)));
    Completion::Normal(last.unbound())
}

fn array_shift(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Completion {
    let array = try_result!(this_array(interp, this));
    let old = try_result!(interp.read_elements(array));
    if old.len == 0 {
        try_completion!(interp.put_member(array, "length", JsValue::number(0)));
        return Completion::Normal(JsValue::Undefined);
    }
    let first = old.get(0).cloned().unwrap_or(JsValue::Undefined);
    let shifted = Elements {
        len: old.len - 1,
        present: old.moved(1, old.len, 0).collect(),
    };
    try_completion!(interp.write_elements(array, &old, shifted));
    Completion::Normal(first)
}

fn array_unshift(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    let array = try_result!(this_array(interp, this));
    let old = try_result!(interp.read_elements(array));
    let mut present: Vec<(usize, JsValue)> = args.iter().cloned().enumerate().collect();
    present.extend(old.moved(0, old.len, args.len()));
    let new_len = old.len + args.len();
    try_completion!(interp.write_elements(array, &old, Elements { len: new_len, present }));
    Completion::Normal(JsValue::number(new_len))
}

fn array_splice(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    let array = try_result!(this_array(interp, this));
    let old = try_result!(interp.read_elements(array));
    let len = old.len;
    let start = try_result!(relative_index(interp, args.first(), len, 0));
    let count = match args.get(1) {
        None => len - start,
        Some(v) => try_result!(interp.to_integer(v)).clamp(0.0, (len - start) as f64) as usize,
    };
    let items = args.get(2..).unwrap_or_default();
    let removed = Elements {
        len: count,
        present: old.moved(start, start + count, 0).collect(),
    };

    let mut present: Vec<(usize, JsValue)> = old.moved(0, start, 0).collect();
    present.extend(items.iter().cloned().enumerate().map(|(i, v)| (start + i, v)));
    present.extend(old.moved(start + count, len, start + items.len()));
    let spliced = Elements {
        len: len - count + items.len(),
        present,
    };
    try_completion!(interp.write_elements(array, &old, spliced));
    Completion::Normal(JsValue::object(interp.sparse_array(removed)))
}

fn array_slice(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    let array = try_result!(this_array(interp, this));
    let elements = try_result!(interp.read_elements(array));
    let len = elements.len;
    let start = try_result!(relative_index(interp, args.first(), len, 0));
    let end = try_result!(relative_index(interp, args.get(1), len, len)).max(start);
    let part = Elements {
        len: end - start,
        present: elements.moved(start, end, 0).collect(),
    };
    Completion::Normal(JsValue::object(interp.sparse_array(part)))
}

fn array_concat(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    let array = try_result!(this_array(interp, this));
    let first = try_result!(interp.read_elements(array));
    let mut len = first.len;
    let mut present = first.present;
    for value in args {
        match value.as_object() {
            Some(id) if interp.is_array(value) => {
                let more = try_result!(interp.read_elements(id));
                present.extend(more.moved(0, more.len, len));
                len += more.len;
            }
            _ => {
                present.push((len, value.clone().unbound()));
                len += 1;
            }
        }
    }
    if len >= u32::MAX as usize {
        return interp.runtime_error(ErrorKind::Range, "invalid array length");
    }
    Completion::Normal(JsValue::object(interp.sparse_array(Elements { len, present })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_indices() {
        assert_eq!(array_index("0"), Some(0));
        assert_eq!(array_index("42"), Some(42));
        assert_eq!(array_index("007"), None);
        assert_eq!(array_index("-1"), None);
        assert_eq!(array_index("1.5"), None);
        assert_eq!(array_index(""), None);
        assert_eq!(array_index("4294967295"), None);
        assert_eq!(array_index("length"), None);
    }
}
