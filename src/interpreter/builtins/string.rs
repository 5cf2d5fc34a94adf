//! `String` constructor and prototype. Positions count characters.

use super::*;
use crate::types::number_ops;

impl Interpreter {
    pub(crate) fn setup_string(&mut self) {
        let proto = self.builtins.string_proto;
        self.define_hidden(proto, "length", JsValue::number(0));
        let ctor = self.define_constructor("String", &["value"], string_ctor, proto);
        self.define_method(ctor, "fromCharCode", &["code"], string_from_char_code);

        let methods: [(&str, &[&str], Builtin); 17] = [
            ("charAt", &["pos"], string_char_at),
            ("charCodeAt", &["pos"], string_char_code_at),
            ("indexOf", &["searchString", "pos"], string_index_of),
            ("lastIndexOf", &["searchString", "pos"], string_last_index_of),
            ("substring", &["start", "end"], string_substring),
            ("substr", &["start", "length"], string_substr),
            ("slice", &["start", "end"], string_slice),
            ("split", &["separator", "limit"], string_split),
            ("concat", &["string"], string_concat),
            ("toLowerCase", &[], string_to_lower_case),
            ("toUpperCase", &[], string_to_upper_case),
            ("toString", &[], string_value_of),
            ("valueOf", &[], string_value_of),
            ("anchor", &["name"], string_anchor),
            ("fontcolor", &["color"], string_fontcolor),
            ("fontsize", &["size"], string_fontsize),
            ("link", &["href"], string_link),
        ];
        for (name, params, f) in methods {
            self.define_method(proto, name, params, f);
        }

        for (name, tag) in [
            ("big", "BIG"),
            ("blink", "BLINK"),
            ("bold", "B"),
            ("fixed", "TT"),
            ("italics", "I"),
            ("small", "SMALL"),
            ("strike", "STRIKE"),
            ("sub", "SUB"),
            ("sup", "SUP"),
        ] {
            let func = self.make_native(
                name,
                &[],
                Rc::new(move |interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]| {
                    html_wrap(interp, this, tag, None)
                }),
            );
            self.define_hidden(proto, name, JsValue::object(func));
        }
    }
}

fn string_ctor(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    let value = match args.first() {
        Some(v) => try_result!(interp.to_string(v)),
        None => Rc::from(""),
    };
    if interp.is_constructing()
        && let Some(id) = this.as_object()
    {
        let length = value.chars().count();
        interp.set_internal(id, Internal::String(value));
        interp.define_hidden(id, "length", JsValue::number(length));
        return Completion::Normal(this.clone());
    }
    Completion::Normal(JsValue::String(value))
}

fn string_from_char_code(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Completion {
    let mut units = Vec::with_capacity(args.len());
    for a in args {
        let n = try_result!(interp.to_number(a));
        units.push(number_ops::to_uint32(n) as u16);
    }
    Completion::Normal(JsValue::from(String::from_utf16_lossy(&units)))
}

/// String value of `this`: the primitive itself, a wrapper's payload, or
/// the converted object for generic calls.
fn this_string(interp: &mut Interpreter, this: &JsValue) -> Result<JsString, Completion> {
    if let JsValue::String(s) = this {
        return Ok(s.clone());
    }
    if let Some(Internal::String(s)) = interp.internal_of(this) {
        return Ok(s.clone());
    }
    interp.to_string(this)
}

fn this_chars(interp: &mut Interpreter, this: &JsValue) -> Result<Vec<char>, Completion> {
    Ok(this_string(interp, this)?.chars().collect())
}

/// Integer argument clamped into `0..=len`; `default` when absent.
fn clamped_arg(
    interp: &mut Interpreter,
    args: &[JsValue],
    i: usize,
    len: usize,
    default: usize,
) -> Result<usize, Completion> {
    match args.get(i) {
        None | Some(JsValue::Undefined) => Ok(default),
        Some(v) => Ok(interp.to_integer(v)?.clamp(0.0, len as f64) as usize),
    }
}

/// Position counted from the end when negative, as `slice` does.
fn relative_arg(
    interp: &mut Interpreter,
    args: &[JsValue],
    i: usize,
    len: usize,
    default: usize,
) -> Result<usize, Completion> {
    match args.get(i) {
        None | Some(JsValue::Undefined) => Ok(default),
        Some(v) => {
            let n = interp.to_integer(v)?;
            let len = len as f64;
            Ok(if n < 0.0 { (len + n).max(0.0) } else { n.min(len) } as usize)
        }
    }
}

fn string_char_at(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    let chars = try_result!(this_chars(interp, this));
    let pos = try_result!(interp.to_integer(&arg(args, 0)));
    let text = if pos >= 0.0 {
        chars.get(pos as usize).map(char::to_string).unwrap_or_default()
    } else {
        String::new()
    };
    Completion::Normal(JsValue::from(text))
}

fn string_char_code_at(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    let chars = try_result!(this_chars(interp, this));
    let pos = try_result!(interp.to_integer(&arg(args, 0)));
    let code = match chars.get(pos as usize) {
        Some(c) if pos >= 0.0 => JsNumber::new(f64::from(u32::from(*c))),
        _ => JsNumber::NAN,
    };
    Completion::Normal(JsValue::Number(code))
}

fn find_chars(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| haystack[i..i + needle.len()] == *needle)
}

fn string_index_of(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    let chars = try_result!(this_chars(interp, this));
    let needle: Vec<char> = try_result!(interp.to_string(&arg(args, 0))).chars().collect();
    let from = try_result!(clamped_arg(interp, args, 1, chars.len(), 0));
    let found = find_chars(&chars, &needle, from).map_or(-1.0, |i| i as f64);
    Completion::Normal(JsValue::number(found))
}

fn string_last_index_of(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    let chars = try_result!(this_chars(interp, this));
    let needle: Vec<char> = try_result!(interp.to_string(&arg(args, 0))).chars().collect();
    let from = match args.get(1) {
        Some(v) if !v.is_undefined() => {
            let n = try_result!(interp.to_number(v));
            if n.is_nan() {
                chars.len()
            } else {
                n.value().clamp(0.0, chars.len() as f64) as usize
            }
        }
        _ => chars.len(),
    };
    let found = if needle.len() > chars.len() {
        None
    } else {
        let start = from.min(chars.len() - needle.len());
        (0..=start)
            .rev()
            .find(|&i| chars[i..i + needle.len()] == *needle)
    };
    Completion::Normal(JsValue::number(found.map_or(-1.0, |i| i as f64)))
}

fn collect(chars: &[char]) -> Completion {
    Completion::Normal(JsValue::from(chars.iter().collect::<String>()))
}

fn string_substring(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    let chars = try_result!(this_chars(interp, this));
    let len = chars.len();
    let start = try_result!(clamped_arg(interp, args, 0, len, 0));
    let end = try_result!(clamped_arg(interp, args, 1, len, len));
    collect(&chars[start.min(end)..start.max(end)])
}

fn string_substr(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    let chars = try_result!(this_chars(interp, this));
    let len = chars.len();
    let start = try_result!(relative_arg(interp, args, 0, len, 0));
    let count = try_result!(clamped_arg(interp, args, 1, len - start, len - start));
    collect(&chars[start..start + count])
}

fn string_slice(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    let chars = try_result!(this_chars(interp, this));
    let len = chars.len();
    let start = try_result!(relative_arg(interp, args, 0, len, 0));
    let end = try_result!(relative_arg(interp, args, 1, len, len));
    if start >= end {
        return Completion::Normal(JsValue::string(""));
    }
    collect(&chars[start..end])
}

fn string_split(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    let s = try_result!(this_string(interp, this));
    let limit = match args.get(1) {
        Some(v) if !v.is_undefined() => {
            number_ops::to_uint32(try_result!(interp.to_number(v))) as usize
        }
        _ => usize::MAX,
    };
    let parts: Vec<JsValue> = match args.first() {
        None | Some(JsValue::Undefined) => vec![JsValue::String(s)],
        Some(sep) => {
            let sep = try_result!(interp.to_string(sep));
            if sep.is_empty() {
                s.chars().map(|c| JsValue::from(c.to_string())).collect()
            } else {
                s.split(&*sep).map(JsValue::string).collect()
            }
        }
    };
    let parts = parts.into_iter().take(limit).collect();
    Completion::Normal(JsValue::object(interp.create_array(parts)))
}

fn string_concat(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    let mut out = try_result!(this_string(interp, this)).to_string();
    for a in args {
        out.push_str(&try_result!(interp.to_string(a)));
    }
    Completion::Normal(JsValue::from(out))
}

fn string_to_lower_case(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Completion {
    let s = try_result!(this_string(interp, this));
    Completion::Normal(JsValue::from(s.to_lowercase()))
}

fn string_to_upper_case(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Completion {
    let s = try_result!(this_string(interp, this));
    Completion::Normal(JsValue::from(s.to_uppercase()))
}

fn string_value_of(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Completion {
    match this {
        JsValue::String(s) => Completion::Normal(JsValue::String(s.clone())),
        _ => match interp.internal_of(this) {
            Some(Internal::String(s)) => Completion::Normal(JsValue::String(s.clone())),
            _ => interp.type_error("String.prototype.valueOf called on incompatible object"),
        },
    }
}

fn string_anchor(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    html_wrap(interp, this, "A", Some(("NAME", args)))
}

fn string_fontcolor(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    html_wrap(interp, this, "FONT", Some(("COLOR", args)))
}

fn string_fontsize(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    html_wrap(interp, this, "FONT", Some(("SIZE", args)))
}

fn string_link(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    html_wrap(interp, this, "A", Some(("HREF", args)))
}

/// `<TAG ATTR="value">text</TAG>`.
fn html_wrap(
    interp: &mut Interpreter,
    this: &JsValue,
    tag: &str,
    attr: Option<(&str, &[JsValue])>,
) -> Completion {
    let s = try_result!(this_string(interp, this));
    let open = match attr {
        Some((name, args)) => {
            let value = try_result!(interp.to_string(&arg(args, 0)));
            format!("<{tag} {name}=\"{value}\">")
        }
        None => format!("<{tag}>"),
    };
    Completion::Normal(JsValue::from(format!("{open}{s}</{tag}>")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_search() {
        let hay: Vec<char> = "abcabc".chars().collect();
        let needle: Vec<char> = "bc".chars().collect();
        assert_eq!(find_chars(&hay, &needle, 0), Some(1));
        assert_eq!(find_chars(&hay, &needle, 2), Some(4));
        assert_eq!(find_chars(&hay, &needle, 5), None);
        assert_eq!(find_chars(&hay, &[], 6), Some(6));
    }
}
