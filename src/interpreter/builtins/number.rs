//! `Number`, `Math` and the numeric global functions.

use super::*;
use crate::interpreter::coerce::trim_js_start;
use crate::types::number_ops;

impl Interpreter {
    pub(crate) fn setup_number(&mut self) {
        let proto = self.builtins.number_proto;
        let ctor = self.define_constructor("Number", &["value"], number_ctor, proto);
        for (name, value) in [
            ("MAX_VALUE", JsNumber::new(f64::MAX)),
            ("MIN_VALUE", JsNumber::new(5e-324)),
            ("NaN", JsNumber::NAN),
            ("POSITIVE_INFINITY", JsNumber::POS_INFINITY),
            ("NEGATIVE_INFINITY", JsNumber::NEG_INFINITY),
        ] {
            self.define_hidden(ctor, name, JsValue::Number(value));
        }
        self.define_method(proto, "toString", &["radix"], number_to_string);
        self.define_method(proto, "toLocaleString", &[], number_to_locale_string);
        self.define_method(proto, "valueOf", &[], number_value_of);

        let global = self.global;
        self.define_method(global, "parseInt", &["string", "radix"], parse_int);
        self.define_method(global, "parseFloat", &["string"], parse_float);
        self.define_method(global, "isNaN", &["number"], is_nan);
        self.define_method(global, "isFinite", &["number"], is_finite);
    }

    pub(crate) fn setup_math(&mut self) {
        let math = self.new_object();
        let global = self.global;
        self.define_hidden(global, "Math", JsValue::object(math));
        for (name, value) in [
            ("E", std::f64::consts::E),
            ("LN10", std::f64::consts::LN_10),
            ("LN2", std::f64::consts::LN_2),
            ("LOG10E", std::f64::consts::LOG10_E),
            ("LOG2E", std::f64::consts::LOG2_E),
            ("PI", std::f64::consts::PI),
            ("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
            ("SQRT2", std::f64::consts::SQRT_2),
        ] {
            self.define_hidden(math, name, JsValue::number(value));
        }

        let unary: [(&str, fn(f64) -> f64); 14] = [
            ("abs", f64::abs),
            ("acos", f64::acos),
            ("asin", f64::asin),
            ("atan", f64::atan),
            ("ceil", f64::ceil),
            ("cos", f64::cos),
            ("exp", f64::exp),
            ("floor", f64::floor),
            ("log", f64::ln),
            ("round", js_round),
            ("sin", f64::sin),
            ("sqrt", f64::sqrt),
            ("tan", f64::tan),
            ("trunc", f64::trunc),
        ];
        for (name, op) in unary {
            let func = self.make_native(
                name,
                &["x"],
                Rc::new(move |interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]| {
                    let x = try_result!(interp.to_number(&arg(args, 0)));
                    Completion::Normal(JsValue::number(op(x.value())))
                }),
            );
            self.define_hidden(math, name, JsValue::object(func));
        }
        self.define_method(math, "atan2", &["y", "x"], math_atan2);
        self.define_method(math, "pow", &["x", "y"], math_pow);
        self.define_method(math, "max", &["a", "b"], math_max);
        self.define_method(math, "min", &["a", "b"], math_min);
        self.define_method(math, "random", &[], math_random);
    }

    /// xorshift64* step scaled into `[0, 1)`.
    fn next_random(&mut self) -> f64 {
        let mut x = self.random_state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.random_state = x;
        (x.wrapping_mul(0x2545_F491_4F6C_DD1D) >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Rounds half-way cases towards positive infinity.
fn js_round(x: f64) -> f64 {
    if !x.is_finite() || x == 0.0 {
        return x;
    }
    if (-0.5..0.0).contains(&x) {
        return -0.0;
    }
    (x + 0.5).floor()
}

fn number_ctor(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    let value = match args.first() {
        Some(v) => try_result!(interp.to_number(v)),
        None => JsNumber::ZERO,
    };
    if interp.is_constructing()
        && let Some(id) = this.as_object()
    {
        interp.set_internal(id, Internal::Number(value));
        return Completion::Normal(this.clone());
    }
    Completion::Normal(JsValue::Number(value))
}

fn this_number(interp: &mut Interpreter, this: &JsValue) -> Result<JsNumber, Completion> {
    match this {
        JsValue::Number(n) => Ok(*n),
        _ => match interp.internal_of(this) {
            Some(Internal::Number(n)) => Ok(*n),
            _ => Err(interp.type_error("Number.prototype method called on incompatible object")),
        },
    }
}

fn number_to_string(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Completion {
    let n = try_result!(this_number(interp, this));
    let radix = match args.first() {
        None | Some(JsValue::Undefined) => 10,
        Some(r) => try_result!(interp.to_integer(r)) as i64,
    };
    if !(2..=36).contains(&radix) {
        return interp.runtime_error(ErrorKind::Range, "radix must be between 2 and 36");
    }
    let text = match n.finite() {
        Some(x) if radix != 10 => format_radix(x, radix as u32),
        _ => number_ops::to_string(n),
    };
    Completion::Normal(JsValue::from(text))
}

fn number_to_locale_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Completion {
    let n = try_result!(this_number(interp, this));
    Completion::Normal(JsValue::from(number_ops::to_string(n)))
}

fn number_value_of(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Completion {
    Completion::Normal(JsValue::Number(try_result!(this_number(interp, this))))
}

/// Finite number in base `radix`, with at most 20 fraction digits.
fn format_radix(x: f64, radix: u32) -> String {
    let base = f64::from(radix);
    let mut int_part = x.abs().trunc();
    let mut frac = x.abs() - int_part;

    let mut digits = Vec::new();
    loop {
        let d = (int_part % base) as u32;
        digits.push(char::from_digit(d, radix).unwrap_or('0'));
        int_part = (int_part / base).trunc();
        if int_part < 1.0 {
            break;
        }
    }
    if x < 0.0 {
        digits.push('-');
    }
    let mut out: String = digits.into_iter().rev().collect();

    if frac > 0.0 {
        out.push('.');
        for _ in 0..20 {
            frac *= base;
            let d = frac.trunc() as u32;
            out.push(char::from_digit(d, radix).unwrap_or('0'));
            frac -= f64::from(d);
            if frac <= 0.0 {
                break;
            }
        }
    }
    out
}

fn parse_int(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Completion {
    let s = try_result!(interp.to_string(&arg(args, 0)));
    let radix = try_result!(interp.to_number(&arg(args, 1)));
    let mut radix = number_ops::to_int32(radix);

    let mut rest = trim_js_start(&s);
    let negative = rest.starts_with('-');
    if negative || rest.starts_with('+') {
        rest = &rest[1..];
    }
    let mut strip_hex = true;
    if radix != 0 {
        if !(2..=36).contains(&radix) {
            return Completion::Normal(JsValue::Number(JsNumber::NAN));
        }
        strip_hex = radix == 16;
    } else {
        radix = 10;
    }
    if strip_hex && (rest.starts_with("0x") || rest.starts_with("0X")) {
        rest = &rest[2..];
        radix = 16;
    }

    let mut value = 0.0f64;
    let mut any = false;
    for c in rest.chars() {
        let Some(d) = c.to_digit(radix as u32) else {
            break;
        };
        value = value * f64::from(radix) + f64::from(d);
        any = true;
    }
    if !any {
        return Completion::Normal(JsValue::Number(JsNumber::NAN));
    }
    Completion::Normal(JsValue::number(if negative { -value } else { value }))
}

/// Longest prefix of `s` that reads as a decimal literal.
fn parse_float_prefix(s: &str) -> JsNumber {
    let t = trim_js_start(s);
    let bytes = t.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    if t[end..].starts_with("Infinity") {
        return if t.starts_with('-') {
            JsNumber::NEG_INFINITY
        } else {
            JsNumber::POS_INFINITY
        };
    }
    let digits = |from: usize| bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count();

    let int_digits = digits(end);
    end += int_digits;
    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = digits(end + 1);
        end += 1 + frac_digits;
    }
    if int_digits + frac_digits == 0 {
        return JsNumber::NAN;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_digits = digits(exp);
        if exp_digits > 0 {
            end = exp + exp_digits;
        }
    }
    t[..end].parse::<f64>().map_or(JsNumber::NAN, JsNumber::new)
}

fn parse_float(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Completion {
    let s = try_result!(interp.to_string(&arg(args, 0)));
    Completion::Normal(JsValue::Number(parse_float_prefix(&s)))
}

fn is_nan(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Completion {
    let n = try_result!(interp.to_number(&arg(args, 0)));
    Completion::Normal(JsValue::Boolean(n.is_nan()))
}

fn is_finite(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Completion {
    let n = try_result!(interp.to_number(&arg(args, 0)));
    Completion::Normal(JsValue::Boolean(n.is_finite()))
}

fn math_atan2(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Completion {
    let y = try_result!(interp.to_number(&arg(args, 0)));
    let x = try_result!(interp.to_number(&arg(args, 1)));
    Completion::Normal(JsValue::number(y.value().atan2(x.value())))
}

fn math_pow(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Completion {
    let x = try_result!(interp.to_number(&arg(args, 0)));
    let y = try_result!(interp.to_number(&arg(args, 1)));
    if y.is_nan() || (x.value().abs() == 1.0 && !y.is_finite()) {
        return Completion::Normal(JsValue::Number(JsNumber::NAN));
    }
    Completion::Normal(JsValue::number(x.value().powf(y.value())))
}

/// Shared by `max` and `min`: NaN wins, otherwise `better` picks.
fn fold_extreme(
    interp: &mut Interpreter,
    args: &[JsValue],
    start: JsNumber,
    better: fn(JsNumber, JsNumber) -> bool,
) -> Completion {
    let mut best = start;
    for a in args {
        let n = try_result!(interp.to_number(a));
        if n.is_nan() {
            return Completion::Normal(JsValue::Number(JsNumber::NAN));
        }
        if better(n, best) {
            best = n;
        }
    }
    Completion::Normal(JsValue::Number(best))
}

fn math_max(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Completion {
    fold_extreme(interp, args, JsNumber::NEG_INFINITY, |n, best| {
        number_ops::less_than(best, n) == Some(true)
    })
}

fn math_min(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Completion {
    fold_extreme(interp, args, JsNumber::POS_INFINITY, |n, best| {
        number_ops::less_than(n, best) == Some(true)
    })
}

fn math_random(interp: &mut Interpreter, _this: &JsValue, _args: &[JsValue]) -> Completion {
    Completion::Normal(JsValue::number(interp.next_random()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radix_formatting() {
        assert_eq!(format_radix(255.0, 16), "ff");
        assert_eq!(format_radix(-8.0, 2), "-1000");
        assert_eq!(format_radix(0.5, 2), "0.1");
        assert_eq!(format_radix(0.0, 36), "0");
    }

    #[test]
    fn float_prefixes() {
        assert_eq!(parse_float_prefix("  3.25abc").finite(), Some(3.25));
        assert_eq!(parse_float_prefix("1e3x").finite(), Some(1000.0));
        assert_eq!(parse_float_prefix("1e").finite(), Some(1.0));
        assert_eq!(parse_float_prefix(".5").finite(), Some(0.5));
        assert!(parse_float_prefix("-Infinity").is_negative());
        assert!(parse_float_prefix("abc").is_nan());
        assert!(parse_float_prefix(".").is_nan());
    }

    #[test]
    fn rounding_goes_up_at_half() {
        assert_eq!(js_round(2.5), 3.0);
        assert_eq!(js_round(-2.5), -2.0);
        assert_eq!(js_round(-0.2), 0.0);
        assert!(js_round(-0.2).is_sign_negative());
    }
}
