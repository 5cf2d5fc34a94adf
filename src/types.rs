use std::fmt;
use std::rc::Rc;

/// Immutable script string. Cloning shares the buffer.
pub type JsString = Rc<str>;

/// Index of an object slot in the interpreter heap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) u32);

impl ObjectId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Numeric validity tag. Arithmetic is defined over this lattice rather
/// than over native float bit patterns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Validity {
    Valid = 0,
    NaN = 1,
    PosInf = 2,
    NegInf = 3,
}

/// A script number: a finite `f64` when `Valid`, otherwise only the tag
/// carries meaning.
#[derive(Clone, Copy, Debug)]
pub struct JsNumber {
    value: f64,
    validity: Validity,
}

impl JsNumber {
    pub const NAN: JsNumber = JsNumber {
        value: 0.0,
        validity: Validity::NaN,
    };
    pub const POS_INFINITY: JsNumber = JsNumber {
        value: 0.0,
        validity: Validity::PosInf,
    };
    pub const NEG_INFINITY: JsNumber = JsNumber {
        value: 0.0,
        validity: Validity::NegInf,
    };
    pub const ZERO: JsNumber = JsNumber {
        value: 0.0,
        validity: Validity::Valid,
    };

    /// Wraps a native float, moving NaN and infinities into the tag.
    pub fn new(x: f64) -> Self {
        if x.is_nan() {
            Self::NAN
        } else if x == f64::INFINITY {
            Self::POS_INFINITY
        } else if x == f64::NEG_INFINITY {
            Self::NEG_INFINITY
        } else {
            JsNumber {
                value: x,
                validity: Validity::Valid,
            }
        }
    }

    pub fn validity(self) -> Validity {
        self.validity
    }

    /// The value as a native float, for handing to `f64` math routines.
    pub fn value(self) -> f64 {
        match self.validity {
            Validity::Valid => self.value,
            Validity::NaN => f64::NAN,
            Validity::PosInf => f64::INFINITY,
            Validity::NegInf => f64::NEG_INFINITY,
        }
    }

    pub fn finite(self) -> Option<f64> {
        (self.validity == Validity::Valid).then_some(self.value)
    }

    pub fn is_nan(self) -> bool {
        self.validity == Validity::NaN
    }

    pub fn is_finite(self) -> bool {
        self.validity == Validity::Valid
    }

    pub fn is_zero(self) -> bool {
        self.validity == Validity::Valid && self.value == 0.0
    }

    /// Sign bit, with `-0` counting as negative. NaN reports positive.
    pub fn is_negative(self) -> bool {
        match self.validity {
            Validity::Valid => self.value.is_sign_negative(),
            Validity::NegInf => true,
            Validity::NaN | Validity::PosInf => false,
        }
    }

    fn signed_infinity(negative: bool) -> Self {
        if negative {
            Self::NEG_INFINITY
        } else {
            Self::POS_INFINITY
        }
    }

    fn signed_zero(negative: bool) -> Self {
        Self::new(if negative { -0.0 } else { 0.0 })
    }
}

impl From<f64> for JsNumber {
    fn from(x: f64) -> Self {
        JsNumber::new(x)
    }
}

impl From<i32> for JsNumber {
    fn from(x: i32) -> Self {
        JsNumber::new(f64::from(x))
    }
}

impl From<usize> for JsNumber {
    fn from(x: usize) -> Self {
        JsNumber::new(x as f64)
    }
}

/// Non-owning object reference. `id == None` is `null`; `this` records the
/// receiver a function value was read from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjRef {
    pub id: Option<ObjectId>,
    pub this: Option<ObjectId>,
}

#[derive(Clone, Debug)]
pub enum JsValue {
    Undefined,
    Number(JsNumber),
    Boolean(bool),
    String(JsString),
    Object(ObjRef),
}

impl JsValue {
    pub fn null() -> Self {
        JsValue::Object(ObjRef {
            id: None,
            this: None,
        })
    }

    pub fn object(id: ObjectId) -> Self {
        JsValue::Object(ObjRef {
            id: Some(id),
            this: None,
        })
    }

    pub fn bound(id: ObjectId, this: ObjectId) -> Self {
        JsValue::Object(ObjRef {
            id: Some(id),
            this: Some(this),
        })
    }

    pub fn number(x: impl Into<JsNumber>) -> Self {
        JsValue::Number(x.into())
    }

    pub fn string(s: &str) -> Self {
        JsValue::String(Rc::from(s))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, JsValue::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, JsValue::Object(ObjRef { id: None, .. }))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, JsValue::String(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, JsValue::Number(_))
    }

    /// The referenced object, if this is a non-null object reference.
    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            JsValue::Object(r) => r.id,
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<JsNumber> {
        match self {
            JsValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Drops any bound receiver; used when a value is stored.
    pub fn unbound(self) -> Self {
        match self {
            JsValue::Object(r) => JsValue::Object(ObjRef {
                id: r.id,
                this: None,
            }),
            other => other,
        }
    }
}

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        JsValue::Boolean(b)
    }
}

impl From<f64> for JsValue {
    fn from(x: f64) -> Self {
        JsValue::Number(JsNumber::new(x))
    }
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        JsValue::string(s)
    }
}

impl From<String> for JsValue {
    fn from(s: String) -> Self {
        JsValue::String(Rc::from(s))
    }
}

pub mod number_ops {
    use super::{JsNumber, Validity};

    #[derive(Clone, Copy)]
    enum Lattice {
        Compute,
        Yield(Validity),
    }

    use Lattice::{Compute, Yield};
    use Validity::{NaN, NegInf, PosInf};

    // Rows: left operand validity. Columns: right operand validity.
    // Order: Valid, NaN, +Infinity, -Infinity.
    const ADD: [[Lattice; 4]; 4] = [
        [Compute, Yield(NaN), Yield(PosInf), Yield(NegInf)],
        [Yield(NaN), Yield(NaN), Yield(NaN), Yield(NaN)],
        [Yield(PosInf), Yield(NaN), Yield(PosInf), Yield(NaN)],
        [Yield(NegInf), Yield(NaN), Yield(NaN), Yield(NegInf)],
    ];

    const SUB: [[Lattice; 4]; 4] = [
        [Compute, Yield(NaN), Yield(NegInf), Yield(PosInf)],
        [Yield(NaN), Yield(NaN), Yield(NaN), Yield(NaN)],
        [Yield(PosInf), Yield(NaN), Yield(NaN), Yield(PosInf)],
        [Yield(NegInf), Yield(NaN), Yield(NegInf), Yield(NaN)],
    ];

    fn from_validity(v: Validity) -> JsNumber {
        match v {
            Validity::Valid => JsNumber::ZERO,
            Validity::NaN => JsNumber::NAN,
            Validity::PosInf => JsNumber::POS_INFINITY,
            Validity::NegInf => JsNumber::NEG_INFINITY,
        }
    }

    fn lookup(
        table: &[[Lattice; 4]; 4],
        x: JsNumber,
        y: JsNumber,
        op: fn(f64, f64) -> f64,
    ) -> JsNumber {
        match table[x.validity() as usize][y.validity() as usize] {
            Compute => JsNumber::new(op(x.value(), y.value())),
            Yield(v) => from_validity(v),
        }
    }

    pub fn add(x: JsNumber, y: JsNumber) -> JsNumber {
        lookup(&ADD, x, y, |a, b| a + b)
    }

    pub fn sub(x: JsNumber, y: JsNumber) -> JsNumber {
        lookup(&SUB, x, y, |a, b| a - b)
    }

    pub fn mul(x: JsNumber, y: JsNumber) -> JsNumber {
        if x.is_nan() || y.is_nan() {
            return JsNumber::NAN;
        }
        let negative = x.is_negative() != y.is_negative();
        if !x.is_finite() || !y.is_finite() {
            if x.is_zero() || y.is_zero() {
                return JsNumber::NAN;
            }
            return JsNumber::signed_infinity(negative);
        }
        JsNumber::new(x.value() * y.value())
    }

    pub fn div(x: JsNumber, y: JsNumber) -> JsNumber {
        if x.is_nan() || y.is_nan() {
            return JsNumber::NAN;
        }
        let negative = x.is_negative() != y.is_negative();
        match (x.is_finite(), y.is_finite()) {
            (false, false) => JsNumber::NAN,
            (false, true) => JsNumber::signed_infinity(negative),
            (true, false) => JsNumber::signed_zero(negative),
            (true, true) => {
                if y.is_zero() {
                    if x.is_zero() {
                        JsNumber::NAN
                    } else {
                        JsNumber::signed_infinity(negative)
                    }
                } else {
                    JsNumber::new(x.value() / y.value())
                }
            }
        }
    }

    pub fn rem(x: JsNumber, y: JsNumber) -> JsNumber {
        if x.is_nan() || y.is_nan() || !x.is_finite() || y.is_zero() {
            return JsNumber::NAN;
        }
        if !y.is_finite() {
            return x;
        }
        JsNumber::new(x.value() % y.value())
    }

    pub fn neg(x: JsNumber) -> JsNumber {
        match x.validity() {
            Validity::Valid => JsNumber::new(-x.value()),
            Validity::NaN => JsNumber::NAN,
            Validity::PosInf => JsNumber::NEG_INFINITY,
            Validity::NegInf => JsNumber::POS_INFINITY,
        }
    }

    fn rank(x: JsNumber) -> u8 {
        match x.validity() {
            Validity::NegInf => 0,
            Validity::Valid | Validity::NaN => 1,
            Validity::PosInf => 2,
        }
    }

    /// `None` when either side is NaN.
    pub fn less_than(x: JsNumber, y: JsNumber) -> Option<bool> {
        if x.is_nan() || y.is_nan() {
            return None;
        }
        if x.is_finite() && y.is_finite() {
            return Some(x.value() < y.value());
        }
        Some(rank(x) < rank(y))
    }

    /// NaN is unequal to everything, itself included.
    pub fn equal(x: JsNumber, y: JsNumber) -> bool {
        if x.is_nan() || y.is_nan() {
            return false;
        }
        match (x.finite(), y.finite()) {
            (Some(a), Some(b)) => a == b,
            _ => x.validity() == y.validity(),
        }
    }

    pub fn to_int32(x: JsNumber) -> i32 {
        to_uint32(x) as i32
    }

    pub fn to_uint32(x: JsNumber) -> u32 {
        match x.finite() {
            Some(v) => v.trunc().rem_euclid(4_294_967_296.0) as u32,
            None => 0,
        }
    }

    pub fn to_string(x: JsNumber) -> String {
        match x.validity() {
            Validity::NaN => "NaN".to_string(),
            Validity::PosInf => "Infinity".to_string(),
            Validity::NegInf => "-Infinity".to_string(),
            Validity::Valid => {
                if x.value() == 0.0 {
                    return "0".to_string();
                }
                let mut buf = ryu_js::Buffer::new();
                buf.format(x.value()).to_string()
            }
        }
    }
}

impl fmt::Display for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "undefined"),
            JsValue::Boolean(b) => write!(f, "{b}"),
            JsValue::Number(n) => write!(f, "{}", number_ops::to_string(*n)),
            JsValue::String(s) => write!(f, "{s}"),
            JsValue::Object(r) if r.id.is_none() => write!(f, "null"),
            JsValue::Object(_) => write!(f, "[object Object]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(x: f64) -> JsNumber {
        JsNumber::new(x)
    }

    #[test]
    fn native_specials_are_tagged() {
        assert_eq!(n(f64::NAN).validity(), Validity::NaN);
        assert_eq!(n(f64::INFINITY).validity(), Validity::PosInf);
        assert_eq!(n(f64::NEG_INFINITY).validity(), Validity::NegInf);
        assert_eq!(n(1e308 * 10.0).validity(), Validity::PosInf);
        assert_eq!(n(3.5).finite(), Some(3.5));
    }

    #[test]
    fn addition_lattice() {
        let inf = JsNumber::POS_INFINITY;
        let ninf = JsNumber::NEG_INFINITY;
        assert!(number_ops::add(inf, ninf).is_nan());
        assert_eq!(number_ops::add(inf, n(5.0)).validity(), Validity::PosInf);
        assert_eq!(number_ops::add(ninf, ninf).validity(), Validity::NegInf);
        assert!(number_ops::add(JsNumber::NAN, n(1.0)).is_nan());
        assert_eq!(number_ops::add(n(1.5), n(2.0)).finite(), Some(3.5));
    }

    #[test]
    fn subtraction_lattice() {
        let inf = JsNumber::POS_INFINITY;
        let ninf = JsNumber::NEG_INFINITY;
        assert!(number_ops::sub(inf, inf).is_nan());
        assert!(number_ops::sub(ninf, ninf).is_nan());
        assert_eq!(number_ops::sub(inf, ninf).validity(), Validity::PosInf);
        assert_eq!(number_ops::sub(n(1.0), inf).validity(), Validity::NegInf);
        assert_eq!(number_ops::sub(n(1.0), ninf).validity(), Validity::PosInf);
    }

    #[test]
    fn multiplication_specials() {
        assert!(number_ops::mul(JsNumber::POS_INFINITY, n(0.0)).is_nan());
        assert!(number_ops::mul(n(0.0), JsNumber::NEG_INFINITY).is_nan());
        assert_eq!(
            number_ops::mul(JsNumber::POS_INFINITY, n(-2.0)).validity(),
            Validity::NegInf
        );
        assert_eq!(number_ops::mul(n(3.0), n(4.0)).finite(), Some(12.0));
    }

    #[test]
    fn division_specials() {
        assert_eq!(number_ops::div(n(5.0), n(0.0)).validity(), Validity::PosInf);
        assert_eq!(number_ops::div(n(-5.0), n(0.0)).validity(), Validity::NegInf);
        assert!(number_ops::div(n(0.0), n(0.0)).is_nan());
        assert!(number_ops::div(JsNumber::POS_INFINITY, JsNumber::NEG_INFINITY).is_nan());
        assert!(number_ops::div(n(1.0), JsNumber::POS_INFINITY).is_zero());
        assert_eq!(number_ops::div(n(7.0), n(2.0)).finite(), Some(3.5));
    }

    #[test]
    fn remainder_specials() {
        assert!(number_ops::rem(n(5.0), n(0.0)).is_nan());
        assert!(number_ops::rem(JsNumber::POS_INFINITY, n(2.0)).is_nan());
        assert_eq!(number_ops::rem(n(5.0), JsNumber::POS_INFINITY).finite(), Some(5.0));
        assert_eq!(number_ops::rem(n(-7.0), n(3.0)).finite(), Some(-1.0));
    }

    #[test]
    fn comparisons() {
        assert_eq!(number_ops::less_than(JsNumber::NEG_INFINITY, n(-1e300)), Some(true));
        assert_eq!(number_ops::less_than(n(1e300), JsNumber::POS_INFINITY), Some(true));
        assert_eq!(number_ops::less_than(JsNumber::NAN, n(1.0)), None);
        assert!(!number_ops::equal(JsNumber::NAN, JsNumber::NAN));
        assert!(number_ops::equal(JsNumber::POS_INFINITY, JsNumber::POS_INFINITY));
        assert!(number_ops::equal(n(0.0), n(-0.0)));
    }

    #[test]
    fn int32_conversion() {
        assert_eq!(number_ops::to_int32(JsNumber::NAN), 0);
        assert_eq!(number_ops::to_int32(JsNumber::POS_INFINITY), 0);
        assert_eq!(number_ops::to_int32(n(42.9)), 42);
        assert_eq!(number_ops::to_int32(n(-42.9)), -42);
        assert_eq!(number_ops::to_int32(n(4_294_967_296.0 + 5.0)), 5);
        assert_eq!(number_ops::to_uint32(n(-1.0)), 4_294_967_295);
    }

    #[test]
    fn number_formatting() {
        assert_eq!(number_ops::to_string(JsNumber::NAN), "NaN");
        assert_eq!(number_ops::to_string(n(-0.0)), "0");
        assert_eq!(number_ops::to_string(JsNumber::NEG_INFINITY), "-Infinity");
        assert_eq!(number_ops::to_string(n(42.0)), "42");
        assert_eq!(number_ops::to_string(n(0.1 + 0.2)), "0.30000000000000004");
        assert_eq!(number_ops::to_string(n(1e21)), "1e+21");
    }

    #[test]
    fn display_values() {
        assert_eq!(JsValue::Undefined.to_string(), "undefined");
        assert_eq!(JsValue::null().to_string(), "null");
        assert_eq!(JsValue::Boolean(true).to_string(), "true");
        assert_eq!(JsValue::number(2.5).to_string(), "2.5");
        assert_eq!(JsValue::string("hi").to_string(), "hi");
    }
}
