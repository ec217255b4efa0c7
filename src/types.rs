use std::cell::OnceCell;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

#[derive(Clone, Debug)]
pub enum JsValue {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
    Symbol(JsSymbol),
    BigInt(JsBigInt),
    Object(JsObject),
}

/// UTF-16 code unit string (§6.1.4).
///
/// A string is either flat or a concatenation ("cons") of two other strings.
/// Cons strings flatten lazily the first time their code units are needed;
/// equality and hashing always go through the flattened code units, so a rope
/// and a flat string with the same contents are indistinguishable.
#[derive(Clone)]
pub struct JsString {
    repr: StringRepr,
}

#[derive(Clone)]
enum StringRepr {
    Flat(Rc<[u16]>),
    Cons(Rc<ConsString>),
}

struct ConsString {
    left: JsString,
    right: JsString,
    len: usize,
    flat: OnceCell<Rc<[u16]>>,
}

impl JsString {
    pub fn from_str(s: &str) -> Self {
        Self::from_code_units(s.encode_utf16().collect())
    }

    pub fn from_code_units(units: Vec<u16>) -> Self {
        Self {
            repr: StringRepr::Flat(units.into()),
        }
    }

    /// Concatenates two strings without copying either side.
    pub fn concat(left: &JsString, right: &JsString) -> JsString {
        if left.is_empty() {
            return right.clone();
        }
        if right.is_empty() {
            return left.clone();
        }
        JsString {
            repr: StringRepr::Cons(Rc::new(ConsString {
                left: left.clone(),
                right: right.clone(),
                len: left.len() + right.len(),
                flat: OnceCell::new(),
            })),
        }
    }

    pub fn is_flat(&self) -> bool {
        matches!(self.repr, StringRepr::Flat(_))
    }

    /// Returns a flat string with the same contents. Ropes are copied once and
    /// the result shares the rope's cached buffer.
    pub fn flatten(&self) -> JsString {
        match &self.repr {
            StringRepr::Flat(_) => self.clone(),
            StringRepr::Cons(cons) => JsString {
                repr: StringRepr::Flat(cons.flat.get_or_init(|| flatten_cons(cons)).clone()),
            },
        }
    }

    pub fn code_units(&self) -> &[u16] {
        match &self.repr {
            StringRepr::Flat(units) => units,
            StringRepr::Cons(cons) => cons.flat.get_or_init(|| flatten_cons(cons)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        match &self.repr {
            StringRepr::Flat(units) => units.len(),
            StringRepr::Cons(cons) => cons.len,
        }
    }

    pub fn to_rust_string(&self) -> String {
        String::from_utf16_lossy(self.code_units())
    }

    // §6.1.4.1 StringIndexOf(string, searchValue, fromIndex)
    pub fn index_of(&self, search: &JsString, from: usize) -> Option<usize> {
        let units = self.code_units();
        let needle = search.code_units();
        if needle.is_empty() {
            return if from <= units.len() { Some(from) } else { None };
        }
        if from + needle.len() > units.len() {
            return None;
        }
        (from..=(units.len() - needle.len())).find(|&i| units[i..i + needle.len()] == *needle)
    }

    pub fn slice_utf16(&self, start: usize, end: usize) -> JsString {
        let units = self.code_units();
        let s = start.min(units.len());
        let e = end.min(units.len());
        if s >= e {
            return JsString::from_code_units(Vec::new());
        }
        JsString::from_code_units(units[s..e].to_vec())
    }
}

// Ropes can be arbitrarily deep, so walk them with an explicit stack.
fn flatten_cons(cons: &ConsString) -> Rc<[u16]> {
    let mut out = Vec::with_capacity(cons.len);
    let mut stack: Vec<&JsString> = vec![&cons.right, &cons.left];
    while let Some(part) = stack.pop() {
        match &part.repr {
            StringRepr::Flat(units) => out.extend_from_slice(units),
            StringRepr::Cons(inner) => match inner.flat.get() {
                Some(units) => out.extend_from_slice(units),
                None => {
                    stack.push(&inner.right);
                    stack.push(&inner.left);
                }
            },
        }
    }
    out.into()
}

impl PartialEq for JsString {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.code_units() == other.code_units()
    }
}

impl Eq for JsString {}

impl Hash for JsString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code_units().hash(state);
    }
}

impl PartialOrd for JsString {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Code unit order, as used by the default Array.prototype.sort comparator.
impl Ord for JsString {
    fn cmp(&self, other: &Self) -> Ordering {
        self.code_units().cmp(other.code_units())
    }
}

impl fmt::Debug for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_rust_string())
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rust_string())
    }
}

impl From<&str> for JsString {
    fn from(s: &str) -> Self {
        JsString::from_str(s)
    }
}

#[derive(Clone, Debug)]
pub struct JsSymbol {
    pub id: u64,
    pub description: Option<JsString>,
}

impl PartialEq for JsSymbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for JsSymbol {}

impl Hash for JsSymbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct JsBigInt {
    pub value: num_bigint::BigInt,
}

/// Handle to an object living in a realm's object arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct JsObject {
    pub id: u64,
}

/// A property key: a flat string or a symbol (§6.1.7).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    String(JsString),
    Symbol(JsSymbol),
}

/// Largest valid array index, 2^32 - 2.
pub const MAX_ARRAY_INDEX: u32 = u32::MAX - 1;

impl PropertyKey {
    /// Returns the key as an array index when it is the canonical decimal
    /// form of an integer in `0..=2^32-2`.
    pub fn array_index(&self) -> Option<u32> {
        let PropertyKey::String(s) = self else {
            return None;
        };
        let units = s.code_units();
        if units.is_empty() || units.len() > 10 {
            return None;
        }
        if units.len() > 1 && units[0] == u16::from(b'0') {
            return None;
        }
        let mut n: u64 = 0;
        for &u in units {
            if !(u16::from(b'0')..=u16::from(b'9')).contains(&u) {
                return None;
            }
            n = n * 10 + u64::from(u - u16::from(b'0'));
        }
        if n > u64::from(MAX_ARRAY_INDEX) {
            return None;
        }
        Some(n as u32)
    }

    /// Returns the key as an integer index if it is a canonical numeric
    /// string (§7.1.21). Typed arrays treat every such key as an element
    /// access, including negative and fractional ones.
    pub fn canonical_numeric_index(&self) -> Option<f64> {
        let PropertyKey::String(s) = self else {
            return None;
        };
        let text = s.to_rust_string();
        if text == "-0" {
            return Some(-0.0);
        }
        let n: f64 = match text.as_str() {
            "Infinity" => f64::INFINITY,
            "-Infinity" => f64::NEG_INFINITY,
            "NaN" => f64::NAN,
            _ => text.parse().ok()?,
        };
        if number_ops::to_string(n) == text {
            Some(n)
        } else {
            None
        }
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, PropertyKey::Symbol(_))
    }

    pub fn as_js_value(&self) -> JsValue {
        match self {
            PropertyKey::String(s) => JsValue::String(s.clone()),
            PropertyKey::Symbol(s) => JsValue::Symbol(s.clone()),
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        PropertyKey::String(JsString::from_str(s))
    }
}

impl From<JsString> for PropertyKey {
    fn from(s: JsString) -> Self {
        PropertyKey::String(s.flatten())
    }
}

impl From<u32> for PropertyKey {
    fn from(index: u32) -> Self {
        PropertyKey::String(JsString::from_str(&index.to_string()))
    }
}

impl From<JsSymbol> for PropertyKey {
    fn from(sym: JsSymbol) -> Self {
        PropertyKey::Symbol(sym)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::String(s) => write!(f, "{s}"),
            PropertyKey::Symbol(sym) => match &sym.description {
                Some(desc) => write!(f, "Symbol({desc})"),
                None => write!(f, "Symbol()"),
            },
        }
    }
}

impl JsValue {
    pub fn is_undefined(&self) -> bool {
        matches!(self, JsValue::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, JsValue::Null)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, JsValue::Number(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, JsValue::String(_))
    }

    pub fn is_bigint(&self) -> bool {
        matches!(self, JsValue::BigInt(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, JsValue::Object(_))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, JsValue::Undefined | JsValue::Null)
    }

    pub fn as_object(&self) -> Option<JsObject> {
        match self {
            JsValue::Object(o) => Some(*o),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            JsValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn str(s: &str) -> JsValue {
        JsValue::String(JsString::from_str(s))
    }
}

impl From<f64> for JsValue {
    fn from(n: f64) -> Self {
        JsValue::Number(n)
    }
}

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        JsValue::Boolean(b)
    }
}

impl From<JsObject> for JsValue {
    fn from(o: JsObject) -> Self {
        JsValue::Object(o)
    }
}

impl From<JsString> for JsValue {
    fn from(s: JsString) -> Self {
        JsValue::String(s)
    }
}

// §6.1.6.1 Number type operations
pub mod number_ops {
    /// Largest integer n such that n and n+1 are both exactly representable.
    pub const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

    pub fn same_value(x: f64, y: f64) -> bool {
        if x.is_nan() && y.is_nan() {
            return true;
        }
        if x == 0.0 && y == 0.0 {
            return x.is_sign_positive() == y.is_sign_positive();
        }
        x == y
    }

    pub fn same_value_zero(x: f64, y: f64) -> bool {
        if x.is_nan() && y.is_nan() {
            return true;
        }
        x == y
    }

    pub fn to_string(x: f64) -> String {
        if x.is_nan() {
            return "NaN".to_string();
        }
        if x == 0.0 {
            return "0".to_string();
        }
        if x.is_infinite() {
            return if x > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
        }
        let mut buf = ryu_js::Buffer::new();
        buf.format(x).to_string()
    }

    // §7.1.6 ToInt32
    pub fn to_int32(x: f64) -> i32 {
        to_uint32(x) as i32
    }

    // §7.1.7 ToUint32
    pub fn to_uint32(x: f64) -> u32 {
        if x.is_nan() || x.is_infinite() || x == 0.0 {
            return 0;
        }
        let int_val = x.trunc();
        int_val.rem_euclid(4_294_967_296.0) as u32
    }

    // §7.1.8 ToInt16
    pub fn to_int16(x: f64) -> i16 {
        to_uint32(x) as u16 as i16
    }

    // §7.1.9 ToUint16
    pub fn to_uint16(x: f64) -> u16 {
        to_uint32(x) as u16
    }

    // §7.1.10 ToInt8
    pub fn to_int8(x: f64) -> i8 {
        to_uint32(x) as u8 as i8
    }

    // §7.1.11 ToUint8
    pub fn to_uint8(x: f64) -> u8 {
        to_uint32(x) as u8
    }

    // §7.1.12 ToUint8Clamp
    pub fn to_uint8_clamp(x: f64) -> u8 {
        if x.is_nan() || x <= 0.0 {
            return 0;
        }
        if x >= 255.0 {
            return 255;
        }
        x.round_ties_even() as u8
    }
}

// §6.1.6.2 BigInt conversions used by the 64-bit element types
pub mod bigint_ops {
    use num_bigint::BigInt;

    // §7.1.15 ToBigInt64
    pub fn to_big_int64(x: &BigInt) -> i64 {
        to_big_uint64(x) as i64
    }

    // §7.1.16 ToBigUint64
    pub fn to_big_uint64(x: &BigInt) -> u64 {
        let masked = x & BigInt::from(u64::MAX);
        u64::try_from(&masked).unwrap_or(0)
    }
}

impl fmt::Display for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "undefined"),
            JsValue::Null => write!(f, "null"),
            JsValue::Boolean(b) => write!(f, "{b}"),
            JsValue::Number(n) => write!(f, "{}", number_ops::to_string(*n)),
            JsValue::String(s) => write!(f, "{s}"),
            JsValue::Symbol(s) => {
                if let Some(desc) = &s.description {
                    write!(f, "Symbol({desc})")
                } else {
                    write!(f, "Symbol()")
                }
            }
            JsValue::BigInt(b) => write!(f, "{}n", b.value),
            JsValue::Object(_) => write!(f, "[object Object]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    #[test]
    fn js_string_index_of() {
        let s = JsString::from_str("hello world");
        let search = JsString::from_str("world");
        assert_eq!(s.index_of(&search, 0), Some(6));
        assert_eq!(s.index_of(&search, 7), None);

        let empty = JsString::from_str("");
        assert_eq!(s.index_of(&empty, 5), Some(5));
    }

    #[test]
    fn cons_string_equals_flat() {
        let rope = JsString::concat(&JsString::from_str("ab"), &JsString::from_str("cd"));
        assert!(!rope.is_flat());
        assert_eq!(rope.len(), 4);
        assert_eq!(rope, JsString::from_str("abcd"));
        assert!(rope.flatten().is_flat());

        use std::collections::hash_map::DefaultHasher;
        let hash = |s: &JsString| {
            let mut h = DefaultHasher::new();
            s.hash(&mut h);
            h.finish()
        };
        assert_eq!(hash(&rope), hash(&JsString::from_str("abcd")));
    }

    #[test]
    fn deep_rope_flattens_without_recursion() {
        let piece = JsString::from_str("x");
        let mut rope = piece.clone();
        for _ in 0..100_000 {
            rope = JsString::concat(&rope, &piece);
        }
        assert_eq!(rope.len(), 100_001);
        assert_eq!(rope.code_units().len(), 100_001);
    }

    #[test]
    fn array_index_keys() {
        assert_eq!(PropertyKey::from("0").array_index(), Some(0));
        assert_eq!(PropertyKey::from("4294967294").array_index(), Some(MAX_ARRAY_INDEX));
        assert_eq!(PropertyKey::from("4294967295").array_index(), None);
        assert_eq!(PropertyKey::from("01").array_index(), None);
        assert_eq!(PropertyKey::from("-1").array_index(), None);
        assert_eq!(PropertyKey::from("1.5").array_index(), None);
        assert_eq!(PropertyKey::from("length").array_index(), None);
    }

    #[test]
    fn canonical_numeric_keys() {
        assert_eq!(PropertyKey::from("-1").canonical_numeric_index(), Some(-1.0));
        assert_eq!(PropertyKey::from("1.5").canonical_numeric_index(), Some(1.5));
        assert!(PropertyKey::from("-0").canonical_numeric_index().is_some());
        assert_eq!(PropertyKey::from("01").canonical_numeric_index(), None);
        assert_eq!(PropertyKey::from("foo").canonical_numeric_index(), None);
    }

    #[test]
    fn number_special_values() {
        assert_eq!(number_ops::to_string(f64::NAN), "NaN");
        assert_eq!(number_ops::to_string(0.0), "0");
        assert_eq!(number_ops::to_string(-0.0), "0");
        assert_eq!(number_ops::to_string(f64::INFINITY), "Infinity");
        assert_eq!(number_ops::to_string(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(number_ops::to_string(2.5), "2.5");
    }

    #[test]
    fn number_same_value() {
        assert!(number_ops::same_value(f64::NAN, f64::NAN));
        assert!(!number_ops::same_value(0.0, -0.0));
        assert!(number_ops::same_value_zero(0.0, -0.0));
    }

    #[test]
    fn integer_conversions_wrap() {
        assert_eq!(number_ops::to_int32(f64::NAN), 0);
        assert_eq!(number_ops::to_int32(42.9), 42);
        assert_eq!(number_ops::to_int32(-42.9), -42);
        assert_eq!(number_ops::to_int32(2_147_483_648.0), -2_147_483_648);
        assert_eq!(number_ops::to_uint32(-1.0), 4_294_967_295);
        assert_eq!(number_ops::to_int16(65_535.0), -1);
        assert_eq!(number_ops::to_int16(32_768.0), -32_768);
        assert_eq!(number_ops::to_uint8(256.0), 0);
        assert_eq!(number_ops::to_int8(-129.0), 127);
    }

    #[test]
    fn uint8_clamp_rounds_half_to_even() {
        assert_eq!(number_ops::to_uint8_clamp(-5.0), 0);
        assert_eq!(number_ops::to_uint8_clamp(300.0), 255);
        assert_eq!(number_ops::to_uint8_clamp(1.5), 2);
        assert_eq!(number_ops::to_uint8_clamp(2.5), 2);
        assert_eq!(number_ops::to_uint8_clamp(2.6), 3);
        assert_eq!(number_ops::to_uint8_clamp(f64::NAN), 0);
    }

    #[test]
    fn bigint_wraps_to_64_bits() {
        let big = BigInt::from(u64::MAX) + BigInt::from(2);
        assert_eq!(bigint_ops::to_big_uint64(&big), 1);
        assert_eq!(bigint_ops::to_big_int64(&BigInt::from(-1)), -1);
        assert_eq!(bigint_ops::to_big_uint64(&BigInt::from(-1)), u64::MAX);
    }

    #[test]
    fn display_values() {
        assert_eq!(format!("{}", JsValue::Undefined), "undefined");
        assert_eq!(format!("{}", JsValue::Null), "null");
        assert_eq!(format!("{}", JsValue::Boolean(true)), "true");
        assert_eq!(format!("{}", JsValue::Number(42.0)), "42");
        assert_eq!(format!("{}", JsValue::str("hi")), "hi");
    }
}
