use num_bigint::BigInt;

use crate::error::{JsError, JsResult};
use crate::types::{JsString, JsValue, PropertyKey, number_ops};

pub(crate) fn to_integer_or_infinity(n: f64) -> f64 {
    if n.is_nan() || n == 0.0 {
        0.0
    } else if n.is_infinite() {
        n
    } else {
        n.trunc()
    }
}

// §7.1.3 ToBoolean
pub(crate) fn to_boolean(val: &JsValue) -> bool {
    match val {
        JsValue::Undefined | JsValue::Null => false,
        JsValue::Boolean(b) => *b,
        JsValue::Number(n) => *n != 0.0 && !n.is_nan(),
        JsValue::String(s) => !s.is_empty(),
        JsValue::BigInt(b) => b.value != BigInt::from(0),
        JsValue::Symbol(_) | JsValue::Object(_) => true,
    }
}

// §7.1.4 ToNumber, for values that are already primitive. Objects convert
// through `Realm::to_number`, which unwraps primitive wrappers first.
pub(crate) fn to_number(val: &JsValue) -> JsResult<f64> {
    match val {
        JsValue::Undefined => Ok(f64::NAN),
        JsValue::Null => Ok(0.0),
        JsValue::Boolean(b) => Ok(f64::from(u8::from(*b))),
        JsValue::Number(n) => Ok(*n),
        JsValue::String(s) => Ok(string_to_number(s)),
        JsValue::Symbol(_) => Err(JsError::type_error(
            "Cannot convert a Symbol value to a number",
        )),
        JsValue::BigInt(_) => Err(JsError::type_error(
            "Cannot convert a BigInt value to a number",
        )),
        JsValue::Object(_) => Ok(f64::NAN),
    }
}

// §7.1.4.1.1 StringToNumber
fn string_to_number(s: &JsString) -> f64 {
    let rust_str = s.to_rust_string();
    let trimmed = rust_str.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = trimmed.strip_prefix(prefix) {
            if digits.is_empty() {
                return f64::NAN;
            }
            return digits.chars().try_fold(0.0_f64, |acc, c| {
                c.to_digit(radix).map(|d| acc * f64::from(radix) + f64::from(d))
            })
            .unwrap_or(f64::NAN);
        }
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    // Rust's float parser also accepts "inf" and "nan"; the language does not.
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
    {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

// §7.1.13 ToBigInt
pub(crate) fn to_big_int(val: &JsValue) -> JsResult<BigInt> {
    match val {
        JsValue::BigInt(b) => Ok(b.value.clone()),
        JsValue::Boolean(b) => Ok(BigInt::from(u8::from(*b))),
        JsValue::String(s) => {
            let text = s.to_rust_string();
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(BigInt::from(0));
            }
            trimmed.parse::<BigInt>().map_err(|_| {
                JsError::type_error(format!("Cannot convert {trimmed} to a BigInt"))
            })
        }
        other => Err(JsError::type_error(format!(
            "Cannot convert {} to a BigInt",
            type_name(other)
        ))),
    }
}

// §7.1.22 ToIndex
pub(crate) fn to_index(val: &JsValue) -> JsResult<usize> {
    if val.is_undefined() {
        return Ok(0);
    }
    let integer = to_integer_or_infinity(to_number(val)?);
    if !(0.0..=number_ops::MAX_SAFE_INTEGER).contains(&integer) {
        return Err(JsError::range_error("Invalid index"));
    }
    Ok(integer as usize)
}

// §7.1.17 ToString, for primitive values.
pub(crate) fn to_js_string(val: &JsValue) -> JsResult<JsString> {
    match val {
        JsValue::String(s) => Ok(s.clone()),
        JsValue::Symbol(_) => Err(JsError::type_error(
            "Cannot convert a Symbol value to a string",
        )),
        JsValue::BigInt(b) => Ok(JsString::from_str(&b.value.to_string())),
        other => Ok(JsString::from_str(&format!("{other}"))),
    }
}

// §7.1.19 ToPropertyKey
pub(crate) fn to_property_key(val: &JsValue) -> JsResult<PropertyKey> {
    match val {
        JsValue::Symbol(s) => Ok(PropertyKey::Symbol(s.clone())),
        other => Ok(PropertyKey::from(to_js_string(other)?)),
    }
}

pub(crate) fn type_name(val: &JsValue) -> &'static str {
    match val {
        JsValue::Undefined => "undefined",
        JsValue::Null => "null",
        JsValue::Boolean(_) => "boolean",
        JsValue::Number(_) => "number",
        JsValue::String(_) => "string",
        JsValue::Symbol(_) => "symbol",
        JsValue::BigInt(_) => "bigint",
        JsValue::Object(_) => "object",
    }
}

pub(crate) fn same_value(left: &JsValue, right: &JsValue) -> bool {
    match (left, right) {
        (JsValue::Number(a), JsValue::Number(b)) => number_ops::same_value(*a, *b),
        _ => strict_equality(left, right),
    }
}

pub(crate) fn same_value_zero(left: &JsValue, right: &JsValue) -> bool {
    match (left, right) {
        (JsValue::Number(a), JsValue::Number(b)) => number_ops::same_value_zero(*a, *b),
        _ => strict_equality(left, right),
    }
}

pub(crate) fn strict_equality(left: &JsValue, right: &JsValue) -> bool {
    match (left, right) {
        (JsValue::Undefined, JsValue::Undefined) => true,
        (JsValue::Null, JsValue::Null) => true,
        (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
        (JsValue::Number(a), JsValue::Number(b)) => a == b,
        (JsValue::String(a), JsValue::String(b)) => a == b,
        (JsValue::Symbol(a), JsValue::Symbol(b)) => a.id == b.id,
        (JsValue::BigInt(a), JsValue::BigInt(b)) => a.value == b.value,
        (JsValue::Object(a), JsValue::Object(b)) => a.id == b.id,
        _ => false,
    }
}

/// Resolves a relative start/end argument against `len` (negative counts from
/// the end) and clamps it into `0..=len`.
pub(crate) fn relative_to(rel: f64, len: f64) -> f64 {
    let rel = to_integer_or_infinity(rel);
    if rel < 0.0 {
        (len + rel).max(0.0)
    } else {
        rel.min(len)
    }
}
