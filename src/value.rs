//! Value representation
//!
//! The tagged `Value` type moved around by the stack machine, the shared
//! `JsString` type, and the conversions that do not need an interpreter.

use std::fmt;
use std::rc::Rc;

use crate::gc::ObjectId;

/// Trait for types that have cheap (O(1), reference-counted) clones.
///
/// This makes it explicit at call sites that a clone only bumps a
/// reference count (or copies a handle) rather than copying data.
pub trait CheapClone: Clone {
    /// Create a cheap clone of this value.
    fn cheap_clone(&self) -> Self {
        self.clone()
    }
}

impl<T: ?Sized> CheapClone for Rc<T> {}

/// A runtime value.
///
/// Object references are non-owning arena handles; whether the object is
/// still alive is decided by the collector, not by the handle.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
    Object(ObjectId),
}

impl CheapClone for Value {}

impl Value {
    /// Check if this value is null or undefined
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Null | Value::Undefined)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Value::Object(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Convert to boolean (ToBoolean)
    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Object(_) => true,
        }
    }

    /// ToNumber for primitives. Objects need ToPrimitive first, which
    /// only the interpreter can do; they convert to NaN here.
    pub fn to_number_primitive(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Boolean(true) => 1.0,
            Value::Boolean(false) => 0.0,
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s.as_str()),
            Value::Object(_) => f64::NAN,
        }
    }

    /// ToString for primitives. Objects render as `[object Object]`;
    /// the interpreter handles them through ToPrimitive.
    pub fn to_string_primitive(&self) -> JsString {
        match self {
            Value::Undefined => JsString::from("undefined"),
            Value::Null => JsString::from("null"),
            Value::Boolean(true) => JsString::from("true"),
            Value::Boolean(false) => JsString::from("false"),
            Value::Number(n) => JsString::from(number_to_string(*n)),
            Value::String(s) => s.cheap_clone(),
            Value::Object(_) => JsString::from("[object Object]"),
        }
    }

    /// Strict equality (===)
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            // NaN !== NaN, 0 === -0
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", number_to_string(*n)),
            Value::String(s) => write!(f, "\"{}\"", s.as_str()),
            Value::Object(id) => write!(f, "[object #{}]", id.index()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.strict_equals(other)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(JsString::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(JsString::from(s))
    }
}

impl From<JsString> for Value {
    fn from(s: JsString) -> Self {
        Value::String(s)
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Value::Object(id)
    }
}

/// Reference-counted immutable string
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsString(Rc<str>);

// JsString wraps Rc<str>, so clone is cheap (just reference count increment)
impl CheapClone for JsString {}

impl JsString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Number of characters, which is what `length` reports.
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn ptr_eq(a: &JsString, b: &JsString) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }
}

impl Default for JsString {
    fn default() -> Self {
        JsString::from("")
    }
}

impl AsRef<str> for JsString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for JsString {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for JsString {
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for JsString {
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

impl From<&str> for JsString {
    fn from(s: &str) -> Self {
        JsString(s.into())
    }
}

impl From<String> for JsString {
    fn from(s: String) -> Self {
        JsString(s.into())
    }
}

impl fmt::Debug for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Add<&JsString> for JsString {
    type Output = JsString;

    fn add(self, other: &JsString) -> JsString {
        let mut s = String::with_capacity(self.len() + other.len());
        s.push_str(&self.0);
        s.push_str(&other.0);
        JsString::from(s)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Numeric conversions
// ═══════════════════════════════════════════════════════════════════════════

const TWO_POW_32: f64 = 4_294_967_296.0;

/// Number to string.
///
/// Integral values print without a fraction, magnitudes at or above 1e21
/// or below 1e-6 use exponent notation with an explicit exponent sign.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let magnitude = n.abs();
    if !(1e-6..1e21).contains(&magnitude) {
        let formatted = format!("{:e}", n);
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => formatted,
        };
    }
    format!("{}", n)
}

fn is_js_whitespace(c: char) -> bool {
    c.is_whitespace() || c == '\u{feff}'
}

/// String to number.
///
/// Surrounding whitespace is ignored and the empty string is zero. Accepts
/// decimal literals with optional sign and exponent, `0x` hex literals and
/// `Infinity`; anything else is NaN.
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim_matches(is_js_whitespace);
    if trimmed.is_empty() {
        return 0.0;
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        if hex.is_empty() {
            return f64::NAN;
        }
        let mut value = 0.0;
        for c in hex.chars() {
            match c.to_digit(16) {
                Some(d) => value = value * 16.0 + f64::from(d),
                None => return f64::NAN,
            }
        }
        return value;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    let valid = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !valid || !trimmed.chars().any(|c| c.is_ascii_digit()) {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// ToInteger: NaN becomes 0, everything else truncates toward zero.
pub fn to_integer(n: f64) -> f64 {
    if n.is_nan() { 0.0 } else { libm::trunc(n) }
}

/// ToUint32
pub fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    let mut m = libm::fmod(libm::trunc(n), TWO_POW_32);
    if m < 0.0 {
        m += TWO_POW_32;
    }
    m as u32
}

/// ToInt32
pub fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

/// Parse a canonical array index ("0", "17", never "01" or "-1").
pub fn array_index(name: &str) -> Option<u32> {
    let bytes = name.as_bytes();
    match bytes.first() {
        None => return None,
        Some(b'0') if bytes.len() > 1 => return None,
        _ => {}
    }
    if !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    // 2^32 - 1 is not a valid index
    name.parse::<u32>().ok().filter(|i| *i != u32::MAX)
}
