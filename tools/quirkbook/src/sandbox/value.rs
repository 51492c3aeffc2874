//! Values with JavaScript-like reference semantics.
//!
//! Arrays and objects are shared through `Rc<RefCell<..>>`, so cloning a
//! `Value` copies the reference, never the contents. Functions carry an
//! optional bound receiver so `bind` can be re-enacted explicitly.

use super::realm::DelegationTable;
use super::{Sandbox, Thrown};
use crate::types::ThrownError;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Depth past which nested containers are abbreviated, as a Node console does.
const INSPECT_DEPTH: usize = 2;

pub type NativeFn = dyn Fn(&mut Sandbox, &Value, &[Value]) -> Result<Value, Thrown>;
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;
pub type ObjectRef = Rc<RefCell<Object>>;

#[derive(Clone)]
pub struct Function {
    name: Rc<str>,
    body: Rc<NativeFn>,
    bound_this: Option<Rc<Value>>,
}

impl Function {
    pub fn new(
        name: &str,
        body: impl Fn(&mut Sandbox, &Value, &[Value]) -> Result<Value, Thrown> + 'static,
    ) -> Self {
        Self {
            name: Rc::from(name),
            body: Rc::new(body),
            bound_this: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `f.bind(receiver)`: the returned function ignores the receiver it is
    /// later called with.
    pub fn bind(&self, receiver: Value) -> Self {
        Self {
            name: Rc::from(format!("bound {}", self.name)),
            body: Rc::clone(&self.body),
            bound_this: Some(Rc::new(receiver)),
        }
    }

    pub(crate) fn invoke(
        &self,
        sb: &mut Sandbox,
        this: &Value,
        args: &[Value],
    ) -> Result<Value, Thrown> {
        let body = Rc::clone(&self.body);
        match &self.bound_this {
            Some(bound) => {
                let bound = Value::clone(bound);
                body(sb, &bound, args)
            }
            None => body(sb, this, args),
        }
    }

    fn same_function(&self, other: &Function) -> bool {
        Rc::ptr_eq(&self.body, &other.body)
            && match (&self.bound_this, &other.bound_this) {
                (None, None) => true,
                (Some(a), Some(b)) => Rc::ptr_eq(a, b),
                _ => false,
            }
    }
}

#[derive(Default)]
pub struct Object {
    props: Vec<(String, Value)>,
    proto: Option<Rc<DelegationTable>>,
}

impl Object {
    pub fn with_proto(proto: Rc<DelegationTable>) -> Self {
        Self {
            props: Vec::new(),
            proto: Some(proto),
        }
    }

    pub fn get_own(&self, key: &str) -> Option<Value> {
        self.props
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    pub fn has_own(&self, key: &str) -> bool {
        self.props.iter().any(|(k, _)| k == key)
    }

    pub fn set_own(&mut self, key: &str, value: Value) {
        match self.props.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.props.push((key.to_string(), value)),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.props.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn entries(&self) -> Vec<(String, Value)> {
        self.props.clone()
    }

    pub fn proto(&self) -> Option<&Rc<DelegationTable>> {
        self.proto.as_ref()
    }
}

#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Num(f64),
    Str(Rc<str>),
    Array(ArrayRef),
    Object(ObjectRef),
    Function(Function),
    Error(ThrownError),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(Rc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(Rc::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Num(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Num(f64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Function> for Value {
    fn from(value: Function) -> Self {
        Value::Function(value)
    }
}

impl From<ThrownError> for Value {
    fn from(value: ThrownError) -> Self {
        Value::Error(value)
    }
}

impl Value {
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        let mut object = Object::default();
        for (key, value) in entries {
            object.set_own(&key.into(), value);
        }
        Value::Object(Rc::new(RefCell::new(object)))
    }

    pub fn empty_object() -> Self {
        Value::Object(Rc::new(RefCell::new(Object::default())))
    }

    pub fn instance(proto: Rc<DelegationTable>) -> Self {
        Value::Object(Rc::new(RefCell::new(Object::with_proto(proto))))
    }

    pub fn function(
        name: &str,
        body: impl Fn(&mut Sandbox, &Value, &[Value]) -> Result<Value, Thrown> + 'static,
    ) -> Self {
        Value::Function(Function::new(name, body))
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Num(_) => "number",
            Value::Str(_) => "string",
            Value::Function(_) => "function",
            Value::Array(_) | Value::Object(_) | Value::Error(_) => "object",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Num(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Error(_) => true,
        }
    }

    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Num(a), Value::Num(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => a.same_function(b),
            _ => false,
        }
    }

    /// SameValueZero, used by `includes`: like `===` except `NaN` equals itself.
    pub fn same_value_zero(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Num(a), Value::Num(b)) if a.is_nan() && b.is_nan() => true,
            _ => self.strict_eq(other),
        }
    }

    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
            (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
            (Value::Num(_), Value::Str(_)) | (Value::Str(_), Value::Num(_)) => {
                self.to_number() == other.to_number()
            }
            (Value::Bool(_), _) => Value::Num(self.to_number()).loose_eq(other),
            (_, Value::Bool(_)) => self.loose_eq(&Value::Num(other.to_number())),
            (Value::Array(_) | Value::Object(_), Value::Num(_) | Value::Str(_)) => {
                Value::from(self.to_js_string()).loose_eq(other)
            }
            (Value::Num(_) | Value::Str(_), Value::Array(_) | Value::Object(_)) => {
                self.loose_eq(&Value::from(other.to_js_string()))
            }
            _ => self.strict_eq(other),
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Num(n) => *n,
            Value::Str(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse::<f64>().unwrap_or(f64::NAN)
                }
            }
            Value::Array(_) | Value::Object(_) => Value::from(self.to_js_string()).to_number(),
            Value::Function(_) | Value::Error(_) => f64::NAN,
        }
    }

    pub fn to_js_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Num(n) => format_number(*n),
            Value::Str(s) => s.to_string(),
            Value::Array(items) => items
                .borrow()
                .iter()
                .map(|item| match item {
                    Value::Undefined | Value::Null => String::new(),
                    other => other.to_js_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
            Value::Function(f) => format!("function {}() {{ [native code] }}", f.name()),
            Value::Error(e) => e.to_string(),
        }
    }

    /// Console rendering of a top-level argument: strings print raw.
    pub fn to_display(&self) -> String {
        match self {
            Value::Str(s) => s.to_string(),
            other => inspect(other, 0),
        }
    }

    /// Console rendering of a nested value: strings are quoted.
    pub fn inspect(&self) -> String {
        inspect(self, 0)
    }

    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            Value::Undefined | Value::Function(_) => None,
            Value::Null => Some(serde_json::Value::Null),
            Value::Bool(b) => Some(serde_json::Value::Bool(*b)),
            Value::Num(n) => Some(json_number(*n)),
            Value::Str(s) => Some(serde_json::Value::String(s.to_string())),
            Value::Array(items) => Some(serde_json::Value::Array(
                items
                    .borrow()
                    .iter()
                    .map(|item| item.to_json().unwrap_or(serde_json::Value::Null))
                    .collect(),
            )),
            Value::Object(object) => {
                let mut map = serde_json::Map::new();
                for (key, value) in object.borrow().entries() {
                    if let Some(json) = value.to_json() {
                        map.insert(key, json);
                    }
                }
                Some(serde_json::Value::Object(map))
            }
            Value::Error(_) => Some(serde_json::Value::Object(serde_json::Map::new())),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inspect())
    }
}

pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    // -0 prints as 0
    if n == 0.0 {
        return "0".to_string();
    }
    if n < 0.0 {
        return format!("-{}", format_number(-n));
    }
    // `{:e}` yields the shortest digits that round-trip, e.g. `1.5e-7`.
    let scientific = format!("{n:e}");
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let digits = mantissa.replace('.', "");
    let k = digits.len() as i32;
    let point = exponent.parse::<i32>().unwrap_or(0) + 1;
    if k <= point && point <= 21 {
        return format!("{digits}{}", "0".repeat((point - k) as usize));
    }
    if 0 < point && point <= 21 {
        let (whole, fraction) = digits.split_at(point as usize);
        return format!("{whole}.{fraction}");
    }
    if -6 < point && point <= 0 {
        return format!("0.{}{digits}", "0".repeat(-point as usize));
    }
    let exponent = point - 1;
    let sign = if exponent < 0 { '-' } else { '+' };
    let (lead, rest) = digits.split_at(1);
    if rest.is_empty() {
        format!("{lead}e{sign}{}", exponent.abs())
    } else {
        format!("{lead}.{rest}e{sign}{}", exponent.abs())
    }
}

fn json_number(n: f64) -> serde_json::Value {
    if !n.is_finite() {
        return serde_json::Value::Null;
    }
    if n == n.trunc() && n.abs() < 9.0e15 {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

fn inspect(value: &Value, depth: usize) -> String {
    match value {
        Value::Str(s) => quote(s),
        Value::Array(items) => {
            let items = items.borrow();
            if items.is_empty() {
                return "[]".to_string();
            }
            if depth > INSPECT_DEPTH {
                return "[Array]".to_string();
            }
            let rendered = items
                .iter()
                .map(|item| inspect(item, depth + 1))
                .collect::<Vec<_>>();
            format!("[ {} ]", rendered.join(", "))
        }
        Value::Object(object) => {
            let object = object.borrow();
            let prefix = match object.proto() {
                Some(table) if !table.name().is_empty() => format!("{} ", table.name()),
                _ => String::new(),
            };
            let entries = object.entries();
            if entries.is_empty() {
                return format!("{prefix}{{}}");
            }
            if depth > INSPECT_DEPTH {
                return "[Object]".to_string();
            }
            let rendered = entries
                .iter()
                .map(|(key, value)| format!("{}: {}", property_key(key), inspect(value, depth + 1)))
                .collect::<Vec<_>>();
            format!("{prefix}{{ {} }}", rendered.join(", "))
        }
        Value::Function(f) if f.name().is_empty() => "[Function (anonymous)]".to_string(),
        Value::Function(f) => format!("[Function: {}]", f.name()),
        other => other.to_js_string(),
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn property_key(key: &str) -> String {
    let mut chars = key.chars();
    let identifier = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if identifier {
        key.to_string()
    } else {
        quote(key)
    }
}

#[cfg(test)]
mod tests {
    use super::{format_number, Value};

    #[test]
    fn console_rendering_matches_node_conventions() {
        let nested = Value::object([
            ("a", Value::from("a")),
            ("b", Value::from("b")),
            ("obj", Value::object([("key", Value::from("key"))])),
        ]);
        assert_eq!(nested.to_display(), "{ a: 'a', b: 'b', obj: { key: 'key' } }");
        assert_eq!(
            Value::array(vec![Value::from(1), Value::from("x")]).to_display(),
            "[ 1, 'x' ]"
        );
        assert_eq!(Value::array(vec![]).to_display(), "[]");
        assert_eq!(Value::empty_object().to_display(), "{}");
        assert_eq!(Value::from("raw").to_display(), "raw");
        assert_eq!(Value::object([("1", Value::from("One"))]).to_display(), "{ '1': 'One' }");
        assert_eq!(Value::function("getPi", |_, _, _| Ok(Value::Undefined)).to_display(), "[Function: getPi]");
        assert_eq!(Value::function("", |_, _, _| Ok(Value::Undefined)).to_display(), "[Function (anonymous)]");
    }

    #[test]
    fn deep_nesting_is_abbreviated() {
        let deep = Value::object([(
            "a",
            Value::object([("b", Value::object([("c", Value::object([("d", Value::from(1))]))]))]),
        )]);
        assert_eq!(deep.to_display(), "{ a: { b: { c: [Object] } } }");
    }

    #[test]
    fn numbers_print_without_trailing_fraction() {
        assert_eq!(format_number(40.0), "40");
        assert_eq!(format_number(2.75), "2.75");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(-12.5), "-12.5");
    }

    #[test]
    fn numbers_switch_to_exponent_form_outside_the_decimal_range() {
        assert_eq!(format_number(1e20), "100000000000000000000");
        assert_eq!(format_number(2f64.powi(63)), "9223372036854776000");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(1.5e21), "1.5e+21");
        assert_eq!(format_number(0.000001), "0.000001");
        assert_eq!(format_number(1e-7), "1e-7");
        assert_eq!(format_number(-2.5e-8), "-2.5e-8");
        assert_eq!(format_number(123.456), "123.456");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
    }

    #[test]
    fn falsy_values_are_exactly_the_six() {
        let falsy = [
            Value::Undefined,
            Value::Null,
            Value::Bool(false),
            Value::from(0),
            Value::Num(f64::NAN),
            Value::from(""),
        ];
        assert!(falsy.iter().all(|v| !v.is_truthy()));
        assert!(Value::empty_object().is_truthy());
        assert!(Value::array(vec![]).is_truthy());
        assert!(Value::from("Everything else").is_truthy());
    }

    #[test]
    fn loose_equality_coerces_and_strict_equality_does_not() {
        assert!(Value::from(0).loose_eq(&Value::from("")));
        assert!(!Value::from(0).strict_eq(&Value::from("")));
        assert!(Value::Null.loose_eq(&Value::Undefined));
        assert!(!Value::Null.strict_eq(&Value::Undefined));
        assert!(Value::from("1").loose_eq(&Value::from(1)));
        assert!(Value::Bool(true).loose_eq(&Value::from(1)));
        assert!(Value::array(vec![]).loose_eq(&Value::from("")));
        assert!(!Value::Null.loose_eq(&Value::from(0)));
        assert!(!Value::Num(f64::NAN).loose_eq(&Value::Num(f64::NAN)));
        assert!(Value::Num(f64::NAN).same_value_zero(&Value::Num(f64::NAN)));
    }

    #[test]
    fn objects_compare_by_reference() {
        let a = Value::empty_object();
        let alias = a.clone();
        assert!(a.strict_eq(&alias));
        assert!(!a.strict_eq(&Value::empty_object()));
    }

    #[test]
    fn typeof_null_is_object() {
        assert_eq!(Value::Null.type_of(), "object");
        assert_eq!(Value::from(42).type_of(), "number");
        assert_eq!(Value::Undefined.type_of(), "undefined");
    }

    #[test]
    fn json_keeps_insertion_order_and_integer_formatting() {
        let user = Value::object([("name", Value::from("Jayant")), ("age", Value::from(25))]);
        let json = serde_json::to_string(&user.to_json().expect("json")).expect("string");
        assert_eq!(json, r#"{"name":"Jayant","age":25}"#);
    }
}
