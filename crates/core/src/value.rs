//! Tagged-union runtime value (C2).

use crate::string::XString;
use crate::table::Table;
use crate::value_type::ValueType;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A non-owning locator into a slot that lives elsewhere: an array element,
/// a table entry, or a scope cell. Constructed so the slot survives
/// container growth — unlike a raw pointer into a Robin-Hood table, which
/// dangles the moment a resize reallocates storage (see Design Notes §9).
#[derive(Debug, Clone)]
pub enum Slot {
    Array(Rc<RefCell<Vec<Value>>>, usize),
    Table(Rc<RefCell<Table>>, Box<Value>),
    Scope(crate::scope::ScopeHandle, Rc<XString>),
}

impl Slot {
    pub fn get(&self) -> Value {
        match self {
            Slot::Array(arr, idx) => arr.borrow().get(*idx).cloned().unwrap_or(Value::Null),
            Slot::Table(table, key) => table.borrow().lookup(key),
            Slot::Scope(scope, name) => crate::scope::lookup(scope, name).unwrap_or(Value::Null),
        }
    }

    pub fn set(&self, value: Value) -> Result<(), String> {
        match self {
            Slot::Array(arr, idx) => {
                let mut arr = arr.borrow_mut();
                if *idx >= arr.len() {
                    return Err(format!("array index {idx} out of bounds"));
                }
                arr[*idx] = value;
                Ok(())
            }
            Slot::Table(table, key) => {
                table.borrow_mut().insert((**key).clone(), value).map_err(|e| e.to_string())
            }
            Slot::Scope(scope, name) => crate::scope::assign(scope, name, value),
        }
    }
}

/// Minimal, non-callable sketch of a user-defined function value — the
/// language exposes the `function` kind but has no `CALL` opcode (Non-goal).
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionProto {
    pub name: Rc<str>,
    pub arity: usize,
}

/// Host-defined opaque payload (FFI escape hatch). Not interpreted by the
/// core; only carried around and compared by identity.
#[derive(Debug)]
pub struct OpaqueValue {
    pub type_name: Rc<str>,
}

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i32),
    Float(f32),
    String(Rc<XString>),
    Array(Rc<RefCell<Vec<Value>>>),
    Table(Rc<RefCell<Table>>),
    Function(Rc<FunctionProto>),
    Opaque(Rc<OpaqueValue>),
    Reference(Rc<Slot>),
    Type(ValueType),
    Any,
    Unknown,
}

// Structural equality for tests and container identity checks; mirrors
// `values_equal` below rather than re-deriving (Rc payloads have no
// meaningful derived `PartialEq`).
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        values_equal(self, other)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueError {
    NullTruthiness,
    NotComparable,
    NotNumeric,
    DivideByZero,
    ModuloByFloat,
    Unhashable,
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueError::NullTruthiness => write!(f, "null has no truthiness"),
            ValueError::NotComparable => write!(f, "values are not comparable"),
            ValueError::NotNumeric => write!(f, "operand must be numeric"),
            ValueError::DivideByZero => write!(f, "Can't divide or modulo by zero"),
            ValueError::ModuloByFloat => write!(f, "Can't modulo a float"),
            ValueError::Unhashable => write!(f, "value is not hashable"),
        }
    }
}

impl std::error::Error for ValueError {}

impl Value {
    pub fn type_of(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Integer(_) => ValueType::Integer,
            Value::Float(_) => ValueType::Float,
            Value::String(_) => ValueType::String,
            Value::Array(_) => ValueType::Array,
            Value::Table(_) => ValueType::Table,
            Value::Function(_) => ValueType::Function,
            Value::Opaque(_) => ValueType::Opaque,
            Value::Reference(_) => ValueType::Reference,
            Value::Type(_) => ValueType::Type,
            Value::Any => ValueType::Any,
            Value::Unknown => ValueType::Unknown,
        }
    }

    /// If `self` is a reference, dereference exactly one level.
    pub fn unwrap(self) -> Value {
        match self {
            Value::Reference(slot) => slot.get(),
            other => other,
        }
    }

    pub fn is_truthy(&self) -> Result<bool, ValueError> {
        match self {
            Value::Null => Err(ValueError::NullTruthiness),
            Value::Boolean(b) => Ok(*b),
            _ => Ok(true),
        }
    }
}

pub fn is_numeric(v: &Value) -> bool {
    matches!(v, Value::Integer(_) | Value::Float(_))
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Integer(i) => Some(*i as f64),
        Value::Float(f) => Some(*f as f64),
        _ => None,
    }
}

pub fn values_equal(left: &Value, right: &Value) -> bool {
    use Value::*;
    match (left, right) {
        (Null, Null) => true,
        (Boolean(a), Boolean(b)) => a == b,
        (Integer(_) | Float(_), Integer(_) | Float(_)) => as_f64(left) == as_f64(right),
        (String(a), String(b)) => XString::compare(a, b) == std::cmp::Ordering::Equal,
        (Array(a), Array(b)) => Rc::ptr_eq(a, b),
        (Table(a), Table(b)) => Rc::ptr_eq(a, b),
        (Function(a), Function(b)) => Rc::ptr_eq(a, b),
        (Opaque(a), Opaque(b)) => Rc::ptr_eq(a, b),
        (Type(a), Type(b)) => a == b,
        (Any, Any) | (Unknown, Unknown) => true,
        _ => false,
    }
}

pub fn values_comparable(left: &Value, right: &Value) -> bool {
    (is_numeric(left) && is_numeric(right)) || matches!((left, right), (Value::String(_), Value::String(_)))
}

pub fn compare_values(left: &Value, right: &Value) -> Result<std::cmp::Ordering, ValueError> {
    if is_numeric(left) && is_numeric(right) {
        let a = as_f64(left).unwrap();
        let b = as_f64(right).unwrap();
        return a.partial_cmp(&b).ok_or(ValueError::NotComparable);
    }
    if let (Value::String(a), Value::String(b)) = (left, right) {
        return Ok(XString::compare(a, b));
    }
    Err(ValueError::NotComparable)
}

fn mix32(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x85eb_ca6b);
    x ^= x >> 13;
    x = x.wrapping_mul(0xc2b2_ae35);
    x ^= x >> 16;
    x
}

pub fn hash_value(v: &Value) -> u32 {
    match v {
        Value::Null => 0,
        Value::Boolean(b) => *b as u32,
        Value::Integer(i) => mix32(*i as u32),
        Value::Float(f) => mix32(f.to_bits()),
        Value::String(s) => XString::hash_string(s),
        _ => 0,
    }
}

pub fn is_hashable(v: &Value) -> bool {
    matches!(v, Value::Null | Value::Boolean(_) | Value::Integer(_) | Value::Float(_) | Value::String(_))
}

pub fn stringify(v: &Value) -> String {
    match v {
        Value::Null => "null".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::String(s) => s.flatten(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.borrow().iter().map(stringify).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Table(table) => {
            let items: Vec<String> = table
                .borrow()
                .iter()
                .map(|(k, v)| format!("{}: {}", stringify(k), stringify(v)))
                .collect();
            format!("{{{}}}", items.join(", "))
        }
        Value::Function(f) => format!("<function {}>", f.name),
        Value::Opaque(o) => format!("<opaque {}>", o.type_name),
        Value::Reference(slot) => stringify(&slot.get()),
        Value::Type(t) => t.to_string(),
        Value::Any => "any".to_string(),
        Value::Unknown => "unknown".to_string(),
    }
}
