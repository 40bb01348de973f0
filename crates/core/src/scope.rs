//! Lexical scope chain (C6): a linked list of tables, refcounted.
//!
//! The original tracks ancestor refcounts by hand so that a retained
//! descendant keeps its ancestors alive. `Rc` gives us exactly that for
//! free: `push` shares the parent handle, `pop` just drops the child's
//! handle, and the table is freed the instant its last `Rc` goes away.

use crate::string::XString;
use crate::table::Table;
use crate::value::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub struct ScopeNode {
    pub parent: Option<ScopeHandle>,
    pub table: RefCell<Table>,
}

pub type ScopeHandle = Rc<ScopeNode>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeError {
    AlreadyDeclared,
    TypeMismatch,
    NullConstant,
    ConstReassignment,
    UndefinedBinding,
    NonNameKey,
}

impl fmt::Display for ScopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeError::AlreadyDeclared => write!(f, "variable already declared in this scope"),
            ScopeError::TypeMismatch => write!(f, "value does not match the declared type"),
            ScopeError::NullConstant => write!(f, "a const binding cannot be initialized with null"),
            ScopeError::ConstReassignment => write!(f, "cannot assign to a const binding"),
            ScopeError::UndefinedBinding => write!(f, "undefined variable"),
            ScopeError::NonNameKey => write!(f, "scope keys must be name strings"),
        }
    }
}

impl std::error::Error for ScopeError {}

/// Push a child scope onto `parent` (`None` for the root).
pub fn push(parent: Option<ScopeHandle>) -> ScopeHandle {
    Rc::new(ScopeNode {
        parent,
        table: RefCell::new(Table::new()),
    })
}

/// Pop back to the parent scope. Returns `None` at the root.
pub fn pop(scope: &ScopeHandle) -> Option<ScopeHandle> {
    scope.parent.clone()
}

/// Declare `name` in `scope`'s own frame only (never an ancestor).
pub fn declare(scope: &ScopeHandle, name: &Rc<XString>, value: Value) -> Result<(), ScopeError> {
    if !name.is_name() {
        return Err(ScopeError::NonNameKey);
    }
    let key = Value::String(Rc::clone(name));
    if scope.table.borrow().contains(&key) {
        return Err(ScopeError::AlreadyDeclared);
    }
    let declared = name.declared_type().unwrap();
    if matches!(value, Value::Null) && name.is_constant() {
        return Err(ScopeError::NullConstant);
    }
    if !type_compatible(declared, &value) {
        return Err(ScopeError::TypeMismatch);
    }
    scope
        .table
        .borrow_mut()
        .insert(key, value)
        .expect("name-string keys are always legal table keys");
    Ok(())
}

fn type_compatible(declared: crate::value_type::ValueType, value: &Value) -> bool {
    use crate::value_type::ValueType;
    declared == ValueType::Any || declared == ValueType::Reference || declared == value.type_of()
}

fn find_entry(scope: &ScopeHandle, name: &Rc<XString>) -> Option<ScopeHandle> {
    let key = Value::String(Rc::clone(name));
    if scope.table.borrow().contains(&key) {
        return Some(Rc::clone(scope));
    }
    match &scope.parent {
        Some(parent) => find_entry(parent, name),
        None => None,
    }
}

/// Walk the chain to find and assign `name`'s binding.
///
/// `name` only needs to carry the right characters — a lookup key built
/// fresh at the use site, with no knowledge of how the binding was
/// originally declared. The declared type and constant flag are read back
/// off the table's own stored key, not off `name`.
pub fn assign(scope: &ScopeHandle, name: &Rc<XString>, value: Value) -> Result<(), String> {
    let Some(owner) = find_entry(scope, name) else {
        return Err(ScopeError::UndefinedBinding.to_string());
    };
    let lookup_key = Value::String(Rc::clone(name));
    let stored_key = owner
        .table
        .borrow()
        .stored_key(&lookup_key)
        .cloned()
        .expect("find_entry already confirmed this key is present");
    let Value::String(stored_name) = &stored_key else {
        unreachable!("scope tables only ever key on Value::String");
    };
    if stored_name.is_constant() {
        return Err(ScopeError::ConstReassignment.to_string());
    }
    let declared = stored_name.declared_type().unwrap();
    if !type_compatible(declared, &value) {
        return Err(ScopeError::TypeMismatch.to_string());
    }
    owner
        .table
        .borrow_mut()
        .insert(stored_key, value)
        .map_err(|e| e.to_string())
}

/// Walk the chain looking up `name`'s current value.
pub fn lookup(scope: &ScopeHandle, name: &Rc<XString>) -> Option<Value> {
    let key = Value::String(Rc::clone(name));
    if scope.table.borrow().contains(&key) {
        return Some(scope.table.borrow().lookup(&key));
    }
    match &scope.parent {
        Some(parent) => lookup(parent, name),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_type::ValueType;

    fn name(s: &str) -> Rc<XString> {
        XString::name(s, ValueType::Integer, false)
    }

    #[test]
    fn shadowing_and_pop_restores_parent_binding() {
        let parent = push(None);
        declare(&parent, &name("x"), Value::Integer(0)).unwrap();

        let child = push(Some(Rc::clone(&parent)));
        declare(&child, &name("x"), Value::Integer(1)).unwrap();

        assert_eq!(lookup(&child, &name("x")), Some(Value::Integer(1)));

        let back = pop(&child).unwrap();
        assert_eq!(lookup(&back, &name("x")), Some(Value::Integer(0)));
    }

    #[test]
    fn redeclaring_in_same_frame_errors() {
        let s = push(None);
        declare(&s, &name("x"), Value::Integer(0)).unwrap();
        assert_eq!(declare(&s, &name("x"), Value::Integer(1)), Err(ScopeError::AlreadyDeclared));
    }

    #[test]
    fn const_rejects_null_initializer() {
        let s = push(None);
        let n = XString::name("x", ValueType::Integer, true);
        assert_eq!(declare(&s, &n, Value::Null), Err(ScopeError::NullConstant));
    }

    #[test]
    fn assign_walks_chain_to_owner() {
        let parent = push(None);
        declare(&parent, &name("x"), Value::Integer(0)).unwrap();
        let child = push(Some(Rc::clone(&parent)));
        assign(&child, &name("x"), Value::Integer(42)).unwrap();
        assert_eq!(lookup(&parent, &name("x")), Some(Value::Integer(42)));
    }

    #[test]
    fn assign_to_const_errors() {
        let s = push(None);
        let n = XString::name("x", ValueType::Integer, true);
        declare(&s, &n, Value::Integer(1)).unwrap();
        assert!(assign(&s, &n, Value::Integer(2)).is_err());
    }

    #[test]
    fn dropping_last_child_handle_frees_its_table() {
        let parent = push(None);
        let child = push(Some(Rc::clone(&parent)));
        declare(&child, &name("y"), Value::Integer(7)).unwrap();
        drop(child);
        // Nothing retains the child anymore; this just demonstrates the
        // handle-based lifetime doesn't require manual refcounting.
        assert_eq!(Rc::strong_count(&parent), 1);
    }
}
