//! The fetch-decode-execute loop (C10).
//!
//! Every instruction is a 4-byte word; some are followed by a second
//! 4-byte word carrying an immediate, a jump index, or a relative code
//! offset. Two error tiers apply here: a [`VmFatalError`] means the
//! module itself is broken (never raised by bytecode this workspace's
//! own compiler produced) and aborts `run`; everything else — type
//! mismatches, divide by zero, undefined variables, failed asserts — is
//! a recoverable script-level error routed through [`HostCallbacks`] and
//! the VM keeps going, per the original's three-tier error model.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use xvr_compiler::{BinaryOp, Module};
use xvr_core::{
    scope, value, Arity, HostCallbacks, JumpCond, JumpKind, OpCode, ScopeHandle, Squeeze, Stack, Table, Value,
    ValueError, ValueType, XString,
};

use crate::error::VmFatalError;

pub struct Vm {
    code: Vec<u8>,
    jumps: Vec<u32>,
    data: Vec<u8>,
    pc: usize,
    stack: Stack,
    scope: ScopeHandle,
    host: Box<dyn HostCallbacks>,
}

impl Vm {
    pub fn new(module: &Module, host: Box<dyn HostCallbacks>) -> Vm {
        Vm {
            code: module.code.clone(),
            jumps: module.jumps.clone(),
            data: module.data.clone(),
            pc: 0,
            stack: Stack::new(),
            scope: scope::push(None),
            host,
        }
    }

    /// Run a further module's code against this VM's existing stack and
    /// scope chain — the REPL's one-line-at-a-time compilation model.
    pub fn load(&mut self, module: &Module) {
        self.code = module.code.clone();
        self.jumps = module.jumps.clone();
        self.data = module.data.clone();
        self.pc = 0;
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// The innermost live scope frame, for `--verbose` dumps. Walk
    /// `.parent` to visit ancestors.
    pub fn scope(&self) -> &ScopeHandle {
        &self.scope
    }

    pub fn host_mut(&mut self) -> &mut dyn HostCallbacks {
        self.host.as_mut()
    }

    pub fn run(&mut self) -> Result<(), VmFatalError> {
        loop {
            if self.pc + 4 > self.code.len() {
                if self.pc == self.code.len() {
                    return Ok(());
                }
                return Err(VmFatalError::TruncatedInstruction);
            }
            let b0 = self.code[self.pc];
            let b1 = self.code[self.pc + 1];
            let b2 = self.code[self.pc + 2];
            let b3 = self.code[self.pc + 3];
            self.pc += 4;

            let op = OpCode::from_byte(b0).ok_or(VmFatalError::InvalidOpcode(b0))?;
            match op {
                OpCode::Read => self.op_read(b1, b2)?,
                OpCode::Declare => self.op_declare(b1, b2)?,
                OpCode::Assign => self.op_assign()?,
                OpCode::AssignCompound => self.op_assign_compound(b1)?,
                OpCode::Access => self.op_access()?,
                OpCode::Duplicate => self.op_duplicate()?,
                OpCode::IndexAssign => self.op_index_assign(b1, b2)?,
                OpCode::Add | OpCode::Subtract | OpCode::Multiply | OpCode::Divide | OpCode::Modulo | OpCode::Concat => {
                    self.op_binary(op)?
                }
                OpCode::CompareEqual
                | OpCode::CompareLess
                | OpCode::CompareLessEqual
                | OpCode::CompareGreater
                | OpCode::CompareGreaterEqual => self.op_compare(op, b3)?,
                OpCode::And => self.op_and_or(true)?,
                OpCode::Or => self.op_and_or(false)?,
                OpCode::Truthy => self.op_truthy()?,
                OpCode::Negate => self.op_negate()?,
                OpCode::Index => self.op_index(b1)?,
                OpCode::ScopePush => self.op_scope_push(),
                OpCode::ScopePop => self.op_scope_pop()?,
                OpCode::Jump => self.op_jump(b1, b2)?,
                OpCode::Escape => self.op_escape(b1)?,
                OpCode::Assert => self.op_assert(b1)?,
                OpCode::Print => self.op_print()?,
                OpCode::Eliminate => self.op_eliminate()?,
                OpCode::Pass => {}
                OpCode::Return => return Ok(()),
            }
        }
    }

    // -- fetch helpers -----------------------------------------------------

    fn fetch_u32(&mut self) -> Result<u32, VmFatalError> {
        if self.pc + 4 > self.code.len() {
            return Err(VmFatalError::TruncatedInstruction);
        }
        let bytes = [self.code[self.pc], self.code[self.pc + 1], self.code[self.pc + 2], self.code[self.pc + 3]];
        self.pc += 4;
        Ok(u32::from_le_bytes(bytes))
    }

    fn fetch_i32(&mut self) -> Result<i32, VmFatalError> {
        self.fetch_u32().map(|v| v as i32)
    }

    fn read_string(&self, jump_index: u32) -> Result<String, VmFatalError> {
        let offset = *self
            .jumps
            .get(jump_index as usize)
            .ok_or(VmFatalError::BadStringReference(jump_index))? as usize;
        let bytes = self.data.get(offset..).ok_or(VmFatalError::BadStringReference(jump_index))?;
        let end = bytes
            .iter()
            .position(|&b| b == 0)
            .ok_or(VmFatalError::BadStringReference(jump_index))?;
        std::str::from_utf8(&bytes[..end])
            .map(|s| s.to_string())
            .map_err(|_| VmFatalError::BadStringReference(jump_index))
    }

    fn pop(&mut self) -> Result<Value, VmFatalError> {
        self.stack.pop().ok_or(VmFatalError::StackUnderflow)
    }

    fn report(&mut self, message: impl std::fmt::Display) {
        self.host.error(&message.to_string());
    }

    fn truthy_or_report(&mut self, v: &Value) -> bool {
        match v.is_truthy() {
            Ok(b) => b,
            Err(e) => {
                self.report(e);
                false
            }
        }
    }

    // -- literals / aggregates ---------------------------------------------

    fn op_read(&mut self, type_tag: u8, b2: u8) -> Result<(), VmFatalError> {
        let vt = ValueType::from_wire(type_tag).ok_or(VmFatalError::InvalidValueType(type_tag))?;
        let value = match vt {
            ValueType::Null => Value::Null,
            ValueType::Boolean => Value::Boolean(b2 != 0),
            ValueType::Integer => Value::Integer(self.fetch_i32()?),
            ValueType::Float => Value::Float(f32::from_bits(self.fetch_u32()?)),
            ValueType::String => {
                let idx = self.fetch_u32()?;
                let text = self.read_string(idx)?;
                Value::String(XString::leaf(&text))
            }
            ValueType::Array => {
                let count = self.fetch_u32()? as usize;
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(self.pop()?);
                }
                items.reverse();
                Value::Array(Rc::new(RefCell::new(items)))
            }
            ValueType::Table => {
                let pair_count = self.fetch_u32()? as usize;
                let mut pairs = Vec::with_capacity(pair_count);
                for _ in 0..pair_count {
                    let v = self.pop()?;
                    let k = self.pop()?;
                    pairs.push((k, v));
                }
                pairs.reverse();
                let mut table = Table::new();
                for (k, v) in pairs {
                    if let Err(e) = table.insert(k, v) {
                        self.report(e);
                    }
                }
                Value::Table(Rc::new(RefCell::new(table)))
            }
            other => return Err(VmFatalError::UnsupportedLiteralType(other)),
        };
        self.stack.push(value);
        Ok(())
    }

    // -- variables -----------------------------------------------------

    fn op_declare(&mut self, declared_type: u8, constant: u8) -> Result<(), VmFatalError> {
        let idx = self.fetch_u32()?;
        let value = self.pop()?;
        let vt = ValueType::from_wire(declared_type).ok_or(VmFatalError::InvalidValueType(declared_type))?;
        let text = self.read_string(idx)?;
        let name = XString::name(&text, vt, constant != 0);
        if let Err(e) = scope::declare(&self.scope, &name, value) {
            self.report(e);
        }
        Ok(())
    }

    fn op_assign(&mut self) -> Result<(), VmFatalError> {
        let idx = self.fetch_u32()?;
        let value = self.pop()?;
        let text = self.read_string(idx)?;
        // `ValueType::Unknown`/non-const are placeholders: `scope::assign`
        // validates against the declaration's own stored metadata, not
        // this lookup key's.
        let name = XString::name(&text, ValueType::Unknown, false);
        if let Err(e) = scope::assign(&self.scope, &name, value) {
            self.report(e);
        }
        Ok(())
    }

    fn op_assign_compound(&mut self, binary_tag: u8) -> Result<(), VmFatalError> {
        let idx = self.fetch_u32()?;
        let rhs = self.pop()?;
        let text = self.read_string(idx)?;
        let name = XString::name(&text, ValueType::Unknown, false);
        let Some(current) = scope::lookup(&self.scope, &name) else {
            self.report(xvr_core::ScopeError::UndefinedBinding);
            return Ok(());
        };
        let op = BinaryOp::from_byte(binary_tag).ok_or(VmFatalError::InvalidBinaryOp(binary_tag))?;
        match apply_binary(op, current, rhs) {
            Ok(combined) => {
                if let Err(e) = scope::assign(&self.scope, &name, combined) {
                    self.report(e);
                }
            }
            Err(e) => self.report(e),
        }
        Ok(())
    }

    fn op_access(&mut self) -> Result<(), VmFatalError> {
        let idx = self.fetch_u32()?;
        let text = self.read_string(idx)?;
        let name = XString::name(&text, ValueType::Unknown, false);
        match scope::lookup(&self.scope, &name) {
            Some(v) => self.stack.push(v),
            None => {
                self.report(xvr_core::ScopeError::UndefinedBinding);
                self.stack.push(Value::Null);
            }
        }
        Ok(())
    }

    // -- arithmetic / logic ----------------------------------------------

    fn op_binary(&mut self, op: OpCode) -> Result<(), VmFatalError> {
        let right = self.pop()?;
        let left = self.pop()?;
        let binary_op = match op {
            OpCode::Add => BinaryOp::Add,
            OpCode::Subtract => BinaryOp::Subtract,
            OpCode::Multiply => BinaryOp::Multiply,
            OpCode::Divide => BinaryOp::Divide,
            OpCode::Modulo => BinaryOp::Modulo,
            OpCode::Concat => BinaryOp::Concat,
            _ => unreachable!("dispatched only for arithmetic/concat opcodes"),
        };
        match apply_binary(binary_op, left, right) {
            Ok(v) => self.stack.push(v),
            Err(e) => {
                self.report(e);
                self.stack.push(Value::Null);
            }
        }
        Ok(())
    }

    fn op_and_or(&mut self, is_and: bool) -> Result<(), VmFatalError> {
        let right = self.pop()?;
        let left = self.pop()?;
        let lb = self.truthy_or_report(&left);
        let rb = self.truthy_or_report(&right);
        self.stack.push(Value::Boolean(if is_and { lb && rb } else { lb || rb }));
        Ok(())
    }

    fn op_truthy(&mut self) -> Result<(), VmFatalError> {
        let v = self.pop()?;
        let b = self.truthy_or_report(&v);
        self.stack.push(Value::Boolean(b));
        Ok(())
    }

    fn op_negate(&mut self) -> Result<(), VmFatalError> {
        let v = self.pop()?;
        match v {
            Value::Boolean(b) => self.stack.push(Value::Boolean(!b)),
            Value::Integer(i) => self.stack.push(Value::Integer(i.wrapping_neg())),
            Value::Float(f) => self.stack.push(Value::Float(-f)),
            _ => {
                self.report(ValueError::NotNumeric);
                self.stack.push(Value::Null);
            }
        }
        Ok(())
    }

    fn op_compare(&mut self, op: OpCode, squeeze_byte: u8) -> Result<(), VmFatalError> {
        let right = self.pop()?;
        let left = self.pop()?;
        let result = if op == OpCode::CompareEqual {
            Ok(value::values_equal(&left, &right))
        } else {
            value::compare_values(&left, &right).map(|ord| match op {
                OpCode::CompareLess => ord == Ordering::Less,
                OpCode::CompareLessEqual => ord != Ordering::Greater,
                OpCode::CompareGreater => ord == Ordering::Greater,
                OpCode::CompareGreaterEqual => ord != Ordering::Less,
                _ => unreachable!(),
            })
        };
        match result {
            Ok(mut b) => {
                if Squeeze::from_byte(squeeze_byte) == Squeeze::Negate {
                    b = !b;
                }
                self.stack.push(Value::Boolean(b));
            }
            Err(e) => {
                self.report(e);
                self.stack.push(Value::Boolean(false));
            }
        }
        Ok(())
    }

    // -- stack shuffling ---------------------------------------------------

    fn op_duplicate(&mut self) -> Result<(), VmFatalError> {
        let top = self.stack.peek().cloned().ok_or(VmFatalError::StackUnderflow)?;
        self.stack.push(top);
        Ok(())
    }

    fn op_eliminate(&mut self) -> Result<(), VmFatalError> {
        self.pop()?;
        Ok(())
    }

    // -- aggregates ---------------------------------------------------

    fn op_index_assign(&mut self, combine: u8, binary_tag: u8) -> Result<(), VmFatalError> {
        let value = self.pop()?;
        let index = self.pop()?;
        let target = self.pop()?;
        let to_store = if combine != 0 {
            let op = BinaryOp::from_byte(binary_tag).ok_or(VmFatalError::InvalidBinaryOp(binary_tag))?;
            let current = match perform_index(target.clone(), index.clone(), None) {
                Ok(v) => v,
                Err(e) => {
                    self.report(e);
                    return Ok(());
                }
            };
            match apply_binary(op, current, value) {
                Ok(v) => v,
                Err(e) => {
                    self.report(e);
                    return Ok(());
                }
            }
        } else {
            value
        };
        if let Err(e) = store_index(&target, index, to_store) {
            self.report(e);
        }
        Ok(())
    }

    fn op_index(&mut self, arity: Arity) -> Result<(), VmFatalError> {
        let length = if arity == 3 { Some(self.pop()?) } else { None };
        let index = self.pop()?;
        let target = self.pop()?;
        match perform_index(target, index, length) {
            Ok(v) => self.stack.push(v),
            Err(e) => {
                self.report(e);
                self.stack.push(Value::Null);
            }
        }
        Ok(())
    }

    // -- scope --------------------------------------------------------

    fn op_scope_push(&mut self) {
        self.scope = scope::push(Some(Rc::clone(&self.scope)));
    }

    fn op_scope_pop(&mut self) -> Result<(), VmFatalError> {
        self.scope = scope::pop(&self.scope).ok_or(VmFatalError::ScopeUnderflow)?;
        Ok(())
    }

    // -- control flow ---------------------------------------------------

    fn op_jump(&mut self, kind: u8, cond: u8) -> Result<(), VmFatalError> {
        let offset = self.fetch_i32()?;
        let operand_end = self.pc;
        let jump_cond = JumpCond::from_byte(cond).ok_or(VmFatalError::InvalidJumpCond(cond))?;
        let take = match jump_cond {
            JumpCond::Always => true,
            JumpCond::IfTrue => {
                let v = self.pop()?;
                self.truthy_or_report(&v)
            }
            JumpCond::IfFalse => {
                let v = self.pop()?;
                !self.truthy_or_report(&v)
            }
        };
        if take {
            let kind = JumpKind::from_byte(kind).ok_or(VmFatalError::InvalidJumpKind(kind))?;
            self.pc = match kind {
                JumpKind::Relative => (operand_end as i64 + offset as i64) as usize,
                JumpKind::Absolute => offset as usize,
            };
        }
        Ok(())
    }

    fn op_escape(&mut self, scope_depth_diff: u8) -> Result<(), VmFatalError> {
        let offset = self.fetch_i32()?;
        let operand_end = self.pc;
        for _ in 0..scope_depth_diff {
            self.scope = scope::pop(&self.scope).ok_or(VmFatalError::ScopeUnderflow)?;
        }
        self.pc = (operand_end as i64 + offset as i64) as usize;
        Ok(())
    }

    // -- host-visible effects ---------------------------------------------

    fn op_assert(&mut self, arity: Arity) -> Result<(), VmFatalError> {
        let message = if arity == 2 { Some(self.pop()?) } else { None };
        let condition = self.pop()?;
        let truthy = self.truthy_or_report(&condition);
        if !truthy {
            let text = message
                .map(|m| value::stringify(&m))
                .unwrap_or_else(|| "assertion failed".to_string());
            self.host.assert_failure(&text);
        }
        Ok(())
    }

    fn op_print(&mut self) -> Result<(), VmFatalError> {
        let v = self.pop()?;
        let text = value::stringify(&v);
        self.host.print(&text);
        Ok(())
    }
}

fn as_f32(v: &Value) -> f32 {
    match v {
        Value::Integer(i) => *i as f32,
        Value::Float(f) => *f,
        _ => unreachable!("caller already checked is_numeric"),
    }
}

fn as_i32(v: &Value) -> i32 {
    match v {
        Value::Integer(i) => *i,
        Value::Float(f) => *f as i32,
        _ => unreachable!("caller already checked is_numeric"),
    }
}

fn apply_binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, String> {
    if op == BinaryOp::Concat {
        return match (&left, &right) {
            (Value::String(a), Value::String(b)) => XString::concat(a, b).map(Value::String).map_err(|e| e.to_string()),
            _ => Err("concat requires two string operands".to_string()),
        };
    }
    if matches!(op, BinaryOp::And | BinaryOp::Or) {
        unreachable!("AND/OR never reach apply_binary; they truthy-coerce instead");
    }
    if !(value::is_numeric(&left) && value::is_numeric(&right)) {
        return Err(ValueError::NotNumeric.to_string());
    }
    let use_float = matches!(left, Value::Float(_)) || matches!(right, Value::Float(_));
    if use_float {
        let a = as_f32(&left);
        let b = as_f32(&right);
        let result = match op {
            BinaryOp::Add => a + b,
            BinaryOp::Subtract => a - b,
            BinaryOp::Multiply => a * b,
            BinaryOp::Divide => {
                if b == 0.0 {
                    return Err(ValueError::DivideByZero.to_string());
                }
                a / b
            }
            BinaryOp::Modulo => return Err(ValueError::ModuloByFloat.to_string()),
            _ => unreachable!(),
        };
        Ok(Value::Float(result))
    } else {
        let a = as_i32(&left);
        let b = as_i32(&right);
        let result = match op {
            BinaryOp::Add => a.wrapping_add(b),
            BinaryOp::Subtract => a.wrapping_sub(b),
            BinaryOp::Multiply => a.wrapping_mul(b),
            BinaryOp::Divide => {
                if b == 0 {
                    return Err(ValueError::DivideByZero.to_string());
                }
                a.wrapping_div(b)
            }
            BinaryOp::Modulo => {
                if b == 0 {
                    return Err(ValueError::DivideByZero.to_string());
                }
                a.wrapping_rem(b)
            }
            _ => unreachable!(),
        };
        Ok(Value::Integer(result))
    }
}

fn perform_index(target: Value, index: Value, length: Option<Value>) -> Result<Value, String> {
    match target {
        Value::Array(arr) => {
            let Value::Integer(i) = index else {
                return Err("array index must be an integer".to_string());
            };
            let arr = arr.borrow();
            if let Some(len_v) = length {
                let Value::Integer(len) = len_v else {
                    return Err("slice length must be an integer".to_string());
                };
                let start = (i.max(0) as usize).min(arr.len());
                let end = (start + len.max(0) as usize).min(arr.len());
                Ok(Value::Array(Rc::new(RefCell::new(arr[start..end].to_vec()))))
            } else {
                let idx = usize::try_from(i).map_err(|_| "array index out of bounds".to_string())?;
                arr.get(idx).cloned().ok_or_else(|| "array index out of bounds".to_string())
            }
        }
        Value::String(s) => {
            let Value::Integer(i) = index else {
                return Err("string index must be an integer".to_string());
            };
            let chars: Vec<char> = s.flatten().chars().collect();
            if let Some(len_v) = length {
                let Value::Integer(len) = len_v else {
                    return Err("slice length must be an integer".to_string());
                };
                let start = (i.max(0) as usize).min(chars.len());
                let end = (start + len.max(0) as usize).min(chars.len());
                let sub: String = chars[start..end].iter().collect();
                Ok(Value::String(XString::leaf(&sub)))
            } else {
                let idx = usize::try_from(i).map_err(|_| "string index out of bounds".to_string())?;
                let ch = chars.get(idx).ok_or_else(|| "string index out of bounds".to_string())?;
                Ok(Value::String(XString::leaf(&ch.to_string())))
            }
        }
        Value::Table(table) => Ok(table.borrow().lookup(&index)),
        _ => Err("value is not indexable".to_string()),
    }
}

/// Mutate `target` in place at `index`, used by `INDEX_ASSIGN`. Unlike
/// [`perform_index`], `target` is borrowed — the `Rc<RefCell<_>>` aliasing
/// inside `Value::Array`/`Value::Table` is what makes the mutation visible
/// to every other `Value` copy pointing at the same backing storage.
fn store_index(target: &Value, index: Value, value: Value) -> Result<(), String> {
    match target {
        Value::Array(arr) => {
            let Value::Integer(i) = index else {
                return Err("array index must be an integer".to_string());
            };
            let idx = usize::try_from(i).map_err(|_| "array index out of bounds".to_string())?;
            let mut arr = arr.borrow_mut();
            if idx >= arr.len() {
                return Err("array index out of bounds".to_string());
            }
            arr[idx] = value;
            Ok(())
        }
        Value::Table(table) => table.borrow_mut().insert(index, value).map_err(|e| e.to_string()),
        _ => Err("value is not indexable for assignment".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xvr_compiler::ast::{AssignOp, CompoundKind, Literal, Node};
    use xvr_compiler::builder::ModuleBuilder;
    use xvr_core::{Bucket, RecordingHostCallbacks};

    #[test]
    fn arithmetic_expression_statement_leaves_its_value_on_the_stack() {
        let bucket = Bucket::new(4096);
        let left = bucket.alloc(Node::Literal(Literal::Integer(1)));
        let right = bucket.alloc(Node::Literal(Literal::Integer(2)));
        let sum = bucket.alloc(Node::Binary {
            op: BinaryOp::Add,
            left,
            right,
        });
        let program = bucket.alloc(Node::Block {
            statements: vec![sum],
            inner_scope: false,
        });
        let module = ModuleBuilder::new().build(program).unwrap();
        let host = Box::new(RecordingHostCallbacks::default());
        let mut vm = Vm::new(&module, host);
        vm.run().unwrap();
        assert_eq!(vm.stack().len(), 1);
        assert_eq!(vm.stack().peek_at(0), Some(&Value::Integer(3)));
    }

    #[test]
    fn divide_by_zero_reports_through_host_and_leaves_null_on_the_stack() {
        let bucket = Bucket::new(4096);
        let left = bucket.alloc(Node::Literal(Literal::Integer(1)));
        let right = bucket.alloc(Node::Literal(Literal::Integer(0)));
        let div = bucket.alloc(Node::Binary {
            op: BinaryOp::Divide,
            left,
            right,
        });
        let program = bucket.alloc(Node::Block {
            statements: vec![div],
            inner_scope: false,
        });
        let module = ModuleBuilder::new().build(program).unwrap();
        let host = Box::new(RecordingHostCallbacks::default());
        let mut vm = Vm::new(&module, host);
        vm.run().unwrap();
        // The error path pushes a placeholder in place of the undefined
        // quotient; the statement still leaves one residual value.
        assert_eq!(vm.stack().len(), 1);
        assert_eq!(vm.stack().peek_at(0), Some(&Value::Null));
    }

    #[test]
    fn declare_then_access_round_trips_through_scope() {
        let bucket = Bucket::new(4096);
        let init = bucket.alloc(Node::Literal(Literal::Integer(5)));
        let declare = bucket.alloc(Node::VarDeclare {
            name: "x",
            declared_type: ValueType::Integer,
            constant: false,
            initializer: init,
        });
        let access = bucket.alloc(Node::VarAccess { name: "x" });
        let print = bucket.alloc(Node::Print(access));
        let program = bucket.alloc(Node::Block {
            statements: vec![declare, print],
            inner_scope: false,
        });
        let module = ModuleBuilder::new().build(program).unwrap();
        let host = Box::new(RecordingHostCallbacks::default());
        let mut vm = Vm::new(&module, host);
        vm.run().unwrap();
    }

    fn array_literal_node<'a>(bucket: &'a Bucket, values: &[i32]) -> &'a Node<'a> {
        let elements = values
            .iter()
            .map(|n| bucket.alloc(Node::Literal(Literal::Integer(*n))))
            .collect();
        bucket.alloc(Node::Compound {
            kind: CompoundKind::Array,
            elements,
        })
    }

    #[test]
    fn index_assignment_mutates_array_in_place() {
        let bucket = Bucket::new(4096);
        let array_lit = array_literal_node(&bucket, &[10, 20, 30]);
        let declare = bucket.alloc(Node::VarDeclare {
            name: "a",
            declared_type: ValueType::Array,
            constant: false,
            initializer: array_lit,
        });
        let target = bucket.alloc(Node::VarAccess { name: "a" });
        let index = bucket.alloc(Node::Literal(Literal::Integer(1)));
        let new_value = bucket.alloc(Node::Literal(Literal::Integer(99)));
        let index_assign = bucket.alloc(Node::IndexAssign {
            target,
            index,
            op: AssignOp::Assign,
            value: new_value,
        });
        let program = bucket.alloc(Node::Block {
            statements: vec![declare, index_assign],
            inner_scope: false,
        });
        let module = ModuleBuilder::new().build(program).unwrap();
        let host = Box::new(RecordingHostCallbacks::default());
        let mut vm = Vm::new(&module, host);
        vm.run().unwrap();
        assert!(vm.stack().is_empty());

        let name = XString::name("a", ValueType::Array, false);
        let stored = scope::lookup(&vm.scope, &name).expect("a must still be declared");
        let Value::Array(arr) = stored else {
            panic!("expected an array value");
        };
        let arr = arr.borrow();
        assert!(matches!(arr[0], Value::Integer(10)));
        assert!(matches!(arr[1], Value::Integer(99)));
        assert!(matches!(arr[2], Value::Integer(30)));
    }

    #[test]
    fn compound_index_assignment_combines_with_the_current_element() {
        let bucket = Bucket::new(4096);
        let array_lit = array_literal_node(&bucket, &[10, 20, 30]);
        let declare = bucket.alloc(Node::VarDeclare {
            name: "a",
            declared_type: ValueType::Array,
            constant: false,
            initializer: array_lit,
        });
        let target = bucket.alloc(Node::VarAccess { name: "a" });
        let index = bucket.alloc(Node::Literal(Literal::Integer(1)));
        let delta = bucket.alloc(Node::Literal(Literal::Integer(5)));
        let index_assign = bucket.alloc(Node::IndexAssign {
            target,
            index,
            op: AssignOp::AddAssign,
            value: delta,
        });
        let program = bucket.alloc(Node::Block {
            statements: vec![declare, index_assign],
            inner_scope: false,
        });
        let module = ModuleBuilder::new().build(program).unwrap();
        let host = Box::new(RecordingHostCallbacks::default());
        let mut vm = Vm::new(&module, host);
        vm.run().unwrap();

        let name = XString::name("a", ValueType::Array, false);
        let stored = scope::lookup(&vm.scope, &name).expect("a must still be declared");
        let Value::Array(arr) = stored else {
            panic!("expected an array value");
        };
        assert!(matches!(arr.borrow()[1], Value::Integer(25)));
    }

    #[test]
    fn index_assignment_out_of_bounds_reports_and_continues() {
        let bucket = Bucket::new(4096);
        let array_lit = array_literal_node(&bucket, &[10, 20, 30]);
        let declare = bucket.alloc(Node::VarDeclare {
            name: "a",
            declared_type: ValueType::Array,
            constant: false,
            initializer: array_lit,
        });
        let target = bucket.alloc(Node::VarAccess { name: "a" });
        let index = bucket.alloc(Node::Literal(Literal::Integer(10)));
        let new_value = bucket.alloc(Node::Literal(Literal::Integer(1)));
        let index_assign = bucket.alloc(Node::IndexAssign {
            target,
            index,
            op: AssignOp::Assign,
            value: new_value,
        });
        let program = bucket.alloc(Node::Block {
            statements: vec![declare, index_assign],
            inner_scope: false,
        });
        let module = ModuleBuilder::new().build(program).unwrap();
        let host = Box::new(RecordingHostCallbacks::default());
        let mut vm = Vm::new(&module, host);
        vm.run().unwrap();
        assert!(vm.stack().is_empty());
    }

    use proptest::prelude::*;

    proptest! {
        // A bare expression statement is not "properly lowered" — it
        // leaves its value on the stack, so N top-level arithmetic
        // statements leave exactly N residual integers, one per statement.
        #[test]
        fn n_expression_statements_leave_n_residual_values(values in prop::collection::vec(any::<i16>(), 0..32)) {
            let bucket = Bucket::new(64 * 1024);
            let statements: Vec<&Node<'_>> = values
                .iter()
                .map(|v| {
                    let left = bucket.alloc(Node::Literal(Literal::Integer(*v as i32)));
                    let right = bucket.alloc(Node::Literal(Literal::Integer(1)));
                    &*bucket.alloc(Node::Binary {
                        op: BinaryOp::Add,
                        left,
                        right,
                    })
                })
                .collect();
            let program = bucket.alloc(Node::Block { statements, inner_scope: false });
            let module = ModuleBuilder::new().build(program).unwrap();
            let host = Box::new(RecordingHostCallbacks::default());
            let mut vm = Vm::new(&module, host);
            vm.run().unwrap();
            prop_assert_eq!(vm.stack().len(), values.len());
            for (depth, v) in values.iter().rev().enumerate() {
                prop_assert_eq!(vm.stack().peek_at(depth), Some(&Value::Integer(*v as i32 + 1)));
            }
        }
    }
}
