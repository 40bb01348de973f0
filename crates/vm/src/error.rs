//! VM-fatal errors (tier 1, host-fatal): a malformed module slipped past
//! the compiler/loader, or an internal invariant (stack/scope balance)
//! that well-formed bytecode can never violate. These never reach a
//! running script — they indicate a corrupt module or a VM bug, so the
//! caller should treat them as unrecoverable.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmFatalError {
    InvalidOpcode(u8),
    InvalidValueType(u8),
    InvalidJumpKind(u8),
    InvalidJumpCond(u8),
    InvalidBinaryOp(u8),
    UnsupportedLiteralType(xvr_core::ValueType),
    StackUnderflow,
    ScopeUnderflow,
    BadStringReference(u32),
    TruncatedInstruction,
}

impl fmt::Display for VmFatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmFatalError::InvalidOpcode(b) => write!(f, "invalid opcode byte {b}"),
            VmFatalError::InvalidValueType(b) => write!(f, "invalid value type byte {b}"),
            VmFatalError::InvalidJumpKind(b) => write!(f, "invalid jump kind byte {b}"),
            VmFatalError::InvalidJumpCond(b) => write!(f, "invalid jump condition byte {b}"),
            VmFatalError::InvalidBinaryOp(b) => write!(f, "invalid compound-assignment operator byte {b}"),
            VmFatalError::UnsupportedLiteralType(vt) => {
                write!(f, "READ cannot construct a literal of type {vt}")
            }
            VmFatalError::StackUnderflow => write!(f, "stack underflow"),
            VmFatalError::ScopeUnderflow => write!(f, "scope underflow: popped past the root scope"),
            VmFatalError::BadStringReference(idx) => write!(f, "jump index {idx} does not resolve to a valid string"),
            VmFatalError::TruncatedInstruction => write!(f, "instruction stream ends mid-word"),
        }
    }
}

impl std::error::Error for VmFatalError {}
