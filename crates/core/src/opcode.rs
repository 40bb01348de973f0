//! Stable wire identities for the bytecode instruction set (C8/C9/C10).
//!
//! Every opcode occupies byte 0 of a 4-byte word; bytes 1-3 carry small
//! inline parameters or a "squeezed" follow-on opcode fused into the same
//! word. 32-bit immediates always start on their own following word.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    Read = 0,
    Declare,
    Assign,
    AssignCompound,
    Access,
    Duplicate,
    IndexAssign,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    CompareEqual,
    CompareLess,
    CompareLessEqual,
    CompareGreater,
    CompareGreaterEqual,
    And,
    Or,
    Truthy,
    Negate,
    Concat,
    Index,
    ScopePush,
    ScopePop,
    Jump,
    Escape,
    Assert,
    Print,
    Eliminate,
    Pass,
    Return,
}

pub const OPCODE_COUNT: u8 = OpCode::Return as u8 + 1;

impl OpCode {
    pub fn from_byte(byte: u8) -> Option<OpCode> {
        use OpCode::*;
        Some(match byte {
            0 => Read,
            1 => Declare,
            2 => Assign,
            3 => AssignCompound,
            4 => Access,
            5 => Duplicate,
            6 => IndexAssign,
            7 => Add,
            8 => Subtract,
            9 => Multiply,
            10 => Divide,
            11 => Modulo,
            12 => CompareEqual,
            13 => CompareLess,
            14 => CompareLessEqual,
            15 => CompareGreater,
            16 => CompareGreaterEqual,
            17 => And,
            18 => Or,
            19 => Truthy,
            20 => Negate,
            21 => Concat,
            22 => Index,
            23 => ScopePush,
            24 => ScopePop,
            25 => Jump,
            26 => Escape,
            27 => Assert,
            28 => Print,
            29 => Eliminate,
            30 => Pass,
            31 => Return,
            _ => return None,
        })
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Sub-kind byte for `READ` of a string literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StringSubKind {
    Leaf = 0,
    Name = 1,
}

impl StringSubKind {
    pub fn from_byte(byte: u8) -> Option<StringSubKind> {
        match byte {
            0 => Some(StringSubKind::Leaf),
            1 => Some(StringSubKind::Name),
            _ => None,
        }
    }
}

/// `JUMP`'s first inline parameter byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum JumpKind {
    Absolute = 0,
    Relative = 1,
}

impl JumpKind {
    pub fn from_byte(byte: u8) -> Option<JumpKind> {
        match byte {
            0 => Some(JumpKind::Absolute),
            1 => Some(JumpKind::Relative),
            _ => None,
        }
    }
}

/// `JUMP`'s second inline parameter byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum JumpCond {
    Always = 0,
    IfTrue = 1,
    IfFalse = 2,
}

impl JumpCond {
    pub fn from_byte(byte: u8) -> Option<JumpCond> {
        match byte {
            0 => Some(JumpCond::Always),
            1 => Some(JumpCond::IfTrue),
            2 => Some(JumpCond::IfFalse),
            _ => None,
        }
    }
}

/// A squeezed byte riding in the same word as an arithmetic/compare/access
/// opcode, conditionally interpreted by the VM to fuse a following
/// operation (`NEGATE` turns `==` into `!=`, `ASSIGN` fuses compound
/// assignment, `ACCESS` fuses duplicate-then-access for `x += ...`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Squeeze {
    None = 0,
    Negate = 1,
    Assign = 2,
    Access = 3,
}

impl Squeeze {
    pub fn from_byte(byte: u8) -> Squeeze {
        match byte {
            1 => Squeeze::Negate,
            2 => Squeeze::Assign,
            3 => Squeeze::Access,
            _ => Squeeze::None,
        }
    }
}

/// Arity byte for `ASSERT` (1 = condition only, 2 = condition + message)
/// and `INDEX` (2 = value+index, 3 = value+index+length).
pub type Arity = u8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_opcode_round_trips_through_its_wire_byte() {
        for byte in 0..OPCODE_COUNT {
            let op = OpCode::from_byte(byte).expect("opcode byte must decode");
            assert_eq!(op as u8, byte);
        }
        assert!(OpCode::from_byte(OPCODE_COUNT).is_none());
    }

    #[test]
    fn compare_greater_and_greater_equal_are_distinct() {
        // Design Notes §9: the original AST flag enum aliased these.
        assert_ne!(OpCode::CompareGreater as u8, OpCode::CompareGreaterEqual as u8);
    }
}
