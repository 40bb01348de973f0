//! Abstract syntax tree (C7).
//!
//! Pure data, no behavior — nodes are partitioned from a [`xvr_core::Bucket`]
//! owned by the parser and freed after the module builder finishes with it.

use xvr_core::ValueType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
    PrefixIncrement,
    PrefixDecrement,
    PostfixIncrement,
    PostfixDecrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Concat,
    And,
    Or,
}

impl BinaryOp {
    /// Decode the raw byte `ModuleBuilder` stores as `ASSIGN_COMPOUND`'s
    /// inline parameter, so the VM can apply the same operator without
    /// depending on `ast::Node` at all.
    pub fn from_byte(byte: u8) -> Option<BinaryOp> {
        match byte {
            0 => Some(BinaryOp::Add),
            1 => Some(BinaryOp::Subtract),
            2 => Some(BinaryOp::Multiply),
            3 => Some(BinaryOp::Divide),
            4 => Some(BinaryOp::Modulo),
            5 => Some(BinaryOp::Concat),
            6 => Some(BinaryOp::And),
            7 => Some(BinaryOp::Or),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubtractAssign,
    MultiplyAssign,
    DivideAssign,
    ModuloAssign,
    ConcatAssign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompoundKind {
    Array,
    Table,
}

/// A literal value embedded directly in the AST (as opposed to one built at
/// runtime). Aggregates are never literals — they're built from `Compound`
/// nodes instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i32),
    Float(f32),
    String(String),
}

/// A single AST node. Lifetime `'a` ties every child reference back to the
/// bucket that owns it.
#[derive(Debug)]
pub enum Node<'a> {
    Block {
        statements: Vec<&'a Node<'a>>,
        inner_scope: bool,
    },
    Literal(Literal),
    Unary {
        op: UnaryOp,
        expr: &'a Node<'a>,
    },
    Binary {
        op: BinaryOp,
        left: &'a Node<'a>,
        right: &'a Node<'a>,
    },
    Compare {
        op: CompareOp,
        left: &'a Node<'a>,
        right: &'a Node<'a>,
    },
    Group(&'a Node<'a>),
    Compound {
        kind: CompoundKind,
        elements: Vec<&'a Node<'a>>,
    },
    /// A `key: value` pair inside a table compound literal.
    Pair {
        key: &'a Node<'a>,
        value: &'a Node<'a>,
    },
    Index {
        value: &'a Node<'a>,
        index: &'a Node<'a>,
        length: Option<&'a Node<'a>>,
    },
    Assert {
        condition: &'a Node<'a>,
        message: Option<&'a Node<'a>>,
    },
    If {
        condition: &'a Node<'a>,
        then_branch: &'a Node<'a>,
        else_branch: Option<&'a Node<'a>>,
    },
    While {
        condition: &'a Node<'a>,
        body: &'a Node<'a>,
    },
    Break,
    Continue,
    Print(&'a Node<'a>),
    VarDeclare {
        name: &'a str,
        declared_type: ValueType,
        constant: bool,
        initializer: &'a Node<'a>,
    },
    VarAssign {
        name: &'a str,
        op: AssignOp,
        value: &'a Node<'a>,
    },
    /// `target[index] = value` or a compound form (`target[index] += value`).
    /// `target` is the collection expression, never re-evaluated for its
    /// side effects more than once.
    IndexAssign {
        target: &'a Node<'a>,
        index: &'a Node<'a>,
        op: AssignOp,
        value: &'a Node<'a>,
    },
    VarAccess {
        name: &'a str,
    },
    /// Emitted in place of `assert` nodes when the parser's
    /// `remove_assert` flag is set — the compiler turns this straight
    /// into a no-op `PASS`.
    Pass,
    /// A malformed parse the parser recovered from; never valid to compile.
    Error,
    End,
}
