//! Xvr Core: Value, String, Table, Stack, Scope, Bucket allocator, and the
//! wire identities (opcodes, value types) shared by the compiler and VM.
//!
//! # Modules
//!
//! - `bucket`: bump-allocated regions backing AST lifetimes
//! - `value_type`: the `Xvr_ValueType` tag
//! - `string`: reference-counted rope string
//! - `table`: Robin-Hood hash table keyed by `Value`
//! - `value`: the tagged-union runtime value
//! - `stack`: growth/shrink-hysteresis value stack
//! - `scope`: lexical scope chain
//! - `opcode`: stable wire identities for the bytecode instruction set
//! - `host`: the host callback interface (print / error / assertFailure)

pub mod bucket;
pub mod host;
pub mod opcode;
pub mod scope;
pub mod stack;
pub mod string;
pub mod table;
pub mod value;
pub mod value_type;

pub use bucket::Bucket;
pub use host::{DefaultHostCallbacks, HostCallbacks, RecordingHostCallbacks};
pub use opcode::{Arity, JumpCond, JumpKind, OpCode, Squeeze, StringSubKind};
pub use scope::{ScopeError, ScopeHandle};
pub use stack::Stack;
pub use string::{StringError, XString};
pub use table::{Table, TableError};
pub use value::{FunctionProto, OpaqueValue, Slot, Value, ValueError};
pub use value_type::ValueType;
