//! Xvr Compiler: lowers a parsed AST into a self-describing bytecode
//! module image (C7/C8/C9).
//!
//! This crate only depends on `xvr-core` for the shared wire identities
//! (`OpCode`, `ValueType`) and runtime primitives (`Bucket`) — it has no
//! opinion on how the AST it's handed was produced, so it's usable from
//! the tree-walking REPL path and from a future ahead-of-time driver alike.

pub mod ast;
pub mod builder;
pub mod module;

pub use ast::{AssignOp, BinaryOp, CompareOp, CompoundKind, Literal, Node, UnaryOp};
pub use builder::{BuildError, ModuleBuilder};
pub use module::{Bundle, BundleError, Module, ModuleError};
