//! Xvr VM: the stack machine that executes a [`xvr_compiler::Module`]
//! (C10).

pub mod error;
pub mod vm;

pub use error::VmFatalError;
pub use vm::Vm;
