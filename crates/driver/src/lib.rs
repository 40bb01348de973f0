//! Shared compile/run plumbing for the `xvr` CLI and REPL.
//!
//! The binary (`src/main.rs`) only parses arguments and wires a
//! [`HostCallbacks`] implementation to a [`Vm`]; everything that turns
//! source text into a runnable [`Module`] lives here so both the
//! one-shot file mode and the REPL's line-at-a-time loop share it.

use std::fmt;
use std::path::Path;

use xvr_compiler::{BuildError, Module, ModuleBuilder};
use xvr_core::Bucket;
use xvr_lex::LexError;
use xvr_parse::ParseError;

/// A bucket this size comfortably holds a REPL line or small script's
/// AST; larger programs simply chain additional regions (see `Bucket`).
const SOURCE_BUCKET_CAPACITY: usize = 64 * 1024;

#[derive(Debug)]
pub enum DriverError {
    Io(std::io::Error),
    Lex(LexError),
    Parse(ParseError),
    Build(BuildError),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::Io(e) => write!(f, "{e}"),
            DriverError::Lex(e) => write!(f, "{e}"),
            DriverError::Parse(e) => write!(f, "{e}"),
            DriverError::Build(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DriverError::Io(e) => Some(e),
            DriverError::Lex(e) => Some(e),
            DriverError::Parse(e) => Some(e),
            DriverError::Build(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for DriverError {
    fn from(e: std::io::Error) -> Self {
        DriverError::Io(e)
    }
}

impl From<LexError> for DriverError {
    fn from(e: LexError) -> Self {
        DriverError::Lex(e)
    }
}

impl From<ParseError> for DriverError {
    fn from(e: ParseError) -> Self {
        DriverError::Parse(e)
    }
}

impl From<BuildError> for DriverError {
    fn from(e: BuildError) -> Self {
        DriverError::Build(e)
    }
}

/// Lex, parse, and compile one unit of source into a runnable module.
/// The AST bucket is freed the moment the builder finishes with it —
/// nothing in `Module` borrows from it.
pub fn compile(source: &str, remove_assert: bool) -> Result<Module, DriverError> {
    let tokens = xvr_lex::tokenize(source)?;
    let bucket = Bucket::new(SOURCE_BUCKET_CAPACITY);
    let ast = xvr_parse::parse(tokens, &bucket, remove_assert)?;
    let module = ModuleBuilder::new().build(ast)?;
    Ok(module)
}

pub fn compile_file(path: &Path, remove_assert: bool) -> Result<Module, DriverError> {
    let source = std::fs::read_to_string(path)?;
    compile(&source, remove_assert)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiling_a_malformed_assignment_target_fails() {
        let err = compile("1 + 1 = 2;", false).unwrap_err();
        assert!(matches!(err, DriverError::Build(BuildError::MalformedParse)));
    }

    #[test]
    fn compiling_valid_source_produces_a_module() {
        let module = compile("var int x = 1; print x;", false).unwrap();
        assert!(!module.code.is_empty());
    }

    #[test]
    fn remove_assert_compiles_asserts_away() {
        let module = compile("assert false;", true).unwrap();
        // One PASS word plus the trailing RETURN word; no ASSERT opcode.
        assert_eq!(module.code.len(), 8);
    }
}
