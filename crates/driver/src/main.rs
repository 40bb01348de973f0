//! `xvr`: compile and run a single `.xvr` file, or drop into a REPL when
//! no file is given.

use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use xvr_core::{value, RecordingHostCallbacks};
use xvr_vm::Vm;

/// A successful run always exits `0`; every I/O, parse, build, or
/// host-fatal failure exits `255` (the original's `-1`, wrapped).
const EXIT_FAILURE: u8 = 255;

#[derive(Parser)]
#[command(
    name = "xvr",
    about = "Xvr: lex, parse, compile, and run .xvr source",
    disable_version_flag = true
)]
struct Cli {
    /// Run this file instead of starting the REPL.
    #[arg(short = 'f', long = "file")]
    file: Option<PathBuf>,

    /// Print the version and exit.
    #[arg(short = 'v', long = "version")]
    version: bool,

    /// Suppress `print` output (still recorded for `--verbose`).
    #[arg(long = "silent-print")]
    silent_print: bool,

    /// Don't terminate the process when `assert` fails.
    #[arg(long = "silent-assert")]
    silent_assert: bool,

    /// Drop `assert` statements from the compiled module entirely.
    #[arg(long = "remove-assert")]
    remove_assert: bool,

    /// After execution, dump the evaluation stack and every scope frame.
    #[arg(short = 'd', long = "verbose")]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version {
        println!("xvr {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(
            if cli.verbose { "xvr_driver=debug" } else { "xvr_driver=info" }
                .parse()
                .expect("static directive always parses"),
        ))
        .with_writer(std::io::stderr)
        .init();

    let status = match &cli.file {
        Some(path) => run_file(path, &cli),
        None => run_repl(&cli),
    };

    if status {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_FAILURE)
    }
}

/// Returns `true` on success, `false` on any failure the CLI should
/// report with a non-zero exit status.
fn run_file(path: &PathBuf, cli: &Cli) -> bool {
    info!(path = %path.display(), "compiling file");
    let module = match xvr_driver::compile_file(path, cli.remove_assert) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("error: {e}");
            return false;
        }
    };

    let host = Box::new(RecordingHostCallbacks {
        silent_print: cli.silent_print,
        silent_assert: cli.silent_assert,
        ..Default::default()
    });
    let mut vm = Vm::new(&module, host);
    if let Err(e) = vm.run() {
        eprintln!("fatal: {e}");
        return false;
    }

    if cli.verbose {
        dump_vm_state(&vm);
    }
    true
}

fn run_repl(cli: &Cli) -> bool {
    let prompt_basename = std::env::args()
        .next()
        .and_then(|p| PathBuf::from(p).file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "xvr".to_string());
    let prompt = format!("{prompt_basename} >> ");

    let mut editor = match rustyline::DefaultEditor::new() {
        Ok(e) => e,
        Err(e) => {
            eprintln!("error: could not start the line editor: {e}");
            return false;
        }
    };

    // A REPL line is a module in its own right; the stack and scope
    // chain persist across lines by reusing the same Vm and reloading
    // its code/jumps/data on every compiled line.
    let mut vm: Option<Vm> = None;

    loop {
        let line = match editor.readline(&prompt) {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Eof) | Err(rustyline::error::ReadlineError::Interrupted) => break,
            Err(e) => {
                eprintln!("error: {e}");
                return false;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(trimmed);
        if trimmed == "exit" || trimmed == "quit" {
            break;
        }

        let module = match xvr_driver::compile(trimmed, cli.remove_assert) {
            Ok(m) => m,
            Err(e) => {
                debug!("parse error, skipping line: {e}");
                continue;
            }
        };

        match &mut vm {
            Some(existing) => existing.load(&module),
            None => vm = Some(Vm::new(&module, host_for_repl(cli))),
        }
        let running = vm.as_mut().expect("just constructed or loaded above");
        if let Err(e) = running.run() {
            eprintln!("fatal: {e}");
            return false;
        }
        if cli.verbose {
            dump_vm_state(running);
        }
    }
    true
}

fn host_for_repl(cli: &Cli) -> Box<RecordingHostCallbacks> {
    Box::new(RecordingHostCallbacks {
        silent_print: cli.silent_print,
        silent_assert: cli.silent_assert,
        ..Default::default()
    })
}

fn dump_vm_state(vm: &Vm) {
    eprintln!("-- stack ({} value(s), top first) --", vm.stack().len());
    for depth in 0..vm.stack().len() {
        if let Some(v) = vm.stack().peek_at(depth) {
            eprintln!("  [{depth}] {}", value::stringify(v));
        }
    }

    eprintln!("-- scope chain (innermost first) --");
    let mut frame = Some(Rc::clone(vm.scope()));
    let mut depth = 0;
    while let Some(scope) = frame {
        eprintln!(" frame {depth}:");
        for (k, v) in scope.table.borrow().iter() {
            eprintln!("   {} = {}", value::stringify(k), value::stringify(v));
        }
        frame = scope.parent.clone();
        depth += 1;
    }
}
