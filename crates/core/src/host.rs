//! Host callback interface (§6, §9).
//!
//! The original threads three process-wide function pointers through every
//! VM. Re-architected per Design Notes §9 as an explicit trait object
//! threaded through `Vm::new`, so the core never reads process globals and
//! multiple VM instances can each own independent callbacks.

/// Implemented by the host embedding an Xvr VM. `Send` because running
/// multiple VMs concurrently on separate threads is only sound if their
/// callbacks are independently thread-safe (§5).
pub trait HostCallbacks: Send {
    /// Invoked by the `PRINT` opcode.
    fn print(&mut self, message: &str);

    /// Invoked on a recoverable runtime error (type mismatch, divide by
    /// zero, undefined variable, ...). The VM remains in a recoverable
    /// state after this call.
    fn error(&mut self, message: &str);

    /// Invoked when `ASSERT` fires. The default policy terminates the
    /// process; a host may override this to keep running instead.
    fn assert_failure(&mut self, message: &str);
}

/// Null-op defaults: print to stdout, errors and assertion failures to
/// stderr, with assertion failure terminating the process.
#[derive(Debug, Default)]
pub struct DefaultHostCallbacks;

impl HostCallbacks for DefaultHostCallbacks {
    fn print(&mut self, message: &str) {
        println!("{message}");
    }

    fn error(&mut self, message: &str) {
        eprintln!("ERROR: {message}");
    }

    fn assert_failure(&mut self, message: &str) {
        eprintln!("ASSERTION FAILED: {message}");
        std::process::exit(1);
    }
}

/// A host implementation that records everything instead of touching
/// stdio — used by the driver's `--silent-print`/`--silent-assert` flags
/// and by tests.
#[derive(Debug, Default)]
pub struct RecordingHostCallbacks {
    pub prints: Vec<String>,
    pub errors: Vec<String>,
    pub assert_failures: Vec<String>,
    pub silent_print: bool,
    pub silent_assert: bool,
}

impl HostCallbacks for RecordingHostCallbacks {
    fn print(&mut self, message: &str) {
        if !self.silent_print {
            println!("{message}");
        }
        self.prints.push(message.to_string());
    }

    fn error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    fn assert_failure(&mut self, message: &str) {
        self.assert_failures.push(message.to_string());
        if !self.silent_assert {
            std::process::exit(1);
        }
    }
}

/// Lets a caller keep a handle to the recording host after moving a boxed
/// callback into `Vm::new`, which takes ownership of the trait object.
/// `Arc<Mutex<_>>` rather than `Rc<RefCell<_>>` because `HostCallbacks`
/// requires `Send`.
impl HostCallbacks for std::sync::Arc<std::sync::Mutex<RecordingHostCallbacks>> {
    fn print(&mut self, message: &str) {
        self.lock().expect("recording host mutex poisoned").print(message);
    }

    fn error(&mut self, message: &str) {
        self.lock().expect("recording host mutex poisoned").error(message);
    }

    fn assert_failure(&mut self, message: &str) {
        self.lock().expect("recording host mutex poisoned").assert_failure(message);
    }
}
