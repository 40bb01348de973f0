//! End-to-end scripts run through the same compile/execute path the
//! `xvr` binary uses, one per documented language scenario.

use std::io::Write;
use std::sync::{Arc, Mutex};

use xvr_core::{RecordingHostCallbacks, Value};
use xvr_vm::Vm;

/// Runs `source` to completion and hands back the VM plus a handle to
/// everything its host callbacks recorded. The boxed host moves into
/// `Vm::new`, but `Arc<Mutex<_>>` lets the clone kept here see every
/// mutation made through that moved copy.
fn run(source: &str) -> (Vm, Arc<Mutex<RecordingHostCallbacks>>) {
    run_with(source, false, true)
}

fn run_with(source: &str, remove_assert: bool, silent_assert: bool) -> (Vm, Arc<Mutex<RecordingHostCallbacks>>) {
    let module = xvr_driver::compile(source, remove_assert).expect("source must compile");
    let host = Arc::new(Mutex::new(RecordingHostCallbacks {
        silent_print: true,
        silent_assert,
        ..Default::default()
    }));
    let mut vm = Vm::new(&module, Box::new(Arc::clone(&host)));
    vm.run().expect("well-formed bytecode never hits a fatal VM error");
    (vm, host)
}

#[test]
fn arithmetic_expression_leaves_a_single_integer_on_the_stack() {
    let (vm, _host) = run("(1 + 2) * (3 + 4);");
    assert_eq!(vm.stack().len(), 1);
    assert!(matches!(vm.stack().peek(), Some(Value::Integer(21))));
}

#[test]
fn compound_assignment_updates_the_binding_and_prints_it() {
    let (vm, host) = run("var int x = 5; x += 3; print x;");
    assert!(vm.stack().is_empty());
    assert_eq!(host.lock().unwrap().prints, vec!["8".to_string()]);
}

#[test]
fn string_concat_and_slice_prints_the_expected_substring() {
    let (vm, host) = run("var string s = \"foo\" .. \"bar\"; print s[1:3];");
    assert!(vm.stack().is_empty());
    assert_eq!(host.lock().unwrap().prints, vec!["oob".to_string()]);
}

#[test]
fn array_index_assignment_mutates_the_element_in_place() {
    let (vm, host) = run("var array a = [10, 20, 30]; a[1] = 99; print a[1];");
    assert!(vm.stack().is_empty());
    assert_eq!(host.lock().unwrap().prints, vec!["99".to_string()]);
}

#[test]
fn break_exits_the_loop_at_the_expected_iteration() {
    let (vm, host) = run("var int i = 0; while (i < 3) { if (i == 1) { break; } i += 1; } print i;");
    assert!(vm.stack().is_empty());
    assert_eq!(host.lock().unwrap().prints, vec!["1".to_string()]);
}

#[test]
fn failing_assert_carries_the_literal_message_and_does_not_crash_the_vm() {
    let (vm, host) = run_with("assert false, \"nope\";", false, true);
    assert!(vm.stack().is_empty());
    assert_eq!(host.lock().unwrap().assert_failures, vec!["nope".to_string()]);
}

#[test]
fn table_literal_lookup_prints_the_value_for_its_key() {
    let (vm, host) = run("var table t = {\"a\": 1, \"b\": 2}; print t[\"b\"];");
    assert!(vm.stack().is_empty());
    assert_eq!(host.lock().unwrap().prints, vec!["2".to_string()]);
}

#[test]
fn divide_by_zero_reports_and_leaves_the_vm_in_a_recoverable_state() {
    let (vm, host) = run("1 / 0;");
    assert_eq!(vm.stack().len(), 1);
    assert!(matches!(vm.stack().peek(), Some(Value::Null)));
    assert_eq!(
        host.lock().unwrap().errors,
        vec!["Can't divide or modulo by zero".to_string()]
    );
}

#[test]
fn compiling_a_file_from_disk_round_trips_through_compile_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "var int answer = 40 + 2; print answer;").unwrap();
    let module = xvr_driver::compile_file(file.path(), false).unwrap();
    let host = Arc::new(Mutex::new(RecordingHostCallbacks {
        silent_print: true,
        ..Default::default()
    }));
    let mut vm = Vm::new(&module, Box::new(Arc::clone(&host)));
    vm.run().unwrap();
    assert_eq!(host.lock().unwrap().prints, vec!["42".to_string()]);
}

#[test]
fn remove_assert_keeps_an_otherwise_failing_assert_from_ever_firing() {
    let (_vm, host) = run_with("assert false, \"nope\";", true, true);
    assert!(host.lock().unwrap().assert_failures.is_empty());
}
