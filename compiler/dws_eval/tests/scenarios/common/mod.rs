//! Shared helpers for scenario tests.
//!
//! Scenarios are assembled with `dws_ir::build` and run against a buffer
//! print handler so their output can be compared as a string.

use dws_eval::{buffer_handler, ExceptionReport, Interpreter, RunError};
use dws_ir::{Decl, Program, Stmt};

/// Interpreter that prints into a buffer.
pub fn interpreter() -> Interpreter {
    Interpreter::builder().print_handler(buffer_handler()).build()
}

/// Run a program and return its output along with the run result.
pub fn run_result(decls: Vec<Decl>, body: Vec<Stmt>) -> (Result<(), RunError>, String) {
    let mut interp = interpreter();
    let result = interp.run(&Program::new(decls, body));
    (result, interp.get_print_output())
}

/// Run a program that must finish cleanly and return its output.
#[track_caller]
pub fn run(decls: Vec<Decl>, body: Vec<Stmt>) -> String {
    let (result, output) = run_result(decls, body);
    if let Err(err) = result {
        panic!("program failed: {err}\noutput so far:\n{output}");
    }
    output
}

/// Run a program that must end with an unhandled script exception.
#[track_caller]
pub fn unhandled(decls: Vec<Decl>, body: Vec<Stmt>) -> ExceptionReport {
    match run_result(decls, body).0 {
        Err(RunError::Unhandled(report)) => report,
        Err(RunError::Fatal(err)) => panic!("expected a script exception, got fatal error: {err}"),
        Ok(()) => panic!("expected a script exception, program finished"),
    }
}
