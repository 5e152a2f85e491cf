//! Integration tests for the interpreter, organized by feature
//!
//! These tests exercise the interpreter through the public API.
//!
//! ## Aggressive Test Defaults
//!
//! Tests collect garbage before every instruction that follows an
//! allocation (`GC_THRESHOLD=1`), so a value that is not rooted where it
//! should be is freed right away.
//!
//! Override via environment variables:
//!
//! ```bash
//! cargo test                           # Default: aggressive settings
//! GC_THRESHOLD=100 cargo test          # Less aggressive GC for faster runs
//! GC_THRESHOLD=0 cargo test            # Disable automatic GC
//! ```

#![allow(clippy::unwrap_used)]

mod api;
mod basics;
mod control_flow;
mod error;
mod function;
mod gc;
mod object;

use stackjs::{Interpreter, JsError, RuntimeConfig, Value};

/// Create a new interpreter with aggressive defaults for testing.
pub fn create_test_runtime() -> Interpreter {
    let mut config = RuntimeConfig::from_env();
    // GC on every allocation unless the environment says otherwise
    if std::env::var("GC_THRESHOLD").is_err() {
        config.gc_threshold = 1;
    }
    Interpreter::with_config(config)
}

/// Run `source` and return its completion value.
///
/// Only primitive results are meaningful here: the interpreter is dropped
/// before the caller sees the value.
pub fn eval(source: &str) -> Value {
    let mut interp = create_test_runtime();
    match interp.eval(source) {
        Ok(value) => value,
        Err(error) => panic!("eval failed: {}", interp.error_to_string(&error)),
    }
}

pub fn eval_result(source: &str) -> Result<Value, JsError> {
    let mut interp = create_test_runtime();
    interp.eval(source)
}

/// Run `source`, expecting it to fail, and render the error as
/// `Name: message`.
pub fn eval_error(source: &str) -> String {
    let mut interp = create_test_runtime();
    match interp.eval(source) {
        Ok(value) => panic!("expected an error, got {:?}", value),
        Err(error) => interp.error_to_string(&error),
    }
}

pub fn str_value(s: &str) -> Value {
    Value::from(s)
}
