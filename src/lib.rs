//! Embeddable ES5-subset JavaScript runtime
//!
//! Source is parsed into an AST, compiled to stack-machine bytecode and run
//! by a virtual machine over a garbage-collected heap of prototype-based
//! objects. Hosts drive the runtime through the stack-oriented API on
//! [`Interpreter`].
//!
//! # Example
//!
//! ```
//! use stackjs::{Interpreter, Value};
//!
//! let mut interp = Interpreter::new();
//! let result = interp.eval("function sq(x) { return x * x } sq(7)").unwrap();
//! assert_eq!(result, Value::Number(49.0));
//! ```

pub mod api;
pub mod ast;
pub mod compiler;
pub mod config;
pub mod error;
pub mod gc;
pub mod interpreter;
pub mod lexer;
pub mod object;
pub mod parser;
pub mod property;
pub mod string_dict;
pub mod value;

pub use config::RuntimeConfig;
pub use error::{FatalError, JsError, SourceLocation};
pub use gc::{GcStats, ObjectId};
pub use interpreter::{ErrorKind, Interpreter};
pub use object::NativeFn;
pub use value::{CheapClone, JsString, Value};
