//! Core library for the Mallow Lisp: a tokenizer and reader producing value
//! trees, a trampolined evaluator with macros and quasiquote, the primitive
//! library, a printer and a REPL.

pub mod diagnostics;
pub mod environment;
pub mod lexer;
pub mod printer;
pub mod reader;
pub mod repl;
pub mod runtime;
pub mod stdlib;
pub mod value;

pub use diagnostics::{Diagnostic, DiagnosticKind, MallowError, SourceSpan};
pub use environment::{Environment, EnvironmentRef};
pub use reader::read;
pub use repl::Repl;
pub use runtime::{evaluate, ExecutionContext, Interpreter};
pub use value::{Value, ValueKind};
