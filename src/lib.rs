//! Embeddable JavaScript interpreter for browser scripting.
//!
//! Source text is parsed into a syntax tree and run by a tree-walking
//! evaluator over a garbage-collected object heap. The embedding program
//! talks to scripts through [`Interpreter`] and receives error reports,
//! cancellation polls and debugger stops through the [`Host`] trait.

pub mod ast;
pub mod config;
mod decompile;
pub mod error;
pub mod interpreter;
mod lexer;
pub mod parser;
mod stack;
pub mod types;

pub use config::Config;
pub use error::{Error, ErrorKind};
pub use interpreter::{
    Completion, DebugAction, DebugEvent, DefaultHost, ErrorAction, ErrorReport, Feedback, GcStats,
    Host, Interpreter,
};
pub use parser::ParseError;
pub use types::{JsValue, ObjectId};
