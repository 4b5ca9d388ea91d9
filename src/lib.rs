pub mod cmdline;
pub mod environment;
pub mod evaluator;
pub mod interpreter;
pub mod printer;
pub mod reader;
pub mod special_forms;
pub mod symbol;
pub mod tokens;
pub mod types;

#[macro_use]
extern crate lazy_static;

mod core;
mod strings;

pub use environment::{Environment, Prelude};
pub use symbol::Symbol;
pub use types::{Expression, Value};
