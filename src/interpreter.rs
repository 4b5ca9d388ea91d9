use crate::environment::Environment;
use crate::printer::{pr_str, PrintMode};
use crate::types::{Expression, Value};
use crate::{evaluator, reader};
use derive_more::From;
use std::fmt;
use std::rc::Rc;

pub type Result<T = Value> = std::result::Result<T, Error>;

#[derive(Debug, From)]
pub enum Error {
    Read(reader::Error),
    Eval(evaluator::Error),
}

impl Error {
    pub fn is_incomplete_input(&self) -> bool {
        match self {
            Error::Read(e) => e.is_incomplete(),
            Error::Eval(_) => false,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Read(e) => write!(f, "syntax error: {}", e),
            Error::Eval(e) => write!(f, "{}", e),
        }
    }
}

pub fn read(text: &str) -> Result<Vec<Expression>> {
    Ok(reader::read_all(text)?)
}

pub fn eval(expr: &Expression, env: &Rc<dyn Environment>) -> Result {
    Ok(evaluator::evaluate(expr, env)?)
}

pub fn print(value: &Value) -> String {
    match value {
        Value::Nothing => String::new(),
        _ => pr_str(value, PrintMode::ReadableRepresentation),
    }
}

/// Read and evaluate every form in `text`, printing the last value. Stops at the first error.
pub fn rep(text: &str, env: &Rc<dyn Environment>) -> Result<String> {
    let forms = read(text)?;
    let last = forms
        .iter()
        .try_fold(Value::Nothing, |_, form| eval(form, env))?;
    Ok(print(&last))
}
