use crate::strings::string_repr;
use crate::types::{Expression, Value, Variadic};
use itertools::Itertools;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintMode {
    /// Strings are quoted and escaped, so the output reads back to the same value.
    ReadableRepresentation,
    Directly,
}

fn print_string(s: &str, mode: PrintMode) -> String {
    match mode {
        PrintMode::ReadableRepresentation => string_repr(s),
        PrintMode::Directly => s.to_string(),
    }
}

fn print_bool(b: bool) -> String {
    String::from(if b { "#t" } else { "#f" })
}

pub fn pr_str(object: &Value, mode: PrintMode) -> String {
    match object {
        Value::Number(n) => n.to_string(),
        Value::Boolean(b) => print_bool(*b),
        Value::String(s) => print_string(s, mode),
        Value::Symbol(s) => s.name().to_string(),
        Value::List(elements) => format!("({})", elements.iter().map(|e| pr_str(e, mode)).join(" ")),
        Value::Pair(pair) => format!("({} . {})", pr_str(&pair.car, mode), pr_str(&pair.cdr, mode)),
        Value::Closure(c) if c.is_macro => match &c.parameters.others {
            Some(Variadic::Named(name)) => format!("#<macro {}>", name),
            _ => String::from("#<macro>"),
        },
        Value::Closure(c) => format!("#<lambda {}>", c.parameters),
        Value::Native(f) => format!("#<native {}>", f.name),
        Value::Nothing => String::from("#<void>"),
    }
}

pub fn pr_expression(expr: &Expression) -> String {
    match expr {
        Expression::Number(n) => n.to_string(),
        Expression::Boolean(b) => print_bool(*b),
        Expression::String(s) => string_repr(s),
        Expression::Symbol(s) => s.name().to_string(),
        Expression::List(elements) => format!("({})", elements.iter().map(pr_expression).join(" ")),
        Expression::Pair(pair) => {
            format!("({} . {})", pr_expression(&pair.car), pr_expression(&pair.cdr))
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", pr_str(self, PrintMode::ReadableRepresentation))
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", pr_expression(self))
    }
}
