use crate::environment::Environment;
use crate::evaluator;
use crate::symbol::Symbol;
use itertools::Itertools;
use std::convert::TryFrom;
use std::fmt;
use std::fmt::Formatter;
use std::ops::{RangeFrom, RangeInclusive};
use std::rc::Rc;

/// The syntax tree produced by the reader. Never mutated once built; the evaluator only reads it.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Number(f64),
    Boolean(bool),
    String(Rc<str>),
    Symbol(Symbol),
    List(Rc<[Expression]>),
    /// Only ever produced by dotted pair syntax whose tail is not a list.
    Pair(Rc<Pair<Expression>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pair<T> {
    pub car: T,
    pub cdr: T,
}

impl Expression {
    pub fn list(elements: Vec<Expression>) -> Self {
        Self::List(Rc::from(elements))
    }

    pub fn empty_list() -> Self {
        Self::list(Vec::new())
    }

    pub fn pair(car: Expression, cdr: Expression) -> Self {
        Self::Pair(Rc::new(Pair { car, cdr }))
    }

    pub fn symbol(name: &str) -> Self {
        Self::Symbol(Symbol::new(name))
    }

    pub fn string(text: &str) -> Self {
        Self::String(Rc::from(text))
    }

    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            Expression::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Expression]> {
        match self {
            Expression::List(elements) => Some(elements),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Arity {
    Between(RangeInclusive<usize>),
    AtLeast(RangeFrom<usize>),
}

#[derive(Debug)]
pub struct BadArgCount {
    name: String,
    expected: Arity,
    got: usize,
}

impl fmt::Display for BadArgCount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "When evaluating {} expected {} arguments, but received {} arguments",
            self.name, self.expected, self.got
        )
    }
}

impl Arity {
    pub const fn exactly(n: usize) -> Self {
        Self::Between(n..=n)
    }

    pub const fn at_least(n: usize) -> Self {
        Self::AtLeast(n..)
    }

    pub fn contains(&self, n: usize) -> bool {
        match self {
            Self::Between(range) => range.contains(&n),
            Self::AtLeast(range) => range.contains(&n),
        }
    }

    pub fn validate_for(&self, n: usize, name: &str) -> Result<(), BadArgCount> {
        match self.contains(n) {
            true => Ok(()),
            false => Err(BadArgCount {
                name: name.to_string(),
                expected: self.clone(),
                got: n,
            }),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Between(r) => {
                if r.start() == r.end() {
                    write!(f, "exactly {}", r.start())
                } else {
                    write!(f, "from {} to {}", r.start(), r.end())
                }
            }
            Arity::AtLeast(r) => write!(f, "at least {}", r.start),
        }
    }
}

pub type NativeFn = dyn Fn(&[Value]) -> evaluator::Result;

pub struct NativeProcedure {
    pub name: &'static str,
    pub arity: Arity,
    pub fn_ptr: Box<NativeFn>,
}

impl NativeProcedure {
    pub fn new<F>(name: &'static str, arity: Arity, f: F) -> Self
    where
        F: Fn(&[Value]) -> evaluator::Result + 'static,
    {
        Self {
            name,
            arity,
            fn_ptr: Box::new(f),
        }
    }
}

impl fmt::Debug for NativeProcedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "native procedure #<{}>", self.name)
    }
}

/// The parameter after the fixed ones, written `...name`. A bare `...` accepts any number of
/// trailing arguments without binding them.
#[derive(Clone, Debug, PartialEq)]
pub enum Variadic {
    Named(Symbol),
    Sink,
}

pub const VARIADIC_PREFIX: &str = "...";

#[derive(Clone, Debug)]
pub struct ClosureParameters {
    pub positional: Vec<Symbol>,
    pub others: Option<Variadic>,
}

impl fmt::Display for ClosureParameters {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.positional.iter().join(" "))?;
        match &self.others {
            Some(Variadic::Named(rest)) if self.positional.is_empty() => {
                write!(f, "{}{}", VARIADIC_PREFIX, rest)?
            }
            Some(Variadic::Named(rest)) => write!(f, " {}{}", VARIADIC_PREFIX, rest)?,
            Some(Variadic::Sink) if self.positional.is_empty() => write!(f, "{}", VARIADIC_PREFIX)?,
            Some(Variadic::Sink) => write!(f, " {}", VARIADIC_PREFIX)?,
            None => (),
        }
        write!(f, ")")
    }
}

#[derive(Debug)]
pub enum BadClosureParameters {
    TooManyVariadics(usize),
    VariadicNotLast,
}

impl fmt::Display for BadClosureParameters {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BadClosureParameters::TooManyVariadics(n) => {
                write!(f, "{} rest parameters given, at most one is allowed", n)
            }
            BadClosureParameters::VariadicNotLast => {
                write!(f, "the rest parameter must come last")
            }
        }
    }
}

impl ClosureParameters {
    pub fn new(mut symbols: Vec<Symbol>) -> Result<Self, BadClosureParameters> {
        let is_variadic = |s: &&Symbol| s.name().starts_with(VARIADIC_PREFIX);
        let variadic_count = symbols.iter().filter(is_variadic).count();

        match variadic_count {
            0 => Ok(ClosureParameters {
                positional: symbols,
                others: None,
            }),
            1 => {
                if !symbols.last().map_or(false, |last| is_variadic(&last)) {
                    return Err(BadClosureParameters::VariadicNotLast);
                }
                let marker = symbols.pop();
                let others = match marker.as_ref().map(|s| &s.name()[VARIADIC_PREFIX.len()..]) {
                    Some("") | None => Variadic::Sink,
                    Some(name) => Variadic::Named(Symbol::new(name)),
                };
                Ok(ClosureParameters {
                    positional: symbols,
                    others: Some(others),
                })
            }
            _ => Err(BadClosureParameters::TooManyVariadics(variadic_count)),
        }
    }

    /// Every argument lands in one list bound to `name`.
    pub fn collecting(name: Symbol) -> Self {
        ClosureParameters {
            positional: Vec::new(),
            others: Some(Variadic::Named(name)),
        }
    }

    pub fn arity(&self) -> Arity {
        match self.others {
            None => Arity::exactly(self.positional.len()),
            Some(_) => Arity::at_least(self.positional.len()),
        }
    }
}

#[derive(Clone)]
pub struct Closure {
    pub parameters: ClosureParameters,
    pub body: Rc<[Expression]>,
    pub parent: Rc<dyn Environment>,
    pub is_macro: bool,
}

impl fmt::Debug for Closure {
    // Not derived because we want to skip the parent: the parent may well contain this Closure!
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Closure{{parameters: {:?}, body: {:?}, is_macro: {:?}}}",
            self.parameters, self.body, self.is_macro
        )
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    Boolean(bool),
    String(Rc<str>),
    Symbol(Symbol),
    List(Rc<[Value]>),
    Pair(Rc<Pair<Value>>),
    Closure(Rc<Closure>),
    Native(Rc<NativeProcedure>),
    /// What `if` and `cond` produce when no branch was taken.
    Nothing,
}

/// Only `#f` is false; every other value, the empty list and no-value included, counts as true.
pub(crate) fn truthy(obj: &Value) -> bool {
    !matches!(obj, Value::Boolean(false))
}

pub(crate) fn callable(obj: &Value) -> bool {
    use Value::*;
    match obj {
        Closure(_) | Native(_) => true,
        Number(_) | Boolean(_) | String(_) | Symbol(_) | List(_) | Pair(_) | Nothing => false,
    }
}

#[derive(Debug)]
pub enum TypeMismatch {
    NotANumber,
    NotAList,
    NotASymbol,
    NotAString,
    NotCallable,
}

impl fmt::Display for TypeMismatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let expected = match self {
            TypeMismatch::NotANumber => "a number",
            TypeMismatch::NotAList => "a list",
            TypeMismatch::NotASymbol => "a symbol",
            TypeMismatch::NotAString => "a string",
            TypeMismatch::NotCallable => "a procedure",
        };
        write!(f, "expected {}", expected)
    }
}

impl Value {
    pub fn list(elements: Vec<Value>) -> Self {
        Self::List(Rc::from(elements))
    }

    pub fn empty_list() -> Self {
        Self::list(Vec::new())
    }

    pub fn pair(car: Value, cdr: Value) -> Self {
        Self::Pair(Rc::new(Pair { car, cdr }))
    }

    pub fn string(text: &str) -> Self {
        Self::String(Rc::from(text))
    }

    pub fn symbol(name: &str) -> Self {
        Self::Symbol(Symbol::new(name))
    }

    pub fn native<F>(name: &'static str, arity: Arity, f: F) -> Self
    where
        F: Fn(&[Value]) -> evaluator::Result + 'static,
    {
        Self::Native(Rc::new(NativeProcedure::new(name, arity, f)))
    }

    pub(crate) fn as_number(&self) -> Result<f64, TypeMismatch> {
        match self {
            Value::Number(x) => Ok(*x),
            _ => Err(TypeMismatch::NotANumber),
        }
    }

    pub(crate) fn as_list(&self) -> Result<&[Value], TypeMismatch> {
        match self {
            Value::List(x) => Ok(x),
            _ => Err(TypeMismatch::NotAList),
        }
    }

    pub(crate) fn as_symbol(&self) -> Result<&Symbol, TypeMismatch> {
        match self {
            Value::Symbol(s) => Ok(s),
            _ => Err(TypeMismatch::NotASymbol),
        }
    }

    pub(crate) fn as_string(&self) -> Result<&str, TypeMismatch> {
        match self {
            Value::String(s) => Ok(s),
            _ => Err(TypeMismatch::NotAString),
        }
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, Value::Nothing)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Number(x), Number(y)) => x == y,
            (Boolean(x), Boolean(y)) => x == y,
            (String(x), String(y)) => x == y,
            (Symbol(x), Symbol(y)) => x == y,
            (List(xs), List(ys)) => xs == ys,
            (Pair(x), Pair(y)) => x == y,
            (Closure(x), Closure(y)) => Rc::ptr_eq(x, y),
            (Native(x), Native(y)) => Rc::ptr_eq(x, y),
            (Nothing, Nothing) => true,
            _ => false,
        }
    }
}

/// Quoting: syntax becomes data unchanged.
impl From<&Expression> for Value {
    fn from(expr: &Expression) -> Self {
        match expr {
            Expression::Number(x) => Value::Number(*x),
            Expression::Boolean(b) => Value::Boolean(*b),
            Expression::String(s) => Value::String(s.clone()),
            Expression::Symbol(s) => Value::Symbol(s.clone()),
            Expression::List(elements) => Value::List(elements.iter().map(Value::from).collect()),
            Expression::Pair(pair) => Value::pair(Value::from(&pair.car), Value::from(&pair.cdr)),
        }
    }
}

/// A value that has no written form and so cannot be turned back into code.
#[derive(Debug)]
pub struct NotSyntax(pub Value);

/// Data becomes syntax again; this is how a macro's result gets evaluated.
impl TryFrom<&Value> for Expression {
    type Error = NotSyntax;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Number(x) => Ok(Expression::Number(*x)),
            Value::Boolean(b) => Ok(Expression::Boolean(*b)),
            Value::String(s) => Ok(Expression::String(s.clone())),
            Value::Symbol(s) => Ok(Expression::Symbol(s.clone())),
            Value::List(elements) => elements
                .iter()
                .map(Expression::try_from)
                .collect::<Result<Rc<[Expression]>, _>>()
                .map(Expression::List),
            Value::Pair(pair) => Ok(Expression::pair(
                Expression::try_from(&pair.car)?,
                Expression::try_from(&pair.cdr)?,
            )),
            Value::Closure(_) | Value::Native(_) | Value::Nothing => Err(NotSyntax(value.clone())),
        }
    }
}
