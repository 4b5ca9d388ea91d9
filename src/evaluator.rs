use crate::environment::{Environment, Frame, UnknownSymbol};
use crate::special_forms::{self, SpecialForm};
use crate::types::{
    callable, Closure, Expression, NativeProcedure, NotSyntax, TypeMismatch, Value,
    Variadic,
};
use crate::{reader, types};
use itertools::Itertools;
use std::convert::TryFrom;
use std::fmt;
use std::rc::Rc;

pub type Result<T = Value> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    UnknownSymbol(UnknownSymbol),
    EmptyApplication,
    NotCallable(Value),
    UnevaluablePair(Expression),
    If(special_forms::IfError),
    Cond(special_forms::CondError),
    Lambda(special_forms::LambdaError),
    Macro(special_forms::MacroError),
    NotSyntax(Value),
    TypeMismatch(types::TypeMismatch),
    BadArgCount(types::BadArgCount),
    EmptyList(&'static str),
    DivideByZero,
    PreludeDropped,
    ReadError(reader::Error),
    IOError(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownSymbol(e) => write!(f, "{}", e),
            Error::EmptyApplication => write!(f, "cannot evaluate the empty list"),
            Error::NotCallable(obj) => write!(f, "cannot invoke non-function {}", obj),
            Error::UnevaluablePair(pair) => write!(f, "cannot evaluate dotted pair {}", pair),
            Error::If(e) => write!(f, "if: {}", e),
            Error::Cond(e) => write!(f, "cond: {}", e),
            Error::Lambda(e) => write!(f, "lambda: {}", e),
            Error::Macro(e) => write!(f, "macro: {}", e),
            Error::NotSyntax(obj) => write!(f, "{} cannot be evaluated as code", obj),
            Error::TypeMismatch(e) => write!(f, "type mismatch: {}", e),
            Error::BadArgCount(e) => write!(f, "{}", e),
            Error::EmptyList(name) => write!(f, "{}: the list is empty", name),
            Error::DivideByZero => write!(f, "cannot divide by zero!"),
            Error::PreludeDropped => write!(f, "the prelude no longer exists"),
            Error::ReadError(e) => write!(f, "read error: {}", e),
            Error::IOError(e) => write!(f, "io error: {}", e),
        }
    }
}

impl From<types::TypeMismatch> for Error {
    fn from(t: TypeMismatch) -> Self {
        Self::TypeMismatch(t)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::IOError(e)
    }
}

/// Evaluate `expr` in `env`. Nothing is remembered between calls: any state lives in the
/// environment.
pub fn evaluate(expr: &Expression, env: &Rc<dyn Environment>) -> Result {
    log::trace!("evaluate {}", expr);
    match expr {
        Expression::Number(x) => Ok(Value::Number(*x)),
        Expression::Boolean(b) => Ok(Value::Boolean(*b)),
        Expression::String(s) => Ok(Value::String(s.clone())),
        Expression::Symbol(s) => env.lookup(s).map_err(Error::UnknownSymbol),
        Expression::Pair(_) => Err(Error::UnevaluablePair(expr.clone())),
        Expression::List(elements) => match elements.split_first() {
            None => Err(Error::EmptyApplication),
            Some((operator, operands)) => evaluate_application(operator, operands, env),
        },
    }
}

fn evaluate_application(
    operator: &Expression,
    operands: &[Expression],
    env: &Rc<dyn Environment>,
) -> Result {
    if let Some(form) = operator.as_symbol().and_then(SpecialForm::recognise) {
        return special_forms::apply(form, operands, env);
    }
    let procedure = evaluate(operator, env)?;
    match &procedure {
        Value::Closure(f) if f.is_macro => {
            let expansion = expand(f, operands)?;
            evaluate(&expansion, env)
        }
        _ if callable(&procedure) => {
            let args = evaluate_sequence_elementwise(operands, env)?;
            apply(&procedure, &args)
        }
        _ => Err(Error::NotCallable(procedure)),
    }
}

pub fn evaluate_sequence_elementwise(
    seq: &[Expression],
    env: &Rc<dyn Environment>,
) -> Result<Vec<Value>> {
    seq.iter().map(|expr| evaluate(expr, env)).collect()
}

/// Evaluate each expression in turn, giving back the last value.
pub(crate) fn evaluate_body(body: &[Expression], env: &Rc<dyn Environment>) -> Result {
    body.iter()
        .try_fold(Value::Nothing, |_, expr| evaluate(expr, env))
}

/// Call a procedure with already evaluated arguments. A macro applied this way hands back its
/// expansion as data without evaluating it.
pub fn apply(procedure: &Value, args: &[Value]) -> Result {
    match procedure {
        Value::Native(f) => call_native(f, args),
        Value::Closure(f) => call_closure(f, args),
        _ => Err(Error::NotCallable(procedure.clone())),
    }
}

pub(crate) fn pretty_print_args(args: &[Value]) -> String {
    match args.len() {
        0 => "no args".into(),
        1 => args[0].to_string(),
        _ => format!("\n\t{}", args.iter().join("\n\t")),
    }
}

pub fn call_native(func: &NativeProcedure, args: &[Value]) -> Result {
    func.arity
        .validate_for(args.len(), func.name)
        .map_err(Error::BadArgCount)?;
    log::trace!("Call {} with {}", func.name, pretty_print_args(args));
    let result = (func.fn_ptr)(args);
    match &result {
        Ok(val) => log::trace!("Call to {} resulted in {}", func.name, val),
        Err(e) => log::trace!("Call to {} failed: {}", func.name, e),
    }
    result
}

fn call_closure(func: &Closure, args: &[Value]) -> Result {
    let env = make_closure_env(func, args)?;
    evaluate_body(&func.body, &env)
}

fn make_closure_env(func: &Closure, args: &[Value]) -> Result<Rc<dyn Environment>> {
    log::trace!("Call closure {} with {}", func.parameters, pretty_print_args(args));
    func.parameters
        .arity()
        .validate_for(args.len(), "closure")
        .map_err(Error::BadArgCount)?;
    let mut frame = Frame::spawn_from(&func.parent);

    let (positional, rest) = args.split_at(func.parameters.positional.len());
    for (key, value) in func.parameters.positional.iter().zip(positional) {
        frame.bind(key.clone(), value.clone());
    }
    if let Some(Variadic::Named(rest_key)) = &func.parameters.others {
        frame.bind(rest_key.clone(), Value::list(rest.to_vec()));
    }
    log::trace!("bound {}", frame);
    Ok(frame.into_env())
}

/// Run a macro over the unevaluated operands. The result is new syntax for the caller to
/// evaluate; nothing is renamed, so the expansion sees the caller's bindings.
fn expand(mac: &Closure, operands: &[Expression]) -> Result<Expression> {
    let syntax: Vec<Value> = operands.iter().map(Value::from).collect();
    let result = call_closure(mac, &syntax)?;
    let expansion = as_syntax(&result)?;
    log::debug!("macro {} expanded to {}", mac.parameters, expansion);
    Ok(expansion)
}

pub fn as_syntax(value: &Value) -> Result<Expression> {
    Expression::try_from(value).map_err(|NotSyntax(obj)| Error::NotSyntax(obj))
}
