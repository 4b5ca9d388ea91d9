use crate::environment::Environment;
use crate::evaluator::{evaluate as EVAL, evaluate_body, Error, Result};
use crate::symbol::Symbol;
use crate::types::{
    truthy, Arity, BadClosureParameters, Closure, ClosureParameters, Expression, Value,
};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialForm {
    And,
    Or,
    If,
    Cond,
    Lambda,
    Macro,
    Quote,
}

thread_local! {
    static SPECIAL_FORMS: HashMap<Symbol, SpecialForm> = [
        ("and", SpecialForm::And),
        ("or", SpecialForm::Or),
        ("if", SpecialForm::If),
        ("cond", SpecialForm::Cond),
        ("lambda", SpecialForm::Lambda),
        ("macro", SpecialForm::Macro),
        ("quote", SpecialForm::Quote),
    ]
    .iter()
    .map(|&(name, form)| (Symbol::new(name), form))
    .collect();
}

impl SpecialForm {
    /// Special forms are recognised by symbol identity, before any lookup happens.
    pub fn recognise(symbol: &Symbol) -> Option<Self> {
        SPECIAL_FORMS.with(|forms| forms.get(symbol).copied())
    }
}

pub fn apply(form: SpecialForm, args: &[Expression], env: &Rc<dyn Environment>) -> Result {
    log::trace!("special form {:?} with {} operands", form, args.len());
    match form {
        SpecialForm::And => apply_and(args, env),
        SpecialForm::Or => apply_or(args, env),
        SpecialForm::If => apply_if(args, env),
        SpecialForm::Cond => apply_cond(args, env),
        SpecialForm::Lambda => apply_lambda(args, env),
        SpecialForm::Macro => apply_macro(args, env),
        SpecialForm::Quote => apply_quote(args),
    }
}

// `and` and `or` stop at the first operand that decides the answer; later operands are never
// evaluated.
pub fn apply_and(args: &[Expression], env: &Rc<dyn Environment>) -> Result {
    for arg in args {
        if !truthy(&EVAL(arg, env)?) {
            return Ok(Value::Boolean(false));
        }
    }
    Ok(Value::Boolean(true))
}

pub fn apply_or(args: &[Expression], env: &Rc<dyn Environment>) -> Result {
    for arg in args {
        if truthy(&EVAL(arg, env)?) {
            return Ok(Value::Boolean(true));
        }
    }
    Ok(Value::Boolean(false))
}

#[derive(Debug)]
pub enum IfError {
    TooManyClauses(usize),
}

impl fmt::Display for IfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IfError::TooManyClauses(n) => write!(
                f,
                "got {} clauses after the test, expected at most a then and an else clause",
                n
            ),
        }
    }
}

pub fn apply_if(args: &[Expression], env: &Rc<dyn Environment>) -> Result {
    match args {
        [] => Ok(Value::Boolean(false)),
        [condition] => EVAL(condition, env).map(|_| Value::Nothing),
        [condition, then] => match truthy(&EVAL(condition, env)?) {
            true => EVAL(then, env),
            false => Ok(Value::Nothing),
        },
        [condition, then, otherwise] => match truthy(&EVAL(condition, env)?) {
            true => EVAL(then, env),
            false => EVAL(otherwise, env),
        },
        _ => Err(Error::If(IfError::TooManyClauses(args.len() - 1))),
    }
}

#[derive(Debug)]
pub enum CondError {
    NoClauses,
    ClauseNotAList(Expression),
    ClauseTooShort(Expression),
}

impl fmt::Display for CondError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CondError::NoClauses => write!(f, "needs at least one clause"),
            CondError::ClauseNotAList(clause) => write!(f, "clause {} is not a list", clause),
            CondError::ClauseTooShort(clause) => {
                write!(f, "clause {} needs a test and at least one body expression", clause)
            }
        }
    }
}

fn cond_clause(clause: &Expression) -> std::result::Result<&[Expression], CondError> {
    let elements = clause
        .as_list()
        .ok_or_else(|| CondError::ClauseNotAList(clause.clone()))?;
    match elements.len() {
        0 | 1 => Err(CondError::ClauseTooShort(clause.clone())),
        _ => Ok(elements),
    }
}

pub fn apply_cond(args: &[Expression], env: &Rc<dyn Environment>) -> Result {
    if args.is_empty() {
        return Err(Error::Cond(CondError::NoClauses));
    }
    let clauses = args
        .iter()
        .map(cond_clause)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::Cond)?;

    let else_symbol = Symbol::new("else");
    let last = clauses.len() - 1;
    for (i, clause) in clauses.iter().enumerate() {
        let (test, body) = (&clause[0], &clause[1..]);
        let is_else = i == last && test.as_symbol() == Some(&else_symbol);
        if is_else || truthy(&EVAL(test, env)?) {
            return evaluate_body(body, env);
        }
    }
    Ok(Value::Nothing)
}

#[derive(Debug)]
pub enum LambdaError {
    WrongArgCount(usize),
    ParametersNotGivenAsList,
    ParameterNotASymbol(Expression),
    BadVariadic(BadClosureParameters),
}

impl fmt::Display for LambdaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LambdaError::WrongArgCount(n) => write!(
                f,
                "expected a parameter list and at least one body expression, got {} operands",
                n
            ),
            LambdaError::ParametersNotGivenAsList => write!(f, "parameters must be a list"),
            LambdaError::ParameterNotASymbol(p) => write!(f, "parameter {} is not a symbol", p),
            LambdaError::BadVariadic(e) => write!(f, "{}", e),
        }
    }
}

pub fn apply_lambda(args: &[Expression], env: &Rc<dyn Environment>) -> Result {
    // A parameter list, then one or more body expressions.
    let (parameters, body) = match args.split_first() {
        Some((parameters, body)) if !body.is_empty() => (parameters, body),
        _ => return Err(Error::Lambda(LambdaError::WrongArgCount(args.len()))),
    };
    let parameters = parameters
        .as_list()
        .ok_or(LambdaError::ParametersNotGivenAsList)
        .map_err(Error::Lambda)?;
    let extract_symbol = |obj: &Expression| match obj {
        Expression::Symbol(s) => Ok(s.clone()),
        _ => Err(LambdaError::ParameterNotASymbol(obj.clone())),
    };
    let parameters = parameters
        .iter()
        .map(extract_symbol)
        .collect::<std::result::Result<Vec<Symbol>, _>>()
        .map_err(Error::Lambda)?;

    let closure = Closure {
        parameters: ClosureParameters::new(parameters)
            .map_err(|e| Error::Lambda(LambdaError::BadVariadic(e)))?,
        body: Rc::from(body),
        parent: env.clone(),
        is_macro: false,
    };
    log::debug!("lambda {}", closure.parameters);
    Ok(Value::Closure(Rc::new(closure)))
}

#[derive(Debug)]
pub enum MacroError {
    WrongArgCount(usize),
    ParameterNotASymbol(Expression),
}

impl fmt::Display for MacroError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacroError::WrongArgCount(n) => write!(
                f,
                "expected exactly one parameter and one body expression, got {} operands",
                n
            ),
            MacroError::ParameterNotASymbol(p) => write!(f, "parameter {} is not a symbol", p),
        }
    }
}

pub fn apply_macro(args: &[Expression], env: &Rc<dyn Environment>) -> Result {
    let (parameter, body) = match args {
        [parameter, body] => (parameter, body),
        _ => return Err(Error::Macro(MacroError::WrongArgCount(args.len()))),
    };
    let parameter = parameter
        .as_symbol()
        .ok_or_else(|| Error::Macro(MacroError::ParameterNotASymbol(parameter.clone())))?;
    let closure = Closure {
        parameters: ClosureParameters::collecting(parameter.clone()),
        body: Rc::from(vec![body.clone()]),
        parent: env.clone(),
        is_macro: true,
    };
    log::debug!("macro {}", parameter);
    Ok(Value::Closure(Rc::new(closure)))
}

pub fn apply_quote(args: &[Expression]) -> Result {
    Arity::exactly(1)
        .validate_for(args.len(), "quote")
        .map_err(Error::BadArgCount)?;
    Ok(Value::from(&args[0]))
}
