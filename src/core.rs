use crate::evaluator;
use crate::printer::{self, PrintMode};
use crate::reader;
use crate::types::{callable, Arity, NativeProcedure, TypeMismatch, Value};
use itertools::Itertools;
use std::io::Write;

/// A native procedure that needs nothing but its arguments.
struct PrimitiveFn {
    name: &'static str,
    arity: Arity,
    fn_ptr: fn(&[Value]) -> evaluator::Result,
}

fn grab_numbers(args: &[Value]) -> evaluator::Result<Vec<f64>> {
    let type_check: Result<Vec<_>, _> = args.iter().map(|o| o.as_number()).collect();
    type_check.map_err(evaluator::Error::TypeMismatch)
}

const SUM: PrimitiveFn = PrimitiveFn {
    name: "+",
    fn_ptr: sum_,
    arity: Arity::AtLeast(0..),
};

fn sum_(args: &[Value]) -> evaluator::Result {
    let value = grab_numbers(args)?.iter().sum();
    Ok(Value::Number(value))
}

const SUB: PrimitiveFn = PrimitiveFn {
    name: "-",
    fn_ptr: sub_,
    arity: Arity::at_least(1),
};

fn sub_(args: &[Value]) -> evaluator::Result {
    match grab_numbers(args)?.as_slice() {
        [x] => Ok(Value::Number(-x)),
        [first, rest @ ..] => Ok(Value::Number(rest.iter().fold(*first, |acc, x| acc - x))),
        [] => unreachable!(),
    }
}

const MUL: PrimitiveFn = PrimitiveFn {
    name: "*",
    fn_ptr: mul_,
    arity: Arity::AtLeast(0..),
};

fn mul_(args: &[Value]) -> evaluator::Result {
    let value = grab_numbers(args)?.iter().product();
    Ok(Value::Number(value))
}

const DIV: PrimitiveFn = PrimitiveFn {
    name: "/",
    fn_ptr: div_,
    arity: Arity::at_least(1),
};

fn div_(args: &[Value]) -> evaluator::Result {
    let numbers = grab_numbers(args)?;
    let (first, divisors) = match numbers.as_slice() {
        [x] => (1.0, std::slice::from_ref(x)),
        [first, rest @ ..] => (*first, rest),
        [] => unreachable!(),
    };
    if divisors.contains(&0.0) {
        return Err(evaluator::Error::DivideByZero);
    }
    Ok(Value::Number(divisors.iter().fold(first, |acc, x| acc / x)))
}

fn comparison_(args: &[Value], comp: fn(&f64, &f64) -> bool) -> evaluator::Result {
    match grab_numbers(args)?.as_slice() {
        [x, y] => Ok(Value::Boolean(comp(x, y))),
        _ => unreachable!(),
    }
}

macro_rules! comparison_primitive {
    ($SYMBOL:tt, $NAME:ident) => {
        paste::item! {
            const $NAME: PrimitiveFn = PrimitiveFn {
                name: stringify!($SYMBOL),
                fn_ptr: |args: &[Value]| comparison_(args, f64:: [<$NAME:lower>]),
                arity: Arity::exactly(2),
            };
        }
    };
}

comparison_primitive!(<, LT);
comparison_primitive!(<=, LE);
comparison_primitive!(>, GT);
comparison_primitive!(>=, GE);

const EQUAL: PrimitiveFn = PrimitiveFn {
    name: "=",
    fn_ptr: |args| Ok(Value::Boolean(args[0] == args[1])),
    arity: Arity::exactly(2),
};

const NOT: PrimitiveFn = PrimitiveFn {
    name: "not",
    fn_ptr: |args| Ok(Value::Boolean(matches!(args[0], Value::Boolean(false)))),
    arity: Arity::exactly(1),
};

macro_rules! type_predicate {
    ($NAME:ident, $SYMBOL:expr, $PATTERN:pat) => {
        const $NAME: PrimitiveFn = PrimitiveFn {
            name: $SYMBOL,
            fn_ptr: |args| Ok(Value::Boolean(matches!(args[0], $PATTERN))),
            arity: Arity::exactly(1),
        };
    };
}

type_predicate!(NUMBER_TEST, "number?", Value::Number(_));
type_predicate!(BOOLEAN_TEST, "boolean?", Value::Boolean(_));
type_predicate!(STRING_TEST, "string?", Value::String(_));
type_predicate!(SYMBOL_TEST, "symbol?", Value::Symbol(_));
type_predicate!(LIST_TEST, "list?", Value::List(_));

const PAIR_TEST: PrimitiveFn = PrimitiveFn {
    name: "pair?",
    fn_ptr: |args| {
        Ok(Value::Boolean(match &args[0] {
            Value::Pair(_) => true,
            Value::List(elements) => !elements.is_empty(),
            _ => false,
        }))
    },
    arity: Arity::exactly(1),
};

const NULL_TEST: PrimitiveFn = PrimitiveFn {
    name: "null?",
    fn_ptr: |args| {
        Ok(Value::Boolean(match &args[0] {
            Value::List(elements) => elements.is_empty(),
            _ => false,
        }))
    },
    arity: Arity::exactly(1),
};

const PROCEDURE_TEST: PrimitiveFn = PrimitiveFn {
    name: "procedure?",
    fn_ptr: |args| Ok(Value::Boolean(callable(&args[0]))),
    arity: Arity::exactly(1),
};

const LIST: PrimitiveFn = PrimitiveFn {
    name: "list",
    fn_ptr: |args| Ok(Value::list(args.to_vec())),
    arity: Arity::at_least(0),
};

const CONS: PrimitiveFn = PrimitiveFn {
    name: "cons",
    fn_ptr: cons_,
    arity: Arity::exactly(2),
};

fn cons_(args: &[Value]) -> evaluator::Result {
    match &args[1] {
        Value::List(tail) => {
            let mut elements = Vec::with_capacity(tail.len() + 1);
            elements.push(args[0].clone());
            elements.extend(tail.iter().cloned());
            Ok(Value::list(elements))
        }
        other => Ok(Value::pair(args[0].clone(), other.clone())),
    }
}

const CAR: PrimitiveFn = PrimitiveFn {
    name: "car",
    fn_ptr: car_,
    arity: Arity::exactly(1),
};

fn car_(args: &[Value]) -> evaluator::Result {
    match &args[0] {
        Value::Pair(pair) => Ok(pair.car.clone()),
        other => other
            .as_list()?
            .first()
            .cloned()
            .ok_or(evaluator::Error::EmptyList("car")),
    }
}

const CDR: PrimitiveFn = PrimitiveFn {
    name: "cdr",
    fn_ptr: cdr_,
    arity: Arity::exactly(1),
};

fn cdr_(args: &[Value]) -> evaluator::Result {
    match &args[0] {
        Value::Pair(pair) => Ok(pair.cdr.clone()),
        other => match other.as_list()? {
            [] => Err(evaluator::Error::EmptyList("cdr")),
            [_, rest @ ..] => Ok(Value::list(rest.to_vec())),
        },
    }
}

const LENGTH: PrimitiveFn = PrimitiveFn {
    name: "length",
    fn_ptr: |args| Ok(Value::Number(args[0].as_list()?.len() as f64)),
    arity: Arity::exactly(1),
};

const APPEND: PrimitiveFn = PrimitiveFn {
    name: "append",
    fn_ptr: append_,
    arity: Arity::at_least(0),
};

fn append_(args: &[Value]) -> evaluator::Result {
    let mut elements = Vec::new();
    for arg in args {
        elements.extend(arg.as_list()?.iter().cloned());
    }
    Ok(Value::list(elements))
}

const APPLY: PrimitiveFn = PrimitiveFn {
    name: "apply",
    fn_ptr: |args| evaluator::apply(&args[0], args[1].as_list()?),
    arity: Arity::exactly(2),
};

const MAP: PrimitiveFn = PrimitiveFn {
    name: "map",
    fn_ptr: map_,
    arity: Arity::exactly(2),
};

fn map_(args: &[Value]) -> evaluator::Result {
    if !callable(&args[0]) {
        return Err(TypeMismatch::NotCallable.into());
    }
    let mapped: evaluator::Result<Vec<Value>> = args[1]
        .as_list()?
        .iter()
        .map(|arg| evaluator::apply(&args[0], std::slice::from_ref(arg)))
        .collect();
    mapped.map(Value::list)
}

fn print_string_internal(args: &[Value], mode: PrintMode, sep: &'static str) -> String {
    args.iter().map(|arg| printer::pr_str(arg, mode)).join(sep)
}

const PRINT: PrimitiveFn = PrimitiveFn {
    name: "print",
    fn_ptr: |args| {
        println!("{}", print_string_internal(args, PrintMode::Directly, " "));
        Ok(Value::Nothing)
    },
    arity: Arity::at_least(0),
};

const DISPLAY: PrimitiveFn = PrimitiveFn {
    name: "display",
    fn_ptr: display_,
    arity: Arity::exactly(1),
};

fn display_(args: &[Value]) -> evaluator::Result {
    let mut stdout = std::io::stdout();
    write!(stdout, "{}", printer::pr_str(&args[0], PrintMode::Directly))?;
    stdout.flush()?;
    Ok(Value::Nothing)
}

const STR: PrimitiveFn = PrimitiveFn {
    name: "str",
    fn_ptr: |args| Ok(Value::string(&print_string_internal(args, PrintMode::Directly, ""))),
    arity: Arity::at_least(0),
};

const READ: PrimitiveFn = PrimitiveFn {
    name: "read",
    fn_ptr: read_,
    arity: Arity::exactly(1),
};

fn read_(args: &[Value]) -> evaluator::Result {
    let text = args[0].as_string()?;
    match reader::read_str(text).map_err(evaluator::Error::ReadError)? {
        Some(expr) => Ok(Value::from(&expr)),
        None => Ok(Value::Nothing),
    }
}

const CORE: &[PrimitiveFn] = &[
    SUM,
    SUB,
    MUL,
    DIV,
    LT,
    LE,
    GT,
    GE,
    EQUAL,
    NOT,
    NUMBER_TEST,
    BOOLEAN_TEST,
    STRING_TEST,
    SYMBOL_TEST,
    LIST_TEST,
    PAIR_TEST,
    NULL_TEST,
    PROCEDURE_TEST,
    LIST,
    CONS,
    CAR,
    CDR,
    LENGTH,
    APPEND,
    APPLY,
    MAP,
    PRINT,
    DISPLAY,
    STR,
    READ,
];

/// Every native procedure that does not need the prelude itself.
pub(crate) fn natives() -> Vec<NativeProcedure> {
    CORE.iter()
        .map(|p| NativeProcedure::new(p.name, p.arity.clone(), p.fn_ptr))
        .collect()
}
