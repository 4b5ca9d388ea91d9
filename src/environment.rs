use crate::symbol::Symbol;
use crate::types::Value;
use crate::{core, evaluator, reader, types};
use itertools::Itertools;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

#[derive(Debug, Clone)]
pub struct UnknownSymbol(pub Symbol);

impl fmt::Display for UnknownSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' not found", self.0)
    }
}

/// Resolves symbols to values. This is all the evaluator ever asks of its surroundings, so the
/// prelude, a closure's call frame and a plain function are interchangeable.
pub trait Environment {
    fn lookup(&self, symbol: &Symbol) -> Result<Value, UnknownSymbol>;
}

/// Lets any `Fn(&Symbol) -> Option<Value>` act as an environment.
pub struct FnEnvironment<F>(pub F);

impl<F> Environment for FnEnvironment<F>
where
    F: Fn(&Symbol) -> Option<Value>,
{
    fn lookup(&self, symbol: &Symbol) -> Result<Value, UnknownSymbol> {
        (self.0)(symbol).ok_or_else(|| UnknownSymbol(symbol.clone()))
    }
}

pub fn from_fn<F>(f: F) -> Rc<dyn Environment>
where
    F: Fn(&Symbol) -> Option<Value> + 'static,
{
    Rc::new(FnEnvironment(f))
}

/// Bindings laid over a parent environment. The parent is shared, never copied or modified: lookups
/// that miss here fall through to it.
pub struct Frame {
    bindings: HashMap<Symbol, Value>,
    parent: Rc<dyn Environment>,
}

impl Frame {
    pub fn spawn_from(parent: &Rc<dyn Environment>) -> Self {
        Self {
            bindings: HashMap::new(),
            parent: parent.clone(),
        }
    }

    pub fn bind(&mut self, key: Symbol, value: Value) {
        self.bindings.insert(key, value);
    }

    pub fn into_env(self) -> Rc<dyn Environment> {
        Rc::new(self)
    }
}

impl Environment for Frame {
    fn lookup(&self, symbol: &Symbol) -> Result<Value, UnknownSymbol> {
        match self.bindings.get(symbol) {
            Some(value) => Ok(value.clone()),
            None => self.parent.lookup(symbol),
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys = self.bindings.keys().map(Symbol::name).sorted().join(", ");
        write!(f, "Frame{{{}}} -> parent", keys)
    }
}

/// The root environment: every native procedure plus whatever `define` has added since. The table
/// belongs to the prelude; the evaluator only ever reads it through `lookup`.
pub struct Prelude {
    table: RefCell<HashMap<Symbol, Value>>,
}

impl Prelude {
    pub fn new() -> Rc<Self> {
        let prelude = Rc::new(Self::empty());
        for native in core::natives() {
            prelude.define(Symbol::new(native.name), Value::Native(Rc::new(native)));
        }
        add_eval(&prelude);
        prelude
    }

    /// A prelude with no bindings at all.
    pub fn empty() -> Self {
        Self {
            table: RefCell::new(HashMap::new()),
        }
    }

    pub fn define(&self, key: Symbol, value: Value) -> Option<Value> {
        log::debug!("define {} as {}", key, value);
        self.table.borrow_mut().insert(key, value)
    }

    pub fn as_env(self: &Rc<Self>) -> Rc<dyn Environment> {
        self.clone()
    }
}

impl Environment for Prelude {
    fn lookup(&self, symbol: &Symbol) -> Result<Value, UnknownSymbol> {
        self.table
            .borrow()
            .get(symbol)
            .cloned()
            .ok_or_else(|| UnknownSymbol(symbol.clone()))
    }
}

fn upgrade(prelude: &Weak<Prelude>) -> evaluator::Result<Rc<Prelude>> {
    prelude.upgrade().ok_or(evaluator::Error::PreludeDropped)
}

/// The natives that need the prelude itself: `define`, `eval` and `load`. They hold it weakly so
/// the prelude's table does not keep itself alive.
fn add_eval(prelude: &Rc<Prelude>) {
    let weak = Rc::downgrade(prelude);
    prelude.define(
        Symbol::new("define"),
        Value::native("define", types::Arity::exactly(2), move |args| {
            let prelude = upgrade(&weak)?;
            let key = args[0].as_symbol()?.clone();
            prelude.define(key, args[1].clone());
            Ok(args[1].clone())
        }),
    );

    let weak = Rc::downgrade(prelude);
    prelude.define(
        Symbol::new("eval"),
        Value::native("eval", types::Arity::exactly(1), move |args| {
            let prelude = upgrade(&weak)?;
            let expr = evaluator::as_syntax(&args[0])?;
            log::info!("Call to evaluate with {}", expr);
            evaluator::evaluate(&expr, &prelude.as_env())
        }),
    );

    let weak = Rc::downgrade(prelude);
    prelude.define(
        Symbol::new("load"),
        Value::native("load", types::Arity::exactly(1), move |args| {
            let prelude = upgrade(&weak)?;
            let path = args[0].as_string()?;
            load_file(path, &prelude)
        }),
    );
}

/// Evaluate every form in the file at `path`, returning the value of the last one.
pub fn load_file(path: &str, prelude: &Rc<Prelude>) -> evaluator::Result {
    log::info!("loading {}", path);
    let source = std::fs::read_to_string(path)?;
    let env = prelude.as_env();
    let forms = reader::read_all(&source).map_err(evaluator::Error::ReadError)?;
    forms
        .iter()
        .try_fold(Value::Nothing, |_, form| evaluator::evaluate(form, &env))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_shadows_without_touching_parent() {
        let prelude = Rc::new(Prelude::empty());
        prelude.define(Symbol::new("x"), Value::Number(1.0));
        prelude.define(Symbol::new("y"), Value::Number(2.0));
        let root = prelude.as_env();

        let mut frame = Frame::spawn_from(&root);
        frame.bind(Symbol::new("x"), Value::Number(10.0));
        let frame = frame.into_env();

        assert_eq!(frame.lookup(&Symbol::new("x")).unwrap(), Value::Number(10.0));
        assert_eq!(frame.lookup(&Symbol::new("y")).unwrap(), Value::Number(2.0));
        assert_eq!(root.lookup(&Symbol::new("x")).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn frames_nest() {
        let root = from_fn(|s: &Symbol| match s.name() {
            "base" => Some(Value::Number(0.0)),
            _ => None,
        });
        let mut middle = Frame::spawn_from(&root);
        middle.bind(Symbol::new("a"), Value::Number(1.0));
        let middle = middle.into_env();
        let mut inner = Frame::spawn_from(&middle);
        inner.bind(Symbol::new("b"), Value::Number(2.0));
        let inner = inner.into_env();

        for (name, expected) in &[("base", 0.0), ("a", 1.0), ("b", 2.0)] {
            assert_eq!(
                inner.lookup(&Symbol::new(name)).unwrap(),
                Value::Number(*expected)
            );
        }
        assert!(middle.lookup(&Symbol::new("b")).is_err());
    }

    #[test]
    fn unknown_symbols_fail() {
        let prelude = Prelude::new();
        let err = prelude.lookup(&Symbol::new("no-such-thing")).unwrap_err();
        assert_eq!(err.0, Symbol::new("no-such-thing"));
        assert_eq!(err.to_string(), "'no-such-thing' not found");
    }

    #[test]
    fn prelude_has_natives_and_define() {
        let prelude = Prelude::new();
        assert!(matches!(
            prelude.lookup(&Symbol::new("+")),
            Ok(Value::Native(_))
        ));
        assert!(matches!(
            prelude.lookup(&Symbol::new("define")),
            Ok(Value::Native(_))
        ));
        prelude.define(Symbol::new("answer"), Value::Number(42.0));
        assert_eq!(
            prelude.lookup(&Symbol::new("answer")).unwrap(),
            Value::Number(42.0)
        );
    }
}
