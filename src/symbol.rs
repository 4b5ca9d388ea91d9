use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

thread_local! {
    static INTERNED: RefCell<HashSet<Rc<str>>> = RefCell::new(HashSet::new());
}

/// An interned identifier. Two symbols spelled the same way share one allocation, so equality and
/// hashing only ever look at the pointer.
#[derive(Clone)]
pub struct Symbol(Rc<str>);

impl Symbol {
    pub fn new(name: &str) -> Self {
        INTERNED.with(|table| {
            let mut table = table.borrow_mut();
            if let Some(existing) = table.get(name) {
                return Symbol(existing.clone());
            }
            let fresh: Rc<str> = Rc::from(name);
            table.insert(fresh.clone());
            Symbol(fresh)
        })
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.0.as_ptr() as usize).hash(state)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol::new(s)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.name())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_spelling_shares_identity() {
        let a = Symbol::new("hello");
        let b = Symbol::from("hello");
        assert_eq!(a, b);
        assert!(Rc::ptr_eq(&a.0, &b.0));
    }

    #[test]
    fn different_spelling_differs() {
        assert_ne!(Symbol::new("hello"), Symbol::new("hell"));
    }

    #[test]
    fn usable_as_hash_key() {
        let mut set = HashSet::new();
        set.insert(Symbol::new("x"));
        assert!(set.contains(&Symbol::new("x")));
        assert!(!set.contains(&Symbol::new("y")));
    }
}
