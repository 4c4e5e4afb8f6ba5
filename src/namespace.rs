use std::{cell::RefCell, rc::Rc};

use indexmap::IndexMap;

use crate::value::Value;

pub type NamespaceRef = Rc<RefCell<Namespace>>;

/// A name → value mapping with an optional parent. The session's root
/// namespace is one of these with no parent; function calls chain child
/// scopes off the namespace the function captured. Shared by reference:
/// every evaluator and loader in a session sees the same bindings.
#[derive(Debug, Default)]
pub struct Namespace {
    parent: Option<NamespaceRef>,
    bindings: IndexMap<String, Value>,
}

impl Namespace {
    pub fn root() -> NamespaceRef {
        Rc::new(RefCell::new(Self::default()))
    }

    pub fn child_of(parent: &NamespaceRef) -> NamespaceRef {
        Rc::new(RefCell::new(Self {
            parent: Some(Rc::clone(parent)),
            bindings: IndexMap::new(),
        }))
    }

    /// Bind in this scope exactly, shadowing anything up the chain.
    /// Used for parameters and other scope-local names.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    /// Define-or-update: if `name` is bound anywhere up the chain the
    /// nearest such binding is overwritten, otherwise the name is defined
    /// in `ns` itself. Later writes always win.
    pub fn bind(ns: &NamespaceRef, name: &str, value: Value) {
        let mut current = Rc::clone(ns);
        loop {
            if current.borrow().bindings.contains_key(name) {
                current
                    .borrow_mut()
                    .bindings
                    .insert(name.to_string(), value);
                return;
            }
            let parent = current.borrow().parent.clone();
            match parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        ns.borrow_mut().define(name, value);
    }

    pub fn lookup(ns: &NamespaceRef, name: &str) -> Option<Value> {
        let mut current = Rc::clone(ns);
        loop {
            if let Some(value) = current.borrow().bindings.get(name) {
                return Some(value.clone());
            }
            let parent = current.borrow().parent.clone();
            match parent {
                Some(parent) => current = parent,
                None => return None,
            }
        }
    }

    /// Remove a binding from this scope only. Returns the removed value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.bindings.shift_remove(name)
    }

    /// Names bound directly in this scope, in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.bindings.keys().cloned().collect()
    }
}
