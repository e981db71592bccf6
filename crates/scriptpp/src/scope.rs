//! Lexical environments, activation frames, and the l-value machinery
//! that ties identifiers to bindings.
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::exception::{ExcType, ExceptionValue};
use crate::object::DynamicObject;
use crate::span::Span;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    None,
    Proxy,
    Module,
    Function,
    Iteration,
    Program,
}

/// A plain lexical frame: Program/Module/Function/Iteration/None-kind
/// scopes that are not themselves a `DynamicObject`.
pub struct FrameScope {
    pub kind: ScopeKind,
    pub outer: Option<ScopeLink>,
    pub bindings: RefCell<IndexMap<Rc<str>, Value>>,
    /// Set only on the call-site wrapper placed around the caller's scope;
    /// carries the span used to build stack traces.
    pub call_span: Option<(Rc<str>, Span)>,
}

/// Every reachable scope participant, held either strongly or weakly.
#[derive(Clone)]
pub enum ScopeLink {
    Strong(AnyScope),
    Weak(WeakAnyScope),
}

impl ScopeLink {
    pub fn resolve(&self) -> Option<AnyScope> {
        match self {
            ScopeLink::Strong(s) => Some(s.clone()),
            ScopeLink::Weak(w) => w.upgrade(),
        }
    }
}

#[derive(Clone)]
pub enum WeakAnyScope {
    Frame(Weak<FrameScope>),
    Object(Weak<DynamicObject>),
}

impl WeakAnyScope {
    pub fn upgrade(&self) -> Option<AnyScope> {
        match self {
            WeakAnyScope::Frame(w) => w.upgrade().map(AnyScope::Frame),
            WeakAnyScope::Object(w) => w.upgrade().map(AnyScope::Object),
        }
    }
}

/// Anything that participates in the scope chain: a lexical frame, or a
/// `DynamicObject` acting as a scope (modules, prototypes, instances).
#[derive(Clone)]
pub enum AnyScope {
    Frame(Rc<FrameScope>),
    Object(Rc<DynamicObject>),
}

impl AnyScope {
    pub fn new_frame(kind: ScopeKind, outer: Option<ScopeLink>) -> AnyScope {
        AnyScope::Frame(Rc::new(FrameScope {
            kind,
            outer,
            bindings: RefCell::new(IndexMap::new()),
            call_span: None,
        }))
    }

    pub fn new_function_scope(outer: Option<ScopeLink>, function_repr: Rc<str>, span: Span) -> AnyScope {
        AnyScope::Frame(Rc::new(FrameScope {
            kind: ScopeKind::Function,
            outer,
            bindings: RefCell::new(IndexMap::new()),
            call_span: Some((function_repr, span)),
        }))
    }

    pub fn downgrade(&self) -> WeakAnyScope {
        match self {
            AnyScope::Frame(f) => WeakAnyScope::Frame(Rc::downgrade(f)),
            AnyScope::Object(o) => WeakAnyScope::Object(Rc::downgrade(o)),
        }
    }

    pub fn kind(&self) -> ScopeKind {
        match self {
            AnyScope::Frame(f) => f.kind,
            AnyScope::Object(_) => ScopeKind::Proxy,
        }
    }

    pub fn outer(&self) -> Option<AnyScope> {
        match self {
            AnyScope::Frame(f) => f.outer.as_ref().and_then(ScopeLink::resolve),
            AnyScope::Object(o) => o.outer.borrow().as_ref().and_then(ScopeLink::resolve),
        }
    }

    /// Walks outward checking this scope's own kind chain; O(depth).
    pub fn has_kind(&self, kind: ScopeKind) -> bool {
        let mut cur = Some(self.clone());
        while let Some(s) = cur {
            if s.kind() == kind {
                return true;
            }
            cur = s.outer();
        }
        false
    }

    pub fn create(&self, id: Rc<str>, value: Value) {
        match self {
            AnyScope::Frame(f) => {
                f.bindings.borrow_mut().insert(id, value);
            }
            AnyScope::Object(o) => o.set_slot(id, value),
        }
    }

    /// `=` to an existing binding: walk the chain to find the owner,
    /// falling back to declaring it locally if nothing owns it yet.
    pub fn assign(&self, id: &str, value: Value) {
        let mut cur = Some(self.clone());
        while let Some(s) = cur {
            if s.has(id, false) {
                s.create(Rc::from(id), value);
                return;
            }
            cur = s.outer();
        }
        self.create(Rc::from(id), value);
    }

    pub fn has(&self, id: &str, search_parent: bool) -> bool {
        match self {
            AnyScope::Frame(f) => f.bindings.borrow().contains_key(id),
            AnyScope::Object(o) => o.slots.borrow().contains_key(id),
        }
        || (search_parent && self.outer().is_some_and(|o| o.has(id, true)))
    }

    fn local_get(&self, id: &str) -> Option<Value> {
        match self {
            AnyScope::Frame(f) => f.bindings.borrow().get(id).cloned(),
            AnyScope::Object(o) => o.slots.borrow().get(id).cloned(),
        }
    }

    /// `find` always returns a `Reference`, per the invariant that bare
    /// identifier lookups never yield a raw value.
    pub fn find(&self, id: &str, search_parent: bool, span: &Span) -> Result<Value, ExceptionValue> {
        let mut cur = Some(self.clone());
        loop {
            let Some(s) = cur else { break };
            if s.local_get(id).is_some() {
                return Ok(Value::Reference(Rc::new(crate::reference::Reference::Named {
                    scope: s,
                    name: Rc::from(id),
                })));
            }
            if !search_parent {
                break;
            }
            cur = s.outer();
        }
        Err(ExceptionValue::new(ExcType::NameError, format!("name '{id}' is not defined"), span.clone(), Vec::new()))
    }

    pub fn get_local(&self, id: &str) -> Option<Value> {
        self.local_get(id)
    }

    /// This scope's own call span, if it is the frame a call was made
    /// into (`None` for intervening block/iteration scopes). Does not
    /// recurse — callers walking the chain for a stack trace must
    /// advance one scope at a time to record one entry per activation.
    pub fn own_call_span(&self) -> Option<(Rc<str>, Span)> {
        match self {
            AnyScope::Frame(f) => f.call_span.clone(),
            AnyScope::Object(_) => None,
        }
    }
}
