//! Closures and native callables. A `FunctionValue` captures the scope
//! in effect at its declaration; invocation builds a fresh
//! `FunctionScope` (a plain `AnyScope::Frame` of kind `Function`) whose
//! outer pointer is that captured scope.
use std::rc::Rc;

use crate::ast::{Node, Param};
use crate::eval::Interpreter;
use crate::exception::ExceptionValue;
use crate::scope::{AnyScope, ScopeLink};
use crate::span::Span;
use crate::value::Value;

pub type NativeFn = Rc<dyn Fn(&mut Interpreter, &AnyScope) -> Result<Value, ExceptionValue>>;

pub enum FunctionBody {
    Source(Rc<Node>),
    Native(NativeFn),
}

pub struct FunctionValue {
    pub name: Option<Rc<str>>,
    pub params: Vec<Param>,
    pub body: FunctionBody,
    /// The scope captured at declaration time. When that scope is a
    /// `DynamicObject` (a class body), this link is weak: the object's
    /// slot map strongly holds this very `FunctionValue`, so a strong
    /// back-reference here would leak (see the cyclic-ownership note in
    /// `scope::ScopeLink`).
    pub closure: Option<ScopeLink>,
    pub declared_at: Span,
}

impl FunctionValue {
    pub fn new_source(
        name: Option<Rc<str>>,
        params: Vec<Param>,
        body: Rc<Node>,
        closure: Option<AnyScope>,
        declared_at: Span,
    ) -> Rc<FunctionValue> {
        let closure = closure.map(|scope| match &scope {
            AnyScope::Object(obj) => ScopeLink::Weak(crate::scope::WeakAnyScope::Object(Rc::downgrade(obj))),
            AnyScope::Frame(_) => ScopeLink::Strong(scope),
        });
        Rc::new(FunctionValue { name, params, body: FunctionBody::Source(body), closure, declared_at })
    }

    pub fn new_native(name: &str, arity_names: &[&str], f: NativeFn, declared_at: Span) -> Rc<FunctionValue> {
        let params = arity_names
            .iter()
            .map(|n| Param { name: Rc::from(*n), default: None })
            .collect();
        Rc::new(FunctionValue {
            name: Some(Rc::from(name)),
            params,
            body: FunctionBody::Native(f),
            closure: None,
            declared_at,
        })
    }

    pub fn repr(&self) -> String {
        match &self.name {
            Some(n) => format!("fn {n}(...)"),
            None => "fn(...)".to_string(),
        }
    }

    pub fn closure_scope(&self) -> Option<AnyScope> {
        self.closure.as_ref().and_then(ScopeLink::resolve)
    }
}
