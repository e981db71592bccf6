//! Native method slots for the built-in prototypes (List, Dict, String,
//! Thread). Each is installed onto a fresh `DynamicObject` at
//! construction time in `object.rs`.
pub mod dict;
pub mod list;
pub mod string;
pub mod thread;

use std::rc::Rc;

use crate::exception::{ExcType, ExceptionValue};
use crate::function::{FunctionValue, NativeFn};
use crate::object::DynamicObject;
use crate::scope::AnyScope;
use crate::span::Span;
use crate::value::Value;

fn builtin_span() -> Span {
    Span::point(Rc::from("<builtin>"), 0, 0)
}

pub(crate) fn set_native_method(obj: &Rc<DynamicObject>, name: &'static str, f: NativeFn) {
    let func = FunctionValue::new_native(name, &[], f, builtin_span());
    obj.set_slot(Rc::from(name), Value::Function(func));
}

/// Recovers the receiver (`this`) a method was called on.
pub(crate) fn this_object(scope: &AnyScope) -> Result<Rc<DynamicObject>, ExceptionValue> {
    match scope.get_local("this") {
        Some(Value::Object(obj)) => Ok(obj),
        _ => Err(ExceptionValue::new(ExcType::TypeError, "method called without a receiver", builtin_span(), Vec::new())),
    }
}

/// All actual arguments a native method received, positional then named,
/// in call order — the natural shape for variadic methods like `push`.
pub(crate) fn all_args(scope: &AnyScope) -> Vec<Value> {
    let mut out = list_payload(scope, "__args__");
    out.extend(list_payload(scope, "__kwargs__"));
    out
}

fn list_payload(scope: &AnyScope, name: &str) -> Vec<Value> {
    match scope.get_local(name) {
        Some(Value::Object(obj)) => match &obj.kind {
            crate::object::ObjectKind::List(items) => items.borrow().clone(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}
