//! `Dict` methods. String-keyed `[]` access falls back to the same
//! slot map as instance fields (handled in `eval.rs`); `put`/`get`/`has`
//! here operate on the dedicated key-value store that backs arbitrary
//! (non-string) keys as well.
use std::rc::Rc;

use crate::builtins::{all_args, set_native_method, this_object};
use crate::object::{DynamicObject, ObjectKind, ValueKey};
use crate::value::Value;

fn entries_of(obj: &Rc<DynamicObject>) -> &std::cell::RefCell<indexmap::IndexMap<ValueKey, Value>> {
    match &obj.kind {
        ObjectKind::Dict(map) => map,
        _ => unreachable!("dict methods only installed on Dict objects"),
    }
}

pub fn install(obj: &Rc<DynamicObject>) {
    set_native_method(obj, "put", Rc::new(|_interp, scope| {
        let this = this_object(scope)?;
        let args = all_args(scope);
        let mut iter = args.into_iter();
        let key = iter.next().unwrap_or(Value::Null);
        let item = iter.next().unwrap_or(Value::Null);
        entries_of(&this).borrow_mut().insert(ValueKey::from_value(&key), item);
        Ok(Value::Null)
    }));

    set_native_method(obj, "get", Rc::new(|_interp, scope| {
        let this = this_object(scope)?;
        let args = all_args(scope);
        let key = args.into_iter().next().unwrap_or(Value::Null);
        let found = entries_of(&this).borrow().get(&ValueKey::from_value(&key)).cloned();
        Ok(found.unwrap_or(Value::Null))
    }));

    set_native_method(obj, "has", Rc::new(|_interp, scope| {
        let this = this_object(scope)?;
        let args = all_args(scope);
        let key = args.into_iter().next().unwrap_or(Value::Null);
        Ok(Value::Boolean(entries_of(&this).borrow().contains_key(&ValueKey::from_value(&key))))
    }));

    set_native_method(obj, "size", Rc::new(|_interp, scope| {
        let this = this_object(scope)?;
        Ok(Value::Number(crate::number::Number::Int64(entries_of(&this).borrow().len() as i64)))
    }));
}
