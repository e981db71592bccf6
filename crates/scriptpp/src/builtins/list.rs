//! `List` methods. Indexing by integer (handled directly by the
//! evaluator's `Index` case) yields a `Reference`; everything else is a
//! native method slot installed here.
use std::rc::Rc;

use crate::builtins::{all_args, set_native_method, this_object};
use crate::eval::{coerce_to_display_string, truthy, Interpreter};
use crate::exception::{ExcType, ExceptionValue};
use crate::object::{DynamicObject, ObjectKind};
use crate::span::Span;
use crate::value::Value;

fn items_of(obj: &Rc<DynamicObject>) -> &std::cell::RefCell<Vec<Value>> {
    match &obj.kind {
        ObjectKind::List(items) => items,
        _ => unreachable!("list methods only installed on List objects"),
    }
}

fn call_callback(interp: &mut Interpreter, callback: &Value, args: Vec<Value>, span: &Span) -> Result<Value, ExceptionValue> {
    let Value::Function(func) = callback.resolve() else {
        return Err(ExceptionValue::new(ExcType::TypeError, "expected a callback function", span.clone(), Vec::new()));
    };
    match interp.call_function(&func, args, Vec::new(), None, span.clone()) {
        Ok(v) => Ok(v.resolve()),
        Err(crate::eval::Unwind::Exception(e)) => Err(e),
        Err(crate::eval::Unwind::Signal(_)) => {
            Err(ExceptionValue::new(ExcType::RuntimeError, "loop control escaped a callback", span.clone(), Vec::new()))
        }
    }
}

pub fn install(obj: &Rc<DynamicObject>) {
    set_native_method(obj, "push", Rc::new(|_interp, scope| {
        let this = this_object(scope)?;
        let items = items_of(&this);
        items.borrow_mut().extend(all_args(scope));
        Ok(Value::Null)
    }));

    set_native_method(obj, "pop", Rc::new(|_interp, scope| {
        let this = this_object(scope)?;
        let items = items_of(&this);
        Ok(items.borrow_mut().pop().unwrap_or(Value::Null))
    }));

    set_native_method(obj, "size", Rc::new(|_interp, scope| {
        let this = this_object(scope)?;
        Ok(Value::Number(crate::number::Number::Int64(items_of(&this).borrow().len() as i64)))
    }));

    set_native_method(obj, "reverse", Rc::new(|_interp, scope| {
        let this = this_object(scope)?;
        items_of(&this).borrow_mut().reverse();
        Ok(Value::Object(this))
    }));

    set_native_method(obj, "join", Rc::new(|interp, scope| {
        let this = this_object(scope)?;
        let args = all_args(scope);
        let delim = args.first().map(coerce_to_display_string).unwrap_or_else(|| ",".to_string());
        let snapshot = items_of(&this).borrow().clone();
        let mut parts = Vec::with_capacity(snapshot.len());
        for item in &snapshot {
            let s = interp.value_string(item, &Span::point(Rc::from("<join>"), 0, 0), scope).map_err(|u| match u {
                crate::eval::Unwind::Exception(e) => e,
                crate::eval::Unwind::Signal(_) => unreachable!(),
            })?;
            parts.push(coerce_to_display_string(&s));
        }
        Ok(Value::string(parts.join(&delim)))
    }));

    set_native_method(obj, "map", Rc::new(|interp, scope| {
        let this = this_object(scope)?;
        let args = all_args(scope);
        let callback = args.first().cloned().unwrap_or(Value::Null);
        let snapshot = items_of(&this).borrow().clone();
        let span = Span::point(Rc::from("<map>"), 0, 0);
        let mut out = Vec::with_capacity(snapshot.len());
        for (i, item) in snapshot.iter().enumerate() {
            out.push(call_callback(
                interp,
                &callback,
                vec![item.clone(), Value::Number(crate::number::Number::Int64(i as i64)), Value::Object(this.clone())],
                &span,
            )?);
        }
        Ok(Value::Object(DynamicObject::new_list(out)))
    }));

    set_native_method(obj, "forEach", Rc::new(|interp, scope| {
        let this = this_object(scope)?;
        let args = all_args(scope);
        let callback = args.first().cloned().unwrap_or(Value::Null);
        let snapshot = items_of(&this).borrow().clone();
        let span = Span::point(Rc::from("<forEach>"), 0, 0);
        for (i, item) in snapshot.iter().enumerate() {
            call_callback(
                interp,
                &callback,
                vec![item.clone(), Value::Number(crate::number::Number::Int64(i as i64)), Value::Object(this.clone())],
                &span,
            )?;
        }
        Ok(Value::Null)
    }));

    set_native_method(obj, "filter", Rc::new(|interp, scope| {
        let this = this_object(scope)?;
        let args = all_args(scope);
        let callback = args.first().cloned().unwrap_or(Value::Null);
        let snapshot = items_of(&this).borrow().clone();
        let span = Span::point(Rc::from("<filter>"), 0, 0);
        let mut out = Vec::new();
        for (i, item) in snapshot.iter().enumerate() {
            let kept = call_callback(
                interp,
                &callback,
                vec![item.clone(), Value::Number(crate::number::Number::Int64(i as i64)), Value::Object(this.clone())],
                &span,
            )?;
            if truthy(&kept) {
                out.push(item.clone());
            }
        }
        Ok(Value::Object(DynamicObject::new_list(out)))
    }));

    set_native_method(obj, "find", Rc::new(|interp, scope| {
        let this = this_object(scope)?;
        let args = all_args(scope);
        let callback = args.first().cloned().unwrap_or(Value::Null);
        let snapshot = items_of(&this).borrow().clone();
        let span = Span::point(Rc::from("<find>"), 0, 0);
        for (i, item) in snapshot.iter().enumerate() {
            let matched = call_callback(
                interp,
                &callback,
                vec![item.clone(), Value::Number(crate::number::Number::Int64(i as i64)), Value::Object(this.clone())],
                &span,
            )?;
            if truthy(&matched) {
                return Ok(item.clone());
            }
        }
        Ok(Value::Null)
    }));

    set_native_method(obj, "findIndex", Rc::new(|interp, scope| {
        let this = this_object(scope)?;
        let args = all_args(scope);
        let callback = args.first().cloned().unwrap_or(Value::Null);
        let snapshot = items_of(&this).borrow().clone();
        let span = Span::point(Rc::from("<findIndex>"), 0, 0);
        for (i, item) in snapshot.iter().enumerate() {
            let matched = call_callback(
                interp,
                &callback,
                vec![item.clone(), Value::Number(crate::number::Number::Int64(i as i64)), Value::Object(this.clone())],
                &span,
            )?;
            if truthy(&matched) {
                return Ok(Value::Number(crate::number::Number::Int64(i as i64)));
            }
        }
        Ok(Value::Number(crate::number::Number::Int64(-1)))
    }));

    set_native_method(obj, "sort", Rc::new(|interp, scope| {
        let this = this_object(scope)?;
        let args = all_args(scope);
        let callback = args.first().cloned();
        let mut snapshot = items_of(&this).borrow().clone();
        let span = Span::point(Rc::from("<sort>"), 0, 0);
        let mut failure = None;
        snapshot.sort_by(|a, b| {
            if failure.is_some() {
                return std::cmp::Ordering::Equal;
            }
            if let Some(cb) = &callback {
                match call_callback(interp, cb, vec![a.clone(), b.clone()], &span) {
                    Ok(Value::Number(n)) => {
                        let f = n.as_f64();
                        if f < 0.0 {
                            std::cmp::Ordering::Less
                        } else if f > 0.0 {
                            std::cmp::Ordering::Greater
                        } else {
                            std::cmp::Ordering::Equal
                        }
                    }
                    Ok(_) => std::cmp::Ordering::Equal,
                    Err(e) => {
                        failure = Some(e);
                        std::cmp::Ordering::Equal
                    }
                }
            } else {
                match (a, b) {
                    (Value::Number(x), Value::Number(y)) => x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal),
                    _ => std::cmp::Ordering::Equal,
                }
            }
        });
        if let Some(e) = failure {
            return Err(e);
        }
        *items_of(&this).borrow_mut() = snapshot;
        Ok(Value::Object(this))
    }));
}
