//! `String` methods. `+`, `*` and `[]` indexing are handled centrally
//! in `eval.rs`; only the remaining named operations are slots here.
use std::rc::Rc;

use crate::builtins::{all_args, set_native_method, this_object};
use crate::object::{DynamicObject, ObjectKind};
use crate::value::Value;

fn text_of(obj: &Rc<DynamicObject>) -> String {
    match &obj.kind {
        ObjectKind::StringObj(s) => s.borrow().clone(),
        _ => unreachable!("string methods only installed on String objects"),
    }
}

pub fn install(obj: &Rc<DynamicObject>) {
    set_native_method(obj, "split", Rc::new(|_interp, scope| {
        let this = this_object(scope)?;
        let args = all_args(scope);
        let delim = args.first().map(|v| match v.resolve() {
            Value::Object(o) => match &o.kind {
                ObjectKind::StringObj(s) => s.borrow().clone(),
                _ => String::new(),
            },
            _ => String::new(),
        });
        let text = text_of(&this);
        let parts: Vec<Value> = match delim.as_deref() {
            Some("") | None => text.chars().map(|c| Value::string(c.to_string())).collect(),
            Some(d) => text.split(d).map(|p| Value::string(p.to_string())).collect(),
        };
        Ok(Value::Object(DynamicObject::new_list(parts)))
    }));

    set_native_method(obj, "size", Rc::new(|_interp, scope| {
        let this = this_object(scope)?;
        Ok(Value::Number(crate::number::Number::Int64(text_of(&this).chars().count() as i64)))
    }));

    set_native_method(obj, "trim", Rc::new(|_interp, scope| {
        let this = this_object(scope)?;
        Ok(Value::string(text_of(&this).trim().to_string()))
    }));
}
