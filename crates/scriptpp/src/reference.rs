//! First-class l-values. An identifier lookup always produces one of
//! these rather than a bare value, which keeps assignment uniform: the
//! evaluator never needs a separate "address-of" pass.
use std::cell::RefCell;
use std::rc::Rc;

use crate::exception::ExceptionValue;
use crate::object::{DynamicObject, ObjectKind};
use crate::scope::AnyScope;
use crate::value::Value;

pub enum Reference {
    /// A snapshot with nowhere to write back to (e.g. the result of an
    /// expression that isn't itself addressable); `set` only updates the
    /// local cell, per §4.4.
    Plain(RefCell<Value>),
    /// Write-through binding in `scope` under `name`.
    Named { scope: AnyScope, name: Rc<str> },
    ListIndex { list: Rc<DynamicObject>, index: usize },
    /// A dictionary entry or a `DynamicObject` instance property.
    Property { object: Rc<DynamicObject>, name: Rc<str> },
    /// Single-character string index; writing replaces that character.
    StringIndex { string_obj: Rc<DynamicObject>, index: usize },
}

impl Reference {
    pub fn get(&self) -> Value {
        match self {
            Reference::Plain(cell) => cell.borrow().clone(),
            Reference::Named { scope, name } => scope.get_local(name).unwrap_or(Value::Null),
            Reference::ListIndex { list, index } => {
                let ObjectKind::List(items) = &list.kind else { unreachable!() };
                items.borrow().get(*index).cloned().unwrap_or(Value::Null)
            }
            Reference::Property { object, name } => object.get_slot(name).unwrap_or(Value::Null),
            Reference::StringIndex { string_obj, index } => {
                let ObjectKind::StringObj(s) = &string_obj.kind else { unreachable!() };
                s.borrow().chars().nth(*index).map(|c| Value::string(c.to_string())).unwrap_or(Value::Null)
            }
        }
    }

    pub fn set(&self, value: Value) -> Result<(), ExceptionValue> {
        match self {
            Reference::Plain(cell) => *cell.borrow_mut() = value,
            Reference::Named { scope, name } => scope.create(name.clone(), value),
            Reference::ListIndex { list, index } => {
                let ObjectKind::List(items) = &list.kind else { unreachable!() };
                let mut items = items.borrow_mut();
                if *index < items.len() {
                    items[*index] = value;
                }
            }
            Reference::Property { object, name } => object.set_slot(name.clone(), value),
            Reference::StringIndex { string_obj, index } => {
                let ObjectKind::StringObj(s) = &string_obj.kind else { unreachable!() };
                let replacement = crate::eval::coerce_to_display_string(&value);
                let mut owned = s.borrow().clone();
                let chars: Vec<char> = owned.chars().collect();
                if *index < chars.len() {
                    let mut new_chars = chars;
                    new_chars.splice(*index..*index + 1, replacement.chars());
                    owned = new_chars.into_iter().collect();
                    *s.borrow_mut() = owned;
                }
            }
        }
        Ok(())
    }

    pub fn plain(value: Value) -> Rc<Reference> {
        Rc::new(Reference::Plain(RefCell::new(value)))
    }
}
