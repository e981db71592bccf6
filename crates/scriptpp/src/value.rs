//! The runtime's tagged value domain.
use std::rc::Rc;

use crate::function::FunctionValue;
use crate::number::Number;
use crate::object::DynamicObject;
use crate::reference::Reference;

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Number(Number),
    Boolean(bool),
    /// Lists, dictionaries, strings, modules, prototypes, instances,
    /// exceptions and threads are all `DynamicObject`s with predefined
    /// slots; only their backing storage differs (see `ObjectKind`).
    Object(Rc<DynamicObject>),
    Function(Rc<FunctionValue>),
    /// A first-class l-value: the only thing an identifier lookup ever
    /// produces. Reading it yields the bound value; writing through it
    /// mutates the binding in its originating scope.
    Reference(Rc<Reference>),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Value {
        Value::Object(DynamicObject::new_string(s.into()))
    }

    /// Follow a `Reference` to its current value; identity otherwise.
    pub fn resolve(&self) -> Value {
        match self {
            Value::Reference(r) => r.get(),
            other => other.clone(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Number(_) => "Number",
            Value::Boolean(_) => "Boolean",
            Value::Object(obj) => obj.kind.type_name(),
            Value::Function(_) => "Function",
            Value::Reference(_) => "Reference",
        }
    }

    pub fn is_callable(&self) -> bool {
        match self.resolve() {
            Value::Function(_) => true,
            Value::Object(obj) => obj.kind.is_prototype() || obj.get_slot("__call__").is_some(),
            _ => false,
        }
    }
}
