//! Host-registered natives and the native-plugin loader protocol. The
//! core defines the protocol only; the OS-level `.sppn` loader mechanism
//! is an external collaborator (see module docs on `Program::import`).
use std::fmt;
use std::path::Path;
use std::rc::Rc;

pub use crate::function::NativeFn;
use crate::object::DynamicObject;
use crate::program::Program;
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct PluginError {
    pub message: String,
}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plugin load error: {}", self.message)
    }
}

impl std::error::Error for PluginError {}

/// A plugin exposes exactly one entry point: given the Program, it
/// populates and returns a fresh Module value.
pub trait PluginLoader {
    fn load(&self, path: &Path, program: &Program) -> Result<Value, PluginError>;
}

/// Registers a Rust closure as a language-level native function bound
/// into `scope` under `name`.
pub fn register_native(
    scope: &crate::scope::AnyScope,
    name: &str,
    params: &[&str],
    f: NativeFn,
    span: crate::span::Span,
) {
    let func = crate::function::FunctionValue::new_native(name, params, f, span);
    scope.create(Rc::from(name), Value::Function(func));
}

pub fn new_module(outer: crate::scope::ScopeLink) -> Rc<DynamicObject> {
    DynamicObject::new(crate::object::ObjectKind::Module, Some(outer))
}
