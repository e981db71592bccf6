//! The root scope and module cache. Program owns every Module ever
//! imported for its lifetime and exposes the built-ins available to all
//! user code.
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::eval::{Interpreter, Unwind};
use crate::exception::{ExcType, ExceptionValue};
use crate::io::{PrintWriter, StdPrint};
use crate::lexer::tokenize;
use crate::native::{PluginError, PluginLoader, register_native};
use crate::object::{DynamicObject, ObjectKind};
use crate::parser::parse_module;
use crate::scope::{AnyScope, ScopeKind, ScopeLink};
use crate::span::Span;
use crate::value::Value;

pub struct Program {
    pub root: AnyScope,
    pub modules: RefCell<HashMap<String, Value>>,
    pub cwd: PathBuf,
    pub print: Rc<dyn PrintWriter>,
    pub plugin_loader: Option<Rc<dyn PluginLoader>>,
}

impl Program {
    pub fn new(cwd: PathBuf) -> Rc<Program> {
        Self::with_print(cwd, Rc::new(StdPrint))
    }

    pub fn with_print(cwd: PathBuf, print: Rc<dyn PrintWriter>) -> Rc<Program> {
        let root = AnyScope::new_frame(ScopeKind::Program, None);
        let program = Rc::new(Program { root, modules: RefCell::new(HashMap::new()), cwd, print, plugin_loader: None });
        program.install_builtins();
        program
    }

    fn install_builtins(&self) {
        let span = Span::point(Rc::from("<builtins>"), 0, 0);
        let root = &self.root;

        register_native(
            root,
            "print",
            &["value"],
            Rc::new(|interp: &mut Interpreter, scope| {
                let v = scope.get_local("value").unwrap_or(Value::Null).resolve();
                let text = match interp.value_string(&v, &Span::point(Rc::from("<print>"), 0, 0), scope) {
                    Ok(s) => crate::eval::coerce_to_display_string(&s),
                    Err(Unwind::Exception(e)) => return Err(e),
                    Err(_) => crate::eval::coerce_to_display_string(&v),
                };
                interp.program.print.write_line(&text);
                interp.tracer.on_print(&text);
                Ok(Value::Null)
            }),
            span.clone(),
        );

        register_native(
            root,
            "cwd",
            &[],
            Rc::new(|interp: &mut Interpreter, _scope| Ok(Value::string(interp.program.cwd.display().to_string()))),
            span.clone(),
        );

        register_native(
            root,
            "import",
            &["moduleId"],
            Rc::new(|interp: &mut Interpreter, scope| {
                let id = scope.get_local("moduleId").unwrap_or(Value::Null).resolve();
                let Value::Object(obj) = &id else {
                    return Err(ExceptionValue::new(ExcType::ArgumentError, "import() expects a string", Span::point(Rc::from("<import>"), 0, 0), Vec::new()));
                };
                let ObjectKind::StringObj(s) = &obj.kind else {
                    return Err(ExceptionValue::new(ExcType::ArgumentError, "import() expects a string", Span::point(Rc::from("<import>"), 0, 0), Vec::new()));
                };
                let module_id = s.borrow().clone();
                let program = interp.program.clone();
                program.import(interp, &module_id)
            }),
            span.clone(),
        );

        register_native(
            root,
            "eval",
            &["text"],
            Rc::new(|interp: &mut Interpreter, scope| {
                let v = scope.get_local("text").unwrap_or(Value::Null).resolve();
                let Value::Object(obj) = &v else {
                    return Err(ExceptionValue::new(ExcType::ArgumentError, "eval() expects a string", Span::point(Rc::from("<eval>"), 0, 0), Vec::new()));
                };
                let ObjectKind::StringObj(s) = &obj.kind else {
                    return Err(ExceptionValue::new(ExcType::ArgumentError, "eval() expects a string", Span::point(Rc::from("<eval>"), 0, 0), Vec::new()));
                };
                let text = s.borrow().clone();
                let program = interp.program.clone();
                program.eval_text(interp, &text)
            }),
            span.clone(),
        );

        register_native(
            root,
            "List",
            &[],
            Rc::new(|_interp: &mut Interpreter, scope| {
                let args = scope.get_local("__args__").unwrap_or(Value::Null).resolve();
                let items = match args {
                    Value::Object(obj) => match &obj.kind {
                        ObjectKind::List(items) => items.borrow().clone(),
                        _ => Vec::new(),
                    },
                    _ => Vec::new(),
                };
                Ok(Value::Object(DynamicObject::new_list(items)))
            }),
            span.clone(),
        );

        register_native(
            root,
            "Dict",
            &[],
            Rc::new(|_interp: &mut Interpreter, _scope| Ok(Value::Object(DynamicObject::new_dict()))),
            span.clone(),
        );

        crate::builtins::thread::install_global(root, span.clone());

        // `else` is a Program-scope Boolean `true`, not parser syntax; a
        // user `let else = ...` shadows it like any other binding.
        root.create(Rc::from("else"), Value::Boolean(true));
    }

    fn cache_key(&self, path: &Path) -> String {
        let resolved = if path.is_absolute() { path.to_path_buf() } else { self.cwd.join(path) };
        let mut key = resolved.to_string_lossy().to_string();
        if let Some(stripped) = key.strip_suffix(".spp").or_else(|| key.strip_suffix(".sppn")) {
            key = stripped.to_string();
        }
        key
    }

    pub fn import(self: &Rc<Self>, interp: &mut Interpreter, module_id: &str) -> Result<Value, ExceptionValue> {
        let raw_path = Path::new(module_id);
        let key = self.cache_key(raw_path);
        if let Some(cached) = self.modules.borrow().get(&key) {
            return Ok(cached.clone());
        }

        let resolved = if raw_path.is_absolute() { raw_path.to_path_buf() } else { self.cwd.join(raw_path) };
        let span = Span::point(Rc::from(module_id), 0, 0);

        if resolved.extension().is_some_and(|e| e == "sppn") {
            let loader = self.plugin_loader.clone().ok_or_else(|| {
                ExceptionValue::new(ExcType::RuntimeError, "no native-plugin loader registered", span.clone(), Vec::new())
            })?;
            let module = loader
                .load(&resolved, self)
                .map_err(|e| ExceptionValue::new(ExcType::RuntimeError, e.message, span.clone(), Vec::new()))?;
            self.modules.borrow_mut().insert(key, module.clone());
            return Ok(module);
        }

        let source = std::fs::read_to_string(&resolved).map_err(|e| {
            ExceptionValue::new(ExcType::RuntimeError, format!("cannot read module '{module_id}': {e}"), span.clone(), Vec::new())
        })?;
        let file_label = resolved.to_string_lossy().to_string();
        let tokens = tokenize(&source, &file_label)
            .map_err(|e| ExceptionValue::new(ExcType::LexError, e.message, e.span, Vec::new()))?;
        let ast = parse_module(&tokens, &file_label)
            .map_err(|e| ExceptionValue::new(ExcType::ParseError, e.message, e.span, Vec::new()))?;

        let module_obj =
            crate::native::new_module(ScopeLink::Weak(self.root.downgrade()));
        let module_scope = AnyScope::Object(module_obj.clone());
        if let crate::ast::Node::Module { statements, .. } = &ast {
            interp.eval_block(statements, &module_scope).map_err(|u| match u {
                Unwind::Exception(e) => e,
                Unwind::Signal(_) => {
                    ExceptionValue::new(ExcType::RuntimeError, "top-level control flow escaped module body", span.clone(), Vec::new())
                }
            })?;
        }
        let value = Value::Object(module_obj);
        self.modules.borrow_mut().insert(key, value.clone());
        Ok(value)
    }

    pub fn eval_text(self: &Rc<Self>, interp: &mut Interpreter, text: &str) -> Result<Value, ExceptionValue> {
        let file_label = "<eval>";
        let tokens =
            tokenize(text, file_label).map_err(|e| ExceptionValue::new(ExcType::LexError, e.message, e.span, Vec::new()))?;
        let ast = parse_module(&tokens, file_label)
            .map_err(|e| ExceptionValue::new(ExcType::ParseError, e.message, e.span, Vec::new()))?;
        let module_obj = crate::native::new_module(ScopeLink::Weak(self.root.downgrade()));
        let module_scope = AnyScope::Object(module_obj);
        if let crate::ast::Node::Module { statements, .. } = &ast {
            interp.eval_block(statements, &module_scope).map_err(|u| match u {
                Unwind::Exception(e) => e,
                Unwind::Signal(_) => {
                    ExceptionValue::new(ExcType::RuntimeError, "top-level control flow escaped eval() body", Span::point(Rc::from(file_label), 0, 0), Vec::new())
                }
            })
        } else {
            Ok(Value::Null)
        }
    }

    pub fn run_source(self: &Rc<Self>, interp: &mut Interpreter, source: &str, file: &str) -> Result<Value, ExceptionValue> {
        let tokens = tokenize(source, file).map_err(|e| ExceptionValue::new(ExcType::LexError, e.message, e.span, Vec::new()))?;
        let ast = parse_module(&tokens, file).map_err(|e| ExceptionValue::new(ExcType::ParseError, e.message, e.span, Vec::new()))?;
        let module_obj = crate::native::new_module(ScopeLink::Weak(self.root.downgrade()));
        let module_scope = AnyScope::Object(module_obj);
        if let crate::ast::Node::Module { statements, .. } = &ast {
            interp.eval_block(statements, &module_scope).map_err(|u| match u {
                Unwind::Exception(e) => e,
                Unwind::Signal(_) => {
                    ExceptionValue::new(ExcType::RuntimeError, "top-level control flow escaped", Span::point(Rc::from(file), 0, 0), Vec::new())
                }
            })
        } else {
            Ok(Value::Null)
        }
    }
}
