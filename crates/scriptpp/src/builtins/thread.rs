//! `Thread` prototype backed by a genuine OS thread. A departure from a
//! cooperative scheduler: concurrency here means concurrency, and the
//! language itself provides no implicit synchronization around shared
//! objects — `start`/`join` are the only ordering guarantees a script gets.
use std::cell::RefCell;
use std::rc::Rc;

use crate::builtins::{all_args, set_native_method, this_object};
use crate::eval::Interpreter;
use crate::exception::{ExcType, ExceptionValue};
use crate::function::FunctionValue;
use crate::object::{DynamicObject, ObjectKind, SendValue, ThreadState};
use crate::program::Program;
use crate::scope::AnyScope;
use crate::span::Span;
use crate::tracer::Tracer;
use crate::value::Value;

fn builtin_span() -> Span {
    Span::point(Rc::from("<Thread>"), 0, 0)
}

/// Everything a spawned thread needs, bundled behind an explicit
/// `unsafe impl Send`: the target closure's scope chain and arguments
/// are `Rc`-based, but ownership moves wholesale into the new thread and
/// is only observed again through `join()`.
struct ThreadPayload {
    program: Rc<Program>,
    tracer: Rc<dyn Tracer>,
    func: Rc<FunctionValue>,
    args: Vec<Value>,
}

unsafe impl Send for ThreadPayload {}

pub fn install_global(root: &AnyScope, span: Span) {
    crate::native::register_native(
        root,
        "Thread",
        &["target"],
        Rc::new(|_interp: &mut Interpreter, scope| {
            let target = scope.get_local("target").unwrap_or(Value::Null).resolve();
            if !matches!(target, Value::Function(_)) {
                return Err(ExceptionValue::new(
                    ExcType::ArgumentError,
                    "Thread(target) expects a function",
                    builtin_span(),
                    Vec::new(),
                ));
            }
            let state = ThreadState { handle: None, target: Some(target), joined_value: None };
            let obj = DynamicObject::new(ObjectKind::Thread(RefCell::new(state)), None);
            install(&obj);
            Ok(Value::Object(obj))
        }),
        span,
    );
}

fn state_of(obj: &Rc<DynamicObject>) -> &RefCell<ThreadState> {
    match &obj.kind {
        ObjectKind::Thread(state) => state,
        _ => unreachable!("thread methods only installed on Thread objects"),
    }
}

pub fn install(obj: &Rc<DynamicObject>) {
    set_native_method(obj, "start", Rc::new(|interp, scope| {
        let this = this_object(scope)?;
        let args = all_args(scope);
        let target = state_of(&this).borrow().target.clone();
        let Some(Value::Function(func)) = target else {
            return Err(ExceptionValue::new(ExcType::RuntimeError, "thread has no target function", builtin_span(), Vec::new()));
        };
        if state_of(&this).borrow().handle.is_some() {
            return Err(ExceptionValue::new(ExcType::RuntimeError, "thread already started", builtin_span(), Vec::new()));
        }
        let payload = ThreadPayload { program: interp.program.clone(), tracer: interp.tracer.clone(), func, args };
        let handle = std::thread::spawn(move || {
            let ThreadPayload { program, tracer, func, args } = payload;
            let mut thread_interp = Interpreter::new(program, tracer);
            let result = match thread_interp.call_function(&func, args, Vec::new(), None, builtin_span()) {
                Ok(v) => v,
                Err(_) => Value::Null,
            };
            SendValue(result)
        });
        state_of(&this).borrow_mut().handle = Some(handle);
        Ok(Value::Null)
    }));

    set_native_method(obj, "join", Rc::new(|_interp, scope| {
        let this = this_object(scope)?;
        let handle = state_of(&this).borrow_mut().handle.take();
        let Some(handle) = handle else {
            return Ok(state_of(&this).borrow().joined_value.clone().unwrap_or(Value::Null));
        };
        let value = handle.join().map(|sv| sv.0).unwrap_or(Value::Null);
        state_of(&this).borrow_mut().joined_value = Some(value.clone());
        Ok(value)
    }));

    set_native_method(obj, "isActive", Rc::new(|_interp, scope| {
        let this = this_object(scope)?;
        let active = state_of(&this).borrow().handle.as_ref().is_some_and(|h| !h.is_finished());
        Ok(Value::Boolean(active))
    }));
}
