//! The tree walker: `(node, scope) -> Value`. The only component that
//! mutates scopes.
use std::rc::Rc;

use crate::ast::{BinOp, Node};
use crate::exception::{ExcType, ExceptionValue, StackFrame};
use crate::function::{FunctionBody, FunctionValue};
use crate::object::{DynamicObject, ObjectKind, ValueKey};
use crate::program::Program;
use crate::scope::{AnyScope, ScopeKind, ScopeLink};
use crate::span::Span;
use crate::tracer::{TraceEvent, Tracer};
use crate::value::Value;

/// Non-local control transfer: either a language-level exception, or a
/// loop/function control signal (`return`/`break`/`continue`).
#[derive(Debug, Clone)]
pub enum Unwind {
    Signal(Signal),
    Exception(ExceptionValue),
}

#[derive(Debug, Clone)]
pub enum Signal {
    Return(Value),
    Break,
    Continue,
}

pub type EvalResult = Result<Value, Unwind>;

fn exc(exc_type: ExcType, message: impl Into<String>, span: &Span, scope: &AnyScope) -> Unwind {
    Unwind::Exception(ExceptionValue::new(exc_type, message, span.clone(), ExceptionValue::capture_stack(scope)))
}

pub struct Interpreter {
    pub program: Rc<Program>,
    pub tracer: Rc<dyn Tracer>,
}

impl Interpreter {
    pub fn new(program: Rc<Program>, tracer: Rc<dyn Tracer>) -> Self {
        Self { program, tracer }
    }

    pub fn eval(&mut self, node: &Node, scope: &AnyScope) -> EvalResult {
        match node {
            Node::NullLiteral { .. } => Ok(Value::Null),
            Node::BooleanLiteral { value, .. } => Ok(Value::Boolean(*value)),
            Node::NumericLiteral { value, .. } => Ok(Value::Number(*value)),
            Node::StringLiteral { value, .. } => Ok(Value::string(value.clone())),
            Node::ListLiteral { items, span: _ } => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item, scope)?.resolve());
                }
                Ok(Value::Object(DynamicObject::new_list(values)))
            }
            Node::Identifier { name, span } => scope.find(name, true, span).map_err(Unwind::Exception),
            Node::CreateAndAssign { names, value, .. } => {
                let v = self.eval(value, scope)?.resolve();
                for name in names {
                    scope.create(name.clone(), v.clone());
                }
                Ok(v)
            }
            Node::Assign { target, value, span } => self.eval_assign(target, value, span, scope),
            Node::BinaryOp { op, lhs, rhs, span } => self.eval_binary(*op, lhs, rhs, span, scope),
            Node::Not { operand, .. } => {
                let v = self.eval(operand, scope)?.resolve();
                Ok(Value::Boolean(!truthy(&v)))
            }
            Node::Access { object, name, span } => self.eval_access(object, name, span, scope),
            Node::Index { object, index, span } => self.eval_index(object, index, span, scope),
            Node::Call { callee, positional, named, span } => self.eval_call(callee, positional, named, span, scope),
            Node::Function { name, params, body, span } => {
                let func = FunctionValue::new_source(
                    name.clone(),
                    params.clone(),
                    Rc::new((**body).clone()),
                    Some(scope.clone()),
                    span.clone(),
                );
                let value = Value::Function(func);
                if let Some(name) = name {
                    scope.create(name.clone(), value.clone());
                }
                Ok(value)
            }
            Node::Scope { statements, .. } => {
                let child = AnyScope::new_frame(ScopeKind::None, Some(ScopeLink::Strong(scope.clone())));
                self.eval_block(statements, &child)
            }
            Node::When { branches, .. } => {
                for (cond, stmt) in branches {
                    let c = self.eval(cond, scope)?.resolve();
                    if truthy(&c) {
                        return self.eval(stmt, scope);
                    }
                }
                Ok(Value::Null)
            }
            Node::For { init, cond, update, body, span: _ } => self.eval_for(init, cond, update, body, scope),
            Node::While { cond, body, .. } => self.eval_while(cond, body, scope),
            Node::Return { value, .. } => {
                let v = match value {
                    Some(n) => self.eval(n, scope)?.resolve(),
                    None => Value::Null,
                };
                Err(Unwind::Signal(Signal::Return(v)))
            }
            Node::Throw { value, span } => {
                let v = self.eval(value, scope)?.resolve();
                let message = coerce_to_display_string(&v);
                Err(exc(ExcType::UserError, message, span, scope))
            }
            Node::Break { .. } => Err(Unwind::Signal(Signal::Break)),
            Node::Continue { .. } => Err(Unwind::Signal(Signal::Continue)),
            Node::TryCatch { try_scope, catch_ident, catch_scope, .. } => {
                match self.eval(try_scope, scope) {
                    Ok(v) => Ok(v),
                    Err(Unwind::Signal(s)) => Err(Unwind::Signal(s)),
                    Err(Unwind::Exception(e)) => {
                        let child = AnyScope::new_frame(ScopeKind::None, Some(ScopeLink::Strong(scope.clone())));
                        if let Some(ident) = catch_ident {
                            child.create(ident.clone(), Value::Object(e.to_object()));
                        }
                        self.eval(catch_scope, &child)
                    }
                }
            }
            Node::Class { name, parents, body, span } => {
                let mut parent_values = Vec::new();
                for p in parents {
                    parent_values.push(self.eval(p, scope)?.resolve());
                }
                let prototype = DynamicObject::new(
                    ObjectKind::Prototype { parents: parent_values, body: Rc::new((**body).clone()) },
                    Some(ScopeLink::Strong(scope.clone())),
                );
                let _ = span;
                let value = Value::Object(prototype);
                if let Some(name) = name {
                    scope.create(name.clone(), value.clone());
                }
                Ok(value)
            }
            Node::Module { statements, .. } => self.eval_block(statements, scope),
            Node::NoOp { .. } => Ok(Value::Null),
        }
    }

    pub fn eval_block(&mut self, statements: &[Node], scope: &AnyScope) -> EvalResult {
        let mut last = Value::Null;
        for stmt in statements {
            last = self.eval(stmt, scope)?;
        }
        Ok(last)
    }

    fn eval_assign(&mut self, target: &Node, value: &Node, span: &Span, scope: &AnyScope) -> EvalResult {
        let v = self.eval(value, scope)?.resolve();
        match target {
            Node::Index { object, index, span: idx_span } => {
                let container = self.eval(object, scope)?.resolve();
                let key = self.eval(index, scope)?.resolve();
                self.container_set(&container, &key, v.clone(), idx_span, scope)?;
                Ok(v)
            }
            Node::Access { object, name, span: acc_span } => {
                let obj_val = self.eval(object, scope)?.resolve();
                let Value::Object(obj) = obj_val else {
                    return Err(exc(ExcType::TypeError, "cannot assign a property on a non-object", acc_span, scope));
                };
                obj.set_slot(name.clone(), v.clone());
                Ok(v)
            }
            other => {
                let target_val = self.eval(other, scope)?;
                match target_val {
                    Value::Reference(r) => {
                        r.set(v.clone()).map_err(Unwind::Exception)?;
                        Ok(v)
                    }
                    _ => Err(exc(ExcType::TypeError, "left-hand side is not assignable", span, scope)),
                }
            }
        }
    }

    fn eval_binary(&mut self, op: BinOp, lhs: &Node, rhs: &Node, span: &Span, scope: &AnyScope) -> EvalResult {
        if matches!(op, BinOp::And | BinOp::Or) {
            let l = self.eval(lhs, scope)?.resolve();
            let l_truthy = truthy(&l);
            if op == BinOp::And && !l_truthy {
                return Ok(Value::Boolean(false));
            }
            if op == BinOp::Or && l_truthy {
                return Ok(Value::Boolean(true));
            }
            let r = self.eval(rhs, scope)?.resolve();
            return Ok(Value::Boolean(truthy(&r)));
        }

        let l = self.eval(lhs, scope)?.resolve();
        let r = self.eval(rhs, scope)?.resolve();
        match op {
            BinOp::Add => self.value_add(&l, &r, span, scope),
            BinOp::Sub => self.value_numeric(&l, &r, span, scope, "__subtract__", |a, b| Ok(a.sub(b))),
            BinOp::Mul => self.value_multiply(&l, &r, span, scope),
            BinOp::Div => self.value_numeric(&l, &r, span, scope, "__divide__", |a, b| {
                a.div(b).ok_or(())
            }),
            BinOp::Mod => self.value_numeric(&l, &r, span, scope, "__mod__", |a, b| a.rem(b).ok_or(())),
            BinOp::Eq => Ok(Value::Boolean(self.value_equal(&l, &r, span))),
            BinOp::NotEq => Ok(Value::Boolean(!self.value_equal(&l, &r, span))),
            BinOp::Lt => self.value_compare(&l, &r, span, scope, "__less__", Ordering::Less),
            BinOp::Gt => self.value_compare(&l, &r, span, scope, "__greater__", Ordering::Greater),
            BinOp::LtEq => {
                let gt = self.value_compare(&l, &r, span, scope, "__greater__", Ordering::Greater)?;
                Ok(Value::Boolean(!truthy(&gt)))
            }
            BinOp::GtEq => {
                let lt = self.value_compare(&l, &r, span, scope, "__less__", Ordering::Less)?;
                Ok(Value::Boolean(!truthy(&lt)))
            }
            BinOp::And | BinOp::Or => unreachable!("handled above"),
        }
    }

    fn dunder_call(&mut self, obj: &Rc<DynamicObject>, name: &str, args: Vec<Value>, span: &Span) -> Option<EvalResult> {
        let f = obj.get_slot(name)?;
        let Value::Function(func) = f.resolve() else { return None };
        Some(self.call_function(&func, args, Vec::new(), Some(Value::Object(obj.clone())), span.clone()))
    }

    fn value_add(&mut self, l: &Value, r: &Value, span: &Span, scope: &AnyScope) -> EvalResult {
        if let Value::Object(obj) = l {
            if let Some(result) = self.dunder_call(obj, "__add__", vec![r.clone()], span) {
                return result;
            }
        }
        match (l, r) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a.add(*b))),
            (Value::Object(a), Value::Object(b)) => match (&a.kind, &b.kind) {
                (ObjectKind::StringObj(sa), ObjectKind::StringObj(sb)) => {
                    Ok(Value::string(format!("{}{}", sa.borrow(), sb.borrow())))
                }
                (ObjectKind::List(la), ObjectKind::List(lb)) => {
                    let mut out = la.borrow().clone();
                    out.extend(lb.borrow().iter().cloned());
                    Ok(Value::Object(DynamicObject::new_list(out)))
                }
                _ => self.add_with_string_coercion(l, r, span, scope),
            },
            _ => self.add_with_string_coercion(l, r, span, scope),
        }
    }

    /// `<string> + <other>` stringifies the other operand — common C-family
    /// scripting ergonomics and required by S4's `__string__` scenario.
    fn add_with_string_coercion(&mut self, l: &Value, r: &Value, span: &Span, scope: &AnyScope) -> EvalResult {
        if let Value::Object(a) = l {
            if matches!(a.kind, ObjectKind::StringObj(_)) {
                let rs = self.value_string(r, span, scope)?;
                return self.value_add(l, &rs, span, scope);
            }
        }
        if let Value::Object(b) = r {
            if matches!(b.kind, ObjectKind::StringObj(_)) {
                let ls = self.value_string(l, span, scope)?;
                return self.value_add(&ls, r, span, scope);
            }
        }
        Err(exc(ExcType::TypeError, format!("unsupported operand types for +: {} and {}", l.kind_name(), r.kind_name()), span, scope))
    }

    fn value_multiply(&mut self, l: &Value, r: &Value, span: &Span, scope: &AnyScope) -> EvalResult {
        if let Value::Object(obj) = l {
            if let Some(result) = self.dunder_call(obj, "__multiply__", vec![r.clone()], span) {
                return result;
            }
        }
        match (l, r) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a.mul(*b))),
            (Value::Object(a), Value::Number(n)) if matches!(a.kind, ObjectKind::StringObj(_)) => {
                let ObjectKind::StringObj(s) = &a.kind else { unreachable!() };
                Ok(Value::string(s.borrow().repeat(n.as_i64().max(0) as usize)))
            }
            _ => Err(exc(
                ExcType::TypeError,
                format!("unsupported operand types for *: {} and {}", l.kind_name(), r.kind_name()),
                span,
                scope,
            )),
        }
    }

    fn value_numeric(
        &mut self,
        l: &Value,
        r: &Value,
        span: &Span,
        scope: &AnyScope,
        dunder: &str,
        op: impl Fn(crate::number::Number, crate::number::Number) -> Result<crate::number::Number, ()>,
    ) -> EvalResult {
        if let Value::Object(obj) = l {
            if let Some(result) = self.dunder_call(obj, dunder, vec![r.clone()], span) {
                return result;
            }
        }
        match (l, r) {
            (Value::Number(a), Value::Number(b)) => match op(*a, *b) {
                Ok(n) => Ok(Value::Number(n)),
                Err(()) => Err(exc(ExcType::RuntimeError, "division by zero", span, scope)),
            },
            _ => Err(exc(
                ExcType::TypeError,
                format!("unsupported operand types: {} and {}", l.kind_name(), r.kind_name()),
                span,
                scope,
            )),
        }
    }

    fn value_compare(
        &mut self,
        l: &Value,
        r: &Value,
        span: &Span,
        scope: &AnyScope,
        dunder: &str,
        want: Ordering,
    ) -> EvalResult {
        if let Value::Object(obj) = l {
            if let Some(result) = self.dunder_call(obj, dunder, vec![r.clone()], span) {
                return result;
            }
        }
        let ord = match (l, r) {
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::Object(a), Value::Object(b)) => match (&a.kind, &b.kind) {
                (ObjectKind::StringObj(sa), ObjectKind::StringObj(sb)) => sa.borrow().partial_cmp(&*sb.borrow()),
                _ => None,
            },
            _ => None,
        };
        match ord {
            Some(o) => Ok(Value::Boolean(o == want)),
            None => Err(exc(
                ExcType::TypeError,
                format!("unsupported comparison between {} and {}", l.kind_name(), r.kind_name()),
                span,
                scope,
            )),
        }
    }

    pub fn value_equal(&mut self, l: &Value, r: &Value, span: &Span) -> bool {
        if let Value::Object(obj) = l {
            if let Some(Ok(result)) = self.dunder_call(obj, "__equal__", vec![r.clone()], span) {
                return truthy(&result);
            }
        }
        match (l, r) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a.equal(*b),
            (Value::Object(a), Value::Object(b)) => match (&a.kind, &b.kind) {
                (ObjectKind::StringObj(sa), ObjectKind::StringObj(sb)) => *sa.borrow() == *sb.borrow(),
                _ => Rc::ptr_eq(a, b),
            },
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Resolves `__string__` where overridden; falls back to the
    /// structural rendering used everywhere else.
    pub fn value_string(&mut self, v: &Value, span: &Span, _scope: &AnyScope) -> Result<Value, Unwind> {
        if let Value::Object(obj) = v {
            if let Some(result) = self.dunder_call(obj, "__string__", Vec::new(), span) {
                return result;
            }
        }
        Ok(Value::string(coerce_to_display_string(v)))
    }

    fn eval_access(&mut self, object: &Node, name: &Rc<str>, span: &Span, scope: &AnyScope) -> EvalResult {
        let obj_val = self.eval(object, scope)?.resolve();
        let Value::Object(obj) = obj_val else {
            return Err(exc(ExcType::TypeError, format!("cannot access '.{name}' on a {}", obj_val.kind_name()), span, scope));
        };
        AnyScope::Object(obj).find(name, true, span).map_err(Unwind::Exception)
    }

    fn eval_index(&mut self, object: &Node, index: &Node, span: &Span, scope: &AnyScope) -> EvalResult {
        let obj_val = self.eval(object, scope)?.resolve();
        let key_val = self.eval(index, scope)?.resolve();
        let Value::Object(obj) = &obj_val else {
            return Err(exc(ExcType::TypeError, format!("cannot index a {}", obj_val.kind_name()), span, scope));
        };
        if let Some(result) = self.dunder_call(obj, "__get__", vec![key_val.clone()], span) {
            return result;
        }
        match &obj.kind {
            ObjectKind::List(items) => {
                let Value::Number(n) = key_val else {
                    return Err(exc(ExcType::TypeError, "list index must be a number", span, scope));
                };
                let i = n.as_i64();
                let len = items.borrow().len() as i64;
                if i < 0 || i >= len {
                    return Err(exc(ExcType::RuntimeError, format!("index {i} out of range"), span, scope));
                }
                Ok(Value::Reference(Rc::new(crate::reference::Reference::ListIndex {
                    list: obj.clone(),
                    index: i as usize,
                })))
            }
            ObjectKind::StringObj(s) => {
                let Value::Number(n) = key_val else {
                    return Err(exc(ExcType::TypeError, "string index must be a number", span, scope));
                };
                let i = n.as_i64();
                let len = s.borrow().chars().count() as i64;
                if i < 0 || i >= len {
                    return Err(exc(ExcType::RuntimeError, format!("index {i} out of range"), span, scope));
                }
                Ok(Value::Reference(Rc::new(crate::reference::Reference::StringIndex {
                    string_obj: obj.clone(),
                    index: i as usize,
                })))
            }
            _ => {
                let Value::Object(key_obj) = &key_val else {
                    return Err(exc(ExcType::TypeError, "index key must be a string", span, scope));
                };
                let ObjectKind::StringObj(key_str) = &key_obj.kind else {
                    return Err(exc(ExcType::TypeError, "index key must be a string", span, scope));
                };
                let name: Rc<str> = Rc::from(key_str.borrow().as_str());
                AnyScope::Object(obj.clone()).find(&name, true, span).map_err(Unwind::Exception)
            }
        }
    }

    fn container_set(&mut self, container: &Value, key: &Value, value: Value, span: &Span, scope: &AnyScope) -> Result<(), Unwind> {
        let Value::Object(obj) = container else {
            return Err(exc(ExcType::TypeError, format!("cannot index-assign a {}", container.kind_name()), span, scope));
        };
        if self.dunder_call(obj, "__set__", vec![key.clone(), value.clone()], span).is_some() {
            return Ok(());
        }
        match &obj.kind {
            ObjectKind::List(items) => {
                let Value::Number(n) = key else {
                    return Err(exc(ExcType::TypeError, "list index must be a number", span, scope));
                };
                let i = n.as_i64();
                let mut items = items.borrow_mut();
                if i < 0 || i as usize >= items.len() {
                    return Err(exc(ExcType::RuntimeError, format!("index {i} out of range"), span, scope));
                }
                items[i as usize] = value;
                Ok(())
            }
            ObjectKind::StringObj(_) => {
                let Value::Number(n) = key else {
                    return Err(exc(ExcType::TypeError, "string index must be a number", span, scope));
                };
                crate::reference::Reference::StringIndex { string_obj: obj.clone(), index: n.as_i64().max(0) as usize }
                    .set(value)
                    .map_err(Unwind::Exception)
            }
            _ => {
                let Value::Object(key_obj) = key else {
                    return Err(exc(ExcType::TypeError, "index key must be a string", span, scope));
                };
                let ObjectKind::StringObj(key_str) = &key_obj.kind else {
                    return Err(exc(ExcType::TypeError, "index key must be a string", span, scope));
                };
                obj.set_slot(Rc::from(key_str.borrow().as_str()), value);
                Ok(())
            }
        }
    }

    fn eval_call(
        &mut self,
        callee: &Node,
        positional: &[Node],
        named: &[(Rc<str>, Node)],
        span: &Span,
        scope: &AnyScope,
    ) -> EvalResult {
        let mut pos_values = Vec::with_capacity(positional.len());
        for p in positional {
            pos_values.push(self.eval(p, scope)?.resolve());
        }
        let mut named_values = Vec::with_capacity(named.len());
        for (n, e) in named {
            named_values.push((n.clone(), self.eval(e, scope)?.resolve()));
        }

        // A method call (`a.b(...)`) resolves its receiver directly so
        // `this` can be bound without re-evaluating `a`.
        if let Node::Access { object, name, span: acc_span } = callee {
            let obj_val = self.eval(object, scope)?.resolve();
            let Value::Object(obj) = &obj_val else {
                return Err(exc(ExcType::TypeError, format!("cannot access '.{name}' on a {}", obj_val.kind_name()), acc_span, scope));
            };
            let func_val = AnyScope::Object(obj.clone()).find(name, true, acc_span).map_err(Unwind::Exception)?.resolve();
            let Value::Function(func) = func_val else {
                return Err(exc(ExcType::TypeError, format!("'{name}' is not callable"), span, scope));
            };
            self.tracer.on_call(&func.repr());
            return self.call_function(&func, pos_values, named_values, Some(obj_val), span.clone());
        }

        let callee_val = self.eval(callee, scope)?.resolve();
        match callee_val {
            Value::Function(func) => {
                self.tracer.on_call(&func.repr());
                self.call_function(&func, pos_values, named_values, None, span.clone())
            }
            Value::Object(obj) if obj.kind.is_prototype() => self.instantiate(&obj, pos_values, named_values, span),
            Value::Object(obj) if obj.get_slot("__call__").is_some() => self
                .dunder_call(&obj, "__call__", pos_values, span)
                .unwrap_or_else(|| Err(exc(ExcType::TypeError, "object is not callable", span, scope))),
            other => Err(exc(ExcType::TypeError, format!("{} is not callable", other.kind_name()), span, scope)),
        }
    }

    fn instantiate(
        &mut self,
        prototype: &Rc<DynamicObject>,
        positional: Vec<Value>,
        named: Vec<(Rc<str>, Value)>,
        span: &Span,
    ) -> EvalResult {
        let ObjectKind::Prototype { body, .. } = &prototype.kind else { unreachable!() };
        let instance = DynamicObject::new(ObjectKind::Instance, Some(ScopeLink::Strong(AnyScope::Object(prototype.clone()))));
        let instance_scope = AnyScope::Object(instance.clone());
        if let Node::Scope { statements, .. } = body.as_ref() {
            self.eval_block(statements, &instance_scope)?;
        }
        if let Some(ctor) = instance.get_slot("__ctor__") {
            let Value::Function(ctor) = ctor.resolve() else {
                return Err(Unwind::Exception(ExceptionValue::new(
                    ExcType::TypeError,
                    "__ctor__ must be a function",
                    span.clone(),
                    Vec::new(),
                )));
            };
            self.call_function(&ctor, positional, named, Some(Value::Object(instance.clone())), span.clone())?;
        }
        Ok(Value::Object(instance))
    }

    pub fn call_function(
        &mut self,
        func: &Rc<FunctionValue>,
        positional: Vec<Value>,
        named: Vec<(Rc<str>, Value)>,
        receiver: Option<Value>,
        call_span: Span,
    ) -> EvalResult {
        let repr: Rc<str> = Rc::from(func.repr().as_str());
        let outer = func.closure_scope().map(ScopeLink::Strong);
        let function_scope = AnyScope::new_function_scope(outer, repr.clone(), call_span.clone());

        if let Some(r) = &receiver {
            function_scope.create(Rc::from("this"), r.clone());
        }

        let all_named_values: Vec<Value> = named.iter().map(|(_, v)| v.clone()).collect();
        let mut remaining_named = named;
        let mut consumed = 0usize;
        for param in &func.params {
            let from_named = remaining_named.iter().position(|(n, _)| **n == *param.name);
            let value = if let Some(i) = from_named {
                remaining_named.remove(i).1
            } else if consumed < positional.len() {
                let v = positional[consumed].clone();
                consumed += 1;
                v
            } else if let Some(default) = &param.default {
                self.eval(default, &function_scope)?.resolve()
            } else {
                return Err(exc(
                    ExcType::ArgumentError,
                    format!("missing required argument '{}'", param.name),
                    &call_span,
                    &function_scope,
                ));
            };
            function_scope.create(param.name.clone(), value);
        }
        function_scope.create(Rc::from("__args__"), Value::Object(DynamicObject::new_list(positional)));
        function_scope.create(Rc::from("__kwargs__"), Value::Object(DynamicObject::new_list(all_named_values)));

        let result = match &func.body {
            FunctionBody::Source(node) => self.run_function_body(node, &function_scope),
            FunctionBody::Native(native) => native(self, &function_scope).map_err(Unwind::Exception),
        };
        self.tracer.on_return();
        result
    }

    fn run_function_body(&mut self, body: &Node, scope: &AnyScope) -> EvalResult {
        match self.eval(body, scope) {
            Ok(v) => Ok(v),
            Err(Unwind::Signal(Signal::Return(v))) => Ok(v),
            other => other,
        }
    }

    fn eval_for(
        &mut self,
        init: &Option<Box<Node>>,
        cond: &Option<Box<Node>>,
        update: &Option<Box<Node>>,
        body: &Node,
        scope: &AnyScope,
    ) -> EvalResult {
        let loop_scope = AnyScope::new_frame(ScopeKind::Iteration, Some(ScopeLink::Strong(scope.clone())));
        if let Some(init) = init {
            self.eval(init, &loop_scope)?;
        }
        let mut last = Value::Null;
        loop {
            if let Some(cond) = cond {
                let c = self.eval(cond, &loop_scope)?.resolve();
                if !truthy(&c) {
                    break;
                }
            }
            match self.eval(body, &loop_scope) {
                Ok(v) => last = v,
                Err(Unwind::Signal(Signal::Break)) => break,
                Err(Unwind::Signal(Signal::Continue)) => {}
                Err(Unwind::Signal(Signal::Return(v))) => {
                    if loop_scope.has_kind(ScopeKind::Function) {
                        return Err(Unwind::Signal(Signal::Return(v)));
                    }
                    last = v;
                    break;
                }
                Err(e) => return Err(e),
            }
            if let Some(update) = update {
                self.eval(update, &loop_scope)?;
            }
        }
        Ok(last)
    }

    fn eval_while(&mut self, cond: &Node, body: &Node, scope: &AnyScope) -> EvalResult {
        let loop_scope = AnyScope::new_frame(ScopeKind::Iteration, Some(ScopeLink::Strong(scope.clone())));
        let mut last = Value::Null;
        loop {
            let c = self.eval(cond, &loop_scope)?.resolve();
            if !truthy(&c) {
                break;
            }
            match self.eval(body, &loop_scope) {
                Ok(v) => last = v,
                Err(Unwind::Signal(Signal::Break)) => break,
                Err(Unwind::Signal(Signal::Continue)) => {}
                Err(Unwind::Signal(Signal::Return(v))) => {
                    if loop_scope.has_kind(ScopeKind::Function) {
                        return Err(Unwind::Signal(Signal::Return(v)));
                    }
                    last = v;
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(last)
    }
}

use std::cmp::Ordering;

pub fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Boolean(b) => *b,
        Value::Number(n) => n.as_f64() != 0.0,
        Value::Object(obj) => match &obj.kind {
            ObjectKind::StringObj(s) => !s.borrow().is_empty(),
            ObjectKind::List(items) => !items.borrow().is_empty(),
            _ => true,
        },
        Value::Function(_) => true,
        Value::Reference(r) => truthy(&r.get()),
    }
}

/// Non-overridable default stringification, used for display contexts
/// where re-entering the evaluator for `__string__` isn't available
/// (panic messages, list/dict element rendering for simple kinds).
pub fn coerce_to_display_string(v: &Value) -> String {
    match v.resolve() {
        Value::Null => "null".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Object(obj) => match &obj.kind {
            ObjectKind::StringObj(s) => s.borrow().clone(),
            ObjectKind::List(items) => {
                let parts: Vec<String> = items.borrow().iter().map(coerce_to_display_string).collect();
                format!("[{}]", parts.join(", "))
            }
            ObjectKind::Dict(map) => {
                let parts: Vec<String> = map
                    .borrow()
                    .iter()
                    .map(|(_, v)| coerce_to_display_string(v))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            ObjectKind::Prototype { .. } => "<class>".to_string(),
            ObjectKind::Instance => "<object>".to_string(),
            ObjectKind::Exception => {
                let data = obj.get_slot("data").map(|v| coerce_to_display_string(&v)).unwrap_or_default();
                format!("Exception: {data}")
            }
            ObjectKind::Module => "<module>".to_string(),
            ObjectKind::Thread(_) => "<thread>".to_string(),
        },
        Value::Function(f) => f.repr(),
        Value::Reference(_) => unreachable!("resolved above"),
    }
}
