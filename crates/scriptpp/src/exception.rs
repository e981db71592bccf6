//! The error taxonomy and the `Exception` value raised through it.
use std::rc::Rc;

use strum::{Display, EnumString, IntoStaticStr};

use crate::object::{DynamicObject, ObjectKind};
use crate::scope::AnyScope;
use crate::span::Span;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
pub enum ExcType {
    LexError,
    ParseError,
    NameError,
    TypeError,
    ArgumentError,
    RuntimeError,
    UserError,
}

#[derive(Debug, Clone)]
pub struct StackFrame {
    pub function_repr: String,
    pub span: Span,
}

impl std::fmt::Display for StackFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} @ {}", self.function_repr, self.span)
    }
}

/// A host-language error carrying a language-level `Exception` value
/// (a `DynamicObject` with `data`/`stack` slots). Unwinds through Rust's
/// own `Result`/`?`, mirroring how `try/catch` unwinds the evaluator.
#[derive(Debug, Clone)]
pub struct ExceptionValue {
    pub exc_type: ExcType,
    pub message: String,
    pub span: Span,
    pub stack: Vec<StackFrame>,
}

impl ExceptionValue {
    pub fn new(exc_type: ExcType, message: impl Into<String>, span: Span, stack: Vec<StackFrame>) -> Self {
        Self { exc_type, message: message.into(), span, stack }
    }

    /// Walks the scope chain from the throw site, recording one frame
    /// per active call. Weak proxies that have already been reclaimed
    /// terminate the walk early.
    pub fn capture_stack(scope: &AnyScope) -> Vec<StackFrame> {
        let mut frames = Vec::new();
        let mut cur = Some(scope.clone());
        while let Some(s) = cur {
            if let Some((function_repr, span)) = s.own_call_span() {
                frames.push(StackFrame { function_repr: function_repr.to_string(), span });
            }
            cur = s.outer();
        }
        frames
    }

    pub fn to_object(&self) -> Rc<DynamicObject> {
        let obj = DynamicObject::new(ObjectKind::Exception, None);
        obj.set_slot(Rc::from("data"), Value::string(self.message.clone()));
        let frames: Vec<Value> = self.stack.iter().map(|f| Value::string(f.to_string())).collect();
        obj.set_slot(Rc::from("stack"), Value::Object(DynamicObject::new_list(frames)));
        obj
    }

    pub fn render(&self) -> String {
        let mut out = format!("Exception: {}", self.message);
        for frame in &self.stack {
            out.push_str(&format!("\n    {frame}"));
        }
        out
    }
}

impl std::fmt::Display for ExceptionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl std::error::Error for ExceptionValue {}
