//! Ambient observability layer. Zero cost when not wanted: `NoopTracer`
//! inlines away, `StderrTracer` is a thin `eprintln!` shim for local
//! debugging of the evaluator's call stack.
#[derive(Debug, Clone)]
pub enum TraceEvent {
    Call { function_repr: String },
    Return,
    Print { text: String },
}

pub trait Tracer {
    fn on_call(&self, _function_repr: &str) {}
    fn on_return(&self) {}
    fn on_print(&self, _text: &str) {}
}

pub struct NoopTracer;

impl Tracer for NoopTracer {}

pub struct StderrTracer;

impl Tracer for StderrTracer {
    fn on_call(&self, function_repr: &str) {
        eprintln!("call  {function_repr}");
    }

    fn on_return(&self) {
        eprintln!("return");
    }

    fn on_print(&self, text: &str) {
        eprintln!("print {text:?}");
    }
}
