//! A small, dynamically-typed embedded scripting language: lexer, parser,
//! runtime value model, and tree-walking evaluator.
//!
//! The pipeline is strictly unidirectional: source text becomes tokens
//! ([`lexer`]), tokens become a typed AST ([`parser`], [`ast`]), and the
//! AST is walked against a scope chain by [`eval`] to produce
//! [`value::Value`]s. [`program::Program`] owns the module cache and the
//! set of built-ins exposed to user code.
mod ast;
mod builtins;
mod eval;
mod exception;
mod function;
mod io;
mod lexer;
mod native;
mod number;
mod object;
mod parser;
mod program;
mod reference;
mod scope;
mod span;
mod token;
mod tracer;
mod value;

pub use crate::{
    ast::Node,
    eval::{coerce_to_display_string, Interpreter},
    exception::{ExcType, ExceptionValue, StackFrame},
    function::FunctionValue,
    io::{CollectStringPrint, NoPrint, PrintWriter, StdPrint},
    lexer::{LexError, tokenize},
    native::{NativeFn, PluginError, PluginLoader},
    number::Number,
    object::{DynamicObject, ObjectKind},
    parser::{ParseError, parse_module},
    program::Program,
    reference::Reference,
    scope::{AnyScope, ScopeKind, ScopeLink},
    span::Span,
    token::{Token, TokenKind},
    tracer::{NoopTracer, StderrTracer, TraceEvent, Tracer},
    value::Value,
};
