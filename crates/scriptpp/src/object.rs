//! `DynamicObject`: the single record type behind lists, dictionaries,
//! strings, modules, prototypes, instances, exceptions and threads.
use std::cell::RefCell;
use std::rc::Rc;

use ahash::RandomState;
use indexmap::IndexMap;
use std::hash::{BuildHasher, Hash, Hasher};

use crate::scope::ScopeLink;
use crate::value::Value;

/// Backing storage that differs between the built-in prototypes; the
/// `identifier -> value` slot mapping on `DynamicObject` is what all of
/// them share (methods, fields, and dunder overrides live there).
pub enum ObjectKind {
    /// Ad-hoc object produced by evaluating a `class` body with no
    /// special storage (also used for `Exception`, which just adds the
    /// `data`/`stack` slots).
    Plain,
    List(RefCell<Vec<Value>>),
    Dict(RefCell<IndexMap<ValueKey, Value>>),
    StringObj(RefCell<String>),
    Module,
    /// A callable `DynamicObject`: invoking it constructs a fresh
    /// instance whose outer scope is the prototype.
    Prototype { parents: Vec<Value>, body: Rc<crate::ast::Node> },
    Instance,
    Exception,
    Thread(RefCell<ThreadState>),
}

pub struct ThreadState {
    pub handle: Option<std::thread::JoinHandle<SendValue>>,
    pub target: Option<Value>,
    pub joined_value: Option<Value>,
}

/// `Value` holds `Rc` graphs and isn't `Send`; a spawned thread's result
/// is only ever touched again through `join()`, which happens-after the
/// thread has finished, so no two threads observe it concurrently.
pub struct SendValue(pub Value);
unsafe impl Send for SendValue {}

impl ObjectKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            ObjectKind::Plain => "Object",
            ObjectKind::List(_) => "List",
            ObjectKind::Dict(_) => "Dict",
            ObjectKind::StringObj(_) => "String",
            ObjectKind::Module => "Module",
            ObjectKind::Prototype { .. } => "Prototype",
            ObjectKind::Instance => "Object",
            ObjectKind::Exception => "Exception",
            ObjectKind::Thread(_) => "Thread",
        }
    }

    pub fn is_prototype(&self) -> bool {
        matches!(self, ObjectKind::Prototype { .. })
    }
}

/// A value usable as a dictionary key: equality/hash are defined for
/// the kinds that have a stable identity (nulls, booleans, numbers by
/// bit pattern, strings by content, objects by address).
#[derive(Clone)]
pub enum ValueKey {
    Null,
    Bool(bool),
    Number(u64, i8),
    Str(String),
    Addr(usize),
}

impl ValueKey {
    pub fn from_value(v: &Value) -> ValueKey {
        match v.resolve() {
            Value::Null => ValueKey::Null,
            Value::Boolean(b) => ValueKey::Bool(b),
            Value::Number(n) => ValueKey::Number(n.as_f64().to_bits(), 0),
            Value::Object(obj) => match &obj.kind {
                ObjectKind::StringObj(s) => ValueKey::Str(s.borrow().clone()),
                _ => ValueKey::Addr(Rc::as_ptr(&obj) as usize),
            },
            Value::Function(f) => ValueKey::Addr(Rc::as_ptr(&f) as usize),
            Value::Reference(_) => unreachable!("keys are resolved before hashing"),
        }
    }
}

impl PartialEq for ValueKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ValueKey::Null, ValueKey::Null) => true,
            (ValueKey::Bool(a), ValueKey::Bool(b)) => a == b,
            (ValueKey::Number(a, _), ValueKey::Number(b, _)) => a == b,
            (ValueKey::Str(a), ValueKey::Str(b)) => a == b,
            (ValueKey::Addr(a), ValueKey::Addr(b)) => a == b,
            _ => false,
        }
    }
}
impl Eq for ValueKey {}

impl Hash for ValueKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            ValueKey::Null => 0u8.hash(state),
            ValueKey::Bool(b) => b.hash(state),
            ValueKey::Number(bits, _) => bits.hash(state),
            ValueKey::Str(s) => s.hash(state),
            ValueKey::Addr(a) => a.hash(state),
        }
    }
}

pub struct DynamicObject {
    pub kind: ObjectKind,
    pub slots: RefCell<IndexMap<Rc<str>, Value>>,
    pub outer: RefCell<Option<ScopeLink>>,
}

impl DynamicObject {
    pub fn new(kind: ObjectKind, outer: Option<ScopeLink>) -> Rc<DynamicObject> {
        Rc::new(DynamicObject { kind, slots: RefCell::new(IndexMap::new()), outer: RefCell::new(outer) })
    }

    pub fn new_string(s: String) -> Rc<DynamicObject> {
        let obj = DynamicObject::new(ObjectKind::StringObj(RefCell::new(s)), None);
        crate::builtins::string::install(&obj);
        obj
    }

    pub fn new_list(items: Vec<Value>) -> Rc<DynamicObject> {
        let obj = DynamicObject::new(ObjectKind::List(RefCell::new(items)), None);
        crate::builtins::list::install(&obj);
        obj
    }

    pub fn new_dict() -> Rc<DynamicObject> {
        let obj = DynamicObject::new(ObjectKind::Dict(RefCell::new(IndexMap::new())), None);
        crate::builtins::dict::install(&obj);
        obj
    }

    pub fn get_slot(&self, name: &str) -> Option<Value> {
        self.slots.borrow().get(name).cloned()
    }

    pub fn set_slot(&self, name: Rc<str>, value: Value) {
        self.slots.borrow_mut().insert(name, value);
    }

    pub fn address(&self) -> usize {
        self as *const DynamicObject as usize
    }

    pub fn hash_stable(&self) -> u64 {
        let mut hasher = RandomState::with_seeds(0, 0, 0, 0).build_hasher();
        self.address().hash(&mut hasher);
        hasher.finish()
    }
}
