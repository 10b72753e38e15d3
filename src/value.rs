use std::{
    cell::RefCell,
    collections::hash_map::DefaultHasher,
    fmt,
    hash::{Hash, Hasher},
    rc::Rc,
};

use indexmap::IndexMap;

use crate::{
    diagnostics::{error, DiagnosticKind, Result},
    environment::EnvironmentRef,
    printer,
};

#[derive(Clone)]
pub struct Value(pub Rc<ValueKind>);

impl Value {
    pub fn new(kind: ValueKind) -> Self {
        Self(Rc::new(kind))
    }

    pub fn nil() -> Self {
        Self::new(ValueKind::Nil)
    }

    pub fn bool(value: bool) -> Self {
        Self::new(ValueKind::Bool(value))
    }

    pub fn int(value: i64) -> Self {
        Self::new(ValueKind::Int(value))
    }

    pub fn float(value: f64) -> Self {
        Self::new(ValueKind::Float(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(ValueKind::Str(value.into()))
    }

    pub fn keyword(name: impl Into<String>) -> Self {
        Self::new(ValueKind::Keyword(name.into()))
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Self::new(ValueKind::Symbol(name.into()))
    }

    pub fn list(values: Vec<Value>) -> Self {
        Self::new(ValueKind::List(values))
    }

    pub fn vector(values: Vec<Value>) -> Self {
        Self::new(ValueKind::Vector(values))
    }

    pub fn map(entries: IndexMap<Value, Value>) -> Self {
        Self::new(ValueKind::HashMap(entries))
    }

    /// Builds a map from alternating keys and values.
    pub fn hash_map(items: Vec<Value>) -> Result<Self> {
        if items.len() % 2 != 0 {
            return error(
                DiagnosticKind::OddHashMap,
                format!("hash map needs an even number of forms, found {}", items.len()),
            );
        }
        let mut entries = IndexMap::with_capacity(items.len() / 2);
        let mut iter = items.into_iter();
        while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
            entries.insert(key, value);
        }
        Ok(Self::map(entries))
    }

    pub fn atom(value: Value) -> Self {
        Self::new(ValueKind::Atom(RefCell::new(value)))
    }

    pub fn closure(params: Vec<String>, body: Value, env: EnvironmentRef) -> Self {
        Self::new(ValueKind::Closure(Closure {
            params,
            body,
            env,
            is_macro: false,
        }))
    }

    /// Returns a macro-marked copy of a closure, or `None` for anything else.
    pub fn to_macro(&self) -> Option<Self> {
        match &*self.0 {
            ValueKind::Closure(closure) => Some(Self::new(ValueKind::Closure(Closure {
                is_macro: true,
                ..closure.clone()
            }))),
            _ => None,
        }
    }

    pub fn kind(&self) -> &ValueKind {
        &self.0
    }

    /// Only `nil` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(&*self.0, ValueKind::Nil | ValueKind::Bool(false))
    }

    pub fn is_nil(&self) -> bool {
        matches!(&*self.0, ValueKind::Nil)
    }

    pub fn is_list(&self) -> bool {
        matches!(&*self.0, ValueKind::List(_))
    }

    pub fn is_vector(&self) -> bool {
        matches!(&*self.0, ValueKind::Vector(_))
    }

    pub fn is_macro(&self) -> bool {
        matches!(&*self.0, ValueKind::Closure(closure) if closure.is_macro)
    }

    pub fn is_callable(&self) -> bool {
        matches!(&*self.0, ValueKind::Closure(_) | ValueKind::Builtin(_))
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match &*self.0 {
            ValueKind::Symbol(name) => Some(name),
            _ => None,
        }
    }

    /// Elements of a list or vector.
    pub fn as_seq(&self) -> Option<&[Value]> {
        match &*self.0 {
            ValueKind::List(values) | ValueKind::Vector(values) => Some(values),
            _ => None,
        }
    }

    /// True for a list whose first element is the symbol `name`.
    pub fn is_form(&self, name: &str) -> bool {
        match &*self.0 {
            ValueKind::List(values) => values
                .first()
                .and_then(Value::as_symbol)
                .is_some_and(|head| head == name),
            _ => false,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match &*self.0 {
            ValueKind::Nil => "Nil",
            ValueKind::Bool(_) => "Bool",
            ValueKind::Int(_) => "Int",
            ValueKind::Float(_) => "Float",
            ValueKind::Str(_) => "String",
            ValueKind::Keyword(_) => "Keyword",
            ValueKind::Symbol(_) => "Symbol",
            ValueKind::List(_) => "List",
            ValueKind::Vector(_) => "Vector",
            ValueKind::HashMap(_) => "HashMap",
            ValueKind::Closure(closure) if closure.is_macro => "Macro",
            ValueKind::Closure(_) => "Function",
            ValueKind::Builtin(_) => "Builtin",
            ValueKind::Atom(_) => "Atom",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        if Rc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        match (&*self.0, &*other.0) {
            (ValueKind::Nil, ValueKind::Nil) => true,
            (ValueKind::Bool(a), ValueKind::Bool(b)) => a == b,
            (ValueKind::Int(a), ValueKind::Int(b)) => a == b,
            (ValueKind::Float(a), ValueKind::Float(b)) => a == b,
            (ValueKind::Str(a), ValueKind::Str(b)) => a == b,
            (ValueKind::Keyword(a), ValueKind::Keyword(b)) => a == b,
            (ValueKind::Symbol(a), ValueKind::Symbol(b)) => a == b,
            (
                ValueKind::List(a) | ValueKind::Vector(a),
                ValueKind::List(b) | ValueKind::Vector(b),
            ) => a == b,
            (ValueKind::HashMap(a), ValueKind::HashMap(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(key, value)| b.get(key) == Some(value))
            }
            // Callables and atoms compare by identity, handled above.
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &*self.0 {
            ValueKind::Nil => 0u8.hash(state),
            ValueKind::Bool(b) => b.hash(state),
            ValueKind::Int(n) => n.hash(state),
            ValueKind::Float(f) => {
                // 0.0 and -0.0 compare equal, so they must hash alike.
                let normalized = if *f == 0.0 { 0.0f64 } else { *f };
                normalized.to_bits().hash(state)
            }
            ValueKind::Str(s) => s.hash(state),
            ValueKind::Keyword(s) => {
                ':'.hash(state);
                s.hash(state)
            }
            ValueKind::Symbol(s) => s.hash(state),
            ValueKind::List(values) | ValueKind::Vector(values) => values.hash(state),
            ValueKind::HashMap(entries) => {
                let mut combined: u64 = 0;
                for (key, value) in entries {
                    let mut hasher = DefaultHasher::new();
                    key.hash(&mut hasher);
                    value.hash(&mut hasher);
                    combined = combined.wrapping_add(hasher.finish());
                }
                entries.len().hash(state);
                combined.hash(state)
            }
            ValueKind::Closure(_) | ValueKind::Builtin(_) | ValueKind::Atom(_) => {
                Rc::as_ptr(&self.0).hash(state)
            }
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", printer::pr_str(self, true))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", printer::pr_str(self, true))
    }
}

pub enum ValueKind {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Keyword(String),
    Symbol(String),
    List(Vec<Value>),
    Vector(Vec<Value>),
    HashMap(IndexMap<Value, Value>),
    Closure(Closure),
    Builtin(NativeFunction),
    Atom(RefCell<Value>),
}

#[derive(Clone)]
pub struct Closure {
    /// Parameter names; a literal `&` marks the variadic tail.
    pub params: Vec<String>,
    pub body: Value,
    pub env: EnvironmentRef,
    pub is_macro: bool,
}

pub type NativeCallback = fn(&[Value], &EnvironmentRef) -> Result<Value>;

#[derive(Clone)]
pub struct NativeFunction {
    pub name: &'static str,
    /// `usize::MAX` for variadic builtins.
    pub arity: usize,
    pub callback: NativeCallback,
}

impl NativeFunction {
    pub fn call(&self, args: &[Value], env: &EnvironmentRef) -> Result<Value> {
        if self.arity != usize::MAX && args.len() != self.arity {
            return error(
                DiagnosticKind::Arity,
                format!(
                    "function `{}` expected {} arguments but received {}",
                    self.name,
                    self.arity,
                    args.len()
                ),
            );
        }
        (self.callback)(args, env)
    }
}
