use std::{cell::RefCell, rc::Rc};

use indexmap::IndexMap;

use crate::{
    diagnostics::{error, Diagnostic, DiagnosticKind, Result},
    value::Value,
};

/// Shared handle to a scope. Closures hold their defining scope strongly, so
/// a scope reachable from one of its own closures is never freed, and each
/// closure created per loop iteration keeps its scope alive.
pub type EnvironmentRef = Rc<RefCell<Environment>>;

/// Marker separating positional parameters from the rest parameter.
pub const VARIADIC_MARKER: &str = "&";

#[derive(Default)]
pub struct Environment {
    parent: Option<EnvironmentRef>,
    bindings: IndexMap<String, Value>,
}

impl Environment {
    pub fn new() -> EnvironmentRef {
        Rc::new(RefCell::new(Self {
            parent: None,
            bindings: IndexMap::new(),
        }))
    }

    pub fn with_parent(parent: EnvironmentRef) -> EnvironmentRef {
        Rc::new(RefCell::new(Self {
            parent: Some(parent),
            bindings: IndexMap::new(),
        }))
    }

    /// Creates a child of `parent` with `params` bound positionally to `args`.
    /// The name after `&` receives a list of every remaining argument.
    pub fn bind(
        parent: EnvironmentRef,
        params: &[String],
        args: &[Value],
    ) -> Result<EnvironmentRef> {
        let variadic = params.iter().position(|param| param == VARIADIC_MARKER);
        let positional = variadic.unwrap_or(params.len());
        if args.len() < positional || (variadic.is_none() && args.len() > positional) {
            return arity_mismatch(positional, args.len(), variadic.is_some());
        }

        let env = Environment::with_parent(parent);
        {
            let mut scope = env.borrow_mut();
            for (param, value) in params[..positional].iter().zip(args) {
                scope.define(param.clone(), value.clone());
            }
            if let Some(idx) = variadic {
                let rest = params.get(idx + 1).ok_or_else(|| {
                    Diagnostic::new(
                        DiagnosticKind::Syntax,
                        "`&` must be followed by a parameter name",
                    )
                })?;
                scope.define(rest.clone(), Value::list(args[positional..].to_vec()));
            }
        }
        Ok(env)
    }

    /// Adds or overwrites a binding in this scope only.
    pub fn define(&mut self, name: String, value: Value) {
        self.bindings.insert(name, value);
    }

    /// Resolves `name` through the parent chain, if bound anywhere.
    pub fn find(env: &EnvironmentRef, name: &str) -> Option<Value> {
        let mut current = Rc::clone(env);
        loop {
            if let Some(value) = current.borrow().bindings.get(name) {
                return Some(value.clone());
            }
            let parent = current.borrow().parent.clone();
            match parent {
                Some(parent) => current = parent,
                None => return None,
            }
        }
    }

    pub fn get(env: &EnvironmentRef, name: &str) -> Result<Value> {
        match Environment::find(env, name) {
            Some(value) => Ok(value),
            None => error(
                DiagnosticKind::UnboundSymbol,
                format!("'{name}' not found"),
            ),
        }
    }

    /// The outermost scope of the chain that `env` belongs to.
    pub fn root(env: &EnvironmentRef) -> EnvironmentRef {
        let mut current = Rc::clone(env);
        loop {
            let parent = current.borrow().parent.clone();
            match parent {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }
}

fn arity_mismatch<T>(expected: usize, received: usize, variadic: bool) -> Result<T> {
    let qualifier = if variadic { "at least " } else { "" };
    error(
        DiagnosticKind::Arity,
        format!("function expected {qualifier}{expected} arguments but received {received}"),
    )
}
