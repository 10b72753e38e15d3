use std::{path::Path, rc::Rc};

use crate::{
    diagnostics::{error, DiagnosticKind, Result},
    environment::{Environment, EnvironmentRef, VARIADIC_MARKER},
    printer, reader, stdlib,
    value::{Value, ValueKind},
};

/// Definitions written in the language itself, evaluated after the
/// primitives are installed.
const PRELUDE: &[&str] = &[
    "(def! not (fn* (a) (if a false true)))",
    r#"(def! load-file (fn* (f) (eval (read-string (str "(do " (slurp f) "\nnil)")))))"#,
    r#"(defmacro! cond (fn* (& xs) (if (> (count xs) 0) (list 'if (first xs) (if (> (count xs) 1) (nth xs 1) (throw "odd number of forms to cond")) (cons 'cond (rest (rest xs)))))))"#,
];

#[derive(Debug, Default, Clone)]
pub struct ExecutionContext {
    /// Program arguments, exposed to scripts as `*ARGV*`.
    pub argv: Vec<String>,
}

/// Owns a root environment seeded with the primitive library and prelude.
pub struct Interpreter {
    env: EnvironmentRef,
    context: ExecutionContext,
}

impl Interpreter {
    pub fn new() -> Result<Self> {
        Self::with_context(ExecutionContext::default())
    }

    pub fn with_context(context: ExecutionContext) -> Result<Self> {
        let env = Environment::new();
        let mut interpreter = Self { env, context };
        interpreter.install_prelude()?;
        Ok(interpreter)
    }

    pub fn env(&self) -> &EnvironmentRef {
        &self.env
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Reads the first form of `source` and evaluates it in the root scope.
    pub fn eval_source(&mut self, source: &str) -> Result<Value> {
        let ast = reader::read(source)?;
        evaluate(ast, Rc::clone(&self.env))
    }

    /// Read, evaluate and print: the readable rendering of the result.
    pub fn rep(&mut self, source: &str) -> Result<String> {
        let value = self.eval_source(source)?;
        Ok(printer::pr_str(&value, true))
    }

    /// Evaluates every form of a script file through the `load-file` prelude function.
    pub fn load_file(&mut self, path: &Path) -> Result<Value> {
        let call = Value::list(vec![
            Value::symbol("load-file"),
            Value::string(path.to_string_lossy()),
        ]);
        evaluate(call, Rc::clone(&self.env))
    }

    fn install_prelude(&mut self) -> Result<()> {
        stdlib::install(&self.env);
        let argv = self.context.argv.iter().map(Value::string).collect();
        self.env
            .borrow_mut()
            .define("*ARGV*".into(), Value::list(argv));
        for source in PRELUDE {
            self.eval_source(source)?;
        }
        Ok(())
    }
}

/// Evaluates `ast` in `env`. Special forms in tail position (`let*`, `if`,
/// `do`, `quasiquote`) and closure application replace the current
/// `(ast, env)` pair and loop instead of recursing, so tail calls run in
/// constant stack space.
pub fn evaluate(ast: Value, env: EnvironmentRef) -> Result<Value> {
    let mut ast = ast;
    let mut env = env;
    loop {
        let form = macroexpand(ast, &env)?;
        let items = match form.kind() {
            ValueKind::List(items) if !items.is_empty() => items,
            ValueKind::List(_) => return Ok(form.clone()),
            _ => return eval_ast(&form, &env),
        };

        match items[0].as_symbol() {
            Some("def!") => {
                expect_len(items, 3, "def!")?;
                let name = expect_symbol(&items[1], "def!")?;
                let value = evaluate(items[2].clone(), Rc::clone(&env))?;
                env.borrow_mut().define(name.to_string(), value.clone());
                return Ok(value);
            }
            Some("let*") => {
                expect_len(items, 3, "let*")?;
                let bindings = match items[1].as_seq() {
                    Some(bindings) if bindings.len() % 2 == 0 => bindings,
                    _ => {
                        return error(
                            DiagnosticKind::Syntax,
                            "`let*` expects a list or vector of name/value pairs",
                        );
                    }
                };
                let scope = Environment::with_parent(Rc::clone(&env));
                for pair in bindings.chunks(2) {
                    let name = expect_symbol(&pair[0], "let*")?;
                    let value = evaluate(pair[1].clone(), Rc::clone(&scope))?;
                    scope.borrow_mut().define(name.to_string(), value);
                }
                ast = items[2].clone();
                env = scope;
            }
            Some("if") => {
                if items.len() != 3 && items.len() != 4 {
                    return arity("if", "2 or 3", items.len() - 1);
                }
                let condition = evaluate(items[1].clone(), Rc::clone(&env))?;
                ast = if condition.is_truthy() {
                    items[2].clone()
                } else {
                    items.get(3).cloned().unwrap_or_else(Value::nil)
                };
            }
            Some("do") => {
                let Some((last, effects)) = items[1..].split_last() else {
                    return Ok(Value::nil());
                };
                for item in effects {
                    evaluate(item.clone(), Rc::clone(&env))?;
                }
                ast = last.clone();
            }
            Some("fn*") => {
                expect_len(items, 3, "fn*")?;
                let params = parameter_names(&items[1])?;
                return Ok(Value::closure(params, items[2].clone(), Rc::clone(&env)));
            }
            Some("quote") => {
                expect_len(items, 2, "quote")?;
                return Ok(items[1].clone());
            }
            Some("quasiquoteexpand") => {
                expect_len(items, 2, "quasiquoteexpand")?;
                return quasiquote(&items[1]);
            }
            Some("quasiquote") => {
                expect_len(items, 2, "quasiquote")?;
                ast = quasiquote(&items[1])?;
            }
            Some("defmacro!") => {
                expect_len(items, 3, "defmacro!")?;
                let name = expect_symbol(&items[1], "defmacro!")?;
                let value = evaluate(items[2].clone(), Rc::clone(&env))?;
                let Some(mac) = value.to_macro() else {
                    return error(
                        DiagnosticKind::Type,
                        format!("`defmacro!` expects a function, found {}", value.type_name()),
                    );
                };
                env.borrow_mut().define(name.to_string(), mac.clone());
                return Ok(mac);
            }
            Some("macroexpand") => {
                expect_len(items, 2, "macroexpand")?;
                return macroexpand(items[1].clone(), &env);
            }
            _ => {
                let callee = evaluate(items[0].clone(), Rc::clone(&env))?;
                let mut args = Vec::with_capacity(items.len() - 1);
                for arg in &items[1..] {
                    args.push(evaluate(arg.clone(), Rc::clone(&env))?);
                }
                match callee.kind() {
                    ValueKind::Closure(closure) => {
                        env = Environment::bind(Rc::clone(&closure.env), &closure.params, &args)?;
                        ast = closure.body.clone();
                    }
                    ValueKind::Builtin(native) => return native.call(&args, &env),
                    _ => return not_callable(&callee),
                }
            }
        }
    }
}

/// Applies a function value to already evaluated arguments. Used by
/// primitives such as `swap!`; closure bodies run in a nested evaluation.
pub fn apply(callee: &Value, args: &[Value], env: &EnvironmentRef) -> Result<Value> {
    match callee.kind() {
        ValueKind::Closure(closure) => {
            let scope = Environment::bind(Rc::clone(&closure.env), &closure.params, args)?;
            evaluate(closure.body.clone(), scope)
        }
        ValueKind::Builtin(native) => native.call(args, env),
        _ => not_callable(callee),
    }
}

/// Repeatedly expands `ast` while its head names a macro in `env`.
pub fn macroexpand(ast: Value, env: &EnvironmentRef) -> Result<Value> {
    let mut ast = ast;
    while let Some(mac) = macro_for(&ast, env) {
        let ValueKind::Closure(closure) = mac.kind() else {
            break;
        };
        let args = ast.as_seq().map(|items| &items[1..]).unwrap_or_default();
        let scope = Environment::bind(Rc::clone(&closure.env), &closure.params, args)?;
        ast = evaluate(closure.body.clone(), scope)?;
    }
    Ok(ast)
}

fn macro_for(ast: &Value, env: &EnvironmentRef) -> Option<Value> {
    let ValueKind::List(items) = ast.kind() else {
        return None;
    };
    let name = items.first()?.as_symbol()?;
    Environment::find(env, name).filter(Value::is_macro)
}

/// Rewrites a quasiquoted template into `cons`/`concat`/`vec` calls.
pub fn quasiquote(ast: &Value) -> Result<Value> {
    match ast.kind() {
        ValueKind::List(items) => {
            if ast.is_form("unquote") {
                expect_len(items, 2, "unquote")?;
                return Ok(items[1].clone());
            }
            quasiquote_sequence(items)
        }
        ValueKind::Vector(items) => {
            let folded = quasiquote_sequence(items)?;
            Ok(Value::list(vec![Value::symbol("vec"), folded]))
        }
        ValueKind::HashMap(_) | ValueKind::Symbol(_) => {
            Ok(Value::list(vec![Value::symbol("quote"), ast.clone()]))
        }
        _ => Ok(ast.clone()),
    }
}

fn quasiquote_sequence(items: &[Value]) -> Result<Value> {
    let mut result = Value::list(Vec::new());
    for item in items.iter().rev() {
        result = if item.is_form("splice-unquote") {
            let spliced = item.as_seq().unwrap_or_default();
            expect_len(spliced, 2, "splice-unquote")?;
            Value::list(vec![Value::symbol("concat"), spliced[1].clone(), result])
        } else {
            Value::list(vec![Value::symbol("cons"), quasiquote(item)?, result])
        };
    }
    Ok(result)
}

/// Evaluates a non-list form: symbols resolve, containers evaluate their
/// elements, everything else evaluates to itself.
fn eval_ast(ast: &Value, env: &EnvironmentRef) -> Result<Value> {
    match ast.kind() {
        ValueKind::Symbol(name) => Environment::get(env, name),
        ValueKind::List(items) => Ok(Value::list(eval_each(items, env)?)),
        ValueKind::Vector(items) => Ok(Value::vector(eval_each(items, env)?)),
        ValueKind::HashMap(entries) => {
            let mut items = Vec::with_capacity(entries.len() * 2);
            for (key, value) in entries {
                items.push(evaluate(key.clone(), Rc::clone(env))?);
                items.push(evaluate(value.clone(), Rc::clone(env))?);
            }
            Value::hash_map(items)
        }
        _ => Ok(ast.clone()),
    }
}

fn eval_each(items: &[Value], env: &EnvironmentRef) -> Result<Vec<Value>> {
    items
        .iter()
        .map(|item| evaluate(item.clone(), Rc::clone(env)))
        .collect()
}

fn parameter_names(params: &Value) -> Result<Vec<String>> {
    let Some(items) = params.as_seq() else {
        return error(
            DiagnosticKind::Syntax,
            format!("`fn*` expects a parameter list, found {}", params.type_name()),
        );
    };
    let mut names = Vec::with_capacity(items.len());
    for item in items {
        names.push(expect_symbol(item, "fn*")?.to_string());
    }
    if let Some(idx) = names.iter().position(|name| name == VARIADIC_MARKER) {
        if names.len() != idx + 2 || names[idx + 1] == VARIADIC_MARKER {
            return error(
                DiagnosticKind::Syntax,
                "`&` must be followed by exactly one parameter name",
            );
        }
    }
    Ok(names)
}

fn expect_len(items: &[Value], expected: usize, form: &str) -> Result<()> {
    if items.len() != expected {
        return arity(form, &(expected - 1).to_string(), items.len().saturating_sub(1));
    }
    Ok(())
}

fn expect_symbol<'a>(value: &'a Value, form: &str) -> Result<&'a str> {
    match value.as_symbol() {
        Some(name) => Ok(name),
        None => error(
            DiagnosticKind::Type,
            format!("`{form}` expects a symbol, found {}", value.type_name()),
        ),
    }
}

fn arity<T>(form: &str, expected: &str, received: usize) -> Result<T> {
    error(
        DiagnosticKind::Arity,
        format!("`{form}` expected {expected} arguments but received {received}"),
    )
}

fn not_callable<T>(value: &Value) -> Result<T> {
    error(
        DiagnosticKind::NotCallable,
        format!("{} is not callable: {}", value.type_name(), value),
    )
}
