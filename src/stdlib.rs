use std::{cmp::Ordering, fs};

use crate::{
    diagnostics::{error, DiagnosticKind, Result},
    environment::{Environment, EnvironmentRef},
    printer::{pr_seq, pr_str},
    reader,
    runtime::{self, evaluate},
    value::{NativeCallback, NativeFunction, Value, ValueKind},
};

const VARIADIC: usize = usize::MAX;

/// Binds every primitive into `env`.
pub fn install(env: &EnvironmentRef) {
    let natives: &[(&'static str, usize, NativeCallback)] = &[
        ("+", VARIADIC, math_add),
        ("-", VARIADIC, math_sub),
        ("*", VARIADIC, math_mul),
        ("/", VARIADIC, math_div),
        ("=", 2, compare_equal),
        ("<", 2, compare_less),
        (">", 2, compare_greater),
        ("<=", 2, compare_less_equal),
        (">=", 2, compare_greater_equal),
        ("list", VARIADIC, seq_list),
        ("list?", 1, is_list),
        ("vector", VARIADIC, seq_vector),
        ("vector?", 1, is_vector),
        ("hash-map", VARIADIC, map_hash_map),
        ("map?", 1, is_map),
        ("empty?", 1, seq_is_empty),
        ("count", 1, seq_count),
        ("cons", 2, seq_cons),
        ("concat", VARIADIC, seq_concat),
        ("vec", 1, seq_vec),
        ("nth", 2, seq_nth),
        ("first", 1, seq_first),
        ("rest", 1, seq_rest),
        ("nil?", 1, is_nil),
        ("true?", 1, is_true),
        ("false?", 1, is_false),
        ("symbol?", 1, is_symbol),
        ("keyword?", 1, is_keyword),
        ("string?", 1, is_string),
        ("number?", 1, is_number),
        ("fn?", 1, is_fn),
        ("macro?", 1, is_macro),
        ("symbol", 1, make_symbol),
        ("keyword", 1, make_keyword),
        ("pr-str", VARIADIC, io_pr_str),
        ("str", VARIADIC, io_str),
        ("prn", VARIADIC, io_prn),
        ("println", VARIADIC, io_println),
        ("read-string", 1, io_read_string),
        ("slurp", 1, io_slurp),
        ("atom", 1, atom_new),
        ("atom?", 1, is_atom),
        ("deref", 1, atom_deref),
        ("reset!", 2, atom_reset),
        ("swap!", VARIADIC, atom_swap),
        ("eval", 1, meta_eval),
        ("throw", 1, meta_throw),
    ];

    let mut scope = env.borrow_mut();
    for &(name, arity, callback) in natives {
        scope.define(name.into(), native(name, arity, callback));
    }
}

fn native(name: &'static str, arity: usize, callback: NativeCallback) -> Value {
    Value::new(ValueKind::Builtin(NativeFunction {
        name,
        arity,
        callback,
    }))
}

fn ensure_min(args: &[Value], min: usize, name: &str) -> Result<()> {
    if args.len() < min {
        return error(
            DiagnosticKind::Arity,
            format!(
                "`{name}` expected at least {min} arguments but received {}",
                args.len()
            ),
        );
    }
    Ok(())
}

fn type_error<T>(name: &str, expected: &str, found: &Value) -> Result<T> {
    error(
        DiagnosticKind::Type,
        format!("`{name}` expected {expected} but found {}", found.type_name()),
    )
}

fn expect_string<'a>(value: &'a Value, name: &str) -> Result<&'a str> {
    match value.kind() {
        ValueKind::Str(s) => Ok(s),
        _ => type_error(name, "String", value),
    }
}

fn expect_int(value: &Value, name: &str) -> Result<i64> {
    match value.kind() {
        ValueKind::Int(n) => Ok(*n),
        _ => type_error(name, "Int", value),
    }
}

/// Elements of a list or vector; `nil` reads as an empty sequence.
fn expect_seq<'a>(value: &'a Value, name: &str) -> Result<&'a [Value]> {
    match value.kind() {
        ValueKind::List(items) | ValueKind::Vector(items) => Ok(items),
        ValueKind::Nil => Ok(&[]),
        _ => type_error(name, "List or Vector", value),
    }
}

#[derive(Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn from_value(value: &Value, name: &str) -> Result<Self> {
        match value.kind() {
            ValueKind::Int(n) => Ok(Number::Int(*n)),
            ValueKind::Float(f) => Ok(Number::Float(*f)),
            _ => type_error(name, "a number", value),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(f) => f,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Number::Int(n) => Value::int(n),
            Number::Float(f) => Value::float(f),
        }
    }
}

/// Folds numeric arguments left to right. Integer operands stay integers
/// (with overflow checks) until a float appears.
fn arithmetic(
    args: &[Value],
    name: &str,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value> {
    ensure_min(args, 1, name)?;
    let (first, rest) = args.split_at(1);
    let mut acc = Number::from_value(&first[0], name)?;
    for arg in rest {
        let operand = Number::from_value(arg, name)?;
        acc = match (acc, operand) {
            (Number::Int(a), Number::Int(b)) => match int_op(a, b) {
                Some(n) => Number::Int(n),
                None if b == 0 => {
                    return error(DiagnosticKind::Arithmetic, "division by zero");
                }
                None => {
                    return error(
                        DiagnosticKind::Arithmetic,
                        format!("integer overflow in `{name}`"),
                    );
                }
            },
            (a, b) => Number::Float(float_op(a.as_f64(), b.as_f64())),
        };
    }
    Ok(acc.into_value())
}

fn math_add(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    if args.is_empty() {
        return Ok(Value::int(0));
    }
    arithmetic(args, "+", i64::checked_add, |a, b| a + b)
}

fn math_sub(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    if args.len() == 1 {
        let negated = [Value::int(0), args[0].clone()];
        return arithmetic(&negated, "-", i64::checked_sub, |a, b| a - b);
    }
    arithmetic(args, "-", i64::checked_sub, |a, b| a - b)
}

fn math_mul(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    if args.is_empty() {
        return Ok(Value::int(1));
    }
    arithmetic(args, "*", i64::checked_mul, |a, b| a * b)
}

fn math_div(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    ensure_min(args, 2, "/")?;
    arithmetic(args, "/", i64::checked_div, |a, b| a / b)
}

fn compare_equal(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    Ok(Value::bool(args[0] == args[1]))
}

fn ordering(args: &[Value], name: &str, test: fn(Ordering) -> bool) -> Result<Value> {
    let left = Number::from_value(&args[0], name)?;
    let right = Number::from_value(&args[1], name)?;
    let order = match (left, right) {
        (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
        (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
    };
    Ok(Value::bool(order.is_some_and(test)))
}

fn compare_less(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    ordering(args, "<", Ordering::is_lt)
}

fn compare_greater(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    ordering(args, ">", Ordering::is_gt)
}

fn compare_less_equal(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    ordering(args, "<=", Ordering::is_le)
}

fn compare_greater_equal(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    ordering(args, ">=", Ordering::is_ge)
}

fn seq_list(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    Ok(Value::list(args.to_vec()))
}

fn seq_vector(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    Ok(Value::vector(args.to_vec()))
}

fn map_hash_map(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    Value::hash_map(args.to_vec())
}

fn seq_is_empty(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    match args[0].kind() {
        ValueKind::HashMap(entries) => Ok(Value::bool(entries.is_empty())),
        _ => Ok(Value::bool(expect_seq(&args[0], "empty?")?.is_empty())),
    }
}

fn seq_count(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    let count = match args[0].kind() {
        ValueKind::HashMap(entries) => entries.len(),
        _ => expect_seq(&args[0], "count")?.len(),
    };
    Ok(Value::int(count as i64))
}

fn seq_cons(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    let tail = expect_seq(&args[1], "cons")?;
    let mut items = Vec::with_capacity(tail.len() + 1);
    items.push(args[0].clone());
    items.extend_from_slice(tail);
    Ok(Value::list(items))
}

fn seq_concat(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    let mut items = Vec::new();
    for arg in args {
        items.extend_from_slice(expect_seq(arg, "concat")?);
    }
    Ok(Value::list(items))
}

fn seq_vec(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    if args[0].is_vector() {
        return Ok(args[0].clone());
    }
    Ok(Value::vector(expect_seq(&args[0], "vec")?.to_vec()))
}

fn seq_nth(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    let items = expect_seq(&args[0], "nth")?;
    let index = expect_int(&args[1], "nth")?;
    match usize::try_from(index).ok().and_then(|idx| items.get(idx)) {
        Some(item) => Ok(item.clone()),
        None => error(
            DiagnosticKind::Type,
            format!("`nth` index {index} out of range for {} items", items.len()),
        ),
    }
}

fn seq_first(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    let items = expect_seq(&args[0], "first")?;
    Ok(items.first().cloned().unwrap_or_else(Value::nil))
}

fn seq_rest(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    let items = expect_seq(&args[0], "rest")?;
    Ok(Value::list(items.iter().skip(1).cloned().collect()))
}

fn is_list(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    Ok(Value::bool(args[0].is_list()))
}

fn is_vector(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    Ok(Value::bool(args[0].is_vector()))
}

fn is_map(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    Ok(Value::bool(matches!(args[0].kind(), ValueKind::HashMap(_))))
}

fn is_nil(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    Ok(Value::bool(args[0].is_nil()))
}

fn is_true(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    Ok(Value::bool(matches!(args[0].kind(), ValueKind::Bool(true))))
}

fn is_false(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    Ok(Value::bool(matches!(args[0].kind(), ValueKind::Bool(false))))
}

fn is_symbol(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    Ok(Value::bool(args[0].as_symbol().is_some()))
}

fn is_keyword(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    Ok(Value::bool(matches!(args[0].kind(), ValueKind::Keyword(_))))
}

fn is_string(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    Ok(Value::bool(matches!(args[0].kind(), ValueKind::Str(_))))
}

fn is_number(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    Ok(Value::bool(matches!(
        args[0].kind(),
        ValueKind::Int(_) | ValueKind::Float(_)
    )))
}

fn is_fn(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    Ok(Value::bool(args[0].is_callable() && !args[0].is_macro()))
}

fn is_macro(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    Ok(Value::bool(args[0].is_macro()))
}

fn is_atom(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    Ok(Value::bool(matches!(args[0].kind(), ValueKind::Atom(_))))
}

fn make_symbol(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    Ok(Value::symbol(expect_string(&args[0], "symbol")?))
}

fn make_keyword(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    match args[0].kind() {
        ValueKind::Keyword(_) => Ok(args[0].clone()),
        _ => Ok(Value::keyword(expect_string(&args[0], "keyword")?)),
    }
}

fn io_pr_str(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    Ok(Value::string(pr_seq(args, true, " ")))
}

fn io_str(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    Ok(Value::string(pr_seq(args, false, "")))
}

fn io_prn(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    println!("{}", pr_seq(args, true, " "));
    Ok(Value::nil())
}

fn io_println(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    println!("{}", pr_seq(args, false, " "));
    Ok(Value::nil())
}

fn io_read_string(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    reader::read(expect_string(&args[0], "read-string")?)
}

fn io_slurp(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    let path = expect_string(&args[0], "slurp")?;
    Ok(Value::string(fs::read_to_string(path)?))
}

fn atom_new(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    Ok(Value::atom(args[0].clone()))
}

fn atom_deref(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    match args[0].kind() {
        ValueKind::Atom(cell) => Ok(cell.borrow().clone()),
        _ => type_error("deref", "Atom", &args[0]),
    }
}

fn atom_reset(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    match args[0].kind() {
        ValueKind::Atom(cell) => {
            *cell.borrow_mut() = args[1].clone();
            Ok(args[1].clone())
        }
        _ => type_error("reset!", "Atom", &args[0]),
    }
}

/// `(swap! atom f & args)` stores `(f @atom args...)` and returns it.
fn atom_swap(args: &[Value], env: &EnvironmentRef) -> Result<Value> {
    ensure_min(args, 2, "swap!")?;
    let ValueKind::Atom(cell) = args[0].kind() else {
        return type_error("swap!", "Atom", &args[0]);
    };
    let mut call_args = Vec::with_capacity(args.len() - 1);
    call_args.push(cell.borrow().clone());
    call_args.extend_from_slice(&args[2..]);
    // The cell is not borrowed while `f` runs, so `f` may deref the atom itself.
    let updated = runtime::apply(&args[1], &call_args, env)?;
    *cell.borrow_mut() = updated.clone();
    Ok(updated)
}

fn meta_eval(args: &[Value], env: &EnvironmentRef) -> Result<Value> {
    evaluate(args[0].clone(), Environment::root(env))
}

fn meta_throw(args: &[Value], _env: &EnvironmentRef) -> Result<Value> {
    error(DiagnosticKind::Thrown, pr_str(&args[0], false))
}
