use std::{fs, path::Path, rc::Rc};

use mallow::{
    diagnostics::{DiagnosticKind, MallowError},
    environment::Environment,
    evaluate,
    printer::pr_str,
    read,
    runtime::{ExecutionContext, Interpreter},
    value::{Value, ValueKind},
};
use tempfile::tempdir;

fn interpreter() -> Interpreter {
    Interpreter::new().expect("prelude should load")
}

/// Evaluates each form in order on one interpreter, returning the last result.
fn eval_all(sources: &[&str]) -> Value {
    let mut interpreter = interpreter();
    let mut last = Value::nil();
    for source in sources {
        last = interpreter
            .eval_source(source)
            .unwrap_or_else(|err| panic!("evaluating {source} failed: {err}"));
    }
    last
}

fn eval(source: &str) -> Value {
    eval_all(&[source])
}

fn eval_error(source: &str) -> MallowError {
    let mut interpreter = interpreter();
    match interpreter.eval_source(source) {
        Ok(value) => panic!("expected error, received value {value}"),
        Err(err) => err,
    }
}

fn expect_int(value: &Value) -> i64 {
    match value.kind() {
        ValueKind::Int(n) => *n,
        _ => panic!("expected Int, found {}", value.type_name()),
    }
}

fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().copied().map(Value::int).collect()
}

fn printed(source: &str) -> String {
    pr_str(&eval(source), true)
}

fn path_literal(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "\\\\")
}

#[test]
fn evaluates_addition_through_public_entry_points() {
    let interpreter = interpreter();
    let ast = read("(+ 1 2)").expect("read");
    let value = evaluate(ast, Rc::clone(interpreter.env())).expect("evaluate");
    assert_eq!(value, Value::int(3));
}

#[test]
fn let_star_bindings_see_earlier_bindings() {
    assert_eq!(expect_int(&eval("(let* (a 5 b (+ a 1)) (* a b))")), 30);
    assert_eq!(expect_int(&eval("(let* [a 2 b a] (+ a b))")), 4);
}

#[test]
fn let_star_scope_does_not_leak() {
    let err = eval_error("(do (let* (hidden 1) hidden) hidden)");
    assert_eq!(err.kind(), Some(&DiagnosticKind::UnboundSymbol));
    assert!(format!("{err}").contains("hidden"), "{err}");
}

#[test]
fn self_recursive_tail_calls_run_in_constant_stack() {
    let value = eval_all(&[
        "(def! sum-to (fn* (n acc) (if (= n 0) acc (sum-to (- n 1) (+ acc n)))))",
        "(sum-to 100000 0)",
    ]);
    assert_eq!(expect_int(&value), 5_000_050_000);
}

#[test]
fn tail_calls_through_do_and_let_star_are_trampolined() {
    let value = eval_all(&[
        "(def! count-down (fn* (n) (do nil (let* (m (- n 1)) (if (> m 0) (count-down m) :done)))))",
        "(count-down 100000)",
    ]);
    assert_eq!(value, Value::keyword("done"));
}

#[test]
fn mutual_tail_recursion_does_not_grow_the_stack() {
    let value = eval_all(&[
        "(def! even? (fn* (n) (if (= n 0) true (odd? (- n 1)))))",
        "(def! odd? (fn* (n) (if (= n 0) false (even? (- n 1)))))",
        "(even? 100001)",
    ]);
    assert_eq!(value, Value::bool(false));
}

#[test]
fn only_nil_and_false_are_falsy() {
    assert_eq!(eval("(if 0 :yes :no)"), Value::keyword("yes"));
    assert_eq!(eval("(if (list) :yes :no)"), Value::keyword("yes"));
    assert_eq!(eval(r#"(if "" :yes :no)"#), Value::keyword("yes"));
    assert_eq!(eval("(if nil :yes :no)"), Value::keyword("no"));
    assert_eq!(eval("(if false :yes :no)"), Value::keyword("no"));
    assert!(eval("(if false :yes)").is_nil());
}

#[test]
fn do_returns_last_value_and_empty_do_is_nil() {
    assert_eq!(expect_int(&eval("(do 1 2 3)")), 3);
    assert!(eval("(do)").is_nil());
}

#[test]
fn def_binds_and_overwrites_in_same_scope() {
    let value = eval_all(&["(def! x 1)", "(def! x (+ x 10))", "x"]);
    assert_eq!(expect_int(&value), 11);
}

#[test]
fn closures_capture_their_defining_scope() {
    let value = eval_all(&[
        "(def! make-adder (fn* (n) (fn* (x) (+ x n))))",
        "(def! add5 (make-adder 5))",
        "(add5 10)",
    ]);
    assert_eq!(expect_int(&value), 15);
}

#[test]
fn variadic_parameters_collect_remaining_arguments() {
    assert_eq!(
        eval("((fn* (a & more) more) 1 2 3)"),
        Value::list(ints(&[2, 3]))
    );
    assert_eq!(expect_int(&eval("((fn* (& xs) (count xs)))")), 0);
    assert!(eval("((fn* (a & more) more) 1)").is_list());
}

#[test]
fn quote_returns_form_unevaluated() {
    assert_eq!(printed("(quote (a b (c)))"), "(a b (c))");
    assert_eq!(printed("'undefined-symbol"), "undefined-symbol");
}

#[test]
fn quasiquote_unquotes_and_splices() {
    assert_eq!(
        eval("`(1 ~(+ 1 1) ~@(list 3 4))"),
        Value::list(ints(&[1, 2, 3, 4]))
    );
    assert_eq!(
        printed("(let* (xs (list 2 3)) `(a ~@xs b ~xs))"),
        "(a 2 3 b (2 3))"
    );
    assert_eq!(printed("`(nested (deep ~(+ 1 2)))"), "(nested (deep 3))");
}

#[test]
fn quasiquote_preserves_vectors_and_quotes_symbols_and_maps() {
    let vector = eval("`[1 ~(+ 1 1)]");
    assert!(vector.is_vector());
    assert_eq!(vector, Value::vector(ints(&[1, 2])));
    assert_eq!(printed("`sym"), "sym");
    assert_eq!(printed("`{:a b}"), "{:a b}");
    assert_eq!(expect_int(&eval("`7")), 7);
}

#[test]
fn quasiquoteexpand_returns_rewritten_form() {
    assert_eq!(
        printed("(quasiquoteexpand (a ~b ~@c))"),
        "(cons (quote a) (cons b (concat c ())))"
    );
    assert_eq!(
        printed("(quasiquoteexpand [x])"),
        "(vec (cons (quote x) ()))"
    );
}

#[test]
fn defmacro_receives_unevaluated_arguments() {
    let value = eval_all(&[
        "(defmacro! unless (fn* (pred a b) `(if ~pred ~b ~a)))",
        "(unless false 7 (undefined-call))",
    ]);
    assert_eq!(expect_int(&value), 7);
}

#[test]
fn macro_expanding_into_macro_reaches_fixpoint() {
    let value = eval_all(&[
        "(defmacro! my-if (fn* (c t e) (list 'cond c t true e)))",
        "(defmacro! my-unless (fn* (c t e) (list 'my-if c e t)))",
        "(macroexpand (my-unless false 1 2))",
    ]);
    assert_eq!(pr_str(&value, true), "(if false 2 (cond true 1))");

    let value = eval_all(&[
        "(defmacro! my-if (fn* (c t e) (list 'cond c t true e)))",
        "(defmacro! my-unless (fn* (c t e) (list 'my-if c e t)))",
        "(my-unless false 1 2)",
    ]);
    assert_eq!(expect_int(&value), 1);
}

#[test]
fn cond_reduces_nested_clauses() {
    assert_eq!(eval("(cond false 1 nil 2 :else 3)"), Value::int(3));
    assert_eq!(eval("(cond (= 1 1) :first :else :second)"), Value::keyword("first"));
    assert!(eval("(cond false 1)").is_nil());
    let err = eval_error("(cond true)");
    assert_eq!(err.kind(), Some(&DiagnosticKind::Thrown));
    assert!(format!("{err}").contains("odd number of forms to cond"));
}

#[test]
fn macroexpand_leaves_non_macro_forms_alone() {
    assert_eq!(printed("(macroexpand (+ 1 2))"), "(+ 1 2)");
}

#[test]
fn defmacro_marks_a_copy_and_leaves_function_intact() {
    let value = eval_all(&[
        "(def! make-list (fn* (& xs) (cons 'list xs)))",
        "(defmacro! make-list-macro make-list)",
        "(list (macro? make-list-macro) (fn? make-list) (make-list-macro 1 2))",
    ]);
    assert_eq!(pr_str(&value, true), "(true true (1 2))");
}

#[test]
fn lists_and_vectors_compare_structurally() {
    assert_eq!(
        Value::list(ints(&[1, 2])),
        Value::vector(ints(&[1, 2]))
    );
    assert_eq!(eval("(= (list 1 2) [1 2])"), Value::bool(true));
    assert_eq!(eval("(= [1 [2]] (list 1 (list 2)))"), Value::bool(true));
    assert_eq!(eval("(= (list 1 2) [1 2 3])"), Value::bool(false));
}

#[test]
fn hash_map_equality_ignores_entry_order() {
    assert_eq!(eval("(= {:a 1 :b 2} {:b 2 :a 1})"), Value::bool(true));
    assert_eq!(eval("(= {:a 1} {:a 2})"), Value::bool(false));
    assert_eq!(
        eval("(= {[1 2] :v} (hash-map (list 1 2) :v))"),
        Value::bool(true)
    );
}

#[test]
fn hash_map_literals_evaluate_keys_and_values() {
    assert_eq!(printed("{:a (+ 1 1)}"), "{:a 2}");
    assert_eq!(printed("(let* (k :a) {k 1})"), "{:a 1}");
    assert!(eval("(= {[1 2] 3} {'(1 2) 3})").is_truthy());
    assert_eq!(printed("(let* (a :k b :k) {a 1 b 2})"), "{:k 2}");
}

#[test]
fn vector_literals_evaluate_elements_and_stay_vectors() {
    assert!(eval("[1 (+ 1 1)]").is_vector());
    assert_eq!(printed("[1 (+ 1 1)]"), "[1 2]");
    assert!(eval("[]").is_vector());
}

#[test]
fn atoms_share_state_between_bindings() {
    let value = eval_all(&[
        "(def! counter (atom 1))",
        "(def! alias counter)",
        "(swap! alias + 10)",
        "(reset! counter (* @alias 2))",
        "(list @counter (deref alias) (atom? counter))",
    ]);
    assert_eq!(pr_str(&value, true), "(22 22 true)");
}

#[test]
fn swap_accepts_closures() {
    let value = eval_all(&[
        "(def! a (atom (list 1)))",
        "(swap! a (fn* (xs y) (cons y xs)) 0)",
    ]);
    assert_eq!(value, Value::list(ints(&[0, 1])));
}

#[test]
fn eval_runs_in_root_environment() {
    assert_eq!(expect_int(&eval(r#"(eval (read-string "(+ 2 3)"))"#)), 5);
    let err = eval_error("(let* (local 1) (eval 'local))");
    assert_eq!(err.kind(), Some(&DiagnosticKind::UnboundSymbol));
}

#[test]
fn arithmetic_mixes_integers_and_floats() {
    assert_eq!(eval("(+ 1 2.5)"), Value::float(3.5));
    assert_eq!(expect_int(&eval("(/ 7 2)")), 3);
    assert_eq!(expect_int(&eval("(- 5)")), -5);
    assert_eq!(expect_int(&eval("(+)")), 0);
    assert_eq!(eval("(< 1 2)"), Value::bool(true));
    assert_eq!(eval("(>= 2.0 3)"), Value::bool(false));
}

#[test]
fn arithmetic_errors_are_reported() {
    let err = eval_error("(/ 1 0)");
    assert_eq!(err.kind(), Some(&DiagnosticKind::Arithmetic));
    let err = eval_error("(* 9223372036854775807 2)");
    assert_eq!(err.kind(), Some(&DiagnosticKind::Arithmetic));
    let err = eval_error(r#"(+ 1 "two")"#);
    assert_eq!(err.kind(), Some(&DiagnosticKind::Type));
}

#[test]
fn sequence_primitives() {
    assert_eq!(printed("(cons 0 [1 2])"), "(0 1 2)");
    assert_eq!(printed("(concat (list 1) [2] nil)"), "(1 2)");
    assert_eq!(printed("(vec (list 1 2))"), "[1 2]");
    assert_eq!(printed("(first nil)"), "nil");
    assert_eq!(printed("(rest [1 2 3])"), "(2 3)");
    assert_eq!(printed("(nth [1 2 3] 2)"), "3");
    assert_eq!(printed("(count nil)"), "0");
    assert_eq!(printed("(empty? [])"), "true");
    assert_eq!(printed("(not nil)"), "true");
    let err = eval_error("(nth (list 1) 5)");
    assert_eq!(err.kind(), Some(&DiagnosticKind::Type));
}

#[test]
fn string_primitives_print_values() {
    assert_eq!(printed(r#"(pr-str "a\nb" :k)"#), r#""\"a\\nb\" :k""#);
    assert_eq!(printed(r#"(str "a" 1 :k nil)"#), r#""a1:knil""#);
    assert_eq!(printed("(fn* (a) a)"), "#<function>");
    assert_eq!(printed("+"), "#<builtin +>");
}

#[test]
fn undefined_symbol_is_unbound() {
    let err = eval_error("(no-such-function 1)");
    assert_eq!(err.kind(), Some(&DiagnosticKind::UnboundSymbol));
    assert!(format!("{err}").contains("no-such-function"), "{err}");
}

#[test]
fn applying_a_non_function_is_not_callable() {
    let err = eval_error("(5 1 2)");
    assert_eq!(err.kind(), Some(&DiagnosticKind::NotCallable));
    let err = eval_error(r#"("text")"#);
    assert_eq!(err.kind(), Some(&DiagnosticKind::NotCallable));
}

#[test]
fn argument_count_mismatch_is_arity_error() {
    let err = eval_error("((fn* (a b) a) 1)");
    assert_eq!(err.kind(), Some(&DiagnosticKind::Arity));
    let err = eval_error("((fn* (a) a) 1 2)");
    assert_eq!(err.kind(), Some(&DiagnosticKind::Arity));
    let err = eval_error("((fn* (a b & c) a) 1)");
    assert_eq!(err.kind(), Some(&DiagnosticKind::Arity));
    let err = eval_error("(count 1 2)");
    assert_eq!(err.kind(), Some(&DiagnosticKind::Arity));
    let err = eval_error("(if)");
    assert_eq!(err.kind(), Some(&DiagnosticKind::Arity));
}

#[test]
fn malformed_variadic_marker_is_rejected() {
    let err = eval_error("(fn* (a &) a)");
    assert_eq!(err.kind(), Some(&DiagnosticKind::Syntax));
    let err = eval_error("(fn* (& a b) a)");
    assert_eq!(err.kind(), Some(&DiagnosticKind::Syntax));
}

#[test]
fn malformed_special_forms_are_reported() {
    let err = eval_error("(def! 1 2)");
    assert_eq!(err.kind(), Some(&DiagnosticKind::Type));
    let err = eval_error("(let* (a) a)");
    assert_eq!(err.kind(), Some(&DiagnosticKind::Syntax));
    let err = eval_error("(defmacro! m 5)");
    assert_eq!(err.kind(), Some(&DiagnosticKind::Type));
}

#[test]
fn environment_lookup_walks_outward_and_define_stays_local() {
    let root = Environment::new();
    root.borrow_mut().define("x".into(), Value::int(1));
    let child = Environment::with_parent(Rc::clone(&root));
    child.borrow_mut().define("x".into(), Value::int(2));
    child.borrow_mut().define("y".into(), Value::int(3));

    assert_eq!(Environment::get(&child, "x").expect("x"), Value::int(2));
    assert_eq!(Environment::get(&root, "x").expect("x"), Value::int(1));
    let err = Environment::get(&root, "y").expect_err("y is local to child");
    assert_eq!(err.kind(), Some(&DiagnosticKind::UnboundSymbol));
    assert!(Rc::ptr_eq(&Environment::root(&child), &root));
}

#[test]
fn environment_bind_handles_variadic_tail() {
    let params: Vec<String> = ["a", "&", "rest"].iter().map(|s| s.to_string()).collect();
    let env = Environment::bind(Environment::new(), &params, &ints(&[1, 2, 3]))
        .expect("bind");
    assert_eq!(Environment::get(&env, "a").expect("a"), Value::int(1));
    assert_eq!(
        Environment::get(&env, "rest").expect("rest"),
        Value::list(ints(&[2, 3]))
    );
}

#[test]
fn load_file_evaluates_every_form() {
    let dir = tempdir().expect("create temp dir");
    let path = dir.path().join("defs.mal");
    fs::write(
        &path,
        "; helpers\n(def! square (fn* (x) (* x x)))\n(def! nine (square 3))\n",
    )
    .expect("write script");

    let mut interpreter = interpreter();
    let loaded = interpreter
        .eval_source(&format!("(load-file \"{}\")", path_literal(&path)))
        .expect("load-file");
    assert!(loaded.is_nil());
    let value = interpreter.eval_source("(+ nine (square 4))").expect("use defs");
    assert_eq!(expect_int(&value), 25);
}

#[test]
fn argv_is_bound_from_execution_context() {
    let context = ExecutionContext {
        argv: vec!["alpha".into(), "beta".into()],
    };
    let mut interpreter = Interpreter::with_context(context).expect("interpreter");
    assert_eq!(interpreter.context().argv, ["alpha", "beta"]);
    let value = interpreter.eval_source("*ARGV*").expect("argv");
    assert_eq!(pr_str(&value, true), r#"("alpha" "beta")"#);
    assert_eq!(printed("*ARGV*"), "()");
}
