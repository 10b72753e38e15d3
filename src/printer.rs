use crate::value::{Value, ValueKind};

/// Renders a value as text. `readably` quotes and escapes strings so the
/// output can be read back.
pub fn pr_str(value: &Value, readably: bool) -> String {
    let mut out = String::new();
    print_inner(value, readably, &mut out);
    out
}

/// Renders every value and joins them with `separator`.
pub fn pr_seq(values: &[Value], readably: bool, separator: &str) -> String {
    values
        .iter()
        .map(|value| pr_str(value, readably))
        .collect::<Vec<_>>()
        .join(separator)
}

fn print_inner(value: &Value, readably: bool, out: &mut String) {
    match value.kind() {
        ValueKind::Nil => out.push_str("nil"),
        ValueKind::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        ValueKind::Int(n) => out.push_str(&n.to_string()),
        ValueKind::Float(f) => {
            if f.is_finite() && f.fract() == 0.0 {
                out.push_str(&format!("{f:.1}"));
            } else {
                out.push_str(&f.to_string());
            }
        }
        ValueKind::Str(s) => {
            if readably {
                print_escaped(s, out);
            } else {
                out.push_str(s);
            }
        }
        ValueKind::Keyword(name) => {
            out.push(':');
            out.push_str(name);
        }
        ValueKind::Symbol(name) => out.push_str(name),
        ValueKind::List(values) => print_sequence(values, readably, "(", ")", out),
        ValueKind::Vector(values) => print_sequence(values, readably, "[", "]", out),
        ValueKind::HashMap(entries) => {
            out.push('{');
            for (idx, (key, value)) in entries.iter().enumerate() {
                if idx > 0 {
                    out.push(' ');
                }
                print_inner(key, readably, out);
                out.push(' ');
                print_inner(value, readably, out);
            }
            out.push('}');
        }
        ValueKind::Closure(closure) if closure.is_macro => out.push_str("#<macro>"),
        ValueKind::Closure(_) => out.push_str("#<function>"),
        ValueKind::Builtin(native) => {
            out.push_str("#<builtin ");
            out.push_str(native.name);
            out.push('>');
        }
        ValueKind::Atom(cell) => {
            out.push_str("(atom ");
            print_inner(&cell.borrow(), readably, out);
            out.push(')');
        }
    }
}

fn print_sequence(values: &[Value], readably: bool, open: &str, close: &str, out: &mut String) {
    out.push_str(open);
    for (idx, value) in values.iter().enumerate() {
        if idx > 0 {
            out.push(' ');
        }
        print_inner(value, readably, out);
    }
    out.push_str(close);
}

fn print_escaped(s: &str, out: &mut String) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out.push('"');
}
